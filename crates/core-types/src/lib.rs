use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Stable identifier of a stored rule or mapping.
pub type RecordId = i64;

/// Client address used when no forwarding header or peer address is available.
pub const UNKNOWN_CLIENT_IP: &str = "unknown";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown {field} value '{value}'")]
    UnknownVariant { field: &'static str, value: String },
}

impl TypeError {
    fn unknown(field: &'static str, value: &str) -> Self {
        Self::UnknownVariant {
            field,
            value: value.to_string(),
        }
    }
}

macro_rules! string_enum {
    ($name:ident, $field:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(TypeError::unknown($field, s)),
                }
            }
        }
    };
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RuleType {
    Blacklist,
    Whitelist,
}

string_enum!(RuleType, "rule_type", {
    Blacklist => "blacklist",
    Whitelist => "whitelist",
});

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MatchType {
    Path,
    Method,
    Ip,
    User,
}

string_enum!(MatchType, "match_type", {
    Path => "path",
    Method => "method",
    Ip => "ip",
    User => "user",
});

impl MatchType {
    /// Whether the matcher for this attribute understands `pattern`.
    /// Method and user matchers ignore the pattern entirely.
    pub fn supports(self, pattern: MatchPattern) -> bool {
        use MatchPattern::*;
        match self {
            MatchType::Path => matches!(pattern, Exact | Prefix | Suffix | Wildcard | Regex),
            MatchType::Ip => matches!(pattern, Exact | Prefix | Cidr | Regex),
            MatchType::Method | MatchType::User => true,
        }
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MatchPattern {
    Exact,
    Prefix,
    Suffix,
    Wildcard,
    Regex,
    Cidr,
}

string_enum!(MatchPattern, "match_pattern", {
    Exact => "exact",
    Prefix => "prefix",
    Suffix => "suffix",
    Wildcard => "wildcard",
    Regex => "regex",
    Cidr => "cidr",
});

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum MappingType {
    #[default]
    Rewrite,
    Redirect,
    Alias,
}

string_enum!(MappingType, "mapping_type", {
    Rewrite => "rewrite",
    Redirect => "redirect",
    Alias => "alias",
});

/// Records that take part in priority ordering.
pub trait Prioritized {
    fn record_id(&self) -> RecordId;
    fn priority(&self) -> i32;
    fn is_enabled(&self) -> bool;
}

/// Sorts records by priority descending, ties broken by id ascending.
pub fn sort_by_priority<T: Prioritized>(items: &mut [T]) {
    items.sort_by(|a, b| {
        b.priority()
            .cmp(&a.priority())
            .then_with(|| a.record_id().cmp(&b.record_id()))
    });
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessRule {
    pub id: RecordId,
    pub rule_name: String,
    pub rule_type: RuleType,
    pub match_type: MatchType,
    pub match_pattern: MatchPattern,
    pub match_value: String,
    #[cfg_attr(feature = "serde-full", serde(default))]
    pub priority: i32,
    #[cfg_attr(feature = "serde-full", serde(default = "enabled_default"))]
    pub enabled: bool,
    #[cfg_attr(feature = "serde-full", serde(default))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde-full", serde(default))]
    pub created_at: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "serde-full", serde(default))]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(feature = "serde-full")]
fn enabled_default() -> bool {
    true
}

impl AccessRule {
    pub fn new(
        id: RecordId,
        rule_name: impl Into<String>,
        rule_type: RuleType,
        match_type: MatchType,
        match_pattern: MatchPattern,
        match_value: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            rule_name: rule_name.into(),
            rule_type,
            match_type,
            match_pattern,
            match_value: match_value.into(),
            priority: 0,
            enabled: true,
            description: None,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

impl Prioritized for AccessRule {
    fn record_id(&self) -> RecordId {
        self.id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl fmt::Display for AccessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} [{} {}/{} '{}' prio={}]",
            self.id,
            self.rule_name,
            self.rule_type,
            self.match_type,
            self.match_pattern,
            self.match_value,
            self.priority
        )
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlMapping {
    pub id: RecordId,
    pub mapping_name: String,
    pub external_path: String,
    pub internal_path: String,
    pub target_service: String,
    #[cfg_attr(feature = "serde-full", serde(default))]
    pub mapping_type: MappingType,
    #[cfg_attr(feature = "serde-full", serde(default))]
    pub priority: i32,
    #[cfg_attr(feature = "serde-full", serde(default = "enabled_default"))]
    pub enabled: bool,
    #[cfg_attr(feature = "serde-full", serde(default))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde-full", serde(default))]
    pub created_at: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "serde-full", serde(default))]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UrlMapping {
    pub fn new(
        id: RecordId,
        mapping_name: impl Into<String>,
        external_path: impl Into<String>,
        internal_path: impl Into<String>,
        target_service: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            mapping_name: mapping_name.into(),
            external_path: external_path.into(),
            internal_path: internal_path.into(),
            target_service: target_service.into(),
            mapping_type: MappingType::Rewrite,
            priority: 0,
            enabled: true,
            description: None,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_type(mut self, mapping_type: MappingType) -> Self {
        self.mapping_type = mapping_type;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

impl Prioritized for UrlMapping {
    fn record_id(&self) -> RecordId {
        self.id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl fmt::Display for UrlMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} [{} -> {} @{} {} prio={}]",
            self.id,
            self.mapping_name,
            self.external_path,
            self.internal_path,
            self.target_service,
            self.mapping_type,
            self.priority
        )
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

/// The request attributes access rules are evaluated against.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequestAttributes {
    pub path: String,
    pub method: String,
    pub client_ip: String,
    pub user_id: Option<String>,
}

impl RequestAttributes {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            client_ip: UNKNOWN_CLIENT_IP.to_string(),
            user_id: None,
        }
    }

    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = ip.into();
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Identity asserted by an upstream authentication collaborator.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UserIdentity {
    pub user_id: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub tenant_id: Option<String>,
    pub roles: Vec<String>,
}

impl UserIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }
}
