use std::net::IpAddr;

use admission_core_types::{AccessRule, MatchPattern, MatchType, RequestAttributes};
use ipnet::IpNet;

use crate::errors::MatchError;
use crate::patterns::PatternCache;

/// Evaluates one rule against the request attribute its `match_type` selects.
#[derive(Clone, Default)]
pub struct RuleMatcher {
    patterns: PatternCache,
}

impl RuleMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patterns(patterns: PatternCache) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &PatternCache {
        &self.patterns
    }

    pub fn matches(
        &self,
        rule: &AccessRule,
        request: &RequestAttributes,
    ) -> Result<bool, MatchError> {
        if !rule.match_type.supports(rule.match_pattern) {
            return Err(MatchError::Unsupported {
                match_type: rule.match_type.as_str(),
                pattern: rule.match_pattern.as_str(),
            });
        }
        let value = rule.match_value.as_str();
        match rule.match_type {
            MatchType::Path => self.match_path(rule.match_pattern, value, &request.path),
            MatchType::Method => Ok(request.method.trim().eq_ignore_ascii_case(value.trim())),
            MatchType::Ip => self.match_ip(rule.match_pattern, value, &request.client_ip),
            MatchType::User => Ok(request.user_id.as_deref() == Some(value)),
        }
    }

    fn match_path(
        &self,
        pattern: MatchPattern,
        value: &str,
        path: &str,
    ) -> Result<bool, MatchError> {
        match pattern {
            MatchPattern::Exact => Ok(path == value),
            MatchPattern::Prefix => Ok(path.starts_with(value)),
            MatchPattern::Suffix => Ok(path.ends_with(value)),
            MatchPattern::Wildcard => self
                .patterns
                .glob(value)
                .map(|re| re.is_match(path))
                .map_err(|reason| invalid_regex(value, reason)),
            MatchPattern::Regex => self.match_regex(value, path),
            MatchPattern::Cidr => Err(MatchError::Unsupported {
                match_type: MatchType::Path.as_str(),
                pattern: pattern.as_str(),
            }),
        }
    }

    fn match_ip(&self, pattern: MatchPattern, value: &str, client_ip: &str) -> Result<bool, MatchError> {
        match pattern {
            MatchPattern::Exact => Ok(client_ip == value),
            MatchPattern::Prefix => Ok(client_ip.starts_with(value)),
            MatchPattern::Cidr => {
                let network = parse_network(value)?;
                Ok(parse_client(client_ip).is_some_and(|addr| network.contains(&addr)))
            }
            MatchPattern::Regex => self.match_regex(value, client_ip),
            MatchPattern::Suffix | MatchPattern::Wildcard => Err(MatchError::Unsupported {
                match_type: MatchType::Ip.as_str(),
                pattern: pattern.as_str(),
            }),
        }
    }

    fn match_regex(&self, pattern: &str, input: &str) -> Result<bool, MatchError> {
        self.patterns
            .regex(pattern)
            .map(|re| re.is_match(input))
            .map_err(|reason| invalid_regex(pattern, reason))
    }
}

fn invalid_regex(pattern: &str, reason: String) -> MatchError {
    MatchError::InvalidRegex {
        pattern: pattern.to_string(),
        reason,
    }
}

/// Accepts `a.b.c.d/len`, IPv6 networks, and bare addresses as host routes.
fn parse_network(value: &str) -> Result<IpNet, MatchError> {
    let value = value.trim();
    if let Ok(net) = value.parse::<IpNet>() {
        return Ok(net.trunc());
    }
    value
        .parse::<IpAddr>()
        .map(IpNet::from)
        .map_err(|_| MatchError::InvalidCidr(value.to_string()))
}

fn parse_client(client_ip: &str) -> Option<IpAddr> {
    match client_ip.trim().parse::<IpAddr>().ok()? {
        IpAddr::V6(v6) => Some(
            v6.to_ipv4_mapped()
                .map(IpAddr::V4)
                .unwrap_or(IpAddr::V6(v6)),
        ),
        v4 => Some(v4),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use admission_core_types::RuleType;

    fn rule(match_type: MatchType, pattern: MatchPattern, value: &str) -> AccessRule {
        AccessRule::new(1, "r", RuleType::Blacklist, match_type, pattern, value)
    }

    fn get(path: &str) -> RequestAttributes {
        RequestAttributes::new("GET", path)
    }

    #[test]
    fn path_patterns() {
        let m = RuleMatcher::new();
        let req = get("/api/v1/users.json");
        assert!(m.matches(&rule(MatchType::Path, MatchPattern::Prefix, "/api/"), &req).unwrap());
        assert!(m.matches(&rule(MatchType::Path, MatchPattern::Suffix, ".json"), &req).unwrap());
        assert!(m.matches(&rule(MatchType::Path, MatchPattern::Wildcard, "/api/*/users.*"), &req).unwrap());
        assert!(m.matches(&rule(MatchType::Path, MatchPattern::Wildcard, "/api/v[0-9]/*"), &req).unwrap());
        assert!(m.matches(&rule(MatchType::Path, MatchPattern::Regex, "/api/v\\d+/.*"), &req).unwrap());
        assert!(!m.matches(&rule(MatchType::Path, MatchPattern::Regex, "/api"), &req).unwrap());
        assert!(!m.matches(&rule(MatchType::Path, MatchPattern::Exact, "/api"), &req).unwrap());
    }

    #[test]
    fn method_is_case_insensitive() {
        let m = RuleMatcher::new();
        let r = rule(MatchType::Method, MatchPattern::Exact, "delete");
        assert!(m.matches(&r, &RequestAttributes::new("DELETE", "/x")).unwrap());
        assert!(!m.matches(&r, &RequestAttributes::new("GET", "/x")).unwrap());
    }

    #[test]
    fn cidr_containment() {
        let m = RuleMatcher::new();
        let r = rule(MatchType::Ip, MatchPattern::Cidr, "10.1.0.0/16");
        let at = |ip: &str| get("/").with_client_ip(ip);
        assert!(m.matches(&r, &at("10.1.200.3")).unwrap());
        assert!(m.matches(&r, &at("::ffff:10.1.0.9")).unwrap());
        assert!(!m.matches(&r, &at("10.2.0.1")).unwrap());
        assert!(!m.matches(&r, &at("unknown")).unwrap());

        let host = rule(MatchType::Ip, MatchPattern::Cidr, "2001:db8::1");
        assert!(m.matches(&host, &at("2001:db8::1")).unwrap());
        assert!(!m.matches(&host, &at("2001:db8::2")).unwrap());

        let broken = rule(MatchType::Ip, MatchPattern::Cidr, "10.0.0.0/40");
        assert_eq!(
            m.matches(&broken, &at("10.0.0.1")),
            Err(MatchError::InvalidCidr("10.0.0.0/40".into()))
        );
    }

    #[test]
    fn user_requires_identity() {
        let m = RuleMatcher::new();
        let r = rule(MatchType::User, MatchPattern::Exact, "mallory");
        assert!(!m.matches(&r, &get("/")).unwrap());
        assert!(m.matches(&r, &get("/").with_user("mallory")).unwrap());
    }

    #[test]
    fn unsupported_combinations_error() {
        let m = RuleMatcher::new();
        assert!(matches!(
            m.matches(&rule(MatchType::Path, MatchPattern::Cidr, "10.0.0.0/8"), &get("/")),
            Err(MatchError::Unsupported { .. })
        ));
        assert!(matches!(
            m.matches(&rule(MatchType::Ip, MatchPattern::Suffix, ".1"), &get("/")),
            Err(MatchError::Unsupported { .. })
        ));
    }
}
