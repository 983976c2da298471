use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;

use admission_cache::RuleCache;
use admission_core_types::{AccessRule, MatchType, RecordId, RequestAttributes, RuleType};
use admission_errors::{codes, ErrorCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::matcher::RuleMatcher;

/// Verdict when the rule set cannot be obtained or evaluation fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailPolicy {
    Open,
    Closed,
}

impl FailPolicy {
    pub fn allows(self) -> bool {
        matches!(self, FailPolicy::Open)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            FailPolicy::Open => "open",
            FailPolicy::Closed => "closed",
        }
    }
}

impl fmt::Display for FailPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" | "allow" => Ok(FailPolicy::Open),
            "closed" | "deny" => Ok(FailPolicy::Closed),
            other => Err(format!("unknown fail policy '{other}' (expected open or closed)")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionReason {
    Blacklisted {
        rule_id: RecordId,
        rule_name: String,
        match_type: MatchType,
    },
    Whitelisted {
        rule_id: RecordId,
        rule_name: String,
        match_type: MatchType,
    },
    /// Whitelist rules exist and none matched.
    ImplicitDeny,
    /// No rule matched and no whitelist rule exists.
    DefaultAllow,
    FailPolicy { policy: FailPolicy },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: DecisionReason,
    pub rules_evaluated: usize,
}

impl AccessDecision {
    fn matched(rule: &AccessRule, rules_evaluated: usize) -> Self {
        let (allowed, reason) = match rule.rule_type {
            RuleType::Blacklist => (
                false,
                DecisionReason::Blacklisted {
                    rule_id: rule.id,
                    rule_name: rule.rule_name.clone(),
                    match_type: rule.match_type,
                },
            ),
            RuleType::Whitelist => (
                true,
                DecisionReason::Whitelisted {
                    rule_id: rule.id,
                    rule_name: rule.rule_name.clone(),
                    match_type: rule.match_type,
                },
            ),
        };
        Self {
            allowed,
            reason,
            rules_evaluated,
        }
    }

    fn fallback(policy: FailPolicy) -> Self {
        Self {
            allowed: policy.allows(),
            reason: DecisionReason::FailPolicy { policy },
            rules_evaluated: 0,
        }
    }

    /// Rejection code for a denied request; `None` when allowed.
    pub fn error_code(&self) -> Option<ErrorCode> {
        if self.allowed {
            return None;
        }
        Some(match &self.reason {
            DecisionReason::Blacklisted { match_type, .. } => match match_type {
                MatchType::Ip => codes::IP_BLOCKED,
                MatchType::User => codes::USER_BLOCKED,
                MatchType::Path | MatchType::Method => codes::API_BLOCKED,
            },
            _ => codes::ACCESS_DENIED,
        })
    }

    pub fn rule_name(&self) -> Option<&str> {
        match &self.reason {
            DecisionReason::Blacklisted { rule_name, .. }
            | DecisionReason::Whitelisted { rule_name, .. } => Some(rule_name),
            _ => None,
        }
    }

    /// Short label for metrics and logs.
    pub fn verdict(&self) -> &'static str {
        match &self.reason {
            DecisionReason::Blacklisted { .. } => "blacklisted",
            DecisionReason::Whitelisted { .. } => "whitelisted",
            DecisionReason::ImplicitDeny => "implicit_deny",
            DecisionReason::DefaultAllow => "default_allow",
            DecisionReason::FailPolicy { .. } => "fail_policy",
        }
    }
}

/// Decides whether a request may proceed, from the cached ordered rule set.
///
/// Never fails: matcher errors disable only the offending rule, and a rule set that cannot be
/// loaded (or an evaluation that panics) yields the configured [`FailPolicy`].
#[derive(Clone)]
pub struct AccessDecisionEngine {
    rules: RuleCache,
    matcher: RuleMatcher,
    fail_policy: FailPolicy,
}

impl AccessDecisionEngine {
    pub fn new(rules: RuleCache, fail_policy: FailPolicy) -> Self {
        Self {
            rules,
            matcher: RuleMatcher::new(),
            fail_policy,
        }
    }

    pub fn with_matcher(mut self, matcher: RuleMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn fail_policy(&self) -> FailPolicy {
        self.fail_policy
    }

    pub fn cache(&self) -> &RuleCache {
        &self.rules
    }

    pub async fn is_allowed(
        &self,
        path: &str,
        method: &str,
        client_ip: &str,
        user_id: Option<&str>,
    ) -> bool {
        let mut request = RequestAttributes::new(method, path).with_client_ip(client_ip);
        request.user_id = user_id.map(str::to_string);
        self.evaluate(&request).await.allowed
    }

    pub async fn evaluate(&self, request: &RequestAttributes) -> AccessDecision {
        let snapshot = self.rules.get().await;
        if snapshot.is_degraded() {
            warn!(
                path = %request.path,
                policy = %self.fail_policy,
                "access rules unavailable, applying fail policy"
            );
            return AccessDecision::fallback(self.fail_policy);
        }

        let evaluated = catch_unwind(AssertUnwindSafe(|| {
            self.evaluate_rules(&snapshot.items, request)
        }));
        match evaluated {
            Ok(decision) => decision,
            Err(_) => {
                error!(
                    path = %request.path,
                    policy = %self.fail_policy,
                    "access evaluation panicked, applying fail policy"
                );
                AccessDecision::fallback(self.fail_policy)
            }
        }
    }

    /// Evaluates `rules`, which must already be in evaluation order.
    pub fn evaluate_rules(
        &self,
        rules: &[AccessRule],
        request: &RequestAttributes,
    ) -> AccessDecision {
        let mut whitelist_present = false;
        let mut evaluated = 0;

        for rule in rules.iter().filter(|rule| rule.enabled) {
            if rule.rule_type == RuleType::Whitelist {
                whitelist_present = true;
            }
            evaluated += 1;
            match self.matcher.matches(rule, request) {
                Ok(true) => {
                    debug!(
                        rule_id = rule.id,
                        rule = %rule.rule_name,
                        rule_type = %rule.rule_type,
                        path = %request.path,
                        "access rule matched"
                    );
                    return AccessDecision::matched(rule, evaluated);
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(rule_id = rule.id, rule = %rule.rule_name, %err, "rule skipped");
                }
            }
        }

        let (allowed, reason) = if whitelist_present {
            (false, DecisionReason::ImplicitDeny)
        } else {
            (true, DecisionReason::DefaultAllow)
        };
        AccessDecision {
            allowed,
            reason,
            rules_evaluated: evaluated,
        }
    }
}
