//! # Validation Rule Definitions
//!
//! A rule is an expression that must evaluate to `true` for an instance to
//! be valid, plus the message reported when it does not. Rules are carried
//! in schema documents as a list under a vendor extension:
//!
//! ```yaml
//! x-kubernetes-validations:
//!   - rule: "minReplicas < maxReplicas"
//!     message: "minReplicas must be smaller than maxReplicas"
//! ```

use serde::{Deserialize, Serialize};

/// One `(rule, message)` pair.
///
/// Both fields default to empty so that a rule with a missing expression
/// still deserializes; compiling it reports "rule is not specified".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Expression text.
    #[serde(default)]
    pub rule: String,
    /// Message reported when the expression evaluates to false.
    #[serde(default)]
    pub message: String,
}

impl ValidationRule {
    pub fn new(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Returns false when the expression text is empty or blank.
    pub fn is_specified(&self) -> bool {
        !self.rule.trim().is_empty()
    }

    /// The message to report on failure, falling back to the rule text.
    pub fn failure_message(&self) -> String {
        if self.message.is_empty() {
            format!("failed rule: {}", self.rule)
        } else {
            self.message.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_bytes() {
        let raw = r#"{"rule":"self.size() > 0 && self != 'xé'","message":"must not be \"x\""}"#;
        let rule: ValidationRule = serde_json::from_str(raw).unwrap();
        assert_eq!(rule.rule, "self.size() > 0 && self != 'x\u{e9}'");
        let back = serde_json::to_string(&rule).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_field_order_is_rule_then_message() {
        let rule = ValidationRule::new("self > 0", "positive");
        assert_eq!(
            serde_json::to_string(&rule).unwrap(),
            r#"{"rule":"self > 0","message":"positive"}"#
        );
    }

    #[test]
    fn test_missing_rule_deserializes_as_unspecified() {
        let rule: ValidationRule = serde_json::from_str(r#"{"message":"only a message"}"#).unwrap();
        assert!(!rule.is_specified());
        assert_eq!(rule.message, "only a message");
    }

    #[test]
    fn test_blank_rule_is_unspecified() {
        assert!(!ValidationRule::new("   ", "m").is_specified());
        assert!(ValidationRule::new("true", "").is_specified());
    }

    #[test]
    fn test_failure_message_falls_back_to_rule() {
        assert_eq!(ValidationRule::new("self > 0", "").failure_message(), "failed rule: self > 0");
        assert_eq!(ValidationRule::new("self > 0", "positive").failure_message(), "positive");
    }
}
