//! Authorization rule declarations.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Operation kinds a rule can be restricted to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuthOperation {
    /// Plain, connection and search reads.
    Read,
    /// Aggregations.
    Aggregate,
    /// Node creation.
    Create,
    /// Property updates.
    Update,
    /// Node deletion.
    Delete,
}

/// When a validate rule runs relative to the operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationTiming {
    /// Against existing state, before the operation.
    Before,
    /// Against resulting state, after the operation.
    After,
}

/// Condition attached to a rule.
///
/// `node` is a filter over the entity and may reference claims through
/// `"$jwt.<path>"` placeholders. `jwt` is a filter over the claims alone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleWhere {
    /// Filter over the entity's fields.
    #[serde(default)]
    pub node: Option<Value>,
    /// Filter over the caller's claims.
    #[serde(default)]
    pub jwt: Option<Value>,
}

fn default_true() -> bool {
    true
}

/// Rule that silently narrows visible rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    /// Operations the rule applies to; `None` applies everywhere.
    #[serde(default)]
    pub operations: Option<Vec<AuthOperation>>,
    /// Unauthenticated callers fail the rule when set.
    #[serde(default = "default_true")]
    pub require_authentication: bool,
    /// Rule condition.
    #[serde(rename = "where", default)]
    pub condition: RuleWhere,
}

/// Rule that must hold or the operation is aborted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidateRule {
    /// Operations the rule applies to; `None` applies everywhere.
    #[serde(default)]
    pub operations: Option<Vec<AuthOperation>>,
    /// Timings the rule runs at.
    #[serde(default = "ValidateRule::default_when")]
    pub when: Vec<ValidationTiming>,
    /// Unauthenticated callers fail the rule when set.
    #[serde(default = "default_true")]
    pub require_authentication: bool,
    /// Rule condition.
    #[serde(rename = "where", default)]
    pub condition: RuleWhere,
}

impl ValidateRule {
    fn default_when() -> Vec<ValidationTiming> {
        vec![ValidationTiming::Before, ValidationTiming::After]
    }

    /// Validate rule on the node part only, running at both timings.
    pub fn node(condition: Value) -> Self {
        Self {
            operations: None,
            when: Self::default_when(),
            require_authentication: true,
            condition: RuleWhere {
                node: Some(condition),
                jwt: None,
            },
        }
    }

    /// Validate rule on the claims only.
    pub fn jwt(condition: Value) -> Self {
        Self {
            operations: None,
            when: Self::default_when(),
            require_authentication: true,
            condition: RuleWhere {
                node: None,
                jwt: Some(condition),
            },
        }
    }

    /// Restricts the rule to the given operations.
    pub fn on(mut self, operations: impl IntoIterator<Item = AuthOperation>) -> Self {
        self.operations = Some(operations.into_iter().collect());
        self
    }

    /// Restricts the rule to the given timings.
    pub fn at(mut self, when: impl IntoIterator<Item = ValidationTiming>) -> Self {
        self.when = when.into_iter().collect();
        self
    }

    /// Whether the rule applies to `operation` at `timing`.
    pub fn applies(&self, operation: AuthOperation, timing: ValidationTiming) -> bool {
        applies_to(self.operations.as_deref(), operation) && self.when.contains(&timing)
    }
}

impl FilterRule {
    /// Filter rule on the node part only.
    pub fn node(condition: Value) -> Self {
        Self {
            operations: None,
            require_authentication: true,
            condition: RuleWhere {
                node: Some(condition),
                jwt: None,
            },
        }
    }

    /// Filter rule on the claims only.
    pub fn jwt(condition: Value) -> Self {
        Self {
            operations: None,
            require_authentication: true,
            condition: RuleWhere {
                node: None,
                jwt: Some(condition),
            },
        }
    }

    /// Restricts the rule to the given operations.
    pub fn on(mut self, operations: impl IntoIterator<Item = AuthOperation>) -> Self {
        self.operations = Some(operations.into_iter().collect());
        self
    }

    /// Lets unauthenticated callers through the authentication gate.
    pub fn allow_unauthenticated(mut self) -> Self {
        self.require_authentication = false;
        self
    }

    /// Whether the rule applies to `operation`.
    pub fn applies(&self, operation: AuthOperation) -> bool {
        applies_to(self.operations.as_deref(), operation)
    }
}

fn applies_to(operations: Option<&[AuthOperation]>, operation: AuthOperation) -> bool {
    operations.map_or(true, |ops| ops.contains(&operation))
}

/// Ordered filter and validate rules of one entity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationRules {
    /// Filter rules.
    #[serde(default)]
    pub filter: Vec<FilterRule>,
    /// Validate rules.
    #[serde(default)]
    pub validate: Vec<ValidateRule>,
}

impl AuthorizationRules {
    /// Whether no rules are declared.
    pub fn is_empty(&self) -> bool {
        self.filter.is_empty() && self.validate.is_empty()
    }

    /// Appends a filter rule.
    pub fn with_filter(mut self, rule: FilterRule) -> Self {
        self.filter.push(rule);
        self
    }

    /// Appends a validate rule.
    pub fn with_validate(mut self, rule: ValidateRule) -> Self {
        self.validate.push(rule);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_map;

    #[test]
    fn unrestricted_rules_apply_everywhere() {
        let rule = FilterRule::node(value_map! { "published" => true });
        assert!(rule.applies(AuthOperation::Read));
        assert!(rule.applies(AuthOperation::Delete));
    }

    #[test]
    fn restricted_rules_are_noops_elsewhere() {
        let rule = ValidateRule::jwt(value_map! { "role" => "admin" })
            .on([AuthOperation::Create])
            .at([ValidationTiming::After]);
        assert!(rule.applies(AuthOperation::Create, ValidationTiming::After));
        assert!(!rule.applies(AuthOperation::Create, ValidationTiming::Before));
        assert!(!rule.applies(AuthOperation::Read, ValidationTiming::After));
    }

    #[test]
    fn deserializes_defaults() {
        let rules: AuthorizationRules = serde_json::from_str(
            r#"{"validate": [{"where": {"jwt": {"roles_INCLUDES": "admin"}}}]}"#,
        )
        .unwrap();
        let rule = &rules.validate[0];
        assert!(rule.require_authentication);
        assert_eq!(rule.when.len(), 2);
        assert!(rule.condition.node.is_none());
    }
}
