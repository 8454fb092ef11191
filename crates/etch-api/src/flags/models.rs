// Wire types for the feature-flag service.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The user the flag service evaluates gates for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagUser {
    #[serde(rename = "userID")]
    pub user_id: String,

    /// Arbitrary targeting attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<serde_json::Value>,
}

impl FlagUser {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            custom: None,
        }
    }
}

/// Deployment tier sent alongside the user (`development`, `production`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagEnvironment {
    pub tier: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct InitializeRequest<'a> {
    pub user: &'a FlagUser,
    #[serde(rename = "environment", skip_serializing_if = "Option::is_none")]
    pub environment: Option<&'a FlagEnvironment>,
}

/// A single gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateValue {
    pub value: bool,
    #[serde(default)]
    pub rule_id: Option<String>,
}

/// A named structured value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicConfig {
    pub value: serde_json::Value,
    #[serde(default)]
    pub rule_id: Option<String>,
}

/// All evaluations returned by a successful initialize call.
///
/// The service also reports errors with HTTP 200 as `{"error": "..."}`,
/// so `error` is captured here and checked before the snapshot is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlagSnapshot {
    #[serde(default)]
    pub feature_gates: HashMap<String, GateValue>,
    #[serde(default)]
    pub dynamic_configs: HashMap<String, DynamicConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FlagSnapshot {
    pub fn gate(&self, name: &str) -> bool {
        self.feature_gates.get(name).is_some_and(|g| g.value)
    }

    pub fn config(&self, name: &str) -> Option<&DynamicConfig> {
        self.dynamic_configs.get(name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn user_serializes_with_service_field_names() {
        let user = FlagUser::new("u-42");
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json, serde_json::json!({ "userID": "u-42" }));
    }

    #[test]
    fn snapshot_tolerates_missing_sections() {
        let snap: FlagSnapshot =
            serde_json::from_str(r#"{"feature_gates":{"dark_mode":{"value":true}}}"#).unwrap();
        assert!(snap.gate("dark_mode"));
        assert!(!snap.gate("missing"));
        assert!(snap.config("banner").is_none());
        assert!(snap.error.is_none());
    }
}
