use serde::{Deserialize, Serialize};

// Subset of the Jira REST v2 issue representation; other top-level keys are ignored.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Issue {
    pub id: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub fields: serde_json::Value,
}
