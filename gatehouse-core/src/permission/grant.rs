//! Permission keys and grant scopes.
//!
//! A key identifies what a grant or block applies to: either one exact
//! parameter combination of a tool, or the tool as a whole.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How far a user's approval reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionScope {
    /// Allow this exact parameter combination for the rest of the session.
    Once,
    /// Allow the tool with any parameters for the rest of the session.
    Session,
    /// Block this exact parameter combination process-wide.
    Never,
}

impl PermissionScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionScope::Once => "once",
            PermissionScope::Session => "session",
            PermissionScope::Never => "never",
        }
    }
}

impl fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "once" => Ok(PermissionScope::Once),
            "session" => Ok(PermissionScope::Session),
            "never" => Ok(PermissionScope::Never),
            other => Err(format!("unknown permission scope: {}", other)),
        }
    }
}

/// Identity of a grant or block.
///
/// Exact keys hold the canonical JSON of the parameters, so two calls
/// whose parameter objects differ only in key order share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PermissionKey {
    Exact { tool: String, params: String },
    Tool { tool: String },
}

impl PermissionKey {
    /// Key for one parameter combination of a tool.
    pub fn exact(tool: impl Into<String>, params: &Value) -> Self {
        PermissionKey::Exact {
            tool: tool.into(),
            params: canonical_params(params),
        }
    }

    /// Key covering every invocation of a tool.
    pub fn tool(tool: impl Into<String>) -> Self {
        PermissionKey::Tool { tool: tool.into() }
    }

    pub fn tool_name(&self) -> &str {
        match self {
            PermissionKey::Exact { tool, .. } | PermissionKey::Tool { tool } => tool,
        }
    }

    pub fn is_tool_wide(&self) -> bool {
        matches!(self, PermissionKey::Tool { .. })
    }

    /// Short SHA-256 digest of the key, for display and logs.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};

        let material = match self {
            PermissionKey::Exact { tool, params } => format!("{}:{}", tool, params),
            PermissionKey::Tool { tool } => format!("{}:*", tool),
        };
        let hash = Sha256::digest(material.as_bytes());
        format!("{:x}", hash)[..16].to_string()
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionKey::Exact { tool, params } => write!(f, "{}({})", tool, params),
            PermissionKey::Tool { tool } => write!(f, "{}(*)", tool),
        }
    }
}

/// Serialize parameters with object keys sorted at every depth.
pub fn canonical_params(params: &Value) -> String {
    serde_json::to_string(&canonicalize_json(params)).unwrap_or_default()
}

fn canonicalize_json(value: &Value) -> Value {
    use std::collections::BTreeMap;

    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<_, _> = map
                .iter()
                .map(|(k, v)| (k.clone(), canonicalize_json(v)))
                .collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(arr) => Value::Array(arr.iter().map(canonicalize_json).collect()),
        other => other.clone(),
    }
}
