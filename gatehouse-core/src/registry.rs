//! Tool catalog.
//!
//! The registry holds one [`ToolDefinition`] per tool name. Definitions are
//! plain data: the policy engine never runs a tool itself, it only needs to
//! know what a tool is called, what parameters it takes, how risky it is,
//! and whether a human has to approve it.
//!
//! # Example
//!
//! ```rust
//! use gatehouse_core::registry::{ParamType, RiskLevel, ToolDefinition, ToolRegistry};
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(
//!     ToolDefinition::new("echo", "Echo a message", RiskLevel::Low)
//!         .with_param("message", ParamType::String, "Message to echo", true)
//!         .auto_approved(),
//! );
//!
//! let schemas = registry.export_for_model();
//! assert_eq!(schemas[0].parameters["required"][0], "message");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::i18n::Locale;

/// Ordinal classification of a tool's potential impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    /// Reserved for tools that should never be auto-approved.
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            other => Err(format!("unknown risk level: {}", other)),
        }
    }
}

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }
}

/// A single declared tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Immutable description of a tool the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    /// English description, sent to the model.
    pub description: String,
    /// German description, shown to users when the locale asks for it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_de: Option<String>,
    /// Parameters in declaration order.
    #[serde(default)]
    pub parameters: Vec<ParamSpec>,
    pub risk_level: RiskLevel,
    #[serde(default = "default_requires_approval")]
    pub requires_approval: bool,
}

fn default_requires_approval() -> bool {
    true
}

impl ToolDefinition {
    /// Create a definition that requires approval and takes no parameters.
    pub fn new(name: impl Into<String>, description: impl Into<String>, risk: RiskLevel) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            description_de: None,
            parameters: Vec::new(),
            risk_level: risk,
            requires_approval: true,
        }
    }

    pub fn with_description_de(mut self, description: impl Into<String>) -> Self {
        self.description_de = Some(description.into());
        self
    }

    /// Append a parameter.
    pub fn with_param(
        mut self,
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.parameters.push(ParamSpec {
            name: name.into(),
            param_type,
            description: description.into(),
            required,
            default: None,
        });
        self
    }

    /// Append an optional parameter with a default value.
    pub fn with_default_param(
        mut self,
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
        default: Value,
    ) -> Self {
        self.parameters.push(ParamSpec {
            name: name.into(),
            param_type,
            description: description.into(),
            required: false,
            default: Some(default),
        });
        self
    }

    /// Mark the tool as safe to run without asking.
    pub fn auto_approved(mut self) -> Self {
        self.requires_approval = false;
        self
    }

    /// Description in the requested locale, falling back to English.
    pub fn localized_description(&self, locale: Locale) -> &str {
        match (locale, &self.description_de) {
            (Locale::De, Some(de)) => de,
            _ => &self.description,
        }
    }

    /// Names of the required parameters, in declaration order.
    pub fn required_params(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Build the function-calling schema the model sees.
    pub fn to_schema(&self) -> ToolSchema {
        let mut properties = Map::new();
        for param in &self.parameters {
            let mut property = Map::new();
            property.insert("type".into(), Value::from(param.param_type.as_str()));
            property.insert("description".into(), Value::from(param.description.clone()));
            if let Some(default) = &param.default {
                property.insert("default".into(), default.clone());
            }
            properties.insert(param.name.clone(), Value::Object(property));
        }

        ToolSchema {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": self.required_params(),
            }),
        }
    }
}

/// Tool description in the model's function-calling format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Catalog of tool definitions, keyed by name.
///
/// Registration order is preserved for [`list`](Self::list) and
/// [`export_for_model`](Self::export_for_model). Registering a name twice
/// replaces the earlier definition in place.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the standard tool catalog.
    pub fn with_builtin_tools() -> Self {
        let mut registry = Self::new();
        for def in builtin_tools() {
            registry.register(def);
        }
        registry
    }

    pub fn register(&mut self, def: ToolDefinition) {
        match self.index.get(&def.name) {
            Some(&pos) => self.tools[pos] = def,
            None => {
                self.index.insert(def.name.clone(), self.tools.len());
                self.tools.push(def);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.index.get(name).map(|&pos| &self.tools[pos])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn list(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn export_for_model(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(ToolDefinition::to_schema).collect()
    }
}

/// The standard tool catalog.
pub fn builtin_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new("file_read", "Read the contents of a file", RiskLevel::Medium)
            .with_description_de("Liest den Inhalt einer Datei")
            .with_param("path", ParamType::String, "Path to the file", true)
            .with_default_param("encoding", ParamType::String, "File encoding", json!("utf-8")),
        ToolDefinition::new(
            "file_write",
            "Write content to a file (only in the outputs directory)",
            RiskLevel::Medium,
        )
        .with_description_de("Schreibt Inhalt in eine Datei (nur im Ausgabeverzeichnis)")
        .with_param("filename", ParamType::String, "Filename inside the outputs directory", true)
        .with_param("content", ParamType::String, "Content to write", true),
        ToolDefinition::new("file_list", "List files in a directory", RiskLevel::Low)
            .with_description_de("Listet Dateien in einem Verzeichnis auf")
            .with_param("path", ParamType::String, "Directory path", true)
            .with_default_param("recursive", ParamType::Boolean, "List recursively", json!(false)),
        ToolDefinition::new("web_fetch", "Fetch content from a URL", RiskLevel::Medium)
            .with_description_de("Ruft Inhalte von einer URL ab")
            .with_param("url", ParamType::String, "URL to fetch", true)
            .with_default_param("method", ParamType::String, "HTTP method", json!("GET")),
        ToolDefinition::new("web_search", "Search the web", RiskLevel::Low)
            .with_description_de("Durchsucht das Web")
            .with_param("query", ParamType::String, "Search query", true)
            .with_default_param("max_results", ParamType::Integer, "Maximum results", json!(5))
            .auto_approved(),
        ToolDefinition::new(
            "shell_execute",
            "Execute a shell command (whitelist only)",
            RiskLevel::High,
        )
        .with_description_de("Führt einen Shell-Befehl aus (nur Whitelist)")
        .with_param("command", ParamType::String, "Command to execute", true),
        ToolDefinition::new(
            "memory_save",
            "Save a fact to persistent memory for future conversations",
            RiskLevel::Low,
        )
        .with_description_de("Speichert einen Fakt im Langzeitgedächtnis")
        .with_param("key", ParamType::String, "Short topic or title for the memory", true)
        .with_param("content", ParamType::String, "The fact or information to remember", true)
        .with_param(
            "category",
            ParamType::String,
            "Optional category (e.g. 'preference', 'fact', 'project')",
            false,
        )
        .auto_approved(),
        ToolDefinition::new(
            "memory_search",
            "Search persistent memory for relevant facts",
            RiskLevel::Low,
        )
        .with_description_de("Durchsucht das Langzeitgedächtnis nach relevanten Fakten")
        .with_param("query", ParamType::String, "Search query", true)
        .auto_approved(),
        ToolDefinition::new("memory_delete", "Delete a memory entry by key", RiskLevel::Low)
            .with_description_de("Löscht einen Eintrag aus dem Langzeitgedächtnis")
            .with_param("key", ParamType::String, "The key of the memory to delete", true)
            .auto_approved(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn test_risk_level_parse_and_display() {
        assert_eq!("HIGH".parse::<RiskLevel>().unwrap(), RiskLevel::High);
        assert_eq!(RiskLevel::Critical.to_string(), "critical");
        assert!("extreme".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolDefinition::new("echo", "Echo", RiskLevel::Low));

        assert_eq!(registry.len(), 1);
        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_reregister_replaces_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolDefinition::new("a", "first", RiskLevel::Low));
        registry.register(ToolDefinition::new("b", "second", RiskLevel::Low));
        registry.register(ToolDefinition::new("a", "replaced", RiskLevel::High));

        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().description, "replaced");
        assert_eq!(registry.get("a").unwrap().risk_level, RiskLevel::High);
    }

    #[test]
    fn test_export_required_follows_flags() {
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolDefinition::new("t", "test", RiskLevel::Low)
                .with_param("z", ParamType::String, "z", true)
                .with_param("opt", ParamType::Integer, "optional", false)
                .with_param("a", ParamType::Boolean, "a", true),
        );

        let schema = &registry.export_for_model()[0];
        assert_eq!(schema.name, "t");
        assert_eq!(schema.parameters["type"], "object");
        assert_eq!(schema.parameters["required"], json!(["z", "a"]));
        assert_eq!(schema.parameters["properties"]["opt"]["type"], "integer");
    }

    #[test]
    fn test_export_includes_defaults() {
        let registry = ToolRegistry::with_builtin_tools();
        let schemas = registry.export_for_model();
        let file_read = schemas.iter().find(|s| s.name == "file_read").unwrap();

        assert_eq!(file_read.parameters["properties"]["encoding"]["default"], "utf-8");
        assert_eq!(file_read.parameters["required"], json!(["path"]));
    }

    #[test]
    fn test_export_no_params_has_empty_required() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolDefinition::new("noop", "Nothing", RiskLevel::Low));

        let schema = &registry.export_for_model()[0];
        assert_eq!(schema.parameters["required"], json!([]));
        assert_eq!(schema.parameters["properties"], json!({}));
    }

    #[test]
    fn test_builtin_catalog() {
        let registry = ToolRegistry::with_builtin_tools();
        assert_eq!(registry.len(), 9);

        let shell = registry.get("shell_execute").unwrap();
        assert_eq!(shell.risk_level, RiskLevel::High);
        assert!(shell.requires_approval);

        let search = registry.get("web_search").unwrap();
        assert!(!search.requires_approval);
    }

    #[test]
    fn test_localized_description() {
        let def = ToolDefinition::new("x", "English", RiskLevel::Low).with_description_de("Deutsch");
        assert_eq!(def.localized_description(Locale::En), "English");
        assert_eq!(def.localized_description(Locale::De), "Deutsch");

        let plain = ToolDefinition::new("y", "Only English", RiskLevel::Low);
        assert_eq!(plain.localized_description(Locale::De), "Only English");
    }

    #[test]
    fn test_definition_deserialize_defaults_to_requires_approval() {
        let def: ToolDefinition = serde_json::from_value(json!({
            "name": "custom",
            "description": "Custom tool",
            "risk_level": "medium"
        }))
        .unwrap();
        assert!(def.requires_approval);
        assert!(def.parameters.is_empty());
    }
}
