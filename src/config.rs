use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Read-only view over the nested configuration mapping.
///
/// Only `prefix`, `important` and `separator` are validated up front; every
/// other key is reached through dotted-path lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    root: Value,
    prefix: String,
    important: Important,
    separator: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Important {
    #[default]
    Disabled,
    /// `important = true`: every utility declaration gets `!important`.
    Flag,
    /// `important = "#app"`: utilities are scoped under this selector.
    Selector(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct RecognizedKeys {
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    important: Option<ImportantSetting>,
    #[serde(default)]
    separator: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImportantSetting {
    Flag(bool),
    Selector(String),
}

impl Configuration {
    pub fn new(root: Value) -> Result<Self, ConfigError> {
        let root = match root {
            Value::Null => Value::Object(Map::new()),
            Value::Object(_) => root,
            _ => {
                return Err(ConfigError {
                    message: "configuration must be a mapping".to_string(),
                });
            }
        };

        let keys = RecognizedKeys::deserialize(&root).map_err(|err| ConfigError {
            message: format!("invalid configuration: {}", err),
        })?;

        let important = match keys.important {
            None | Some(ImportantSetting::Flag(false)) => Important::Disabled,
            Some(ImportantSetting::Flag(true)) => Important::Flag,
            Some(ImportantSetting::Selector(selector)) if selector.trim().is_empty() => {
                Important::Disabled
            }
            Some(ImportantSetting::Selector(selector)) => Important::Selector(selector),
        };

        Ok(Self {
            root,
            prefix: keys.prefix.unwrap_or_default(),
            important,
            separator: keys.separator.unwrap_or_else(default_separator),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn important(&self) -> &Important {
        &self.important
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Dotted-path lookup (`theme.colors.gray.100`). Numeric segments index
    /// into sequences and `a[0]` is read as `a.0`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path
            .split(['.', '[', ']'])
            .filter(|segment| !segment.is_empty())
            .peekable();
        segments.peek()?;

        segments.try_fold(&self.root, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|idx| items.get(idx)),
            _ => None,
        })
    }

    pub fn value(&self, path: &str, default: Value) -> Value {
        self.get(path).cloned().unwrap_or(default)
    }

    /// Lookup under `theme.`. A mapping with a `default` key resolves to
    /// that entry, so `colors.gray` can stand for the bare gray shade.
    pub fn theme(&self, path: &str, default: Value) -> Value {
        match self.value(&format!("theme.{}", path), default) {
            Value::Object(mut map) if map.contains_key("default") => {
                map.remove("default").unwrap_or(Value::Null)
            }
            other => other,
        }
    }

    /// Variant names enabled for a utility family. A sequence at the top of
    /// `variants` applies to every family.
    pub fn variants(&self, path: &str, default: &[&str]) -> Vec<String> {
        let found = match self.root.get("variants") {
            Some(global @ Value::Array(_)) => Some(global),
            _ => self.get(&format!("variants.{}", path)),
        };

        match found {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => default.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            root: Value::Object(Map::new()),
            prefix: String::new(),
            important: Important::Disabled,
            separator: default_separator(),
        }
    }
}

impl TryFrom<Value> for Configuration {
    type Error = ConfigError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

pub fn load(path: &Path) -> Result<Configuration, ConfigError> {
    let text = fs::read_to_string(path).map_err(|err| ConfigError {
        message: format!("failed to read config {}: {}", path.display(), err),
    })?;
    let root: Value = toml::from_str(&text).map_err(|err| ConfigError {
        message: format!("failed to parse config {}: {}", path.display(), err),
    })?;
    Configuration::new(root).map_err(|err| ConfigError {
        message: format!("{}: {}", path.display(), err.message),
    })
}

fn default_separator() -> String {
    ":".to_string()
}
