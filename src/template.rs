//! Template interpolation for report queries
//!
//! Handles `{{ variable }}` interpolation in GAQL text.
//! Supports nested access like `{{ config.customer_id }}` and bare names
//! such as `{{ start_date }}`, which resolve against the run variables
//! first and the config second.

use crate::error::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ variable.path }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}").unwrap()
});

/// Context for template interpolation
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Tap configuration values
    pub config: Value,
    /// Run variables (date range, customer id)
    pub vars: Value,
}

impl TemplateContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create context with config values
    pub fn with_config(config: Value) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Set config values
    pub fn set_config(&mut self, config: Value) -> &mut Self {
        self.config = config;
        self
    }

    /// Set run variables
    pub fn set_vars(&mut self, vars: Value) -> &mut Self {
        self.vars = vars;
        self
    }

    /// Get a value by path (e.g., "config.customer_id")
    pub fn get(&self, path: &str) -> Option<&Value> {
        let parts: Vec<&str> = path.split('.').collect();

        let root = match parts[0] {
            "config" => &self.config,
            "vars" => &self.vars,
            _ => {
                return get_nested_value(&self.vars, &parts)
                    .or_else(|| get_nested_value(&self.config, &parts));
            }
        };

        get_nested_value(root, &parts[1..])
    }
}

/// Get a nested value from a JSON value by path
fn get_nested_value<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for part in path {
        match current {
            Value::Object(map) => {
                current = map.get(*part)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Render a template string with the given context
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut result = template.to_string();
    let mut errors = Vec::new();

    for cap in TEMPLATE_REGEX.captures_iter(template) {
        let full_match = &cap[0];
        let var_path = &cap[1];

        match ctx.get(var_path) {
            Some(value) => {
                result = result.replace(full_match, &value_to_string(value));
            }
            None => errors.push(var_path.to_string()),
        }
    }

    if errors.is_empty() {
        Ok(result)
    } else {
        Err(Error::undefined_var(errors.join(", ")))
    }
}

/// Convert a JSON value to a string for template substitution
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
