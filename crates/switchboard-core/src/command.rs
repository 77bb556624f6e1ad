//! Command templates: how a cataloged action becomes a concrete process.
//!
//! `args` may reference validated parameters with `{{name}}` placeholders.
//! Parameters not consumed by a placeholder are appended as `--name=value`
//! flags in name order.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_-]+)\s*\}\}").expect("valid regex"));

/// The per-action command mapping from the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    pub program: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

/// A fully rendered command, ready for the process runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl CommandTemplate {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Render placeholders and append leftover parameters as flags.
    pub fn render(&self, params: &Map<String, Value>) -> CommandSpec {
        let mut consumed = BTreeSet::new();

        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                PLACEHOLDER_RE
                    .replace_all(arg, |caps: &regex::Captures| {
                        let name = &caps[1];
                        consumed.insert(name.to_string());
                        params.get(name).map(format_value).unwrap_or_default()
                    })
                    .into_owned()
            })
            .collect();

        let mut leftovers: Vec<(&String, &Value)> = params
            .iter()
            .filter(|(name, value)| !value.is_null() && !consumed.contains(name.as_str()))
            .collect();
        leftovers.sort_by(|a, b| a.0.cmp(b.0));
        args.extend(
            leftovers
                .into_iter()
                .map(|(name, value)| format!("--{name}={}", format_value(value))),
        );

        CommandSpec {
            program: self.program.clone(),
            args,
            env: self.env.clone(),
        }
    }
}

/// Textual form of a parameter value on a command line.
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(items) if items.iter().all(|v| !v.is_array() && !v.is_object()) => items
            .iter()
            .map(format_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
