//! Test case records: the unit of generated output.
//!
//! Backends emit loosely shaped JSON objects. [`TestCaseRecord::from_draft`]
//! turns one of those into a typed record, applying the documented defaults
//! for anything missing or malformed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name given to records whose name is missing or empty after cleanup.
pub const DEFAULT_RECORD_NAME: &str = "Scenario";
pub const DEFAULT_CATEGORY: &str = "Functional";
pub const DEFAULT_CONFIDENCE: f64 = 0.85;

/// Test priority. Declaration order is severity order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Critical=0 … Low=3
    pub fn severity(self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    /// Case-insensitive; unrecognised values map to `Medium`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" | "blocker" | "p0" => Priority::Critical,
            "high" | "major" | "p1" => Priority::High,
            "low" | "minor" | "trivial" | "p3" => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

/// Estimated implementation complexity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Complexity {
    Simple,
    #[default]
    Medium,
    Complex,
}

impl Complexity {
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "simple" | "low" | "easy" => Complexity::Simple,
            "complex" | "high" | "hard" => Complexity::Complex,
            _ => Complexity::Medium,
        }
    }
}

/// A generated test scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseRecord {
    #[serde(alias = "test_case_name", default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub complexity: Complexity,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(alias = "confidence_score", default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(alias = "model_source", default)]
    pub provenance: String,
    #[serde(default)]
    pub reasoning: Option<String>,
}

fn default_name() -> String {
    DEFAULT_RECORD_NAME.to_string()
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

impl TestCaseRecord {
    pub fn new(name: impl Into<String>, provenance: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            steps: String::new(),
            priority: Priority::default(),
            complexity: Complexity::default(),
            category: default_category(),
            confidence: DEFAULT_CONFIDENCE,
            code: None,
            provenance: provenance.into(),
            reasoning: None,
        }
    }

    /// Build a record from one draft object emitted by a backend.
    ///
    /// Returns `None` for anything that is not a JSON object. Field names of
    /// both the backend schema (`test_case_name`, `confidence_score`) and the
    /// record schema (`name`, `confidence`) are accepted.
    pub fn from_draft(draft: &Value, provenance: &str) -> Option<Self> {
        let obj = draft.as_object()?;

        let name = text_field(obj, &["test_case_name", "name", "title"])
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(default_name);

        let confidence = number_field(obj, &["confidence_score", "confidence"])
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_CONFIDENCE);

        Some(Self {
            name,
            description: text_field(obj, &["description"]).unwrap_or_default(),
            steps: text_field(obj, &["steps"]).unwrap_or_default(),
            priority: text_field(obj, &["priority"])
                .map(|p| Priority::parse_lenient(&p))
                .unwrap_or_default(),
            complexity: text_field(obj, &["complexity"])
                .map(|c| Complexity::parse_lenient(&c))
                .unwrap_or_default(),
            category: text_field(obj, &["category"])
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(default_category),
            confidence,
            code: text_field(obj, &["code"]).filter(|c| !c.trim().is_empty()),
            provenance: provenance.to_string(),
            reasoning: text_field(obj, &["reasoning"]).filter(|r| !r.trim().is_empty()),
        })
    }
}

/// First present key rendered as text. Arrays of strings become numbered lines.
fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Value::Null | Value::Object(_) => None,
    })
}

fn number_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok().map(|v| {
            if v > 1.0 {
                v / 100.0
            } else {
                v
            }
        }),
        _ => None,
    })
}
