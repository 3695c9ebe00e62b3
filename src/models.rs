use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub key: String,
    pub name: String,
    #[serde(rename = "projectTypeKey", default)]
    pub project_type_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub key: String,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Client-side only; the backend never sees or sends it.
    #[serde(skip)]
    pub is_rewritten: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewrittenTicket {
    pub key: String,
    pub original_title: String,
    pub rewritten_title: String,
    pub rewritten_description: String,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_context: Option<String>,
}

impl RewrittenTicket {
    /// Plain-text rendering used for the clipboard.
    pub fn to_clipboard_text(&self) -> String {
        let mut text = format!("{}\n\n{}", self.rewritten_title, self.rewritten_description);
        if !self.acceptance_criteria.is_empty() {
            text.push_str("\n\nAcceptance Criteria:");
            for (i, criterion) in self.acceptance_criteria.iter().enumerate() {
                text.push_str(&format!("\n{}. {}", i + 1, strip_numbering(criterion)));
            }
        }
        text
    }
}

/// The backend already numbers criteria ("1. Foo"); avoid "1. 1. Foo".
pub fn strip_numbering(criterion: &str) -> &str {
    let trimmed = criterion.trim_start();
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 && trimmed[digits..].starts_with('.') {
        trimmed[digits + 1..].trim_start()
    } else {
        trimmed
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateTicketsRequest<'a> {
    pub tickets: &'a [RewrittenTicket],
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdateOutcome {
    pub success: bool,
    #[serde(default)]
    pub updated_tickets: Vec<String>,
    #[serde(default)]
    pub failed_tickets: Vec<FailedTicket>,
}

impl UpdateOutcome {
    pub fn failed_keys(&self) -> String {
        self.failed_tickets
            .iter()
            .map(|t| t.key.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FailedTicket {
    pub key: String,
    #[serde(default)]
    pub error: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for id, got {other}"
        ))),
    }
}
