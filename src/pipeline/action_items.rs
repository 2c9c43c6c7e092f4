//! Action-item extraction from a language-model response

use serde_json::{json, Value};
use tracing::{debug, warn};

/// Label some models echo before the array
const LABEL: &str = "Action Items:";

/// Returned when a response cannot be read as a list of objects
pub fn fallback_action_items() -> Value {
    json!([{"Assignee": "None", "Task": ""}])
}

/// Parse a response into a JSON array of action-item objects
///
/// Accepts an optional `Action Items:` label, Markdown code fences, a
/// response that continues an already opened array, and prose around the
/// array. Anything else yields [`fallback_action_items`].
pub fn parse_action_items(response: &str) -> Value {
    let cleaned = strip_code_fence(response.replace(LABEL, "").trim()).trim().to_string();

    let mut candidates = vec![cleaned.clone()];
    if !cleaned.starts_with('[') {
        candidates.push(format!("[{}", cleaned));
    }
    if let (Some(start), Some(end)) = (cleaned.find('['), cleaned.rfind(']')) {
        if start < end {
            candidates.push(cleaned[start..=end].to_string());
        }
    }

    for candidate in &candidates {
        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Array(items)) if items.iter().all(Value::is_object) => {
                debug!(count = items.len(), "Parsed action items");
                return Value::Array(items);
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Action-item candidate is not JSON"),
        }
    }

    warn!("Could not parse action items, using fallback");
    fallback_action_items()
}

/// Remove a surrounding ```` ``` ```` fence (with optional language tag)
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body)
}
