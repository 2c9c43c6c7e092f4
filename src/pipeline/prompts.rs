//! Prompt templates

/// Placeholder replaced by the transcript text
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Default summary prompt
pub const DEFAULT_SUMMARY_PROMPT: &str =
    "Please provide a concise summary of the following transcript:\n\n{text}\n\nSummary:";

/// Default action-item prompt
///
/// Ends inside an opened JSON array, so responses usually continue it.
pub const DEFAULT_ACTION_ITEMS_PROMPT: &str = "Please extract a list of action items from the following transcript and format as a json array.\n\
Each json object should have an assignee and a task. If there is no assignee then use \"none\".\n\
If there are no action items then output an empty json array.\n\
Format them as a json array:\n\n{text}\n\n Action Items: [";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    #[error("prompt template must contain the {{text}} placeholder")]
    MissingPlaceholder,
}

/// Prompt with a `{text}` substitution point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Validate and wrap a template
    pub fn new(template: impl Into<String>) -> Result<Self, PromptError> {
        let template = template.into();
        if !template.contains(TEXT_PLACEHOLDER) {
            return Err(PromptError::MissingPlaceholder);
        }
        Ok(Self { template })
    }

    pub fn summary() -> Self {
        Self {
            template: DEFAULT_SUMMARY_PROMPT.to_string(),
        }
    }

    pub fn action_items() -> Self {
        Self {
            template: DEFAULT_ACTION_ITEMS_PROMPT.to_string(),
        }
    }

    /// Substitute the transcript into every placeholder
    pub fn render(&self, text: &str) -> String {
        self.template.replace(TEXT_PLACEHOLDER, text)
    }
}
