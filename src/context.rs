//! Context assembly: deriving the model-call payload from the store.
//!
//! [`assemble`] is pure and deterministic for a given store snapshot —
//! the same snapshot always yields the same payload, which is what makes
//! re-assembly after a cancellation safe and the exclusion rules easy to
//! test. Placeholders and synthetic banners never reach the model.

use serde::{Deserialize, Serialize};

use crate::message::{Attachment, Message, Role};

/// One prior turn in provider-neutral form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced the turn.
    pub role: Role,
    /// The turn's text content.
    pub content: String,
}

/// The payload handed to the text-generation gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRequest {
    /// Prior conversation turns, oldest first.
    pub turns: Vec<Turn>,
    /// The new user input (final turn).
    pub user_input: String,
    /// Optional image attached to the new input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

/// Build the model-call payload from a store snapshot plus the new input.
///
/// Excluded from the prior turns:
/// - synthetic banners (welcome / "context cleared" messages),
/// - in-flight placeholders (`PendingText` / `PendingImage`).
///
/// Everything else is carried verbatim, including errored assistant
/// notices — they are part of what the user saw.
pub fn assemble(
    messages: &[Message],
    user_input: &str,
    attachment: Option<Attachment>,
) -> ContextRequest {
    let turns = messages
        .iter()
        .filter(|m| !m.synthetic && !m.is_placeholder())
        .map(|m| Turn {
            role: m.role,
            content: m.content.clone(),
        })
        .collect();

    ContextRequest {
        turns,
        user_input: user_input.to_string(),
        attachment,
    }
}

/// Flatten prior turns into a `role: content` transcript block.
///
/// This is the textual form the text-generation prompt embeds under a
/// "Previous conversation:" heading.
pub fn flatten_history(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| format!("{}: {}", t.role, t.content))
        .collect::<Vec<_>>()
        .join("\n")
}
