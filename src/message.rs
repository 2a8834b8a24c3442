//! Conversation message types.
//!
//! A [`Message`] is one turn of the conversation: user input (optionally
//! with an attached image) or assistant output (text, a generated image,
//! or an in-flight placeholder). Messages are the single source of truth
//! for what is displayed and what is sent as model context.
//!
//! # Examples
//!
//! ```
//! use harium::message::{Message, MessageStatus, Role};
//!
//! let user = Message::user("Hello");
//! assert_eq!(user.role, Role::User);
//! assert_eq!(user.status, MessageStatus::Complete);
//!
//! let placeholder = Message::assistant_pending();
//! assert!(placeholder.is_placeholder());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Unique, time-ordered message identifier.
pub type MessageId = String;

/// Monotonic suffix so two messages created in the same millisecond still
/// get distinct, ordered ids.
static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a unique message ID.
///
/// Format: `msg_{unix_millis}_{sequence:06}`
pub fn generate_message_id() -> MessageId {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let seq = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed) % 1_000_000;
    format!("msg_{now}_{seq:06}")
}

/// The role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User input.
    User,
    /// Assistant (model) output.
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Lifecycle state of an assistant turn.
///
/// User turns are always `Complete`. Assistant turns start as a
/// `PendingText` placeholder and resolve to exactly one terminal state,
/// unless the user stopped generation first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Awaiting the text-generation reply.
    PendingText,
    /// Awaiting the image-generation reply.
    PendingImage,
    /// Terminal: content (and/or image) is final.
    Complete,
    /// Terminal: generation failed; content is a user-facing notice.
    Errored,
}

/// A user-supplied image attached to a message.
///
/// Immutable once the message is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Image data as a `data:<mime>;base64,...` URI.
    pub data_uri: String,
    /// Display name (e.g. the original file name).
    pub name: String,
}

impl Attachment {
    /// Create an attachment from a data URI and display name.
    pub fn new(data_uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            data_uri: data_uri.into(),
            name: name.into(),
        }
    }
}

/// An assistant-generated image plus the prompt that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Image data as a `data:<mime>;base64,...` URI.
    pub data_uri: String,
    /// The prompt extracted from the model's image instruction.
    pub prompt: String,
}

impl GeneratedImage {
    /// Create a generated-image reference.
    pub fn new(data_uri: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            data_uri: data_uri.into(),
            prompt: prompt.into(),
        }
    }
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique, time-ordered identifier.
    pub id: MessageId,
    /// Who produced this turn.
    pub role: Role,
    /// Plain or marked-up text; may be empty for image-only turns.
    pub content: String,
    /// User-supplied image, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    /// Assistant-generated image, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_image: Option<GeneratedImage>,
    /// Lifecycle state.
    pub status: MessageStatus,
    /// Synthetic banner (welcome/reset) — displayed but never sent as
    /// model context.
    #[serde(default)]
    pub synthetic: bool,
}

impl Message {
    /// Create a complete user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: generate_message_id(),
            role: Role::User,
            content: content.into(),
            attachment: None,
            generated_image: None,
            status: MessageStatus::Complete,
            synthetic: false,
        }
    }

    /// Create a complete user message carrying an attachment.
    pub fn user_with_attachment(content: impl Into<String>, attachment: Attachment) -> Self {
        Self {
            attachment: Some(attachment),
            ..Self::user(content)
        }
    }

    /// Create an assistant placeholder awaiting the text reply.
    pub fn assistant_pending() -> Self {
        Self {
            id: generate_message_id(),
            role: Role::Assistant,
            content: String::new(),
            attachment: None,
            generated_image: None,
            status: MessageStatus::PendingText,
            synthetic: false,
        }
    }

    /// Create a complete assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            status: MessageStatus::Complete,
            content: content.into(),
            ..Self::assistant_pending()
        }
    }

    /// Create a synthetic banner message (welcome / context cleared).
    ///
    /// Banners are shown to the user but excluded from model context.
    pub fn banner(content: impl Into<String>) -> Self {
        Self {
            synthetic: true,
            ..Self::assistant(content)
        }
    }

    /// Replace this message's terminal content in place, keeping its id.
    ///
    /// Used when a placeholder resolves: position in the store is
    /// preserved because the id is preserved.
    pub fn resolved(&self, content: impl Into<String>, status: MessageStatus) -> Self {
        Self {
            id: self.id.clone(),
            role: self.role,
            content: content.into(),
            attachment: self.attachment.clone(),
            generated_image: self.generated_image.clone(),
            status,
            synthetic: self.synthetic,
        }
    }

    /// Transition this placeholder to `PendingImage`, recording the prompt.
    pub fn awaiting_image(&self, prompt: impl Into<String>) -> Self {
        let mut next = self.resolved(String::new(), MessageStatus::PendingImage);
        next.generated_image = Some(GeneratedImage::new(String::new(), prompt));
        next
    }

    /// Resolve this placeholder with a generated image.
    pub fn with_image(&self, image: GeneratedImage) -> Self {
        let mut next = self.resolved(String::new(), MessageStatus::Complete);
        next.generated_image = Some(image);
        next
    }

    /// Returns true if this is an in-flight placeholder.
    pub fn is_placeholder(&self) -> bool {
        matches!(
            self.status,
            MessageStatus::PendingText | MessageStatus::PendingImage
        )
    }

    /// Returns true if this turn has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, MessageStatus::Complete | MessageStatus::Errored)
    }

    /// The prompt recorded on a `PendingImage` placeholder, if any.
    pub fn image_prompt(&self) -> Option<&str> {
        self.generated_image.as_ref().map(|img| img.prompt.as_str())
    }
}
