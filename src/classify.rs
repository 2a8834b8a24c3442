//! Classification of text replies.
//!
//! The model signals an image request by replying with exactly
//! `[GENERATE_IMAGE: <prompt>]` and nothing else. Matching is strict:
//! the trimmed reply must start with the instruction prefix and end with
//! the closing bracket. Partial or malformed instruction syntax — a
//! prefix mid-sentence, trailing text after the bracket — is treated as
//! plain text verbatim, with no partial extraction.

/// The literal instruction prefix the model uses to request an image.
pub const IMAGE_INSTRUCTION_PREFIX: &str = "[GENERATE_IMAGE:";

/// The instruction's closing token.
pub const IMAGE_INSTRUCTION_SUFFIX: &str = "]";

/// A classified text reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// An ordinary text reply, carried verbatim.
    PlainText(String),
    /// An inline image-generation instruction.
    ImageRequest {
        /// The prompt between the instruction brackets, trimmed.
        prompt: String,
    },
}

/// Classify a raw text reply.
///
/// The reply is an image request if and only if, after trimming
/// surrounding whitespace, it starts with [`IMAGE_INSTRUCTION_PREFIX`]
/// and ends with [`IMAGE_INSTRUCTION_SUFFIX`]. Everything else is plain
/// text.
pub fn classify(reply: &str) -> Reply {
    let trimmed = reply.trim();
    if let Some(rest) = trimmed.strip_prefix(IMAGE_INSTRUCTION_PREFIX) {
        if let Some(prompt) = rest.strip_suffix(IMAGE_INSTRUCTION_SUFFIX) {
            return Reply::ImageRequest {
                prompt: prompt.trim().to_string(),
            };
        }
    }
    Reply::PlainText(reply.to_string())
}
