//! Model gateway contracts.
//!
//! The engine treats text and image generation as opaque external
//! collaborators: it only knows these request/response contracts. The
//! concrete HTTP adapter lives in [`crate::providers`]; tests substitute
//! scripted implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::ContextRequest;
use crate::error::GatewayError;

/// A finalized text reply from the text-generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextReply {
    /// The raw reply text (may contain an inline image instruction).
    pub text: String,
}

impl TextReply {
    /// Create a reply from text.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A generated image from the image-generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReply {
    /// Image data as a `data:<mime>;base64,...` URI.
    pub data_uri: String,
}

impl ImageReply {
    /// Create a reply from a data URI.
    pub fn new(data_uri: impl Into<String>) -> Self {
        Self {
            data_uri: data_uri.into(),
        }
    }
}

/// Text-generation service contract.
#[async_trait]
pub trait TextGateway: Send + Sync {
    /// Generate a reply for the given conversation context.
    async fn generate(&self, request: &ContextRequest) -> Result<TextReply, GatewayError>;
}

/// Image-generation service contract.
#[async_trait]
pub trait ImageGateway: Send + Sync {
    /// Generate an image for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<ImageReply, GatewayError>;
}
