//! Harium: conversation orchestration for a chat assistant with inline
//! image generation, progressive display, and an optional speech
//! side-channel.
//!
//! # Architecture
//!
//! One user submission flows through independent components:
//! - **Message store**: Ordered history, the single source of truth for
//!   display and model context (`store`)
//! - **Context assembly**: Pure derivation of the model-call payload,
//!   excluding placeholders and synthetic banners (`context`)
//! - **Gateways**: Text and image generation behind trait contracts,
//!   with a Google generative-language adapter (`gateway`, `providers`)
//! - **Classification**: Detects the inline `[GENERATE_IMAGE: ...]`
//!   instruction in finalized replies (`classify`)
//! - **Generation controller**: The submission state machine with
//!   cooperative cancellation (`controller`)
//! - **Progressive display**: Timed character-by-character reveal of
//!   finalized replies (`display`)
//! - **Speech side-channel**: Mirrors finalized replies to a pluggable
//!   speech channel in stripped plain-text form (`speech`)
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use harium::config::EngineConfig;
//! use harium::controller::GenerationController;
//! use harium::message::Message;
//! use harium::providers::{GoogleAiClient, GoogleAiConfig};
//! use harium::store::MessageStore;
//!
//! # fn main() -> Result<(), harium::error::GatewayError> {
//! let config = EngineConfig::default();
//! let client = Arc::new(GoogleAiClient::new(GoogleAiConfig::from_provider(
//!     &config.provider,
//! )?));
//! let store = MessageStore::with_banner(Message::banner(&config.copy.welcome_banner));
//! let controller = GenerationController::new(store, client.clone(), client)
//!     .with_copy(config.copy.clone())
//!     .with_reveal(&config.reveal);
//!
//! controller.submit("Hello!", None);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod config;
pub mod context;
pub mod controller;
pub mod display;
pub mod error;
pub mod events;
pub mod gateway;
pub mod logging;
pub mod message;
pub mod providers;
pub mod speech;
pub mod store;

pub use classify::Reply;
pub use config::EngineConfig;
pub use controller::{ControllerState, GenerationController};
pub use error::{GatewayError, Result};
pub use events::EngineEvent;
pub use message::{Attachment, GeneratedImage, Message, MessageStatus, Role};
pub use store::MessageStore;
