//! Concrete gateway adapters.
//!
//! Each adapter implements the [`TextGateway`](crate::gateway::TextGateway)
//! and/or [`ImageGateway`](crate::gateway::ImageGateway) contracts over a
//! real service. Request building and response parsing are kept as pure
//! functions so they can be tested without a network.

pub mod googleai;

pub use googleai::{GoogleAiClient, GoogleAiConfig};
