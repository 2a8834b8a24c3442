//! Engine events emitted for UI and observability.
//!
//! This is intentionally lightweight so the controller can emit events
//! without blocking on slow subscribers: sends over the broadcast channel
//! are best-effort and lossy for receivers that lag behind.

use crate::controller::ControllerState;
use crate::message::{Message, MessageId};

/// Events that describe what the conversation engine is doing "right now".
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A message was appended to the store.
    MessageAppended(Message),
    /// A message was replaced in place (placeholder resolution).
    MessageReplaced {
        /// Id of the message that was replaced.
        id: MessageId,
        /// Its new contents.
        message: Message,
    },
    /// The store was reset to a single banner message.
    StoreReset(Message),
    /// The generation controller changed state.
    StateChanged {
        /// The controller's new state.
        state: ControllerState,
    },
    /// A generation attempt failed; carries the user-facing notice that
    /// was also written into the conversation.
    GenerationFailed {
        /// User-readable failure notice.
        notice: String,
    },
}
