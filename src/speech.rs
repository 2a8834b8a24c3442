//! Speech side-channel: mirrors finalized replies to audio output.
//!
//! The engine depends only on the [`SpeechChannel`] capability
//! (`speak`/`cancel`), never on a concrete platform speech object. The
//! [`SpeechSidecar`] decides *what* is spoken: finalized text replies
//! only, in stripped plain-text form, with any previous utterance
//! cancelled first. It is fire-and-forget relative to the generation
//! controller — it never blocks or alters conversation state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

use crate::classify::{Reply, classify};
use crate::message::Message;

/// Minimal speech capability.
///
/// Implementations are expected to be non-blocking: `speak` queues an
/// utterance and returns, `cancel` stops the active utterance (if any)
/// immediately.
pub trait SpeechChannel: Send + Sync {
    /// Begin speaking the given plain text.
    fn speak(&self, text: &str);

    /// Cancel the active utterance, if any.
    fn cancel(&self);
}

/// Derive the spoken form of a reply.
///
/// Strips formatting the voice should not read aloud: bold markers and
/// other markdown emphasis, fenced code blocks (skipped entirely), and
/// the inline image-generation instruction (an image request has no
/// spoken form at all).
pub fn spoken_text(content: &str) -> String {
    if let Reply::ImageRequest { .. } = classify(content) {
        return String::new();
    }

    let mut out = String::new();
    let mut in_code_block = false;
    for event in Parser::new(content) {
        match event {
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            Event::Text(text) if !in_code_block => out.push_str(&text),
            Event::Code(code) => out.push_str(&code),
            Event::SoftBreak | Event::HardBreak => out.push(' '),
            Event::End(TagEnd::Paragraph | TagEnd::Item | TagEnd::Heading(_)) => out.push(' '),
            _ => {}
        }
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drives a [`SpeechChannel`] from finalized assistant messages.
///
/// Cheaply cloneable; clones share enablement state and the channel.
#[derive(Clone)]
pub struct SpeechSidecar {
    channel: Arc<dyn SpeechChannel>,
    enabled: Arc<AtomicBool>,
}

impl SpeechSidecar {
    /// Create a sidecar over the given channel, initially disabled.
    pub fn new(channel: Arc<dyn SpeechChannel>) -> Self {
        Self {
            channel,
            enabled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Enable or disable the side-channel.
    ///
    /// Disabling cancels the active utterance immediately.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.channel.cancel();
        }
    }

    /// Returns whether the side-channel is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Speak a newly finalized assistant message.
    ///
    /// Skipped when disabled, for in-flight placeholders, and for
    /// image-only messages (nothing to say). Any previously speaking
    /// utterance is cancelled before the new one starts.
    pub fn speak_message(&self, message: &Message) {
        if !self.is_enabled() || message.is_placeholder() {
            return;
        }
        let text = spoken_text(&message.content);
        if text.is_empty() {
            return;
        }
        self.channel.cancel();
        self.channel.speak(&text);
    }
}

impl std::fmt::Debug for SpeechSidecar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechSidecar")
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}
