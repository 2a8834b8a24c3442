//! The generation controller: one user submission in, zero or more
//! gateway calls out.
//!
//! A submission appends the user turn and an assistant placeholder, calls
//! the text gateway, and either finalizes the reply (revealing it into
//! the placeholder character by character) or forks into an image
//! sub-request when the reply carries the inline image instruction.
//!
//! Cancellation is cooperative: each submission captures a fresh
//! [`CancellationToken`], and every asynchronous continuation checks it
//! before touching the store or the controller state. In-flight gateway
//! calls are not aborted at the transport level; their results are simply
//! discarded when stale, so a slow response can never resurrect a
//! conversation the user has stopped or cleared.
//!
//! All gateway failures are converted to terminal message states at this
//! boundary — no error crosses into the store or the display layer.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::classify::{Reply, classify};
use crate::config::{CopyConfig, RevealConfig};
use crate::context::assemble;
use crate::display::RevealTask;
use crate::events::EngineEvent;
use crate::gateway::{ImageGateway, TextGateway};
use crate::message::{Attachment, GeneratedImage, Message, MessageStatus};
use crate::speech::SpeechSidecar;
use crate::store::MessageStore;

/// The controller's current state, for UI rendering.
///
/// `Stopped` is transient: `stop()` reports it and immediately returns
/// the controller to `Idle` so the input stays usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No generation in flight; submissions are accepted.
    Idle,
    /// A submission was accepted and is being prepared.
    Submitting,
    /// Waiting on the text-generation gateway (or revealing its reply).
    AwaitingText,
    /// Waiting on the image-generation gateway.
    AwaitingImage,
    /// The user stopped generation; reported once, then `Idle`.
    Stopped,
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Submitting => write!(f, "submitting"),
            Self::AwaitingText => write!(f, "awaiting-text"),
            Self::AwaitingImage => write!(f, "awaiting-image"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

struct Submission {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Orchestrates one conversation against the text and image gateways.
///
/// Cheaply cloneable; clones share the store, state, and in-flight
/// submission.
#[derive(Clone)]
pub struct GenerationController {
    store: MessageStore,
    text_gateway: Arc<dyn TextGateway>,
    image_gateway: Arc<dyn ImageGateway>,
    copy: CopyConfig,
    char_delay: Duration,
    speech: Option<SpeechSidecar>,
    state: Arc<RwLock<ControllerState>>,
    current: Arc<Mutex<Option<Submission>>>,
    events: Option<broadcast::Sender<EngineEvent>>,
}

impl GenerationController {
    /// Create a controller over the given store and gateways.
    pub fn new(
        store: MessageStore,
        text_gateway: Arc<dyn TextGateway>,
        image_gateway: Arc<dyn ImageGateway>,
    ) -> Self {
        Self {
            store,
            text_gateway,
            image_gateway,
            copy: CopyConfig::default(),
            char_delay: Duration::from_millis(RevealConfig::default().char_delay_ms),
            speech: None,
            state: Arc::new(RwLock::new(ControllerState::Idle)),
            current: Arc::new(Mutex::new(None)),
            events: None,
        }
    }

    /// Override the user-facing banner and notice copy.
    pub fn with_copy(mut self, copy: CopyConfig) -> Self {
        self.copy = copy;
        self
    }

    /// Set the per-character reveal delay.
    pub fn with_reveal(mut self, reveal: &RevealConfig) -> Self {
        self.char_delay = Duration::from_millis(reveal.char_delay_ms);
        self
    }

    /// Attach a speech sidecar; finalized text replies are mirrored to it.
    pub fn with_speech(mut self, speech: SpeechSidecar) -> Self {
        self.speech = Some(speech);
        self
    }

    /// Attach a broadcast sender for state-change and failure events.
    pub fn with_events(mut self, tx: broadcast::Sender<EngineEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// The controller's current state.
    pub fn state(&self) -> ControllerState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// The message store this controller mutates.
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Enable or disable the speech side-channel, if one is attached.
    pub fn set_speech_enabled(&self, enabled: bool) {
        if let Some(speech) = &self.speech {
            speech.set_enabled(enabled);
        }
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn set_state(&self, state: ControllerState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
        self.emit(EngineEvent::StateChanged { state });
    }

    /// Transition state only if this submission has not been superseded.
    fn set_state_if_live(&self, token: &CancellationToken, state: ControllerState) {
        if token.is_cancelled() {
            return;
        }
        self.set_state(state);
    }

    /// Submit user input, optionally with an attached image.
    ///
    /// Returns `true` if the submission was accepted. Rejected — silently,
    /// with no new message and no gateway call — when a generation is
    /// already in flight, or when the trimmed input is empty and there is
    /// no attachment.
    pub fn submit(&self, input: &str, attachment: Option<Attachment>) -> bool {
        let input = input.trim().to_string();
        if input.is_empty() && attachment.is_none() {
            return false;
        }
        if self.state() != ControllerState::Idle {
            debug!(state = %self.state(), "submission rejected while busy");
            return false;
        }

        self.set_state(ControllerState::Submitting);
        let token = CancellationToken::new();

        // Context is assembled from the snapshot taken before this turn
        // is appended; the new input travels as the final turn.
        let request = assemble(&self.store.all(), &input, attachment.clone());

        let user_message = match attachment {
            Some(att) => Message::user_with_attachment(input, att),
            None => Message::user(input),
        };
        self.store.append(user_message);

        let placeholder = Message::assistant_pending();
        let placeholder_id = placeholder.id.clone();
        self.store.append(placeholder);

        let controller = self.clone();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            controller
                .run_submission(task_token, request, placeholder_id)
                .await;
        });

        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = Some(Submission { token, handle });
        true
    }

    async fn run_submission(
        &self,
        token: CancellationToken,
        request: crate::context::ContextRequest,
        placeholder_id: String,
    ) {
        self.set_state_if_live(&token, ControllerState::AwaitingText);

        let reply = self.text_gateway.generate(&request).await;
        if token.is_cancelled() {
            debug!("discarding text reply for cancelled submission");
            return;
        }

        let reply = match reply {
            Ok(reply) => reply,
            Err(err) => {
                warn!(code = err.code(), error = %err, "text generation failed");
                self.fail_placeholder(&token, &placeholder_id, self.copy.text_failure_notice.clone());
                return;
            }
        };

        match classify(&reply.text) {
            Reply::PlainText(text) => {
                self.reveal_reply(&token, &placeholder_id, text).await;
            }
            Reply::ImageRequest { prompt } => {
                self.generate_image(&token, &placeholder_id, prompt).await;
            }
        }
    }

    /// Reveal a finalized text reply into the placeholder, then complete it.
    async fn reveal_reply(&self, token: &CancellationToken, placeholder_id: &str, text: String) {
        let Some(placeholder) = self.store.get(placeholder_id) else {
            // The store was reset while we were awaiting; nothing to do.
            return;
        };

        let store = self.store.clone();
        let frame_target = placeholder.clone();
        let reveal = RevealTask::new(self.char_delay, token.clone());
        let outcome = reveal
            .run(&text, |prefix| {
                store.replace(
                    &frame_target.id,
                    frame_target.resolved(prefix, MessageStatus::PendingText),
                );
            })
            .await;

        if !outcome.ran_to_completion {
            // Stopped mid-reveal: the placeholder keeps its last rendered
            // prefix; state was already handled by stop()/clear_context().
            return;
        }

        let finalized = placeholder.resolved(text, MessageStatus::Complete);
        self.store.replace(placeholder_id, finalized.clone());
        if let Some(speech) = &self.speech {
            speech.speak_message(&finalized);
        }
        self.set_state_if_live(token, ControllerState::Idle);
    }

    /// Fork into the image sub-request for an inline image instruction.
    async fn generate_image(&self, token: &CancellationToken, placeholder_id: &str, prompt: String) {
        let Some(placeholder) = self.store.get(placeholder_id) else {
            return;
        };

        self.store
            .replace(placeholder_id, placeholder.awaiting_image(&prompt));
        self.set_state_if_live(token, ControllerState::AwaitingImage);

        let image = self.image_gateway.generate(&prompt).await;
        if token.is_cancelled() {
            debug!("discarding image reply for cancelled submission");
            return;
        }

        match image {
            Ok(image) => {
                let pending = self
                    .store
                    .get(placeholder_id)
                    .unwrap_or_else(|| placeholder.awaiting_image(&prompt));
                self.store.replace(
                    placeholder_id,
                    pending.with_image(GeneratedImage::new(image.data_uri, prompt)),
                );
                self.set_state_if_live(token, ControllerState::Idle);
            }
            Err(err) => {
                warn!(code = err.code(), error = %err, "image generation failed");
                self.fail_placeholder(token, placeholder_id, self.copy.image_failure_notice.clone());
            }
        }
    }

    /// Replace the placeholder with an errored notice and return to idle.
    fn fail_placeholder(&self, token: &CancellationToken, placeholder_id: &str, notice: String) {
        if let Some(placeholder) = self.store.get(placeholder_id) {
            self.store.replace(
                placeholder_id,
                placeholder.resolved(notice.clone(), MessageStatus::Errored),
            );
        }
        self.emit(EngineEvent::GenerationFailed { notice });
        self.set_state_if_live(token, ControllerState::Idle);
    }

    /// Stop the in-flight generation, if any.
    ///
    /// The submission's gateway call is allowed to resolve, but its result
    /// is discarded. Any pending placeholder is left in its last rendered
    /// state. Callable from any state; a no-op when idle.
    pub fn stop(&self) {
        let submission = {
            let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            current.take()
        };
        let Some(submission) = submission else {
            return;
        };
        submission.token.cancel();
        self.set_state(ControllerState::Stopped);
        self.set_state(ControllerState::Idle);
    }

    /// Clear the conversation: stop any in-flight generation, then reset
    /// the store to a single "context cleared" banner.
    pub fn clear_context(&self) {
        self.stop();
        self.store
            .reset_with(Message::banner(self.copy.cleared_banner.clone()));
        if self.state() != ControllerState::Idle {
            self.set_state(ControllerState::Idle);
        }
    }

    /// Await the in-flight submission task, if any.
    ///
    /// Useful for deterministic shutdown and tests; stale (cancelled)
    /// tasks finish quickly because every continuation checks its token.
    pub async fn join(&self) {
        let submission = {
            let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            current.take()
        };
        if let Some(submission) = submission {
            let _ = submission.handle.await;
        }
    }
}

impl std::fmt::Debug for GenerationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationController")
            .field("state", &self.state())
            .field("messages", &self.store.len())
            .finish_non_exhaustive()
    }
}
