//! Progressive display: timed reveal of an already-finalized reply.
//!
//! The model call has already returned by the time a reveal starts; this
//! is a presentation effect simulating live generation, not a true
//! stream. [`reveal_stream`] is the generator form — one revealed prefix
//! per tick, consumed by the rendering layer — and [`RevealTask`] is the
//! callback-driven driver with an exactly-once completion guarantee.
//!
//! A reveal is restartable only by creating a new task for a new message;
//! it is never resumed.

use std::time::Duration;

use futures_util::Stream;
use tokio_util::sync::CancellationToken;

/// How a reveal ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealOutcome {
    /// Whatever had been revealed when the reveal ended.
    pub revealed: String,
    /// True if the full text was revealed; false if cancelled mid-reveal.
    pub ran_to_completion: bool,
}

/// Generator form: a stream of growing prefixes, one per tick.
///
/// Empty text yields nothing — completion is immediate.
pub fn reveal_stream(text: &str, char_delay: Duration) -> impl Stream<Item = String> + Send {
    let chars: Vec<char> = text.chars().collect();
    async_stream::stream! {
        let mut prefix = String::new();
        for (i, c) in chars.iter().enumerate() {
            prefix.push(*c);
            yield prefix.clone();
            if i + 1 < chars.len() {
                tokio::time::sleep(char_delay).await;
            }
        }
    }
}

/// Callback-driven reveal of one finalized message.
///
/// [`run`](Self::run) returns exactly once per task with the final
/// [`RevealOutcome`] — whether the reveal ran to completion, was
/// cancelled mid-way, or the text was empty. That return is the
/// "completion fires exactly once" contract.
#[derive(Debug)]
pub struct RevealTask {
    char_delay: Duration,
    cancel: CancellationToken,
}

impl RevealTask {
    /// Create a task with the given per-character delay and cancellation
    /// token (typically the owning submission's token).
    pub fn new(char_delay: Duration, cancel: CancellationToken) -> Self {
        Self { char_delay, cancel }
    }

    /// Reveal `text` one character at a time, invoking `on_frame` with
    /// each grown prefix.
    ///
    /// If the token is cancelled mid-reveal, returns immediately with
    /// whatever was last revealed. Empty text returns at once without a
    /// reveal loop.
    pub async fn run(self, text: &str, mut on_frame: impl FnMut(&str)) -> RevealOutcome {
        let mut revealed = String::new();
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();

        for (i, c) in chars.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                return RevealOutcome {
                    revealed,
                    ran_to_completion: false,
                };
            }
            revealed.push(c);
            on_frame(&revealed);

            if i + 1 < total {
                tokio::select! {
                    () = self.cancel.cancelled() => {
                        return RevealOutcome {
                            revealed,
                            ran_to_completion: false,
                        };
                    }
                    () = tokio::time::sleep(self.char_delay) => {}
                }
            }
        }

        RevealOutcome {
            revealed,
            ran_to_completion: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test(start_paused = true)]
    async fn reveals_every_prefix_in_order() {
        let task = RevealTask::new(Duration::from_millis(10), CancellationToken::new());
        let mut frames = Vec::new();
        let outcome = task.run("abc", |frame| frames.push(frame.to_string())).await;

        assert_eq!(frames, vec!["a", "ab", "abc"]);
        assert_eq!(outcome.revealed, "abc");
        assert!(outcome.ran_to_completion);
    }

    #[tokio::test]
    async fn empty_text_completes_immediately() {
        let task = RevealTask::new(Duration::from_secs(3600), CancellationToken::new());
        let mut frames = Vec::new();
        let outcome = task.run("", |frame| frames.push(frame.to_string())).await;

        assert!(frames.is_empty());
        assert_eq!(outcome.revealed, "");
        assert!(outcome.ran_to_completion);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_returns_last_revealed() {
        let cancel = CancellationToken::new();
        let task = RevealTask::new(Duration::from_millis(10), cancel.clone());

        let handle = tokio::spawn(async move { task.run("hello world", |_| {}).await });
        // Let a few characters through, then cancel.
        tokio::time::sleep(Duration::from_millis(35)).await;
        cancel.cancel();

        let outcome = match handle.await {
            Ok(o) => o,
            Err(e) => unreachable!("reveal task joined: {e}"),
        };
        assert!(!outcome.ran_to_completion);
        assert!(!outcome.revealed.is_empty());
        assert!(outcome.revealed.len() < "hello world".len());
        assert!("hello world".starts_with(&outcome.revealed));
    }

    #[tokio::test]
    async fn pre_cancelled_token_reveals_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let task = RevealTask::new(Duration::from_millis(1), cancel);
        let mut frames = Vec::new();
        let outcome = task.run("abc", |frame| frames.push(frame.to_string())).await;

        assert!(frames.is_empty());
        assert_eq!(outcome.revealed, "");
        assert!(!outcome.ran_to_completion);
    }

    #[tokio::test(start_paused = true)]
    async fn stream_yields_growing_prefixes() {
        let frames: Vec<String> = reveal_stream("hi!", Duration::from_millis(10))
            .collect()
            .await;
        assert_eq!(frames, vec!["h", "hi", "hi!"]);
    }

    #[tokio::test]
    async fn stream_of_empty_text_is_empty() {
        let frames: Vec<String> = reveal_stream("", Duration::from_millis(1)).collect().await;
        assert!(frames.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn multibyte_text_reveals_whole_characters() {
        let task = RevealTask::new(Duration::from_millis(1), CancellationToken::new());
        let mut frames = Vec::new();
        let outcome = task.run("héllo ✨", |frame| frames.push(frame.to_string())).await;

        assert_eq!(frames.len(), "héllo ✨".chars().count());
        assert_eq!(outcome.revealed, "héllo ✨");
    }
}
