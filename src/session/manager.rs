//! Per-session conversation state and the submit round trip.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use crate::error::ChatError;
use crate::llm::{COMPLETION_TEMPERATURE, CompletionClient};

use super::transcript::Transcript;
use super::turn::ViewEntry;

/// One browser session's conversation.
///
/// Cloning is cheap and yields a handle to the same conversation.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// Unique session identifier.
    id: String,
    /// `None` until [`ConversationSession::initialize`] runs.
    transcript: RwLock<Option<Transcript>>,
    /// Set while a submission is awaiting its reply.
    pending: AtomicBool,
    /// Last activity time.
    last_activity: RwLock<DateTime<Utc>>,
}

/// Clears the pending flag when the submission ends, however it ends.
struct PendingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PendingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl ConversationSession {
    /// Create a session with the given id. No transcript exists yet.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id: id.into(),
                transcript: RwLock::new(None),
                pending: AtomicBool::new(false),
                last_activity: RwLock::new(Utc::now()),
            }),
        }
    }

    /// Get the session ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Seed the transcript with the system directive if it does not exist.
    ///
    /// Calling this again is a no-op.
    pub fn initialize(&self) {
        let mut guard = self.write_transcript();
        if guard.is_none() {
            *guard = Some(Transcript::new());
            tracing::debug!(session_id = %self.id(), "Transcript initialized");
        }
        drop(guard);
        self.touch();
    }

    /// Whether [`Self::initialize`] has run.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.read_transcript().is_some()
    }

    /// Whether a submission is awaiting its reply.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Send `text` to the completion service and record both sides.
    ///
    /// Blank text is rejected with [`ChatError::EmptyInput`] and a second
    /// call while one is in flight with [`ChatError::SubmissionPending`];
    /// neither touches the transcript. On a completion failure the user turn
    /// stays recorded without a reply and the error is returned unchanged.
    pub async fn submit(
        &self,
        client: &dyn CompletionClient,
        text: &str,
    ) -> Result<String, ChatError> {
        if text.trim().is_empty() {
            tracing::debug!(session_id = %self.id(), "Ignoring empty submission");
            return Err(ChatError::EmptyInput);
        }

        let Some(_pending) = PendingGuard::acquire(&self.inner.pending) else {
            tracing::warn!(session_id = %self.id(), "Submission rejected while awaiting reply");
            return Err(ChatError::SubmissionPending);
        };

        let context = {
            let mut guard = self.write_transcript();
            let transcript = guard.get_or_insert_with(Transcript::new);
            transcript.push_user(text);
            transcript.to_messages()
        };
        self.touch();

        tracing::info!(
            session_id = %self.id(),
            message_count = context.len(),
            "Awaiting completion"
        );
        tracing::trace!(session_id = %self.id(), content = %text, "User message");

        match client.complete(&context, COMPLETION_TEMPERATURE).await {
            Ok(reply) => {
                self.write_transcript()
                    .get_or_insert_with(Transcript::new)
                    .push_assistant(reply.as_str());
                self.touch();
                tracing::info!(
                    session_id = %self.id(),
                    content_length = reply.len(),
                    "Saved assistant response to session"
                );
                Ok(reply)
            }
            Err(err) => {
                tracing::error!(session_id = %self.id(), error = %err, "Completion request failed");
                Err(ChatError::CompletionRequestFailure(err))
            }
        }
    }

    /// Run [`Self::submit`] on its own task.
    ///
    /// The completion call is not tied to the caller: dropping the handle
    /// leaves the call running, and its reply is still recorded.
    pub fn spawn_submit(
        &self,
        client: Arc<dyn CompletionClient>,
        text: impl Into<String>,
    ) -> JoinHandle<Result<String, ChatError>> {
        let session = self.clone();
        let text = text.into();
        tokio::spawn(async move { session.submit(client.as_ref(), &text).await })
    }

    /// Visible entries in order, without the system directive.
    ///
    /// Returns a snapshot so no lock is held while the caller renders.
    #[must_use]
    pub fn render_view(&self) -> Vec<ViewEntry> {
        self.read_transcript()
            .as_ref()
            .map(Transcript::view_entries)
            .unwrap_or_default()
    }

    /// Copy of the full transcript, if initialized.
    #[must_use]
    pub fn transcript(&self) -> Option<Transcript> {
        self.read_transcript().clone()
    }

    /// Number of visible entries.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.read_transcript()
            .as_ref()
            .map_or(0, |t| t.render_view().count())
    }

    /// Check if the session has been idle longer than `timeout`.
    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        let last = *self
            .inner
            .last_activity
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        // Negative durations come from clock skew; treat as fresh.
        (Utc::now() - last)
            .to_std()
            .is_ok_and(|idle| idle > timeout)
    }

    fn touch(&self) {
        let mut guard = self
            .inner
            .last_activity
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Utc::now();
    }

    fn read_transcript(&self) -> RwLockReadGuard<'_, Option<Transcript>> {
        self.inner
            .transcript
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_transcript(&self) -> RwLockWriteGuard<'_, Option<Transcript>> {
        self.inner
            .transcript
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
