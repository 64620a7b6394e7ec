//! Conversation sessions.
//!
//! Each browser session owns one [`ConversationSession`], which holds the
//! [`Transcript`] and runs one request/response cycle with the completion
//! service per submission.
//!
//! # Architecture
//!
//! - [`Turn`]: one transcript entry (directive, user text, assistant text)
//! - [`Transcript`]: append-only list of turns seeded with the directive
//! - [`ConversationSession`]: initialize / submit / render for one session
//! - [`SessionStore`]: thread-safe map of live sessions
//!
//! # Example
//!
//! ```rust
//! use chatmaven::session::SessionStore;
//!
//! let store = SessionStore::new();
//! let session = store.create();
//!
//! // The system directive is never part of the rendered view.
//! assert!(session.render_view().is_empty());
//! assert_eq!(session.transcript().unwrap().len(), 1);
//! ```

mod manager;
mod store;
mod transcript;
mod turn;

pub use manager::ConversationSession;
pub use store::{DEFAULT_SESSION_TIMEOUT, SessionStore};
pub use transcript::{RenderView, SYSTEM_DIRECTIVE, Transcript};
pub use turn::{Speaker, Turn, ViewEntry};
