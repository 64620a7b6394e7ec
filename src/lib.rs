//! ChatMaven
//!
//! A single-page browser chat that forwards user text to an OpenAI-compatible
//! chat-completion API and renders the conversation.
//!
//! # Architecture
//!
//! - **Server**: Axum HTTP server with one HTML page and a small JSON API
//! - **Sessions**: per-browser-session transcript and submit round trip
//! - **LLM**: completion client trait and the Chat Completions implementation
//!
//! # Modules
//!
//! - [`config`]: CLI, layered app config, and completion credentials
//! - [`error`]: session and completion error types
//! - [`llm`]: completion client trait and implementations
//! - [`page`]: HTML rendering
//! - [`server`]: routes and server start-up
//! - [`session`]: transcripts and session management

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]

pub mod config;
pub mod error;
pub mod llm;
pub mod page;
pub mod server;
pub mod session;

use crate::config::AppConfig;

use llm::CompletionClient;
use page::PageRenderer;
use session::SessionStore;
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live browser sessions.
    pub sessions: SessionStore,
    /// Completion service used by every session.
    pub completions: Arc<dyn CompletionClient>,
    /// Chat page renderer.
    pub pages: Arc<PageRenderer>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("sessions", &self.sessions.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Build state around a completion client with an empty session store.
    pub fn new(
        config: Arc<AppConfig>,
        completions: Arc<dyn CompletionClient>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            sessions: SessionStore::new(),
            completions,
            pages: Arc::new(PageRenderer::new()?),
            config,
        })
    }
}
