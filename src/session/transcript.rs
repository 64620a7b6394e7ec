//! Ordered conversation history for one session.

use std::iter::FusedIterator;

use crate::llm::Message;

use super::turn::{Speaker, Turn, ViewEntry};

/// Directive every transcript starts with.
pub const SYSTEM_DIRECTIVE: &str =
    "You are ChatMaven, an AI assistant that helps people find information.";

/// Append-only list of turns.
///
/// Index 0 always holds the one [`Turn::SystemDirective`]; it is sent to the
/// completion service but skipped by [`Transcript::render_view`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    /// Transcript seeded with [`SYSTEM_DIRECTIVE`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_directive(SYSTEM_DIRECTIVE)
    }

    /// Transcript seeded with a custom directive.
    #[must_use]
    pub fn with_directive(directive: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::SystemDirective(directive.into())],
        }
    }

    /// All turns, directive first.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns including the directive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Always false: the directive is never removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recent turn.
    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub(crate) fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::UserUtterance(text.into()));
    }

    pub(crate) fn push_assistant(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::AssistantUtterance(text.into()));
    }

    /// Visible entries in order, without the directive.
    ///
    /// The iterator borrows the transcript; call again (or clone it) to
    /// restart.
    #[must_use]
    pub fn render_view(&self) -> RenderView<'_> {
        RenderView {
            inner: self.turns.get(1..).unwrap_or_default().iter(),
        }
    }

    /// Owned copy of [`Self::render_view`].
    #[must_use]
    pub fn view_entries(&self) -> Vec<ViewEntry> {
        self.render_view()
            .map(|(speaker, text)| ViewEntry {
                speaker,
                text: text.to_string(),
            })
            .collect()
    }

    /// Full context for the completion service, directive included.
    #[must_use]
    pub fn to_messages(&self) -> Vec<Message> {
        self.turns.iter().map(Message::from).collect()
    }
}

/// Lazy `(speaker, text)` view over a [`Transcript`].
#[derive(Debug, Clone)]
pub struct RenderView<'a> {
    inner: std::slice::Iter<'a, Turn>,
}

impl<'a> Iterator for RenderView<'a> {
    type Item = (Speaker, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .by_ref()
            .find_map(|turn| turn.speaker().map(|speaker| (speaker, turn.text())))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

impl FusedIterator for RenderView<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessageRole;

    #[test]
    fn test_new_is_seeded() {
        let transcript = Transcript::new();
        assert_eq!(transcript.len(), 1);
        assert_eq!(
            transcript.turns()[0],
            Turn::SystemDirective(SYSTEM_DIRECTIVE.to_string())
        );
        assert_eq!(transcript.render_view().count(), 0);
    }

    #[test]
    fn test_render_view_skips_directive() {
        let mut transcript = Transcript::new();
        transcript.push_user("2+2?");
        transcript.push_assistant("4");

        let view: Vec<_> = transcript.render_view().collect();
        assert_eq!(
            view,
            vec![(Speaker::User, "2+2?"), (Speaker::Assistant, "4")]
        );
    }

    #[test]
    fn test_render_view_restartable() {
        let mut transcript = Transcript::new();
        transcript.push_user("a");
        transcript.push_user("b");

        let view = transcript.render_view();
        let first: Vec<_> = view.clone().collect();
        let second: Vec<_> = view.collect();
        assert_eq!(first, second);
        assert_eq!(transcript.render_view().count(), 2);
    }

    #[test]
    fn test_to_messages_includes_directive() {
        let mut transcript = Transcript::with_directive("be terse");
        transcript.push_user("hi");

        let messages = transcript.to_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[0].content, "be terse");
        assert_eq!(messages[1].role, MessageRole::User);
    }
}
