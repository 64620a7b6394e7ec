//! HTML rendering for the chat page.

use minijinja::{Environment, context};

use crate::session::ViewEntry;

const PAGE_TEMPLATE_NAME: &str = "page.html";
const PAGE_TEMPLATE: &str = include_str!("../templates/page.html");

/// Renders the single chat page. Template output is HTML-escaped.
#[derive(Debug)]
pub struct PageRenderer {
    env: Environment<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(PAGE_TEMPLATE_NAME, PAGE_TEMPLATE)?;
        Ok(Self { env })
    }

    /// Render the transcript view, with an optional error notice.
    pub fn render(
        &self,
        entries: &[ViewEntry],
        error: Option<&str>,
    ) -> Result<String, minijinja::Error> {
        self.env
            .get_template(PAGE_TEMPLATE_NAME)?
            .render(context! { entries => entries, error => error })
    }
}
