//! Plain-text rendering of the counter widget.

use crate::counters::{DisplayState, DisplayedCounter};

/// Renders the counter the way the page's text node shows it.
///
/// A hidden counter renders as the configured placeholder (empty by
/// default), a visible one as its value, optionally after a label.
///
/// ```rust
/// use contavisite::counters::{DisplayedCounter, ViewCount};
/// use contavisite::observers::text::TextObserver;
///
/// let counter = DisplayedCounter::new();
/// let observer = TextObserver::new().with_label("views");
/// assert_eq!(observer.render_counter(&counter), "");
///
/// counter.show(ViewCount::new(42));
/// assert_eq!(observer.render_counter(&counter), "views: 42");
/// ```
#[derive(Debug, Clone, Default)]
pub struct TextObserver {
    label: Option<String>,
    hidden: String,
}

impl TextObserver {
    /// Creates an observer with no label and an empty placeholder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefixes the rendered value with `label: `.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Text rendered while the counter is still hidden.
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.hidden = placeholder.into();
        self
    }

    /// Renders `state` as the page would show it.
    pub fn render(&self, state: &DisplayState) -> String {
        if !state.visible {
            return self.hidden.clone();
        }
        match &self.label {
            Some(label) => format!("{label}: {}", state.value),
            None => state.value.to_string(),
        }
    }

    /// Renders the counter's current state.
    pub fn render_counter(&self, counter: &DisplayedCounter) -> String {
        self.render(&counter.state())
    }
}
