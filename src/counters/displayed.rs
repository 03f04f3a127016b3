//! The on-screen projection of the view count.
//!
//! [`DisplayedCounter`] stores the value and visibility of the counter
//! widget behind a [`tokio::sync::watch`] channel, so any number of renderers
//! can follow it while the reconciler and its push listener write to it.

use std::fmt::{self, Debug};

use tokio::sync::watch;

use crate::counters::{DisplayValue, UpdatePolicy, ViewCount};

/// Value and visibility of the counter widget at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayState {
    pub value: DisplayValue,
    /// Once `true` it stays `true`: the counter is never hidden again.
    pub visible: bool,
}

/// The displayed view count, shared between the reconciler and its
/// push listener.
///
/// # Examples
///
/// ```rust
/// use contavisite::counters::{DisplayValue, DisplayedCounter, ViewCount};
///
/// let counter = DisplayedCounter::new().with_name("views");
/// assert!(!counter.state().visible);
///
/// counter.show(ViewCount::new(42));
/// assert_eq!(counter.state().value, DisplayValue::Count(ViewCount::new(42)));
/// assert!(counter.state().visible);
/// ```
pub struct DisplayedCounter {
    name: &'static str,
    policy: UpdatePolicy,
    state: watch::Sender<DisplayState>,
}

impl DisplayedCounter {
    /// Creates a hidden, pending counter with last-write-wins updates.
    pub fn new() -> Self {
        let (state, _) = watch::channel(DisplayState::default());
        DisplayedCounter {
            name: "",
            policy: UpdatePolicy::default(),
            state,
        }
    }

    /// Sets the name used by observers as a label.
    pub fn with_name(self, name: &'static str) -> Self {
        Self { name, ..self }
    }

    /// Sets how writes competing with the current count are resolved.
    pub fn with_policy(self, policy: UpdatePolicy) -> Self {
        Self { policy, ..self }
    }

    /// Label given by [`with_name`](Self::with_name), empty by default.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The active update policy.
    pub fn policy(&self) -> UpdatePolicy {
        self.policy
    }

    /// Shows `count` and reveals the counter.
    ///
    /// Returns `false` if the update policy dropped the write. The counter is
    /// revealed either way.
    pub fn show(&self, count: ViewCount) -> bool {
        let policy = self.policy;
        let mut applied = false;
        self.state.send_if_modified(|state| {
            let before = *state;
            if policy.accepts(&state.value, count) {
                state.value = DisplayValue::Count(count);
                applied = true;
            }
            state.visible = true;
            *state != before
        });
        applied
    }

    /// Reveals the counter with the fallback value.
    ///
    /// A count that is already displayed is kept: the fallback only stands
    /// in for a missing value.
    pub fn show_fallback(&self) {
        self.state.send_if_modified(|state| {
            let before = *state;
            if state.value.count().is_none() {
                state.value = DisplayValue::Unknown;
            }
            state.visible = true;
            *state != before
        });
    }

    /// Returns the current state.
    pub fn state(&self) -> DisplayState {
        *self.state.borrow()
    }

    /// Returns the current value.
    pub fn value(&self) -> DisplayValue {
        self.state.borrow().value
    }

    /// Returns a receiver notified on every change of value or visibility.
    pub fn watch(&self) -> watch::Receiver<DisplayState> {
        self.state.subscribe()
    }
}

impl Default for DisplayedCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for DisplayedCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        write!(
            f,
            "{}{{ {} {} }}",
            self.name,
            match state.value {
                DisplayValue::Pending => "pending".to_string(),
                v => v.to_string(),
            },
            if state.visible { "visible" } else { "hidden" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_hidden_and_pending() {
        let counter = DisplayedCounter::new();
        assert_eq!(counter.state(), DisplayState::default());
        assert_eq!(counter.value(), DisplayValue::Pending);
        assert!(!counter.state().visible);
    }

    #[test]
    fn test_show_reveals() {
        let counter = DisplayedCounter::new();
        assert!(counter.show(ViewCount::new(42)));
        assert_eq!(
            counter.state(),
            DisplayState {
                value: DisplayValue::Count(ViewCount::new(42)),
                visible: true
            }
        );
    }

    #[test]
    fn test_fallback_reveals_unknown() {
        let counter = DisplayedCounter::new();
        counter.show_fallback();
        assert_eq!(counter.value(), DisplayValue::Unknown);
        assert!(counter.state().visible);
    }

    #[test]
    fn test_fallback_keeps_known_count() {
        let counter = DisplayedCounter::new();
        counter.show(ViewCount::new(5));
        counter.show_fallback();
        assert_eq!(counter.value(), DisplayValue::Count(ViewCount::new(5)));
    }

    #[test]
    fn test_count_replaces_fallback() {
        let counter = DisplayedCounter::new();
        counter.show_fallback();
        counter.show(ViewCount::new(9));
        assert_eq!(counter.value().count(), Some(ViewCount::new(9)));
    }

    #[test]
    fn test_last_write_wins_regresses() {
        let counter = DisplayedCounter::new();
        counter.show(ViewCount::new(43));
        assert!(counter.show(ViewCount::new(42)));
        assert_eq!(counter.value().count(), Some(ViewCount::new(42)));
    }

    #[test]
    fn test_monotonic_keeps_highest() {
        let counter = DisplayedCounter::new().with_policy(UpdatePolicy::Monotonic);
        counter.show(ViewCount::new(43));
        assert!(!counter.show(ViewCount::new(42)));
        assert_eq!(counter.value().count(), Some(ViewCount::new(43)));
    }

    #[test]
    fn test_watch_sees_changes() {
        let counter = DisplayedCounter::new();
        let mut rx = counter.watch();
        assert!(!rx.has_changed().unwrap());
        counter.show(ViewCount::new(1));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().value.count(), Some(ViewCount::new(1)));
    }

    #[test]
    fn test_duplicate_write_does_not_notify() {
        let counter = DisplayedCounter::new();
        counter.show(ViewCount::new(1));
        let mut rx = counter.watch();
        rx.borrow_and_update();
        counter.show(ViewCount::new(1));
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_debug() {
        let counter = DisplayedCounter::new().with_name("views");
        assert_eq!(format!("{counter:?}"), "views{ pending hidden }");
        counter.show(ViewCount::new(3));
        assert_eq!(format!("{counter:?}"), "views{ 3 visible }");
    }
}
