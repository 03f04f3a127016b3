//! Renderers for the displayed counter.
//!
//! A page does not read the counter once; it follows it. Observers turn a
//! [`DisplayedCounter`](crate::counters::DisplayedCounter) (or one of the
//! [`DisplayState`](crate::counters::DisplayState)s its watch channel
//! delivers) into something a host can show:
//!
//! - [`text`] - the counter's text content, honoring visibility
//! - [`json`] - a [`DisplaySnapshot`](crate::snapshot::DisplaySnapshot) as JSON
//!
//! # Example
//!
//! ```rust,no_run
//! use contavisite::counters::DisplayedCounter;
//! use contavisite::observers::text::TextObserver;
//!
//! # async fn follow(counter: &DisplayedCounter) {
//! let observer = TextObserver::new().with_label("views");
//! let mut rx = counter.watch();
//! while rx.changed().await.is_ok() {
//!     println!("{}", observer.render(&rx.borrow_and_update()));
//! }
//! # }
//! ```

pub mod text;

pub mod json;
