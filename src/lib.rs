//! # Contavisite - Session-Gated Page View Counter
//!
//! A small client library that keeps a page's view counter in sync with the
//! backend that owns the count. It counts **one view per browsing session**,
//! shows the count as soon as it is known, and then keeps it fresh from a
//! push channel carrying other visitors' increments.
//!
//! ## The Problem
//!
//! A view counter looks trivial but has three writers: the page's own
//! increment, later reads on reload, and live broadcasts from other clients.
//! Counting on every page load inflates the number. Pushes may also arrive
//! before the page's own request has finished, and a backend outage must not
//! leave the widget hidden forever.
//!
//! ## How It Works
//!
//! ```text
//!                     ┌──────────────┐  flag absent   POST /api/analytics/view
//!   page load ──────► │ SessionStore │ ─────────────► increment ──┐
//!                     └──────────────┘  flag present  GET /api/analytics/views
//!                                      ─────────────► read ───────┤
//!                                                                 ▼
//!   views:updated ──────────────────────────────────────► DisplayedCounter ──► observers
//! ```
//!
//! 1. **Session gating**: the increment request is only made while the
//!    session flag (`portfolio_viewed_session`) is absent, and the flag is
//!    only set once the backend accepted that request.
//! 2. **Always revealed**: a failed request shows the fallback text `...`
//!    instead of leaving the counter hidden.
//! 3. **Last write wins**: request results and push events overwrite each
//!    other in arrival order. [`UpdatePolicy::Monotonic`](counters::UpdatePolicy)
//!    drops writes lower than the current count instead.
//! 4. **Flexible responses**: the count is read from `count`, `views`,
//!    `totalViews` or `visits`, in that order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use contavisite::api::HttpCountSource;
//! use contavisite::config::ViewCounterConfig;
//! use contavisite::push::SseChannel;
//! use contavisite::reconciler::ViewCounter;
//!
//! # async fn run() -> contavisite::error::Result<()> {
//! let config = ViewCounterConfig::load("views.toml")?;
//! let source = HttpCountSource::from_config(&config)?;
//!
//! let mut views = ViewCounter::from_config(source, &config);
//! println!("views: {}", views.init().await);
//!
//! if let Some(channel) = SseChannel::from_config(&config) {
//!     views.listen(channel);
//! }
//! // ... on page unload
//! views.teardown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`counters`] | `ViewCount`, the displayed counter and update policies |
//! | [`session`] | Session flag storage |
//! | [`api`] | Increment and read requests |
//! | [`push`] | Push channels and subscriptions |
//! | [`reconciler`] | The `ViewCounter` state machine |
//! | [`observers`] | Text and JSON rendering |
//! | [`config`] | TOML configuration |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `http` | `reqwest` based [`HttpCountSource`](api::HttpCountSource) and [`SseChannel`](push::SseChannel) (default) |
//! | `demo` | dependencies of the `watch` example |

pub mod api;
pub mod config;
pub mod counters;
pub mod error;
pub mod observers;
pub mod push;
pub mod reconciler;
pub mod session;
pub mod snapshot;
