//! Live count updates pushed by the backend.
//!
//! Whenever any client's view is counted, the backend broadcasts a
//! `views:updated` event carrying the new total:
//!
//! ```text
//! event: views:updated
//! data: {"count":43}
//! ```
//!
//! A [`PushChannel`] opens a [`Subscription`], a stream of such events. The
//! stream is unordered and unbounded; it may yield nothing, duplicates, or
//! stale counts.
//!
//! | Channel | Transport |
//! |---------|-----------|
//! | [`BroadcastChannel`] | in-process `tokio::sync::broadcast` |
//! | [`SseChannel`] | HTTP `text/event-stream` (feature `http`) |

mod broadcast;
pub mod frame;
#[cfg(feature = "http")]
mod sse;

pub use broadcast::BroadcastChannel;
#[cfg(feature = "http")]
pub use sse::SseChannel;

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde_json::Value;

use crate::counters::ViewCount;
use crate::error::PushError;

/// Name of the event announcing a new total.
pub const VIEWS_UPDATED: &str = "views:updated";

/// Payload of a `views:updated` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewsUpdated {
    pub count: ViewCount,
}

/// Decodes a `views:updated` payload.
///
/// Only the `count` key is accepted. A payload without an integer count is
/// [`PushError::Malformed`] and should be skipped.
pub fn decode_payload(data: &str) -> Result<ViewsUpdated, PushError> {
    let value: Value =
        serde_json::from_str(data).map_err(|e| PushError::Malformed(e.to_string()))?;
    value
        .get("count")
        .and_then(Value::as_u64)
        .map(|count| ViewsUpdated {
            count: ViewCount::new(count),
        })
        .ok_or_else(|| PushError::Malformed(format!("no integer count in {data}")))
}

/// A source of count-update subscriptions.
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Opens a new subscription. Dropping it unsubscribes.
    async fn subscribe(&self) -> Result<Subscription, PushError>;
}

/// A live stream of count updates.
///
/// Items are `Err` for events that failed to decode (see
/// [`PushError::is_terminal`]) and for a broken transport, after which the
/// stream ends.
pub struct Subscription {
    events: BoxStream<'static, Result<ViewsUpdated, PushError>>,
}

impl Subscription {
    /// Wraps a stream of decoded events.
    pub fn new<S>(events: S) -> Self
    where
        S: Stream<Item = Result<ViewsUpdated, PushError>> + Send + 'static,
    {
        Subscription {
            events: events.boxed(),
        }
    }
}

impl Stream for Subscription {
    type Item = Result<ViewsUpdated, PushError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_next_unpin(cx)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish()
    }
}
