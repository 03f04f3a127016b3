//! Push channel over an HTTP event stream.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tracing::debug;

use crate::api::join_url;
use crate::config::{PushConfig, ViewCounterConfig};
use crate::error::PushError;
use crate::push::frame::SseDecoder;
use crate::push::{decode_payload, PushChannel, Subscription, ViewsUpdated};

/// Subscribes to `GET {base}{path}` as `text/event-stream` and yields the
/// frames named after the configured event.
///
/// Each subscription is one connection. When the server closes it the
/// subscription ends with [`PushError::Transport`]; no reconnect is made.
#[derive(Debug, Clone)]
pub struct SseChannel {
    client: reqwest::Client,
    url: String,
    event: String,
}

impl SseChannel {
    /// Creates a channel with a default `reqwest` client.
    pub fn new(base_url: &str, push: &PushConfig) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, push)
    }

    /// Creates a channel that connects through `client`.
    pub fn with_client(client: reqwest::Client, base_url: &str, push: &PushConfig) -> Self {
        SseChannel {
            client,
            url: join_url(base_url, &push.path),
            event: push.event.clone(),
        }
    }

    /// Builds the channel from config. Returns `None` when no `[push]`
    /// section is configured.
    pub fn from_config(config: &ViewCounterConfig) -> Option<Self> {
        config
            .push
            .as_ref()
            .map(|push| Self::new(&config.base_url, push))
    }

    /// Absolute URL of the event stream.
    pub fn url(&self) -> &str {
        &self.url
    }
}

struct StreamState<S> {
    bytes: S,
    decoder: SseDecoder,
    event: String,
    pending: VecDeque<Result<ViewsUpdated, PushError>>,
    done: bool,
}

fn frames_to_events<S, B>(
    bytes: S,
    event: String,
) -> impl Stream<Item = Result<ViewsUpdated, PushError>> + Send + 'static
where
    S: Stream<Item = reqwest::Result<B>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = StreamState {
        bytes,
        decoder: SseDecoder::new(),
        event,
        pending: VecDeque::new(),
        done: false,
    };
    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.done {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    for frame in st.decoder.feed(chunk.as_ref()) {
                        match frame {
                            Ok(frame) if frame.event == st.event => {
                                st.pending.push_back(decode_payload(&frame.data));
                            }
                            Ok(frame) => debug!(event = %frame.event, "ignoring push frame"),
                            Err(e) => st.pending.push_back(Err(e)),
                        }
                    }
                }
                Some(Err(e)) => {
                    st.done = true;
                    st.pending.push_back(Err(PushError::Transport(e.to_string())));
                }
                None => {
                    st.done = true;
                    st.pending
                        .push_back(Err(PushError::Transport("stream closed by server".into())));
                }
            }
        }
    })
}

#[async_trait]
impl PushChannel for SseChannel {
    async fn subscribe(&self) -> Result<Subscription, PushError> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| PushError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PushError::Connect(format!("unexpected status {status}")));
        }

        debug!(url = %self.url, "push channel connected");
        let bytes = Box::pin(response.bytes_stream());
        Ok(Subscription::new(frames_to_events(bytes, self.event.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::ViewCount;

    fn push_config() -> PushConfig {
        PushConfig::default()
    }

    #[tokio::test]
    async fn test_subscription_yields_matching_events() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            ": hello\n\n",
            "event: views:updated\ndata: {\"count\":43}\n\n",
            "event: projects:updated\ndata: {}\n\n",
            "event: views:updated\ndata: {\"count\":\"oops\"}\n\n",
            "event: views:updated\ndata: {\"count\":44}\n\n",
        );
        let mock = server
            .mock("GET", "/api/views/stream")
            .match_header("accept", "text/event-stream")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let channel = SseChannel::new(&server.url(), &push_config());
        let items: Vec<_> = channel.subscribe().await.unwrap().collect().await;
        mock.assert_async().await;

        assert_eq!(items.len(), 4);
        assert_eq!(items[0].as_ref().unwrap().count, ViewCount::new(43));
        assert!(matches!(items[1], Err(PushError::Malformed(_))));
        assert_eq!(items[2].as_ref().unwrap().count, ViewCount::new(44));
        assert!(matches!(items[3], Err(PushError::Transport(_))));
    }

    #[tokio::test]
    async fn test_oversized_frame_is_skipped() {
        use crate::push::frame::MAX_LINE;

        let mut server = mockito::Server::new_async().await;
        let body = format!(
            "event: views:updated\ndata: {{\"count\":{}}}\n\nevent: views:updated\ndata: {{\"count\":5}}\n\n",
            "1".repeat(MAX_LINE + 1)
        );
        let _mock = server
            .mock("GET", "/api/views/stream")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let channel = SseChannel::new(&server.url(), &push_config());
        let items: Vec<_> = channel.subscribe().await.unwrap().collect().await;

        assert_eq!(items.len(), 3);
        assert!(matches!(items[0], Err(PushError::Malformed(_))));
        assert_eq!(items[1].as_ref().unwrap().count, ViewCount::new(5));
        assert!(matches!(items[2], Err(PushError::Transport(_))));
    }

    #[tokio::test]
    async fn test_custom_event_name() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/live")
            .with_status(200)
            .with_body("event: views:updated\ndata: {\"count\":1}\n\nevent: hits\ndata: {\"count\":2}\n\n")
            .create_async()
            .await;

        let push = PushConfig {
            path: "/live".into(),
            event: "hits".into(),
        };
        let channel = SseChannel::new(&server.url(), &push);
        let mut sub = channel.subscribe().await.unwrap();
        assert_eq!(sub.next().await.unwrap().unwrap().count, ViewCount::new(2));
    }

    #[tokio::test]
    async fn test_error_status_is_connect_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/views/stream")
            .with_status(404)
            .create_async()
            .await;

        let channel = SseChannel::new(&server.url(), &push_config());
        let err = channel.subscribe().await.unwrap_err();
        assert!(matches!(err, PushError::Connect(_)));
    }

    #[test]
    fn test_from_config() {
        let config = ViewCounterConfig::new("http://h/");
        assert!(SseChannel::from_config(&config).is_none());

        let mut config = config;
        config.push = Some(PushConfig::default());
        let channel = SseChannel::from_config(&config).unwrap();
        assert_eq!(channel.url(), "http://h/api/views/stream");
    }
}
