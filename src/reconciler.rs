//! The view counter state machine.
//!
//! ```text
//!  Uninitialized ──init()──► CheckingSession ──flag absent──► Incrementing ─┐
//!                                   │                                       ├─► Displayed ──listen()──► Listening
//!                                   └────────flag present───► Fetching ─────┘
//! ```
//!
//! [`ViewCounter::init`] counts the view at most once per session: the first
//! increment the backend accepts sets the session flag, and every later
//! `init` in the same session only reads the count. A failed request shows
//! the fallback. Nothing is retried.
//!
//! [`ViewCounter::listen`] then keeps the counter fresh from a push channel
//! on a separate task until [`ViewCounter::teardown`].

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::CountSource;
use crate::config::ViewCounterConfig;
use crate::counters::{DisplayValue, DisplayedCounter};
use crate::push::PushChannel;
use crate::session::{SessionStore, VIEW_KEY};

/// Lifecycle phase of a [`ViewCounter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    CheckingSession,
    Incrementing,
    Fetching,
    Displayed,
    Listening,
}

/// Reconciles the displayed view count with the backend and push updates.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use contavisite::api::{Endpoints, HttpCountSource};
/// use contavisite::reconciler::ViewCounter;
/// use contavisite::session::MemorySession;
///
/// # async fn run() {
/// let source = HttpCountSource::new("http://localhost:5000", &Endpoints::default());
/// let mut views = ViewCounter::new(source, Arc::new(MemorySession::new()));
///
/// let shown = views.init().await;
/// println!("views: {shown}");
/// # }
/// ```
pub struct ViewCounter<C> {
    source: C,
    session: Arc<dyn SessionStore>,
    session_key: String,
    counter: Arc<DisplayedCounter>,
    phase: Phase,
    listener: Option<ListenerHandle>,
}

impl<C: CountSource> ViewCounter<C> {
    /// Creates a reconciler with the default session key and counter.
    pub fn new(source: C, session: Arc<dyn SessionStore>) -> Self {
        ViewCounter {
            source,
            session,
            session_key: VIEW_KEY.to_string(),
            counter: Arc::new(DisplayedCounter::new()),
            phase: Phase::Uninitialized,
            listener: None,
        }
    }

    /// Creates a reconciler with the session store, session key and update
    /// policy of `config`.
    pub fn from_config(source: C, config: &ViewCounterConfig) -> Self {
        let counter = DisplayedCounter::new()
            .with_name("views")
            .with_policy(config.update_policy);
        Self::new(source, config.session_store())
            .with_session_key(config.session_key.clone())
            .with_counter(Arc::new(counter))
    }

    /// Stores the session flag under `key` instead of [`VIEW_KEY`].
    pub fn with_session_key(self, key: impl Into<String>) -> Self {
        Self {
            session_key: key.into(),
            ..self
        }
    }

    /// Uses `counter` as the displayed counter, e.g. to pick its update
    /// policy or share it with renderers created beforehand.
    pub fn with_counter(self, counter: Arc<DisplayedCounter>) -> Self {
        Self { counter, ..self }
    }

    /// The counter this reconciler writes to.
    pub fn counter(&self) -> &Arc<DisplayedCounter> {
        &self.counter
    }

    /// Current lifecycle phase. A listener that has stopped on its own
    /// reports [`Phase::Displayed`].
    pub fn phase(&self) -> Phase {
        match self.phase {
            Phase::Listening if !self.is_listening() => Phase::Displayed,
            phase => phase,
        }
    }

    /// Returns `true` while a push listener is running.
    pub fn is_listening(&self) -> bool {
        self.listener
            .as_ref()
            .is_some_and(|listener| !listener.is_finished())
    }

    /// Runs one increment-or-read cycle and returns the displayed value.
    ///
    /// Errors never leave this method: a failed request shows the fallback
    /// and is logged. An unreadable session flag counts as a first visit.
    pub async fn init(&mut self) -> DisplayValue {
        self.phase = Phase::CheckingSession;
        let first_visit = match self.session.is_set(&self.session_key) {
            Ok(seen) => !seen,
            Err(e) => {
                warn!(error = %e, "cannot read session flag, treating as first visit");
                true
            }
        };

        let result = if first_visit {
            self.phase = Phase::Incrementing;
            debug!("first visit in session, incrementing view count");
            let result = self.source.increment().await;
            let counted = match &result {
                Ok(_) => true,
                Err(e) => e.is_acknowledged(),
            };
            if counted {
                if let Err(e) = self.session.set(&self.session_key) {
                    warn!(error = %e, "cannot store session flag");
                }
            }
            result
        } else {
            self.phase = Phase::Fetching;
            debug!("repeat visit in session, fetching view count");
            self.source.current().await
        };

        match result {
            Ok(count) => {
                if self.counter.show(count) {
                    info!(%count, first_visit, "view count displayed");
                } else {
                    debug!(%count, first_visit, "stale view count response dropped");
                }
            }
            Err(e) => {
                warn!(error = %e, first_visit, "view count unavailable, showing fallback");
                self.counter.show_fallback();
            }
        }

        self.phase = if self.is_listening() {
            Phase::Listening
        } else {
            Phase::Displayed
        };
        self.counter.value()
    }

    /// Starts applying push updates from `channel` on a new task.
    ///
    /// A previous listener is stopped first. If the channel cannot be
    /// opened the failure is logged and the counter keeps its value.
    /// Must be called from within a tokio runtime.
    pub fn listen<P>(&mut self, channel: P)
    where
        P: PushChannel + 'static,
    {
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_listener(channel, self.counter.clone(), shutdown_rx));
        self.listener = Some(ListenerHandle {
            shutdown: Some(shutdown),
            task: Some(task),
        });
        self.phase = Phase::Listening;
    }

    /// Stops the push listener, if any, and waits for it to unsubscribe.
    pub async fn teardown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.unsubscribe().await;
        }
        if self.phase == Phase::Listening {
            self.phase = Phase::Displayed;
        }
    }
}

/// Owns a running push listener. Dropping it aborts the listener.
#[derive(Debug)]
pub struct ListenerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// Signals the listener to stop and waits until it has dropped its
    /// subscription.
    pub async fn unsubscribe(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "push listener failed");
            }
        }
    }

    /// Returns `true` once the listener task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

async fn run_listener<P: PushChannel>(
    channel: P,
    counter: Arc<DisplayedCounter>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut subscription = tokio::select! {
        _ = &mut shutdown => return,
        subscription = channel.subscribe() => match subscription {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(error = %e, "push channel unavailable, live updates disabled");
                return;
            }
        },
    };
    drop(channel);
    debug!("listening for view count updates");

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("push listener unsubscribed");
                return;
            }
            event = subscription.next() => match event {
                Some(Ok(event)) => {
                    if !counter.show(event.count) {
                        debug!(count = %event.count, "stale view count push dropped");
                    }
                }
                Some(Err(e)) if e.is_terminal() => {
                    warn!(error = %e, "push channel lost, live updates stopped");
                    return;
                }
                Some(Err(e)) => debug!(error = %e, "skipping push event"),
                None => {
                    debug!("push channel closed");
                    return;
                }
            },
        }
    }
}
