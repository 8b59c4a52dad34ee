//! Sample sources.
//!
//! A [`SampleSource`] hands out a stream of [`SensorEvent`]s.  Subscribing
//! and unsubscribing are both idempotent: unsubscribing ends every stream the
//! source has handed out, and a later subscribe starts a fresh one.
//!
//! [`ChannelSource`] is the host-facing implementation: platform code (or a
//! test) calls [`ChannelSource::publish`] and every live stream receives the
//! sample.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use magplane_types::SensorEvent;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

/// Default number of samples buffered per subscriber before the slowest one
/// starts losing the oldest samples.
const DEFAULT_CAPACITY: usize = 256;

/// Anything that can deliver sensor samples to the pipeline.
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Short identifier used in logs.
    fn id(&self) -> &str;

    /// Start (or restart) delivery.  The stream ends when the source is
    /// unsubscribed or shut down.
    async fn subscribe(&self) -> BoxStream<'static, SensorEvent>;

    /// Stop delivery.  Calling this more than once is a no-op.
    async fn unsubscribe(&self);
}

/// Stop signal shared by every stream a source hands out.
///
/// Each stream remembers the epoch it was opened in and ends once the epoch
/// moves on, so closing bumps the epoch and a later [`open`][Self::open]
/// starts from the new one without reviving older streams.
#[derive(Debug)]
pub(crate) struct Subscriptions {
    epoch: watch::Sender<u64>,
    live: AtomicBool,
}

impl Subscriptions {
    pub(crate) fn new() -> Self {
        let (epoch, _) = watch::channel(0);
        Self {
            epoch,
            live: AtomicBool::new(false),
        }
    }

    /// Wrap `inner` so it ends when the current epoch is closed.
    pub(crate) fn open(
        &self,
        inner: BoxStream<'static, SensorEvent>,
    ) -> BoxStream<'static, SensorEvent> {
        self.live.store(true, Ordering::Release);
        let mut stop = self.epoch.subscribe();
        let opened = *stop.borrow_and_update();
        stream::unfold((inner, stop), move |(mut inner, mut stop)| async move {
            let next = tokio::select! {
                biased;
                _ = stop.wait_for(|epoch| *epoch != opened) => None,
                item = inner.next() => item,
            };
            next.map(|event| (event, (inner, stop)))
        })
        .boxed()
    }

    /// End every stream opened so far.  Returns `false` when nothing was
    /// open.
    pub(crate) fn close_all(&self) -> bool {
        if !self.live.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.epoch.send_modify(|epoch| *epoch += 1);
        true
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ChannelSource
// ────────────────────────────────────────────────────────────────────────────

/// A source fed by the host through [`publish`][Self::publish].
#[derive(Debug)]
pub struct ChannelSource {
    id: String,
    sender: broadcast::Sender<SensorEvent>,
    subscriptions: Subscriptions,
}

impl ChannelSource {
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_capacity(id, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(id: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            id: id.into(),
            sender,
            subscriptions: Subscriptions::new(),
        }
    }

    /// Deliver `event` to every live stream.  Returns the number of streams
    /// that received it; `0` when nobody is subscribed (the sample is
    /// discarded).
    pub fn publish(&self, event: SensorEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Number of live streams.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl SampleSource for ChannelSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn subscribe(&self) -> BoxStream<'static, SensorEvent> {
        let id = self.id.clone();
        let rx = self.sender.subscribe();
        let inner = stream::unfold((rx, id), |(mut rx, id)| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => return Some((event, (rx, id))),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(source = %id, lagged_by = n, "sample stream lagged; oldest samples dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed();
        debug!(source = %self.id, "subscribed");
        self.subscriptions.open(inner)
    }

    async fn unsubscribe(&self) {
        if self.subscriptions.close_all() {
            debug!(source = %self.id, "unsubscribed");
        }
    }
}
