//! Async driver for a [`Session`].
//!
//! A forwarding task moves samples from the [`SampleSource`] stream into a
//! bounded queue.  On every [`FrameClock`] tick the runner drains the queue
//! through [`Session::on_sample`], produces the frame with
//! [`Session::tick`] and hands the results to the sinks, so a heightfield
//! step never sees a half-applied sample.
//!
//! The loop ends when the clock runs out or when any clone of the
//! [`RunHandle`] calls [`stop`][RunHandle::stop].  On exit the source is
//! unsubscribed and the session is handed back to the caller.

use std::sync::Arc;

use futures_util::StreamExt;
use magplane_middleware::{FrameClock, SampleSource};
use tokio::sync::{mpsc, watch};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::session::Session;
use crate::sink::{FrameSink, NullSink, TextSink};

/// Samples buffered between two ticks before new ones are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Cloneable stop switch for a running [`Runner`].
#[derive(Debug, Clone)]
pub struct RunHandle {
    stop: Arc<watch::Sender<bool>>,
}

impl RunHandle {
    /// Ask the runner to finish after the current tick.  Idempotent, and a
    /// no-op once the runner has exited.
    pub fn stop(&self) {
        if !self.stop.send_replace(true) {
            debug!("stop requested");
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }
}

pub struct Runner {
    session: Session,
    source: Arc<dyn SampleSource>,
    clock: Box<dyn FrameClock>,
    frame_sink: Box<dyn FrameSink>,
    text_sink: Box<dyn TextSink>,
    queue_capacity: usize,
    stop: Arc<watch::Sender<bool>>,
}

impl Runner {
    pub fn new(
        session: Session,
        source: Arc<dyn SampleSource>,
        clock: Box<dyn FrameClock>,
    ) -> (Self, RunHandle) {
        let (tx, _) = watch::channel(false);
        let stop = Arc::new(tx);
        let runner = Self {
            session,
            source,
            clock,
            frame_sink: Box::new(NullSink),
            text_sink: Box::new(NullSink),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            stop: Arc::clone(&stop),
        };
        (runner, RunHandle { stop })
    }

    pub fn with_frame_sink(mut self, sink: Box<dyn FrameSink>) -> Self {
        self.frame_sink = sink;
        self
    }

    pub fn with_text_sink(mut self, sink: Box<dyn TextSink>) -> Self {
        self.text_sink = sink;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Drive the session until stopped or the clock is exhausted, then
    /// return it.
    pub async fn run(self) -> Session {
        let span = info_span!("run", session = %self.session.id(), source = self.source.id());
        self.run_inner().instrument(span).await
    }

    async fn run_inner(self) -> Session {
        let Runner {
            mut session,
            source,
            mut clock,
            mut frame_sink,
            mut text_sink,
            queue_capacity,
            stop,
        } = self;

        let mut stream = source.subscribe().await;
        let (tx, mut rx) = mpsc::channel(queue_capacity);
        let forward = tokio::spawn(
            async move {
                while let Some(event) = stream.next().await {
                    match tx.try_send(event) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            warn!("sample queue full; dropping sample");
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => break,
                    }
                }
            }
            .in_current_span(),
        );

        info!("run started");
        let mut stopped = stop.subscribe();
        loop {
            let tick = tokio::select! {
                biased;
                _ = stopped.wait_for(|s| *s) => None,
                tick = clock.next_tick() => tick,
            };
            if tick.is_none() {
                break;
            }

            while let Ok(event) = rx.try_recv() {
                session.on_sample(&event);
            }
            let frame = session.tick();
            frame_sink.present(&frame);
            text_sink.show(&session.readout());
        }

        source.unsubscribe().await;
        forward.abort();
        // Wait for the forwarding task to drop its stream.
        let _ = forward.await;
        stop.send_replace(true);
        info!(
            ticks = session.tick_count(),
            samples = session.sample_count(),
            "run finished"
        );
        session
    }
}
