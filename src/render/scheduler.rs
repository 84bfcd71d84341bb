//! Debounced preview scheduling
//!
//! Every request gets a sequence number. A debounced request only renders if
//! no newer request arrived while it waited, so a burst of edits collapses
//! into one render of the final content. Renders already running are left
//! alone; their results still arrive and the receiver drops stale ones by
//! comparing sequence numbers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::{Pipeline, Preview, RenderRequest};

/// A finished preview tagged with the request that produced it
#[derive(Debug, Clone)]
pub struct PreviewOutcome {
    pub seq: u64,
    pub preview: Preview,
}

pub struct PreviewScheduler {
    pipeline: Pipeline,
    delay: Duration,
    latest: Arc<AtomicU64>,
    tx: UnboundedSender<PreviewOutcome>,
}

impl PreviewScheduler {
    /// Create a scheduler and the channel its results are delivered on
    pub fn new(pipeline: Pipeline, delay: Duration) -> (Self, UnboundedReceiver<PreviewOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            pipeline,
            delay,
            latest: Arc::new(AtomicU64::new(0)),
            tx,
        };
        (scheduler, rx)
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Schedule a render after the quiet period, superseding any pending one
    pub fn schedule(&self, request: RenderRequest) -> u64 {
        self.spawn(request, self.delay)
    }

    /// Render right away, superseding any pending debounced render
    pub fn render_now(&self, request: RenderRequest) -> u64 {
        self.spawn(request, Duration::ZERO)
    }

    /// Cancel any pending debounced render without scheduling a new one
    pub fn supersede(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Sequence number of the newest request
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    fn spawn(&self, request: RenderRequest, delay: Duration) -> u64 {
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.latest);
        let pipeline = self.pipeline.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
                if latest.load(Ordering::SeqCst) != seq {
                    tracing::trace!(seq, "Preview superseded before firing");
                    return;
                }
            }
            let preview = pipeline.preview(&request).await;
            if tx.send(PreviewOutcome { seq, preview }).is_err() {
                tracing::debug!(seq, "Preview receiver closed");
            }
        });
        seq
    }
}
