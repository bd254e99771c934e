//! Interruptible scheduling for per-connection update loops.
//!
//! A poller runs a unit of work once immediately, then again whenever a
//! trigger fires or the fallback interval passes without one. Triggers go
//! through a single-slot channel, so a burst of triggers while work is
//! pending or running collapses into one extra activation.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Sending half of a coalescing trigger.
#[derive(Debug, Clone)]
pub struct Trigger {
    tx: mpsc::Sender<()>,
}

impl Trigger {
    /// Request an activation. Dropped if one is already pending.
    pub fn fire(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Receiving half of a coalescing trigger, handed to `Poller::run`.
#[derive(Debug)]
pub struct TriggerSource {
    rx: mpsc::Receiver<()>,
}

/// Create a linked trigger pair with a single pending slot.
pub fn trigger() -> (Trigger, TriggerSource) {
    let (tx, rx) = mpsc::channel(1);
    (Trigger { tx }, TriggerSource { rx })
}

/// One activation of a poll loop.
#[async_trait]
pub trait PollerWork: Send {
    /// Run the work to completion. Returning `true` stops the poller.
    async fn poll(&mut self, cancel: &CancellationToken) -> bool;
}

#[async_trait]
pub trait Poller: Send + Sync {
    /// Drive `work` until `cancel` fires or `work` asks to stop.
    async fn run(
        &self,
        cancel: CancellationToken,
        triggers: Option<TriggerSource>,
        work: Box<dyn PollerWork>,
        interval: Duration,
    );
}

enum Wake {
    Cancelled,
    Activate,
    TriggersClosed,
}

async fn poll_loop(
    cancel: CancellationToken,
    mut triggers: Option<TriggerSource>,
    mut work: Box<dyn PollerWork>,
    interval: Duration,
) {
    let timer = sleep(Duration::ZERO);
    tokio::pin!(timer);

    loop {
        let wake = tokio::select! {
            biased;

            _ = cancel.cancelled() => Wake::Cancelled,
            received = async {
                match triggers.as_mut() {
                    Some(source) => source.rx.recv().await,
                    None => std::future::pending().await,
                }
            } => match received {
                Some(()) => Wake::Activate,
                None => Wake::TriggersClosed,
            },
            _ = &mut timer => Wake::Activate,
        };

        match wake {
            Wake::Cancelled => break,
            Wake::TriggersClosed => {
                tracing::debug!("trigger source closed, falling back to interval");
                triggers = None;
                continue;
            }
            Wake::Activate => {}
        }

        if work.poll(&cancel).await {
            tracing::debug!("poller work requested stop");
            break;
        }
        timer.as_mut().reset(Instant::now() + interval);
    }
}

/// Plain poller with no extra instrumentation.
#[derive(Debug, Default, Clone, Copy)]
pub struct PeriodicPoller;

impl PeriodicPoller {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Poller for PeriodicPoller {
    async fn run(
        &self,
        cancel: CancellationToken,
        triggers: Option<TriggerSource>,
        work: Box<dyn PollerWork>,
        interval: Duration,
    ) {
        poll_loop(cancel, triggers, work, interval).await;
    }
}

/// Poller whose loop runs inside a named tracing span.
#[derive(Debug, Clone)]
pub struct InterruptiblePoller {
    name: String,
}

impl InterruptiblePoller {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Poller for InterruptiblePoller {
    async fn run(
        &self,
        cancel: CancellationToken,
        triggers: Option<TriggerSource>,
        work: Box<dyn PollerWork>,
        interval: Duration,
    ) {
        let span = tracing::debug_span!("poller", name = %self.name);
        poll_loop(cancel, triggers, work, interval)
            .instrument(span)
            .await;
    }
}
