//! Keep-alive ping timer tied to the connection lifecycle

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::encoder::SubscriptionEncoder;
use crate::input::Transport;
use crate::output::{ClientEvent, EventSink};

/// Repeating ping sender, armed on connect and disarmed on disconnect
pub struct Heartbeat {
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: Mutex::new(None),
        }
    }

    /// Start pinging over `transport`, replacing any running timer
    pub fn arm(&self, transport: Arc<dyn Transport>, sink: Arc<dyn EventSink>) {
        let interval = self.interval;
        let mut task = self.task.lock();
        if let Some(previous) = task.take() {
            previous.abort();
        }

        *task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if let Err(e) = transport.send(SubscriptionEncoder::ping_frame()).await {
                    tracing::warn!("Heartbeat ping failed: {}", e);
                    sink.emit(ClientEvent::Error(e));
                }
            }
        }));
        tracing::debug!("Heartbeat armed every {:?}", interval);
    }

    pub fn disarm(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            tracing::debug!("Heartbeat disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.lock().is_some()
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.disarm();
    }
}
