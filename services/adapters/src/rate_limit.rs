//! Rate limiting for outbound frames and REST requests

use governor::{DefaultDirectRateLimiter, Quota};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::input::Transport;
use crate::Result;

/// Paces requests to at most one per configured period
///
/// A zero period disables pacing.
#[derive(Clone)]
pub struct RequestPacer {
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
    period: Duration,
}

impl RequestPacer {
    /// Create a pacer allowing one request per `period`
    pub fn new(period: Duration) -> Self {
        let limiter = Quota::with_period(period)
            .map(|quota| Arc::new(DefaultDirectRateLimiter::direct(quota)));

        if limiter.is_none() {
            tracing::debug!("Request pacing disabled (zero period)");
        }

        Self { limiter, period }
    }

    /// Pacer that never waits
    pub fn unlimited() -> Self {
        Self {
            limiter: None,
            period: Duration::ZERO,
        }
    }

    /// Configured spacing between requests
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Check if a request is allowed right now (non-blocking)
    pub fn check(&self) -> bool {
        self.limiter
            .as_ref()
            .map(|limiter| limiter.check().is_ok())
            .unwrap_or(true)
    }

    /// Wait until a request is allowed
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

impl std::fmt::Debug for RequestPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPacer")
            .field("period", &self.period)
            .finish()
    }
}

/// Throttled send primitive shared by every subscription frame of a connection
///
/// Callers queue on a fair mutex, so frames reach the transport in the order
/// `send` was called, each spaced by the pacer period.
pub struct OutboundThrottle {
    pacer: RequestPacer,
    queue: Mutex<()>,
}

impl OutboundThrottle {
    /// Create a throttle spacing frames by `period`
    pub fn new(period: Duration) -> Self {
        Self {
            pacer: RequestPacer::new(period),
            queue: Mutex::new(()),
        }
    }

    /// Send `frame` once the throttle allows it
    ///
    /// Returns after the transport accepted the frame, not after wire delivery.
    pub async fn send(&self, transport: &dyn Transport, frame: String) -> Result<()> {
        let _turn = self.queue.lock().await;
        self.pacer.wait().await;
        transport.send(frame).await
    }

    /// Send `frames` back to back, with no other caller's frame between them
    ///
    /// Each frame is still paced. Stops at the first failed send.
    pub async fn send_all(&self, transport: &dyn Transport, frames: Vec<String>) -> Result<()> {
        let _turn = self.queue.lock().await;
        for frame in frames {
            self.pacer.wait().await;
            transport.send(frame).await?;
        }
        Ok(())
    }
}
