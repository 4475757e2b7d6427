//! Authentication handshake gating private channels
//!
//! State lives in a `watch` channel so any number of callers can await the
//! outcome while inbound routing keeps running. At most one signed challenge
//! is outstanding: only the caller that moves the state from
//! `NotAuthenticated` to `Pending` sends it.

use tokio::sync::watch;
use types::VenueId;

use super::encoder::SubscriptionEncoder;
use crate::input::Transport;
use crate::rest::Signer;
use crate::{AdapterError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    NotAuthenticated,
    /// Challenge sent, reply not yet seen
    Pending,
    Authenticated,
    /// Terminal until the next connection
    Rejected,
}

pub struct AuthHandshake {
    venue: VenueId,
    state: watch::Sender<AuthState>,
}

impl AuthHandshake {
    pub fn new(venue: VenueId) -> Self {
        let (state, _) = watch::channel(AuthState::NotAuthenticated);
        Self { venue, state }
    }

    pub fn state(&self) -> AuthState {
        *self.state.borrow()
    }

    /// Atomically claim the right to send the challenge
    pub fn try_begin(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == AuthState::NotAuthenticated {
                *state = AuthState::Pending;
                true
            } else {
                false
            }
        })
    }

    /// Apply the exchange's auth reply
    pub fn resolve(&self, success: bool) {
        let next = if success {
            AuthState::Authenticated
        } else {
            AuthState::Rejected
        };
        let previous = self.state.send_replace(next);

        if success {
            tracing::info!("Authenticated with {}", self.venue);
        } else {
            tracing::warn!("Authentication rejected by {} (was {:?})", self.venue, previous);
        }
    }

    /// Back to `NotAuthenticated`; waiters still pending are released
    pub fn reset(&self) {
        self.state.send_if_modified(|state| {
            if *state == AuthState::NotAuthenticated {
                false
            } else {
                *state = AuthState::NotAuthenticated;
                true
            }
        });
    }

    /// Gate for private operations
    ///
    /// Sends the challenge if no attempt is outstanding, then waits until the
    /// state leaves `Pending`. No timeout is applied here.
    pub async fn await_authenticated(
        &self,
        transport: &dyn Transport,
        signer: Option<&Signer>,
        encoder: &SubscriptionEncoder,
    ) -> Result<()> {
        let signer = signer.ok_or(AdapterError::MissingCredentials { venue: self.venue })?;
        let mut rx = self.state.subscribe();

        if self.try_begin() {
            if let Err(e) = self.send_challenge(transport, signer, encoder).await {
                self.reset();
                return Err(e);
            }
        }

        let resolved = rx
            .wait_for(|state| *state != AuthState::Pending)
            .await
            .map(|state| *state)
            .unwrap_or(AuthState::NotAuthenticated);

        self.outcome(resolved)
    }

    async fn send_challenge(
        &self,
        transport: &dyn Transport,
        signer: &Signer,
        encoder: &SubscriptionEncoder,
    ) -> Result<()> {
        let timestamp_ms = chrono::Utc::now().timestamp_millis() as u64;
        let frame = encoder.auth_frame(signer, timestamp_ms)?;
        tracing::debug!("Sending auth challenge to {}", self.venue);
        transport.send(frame).await
    }

    fn outcome(&self, state: AuthState) -> Result<()> {
        match state {
            AuthState::Authenticated => Ok(()),
            AuthState::Rejected => Err(AdapterError::AuthenticationFailed { venue: self.venue }),
            AuthState::NotAuthenticated | AuthState::Pending => Err(AdapterError::ConnectionClosed {
                venue: self.venue,
                reason: Some("connection reset before authentication completed".to_string()),
            }),
        }
    }
}
