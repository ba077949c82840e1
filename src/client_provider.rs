use log::error;
use tokio::sync::mpsc;

use crate::authorization_provider::AuthorizationStatus;
use crate::error::EngineError;
use crate::proximity_detector::ProximityState;
use crate::ProviderEvent;

/// Authorization outcome delivered to the engine's consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationEvent {
    pub granted: bool,
    pub status: AuthorizationStatus,
}

/// Proximity transition delivered to the engine's consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProximityEvent {
    pub state: ProximityState,
}

/// The single outward notification stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    Authorization(AuthorizationEvent),
    Proximity(ProximityEvent),
}

/// Consumer-registered handler. One per engine instance; invoked
/// synchronously on the engine's serialization thread, in arrival order.
pub trait EngineEventCallback: Send {
    fn on_event(&self, event: EngineEvent);
}

/// Client command surface. Commands are marshalled onto the engine's
/// serialization point; nothing here touches engine state directly.
pub struct ClientProvider {
    provider_event_tx: mpsc::Sender<ProviderEvent>,
}

impl ClientProvider {
    pub(crate) fn new(provider_event_tx: mpsc::Sender<ProviderEvent>) -> Self {
        Self { provider_event_tx }
    }

    /// Ask for scanning permission. Shows the OS prompt at most once; an
    /// already-resolved status is replayed through the event stream.
    pub fn request_authorization(&self) -> Result<(), EngineError> {
        self.send(ProviderEvent::RequestAuthorization)
    }

    /// Start ranging. Ignored by the engine unless authorization is granted.
    pub fn start_ranging(&self) -> Result<(), EngineError> {
        self.send(ProviderEvent::StartRanging)
    }

    /// Stop ranging. Batches already in flight are discarded, not queued.
    pub fn stop_ranging(&self) -> Result<(), EngineError> {
        self.send(ProviderEvent::StopRanging)
    }

    /// Shut down the engine event loop.
    pub fn stop(&self) -> Result<(), EngineError> {
        self.send(ProviderEvent::Stop)
    }

    fn send(&self, event: ProviderEvent) -> Result<(), EngineError> {
        self.provider_event_tx.blocking_send(event).map_err(|e| {
            error!("Client provider send error: {}", e);
            EngineError::EngineUnavailable(e.to_string())
        })
    }
}
