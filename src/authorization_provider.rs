use log::{debug, error};
use tokio::sync::mpsc;

use crate::client_provider::AuthorizationEvent;
use crate::ProviderEvent;

/// Permission status as reported by the OS authorization subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    NotDetermined,
    AuthorizedWhileInUse,
    AuthorizedAlways,
    Denied,
    Restricted,
}

impl AuthorizationStatus {
    /// True for the statuses that allow ranging to start. `Denied` and
    /// `Restricted` stay false for the rest of the process lifetime; the
    /// engine never retries them.
    pub fn granted(self) -> bool {
        matches!(
            self,
            AuthorizationStatus::AuthorizedWhileInUse | AuthorizationStatus::AuthorizedAlways
        )
    }
}

/// Outbound side of the OS authorization subsystem.
pub trait AuthorizationRequester: Send {
    /// Trigger the OS permission prompt. Must not block; the outcome arrives
    /// through `AuthorizationCallback`.
    fn request_authorization(&self);
}

/// Inbound marshal for the OS status-changed callback. The OS may invoke it
/// from any thread; the status is forwarded to the engine's serialization
/// point before any state is touched.
pub struct AuthorizationCallback {
    provider_event_tx: mpsc::Sender<ProviderEvent>,
}

impl AuthorizationCallback {
    pub(crate) fn new(provider_event_tx: mpsc::Sender<ProviderEvent>) -> Self {
        Self { provider_event_tx }
    }

    pub fn on_status_changed(&self, status: AuthorizationStatus) {
        if let Err(e) = self
            .provider_event_tx
            .blocking_send(ProviderEvent::AuthorizationChanged(status))
        {
            error!("Authorization provider callback send error: {}", e);
        } else {
            debug!("Authorization provider callback sent {:?}.", status);
        }
    }
}

/// Engine-side permission state. Owns the requester and the last status the
/// OS reported. Touched only from the engine's event loop.
pub struct AuthorizationGate {
    status: AuthorizationStatus,
    requester: Box<dyn AuthorizationRequester>,
}

impl AuthorizationGate {
    pub fn new(requester: Box<dyn AuthorizationRequester>) -> Self {
        Self {
            status: AuthorizationStatus::NotDetermined,
            requester,
        }
    }

    pub fn current_status(&self) -> AuthorizationStatus {
        self.status
    }

    pub fn granted(&self) -> bool {
        self.status.granted()
    }

    /// Show the OS prompt while the status is still undetermined. Once the
    /// status has resolved the prompt is never shown again; the resolved
    /// status is returned instead so the caller can replay it.
    pub fn request_authorization(&self) -> Option<AuthorizationStatus> {
        if self.status == AuthorizationStatus::NotDetermined {
            self.requester.request_authorization();
            None
        } else {
            Some(self.status)
        }
    }

    /// Record a status change and build the outward event for it.
    pub fn on_status_changed(&mut self, status: AuthorizationStatus) -> AuthorizationEvent {
        self.status = status;
        AuthorizationEvent {
            granted: status.granted(),
            status,
        }
    }
}
