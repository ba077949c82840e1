use log::{debug, error, info};
use tokio::sync::mpsc;

use crate::beacon::{BeaconSighting, RawDetection, TargetBeacon};
use crate::ProviderEvent;

/// Lifecycle of the radio scan for the target region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanSessionState {
    Idle,
    Ranging,
}

/// Outbound side of the OS scanning subsystem.
pub trait BeaconRanger: Send {
    /// Begin delivering scan cycles for the target region.
    fn start_ranging(&self, target: &TargetBeacon);

    /// Stop delivering scan cycles for the target region.
    fn stop_ranging(&self, target: &TargetBeacon);
}

/// Inbound marshal for scan-cycle callbacks. The radio layer may invoke it
/// from any thread; batches are validated here and forwarded to the engine's
/// serialization point.
#[derive(Clone)]
pub struct RangingCallback {
    provider_event_tx: mpsc::Sender<ProviderEvent>,
}

impl RangingCallback {
    pub(crate) fn new(provider_event_tx: mpsc::Sender<ProviderEvent>) -> Self {
        Self { provider_event_tx }
    }

    /// Deliver one scan cycle's worth of raw detections. Records missing
    /// identity fields are dropped here, before selection; the rest of the
    /// batch goes through unchanged and in delivery order.
    pub fn on_batch(&self, records: Vec<RawDetection>) {
        let sightings: Vec<BeaconSighting> = records
            .into_iter()
            .filter_map(|raw| match BeaconSighting::try_from(raw) {
                Ok(sighting) => Some(sighting),
                Err(e) => {
                    debug!("Dropping detection: {}.", e);
                    None
                }
            })
            .collect();
        if let Err(e) = self
            .provider_event_tx
            .blocking_send(ProviderEvent::RangingBatch(sightings))
        {
            error!("BLE scan provider callback send error: {}", e);
        } else {
            debug!("BLE scan provider callback sent a batch.");
        }
    }
}

/// Engine-side scan lifecycle. Owns the ranger and the Idle/Ranging state.
/// Touched only from the engine's event loop.
pub struct ScanSession {
    state: ScanSessionState,
    target: TargetBeacon,
    ranger: Box<dyn BeaconRanger>,
}

impl ScanSession {
    pub fn new(target: TargetBeacon, ranger: Box<dyn BeaconRanger>) -> Self {
        Self {
            state: ScanSessionState::Idle,
            target,
            ranger,
        }
    }

    pub fn state(&self) -> ScanSessionState {
        self.state
    }

    pub fn is_ranging(&self) -> bool {
        self.state == ScanSessionState::Ranging
    }

    /// Start ranging. A second start while already ranging is a no-op and
    /// does not reach the scanning subsystem again.
    pub fn start(&mut self) {
        if self.is_ranging() {
            debug!("Ranging already active; start ignored.");
            return;
        }
        info!("Start ranging in region {}.", self.target.region_id);
        self.ranger.start_ranging(&self.target);
        self.state = ScanSessionState::Ranging;
    }

    /// Stop ranging. Idempotent when already idle.
    pub fn stop(&mut self) {
        if !self.is_ranging() {
            debug!("Ranging already idle; stop ignored.");
            return;
        }
        info!("Stop ranging in region {}.", self.target.region_id);
        self.ranger.stop_ranging(&self.target);
        self.state = ScanSessionState::Idle;
    }
}
