//! In-process stand-ins for the OS authorization and scanning subsystems.
//! They let the demo binary (and manual experiments) drive the engine
//! without real radio hardware.

use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use log::info;

use crate::authorization_provider::{AuthorizationCallback, AuthorizationRequester, AuthorizationStatus};
use crate::beacon::{Proximity, RawDetection, TargetBeacon};
use crate::ble_scan_provider::{BeaconRanger, RangingCallback};
use crate::client_provider::{EngineEvent, EngineEventCallback};
use crate::presentation::marker_frame;

const PROMPT_DELAY: Duration = Duration::from_millis(150);
const SCAN_CYCLE: Duration = Duration::from_millis(900);

/// Proximity buckets the emulated beacon walks through once ranging starts.
const WALK_SCRIPT: [Proximity; 6] = [
    Proximity::Unknown,
    Proximity::Far,
    Proximity::Far,
    Proximity::Near,
    Proximity::Immediate,
    Proximity::Near,
];

/// Emulated permission subsystem. The requester half plugs into the engine;
/// the prompt receiver goes to `run_authorization_responder`.
pub struct EmulatedAuthorization {
    prompt_tx: Sender<()>,
}

impl EmulatedAuthorization {
    pub fn new() -> (Self, Receiver<()>) {
        let (prompt_tx, prompt_rx) = std::sync::mpsc::channel();
        (Self { prompt_tx }, prompt_rx)
    }
}

impl AuthorizationRequester for EmulatedAuthorization {
    fn request_authorization(&self) {
        info!("Emulated permission prompt shown.");
        let _ = self.prompt_tx.send(());
    }
}

/// Answers every prompt with the given status after a short think time.
/// Returns once the requester half is gone.
pub fn run_authorization_responder(
    prompt_rx: Receiver<()>,
    callback: AuthorizationCallback,
    resolution: AuthorizationStatus,
) {
    while prompt_rx.recv().is_ok() {
        thread::sleep(PROMPT_DELAY);
        info!("Emulated permission prompt resolved to {:?}.", resolution);
        callback.on_status_changed(resolution);
    }
}

pub enum RadioCommand {
    Start,
    Stop,
}

/// Emulated radio. The ranger half plugs into the engine; the command
/// receiver goes to `run_radio_responder`.
pub struct EmulatedRadio {
    command_tx: Sender<RadioCommand>,
}

impl EmulatedRadio {
    pub fn new() -> (Self, Receiver<RadioCommand>) {
        let (command_tx, command_rx) = std::sync::mpsc::channel();
        (Self { command_tx }, command_rx)
    }
}

impl BeaconRanger for EmulatedRadio {
    fn start_ranging(&self, target: &TargetBeacon) {
        info!("Emulated radio starts ranging in {}.", target.region_id);
        let _ = self.command_tx.send(RadioCommand::Start);
    }

    fn stop_ranging(&self, target: &TargetBeacon) {
        info!("Emulated radio stops ranging in {}.", target.region_id);
        let _ = self.command_tx.send(RadioCommand::Stop);
    }
}

/// Feeds scan cycles while ranging is active: the target beacon walks
/// through the proximity buckets, then drops out of sight. Each batch also
/// carries a malformed record, as a degraded radio would produce. Returns
/// once the ranger half is gone.
pub fn run_radio_responder(
    command_rx: Receiver<RadioCommand>,
    callback: RangingCallback,
    target: TargetBeacon,
) {
    loop {
        match command_rx.recv() {
            Ok(RadioCommand::Start) => {}
            Ok(RadioCommand::Stop) => continue,
            Err(_) => return,
        }
        info!("Emulated radio scan loop running.");
        for proximity in WALK_SCRIPT {
            thread::sleep(SCAN_CYCLE);
            match command_rx.try_recv() {
                Ok(RadioCommand::Stop) => break,
                Ok(RadioCommand::Start) => {}
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => return,
            }
            callback.on_batch(vec![
                RawDetection {
                    uuid: None,
                    major: None,
                    minor: None,
                    proximity: Proximity::Near,
                    rssi: None,
                },
                RawDetection {
                    uuid: Some(target.uuid),
                    major: Some(target.major),
                    minor: Some(target.minor),
                    proximity,
                    rssi: Some(-52),
                },
            ]);
        }
        // Beacon out of sight.
        callback.on_batch(Vec::new());
    }
}

/// Demo consumer: logs every engine notification together with the marker
/// frame the presentation layer would draw for it.
pub struct LoggingEventCallback {
    pub view_height: f64,
}

impl EngineEventCallback for LoggingEventCallback {
    fn on_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::Authorization(authorization) => {
                info!(
                    "Authorization event: granted={} status={:?}.",
                    authorization.granted, authorization.status
                );
            }
            EngineEvent::Proximity(proximity) => {
                let frame = marker_frame(proximity.state, self.view_height);
                info!(
                    "Proximity event: {:?}, marker {:?}.",
                    proximity.state, frame
                );
            }
        }
    }
}
