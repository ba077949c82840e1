// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Tracks one configured beacon and turns raw radio scan cycles into
//! discrete proximity-state transitions for a single consumer.
//!
//! All engine state (authorization, scan session, proximity) lives behind
//! one event channel drained by [`Engine::run`] on a dedicated thread. The
//! OS authorization and scanning subsystems plug in through
//! [`AuthorizationRequester`](authorization_provider::AuthorizationRequester)
//! and [`BeaconRanger`](ble_scan_provider::BeaconRanger); their callbacks and
//! the client command surface marshal everything onto that channel, so no
//! state is ever mutated from a foreign thread.

pub mod authorization_provider;
pub mod beacon;
pub mod ble_scan_provider;
pub mod client_provider;
pub mod emulator;
pub mod error;
pub mod presentation;
pub mod proximity_detector;
pub mod timer_provider;


use std::time::Duration;

use log::{debug, info, warn};
use tokio::runtime::Builder;
use tokio::sync::mpsc;

use crate::authorization_provider::{
    AuthorizationCallback, AuthorizationGate, AuthorizationRequester, AuthorizationStatus,
};
use crate::beacon::{BeaconSighting, TargetBeacon};
use crate::ble_scan_provider::{BeaconRanger, RangingCallback, ScanSession};
use crate::client_provider::{ClientProvider, EngineEvent, EngineEventCallback, ProximityEvent};
use crate::proximity_detector::ProximityDetector;
use crate::timer_provider::{AlarmEvent, TimerHandle, TimerProvider};

const PROVIDER_EVENT_CHANNEL_BUF_SIZE: usize = 100;
const ALARM_CHANNEL_BUF_SIZE: usize = 4;

/// Grace period between an authorization grant and the ranging start call.
/// The OS radio is not always ready to range the instant authorization
/// flips; starting is deferred by this much.
pub const RANGING_START_DELAY: Duration = Duration::from_millis(300);

/// Events marshalled from providers onto the engine's serialization point.
pub enum ProviderEvent {
    RequestAuthorization,
    AuthorizationChanged(AuthorizationStatus),
    StartRanging,
    StopRanging,
    RangingBatch(Vec<BeaconSighting>),
    Alarm(AlarmEvent),
    Stop,
}

/// Engine plus the provider endpoints the host wires to the outside world.
pub struct BeaconEngine {
    pub engine: Engine,
    pub client_provider: ClientProvider,
    pub authorization_callback: AuthorizationCallback,
    pub ranging_callback: RangingCallback,
    pub timer_provider: TimerProvider,
}

impl BeaconEngine {
    pub fn new(
        target: TargetBeacon,
        event_callback: Box<dyn EngineEventCallback>,
        requester: Box<dyn AuthorizationRequester>,
        ranger: Box<dyn BeaconRanger>,
    ) -> Self {
        info!("Create beacon engine for region {}.", target.region_id);
        let (provider_tx, provider_rx) =
            mpsc::channel::<ProviderEvent>(PROVIDER_EVENT_CHANNEL_BUF_SIZE);
        let (alarm_tx, alarm_rx) = mpsc::channel::<AlarmEvent>(ALARM_CHANNEL_BUF_SIZE);
        Self {
            engine: Engine::new(
                provider_rx,
                target,
                event_callback,
                requester,
                ranger,
                TimerHandle::new(alarm_tx),
            ),
            client_provider: ClientProvider::new(provider_tx.clone()),
            authorization_callback: AuthorizationCallback::new(provider_tx.clone()),
            ranging_callback: RangingCallback::new(provider_tx.clone()),
            timer_provider: TimerProvider::new(provider_tx, alarm_rx),
        }
    }
}

/// Single consumer of provider events. Owns the authorization gate, the scan
/// session, and the proximity detector; only `poll_providers` touches them.
pub struct Engine {
    provider_rx: mpsc::Receiver<ProviderEvent>,
    event_callback: Box<dyn EngineEventCallback>,
    gate: AuthorizationGate,
    session: ScanSession,
    detector: ProximityDetector,
    timer: TimerHandle,
}

impl Engine {
    fn new(
        provider_rx: mpsc::Receiver<ProviderEvent>,
        target: TargetBeacon,
        event_callback: Box<dyn EngineEventCallback>,
        requester: Box<dyn AuthorizationRequester>,
        ranger: Box<dyn BeaconRanger>,
        timer: TimerHandle,
    ) -> Self {
        Self {
            provider_rx,
            event_callback,
            gate: AuthorizationGate::new(requester),
            detector: ProximityDetector::new(target.clone()),
            session: ScanSession::new(target, ranger),
            timer,
        }
    }

    /// Drain provider events until a stop command arrives. Blocks the
    /// calling thread; hosts give the engine a thread of its own.
    pub fn run(&mut self) {
        info!("Run beacon engine.");
        Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(async {
                self.poll_providers().await;
            });
    }

    async fn poll_providers(&mut self) {
        while let Some(event) = self.provider_rx.recv().await {
            match event {
                ProviderEvent::RequestAuthorization => self.process_authorization_request(),
                ProviderEvent::AuthorizationChanged(status) => {
                    self.process_authorization_change(status);
                }
                ProviderEvent::StartRanging => self.process_start_request(),
                ProviderEvent::StopRanging => self.process_stop_request(),
                ProviderEvent::RangingBatch(sightings) => self.process_ranging_batch(&sightings),
                ProviderEvent::Alarm(_) => self.process_alarm(),
                ProviderEvent::Stop => {
                    info!("Engine stopped.");
                    break;
                }
            }
        }
    }

    fn process_authorization_request(&mut self) {
        match self.gate.request_authorization() {
            None => debug!("Authorization prompt requested."),
            // The prompt has already been answered for this process; replay
            // the resolved status so the consumer still hears it.
            Some(status) => self.process_authorization_change(status),
        }
    }

    fn process_authorization_change(&mut self, status: AuthorizationStatus) {
        info!("Authorization status changed to {:?}.", status);
        let event = self.gate.on_status_changed(status);
        let granted = event.granted;
        self.event_callback
            .on_event(EngineEvent::Authorization(event));
        if granted {
            self.timer.schedule(AlarmEvent {
                delay_duration: RANGING_START_DELAY,
            });
        } else {
            self.session.stop();
            self.detector.reset();
        }
    }

    fn process_start_request(&mut self) {
        if self.gate.granted() {
            self.session.start();
        } else {
            warn!(
                "Ranging requested while authorization is {:?}; ignored.",
                self.gate.current_status()
            );
        }
    }

    fn process_stop_request(&mut self) {
        self.session.stop();
        self.detector.reset();
    }

    fn process_alarm(&mut self) {
        // Authorization may have flipped while the alarm was pending.
        if self.gate.granted() {
            self.session.start();
        } else {
            debug!("Deferred ranging start dropped; authorization not granted.");
        }
    }

    fn process_ranging_batch(&mut self, sightings: &[BeaconSighting]) {
        debug!("Received a batch of {} sightings.", sightings.len());
        if !self.session.is_ranging() {
            debug!("Batch received while idle; dropped.");
            return;
        }
        if let Some(state) = self.detector.on_ranging_batch(sightings) {
            self.event_callback
                .on_event(EngineEvent::Proximity(ProximityEvent { state }));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use uuid::Uuid;

    use crate::authorization_provider::{AuthorizationRequester, AuthorizationStatus};
    use crate::beacon::{BeaconSighting, Proximity, TargetBeacon};
    use crate::ble_scan_provider::BeaconRanger;
    use crate::client_provider::{EngineEvent, EngineEventCallback};
    use crate::proximity_detector::ProximityState;
    use crate::BeaconEngine;

    struct RecordingCallback {
        event_tx: mpsc::Sender<EngineEvent>,
    }

    impl EngineEventCallback for RecordingCallback {
        fn on_event(&self, event: EngineEvent) {
            self.event_tx.send(event).unwrap();
        }
    }

    struct RecordingRequester {
        prompt_tx: mpsc::Sender<()>,
    }

    impl AuthorizationRequester for RecordingRequester {
        fn request_authorization(&self) {
            self.prompt_tx.send(()).unwrap();
        }
    }

    struct RecordingRanger {
        command_tx: mpsc::Sender<&'static str>,
    }

    impl BeaconRanger for RecordingRanger {
        fn start_ranging(&self, _target: &TargetBeacon) {
            self.command_tx.send("start").unwrap();
        }

        fn stop_ranging(&self, _target: &TargetBeacon) {
            self.command_tx.send("stop").unwrap();
        }
    }

    struct Harness {
        beacon_engine: BeaconEngine,
        event_rx: mpsc::Receiver<EngineEvent>,
        prompt_rx: mpsc::Receiver<()>,
        command_rx: mpsc::Receiver<&'static str>,
    }

    fn target() -> TargetBeacon {
        TargetBeacon::new("test.region", Uuid::from_u128(0xfeed), 61142, 41244)
    }

    fn harness() -> Harness {
        let (event_tx, event_rx) = mpsc::channel();
        let (prompt_tx, prompt_rx) = mpsc::channel();
        let (command_tx, command_rx) = mpsc::channel();
        Harness {
            beacon_engine: BeaconEngine::new(
                target(),
                Box::new(RecordingCallback { event_tx }),
                Box::new(RecordingRequester { prompt_tx }),
                Box::new(RecordingRanger { command_tx }),
            ),
            event_rx,
            prompt_rx,
            command_rx,
        }
    }

    fn target_sighting(proximity: Proximity) -> BeaconSighting {
        BeaconSighting {
            uuid: Uuid::from_u128(0xfeed),
            major: 61142,
            minor: 41244,
            proximity,
            rssi: Some(-47),
        }
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut h = harness();
        let engine = &mut h.beacon_engine.engine;
        engine.process_authorization_change(AuthorizationStatus::AuthorizedWhileInUse);
        engine.process_start_request();
        engine.process_start_request();
        assert_eq!(h.command_rx.try_iter().count(), 1);
    }

    #[test]
    fn test_deferred_start_runs_only_while_granted() {
        let mut h = harness();
        let engine = &mut h.beacon_engine.engine;

        // No grant yet; an alarm alone must not start the radio.
        engine.process_alarm();
        assert!(h.command_rx.try_recv().is_err());

        engine.process_authorization_change(AuthorizationStatus::AuthorizedAlways);
        engine.process_alarm();
        assert_eq!(h.command_rx.try_recv(), Ok("start"));
    }

    #[test]
    fn test_denied_authorization_is_reported_and_blocks_start() {
        let mut h = harness();
        let engine = &mut h.beacon_engine.engine;
        engine.process_authorization_change(AuthorizationStatus::Denied);
        match h.event_rx.try_recv().unwrap() {
            EngineEvent::Authorization(event) => {
                assert!(!event.granted);
                assert_eq!(event.status, AuthorizationStatus::Denied);
            }
            other => panic!("expected authorization event, got {:?}", other),
        }
        engine.process_start_request();
        assert!(h.command_rx.try_recv().is_err());
    }

    #[test]
    fn test_prompt_shown_only_while_undetermined() {
        let mut h = harness();
        let engine = &mut h.beacon_engine.engine;

        engine.process_authorization_request();
        assert!(h.prompt_rx.try_recv().is_ok());
        assert!(h.event_rx.try_recv().is_err());

        engine.process_authorization_change(AuthorizationStatus::AuthorizedAlways);
        let _ = h.event_rx.try_recv();

        // A second request must not prompt again; the resolved status is
        // replayed through the event stream instead.
        engine.process_authorization_request();
        assert!(h.prompt_rx.try_recv().is_err());
        match h.event_rx.try_recv().unwrap() {
            EngineEvent::Authorization(event) => assert!(event.granted),
            other => panic!("expected authorization event, got {:?}", other),
        }
    }

    #[test]
    fn test_revocation_stops_an_active_session() {
        let mut h = harness();
        let engine = &mut h.beacon_engine.engine;
        engine.process_authorization_change(AuthorizationStatus::AuthorizedWhileInUse);
        engine.process_start_request();
        assert_eq!(h.command_rx.try_recv(), Ok("start"));

        engine.process_authorization_change(AuthorizationStatus::Denied);
        assert_eq!(h.command_rx.try_recv(), Ok("stop"));

        engine.process_ranging_batch(&[target_sighting(Proximity::Near)]);
        let proximity_events = h
            .event_rx
            .try_iter()
            .filter(|event| matches!(event, EngineEvent::Proximity(_)))
            .count();
        assert_eq!(proximity_events, 0);
    }

    #[test]
    fn test_batches_are_dropped_after_stop() {
        let mut h = harness();
        let engine = &mut h.beacon_engine.engine;
        engine.process_authorization_change(AuthorizationStatus::AuthorizedWhileInUse);
        engine.process_start_request();
        engine.process_ranging_batch(&[target_sighting(Proximity::Far)]);
        let _ = h.event_rx.try_iter().count();

        engine.process_stop_request();
        engine.process_ranging_batch(&[target_sighting(Proximity::Near)]);
        assert!(h.event_rx.try_recv().is_err());
    }

    #[test]
    fn test_proximity_is_not_cached_across_sessions() {
        let mut h = harness();
        let engine = &mut h.beacon_engine.engine;
        engine.process_authorization_change(AuthorizationStatus::AuthorizedWhileInUse);
        engine.process_start_request();
        engine.process_ranging_batch(&[target_sighting(Proximity::Far)]);
        engine.process_stop_request();
        engine.process_start_request();
        engine.process_ranging_batch(&[target_sighting(Proximity::Far)]);

        let far_events = h
            .event_rx
            .try_iter()
            .filter(|event| {
                matches!(
                    event,
                    EngineEvent::Proximity(proximity) if proximity.state == ProximityState::Far
                )
            })
            .count();
        assert_eq!(far_events, 2);
    }
}
