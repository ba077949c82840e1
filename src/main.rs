use std::thread;
use std::time::Duration;

use tokio::runtime::Builder;
use uuid::Uuid;

use beacon_core::authorization_provider::AuthorizationStatus;
use beacon_core::beacon::TargetBeacon;
use beacon_core::emulator::{
    self, EmulatedAuthorization, EmulatedRadio, LoggingEventCallback,
};
use beacon_core::BeaconEngine;

const BEACON_REGION_ID: &str = "io.cloudcity.BeaconRegion";
const BEACON_UUID: &str = "B9407F30-F5F8-466E-AFF9-25556B57FE6D";
const BEACON_MAJOR: u16 = 61142;
const BEACON_MINOR: u16 = 41244;

const VIEW_HEIGHT: f64 = 768.0;
const DEMO_RUNTIME: Duration = Duration::from_secs(8);

fn main() {
    env_logger::init();

    let target = TargetBeacon::new(
        BEACON_REGION_ID,
        Uuid::parse_str(BEACON_UUID).unwrap(),
        BEACON_MAJOR,
        BEACON_MINOR,
    );
    let (requester, prompt_rx) = EmulatedAuthorization::new();
    let (radio, radio_rx) = EmulatedRadio::new();

    let BeaconEngine {
        mut engine,
        client_provider,
        authorization_callback,
        ranging_callback,
        mut timer_provider,
    } = BeaconEngine::new(
        target.clone(),
        Box::new(LoggingEventCallback {
            view_height: VIEW_HEIGHT,
        }),
        Box::new(requester),
        Box::new(radio),
    );

    let engine_thread = thread::spawn(move || engine.run());
    let timer_thread = thread::spawn(move || {
        Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap()
            .block_on(timer_provider.run());
    });
    let authorization_thread = thread::spawn(move || {
        emulator::run_authorization_responder(
            prompt_rx,
            authorization_callback,
            AuthorizationStatus::AuthorizedWhileInUse,
        );
    });
    let radio_thread = thread::spawn(move || {
        emulator::run_radio_responder(radio_rx, ranging_callback, target);
    });

    client_provider.request_authorization().unwrap();
    thread::sleep(DEMO_RUNTIME);
    client_provider.stop_ranging().unwrap();
    client_provider.stop().unwrap();

    engine_thread.join().unwrap();
    // The responders and the timer exit once their engine-side handles drop.
    timer_thread.join().unwrap();
    authorization_thread.join().unwrap();
    radio_thread.join().unwrap();
}
