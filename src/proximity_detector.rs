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

use crate::beacon::{BeaconSighting, Proximity, TargetBeacon};

/// Discrete read-out for the tracked beacon, derived anew from every scan
/// cycle. `Hidden` means the cycle carried no sighting of the target at all.
#[derive(Eq, Hash, Copy, Clone, Debug, PartialEq)]
pub enum ProximityState {
    Hidden,
    Unknown,
    Far,
    Near,
    Immediate,
}

/// Pick the most relevant sighting of a scan cycle.
///
/// Sightings with an `Unknown` proximity bucket are removed first; of the
/// remainder, the first in delivery order wins. The radio layer pre-sorts
/// batches by descending signal strength and this function trusts that
/// ordering. Ties between equally strong candidates are resolved purely by
/// upstream order; there is no independent ranking here.
pub fn select_closest(sightings: &[BeaconSighting]) -> Option<&BeaconSighting> {
    sightings
        .iter()
        .find(|sighting| sighting.proximity != Proximity::Unknown)
}

/// Classify a selected sighting against the configured target.
///
/// Pure and stateless: no sighting, or a sighting of some other beacon,
/// yields `Hidden`; a matching sighting with an `Unknown` bucket yields
/// `Unknown`; otherwise the state mirrors the sighting's bucket.
pub fn classify(selected: Option<&BeaconSighting>, target: &TargetBeacon) -> ProximityState {
    match selected {
        None => ProximityState::Hidden,
        Some(sighting) if !target.matches(sighting) => ProximityState::Hidden,
        Some(sighting) => match sighting.proximity {
            Proximity::Unknown => ProximityState::Unknown,
            Proximity::Far => ProximityState::Far,
            Proximity::Near => ProximityState::Near,
            Proximity::Immediate => ProximityState::Immediate,
        },
    }
}

/// Turns scan cycles into edge-triggered proximity transitions for one
/// target beacon. The remembered state only suppresses duplicate
/// notifications; classification itself never consults it.
pub struct ProximityDetector {
    target: TargetBeacon,
    last_state: Option<ProximityState>,
}

impl ProximityDetector {
    pub fn new(target: TargetBeacon) -> Self {
        ProximityDetector {
            target,
            last_state: None,
        }
    }

    /// Process one scan cycle. Returns the newly classified state when it
    /// differs from the previously reported one, `None` otherwise.
    pub fn on_ranging_batch(&mut self, sightings: &[BeaconSighting]) -> Option<ProximityState> {
        let state = classify(select_closest(sightings), &self.target);
        if self.last_state == Some(state) {
            return None;
        }
        self.last_state = Some(state);
        Some(state)
    }

    /// Last reported state, for consumers that want a level-triggered view.
    pub fn current_state(&self) -> Option<ProximityState> {
        self.last_state
    }

    /// Forget the last reported state. Called when a session ends so the
    /// next session reports from scratch.
    pub fn reset(&mut self) {
        self.last_state = None;
    }
}
