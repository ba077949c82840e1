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

use uuid::Uuid;

use crate::error::EngineError;

/// Identity of the one beacon the engine tracks. Fixed at engine
/// construction; the engine never mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetBeacon {
    /// Region identifier handed to the OS scanning subsystem.
    pub region_id: String,
    /// Proximity UUID broadcast by the beacon.
    pub uuid: Uuid,
    pub major: u16,
    pub minor: u16,
}

impl TargetBeacon {
    pub fn new(region_id: impl Into<String>, uuid: Uuid, major: u16, minor: u16) -> Self {
        TargetBeacon {
            region_id: region_id.into(),
            uuid,
            major,
            minor,
        }
    }

    /// True when the sighting carries this target's full identity.
    pub fn matches(&self, sighting: &BeaconSighting) -> bool {
        sighting.uuid == self.uuid
            && sighting.major == self.major
            && sighting.minor == self.minor
    }
}

/// Coarse signal classification the radio layer attaches to each sighting.
#[derive(Eq, Hash, Copy, Clone, Debug, PartialEq)]
pub enum Proximity {
    Unknown,
    Far,
    Near,
    Immediate,
}

/// One observation as delivered by the radio layer, before validation.
/// Identity fields can be absent in a degraded scan cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDetection {
    pub uuid: Option<Uuid>,
    pub major: Option<u16>,
    pub minor: Option<u16>,
    pub proximity: Proximity,
    pub rssi: Option<i16>,
}

/// A validated observation of one beacon in a single scan cycle. Lives only
/// for the duration of processing that cycle's batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconSighting {
    pub uuid: Uuid,
    pub major: u16,
    pub minor: u16,
    pub proximity: Proximity,
    pub rssi: Option<i16>,
}

impl TryFrom<RawDetection> for BeaconSighting {
    type Error = EngineError;

    fn try_from(raw: RawDetection) -> Result<Self, Self::Error> {
        match (raw.uuid, raw.major, raw.minor) {
            (Some(uuid), Some(major), Some(minor)) => Ok(BeaconSighting {
                uuid,
                major,
                minor,
                proximity: raw.proximity,
                rssi: raw.rssi,
            }),
            _ => Err(EngineError::MalformedDetection(String::from(
                "identity fields are incomplete",
            ))),
        }
    }
}
