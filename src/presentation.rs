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

//! Pure mapping from a proximity read-out to the marker the presentation
//! layer draws. Rendering itself (animation, fades, view wiring) stays on
//! the presentation side; this module only computes the frame.

use crate::proximity_detector::ProximityState;

const MARKER_SIZE_SMALL: (f64, f64) = (58.0, 65.0);
const MARKER_SIZE_MEDIUM: (f64, f64) = (116.0, 130.0);
const MARKER_SIZE_LARGE: (f64, f64) = (174.0, 195.0);

const MARKER_TOP_FAR: f64 = 20.0;
const VERTICAL_CORRECTION: f64 = 64.0;

/// Frame for the on-screen beacon marker: the marker grows and slides down
/// the view as the beacon gets closer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerFrame {
    pub visible: bool,
    pub label: &'static str,
    pub width: f64,
    pub height: f64,
    pub top: f64,
}

/// Compute the marker frame for a proximity state in a view of the given
/// height. Same inputs, same frame; no state is consulted.
pub fn marker_frame(state: ProximityState, view_height: f64) -> MarkerFrame {
    let near_top = view_height / 3.0 - VERTICAL_CORRECTION;
    let immediate_top = view_height / 2.0 - VERTICAL_CORRECTION;
    match state {
        ProximityState::Hidden => MarkerFrame {
            visible: false,
            label: "",
            width: MARKER_SIZE_SMALL.0,
            height: MARKER_SIZE_SMALL.1,
            top: MARKER_TOP_FAR,
        },
        ProximityState::Unknown => MarkerFrame {
            visible: false,
            label: "Unknown",
            width: MARKER_SIZE_SMALL.0,
            height: MARKER_SIZE_SMALL.1,
            top: MARKER_TOP_FAR,
        },
        ProximityState::Far => MarkerFrame {
            visible: true,
            label: "Far",
            width: MARKER_SIZE_SMALL.0,
            height: MARKER_SIZE_SMALL.1,
            top: MARKER_TOP_FAR,
        },
        ProximityState::Near => MarkerFrame {
            visible: true,
            label: "Near",
            width: MARKER_SIZE_MEDIUM.0,
            height: MARKER_SIZE_MEDIUM.1,
            top: near_top,
        },
        ProximityState::Immediate => MarkerFrame {
            visible: true,
            label: "Immediate",
            width: MARKER_SIZE_LARGE.0,
            height: MARKER_SIZE_LARGE.1,
            top: immediate_top,
        },
    }
}
