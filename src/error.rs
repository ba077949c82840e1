// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use thiserror::Error;

/// Library error type.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq)]
pub enum EngineError {
    /// Reported when a command cannot be delivered because the engine event
    /// loop has already shut down.
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),
    /// Reported when a detection record from the radio layer arrives without
    /// its full beacon identity. Such records are dropped from the batch
    /// before selection; tracking of valid records continues.
    #[error("malformed detection record: {0}")]
    MalformedDetection(String),
}
