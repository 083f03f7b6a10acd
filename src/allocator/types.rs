//! Result and error types of the allocator.

use serde::Serialize;

use crate::request::OutputRequest;
use crate::topology::{CrtcId, ModeId, OutputId, Properties, Transform};

/// Why no configuration could be produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("unknown CRTC {0}")]
    UnknownCrtc(CrtcId),
    #[error("unknown mode {0}")]
    UnknownMode(ModeId),
    #[error("unknown output {0}")]
    UnknownOutput(OutputId),
    #[error("no valid configuration for the requested outputs (output {0} could not be placed)")]
    Infeasible(OutputId),
    #[error("gave up after {limit} placement attempts")]
    SearchLimitExceeded { limit: usize },
    #[error("output {0} is requested more than once")]
    DuplicateRequest(OutputId),
    #[error("output {output} clones output {clone_of}, which is not requested before it")]
    CloneSourceNotEarlier { output: OutputId, clone_of: OutputId },
}

/// New state for one CRTC.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrtcConfiguration {
    pub id: CrtcId,
    /// `None` turns the CRTC off.
    pub new_mode: Option<ModeId>,
    pub x: i32,
    pub y: i32,
    pub transform: Transform,
    pub outputs: Vec<OutputId>,
    pub properties: Properties,
}

impl CrtcConfiguration {
    pub fn disabled(id: CrtcId) -> Self {
        Self {
            id,
            new_mode: None,
            x: 0,
            y: 0,
            transform: Transform::Normal,
            outputs: Vec::new(),
            properties: Properties::new(),
        }
    }

    pub(super) fn driving(id: CrtcId, request: &OutputRequest) -> Self {
        Self {
            id,
            new_mode: request.mode,
            x: request.x,
            y: request.y,
            transform: request.transform,
            outputs: vec![request.output],
            properties: Properties::new(),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.new_mode.is_none()
    }
}

/// Output properties that differ from the current state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutputPropertyDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation: Option<bool>,
}

impl OutputPropertyDelta {
    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.presentation.is_none()
    }
}

/// New state for one output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputConfiguration {
    pub id: OutputId,
    pub properties: OutputPropertyDelta,
}

/// A complete configuration: one entry per requested output and one per CRTC.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub outputs: Vec<OutputConfiguration>,
    pub crtcs: Vec<CrtcConfiguration>,
}

impl Allocation {
    /// Returns the CRTC configuration driving `output`.
    pub fn crtc_for(&self, output: OutputId) -> Option<&CrtcConfiguration> {
        self.crtcs.iter().find(|crtc| crtc.outputs.contains(&output))
    }

    pub fn output(&self, output: OutputId) -> Option<&OutputConfiguration> {
        self.outputs.iter().find(|o| o.id == output)
    }
}
