//! Hardware topology: the CRTCs, outputs and modes of one display server snapshot.

use tracing::warn;

use crate::allocator::AllocationError;

mod types;

pub use types::{
    Crtc, CrtcId, Mode, ModeFlags, ModeId, Output, OutputId, Properties, PropertyValue, Transform,
};

/// A read-only snapshot of the display hardware.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    pub crtcs: Vec<Crtc>,
    pub outputs: Vec<Output>,
    pub modes: Vec<Mode>,
}

impl Topology {
    pub fn new(crtcs: Vec<Crtc>, outputs: Vec<Output>, modes: Vec<Mode>) -> Self {
        let topology = Self {
            crtcs,
            outputs,
            modes,
        };
        topology.warn_on_dangling_ids();
        topology
    }

    pub fn crtc(&self, id: CrtcId) -> Result<&Crtc, AllocationError> {
        self.crtcs
            .iter()
            .find(|crtc| crtc.id == id)
            .ok_or(AllocationError::UnknownCrtc(id))
    }

    pub fn mode(&self, id: ModeId) -> Result<&Mode, AllocationError> {
        self.modes
            .iter()
            .find(|mode| mode.id == id)
            .ok_or(AllocationError::UnknownMode(id))
    }

    pub fn output(&self, id: OutputId) -> Result<&Output, AllocationError> {
        self.outputs
            .iter()
            .find(|output| output.id == id)
            .ok_or(AllocationError::UnknownOutput(id))
    }

    pub fn output_by_name(&self, name: &str) -> Option<&Output> {
        self.outputs.iter().find(|output| output.name == name)
    }

    /// Returns the CRTC currently driving `output`, if the output is lit.
    pub fn current_crtc(&self, output: &Output) -> Result<Option<&Crtc>, AllocationError> {
        output.current_crtc.map(|id| self.crtc(id)).transpose()
    }

    /// Returns the mode `crtc` is currently scanning out, if any.
    pub fn current_mode(&self, crtc: &Crtc) -> Result<Option<&Mode>, AllocationError> {
        crtc.current_mode.map(|id| self.mode(id)).transpose()
    }

    fn warn_on_dangling_ids(&self) {
        for output in &self.outputs {
            if output.possible_crtcs.is_empty() {
                warn!("output {} has no possible CRTCs", output.name);
            }

            for crtc in &output.possible_crtcs {
                if self.crtc(*crtc).is_err() {
                    warn!("output {} lists unknown CRTC {crtc}", output.name);
                }
            }

            for mode in &output.modes {
                if self.mode(*mode).is_err() {
                    warn!("output {} lists unknown mode {mode}", output.name);
                }
            }
        }
    }
}
