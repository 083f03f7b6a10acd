//! CRTC allocation.
//!
//! Requests are placed strictly in input order, and each request tries its
//! output's possible CRTCs strictly in topology order. The first complete
//! assignment found wins. A request that clones an earlier one first tries to
//! share the CRTC already driving its source (a hardware clone), and otherwise
//! takes a CRTC of its own configured with the source's mode and position.
//!
//! The search state is owned by a single [`Allocator::allocate`] call. Every
//! frame undoes exactly what it pushed before reporting failure, so a sibling
//! branch never sees a dead branch's tentative CRTCs.

use tracing::{debug, trace};

use crate::request::OutputRequest;
use crate::topology::{CrtcId, Output, OutputId, Topology};

mod types;

#[cfg(test)]
mod tests;

pub use types::{
    AllocationError, Allocation, CrtcConfiguration, OutputConfiguration, OutputPropertyDelta,
};

/// Default bound on placement attempts for one allocation.
pub const DEFAULT_SEARCH_LIMIT: usize = 100_000;

/// Allocates CRTCs with the default search limit.
pub fn allocate(
    requests: &[OutputRequest],
    topology: &Topology,
) -> Result<Allocation, AllocationError> {
    Allocator::new(topology).allocate(requests)
}

pub struct Allocator<'a> {
    topology: &'a Topology,
    search_limit: usize,
}

impl<'a> Allocator<'a> {
    pub fn new(topology: &'a Topology) -> Self {
        Self {
            topology,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_search_limit(mut self, search_limit: usize) -> Self {
        self.search_limit = search_limit;
        self
    }

    pub fn allocate(&self, requests: &[OutputRequest]) -> Result<Allocation, AllocationError> {
        let _span = tracy_client::span!("Allocator::allocate");

        self.validate(requests)?;

        let mut search = Search {
            topology: self.topology,
            requests,
            outputs: Vec::with_capacity(requests.len()),
            crtcs: Vec::with_capacity(self.topology.crtcs.len()),
            attempts: 0,
            limit: self.search_limit,
        };
        search.place(0)?;

        debug!(
            "allocated {} outputs after {} placement attempts",
            requests.len(),
            search.attempts
        );

        Ok(Allocation {
            outputs: search.outputs,
            crtcs: search.crtcs,
        })
    }

    /// Rejects requests that reference ids the topology does not know, or
    /// that break the request ordering rules.
    fn validate(&self, requests: &[OutputRequest]) -> Result<(), AllocationError> {
        for (idx, request) in requests.iter().enumerate() {
            let output = self.topology.output(request.output)?;
            for crtc in &output.possible_crtcs {
                self.topology.crtc(*crtc)?;
            }

            if let Some(mode) = request.mode {
                self.topology.mode(mode)?;
            }

            let earlier = &requests[..idx];
            if earlier.iter().any(|r| r.output == request.output) {
                return Err(AllocationError::DuplicateRequest(request.output));
            }

            if let Some(clone_of) = request.clone_of {
                if !earlier.iter().any(|r| r.output == clone_of) {
                    return Err(AllocationError::CloneSourceNotEarlier {
                        output: request.output,
                        clone_of,
                    });
                }
            }
        }

        Ok(())
    }
}

struct Search<'a> {
    topology: &'a Topology,
    requests: &'a [OutputRequest],
    outputs: Vec<OutputConfiguration>,
    crtcs: Vec<CrtcConfiguration>,
    attempts: usize,
    limit: usize,
}

impl<'a> Search<'a> {
    /// Places `requests[idx..]`.
    ///
    /// On failure the accumulators are left exactly as they were on entry.
    fn place(&mut self, idx: usize) -> Result<(), AllocationError> {
        let requests = self.requests;
        let Some(request) = requests.get(idx) else {
            self.disable_unused_crtcs();
            return Ok(());
        };

        self.attempts += 1;
        if self.attempts > self.limit {
            return Err(AllocationError::SearchLimitExceeded { limit: self.limit });
        }

        let topology = self.topology;
        let output = topology.output(request.output)?;

        let configuration = self.output_configuration(request, output);
        self.outputs.push(configuration);

        let res = self.place_on_crtc(idx, request, output);
        if res.is_err() {
            self.outputs.pop();
        }
        res
    }

    fn place_on_crtc(
        &mut self,
        idx: usize,
        request: &'a OutputRequest,
        output: &'a Output,
    ) -> Result<(), AllocationError> {
        if !request.is_enabled() {
            trace!("output {} is disabled, leaving it without a CRTC", output.name);
            return self.place(idx + 1);
        }

        let mut failure = AllocationError::Infeasible(output.id);

        if let Some(source) = request.clone_of {
            match self.try_hardware_clone(idx, output, source) {
                None => (),
                Some(Err(err @ AllocationError::Infeasible(_))) => failure = err,
                Some(res) => return res,
            }
        }

        for &crtc in &output.possible_crtcs {
            if self.is_configured(crtc) {
                trace!("CRTC {crtc} is taken, skipping it for output {}", output.name);
                continue;
            }

            trace!("trying CRTC {crtc} for output {}", output.name);
            self.crtcs.push(CrtcConfiguration::driving(crtc, request));

            match self.place(idx + 1) {
                Ok(()) => return Ok(()),
                Err(err @ AllocationError::Infeasible(_)) => {
                    trace!("CRTC {crtc} for output {} led to a dead end", output.name);
                    self.crtcs.pop();
                    failure = err;
                }
                Err(err) => return Err(err),
            }
        }

        Err(failure)
    }

    /// Attaches `output` to the CRTC already driving `source`.
    ///
    /// Returns `None` when no such CRTC exists or it cannot drive `output`.
    fn try_hardware_clone(
        &mut self,
        idx: usize,
        output: &'a Output,
        source: OutputId,
    ) -> Option<Result<(), AllocationError>> {
        let pos = self
            .crtcs
            .iter()
            .position(|crtc| crtc.outputs.contains(&source))?;
        let crtc = self.crtcs[pos].id;

        if !output.possible_crtcs.contains(&crtc) {
            debug!(
                "CRTC {crtc} cannot drive output {}, cloning output {source} on a separate CRTC",
                output.name
            );
            return None;
        }

        trace!("sharing CRTC {crtc} between output {source} and output {}", output.name);
        self.crtcs[pos].outputs.push(output.id);

        let res = self.place(idx + 1);
        if matches!(res, Err(AllocationError::Infeasible(_))) {
            self.crtcs[pos].outputs.pop();
        }
        Some(res)
    }

    fn output_configuration(
        &self,
        request: &OutputRequest,
        output: &Output,
    ) -> OutputConfiguration {
        // The first request in the sequence becomes the primary output.
        let primary = request.is_enabled() && self.outputs.is_empty();

        let mut properties = OutputPropertyDelta::default();
        if output.is_primary() != primary {
            properties.primary = Some(primary);
        }
        if output.is_presentation() != request.presentation {
            properties.presentation = Some(request.presentation);
        }

        OutputConfiguration {
            id: output.id,
            properties,
        }
    }

    fn is_configured(&self, crtc: CrtcId) -> bool {
        self.crtcs.iter().any(|c| c.id == crtc)
    }

    fn disable_unused_crtcs(&mut self) {
        let topology = self.topology;
        for crtc in &topology.crtcs {
            if !self.is_configured(crtc.id) {
                self.crtcs.push(CrtcConfiguration::disabled(crtc.id));
            }
        }
    }
}
