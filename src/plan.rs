//! Turns per-output command line intent into [`OutputRequest`]s.

use dispconf_config::{Config, ModeSize};
use tracing::debug;

use crate::allocator::AllocationError;
use crate::request::OutputRequest;
use crate::topology::{Mode, Output, Topology};

/// Settings given for one output on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputSpec {
    pub name: String,
    pub mode: Option<ModeSize>,
    pub position: Option<(i32, i32)>,
    pub clone: Option<String>,
    pub presentation: bool,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error("unknown output {name:?}, available outputs: {}", .available.join(", "))]
    UnknownOutput {
        name: String,
        available: Vec<String>,
    },
    #[error("output {0} is given more than once")]
    DuplicateOutput(String),
    #[error("output {0} has no modes")]
    NoModes(String),
    #[error(
        "output {output} does not support mode {mode}, available modes: {}",
        .available.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    )]
    UnsupportedMode {
        output: String,
        mode: ModeSize,
        available: Vec<ModeSize>,
    },
    #[error("output {output} cannot clone {target}, which must be given before it")]
    CloneTargetNotEarlier { output: String, target: String },
    #[error(transparent)]
    Topology(#[from] AllocationError),
}

/// Builds one request per spec, in order.
///
/// Values missing on the command line come from the config, then from the
/// output's current state.
pub fn build_requests(
    topology: &Topology,
    specs: &[OutputSpec],
    config: &Config,
) -> Result<Vec<OutputRequest>, PlanError> {
    let mut requests: Vec<OutputRequest> = Vec::with_capacity(specs.len());

    for (idx, spec) in specs.iter().enumerate() {
        let output = topology
            .output_by_name(&spec.name)
            .ok_or_else(|| PlanError::UnknownOutput {
                name: spec.name.clone(),
                available: topology.outputs.iter().map(|o| o.name.clone()).collect(),
            })?;

        if specs[..idx].iter().any(|s| s.name == spec.name) {
            return Err(PlanError::DuplicateOutput(spec.name.clone()));
        }

        let defaults = config.output(&spec.name);
        let presentation = spec.presentation || defaults.is_some_and(|d| d.presentation);

        let request = if let Some(target) = &spec.clone {
            let source = specs[..idx]
                .iter()
                .position(|s| &s.name == target)
                .map(|pos| &requests[pos])
                .ok_or_else(|| PlanError::CloneTargetNotEarlier {
                    output: spec.name.clone(),
                    target: target.clone(),
                })?;
            OutputRequest::clone_of(output.id, source)
        } else {
            let choices = mode_choices(topology, output)?;
            let size = match spec.mode.or(defaults.and_then(|d| d.mode)) {
                Some(size) => size,
                None => default_mode(topology, output, &choices)?,
            };
            let mode = choices
                .iter()
                .find(|(s, _)| *s == size)
                .map(|(_, mode)| *mode)
                .ok_or_else(|| PlanError::UnsupportedMode {
                    output: output.name.clone(),
                    mode: size,
                    available: choices.iter().map(|(s, _)| *s).collect(),
                })?;

            let (x, y) = match spec
                .position
                .or(defaults.and_then(|d| d.position).map(|p| (p.x, p.y)))
            {
                Some(position) => position,
                None => current_position(topology, output)?,
            };

            OutputRequest::enabled(output.id, mode.id, x, y)
        };

        let request = request.with_presentation(presentation);
        debug!("planned {}: {request:?}", output.name);
        requests.push(request);
    }

    Ok(requests)
}

/// Mode sizes an output supports, in the output's order, each mapped to the
/// highest-frequency mode of that size.
pub fn mode_choices<'a>(
    topology: &'a Topology,
    output: &Output,
) -> Result<Vec<(ModeSize, &'a Mode)>, PlanError> {
    let mut choices: Vec<(ModeSize, &Mode)> = Vec::new();

    for id in &output.modes {
        let mode = topology.mode(*id)?;
        let size = ModeSize {
            width: mode.width,
            height: mode.height,
        };

        match choices.iter_mut().find(|(s, _)| *s == size) {
            Some((_, best)) => {
                if best.frequency < mode.frequency {
                    *best = mode;
                }
            }
            None => choices.push((size, mode)),
        }
    }

    Ok(choices)
}

/// The size the output is currently lit at, or its first mode's size.
fn default_mode(
    topology: &Topology,
    output: &Output,
    choices: &[(ModeSize, &Mode)],
) -> Result<ModeSize, PlanError> {
    let current = topology
        .current_crtc(output)?
        .and_then(|crtc| crtc.current_mode)
        .filter(|mode| output.modes.contains(mode));

    if let Some(current) = current {
        let mode = topology.mode(current)?;
        return Ok(ModeSize {
            width: mode.width,
            height: mode.height,
        });
    }

    choices
        .first()
        .map(|(size, _)| *size)
        .ok_or_else(|| PlanError::NoModes(output.name.clone()))
}

fn current_position(topology: &Topology, output: &Output) -> Result<(i32, i32), PlanError> {
    let position = topology
        .current_crtc(output)?
        .map(|crtc| (crtc.x, crtc.y))
        .unwrap_or((0, 0));
    Ok(position)
}
