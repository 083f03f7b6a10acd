//! Human-readable summary of the current configuration.

use std::fmt::Write as _;

use crate::plan::{mode_choices, PlanError};
use crate::topology::Topology;

/// Describes every output: its current geometry, then one line per size it
/// supports.
pub fn describe(topology: &Topology) -> Result<String, PlanError> {
    let mut buf = String::new();

    for output in &topology.outputs {
        let _ = write!(buf, "{}: {} {}", output.name, output.vendor(), output.product());

        let current = match topology.current_crtc(output)? {
            Some(crtc) => topology.current_mode(crtc)?.map(|mode| (crtc, mode)),
            None => None,
        };
        match current {
            Some((crtc, mode)) => {
                let _ = writeln!(buf, " {}x{}+{}+{}", mode.width, mode.height, crtc.x, crtc.y);
            }
            None => buf.push_str(" (off)\n"),
        }

        for (size, _) in mode_choices(topology, output)? {
            let _ = writeln!(buf, "\t{size}");
        }
    }

    Ok(buf)
}
