//! Configuration file for dispconf.
//!
//! The file is KDL:
//!
//! ```kdl
//! persistent
//! search-limit 50000
//! output "HDMI-1" {
//!     mode "1920x1080"
//!     position x=1920 y=0
//!     presentation
//! }
//! ```

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use miette::{Context, IntoDiagnostic};
use tracing::debug;

pub mod output;

pub use crate::output::{ModeSize, OutputDefaults, OutputName, ParseModeSizeError, Position};

#[derive(knuffel::Decode, Debug, Default, Clone, PartialEq)]
pub struct Config {
    /// Ask the display server to keep the applied layout for future sessions.
    #[knuffel(child)]
    pub persistent: bool,
    /// Upper bound on CRTC placement attempts during allocation.
    #[knuffel(child, unwrap(argument))]
    pub search_limit: Option<u32>,
    #[knuffel(children(name = "output"))]
    pub outputs: Vec<OutputDefaults>,
}

impl Config {
    pub fn load(path: &Path) -> miette::Result<Self> {
        let contents = fs::read_to_string(path)
            .into_diagnostic()
            .with_context(|| format!("error reading {path:?}"))?;

        let filename = path
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or("config.kdl");
        let config = Self::parse(filename, &contents).context("error parsing")?;
        debug!("loaded config from {path:?}");
        Ok(config)
    }

    pub fn parse(filename: &str, text: &str) -> Result<Self, knuffel::Error> {
        knuffel::parse(filename, text)
    }

    /// Defaults for the output with this connector name, if any.
    pub fn output(&self, name: &str) -> Option<&OutputDefaults> {
        self.outputs.iter().find(|o| o.name.matches(name))
    }
}
