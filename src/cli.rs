//! Command line.
//!
//! Each output name starts a new group of options that applies to that output
//! only. Everything after the first output name is handed to [`OutputArgs`]
//! one group at a time.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use dispconf_config::ModeSize;

use crate::plan::OutputSpec;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(override_usage = "dispconf [OPTIONS] [OUTPUT [--mode WxH] \
    [--position X Y | --clone OUTPUT] [--presentation]]...")]
pub struct Cli {
    /// Make the new layout the default for these monitors.
    #[arg(long)]
    pub persistent: bool,
    /// Print the computed configuration as JSON instead of applying it.
    #[arg(long)]
    pub dry_run: bool,
    /// Path to the config file (default: `$XDG_CONFIG_HOME/dispconf/config.kdl`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Log more; repeat for even more.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
    /// Outputs to configure, each followed by its own options. Lists the
    /// current configuration when empty.
    #[arg(
        value_name = "OUTPUT",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub outputs: Vec<String>,
}

/// Options for a single output.
#[derive(Parser, Debug)]
#[command(name = "OUTPUT", no_binary_name = true, disable_help_flag = true)]
pub struct OutputArgs {
    /// Connector name, like `HDMI-1`.
    pub name: String,
    /// Mode size.
    #[arg(long, value_name = "WxH")]
    pub mode: Option<ModeSize>,
    /// Position of the top-left corner in the global layout.
    #[arg(
        long,
        num_args = 2,
        value_names = ["X", "Y"],
        allow_negative_numbers = true,
        conflicts_with = "clone"
    )]
    pub position: Option<Vec<i32>>,
    /// Show the same content as an earlier output.
    #[arg(long, value_name = "OUTPUT")]
    pub clone: Option<String>,
    /// Mark the output for presentations.
    #[arg(long)]
    pub presentation: bool,
    /// The next output and its options.
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<String>,
}

impl From<OutputArgs> for OutputSpec {
    fn from(args: OutputArgs) -> Self {
        let position = match args.position.as_deref() {
            Some(&[x, y]) => Some((x, y)),
            _ => None,
        };

        OutputSpec {
            name: args.name,
            mode: args.mode,
            position,
            clone: args.clone,
            presentation: args.presentation,
        }
    }
}

impl Cli {
    /// Splits the trailing arguments into one spec per output.
    pub fn output_specs(&self) -> Result<Vec<OutputSpec>, clap::Error> {
        let mut specs = Vec::new();
        let mut args = self.outputs.clone();

        while !args.is_empty() {
            let mut group = OutputArgs::try_parse_from(args)?;
            args = std::mem::take(&mut group.rest);
            specs.push(OutputSpec::from(group));
        }

        Ok(specs)
    }
}
