use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use directories::ProjectDirs;
use dispconf::backend::DisplayBackend;
use dispconf::cli::Cli;
use dispconf::configure::configure;
use dispconf::listing::describe;
use dispconf_config::Config;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    #[cfg(feature = "profile-with-tracy")]
    let _client = tracy_client::Client::start();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err:?}");
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("dispconf={level}")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    if let Err(err) = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .try_init()
    {
        eprintln!("failed to init logger: {err}");
    }
}

fn default_config_path() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", "dispconf")?;
    Some(dirs.config_dir().join("config.kdl"))
}

fn load_config(path: Option<&Path>) -> miette::Result<Config> {
    if let Some(path) = path {
        return Config::load(path);
    }

    match default_config_path() {
        Some(path) if path.exists() => Config::load(&path),
        path => {
            debug!("no config file at {path:?}, using defaults");
            Ok(Config::default())
        }
    }
}

fn run(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let specs = cli.output_specs().unwrap_or_else(|err| err.exit());
    let backend = connect()?;

    if specs.is_empty() {
        let resources = backend.resources()?;
        print!("{}", describe(&resources.topology)?);
        return Ok(());
    }

    if let Some(json) = configure(&*backend, &specs, config, cli.persistent, cli.dry_run)? {
        println!("{json}");
    }

    Ok(())
}

#[cfg(feature = "dbus")]
fn connect() -> anyhow::Result<Box<dyn DisplayBackend>> {
    let backend = dispconf::backend::MutterDisplayConfig::connect()?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "dbus"))]
fn connect() -> anyhow::Result<Box<dyn DisplayBackend>> {
    anyhow::bail!("dispconf was built without D-Bus support")
}
