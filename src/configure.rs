//! Computing a configuration from the command line and applying it.

use anyhow::Context;
use dispconf_config::Config;
use tracing::{debug, info};

use crate::allocator::{Allocator, DEFAULT_SEARCH_LIMIT};
use crate::backend::{DisplayBackend, PendingConfiguration, Resources};
use crate::plan::{build_requests, OutputSpec};

/// Plans and allocates a configuration against `resources`.
pub fn pending_configuration(
    resources: &Resources,
    specs: &[OutputSpec],
    config: &Config,
    persistent: bool,
) -> anyhow::Result<PendingConfiguration> {
    let _span = tracy_client::span!("pending_configuration");

    let topology = &resources.topology;
    let requests = build_requests(topology, specs, config)?;

    let search_limit = config
        .search_limit
        .map_or(DEFAULT_SEARCH_LIMIT, |limit| limit as usize);
    let allocation = Allocator::new(topology)
        .with_search_limit(search_limit)
        .allocate(&requests)?;

    Ok(PendingConfiguration {
        serial: resources.serial,
        persistent: persistent || config.persistent,
        allocation,
    })
}

/// Configures the outputs in `specs`.
///
/// With `dry_run` nothing is applied and the configuration is returned as
/// JSON instead.
pub fn configure(
    backend: &dyn DisplayBackend,
    specs: &[OutputSpec],
    config: &Config,
    persistent: bool,
    dry_run: bool,
) -> anyhow::Result<Option<String>> {
    let resources = backend.resources().context("error getting display resources")?;
    let pending = pending_configuration(&resources, specs, config, persistent)?;

    if dry_run {
        let json =
            serde_json::to_string_pretty(&pending).context("error serializing configuration")?;
        return Ok(Some(json));
    }

    debug!("applying {pending:?}");
    backend
        .apply(&pending)
        .context("error applying configuration")?;
    info!("configured {} outputs", specs.len());

    Ok(None)
}
