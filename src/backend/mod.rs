//! Where the topology comes from and where the computed configuration goes.

use serde::Serialize;

use crate::allocator::Allocation;
use crate::topology::Topology;

#[cfg(feature = "dbus")]
pub mod mutter;

#[cfg(feature = "dbus")]
pub use mutter::MutterDisplayConfig;

/// One snapshot of the display server's resources.
#[derive(Debug, Clone, PartialEq)]
pub struct Resources {
    /// Generation of this snapshot; configurations must be applied against it.
    pub serial: u32,
    pub topology: Topology,
    pub max_screen_width: i32,
    pub max_screen_height: i32,
}

/// A configuration ready to be applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingConfiguration {
    pub serial: u32,
    pub persistent: bool,
    #[serde(flatten)]
    pub allocation: Allocation,
}

/// A display server that can report its resources and apply configurations.
pub trait DisplayBackend {
    fn resources(&self) -> anyhow::Result<Resources>;

    /// Applies the configuration atomically; nothing changes on failure.
    fn apply(&self, configuration: &PendingConfiguration) -> anyhow::Result<()>;
}
