//! Client for GNOME Mutter's `org.gnome.Mutter.DisplayConfig` interface.
//!
//! Only the resource-level calls are used: `GetResources` for the CRTC,
//! output and mode snapshot, and `ApplyConfiguration` to submit the result.

use std::collections::HashMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zbus::proxy;
use zbus::zvariant::{OwnedValue, Type, Value};

use super::{DisplayBackend, PendingConfiguration, Resources};
use crate::allocator::{CrtcConfiguration, OutputConfiguration};
use crate::topology::{
    Crtc, CrtcId, Mode, ModeFlags, ModeId, Output, OutputId, Properties, PropertyValue, Topology,
    Transform,
};

// =============================================================================
// Wire types
// =============================================================================

/// `(uxiiiiiuaua{sv})`
#[derive(Debug, Clone, Deserialize, Type)]
struct RawCrtc {
    id: u32,
    winsys_id: i64,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    current_mode: i32,
    current_transform: u32,
    transforms: Vec<u32>,
    properties: HashMap<String, OwnedValue>,
}

/// `(uxiausauaua{sv})`
#[derive(Debug, Clone, Deserialize, Type)]
struct RawOutput {
    id: u32,
    winsys_id: i64,
    current_crtc: i32,
    possible_crtcs: Vec<u32>,
    name: String,
    modes: Vec<u32>,
    clones: Vec<u32>,
    properties: HashMap<String, OwnedValue>,
}

/// `(uxuudu)`
#[derive(Debug, Clone, Deserialize, Type)]
struct RawMode {
    id: u32,
    winsys_id: i64,
    width: u32,
    height: u32,
    frequency: f64,
    flags: u32,
}

/// `(uiiiuaua{sv})`
#[derive(Debug, Serialize, Type)]
struct RawCrtcConfig {
    id: u32,
    new_mode: i32,
    x: i32,
    y: i32,
    transform: u32,
    outputs: Vec<u32>,
    properties: HashMap<String, Value<'static>>,
}

/// `(ua{sv})`
#[derive(Debug, Serialize, Type)]
struct RawOutputConfig {
    id: u32,
    properties: HashMap<String, Value<'static>>,
}

#[proxy(
    interface = "org.gnome.Mutter.DisplayConfig",
    default_service = "org.gnome.Mutter.DisplayConfig",
    default_path = "/org/gnome/Mutter/DisplayConfig"
)]
trait DisplayConfig {
    #[allow(clippy::type_complexity)]
    fn get_resources(
        &self,
    ) -> zbus::Result<(u32, Vec<RawCrtc>, Vec<RawOutput>, Vec<RawMode>, i32, i32)>;

    fn apply_configuration(
        &self,
        serial: u32,
        persistent: bool,
        crtcs: &[RawCrtcConfig],
        outputs: &[RawOutputConfig],
    ) -> zbus::Result<()>;
}

// =============================================================================
// Backend
// =============================================================================

pub struct MutterDisplayConfig {
    proxy: DisplayConfigProxyBlocking<'static>,
}

impl MutterDisplayConfig {
    pub fn connect() -> anyhow::Result<Self> {
        let conn = zbus::blocking::Connection::session()
            .context("error connecting to session bus")?;
        let proxy = DisplayConfigProxyBlocking::new(&conn)
            .context("error creating DisplayConfig proxy")?;
        Ok(Self { proxy })
    }
}

impl DisplayBackend for MutterDisplayConfig {
    fn resources(&self) -> anyhow::Result<Resources> {
        let _span = tracy_client::span!("MutterDisplayConfig::resources");

        let (serial, crtcs, outputs, modes, max_screen_width, max_screen_height) = self
            .proxy
            .get_resources()
            .context("error calling GetResources")?;
        debug!(
            "got resources serial {serial}: {} CRTCs, {} outputs, {} modes",
            crtcs.len(),
            outputs.len(),
            modes.len()
        );

        Ok(Resources {
            serial,
            topology: decode_topology(crtcs, outputs, modes),
            max_screen_width,
            max_screen_height,
        })
    }

    fn apply(&self, configuration: &PendingConfiguration) -> anyhow::Result<()> {
        let _span = tracy_client::span!("MutterDisplayConfig::apply");

        let crtcs = configuration
            .allocation
            .crtcs
            .iter()
            .map(encode_crtc_config)
            .collect::<anyhow::Result<Vec<_>>>()?;
        let outputs: Vec<_> = configuration
            .allocation
            .outputs
            .iter()
            .map(encode_output_config)
            .collect();

        self.proxy
            .apply_configuration(
                configuration.serial,
                configuration.persistent,
                &crtcs,
                &outputs,
            )
            .context("error calling ApplyConfiguration")?;

        debug!("applied configuration for serial {}", configuration.serial);
        Ok(())
    }
}

// =============================================================================
// Decoding
// =============================================================================

fn decode_topology(crtcs: Vec<RawCrtc>, outputs: Vec<RawOutput>, modes: Vec<RawMode>) -> Topology {
    Topology::new(
        crtcs.into_iter().map(decode_crtc).collect(),
        outputs.into_iter().map(decode_output).collect(),
        modes.into_iter().map(decode_mode).collect(),
    )
}

fn decode_crtc(raw: RawCrtc) -> Crtc {
    Crtc {
        id: CrtcId(raw.id),
        winsys_id: raw.winsys_id,
        x: raw.x,
        y: raw.y,
        width: raw.width,
        height: raw.height,
        current_mode: u32::try_from(raw.current_mode).ok().map(ModeId),
        current_transform: decode_transform(raw.current_transform),
        transforms: raw
            .transforms
            .into_iter()
            .filter_map(Transform::from_wire)
            .collect(),
        properties: decode_properties(raw.properties),
    }
}

fn decode_output(raw: RawOutput) -> Output {
    Output {
        id: OutputId(raw.id),
        winsys_id: raw.winsys_id,
        current_crtc: u32::try_from(raw.current_crtc).ok().map(CrtcId),
        possible_crtcs: raw.possible_crtcs.into_iter().map(CrtcId).collect(),
        name: raw.name,
        modes: raw.modes.into_iter().map(ModeId).collect(),
        clones: raw.clones.into_iter().map(OutputId).collect(),
        properties: decode_properties(raw.properties),
    }
}

fn decode_mode(raw: RawMode) -> Mode {
    Mode {
        id: ModeId(raw.id),
        winsys_id: raw.winsys_id,
        width: raw.width,
        height: raw.height,
        frequency: raw.frequency,
        flags: ModeFlags::from_bits_retain(raw.flags),
    }
}

fn decode_transform(raw: u32) -> Transform {
    Transform::from_wire(raw).unwrap_or_else(|| {
        warn!("unknown transform {raw}, treating it as normal");
        Transform::Normal
    })
}

fn decode_properties(raw: HashMap<String, OwnedValue>) -> Properties {
    raw.into_iter()
        .filter_map(|(key, value)| {
            let value = match &*value {
                Value::Bool(v) => PropertyValue::Bool(*v),
                Value::U8(v) => PropertyValue::UInt(u64::from(*v)),
                Value::U16(v) => PropertyValue::UInt(u64::from(*v)),
                Value::U32(v) => PropertyValue::UInt(u64::from(*v)),
                Value::U64(v) => PropertyValue::UInt(*v),
                Value::I16(v) => PropertyValue::Int(i64::from(*v)),
                Value::I32(v) => PropertyValue::Int(i64::from(*v)),
                Value::I64(v) => PropertyValue::Int(*v),
                Value::F64(v) => PropertyValue::Double(*v),
                Value::Str(v) => PropertyValue::Str(v.to_string()),
                // Backlight ranges, EDID blobs and the like are not needed here.
                _ => return None,
            };
            Some((key, value))
        })
        .collect()
}

// =============================================================================
// Encoding
// =============================================================================

fn encode_crtc_config(config: &CrtcConfiguration) -> anyhow::Result<RawCrtcConfig> {
    let new_mode = match config.new_mode {
        Some(mode) => i32::try_from(mode.0).context("mode id out of range")?,
        None => -1,
    };

    Ok(RawCrtcConfig {
        id: config.id.0,
        new_mode,
        x: config.x,
        y: config.y,
        transform: config.transform.to_wire(),
        outputs: config.outputs.iter().map(|o| o.0).collect(),
        properties: config
            .properties
            .iter()
            .map(|(key, value)| (key.clone(), encode_property(value)))
            .collect(),
    })
}

fn encode_output_config(config: &OutputConfiguration) -> RawOutputConfig {
    let mut properties = HashMap::new();
    if let Some(primary) = config.properties.primary {
        properties.insert("primary".to_owned(), Value::from(primary));
    }
    if let Some(presentation) = config.properties.presentation {
        properties.insert("presentation".to_owned(), Value::from(presentation));
    }

    RawOutputConfig {
        id: config.id.0,
        properties,
    }
}

fn encode_property(value: &PropertyValue) -> Value<'static> {
    match value {
        PropertyValue::Bool(v) => Value::from(*v),
        PropertyValue::Int(v) => Value::from(*v),
        PropertyValue::UInt(v) => Value::from(*v),
        PropertyValue::Double(v) => Value::from(*v),
        PropertyValue::Str(v) => Value::from(v.clone()),
    }
}
