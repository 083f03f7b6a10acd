//! Type definitions for the hardware topology.
//!
//! These are plain records decoded from a display server snapshot. Nothing in
//! here talks to the display server itself.

use std::collections::BTreeMap;
use std::fmt;

use bitflags::bitflags;
use serde::Serialize;

// =============================================================================
// Identifiers
// =============================================================================

/// Identifier of a CRTC within one topology snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CrtcId(pub u32);

/// Identifier of an output within one topology snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct OutputId(pub u32);

/// Identifier of a mode within one topology snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ModeId(pub u32);

impl fmt::Display for CrtcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// Transform
// =============================================================================

/// CRTC transform, numbered the way Mutter numbers them on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transform {
    #[default]
    Normal,
    Rotate90,
    Rotate180,
    Rotate270,
    Flipped,
    Flipped90,
    Flipped180,
    Flipped270,
}

impl Transform {
    pub fn from_wire(raw: u32) -> Option<Self> {
        let transform = match raw {
            0 => Self::Normal,
            1 => Self::Rotate90,
            2 => Self::Rotate180,
            3 => Self::Rotate270,
            4 => Self::Flipped,
            5 => Self::Flipped90,
            6 => Self::Flipped180,
            7 => Self::Flipped270,
            _ => return None,
        };
        Some(transform)
    }

    pub fn to_wire(self) -> u32 {
        match self {
            Self::Normal => 0,
            Self::Rotate90 => 1,
            Self::Rotate180 => 2,
            Self::Rotate270 => 3,
            Self::Flipped => 4,
            Self::Flipped90 => 5,
            Self::Flipped180 => 6,
            Self::Flipped270 => 7,
        }
    }
}

// =============================================================================
// Properties
// =============================================================================

/// A single value from an opaque property mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    Str(String),
}

/// Opaque property mapping carried by CRTCs and outputs.
pub type Properties = BTreeMap<String, PropertyValue>;

bitflags! {
    /// DRM mode flags as reported alongside each mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModeFlags: u32 {
        const PHSYNC = 1 << 0;
        const NHSYNC = 1 << 1;
        const PVSYNC = 1 << 2;
        const NVSYNC = 1 << 3;
        const INTERLACE = 1 << 4;
        const DBLSCAN = 1 << 5;
        const CSYNC = 1 << 6;
        const PCSYNC = 1 << 7;
        const NCSYNC = 1 << 8;
        const HSKEW = 1 << 9;
        const DBLCLK = 1 << 12;

        const _ = !0;
    }
}

// =============================================================================
// Records
// =============================================================================

/// One display timing generator.
#[derive(Debug, Clone, PartialEq)]
pub struct Crtc {
    pub id: CrtcId,
    pub winsys_id: i64,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub current_mode: Option<ModeId>,
    pub current_transform: Transform,
    pub transforms: Vec<Transform>,
    pub properties: Properties,
}

/// One display connector.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub id: OutputId,
    pub winsys_id: i64,
    pub current_crtc: Option<CrtcId>,
    /// CRTCs able to drive this output, in the order they should be tried.
    pub possible_crtcs: Vec<CrtcId>,
    pub name: String,
    pub modes: Vec<ModeId>,
    pub clones: Vec<OutputId>,
    pub properties: Properties,
}

impl Output {
    pub fn is_primary(&self) -> bool {
        self.bool_property("primary")
    }

    pub fn is_presentation(&self) -> bool {
        self.bool_property("presentation")
    }

    pub fn vendor(&self) -> &str {
        self.str_property("vendor")
    }

    pub fn product(&self) -> &str {
        self.str_property("product")
    }

    fn bool_property(&self, key: &str) -> bool {
        matches!(self.properties.get(key), Some(PropertyValue::Bool(true)))
    }

    fn str_property(&self, key: &str) -> &str {
        match self.properties.get(key) {
            Some(PropertyValue::Str(s)) => s,
            _ => "unknown",
        }
    }
}

/// One timing configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Mode {
    pub id: ModeId,
    pub winsys_id: i64,
    pub width: u32,
    pub height: u32,
    pub frequency: f64,
    pub flags: ModeFlags,
}
