//! What the user wants each output to look like.

use crate::topology::{ModeId, OutputId, Transform};

/// High-level intent for one output.
///
/// A request is enabled when it carries a mode. Clone requests copy the
/// enabled state, mode, position and transform of their source when they are
/// built, so the allocator never has to chase `clone_of` to read them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRequest {
    pub output: OutputId,
    pub mode: Option<ModeId>,
    pub x: i32,
    pub y: i32,
    pub transform: Transform,
    pub presentation: bool,
    /// Output of an earlier request this one mirrors.
    pub clone_of: Option<OutputId>,
}

impl OutputRequest {
    pub fn enabled(output: OutputId, mode: ModeId, x: i32, y: i32) -> Self {
        Self {
            output,
            mode: Some(mode),
            x,
            y,
            transform: Transform::Normal,
            presentation: false,
            clone_of: None,
        }
    }

    pub fn disabled(output: OutputId) -> Self {
        Self {
            output,
            mode: None,
            x: 0,
            y: 0,
            transform: Transform::Normal,
            presentation: false,
            clone_of: None,
        }
    }

    pub fn clone_of(output: OutputId, source: &OutputRequest) -> Self {
        Self {
            output,
            mode: source.mode,
            x: source.x,
            y: source.y,
            transform: source.transform,
            presentation: false,
            clone_of: Some(source.output),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_presentation(mut self, presentation: bool) -> Self {
        self.presentation = presentation;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.mode.is_some()
    }
}
