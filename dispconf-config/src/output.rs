use std::fmt;
use std::str::FromStr;

use knuffel::errors::DecodeError;

/// Per-output defaults used when the command line leaves a value out.
#[derive(knuffel::Decode, Debug, Clone, PartialEq)]
pub struct OutputDefaults {
    #[knuffel(argument)]
    pub name: OutputName,
    #[knuffel(child, unwrap(argument))]
    pub mode: Option<ModeSize>,
    #[knuffel(child)]
    pub position: Option<Position>,
    #[knuffel(child)]
    pub presentation: bool,
}

#[derive(knuffel::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    #[knuffel(property)]
    pub x: i32,
    #[knuffel(property)]
    pub y: i32,
}

/// Connector name such as `HDMI-1` or `eDP-1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputName(pub String);

impl OutputName {
    pub fn matches(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }
}

/// Mode size written as `WIDTHxHEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModeSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeSizeError(String);

impl fmt::Display for ParseModeSizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid mode {:?}, expected WIDTHxHEIGHT", self.0)
    }
}

impl std::error::Error for ParseModeSizeError {}

impl FromStr for ModeSize {
    type Err = ParseModeSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseModeSizeError(s.to_owned());

        let (width, height) = s.split_once(['x', 'X']).ok_or_else(err)?;
        let width = width.trim().parse().map_err(|_| err())?;
        let height = height.trim().parse().map_err(|_| err())?;
        if width == 0 || height == 0 {
            return Err(err());
        }

        Ok(Self { width, height })
    }
}

impl fmt::Display for ModeSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl<S: knuffel::traits::ErrorSpan> knuffel::DecodeScalar<S> for OutputName {
    fn type_check(
        type_name: &Option<knuffel::span::Spanned<knuffel::ast::TypeName, S>>,
        ctx: &mut knuffel::decode::Context<S>,
    ) {
        if let Some(type_name) = &type_name {
            ctx.emit_error(DecodeError::unexpected(
                type_name,
                "type name",
                "no type name expected for this node",
            ));
        }
    }

    fn raw_decode(
        val: &knuffel::span::Spanned<knuffel::ast::Literal, S>,
        ctx: &mut knuffel::decode::Context<S>,
    ) -> Result<OutputName, DecodeError<S>> {
        #[derive(Debug)]
        struct OutputNameSet(Vec<String>);
        match &**val {
            knuffel::ast::Literal::String(ref s) => {
                let mut name_set: Vec<String> = match ctx.get::<OutputNameSet>() {
                    Some(h) => h.0.clone(),
                    None => Vec::new(),
                };

                if name_set.iter().any(|name| name.eq_ignore_ascii_case(s)) {
                    ctx.emit_error(DecodeError::unexpected(
                        val,
                        "output",
                        format!("duplicate output: {s}"),
                    ));
                    return Ok(Self(String::new()));
                }

                name_set.push(s.to_string());
                ctx.set(OutputNameSet(name_set));
                Ok(Self(s.clone().into()))
            }
            _ => {
                ctx.emit_error(DecodeError::unsupported(
                    val,
                    "output names must be strings",
                ));
                Ok(Self(String::new()))
            }
        }
    }
}

impl<S: knuffel::traits::ErrorSpan> knuffel::DecodeScalar<S> for ModeSize {
    fn type_check(
        type_name: &Option<knuffel::span::Spanned<knuffel::ast::TypeName, S>>,
        ctx: &mut knuffel::decode::Context<S>,
    ) {
        if let Some(type_name) = &type_name {
            ctx.emit_error(DecodeError::unexpected(
                type_name,
                "type name",
                "no type name expected for this node",
            ));
        }
    }

    fn raw_decode(
        val: &knuffel::span::Spanned<knuffel::ast::Literal, S>,
        ctx: &mut knuffel::decode::Context<S>,
    ) -> Result<ModeSize, DecodeError<S>> {
        match &**val {
            knuffel::ast::Literal::String(ref s) => match s.parse() {
                Ok(size) => Ok(size),
                Err(err) => {
                    ctx.emit_error(DecodeError::conversion(val, err));
                    Ok(ModeSize {
                        width: 0,
                        height: 0,
                    })
                }
            },
            _ => {
                ctx.emit_error(DecodeError::unsupported(val, "modes must be strings"));
                Ok(ModeSize {
                    width: 0,
                    height: 0,
                })
            }
        }
    }
}
