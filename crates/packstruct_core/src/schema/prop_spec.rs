//! # Property Specs
//!
//! A property spec is the compact type string attached to one field:
//!
//! ```text
//! "bool" | "f16" | "f32" | "f64"
//! "i{1..32}" | "i{1..32}/{scale}"
//! "u{1..32}" | "u{1..32}/{scale}"
//! "obj" | "sid" | "str"
//! ```
//!
//! Parsing happens once while a schema is built.

use std::fmt;

use crate::error::{SchemaError, SchemaResult};

/// Maximum width of an integer field.
pub const MAX_INT_WIDTH: u32 = 32;

/// The value kind a field stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropKind {
    /// Single bit.
    Bool,
    /// Two's-complement integer, 1..=32 bits.
    SignedInt,
    /// Unsigned integer, 1..=32 bits.
    UnsignedInt,
    /// IEEE-754 binary16.
    Float16,
    /// IEEE-754 binary32.
    Float32,
    /// IEEE-754 binary64.
    Float64,
    /// 32-bit id into the store's object table.
    ObjectRef,
    /// Raw stable handle of another record (`0` = none).
    StructRef,
    /// 32-bit id into the store's string table.
    StringRef,
}

/// Parsed descriptor of one field's type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PropSpec {
    kind: PropKind,
    width: u32,
    scale: u32,
}

impl PropSpec {
    /// Creates a spec of a fixed-width kind (everything except integers).
    #[must_use]
    pub const fn of(kind: PropKind) -> Self {
        let width = match kind {
            PropKind::Bool => 1,
            PropKind::Float16 => 16,
            PropKind::Float64 => 64,
            _ => 32,
        };
        Self {
            kind,
            width,
            scale: 1,
        }
    }

    /// Creates an integer spec.
    ///
    /// # Errors
    ///
    /// [`SchemaError::WidthOutOfRange`] if `width` is not in `1..=32`,
    /// [`SchemaError::InvalidScale`] if `scale` is zero.
    pub fn int(field: &str, signed: bool, width: u32, scale: u32) -> SchemaResult<Self> {
        if width == 0 || width > MAX_INT_WIDTH {
            return Err(SchemaError::WidthOutOfRange {
                field: field.to_owned(),
                width,
            });
        }
        let kind = if signed {
            PropKind::SignedInt
        } else {
            PropKind::UnsignedInt
        };
        if scale == 0 {
            return Err(SchemaError::InvalidScale {
                field: field.to_owned(),
                spec: Self { kind, width, scale }.to_string(),
            });
        }
        Ok(Self { kind, width, scale })
    }

    /// Parses the spec string of `field`.
    ///
    /// # Errors
    ///
    /// Any [`SchemaError`] describing why the string is not a valid spec.
    pub fn parse(field: &str, spec: &str) -> SchemaResult<Self> {
        let malformed = || SchemaError::MalformedSpec {
            field: field.to_owned(),
            spec: spec.to_owned(),
        };

        let invalid_scale = || SchemaError::InvalidScale {
            field: field.to_owned(),
            spec: spec.to_owned(),
        };

        let kind = match spec {
            "bool" => return Ok(Self::of(PropKind::Bool)),
            "f16" => return Ok(Self::of(PropKind::Float16)),
            "f32" => return Ok(Self::of(PropKind::Float32)),
            "f64" => return Ok(Self::of(PropKind::Float64)),
            "obj" => return Ok(Self::of(PropKind::ObjectRef)),
            "sid" => return Ok(Self::of(PropKind::StructRef)),
            "str" => return Ok(Self::of(PropKind::StringRef)),
            _ => spec.as_bytes().first().copied().ok_or_else(malformed)?,
        };
        let signed = match kind {
            b'i' => true,
            b'u' => false,
            _ => return Err(malformed()),
        };

        let rest = &spec[1..];
        let (width_part, scale_part) = match rest.split_once('/') {
            Some((w, s)) => (w, Some(s)),
            None => (rest, None),
        };

        if width_part.is_empty()
            || !width_part.bytes().all(|b| b.is_ascii_digit())
            || (width_part.len() > 1 && width_part.starts_with('0'))
        {
            return Err(malformed());
        }
        // Digit-only but too long for u32 is still a width problem, not a syntax one.
        let width = width_part.parse::<u32>().unwrap_or(u32::MAX);

        let scale = match scale_part {
            None => 1,
            Some("") => return Err(malformed()),
            Some(s) if s.bytes().all(|b| b.is_ascii_digit()) => match s.parse::<u32>() {
                Ok(v) if v > 0 => v,
                _ => return Err(invalid_scale()),
            },
            // Numeric, but negative or fractional.
            Some(s) if s.starts_with('-') || s.contains('.') => return Err(invalid_scale()),
            Some(_) => return Err(malformed()),
        };

        Self::int(field, signed, width, scale)
    }

    /// Value kind.
    #[inline]
    #[must_use]
    pub const fn kind(self) -> PropKind {
        self.kind
    }

    /// Width in bits (64 for `f64`).
    #[inline]
    #[must_use]
    pub const fn width(self) -> u32 {
        self.width
    }

    /// Fixed-point scale, `1` when unscaled.
    #[inline]
    #[must_use]
    pub const fn scale(self) -> u32 {
        self.scale
    }

    /// Whether integer reads sign-extend.
    #[inline]
    #[must_use]
    pub const fn signed(self) -> bool {
        matches!(self.kind, PropKind::SignedInt)
    }
}

impl fmt::Display for PropSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            PropKind::Bool => return f.write_str("bool"),
            PropKind::Float16 => return f.write_str("f16"),
            PropKind::Float32 => return f.write_str("f32"),
            PropKind::Float64 => return f.write_str("f64"),
            PropKind::ObjectRef => return f.write_str("obj"),
            PropKind::StructRef => return f.write_str("sid"),
            PropKind::StringRef => return f.write_str("str"),
            PropKind::SignedInt => 'i',
            PropKind::UnsignedInt => 'u',
        };
        write!(f, "{prefix}{}", self.width)?;
        if self.scale != 1 {
            write!(f, "/{}", self.scale)?;
        }
        Ok(())
    }
}
