//! # Record Handles
//!
//! Handles are opaque positive integers:
//! - Issued once per allocation, in increasing order
//! - Never reused, even after the record is freed
//! - Stable across compaction (the slot behind a handle may move)
//!
//! `0` is reserved as the "no record" sentinel inside handle-typed fields.

use std::fmt;
use std::num::NonZeroU32;

/// Stable identifier of a live record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Handle(NonZeroU32);

impl Handle {
    /// The first handle a store issues.
    pub const FIRST: Self = Self(NonZeroU32::MIN);

    /// Rebuilds a handle from the raw value stored in a handle field.
    ///
    /// Returns `None` for the `0` sentinel.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// The raw value written into handle fields.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// The handle issued after this one, or `None` once the 32-bit space is spent.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Raw value of an optional handle, `0` for `None`.
    #[inline]
    #[must_use]
    pub const fn to_raw(handle: Option<Self>) -> u32 {
        match handle {
            Some(h) => h.get(),
            None => 0,
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
