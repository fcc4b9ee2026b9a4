//! # Field Accessors
//!
//! One [`FieldAccessor`] per field per schema. Each carries the field's
//! precomputed word index, bit offset, width and scale, plus a read/write
//! function pair picked once from its storage class. Records are plain
//! word slices; no accessor is ever created per record.
//!
//! ## Value Semantics
//!
//! - Integers wrap modulo `2^width` (two's complement when signed). Writes
//!   multiply by the scale and truncate toward zero; reads divide.
//! - `f16`/`f32` writes round to nearest; magnitudes out of range become
//!   infinities.
//! - Handle, object and string fields hold raw 32-bit ids, `0` = none.
//!
//! Typed tokens ([`NumberField`], [`BoolField`], [`HandleField`],
//! [`ObjectField`], [`StringField`]) are resolved by name once, with the
//! storage class checked at that point, so hot-path calls cannot mismatch.
//! Each token remembers the struct type it came from; stores refuse tokens
//! of another schema.

use crate::codec::{extract, f16_from_f64, f16_to_f64, insert, sign_extend, wrap_to_u32};
use crate::layout::{FieldLayout, StorageClass};
use crate::storage::Handle;

/// Reads a field from a record's words.
type ReadFn = fn(&FieldAccessor, &[u32]) -> f64;

/// Writes a field into a record's words.
type WriteFn = fn(&FieldAccessor, &mut [u32], f64);

/// Read/write pair for one field of one schema.
#[derive(Clone, Copy, Debug)]
pub struct FieldAccessor {
    /// Fingerprint of the struct type that built this accessor, `0` if unbound.
    owner: u64,
    class: StorageClass,
    word: usize,
    bit: u32,
    width: u32,
    signed: bool,
    scale: u32,
    read: ReadFn,
    write: WriteFn,
}

impl FieldAccessor {
    /// Builds the accessor for a laid-out field.
    #[must_use]
    pub fn new(field: &FieldLayout) -> Self {
        let (read, write): (ReadFn, WriteFn) = match field.class {
            StorageClass::Bool => (read_bool, write_bool),
            StorageClass::Byte => (read_byte, write_byte),
            StorageClass::Short => (read_short, write_short),
            StorageClass::Int => (read_int, write_int),
            StorageClass::Float16 => (read_f16, write_f16),
            StorageClass::Float32 => (read_f32, write_f32),
            StorageClass::Float64 => (read_f64, write_f64),
            StorageClass::Object | StorageClass::Handle | StorageClass::String => {
                (read_raw, write_raw)
            }
        };
        Self {
            owner: 0,
            class: field.class,
            word: field.word_index(),
            bit: field.bit_offset,
            width: field.width,
            signed: field.signed,
            scale: field.scale,
            read,
            write,
        }
    }

    /// Binds the accessor to a struct type.
    #[inline]
    #[must_use]
    pub(crate) const fn owned_by(mut self, fingerprint: u64) -> Self {
        self.owner = fingerprint;
        self
    }

    /// Fingerprint of the owning struct type, `0` for an unbound accessor.
    #[inline]
    #[must_use]
    pub const fn owner(&self) -> u64 {
        self.owner
    }

    /// Storage class of the field.
    #[inline]
    #[must_use]
    pub const fn class(&self) -> StorageClass {
        self.class
    }

    /// Reads the field as a number.
    ///
    /// Bools read as `0`/`1`; reference fields read their raw id.
    #[inline]
    #[must_use]
    pub fn read(&self, row: &[u32]) -> f64 {
        (self.read)(self, row)
    }

    /// Writes the field from a number. Never fails; see the module docs.
    #[inline]
    pub fn write(&self, row: &mut [u32], value: f64) {
        (self.write)(self, row, value);
    }

    /// The raw 32-bit content of a word-granular field.
    #[inline]
    #[must_use]
    pub(crate) fn raw(&self, row: &[u32]) -> u32 {
        row[self.word]
    }

    #[inline]
    pub(crate) fn set_raw(&self, row: &mut [u32], raw: u32) {
        row[self.word] = raw;
    }

    #[inline]
    fn unscale(&self, value: f64) -> f64 {
        if self.scale == 1 {
            value
        } else {
            value / f64::from(self.scale)
        }
    }

    #[inline]
    fn to_bits(&self, value: f64) -> u32 {
        if self.scale == 1 {
            wrap_to_u32(value)
        } else {
            wrap_to_u32(value * f64::from(self.scale))
        }
    }

    #[inline]
    const fn byte_index(&self) -> usize {
        (self.bit / 8) as usize
    }
}

// ============================================================================
// PER-CLASS CODECS
// ============================================================================

fn read_bool(acc: &FieldAccessor, row: &[u32]) -> f64 {
    f64::from(extract(row[acc.word], acc.bit, 1))
}

fn write_bool(acc: &FieldAccessor, row: &mut [u32], value: f64) {
    let bit = u32::from(value != 0.0 && !value.is_nan());
    row[acc.word] = insert(row[acc.word], acc.bit, 1, bit);
}

fn read_byte(acc: &FieldAccessor, row: &[u32]) -> f64 {
    let byte = row[acc.word].to_le_bytes()[acc.byte_index()];
    let value = if acc.signed {
        f64::from(byte as i8)
    } else {
        f64::from(byte)
    };
    acc.unscale(value)
}

fn write_byte(acc: &FieldAccessor, row: &mut [u32], value: f64) {
    let mut bytes = row[acc.word].to_le_bytes();
    bytes[acc.byte_index()] = acc.to_bits(value) as u8;
    row[acc.word] = u32::from_le_bytes(bytes);
}

fn read_short(acc: &FieldAccessor, row: &[u32]) -> f64 {
    let bytes = row[acc.word].to_le_bytes();
    let at = acc.byte_index();
    let raw = u16::from_le_bytes([bytes[at], bytes[at + 1]]);
    let value = if acc.signed {
        f64::from(raw as i16)
    } else {
        f64::from(raw)
    };
    acc.unscale(value)
}

fn write_short(acc: &FieldAccessor, row: &mut [u32], value: f64) {
    let mut bytes = row[acc.word].to_le_bytes();
    let at = acc.byte_index();
    let [lo, hi] = (acc.to_bits(value) as u16).to_le_bytes();
    bytes[at] = lo;
    bytes[at + 1] = hi;
    row[acc.word] = u32::from_le_bytes(bytes);
}

fn read_int(acc: &FieldAccessor, row: &[u32]) -> f64 {
    let raw = extract(row[acc.word], acc.bit, acc.width);
    let value = if acc.signed {
        f64::from(sign_extend(raw, acc.width))
    } else {
        f64::from(raw)
    };
    acc.unscale(value)
}

fn write_int(acc: &FieldAccessor, row: &mut [u32], value: f64) {
    row[acc.word] = insert(row[acc.word], acc.bit, acc.width, acc.to_bits(value));
}

fn read_f16(acc: &FieldAccessor, row: &[u32]) -> f64 {
    f16_to_f64(extract(row[acc.word], acc.bit, 16) as u16)
}

fn write_f16(acc: &FieldAccessor, row: &mut [u32], value: f64) {
    let bits = u32::from(f16_from_f64(value));
    row[acc.word] = insert(row[acc.word], acc.bit, 16, bits);
}

fn read_f32(acc: &FieldAccessor, row: &[u32]) -> f64 {
    f64::from(f32::from_bits(row[acc.word]))
}

fn write_f32(acc: &FieldAccessor, row: &mut [u32], value: f64) {
    row[acc.word] = (value as f32).to_bits();
}

fn read_f64(acc: &FieldAccessor, row: &[u32]) -> f64 {
    let lo = u64::from(row[acc.word]);
    let hi = u64::from(row[acc.word + 1]);
    f64::from_bits(lo | (hi << 32))
}

fn write_f64(acc: &FieldAccessor, row: &mut [u32], value: f64) {
    let bits = value.to_bits();
    row[acc.word] = bits as u32;
    row[acc.word + 1] = (bits >> 32) as u32;
}

fn read_raw(acc: &FieldAccessor, row: &[u32]) -> f64 {
    f64::from(row[acc.word])
}

fn write_raw(acc: &FieldAccessor, row: &mut [u32], value: f64) {
    row[acc.word] = wrap_to_u32(value);
}

// ============================================================================
// TYPED TOKENS
// ============================================================================

/// Accessor for a numeric field (`i*`, `u*`, `f16`, `f32`, `f64`).
#[derive(Clone, Copy, Debug)]
pub struct NumberField(pub(crate) FieldAccessor);

impl NumberField {
    /// Reads the value, sign-extended and unscaled.
    #[inline]
    #[must_use]
    pub fn get(&self, row: &[u32]) -> f64 {
        self.0.read(row)
    }

    /// Writes the value, scaled and wrapped to the field width.
    #[inline]
    pub fn set(&self, row: &mut [u32], value: f64) {
        self.0.write(row, value);
    }
}

/// Accessor for a `bool` field.
#[derive(Clone, Copy, Debug)]
pub struct BoolField(pub(crate) FieldAccessor);

impl BoolField {
    /// Tests the bit.
    #[inline]
    #[must_use]
    pub fn is(&self, row: &[u32]) -> bool {
        extract(row[self.0.word], self.0.bit, 1) != 0
    }

    /// Sets or clears the bit, leaving sibling bits untouched.
    #[inline]
    pub fn set(&self, row: &mut [u32], value: bool) {
        row[self.0.word] = insert(row[self.0.word], self.0.bit, 1, u32::from(value));
    }
}

/// Accessor for a `sid` field holding another record's handle.
///
/// No dereferencing happens here; the value is only a number.
#[derive(Clone, Copy, Debug)]
pub struct HandleField(pub(crate) FieldAccessor);

impl HandleField {
    /// Reads the stored handle, `None` for the `0` sentinel.
    #[inline]
    #[must_use]
    pub fn get(&self, row: &[u32]) -> Option<Handle> {
        Handle::from_raw(self.0.raw(row))
    }

    /// Stores a handle, `None` writes `0`.
    #[inline]
    pub fn set(&self, row: &mut [u32], handle: Option<Handle>) {
        self.0.set_raw(row, Handle::to_raw(handle));
    }
}

/// Accessor for an `obj` field. Values live in the store's object table.
#[derive(Clone, Copy, Debug)]
pub struct ObjectField(pub(crate) FieldAccessor);

impl ObjectField {
    /// The stored table id, `0` when empty.
    #[inline]
    #[must_use]
    pub fn id(&self, row: &[u32]) -> u32 {
        self.0.raw(row)
    }
}

/// Accessor for a `str` field. Values live in the store's string table.
#[derive(Clone, Copy, Debug)]
pub struct StringField(pub(crate) FieldAccessor);

impl StringField {
    /// The stored table id, `0` when empty.
    #[inline]
    #[must_use]
    pub fn id(&self, row: &[u32]) -> u32 {
        self.0.raw(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;
    use crate::schema::Schema;

    fn accessors(pairs: &[(&str, &str)]) -> (Vec<FieldAccessor>, usize) {
        let mut all = vec![("handle", "sid")];
        all.extend_from_slice(pairs);
        let layout = Layout::compute(&Schema::from_pairs(all).unwrap());
        let accs = layout.fields()[1..].iter().map(FieldAccessor::new).collect();
        (accs, layout.stride_words())
    }

    #[test]
    fn test_adjacent_nibbles() {
        let (accs, words) = accessors(&[("A", "u4"), ("B", "u4")]);
        let mut row = vec![0u32; words];
        accs[0].write(&mut row, 5.0);
        accs[1].write(&mut row, 9.0);
        assert_eq!(accs[0].read(&row), 5.0);
        assert_eq!(accs[1].read(&row), 9.0);
        assert_eq!(row[1], 0x95);
    }

    #[test]
    fn test_byte_wraps() {
        let (accs, words) = accessors(&[("u", "u8"), ("i", "i8")]);
        assert_eq!(accs[0].class(), StorageClass::Byte);
        assert_eq!(accs[1].class(), StorageClass::Byte);

        let mut row = vec![0u32; words];
        accs[0].write(&mut row, 256.0);
        accs[1].write(&mut row, -1.0);
        assert_eq!(accs[0].read(&row), 0.0);
        assert_eq!(accs[1].read(&row), -1.0);

        accs[1].write(&mut row, 128.0);
        assert_eq!(accs[1].read(&row), -128.0);
        assert_eq!(accs[0].read(&row), 0.0);
    }

    #[test]
    fn test_truncates_toward_zero() {
        let (accs, words) = accessors(&[("n", "i12")]);
        let mut row = vec![0u32; words];
        accs[0].write(&mut row, 1.9);
        assert_eq!(accs[0].read(&row), 1.0);
        accs[0].write(&mut row, -1.9);
        assert_eq!(accs[0].read(&row), -1.0);
    }

    #[test]
    fn test_short_at_byte_offset() {
        let (accs, words) = accessors(&[("pad", "u8"), ("s", "i16"), ("tail", "u8")]);
        assert_eq!(accs[1].class(), StorageClass::Short);

        let mut row = vec![0u32; words];
        accs[0].write(&mut row, 0xaa as f64);
        accs[2].write(&mut row, 0xbb as f64);
        accs[1].write(&mut row, -2.0);
        assert_eq!(accs[1].read(&row), -2.0);
        assert_eq!(row[1], 0xbbff_feaa);

        accs[1].write(&mut row, 70000.0);
        assert_eq!(accs[1].read(&row), f64::from(70000i32 - 65536));
    }

    #[test]
    fn test_fixed_point_scale() {
        let (accs, words) = accessors(&[("hp", "i16/100"), ("speed", "u10/4")]);
        let mut row = vec![0u32; words];
        accs[0].write(&mut row, -12.5);
        accs[1].write(&mut row, 3.75);
        assert_eq!(accs[0].read(&row), -12.5);
        assert_eq!(accs[1].read(&row), 3.75);

        // 0.3 * 4 = 1.2 truncates to 1 -> reads back 0.25.
        accs[1].write(&mut row, 0.3);
        assert_eq!(accs[1].read(&row), 0.25);
    }

    #[test]
    fn test_scaled_write_wraps() {
        let (accs, words) = accessors(&[("d", "u8/10"), ("q", "i8/4")]);
        let mut row = vec![0u32; words];

        accs[0].write(&mut row, 25.5);
        assert_eq!(accs[0].read(&row), 25.5);
        // 25.6 * 10 = 256 does not fit in eight bits.
        accs[0].write(&mut row, 25.6);
        assert_eq!(accs[0].read(&row), 0.0);

        // -33 * 4 = -132 wraps to 124.
        accs[1].write(&mut row, -33.0);
        assert_eq!(accs[1].read(&row), 31.0);
        assert_eq!(accs[0].read(&row), 0.0);
    }

    #[test]
    fn test_full_width_ints() {
        let (accs, words) = accessors(&[("u", "u32"), ("i", "i32")]);
        let mut row = vec![0u32; words];
        accs[0].write(&mut row, 4_294_967_295.0);
        accs[1].write(&mut row, -2_147_483_648.0);
        assert_eq!(accs[0].read(&row), 4_294_967_295.0);
        assert_eq!(accs[1].read(&row), -2_147_483_648.0);

        accs[0].write(&mut row, -1.0);
        assert_eq!(accs[0].read(&row), 4_294_967_295.0);
    }

    #[test]
    fn test_floats() {
        let (accs, words) = accessors(&[("h", "f16"), ("s", "f32"), ("d", "f64")]);
        let mut row = vec![0u32; words];

        for v in [0.0, 1.25, -3.5, 65504.0, f64::INFINITY, f64::NEG_INFINITY] {
            accs[0].write(&mut row, v);
            assert_eq!(accs[0].read(&row), v);
        }
        accs[0].write(&mut row, f64::NAN);
        assert!(accs[0].read(&row).is_nan());
        accs[0].write(&mut row, 70000.0);
        assert_eq!(accs[0].read(&row), f64::INFINITY);

        accs[1].write(&mut row, 0.5);
        assert_eq!(accs[1].read(&row), 0.5);
        accs[1].write(&mut row, 1.0e40);
        assert_eq!(accs[1].read(&row), f64::INFINITY);

        accs[2].write(&mut row, std::f64::consts::PI);
        assert_eq!(accs[2].read(&row), std::f64::consts::PI);
    }

    #[test]
    fn test_bool_leaves_siblings() {
        let (accs, words) = accessors(&[("a", "bool"), ("b", "bool"), ("c", "bool")]);
        let a = BoolField(accs[0]);
        let b = BoolField(accs[1]);
        let c = BoolField(accs[2]);
        let mut row = vec![0u32; words];

        a.set(&mut row, true);
        c.set(&mut row, true);
        assert!(a.is(&row));
        assert!(!b.is(&row));
        assert!(c.is(&row));

        a.set(&mut row, false);
        assert!(!a.is(&row));
        assert!(c.is(&row));
        assert_eq!(row[1], 0b100);
    }

    #[test]
    fn test_handle_field_sentinel() {
        let (accs, words) = accessors(&[("next", "sid")]);
        let next = HandleField(accs[0]);
        let mut row = vec![0u32; words];
        assert!(next.get(&row).is_none());

        next.set(&mut row, Handle::from_raw(7));
        assert_eq!(next.get(&row).map(Handle::get), Some(7));
        next.set(&mut row, None);
        assert_eq!(row[1], 0);
    }
}
