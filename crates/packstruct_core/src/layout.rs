//! # Layout Engine
//!
//! Turns an ordered [`Schema`] into bit-exact offsets and a record stride.
//!
//! ## Packing Rules
//!
//! A single left-to-right scan keeps `(word, bit)`, starting at `(0, 0)`:
//!
//! ```text
//! bool         1 bit   new word if bit + 1 > 32
//! i/u{w}       w bits  new word if bit + w > 32
//!                      bit % 8 == 0 && w == 8   -> Byte
//!                      bit % 8 == 0 && w == 16  -> Short
//!                      otherwise                -> Int
//! f16          16 bits round bit up to a byte; new word if it still overflows
//! f32/obj/sid/str      word-aligned, 32 bits
//! f64                  word-aligned, 64 bits (two contiguous words)
//! ```
//!
//! No field straddles a 32-bit word. The stride is the final word offset,
//! plus one word if the last word is partially used, so it is always a
//! multiple of 4.

use std::fmt;

use crate::schema::{PropKind, PropSpec, Schema};

/// Bits in one packing word.
pub const WORD_BITS: u32 = 32;

/// Bytes in one packing word.
pub const WORD_BYTES: usize = 4;

/// How a field is physically read and written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// One bit inside a word.
    Bool,
    /// Byte-aligned 8-bit integer.
    Byte,
    /// Byte-aligned 16-bit integer.
    Short,
    /// Any other integer: 1..=32 bits at an arbitrary bit offset.
    Int,
    /// Byte-aligned binary16.
    Float16,
    /// Word-aligned binary32.
    Float32,
    /// Two contiguous words, binary64.
    Float64,
    /// Word-aligned object table id.
    Object,
    /// Word-aligned raw record handle.
    Handle,
    /// Word-aligned string table id.
    String,
}

impl StorageClass {
    /// Whether reads produce a plain number.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Byte | Self::Short | Self::Int | Self::Float16 | Self::Float32 | Self::Float64
        )
    }
}

/// Placement of one field inside a record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldLayout {
    /// Field name.
    pub name: String,
    /// Physical storage class.
    pub class: StorageClass,
    /// Byte offset of the containing word within the record (multiple of 4).
    pub byte_offset: usize,
    /// First bit within that word (0 for word-granular classes).
    pub bit_offset: u32,
    /// Width in bits.
    pub width: u32,
    /// Sign-extend on read.
    pub signed: bool,
    /// Fixed-point scale (1 when unscaled).
    pub scale: u32,
}

impl FieldLayout {
    /// Index of the containing word within a record.
    #[inline]
    #[must_use]
    pub const fn word_index(&self) -> usize {
        self.byte_offset / WORD_BYTES
    }
}

/// Offsets for every field of a schema plus the record stride.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Layout {
    fields: Vec<FieldLayout>,
    stride_bytes: usize,
}

/// Scan state of the packer.
#[derive(Clone, Copy, Debug, Default)]
struct Cursor {
    word_offset: usize,
    bit: u32,
}

impl Cursor {
    #[inline]
    fn next_word(&mut self) {
        self.word_offset += WORD_BYTES;
        self.bit = 0;
    }

    /// Aligns the cursor for a field and returns the starting bit.
    fn place(&mut self, class: StorageClass, width: u32) -> u32 {
        match class {
            StorageClass::Bool | StorageClass::Byte | StorageClass::Short | StorageClass::Int => {
                if self.bit + width > WORD_BITS {
                    self.next_word();
                }
            }
            StorageClass::Float16 => {
                self.bit = self.bit.next_multiple_of(8);
                if self.bit + width > WORD_BITS {
                    self.next_word();
                }
            }
            StorageClass::Float32
            | StorageClass::Float64
            | StorageClass::Object
            | StorageClass::Handle
            | StorageClass::String => {
                if self.bit != 0 {
                    self.next_word();
                }
            }
        }
        self.bit
    }

    /// Moves past a field of `width` bits that starts at `bit`.
    #[inline]
    fn advance(&mut self, bit: u32, width: u32) {
        let end = bit + width;
        self.word_offset += (end / WORD_BITS) as usize * WORD_BYTES;
        self.bit = end % WORD_BITS;
    }
}

/// Storage class of an integer starting at `bit`.
#[inline]
const fn int_class(bit: u32, width: u32) -> StorageClass {
    if bit % 8 == 0 && width == 8 {
        StorageClass::Byte
    } else if bit % 8 == 0 && width == 16 {
        StorageClass::Short
    } else {
        StorageClass::Int
    }
}

impl Layout {
    /// Computes the layout of a schema.
    ///
    /// Pure: equal schemas always produce equal layouts.
    #[must_use]
    pub fn compute(schema: &Schema) -> Self {
        let mut cursor = Cursor::default();
        let mut fields = Vec::with_capacity(schema.len());

        for (name, spec) in schema.fields() {
            let width = spec.width();
            let provisional = provisional_class(*spec);
            let bit = cursor.place(provisional, width);
            let class = if provisional == StorageClass::Int {
                int_class(bit, width)
            } else {
                provisional
            };

            fields.push(FieldLayout {
                name: name.clone(),
                class,
                byte_offset: cursor.word_offset,
                bit_offset: bit,
                width,
                signed: spec.signed(),
                scale: spec.scale(),
            });
            cursor.advance(bit, width);
        }

        let stride_bytes = cursor.word_offset + if cursor.bit != 0 { WORD_BYTES } else { 0 };
        tracing::debug!(
            "layout computed: {} fields, stride {} bytes",
            fields.len(),
            stride_bytes
        );

        Self {
            fields,
            stride_bytes,
        }
    }

    /// Field placements in schema order.
    #[must_use]
    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    /// Placement of a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Position of a field by name.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Record size in bytes (multiple of 4).
    #[inline]
    #[must_use]
    pub const fn stride_bytes(&self) -> usize {
        self.stride_bytes
    }

    /// Record size in 32-bit words.
    #[inline]
    #[must_use]
    pub const fn stride_words(&self) -> usize {
        self.stride_bytes / WORD_BYTES
    }
}

/// Storage class before byte-alignment specialization of integers.
const fn provisional_class(spec: PropSpec) -> StorageClass {
    match spec.kind() {
        PropKind::Bool => StorageClass::Bool,
        PropKind::SignedInt | PropKind::UnsignedInt => StorageClass::Int,
        PropKind::Float16 => StorageClass::Float16,
        PropKind::Float32 => StorageClass::Float32,
        PropKind::Float64 => StorageClass::Float64,
        PropKind::ObjectRef => StorageClass::Object,
        PropKind::StructRef => StorageClass::Handle,
        PropKind::StringRef => StorageClass::String,
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "stride {} bytes", self.stride_bytes)?;
        for field in &self.fields {
            write!(
                f,
                "  {:<16} {:?} @ {}:{} w{}",
                field.name, field.class, field.byte_offset, field.bit_offset, field.width
            )?;
            if field.signed {
                f.write_str(" signed")?;
            }
            if field.scale != 1 {
                write!(f, " /{}", field.scale)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
