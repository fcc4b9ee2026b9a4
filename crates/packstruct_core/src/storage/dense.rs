//! # Dense Record Storage
//!
//! One contiguous word buffer of fixed-stride records plus a parallel table
//! of instance wrappers:
//!
//! ```text
//! words:     [ rec 0 | rec 1 | rec 2 | ... | rec len-1 | 0 0 0 | 0 0 0 ]
//! occupants: [  I3   |  I0   |  I1   | ... ]   slot -> instance
//! cursors:   [ I0 -> 4*stride, I1 -> 8*stride, ... ]   instance -> byte cursor
//! ```
//!
//! Live records always occupy the prefix `[0, len)`.
//!
//! - `alloc`: O(1), hands out the instance parked at slot `len`
//! - `free`: O(1), moves the last live record into the hole, zeroes the
//!   vacated slot, and swaps the two instances' cursors so every instance
//!   keeps pointing at the record it represents
//! - `grow`: adds whole pages; never shrinks
//!
//! Nothing on these paths allocates except `grow`.

use std::any::Any;
use std::fmt::Write as _;
use std::ops::Range;
use std::sync::Arc;

use crate::accessor::{
    BoolField, FieldAccessor, HandleField, NumberField, ObjectField, StringField,
};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::layout::WORD_BYTES;
use crate::storage::refs::RefTable;
use crate::storage::Handle;
use crate::struct_type::StructType;

/// Value type of `obj` fields.
pub type ObjectRef = Arc<dyn Any + Send + Sync>;

/// Wrapper of one record in a [`DenseStore`].
///
/// An instance keeps representing the same record when that record is moved
/// by compaction. After its own record is freed, it is parked at the end of
/// the buffer and handed out again by a later `alloc`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Instance(usize);

impl Instance {
    /// Wrapper id, stable for the store's lifetime.
    #[inline]
    #[must_use]
    pub const fn id(self) -> usize {
        self.0
    }
}

/// A record move performed by [`DenseStore::free`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relocation {
    /// Slot the record occupied before the free (the old last slot).
    pub from: usize,
    /// Slot it occupies now (the freed slot).
    pub to: usize,
}

/// Cursor-addressed record buffer.
///
/// # Thread Safety
///
/// Single owner. Wrap in a mutex to share.
pub struct DenseStore {
    ty: Arc<StructType>,
    /// Record words, `capacity * stride` long.
    words: Vec<u32>,
    /// Stride in words.
    stride: usize,
    /// Number of live records.
    len: usize,
    /// Slots available before the next grow.
    capacity: usize,
    /// Slots added per page.
    page_size: usize,
    /// Instance id -> byte cursor of the record it represents.
    cursors: Vec<usize>,
    /// Slot -> instance currently representing it.
    occupants: Vec<Instance>,
    objects: RefTable<ObjectRef>,
    strings: RefTable<Arc<str>>,
}

impl DenseStore {
    /// Creates a store with `initial_pages * page_size` zeroed slots.
    ///
    /// # Errors
    ///
    /// [`StoreError::ZeroPageSize`] if the page size is zero.
    pub fn new(ty: Arc<StructType>, config: StoreConfig) -> StoreResult<Self> {
        if config.page_size == 0 {
            return Err(StoreError::ZeroPageSize);
        }

        let stride = ty.stride_words();
        let mut store = Self {
            ty,
            words: Vec::new(),
            stride,
            len: 0,
            capacity: 0,
            page_size: config.page_size,
            cursors: Vec::new(),
            occupants: Vec::new(),
            objects: RefTable::new(),
            strings: RefTable::new(),
        };
        store.grow(config.initial_pages);

        tracing::debug!(
            "dense store created: stride {} bytes, page size {}, capacity {}",
            store.stride_bytes(),
            store.page_size,
            store.capacity
        );
        Ok(store)
    }

    /// The struct type this store holds.
    #[must_use]
    pub fn struct_type(&self) -> &Arc<StructType> {
        &self.ty
    }

    /// Number of live records.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if no record is live.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slots available without growing.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots added per page.
    #[inline]
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Record size in bytes.
    #[inline]
    #[must_use]
    pub const fn stride_bytes(&self) -> usize {
        self.stride * WORD_BYTES
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Claims the next free slot. Grows by one page when full.
    ///
    /// The record is all zeroes.
    pub fn alloc(&mut self) -> Instance {
        if self.len == self.capacity {
            self.grow(1);
        }
        let slot = self.len;
        let instance = self.occupants[slot];
        self.cursors[instance.0] = self.cursor_of_slot(slot);
        self.len += 1;
        instance
    }

    /// Frees the record represented by `instance`.
    ///
    /// The last live record is copied into the freed slot and the vacated
    /// slot is zeroed. `obj`/`str` ids held by the freed record are released.
    ///
    /// Returns the move that happened, `None` if the freed record was last.
    ///
    /// # Errors
    ///
    /// [`StoreError::Underflow`] on an empty store,
    /// [`StoreError::StaleInstance`] if the instance's record is not live.
    pub fn free(&mut self, instance: Instance) -> StoreResult<Option<Relocation>> {
        if self.len == 0 {
            return Err(StoreError::Underflow);
        }
        let slot = self.slot_of(instance);
        if slot >= self.len {
            return Err(StoreError::StaleInstance {
                slot,
                len: self.len,
            });
        }
        Ok(self.free_slot(slot))
    }

    /// Frees the record at a live slot. Caller checked `slot < len`.
    pub(crate) fn free_slot(&mut self, slot: usize) -> Option<Relocation> {
        self.release_refs(slot);

        self.len -= 1;
        let last = self.len;
        let vacated = self.row_range(last);

        let relocation = if slot == last {
            None
        } else {
            self.words.copy_within(vacated.clone(), slot * self.stride);

            let moved = self.occupants[last];
            let freed = self.occupants[slot];
            self.occupants[slot] = moved;
            self.occupants[last] = freed;
            self.cursors[moved.0] = self.cursor_of_slot(slot);
            self.cursors[freed.0] = self.cursor_of_slot(last);

            Some(Relocation { from: last, to: slot })
        };

        self.words[vacated].fill(0);
        relocation
    }

    /// Adds `pages * page_size` zeroed slots. Existing records keep their slots.
    pub fn grow(&mut self, pages: usize) {
        if pages == 0 {
            return;
        }
        let old_capacity = self.capacity;
        let new_capacity = old_capacity + pages * self.page_size;

        self.words.resize(new_capacity * self.stride, 0);
        self.cursors.reserve(new_capacity - old_capacity);
        self.occupants.reserve(new_capacity - old_capacity);
        for slot in old_capacity..new_capacity {
            let instance = Instance(self.cursors.len());
            self.cursors.push(self.cursor_of_slot(slot));
            self.occupants.push(instance);
        }
        self.capacity = new_capacity;

        tracing::debug!("dense store grew: {} -> {} slots", old_capacity, new_capacity);
    }

    /// Frees every record. Capacity is kept.
    pub fn clear(&mut self) {
        for slot in 0..self.len {
            self.release_refs(slot);
        }
        let live = 0..self.len * self.stride;
        self.words[live].fill(0);
        tracing::trace!("dense store cleared: {} records dropped", self.len);
        self.len = 0;
    }

    // ========================================================================
    // ADDRESSING
    // ========================================================================

    #[inline]
    fn cursor_of_slot(&self, slot: usize) -> usize {
        slot * self.stride_bytes()
    }

    #[inline]
    fn row_range(&self, slot: usize) -> Range<usize> {
        let start = slot * self.stride;
        start..start + self.stride
    }

    /// Byte offset of the record `instance` represents.
    ///
    /// # Panics
    ///
    /// If `instance` was not issued by this store.
    #[inline]
    #[must_use]
    pub fn cursor(&self, instance: Instance) -> usize {
        self.cursors[instance.0]
    }

    /// Slot of the record `instance` represents.
    ///
    /// # Panics
    ///
    /// If `instance` was not issued by this store.
    #[inline]
    #[must_use]
    pub fn slot_of(&self, instance: Instance) -> usize {
        self.cursor(instance) / self.stride_bytes()
    }

    /// The instance representing a live slot.
    #[inline]
    #[must_use]
    pub fn instance_at(&self, slot: usize) -> Option<Instance> {
        if slot < self.len {
            Some(self.occupants[slot])
        } else {
            None
        }
    }

    /// Checks whether the instance currently represents a live record.
    #[inline]
    #[must_use]
    pub fn is_live(&self, instance: Instance) -> bool {
        self.cursors
            .get(instance.0)
            .is_some_and(|&cursor| cursor < self.len * self.stride_bytes())
    }

    /// Live instances in slot order. The order changes under `free`.
    pub fn iter(&self) -> impl Iterator<Item = Instance> + '_ {
        self.occupants[..self.len].iter().copied()
    }

    /// Words of the record `instance` represents.
    ///
    /// # Panics
    ///
    /// If `instance` was not issued by this store.
    #[inline]
    #[must_use]
    pub fn row(&self, instance: Instance) -> &[u32] {
        let range = self.row_range(self.slot_of(instance));
        &self.words[range]
    }

    /// Mutable words of the record `instance` represents.
    ///
    /// # Panics
    ///
    /// If `instance` was not issued by this store.
    #[inline]
    pub fn row_mut(&mut self, instance: Instance) -> &mut [u32] {
        let range = self.row_range(self.slot_of(instance));
        &mut self.words[range]
    }

    /// Words of every slot, live or not.
    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    // ========================================================================
    // FIELD ACCESS
    // ========================================================================

    /// Rejects tokens resolved from another schema's struct type.
    #[inline]
    fn check(&self, accessor: &FieldAccessor) -> StoreResult<()> {
        let expected = self.ty.fingerprint();
        if accessor.owner() == expected {
            Ok(())
        } else {
            Err(StoreError::ForeignField {
                owner: accessor.owner(),
                expected,
            })
        }
    }

    /// Reads a numeric field.
    ///
    /// # Errors
    ///
    /// [`StoreError::ForeignField`] if the token belongs to another schema.
    #[inline]
    pub fn get(&self, instance: Instance, field: &NumberField) -> StoreResult<f64> {
        self.check(&field.0)?;
        Ok(field.get(self.row(instance)))
    }

    /// Writes a numeric field.
    ///
    /// # Errors
    ///
    /// [`StoreError::ForeignField`] if the token belongs to another schema.
    #[inline]
    pub fn set(&mut self, instance: Instance, field: &NumberField, value: f64) -> StoreResult<()> {
        self.check(&field.0)?;
        field.set(self.row_mut(instance), value);
        Ok(())
    }

    /// Tests a `bool` field.
    ///
    /// # Errors
    ///
    /// [`StoreError::ForeignField`] if the token belongs to another schema.
    #[inline]
    pub fn is(&self, instance: Instance, field: &BoolField) -> StoreResult<bool> {
        self.check(&field.0)?;
        Ok(field.is(self.row(instance)))
    }

    /// Writes a `bool` field.
    ///
    /// # Errors
    ///
    /// [`StoreError::ForeignField`] if the token belongs to another schema.
    #[inline]
    pub fn set_bool(
        &mut self,
        instance: Instance,
        field: &BoolField,
        value: bool,
    ) -> StoreResult<()> {
        self.check(&field.0)?;
        field.set(self.row_mut(instance), value);
        Ok(())
    }

    /// Reads a `sid` field.
    ///
    /// # Errors
    ///
    /// [`StoreError::ForeignField`] if the token belongs to another schema.
    #[inline]
    pub fn get_handle(
        &self,
        instance: Instance,
        field: &HandleField,
    ) -> StoreResult<Option<Handle>> {
        self.check(&field.0)?;
        Ok(field.get(self.row(instance)))
    }

    /// Writes a `sid` field.
    ///
    /// # Errors
    ///
    /// [`StoreError::ForeignField`] if the token belongs to another schema.
    #[inline]
    pub fn set_handle(
        &mut self,
        instance: Instance,
        field: &HandleField,
        value: Option<Handle>,
    ) -> StoreResult<()> {
        self.check(&field.0)?;
        field.set(self.row_mut(instance), value);
        Ok(())
    }

    /// Reads an `obj` field.
    ///
    /// # Errors
    ///
    /// [`StoreError::ForeignField`] if the token belongs to another schema.
    #[inline]
    pub fn get_object(
        &self,
        instance: Instance,
        field: &ObjectField,
    ) -> StoreResult<Option<&ObjectRef>> {
        self.check(&field.0)?;
        Ok(self.objects.get(field.id(self.row(instance))))
    }

    /// Writes an `obj` field, releasing the previous value.
    ///
    /// # Errors
    ///
    /// [`StoreError::ForeignField`] if the token belongs to another schema.
    pub fn set_object(
        &mut self,
        instance: Instance,
        field: &ObjectField,
        value: Option<ObjectRef>,
    ) -> StoreResult<()> {
        self.check(&field.0)?;
        let range = self.row_range(self.slot_of(instance));
        let old = field.id(&self.words[range.clone()]);
        self.objects.release(old);
        let id = value.map_or(0, |v| self.objects.acquire(v));
        field.0.set_raw(&mut self.words[range], id);
        Ok(())
    }

    /// Reads a `str` field.
    ///
    /// # Errors
    ///
    /// [`StoreError::ForeignField`] if the token belongs to another schema.
    #[inline]
    pub fn get_str(&self, instance: Instance, field: &StringField) -> StoreResult<Option<&str>> {
        self.check(&field.0)?;
        Ok(self
            .strings
            .get(field.id(self.row(instance)))
            .map(AsRef::as_ref))
    }

    /// Writes a `str` field, releasing the previous value.
    ///
    /// # Errors
    ///
    /// [`StoreError::ForeignField`] if the token belongs to another schema.
    pub fn set_str(
        &mut self,
        instance: Instance,
        field: &StringField,
        value: Option<&str>,
    ) -> StoreResult<()> {
        self.check(&field.0)?;
        let range = self.row_range(self.slot_of(instance));
        let old = field.id(&self.words[range.clone()]);
        self.strings.release(old);
        let id = value.map_or(0, |v| self.strings.acquire(Arc::from(v)));
        field.0.set_raw(&mut self.words[range], id);
        Ok(())
    }

    /// Number of `obj` values currently held by live records.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of `str` values currently held by live records.
    #[must_use]
    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    fn release_refs(&mut self, slot: usize) {
        let range = self.row_range(slot);
        let row = &self.words[range];
        for field in self.ty.object_fields() {
            self.objects.release(field.id(row));
        }
        for field in self.ty.string_fields() {
            self.strings.release(field.id(row));
        }
    }

    // ========================================================================
    // DEBUG
    // ========================================================================

    /// Hex dump of every slot, one line per slot.
    ///
    /// Each word is printed as its four little-endian bytes; words are
    /// separated by a space.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::with_capacity(self.words.len() * 9 + self.capacity);
        for record in self.words.chunks_exact(self.stride.max(1)) {
            for (i, word) in record.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                for byte in word.to_le_bytes() {
                    let _ = write!(out, "{byte:02x}");
                }
            }
            out.push('\n');
        }
        out
    }
}
