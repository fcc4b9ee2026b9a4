//! # Handle-Addressed Store
//!
//! [`Store`] wraps a [`DenseStore`] with a handle <-> slot bijection:
//!
//! ```text
//! slots:   Handle -> slot        (HashMap, O(1) lookup)
//! handles: slot   -> Handle      (Vec, live prefix only)
//! ```
//!
//! Slots move when `free` compacts the buffer; handles never do. Both maps
//! are updated inside `alloc`/`free` so they always describe the same
//! bijection between live handles and slots `[0, len)`.
//!
//! Each record also carries its own handle in the reserved
//! [`HANDLE_FIELD`](crate::schema::HANDLE_FIELD), so a raw record dump is
//! self-describing.
//!
//! ## Example
//!
//! ```rust
//! use packstruct_core::{Schema, Store, StoreConfig};
//!
//! let schema = Schema::from_pairs([("handle", "sid"), ("hp", "u8"), ("next", "sid")])?;
//! let mut store = Store::new(schema, StoreConfig::default())?;
//!
//! let hp = store.struct_type().number("hp")?;
//! let next = store.struct_type().handle("next")?;
//!
//! let a = store.alloc()?;
//! let b = store.alloc()?;
//! store.set(a, &hp, 100.0)?;
//! store.set_handle(a, &next, Some(b))?;
//!
//! assert_eq!(store.get(a, &hp)?, 100.0);
//! assert_eq!(store.get_handle(a, &next)?, Some(b));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::accessor::{BoolField, HandleField, NumberField, ObjectField, StringField};
use crate::config::{StoreConfig, StructConfig};
use crate::error::{ConfigError, SchemaError, StoreError, StoreResult};
use crate::layout::StorageClass;
use crate::schema::Schema;
use crate::storage::{DenseStore, Handle, Instance, ObjectRef, Relocation};
use crate::struct_type::StructType;

/// A field value of any kind, for by-name access off the hot path.
#[derive(Clone, Debug)]
pub enum FieldValue {
    /// `bool` field.
    Bool(bool),
    /// Any numeric field, unscaled.
    Number(f64),
    /// `sid` field.
    Handle(Option<Handle>),
    /// `obj` field.
    Object(Option<ObjectRef>),
    /// `str` field.
    String(Option<String>),
}

impl FieldValue {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "a bool field",
            Self::Number(_) => "a numeric field",
            Self::Handle(_) => "a sid field",
            Self::Object(_) => "an obj field",
            Self::String(_) => "a str field",
        }
    }
}

/// Dense record store addressed by stable [`Handle`]s.
pub struct Store {
    dense: DenseStore,
    self_handle: HandleField,
    /// Handle -> slot of every live record.
    slots: HashMap<Handle, usize>,
    /// Slot -> handle, `len` entries.
    handles: Vec<Handle>,
    /// Next handle to issue, `None` once the 32-bit space is spent.
    next_handle: Option<Handle>,
}

impl Store {
    /// Creates a store for `schema`.
    ///
    /// # Errors
    ///
    /// [`StoreError::ZeroPageSize`] if the page size is zero.
    pub fn new(schema: Schema, config: StoreConfig) -> StoreResult<Self> {
        Self::with_type(StructType::shared(schema), config)
    }

    /// Creates a store sharing an existing struct type, e.g. one from a
    /// [`TypeCache`](crate::TypeCache).
    ///
    /// # Errors
    ///
    /// [`StoreError::ZeroPageSize`] if the page size is zero.
    pub fn with_type(ty: Arc<StructType>, config: StoreConfig) -> StoreResult<Self> {
        let self_handle = ty.self_handle();
        let dense = DenseStore::new(ty, config)?;
        let capacity = dense.capacity();
        Ok(Self {
            dense,
            self_handle,
            slots: HashMap::with_capacity(capacity),
            handles: Vec::with_capacity(capacity),
            next_handle: Some(Handle::FIRST),
        })
    }

    /// Creates a store from a struct document.
    ///
    /// # Errors
    ///
    /// The document's schema or store settings are invalid.
    pub fn from_config(config: &StructConfig) -> Result<Self, ConfigError> {
        let store = Self::new(config.schema()?, config.store)?;
        tracing::debug!(
            "store {:?} loaded: {} fields",
            config.name.as_deref().unwrap_or("<unnamed>"),
            config.fields.len()
        );
        Ok(store)
    }

    /// The struct type of the stored records. Resolve field tokens here.
    #[must_use]
    pub fn struct_type(&self) -> &Arc<StructType> {
        self.dense.struct_type()
    }

    /// Number of live records.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Checks if no record is live.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Slots available without growing.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.dense.capacity()
    }

    /// Read-only access to the underlying dense layer.
    #[must_use]
    pub fn records(&self) -> &DenseStore {
        &self.dense
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Allocates a zeroed record and returns its new handle.
    ///
    /// Handles increase monotonically and are never reused.
    ///
    /// # Errors
    ///
    /// [`StoreError::HandlesExhausted`] after `u32::MAX` allocations.
    pub fn alloc(&mut self) -> StoreResult<Handle> {
        let handle = self.next_handle.ok_or(StoreError::HandlesExhausted)?;
        self.next_handle = handle.next();

        let instance = self.dense.alloc();
        self.dense.set_handle(instance, &self.self_handle, Some(handle))?;

        self.slots.insert(handle, self.handles.len());
        self.handles.push(handle);
        Ok(handle)
    }

    /// Frees the record behind `handle`.
    ///
    /// The last live record moves into the freed slot; its handle follows it.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the handle is not live.
    pub fn free(&mut self, handle: Handle) -> StoreResult<()> {
        let slot = self
            .slots
            .remove(&handle)
            .ok_or(StoreError::NotFound(handle.get()))?;

        if let Some(Relocation { to, .. }) = self.dense.free_slot(slot) {
            self.handles.swap_remove(slot);
            self.slots.insert(self.handles[to], to);
        } else {
            self.handles.pop();
        }
        Ok(())
    }

    /// Checks whether `handle` is live.
    #[inline]
    #[must_use]
    pub fn has(&self, handle: Handle) -> bool {
        self.slots.contains_key(&handle)
    }

    /// Adds `pages` pages of zeroed slots. Handles and values are preserved.
    pub fn grow(&mut self, pages: usize) {
        self.dense.grow(pages);
        let extra = self.dense.capacity() - self.handles.len();
        self.slots.reserve(extra);
        self.handles.reserve(extra);
    }

    /// Frees every record. Handles already issued stay retired.
    pub fn clear(&mut self) {
        self.dense.clear();
        self.slots.clear();
        self.handles.clear();
    }

    // ========================================================================
    // ADDRESSING
    // ========================================================================

    /// Current slot of a live handle.
    #[inline]
    #[must_use]
    pub fn slot(&self, handle: Handle) -> Option<usize> {
        self.slots.get(&handle).copied()
    }

    /// Handle of the record at a live slot.
    #[inline]
    #[must_use]
    pub fn handle_at(&self, slot: usize) -> Option<Handle> {
        self.handles.get(slot).copied()
    }

    /// The dense-layer instance of a live handle.
    ///
    /// Valid until the next `free` of this handle.
    #[must_use]
    pub fn instance(&self, handle: Handle) -> Option<Instance> {
        self.slot(handle).and_then(|slot| self.dense.instance_at(slot))
    }

    #[inline]
    fn resolve(&self, handle: Handle) -> StoreResult<Instance> {
        self.instance(handle)
            .ok_or(StoreError::NotFound(handle.get()))
    }

    /// Live handles in slot order. The order changes under `free`.
    pub fn iter(&self) -> impl Iterator<Item = Handle> + '_ {
        self.handles.iter().copied()
    }

    /// Hex dump of every slot; see [`DenseStore::dump`].
    #[must_use]
    pub fn dump(&self) -> String {
        self.dense.dump()
    }

    // ========================================================================
    // TYPED FIELD ACCESS
    // ========================================================================

    /// Reads a numeric field.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the handle is not live,
    /// [`StoreError::ForeignField`] if the token belongs to another schema.
    #[inline]
    pub fn get(&self, handle: Handle, field: &NumberField) -> StoreResult<f64> {
        self.dense.get(self.resolve(handle)?, field)
    }

    /// Writes a numeric field. Out-of-range values wrap or saturate.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the handle is not live,
    /// [`StoreError::ForeignField`] if the token belongs to another schema.
    #[inline]
    pub fn set(&mut self, handle: Handle, field: &NumberField, value: f64) -> StoreResult<()> {
        let instance = self.resolve(handle)?;
        self.dense.set(instance, field, value)
    }

    /// Tests a `bool` field.
    ///
    /// # Errors
    ///
    /// As [`Store::get`].
    #[inline]
    pub fn is(&self, handle: Handle, field: &BoolField) -> StoreResult<bool> {
        self.dense.is(self.resolve(handle)?, field)
    }

    /// Writes a `bool` field.
    ///
    /// # Errors
    ///
    /// As [`Store::set`].
    #[inline]
    pub fn set_bool(&mut self, handle: Handle, field: &BoolField, value: bool) -> StoreResult<()> {
        let instance = self.resolve(handle)?;
        self.dense.set_bool(instance, field, value)
    }

    /// Reads a `sid` field. The stored handle is not checked for liveness.
    ///
    /// # Errors
    ///
    /// As [`Store::get`].
    #[inline]
    pub fn get_handle(&self, handle: Handle, field: &HandleField) -> StoreResult<Option<Handle>> {
        self.dense.get_handle(self.resolve(handle)?, field)
    }

    /// Writes a `sid` field.
    ///
    /// # Errors
    ///
    /// As [`Store::set`].
    #[inline]
    pub fn set_handle(
        &mut self,
        handle: Handle,
        field: &HandleField,
        value: Option<Handle>,
    ) -> StoreResult<()> {
        let instance = self.resolve(handle)?;
        self.dense.set_handle(instance, field, value)
    }

    /// Reads an `obj` field.
    ///
    /// # Errors
    ///
    /// As [`Store::get`].
    pub fn get_object(
        &self,
        handle: Handle,
        field: &ObjectField,
    ) -> StoreResult<Option<&ObjectRef>> {
        self.dense.get_object(self.resolve(handle)?, field)
    }

    /// Writes an `obj` field. The previous value is dropped.
    ///
    /// # Errors
    ///
    /// As [`Store::set`].
    pub fn set_object(
        &mut self,
        handle: Handle,
        field: &ObjectField,
        value: Option<ObjectRef>,
    ) -> StoreResult<()> {
        let instance = self.resolve(handle)?;
        self.dense.set_object(instance, field, value)
    }

    /// Reads a `str` field.
    ///
    /// # Errors
    ///
    /// As [`Store::get`].
    pub fn get_str(&self, handle: Handle, field: &StringField) -> StoreResult<Option<&str>> {
        self.dense.get_str(self.resolve(handle)?, field)
    }

    /// Writes a `str` field. The previous value is dropped.
    ///
    /// # Errors
    ///
    /// As [`Store::set`].
    pub fn set_str(
        &mut self,
        handle: Handle,
        field: &StringField,
        value: Option<&str>,
    ) -> StoreResult<()> {
        let instance = self.resolve(handle)?;
        self.dense.set_str(instance, field, value)
    }

    // ========================================================================
    // BY-NAME ACCESS
    // ========================================================================

    /// Reads any field by name.
    ///
    /// Resolves the field on every call; prefer typed tokens in loops.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for a dead handle, [`StoreError::Field`]
    /// for an unknown name.
    pub fn get_value(&self, handle: Handle, name: &str) -> StoreResult<FieldValue> {
        let instance = self.resolve(handle)?;
        let ty = self.dense.struct_type();
        let dense = &self.dense;

        let value = match ty.accessor(name)?.class() {
            StorageClass::Bool => FieldValue::Bool(dense.is(instance, &ty.boolean(name)?)?),
            StorageClass::Handle => {
                FieldValue::Handle(dense.get_handle(instance, &ty.handle(name)?)?)
            }
            StorageClass::Object => {
                FieldValue::Object(dense.get_object(instance, &ty.object(name)?)?.cloned())
            }
            StorageClass::String => FieldValue::String(
                dense
                    .get_str(instance, &ty.string(name)?)?
                    .map(str::to_owned),
            ),
            _ => FieldValue::Number(dense.get(instance, &ty.number(name)?)?),
        };
        Ok(value)
    }

    /// Writes any field by name.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for a dead handle, [`StoreError::Field`]
    /// for an unknown name or a value of the wrong kind.
    pub fn set_value(&mut self, handle: Handle, name: &str, value: FieldValue) -> StoreResult<()> {
        let instance = self.resolve(handle)?;
        let ty = Arc::clone(self.dense.struct_type());
        let class = ty.accessor(name)?.class();

        match (class, value) {
            (StorageClass::Bool, FieldValue::Bool(v)) => {
                self.dense.set_bool(instance, &ty.boolean(name)?, v)
            }
            (StorageClass::Handle, FieldValue::Handle(v)) => {
                self.dense.set_handle(instance, &ty.handle(name)?, v)
            }
            (StorageClass::Object, FieldValue::Object(v)) => {
                self.dense.set_object(instance, &ty.object(name)?, v)
            }
            (StorageClass::String, FieldValue::String(v)) => {
                self.dense.set_str(instance, &ty.string(name)?, v.as_deref())
            }
            (class, FieldValue::Number(v)) if class.is_numeric() => {
                self.dense.set(instance, &ty.number(name)?, v)
            }
            (actual, value) => Err(SchemaError::FieldKind {
                field: name.to_owned(),
                expected: value.kind_name(),
                actual,
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_store() -> Store {
        let schema = Schema::from_pairs([
            ("handle", "sid"),
            ("value", "i16"),
            ("next", "sid"),
            ("alive", "bool"),
        ])
        .unwrap();
        Store::new(schema, StoreConfig::with_page_size(4)).unwrap()
    }

    #[test]
    fn test_alloc_stamps_handle() {
        let mut store = node_store();
        let own = store.struct_type().self_handle();
        let a = store.alloc().unwrap();
        let b = store.alloc().unwrap();

        assert_eq!(store.get_handle(a, &own).unwrap(), Some(a));
        assert_eq!(store.get_handle(b, &own).unwrap(), Some(b));
        assert!(a < b);
    }

    #[test]
    fn test_free_keeps_bijection() {
        let mut store = node_store();
        let value = store.struct_type().number("value").unwrap();
        let handles: Vec<Handle> = (0..4).map(|_| store.alloc().unwrap()).collect();
        for (i, &h) in handles.iter().enumerate() {
            store.set(h, &value, i as f64 * 10.0).unwrap();
        }

        store.free(handles[1]).unwrap();

        assert_eq!(store.len(), 3);
        assert!(!store.has(handles[1]));
        assert_eq!(store.slot(handles[3]), Some(1));
        assert_eq!(store.handle_at(1), Some(handles[3]));
        for slot in 0..store.len() {
            let h = store.handle_at(slot).unwrap();
            assert_eq!(store.slot(h), Some(slot));
        }
        assert_eq!(store.get(handles[3], &value).unwrap(), 30.0);
        assert_eq!(store.get(handles[0], &value).unwrap(), 0.0);
        assert_eq!(store.get(handles[2], &value).unwrap(), 20.0);
    }

    #[test]
    fn test_moved_record_keeps_self_handle() {
        let mut store = node_store();
        let own = store.struct_type().self_handle();
        let a = store.alloc().unwrap();
        let b = store.alloc().unwrap();
        store.free(a).unwrap();
        assert_eq!(store.get_handle(b, &own).unwrap(), Some(b));
    }

    #[test]
    fn test_double_free_not_found() {
        let mut store = node_store();
        let a = store.alloc().unwrap();
        store.free(a).unwrap();
        assert_eq!(store.free(a), Err(StoreError::NotFound(a.get())));

        let value = store.struct_type().number("value").unwrap();
        assert_eq!(store.get(a, &value), Err(StoreError::NotFound(a.get())));
    }

    #[test]
    fn test_handles_never_reused() {
        let mut store = node_store();
        let a = store.alloc().unwrap();
        let b = store.alloc().unwrap();
        store.free(a).unwrap();
        store.clear();
        let c = store.alloc().unwrap();
        assert!(c > b);
        assert_ne!(c, a);
    }

    #[test]
    fn test_handle_exhaustion() {
        let mut store = node_store();
        store.next_handle = Handle::from_raw(u32::MAX);
        let last = store.alloc().unwrap();
        assert_eq!(last.get(), u32::MAX);
        assert_eq!(store.alloc(), Err(StoreError::HandlesExhausted));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_by_name_access() {
        let mut store = node_store();
        let a = store.alloc().unwrap();
        let b = store.alloc().unwrap();

        store.set_value(a, "value", FieldValue::Number(-7.0)).unwrap();
        store.set_value(a, "next", FieldValue::Handle(Some(b))).unwrap();
        store.set_value(a, "alive", FieldValue::Bool(true)).unwrap();

        assert!(matches!(store.get_value(a, "value").unwrap(), FieldValue::Number(v) if v == -7.0));
        assert!(matches!(
            store.get_value(a, "next").unwrap(),
            FieldValue::Handle(Some(h)) if h == b
        ));
        assert!(matches!(store.get_value(a, "alive").unwrap(), FieldValue::Bool(true)));
    }

    #[test]
    fn test_by_name_errors() {
        let mut store = node_store();
        let a = store.alloc().unwrap();

        assert_eq!(
            store.set_value(a, "alive", FieldValue::Number(1.0)),
            Err(StoreError::Field(SchemaError::FieldKind {
                field: "alive".to_owned(),
                expected: "a numeric field",
                actual: StorageClass::Bool,
            }))
        );
        assert!(matches!(
            store.get_value(a, "missing"),
            Err(StoreError::Field(SchemaError::UnknownField(_)))
        ));
    }

    #[test]
    fn test_foreign_token_rejected() {
        let mut store = Store::new(
            Schema::from_pairs([("handle", "sid"), ("hp", "u8")]).unwrap(),
            StoreConfig::with_page_size(4),
        )
        .unwrap();
        let hp = store.struct_type().number("hp").unwrap();
        let other = StructType::new(
            Schema::from_pairs([("handle", "sid"), ("x", "u32"), ("y", "u32")]).unwrap(),
        );
        // `x` shares the word `hp` lives in; `y` lies past this store's stride.
        let x = other.number("x").unwrap();
        let y = other.number("y").unwrap();

        let h = store.alloc().unwrap();
        store.set(h, &hp, 7.0).unwrap();

        assert!(matches!(store.set(h, &x, 1000.0), Err(StoreError::ForeignField { .. })));
        assert_eq!(store.get(h, &hp).unwrap(), 7.0);
        assert!(matches!(store.get(h, &y), Err(StoreError::ForeignField { .. })));
        assert!(matches!(store.set(h, &y, 1.0), Err(StoreError::ForeignField { .. })));
    }

    #[test]
    fn test_equal_schemas_share_tokens() {
        let schema = Schema::from_pairs([("handle", "sid"), ("hp", "u8")]).unwrap();
        let mut first = Store::new(schema.clone(), StoreConfig::default()).unwrap();
        let mut second = Store::new(schema, StoreConfig::default()).unwrap();
        let hp = first.struct_type().number("hp").unwrap();

        let a = first.alloc().unwrap();
        let b = second.alloc().unwrap();
        first.set(a, &hp, 3.0).unwrap();
        second.set(b, &hp, 4.0).unwrap();
        assert_eq!(second.get(b, &hp).unwrap(), 4.0);
    }

    #[test]
    fn test_grow_preserves_records() {
        let mut store = node_store();
        let value = store.struct_type().number("value").unwrap();
        let a = store.alloc().unwrap();
        store.set(a, &value, 42.0).unwrap();

        store.grow(2);
        assert_eq!(store.capacity(), 12);
        assert!(store.has(a));
        assert_eq!(store.get(a, &value).unwrap(), 42.0);
    }
}
