//! # Struct Types
//!
//! A [`StructType`] is everything derived from one schema: the layout and
//! the accessor table. It is built once and shared (`Arc`) by every store
//! of that schema.
//!
//! [`TypeCache`] deduplicates struct types by schema. It is an ordinary
//! owned value; callers that want sharing pass it around explicitly.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::accessor::{BoolField, FieldAccessor, HandleField, NumberField, ObjectField, StringField};
use crate::error::{SchemaError, SchemaResult};
use crate::layout::{Layout, StorageClass};
use crate::schema::{Schema, HANDLE_FIELD};

/// Layout plus accessors of one schema.
#[derive(Debug)]
pub struct StructType {
    /// Schema hash stamped into every accessor. Never `0`.
    fingerprint: u64,
    schema: Schema,
    layout: Layout,
    accessors: Vec<FieldAccessor>,
    by_name: HashMap<String, usize>,
    self_handle: HandleField,
    /// Positions of `obj` fields, released when a record is dropped.
    object_fields: Vec<ObjectField>,
    /// Positions of `str` fields, released when a record is dropped.
    string_fields: Vec<StringField>,
}

impl StructType {
    /// Computes the layout and accessor table of a schema.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        let fingerprint = fingerprint(&schema);
        let layout = Layout::compute(&schema);
        let accessors: Vec<FieldAccessor> = layout
            .fields()
            .iter()
            .map(|f| FieldAccessor::new(f).owned_by(fingerprint))
            .collect();

        let by_name = layout
            .fields()
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect::<HashMap<_, _>>();

        // A built schema always carries the reserved field as `sid`.
        let self_position = by_name.get(HANDLE_FIELD).copied().unwrap_or_default();
        let self_handle = HandleField(accessors[self_position]);

        let object_fields = accessors
            .iter()
            .filter(|a| a.class() == StorageClass::Object)
            .map(|a| ObjectField(*a))
            .collect();
        let string_fields = accessors
            .iter()
            .filter(|a| a.class() == StorageClass::String)
            .map(|a| StringField(*a))
            .collect();

        Self {
            fingerprint,
            schema,
            layout,
            accessors,
            by_name,
            self_handle,
            object_fields,
            string_fields,
        }
    }

    /// Builds a shareable struct type.
    #[must_use]
    pub fn shared(schema: Schema) -> Arc<Self> {
        Arc::new(Self::new(schema))
    }

    /// Identity shared by every struct type built from an equal schema.
    ///
    /// Field tokens carry it; stores compare it before touching a record.
    #[inline]
    #[must_use]
    pub const fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// The source schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The computed layout.
    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Record stride in 32-bit words.
    #[inline]
    #[must_use]
    pub fn stride_words(&self) -> usize {
        self.layout.stride_words()
    }

    /// Accessors in schema order.
    #[must_use]
    pub fn accessors(&self) -> &[FieldAccessor] {
        &self.accessors
    }

    /// Position of a field in schema order.
    ///
    /// # Errors
    ///
    /// [`SchemaError::UnknownField`] if the name is not declared.
    pub fn field_index(&self, name: &str) -> SchemaResult<usize> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| SchemaError::UnknownField(name.to_owned()))
    }

    /// Untyped accessor of a field.
    ///
    /// # Errors
    ///
    /// [`SchemaError::UnknownField`] if the name is not declared.
    pub fn accessor(&self, name: &str) -> SchemaResult<FieldAccessor> {
        self.field_index(name).map(|i| self.accessors[i])
    }

    fn typed(
        &self,
        name: &str,
        expected: &'static str,
        accepts: fn(StorageClass) -> bool,
    ) -> SchemaResult<FieldAccessor> {
        let accessor = self.accessor(name)?;
        if accepts(accessor.class()) {
            Ok(accessor)
        } else {
            Err(SchemaError::FieldKind {
                field: name.to_owned(),
                expected,
                actual: accessor.class(),
            })
        }
    }

    /// Numeric accessor (`i*`, `u*`, `f16`, `f32`, `f64`).
    ///
    /// # Errors
    ///
    /// Unknown name, or the field is not numeric.
    pub fn number(&self, name: &str) -> SchemaResult<NumberField> {
        self.typed(name, "a numeric field", StorageClass::is_numeric)
            .map(NumberField)
    }

    /// `bool` accessor.
    ///
    /// # Errors
    ///
    /// Unknown name, or the field is not `bool`.
    pub fn boolean(&self, name: &str) -> SchemaResult<BoolField> {
        self.typed(name, "a bool field", |c| c == StorageClass::Bool)
            .map(BoolField)
    }

    /// `sid` accessor.
    ///
    /// # Errors
    ///
    /// Unknown name, or the field is not `sid`.
    pub fn handle(&self, name: &str) -> SchemaResult<HandleField> {
        self.typed(name, "a sid field", |c| c == StorageClass::Handle)
            .map(HandleField)
    }

    /// `obj` accessor.
    ///
    /// # Errors
    ///
    /// Unknown name, or the field is not `obj`.
    pub fn object(&self, name: &str) -> SchemaResult<ObjectField> {
        self.typed(name, "an obj field", |c| c == StorageClass::Object)
            .map(ObjectField)
    }

    /// `str` accessor.
    ///
    /// # Errors
    ///
    /// Unknown name, or the field is not `str`.
    pub fn string(&self, name: &str) -> SchemaResult<StringField> {
        self.typed(name, "a str field", |c| c == StorageClass::String)
            .map(StringField)
    }

    /// Accessor of the reserved self-handle field.
    #[inline]
    #[must_use]
    pub fn self_handle(&self) -> HandleField {
        self.self_handle
    }

    pub(crate) fn object_fields(&self) -> &[ObjectField] {
        &self.object_fields
    }

    pub(crate) fn string_fields(&self) -> &[StringField] {
        &self.string_fields
    }
}

/// Deterministic schema hash, with `0` kept free for unbound accessors.
fn fingerprint(schema: &Schema) -> u64 {
    let mut hasher = DefaultHasher::new();
    schema.hash(&mut hasher);
    hasher.finish().max(1)
}

/// Schema-keyed cache of struct types.
///
/// Layouts and accessor tables are computed on first request and shared
/// afterwards.
#[derive(Debug, Default)]
pub struct TypeCache {
    types: RwLock<HashMap<Schema, Arc<StructType>>>,
}

impl TypeCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the struct type of `schema`, building it on first use.
    #[must_use]
    pub fn get(&self, schema: &Schema) -> Arc<StructType> {
        if let Some(found) = self.types.read().get(schema) {
            return Arc::clone(found);
        }

        let mut types = self.types.write();
        Arc::clone(types.entry(schema.clone()).or_insert_with(|| {
            tracing::trace!("type cache miss: {} fields", schema.len());
            StructType::shared(schema.clone())
        }))
    }

    /// Number of distinct schemas cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// Checks if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}
