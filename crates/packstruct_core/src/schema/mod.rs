//! # Schemas
//!
//! An ordered list of named [`PropSpec`]s. Order is packing order: two
//! schemas with the same fields in a different order produce different
//! layouts.
//!
//! Every schema carries the reserved [`HANDLE_FIELD`], declared `sid`. The
//! stable-handle store stamps each record's own handle into it.

mod prop_spec;

pub use prop_spec::{PropKind, PropSpec, MAX_INT_WIDTH};

use std::collections::HashSet;

use crate::error::{SchemaError, SchemaResult};

/// Name of the reserved field holding a record's own handle.
pub const HANDLE_FIELD: &str = "handle";

/// Ordered, validated field list.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Schema {
    fields: Vec<(String, PropSpec)>,
}

impl Schema {
    /// Starts a schema builder.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Builds a schema from `(name, spec)` pairs in packing order.
    ///
    /// # Errors
    ///
    /// The first [`SchemaError`] found in the pairs.
    pub fn from_pairs<I, N, S>(pairs: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = (N, S)>,
        N: AsRef<str>,
        S: AsRef<str>,
    {
        pairs
            .into_iter()
            .fold(Self::builder(), |builder, (name, spec)| {
                builder.field(name.as_ref(), spec.as_ref())
            })
            .build()
    }

    /// Fields in packing order.
    #[must_use]
    pub fn fields(&self) -> &[(String, PropSpec)] {
        &self.fields
    }

    /// Number of fields, including the reserved handle field.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false for a built schema; present for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Looks up a field's spec by name.
    #[must_use]
    pub fn spec(&self, name: &str) -> Option<PropSpec> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spec)| *spec)
    }
}

/// Incremental schema construction.
///
/// Parse errors are deferred to [`SchemaBuilder::build`] so calls chain.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<(String, PropSpec)>,
    raw_handle_spec: Option<String>,
    error: Option<SchemaError>,
}

impl SchemaBuilder {
    /// Appends a field parsed from a spec string.
    #[must_use]
    pub fn field(mut self, name: &str, spec: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        if name == HANDLE_FIELD {
            self.raw_handle_spec = Some(spec.to_owned());
        }
        match PropSpec::parse(name, spec) {
            Ok(parsed) => self.fields.push((name.to_owned(), parsed)),
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// Appends an already parsed field.
    #[must_use]
    pub fn prop(mut self, name: &str, spec: PropSpec) -> Self {
        if name == HANDLE_FIELD {
            self.raw_handle_spec = Some(spec.to_string());
        }
        self.fields.push((name.to_owned(), spec));
        self
    }

    /// Appends the reserved handle field at the current position.
    #[must_use]
    pub fn handle_field(self) -> Self {
        self.prop(HANDLE_FIELD, PropSpec::of(PropKind::StructRef))
    }

    /// Validates and returns the schema.
    ///
    /// # Errors
    ///
    /// The first parse error, a duplicate name, or a missing/mistyped
    /// reserved handle field.
    pub fn build(self) -> SchemaResult<Schema> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let mut seen = HashSet::with_capacity(self.fields.len());
        for (name, _) in &self.fields {
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateField(name.clone()));
            }
        }

        let handle = self
            .fields
            .iter()
            .find(|(name, _)| name == HANDLE_FIELD)
            .ok_or(SchemaError::MissingHandleField)?;
        if handle.1.kind() != PropKind::StructRef {
            return Err(SchemaError::HandleFieldType {
                spec: self.raw_handle_spec.unwrap_or_else(|| handle.1.to_string()),
            });
        }

        Ok(Schema {
            fields: self.fields,
        })
    }
}
