//! # PACKSTRUCT Core
//!
//! Bit-packed, fixed-stride record storage designed for:
//! - Thousands of homogeneous records mutated every frame
//! - Zero heap allocation on `alloc`/`free`/`get`/`set`
//! - Stable handles across compaction
//!
//! ## Pipeline
//!
//! 1. **Schema** - ordered `name -> PropSpec` list (`"u4"`, `"i16/100"`, `"f16"`, `"sid"`, ...)
//! 2. **Layout** - bit/byte offsets and record stride, computed once per schema
//! 3. **Accessors** - one read/write pair per field, shared by every record
//! 4. **DenseStore** - contiguous records, swap-with-last compaction, paged growth
//! 5. **Store** - handle <-> slot bijection on top of the dense layer
//!
//! ## Example
//!
//! ```rust
//! use packstruct_core::{Schema, Store, StoreConfig};
//!
//! let schema = Schema::builder()
//!     .handle_field()
//!     .field("a", "u4")
//!     .field("b", "u4")
//!     .build()?;
//! let mut store = Store::new(schema, StoreConfig::default())?;
//! let a = store.struct_type().number("a")?;
//! let b = store.struct_type().number("b")?;
//!
//! let h = store.alloc()?;
//! store.set(h, &a, 5.0)?;
//! store.set(h, &b, 9.0)?;
//! assert_eq!(store.get(h, &a)?, 5.0);
//! assert_eq!(store.get(h, &b)?, 9.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod accessor;
pub mod codec;
pub mod config;
pub mod error;
pub mod layout;
pub mod schema;
pub mod storage;
pub mod store;
pub mod struct_type;

pub use accessor::{BoolField, FieldAccessor, HandleField, NumberField, ObjectField, StringField};
pub use config::{FieldConfig, StoreConfig, StructConfig};
pub use error::{ConfigError, SchemaError, SchemaResult, StoreError, StoreResult};
pub use layout::{FieldLayout, Layout, StorageClass};
pub use schema::{PropKind, PropSpec, Schema, SchemaBuilder, HANDLE_FIELD};
pub use storage::{DenseStore, Handle, Instance, ObjectRef, RefTable, Relocation};
pub use store::{FieldValue, Store};
pub use struct_type::{StructType, TypeCache};
