//! # Record Storage
//!
//! - [`DenseStore`]: cursor-addressed, compacting record buffer
//! - [`Handle`]: stable record identifiers issued by [`crate::Store`]
//! - [`RefTable`]: side tables backing `obj`/`str` fields

mod dense;
mod handle;
mod refs;

pub use dense::{DenseStore, Instance, ObjectRef, Relocation};
pub use handle::Handle;
pub use refs::RefTable;
