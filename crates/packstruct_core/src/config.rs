//! # Struct Documents
//!
//! Schemas and store settings can be declared in TOML instead of code:
//!
//! ```toml
//! name = "particle"
//!
//! [store]
//! page_size = 256
//! initial_pages = 4
//!
//! [[fields]]
//! name = "handle"
//! spec = "sid"
//!
//! [[fields]]
//! name = "x"
//! spec = "i16/100"
//! ```
//!
//! `[[fields]]` keeps declaration order, which is packing order.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SchemaResult};
use crate::schema::Schema;

/// Default number of slots added per page.
pub const DEFAULT_PAGE_SIZE: usize = 64;

/// Default number of pages allocated up front.
pub const DEFAULT_INITIAL_PAGES: usize = 1;

/// Paging settings of a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Slots added per grow step. Must be non-zero.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Pages allocated when the store is created. May be zero.
    #[serde(default = "default_initial_pages")]
    pub initial_pages: usize,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_initial_pages() -> usize {
    DEFAULT_INITIAL_PAGES
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            initial_pages: default_initial_pages(),
        }
    }
}

impl StoreConfig {
    /// Settings with a given page size and one initial page.
    #[must_use]
    pub const fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            initial_pages: DEFAULT_INITIAL_PAGES,
        }
    }
}

/// One `[[fields]]` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    /// Field name.
    pub name: String,
    /// PropSpec string, e.g. `"u4"` or `"i16/100"`.
    pub spec: String,
}

/// A struct definition loaded from TOML.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructConfig {
    /// Optional display name, used only in logs.
    #[serde(default)]
    pub name: Option<String>,
    /// Paging settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Fields in packing order.
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

impl StructConfig {
    /// Parses a struct document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on invalid TOML or unknown keys.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses a struct document from disk.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`StructConfig::from_toml_str`].
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Builds the declared schema.
    ///
    /// # Errors
    ///
    /// The first [`crate::SchemaError`] among the declared fields.
    pub fn schema(&self) -> SchemaResult<Schema> {
        Schema::from_pairs(self.fields.iter().map(|f| (&f.name, &f.spec)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;

    const PARTICLE: &str = r#"
        name = "particle"

        [store]
        page_size = 8

        [[fields]]
        name = "handle"
        spec = "sid"

        [[fields]]
        name = "hp"
        spec = "i16/100"

        [[fields]]
        name = "alive"
        spec = "bool"
    "#;

    #[test]
    fn test_parse_document() {
        let config = StructConfig::from_toml_str(PARTICLE).unwrap();
        assert_eq!(config.name.as_deref(), Some("particle"));
        assert_eq!(config.store.page_size, 8);
        assert_eq!(config.store.initial_pages, DEFAULT_INITIAL_PAGES);

        let schema = config.schema().unwrap();
        let names: Vec<&str> = schema.fields().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["handle", "hp", "alive"]);
    }

    #[test]
    fn test_store_defaults() {
        let config = StructConfig::from_toml_str("[[fields]]\nname = \"handle\"\nspec = \"sid\"\n").unwrap();
        assert_eq!(config.store, StoreConfig::default());
        assert_eq!(config.store.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = StructConfig::from_toml_str("pagesize = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_bad_spec_surfaces_schema_error() {
        let config = StructConfig::from_toml_str(
            "[[fields]]\nname = \"handle\"\nspec = \"sid\"\n[[fields]]\nname = \"x\"\nspec = \"u40\"\n",
        )
        .unwrap();
        assert_eq!(
            config.schema().unwrap_err(),
            SchemaError::WidthOutOfRange {
                field: "x".to_owned(),
                width: 40,
            }
        );
    }

    #[test]
    fn test_missing_file() {
        let err = StructConfig::from_toml_file("/nonexistent/packstruct.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
