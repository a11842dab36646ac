//! # pileschema
//!
//! Generate SQL and C++/Qt sources from XML database descriptions
//!
//! This crate provides a CLI tool and library for binding a declarative
//! database description and walking it with pluggable output drivers.

pub mod binding;
pub mod config;
pub mod driver;
pub mod error;
pub mod output;
pub mod schema;

#[cfg(test)]
pub(crate) mod testing;

pub mod prelude {
    pub use crate::binding::{load, load_validated, parse_str, validate, ValidationReport};
    pub use crate::config::GenConfig;
    pub use crate::driver::{process_with_driver, Driver, QtDriver, QtOptions, SqlDialect, SqlDriver};
    pub use crate::error::SchemaError;
    pub use crate::output::{write_all, GeneratedFile};
    pub use crate::schema::{Column, ColumnKind, DataType, DataTypeKind, Database, Table, View};
}
