//! Drivers
//!
//! A driver receives callbacks while [`process_with_driver`] walks a bound
//! database description and is responsible for producing one kind of output.

use tracing::{debug, error, trace};

use crate::error::SchemaError;
use crate::schema::{Column, Database, Subset, Table, View};

pub mod qt;
pub mod sql;

pub use qt::{QtDriver, QtOptions};
pub use sql::{SqlDialect, SqlDriver};

/// Lifecycle hooks invoked during traversal.
///
/// Every hook defaults to doing nothing, so drivers only implement the
/// events they care about.
pub trait Driver {
    /// Starting to process `database`
    fn database_start(&mut self, _database: &Database) -> Result<(), SchemaError> {
        Ok(())
    }

    /// Done processing `database`
    fn database_end(&mut self, _database: &Database) -> Result<(), SchemaError> {
        Ok(())
    }

    fn table_start(&mut self, _table: &Table) -> Result<(), SchemaError> {
        Ok(())
    }

    fn table_end(&mut self, _table: &Table) -> Result<(), SchemaError> {
        Ok(())
    }

    /// A column of the table most recently started
    fn column(&mut self, _table: &Table, _column: &Column) -> Result<(), SchemaError> {
        Ok(())
    }

    fn view_start(&mut self, _view: &View) -> Result<(), SchemaError> {
        Ok(())
    }

    fn view_end(&mut self, _view: &View) -> Result<(), SchemaError> {
        Ok(())
    }

    /// The subset that defines the view most recently started
    fn view_subset(&mut self, _view: &View, _subset: &Subset) -> Result<(), SchemaError> {
        Ok(())
    }
}

/// Walk `database` in document order, calling the driver's hooks.
///
/// Tables (with their columns) come before views. A view without a subset
/// stops the walk with [`SchemaError::UnknownViewKind`].
pub fn process_with_driver(
    driver: &mut dyn Driver,
    database: &Database,
) -> Result<(), SchemaError> {
    debug!(database = ?database.name, "Processing database");
    driver.database_start(database)?;

    for table in &database.tables {
        trace!(table = ?table.name, "Table");
        driver.table_start(table)?;
        for column in &table.columns {
            trace!(
                table = ?table.name,
                column = ?column.name,
                datatype = column.datatype_name(),
                nulls = column.allow_nulls,
                "Column"
            );
            driver.column(table, column)?;
        }
        driver.table_end(table)?;
    }

    for view in &database.views {
        trace!(view = ?view.name, "View");
        driver.view_start(view)?;
        match &view.subset {
            Some(subset) => driver.view_subset(view, subset)?,
            None => {
                error!(view = ?view.name, "Unknown view type");
                return Err(SchemaError::UnknownViewKind {
                    view: view.name.clone(),
                });
            }
        }
        driver.view_end(view)?;
    }

    driver.database_end(database)?;
    debug!(database = ?database.name, "Database processed");
    Ok(())
}
