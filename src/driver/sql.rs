//! SQL driver
//!
//! Accumulates `CREATE TABLE` / `CREATE VIEW` statements in a single string.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, trace, warn};

use super::Driver;
use crate::error::SchemaError;
use crate::schema::{Column, Constraint, Subset, Table, View};

/// SQL variant the statements are written for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SqlDialect {
    /// MySQL-flavoured SQL with `AUTO_INCREMENT`
    #[default]
    Generic,
    /// SQLite, where identity keys become `INTEGER PRIMARY KEY AUTOINCREMENT`
    Sqlite,
}

impl FromStr for SqlDialect {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "generic" => Ok(SqlDialect::Generic),
            "sqlite" => Ok(SqlDialect::Sqlite),
            other => Err(SchemaError::Config(format!("Unknown SQL driver: {}", other))),
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlDialect::Generic => write!(f, "none"),
            SqlDialect::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Driver producing SQL DDL
#[derive(Debug, Default)]
pub struct SqlDriver {
    dialect: SqlDialect,
    sql: String,
    /// Definitions of the current table, joined when the table ends
    entries: Vec<String>,
    /// The current table's key was folded into its identity column
    key_inlined: bool,
}

impl SqlDriver {
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            ..Default::default()
        }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Statements generated so far
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn into_sql(self) -> String {
        self.sql
    }

    /// SQLite only accepts AUTOINCREMENT on an `INTEGER PRIMARY KEY`
    fn inline_identity_key(&self, table: &Table, column: &Column) -> bool {
        if self.dialect != SqlDialect::Sqlite || !column.is_autoincrement() {
            return false;
        }
        let key = table.primary_key_columns();
        key.len() == 1 && key[0].name == column.name
    }
}

fn quoted_list<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(|name| format!("`{}`", name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn constraint_prefix(name: Option<&str>) -> String {
    name.map(|n| format!("CONSTRAINT `{}` ", n))
        .unwrap_or_default()
}

fn index_columns(definition: &Constraint) -> String {
    definition
        .columns
        .iter()
        .map(|col| match col.sort_order {
            Some(order) => format!("`{}` {}", col.name, order.sql()),
            None => format!("`{}`", col.name),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `column constraint value`, leaving out empty parts
fn condition(column: &str, constraint: &str, value: &str) -> String {
    [column, constraint.trim(), value]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

impl Driver for SqlDriver {
    fn table_start(&mut self, table: &Table) -> Result<(), SchemaError> {
        self.sql
            .push_str(&format!("CREATE TABLE IF NOT EXISTS `{}` (\n", table.name));
        self.entries.clear();
        self.key_inlined = false;
        Ok(())
    }

    fn column(&mut self, table: &Table, column: &Column) -> Result<(), SchemaError> {
        let Some(type_decl) = column.sql_type_decl() else {
            trace!(table = ?table.name, column = ?column.name, "Skipping virtual column");
            return Ok(());
        };

        let inline_key = self.inline_identity_key(table, column);
        let mut tokens = vec![format!("`{}`", column.name)];
        tokens.push(if inline_key {
            "INTEGER".to_string()
        } else {
            type_decl
        });

        if let Some(default) = column.sql_default() {
            tokens.push(format!("DEFAULT {}", default));
        }
        if !column.allow_nulls {
            tokens.push("NOT NULL".to_string());
        }
        if column.is_autoincrement() {
            match self.dialect {
                SqlDialect::Generic => tokens.push("AUTO_INCREMENT".to_string()),
                SqlDialect::Sqlite if inline_key => {
                    tokens.push("PRIMARY KEY AUTOINCREMENT".to_string());
                    self.key_inlined = true;
                }
                SqlDialect::Sqlite => warn!(
                    table = ?table.name,
                    column = ?column.name,
                    "SQLite supports identity columns only as the sole primary key; dropping it"
                ),
            }
        }

        self.entries.push(format!("  {}", tokens.join(" ")));
        Ok(())
    }

    fn table_end(&mut self, table: &Table) -> Result<(), SchemaError> {
        if let Some(key) = &table.primary_key {
            if !self.key_inlined {
                self.entries.push(format!(
                    "  {}PRIMARY KEY ({})",
                    constraint_prefix(key.name.as_deref()),
                    quoted_list(key.column_names())
                ));
            }
        }

        for unique in &table.unique_constraints {
            self.entries.push(format!(
                "  {}UNIQUE ({})",
                constraint_prefix(unique.name.as_deref()),
                quoted_list(unique.column_names())
            ));
        }

        for fk in table.foreign_keys() {
            self.entries.push(format!(
                "  {}FOREIGN KEY ({}) REFERENCES `{}` ({})",
                constraint_prefix(fk.name.as_deref()),
                quoted_list(fk.columns.iter().map(String::as_str)),
                fk.table,
                quoted_list(fk.referenced_columns.iter().map(String::as_str))
            ));
        }

        self.sql.push_str(&self.entries.join(",\n"));
        if !self.entries.is_empty() {
            self.sql.push('\n');
        }
        self.sql.push_str(");\n");
        self.entries.clear();

        for (i, index) in table.indexes.iter().enumerate() {
            let name = index
                .definition
                .name
                .clone()
                .unwrap_or_else(|| format!("ix_{}_{}", table.name.to_lowercase(), i));
            self.sql.push_str(&format!(
                "CREATE {}INDEX IF NOT EXISTS `{}` ON `{}` ({});\n",
                if index.unique { "UNIQUE " } else { "" },
                name,
                table.name,
                index_columns(&index.definition)
            ));
        }

        debug!(table = ?table.name, dialect = %self.dialect, "Generated table SQL");
        Ok(())
    }

    fn view_start(&mut self, view: &View) -> Result<(), SchemaError> {
        self.sql
            .push_str(&format!("CREATE VIEW IF NOT EXISTS `{}` AS\n", view.name));
        Ok(())
    }

    fn view_subset(&mut self, _view: &View, subset: &Subset) -> Result<(), SchemaError> {
        match &subset.inner {
            None => self.sql.push_str(&format!(
                "  SELECT * FROM {} WHERE {}\n",
                subset.table,
                condition(&subset.column, &subset.constraint, &subset.value)
            )),
            Some(inner) => self.sql.push_str(&format!(
                "  SELECT * FROM {} WHERE {} IN (\n    SELECT {} FROM {} WHERE {})\n",
                subset.table,
                subset.column,
                inner.column,
                inner.table,
                condition(&inner.where_column, &subset.constraint, &subset.value)
            )),
        }
        Ok(())
    }

    fn view_end(&mut self, view: &View) -> Result<(), SchemaError> {
        self.sql.push_str(";\n");
        debug!(view = ?view.name, "Generated view SQL");
        Ok(())
    }
}
