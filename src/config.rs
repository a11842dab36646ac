//! Configuration loading
//!
//! Generator defaults come from environment variables, optionally read from
//! a .env file first. Command line flags take precedence over these values.

use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, error, trace, warn};

use crate::driver::qt::{QtOptions, DEFAULT_BASE_CLASS};
use crate::driver::SqlDialect;
use crate::error::SchemaError;

/// Generator defaults
#[derive(Debug, Clone, PartialEq)]
pub struct GenConfig {
    pub author: String,
    pub namespace: String,
    pub export_macro: String,
    pub import_header: String,
    pub templates: Option<PathBuf>,
    pub base_class: String,
    pub sql_dialect: SqlDialect,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            author: String::new(),
            namespace: String::new(),
            export_macro: String::new(),
            import_header: String::new(),
            templates: None,
            base_class: DEFAULT_BASE_CLASS.to_string(),
            sql_dialect: SqlDialect::default(),
        }
    }
}

impl GenConfig {
    /// Load configuration from environment variables
    ///
    /// Recognised variables:
    /// - PILESCHEMA_AUTHOR (default: USER or USERNAME)
    /// - PILESCHEMA_NAMESPACE
    /// - PILESCHEMA_EXPORT_MACRO
    /// - PILESCHEMA_IMPORT_HEADER
    /// - PILESCHEMA_TEMPLATES
    /// - PILESCHEMA_BASE_CLASS (default: DbTable)
    /// - PILESCHEMA_SQL_DRIVER (none or sqlite; default: none)
    pub fn from_env() -> Result<Self, SchemaError> {
        debug!("Loading generator configuration from environment");
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from `lookup`, which maps a variable name to
    /// its value
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SchemaError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let author = var("PILESCHEMA_AUTHOR")
            .or_else(|| {
                trace!("PILESCHEMA_AUTHOR not set, using login name");
                var("USER").or_else(|| var("USERNAME"))
            })
            .unwrap_or_default();

        let sql_dialect = match var("PILESCHEMA_SQL_DRIVER") {
            Some(name) => name.parse::<SqlDialect>().map_err(|e| {
                error!(driver = ?name, "Invalid PILESCHEMA_SQL_DRIVER value");
                e
            })?,
            None => SqlDialect::default(),
        };

        let base_class = var("PILESCHEMA_BASE_CLASS").unwrap_or_else(|| {
            trace!("PILESCHEMA_BASE_CLASS not set, using default");
            DEFAULT_BASE_CLASS.to_string()
        });

        let config = Self {
            author,
            namespace: var("PILESCHEMA_NAMESPACE").unwrap_or_default(),
            export_macro: var("PILESCHEMA_EXPORT_MACRO").unwrap_or_default(),
            import_header: var("PILESCHEMA_IMPORT_HEADER").unwrap_or_default(),
            templates: var("PILESCHEMA_TEMPLATES").map(PathBuf::from),
            base_class,
            sql_dialect,
        };

        debug!(
            author = ?config.author,
            namespace = ?config.namespace,
            templates = ?config.templates,
            sql_dialect = %config.sql_dialect,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Load a .env file and then read configuration from environment
    pub fn load(env_file: &Path) -> Result<Self, SchemaError> {
        if env_file.exists() {
            debug!(path = ?env_file, "Loading environment file");
            dotenvy::from_path(env_file).map_err(|e| {
                error!(path = ?env_file, error = ?e, "Failed to load environment file");
                SchemaError::Config(format!("Failed to load {}: {}", env_file.display(), e))
            })?;
        } else {
            trace!(path = ?env_file, "Environment file not found, using existing environment");
        }

        Self::from_env()
    }

    /// Qt options seeded from this configuration
    pub fn qt_options(&self) -> QtOptions {
        if self.author.is_empty() {
            warn!("No author configured; generated headers will name none");
        }
        QtOptions::new()
            .with_namespace(self.namespace.clone())
            .with_export_macro(self.export_macro.clone())
            .with_import_header(self.import_header.clone())
            .with_base_class(self.base_class.clone())
            .with_author(self.author.clone())
            .with_templates(self.templates.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GenConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, GenConfig::default());
        assert_eq!(config.base_class, "DbTable");
        assert_eq!(config.sql_dialect, SqlDialect::Generic);
    }

    #[test]
    fn test_custom_values() {
        let config = GenConfig::from_lookup(lookup(&[
            ("PILESCHEMA_AUTHOR", "Ada"),
            ("PILESCHEMA_NAMESPACE", "pile"),
            ("PILESCHEMA_EXPORT_MACRO", "PILE_EXPORT"),
            ("PILESCHEMA_IMPORT_HEADER", "pile/export.h"),
            ("PILESCHEMA_TEMPLATES", "/opt/templates"),
            ("PILESCHEMA_BASE_CLASS", "MyTable"),
            ("PILESCHEMA_SQL_DRIVER", "sqlite"),
        ]))
        .unwrap();

        assert_eq!(config.author, "Ada");
        assert_eq!(config.namespace, "pile");
        assert_eq!(config.templates, Some(PathBuf::from("/opt/templates")));
        assert_eq!(config.base_class, "MyTable");
        assert_eq!(config.sql_dialect, SqlDialect::Sqlite);

        let options = config.qt_options();
        assert_eq!(options.export_macro, "PILE_EXPORT");
        assert_eq!(options.import_header, "pile/export.h");
    }

    #[test]
    fn test_author_falls_back_to_login() {
        let config = GenConfig::from_lookup(lookup(&[("USERNAME", "winuser")])).unwrap();
        assert_eq!(config.author, "winuser");

        let config =
            GenConfig::from_lookup(lookup(&[("USER", "unixuser"), ("USERNAME", "winuser")]))
                .unwrap();
        assert_eq!(config.author, "unixuser");
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = GenConfig::from_lookup(lookup(&[("PILESCHEMA_BASE_CLASS", "  ")])).unwrap();
        assert_eq!(config.base_class, "DbTable");
    }

    #[test]
    fn test_invalid_sql_driver() {
        let result = GenConfig::from_lookup(lookup(&[("PILESCHEMA_SQL_DRIVER", "oracle")]));
        assert!(matches!(result, Err(SchemaError::Config(_))));
    }

    #[test]
    fn test_load_reads_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "PILESCHEMA_TEST_ONLY_MARKER=from-file\n").unwrap();

        GenConfig::load(&path).unwrap();

        assert_eq!(env::var("PILESCHEMA_TEST_ONLY_MARKER").unwrap(), "from-file");
    }

    #[test]
    fn test_load_missing_env_file() {
        assert!(GenConfig::load(Path::new("/definitely/not/here/.env")).is_ok());
    }
}
