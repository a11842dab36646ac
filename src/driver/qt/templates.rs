//! Template set
//!
//! Templates are plain C++ sources with `%(name)s` placeholders and `%%` for
//! a literal percent sign. Nothing else in the source is markup. The built-in
//! set is compiled in; files of the same name in a template directory replace
//! individual built-in templates.

use std::fs;
use std::path::Path;

use minijinja::syntax::SyntaxConfig;
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use tracing::{debug, trace};

use super::fragments::Dictionary;
use crate::error::SchemaError;

pub const TABLE_H: &str = "table.h.template";
pub const TABLE_META_H: &str = "table-meta.h.template";
pub const TABLE_CC: &str = "table.cc.template";
pub const TABLE_META_CC: &str = "table-meta.cc.template";
pub const VIEW_H: &str = "view.h.template";
pub const VIEW_META_H: &str = "view-meta.h.template";
pub const VIEW_CC: &str = "view.cc.template";
pub const VIEW_META_CC: &str = "view-meta.cc.template";
pub const DATABASE_H: &str = "database.h.template";
pub const DATABASE_CC: &str = "database.cc.template";
pub const ALL_META_TABLES_H: &str = "all-meta-tables.h.template";
pub const ALL_TABLES_H: &str = "all-tables.h.template";

const BUILTIN: [(&str, &str); 12] = [
    (TABLE_H, include_str!("templates/table.h.template")),
    (TABLE_META_H, include_str!("templates/table-meta.h.template")),
    (TABLE_CC, include_str!("templates/table.cc.template")),
    (TABLE_META_CC, include_str!("templates/table-meta.cc.template")),
    (VIEW_H, include_str!("templates/view.h.template")),
    (VIEW_META_H, include_str!("templates/view-meta.h.template")),
    (VIEW_CC, include_str!("templates/view.cc.template")),
    (VIEW_META_CC, include_str!("templates/view-meta.cc.template")),
    (DATABASE_H, include_str!("templates/database.h.template")),
    (DATABASE_CC, include_str!("templates/database.cc.template")),
    (ALL_META_TABLES_H, include_str!("templates/all-meta-tables.h.template")),
    (ALL_TABLES_H, include_str!("templates/all-tables.h.template")),
];

/// Names of every template the Qt driver renders
pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|(name, _)| *name)
}

// Block and comment tags are required by the engine but must never match C++
// source, so they start with a control character.
const BLOCK_DELIMITERS: (&str, &str) = ("\u{1}{%", "%}\u{1}");
const COMMENT_DELIMITERS: (&str, &str) = ("\u{1}{#", "#}\u{1}");

/// Rewrite `%%` as an expression printing `%`, so that `%%(x)s` stays the
/// literal text `%(x)s`.
fn escape_percent(source: &str) -> String {
    source.replace("%%", "%(\"%\")s")
}

fn template_error(template: &str, err: minijinja::Error) -> SchemaError {
    SchemaError::Template {
        template: template.to_string(),
        message: err.to_string(),
    }
}

/// Compiled templates
pub struct TemplateSet {
    env: Environment<'static>,
}

impl std::fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSet")
            .field("templates", &self.env.templates().count())
            .finish()
    }
}

impl TemplateSet {
    /// The compiled-in templates
    pub fn builtin() -> Result<Self, SchemaError> {
        let syntax = SyntaxConfig::builder()
            .variable_delimiters("%(", ")s")
            .block_delimiters(BLOCK_DELIMITERS.0, BLOCK_DELIMITERS.1)
            .comment_delimiters(COMMENT_DELIMITERS.0, COMMENT_DELIMITERS.1)
            .build()
            .map_err(|e| template_error("<syntax>", e))?;

        let mut env = Environment::new();
        env.set_syntax(syntax);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);

        for (name, source) in BUILTIN {
            env.add_template_owned(name, escape_percent(source))
                .map_err(|e| template_error(name, e))?;
        }

        Ok(Self { env })
    }

    /// The built-in templates, with any file of the same name in `dir`
    /// taking precedence
    pub fn with_overrides(dir: &Path) -> Result<Self, SchemaError> {
        if !dir.is_dir() {
            return Err(SchemaError::Config(format!(
                "Template directory '{}' does not exist",
                dir.display()
            )));
        }

        let mut set = Self::builtin()?;
        for name in names() {
            let path = dir.join(name);
            if !path.is_file() {
                trace!(template = name, "Using built-in template");
                continue;
            }
            let source = fs::read_to_string(&path).map_err(|source| SchemaError::Read {
                path: path.clone(),
                source,
            })?;
            debug!(template = name, path = ?path, "Overriding built-in template");
            set.env
                .add_template_owned(name, escape_percent(&source))
                .map_err(|e| template_error(name, e))?;
        }
        Ok(set)
    }

    /// Load the template set, optionally overridden from `dir`
    pub fn load(dir: Option<&Path>) -> Result<Self, SchemaError> {
        match dir {
            Some(dir) => Self::with_overrides(dir),
            None => Self::builtin(),
        }
    }

    /// Substitute `data` into the template `name`.
    ///
    /// A placeholder without a value is an error.
    pub fn render(&self, name: &str, data: &Dictionary) -> Result<String, SchemaError> {
        let template = self
            .env
            .get_template(name)
            .map_err(|e| template_error(name, e))?;
        template.render(data).map_err(|e| template_error(name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict(pairs: &[(&str, &str)]) -> Dictionary {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_builtin_templates_compile() {
        let set = TemplateSet::builtin().unwrap();
        assert_eq!(names().count(), 12);
        assert_eq!(set.env.templates().count(), 12);
    }

    #[test]
    fn test_missing_variable_is_an_error() {
        let set = TemplateSet::builtin().unwrap();
        let err = set
            .render(ALL_TABLES_H, &dict(&[("Database", "Db")]))
            .unwrap_err();
        assert!(matches!(err, SchemaError::Template { ref template, .. } if template == ALL_TABLES_H));
    }

    #[test]
    fn test_directory_overrides_single_template() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(ALL_TABLES_H),
            "// %(Database)s uses %%(x)s\n%(INCLUDE_ALL_HEADERS)s\n",
        )
        .unwrap();

        let set = TemplateSet::with_overrides(dir.path()).unwrap();
        let out = set
            .render(
                ALL_TABLES_H,
                &dict(&[("Database", "Db"), ("INCLUDE_ALL_HEADERS", "#include \"a.h\"")]),
            )
            .unwrap();
        assert_eq!(out, "// Db uses %(x)s\n#include \"a.h\"\n");

        // untouched templates still come from the built-in set
        assert!(set.env.get_template(TABLE_H).is_ok());
    }

    #[test]
    fn test_missing_override_directory() {
        let err = TemplateSet::with_overrides(Path::new("/no/such/templates")).unwrap_err();
        assert!(matches!(err, SchemaError::Config(_)));
    }

    #[test]
    fn test_values_are_not_escaped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(TABLE_H), "%(v)s").unwrap();
        let set = TemplateSet::with_overrides(dir.path()).unwrap();
        let out = set.render(TABLE_H, &dict(&[("v", "<a & \"b\">")])).unwrap();
        assert_eq!(out, "<a & \"b\">");
    }

    #[test]
    fn test_override_is_plain_cpp() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(DATABASE_CC),
            "int ids[] = {%(DBC_IDS)s};\n{# not a comment #} {% not a block %}\nprintf(\"100%%\");\n",
        )
        .unwrap();

        let set = TemplateSet::with_overrides(dir.path()).unwrap();
        let out = set.render(DATABASE_CC, &dict(&[("DBC_IDS", "1, 2")])).unwrap();
        assert_eq!(
            out,
            "int ids[] = {1, 2};\n{# not a comment #} {% not a block %}\nprintf(\"100%\");\n"
        );
    }

    #[test]
    fn test_escape_percent() {
        assert_eq!(escape_percent("100%%"), "100%(\"%\")s");
        assert_eq!(escape_percent("a % b"), "a % b");
    }
}
