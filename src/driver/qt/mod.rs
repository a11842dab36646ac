//! Qt driver
//!
//! Generates C++ data and meta-data classes for the Qt SQL module. Each table
//! and view gets a dictionary of text fragments which is substituted into
//! the templates; the rendered files are collected in memory and written by
//! the caller.

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use tracing::{debug, info, trace};

use super::Driver;
use crate::error::SchemaError;
use crate::output::GeneratedFile;
use crate::schema::{Database, Subset, Table, View};

pub mod fragments;
pub mod templates;

pub use fragments::Dictionary;
pub use templates::TemplateSet;

/// Base class of the generated table meta classes unless configured
pub const DEFAULT_BASE_CLASS: &str = "DbTable";

/// Settings of the generated C++ code
#[derive(Debug, Clone)]
pub struct QtOptions {
    /// Namespace enclosing the per-database namespace
    pub namespace: String,
    /// Export macro placed before each class name
    pub export_macro: String,
    /// Header that defines the export macro
    pub import_header: String,
    /// Base class of the table meta classes
    pub base_class: String,
    pub author: String,
    /// Date stamped into the file headers
    pub date: NaiveDate,
    /// Directory whose templates replace the built-in ones
    pub templates: Option<PathBuf>,
}

impl QtOptions {
    pub fn new() -> Self {
        Self {
            namespace: String::new(),
            export_macro: String::new(),
            import_header: String::new(),
            base_class: DEFAULT_BASE_CLASS.to_string(),
            author: String::new(),
            date: Local::now().date_naive(),
            templates: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_export_macro(mut self, export_macro: impl Into<String>) -> Self {
        self.export_macro = export_macro.into();
        self
    }

    pub fn with_import_header(mut self, import_header: impl Into<String>) -> Self {
        self.import_header = import_header.into();
        self
    }

    pub fn with_base_class(mut self, base_class: impl Into<String>) -> Self {
        self.base_class = base_class.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn with_templates(mut self, dir: Option<PathBuf>) -> Self {
        self.templates = dir;
        self
    }
}

impl Default for QtOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Driver producing C++/Qt sources
#[derive(Debug)]
pub struct QtDriver {
    options: QtOptions,
    templates: TemplateSet,
    database: String,
    /// Tables seen so far; views take their columns from these
    tables: Vec<Table>,
    views: Vec<String>,
    /// Variables of the table or view being processed
    data: Dictionary,
    files: Vec<GeneratedFile>,
}

impl QtDriver {
    pub fn new(options: QtOptions) -> Result<Self, SchemaError> {
        let templates = TemplateSet::load(options.templates.as_deref())?;
        Ok(Self {
            options,
            templates,
            database: String::new(),
            tables: Vec::new(),
            views: Vec::new(),
            data: Dictionary::new(),
            files: Vec::new(),
        })
    }

    pub fn options(&self) -> &QtOptions {
        &self.options
    }

    /// Files rendered so far, in generation order
    pub fn files(&self) -> &[GeneratedFile] {
        &self.files
    }

    pub fn into_files(self) -> Vec<GeneratedFile> {
        self.files
    }

    fn bootstrap(&mut self, component: &str) {
        self.data = fragments::common(&self.options, &self.database, component);
    }

    fn emit(&mut self, template: &str, file_name: String) -> Result<(), SchemaError> {
        let contents = self.templates.render(template, &self.data)?;
        trace!(file = ?file_name, template, bytes = contents.len(), "Rendered");
        self.files.push(GeneratedFile::new(file_name, contents));
        Ok(())
    }
}

impl Driver for QtDriver {
    fn database_start(&mut self, database: &Database) -> Result<(), SchemaError> {
        self.database = database.name.clone();
        self.tables.clear();
        self.views.clear();
        self.files.clear();
        Ok(())
    }

    fn database_end(&mut self, database: &Database) -> Result<(), SchemaError> {
        let table_names: Vec<String> = self.tables.iter().map(|t| t.name.clone()).collect();
        self.bootstrap(&database.name);
        self.data.extend(fragments::database(
            &database.name,
            &table_names,
            &self.views,
        ));

        let stem = database.name.to_lowercase();
        self.emit(templates::DATABASE_H, format!("{}.h", stem))?;
        self.emit(templates::DATABASE_CC, format!("{}.cc", stem))?;
        self.emit(templates::ALL_META_TABLES_H, "all-meta-tables.h".to_string())?;
        self.emit(templates::ALL_TABLES_H, "all-tables.h".to_string())?;

        info!(
            database = ?database.name,
            files = self.files.len(),
            "Generated Qt sources"
        );
        Ok(())
    }

    fn table_start(&mut self, table: &Table) -> Result<(), SchemaError> {
        self.bootstrap(&table.name);
        Ok(())
    }

    fn table_end(&mut self, table: &Table) -> Result<(), SchemaError> {
        let columns = fragments::table(&self.database, table)?;
        self.data.extend(columns);

        let stem = table.name.to_lowercase();
        self.emit(templates::TABLE_H, format!("{}.h", stem))?;
        self.emit(templates::TABLE_META_H, format!("{}-meta.h", stem))?;
        self.emit(templates::TABLE_CC, format!("{}.cc", stem))?;
        self.emit(templates::TABLE_META_CC, format!("{}-meta.cc", stem))?;

        self.tables.push(table.clone());
        debug!(table = ?table.name, "Generated table classes");
        Ok(())
    }

    fn view_start(&mut self, view: &View) -> Result<(), SchemaError> {
        self.bootstrap(&view.name);
        self.views.push(view.name.clone());
        Ok(())
    }

    fn view_subset(&mut self, view: &View, subset: &Subset) -> Result<(), SchemaError> {
        let table = self
            .tables
            .iter()
            .find(|t| t.name == subset.table)
            .ok_or_else(|| SchemaError::UnknownTable {
                from: view.name.clone(),
                table: subset.table.clone(),
            })?;
        let columns = fragments::table(&self.database, table)?;
        self.data.extend(columns);

        let base = fragments::VIEW_BASE_CLASS;
        self.data.insert("BaseClass".to_string(), base.to_string());
        self.data.insert("baseclass".to_string(), base.to_lowercase());
        self.data.insert("BASECLASS".to_string(), base.to_uppercase());
        Ok(())
    }

    fn view_end(&mut self, view: &View) -> Result<(), SchemaError> {
        let stem = view.name.to_lowercase();
        self.emit(templates::VIEW_H, format!("{}.h", stem))?;
        self.emit(templates::VIEW_META_H, format!("{}-meta.h", stem))?;
        self.emit(templates::VIEW_CC, format!("{}.cc", stem))?;
        self.emit(templates::VIEW_META_CC, format!("{}-meta.cc", stem))?;
        debug!(view = ?view.name, "Generated view classes");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::parse_str;
    use crate::driver::process_with_driver;
    use crate::testing;
    use std::fs;
    use std::path::Path;

    fn options() -> QtOptions {
        QtOptions::new()
            .with_namespace("pile")
            .with_export_macro("PILE_EXPORT")
            .with_author("Test Author")
            .with_date(NaiveDate::from_ymd_opt(2023, 11, 5).unwrap())
    }

    fn generate(options: QtOptions, db: &Database) -> Vec<GeneratedFile> {
        let mut driver = QtDriver::new(options).unwrap();
        process_with_driver(&mut driver, db).unwrap();
        driver.into_files()
    }

    fn file<'a>(files: &'a [GeneratedFile], name: &str) -> &'a str {
        files
            .iter()
            .find(|f| f.path == Path::new(name))
            .map(|f| f.contents.as_str())
            .unwrap_or_else(|| panic!("{} was not generated", name))
    }

    #[test]
    fn test_library_file_set() {
        let files = generate(options(), &testing::library());
        let names: Vec<_> = files.iter().map(|f| f.path.display().to_string()).collect();
        assert_eq!(
            names,
            [
                "author.h",
                "author-meta.h",
                "author.cc",
                "author-meta.cc",
                "book.h",
                "book-meta.h",
                "book.cc",
                "book-meta.cc",
                "loan.h",
                "loan-meta.h",
                "loan.cc",
                "loan-meta.cc",
                "cheapbooks.h",
                "cheapbooks-meta.h",
                "cheapbooks.cc",
                "cheapbooks-meta.cc",
                "lentbooks.h",
                "lentbooks-meta.h",
                "lentbooks.cc",
                "lentbooks-meta.cc",
                "library.h",
                "library.cc",
                "all-meta-tables.h",
                "all-tables.h",
            ]
        );
    }

    #[test]
    fn test_table_header() {
        let files = generate(options(), &testing::library());
        let header = file(&files, "book.h");

        assert!(header.contains("\\date November 2023"));
        assert!(header.contains("\\author Test Author"));
        assert!(header.contains("#ifndef __PILE_DB_LIBRARY_TABLE_BOOK_INC__"));
        assert!(header.contains(
            "class PILE_EXPORT Book : public meta::Book, public DbRecord {"
        ));
        assert!(header.contains("    QString shelf_label;\n"));
        assert!(header.contains("        id = value;\n"));
        assert!(header.ends_with("#endif // __PILE_DB_LIBRARY_TABLE_BOOK_INC__\n"));
    }

    #[test]
    fn test_meta_header_enumerates_columns() {
        let files = generate(options(), &testing::library());
        let meta = file(&files, "book-meta.h");

        assert!(meta.contains("class PILE_EXPORT Book : public DbTable {"));
        assert!(meta.contains("        COLID_INVALID = -1,\n        COLID_ID,\n        COLID_TITLE,\n"));
        assert!(meta.contains("        RCOLID_AUTHOR,\n        RCOLID_PRICE,\n"));
        assert!(meta.contains("        return 7;\n"));
        assert!(meta.contains("        return 6;\n"));
    }

    #[test]
    fn test_view_uses_primary_table_columns() {
        let files = generate(options(), &testing::library());
        let meta = file(&files, "lentbooks-meta.h");

        assert!(meta.contains("class PILE_EXPORT LentBooks : public DbView {"));
        assert!(meta.contains("#ifndef __PILE_DB_LIBRARY_VIEW_LENTBOOKS_META_INC__"));
        assert!(meta.contains("return QLatin1String(\"Book\");"));
        assert!(meta.contains("COLID_SHELF_LABEL,"));

        let data = file(&files, "cheapbooks.h");
        assert!(data.contains("class PILE_EXPORT CheapBooks : public meta::CheapBooks, public DbRecord {"));
    }

    #[test]
    fn test_database_files() {
        let files = generate(options(), &testing::library());

        let header = file(&files, "library.h");
        assert!(header.contains("class PILE_EXPORT Library {"));
        assert!(header.contains("        DBC_LOAN,\n        DBC_CHEAPBOOKS,\n        DBC_LENTBOOKS,\n"));
        assert!(header.contains("        DBV_CHEAPBOOKS,\n        DBV_LENTBOOKS,\n"));

        let source = file(&files, "library.cc");
        assert!(source.contains("case DBT_BOOK: return QLatin1String(\"Book\");"));

        let all_meta = file(&files, "all-meta-tables.h");
        assert!(all_meta.contains("#include \"author-meta.h\"\n#include \"book-meta.h\"\n"));
        let all = file(&files, "all-tables.h");
        assert!(all.contains("#include \"lentbooks.h\"\n"));
    }

    #[test]
    fn test_import_header_and_base_class() {
        let files = generate(
            options()
                .with_import_header("pile/export.h")
                .with_base_class("MyTable"),
            &testing::library(),
        );
        assert!(file(&files, "author.h").contains("#include <pile/export.h>\n"));
        assert!(file(&files, "author-meta.h").contains("public MyTable {"));
        // views keep their own base class
        assert!(file(&files, "cheapbooks-meta.h").contains("public DbView {"));
    }

    #[test]
    fn test_view_of_unknown_table() {
        let db = parse_str(
            r#"<database name="Db"><views><view name="V">
                <subset name1="Ghost" col1="id" constraint="=" value="1"/>
              </view></views></database>"#,
        )
        .unwrap();
        let mut driver = QtDriver::new(options()).unwrap();
        let err = process_with_driver(&mut driver, &db).unwrap_err();
        assert!(
            matches!(err, SchemaError::UnknownTable { ref from, ref table } if from == "V" && table == "Ghost")
        );
    }

    #[test]
    fn test_template_directory_override() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(templates::ALL_TABLES_H),
            "// %(Database)s by %(Author)s\n%(INCLUDE_ALL_HEADERS)s\n",
        )
        .unwrap();

        let files = generate(
            options().with_templates(Some(dir.path().to_path_buf())),
            &testing::library(),
        );
        assert!(file(&files, "all-tables.h").starts_with("// Library by Test Author\n#include \"author.h\"\n"));
        assert!(file(&files, "all-meta-tables.h").contains("#ifndef __PILE_DB_LIBRARY_ALL_META_TABLES_INC__"));
    }

    #[test]
    fn test_broken_override_reports_template() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(templates::TABLE_H), "%(NoSuchVariable)s\n").unwrap();

        let mut driver =
            QtDriver::new(options().with_templates(Some(dir.path().to_path_buf()))).unwrap();
        let err = process_with_driver(&mut driver, &testing::library()).unwrap_err();
        assert!(
            matches!(err, SchemaError::Template { ref template, .. } if template == templates::TABLE_H)
        );
    }
}
