use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pileschema::binding;
use pileschema::config::GenConfig;
use pileschema::driver::{process_with_driver, QtDriver, SqlDialect, SqlDriver};
use pileschema::output;
use pileschema::schema::{Column, Database, Table};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSqlDriver {
    /// Generic SQL with AUTO_INCREMENT
    None,
    /// SQLite
    Sqlite,
}

impl From<CliSqlDriver> for SqlDialect {
    fn from(driver: CliSqlDriver) -> Self {
        match driver {
            CliSqlDriver::None => SqlDialect::Generic,
            CliSqlDriver::Sqlite => SqlDialect::Sqlite,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum CliCppDriver {
    /// Classes for the Qt SQL module
    #[default]
    Qt,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a description file and report every problem
    Validate {
        /// XML database description
        xml: PathBuf,
    },

    /// Print the tables, columns and views of a description
    List {
        /// XML database description
        xml: PathBuf,
    },

    /// Generate SQL statements
    Sql {
        /// XML database description
        xml: PathBuf,

        /// Output file (default: the input path with a .sql extension)
        out: Option<PathBuf>,

        /// SQL variant (default: PILESCHEMA_SQL_DRIVER or none)
        #[arg(long, value_enum)]
        driver: Option<CliSqlDriver>,
    },

    /// Generate C++ sources
    Cpp {
        /// XML database description
        xml: PathBuf,

        /// Output directory
        #[arg(default_value = ".")]
        out: PathBuf,

        /// Code generator
        #[arg(long, value_enum, default_value_t = CliCppDriver::Qt)]
        driver: CliCppDriver,

        /// Namespace enclosing the generated classes
        #[arg(long)]
        namespace: Option<String>,

        /// Directory with templates replacing the built-in ones
        #[arg(long)]
        templates: Option<PathBuf>,

        /// Author named in the file headers
        #[arg(long)]
        author: Option<String>,

        /// Export macro for the generated classes
        #[arg(long)]
        exportm: Option<String>,

        /// Header that defines the export macro
        #[arg(long)]
        importh: Option<String>,

        /// Base class of the table meta classes
        #[arg(long)]
        base_class: Option<String>,
    },
}

#[derive(Parser, Debug)]
#[command(name = "pileschema")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to .env file with generator defaults
    #[arg(long, default_value = "./.env", global = true)]
    env_file: PathBuf,

    /// Verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

fn main() {
    if let Err(e) = run() {
        error!(error = ?e, "Fatal error");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("pileschema v{}", env!("CARGO_PKG_VERSION"));
    debug!(command = ?cli.command, "Parsed arguments");

    let config = GenConfig::load(&cli.env_file).context("Failed to load configuration")?;

    match cli.command {
        Command::Validate { xml } => validate(&xml),
        Command::List { xml } => list(&xml),
        Command::Sql { xml, out, driver } => {
            let dialect = driver.map(SqlDialect::from).unwrap_or(config.sql_dialect);
            let out = out.unwrap_or_else(|| default_sql_path(&xml));
            sql(&xml, &out, dialect)
        }
        Command::Cpp {
            xml,
            out,
            driver: CliCppDriver::Qt,
            namespace,
            templates,
            author,
            exportm,
            importh,
            base_class,
        } => {
            let mut options = config.qt_options();
            if let Some(namespace) = namespace {
                options = options.with_namespace(namespace);
            }
            if templates.is_some() {
                options = options.with_templates(templates);
            }
            if let Some(author) = author {
                options = options.with_author(author);
            }
            if let Some(exportm) = exportm {
                options = options.with_export_macro(exportm);
            }
            if let Some(importh) = importh {
                options = options.with_import_header(importh);
            }
            if let Some(base_class) = base_class {
                options = options.with_base_class(base_class);
            }
            debug!(options = ?options, "Qt options");

            let database = load(&xml)?;
            let mut driver = QtDriver::new(options).context("Failed to load templates")?;
            process_with_driver(&mut driver, &database)
                .with_context(|| format!("Failed to generate C++ sources for {}", xml.display()))?;
            output::write_all(driver.files(), &out)
                .with_context(|| format!("Failed to write to {}", out.display()))?;
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

fn load(xml: &Path) -> Result<Database> {
    binding::load_validated(xml).with_context(|| format!("Invalid description {}", xml.display()))
}

fn validate(xml: &Path) -> Result<()> {
    let database = load(xml)?;
    info!(
        path = ?xml,
        database = ?database.name,
        tables = database.tables.len(),
        views = database.views.len(),
        "Description is valid"
    );
    Ok(())
}

/// The input path with its extension replaced by `.sql`
fn default_sql_path(xml: &Path) -> PathBuf {
    xml.with_extension("sql")
}

fn sql(xml: &Path, out: &Path, dialect: SqlDialect) -> Result<()> {
    let database = load(xml)?;
    let mut driver = SqlDriver::new(dialect);
    process_with_driver(&mut driver, &database)
        .with_context(|| format!("Failed to generate SQL for {}", xml.display()))?;
    output::write_file(out, driver.sql())
        .with_context(|| format!("Failed to write {}", out.display()))?;
    info!(path = ?out, dialect = %dialect, "SQL written");
    Ok(())
}

fn list(xml: &Path) -> Result<()> {
    let database = binding::load(xml)
        .with_context(|| format!("Failed to read description {}", xml.display()))?;

    println!(
        "Database {} ({} tables, {} views)",
        database.name,
        database.tables.len(),
        database.views.len()
    );
    for table in &database.tables {
        println!();
        println!("Table {}", table.name);
        for column in &table.columns {
            println!("  {}", describe_column(table, column));
        }
    }
    for view in &database.views {
        println!();
        match &view.subset {
            Some(subset) => {
                let filter = match &subset.inner {
                    Some(inner) => format!(
                        "{} IN (SELECT {} FROM {} WHERE {} {} {})",
                        subset.column,
                        inner.column,
                        inner.table,
                        inner.where_column,
                        subset.constraint.trim(),
                        subset.value
                    ),
                    None => format!(
                        "{} {} {}",
                        subset.column,
                        subset.constraint.trim(),
                        subset.value
                    ),
                };
                println!("View {}: {} WHERE {}", view.name, subset.table, filter.trim_end());
            }
            None => println!("View {}: (no subset)", view.name),
        }
    }
    Ok(())
}

fn describe_column(table: &Table, column: &Column) -> String {
    let is_key = table.primary_key_columns().iter().any(|c| c.name == column.name);

    let mut markers = Vec::new();
    if is_key {
        markers.push("PK".to_string());
    }
    if column.is_autoincrement() {
        markers.push("AUTO".to_string());
    }
    if let Some(target) = column.foreign_key() {
        markers.push(format!("FK {}.{}", target.table, target.column));
    }
    if column.is_virtual() {
        markers.push("VIRTUAL".to_string());
    }

    let type_name = column
        .sql_type_decl()
        .unwrap_or_else(|| column.datatype_name().to_string());
    let nulls = if column.allow_nulls { "" } else { "NOT NULL" };

    format!(
        "{:<24} {:<16} {:<8} {}",
        column.name,
        type_name,
        nulls,
        markers.join(" ")
    )
    .trim_end()
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pileschema::binding::parse_str;

    #[test]
    fn test_default_sql_path() {
        assert_eq!(
            default_sql_path(Path::new("schemas/library.xml")),
            PathBuf::from("schemas/library.sql")
        );
        assert_eq!(default_sql_path(Path::new("library")), PathBuf::from("library.sql"));
    }

    #[test]
    fn test_describe_column_markers() {
        let database = parse_str(
            r#"<database name="Db"><tables>
                <table name="Author">
                  <columns><column name="id" allowNulls="false"><integer><identity/></integer></column></columns>
                  <primaryKey><key><column name="id"/></key></primaryKey>
                </table>
                <table name="Book">
                  <columns>
                    <column name="id" allowNulls="false"><integer/></column>
                    <column name="author" foreignTable="Author"><integer/></column>
                    <column name="title"><varchar length="80"/></column>
                    <column name="writer"><vrtcol references="author"/></column>
                  </columns>
                  <primaryKey><key><column name="id"/></key></primaryKey>
                </table>
              </tables></database>"#,
        )
        .unwrap();

        let author = database.table("Author").unwrap();
        let line = describe_column(author, &author.columns[0]);
        assert!(line.starts_with("id "), "{}", line);
        assert!(line.contains("NOT NULL"), "{}", line);
        assert!(line.ends_with("PK AUTO"), "{}", line);

        let book = database.table("Book").unwrap();
        let fk = describe_column(book, book.column("author").unwrap());
        assert!(fk.ends_with("FK Author.id"), "{}", fk);
        assert!(!fk.contains("NOT NULL"), "{}", fk);

        let title = describe_column(book, book.column("title").unwrap());
        assert!(title.contains("VARCHAR(80)"), "{}", title);
        assert!(!title.contains("PK"), "{}", title);

        let writer = describe_column(book, book.column("writer").unwrap());
        assert!(writer.ends_with("VIRTUAL"), "{}", writer);
    }
}
