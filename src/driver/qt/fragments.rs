//! Template variables
//!
//! Every value a template can reference is a named text fragment. List
//! fragments are built line by line and joined without a trailing newline;
//! the templates decide the surrounding layout.

use std::collections::BTreeMap;

use tracing::trace;

use super::QtOptions;
use crate::error::SchemaError;
use crate::schema::{Column, DefaultValue, Table};

/// Values substituted into the templates
pub type Dictionary = BTreeMap<String, String>;

/// Include line for the meta class base
pub const META_CLASS_INCLUDE: &str = "#include <dbstruct/dbtable.h>";

/// Base class of the generated record classes
pub const RECORD_BASE_CLASS: &str = "DbRecord";

/// Base class of the generated view meta classes
pub const VIEW_BASE_CLASS: &str = "DbView";

const INDENT_CASE: &str = "    ";
const INDENT_MEMBER: &str = "        ";
const INDENT_STRING: &str = "            ";

fn insert(dict: &mut Dictionary, key: &str, value: impl Into<String>) {
    dict.insert(key.to_string(), value.into());
}

/// Insert `value` as-is, lowercased and uppercased under the three
/// spellings of `key` (e.g. `Table`, `table`, `TABLE`)
fn insert_cased(dict: &mut Dictionary, key: &str, value: &str) {
    insert(dict, key, value);
    insert(dict, &key.to_lowercase(), value.to_lowercase());
    insert(dict, &key.to_uppercase(), value.to_uppercase());
}

/// Variables shared by every generated file of `component`
pub fn common(options: &QtOptions, database: &str, component: &str) -> Dictionary {
    let mut dict = Dictionary::new();
    insert_cased(&mut dict, "Database", database);
    insert_cased(&mut dict, "Table", component);
    insert_cased(&mut dict, "Namespace", &options.namespace);
    insert_cased(&mut dict, "BaseClass", &options.base_class);
    insert(&mut dict, "MetaClassInclude", META_CLASS_INCLUDE);
    insert(&mut dict, "RecordBaseClass", RECORD_BASE_CLASS);
    insert(&mut dict, "EXPORT", options.export_macro.as_str());
    insert(
        &mut dict,
        "IMPORTH",
        if options.import_header.is_empty() {
            String::new()
        } else {
            format!("#include <{}>", options.import_header)
        },
    );
    insert(&mut dict, "Year", options.date.format("%Y").to_string());
    insert(&mut dict, "Month", options.date.format("%B").to_string());
    insert(&mut dict, "Author", options.author.as_str());
    dict
}

/// Escape `value` for use inside a C string literal
pub fn c_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// Statement loading `target` from the `QVariant` expression `source`.
///
/// Numeric conversions report failure through `b_one` / `b_ret`, which the
/// surrounding template declares.
fn from_variant(qtype: &str, target: &str, source: &str) -> Option<String> {
    let checked = |method: &str| {
        format!(
            "{} = ({}){}.{} (&b_one); b_ret = b_ret && b_one;",
            target, qtype, source, method
        )
    };
    let plain = |method: &str| format!("{} = {}.{} ();", target, source, method);

    Some(match qtype {
        "QString" => plain("toString"),
        "QByteArray" => plain("toByteArray"),
        "QDateTime" => plain("toDateTime"),
        "QDate" => plain("toDate"),
        "QTime" => plain("toTime"),
        "bool" => plain("toBool"),
        "long" => checked("toLongLong"),
        "int" | "short" | "char" | "byte" => checked("toInt"),
        "double" | "float" => checked("toDouble"),
        "QVariant" => format!("{} = {};", target, source),
        _ => return None,
    })
}

/// One quoted line per name, comma-terminated except the last
fn quoted_lines(items: impl IntoIterator<Item = String>) -> String {
    let items: Vec<String> = items.into_iter().collect();
    if items.is_empty() {
        return format!("{}\"\"", INDENT_STRING);
    }
    let last = items.len() - 1;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let sep = if i == last { "" } else { "," };
            format!("{}\"{}{}\"", INDENT_STRING, item, sep)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Name of the member holding `column`
fn member(column: &Column) -> String {
    column.name.to_lowercase()
}

/// Translatable label expression
fn label_expr(database: &str, table: &Table, column: &Column) -> String {
    format!(
        "QCoreApplication::translate(\"{}::{}\", \"{}\")",
        c_string(database),
        c_string(&table.name),
        c_string(column.label())
    )
}

/// `DbColumn` constructor expression describing `column`
fn column_ctor(database: &str, table: &Table, column: &Column) -> String {
    let default = column
        .resolved_default()
        .map(|value| match value {
            DefaultValue::Literal(v) | DefaultValue::Expression(v) => c_string(v),
        })
        .unwrap_or_default();
    format!(
        "DbColumn(\"{}\", {}, {}, {}, \"{}\", {}, {}, \"{}\")",
        column.name,
        column.id_string(),
        column
            .length()
            .map(|len| len.to_string())
            .unwrap_or_else(|| "-1".to_string()),
        label_expr(database, table, column),
        column.datatype_name(),
        column.allow_nulls,
        column.is_autoincrement(),
        default
    )
}

/// Fragments describing the columns of `table`
pub fn table(database: &str, table: &Table) -> Result<Dictionary, SchemaError> {
    let mut column_ids = Vec::new();
    let mut real_column_ids = Vec::new();
    let mut data_members = Vec::new();
    let mut pipe_columns = Vec::new();
    let mut case_columns = Vec::new();
    let mut case_labels = Vec::new();
    let mut model_labels = Vec::new();
    let mut default_ctor = Vec::new();
    let mut copy_ctor = Vec::new();
    let mut assign_ctor = Vec::new();
    let mut column_ctors = Vec::new();
    let mut index_ctors = Vec::new();
    let mut retrieve = Vec::new();
    let mut record = Vec::new();
    let mut bind = Vec::new();
    let mut bind_one = Vec::new();
    let mut foreign_cases = Vec::new();

    let id = table.id_column();

    for column in &table.columns {
        let qtype = column.qt_type(table);
        let var = member(column);
        let colid = column.id_string();
        let label = label_expr(database, table, column);
        let ctor = column_ctor(database, table, column);

        let unsupported = || SchemaError::CodeGen {
            table: table.name.clone(),
            message: format!(
                "column '{}' has type '{}', which cannot be read from a QVariant",
                column.name, qtype
            ),
        };
        // every type must be convertible, even for columns that are never loaded
        from_variant(qtype, &var, "value").ok_or_else(unsupported)?;

        column_ids.push(format!("{}{},", INDENT_MEMBER, colid));
        data_members.push(format!("    {} {};", qtype, var));
        pipe_columns.push(format!("{}<< QLatin1String(\"{}\")", INDENT_MEMBER, column.name));
        case_columns.push(format!(
            "{}case {}: result = QLatin1String(\"{}\"); break;",
            INDENT_CASE, colid, column.name
        ));
        case_labels.push(format!(
            "{}case {}: result = {}; break;",
            INDENT_CASE, colid, label
        ));
        model_labels.push(format!(
            "{}model->setHeaderData ({}, Qt::Horizontal, {});",
            INDENT_CASE, colid, label
        ));

        let initial = match id {
            Some(id) if id.name == column.name && column.is_autoincrement() => "COLID_INVALID",
            Some(id) if id.name == column.name && qtype == "QString" => "QLatin1String(\"-1\")",
            _ => "",
        };
        default_ctor.push(format!("{}{} ({})", INDENT_MEMBER, var, initial));
        copy_ctor.push(format!("{}{} (other.{})", INDENT_MEMBER, var, var));
        assign_ctor.push(format!("{}{} = other.{};", INDENT_MEMBER, var, var));
        column_ctors.push(format!(
            "{}static DbColumn {}ColCtor () {{ return {}; }}",
            INDENT_CASE, var, ctor
        ));
        index_ctors.push(format!("{}case {}: return {};", INDENT_CASE, colid, ctor));

        if let Some(target) = column.foreign_key() {
            foreign_cases.push(format!(
                "{}case {}: return QLatin1String(\"{}\");",
                INDENT_CASE, colid, target.table
            ));
        }

        match column.virtual_column() {
            None => {
                let rcolid = column.real_id_string();
                real_column_ids.push(format!("{}{},", INDENT_MEMBER, rcolid));
                retrieve.extend(from_variant(
                    qtype,
                    &var,
                    &format!("query.value ({})", rcolid),
                ));
                record.extend(from_variant(
                    qtype,
                    &var,
                    &format!("rec.value (QLatin1String(\"{}\"))", column.name),
                ));
                bind.push(format!(
                    "{}query.bindValue (QLatin1String(\":{}\"), {});",
                    INDENT_CASE, column.name, var
                ));
                bind_one.push(format!(
                    "{}case {}: query.bindValue (QLatin1String(\":{}\"), {}); break;",
                    INDENT_CASE, colid, column.name, var
                ));
            }
            Some(vrt) if vrt.dynamic => {
                trace!(table = ?table.name, column = ?column.name, "Dynamic column left to the runtime");
            }
            Some(vrt) => match vrt.source(table) {
                Some(source) => {
                    retrieve.extend(from_variant(
                        qtype,
                        &var,
                        &format!("query.value ({})", source.real_id_string()),
                    ));
                    record.extend(from_variant(
                        qtype,
                        &var,
                        &format!("rec.value (QLatin1String(\"{}\"))", source.name),
                    ));
                }
                None => {
                    trace!(table = ?table.name, column = ?column.name, "Virtual column without source");
                }
            },
        }
    }

    let statements = |lines: Vec<String>| {
        lines
            .into_iter()
            .map(|line| format!("{}{}", INDENT_CASE, line))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let is_id = |col: &&Column| id.is_some_and(|id| id.name == col.name);
    let names = |with_id: bool| {
        table
            .real_columns()
            .filter(move |col| with_id || !is_id(col))
            .map(|col| col.name.clone())
            .collect::<Vec<_>>()
    };

    let (id_column, get_id, set_id) = match id {
        Some(col) if col.data_type().is_some_and(|dt| dt.kind.is_integer()) => {
            (col.index.to_string(), "id", "id = value")
        }
        Some(col) => (
            col.index.to_string(),
            "COLID_INVALID",
            "// id unavailable in this model",
        ),
        None => (
            "COLID_INVALID".to_string(),
            "COLID_INVALID",
            "// id unavailable in this model",
        ),
    };

    let mut dict = Dictionary::new();
    insert(&mut dict, "COLUMN_COUNT", table.columns.len().to_string());
    insert(&mut dict, "REAL_COLUMN_COUNT", table.real_column_count().to_string());
    insert(&mut dict, "COLUMN_IDS", column_ids.join("\n"));
    insert(&mut dict, "REAL_COLUMN_IDS", real_column_ids.join("\n"));
    insert(&mut dict, "TableDataMembers", data_members.join("\n"));
    insert(&mut dict, "PIPE_COLUMNS", pipe_columns.join("\n"));
    insert(&mut dict, "CASE_COLUMNS", case_columns.join("\n"));
    insert(&mut dict, "CASE_LABELS", case_labels.join("\n"));
    insert(&mut dict, "MODEL_LABELS", model_labels.join("\n"));
    insert(&mut dict, "DefaultConstructor", default_ctor.join(",\n"));
    insert(&mut dict, "CopyConstructor", copy_ctor.join(",\n"));
    insert(&mut dict, "AssignConstructor", assign_ctor.join("\n"));
    insert(&mut dict, "TableColumnConstr", column_ctors.join("\n"));
    insert(&mut dict, "TableColumnsIndexCtor", index_ctors.join("\n"));
    insert(&mut dict, "RETREIVE_COLUMNS", statements(retrieve));
    insert(&mut dict, "RECORD_COLUMNS", statements(record));
    insert(&mut dict, "BIND_COLUMNS", bind.join("\n"));
    insert(&mut dict, "BIND_ONE_COLUMN", bind_one.join("\n"));
    insert(&mut dict, "FOREIGN_TABLE_CASES", foreign_cases.join("\n"));
    insert(&mut dict, "COMMA_COLUMNS", quoted_lines(names(true)));
    insert(&mut dict, "COMMA_COLUMNS_NO_ID", quoted_lines(names(false)));
    insert(
        &mut dict,
        "COLUMN_COLUMNS",
        quoted_lines(names(false).into_iter().map(|n| format!(":{}", n))),
    );
    insert(
        &mut dict,
        "ASSIGN_COLUMNS",
        quoted_lines(names(false).into_iter().map(|n| format!("{}=:{}", n, n))),
    );
    insert(&mut dict, "ID_COLUMN", id_column);
    insert(&mut dict, "GET_ID_RESULT", get_id);
    insert(&mut dict, "SET_ID_RESULT", set_id);
    insert(&mut dict, "TableModify", table.name.as_str());
    Ok(dict)
}

/// Fragments listing every table and view of the database
pub fn database(database: &str, tables: &[String], views: &[String]) -> Dictionary {
    let prefix = format!("{}::meta::", database.to_lowercase());

    let mut all_headers = Vec::new();
    let mut all_meta_headers = Vec::new();
    let mut component_ids = Vec::new();
    let mut component_name_case = Vec::new();
    let mut name_to_id = Vec::new();

    let mut section = |names: &[String], id_prefix: &str| {
        let mut ids = Vec::new();
        let mut ctors = Vec::new();
        let mut name_case = Vec::new();
        for name in names {
            let upper = name.to_uppercase();
            let lower = name.to_lowercase();
            let dbc = format!("DBC_{}", upper);
            let own = format!("{}_{}", id_prefix, upper);

            all_headers.push(format!("#include \"{}.h\"", lower));
            all_meta_headers.push(format!("#include \"{}-meta.h\"", lower));
            component_ids.push(format!("{}{},", INDENT_MEMBER, dbc));
            component_name_case.push(format!(
                "{}case {}: return QLatin1String(\"{}\");",
                INDENT_MEMBER, dbc, name
            ));
            name_to_id.push(format!(
                "{}if (!value.compare(QLatin1String(\"{}\"), Qt::CaseInsensitive)) return {};",
                INDENT_MEMBER, name, dbc
            ));

            ids.push(format!("{}{},", INDENT_MEMBER, own));
            ctors.push(format!(
                "    static {p}{n} {l} () {{ return {p}{n} (); }}",
                p = prefix,
                n = name,
                l = lower
            ));
            name_case.push(format!(
                "{}case {}: return QLatin1String(\"{}\");",
                INDENT_MEMBER, own, name
            ));
        }
        (ids.join("\n"), ctors.join("\n"), name_case.join("\n"))
    };

    let (table_ids, tables_ctor, tables_name_case) = section(tables, "DBT");
    let (view_ids, views_ctor, views_name_case) = section(views, "DBV");

    let mut dict = Dictionary::new();
    insert(&mut dict, "INCLUDE_ALL_HEADERS", all_headers.join("\n"));
    insert(&mut dict, "INCLUDE_ALL_META_HEADERS", all_meta_headers.join("\n"));
    insert(&mut dict, "DBC_IDS", component_ids.join("\n"));
    insert(&mut dict, "DB_TABLE_IDS", table_ids);
    insert(&mut dict, "DB_VIEW_IDS", view_ids);
    insert(&mut dict, "DB_TABLES_CONSTR", tables_ctor);
    insert(&mut dict, "DB_VIEWS_CONSTR", views_ctor);
    insert(&mut dict, "DB_COMPONENTS_NAME_CASE", component_name_case.join("\n"));
    insert(&mut dict, "DB_TABLES_NAME_CASE", tables_name_case);
    insert(&mut dict, "DB_VIEWS_NAME_CASE", views_name_case);
    insert(&mut dict, "DB_COMPONENTS_NAME_TO_ID", name_to_id.join("\n"));
    dict
}
