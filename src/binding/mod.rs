//! XML binding
//!
//! Parses a database description and binds it to the typed objects in
//! [`crate::schema`]. Binding doubles as structural validation: unknown
//! elements and attributes, missing required attributes and malformed values
//! are rejected with the location of the offending element. Cross-reference
//! checks live in [`validate`].

use std::fs;
use std::path::Path;

use tracing::{debug, info, trace, warn};

use crate::error::SchemaError;
use crate::schema::{
    ChoiceItem, Column, ColumnKind, Constraint, ConstraintColumn, DataType, DataTypeKind,
    Database, ForeignRef, Identity, Index, InnerSelect, Relationship, SortOrder, Subset, Table,
    View, VirtualColumn, WriteBack, WriteBackColumn, VIRTUAL_TAG,
};

mod element;
pub mod validate;

use element::Element;
pub use validate::{validate, ValidationReport};

/// Read and bind a description file
pub fn load(path: &Path) -> Result<Database, SchemaError> {
    debug!(path = ?path, "Reading database description");
    let text = fs::read_to_string(path).map_err(|source| SchemaError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&text)
}

/// Read, bind and validate a description file.
///
/// Validation warnings are logged; errors are returned together.
pub fn load_validated(path: &Path) -> Result<Database, SchemaError> {
    let database = load(path)?;
    let report = validate(&database);
    for warning in &report.warnings {
        warn!(path = ?path, "{}", warning);
    }
    report.into_result()?;
    Ok(database)
}

/// Bind a description held in memory
pub fn parse_str(xml: &str) -> Result<Database, SchemaError> {
    let document = roxmltree::Document::parse(xml)?;
    let root = Element::root(document.root_element());
    if root.tag() != "database" {
        return Err(root.error(format!(
            "root element must be 'database', found '{}'",
            root.tag()
        )));
    }

    let database = bind_database(&root)?;
    info!(
        database = ?database.name,
        tables = database.tables.len(),
        views = database.views.len(),
        "Bound database description"
    );
    Ok(database)
}

fn bind_database(el: &Element) -> Result<Database, SchemaError> {
    el.check_attributes(&[
        "name", "username", "driver", "host", "path", "password", "port",
    ])?;
    el.check_unique_children(&["tables", "views"])?;

    let tables = match el.child("tables") {
        Some(tables) => tables
            .children_named("table")?
            .iter()
            .map(bind_table)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let views = match el.child("views") {
        Some(views) => views
            .children_named("view")?
            .iter()
            .map(bind_view)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    Ok(Database {
        name: el.required("name")?,
        namespace: el.namespace(),
        username: el.attr("username"),
        driver: el.attr("driver"),
        host: el.attr("host"),
        path: el.attr("path"),
        password: el.attr("password"),
        port: el.number("port")?,
        tables,
        views,
    })
}

fn bind_table(el: &Element) -> Result<Table, SchemaError> {
    el.check_attributes(&["name"])?;
    el.check_unique_children(&[
        "columns",
        "primaryKey",
        "uniqueConstraints",
        "indexes",
        "relationships",
    ])?;
    let name = el.required("name")?;
    debug!(table = ?name, "Binding table");

    let columns_el = el
        .child("columns")
        .ok_or_else(|| el.error("missing required element 'columns'"))?;
    let mut columns = columns_el
        .children_named("column")?
        .iter()
        .map(bind_column)
        .collect::<Result<Vec<_>, _>>()?;
    assign_indices(&mut columns);

    let primary_key = match el.child("primaryKey") {
        Some(pk) => {
            pk.check_attributes(&[])?;
            let keys = pk.children_named("key")?;
            if keys.len() > 1 {
                return Err(pk.error("a primary key holds a single 'key' element"));
            }
            keys.first().map(|key| bind_constraint(key, &[])).transpose()?
        }
        None => None,
    };

    let unique_constraints = match el.child("uniqueConstraints") {
        Some(list) => list
            .children_named("constraint")?
            .iter()
            .map(|c| bind_constraint(c, &[]))
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let indexes = match el.child("indexes") {
        Some(list) => list
            .children_named("index")?
            .iter()
            .map(bind_index)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let relationships = match el.child("relationships") {
        Some(list) => list
            .children_named("relationship")?
            .iter()
            .map(bind_relationship)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    trace!(table = ?name, columns = columns.len(), "Bound table");

    Ok(Table {
        name,
        columns,
        primary_key,
        unique_constraints,
        indexes,
        relationships,
    })
}

/// Number the columns among all columns and among stored columns
fn assign_indices(columns: &mut [Column]) {
    let mut real = 0;
    for (index, column) in columns.iter_mut().enumerate() {
        column.index = index;
        if column.is_virtual() {
            column.real_index = None;
        } else {
            column.real_index = Some(real);
            real += 1;
        }
    }
}

fn bind_column(el: &Element) -> Result<Column, SchemaError> {
    el.check_attributes(&[
        "name",
        "label",
        "allowNulls",
        "readOnly",
        "foreignTable",
        "foreignColumn",
        "foreignInsert",
        "foreignBehavior",
        "userformat",
    ])?;
    let name = el.required("name")?;

    let children = el.children();
    let type_el = match children.as_slice() {
        [single] => single,
        [] => return Err(el.error("column has no datatype element")),
        [_, extra, ..] => {
            return Err(extra.error("column must hold exactly one datatype element"))
        }
    };

    let kind = if type_el.tag() == VIRTUAL_TAG {
        ColumnKind::Virtual(bind_virtual(type_el)?)
    } else {
        let kind = DataTypeKind::from_tag(type_el.tag())
            .ok_or_else(|| type_el.error(format!("unknown datatype '{}'", type_el.tag())))?;
        ColumnKind::Real(bind_datatype(type_el, kind)?)
    };

    let foreign = match el.attr("foreignTable") {
        Some(table) => {
            let mut target = ForeignRef::new(table);
            if let Some(column) = el.attr("foreignColumn") {
                target.column = column;
            }
            if let Some(insert) = el.attr("foreignInsert") {
                target.insert = insert;
            }
            if let Some(behavior) = el.attr("foreignBehavior") {
                target.behavior = behavior;
            }
            Some(target)
        }
        None if el.attr("foreignColumn").is_some() => {
            return Err(el.error("'foreignColumn' requires 'foreignTable'"));
        }
        None => None,
    };

    let mut column = Column::new(name, kind);
    column.label = el.attr("label").filter(|label| !label.is_empty());
    column.allow_nulls = el.flag("allowNulls", true)?;
    column.read_only = el.flag("readOnly", false)?;
    column.foreign = foreign;
    column.user_format = el.attr("userformat").filter(|fmt| !fmt.is_empty());
    Ok(column)
}

fn bind_datatype(el: &Element, kind: DataTypeKind) -> Result<DataType, SchemaError> {
    let mut allowed = vec!["default", "defaultExpression", "sqltype", "qtype"];
    if kind.supports_length() {
        allowed.push("length");
    }
    match kind {
        DataTypeKind::Decimal | DataTypeKind::Numeric => allowed.extend(["precision", "scale"]),
        DataTypeKind::DecimalScale0 | DataTypeKind::NumericScale0 => allowed.push("precision"),
        DataTypeKind::Float => allowed.push("mantissaBits"),
        _ => {}
    }
    el.check_attributes(&allowed)?;

    let mut data_type = DataType::new(kind);
    data_type.sql_type = el.attr("sqltype").filter(|t| !t.is_empty());
    data_type.qt_type = el.attr("qtype").filter(|t| !t.is_empty());
    data_type.default = el.attr("default");
    data_type.default_expression = el.attr("defaultExpression");
    data_type.length = el.number("length")?;
    data_type.precision = el.number("precision")?;
    data_type.scale = el.number("scale")?;
    data_type.mantissa_bits = el.number("mantissaBits")?;

    for child in el.children() {
        match child.tag() {
            "identity" if kind.supports_identity() => {
                if data_type.identity.is_some() {
                    return Err(child.error("element 'identity' may appear only once"));
                }
                child.check_attributes(&["seed", "increment", "notForReplication"])?;
                data_type.identity = Some(Identity {
                    seed: child.number("seed")?,
                    increment: child.number("increment")?,
                    not_for_replication: child.flag("notForReplication", false)?,
                });
            }
            "item" if kind == DataTypeKind::Choice => {
                child.check_attributes(&["id", "name", "label"])?;
                data_type.items.push(ChoiceItem {
                    id: child.required("id")?,
                    name: child.required("name")?,
                    label: child.attr("label").unwrap_or_default(),
                });
            }
            other => {
                return Err(child.error(format!(
                    "unexpected element '{}' inside datatype '{}'",
                    other,
                    kind.tag()
                )))
            }
        }
    }

    Ok(data_type)
}

fn bind_virtual(el: &Element) -> Result<VirtualColumn, SchemaError> {
    el.check_attributes(&["dynamic", "references"])?;
    if let Some(child) = el.children().first() {
        return Err(child.error("virtual columns take no child elements"));
    }
    Ok(VirtualColumn {
        dynamic: el.flag("dynamic", false)?,
        references: el.attr("references").filter(|r| !r.is_empty()),
    })
}

fn bind_constraint(el: &Element, extra: &[&str]) -> Result<Constraint, SchemaError> {
    let mut allowed = vec!["name", "clustered", "padIndex", "fillFactor"];
    allowed.extend_from_slice(extra);
    el.check_attributes(&allowed)?;

    let columns = el
        .children_named("column")?
        .iter()
        .map(|col| -> Result<ConstraintColumn, SchemaError> {
            col.check_attributes(&["name", "sortOrder"])?;
            let sort_order = match col.attr("sortOrder") {
                Some(order) => Some(SortOrder::parse(&order).ok_or_else(|| {
                    col.error(format!("unknown sort order '{}'", order))
                })?),
                None => None,
            };
            Ok(ConstraintColumn {
                name: col.required("name")?,
                sort_order,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        return Err(el.error("constraint lists no columns"));
    }

    Ok(Constraint {
        name: el.attr("name").filter(|n| !n.is_empty()),
        clustered: el.optional_flag("clustered")?,
        pad_index: el.optional_flag("padIndex")?,
        fill_factor: el.number("fillFactor")?,
        columns,
    })
}

fn bind_index(el: &Element) -> Result<Index, SchemaError> {
    Ok(Index {
        definition: bind_constraint(el, &["unique"])?,
        unique: el.flag("unique", false)?,
    })
}

fn bind_relationship(el: &Element) -> Result<Relationship, SchemaError> {
    el.check_attributes(&["name"])?;
    el.check_unique_children(&["foreignKeyColumns", "primaryKeyTable"])?;

    let column_names = |list: &Element| -> Result<Vec<String>, SchemaError> {
        list.children_named("column")?
            .iter()
            .map(|col| {
                col.check_attributes(&["name"])?;
                col.required("name")
            })
            .collect()
    };

    let fk_el = el
        .child("foreignKeyColumns")
        .ok_or_else(|| el.error("missing required element 'foreignKeyColumns'"))?;
    fk_el.check_attributes(&[])?;
    let pk_el = el
        .child("primaryKeyTable")
        .ok_or_else(|| el.error("missing required element 'primaryKeyTable'"))?;
    pk_el.check_attributes(&["name"])?;

    let columns = column_names(&fk_el)?;
    let referenced_columns = column_names(&pk_el)?;
    if columns.is_empty() {
        return Err(fk_el.error("relationship lists no columns"));
    }
    if columns.len() != referenced_columns.len() {
        return Err(el.error(format!(
            "relationship maps {} column(s) onto {} referenced column(s)",
            columns.len(),
            referenced_columns.len()
        )));
    }

    Ok(Relationship {
        name: el.attr("name").filter(|n| !n.is_empty()),
        columns,
        table: pk_el.required("name")?,
        referenced_columns,
    })
}

fn bind_view(el: &Element) -> Result<View, SchemaError> {
    el.check_attributes(&["name"])?;
    el.check_unique_children(&["subset", "writeback"])?;
    let name = el.required("name")?;
    debug!(view = ?name, "Binding view");

    Ok(View {
        name,
        subset: el.child("subset").map(|s| bind_subset(&s)).transpose()?,
        writeback: el.child("writeback").map(|w| bind_writeback(&w)).transpose()?,
    })
}

fn bind_subset(el: &Element) -> Result<Subset, SchemaError> {
    el.check_attributes(&[
        "name1",
        "col1",
        "constraint",
        "value",
        "in",
        "incol",
        "where",
    ])?;
    if let Some(child) = el.children().first() {
        return Err(child.error("subsets take no child elements"));
    }

    let inner = match el.attr("in") {
        Some(table) => Some(InnerSelect {
            table,
            column: el.required("incol")?,
            where_column: el.required("where")?,
        }),
        None if el.attr("incol").is_some() || el.attr("where").is_some() => {
            return Err(el.error("'incol' and 'where' require 'in'"));
        }
        None => None,
    };

    Ok(Subset {
        table: el.required("name1")?,
        column: el.required("col1")?,
        constraint: el.required("constraint")?,
        // an empty value is legitimate, e.g. with `IS NULL`
        value: el
            .attr("value")
            .ok_or_else(|| el.error("missing required attribute 'value'"))?,
        inner,
    })
}

fn bind_writeback(el: &Element) -> Result<WriteBack, SchemaError> {
    el.check_attributes(&["table"])?;
    let columns = el
        .children_named("column")?
        .iter()
        .map(|col| -> Result<WriteBackColumn, SchemaError> {
            col.check_attributes(&["name", "value", "default"])?;
            Ok(WriteBackColumn {
                name: col.required("name")?,
                value: col.attr("value"),
                default: col.attr("default"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(WriteBack {
        table: el.required("table")?,
        columns,
    })
}
