//! Schema data structures
//!
//! These types mirror the XML database description and form the contract
//! between binding (produces) and the drivers (consume). Everything a driver
//! needs to know about a column is derived here so that drivers only format.

/// A complete database description
#[derive(Debug, Clone, Default)]
pub struct Database {
    pub name: String,
    /// Default namespace of the source document, if it declared one
    pub namespace: Option<String>,
    pub username: Option<String>,
    pub driver: Option<String>,
    pub host: Option<String>,
    pub path: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
    pub tables: Vec<Table>,
    pub views: Vec<View>,
}

impl Database {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }

    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.iter().find(|view| view.name == name)
    }
}

/// Database table
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Option<Constraint>,
    pub unique_constraints: Vec<Constraint>,
    pub indexes: Vec<Index>,
    pub relationships: Vec<Relationship>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|col| col.name == name)
    }

    /// Columns with physical storage, in document order
    pub fn real_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|col| !col.is_virtual())
    }

    pub fn real_column_count(&self) -> usize {
        self.real_columns().count()
    }

    /// The conventional `id` column, if the table has one
    pub fn id_column(&self) -> Option<&Column> {
        self.column("id")
    }

    /// Get primary key columns in key order
    pub fn primary_key_columns(&self) -> Vec<&Column> {
        self.primary_key
            .iter()
            .flat_map(|key| key.columns.iter())
            .filter_map(|key_col| self.column(&key_col.name))
            .collect()
    }

    /// Check if the primary key is assigned by the database on insert
    pub fn has_auto_generated_pk(&self) -> bool {
        self.primary_key_columns()
            .iter()
            .any(|col| col.is_autoincrement())
    }

    /// Resolve every foreign key of this table.
    ///
    /// Relationships are listed after the column-level references. A
    /// column-level reference that a single-column relationship already
    /// describes is reported only once, through the relationship.
    pub fn foreign_keys(&self) -> Vec<ForeignKey> {
        let covered = |col: &Column, target: &ForeignRef| {
            self.relationships.iter().any(|rel| {
                rel.columns.len() == 1 && rel.columns[0] == col.name && rel.table == target.table
            })
        };

        let mut keys: Vec<ForeignKey> = self
            .columns
            .iter()
            .filter_map(|col| col.foreign_key().map(|target| (col, target)))
            .filter(|(col, target)| !col.is_virtual() && !covered(*col, *target))
            .map(|(col, target)| ForeignKey {
                name: None,
                columns: vec![col.name.clone()],
                table: target.table.clone(),
                referenced_columns: vec![target.column.clone()],
            })
            .collect();

        keys.extend(self.relationships.iter().map(|rel| ForeignKey {
            name: rel.name.clone(),
            columns: rel.columns.clone(),
            table: rel.table.clone(),
            referenced_columns: rel.referenced_columns.clone(),
        }));

        keys
    }
}

/// A foreign key after resolution, whatever its declaration site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub table: String,
    pub referenced_columns: Vec<String>,
}

/// A table column
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub label: Option<String>,
    pub allow_nulls: bool,
    pub read_only: bool,
    pub foreign: Option<ForeignRef>,
    pub user_format: Option<String>,
    pub kind: ColumnKind,
    /// Position among all columns of the table
    pub index: usize,
    /// Position among the stored columns; `None` for virtual columns
    pub real_index: Option<usize>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            label: None,
            allow_nulls: true,
            read_only: false,
            foreign: None,
            user_format: None,
            kind,
            index: 0,
            real_index: None,
        }
    }

    /// User-visible name; falls back to the column name
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Identifier of the column among all columns (`COLID_NAME`)
    pub fn id_string(&self) -> String {
        format!("COLID_{}", self.name.to_uppercase())
    }

    /// Identifier of the column among stored columns (`RCOLID_NAME`)
    pub fn real_id_string(&self) -> String {
        format!("RCOLID_{}", self.name.to_uppercase())
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self.kind, ColumnKind::Virtual(_))
    }

    pub fn data_type(&self) -> Option<&DataType> {
        match &self.kind {
            ColumnKind::Real(data_type) => Some(data_type),
            ColumnKind::Virtual(_) => None,
        }
    }

    pub fn virtual_column(&self) -> Option<&VirtualColumn> {
        match &self.kind {
            ColumnKind::Real(_) => None,
            ColumnKind::Virtual(vrt) => Some(vrt),
        }
    }

    /// Name of the datatype element that describes this column
    pub fn datatype_name(&self) -> &'static str {
        match &self.kind {
            ColumnKind::Real(data_type) => data_type.kind.tag(),
            ColumnKind::Virtual(_) => VIRTUAL_TAG,
        }
    }

    pub fn length(&self) -> Option<u32> {
        self.data_type().and_then(|dt| dt.length)
    }

    /// The default value, with an explicit value winning over an expression
    pub fn resolved_default(&self) -> Option<DefaultValue<'_>> {
        let data_type = self.data_type()?;
        match (&data_type.default, &data_type.default_expression) {
            (Some(value), _) if !value.is_empty() => Some(DefaultValue::Literal(value)),
            (_, Some(expr)) if !expr.is_empty() => Some(DefaultValue::Expression(expr)),
            _ => None,
        }
    }

    /// Default value formatted for a SQL `DEFAULT` clause
    pub fn sql_default(&self) -> Option<String> {
        let data_type = self.data_type()?;
        match self.resolved_default()? {
            DefaultValue::Expression(expr) => Some(expr.to_string()),
            DefaultValue::Literal(value) if data_type.kind == DataTypeKind::Bit => {
                let flag = matches!(
                    value.to_ascii_lowercase().as_str(),
                    "1" | "true" | "t" | "yes"
                );
                Some(if flag { "1" } else { "0" }.to_string())
            }
            DefaultValue::Literal(value) if data_type.kind.is_textual() => {
                Some(quote_sql_literal(value))
            }
            DefaultValue::Literal(value) => Some(value.to_string()),
        }
    }

    pub fn foreign_key(&self) -> Option<&ForeignRef> {
        self.foreign.as_ref()
    }

    pub fn is_foreign_key(&self) -> bool {
        self.foreign.is_some()
    }

    /// Whether the database assigns the value on insert
    pub fn is_autoincrement(&self) -> bool {
        self.data_type().is_some_and(|dt| dt.identity.is_some())
    }

    /// SQL type name; virtual columns have none
    pub fn sql_type(&self) -> Option<&str> {
        self.data_type().map(DataType::sql_type)
    }

    /// SQL type including its length or precision, e.g. `VARCHAR(64)`
    pub fn sql_type_decl(&self) -> Option<String> {
        let data_type = self.data_type()?;
        let base = data_type.sql_type();
        Some(match (data_type.length, data_type.precision, data_type.scale) {
            (Some(length), _, _) => format!("{}({})", base, length),
            (None, Some(precision), Some(scale)) => format!("{}({},{})", base, precision, scale),
            (None, Some(precision), None) => format!("{}({})", base, precision),
            _ => base.to_string(),
        })
    }

    /// C++ type used for this column's data member.
    ///
    /// Virtual columns borrow the type of the column they reference; dynamic
    /// ones (and dangling references) are carried as `QVariant`.
    pub fn qt_type<'a>(&'a self, table: &'a Table) -> &'a str {
        match &self.kind {
            ColumnKind::Real(data_type) => data_type.qt_type(),
            ColumnKind::Virtual(vrt) => vrt
                .source(table)
                .and_then(Column::data_type)
                .filter(|_| !vrt.dynamic)
                .map(DataType::qt_type)
                .unwrap_or(DYNAMIC_QT_TYPE),
        }
    }
}

/// Element name used for virtual columns
pub const VIRTUAL_TAG: &str = "vrtcol";

/// C++ type of values computed at runtime
pub const DYNAMIC_QT_TYPE: &str = "QVariant";

/// Storage of a column
#[derive(Debug, Clone)]
pub enum ColumnKind {
    Real(DataType),
    Virtual(VirtualColumn),
}

/// A column without physical storage
#[derive(Debug, Clone, Default)]
pub struct VirtualColumn {
    /// Value is computed by the runtime rather than copied
    pub dynamic: bool,
    /// Column in the same table the value is taken from
    pub references: Option<String>,
}

impl VirtualColumn {
    /// The stored column this one draws its value from
    pub fn source<'a>(&self, table: &'a Table) -> Option<&'a Column> {
        let name = self.references.as_deref()?;
        table.column(name).filter(|col| !col.is_virtual())
    }
}

/// Column-level reference to another table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignRef {
    pub table: String,
    pub column: String,
    /// Column of the foreign table stored on insert
    pub insert: String,
    /// How the user interface picks a foreign row
    pub behavior: String,
}

impl ForeignRef {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: "id".to_string(),
            insert: "id".to_string(),
            behavior: "choose".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue<'a> {
    Literal(&'a str),
    Expression(&'a str),
}

/// Datatype of a stored column, as described by its datatype element
#[derive(Debug, Clone, PartialEq)]
pub struct DataType {
    pub kind: DataTypeKind,
    /// Overrides the kind's SQL type
    pub sql_type: Option<String>,
    /// Overrides the kind's C++ type
    pub qt_type: Option<String>,
    pub default: Option<String>,
    pub default_expression: Option<String>,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub mantissa_bits: Option<u32>,
    pub identity: Option<Identity>,
    /// Allowed values of a `choice` column
    pub items: Vec<ChoiceItem>,
}

impl DataType {
    pub fn new(kind: DataTypeKind) -> Self {
        Self {
            kind,
            sql_type: None,
            qt_type: None,
            default: None,
            default_expression: None,
            length: None,
            precision: None,
            scale: None,
            mantissa_bits: None,
            identity: None,
            items: Vec::new(),
        }
    }

    pub fn sql_type(&self) -> &str {
        self.sql_type
            .as_deref()
            .unwrap_or_else(|| self.kind.default_sql_type())
    }

    pub fn qt_type(&self) -> &str {
        self.qt_type
            .as_deref()
            .unwrap_or_else(|| self.kind.default_qt_type())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataTypeKind {
    Bit,
    Tristate,
    Integer,
    BigInt,
    SmallInt,
    TinyInt,
    Choice,
    Numeric,
    Decimal,
    NumericScale0,
    DecimalScale0,
    Money,
    Float,
    Real,
    Date,
    DateTime,
    Time,
    Char,
    Varchar,
    Text,
    NChar,
    NVarchar,
    NText,
    Binary,
    VarBinary,
    Image,
    Xml,
}

impl DataTypeKind {
    pub const ALL: [DataTypeKind; 27] = [
        DataTypeKind::Bit,
        DataTypeKind::Tristate,
        DataTypeKind::Integer,
        DataTypeKind::BigInt,
        DataTypeKind::SmallInt,
        DataTypeKind::TinyInt,
        DataTypeKind::Choice,
        DataTypeKind::Numeric,
        DataTypeKind::Decimal,
        DataTypeKind::NumericScale0,
        DataTypeKind::DecimalScale0,
        DataTypeKind::Money,
        DataTypeKind::Float,
        DataTypeKind::Real,
        DataTypeKind::Date,
        DataTypeKind::DateTime,
        DataTypeKind::Time,
        DataTypeKind::Char,
        DataTypeKind::Varchar,
        DataTypeKind::Text,
        DataTypeKind::NChar,
        DataTypeKind::NVarchar,
        DataTypeKind::NText,
        DataTypeKind::Binary,
        DataTypeKind::VarBinary,
        DataTypeKind::Image,
        DataTypeKind::Xml,
    ];

    /// Element name in the XML description
    pub fn tag(self) -> &'static str {
        match self {
            DataTypeKind::Bit => "bit",
            DataTypeKind::Tristate => "tristate",
            DataTypeKind::Integer => "integer",
            DataTypeKind::BigInt => "bigint",
            DataTypeKind::SmallInt => "smallint",
            DataTypeKind::TinyInt => "tinyint",
            DataTypeKind::Choice => "choice",
            DataTypeKind::Numeric => "numeric",
            DataTypeKind::Decimal => "decimal",
            DataTypeKind::NumericScale0 => "numericScale0",
            DataTypeKind::DecimalScale0 => "decimalScale0",
            DataTypeKind::Money => "money",
            DataTypeKind::Float => "float",
            DataTypeKind::Real => "real",
            DataTypeKind::Date => "date",
            DataTypeKind::DateTime => "datetime",
            DataTypeKind::Time => "time",
            DataTypeKind::Char => "char",
            DataTypeKind::Varchar => "varchar",
            DataTypeKind::Text => "text",
            DataTypeKind::NChar => "nchar",
            DataTypeKind::NVarchar => "nvarchar",
            DataTypeKind::NText => "ntext",
            DataTypeKind::Binary => "binary",
            DataTypeKind::VarBinary => "varbinary",
            DataTypeKind::Image => "image",
            DataTypeKind::Xml => "xml",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.tag() == tag)
    }

    pub fn default_sql_type(self) -> &'static str {
        match self {
            DataTypeKind::Bit => "BOOLEAN",
            DataTypeKind::Tristate | DataTypeKind::SmallInt | DataTypeKind::TinyInt => "SMALLINT",
            DataTypeKind::Integer | DataTypeKind::Choice => "INTEGER",
            DataTypeKind::BigInt => "BIGINT",
            DataTypeKind::Numeric
            | DataTypeKind::Decimal
            | DataTypeKind::NumericScale0
            | DataTypeKind::DecimalScale0
            | DataTypeKind::Money => "DECIMAL",
            DataTypeKind::Float => "FLOAT",
            DataTypeKind::Real => "REAL",
            DataTypeKind::Date => "DATE",
            DataTypeKind::Time => "TIME",
            DataTypeKind::Char => "CHARACTER",
            DataTypeKind::DateTime
            | DataTypeKind::Varchar
            | DataTypeKind::Text
            | DataTypeKind::NChar
            | DataTypeKind::NVarchar
            | DataTypeKind::NText
            | DataTypeKind::Xml => "VARCHAR",
            DataTypeKind::Binary | DataTypeKind::VarBinary | DataTypeKind::Image => "VARBINARY",
        }
    }

    pub fn default_qt_type(self) -> &'static str {
        match self {
            DataTypeKind::Bit => "bool",
            DataTypeKind::Tristate | DataTypeKind::TinyInt => "char",
            DataTypeKind::Integer | DataTypeKind::Choice => "int",
            DataTypeKind::BigInt => "long",
            DataTypeKind::SmallInt => "short",
            DataTypeKind::Numeric
            | DataTypeKind::Decimal
            | DataTypeKind::NumericScale0
            | DataTypeKind::DecimalScale0
            | DataTypeKind::Money
            | DataTypeKind::Real => "double",
            DataTypeKind::Float => "float",
            DataTypeKind::Date => "QDate",
            DataTypeKind::Time => "QTime",
            DataTypeKind::DateTime => "QDateTime",
            DataTypeKind::Char
            | DataTypeKind::Varchar
            | DataTypeKind::Text
            | DataTypeKind::NText
            | DataTypeKind::Xml => "QString",
            DataTypeKind::NChar
            | DataTypeKind::NVarchar
            | DataTypeKind::Binary
            | DataTypeKind::VarBinary
            | DataTypeKind::Image => "QByteArray",
        }
    }

    /// Kinds that may carry an `identity` child
    pub fn supports_identity(self) -> bool {
        matches!(
            self,
            DataTypeKind::Integer
                | DataTypeKind::BigInt
                | DataTypeKind::SmallInt
                | DataTypeKind::TinyInt
                | DataTypeKind::NumericScale0
                | DataTypeKind::DecimalScale0
        )
    }

    /// Kinds that accept a `length` attribute
    pub fn supports_length(self) -> bool {
        matches!(
            self,
            DataTypeKind::Char
                | DataTypeKind::Varchar
                | DataTypeKind::NChar
                | DataTypeKind::NVarchar
                | DataTypeKind::Binary
                | DataTypeKind::VarBinary
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            DataTypeKind::Integer
                | DataTypeKind::BigInt
                | DataTypeKind::SmallInt
                | DataTypeKind::TinyInt
        )
    }

    /// Kinds whose literal defaults are quoted in SQL
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            DataTypeKind::Char
                | DataTypeKind::Varchar
                | DataTypeKind::Text
                | DataTypeKind::NChar
                | DataTypeKind::NVarchar
                | DataTypeKind::NText
                | DataTypeKind::Xml
                | DataTypeKind::Date
                | DataTypeKind::DateTime
                | DataTypeKind::Time
        )
    }
}

/// Database-assigned values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub seed: Option<i64>,
    pub increment: Option<i64>,
    pub not_for_replication: bool,
}

/// One allowed value of a `choice` column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceItem {
    pub id: String,
    pub name: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortOrder::Ascending),
            "desc" | "descending" => Some(SortOrder::Descending),
            _ => None,
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintColumn {
    pub name: String,
    pub sort_order: Option<SortOrder>,
}

/// Primary key or unique constraint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraint {
    pub name: Option<String>,
    pub clustered: Option<bool>,
    pub pad_index: Option<bool>,
    pub fill_factor: Option<u32>,
    pub columns: Vec<ConstraintColumn>,
}

impl Constraint {
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|col| col.name.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    pub definition: Constraint,
    pub unique: bool,
}

/// Table-level foreign key declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub name: Option<String>,
    /// Referencing columns in this table
    pub columns: Vec<String>,
    /// Referenced table
    pub table: String,
    pub referenced_columns: Vec<String>,
}

/// Database view
#[derive(Debug, Clone)]
pub struct View {
    pub name: String,
    pub subset: Option<Subset>,
    pub writeback: Option<WriteBack>,
}

impl View {
    /// The table whose rows the view projects
    pub fn source_table(&self) -> Option<&str> {
        self.subset.as_ref().map(|subset| subset.table.as_str())
    }
}

/// A filtered projection of one table, optionally restricted through a
/// second one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subset {
    /// Primary table
    pub table: String,
    /// Column of the primary table the filter applies to
    pub column: String,
    /// Comparison operator, e.g. `=` or `<>`
    pub constraint: String,
    pub value: String,
    pub inner: Option<InnerSelect>,
}

/// `column IN (SELECT column FROM table WHERE where_column ...)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerSelect {
    pub table: String,
    pub column: String,
    pub where_column: String,
}

/// Where edits made through a view are stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBack {
    pub table: String,
    pub columns: Vec<WriteBackColumn>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBackColumn {
    pub name: String,
    pub value: Option<String>,
    pub default: Option<String>,
}

/// Quote a string as a SQL literal
pub fn quote_sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn real(name: &str, kind: DataTypeKind) -> Column {
        Column::new(name, ColumnKind::Real(DataType::new(kind)))
    }

    fn with_default(mut col: Column, value: Option<&str>, expr: Option<&str>) -> Column {
        if let ColumnKind::Real(dt) = &mut col.kind {
            dt.default = value.map(str::to_string);
            dt.default_expression = expr.map(str::to_string);
        }
        col
    }

    fn key(names: &[&str]) -> Constraint {
        Constraint {
            columns: names
                .iter()
                .map(|name| ConstraintColumn {
                    name: name.to_string(),
                    sort_order: None,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_label_falls_back_to_name() {
        let mut col = real("title", DataTypeKind::Varchar);
        assert_eq!(col.label(), "title");
        col.label = Some("Book title".to_string());
        assert_eq!(col.label(), "Book title");
    }

    #[test]
    fn test_id_strings() {
        let col = real("author_id", DataTypeKind::Integer);
        assert_eq!(col.id_string(), "COLID_AUTHOR_ID");
        assert_eq!(col.real_id_string(), "RCOLID_AUTHOR_ID");
    }

    #[test]
    fn test_default_literal_wins_over_expression() {
        let col = with_default(real("n", DataTypeKind::Integer), Some("5"), Some("NOW()"));
        assert_eq!(col.resolved_default(), Some(DefaultValue::Literal("5")));

        let col = with_default(real("n", DataTypeKind::Integer), None, Some("NOW()"));
        assert_eq!(col.resolved_default(), Some(DefaultValue::Expression("NOW()")));
    }

    #[test]
    fn test_sql_default_formatting() {
        let text = with_default(real("t", DataTypeKind::Varchar), Some("it's"), None);
        assert_eq!(text.sql_default().as_deref(), Some("'it''s'"));

        let number = with_default(real("n", DataTypeKind::Money), Some("1.5"), None);
        assert_eq!(number.sql_default().as_deref(), Some("1.5"));

        let flag = with_default(real("b", DataTypeKind::Bit), Some("true"), None);
        assert_eq!(flag.sql_default().as_deref(), Some("1"));

        let expr = with_default(real("d", DataTypeKind::Date), None, Some("CURRENT_DATE"));
        assert_eq!(expr.sql_default().as_deref(), Some("CURRENT_DATE"));

        assert_eq!(real("x", DataTypeKind::Integer).sql_default(), None);
    }

    #[test]
    fn test_sql_type_decl() {
        let mut col = real("name", DataTypeKind::Varchar);
        if let ColumnKind::Real(dt) = &mut col.kind {
            dt.length = Some(64);
        }
        assert_eq!(col.sql_type_decl().as_deref(), Some("VARCHAR(64)"));

        let mut col = real("price", DataTypeKind::Decimal);
        if let ColumnKind::Real(dt) = &mut col.kind {
            dt.precision = Some(10);
            dt.scale = Some(2);
        }
        assert_eq!(col.sql_type_decl().as_deref(), Some("DECIMAL(10,2)"));

        let mut col = real("code", DataTypeKind::Integer);
        if let ColumnKind::Real(dt) = &mut col.kind {
            dt.sql_type = Some("MEDIUMINT".to_string());
        }
        assert_eq!(col.sql_type_decl().as_deref(), Some("MEDIUMINT"));
    }

    #[test]
    fn test_virtual_column_qt_type() {
        let table = Table {
            name: "book".to_string(),
            columns: vec![
                real("title", DataTypeKind::Varchar),
                Column::new(
                    "shown",
                    ColumnKind::Virtual(VirtualColumn {
                        dynamic: false,
                        references: Some("title".to_string()),
                    }),
                ),
                Column::new(
                    "computed",
                    ColumnKind::Virtual(VirtualColumn {
                        dynamic: true,
                        references: Some("title".to_string()),
                    }),
                ),
            ],
            ..Default::default()
        };

        assert_eq!(table.columns[1].qt_type(&table), "QString");
        assert_eq!(table.columns[2].qt_type(&table), "QVariant");
        assert_eq!(table.columns[1].datatype_name(), "vrtcol");
        assert_eq!(table.real_column_count(), 1);
    }

    #[test]
    fn test_has_auto_generated_pk() {
        let mut id = real("id", DataTypeKind::Integer);
        if let ColumnKind::Real(dt) = &mut id.kind {
            dt.identity = Some(Identity::default());
        }
        let table = Table {
            name: "book".to_string(),
            columns: vec![id],
            primary_key: Some(key(&["id"])),
            ..Default::default()
        };
        assert!(table.has_auto_generated_pk());

        let table = Table {
            name: "tag".to_string(),
            columns: vec![real("code", DataTypeKind::Char)],
            primary_key: Some(key(&["code"])),
            ..Default::default()
        };
        assert!(!table.has_auto_generated_pk());
    }

    #[test]
    fn test_foreign_keys_prefer_relationships() {
        let mut author = real("author", DataTypeKind::Integer);
        author.foreign = Some(ForeignRef::new("Author"));
        let mut publisher = real("publisher", DataTypeKind::Integer);
        publisher.foreign = Some(ForeignRef::new("Publisher"));

        let table = Table {
            name: "Book".to_string(),
            columns: vec![author, publisher],
            relationships: vec![Relationship {
                name: Some("fk_book_author".to_string()),
                columns: vec!["author".to_string()],
                table: "Author".to_string(),
                referenced_columns: vec!["id".to_string()],
            }],
            ..Default::default()
        };

        let keys = table.foreign_keys();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].name, None);
        assert_eq!(keys[0].table, "Publisher");
        assert_eq!(keys[1].name.as_deref(), Some("fk_book_author"));
    }

    #[test]
    fn test_datatype_tags_round_trip() {
        for kind in DataTypeKind::ALL {
            assert_eq!(DataTypeKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(DataTypeKind::from_tag("vrtcol"), None);
    }
}
