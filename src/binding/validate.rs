//! Cross-reference checks on a bound database description

use std::collections::HashSet;

use tracing::debug;

use crate::error::SchemaError;
use crate::schema::{Database, Table, View};

/// Every problem found in a description
#[derive(Debug, Default, Clone)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), SchemaError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(SchemaError::Validation {
                problems: self.errors,
            })
        }
    }
}

/// Why `column` cannot be referenced as a stored column of `table`, if it
/// cannot
fn stored_column_problem(table: &Table, column: &str) -> Option<&'static str> {
    match table.column(column) {
        None => Some("unknown column"),
        Some(c) if c.is_virtual() => Some("virtual column"),
        Some(_) => None,
    }
}

/// Check that every name the description mentions resolves
pub fn validate(database: &Database) -> ValidationReport {
    let mut report = ValidationReport::new();

    let mut seen = HashSet::new();
    for name in database
        .tables
        .iter()
        .map(|t| &t.name)
        .chain(database.views.iter().map(|v| &v.name))
    {
        if !seen.insert(name.as_str()) {
            report.add_error(format!("Name '{}' is used by more than one table or view", name));
        }
    }

    for table in &database.tables {
        report.merge(validate_table(database, table));
    }

    for view in &database.views {
        report.merge(validate_view(database, view));
    }

    debug!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "Validation finished"
    );
    report
}

fn validate_table(database: &Database, table: &Table) -> ValidationReport {
    let mut report = ValidationReport::new();
    let name = &table.name;

    if table.columns.is_empty() {
        report.add_error(format!("Table '{}' has no columns", name));
    }

    let mut seen = HashSet::new();
    for col in &table.columns {
        if !seen.insert(col.name.as_str()) {
            report.add_error(format!("Table '{}' has duplicate column '{}'", name, col.name));
        }
    }

    match &table.primary_key {
        None => report.add_warning(format!("Table '{}' has no primary key", name)),
        Some(key) => {
            for col in key.column_names() {
                match table.column(col) {
                    None => report.add_error(format!(
                        "Primary key of '{}' names unknown column '{}'",
                        name, col
                    )),
                    Some(c) if c.is_virtual() => report.add_error(format!(
                        "Primary key of '{}' uses virtual column '{}'",
                        name, col
                    )),
                    Some(_) => {}
                }
            }
        }
    }

    let constraints = table
        .unique_constraints
        .iter()
        .map(|c| ("Unique constraint", c))
        .chain(table.indexes.iter().map(|i| ("Index", &i.definition)));
    for (what, constraint) in constraints {
        for col in constraint.column_names() {
            if !table.real_columns().any(|c| c.name == col) {
                report.add_error(format!(
                    "{} {}on '{}' names unknown column '{}'",
                    what,
                    constraint
                        .name
                        .as_ref()
                        .map(|n| format!("'{}' ", n))
                        .unwrap_or_default(),
                    name,
                    col
                ));
            }
        }
    }

    for col in &table.columns {
        if let Some(target) = col.foreign_key() {
            match database.table(&target.table) {
                None => report.add_error(format!(
                    "Column '{}.{}' references unknown table '{}'",
                    name, col.name, target.table
                )),
                Some(foreign) => {
                    if let Some(problem) = stored_column_problem(foreign, &target.column) {
                        report.add_error(format!(
                            "Column '{}.{}' references {} '{}.{}'",
                            name, col.name, problem, target.table, target.column
                        ))
                    }
                }
            }
        }

        if let Some(vrt) = col.virtual_column() {
            match vrt.references.as_deref() {
                Some(source) if vrt.source(table).is_none() => report.add_error(format!(
                    "Virtual column '{}.{}' references '{}', which is not a stored column of the table",
                    name, col.name, source
                )),
                None if !vrt.dynamic => report.add_warning(format!(
                    "Virtual column '{}.{}' is neither dynamic nor references a column",
                    name, col.name
                )),
                _ => {}
            }
        }
    }

    for rel in &table.relationships {
        for col in &rel.columns {
            if let Some(problem) = stored_column_problem(table, col) {
                report.add_error(format!(
                    "Relationship on '{}' names {} '{}'",
                    name, problem, col
                ));
            }
        }
        match database.table(&rel.table) {
            None => report.add_error(format!(
                "Relationship on '{}' references unknown table '{}'",
                name, rel.table
            )),
            Some(foreign) => {
                for col in &rel.referenced_columns {
                    if let Some(problem) = stored_column_problem(foreign, col) {
                        report.add_error(format!(
                            "Relationship on '{}' references {} '{}.{}'",
                            name, problem, rel.table, col
                        ));
                    }
                }
            }
        }
    }

    report
}

fn validate_view(database: &Database, view: &View) -> ValidationReport {
    let mut report = ValidationReport::new();
    let name = &view.name;

    let Some(subset) = &view.subset else {
        report.add_error(format!("View '{}' has no subset", name));
        return report;
    };

    match database.table(&subset.table) {
        None => report.add_error(format!(
            "View '{}' selects from unknown table '{}'",
            name, subset.table
        )),
        Some(table) => {
            if let Some(problem) = stored_column_problem(table, &subset.column) {
                report.add_error(format!(
                    "View '{}' filters on {} '{}.{}'",
                    name, problem, subset.table, subset.column
                ))
            }
        }
    }

    if let Some(inner) = &subset.inner {
        match database.table(&inner.table) {
            None => report.add_error(format!(
                "View '{}' restricts through unknown table '{}'",
                name, inner.table
            )),
            Some(table) => {
                for col in [&inner.column, &inner.where_column] {
                    if let Some(problem) = stored_column_problem(table, col) {
                        report.add_error(format!(
                            "View '{}' uses {} '{}.{}'",
                            name, problem, inner.table, col
                        ));
                    }
                }
            }
        }
    }

    if let Some(writeback) = &view.writeback {
        match database.table(&writeback.table) {
            None => report.add_error(format!(
                "View '{}' writes back to unknown table '{}'",
                name, writeback.table
            )),
            Some(table) => {
                for col in &writeback.columns {
                    if let Some(problem) = stored_column_problem(table, &col.name) {
                        report.add_error(format!(
                            "View '{}' writes back to {} '{}.{}'",
                            name, problem, writeback.table, col.name
                        ));
                    }
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::parse_str;
    use crate::testing;

    #[test]
    fn test_library_is_valid() {
        let report = validate(&testing::library());
        assert!(report.is_valid(), "{:?}", report.errors);
        // Loan has no primary key
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("Loan"));
    }

    #[test]
    fn test_collects_every_error() {
        let db = parse_str(
            r#"<database name="Db">
                <tables>
                  <table name="A">
                    <columns>
                      <column name="id"><integer/></column>
                      <column name="id"><integer/></column>
                      <column name="b" foreignTable="Missing"><integer/></column>
                      <column name="v"><vrtcol references="nope"/></column>
                    </columns>
                    <primaryKey><key><column name="ghost"/></key></primaryKey>
                  </table>
                </tables>
                <views>
                  <view name="A"><subset name1="A" col1="zzz" constraint="=" value="1"/></view>
                </views>
              </database>"#,
        )
        .unwrap();

        let report = validate(&db);
        let all = report.errors.join("\n");
        assert!(all.contains("used by more than one"), "{}", all);
        assert!(all.contains("duplicate column 'id'"), "{}", all);
        assert!(all.contains("unknown table 'Missing'"), "{}", all);
        assert!(all.contains("references 'nope'"), "{}", all);
        assert!(all.contains("unknown column 'ghost'"), "{}", all);
        assert!(all.contains("unknown column 'A.zzz'"), "{}", all);
        assert_eq!(report.errors.len(), 6);
    }

    #[test]
    fn test_view_without_subset_is_an_error() {
        let db = parse_str(r#"<database name="Db"><views><view name="V"/></views></database>"#)
            .unwrap();
        let err = validate(&db).into_result().unwrap_err();
        assert!(err.to_string().contains("View 'V' has no subset"));
    }

    #[test]
    fn test_relationship_targets_checked() {
        let db = parse_str(
            r#"<database name="Db"><tables>
                <table name="A">
                  <columns><column name="id"><integer/></column></columns>
                  <primaryKey><key><column name="id"/></key></primaryKey>
                  <relationships>
                    <relationship name="r">
                      <foreignKeyColumns><column name="id"/></foreignKeyColumns>
                      <primaryKeyTable name="A"><column name="missing"/></primaryKeyTable>
                    </relationship>
                  </relationships>
                </table>
              </tables></database>"#,
        )
        .unwrap();
        let report = validate(&db);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("'A.missing'"));
    }

    #[test]
    fn test_references_must_name_stored_columns() {
        let db = parse_str(
            r#"<database name="Db">
                <tables>
                  <table name="A">
                    <columns>
                      <column name="id"><integer/></column>
                      <column name="v"><vrtcol references="id"/></column>
                    </columns>
                    <primaryKey><key><column name="id"/></key></primaryKey>
                  </table>
                  <table name="B">
                    <columns>
                      <column name="id"><integer/></column>
                      <column name="a" foreignTable="A" foreignColumn="v"><integer/></column>
                      <column name="w"><vrtcol references="a"/></column>
                    </columns>
                    <primaryKey><key><column name="id"/></key></primaryKey>
                    <relationships>
                      <relationship name="r">
                        <foreignKeyColumns><column name="w"/></foreignKeyColumns>
                        <primaryKeyTable name="A"><column name="v"/></primaryKeyTable>
                      </relationship>
                    </relationships>
                  </table>
                </tables>
                <views>
                  <view name="V"><subset name1="A" col1="v" constraint="=" value="1"/></view>
                  <view name="W">
                    <subset name1="A" col1="id" constraint="=" value="1" in="B" incol="w" where="w"/>
                  </view>
                </views>
              </database>"#,
        )
        .unwrap();

        let report = validate(&db);
        let all = report.errors.join("\n");
        assert!(all.contains("Column 'B.a' references virtual column 'A.v'"), "{}", all);
        assert!(all.contains("Relationship on 'B' names virtual column 'w'"), "{}", all);
        assert!(all.contains("Relationship on 'B' references virtual column 'A.v'"), "{}", all);
        assert!(all.contains("View 'V' filters on virtual column 'A.v'"), "{}", all);
        assert!(all.contains("View 'W' uses virtual column 'B.w'"), "{}", all);
        // incol and where both name w
        assert_eq!(report.errors.len(), 6, "{}", all);
    }
}
