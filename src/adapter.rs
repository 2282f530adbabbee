//! The Oracle adapter as seen by the host framework
//!
//! Mostly thin glue over the connection manager, quoting rules and catalog
//! queries.

use serde_json::Value;

use crate::column::OracleColumn;
use crate::connection::{AdapterResponse, OracleConnectionManager};
use crate::driver::Row;
use crate::error::{AdapterError, Result};
use crate::quoting::{self, ColumnOverrides};
use crate::relation::{self, OracleRelation, Policy, RelationType};
use crate::relation_configs::{
    plan, MaterializedViewConfig, MaterializedViewPlan, MATERIALIZED_VIEW_CONFIG_QUERY,
};

pub const DEBUG_QUERY: &str = "select 1 as id from dual";

pub const DATABASE_NAME_QUERY: &str = "SELECT SYS_CONTEXT('userenv', 'DB_NAME') AS database_name FROM DUAL";

/// Tables, views and materialized views owned by one schema, as
/// `(database, name, schema, kind)`.
pub const LIST_RELATIONS_QUERY: &str = "\
SELECT SYS_CONTEXT('userenv', 'DB_NAME') AS database_name,
       t.table_name AS name,
       t.owner AS schema_name,
       CASE WHEN mv.mview_name IS NOT NULL THEN 'materialized_view' ELSE 'table' END AS kind
FROM all_tables t
LEFT JOIN all_mviews mv ON (mv.owner = t.owner AND mv.mview_name = t.table_name)
WHERE t.owner = :owner
UNION ALL
SELECT SYS_CONTEXT('userenv', 'DB_NAME'), v.view_name, v.owner, 'view'
FROM all_views v
WHERE v.owner = :owner";

pub const COLUMNS_IN_RELATION_QUERY: &str = "\
SELECT column_name, data_type, char_length, data_precision, data_scale
FROM all_tab_columns
WHERE owner = :owner
AND table_name = :table_name
ORDER BY column_id";

const COLUMNS_EQUAL_SQL: &str = "\
with diff_count as (
    SELECT
        1 as id,
        COUNT(*) as num_missing FROM (
            (SELECT {columns} FROM {relation_a} {except_op}
             SELECT {columns} FROM {relation_b})
             MINUS
            (SELECT {columns} FROM {relation_b} {except_op}
             SELECT {columns} FROM {relation_a})
        ) a
), table_a as (
    SELECT COUNT(*) as num_rows FROM {relation_a}
), table_b as (
    SELECT COUNT(*) as num_rows FROM {relation_b}
), row_count_diff as (
    select
        1 as id,
        table_a.num_rows - table_b.num_rows as difference
    from table_a, table_b
)
select
    row_count_diff.difference as row_count_difference,
    diff_count.num_missing as num_mismatched
from row_count_diff
join diff_count using (id)";

pub struct OracleAdapter {
    connections: OracleConnectionManager,
    quoting: Policy,
}

impl OracleAdapter {
    pub const TYPE: &'static str = "oracle";

    pub fn new(connections: OracleConnectionManager) -> Self {
        Self {
            connections,
            quoting: Policy::quote_default(),
        }
    }

    pub fn with_quoting(mut self, quoting: Policy) -> Self {
        self.quoting = quoting;
        self
    }

    pub fn connections(&mut self) -> &mut OracleConnectionManager {
        &mut self.connections
    }

    pub fn date_function() -> &'static str {
        "CURRENT_DATE"
    }

    pub fn debug_query(&mut self) -> Result<AdapterResponse> {
        let (response, _) = self.connections.execute(DEBUG_QUERY, false, true)?;
        Ok(response)
    }

    pub fn quote(identifier: &str) -> String {
        quoting::quote(identifier)
    }

    pub fn is_valid_identifier(identifier: &str) -> bool {
        quoting::is_valid_identifier(identifier)
    }

    pub fn should_identifier_be_quoted(identifier: &str, models_column_dict: Option<&ColumnOverrides>) -> bool {
        quoting::should_identifier_be_quoted(identifier, models_column_dict)
    }

    pub fn check_and_quote_identifier(identifier: &str, models_column_dict: Option<&ColumnOverrides>) -> String {
        quoting::check_and_quote_identifier(identifier, models_column_dict)
    }

    pub fn quote_seed_column(column: &str, quote_config: Option<bool>) -> String {
        quoting::quote_seed_column(column, quote_config)
    }

    /// `quote_seed_column` for a raw `quote_columns` value from project config.
    /// Anything but a boolean or null is a compilation error, unless the
    /// column has to be quoted anyway.
    pub fn quote_seed_column_value(column: &str, quote_config: &Value) -> Result<String> {
        match quote_config {
            Value::Bool(b) => Ok(quoting::quote_seed_column(column, Some(*b))),
            Value::Null => Ok(quoting::quote_seed_column(column, None)),
            _ if quoting::should_identifier_be_quoted(column, None) => Ok(quoting::quote(column)),
            other => Err(AdapterError::Compilation(format!(
                "The seed configuration value of \"quote_columns\" has an invalid type {}",
                json_type_name(other)
            ))),
        }
    }

    pub fn verify_database(&self, database: &str) -> Result<String> {
        relation::verify_database(database, self.connections.credentials().database.as_deref())
    }

    /// The configured database, looked up from the session when the
    /// profile did not name one.
    pub fn database_name(&mut self) -> Result<String> {
        if let Some(db) = self.connections.credentials().database.clone().filter(|d| !d.is_empty()) {
            return Ok(db);
        }
        let rows = self.connections.fetch(DATABASE_NAME_QUERY, &[])?;
        let name = rows
            .first()
            .and_then(|r| r.get_index(0))
            .map(str::to_string)
            .ok_or_else(|| AdapterError::runtime("Could not determine the database name"))?;
        self.connections.credentials_mut().database = Some(name.clone());
        Ok(name)
    }

    pub fn match_kwargs(&self, database: Option<&str>, schema: Option<&str>, identifier: Option<&str>) -> relation::MatchKwargs {
        OracleRelation::match_kwargs(database, schema, identifier, &self.quoting)
    }

    pub fn rows_different_sql(
        relation_a: &OracleRelation,
        relation_b: &OracleRelation,
        column_names: &[String],
        except_operator: Option<&str>,
    ) -> String {
        let mut names: Vec<&str> = column_names.iter().map(String::as_str).collect();
        names.sort_unstable();
        COLUMNS_EQUAL_SQL
            .replace("{columns}", &names.join(", "))
            .replace("{relation_a}", &relation_a.to_string())
            .replace("{relation_b}", &relation_b.to_string())
            .replace("{except_op}", except_operator.unwrap_or("MINUS"))
    }

    /// Same as `rows_different_sql`, reading the columns of `relation_a`
    /// from the catalog.
    pub fn rows_different_sql_from_catalog(
        &mut self,
        relation_a: &OracleRelation,
        relation_b: &OracleRelation,
    ) -> Result<String> {
        let names: Vec<String> = self
            .get_columns_in_relation(relation_a)?
            .into_iter()
            .map(|c| c.name)
            .collect();
        Ok(Self::rows_different_sql(relation_a, relation_b, &names, None))
    }

    pub fn timestamp_add_sql(add_to: &str, number: i64, interval: &str) -> String {
        format!("{} + interval '{}' {}", add_to, number, interval)
    }

    /// Turns `(database, name, schema, kind)` rows into relations.
    pub fn list_relations(&self, rows: &[Row]) -> Vec<OracleRelation> {
        rows.iter()
            .map(|row| {
                let kind = row.get_index(3).map(RelationType::from_catalog).unwrap_or(RelationType::External);
                OracleRelation::create(row.get_index(0), row.get_index(2), row.get_index(1))
                    .with_quote_policy(self.quoting)
                    .with_type(kind)
            })
            .collect()
    }

    pub fn list_relations_without_caching(&mut self, schema: &str) -> Result<Vec<OracleRelation>> {
        self.database_name()?;
        let owner = schema.to_uppercase();
        let rows = self.connections.fetch(LIST_RELATIONS_QUERY, &[("owner", owner.as_str())])?;
        Ok(self.list_relations(&rows))
    }

    /// Finds one relation in a schema. Matching follows Oracle's case folding.
    pub fn get_relation(&mut self, database: Option<&str>, schema: &str, identifier: &str) -> Result<Option<OracleRelation>> {
        if let Some(db) = database.filter(|d| !d.is_empty() && *d != "None") {
            self.verify_database(db)?;
        }
        let relations = self.list_relations_without_caching(schema)?;
        Ok(relations
            .into_iter()
            .find(|r| r.matches(None, Some(schema), Some(identifier))))
    }

    pub fn get_columns_in_relation(&mut self, relation: &OracleRelation) -> Result<Vec<OracleColumn>> {
        let owner = relation.schema.as_deref().unwrap_or_default().to_uppercase();
        let table = relation.identifier.as_deref().unwrap_or_default().to_uppercase();
        let rows = self.connections.fetch(
            COLUMNS_IN_RELATION_QUERY,
            &[("owner", owner.as_str()), ("table_name", table.as_str())],
        )?;

        let parse = |v: Option<&str>| v.and_then(|s| s.trim().parse().ok());
        Ok(rows
            .iter()
            .map(|row| {
                let name = row.get("column_name").unwrap_or_default();
                let dtype = row.get("data_type").unwrap_or_default();
                let mut column = OracleColumn::new(name, dtype);
                if column.is_string() {
                    column.char_size = parse(row.get("char_length"));
                } else {
                    column.numeric_precision = parse(row.get("data_precision"));
                    column.numeric_scale = row.get("data_scale").and_then(|s| s.trim().parse().ok());
                }
                column
            })
            .collect())
    }

    /// Reads the deployed config of a materialized view, `None` if it does
    /// not exist.
    pub fn describe_materialized_view(&mut self, relation: &OracleRelation) -> Result<Option<MaterializedViewConfig>> {
        let owner = relation.schema.as_deref().unwrap_or_default().to_uppercase();
        let name = relation.identifier.as_deref().unwrap_or_default().to_uppercase();
        let rows = self.connections.fetch(
            MATERIALIZED_VIEW_CONFIG_QUERY,
            &[("owner", owner.as_str()), ("mview_name", name.as_str())],
        )?;
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(MaterializedViewConfig::from_catalog_rows(&rows)))
    }

    pub fn materialized_view_plan(
        &mut self,
        relation: &OracleRelation,
        desired: &MaterializedViewConfig,
    ) -> Result<MaterializedViewPlan> {
        let existing = self.describe_materialized_view(relation)?;
        Ok(plan(relation, desired, existing.as_ref()))
    }

    /// Plans and runs whatever it takes to bring the view to `desired`.
    pub fn apply_materialized_view(
        &mut self,
        relation: &OracleRelation,
        desired: &MaterializedViewConfig,
    ) -> Result<MaterializedViewPlan> {
        let mv_plan = self.materialized_view_plan(relation, desired)?;
        for sql in mv_plan.statements() {
            self.connections.add_query(sql, &[], true, false)?;
        }
        Ok(mv_plan)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_different_sql_sorts_columns() {
        let a = OracleRelation::create(None, Some("s"), Some("a"));
        let b = OracleRelation::create(None, Some("s"), Some("b"));
        let sql = OracleAdapter::rows_different_sql(&a, &b, &["z".into(), "id".into()], None);
        assert!(sql.contains("(SELECT id, z FROM s.a MINUS\n             SELECT id, z FROM s.b)"));
        assert!(sql.contains("SELECT COUNT(*) as num_rows FROM s.b"));
        assert!(!sql.contains('{'));
    }

    #[test]
    fn timestamp_add() {
        assert_eq!(
            OracleAdapter::timestamp_add_sql("created_at", 1, "hour"),
            "created_at + interval '1' hour"
        );
    }

    #[test]
    fn seed_quote_value_types() {
        assert_eq!(OracleAdapter::quote_seed_column_value("id", &Value::Bool(true)).unwrap(), "\"id\"");
        assert_eq!(OracleAdapter::quote_seed_column_value("id", &Value::Null).unwrap(), "id");
        assert_eq!(
            OracleAdapter::quote_seed_column_value("date", &Value::String("yes".into())).unwrap(),
            "\"date\""
        );
        let err = OracleAdapter::quote_seed_column_value("id", &Value::String("yes".into())).unwrap_err();
        assert!(matches!(err, AdapterError::Compilation(_)));
    }
}
