//! Materialized view configuration, reconciliation and DDL
//!
//! A desired config (from the model) is compared with the existing one (from
//! `ALL_MVIEWS`). The resulting change set says whether the view can be
//! altered in place or has to be dropped and rebuilt.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::base::{first_row, render_part};
use crate::driver::Row;
use crate::relation::{ComponentName, OracleRelation};

pub const DEFAULT_REFRESH_MODE: &str = "DEMAND";
pub const DEFAULT_REFRESH_METHOD: &str = "FORCE";
pub const DEFAULT_BUILD_MODE: &str = "IMMEDIATE";
pub const DEFAULT_QUERY_REWRITE: &str = "DISABLE";

/// Reads the stored definition of one materialized view.
pub const MATERIALIZED_VIEW_CONFIG_QUERY: &str = "\
SELECT mview_name, refresh_mode, refresh_method, build_mode, rewrite_enabled, query
FROM sys.all_mviews
WHERE owner = :owner
AND mview_name = :mview_name";

/// The materialized view settings a model can declare. Missing keys take
/// the defaults above.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedViewModelConfig {
    #[serde(default)]
    pub refresh_mode: Option<String>,
    #[serde(default)]
    pub refresh_method: Option<String>,
    #[serde(default)]
    pub build_mode: Option<String>,
    #[serde(default)]
    pub query_rewrite: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedViewConfig {
    pub name: String,
    pub query: String,
    pub refresh_mode: String,
    pub refresh_method: String,
    pub build_mode: String,
    pub query_rewrite: String,
}

fn or_default(value: Option<&str>, default: &str) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

impl MaterializedViewConfig {
    pub fn from_model_config(identifier: &str, config: &MaterializedViewModelConfig, compiled_sql: Option<&str>) -> Self {
        Self {
            name: render_part(ComponentName::Identifier, Some(identifier)).unwrap_or_default(),
            query: compiled_sql.map(str::trim).unwrap_or_default().to_string(),
            refresh_mode: or_default(config.refresh_mode.as_deref(), DEFAULT_REFRESH_MODE),
            refresh_method: or_default(config.refresh_method.as_deref(), DEFAULT_REFRESH_METHOD),
            build_mode: or_default(config.build_mode.as_deref(), DEFAULT_BUILD_MODE),
            query_rewrite: or_default(config.query_rewrite.as_deref(), DEFAULT_QUERY_REWRITE),
        }
    }

    /// Builds the existing config from a `MATERIALIZED_VIEW_CONFIG_QUERY` row.
    pub fn from_catalog_row(row: Option<&Row>) -> Self {
        let get = |column: &str| row.and_then(|r| r.get(column));
        let query_rewrite = match get("rewrite_enabled") {
            Some(flag) if flag.trim().eq_ignore_ascii_case("Y") => "ENABLE",
            _ => DEFAULT_QUERY_REWRITE,
        };
        Self {
            name: render_part(ComponentName::Identifier, get("mview_name")).unwrap_or_default(),
            query: get("query").map(str::trim).unwrap_or_default().to_string(),
            refresh_mode: or_default(get("refresh_mode"), DEFAULT_REFRESH_MODE),
            refresh_method: or_default(get("refresh_method"), DEFAULT_REFRESH_METHOD),
            build_mode: or_default(get("build_mode"), DEFAULT_BUILD_MODE),
            query_rewrite: query_rewrite.to_string(),
        }
    }

    pub fn from_catalog_rows(rows: &[Row]) -> Self {
        Self::from_catalog_row(first_row(rows))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigField {
    RefreshMode,
    RefreshMethod,
    BuildMode,
    QueryRewrite,
    Query,
}

impl ConfigField {
    pub const ALL: [ConfigField; 5] = [
        ConfigField::RefreshMode,
        ConfigField::RefreshMethod,
        ConfigField::BuildMode,
        ConfigField::QueryRewrite,
        ConfigField::Query,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConfigField::RefreshMode => "refresh_mode",
            ConfigField::RefreshMethod => "refresh_method",
            ConfigField::BuildMode => "build_mode",
            ConfigField::QueryRewrite => "query_rewrite",
            ConfigField::Query => "query",
        }
    }

    /// Fields Oracle cannot change with ALTER MATERIALIZED VIEW.
    pub fn requires_full_rebuild(self) -> bool {
        matches!(self, ConfigField::RefreshMethod | ConfigField::Query)
    }

    pub fn value(self, config: &MaterializedViewConfig) -> &str {
        match self {
            ConfigField::RefreshMode => &config.refresh_mode,
            ConfigField::RefreshMethod => &config.refresh_method,
            ConfigField::BuildMode => &config.build_mode,
            ConfigField::QueryRewrite => &config.query_rewrite,
            ConfigField::Query => &config.query,
        }
    }

    fn differs(self, desired: &MaterializedViewConfig, existing: &MaterializedViewConfig) -> bool {
        let (a, b) = (self.value(desired), self.value(existing));
        match self {
            ConfigField::Query => a.trim_end().to_lowercase() != b.trim_end().to_lowercase(),
            _ => a.to_lowercase() != b.to_lowercase(),
        }
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The value a field should have after reconciliation, and whether it
/// actually differs from what is deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigChange {
    pub field: ConfigField,
    pub value: String,
    pub changed: bool,
}

impl ConfigChange {
    pub fn requires_full_rebuild(&self) -> bool {
        self.field.requires_full_rebuild()
    }
}

/// All five fields, always populated. Unchanged fields carry the existing value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterializedViewChangeSet {
    pub refresh_mode: ConfigChange,
    pub refresh_method: ConfigChange,
    pub build_mode: ConfigChange,
    pub query_rewrite: ConfigChange,
    pub query: ConfigChange,
}

impl MaterializedViewChangeSet {
    pub fn get(&self, field: ConfigField) -> &ConfigChange {
        match field {
            ConfigField::RefreshMode => &self.refresh_mode,
            ConfigField::RefreshMethod => &self.refresh_method,
            ConfigField::BuildMode => &self.build_mode,
            ConfigField::QueryRewrite => &self.query_rewrite,
            ConfigField::Query => &self.query,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigChange> {
        ConfigField::ALL.into_iter().map(move |f| self.get(f))
    }

    pub fn changed_fields(&self) -> Vec<ConfigField> {
        self.iter().filter(|c| c.changed).map(|c| c.field).collect()
    }

    pub fn is_changed(&self, field: ConfigField) -> bool {
        self.get(field).changed
    }

    pub fn has_changes(&self) -> bool {
        self.iter().any(|c| c.changed)
    }

    pub fn requires_full_refresh(&self) -> bool {
        self.iter().any(|c| c.changed && c.requires_full_rebuild())
    }

    /// The complete config these changes lead to.
    pub fn to_config(&self, name: &str) -> MaterializedViewConfig {
        MaterializedViewConfig {
            name: name.to_string(),
            query: self.query.value.clone(),
            refresh_mode: self.refresh_mode.value.clone(),
            refresh_method: self.refresh_method.value.clone(),
            build_mode: self.build_mode.value.clone(),
            query_rewrite: self.query_rewrite.value.clone(),
        }
    }
}

/// Compares desired against existing. `None` when nothing differs.
pub fn reconcile(desired: &MaterializedViewConfig, existing: &MaterializedViewConfig) -> Option<MaterializedViewChangeSet> {
    if !ConfigField::ALL.iter().any(|f| f.differs(desired, existing)) {
        return None;
    }

    let change = |field: ConfigField| {
        if field.differs(desired, existing) {
            ConfigChange {
                field,
                value: field.value(desired).to_string(),
                changed: true,
            }
        } else {
            ConfigChange {
                field,
                value: field.value(existing).to_string(),
                changed: false,
            }
        }
    };

    Some(MaterializedViewChangeSet {
        refresh_mode: change(ConfigField::RefreshMode),
        refresh_method: change(ConfigField::RefreshMethod),
        build_mode: change(ConfigField::BuildMode),
        query_rewrite: change(ConfigField::QueryRewrite),
        query: change(ConfigField::Query),
    })
}

fn is_never(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("NEVER")
}

fn refresh_clause(refresh_mode: &str, refresh_method: &str) -> String {
    if is_never(refresh_mode) || is_never(refresh_method) {
        "NEVER REFRESH".to_string()
    } else {
        format!(
            "REFRESH {} ON {}",
            refresh_method.trim().to_uppercase(),
            refresh_mode.trim().to_uppercase()
        )
    }
}

fn build_clause(build_mode: &str) -> String {
    let mode = build_mode.trim().to_uppercase();
    if mode == "PREBUILT" {
        "ON PREBUILT TABLE".to_string()
    } else {
        format!("BUILD {}", mode)
    }
}

fn rewrite_clause(query_rewrite: &str) -> String {
    format!("{} QUERY REWRITE", query_rewrite.trim().to_uppercase())
}

pub fn create_sql(relation: &OracleRelation, config: &MaterializedViewConfig) -> String {
    format!(
        "CREATE MATERIALIZED VIEW {}\n  {}\n  {}\n  {}\nAS\n{}",
        relation,
        build_clause(&config.build_mode),
        refresh_clause(&config.refresh_mode, &config.refresh_method),
        rewrite_clause(&config.query_rewrite),
        config.query.trim()
    )
}

pub fn drop_sql(relation: &OracleRelation) -> String {
    format!("DROP MATERIALIZED VIEW {}", relation)
}

/// Drops the view and creates it again from the dense change set.
pub fn replace_sql(relation: &OracleRelation, changes: &MaterializedViewChangeSet) -> Vec<String> {
    let name = relation.identifier.as_deref().unwrap_or_default();
    vec![drop_sql(relation), create_sql(relation, &changes.to_config(name))]
}

/// In-place changes. Build mode has no ALTER form, so a build mode change
/// recreates the view with the same query.
pub fn alter_sql(relation: &OracleRelation, changes: &MaterializedViewChangeSet) -> Vec<String> {
    if changes.is_changed(ConfigField::BuildMode) {
        log::info!("Build mode of {} changed, dropping and recreating it", relation);
        return replace_sql(relation, changes);
    }

    let mut statements = Vec::new();
    if changes.is_changed(ConfigField::RefreshMode) || changes.is_changed(ConfigField::RefreshMethod) {
        statements.push(format!(
            "ALTER MATERIALIZED VIEW {} {}",
            relation,
            refresh_clause(&changes.refresh_mode.value, &changes.refresh_method.value)
        ));
    }
    if changes.is_changed(ConfigField::QueryRewrite) {
        statements.push(format!(
            "ALTER MATERIALIZED VIEW {} {}",
            relation,
            rewrite_clause(&changes.query_rewrite.value)
        ));
    }
    statements
}

/// PL/SQL block running a refresh with the given method (`COMPLETE`,
/// `FAST` or anything else for FORCE).
pub fn refresh_sql(relation: &OracleRelation, refresh_method: &str) -> String {
    let method = match refresh_method.trim().to_uppercase().as_str() {
        "COMPLETE" => "C",
        "FAST" => "F",
        _ => "?",
    };
    format!(
        "BEGIN\n  DBMS_MVIEW.REFRESH('{}', '{}');\nEND;",
        relation.to_string().replace('\'', "''"),
        method
    )
}

/// What has to happen to bring a materialized view to its desired config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "sql", rename_all = "snake_case")]
pub enum MaterializedViewPlan {
    Create(Vec<String>),
    NoOp,
    /// No full refresh is needed. Usually ALTER statements, but a build
    /// mode change has no ALTER form and comes out as DROP + CREATE with the
    /// existing query; a `BUILD DEFERRED` view is empty until refreshed.
    Alter(Vec<String>),
    Replace(Vec<String>),
}

impl MaterializedViewPlan {
    pub fn statements(&self) -> &[String] {
        match self {
            MaterializedViewPlan::Create(sql) | MaterializedViewPlan::Alter(sql) | MaterializedViewPlan::Replace(sql) => sql,
            MaterializedViewPlan::NoOp => &[],
        }
    }
}

pub fn plan(
    relation: &OracleRelation,
    desired: &MaterializedViewConfig,
    existing: Option<&MaterializedViewConfig>,
) -> MaterializedViewPlan {
    let Some(existing) = existing else {
        log::debug!("Applying CREATE to: {}", relation);
        return MaterializedViewPlan::Create(vec![create_sql(relation, desired)]);
    };

    match reconcile(desired, existing) {
        None => {
            log::debug!("No configuration changes were identified on: {}", relation);
            MaterializedViewPlan::NoOp
        }
        Some(changes) if changes.requires_full_refresh() => {
            log::debug!("Applying REPLACE to: {}", relation);
            MaterializedViewPlan::Replace(replace_sql(relation, &changes))
        }
        Some(changes) => {
            log::debug!("Applying ALTER to: {}", relation);
            MaterializedViewPlan::Alter(alter_sql(relation, &changes))
        }
    }
}
