//! Configuration records for relation kinds that carry settings beyond
//! their SQL body.

pub mod base;
pub mod materialized_view;

pub use materialized_view::{
    plan, reconcile, ConfigChange, ConfigField, MaterializedViewChangeSet, MaterializedViewConfig,
    MaterializedViewModelConfig, MaterializedViewPlan, MATERIALIZED_VIEW_CONFIG_QUERY,
};
