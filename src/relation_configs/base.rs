//! Shared helpers for relation configs

use crate::driver::Row;
use crate::relation::{ComponentName, Policy};

/// Which parts a relation config renders. Same as relations: no database.
pub const INCLUDE_POLICY: Policy = Policy::include_default();
pub const QUOTE_POLICY: Policy = Policy::quote_default();

/// Renders one name part: quoted as written, or lowercased when unquoted.
/// Excluded or empty parts render as `None`.
pub fn render_part(component: ComponentName, value: Option<&str>) -> Option<String> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    if !INCLUDE_POLICY.get_part(component) {
        return None;
    }
    if QUOTE_POLICY.get_part(component) {
        Some(format!("\"{}\"", value))
    } else {
        Some(value.to_lowercase())
    }
}

/// Catalog lookups return at most one interesting row.
pub fn first_row(rows: &[Row]) -> Option<&Row> {
    rows.first()
}
