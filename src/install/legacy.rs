// ABOUTME: Detects data left by an earlier install that used PostgreSQL 13.
// ABOUTME: Such data must keep running on the matching database image.

use crate::config::set_path;
use serde_yaml::{Mapping, Value};
use std::path::Path;

const LEGACY_POSTGRES_MAJOR: &str = "13";
const LEGACY_POSTGRES_TAG: &str = "13.16.0";

/// Value overrides required by legacy data under `data_dir`, if any.
pub fn legacy_values(data_dir: &Path) -> Option<Mapping> {
    let version = std::fs::read_to_string(data_dir.join("db").join("PG_VERSION")).ok()?;
    if version.trim() != LEGACY_POSTGRES_MAJOR {
        return None;
    }
    tracing::info!("found PostgreSQL {} data, pinning the database image", LEGACY_POSTGRES_MAJOR);
    let mut values = Mapping::new();
    set_path(
        &mut values,
        "postgresql.image.tag",
        Value::String(LEGACY_POSTGRES_TAG.to_string()),
    );
    Some(values)
}
