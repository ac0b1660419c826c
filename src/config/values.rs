// ABOUTME: Helm values loading and deep merging.
// ABOUTME: User values files are layered over the installer's defaults.

use crate::error::{Error, Result};
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// Load a YAML values file. The document must be a mapping (or empty).
pub fn load_values(path: &Path) -> Result<Mapping> {
    let content = std::fs::read_to_string(path)?;
    parse_values(&content)
}

pub fn parse_values(yaml: &str) -> Result<Mapping> {
    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        _ => Err(Error::InvalidConfig(
            "values file must contain a YAML mapping".to_string(),
        )),
    }
}

/// Merge `overlay` into `base`. Nested mappings merge key by key, anything else replaces.
pub fn merge_values(base: &mut Mapping, overlay: Mapping) {
    for (key, value) in overlay {
        match value {
            Value::Mapping(incoming) => {
                if let Some(Value::Mapping(existing)) = base.get_mut(&key) {
                    merge_values(existing, incoming);
                } else {
                    base.insert(key, Value::Mapping(incoming));
                }
            }
            other => {
                base.insert(key, other);
            }
        }
    }
}

/// Set a dotted path such as `postgresql.image.tag`, creating intermediate mappings.
pub fn set_path(values: &mut Mapping, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = values;
    while let Some(segment) = segments.next() {
        let key = Value::String(segment.to_string());
        if segments.peek().is_none() {
            current.insert(key, value);
            return;
        }
        if !matches!(current.get(&key), Some(Value::Mapping(_))) {
            current.insert(key.clone(), Value::Mapping(Mapping::new()));
        }
        match current.get_mut(&key) {
            Some(Value::Mapping(next)) => current = next,
            _ => return,
        }
    }
}
