//! Table fixtures: a JSON object mapping table names to row arrays

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde_json::Value;

use crate::domain::interface::HostEvent;
use crate::domain::storage::Row;

pub fn load_tables(path: &Path) -> anyhow::Result<HashMap<String, Vec<Row>>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture {}", path.display()))?;
    parse_tables(&raw).with_context(|| format!("Invalid fixture {}", path.display()))
}

pub fn load_events(path: &Path) -> anyhow::Result<Vec<HostEvent>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read events {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid events {}", path.display()))
}

fn parse_tables(raw: &str) -> anyhow::Result<HashMap<String, Vec<Row>>> {
    let tables: HashMap<String, Vec<Value>> = serde_json::from_str(raw)?;

    tables
        .into_iter()
        .map(|(table, rows)| {
            let rows = rows
                .into_iter()
                .enumerate()
                .map(|(position, row)| match row {
                    Value::Object(row) => Ok(row),
                    other => anyhow::bail!("{}[{}] is not an object: {}", table, position, other),
                })
                .collect::<anyhow::Result<Vec<Row>>>()?;
            Ok((table, rows))
        })
        .collect()
}
