//! Loading of map descriptions and command scripts from disk.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use crisis_response_core::CommandRecord;
use crisis_response_simulation::MapDescription;

/// One command batch per tick, in tick order.
pub(crate) type Script = Vec<Vec<CommandRecord>>;

/// Reads a TOML map description.
pub(crate) fn load_map(path: &Path) -> Result<MapDescription> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read map {}", path.display()))?;
    parse_map(&source).with_context(|| format!("failed to parse map {}", path.display()))
}

/// Reads a JSON script: an array holding one array of command records per tick.
pub(crate) fn load_script(path: &Path) -> Result<Script> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    parse_script(&source).with_context(|| format!("failed to parse script {}", path.display()))
}

fn parse_map(source: &str) -> Result<MapDescription> {
    Ok(toml::from_str(source)?)
}

fn parse_script(source: &str) -> Result<Script> {
    Ok(serde_json::from_str(source)?)
}
