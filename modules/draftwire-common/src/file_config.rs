//! Source roster loaded from a TOML file.
//!
//! The roster is external configuration: the core reads it, never writes it.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::types::SourceConfig;

#[derive(Debug, Deserialize)]
struct SourcesFile {
    #[serde(default)]
    source: Vec<SourceConfig>,
}

/// Load and validate the source roster.
///
/// ```toml
/// [[source]]
/// id = "UC_x5XG1OV2P6uZZ5FSM9Ttw"
/// kind = "video"
/// min_score = 70
/// category = "DevOps"
/// section = "tooling"
/// tags = ["ci", "cloud"]
/// featured = true
/// ```
pub fn load_sources(path: &Path) -> Result<Vec<SourceConfig>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading source roster {}", path.display()))?;
    let file: SourcesFile = toml::from_str(&raw)
        .with_context(|| format!("parsing source roster {}", path.display()))?;
    validate(&file.source)?;
    Ok(file.source)
}

fn validate(sources: &[SourceConfig]) -> Result<()> {
    for source in sources {
        if source.id.trim().is_empty() {
            bail!("source with empty id in roster");
        }
        if source.min_score > 100 {
            bail!(
                "source {}: min_score {} out of range (0-100)",
                source.id,
                source.min_score
            );
        }
        if source.category.trim().is_empty() {
            bail!("source {}: category is required", source.id);
        }
    }
    Ok(())
}
