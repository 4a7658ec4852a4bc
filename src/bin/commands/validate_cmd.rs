use anyhow::{Context, Result};
use blockscan::{pattern_file, BlockDatabase};
use serde_json::json;
use std::path::PathBuf;
use std::time::Instant;

pub fn cmd_validate(patterns: PathBuf, list: bool) -> Result<()> {
    let start = Instant::now();
    let defs = pattern_file::load(&patterns)
        .with_context(|| format!("Invalid pattern file: {}", patterns.display()))?;
    let db = BlockDatabase::compile(&defs)
        .with_context(|| format!("Failed to compile pattern file: {}", patterns.display()))?;
    let duration = start.elapsed();

    let mut output = json!({
        "patterns": patterns.display().to_string(),
        "valid": true,
        "count": db.len(),
        "ids": db.ids(),
        "duration_ms": duration.as_millis(),
    });
    if list {
        output["entries"] = serde_json::to_value(&defs)?;
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
