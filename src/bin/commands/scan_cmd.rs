use anyhow::{Context, Result};
use blockscan::{input, BlockScanner, NO_MATCH};
use serde::Serialize;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Name reported for blocks given with --data
const DATA_INPUT: &str = "<data>";

/// One NDJSON output line
#[derive(Serialize)]
struct ScanRecord<'a> {
    input: &'a str,
    line: usize,
    #[serde(rename = "match")]
    matched: i32,
}

pub fn cmd_scan(
    patterns: PathBuf,
    inputs: Vec<PathBuf>,
    data: Option<String>,
    quiet: bool,
    matches_only: bool,
) -> Result<()> {
    let mut scanner = BlockScanner::new().context("Failed to create scanning engine")?;
    scanner
        .compile_block_database(&patterns)
        .with_context(|| format!("Failed to compile pattern file: {}", patterns.display()))?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut any_match = false;

    let mut emit = |out: &mut BufWriter<_>, input: &str, line: usize, id: i32| -> Result<()> {
        any_match |= id != NO_MATCH;
        if quiet || (matches_only && id == NO_MATCH) {
            return Ok(());
        }
        let record = ScanRecord {
            input,
            line,
            matched: id,
        };
        serde_json::to_writer(&mut *out, &record)?;
        writeln!(out)?;
        Ok(())
    };

    if let Some(data) = data {
        let id = scanner.scan_single(&data).context("Scan failed")?;
        emit(&mut out, DATA_INPUT, 1, id)?;
    } else {
        for path in &inputs {
            let name = path.display().to_string();
            let reader =
                input::open(path).with_context(|| format!("Failed to open input: {}", name))?;
            for (idx, block) in input::blocks(reader).enumerate() {
                let block = block.with_context(|| format!("Failed to read input: {}", name))?;
                let id = scanner
                    .scan_single(&block)
                    .with_context(|| format!("Scan failed at {}:{}", name, idx + 1))?;
                emit(&mut out, &name, idx + 1, id)?;
            }
        }
    }

    out.flush()?;
    drop(out);

    // Release explicitly: process::exit below would skip Drop
    scanner
        .dispose()
        .context("Failed to release scanning engine")?;

    if quiet {
        std::process::exit(if any_match { 0 } else { 1 });
    }
    Ok(())
}
