//! Pattern file parsing
//!
//! Pattern files are line oriented. Blank lines and lines starting with `#`
//! are ignored; every other line has the form `ID:/EXPRESSION/FLAGS`:
//!
//! ```text
//! # credentials
//! 10001:/password\s*=/i
//! 10002:/^BEGIN [A-Z]+ PRIVATE KEY/m
//! ```
//!
//! The expression runs from the `/` after the colon to the last `/` on the
//! line, so expressions may contain unescaped slashes.

use serde::Serialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Largest accepted pattern id; ids are reported through a C `int`
pub const MAX_PATTERN_ID: u32 = i32::MAX as u32;

/// Errors produced while reading a pattern file
#[derive(Debug, Error)]
pub enum PatternFileError {
    /// The file could not be read
    #[error("can't open pattern file \"{path}\": {source}")]
    Io {
        /// Path that failed to open
        path: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A line did not have the `ID:/EXPRESSION/FLAGS` shape
    #[error("could not parse line {line}: {reason}")]
    Syntax {
        /// 1-based line number
        line: usize,
        /// What was wrong with it
        reason: String,
    },

    /// A flag character outside the supported set
    #[error("line {line}: unsupported flag '{flag}'")]
    UnsupportedFlag {
        /// 1-based line number
        line: usize,
        /// The offending character
        flag: char,
    },
}

impl PatternFileError {
    /// True if the file itself could not be opened
    pub fn is_not_found(&self) -> bool {
        matches!(self, PatternFileError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Per-expression compile flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PatternFlags {
    /// `i`: match case-insensitively
    pub caseless: bool,
    /// `m`: `^` and `$` match at line boundaries
    pub multiline: bool,
    /// `s`: `.` matches newlines
    pub dotall: bool,
    /// `H`: report at most one match for this expression
    pub single_match: bool,
    /// `V`: allow the expression to match the empty buffer
    pub allow_empty: bool,
    /// `8`: treat the expression and input as UTF-8
    pub utf8: bool,
    /// `W`: Unicode character classes (requires `8`)
    pub ucp: bool,
}

impl PatternFlags {
    /// Parse a flag suffix such as `"is"`
    ///
    /// `line` is only used for error reporting.
    pub fn parse(flags: &str, line: usize) -> Result<Self, PatternFileError> {
        let mut parsed = PatternFlags::default();
        for c in flags.chars() {
            match c {
                'i' => parsed.caseless = true,
                'm' => parsed.multiline = true,
                's' => parsed.dotall = true,
                'H' => parsed.single_match = true,
                'V' => parsed.allow_empty = true,
                '8' => parsed.utf8 = true,
                'W' => parsed.ucp = true,
                // Stray carriage return from CRLF files
                '\r' => {}
                flag => return Err(PatternFileError::UnsupportedFlag { line, flag }),
            }
        }
        Ok(parsed)
    }
}

/// One expression from a pattern file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternDef {
    /// Identifier reported when this expression matches
    pub id: u32,
    /// Regular expression source, without delimiters
    pub expression: String,
    /// Compile flags
    pub flags: PatternFlags,
}

/// Parse pattern definitions from a file on disk
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<PatternDef>, PatternFileError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| PatternFileError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse(&contents)
}

/// Parse pattern definitions from file contents
pub fn parse(contents: &str) -> Result<Vec<PatternDef>, PatternFileError> {
    let mut patterns = Vec::new();
    for (idx, raw) in contents.lines().enumerate() {
        let line = idx + 1;
        if raw.is_empty() || raw.starts_with('#') || raw == "\r" {
            continue;
        }
        patterns.push(parse_line(raw, line)?);
    }
    Ok(patterns)
}

fn parse_line(raw: &str, line: usize) -> Result<PatternDef, PatternFileError> {
    let syntax = |reason: &str| PatternFileError::Syntax {
        line,
        reason: reason.to_string(),
    };

    let colon = memchr::memchr(b':', raw.as_bytes()).ok_or_else(|| syntax("missing ':'"))?;
    let id = raw[..colon]
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|&id| id <= MAX_PATTERN_ID)
        .ok_or_else(|| syntax("id must be an integer between 0 and 2147483647"))?;

    let expr = raw[colon + 1..].trim_start();
    let body = expr
        .strip_prefix('/')
        .ok_or_else(|| syntax("expression must start with '/'"))?;
    let close = memchr::memrchr(b'/', body.as_bytes()).ok_or_else(|| syntax("no trailing '/'"))?;

    Ok(PatternDef {
        id,
        expression: body[..close].to_string(),
        flags: PatternFlags::parse(&body[close + 1..], line)?,
    })
}
