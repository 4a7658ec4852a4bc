//! Block-mode pattern database
//!
//! A [`BlockDatabase`] is the compiled form of a pattern file. It is built
//! once from a list of [`PatternDef`]s and then scanned against whole
//! buffers; each scan reports the id of at most one matching expression.
//!
//! # Example
//!
//! ```rust
//! use blockscan::database::BlockDatabase;
//! use blockscan::pattern_file;
//!
//! let defs = pattern_file::parse("1:/abc/\n2:/[0-9]{3}-[0-9]{4}/\n")?;
//! let db = BlockDatabase::compile(&defs)?;
//!
//! assert_eq!(db.scan(b"xxabcxx"), Some(1));
//! assert_eq!(db.scan(b"call 555-1234"), Some(2));
//! assert_eq!(db.scan(b"zzz"), None);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::pattern_file::{self, PatternDef, PatternFileError};
use regex::bytes::{Regex, RegexBuilder, RegexSet, RegexSetBuilder};
use regex_syntax::ParserBuilder;
use std::borrow::Cow;
use std::path::Path;
use thiserror::Error;

/// Upper bound on compiled program size per expression
const SIZE_LIMIT: usize = 32 * 1024 * 1024;

/// Errors produced while building a [`BlockDatabase`]
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The pattern file could not be read or parsed
    #[error(transparent)]
    PatternFile(#[from] PatternFileError),

    /// No expressions were supplied
    #[error("pattern set is empty")]
    Empty,

    /// An expression was rejected by the compiler
    #[error("pattern '{expression}' (id {id}) failed compilation with error: {message}")]
    InvalidPattern {
        /// Id of the offending expression
        id: u32,
        /// The expression source
        expression: String,
        /// Compiler diagnostic
        message: String,
    },

    /// An error that does not refer to a particular expression
    #[error("{0}")]
    Compile(String),
}

/// A compiled set of expressions ready for block scanning
#[derive(Debug, Clone)]
pub struct BlockDatabase {
    /// Prefilter answering "which expressions match" in one pass
    set: RegexSet,
    /// One matcher per entry in `set`, used to locate match ends
    matchers: Vec<Regex>,
    /// `H` flag per entry in `set`
    single_match: Vec<bool>,
    /// Pattern id for each entry in `set`, in file order
    ids: Vec<u32>,
}

impl BlockDatabase {
    /// Read, parse and compile a pattern file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        let defs = pattern_file::load(path)?;
        Self::compile(&defs)
    }

    /// Compile pattern definitions into a database
    ///
    /// Fails if `defs` is empty, if any expression is not valid syntax, if
    /// `W` is given without `8`, or if an expression without the `V` flag
    /// can produce a zero-length match.
    pub fn compile(defs: &[PatternDef]) -> Result<Self, DatabaseError> {
        if defs.is_empty() {
            return Err(DatabaseError::Empty);
        }

        let mut sources = Vec::with_capacity(defs.len());
        let mut matchers = Vec::with_capacity(defs.len());
        for def in defs {
            let invalid = |message: String| DatabaseError::InvalidPattern {
                id: def.id,
                expression: def.expression.clone(),
                message,
            };

            if def.flags.ucp && !def.flags.utf8 {
                return Err(invalid("Unicode property flag requires UTF-8 mode".into()));
            }

            let source = compiled_source(def);
            let regex = build_regex(def, &source).map_err(|e| invalid(e.to_string()))?;
            let empty = can_match_empty(def, &source).map_err(|e| invalid(e.to_string()))?;
            if empty && !def.flags.allow_empty {
                return Err(invalid("Pattern matches empty buffer; use V flag to enable".into()));
            }

            sources.push(inline_flags(def, &source));
            matchers.push(regex);
        }

        let set = RegexSetBuilder::new(&sources)
            .unicode(false)
            .size_limit(SIZE_LIMIT.saturating_mul(defs.len()))
            .build()
            .map_err(|e| DatabaseError::Compile(e.to_string()))?;

        Ok(Self {
            set,
            matchers,
            single_match: defs.iter().map(|d| d.flags.single_match).collect(),
            ids: defs.iter().map(|d| d.id).collect(),
        })
    }

    /// Scan one buffer
    ///
    /// Returns the id of the expression whose last reported match ends
    /// furthest into `data`, or `None`. An expression with the `H` flag
    /// reports only its earliest-ending match. Equal end offsets go to the
    /// expression listed first in the file.
    pub fn scan(&self, data: &[u8]) -> Option<u32> {
        let mut matched = self.set.matches(data).into_iter().peekable();
        let first = matched.next()?;
        if matched.peek().is_none() {
            return Some(self.ids[first]);
        }

        let mut best = (self.report_end(first, data), first);
        for index in matched {
            let end = self.report_end(index, data);
            if end > best.0 {
                best = (end, index);
            }
        }
        Some(self.ids[best.1])
    }

    /// End offset of the last match expression `index` reports in `data`
    fn report_end(&self, index: usize, data: &[u8]) -> usize {
        let regex = &self.matchers[index];
        let end = if self.single_match[index] {
            regex.shortest_match(data)
        } else {
            regex.find_iter(data).last().map(|m| m.end())
        };
        end.unwrap_or(0)
    }

    /// Number of compiled expressions
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Always false: an empty set is rejected by [`compile`](Self::compile)
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Pattern ids in file order (duplicates preserved)
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }
}

/// Expression source as compiled. Under `8` without `W`, Perl classes and
/// word boundaries stay ASCII.
fn compiled_source(def: &PatternDef) -> Cow<'_, str> {
    if def.flags.utf8 && !def.flags.ucp {
        Cow::Owned(ascii_perl_classes(&def.expression))
    } else {
        Cow::Borrowed(def.expression.as_str())
    }
}

fn build_regex(def: &PatternDef, expression: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(expression)
        .case_insensitive(def.flags.caseless)
        .multi_line(def.flags.multiline)
        .dot_matches_new_line(def.flags.dotall)
        .unicode(def.flags.utf8)
        .size_limit(SIZE_LIMIT)
        .build()
}

/// True if some match of the expression can be zero bytes long
fn can_match_empty(def: &PatternDef, expression: &str) -> Result<bool, regex_syntax::Error> {
    let hir = ParserBuilder::new()
        .case_insensitive(def.flags.caseless)
        .multi_line(def.flags.multiline)
        .dot_matches_new_line(def.flags.dotall)
        .unicode(def.flags.utf8)
        .utf8(false)
        .build()
        .parse(expression)?;
    Ok(hir.properties().minimum_len() == Some(0))
}

/// Rewrite `\w \d \s`, their negations and `\b \B` into ASCII-only forms
fn ascii_perl_classes(expression: &str) -> String {
    let mut out = String::with_capacity(expression.len() + 16);
    let mut chars = expression.chars().peekable();
    let mut in_class = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let Some(escaped) = chars.next() else {
                    out.push(c);
                    break;
                };
                let ascii = match escaped {
                    'w' => "[:word:]",
                    'd' => "[:digit:]",
                    's' => "[:space:]",
                    'W' => "[:^word:]",
                    'D' => "[:^digit:]",
                    'S' => "[:^space:]",
                    'b' if in_class == 0 => "(?-u:\\b)",
                    'B' if in_class == 0 => "(?-u:\\B)",
                    _ => {
                        out.push(c);
                        out.push(escaped);
                        continue;
                    }
                };
                // Outside brackets a POSIX class needs its own brackets
                if in_class == 0 && ascii.starts_with('[') {
                    out.push('[');
                    out.push_str(ascii);
                    out.push(']');
                } else {
                    out.push_str(ascii);
                }
            }
            '[' if in_class > 0 && chars.peek() == Some(&':') => {
                // POSIX class such as [:alpha:]
                out.push(c);
                for p in chars.by_ref() {
                    out.push(p);
                    if p == ']' {
                        break;
                    }
                }
            }
            '[' => {
                out.push(c);
                in_class += 1;
                if chars.peek() == Some(&'^') {
                    out.push('^');
                    chars.next();
                }
                // A leading ']' is a literal
                if chars.peek() == Some(&']') {
                    out.push(']');
                    chars.next();
                }
            }
            ']' if in_class > 0 => {
                in_class -= 1;
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Expression source with its flags folded into an inline group, so a
/// single [`RegexSet`] can carry per-expression options.
fn inline_flags(def: &PatternDef, expression: &str) -> String {
    let mut flags = String::new();
    if def.flags.caseless {
        flags.push('i');
    }
    if def.flags.multiline {
        flags.push('m');
    }
    if def.flags.dotall {
        flags.push('s');
    }
    if def.flags.utf8 {
        flags.push('u');
    }
    if flags.is_empty() {
        format!("(?:{})", expression)
    } else {
        format!("(?{}:{})", flags, expression)
    }
}
