//! Blockscan - Safe Owner for a Block-Mode Multi-Pattern Scanning Engine
//!
//! Blockscan compiles a file of numbered regular expressions into a block
//! database held by a scanning engine, and scans whole buffers against it.
//! Each scan reports the id of one matching pattern, or `-1` when nothing
//! matched.
//!
//! The engine lives behind a C ABI ([`c_api`]) so it can be used from C and
//! C++ as well. Rust callers use [`BlockScanner`], which owns exactly one
//! engine and releases it exactly once.
//!
//! # Quick Start
//!
//! ```rust
//! use blockscan::{BlockScanner, Error, NO_MATCH};
//! # use std::io::Write;
//!
//! # let mut rules = tempfile::NamedTempFile::new()?;
//! # writeln!(rules, "1:/abc/")?;
//! # let rules_path = rules.path();
//! let mut scanner = BlockScanner::new()?;
//! scanner.compile_block_database(rules_path)?;
//!
//! assert_eq!(scanner.scan_single("xxabcxx")?, 1);
//! assert_eq!(scanner.scan_single("zzz")?, NO_MATCH);
//!
//! scanner.dispose()?;
//! assert!(matches!(scanner.scan_single("abc"), Err(Error::Disposed { .. })));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Pattern Files
//!
//! ```text
//! # id:/expression/flags
//! 1:/abc/
//! 10001:/password\s*=/i
//! ```
//!
//! See [`pattern_file`] for the full format.
//!
//! # Lifecycle
//!
//! ```text
//!   BlockScanner::new() ──▶ Alive ──dispose()/close()/drop──▶ Disposed
//!                            │  ▲                                │
//!                 compile / scan                    compile / scan ──▶ Error::Disposed
//! ```
//!
//! The engine is destroyed by whichever of `dispose()` and `Drop` runs first;
//! the other does nothing.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Engine backends and the native backend
pub mod backend;
/// Public C API
pub mod c_api;
/// Compiled block database
pub mod database;
/// Error types
pub mod error;
/// Line-oriented input readers for scanning
pub mod input;
pub mod pattern_file;
pub mod scanner;
pub mod shared;

// Re-exports for Rust consumers

pub use crate::backend::{BackendError, EngineBackend, NativeBackend};
pub use crate::database::{BlockDatabase, DatabaseError};
pub use crate::error::{Error, Result};
pub use crate::pattern_file::{PatternDef, PatternFileError, PatternFlags};
pub use crate::scanner::{BlockScanner, HandleState, NO_MATCH};
pub use crate::shared::SharedScanner;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
