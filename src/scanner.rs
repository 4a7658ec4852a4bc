//! Owned scanning engine
//!
//! [`BlockScanner`] binds one engine to one Rust value. The engine is created
//! in the constructor and released exactly once: by the first call to
//! [`dispose`](BlockScanner::dispose) (or [`close`](BlockScanner::close)), or
//! by `Drop` if neither was called. Once released, every compile and scan is
//! rejected with [`Error::Disposed`] without reaching the backend.
//!
//! # Example
//!
//! ```rust,no_run
//! use blockscan::{BlockScanner, NO_MATCH};
//!
//! let mut scanner = BlockScanner::new()?;
//! scanner.compile_block_database("rules.txt")?;
//!
//! match scanner.scan_single("GET /index.html")? {
//!     NO_MATCH => println!("clean"),
//!     id => println!("matched pattern {}", id),
//! }
//!
//! // Optional: the engine is also released when `scanner` goes out of scope
//! scanner.dispose()?;
//! # Ok::<(), blockscan::Error>(())
//! ```

use crate::backend::{BackendError, EngineBackend, NativeBackend};
use crate::error::{Error, Result};
use std::fmt;
use std::path::Path;
use tracing::{debug, trace, warn};

/// Result of [`BlockScanner::scan_single`] when no pattern matched
pub const NO_MATCH: i32 = -1;

/// Lifecycle state of a [`BlockScanner`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// The engine exists and accepts calls
    Alive,
    /// The engine has been released; terminal
    Disposed,
}

/// Exclusive owner of one scanning engine
pub struct BlockScanner<B: EngineBackend = NativeBackend> {
    backend: B,
    /// `Some` while alive. Taken exactly once, by whichever of `dispose`
    /// and `Drop` runs first.
    handle: Option<B::Handle>,
    /// Whether the engine holds a database from a successful compile
    compiled: bool,
}

impl BlockScanner<NativeBackend> {
    /// Create a scanner backed by the native engine
    pub fn new() -> Result<Self> {
        Self::with_backend(NativeBackend)
    }
}

impl<B: EngineBackend> BlockScanner<B> {
    /// Create a scanner on top of an arbitrary backend
    ///
    /// Fails with [`Error::Construction`] if the backend cannot allocate an
    /// engine.
    pub fn with_backend(backend: B) -> Result<Self> {
        let handle = backend.create_engine().map_err(Error::Construction)?;
        debug!("created scanning engine");
        Ok(Self {
            backend,
            handle: Some(handle),
            compiled: false,
        })
    }

    /// Compile a pattern file into this engine's block database
    ///
    /// Replaces any database from an earlier compile. If compilation fails
    /// the engine is left without a database and scans return
    /// [`Error::NotCompiled`] until a later compile succeeds.
    pub fn compile_block_database<P: AsRef<Path>>(&mut self, pattern_file: P) -> Result<()> {
        let path = pattern_file.as_ref();
        let handle = self.handle.as_mut().ok_or(Error::Disposed {
            operation: "compile",
        })?;

        self.compiled = false;
        self.backend
            .compile_database(handle, path)
            .map_err(|source| Error::Compile {
                path: path.to_path_buf(),
                source,
            })?;
        self.compiled = true;
        debug!(path = %path.display(), "compiled block database");
        Ok(())
    }

    /// Scan one buffer, returning the matched pattern id
    pub fn scan<D: AsRef<[u8]>>(&mut self, data: D) -> Result<Option<u32>> {
        let handle = self
            .handle
            .as_mut()
            .ok_or(Error::Disposed { operation: "scan" })?;
        if !self.compiled {
            return Err(Error::NotCompiled);
        }

        let data = data.as_ref();
        let raw = self
            .backend
            .scan_buffer(handle, data)
            .map_err(Error::Scan)?;
        trace!(len = data.len(), result = raw, "scanned block");

        match raw {
            NO_MATCH => Ok(None),
            id => u32::try_from(id).map(Some).map_err(|_| {
                Error::Scan(BackendError::new(
                    id,
                    format!("engine returned invalid match id {}", id),
                ))
            }),
        }
    }

    /// Scan one buffer, returning the matched pattern id or [`NO_MATCH`]
    pub fn scan_single<D: AsRef<[u8]>>(&mut self, data: D) -> Result<i32> {
        // Ids come back from an i32, so they always fit
        Ok(self.scan(data)?.map_or(NO_MATCH, |id| id as i32))
    }

    /// Release the engine
    ///
    /// The first call destroys the engine and reports the backend's status;
    /// the scanner is disposed afterwards even if that status is an error.
    /// Later calls do nothing and return `Ok(())`.
    pub fn dispose(&mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => {
                self.compiled = false;
                debug!("disposing scanning engine");
                self.backend.destroy_engine(handle).map_err(Error::Destroy)
            }
            None => Ok(()),
        }
    }

    /// Release the engine, consuming the scanner
    pub fn close(mut self) -> Result<()> {
        self.dispose()
    }

    /// Current lifecycle state
    pub fn state(&self) -> HandleState {
        if self.handle.is_some() {
            HandleState::Alive
        } else {
            HandleState::Disposed
        }
    }

    /// True until the engine is released
    pub fn is_alive(&self) -> bool {
        self.handle.is_some()
    }

    /// True if a compile has succeeded since the last failed one
    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    /// The backend this scanner drives
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: EngineBackend> Drop for BlockScanner<B> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("releasing scanning engine on drop");
            if let Err(e) = self.backend.destroy_engine(handle) {
                warn!("failed to destroy scanning engine on drop: {}", e);
            }
        }
    }
}

impl<B: EngineBackend> fmt::Debug for BlockScanner<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockScanner")
            .field("state", &self.state())
            .field("compiled", &self.compiled)
            .finish()
    }
}
