//! Thread-safe scanner
//!
//! A single [`BlockScanner`] must not be called from several threads at once.
//! [`SharedScanner`] puts one behind a mutex so clones can be handed to worker
//! threads. The lock guards the alive/disposed flag and every engine call, so
//! a dispose from one thread is seen by all others before their next call.

use crate::backend::{EngineBackend, NativeBackend};
use crate::error::Result;
use crate::scanner::{BlockScanner, HandleState};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable, lock-protected handle to one [`BlockScanner`]
///
/// All clones share a single engine. It is released by the first
/// [`dispose`](SharedScanner::dispose) from any clone, or when the last clone
/// is dropped.
///
/// # Example
///
/// ```rust,no_run
/// use blockscan::SharedScanner;
/// use std::thread;
///
/// let scanner = SharedScanner::new()?;
/// scanner.compile_block_database("rules.txt")?;
///
/// let workers: Vec<_> = ["alpha", "beta"]
///     .into_iter()
///     .map(|input| {
///         let scanner = scanner.clone();
///         thread::spawn(move || scanner.scan_single(input))
///     })
///     .collect();
///
/// for worker in workers {
///     println!("{:?}", worker.join().unwrap());
/// }
/// # Ok::<(), blockscan::Error>(())
/// ```
pub struct SharedScanner<B: EngineBackend = NativeBackend> {
    inner: Arc<Mutex<BlockScanner<B>>>,
}

impl SharedScanner<NativeBackend> {
    /// Create a shared scanner backed by the native engine
    pub fn new() -> Result<Self> {
        BlockScanner::new().map(Self::from_scanner)
    }
}

impl<B: EngineBackend> SharedScanner<B> {
    /// Create a shared scanner on top of an arbitrary backend
    pub fn with_backend(backend: B) -> Result<Self> {
        BlockScanner::with_backend(backend).map(Self::from_scanner)
    }

    /// Wrap an existing scanner
    pub fn from_scanner(scanner: BlockScanner<B>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(scanner)),
        }
    }

    /// See [`BlockScanner::compile_block_database`]
    pub fn compile_block_database<P: AsRef<Path>>(&self, pattern_file: P) -> Result<()> {
        self.lock().compile_block_database(pattern_file)
    }

    /// See [`BlockScanner::scan`]
    pub fn scan<D: AsRef<[u8]>>(&self, data: D) -> Result<Option<u32>> {
        self.lock().scan(data)
    }

    /// See [`BlockScanner::scan_single`]
    pub fn scan_single<D: AsRef<[u8]>>(&self, data: D) -> Result<i32> {
        self.lock().scan_single(data)
    }

    /// See [`BlockScanner::dispose`]; affects every clone
    pub fn dispose(&self) -> Result<()> {
        self.lock().dispose()
    }

    /// Current lifecycle state
    pub fn state(&self) -> HandleState {
        self.lock().state()
    }

    /// True until the engine is released
    pub fn is_alive(&self) -> bool {
        self.lock().is_alive()
    }

    // A panic while the lock is held cannot leave the scanner half-released:
    // the handle leaves its Option before the destroy call runs.
    fn lock(&self) -> MutexGuard<'_, BlockScanner<B>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B: EngineBackend> Clone for SharedScanner<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
