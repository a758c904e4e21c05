//! Test utilities for the siteulation crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`).
//! Compiled for `cfg(test)` or with the `test-support` feature.

mod clock;
mod generation;

pub use clock::MutableClock;
pub use generation::ScriptedGenerationBackend;

/// Temporary directory for mirror adapters under test.
///
/// # Panics
/// Panics when the operating system refuses to create a temporary directory.
pub fn temp_mirror_dir() -> tempfile::TempDir {
    match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(error) => panic!("failed to create temporary mirror directory: {error}"),
    }
}
