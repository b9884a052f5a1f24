use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

/// Extra library directories, searched after the cache-derived list and
/// prepended to again when launching through a resolved interpreter.
pub const LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";

/// Set to any non-empty value to trace each resolution step on stderr.
pub const DEBUG_VAR: &str = "INTERP_STUB_DEBUG";

/// Snapshot of everything this program reads from its environment, captured
/// once at startup. The resolution steps take this as a plain value and
/// never consult the environment themselves.
#[derive(Debug, Clone)]
pub struct Config {
    /// `LD_LIBRARY_PATH` as it was when we started, unset-or-empty folded
    /// to `None`.
    pub library_path: Option<OsString>,
    pub debug: bool,
    /// Working directory used to absolutize a relative invocation path.
    pub cwd: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            library_path: env::var_os(LIBRARY_PATH_VAR).filter(|value| !value.is_empty()),
            debug: env::var_os(DEBUG_VAR).map_or(false, |value| !value.is_empty()),
            cwd: env::current_dir().unwrap_or_else(|_| PathBuf::from("/")),
        }
    }
}
