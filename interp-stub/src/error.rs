use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Everything that can go wrong before the final `exec`.
///
/// All of these are fatal: a misresolved interpreter would silently start
/// the target under the wrong runtime, so nothing is downgraded or retried.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("invocation path missing from argument vector")]
    MissingInvocation,

    #[error("symbolic link expected: {path:?}")]
    SymlinkExpected { path: PathBuf },

    #[error("file extension expected: {path:?}")]
    ExtensionExpected { path: PathBuf },

    #[error("cannot inspect invocation path {path:?}")]
    InvocationStat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read symbolic link {path:?}")]
    ReadLink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read {path:?}")]
    ReadBinary {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse ELF image {path:?}")]
    ParseBinary {
        path: PathBuf,
        #[source]
        source: goblin::error::Error,
    },

    #[error("cannot run the library cache tool")]
    CacheTool(#[source] io::Error),

    #[error("library cache tool failed: {status}")]
    CacheToolFailed { status: ExitStatus },

    #[error("unable to find ELF interpreter {name}")]
    InterpreterNotFound { name: String },
}

pub type Result<T> = std::result::Result<T, LaunchError>;
