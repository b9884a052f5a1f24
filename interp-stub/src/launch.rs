use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::locate::Resolution;

/// The terminal action: everything the boundary needs to replace this
/// process image. Constructed once, consumed exactly once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub program: PathBuf,
    /// Arguments after argv[0], forwarded as an argv list end to end; no
    /// command line is ever joined, so whitespace and quoting survive.
    pub args: Vec<OsString>,
    /// Replacement `LD_LIBRARY_PATH` for the launched process, if any.
    pub library_path: Option<OsString>,
}

/// Assembles the final argument vector and environment delta.
pub fn plan(
    resolution: Resolution,
    binary: &Path,
    forwarded: &[OsString],
    config: &Config,
) -> LaunchPlan {
    match resolution {
        Resolution::Embedded => LaunchPlan {
            program: binary.to_path_buf(),
            args: forwarded.to_vec(),
            library_path: None,
        },
        Resolution::Interpreter { path, directory } => {
            let mut args = Vec::with_capacity(forwarded.len() + 1);
            args.push(binary.as_os_str().to_owned());
            args.extend(forwarded.iter().cloned());

            // The winning directory leads the search path so the
            // interpreter finds its libraries where it was itself found.
            let mut library_path = directory.into_os_string();
            if let Some(existing) = &config.library_path {
                library_path.push(":");
                library_path.push(existing);
            }

            LaunchPlan {
                program: path,
                args,
                library_path: Some(library_path),
            }
        }
    }
}
