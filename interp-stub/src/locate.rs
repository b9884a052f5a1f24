use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::elf::BinaryMetadata;
use crate::error::{LaunchError, Result};
use crate::origin;

/// Outcome of the interpreter search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The interpreter path embedded in the image is usable as-is; launch
    /// the binary directly and leave the environment alone.
    Embedded,
    /// An executable match was found in `directory`.
    Interpreter { path: PathBuf, directory: PathBuf },
}

/// The ordered candidate directories. The binary's own directory binds
/// tightest, then its declared (already expanded) hint, then the cache
/// list, so a bundled interpreter always shadows a system one.
pub fn candidates(binary_dir: &Path, expanded_hint: &str, cache_dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut list = vec![binary_dir.to_path_buf()];
    list.extend(
        expanded_hint
            .split(':')
            .filter(|segment| !segment.is_empty())
            .map(PathBuf::from),
    );
    list.extend(cache_dirs.iter().cloned());
    list
}

/// Decides which interpreter starts `binary`.
///
/// A static image, or one whose hint needs no expansion while its absolute
/// interpreter and executable bit are already in place, short-circuits to
/// [`Resolution::Embedded`]. Everything else walks the candidate list for
/// the interpreter's file name; the directory part of an absolute
/// `PT_INTERP` is ignored during the walk so a bundled copy can shadow the
/// system path it names.
pub fn locate(
    binary: &Path,
    metadata: &BinaryMetadata,
    expanded_hint: &str,
    cache_dirs: &[PathBuf],
) -> Result<Resolution> {
    let interpreter = match &metadata.interpreter {
        Some(interpreter) => interpreter,
        // Static image: the kernel can start it without help.
        None => return Ok(Resolution::Embedded),
    };

    if !origin::mentions_origin(metadata.search_hint.as_deref())
        && interpreter.is_absolute()
        && is_executable(binary)
    {
        return Ok(Resolution::Embedded);
    }

    let name = match interpreter.file_name() {
        Some(name) => name,
        None => return Err(not_found(interpreter)),
    };

    let binary_dir = binary.parent().unwrap_or_else(|| Path::new("/"));
    for directory in candidates(binary_dir, expanded_hint, cache_dirs) {
        let candidate = directory.join(name);
        if is_executable(&candidate) {
            return Ok(Resolution::Interpreter {
                path: candidate,
                directory,
            });
        }
    }

    Err(not_found(interpreter))
}

fn not_found(interpreter: &Path) -> LaunchError {
    LaunchError::InterpreterNotFound {
        name: interpreter.to_string_lossy().into_owned(),
    }
}

fn is_executable(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(metadata) => metadata.is_file() && metadata.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}
