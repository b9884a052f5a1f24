use std::fs;
use std::path::{Path, PathBuf};

use goblin::elf::Elf;

use crate::error::{LaunchError, Result};

/// The two fields of the ELF image this launcher consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryMetadata {
    /// First `DT_RPATH` entry, falling back to the first `DT_RUNPATH` entry
    /// when no RPATH is present. Verbatim, placeholders unexpanded.
    pub search_hint: Option<String>,
    /// `PT_INTERP` contents: the interpreter the image asks to be started by.
    pub interpreter: Option<PathBuf>,
}

/// Reads the program headers and dynamic section of the binary at `path`.
///
/// Static images produce an all-`None` result; such binaries are expected to
/// be directly executable and bypass resolution entirely. Only the first
/// hint and interpreter entries matter; extra entries are ignored rather
/// than validated.
pub fn extract(path: &Path) -> Result<BinaryMetadata> {
    let image = fs::read(path).map_err(|source| LaunchError::ReadBinary {
        path: path.to_path_buf(),
        source,
    })?;
    let elf = Elf::parse(&image).map_err(|source| LaunchError::ParseBinary {
        path: path.to_path_buf(),
        source,
    })?;

    let search_hint = elf
        .rpaths
        .first()
        .or_else(|| elf.runpaths.first())
        .map(|hint| hint.to_string());
    let interpreter = elf.interpreter.map(PathBuf::from);

    Ok(BinaryMetadata {
        search_hint,
        interpreter,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempdir::TempDir;

    use super::extract;
    use crate::error::LaunchError;
    use crate::testelf::{write_elf, Hint};

    #[test]
    fn extracts_interpreter_and_rpath() {
        let temp_dir = TempDir::new("elf-test").unwrap();
        let binary = temp_dir.path().join("app");
        write_elf(
            &binary,
            Some("/lib64/ld-linux-x86-64.so.2"),
            Hint::Rpath("$ORIGIN/../lib"),
        );

        let metadata = extract(&binary).unwrap();
        assert_eq!(
            metadata.interpreter.as_deref(),
            Some(Path::new("/lib64/ld-linux-x86-64.so.2"))
        );
        assert_eq!(metadata.search_hint.as_deref(), Some("$ORIGIN/../lib"));
    }

    #[test]
    fn falls_back_to_runpath_when_rpath_is_absent() {
        let temp_dir = TempDir::new("elf-test").unwrap();
        let binary = temp_dir.path().join("app");
        write_elf(&binary, Some("fake-ld.so"), Hint::Runpath("$ORIGIN/../lib64"));

        let metadata = extract(&binary).unwrap();
        assert_eq!(metadata.search_hint.as_deref(), Some("$ORIGIN/../lib64"));
    }

    #[test]
    fn static_image_yields_no_metadata() {
        let temp_dir = TempDir::new("elf-test").unwrap();
        let binary = temp_dir.path().join("app");
        write_elf(&binary, None, Hint::None);

        let metadata = extract(&binary).unwrap();
        assert_eq!(metadata.interpreter, None);
        assert_eq!(metadata.search_hint, None);
    }

    #[test]
    fn rejects_a_non_elf_file() {
        let temp_dir = TempDir::new("elf-test").unwrap();
        let script = temp_dir.path().join("app");
        fs::write(&script, b"#!/bin/sh\nexit 0\n").unwrap();

        let error = extract(&script).unwrap_err();
        assert!(matches!(error, LaunchError::ParseBinary { .. }));
    }

    #[test]
    fn rejects_a_missing_file() {
        let temp_dir = TempDir::new("elf-test").unwrap();

        let error = extract(&temp_dir.path().join("absent")).unwrap_err();
        assert!(matches!(error, LaunchError::ReadBinary { .. }));
    }
}
