use std::fs;
use std::path::{Path, PathBuf};

use path_absolutize::Absolutize;

use crate::error::{LaunchError, Result};

/// Resolves the path this program was invoked as to the binary it fronts.
///
/// The install convention is a two-level link chain: a front-door symlink
/// (for example in an install-wide `bin` directory) points into a package's
/// private `bin` directory, and the link there carries the real binary's
/// name plus a file extension. The invocation path must itself be a symlink;
/// its one-level target, rooted against the invocation path's own directory
/// when relative, names the binary once the extension is stripped.
///
/// Deeper link chains are a packaging error and are not followed.
pub fn resolve(invocation: &Path, cwd: &Path) -> Result<PathBuf> {
    let metadata = fs::symlink_metadata(invocation).map_err(|source| LaunchError::InvocationStat {
        path: invocation.to_path_buf(),
        source,
    })?;
    if !metadata.file_type().is_symlink() {
        return Err(LaunchError::SymlinkExpected {
            path: invocation.to_path_buf(),
        });
    }

    let target = fs::read_link(invocation).map_err(|source| LaunchError::ReadLink {
        path: invocation.to_path_buf(),
        source,
    })?;

    // A relative target is taken relative to the invocation path as typed,
    // not to wherever the link resolves through other links.
    let target = if target.is_absolute() {
        target
    } else {
        match invocation.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join(&target),
            _ => target,
        }
    };

    if target.extension().is_none() {
        return Err(LaunchError::ExtensionExpected { path: target });
    }
    let binary = target.with_extension("");

    // The handle must be absolute by the time the locator sees it.
    let binary = binary
        .absolutize_from(cwd)
        .map_err(|source| LaunchError::InvocationStat {
            path: binary.clone(),
            source,
        })?
        .into_owned();
    Ok(binary)
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::os::unix::fs::symlink;

    use tempdir::TempDir;

    use super::resolve;
    use crate::error::LaunchError;

    #[test]
    fn strips_extension_from_link_target() {
        let temp_dir = TempDir::new("link-chain-test").unwrap();
        let link = temp_dir.path().join("run");
        symlink(temp_dir.path().join("app.elf"), &link).unwrap();

        let binary = resolve(&link, temp_dir.path()).unwrap();
        assert_eq!(binary, temp_dir.path().join("app"));
    }

    #[test]
    fn relative_target_is_rooted_at_the_invocation_directory() {
        let temp_dir = TempDir::new("link-chain-test").unwrap();
        let link = temp_dir.path().join("run");
        symlink("exec/app.elf", &link).unwrap();

        let binary = resolve(&link, temp_dir.path()).unwrap();
        assert_eq!(binary, temp_dir.path().join("exec").join("app"));
    }

    #[test]
    fn target_may_point_at_a_path_that_does_not_exist_yet() {
        // Only the link itself is read; the named binary is checked later.
        let temp_dir = TempDir::new("link-chain-test").unwrap();
        let link = temp_dir.path().join("run");
        symlink("missing/app.bin", &link).unwrap();

        assert!(resolve(&link, temp_dir.path()).is_ok());
    }

    #[test]
    fn rejects_a_regular_file() {
        let temp_dir = TempDir::new("link-chain-test").unwrap();
        let plain = temp_dir.path().join("run");
        File::create(&plain).unwrap();

        let error = resolve(&plain, temp_dir.path()).unwrap_err();
        assert!(matches!(error, LaunchError::SymlinkExpected { .. }));
        assert!(error.to_string().contains("symbolic link expected"));
    }

    #[test]
    fn rejects_a_target_without_an_extension() {
        let temp_dir = TempDir::new("link-chain-test").unwrap();
        let link = temp_dir.path().join("run");
        symlink(temp_dir.path().join("app"), &link).unwrap();

        let error = resolve(&link, temp_dir.path()).unwrap_err();
        assert!(matches!(error, LaunchError::ExtensionExpected { .. }));
        assert!(error.to_string().contains("file extension expected"));
    }

    #[test]
    fn rejects_a_missing_invocation_path() {
        let temp_dir = TempDir::new("link-chain-test").unwrap();
        let missing = temp_dir.path().join("run");

        let error = resolve(&missing, temp_dir.path()).unwrap_err();
        assert!(matches!(error, LaunchError::InvocationStat { .. }));
    }
}
