use std::collections::HashSet;
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::Config;
use crate::error::{LaunchError, Result};

/// Locations tried for the cache tool: PATH first, then where distributions
/// keep it when sbin is not on PATH.
const CACHE_TOOLS: &[&str] = &["ldconfig", "/sbin/ldconfig"];

/// The ordered directory list advertised by the shared-library cache, with
/// any `LD_LIBRARY_PATH` override directories appended after it, each
/// preserved as given.
pub fn enumerate(config: &Config) -> Result<Vec<PathBuf>> {
    let listing = print_cache()?;
    let mut directories = directories_from_listing(&listing);
    if let Some(overrides) = &config.library_path {
        directories.extend(env::split_paths(overrides));
    }
    Ok(directories)
}

fn print_cache() -> Result<String> {
    let mut spawn_error = None;
    for tool in CACHE_TOOLS {
        match Command::new(tool).arg("-p").output() {
            Ok(output) if output.status.success() => {
                return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
            }
            Ok(output) => {
                return Err(LaunchError::CacheToolFailed {
                    status: output.status,
                })
            }
            Err(source) => spawn_error = Some(source),
        }
    }
    Err(LaunchError::CacheTool(spawn_error.unwrap_or_else(|| {
        io::Error::from(io::ErrorKind::NotFound)
    })))
}

/// Distills the `-p` listing (`libfoo.so (…) => /dir/libfoo.so` per entry)
/// down to the distinct directories, the one backing the most recently
/// listed cache entry first.
pub fn directories_from_listing(listing: &str) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut directories = Vec::new();
    for line in listing.lines().rev() {
        // The count header and any malformed line fall out here.
        let resolved = match line.rsplit_once(" => ") {
            Some((_, path)) => path.trim(),
            None => continue,
        };
        let directory = match Path::new(resolved).parent() {
            Some(directory) if !directory.as_os_str().is_empty() => directory,
            _ => continue,
        };
        if seen.insert(directory.to_path_buf()) {
            directories.push(directory.to_path_buf());
        }
    }
    directories
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::directories_from_listing;

    const LISTING: &str = "\
4 libs found in cache `/etc/ld.so.cache'
\tlibz.so.1 (libc6,x86-64) => /usr/lib/x86_64-linux-gnu/libz.so.1
\tlibm.so.6 (libc6,x86-64) => /usr/lib/x86_64-linux-gnu/libm.so.6
\tlibfancy.so.3 (libc6,x86-64) => /opt/fancy/lib/libfancy.so.3
\tlibc.so.6 (libc6,x86-64) => /lib/x86_64-linux-gnu/libc.so.6
";

    #[test]
    fn most_recently_listed_directory_leads_and_duplicates_collapse() {
        assert_eq!(
            directories_from_listing(LISTING),
            vec![
                PathBuf::from("/lib/x86_64-linux-gnu"),
                PathBuf::from("/opt/fancy/lib"),
                PathBuf::from("/usr/lib/x86_64-linux-gnu"),
            ]
        );
    }

    #[test]
    fn header_and_malformed_lines_are_skipped() {
        let listing = "999 libs found in cache `/etc/ld.so.cache'\nnot an entry\n";
        assert!(directories_from_listing(listing).is_empty());
    }

    #[test]
    fn empty_listing_yields_no_directories() {
        assert!(directories_from_listing("").is_empty());
    }
}
