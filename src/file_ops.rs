//! Filesystem helpers consumed by the file workflows.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{CeloError, ErrorKind, Result};

/// Creates a file with the provided name. If the file exists, the overwrite
/// flag has to be on.
///
/// Returns the open file together with whether the target already existed,
/// so callers can clean up a half-written file they brought into existence.
pub fn create(path: &Path, overwrite: bool) -> Result<(File, bool)> {
    let op = "file_ops.create";

    let existed = match fs::metadata(path) {
        // The target doesn't exist yet, which is fine since it will be
        // created below.
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            return Err(CeloError::with_source(ErrorKind::Permissions, op, e)
                .for_entity(path.display().to_string()));
        }
        Ok(info) if info.is_dir() => {
            return Err(
                CeloError::new(ErrorKind::IsDir, op).for_entity(path.display().to_string())
            );
        }
        // The target exists; without the overwrite flag its content won't
        // be replaced.
        Ok(_) if !overwrite => {
            return Err(
                CeloError::new(ErrorKind::Exist, op).for_entity(path.display().to_string())
            );
        }
        Ok(_) => true,
    };

    let file = File::create(path).map_err(|e| {
        CeloError::with_source(ErrorKind::Create, op, e).for_entity(path.display().to_string())
    })?;

    Ok((file, existed))
}

/// Returns the files matching `pattern`, excluding the ones that match
/// `ignore`. Directories are skipped.
///
/// ```text
///  pattern: "./*"
///   ignore: "*.celo"
/// ```
///
/// matches every file in `./` except the ones with a `.celo` extension.
pub fn glob_files(pattern: &str, ignore: Option<&str>) -> Result<Vec<PathBuf>> {
    let op = "file_ops.glob_files";

    let entries = glob::glob(pattern)
        .map_err(|e| CeloError::with_source(ErrorKind::Pattern, op, e).for_entity(pattern))?;

    let ignore = match ignore {
        None => None,
        Some(p) if p.is_empty() => None,
        Some(p) => Some(
            glob::Pattern::new(p)
                .map_err(|e| CeloError::with_source(ErrorKind::Pattern, op, e).for_entity(p))?,
        ),
    };

    let mut matches = Vec::new();
    for entry in entries {
        // Entries that can't be read while walking are skipped rather than
        // failing the whole expansion.
        let Ok(path) = entry else { continue };

        if !path.is_file() {
            continue;
        }

        if let Some(pattern) = &ignore {
            if matches_pattern(pattern, &path) {
                continue;
            }
        }

        matches.push(path);
    }

    Ok(matches)
}

/// Reports whether `path` matches the pattern. A pattern containing a path
/// separator matches against the full path; without one it matches against
/// the file name alone, so `*.celo` excludes such files in any directory.
fn matches_pattern(pattern: &glob::Pattern, path: &Path) -> bool {
    if pattern.as_str().contains(std::path::MAIN_SEPARATOR) {
        return pattern.matches_path(path);
    }

    match path.file_name() {
        Some(name) => pattern.matches(&name.to_string_lossy()),
        None => false,
    }
}
