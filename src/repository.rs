//! Ebuild repository detection
//!
//! Flag and keyword metadata comes from ebuild repositories. A repository
//! is any directory with a `profiles/` subdirectory.

use anyhow::{bail, Context, Result};
use config::paths;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Detect the repositories to read metadata from
///
/// Searches in order:
/// 1. User-specified path (`--repo` or `PKGFLAGS_REPO`)
/// 2. `repositories` from the settings file
/// 3. /var/db/repos/gentoo
/// 4. /usr/portage
///
/// Explicitly configured repositories must be valid. When auto-detection
/// finds nothing an empty list is returned and every flag lookup falls
/// back to USE flags.
pub fn detect_repositories(custom: Option<&Path>, configured: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if let Some(path) = custom {
        return Ok(vec![validate_repository(path)?]);
    }

    if !configured.is_empty() {
        return configured.iter().map(|p| validate_repository(p)).collect();
    }

    for path in paths::repositories() {
        if !path.exists() {
            continue;
        }
        match validate_repository(&path) {
            Ok(p) => {
                debug!("Found repository at {}", p.display());
                return Ok(vec![p]);
            }
            Err(e) => debug!("Skipping {}: {:#}", path.display(), e),
        }
    }

    warn!(
        "No ebuild repository found (searched {}), flag names will not be checked",
        paths::repositories()
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(Vec::new())
}

/// Validate that a path contains an ebuild repository
pub fn validate_repository(path: &Path) -> Result<PathBuf> {
    let canonical_path = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve repository path: {}", path.display()))?;

    if !canonical_path.is_dir() {
        bail!(
            "Repository path is not a directory: {}",
            canonical_path.display()
        );
    }

    if !canonical_path.join("profiles").is_dir() {
        bail!(
            "Invalid repository at {}: missing required directory 'profiles'",
            canonical_path.display()
        );
    }

    Ok(canonical_path)
}
