//! A single declaration file
//!
//! Entries own the inert lines directly above them, so reordering or
//! removing entries moves their comments along. Lines after the last
//! entry are kept as trailing context.

use crate::{ConfigError, Line, PackageEntry, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A package.* file backed by one path
#[derive(Debug, Clone)]
pub struct PackageFile {
    path: PathBuf,
    entries: Vec<PackageEntry>,
    trailing: Vec<String>,
    // set when entries are removed or moved in
    modified: bool,
}

impl PackageFile {
    /// An empty file at `path` (nothing is created until a write has content)
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
            trailing: Vec::new(),
            modified: false,
        }
    }

    /// Read a file; a missing file reads as empty
    pub fn read(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        match fs::read_to_string(&path) {
            Ok(content) => {
                debug!("Read {}", path.display());
                Ok(Self::parse(path, &content))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} does not exist, starting empty", path.display());
                Ok(Self::empty(path))
            }
            Err(e) => Err(ConfigError::io(path, e)),
        }
    }

    /// Parse file content
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Self {
        let mut file = Self::empty(path);
        let mut context = Vec::new();

        for line in content.split_inclusive('\n') {
            match Line::parse(line) {
                Line::Inert(text) => context.push(text),
                Line::Entry(mut entry) => {
                    entry.leading = std::mem::take(&mut context);
                    file.entries.push(entry);
                }
            }
        }

        file.trailing = context;
        file
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[PackageEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&PackageEntry> {
        self.entries.get(index)
    }

    pub fn entry_mut(&mut self, index: usize) -> Option<&mut PackageEntry> {
        self.entries.get_mut(index)
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut PackageEntry> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the file needs to be written
    pub fn is_modified(&self) -> bool {
        self.modified || self.entries.iter().any(|e| e.is_modified())
    }

    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    /// Append an entry at the end of the file; returns its index
    pub fn append(&mut self, entry: PackageEntry) -> usize {
        self.entries.push(entry);
        self.modified = true;
        self.entries.len() - 1
    }

    /// Remove the entry at `index`
    ///
    /// The comments above the removed entry stay in the file.
    pub fn remove(&mut self, index: usize) -> Result<PackageEntry> {
        if index >= self.entries.len() {
            return Err(ConfigError::NotFound(format!(
                "entry {} of {}",
                index,
                self.path.display()
            )));
        }

        let mut entry = self.entries.remove(index);
        let context = std::mem::take(&mut entry.leading);
        let next = match self.entries.get_mut(index) {
            Some(next) => &mut next.leading,
            None => &mut self.trailing,
        };
        next.splice(0..0, context);

        self.modified = true;
        Ok(entry)
    }

    /// Move every entry, with the comments above it, out of the file
    pub(crate) fn take_entries(&mut self) -> Vec<PackageEntry> {
        if !self.entries.is_empty() {
            self.modified = true;
        }
        std::mem::take(&mut self.entries)
    }

    /// Insert entries ahead of the current ones
    pub(crate) fn prepend(&mut self, entries: Vec<PackageEntry>) {
        self.entries.splice(0..0, entries);
        self.modified = true;
    }

    /// Stable-sort entries by package, and the flags of every entry by name
    pub fn sort(&mut self) {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| a.package.cmp(&b.package));
        let reordered = sorted
            .iter()
            .zip(self.entries.iter())
            .any(|(a, b)| a.package != b.package);
        if reordered {
            self.entries = sorted;
            self.modified = true;
        }

        for entry in &mut self.entries {
            entry.sort();
        }
    }

    /// Serialized content of the file
    pub fn data(&self) -> String {
        let mut data = String::new();
        for entry in &self.entries {
            for line in &entry.leading {
                push_line(&mut data, line);
            }
            // modified entries that lost all flags are dropped
            if !entry.is_modified() || !entry.is_empty() {
                push_line(&mut data, &entry.render());
            }
        }
        for line in &self.trailing {
            push_line(&mut data, line);
        }
        data
    }

    /// Persist the file if it was modified
    ///
    /// Content is written to a temporary file next to the target and renamed
    /// into place; the previous version is kept as `path~`. A file whose
    /// content becomes empty is moved to `path~`.
    pub fn write(&mut self) -> Result<()> {
        if !self.is_modified() {
            return Ok(());
        }

        let data = self.data();
        // a symlinked file is rewritten in place; the backup sits next to the link
        let target = fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone());
        let backup = backup_path(&self.path);

        if data.is_empty() {
            match fs::rename(&self.path, &backup) {
                Ok(()) => debug!("Moved empty {} to {}", self.path.display(), backup.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(ConfigError::io(&self.path, e)),
            }
        } else {
            let dir = match target.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            };
            fs::create_dir_all(&dir).map_err(|e| ConfigError::io(&dir, e))?;

            let mut tmp = tempfile::NamedTempFile::new_in(&dir)
                .map_err(|e| ConfigError::io(&dir, e))?;
            tmp.write_all(data.as_bytes())
                .map_err(|e| ConfigError::io(tmp.path(), e))?;

            let had_original = match fs::copy(&self.path, &backup) {
                Ok(_) => true,
                Err(e) if e.kind() == ErrorKind::NotFound => false,
                Err(e) => return Err(ConfigError::io(&backup, e)),
            };

            tmp.persist(&target)
                .map_err(|e| ConfigError::io(&target, e.error))?;

            if had_original {
                let perms = fs::metadata(&backup)
                    .map_err(|e| ConfigError::io(&backup, e))?
                    .permissions();
                fs::set_permissions(&target, perms).map_err(|e| ConfigError::io(&target, e))?;
            } else {
                set_default_mode(&target)?;
            }
            debug!("Wrote {}", target.display());
        }

        for entry in &mut self.entries {
            entry.clear_modified();
        }
        self.modified = false;
        Ok(())
    }
}

/// Append a line, terminating the previous one if it lacked a newline
///
/// Only the last line of a file read from disk can be unterminated; once
/// entries are appended, moved in or reordered it may end up in the middle.
fn push_line(data: &mut String, line: &str) {
    if !data.is_empty() && !data.ends_with('\n') {
        data.push('\n');
    }
    data.push_str(line);
}

/// `path~`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push("~");
    PathBuf::from(name)
}

/// Apply `0666 & ~umask` to a newly created file
#[cfg(unix)]
fn set_default_mode(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    // umask can only be read by setting it
    let umask = unsafe {
        let current = libc::umask(0o022);
        libc::umask(current);
        current as u32
    };
    fs::set_permissions(path, fs::Permissions::from_mode(0o666 & !umask))
        .map_err(|e| ConfigError::io(path, e))
}

#[cfg(not(unix))]
fn set_default_mode(_path: &Path) -> Result<()> {
    Ok(())
}
