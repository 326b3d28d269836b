//! One declaration domain backed by one or more files
//!
//! A domain path may be a plain file or a directory of files. Files are
//! discovered in path order; when several entries name the same package,
//! the last file and the last entry in it win. New entries always go to
//! the last file.

use crate::{ConfigError, Flag, Namespace, PackageEntry, PackageFile, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// File created inside an empty domain directory
pub const DEFAULT_FILE_NAME: &str = "pkgflags";

/// Address of an entry inside a [`PackageFileSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId {
    /// Index into the file list
    pub file: usize,
    /// Index of the entry within the file
    pub index: usize,
}

/// Domain specific read/write behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSetKind {
    /// No transformation
    Plain,
    /// Bare entries imply the default keywords; entries equal to them are written bare
    Keywords { defaults: BTreeSet<String> },
    /// Negated environment flags are never written
    Env,
}

/// All files backing one domain
#[derive(Debug)]
pub struct PackageFileSet {
    namespace: Namespace,
    paths: Vec<PathBuf>,
    kind: FileSetKind,
    default_file_name: String,
    files: Option<Vec<PackageFile>>,
}

impl PackageFileSet {
    /// A plain file set; the last path is the current one, earlier ones are legacy
    pub fn new(namespace: Namespace, paths: Vec<PathBuf>) -> Self {
        Self {
            namespace,
            paths,
            kind: FileSetKind::Plain,
            default_file_name: DEFAULT_FILE_NAME.to_string(),
            files: None,
        }
    }

    /// Keyword file set with the implied default keywords
    pub fn keywords(paths: Vec<PathBuf>, defaults: BTreeSet<String>) -> Self {
        Self::new(Namespace::Keywords, paths).with_kind(FileSetKind::Keywords { defaults })
    }

    /// Environment file set
    pub fn env(path: impl Into<PathBuf>) -> Self {
        Self::new(Namespace::Env, vec![path.into()]).with_kind(FileSetKind::Env)
    }

    pub fn with_kind(mut self, kind: FileSetKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_default_file_name(mut self, name: impl Into<String>) -> Self {
        self.default_file_name = name.into();
        self
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn kind(&self) -> &FileSetKind {
        &self.kind
    }

    /// Read all backing files, once
    pub fn read(&mut self) -> Result<()> {
        if self.files.is_some() {
            return Ok(());
        }

        let mut files = Vec::new();
        for path in &self.paths {
            for member in discover(path, &self.default_file_name)? {
                files.push(PackageFile::read(member)?);
            }
        }

        if let FileSetKind::Keywords { defaults } = &self.kind {
            for file in &mut files {
                for entry in file.entries_mut().filter(|e| e.is_empty()) {
                    for kw in defaults {
                        entry.append(Flag::enabled(kw.clone()));
                    }
                    entry.clear_modified();
                }
            }
        }

        debug!("Loaded {} file(s) for {}", files.len(), self.namespace);
        self.files = Some(files);
        Ok(())
    }

    /// Backing files, reading them if needed
    pub fn files(&mut self) -> Result<&mut [PackageFile]> {
        self.read()?;
        Ok(self.files.get_or_insert_with(Vec::new).as_mut_slice())
    }

    /// Entries for a package, most effective first
    pub fn lookup(&mut self, package: &str) -> Result<Vec<EntryId>> {
        let files = self.files()?;
        let mut found = Vec::new();
        for (fi, file) in files.iter().enumerate().rev() {
            for (ei, entry) in file.entries().iter().enumerate().rev() {
                if entry.package == package {
                    found.push(EntryId {
                        file: fi,
                        index: ei,
                    });
                }
            }
        }
        Ok(found)
    }

    pub fn entry(&self, id: EntryId) -> Option<&PackageEntry> {
        self.files.as_ref()?.get(id.file)?.entry(id.index)
    }

    pub fn entry_mut(&mut self, id: EntryId) -> Option<&mut PackageEntry> {
        self.files.as_mut()?.get_mut(id.file)?.entry_mut(id.index)
    }

    /// Create a new entry for a package at the end of the last file
    pub fn append(&mut self, package: &str) -> Result<EntryId> {
        let namespace = self.namespace.clone();
        let files = self.files()?;
        let file = files.len().checked_sub(1).ok_or_else(|| {
            ConfigError::NotFound(format!("backing file for {}", namespace))
        })?;
        let index = files[file].append(PackageEntry::new(package));
        Ok(EntryId { file, index })
    }

    /// Remove every entry for a package from every file
    pub fn delete(&mut self, package: &str) -> Result<()> {
        for file in self.files()? {
            let indices: Vec<usize> = file
                .entries()
                .iter()
                .enumerate()
                .filter(|(_, e)| e.package == package)
                .map(|(i, _)| i)
                .collect();
            for index in indices.into_iter().rev() {
                file.remove(index)?;
            }
        }
        Ok(())
    }

    /// Remove a single entry
    ///
    /// Removing entries shifts later indices of the same file; remove in
    /// [`lookup`](Self::lookup) order to keep the remaining ids valid.
    pub fn remove(&mut self, id: EntryId) -> Result<PackageEntry> {
        let file = self
            .files()?
            .get_mut(id.file)
            .ok_or_else(|| ConfigError::NotFound(format!("file {}", id.file)))?;
        file.remove(id.index)
    }

    /// Move entries from legacy paths into the current one
    ///
    /// Migrated entries are placed ahead of the current file's own entries,
    /// so they stay less effective. Legacy files left empty are removed on
    /// write.
    pub fn migrate(&mut self) -> Result<()> {
        if self.paths.len() <= 1 {
            return Ok(());
        }

        let (current, legacy) = match self.paths.split_last() {
            Some((current, legacy)) => (current.clone(), legacy.to_vec()),
            None => return Ok(()),
        };
        let files = self.files()?;
        let target = files
            .iter()
            .position(|f| f.path().starts_with(&current))
            .ok_or_else(|| ConfigError::MigrationTarget(current.clone()))?;

        let mut moved = Vec::new();
        for path in &legacy {
            for (i, file) in files.iter_mut().enumerate() {
                if i != target && file.path().starts_with(path) {
                    debug!("Migrating {} into {}", file.path().display(), current.display());
                    moved.extend(file.take_entries());
                    file.mark_modified();
                }
            }
        }

        files[target].prepend(moved);
        Ok(())
    }

    /// Sort every file
    pub fn sort(&mut self) -> Result<()> {
        for file in self.files()? {
            file.sort();
        }
        Ok(())
    }

    pub fn is_modified(&self) -> bool {
        self.files
            .as_ref()
            .map_or(false, |files| files.iter().any(|f| f.is_modified()))
    }

    /// Write modified files and drop the cached contents
    pub fn write(&mut self) -> Result<()> {
        let mut files = match self.files.take() {
            Some(files) => files,
            None => return Ok(()),
        };

        match &self.kind {
            FileSetKind::Plain => {}
            FileSetKind::Keywords { defaults } => {
                for file in &mut files {
                    let mut collapsed = false;
                    for entry in file.entries_mut().filter(|e| e.is_modified()) {
                        let flags: BTreeSet<String> =
                            entry.flags().iter().map(|f| f.to_string()).collect();
                        if &flags == defaults {
                            entry.collapse();
                            collapsed = true;
                        }
                    }
                    if collapsed {
                        file.mark_modified();
                    }
                }
            }
            FileSetKind::Env => {
                for file in &mut files {
                    for entry in file.entries_mut().filter(|e| e.is_modified()) {
                        entry.strip_disabled();
                    }
                }
            }
        }

        for file in &mut files {
            file.write()?;
        }
        Ok(())
    }
}

/// Member files of a domain path
fn discover(path: &Path, default_file_name: &str) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut members = Vec::new();
    for entry in WalkDir::new(path).min_depth(1).follow_links(true) {
        let entry = entry.map_err(|e| ConfigError::io(path, e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') || name.ends_with('~') {
            continue;
        }
        members.push(entry.into_path());
    }

    if members.is_empty() {
        members.push(path.join(default_file_name));
    } else {
        members.sort();
    }
    Ok(members)
}
