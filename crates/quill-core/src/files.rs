//! Source file table.
//!
//! Files are entered by the coordinating thread before any worker forks the
//! GlobalState, so a `FileRef` means the same file in every fork.

use crate::global_state::GlobalState;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Handle to a file in a `FileTable`. `FileRef(0)` is "no file".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, PartialOrd, Ord)]
pub struct FileRef(pub u32);

impl FileRef {
    pub const NONE: FileRef = FileRef(0);

    #[inline]
    pub fn exists(self) -> bool {
        self.0 != 0
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    pub fn data(self, gs: &GlobalState) -> &File {
        gs.file(self)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub path: String,
    pub source: String,
}

#[derive(Clone, Debug)]
pub struct FileTable {
    files: Vec<File>,
    by_path: FxHashMap<String, FileRef>,
    frozen: bool,
}

impl FileTable {
    /// An empty, frozen table. Slot 0 is filled by `GlobalState::init_empty`.
    pub fn new() -> Self {
        FileTable {
            files: Vec::new(),
            by_path: FxHashMap::default(),
            frozen: true,
        }
    }

    pub(crate) fn from_entries(files: Vec<File>) -> Self {
        let by_path = files
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, file)| (file.path.clone(), FileRef(i as u32)))
            .collect();
        FileTable {
            files,
            by_path,
            frozen: true,
        }
    }

    /// Enter a file, returning the existing handle if `path` was entered before.
    ///
    /// Re-entering a path with different contents is an internal error.
    pub fn enter(&mut self, path: &str, source: &str) -> FileRef {
        if let Some(&existing) = self.by_path.get(path) {
            assert!(
                self.files[existing.0 as usize].source == source,
                "file {path} re-entered with different contents"
            );
            return existing;
        }
        assert!(!self.frozen, "file table is frozen; cannot enter {path}");
        let file_ref = FileRef(self.files.len() as u32);
        self.files.push(File {
            path: path.to_string(),
            source: source.to_string(),
        });
        self.by_path.insert(path.to_string(), file_ref);
        file_ref
    }

    pub(crate) fn enter_sentinel(&mut self) {
        debug_assert!(self.files.is_empty());
        self.files.push(File {
            path: String::new(),
            source: String::new(),
        });
    }

    pub fn lookup(&self, path: &str) -> Option<FileRef> {
        self.by_path.get(path).copied()
    }

    #[inline]
    pub fn get(&self, file: FileRef) -> &File {
        debug_assert!(
            (file.0 as usize) < self.files.len(),
            "{file:?} does not belong to this file table"
        );
        &self.files[file.0 as usize]
    }

    pub fn entries(&self) -> &[File] {
        &self.files
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Set the frozen flag, returning the previous value.
    pub(crate) fn set_frozen(&mut self, frozen: bool) -> bool {
        std::mem::replace(&mut self.frozen, frozen)
    }
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}
