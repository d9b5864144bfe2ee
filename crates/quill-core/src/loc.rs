//! Source locations.
//!
//! A `Loc` is purely descriptive: it never takes part in the identity of a
//! name or symbol, it only rides along for diagnostics.

use crate::files::FileRef;
use crate::global_state::GlobalState;
use serde::{Deserialize, Serialize};

/// Byte offsets within a single file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct LocOffsets {
    pub begin: u32,
    pub end: u32,
}

impl LocOffsets {
    pub const NONE: LocOffsets = LocOffsets {
        begin: u32::MAX,
        end: u32::MAX,
    };

    #[inline]
    pub fn exists(self) -> bool {
        self.begin != u32::MAX
    }

    #[inline]
    pub fn len(self) -> u32 {
        self.end.saturating_sub(self.begin)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}

/// A (file, begin, end) triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Loc {
    pub file: FileRef,
    pub begin: u32,
    pub end: u32,
}

impl Loc {
    pub fn new(file: FileRef, begin: u32, end: u32) -> Self {
        debug_assert!(begin <= end, "loc begins after it ends: {begin}..{end}");
        Loc { file, begin, end }
    }

    pub const fn none() -> Self {
        Loc {
            file: FileRef::NONE,
            begin: u32::MAX,
            end: u32::MAX,
        }
    }

    pub fn from_offsets(file: FileRef, offsets: LocOffsets) -> Self {
        Loc {
            file,
            begin: offsets.begin,
            end: offsets.end,
        }
    }

    #[inline]
    pub fn exists(self) -> bool {
        self.file.exists() && self.begin != u32::MAX
    }

    #[inline]
    pub fn file(self) -> FileRef {
        self.file
    }

    #[inline]
    pub fn offsets(self) -> LocOffsets {
        LocOffsets {
            begin: self.begin,
            end: self.end,
        }
    }

    /// Smallest loc covering both. A missing side yields the other.
    pub fn join(self, other: Loc) -> Loc {
        if !self.exists() {
            return other;
        }
        if !other.exists() {
            return self;
        }
        debug_assert_eq!(self.file, other.file, "cannot join locs from different files");
        Loc {
            file: self.file,
            begin: self.begin.min(other.begin),
            end: self.end.max(other.end),
        }
    }

    /// The covered source text, or "" when unavailable.
    pub fn source<'gs>(self, gs: &'gs GlobalState) -> &'gs str {
        if !self.exists() {
            return "";
        }
        gs.file(self.file)
            .source
            .get(self.begin as usize..self.end as usize)
            .unwrap_or("")
    }

    /// `path:begin-end`, or `???` for a missing loc.
    pub fn show(self, gs: &GlobalState) -> String {
        if !self.exists() {
            return "???".to_string();
        }
        format!("{}:{}-{}", gs.file(self.file).path, self.begin, self.end)
    }
}

impl Default for Loc {
    fn default() -> Self {
        Loc::none()
    }
}
