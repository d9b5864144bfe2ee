//! Context handed to every tree rewrite.

use crate::files::FileRef;
use crate::global_state::GlobalState;
use crate::loc::{Loc, LocOffsets};
use crate::symbols::SymbolRef;
use std::ops::{Deref, DerefMut};

/// Exclusive access to a GlobalState plus the position of the rewrite:
/// the symbol currently enclosing the code and the file being processed.
pub struct MutableContext<'a> {
    pub state: &'a mut GlobalState,
    pub owner: SymbolRef,
    pub file: FileRef,
}

impl<'a> MutableContext<'a> {
    pub fn new(state: &'a mut GlobalState, owner: SymbolRef, file: FileRef) -> Self {
        MutableContext { state, owner, file }
    }

    /// Reborrow with a different enclosing symbol.
    pub fn with_owner(&mut self, owner: SymbolRef) -> MutableContext<'_> {
        MutableContext {
            state: &mut *self.state,
            owner,
            file: self.file,
        }
    }

    /// A loc in the current file.
    pub fn loc(&self, offsets: LocOffsets) -> Loc {
        Loc::from_offsets(self.file, offsets)
    }
}

impl Deref for MutableContext<'_> {
    type Target = GlobalState;

    fn deref(&self) -> &GlobalState {
        self.state
    }
}

impl DerefMut for MutableContext<'_> {
    fn deref_mut(&mut self) -> &mut GlobalState {
        self.state
    }
}
