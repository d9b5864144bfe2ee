//! Method-local variables.

use crate::global_state::GlobalState;
use crate::names::NameRef;
use serde::{Deserialize, Serialize};

/// A local variable: its name plus a disambiguator for shadowed locals.
///
/// `unique == 0` is the variable as written; blocks that shadow it get fresh
/// non-zero numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct LocalVariable {
    pub name: NameRef,
    pub unique: u32,
}

impl LocalVariable {
    pub const fn new(name: NameRef, unique: u32) -> Self {
        LocalVariable { name, unique }
    }

    pub const fn none() -> Self {
        LocalVariable {
            name: NameRef::NONE,
            unique: 0,
        }
    }

    #[inline]
    pub fn exists(self) -> bool {
        self.name.exists()
    }

    pub fn show(self, gs: &GlobalState) -> String {
        if self.unique == 0 {
            self.name.show(gs)
        } else {
            format!("{}${}", self.name.show(gs), self.unique)
        }
    }

    pub fn show_raw(self, gs: &GlobalState) -> String {
        format!("{}${}", self.name.show_raw(gs), self.unique)
    }
}
