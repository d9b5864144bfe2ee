//! Scoped permission to mutate a GlobalState table.
//!
//! Tables are frozen by default. A guard unfreezes one table for as long as
//! it lives and refreezes it when dropped, on every exit path including
//! early returns and unwinding panics. Guards deref to the GlobalState, so
//! they stack:
//!
//! ```
//! use quill_core::{GlobalState, UnfreezeNameTable, UnfreezeSymbolTable};
//!
//! let mut gs = GlobalState::new();
//! gs.init_empty();
//! {
//!     let mut names = UnfreezeNameTable::new(&mut gs);
//!     let mut symbols = UnfreezeSymbolTable::new(&mut names);
//!     let foo = symbols.enter_name_utf8("Foo");
//!     assert!(foo.exists());
//! }
//! assert!(gs.is_name_table_frozen());
//! ```
//!
//! Unfreezing a table that is already unfrozen is an internal error: guards
//! on the same table do not nest.

use crate::global_state::GlobalState;
use std::ops::{Deref, DerefMut};

macro_rules! unfreeze_guard {
    ($(#[$doc:meta])* $guard:ident, $table:ident, $what:literal) => {
        $(#[$doc])*
        pub struct $guard<'a> {
            gs: &'a mut GlobalState,
        }

        impl<'a> $guard<'a> {
            pub fn new(gs: &'a mut GlobalState) -> Self {
                let was_frozen = gs.$table.set_frozen(false);
                assert!(
                    was_frozen,
                    concat!($what, " table is already unfrozen; ", stringify!($guard), " guards do not nest")
                );
                $guard { gs }
            }
        }

        impl Deref for $guard<'_> {
            type Target = GlobalState;

            fn deref(&self) -> &GlobalState {
                self.gs
            }
        }

        impl DerefMut for $guard<'_> {
            fn deref_mut(&mut self) -> &mut GlobalState {
                self.gs
            }
        }

        impl Drop for $guard<'_> {
            fn drop(&mut self) {
                self.gs.$table.set_frozen(true);
            }
        }
    };
}

unfreeze_guard!(
    /// Allows new names to be interned while alive.
    UnfreezeNameTable,
    names,
    "name"
);

unfreeze_guard!(
    /// Allows new symbols (and symbol payload changes) while alive.
    UnfreezeSymbolTable,
    symbols,
    "symbol"
);

unfreeze_guard!(
    /// Allows new files to be entered while alive.
    UnfreezeFileTable,
    files,
    "file"
);
