//! Shared analysis state for the quill front end.
//!
//! This crate owns everything later passes refer to by handle:
//! - Name interning (`NameRef`, `NameTable`, `Names`)
//! - The hierarchical symbol table (`SymbolRef`, `SymbolTable`, `Symbols`)
//! - Source files and locations (`FileRef`, `Loc`)
//! - `GlobalState`, its freeze discipline (`UnfreezeNameTable` and friends) and `deep_copy`
//! - `GlobalSubstitution`, which folds a forked state back into its origin
//! - Payload loading/storing for prebuilt states

// Source files and byte-offset locations
pub mod files;
pub use files::{File, FileRef, FileTable};
pub mod loc;
pub use loc::{Loc, LocOffsets};

// Name interning
pub mod names;
pub use names::{NameData, NameKind, NameRef, NameTable, Names, UniqueNameKind};
#[cfg(test)]
#[path = "tests/names_tests.rs"]
mod names_tests;

// Method-local variables
pub mod local_variable;
pub use local_variable::LocalVariable;

// Symbol table
pub mod symbols;
pub use symbols::{Symbol, SymbolFlags, SymbolKind, SymbolRef, SymbolTable, Symbols, Variance};
#[cfg(test)]
#[path = "tests/symbols_tests.rs"]
mod symbols_tests;

// GlobalState and its scoped mutation guards
pub mod global_state;
pub use global_state::{ForkPoint, GlobalState};
pub mod unfreeze;
pub use unfreeze::{UnfreezeFileTable, UnfreezeNameTable, UnfreezeSymbolTable};

// Per-pass context handed to tree rewrites
pub mod context;
pub use context::MutableContext;

// Cross-state handle remapping
pub mod substitution;
pub use substitution::{GlobalSubstitution, Substitutable};

// Payload (de)serialization
pub mod serialize;
pub use serialize::{PayloadError, load_global_state, store_global_state};
