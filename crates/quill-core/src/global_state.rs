//! GlobalState - the name, symbol and file tables shared by a whole run.
//!
//! A GlobalState is either shared read-only (frozen, any number of readers)
//! or owned by exactly one worker that mutates it inside `Unfreeze*` guards.
//! Workers never share a mutable state: they `deep_copy` the canonical one,
//! mutate their copy, and the coordinator folds each copy back with a
//! `GlobalSubstitution`.
//!
//! Lineage: every state, copies included, draws an id from a process-wide
//! counter. A copy also inherits its origin's ancestry and appends one
//! `ForkPoint` for the origin itself: the origin's id and table sizes at the
//! moment of the copy. Two states that share an ancestor agree on every entry
//! below the smaller of their two extents in that ancestor, and that shared
//! prefix is what a substitution maps to itself.

use crate::files::{File, FileRef, FileTable};
use crate::loc::Loc;
use crate::local_variable::LocalVariable;
use crate::names::{BOOTSTRAP_CONSTANTS, BOOTSTRAP_UTF8, NameData, NameRef, NameTable, Names, UniqueNameKind};
use crate::serialize;
use crate::symbols::{
    BOOTSTRAP_CLASSES, Symbol, SymbolFlags, SymbolKind, SymbolRef, SymbolTable, Symbols, Variance,
};
use crate::unfreeze::{UnfreezeFileTable, UnfreezeNameTable, UnfreezeSymbolTable};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, trace};

/// Source of lineage ids, one per constructed or copied state.
static NEXT_LINEAGE: AtomicU32 = AtomicU32::new(1);

fn next_lineage() -> u32 {
    NEXT_LINEAGE.fetch_add(1, Ordering::Relaxed)
}

/// Table sizes of the state `lineage` at the moment a descendant split off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForkPoint {
    pub lineage: u32,
    pub names: usize,
    pub symbols: usize,
    pub files: usize,
}

impl ForkPoint {
    /// The entries both extents cover.
    fn meet(self, other: ForkPoint) -> ForkPoint {
        ForkPoint {
            lineage: self.lineage,
            names: self.names.min(other.names),
            symbols: self.symbols.min(other.symbols),
            files: self.files.min(other.files),
        }
    }
}

#[derive(Debug)]
pub struct GlobalState {
    pub(crate) names: NameTable,
    pub(crate) symbols: SymbolTable,
    pub(crate) files: FileTable,
    lineage: u32,
    /// Fork points of every ancestor, oldest first. Empty for an original.
    ancestry: Vec<ForkPoint>,
}

impl GlobalState {
    /// An empty state. Call `init_empty` (or load a payload) before interning anything.
    pub fn new() -> Self {
        GlobalState {
            names: NameTable::new(),
            symbols: SymbolTable::new(),
            files: FileTable::new(),
            lineage: next_lineage(),
            ancestry: Vec::new(),
        }
    }

    /// Enter the bootstrap content: sentinels, well-known names and classes.
    pub fn init_empty(&mut self) {
        assert!(
            self.names.is_empty() && self.symbols.is_empty() && self.files.is_empty(),
            "init_empty called on a GlobalState that already has content"
        );

        let mut files = UnfreezeFileTable::new(self);
        files.files.enter_sentinel();
        let mut names = UnfreezeNameTable::new(&mut files);
        let empty = names.names.enter_utf8("");
        debug_assert_eq!(empty, Names::EMPTY);
        for text in BOOTSTRAP_UTF8 {
            names.names.enter_utf8(text);
        }
        for &original in BOOTSTRAP_CONSTANTS {
            names.names.enter_constant(original);
        }
        assert_eq!(names.names.len(), Names::BOOTSTRAP_COUNT);

        let mut symbols = UnfreezeSymbolTable::new(&mut names);
        symbols.symbols.enter_sentinels();
        for &(name, superclass) in BOOTSTRAP_CLASSES {
            let class = symbols.symbols.enter(
                Loc::none(),
                Symbols::ROOT,
                name,
                SymbolKind::Class,
                Variance::Invariant,
            );
            if let Some(superclass) = superclass {
                symbols.symbols.set_superclass(class, superclass);
            }
        }
        assert_eq!(symbols.symbols.len(), Symbols::BOOTSTRAP_COUNT);
        debug!(
            lineage = symbols.lineage,
            names = symbols.names.len(),
            symbols = symbols.symbols.len(),
            "initialized empty global state"
        );
    }

    /// A fully independent copy with identical content.
    ///
    /// Every handle valid in `self` stays valid, with the same meaning, in the
    /// copy. The copy starts with all tables frozen and gets its own lineage.
    pub fn deep_copy(&self) -> GlobalState {
        let mut ancestry = Vec::with_capacity(self.ancestry.len() + 1);
        ancestry.extend_from_slice(&self.ancestry);
        ancestry.push(self.extent());
        let mut copy = GlobalState {
            names: self.names.clone(),
            symbols: self.symbols.clone(),
            files: self.files.clone(),
            lineage: next_lineage(),
            ancestry,
        };
        copy.names.set_frozen(true);
        copy.symbols.set_frozen(true);
        copy.files.set_frozen(true);
        debug!(
            lineage = self.lineage,
            copy = copy.lineage,
            names = self.names.len(),
            symbols = self.symbols.len(),
            files = self.files.len(),
            "deep copied global state"
        );
        copy
    }

    /// Replace the tables wholesale with loaded ones.
    pub(crate) fn install_tables(&mut self, names: NameTable, symbols: SymbolTable, files: FileTable) {
        self.names = names;
        self.symbols = symbols;
        self.files = files;
    }

    // =========================================================================
    // Lineage and table state
    // =========================================================================

    #[inline]
    pub fn lineage(&self) -> u32 {
        self.lineage
    }

    /// Where this state split off from the state it was copied from. `None`
    /// unless it was produced by `deep_copy`.
    #[inline]
    pub fn fork_point(&self) -> Option<ForkPoint> {
        self.ancestry.last().copied()
    }

    /// Fork points of every ancestor, oldest first.
    pub fn ancestry(&self) -> &[ForkPoint] {
        &self.ancestry
    }

    /// Current table sizes, tagged with this state's lineage.
    pub fn extent(&self) -> ForkPoint {
        ForkPoint {
            lineage: self.lineage,
            names: self.names.len(),
            symbols: self.symbols.len(),
            files: self.files.len(),
        }
    }

    /// How much of the state `lineage` this state still agrees with, if it is
    /// that state or one of its descendants.
    fn extent_in(&self, lineage: u32) -> Option<ForkPoint> {
        if lineage == self.lineage {
            return Some(self.extent());
        }
        self.ancestry.iter().copied().find(|fork| fork.lineage == lineage)
    }

    /// The prefix of entries `self` and `other` provably share: the meet of
    /// their extents in their nearest common ancestor. `None` when the two
    /// states are unrelated.
    pub fn shared_prefix(&self, other: &GlobalState) -> Option<ForkPoint> {
        std::iter::once(self.lineage)
            .chain(self.ancestry.iter().rev().map(|fork| fork.lineage))
            .find_map(|lineage| {
                let mine = self.extent_in(lineage)?;
                let theirs = other.extent_in(lineage)?;
                Some(mine.meet(theirs))
            })
    }

    pub fn is_name_table_frozen(&self) -> bool {
        self.names.is_frozen()
    }

    pub fn is_symbol_table_frozen(&self) -> bool {
        self.symbols.is_frozen()
    }

    pub fn is_file_table_frozen(&self) -> bool {
        self.files.is_frozen()
    }

    pub fn is_initialized(&self) -> bool {
        !self.names.is_empty()
    }

    fn assert_initialized(&self) {
        assert!(self.is_initialized(), "GlobalState used before init_empty");
    }

    pub fn names_used(&self) -> usize {
        self.names.len()
    }

    pub fn symbols_used(&self) -> usize {
        self.symbols.len()
    }

    /// Total number of symbols, used to compare the shape of two states.
    pub fn all_symbols_used(&self) -> usize {
        self.symbols.len()
    }

    pub fn files_used(&self) -> usize {
        self.files.len()
    }

    pub fn names(&self) -> &NameTable {
        &self.names
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn files(&self) -> &FileTable {
        &self.files
    }

    // =========================================================================
    // Names
    // =========================================================================

    pub fn enter_name_utf8(&mut self, text: &str) -> NameRef {
        self.assert_initialized();
        let name = self.names.enter_utf8(text);
        trace!(name = name.0, text, "entered utf8 name");
        name
    }

    pub fn enter_name_constant(&mut self, original: NameRef) -> NameRef {
        self.assert_initialized();
        self.names.enter_constant(original)
    }

    pub fn enter_name_unique(&mut self, kind: UniqueNameKind, original: NameRef, num: u32) -> NameRef {
        self.assert_initialized();
        self.names.enter_unique(kind, original, num)
    }

    pub fn lookup_name_utf8(&self, text: &str) -> Option<NameRef> {
        self.names.lookup_utf8(text)
    }

    pub fn lookup_name_constant(&self, original: NameRef) -> Option<NameRef> {
        self.names.lookup_constant(original)
    }

    #[inline]
    pub fn name_data(&self, name: NameRef) -> &NameData {
        self.names.get(name)
    }

    // =========================================================================
    // Symbols
    // =========================================================================

    pub(crate) fn enter_symbol(
        &mut self,
        loc: Loc,
        owner: SymbolRef,
        name: NameRef,
        kind: SymbolKind,
        variance: Variance,
    ) -> SymbolRef {
        self.assert_initialized();
        debug_assert!(
            (name.0 as usize) < self.names.len(),
            "{name:?} does not belong to this GlobalState"
        );
        let sym = self.symbols.enter(loc, owner, name, kind, variance);
        trace!(symbol = sym.0, owner = owner.0, kind = kind.as_str(), "entered symbol");
        sym
    }

    pub fn enter_class_symbol(&mut self, loc: Loc, owner: SymbolRef, name: NameRef) -> SymbolRef {
        self.enter_symbol(loc, owner, name, SymbolKind::Class, Variance::Invariant)
    }

    pub fn enter_method_symbol(&mut self, loc: Loc, owner: SymbolRef, name: NameRef) -> SymbolRef {
        self.enter_symbol(loc, owner, name, SymbolKind::Method, Variance::Invariant)
    }

    pub fn enter_field_symbol(&mut self, loc: Loc, owner: SymbolRef, name: NameRef) -> SymbolRef {
        self.enter_symbol(loc, owner, name, SymbolKind::Field, Variance::Invariant)
    }

    pub fn enter_static_field_symbol(&mut self, loc: Loc, owner: SymbolRef, name: NameRef) -> SymbolRef {
        self.enter_symbol(loc, owner, name, SymbolKind::StaticField, Variance::Invariant)
    }

    /// Enter a type member of class `owner`.
    pub fn enter_type_member(
        &mut self,
        loc: Loc,
        owner: SymbolRef,
        name: NameRef,
        variance: Variance,
    ) -> SymbolRef {
        self.enter_symbol(loc, owner, name, SymbolKind::TypeMember, variance)
    }

    /// Enter a type argument of method `owner`.
    pub fn enter_type_argument(
        &mut self,
        loc: Loc,
        owner: SymbolRef,
        name: NameRef,
        variance: Variance,
    ) -> SymbolRef {
        self.enter_symbol(loc, owner, name, SymbolKind::TypeArgument, variance)
    }

    #[inline]
    pub fn symbol(&self, sym: SymbolRef) -> &Symbol {
        self.symbols.get(sym)
    }

    pub fn find_member(&self, owner: SymbolRef, name: NameRef, kind: SymbolKind) -> Option<SymbolRef> {
        self.symbols.get(owner).find_member(name, kind)
    }

    pub fn add_symbol_loc(&mut self, sym: SymbolRef, loc: Loc) {
        self.symbols.add_loc(sym, loc);
    }

    pub fn add_symbol_flags(&mut self, sym: SymbolRef, flags: SymbolFlags) {
        self.symbols.add_flags(sym, flags);
    }

    pub fn set_superclass(&mut self, class: SymbolRef, superclass: SymbolRef) {
        self.symbols.set_superclass(class, superclass);
    }

    pub fn add_mixin(&mut self, class: SymbolRef, mixin: SymbolRef) {
        self.symbols.add_mixin(class, mixin);
    }

    pub fn add_method_argument(&mut self, method: SymbolRef, argument: LocalVariable) {
        debug_assert!(
            (argument.name.0 as usize) < self.names.len(),
            "{argument:?} does not belong to this GlobalState"
        );
        self.symbols.add_argument(method, argument);
    }

    /// Fully qualified name: `A::B` for classes, `A::B#m` for methods.
    pub fn full_name(&self, sym: SymbolRef) -> String {
        let data = self.symbol(sym);
        let name = self.names.show(data.name);
        if !sym.exists() || sym == Symbols::ROOT || data.owner == Symbols::ROOT {
            return name;
        }
        format!(
            "{}{}{}",
            self.full_name(data.owner),
            data.kind.separator(),
            name
        )
    }

    // =========================================================================
    // Files
    // =========================================================================

    pub fn enter_file(&mut self, path: &str, source: &str) -> FileRef {
        self.assert_initialized();
        self.files.enter(path, source)
    }

    #[inline]
    pub fn file(&self, file: FileRef) -> &File {
        self.files.get(file)
    }

    // =========================================================================
    // Debugging
    // =========================================================================

    /// Check every table invariant, panicking on the first violation.
    pub fn sanity_check(&self) {
        if let Err(err) = serialize::validate_tables(
            self.names.entries(),
            self.symbols.entries(),
            self.files.entries(),
        ) {
            panic!("GlobalState {} is inconsistent: {err}", self.lineage);
        }
    }
}

impl Default for GlobalState {
    fn default() -> Self {
        Self::new()
    }
}
