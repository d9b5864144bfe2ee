//! Symbol table.
//!
//! Symbols form a tree: every symbol except the root has exactly one owner,
//! and the owner always has a smaller index than the symbols it owns. All
//! cross references (owner, name, superclass, ...) are plain indices, so
//! cloning the table is a flat copy of the arena.
//!
//! A symbol's identity is `(owner, name, kind)`. Kinds partition the
//! namespace: a method `foo` and a field `foo` under the same class are two
//! symbols. Identity is fixed at creation; only the payload (locations,
//! flags, superclass, mixins, method arguments) grows afterwards, and only
//! while the table is unfrozen.

use crate::global_state::GlobalState;
use crate::loc::Loc;
use crate::local_variable::LocalVariable;
use crate::names::{NameRef, Names};
use bitflags::bitflags;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Handle to a symbol. Index 0 is the "no symbol" sentinel, index 1 the root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, PartialOrd, Ord)]
pub struct SymbolRef(pub u32);

impl SymbolRef {
    #[inline]
    pub fn exists(self) -> bool {
        self.0 != 0
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    pub fn data(self, gs: &GlobalState) -> &Symbol {
        gs.symbol(self)
    }

    /// Fully qualified name, e.g. `Foo::Bar#baz`.
    pub fn show(self, gs: &GlobalState) -> String {
        gs.full_name(self)
    }

    pub fn show_raw(self, gs: &GlobalState) -> String {
        let sym = gs.symbol(self);
        format!(
            "{}({}, {})",
            sym.kind.as_str(),
            gs.full_name(self),
            sym.name.show_raw(gs)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Class,
    Method,
    Field,
    StaticField,
    TypeMember,
    TypeArgument,
}

impl SymbolKind {
    /// Whether a symbol of this kind may own a symbol of kind `child`.
    pub fn can_own(self, child: SymbolKind) -> bool {
        match child {
            SymbolKind::Class
            | SymbolKind::Method
            | SymbolKind::Field
            | SymbolKind::StaticField
            | SymbolKind::TypeMember => self == SymbolKind::Class,
            SymbolKind::TypeArgument => self == SymbolKind::Method,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Method => "method",
            SymbolKind::Field => "field",
            SymbolKind::StaticField => "static-field",
            SymbolKind::TypeMember => "type-member",
            SymbolKind::TypeArgument => "type-argument",
        }
    }

    pub(crate) fn separator(self) -> &'static str {
        match self {
            SymbolKind::Class | SymbolKind::StaticField => "::",
            SymbolKind::Method | SymbolKind::Field => "#",
            SymbolKind::TypeMember | SymbolKind::TypeArgument => "::",
        }
    }
}

/// Variance of a type member or type argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Variance {
    #[default]
    Invariant,
    CoVariant,
    ContraVariant,
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SymbolFlags: u32 {
        const MODULE = 1 << 0;
        const ABSTRACT = 1 << 1;
        const FINAL = 1 << 2;
        const PRIVATE = 1 << 3;
        const PROTECTED = 1 << 4;
        const OVERLOADED = 1 << 5;
        const SEALED = 1 << 6;
    }
}

type MemberMap = IndexMap<(NameRef, SymbolKind), SymbolRef, FxBuildHasher>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub owner: SymbolRef,
    pub name: NameRef,
    pub kind: SymbolKind,
    pub flags: SymbolFlags,
    /// Every location this symbol was declared at, without duplicates.
    pub locs: SmallVec<[Loc; 2]>,
    /// Classes only; "no symbol" when unset.
    pub superclass: SymbolRef,
    /// Classes only.
    pub mixins: Vec<SymbolRef>,
    /// Methods only, in declaration order.
    pub arguments: Vec<LocalVariable>,
    /// Type members and type arguments only.
    pub variance: Variance,
    /// Owned symbols by identity, in creation order. Derived from `owner`
    /// links, so payloads do not carry it.
    #[serde(skip)]
    pub(crate) members: MemberMap,
}

impl Symbol {
    fn new(owner: SymbolRef, name: NameRef, kind: SymbolKind, variance: Variance) -> Self {
        Symbol {
            owner,
            name,
            kind,
            flags: SymbolFlags::empty(),
            locs: SmallVec::new(),
            superclass: SymbolRef(0),
            mixins: Vec::new(),
            arguments: Vec::new(),
            variance,
            members: MemberMap::default(),
        }
    }

    #[inline]
    pub fn is_class(&self) -> bool {
        self.kind == SymbolKind::Class
    }

    #[inline]
    pub fn is_method(&self) -> bool {
        self.kind == SymbolKind::Method
    }

    #[inline]
    pub fn is_type_parameter(&self) -> bool {
        matches!(self.kind, SymbolKind::TypeMember | SymbolKind::TypeArgument)
    }

    /// First declaration location, if any.
    pub fn loc(&self) -> Loc {
        self.locs.first().copied().unwrap_or_default()
    }

    pub fn members(&self) -> impl Iterator<Item = SymbolRef> + '_ {
        self.members.values().copied()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn find_member(&self, name: NameRef, kind: SymbolKind) -> Option<SymbolRef> {
        self.members.get(&(name, kind)).copied()
    }

    /// Type members of a class or type arguments of a method, in declaration order.
    pub fn type_parameters(&self) -> impl Iterator<Item = SymbolRef> + '_ {
        self.members
            .iter()
            .filter(|((_, kind), _)| {
                matches!(kind, SymbolKind::TypeMember | SymbolKind::TypeArgument)
            })
            .map(|(_, &sym)| sym)
    }
}

/// Append-only symbol arena.
#[derive(Clone, Debug)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    frozen: bool,
}

impl SymbolTable {
    /// An empty, frozen table. Bootstrap symbols come from `GlobalState::init_empty`.
    pub fn new() -> Self {
        SymbolTable {
            symbols: Vec::new(),
            frozen: true,
        }
    }

    /// Rebuild a table from already validated entries, re-deriving member maps.
    pub(crate) fn from_entries(symbols: Vec<Symbol>) -> Self {
        let mut table = SymbolTable {
            symbols,
            frozen: true,
        };
        for i in 1..table.symbols.len() {
            let sym = &table.symbols[i];
            if !sym.owner.exists() {
                continue;
            }
            let key = (sym.name, sym.kind);
            let owner = sym.owner.0 as usize;
            table.symbols[owner]
                .members
                .insert(key, SymbolRef(i as u32));
        }
        table
    }

    /// Enter the two sentinels: "no symbol" at 0 and the root at 1.
    pub(crate) fn enter_sentinels(&mut self) {
        debug_assert!(self.symbols.is_empty());
        self.symbols.push(Symbol::new(
            SymbolRef(0),
            Names::NO_SYMBOL,
            SymbolKind::Class,
            Variance::Invariant,
        ));
        self.symbols.push(Symbol::new(
            SymbolRef(0),
            Names::CONSTANT_ROOT,
            SymbolKind::Class,
            Variance::Invariant,
        ));
    }

    /// Find or create the symbol `(owner, name, kind)`.
    ///
    /// Panics if the owner does not exist in this table, if the owner's kind
    /// cannot hold `kind`, or if a new entry is needed while frozen.
    pub fn enter(
        &mut self,
        loc: Loc,
        owner: SymbolRef,
        name: NameRef,
        kind: SymbolKind,
        variance: Variance,
    ) -> SymbolRef {
        assert!(
            owner.exists() && (owner.0 as usize) < self.symbols.len(),
            "owner {owner:?} of new {} does not exist",
            kind.as_str()
        );
        let owner_kind = self.symbols[owner.0 as usize].kind;
        assert!(
            owner_kind.can_own(kind),
            "a {} cannot own a {}",
            owner_kind.as_str(),
            kind.as_str()
        );

        if let Some(existing) = self.symbols[owner.0 as usize].find_member(name, kind) {
            assert!(
                self.symbols[existing.0 as usize].variance == variance,
                "{existing:?} re-entered with a different variance"
            );
            return existing;
        }

        assert!(
            !self.frozen,
            "symbol table is frozen; cannot enter {}",
            kind.as_str()
        );
        let sym = SymbolRef(self.symbols.len() as u32);
        let mut data = Symbol::new(owner, name, kind, variance);
        if loc.exists() {
            data.locs.push(loc);
        }
        self.symbols.push(data);
        self.symbols[owner.0 as usize]
            .members
            .insert((name, kind), sym);
        sym
    }

    #[inline]
    pub fn get(&self, sym: SymbolRef) -> &Symbol {
        debug_assert!(
            (sym.0 as usize) < self.symbols.len(),
            "{sym:?} does not belong to this symbol table"
        );
        &self.symbols[sym.0 as usize]
    }

    fn get_mut(&mut self, sym: SymbolRef, what: &str) -> &mut Symbol {
        assert!(!self.frozen, "symbol table is frozen; cannot {what}");
        assert!(
            (sym.0 as usize) < self.symbols.len(),
            "{sym:?} does not exist; cannot {what}"
        );
        &mut self.symbols[sym.0 as usize]
    }

    fn assert_class(&self, sym: SymbolRef) {
        assert!(
            (sym.0 as usize) < self.symbols.len() && self.symbols[sym.0 as usize].is_class(),
            "{sym:?} is not a class"
        );
    }

    pub fn add_loc(&mut self, sym: SymbolRef, loc: Loc) {
        if !loc.exists() {
            return;
        }
        let data = self.get_mut(sym, "add a location");
        if !data.locs.contains(&loc) {
            data.locs.push(loc);
        }
    }

    pub fn add_flags(&mut self, sym: SymbolRef, flags: SymbolFlags) {
        self.get_mut(sym, "set flags").flags |= flags;
    }

    pub fn set_superclass(&mut self, class: SymbolRef, superclass: SymbolRef) {
        self.assert_class(class);
        self.assert_class(superclass);
        assert!(class != superclass, "{class:?} cannot be its own superclass");
        self.get_mut(class, "set a superclass").superclass = superclass;
    }

    pub fn add_mixin(&mut self, class: SymbolRef, mixin: SymbolRef) {
        self.assert_class(class);
        self.assert_class(mixin);
        let data = self.get_mut(class, "add a mixin");
        if !data.mixins.contains(&mixin) {
            data.mixins.push(mixin);
        }
    }

    pub fn add_argument(&mut self, method: SymbolRef, argument: LocalVariable) {
        let data = self.get_mut(method, "add a method argument");
        assert!(data.is_method(), "{method:?} is not a method");
        data.arguments.push(argument);
    }

    pub fn entries(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolRef, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, sym)| (SymbolRef(i as u32), sym))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
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

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Classes `init_empty` enters under the root after the sentinels, in index
/// order, with their superclass.
pub(crate) const BOOTSTRAP_CLASSES: &[(NameRef, Option<SymbolRef>)] = &[
    (Names::CONSTANT_TODO, None),
    (Names::CONSTANT_BASIC_OBJECT, None),
    (Names::CONSTANT_OBJECT, Some(Symbols::BASIC_OBJECT)),
    (Names::CONSTANT_INTEGER, Some(Symbols::OBJECT)),
    (Names::CONSTANT_FLOAT, Some(Symbols::OBJECT)),
    (Names::CONSTANT_STRING, Some(Symbols::OBJECT)),
    (Names::CONSTANT_SYMBOL, Some(Symbols::OBJECT)),
    (Names::CONSTANT_NIL_CLASS, Some(Symbols::OBJECT)),
    (Names::CONSTANT_TRUE_CLASS, Some(Symbols::OBJECT)),
    (Names::CONSTANT_FALSE_CLASS, Some(Symbols::OBJECT)),
    (Names::CONSTANT_ARRAY, Some(Symbols::OBJECT)),
    (Names::CONSTANT_HASH, Some(Symbols::OBJECT)),
];

/// Well-known symbols, valid in every GlobalState after `init_empty`.
pub struct Symbols;

impl Symbols {
    pub const NO_SYMBOL: SymbolRef = SymbolRef(0);
    pub const ROOT: SymbolRef = SymbolRef(1);
    pub const TODO: SymbolRef = SymbolRef(2);
    pub const BASIC_OBJECT: SymbolRef = SymbolRef(3);
    pub const OBJECT: SymbolRef = SymbolRef(4);
    pub const INTEGER: SymbolRef = SymbolRef(5);
    pub const FLOAT: SymbolRef = SymbolRef(6);
    pub const STRING: SymbolRef = SymbolRef(7);
    pub const SYMBOL: SymbolRef = SymbolRef(8);
    pub const NIL_CLASS: SymbolRef = SymbolRef(9);
    pub const TRUE_CLASS: SymbolRef = SymbolRef(10);
    pub const FALSE_CLASS: SymbolRef = SymbolRef(11);
    pub const ARRAY: SymbolRef = SymbolRef(12);
    pub const HASH: SymbolRef = SymbolRef(13);

    /// Number of symbols present right after `init_empty`.
    pub const BOOTSTRAP_COUNT: usize = 14;

    #[inline]
    pub const fn no_symbol() -> SymbolRef {
        Self::NO_SYMBOL
    }

    #[inline]
    pub const fn root() -> SymbolRef {
        Self::ROOT
    }

    #[inline]
    pub const fn todo() -> SymbolRef {
        Self::TODO
    }
}
