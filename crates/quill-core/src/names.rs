//! Name interning.
//!
//! Every identifier the front end sees is interned once into the `NameTable`
//! and then passed around as a `NameRef` (a u32). Comparing two names is an
//! integer comparison; to get the text back, go through the owning
//! `GlobalState`.
//!
//! There are three kinds of names:
//! - UTF8 names hold raw identifier text.
//! - Constant names wrap a UTF8 (or unique) name and denote class/module-style
//!   identifiers. `Foo` the method and `Foo` the class are different names.
//! - Unique names are fresh names derived from an existing one, used by passes
//!   that need temporaries which can never collide with user identifiers.
//!
//! The table is append-only: an entry is never removed or changed once created.

use crate::global_state::GlobalState;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// An interned name.
///
/// Only meaningful relative to the GlobalState (or a fork of it) that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, PartialOrd, Ord)]
pub struct NameRef(pub u32);

impl NameRef {
    /// The empty name, reserved at index 0.
    pub const NONE: NameRef = NameRef(0);

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn exists(self) -> bool {
        self.0 != 0
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    pub fn data(self, gs: &GlobalState) -> &NameData {
        gs.name_data(self)
    }

    pub fn kind(self, gs: &GlobalState) -> NameKind {
        gs.name_data(self).kind()
    }

    /// User-facing text of this name.
    pub fn show(self, gs: &GlobalState) -> String {
        gs.names().show(self)
    }

    /// Structural form, e.g. `<U foo>` or `<C <U Foo>>`.
    pub fn show_raw(self, gs: &GlobalState) -> String {
        gs.names().show_raw(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NameKind {
    Utf8,
    Unique,
    Constant,
}

/// Which pass minted a unique name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UniqueNameKind {
    Parser,
    Desugar,
    Namer,
    TypeVarName,
}

impl UniqueNameKind {
    fn raw_tag(self) -> char {
        match self {
            UniqueNameKind::Parser => 'P',
            UniqueNameKind::Desugar => 'D',
            UniqueNameKind::Namer => 'N',
            UniqueNameKind::TypeVarName => 'T',
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NameData {
    Utf8(Box<str>),
    Unique {
        kind: UniqueNameKind,
        original: NameRef,
        num: u32,
    },
    Constant {
        original: NameRef,
    },
}

impl NameData {
    pub fn kind(&self) -> NameKind {
        match self {
            NameData::Utf8(_) => NameKind::Utf8,
            NameData::Unique { .. } => NameKind::Unique,
            NameData::Constant { .. } => NameKind::Constant,
        }
    }

    /// The name this one was derived from, for constant and unique names.
    pub fn original(&self) -> Option<NameRef> {
        match self {
            NameData::Utf8(_) => None,
            NameData::Unique { original, .. } | NameData::Constant { original } => Some(*original),
        }
    }
}

/// Append-only name arena with deduplicating lookup.
#[derive(Clone, Debug)]
pub struct NameTable {
    /// All names; index is the NameRef.
    names: Vec<NameData>,
    /// Map from UTF8 text to name.
    utf8: FxHashMap<Box<str>, NameRef>,
    /// Map from derived (constant/unique) name data to name.
    derived: FxHashMap<NameData, NameRef>,
    frozen: bool,
}

impl NameTable {
    /// An empty, frozen table. The empty name is entered by `GlobalState::init_empty`.
    pub fn new() -> Self {
        NameTable {
            names: Vec::new(),
            utf8: FxHashMap::default(),
            derived: FxHashMap::default(),
            frozen: true,
        }
    }

    /// Rebuild a table (and its lookup maps) from already validated entries.
    pub(crate) fn from_entries(names: Vec<NameData>) -> Self {
        let mut table = NameTable {
            names: Vec::with_capacity(names.len()),
            utf8: FxHashMap::default(),
            derived: FxHashMap::default(),
            frozen: false,
        };
        for data in names {
            table.push(data);
        }
        table.frozen = true;
        table
    }

    /// Intern UTF8 text.
    ///
    /// Existing text is returned even while frozen; creating a new entry
    /// while frozen is an internal error.
    pub fn enter_utf8(&mut self, text: &str) -> NameRef {
        if let Some(&name) = self.utf8.get(text) {
            return name;
        }
        assert!(!self.frozen, "name table is frozen; cannot enter {text:?}");
        self.push(NameData::Utf8(text.into()))
    }

    /// Intern the constant form of `original`.
    pub fn enter_constant(&mut self, original: NameRef) -> NameRef {
        self.assert_exists(original);
        assert!(
            self.names[original.0 as usize].kind() != NameKind::Constant,
            "cannot make a constant out of constant name {original:?}"
        );
        self.enter_derived(NameData::Constant { original })
    }

    /// Intern a unique name derived from `original`. `num` must be positive.
    pub fn enter_unique(&mut self, kind: UniqueNameKind, original: NameRef, num: u32) -> NameRef {
        self.assert_exists(original);
        assert!(num > 0, "unique name numbers start at 1");
        self.enter_derived(NameData::Unique {
            kind,
            original,
            num,
        })
    }

    fn enter_derived(&mut self, data: NameData) -> NameRef {
        if let Some(&name) = self.derived.get(&data) {
            return name;
        }
        assert!(!self.frozen, "name table is frozen; cannot enter {data:?}");
        self.push(data)
    }

    fn push(&mut self, data: NameData) -> NameRef {
        let name = NameRef(self.names.len() as u32);
        match &data {
            NameData::Utf8(text) => {
                self.utf8.insert(text.clone(), name);
            }
            NameData::Unique { .. } | NameData::Constant { .. } => {
                self.derived.insert(data.clone(), name);
            }
        }
        self.names.push(data);
        name
    }

    pub fn lookup_utf8(&self, text: &str) -> Option<NameRef> {
        self.utf8.get(text).copied()
    }

    pub fn lookup_constant(&self, original: NameRef) -> Option<NameRef> {
        self.derived.get(&NameData::Constant { original }).copied()
    }

    /// Resolve a name. Total over refs this table handed out.
    #[inline]
    pub fn get(&self, name: NameRef) -> &NameData {
        debug_assert!(
            (name.0 as usize) < self.names.len(),
            "{name:?} does not belong to this name table"
        );
        &self.names[name.0 as usize]
    }

    pub fn entries(&self) -> &[NameData] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = (NameRef, &NameData)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, data)| (NameRef(i as u32), data))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Set the frozen flag, returning the previous value.
    pub(crate) fn set_frozen(&mut self, frozen: bool) -> bool {
        std::mem::replace(&mut self.frozen, frozen)
    }

    pub fn show(&self, name: NameRef) -> String {
        match self.get(name) {
            NameData::Utf8(text) => text.to_string(),
            NameData::Constant { original } => self.show(*original),
            NameData::Unique {
                kind: UniqueNameKind::Namer,
                original,
                num,
            } => format!("{}${}", self.show(*original), num),
            NameData::Unique { original, .. } => self.show(*original),
        }
    }

    pub fn show_raw(&self, name: NameRef) -> String {
        match self.get(name) {
            NameData::Utf8(text) => format!("<U {text}>"),
            NameData::Constant { original } => format!("<C {}>", self.show_raw(*original)),
            NameData::Unique {
                kind,
                original,
                num,
            } => format!("<{} {} ${}>", kind.raw_tag(), self.show_raw(*original), num),
        }
    }

    fn assert_exists(&self, name: NameRef) {
        assert!(
            (name.0 as usize) < self.names.len(),
            "{name:?} does not exist in this name table"
        );
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}

/// UTF8 names entered by `GlobalState::init_empty`, in index order starting at 1.
pub(crate) const BOOTSTRAP_UTF8: &[&str] = &[
    "<no-symbol>",
    "<root>",
    "<todo>",
    "initialize",
    "<self>",
    "<blk>",
    "new",
    "call",
    "BasicObject",
    "Object",
    "Integer",
    "Float",
    "String",
    "Symbol",
    "NilClass",
    "TrueClass",
    "FalseClass",
    "Array",
    "Hash",
];

/// UTF8 names whose constant forms `init_empty` enters right after `BOOTSTRAP_UTF8`.
pub(crate) const BOOTSTRAP_CONSTANTS: &[NameRef] = &[
    Names::ROOT,
    Names::TODO,
    Names::BASIC_OBJECT,
    Names::OBJECT,
    Names::INTEGER,
    Names::FLOAT,
    Names::STRING,
    Names::SYMBOL,
    Names::NIL_CLASS,
    Names::TRUE_CLASS,
    Names::FALSE_CLASS,
    Names::ARRAY,
    Names::HASH,
];

/// Well-known names, valid in every GlobalState after `init_empty`.
pub struct Names;

impl Names {
    pub const EMPTY: NameRef = NameRef(0);
    pub const NO_SYMBOL: NameRef = NameRef(1);
    pub const ROOT: NameRef = NameRef(2);
    pub const TODO: NameRef = NameRef(3);
    pub const INITIALIZE: NameRef = NameRef(4);
    pub const SELF: NameRef = NameRef(5);
    pub const BLK_ARG: NameRef = NameRef(6);
    pub const NEW: NameRef = NameRef(7);
    pub const CALL: NameRef = NameRef(8);
    pub const BASIC_OBJECT: NameRef = NameRef(9);
    pub const OBJECT: NameRef = NameRef(10);
    pub const INTEGER: NameRef = NameRef(11);
    pub const FLOAT: NameRef = NameRef(12);
    pub const STRING: NameRef = NameRef(13);
    pub const SYMBOL: NameRef = NameRef(14);
    pub const NIL_CLASS: NameRef = NameRef(15);
    pub const TRUE_CLASS: NameRef = NameRef(16);
    pub const FALSE_CLASS: NameRef = NameRef(17);
    pub const ARRAY: NameRef = NameRef(18);
    pub const HASH: NameRef = NameRef(19);

    pub const CONSTANT_ROOT: NameRef = NameRef(20);
    pub const CONSTANT_TODO: NameRef = NameRef(21);
    pub const CONSTANT_BASIC_OBJECT: NameRef = NameRef(22);
    pub const CONSTANT_OBJECT: NameRef = NameRef(23);
    pub const CONSTANT_INTEGER: NameRef = NameRef(24);
    pub const CONSTANT_FLOAT: NameRef = NameRef(25);
    pub const CONSTANT_STRING: NameRef = NameRef(26);
    pub const CONSTANT_SYMBOL: NameRef = NameRef(27);
    pub const CONSTANT_NIL_CLASS: NameRef = NameRef(28);
    pub const CONSTANT_TRUE_CLASS: NameRef = NameRef(29);
    pub const CONSTANT_FALSE_CLASS: NameRef = NameRef(30);
    pub const CONSTANT_ARRAY: NameRef = NameRef(31);
    pub const CONSTANT_HASH: NameRef = NameRef(32);

    /// Number of names present right after `init_empty`.
    pub const BOOTSTRAP_COUNT: usize = 33;
}
