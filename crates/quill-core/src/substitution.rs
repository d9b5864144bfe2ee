//! Folding a forked GlobalState back into the state it was forked from.
//!
//! A worker forks the canonical state with `deep_copy`, interns whatever it
//! needs into its private copy, and hands the copy back. Building a
//! `GlobalSubstitution` replays the fork's post-fork names and symbols, in
//! creation order, against the canonical state and records where each one
//! landed. Handles below the fork point are identical in both states and map
//! to themselves.
//!
//! Because the replay goes through the normal interning entry points in the
//! original order, substituting is equivalent to having run the worker's
//! interning directly against the destination: equal content always ends up
//! at equal handles, whatever else was merged first.
//!
//! Merging happens in three phases:
//! 1. Names, in creation order (constants and unique names remap their
//!    original first).
//! 2. New symbols, in creation order. Owners always precede what they own,
//!    so every owner is already mapped when its members are entered.
//! 3. Payload for every symbol of the fork: locations are unioned, flags are
//!    OR-ed, mixins appended when missing, and superclass and method
//!    arguments adopted when the destination has none. Superclasses can point
//!    forward, which is why this runs after all symbols exist.

use crate::global_state::GlobalState;
use crate::loc::Loc;
use crate::local_variable::LocalVariable;
use crate::names::{NameData, NameRef};
use crate::symbols::{Symbol, SymbolRef};
use crate::unfreeze::{UnfreezeNameTable, UnfreezeSymbolTable};
use tracing::{debug, debug_span};

/// Remapping from a fork's handles to its origin's handles.
#[derive(Clone, Debug)]
pub struct GlobalSubstitution {
    name_boundary: u32,
    new_names: Vec<NameRef>,
    symbol_boundary: u32,
    new_symbols: Vec<SymbolRef>,
    to_lineage: u32,
}

impl GlobalSubstitution {
    /// Replay `from`'s post-fork content into `to`.
    ///
    /// `from` must have been produced by `deep_copy`, and `to` must be the
    /// state it was copied from or share an ancestor with it (a sibling
    /// copy, or the origin of a copy of a copy). Only the prefix both states
    /// inherited from their nearest common ancestor maps to itself; every
    /// later entry of `from` is replayed, including entries an intermediate
    /// copy added before `from` was taken. `to` must have no active unfreeze
    /// guard.
    pub fn new(from: &GlobalState, to: &mut GlobalState) -> Self {
        let _span = debug_span!("global_substitution", from = from.lineage(), to = to.lineage()).entered();

        if from.fork_point().is_none() {
            panic!("substitution source was not produced by deep_copy");
        }
        let Some(fork) = from.shared_prefix(to) else {
            panic!("substitution source was forked from a different GlobalState");
        };
        assert_eq!(
            from.files_used(),
            fork.files,
            "files must be entered before forking"
        );
        debug!(
            ancestor = fork.lineage,
            names = fork.names,
            symbols = fork.symbols,
            "shared prefix"
        );

        let mut subst = GlobalSubstitution {
            name_boundary: fork.names as u32,
            new_names: Vec::with_capacity(from.names_used() - fork.names),
            symbol_boundary: fork.symbols as u32,
            new_symbols: Vec::with_capacity(from.symbols_used() - fork.symbols),
            to_lineage: to.lineage(),
        };

        let mut names = UnfreezeNameTable::new(to);
        let mut to = UnfreezeSymbolTable::new(&mut names);

        for data in &from.names().entries()[fork.names..] {
            let name = match data {
                NameData::Utf8(text) => to.enter_name_utf8(text),
                NameData::Constant { original } => {
                    let original = subst.substitute_name(*original);
                    to.enter_name_constant(original)
                }
                NameData::Unique {
                    kind,
                    original,
                    num,
                } => {
                    let original = subst.substitute_name(*original);
                    to.enter_name_unique(*kind, original, *num)
                }
            };
            subst.new_names.push(name);
        }

        for sym in &from.symbols().entries()[fork.symbols..] {
            let owner = subst.substitute_symbol(sym.owner);
            let name = subst.substitute_name(sym.name);
            let entered = to.enter_symbol(Loc::none(), owner, name, sym.kind, sym.variance);
            subst.new_symbols.push(entered);
        }

        for (sym_ref, sym) in from.symbols().iter().skip(1) {
            let target = subst.substitute_symbol(sym_ref);
            subst.merge_payload(&mut to, target, sym);
        }

        debug!(
            new_names = subst.new_names.len(),
            new_symbols = subst.new_symbols.len(),
            "built global substitution"
        );
        subst
    }

    fn merge_payload(&self, to: &mut GlobalState, target: SymbolRef, sym: &Symbol) {
        for &loc in &sym.locs {
            to.add_symbol_loc(target, loc);
        }
        if !to.symbol(target).flags.contains(sym.flags) {
            to.add_symbol_flags(target, sym.flags);
        }
        if sym.superclass.exists() && !to.symbol(target).superclass.exists() {
            to.set_superclass(target, self.substitute_symbol(sym.superclass));
        }
        for &mixin in &sym.mixins {
            to.add_mixin(target, self.substitute_symbol(mixin));
        }
        if !sym.arguments.is_empty() && to.symbol(target).arguments.is_empty() {
            for &argument in &sym.arguments {
                to.add_method_argument(target, self.substitute_local(argument));
            }
        }
    }

    pub fn substitute_name(&self, from: NameRef) -> NameRef {
        if from.0 < self.name_boundary {
            return from;
        }
        match self.new_names.get((from.0 - self.name_boundary) as usize) {
            Some(&name) => name,
            None => panic!("{from:?} was created after this substitution was built"),
        }
    }

    pub fn substitute_symbol(&self, from: SymbolRef) -> SymbolRef {
        if from.0 < self.symbol_boundary {
            return from;
        }
        match self.new_symbols.get((from.0 - self.symbol_boundary) as usize) {
            Some(&sym) => sym,
            None => panic!("{from:?} was created after this substitution was built"),
        }
    }

    pub fn substitute_local(&self, from: LocalVariable) -> LocalVariable {
        LocalVariable {
            name: self.substitute_name(from.name),
            unique: from.unique,
        }
    }

    /// Substitute any handle type.
    #[inline]
    pub fn substitute<T: Substitutable>(&self, from: T) -> T {
        from.substitute_with(self)
    }

    /// True when every handle maps to itself (the fork interned nothing new).
    pub fn is_identity(&self) -> bool {
        self.new_names.iter().enumerate().all(|(i, name)| name.0 == self.name_boundary + i as u32)
            && self
                .new_symbols
                .iter()
                .enumerate()
                .all(|(i, sym)| sym.0 == self.symbol_boundary + i as u32)
    }

    /// Lineage of the destination state.
    pub fn to_lineage(&self) -> u32 {
        self.to_lineage
    }
}

/// Handle types a `GlobalSubstitution` can remap.
pub trait Substitutable: Copy {
    fn substitute_with(self, subst: &GlobalSubstitution) -> Self;
}

impl Substitutable for NameRef {
    fn substitute_with(self, subst: &GlobalSubstitution) -> Self {
        subst.substitute_name(self)
    }
}

impl Substitutable for SymbolRef {
    fn substitute_with(self, subst: &GlobalSubstitution) -> Self {
        subst.substitute_symbol(self)
    }
}

impl Substitutable for LocalVariable {
    fn substitute_with(self, subst: &GlobalSubstitution) -> Self {
        subst.substitute_local(self)
    }
}
