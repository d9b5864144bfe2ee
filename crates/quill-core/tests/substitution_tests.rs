//! Folding forked states back into their origin.

use quill_core::{
    GlobalState, GlobalSubstitution, LocalVariable, Loc, NameRef, Names, SymbolFlags,
    SymbolKind, Symbols, UnfreezeFileTable, UnfreezeNameTable, UnfreezeSymbolTable,
    UniqueNameKind, load_global_state, store_global_state,
};
use rayon::prelude::*;

fn init() -> GlobalState {
    let mut gs = GlobalState::new();
    gs.init_empty();
    gs
}

fn enter_names(gs: &mut GlobalState, texts: &[&str]) -> Vec<NameRef> {
    let mut names = UnfreezeNameTable::new(gs);
    texts.iter().map(|text| names.enter_name_utf8(text)).collect()
}

// =============================================================================
// Names
// =============================================================================

#[test]
fn test_substitute_new_name_between_copies() {
    let gs = init();
    let mut c1 = gs.deep_copy();
    let mut c2 = gs.deep_copy();
    let n1 = enter_names(&mut c1, &["test new name"])[0];

    // c1 and c2 are siblings, so c1 can be folded into c2 directly.
    let subst = GlobalSubstitution::new(&c1, &mut c2);
    let n2 = subst.substitute(n1);

    assert_eq!(n2.show_raw(&c2), "<U test new name>");
    assert_eq!(c1.all_symbols_used(), c2.all_symbols_used());
    assert_eq!(c1.all_symbols_used(), gs.all_symbols_used());
}

#[test]
fn test_pre_fork_handles_map_to_themselves() {
    let mut gs = init();
    let before = enter_names(&mut gs, &["before"])[0];
    let fork = gs.deep_copy();

    let subst = GlobalSubstitution::new(&fork, &mut gs);
    assert!(subst.is_identity());
    assert_eq!(subst.substitute(before), before);
    assert_eq!(subst.substitute(Names::CONSTANT_OBJECT), Names::CONSTANT_OBJECT);
    assert_eq!(subst.substitute(Symbols::HASH), Symbols::HASH);
    assert_eq!(subst.to_lineage(), gs.lineage());
}

#[test]
fn test_new_names_land_at_existing_content() {
    let mut gs = init();
    let mut fork = gs.deep_copy();
    let in_fork = enter_names(&mut fork, &["shared", "fork only"]);
    let in_origin = enter_names(&mut gs, &["shared"])[0];

    let subst = GlobalSubstitution::new(&fork, &mut gs);
    assert!(!subst.is_identity());
    assert_eq!(subst.substitute(in_fork[0]), in_origin);
    assert_eq!(subst.substitute(in_fork[1]).show(&gs), "fork only");
}

#[test]
fn test_derived_names_remap_their_original() {
    let mut gs = init();
    let mut fork = gs.deep_copy();
    // Shift `gs` so the fork's handles cannot line up by accident.
    enter_names(&mut gs, &["padding 1", "padding 2"]);

    let (constant, unique) = {
        let mut names = UnfreezeNameTable::new(&mut fork);
        let widget = names.enter_name_utf8("Widget");
        let constant = names.enter_name_constant(widget);
        let unique = names.enter_name_unique(UniqueNameKind::Namer, widget, 2);
        (constant, unique)
    };

    let subst = GlobalSubstitution::new(&fork, &mut gs);
    assert_eq!(subst.substitute(constant).show_raw(&gs), "<C <U Widget>>");
    assert_eq!(subst.substitute(unique).show_raw(&gs), "<N <U Widget> $2>");
}

#[test]
fn test_substitution_is_deterministic() {
    let gs = init();
    let mut fork = gs.deep_copy();
    let fork_names = enter_names(&mut fork, &["a", "b", "c"]);

    let mut first = gs.deep_copy();
    let mut second = gs.deep_copy();
    let s1 = GlobalSubstitution::new(&fork, &mut first);
    let s2 = GlobalSubstitution::new(&fork, &mut second);
    for name in fork_names {
        assert_eq!(s1.substitute(name), s2.substitute(name));
    }
    assert_eq!(first.names_used(), second.names_used());
}

#[test]
#[should_panic(expected = "was created after this substitution was built")]
fn test_handle_newer_than_substitution_panics() {
    let mut gs = init();
    let mut fork = gs.deep_copy();
    let subst = GlobalSubstitution::new(&fork, &mut gs);
    let late = enter_names(&mut fork, &["late"])[0];
    subst.substitute(late);
}

#[test]
#[should_panic(expected = "forked from a different GlobalState")]
fn test_unrelated_states_panic() {
    let a = init();
    let mut b = init();
    let fork = a.deep_copy();
    GlobalSubstitution::new(&fork, &mut b);
}

#[test]
fn test_copy_of_copy_replays_intermediate_entries() {
    let mut origin = init();
    let mut middle = origin.deep_copy();
    let from_middle = enter_names(&mut middle, &["only in middle"])[0];
    let mut leaf = middle.deep_copy();
    let from_leaf = enter_names(&mut leaf, &["only in leaf"])[0];
    // The origin grows by the same amount, so its new name takes the slot
    // the middle copy used.
    let in_origin = enter_names(&mut origin, &["only in origin"])[0];
    assert_eq!(in_origin, from_middle);

    let subst = GlobalSubstitution::new(&leaf, &mut origin);
    assert_eq!(subst.substitute(from_middle).show_raw(&origin), "<U only in middle>");
    assert_eq!(subst.substitute(from_leaf).show_raw(&origin), "<U only in leaf>");
    assert_ne!(subst.substitute(from_middle), in_origin);
    assert_eq!(in_origin.show_raw(&origin), "<U only in origin>");
    origin.sanity_check();
}

#[test]
fn test_copy_of_copy_folds_into_its_parent() {
    let gs = init();
    let mut middle = gs.deep_copy();
    let kept = enter_names(&mut middle, &["kept"])[0];
    let mut leaf = middle.deep_copy();
    let added = enter_names(&mut leaf, &["added"])[0];

    let subst = GlobalSubstitution::new(&leaf, &mut middle);
    assert_eq!(subst.substitute(kept), kept);
    assert_eq!(subst.substitute(added).show(&middle), "added");
}

#[test]
#[should_panic(expected = "forked from a different GlobalState")]
fn test_fork_of_reloaded_state_is_unrelated() {
    let original = init();
    let stored = store_global_state(&original).expect("stores");
    let mut reloaded = GlobalState::new();
    load_global_state(&mut reloaded, &stored).expect("loads");
    let fork = original.deep_copy();
    GlobalSubstitution::new(&fork, &mut reloaded);
}

#[test]
#[should_panic(expected = "not produced by deep_copy")]
fn test_source_must_be_a_fork() {
    let a = init();
    let mut b = a.deep_copy();
    GlobalSubstitution::new(&a, &mut b);
}

#[test]
#[should_panic(expected = "files must be entered before forking")]
fn test_fork_cannot_add_files() {
    let mut gs = init();
    let mut fork = gs.deep_copy();
    {
        let mut files = UnfreezeFileTable::new(&mut fork);
        files.enter_file("late.rb", "");
    }
    GlobalSubstitution::new(&fork, &mut gs);
}

// =============================================================================
// Symbols
// =============================================================================

#[test]
fn test_symbols_are_reentered_under_substituted_owners() {
    let mut gs = init();
    let mut fork = gs.deep_copy();
    let (class, method) = {
        let mut names = UnfreezeNameTable::new(&mut fork);
        let mut fork = UnfreezeSymbolTable::new(&mut names);
        let widget = fork.enter_name_utf8("Widget");
        let widget = fork.enter_name_constant(widget);
        let draw = fork.enter_name_utf8("draw");
        let class = fork.enter_class_symbol(Loc::none(), Symbols::ROOT, widget);
        let method = fork.enter_method_symbol(Loc::none(), class, draw);
        (class, method)
    };
    // The origin interned its own symbols in the meantime.
    {
        let mut names = UnfreezeNameTable::new(&mut gs);
        let mut gs = UnfreezeSymbolTable::new(&mut names);
        let other = gs.enter_name_utf8("Other");
        let other = gs.enter_name_constant(other);
        gs.enter_class_symbol(Loc::none(), Symbols::ROOT, other);
    }

    let subst = GlobalSubstitution::new(&fork, &mut gs);
    let class = subst.substitute(class);
    let method = subst.substitute(method);
    assert_eq!(gs.full_name(method), "Widget#draw");
    assert_eq!(gs.symbol(method).owner, class);
    assert_eq!(gs.symbol(method).kind, SymbolKind::Method);
    assert!(gs.symbol(class).members().any(|member| member == method));
    gs.sanity_check();
}

#[test]
fn test_payload_is_merged() {
    let mut gs = {
        let mut gs = init();
        let mut files = UnfreezeFileTable::new(&mut gs);
        files.enter_file("widget.rb", "class Widget < Object; end");
        drop(files);
        gs
    };
    let file = gs.files().lookup("widget.rb").expect("file entered");
    let (class, method) = {
        let mut names = UnfreezeNameTable::new(&mut gs);
        let mut gs = UnfreezeSymbolTable::new(&mut names);
        let widget = gs.enter_name_utf8("Widget");
        let widget = gs.enter_name_constant(widget);
        let draw = gs.enter_name_utf8("draw");
        let class = gs.enter_class_symbol(Loc::new(file, 0, 5), Symbols::ROOT, widget);
        let method = gs.enter_method_symbol(Loc::none(), class, draw);
        (class, method)
    };

    let mut fork = gs.deep_copy();
    {
        let mut names = UnfreezeNameTable::new(&mut fork);
        let mut fork = UnfreezeSymbolTable::new(&mut names);
        let canvas = fork.enter_name_utf8("canvas");
        fork.add_symbol_loc(class, Loc::new(file, 6, 20));
        fork.add_symbol_flags(class, SymbolFlags::FINAL);
        fork.set_superclass(class, Symbols::OBJECT);
        fork.add_mixin(class, Symbols::HASH);
        fork.add_method_argument(method, LocalVariable::new(canvas, 0));
    }

    GlobalSubstitution::new(&fork, &mut gs);
    let merged = gs.symbol(class);
    assert_eq!(merged.locs.as_slice(), &[Loc::new(file, 0, 5), Loc::new(file, 6, 20)]);
    assert!(merged.flags.contains(SymbolFlags::FINAL));
    assert_eq!(merged.superclass, Symbols::OBJECT);
    assert_eq!(merged.mixins, vec![Symbols::HASH]);
    let args = &gs.symbol(method).arguments;
    assert_eq!(args.len(), 1);
    assert_eq!(args[0].show(&gs), "canvas");
}

#[test]
fn test_existing_superclass_is_kept() {
    let mut gs = init();
    let class = {
        let mut names = UnfreezeNameTable::new(&mut gs);
        let mut gs = UnfreezeSymbolTable::new(&mut names);
        let w = gs.enter_name_utf8("W");
        let w = gs.enter_name_constant(w);
        gs.enter_class_symbol(Loc::none(), Symbols::ROOT, w)
    };
    let mut fork = gs.deep_copy();
    {
        let mut fork = UnfreezeSymbolTable::new(&mut fork);
        fork.set_superclass(class, Symbols::HASH);
    }
    {
        let mut gs = UnfreezeSymbolTable::new(&mut gs);
        gs.set_superclass(class, Symbols::ARRAY);
    }
    GlobalSubstitution::new(&fork, &mut gs);
    assert_eq!(gs.symbol(class).superclass, Symbols::ARRAY);
}

// =============================================================================
// Parallel forks
// =============================================================================

#[test]
fn test_parallel_forks_merge_to_the_same_names() {
    let gs = init();
    let forks: Vec<(GlobalState, Vec<NameRef>)> = (0..8)
        .into_par_iter()
        .map(|worker| {
            let mut fork = gs.deep_copy();
            let texts: Vec<String> = (0..50).map(|i| format!("name_{}", (i + worker) % 60)).collect();
            let names = {
                let mut names = UnfreezeNameTable::new(&mut fork);
                texts.iter().map(|text| names.enter_name_utf8(text)).collect()
            };
            (fork, names)
        })
        .collect();

    let mut canonical = gs;
    let mut merged = Vec::new();
    for (fork, names) in &forks {
        let subst = GlobalSubstitution::new(fork, &mut canonical);
        merged.extend(names.iter().map(|&name| (name.show(fork), subst.substitute(name))));
    }

    for (text, name) in merged {
        assert_eq!(name.show(&canonical), text);
        assert_eq!(canonical.lookup_name_utf8(&text), Some(name));
    }
    assert_eq!(canonical.names_used(), Names::BOOTSTRAP_COUNT + 57);
    canonical.sanity_check();
}
