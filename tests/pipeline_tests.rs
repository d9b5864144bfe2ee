//! Fork/merge pipeline runs over several files.

use quill::quill_ast::{ClassDef, ClassDefKind, ConstantLit, MethodDef, MethodDefFlags, mk};
use quill::quill_core::{Loc, LocOffsets, NameRef, SymbolKind, Symbols};
use quill::{
    CompilationUnit, Expression, GlobalState, MutableContext, Pipeline, PipelineOptions, TreeMap,
    TreeMapper, UnfreezeFileTable, UnfreezeNameTable,
};
use std::panic::{AssertUnwindSafe, catch_unwind};

const L: LocOffsets = LocOffsets { begin: 0, end: 8 };

/// Enters symbols for class and method definitions and resolves bare
/// constants against the root's members.
struct Namer;

impl TreeMapper for Namer {
    fn pre_transform_class_def(&mut self, ctx: &mut MutableContext<'_>, mut original: Box<ClassDef>) -> Expression {
        let cnst = match &original.name {
            Expression::UnresolvedConstantLit(name) => Some(name.cnst),
            _ => None,
        };
        if let Some(cnst) = cnst {
            let loc = ctx.loc(original.loc);
            let owner = ctx.owner;
            original.symbol = ctx.enter_class_symbol(loc, owner, cnst);
        }
        Expression::ClassDef(original)
    }

    fn pre_transform_method_def(&mut self, ctx: &mut MutableContext<'_>, mut original: Box<MethodDef>) -> Expression {
        let loc = ctx.loc(original.loc);
        let owner = ctx.owner;
        original.symbol = ctx.enter_method_symbol(loc, owner, original.name);
        Expression::MethodDef(original)
    }

    fn post_transform_unresolved_constant_lit(
        &mut self,
        ctx: &mut MutableContext<'_>,
        original: Box<quill::quill_ast::UnresolvedConstantLit>,
    ) -> Expression {
        if original.scope.is_empty_tree() {
            if let Some(symbol) = ctx.find_member(Symbols::root(), original.cnst, SymbolKind::Class) {
                return Expression::ConstantLit(Box::new(ConstantLit {
                    loc: original.loc,
                    symbol,
                }));
            }
        }
        Expression::UnresolvedConstantLit(original)
    }
}

fn namer(ctx: &mut MutableContext<'_>, tree: Expression) -> Expression {
    TreeMap::apply(ctx, &mut Namer, tree)
}

/// A canonical state with `count` files, plus one unresolved tree per file:
/// `class Widget<i>; def render = Widget<i>; end`.
fn setup(count: usize) -> (GlobalState, Vec<CompilationUnit>) {
    let mut gs = GlobalState::new();
    gs.init_empty();
    let files: Vec<_> = {
        let mut files = UnfreezeFileTable::new(&mut gs);
        (0..count)
            .map(|i| files.enter_file(&format!("widget_{i}.rb"), "class Widget; end"))
            .collect()
    };
    let (render, classes): (NameRef, Vec<NameRef>) = {
        let mut names = UnfreezeNameTable::new(&mut gs);
        let render = names.enter_name_utf8("render");
        let classes = (0..count)
            .map(|i| {
                let utf8 = names.enter_name_utf8(&format!("Widget{i}"));
                names.enter_name_constant(utf8)
            })
            .collect();
        (render, classes)
    };

    let units = files
        .into_iter()
        .zip(classes)
        .map(|(file, class)| {
            let decl_loc = Loc::from_offsets(file, L);
            let method = mk::method_def(
                L,
                decl_loc,
                Symbols::no_symbol(),
                render,
                Vec::new(),
                mk::unresolved_constant(L, mk::empty(), class),
                MethodDefFlags::empty(),
            );
            let tree = mk::class_def(
                L,
                decl_loc,
                Symbols::no_symbol(),
                mk::unresolved_constant(L, mk::empty(), class),
                Vec::new(),
                vec![method],
                ClassDefKind::Class,
            );
            CompilationUnit::new(file, tree)
        })
        .collect();
    (gs, units)
}

fn class_and_body(tree: &Expression) -> (&ClassDef, &MethodDef) {
    let Expression::ClassDef(class) = tree else {
        panic!("expected a class, got {tree:?}");
    };
    let Expression::MethodDef(method) = &class.rhs[0] else {
        panic!("expected a method, got {:?}", class.rhs[0]);
    };
    (class, method)
}

#[test]
fn test_pipeline_names_every_unit() {
    quill::tracing_config::init_tracing();
    let (mut canonical, units) = setup(9);
    let symbols_before = canonical.symbols_used();

    let trees = Pipeline::new(PipelineOptions::with_workers(4)).run(&mut canonical, units, namer);

    assert_eq!(trees.len(), 9);
    assert_eq!(canonical.symbols_used(), symbols_before + 18);
    for (i, tree) in trees.iter().enumerate() {
        let (class, method) = class_and_body(tree);
        assert_eq!(canonical.full_name(class.symbol), format!("Widget{i}"));
        assert_eq!(canonical.full_name(method.symbol), format!("Widget{i}#render"));
        match &method.rhs {
            Expression::ConstantLit(cnst) => assert_eq!(cnst.symbol, class.symbol),
            other => panic!("constant was not resolved: {other:?}"),
        }
        let loc = canonical.symbol(class.symbol).locs[0];
        assert_eq!(canonical.file(loc.file()).path, format!("widget_{i}.rb"));
    }
    assert!(canonical.is_name_table_frozen());
    assert!(canonical.is_symbol_table_frozen());
}

#[test]
fn test_result_is_independent_of_worker_count() {
    let (mut serial, serial_units) = setup(7);
    let (mut parallel, parallel_units) = setup(7);

    let one = Pipeline::new(PipelineOptions::with_workers(1)).run(&mut serial, serial_units, namer);
    let many = Pipeline::new(PipelineOptions::with_workers(5)).run(&mut parallel, parallel_units, namer);

    assert_eq!(one, many);
    assert_eq!(serial.symbols_used(), parallel.symbols_used());
    assert_eq!(serial.names_used(), parallel.names_used());
    for (a, b) in one.iter().zip(&many) {
        assert_eq!(a.show_raw(&serial), b.show_raw(&parallel));
    }
}

#[test]
fn test_names_interned_in_separate_forks_merge_to_one() {
    let (mut canonical, units) = setup(6);
    let names_before = canonical.names_used();

    // Every unit becomes `[:shared_by_all, :<file path>]`; all three forks
    // intern the shared name independently.
    let trees = Pipeline::new(PipelineOptions::with_workers(3)).run(&mut canonical, units, |ctx, _tree| {
        let path = ctx.file(ctx.file).path.clone();
        let shared = ctx.enter_name_utf8("shared_by_all");
        let own = ctx.enter_name_utf8(&path);
        mk::array(L, vec![mk::symbol(L, shared), mk::symbol(L, own)])
    });

    assert_eq!(canonical.names_used(), names_before + 7);
    let shared = canonical.lookup_name_utf8("shared_by_all").expect("shared name merged");
    for (i, tree) in trees.iter().enumerate() {
        let own = canonical
            .lookup_name_utf8(&format!("widget_{i}.rb"))
            .expect("file name merged");
        assert_eq!(
            *tree,
            mk::array(L, vec![mk::symbol(L, shared), mk::symbol(L, own)])
        );
    }
}

#[test]
fn test_empty_input() {
    let (mut canonical, _) = setup(0);
    let trees = Pipeline::new(PipelineOptions::default()).run(&mut canonical, Vec::new(), namer);
    assert!(trees.is_empty());
}

#[test]
fn test_worker_panic_leaves_canonical_untouched() {
    let (mut canonical, units) = setup(4);
    let names_before = canonical.names_used();
    let symbols_before = canonical.symbols_used();
    let poisoned = units[2].file;

    let result = catch_unwind(AssertUnwindSafe(|| {
        Pipeline::new(PipelineOptions::with_workers(2)).run(&mut canonical, units, |ctx, tree| {
            assert_ne!(ctx.file, poisoned, "pass failed on purpose");
            namer(ctx, tree)
        })
    }));

    assert!(result.is_err());
    assert_eq!(canonical.names_used(), names_before);
    assert_eq!(canonical.symbols_used(), symbols_before);
    assert!(canonical.is_name_table_frozen());
    canonical.sanity_check();
}
