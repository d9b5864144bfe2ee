//! TreeMap traversal order, counting, rewriting and owner tracking.

use quill_ast::{
    Array, Assign, Block, Break, ClassDef, ClassDefKind, ConstantLit, Expression, Hash, If,
    InsSeq, Literal, LiteralValue, Local, MethodDef, MethodDefFlags, Next, Rescue, Return, Send,
    TreeMap, TreeMapper, UnresolvedConstantLit, While, mk,
};
use quill_core::{
    FileRef, GlobalState, LocOffsets, LocalVariable, Loc, MutableContext, Names, SymbolRef,
    Symbols, UnfreezeNameTable, UnfreezeSymbolTable, Variance,
};

/// Counts entries into the kinds a typical resolver pass hooks.
#[derive(Default)]
struct Counter {
    count: usize,
}

macro_rules! counting_hooks {
    ($($hook:ident($node:ident) => $variant:ident;)*) => {
        $(
            fn $hook(&mut self, _ctx: &mut MutableContext<'_>, original: Box<$node>) -> Expression {
                self.count += 1;
                Expression::$variant(original)
            }
        )*
    };
}

impl TreeMapper for Counter {
    counting_hooks! {
        pre_transform_class_def(ClassDef) => ClassDef;
        pre_transform_method_def(MethodDef) => MethodDef;
        pre_transform_if(If) => If;
        pre_transform_while(While) => While;
        post_transform_break(Break) => Break;
        post_transform_next(Next) => Next;
        pre_transform_return(Return) => Return;
        pre_transform_rescue(Rescue) => Rescue;
        post_transform_constant_lit(ConstantLit) => ConstantLit;
        pre_transform_assign(Assign) => Assign;
        pre_transform_send(Send) => Send;
        pre_transform_hash(Hash) => Hash;
        pre_transform_array(Array) => Array;
        post_transform_literal(Literal) => Literal;
        post_transform_unresolved_constant_lit(UnresolvedConstantLit) => UnresolvedConstantLit;
        pre_transform_block(Block) => Block;
        pre_transform_ins_seq(InsSeq) => InsSeq;
    }
}

/// Only class and method definitions.
#[derive(Default)]
struct DefinitionCounter {
    count: usize,
}

impl TreeMapper for DefinitionCounter {
    fn pre_transform_class_def(&mut self, _ctx: &mut MutableContext<'_>, original: Box<ClassDef>) -> Expression {
        self.count += 1;
        Expression::ClassDef(original)
    }

    fn pre_transform_method_def(&mut self, _ctx: &mut MutableContext<'_>, original: Box<MethodDef>) -> Expression {
        self.count += 1;
        Expression::MethodDef(original)
    }
}

struct Fixture {
    gs: GlobalState,
    loc: Loc,
    class_sym: SymbolRef,
    method_sym: SymbolRef,
}

/// `class Foo; def Foo(Foo) = 5; end`, with symbols for the class, a type
/// member, the method and a type argument.
fn fixture() -> Fixture {
    let mut gs = GlobalState::new();
    gs.init_empty();
    let loc = Loc::new(FileRef::NONE, 42, 91);
    let (class_sym, method_sym) = {
        let mut names = UnfreezeNameTable::new(&mut gs);
        let mut gs = UnfreezeSymbolTable::new(&mut names);
        let name = gs.enter_name_utf8("Foo");
        let constant = gs.enter_name_constant(name);
        let class_sym = gs.enter_class_symbol(loc, Symbols::root(), constant);
        gs.enter_type_member(loc, class_sym, constant, Variance::CoVariant);
        let method_sym = gs.enter_method_symbol(loc, class_sym, name);
        gs.enter_type_argument(loc, method_sym, constant, Variance::CoVariant);
        (class_sym, method_sym)
    };
    Fixture {
        gs,
        loc,
        class_sym,
        method_sym,
    }
}

fn class_tree(f: &Fixture) -> Expression {
    let name = f.gs.lookup_name_utf8("Foo").expect("Foo interned");
    let offsets = f.loc.offsets();
    let arg = mk::local(offsets, LocalVariable::new(name, 0));
    let method = mk::method_def(
        offsets,
        f.loc,
        f.method_sym,
        name,
        vec![arg],
        mk::int(offsets, 5),
        MethodDefFlags::empty(),
    );
    let cnst = mk::unresolved_constant(offsets, mk::empty(), name);
    mk::class_def(
        offsets,
        f.loc,
        f.class_sym,
        cnst,
        Vec::new(),
        vec![method],
        ClassDefKind::Class,
    )
}

// =============================================================================
// Counting
// =============================================================================

#[test]
fn test_count_trees() {
    let mut f = fixture();
    let tree = class_tree(&f);
    let file = f.loc.file();
    let mut ctx = MutableContext::new(&mut f.gs, Symbols::root(), file);

    let mut counter = Counter::default();
    let _ = TreeMap::apply(&mut ctx, &mut counter, tree);
    // ClassDef + MethodDef + the integer literal; the class name is not visited.
    assert_eq!(counter.count, 3);
}

#[test]
fn test_count_definitions_only() {
    let mut f = fixture();
    let tree = class_tree(&f);
    let mut ctx = MutableContext::new(&mut f.gs, Symbols::root(), FileRef::NONE);

    let mut counter = DefinitionCounter::default();
    let _ = TreeMap::apply(&mut ctx, &mut counter, tree);
    assert_eq!(counter.count, 2);
}

#[test]
fn test_identity_pass_preserves_structure() {
    struct Identity;
    impl TreeMapper for Identity {}

    let mut f = fixture();
    let tree = class_tree(&f);
    let expected = class_tree(&f);
    let mut ctx = MutableContext::new(&mut f.gs, Symbols::root(), FileRef::NONE);

    let mut counter = Counter::default();
    let counted = TreeMap::apply(&mut ctx, &mut counter, tree);
    assert_eq!(counted, expected);
    let identity = TreeMap::apply(&mut ctx, &mut Identity, counted);
    assert_eq!(identity, expected);
}

#[test]
fn test_traversal_is_reproducible() {
    let mut f = fixture();
    let mut ctx = MutableContext::new(&mut f.gs, Symbols::root(), FileRef::NONE);
    let offsets = f.loc.offsets();
    let mut counts = Vec::new();
    for _ in 0..2 {
        let tree = mk::ins_seq(
            offsets,
            vec![mk::if_(offsets, mk::true_(offsets), mk::int(offsets, 1), mk::empty())],
            mk::array(offsets, vec![mk::constant(offsets, Symbols::ARRAY), mk::nil(offsets)]),
        );
        let mut counter = Counter::default();
        let _ = TreeMap::apply(&mut ctx, &mut counter, tree);
        counts.push(counter.count);
    }
    // InsSeq, If, two literals, Array, ConstantLit, nil
    assert_eq!(counts, vec![7, 7]);
}

// =============================================================================
// Visit order
// =============================================================================

#[test]
fn test_fixed_child_order() {
    #[derive(Default)]
    struct Order {
        seen: Vec<i64>,
    }
    impl TreeMapper for Order {
        fn post_transform_literal(&mut self, _ctx: &mut MutableContext<'_>, original: Box<Literal>) -> Expression {
            if let LiteralValue::Integer(v) = original.value {
                self.seen.push(v);
            }
            Expression::Literal(original)
        }
    }

    let mut f = fixture();
    let mut ctx = MutableContext::new(&mut f.gs, Symbols::root(), FileRef::NONE);
    let l = LocOffsets { begin: 0, end: 1 };
    let block = mk::block(l, vec![mk::int(l, 5)], mk::int(l, 6));
    let tree = mk::ins_seq(
        l,
        vec![
            mk::if_(l, mk::int(l, 0), mk::int(l, 1), mk::int(l, 2)),
            mk::send(l, mk::int(l, 3), Names::CALL, vec![mk::int(l, 4)], Some(block)),
            mk::hash(l, vec![mk::int(l, 7), mk::int(l, 8)], vec![mk::int(l, 9), mk::int(l, 10)]),
            mk::rescue(
                l,
                mk::int(l, 11),
                vec![mk::rescue_case(l, vec![mk::int(l, 12)], mk::int(l, 13), mk::int(l, 14))],
                mk::int(l, 15),
                mk::int(l, 16),
            ),
        ],
        mk::while_(l, mk::int(l, 17), mk::return_(l, mk::int(l, 18))),
    );

    let mut order = Order::default();
    let _ = TreeMap::apply(&mut ctx, &mut order, tree);
    assert_eq!(order.seen, (0..=18).collect::<Vec<_>>());
}

// =============================================================================
// Rewriting
// =============================================================================

#[test]
fn test_post_transform_replaces_node() {
    struct DoubleInts;
    impl TreeMapper for DoubleInts {
        fn post_transform_literal(&mut self, _ctx: &mut MutableContext<'_>, mut original: Box<Literal>) -> Expression {
            if let LiteralValue::Integer(v) = &mut original.value {
                *v *= 2;
            }
            Expression::Literal(original)
        }
    }

    let mut f = fixture();
    let tree = class_tree(&f);
    let mut ctx = MutableContext::new(&mut f.gs, Symbols::root(), FileRef::NONE);
    let rewritten = TreeMap::apply(&mut ctx, &mut DoubleInts, tree);

    let Expression::ClassDef(class) = rewritten else {
        panic!("expected a class");
    };
    let Expression::MethodDef(method) = &class.rhs[0] else {
        panic!("expected a method");
    };
    assert_eq!(method.rhs, mk::int(f.loc.offsets(), 10));
}

#[test]
fn test_pre_transform_kind_change_is_redispatched() {
    /// Rewrites `if c then a else b` into `[c, a, b]` before descending.
    struct IfToArray {
        arrays: usize,
        literals: usize,
    }
    impl TreeMapper for IfToArray {
        fn pre_transform_if(&mut self, _ctx: &mut MutableContext<'_>, original: Box<If>) -> Expression {
            let If {
                loc,
                cond,
                thenp,
                elsep,
            } = *original;
            mk::array(loc, vec![cond, thenp, elsep])
        }

        fn pre_transform_array(
            &mut self,
            _ctx: &mut MutableContext<'_>,
            original: Box<Array>,
        ) -> Expression {
            self.arrays += 1;
            Expression::Array(original)
        }

        fn post_transform_literal(&mut self, _ctx: &mut MutableContext<'_>, original: Box<Literal>) -> Expression {
            self.literals += 1;
            Expression::Literal(original)
        }
    }

    let mut f = fixture();
    let mut ctx = MutableContext::new(&mut f.gs, Symbols::root(), FileRef::NONE);
    let l = f.loc.offsets();
    let tree = mk::if_(l, mk::true_(l), mk::int(l, 1), mk::int(l, 2));

    let mut mapper = IfToArray {
        arrays: 0,
        literals: 0,
    };
    let rewritten = TreeMap::apply(&mut ctx, &mut mapper, tree);
    assert_eq!(mapper.arrays, 1);
    assert_eq!(mapper.literals, 3);
    assert_eq!(
        rewritten,
        mk::array(l, vec![mk::true_(l), mk::int(l, 1), mk::int(l, 2)])
    );
}

#[test]
#[should_panic(expected = "block rewritten into")]
fn test_block_must_stay_a_block() {
    struct DropBlocks;
    impl TreeMapper for DropBlocks {
        fn post_transform_block(
            &mut self,
            _ctx: &mut MutableContext<'_>,
            _original: Box<Block>,
        ) -> Expression {
            mk::empty()
        }
    }

    let mut f = fixture();
    let mut ctx = MutableContext::new(&mut f.gs, Symbols::root(), FileRef::NONE);
    let l = f.loc.offsets();
    let tree = mk::send(l, mk::empty(), Names::CALL, Vec::new(), Some(mk::block(l, Vec::new(), mk::empty())));
    let _ = TreeMap::apply(&mut ctx, &mut DropBlocks, tree);
}

// =============================================================================
// Context
// =============================================================================

#[test]
fn test_owner_tracks_enclosing_definition() {
    #[derive(Default)]
    struct Owners {
        at_literal: Vec<SymbolRef>,
        at_local: Vec<SymbolRef>,
        at_class: Vec<SymbolRef>,
    }
    impl TreeMapper for Owners {
        fn pre_transform_class_def(&mut self, ctx: &mut MutableContext<'_>, original: Box<ClassDef>) -> Expression {
            self.at_class.push(ctx.owner);
            Expression::ClassDef(original)
        }
        fn post_transform_literal(&mut self, ctx: &mut MutableContext<'_>, original: Box<Literal>) -> Expression {
            self.at_literal.push(ctx.owner);
            Expression::Literal(original)
        }
        fn post_transform_local(&mut self, ctx: &mut MutableContext<'_>, original: Box<Local>) -> Expression {
            self.at_local.push(ctx.owner);
            Expression::Local(original)
        }
    }

    let mut f = fixture();
    let tree = class_tree(&f);
    let (class_sym, method_sym) = (f.class_sym, f.method_sym);
    let mut ctx = MutableContext::new(&mut f.gs, Symbols::root(), FileRef::NONE);
    let mut owners = Owners::default();
    let _ = TreeMap::apply(&mut ctx, &mut owners, tree);

    assert_eq!(owners.at_class, vec![Symbols::root()]);
    assert_eq!(owners.at_local, vec![method_sym]);
    assert_eq!(owners.at_literal, vec![method_sym]);
    assert_eq!(ctx.owner, Symbols::root());
    assert_ne!(class_sym, method_sym);
}

#[test]
fn test_hooks_can_intern_through_context() {
    /// Replaces every `Local` with a send of a fresh method name.
    struct LocalsToSends;
    impl TreeMapper for LocalsToSends {
        fn post_transform_local(&mut self, ctx: &mut MutableContext<'_>, original: Box<Local>) -> Expression {
            let fun = ctx.enter_name_utf8("from_local");
            mk::send0(original.loc, mk::empty(), fun)
        }
    }

    let mut f = fixture();
    let tree = class_tree(&f);
    let mut names = UnfreezeNameTable::new(&mut f.gs);
    let mut ctx = MutableContext::new(&mut names, Symbols::root(), FileRef::NONE);
    let rewritten = TreeMap::apply(&mut ctx, &mut LocalsToSends, tree);
    let fun = ctx.lookup_name_utf8("from_local").expect("interned by the pass");

    let Expression::ClassDef(class) = rewritten else {
        panic!("expected a class");
    };
    let Expression::MethodDef(method) = &class.rhs[0] else {
        panic!("expected a method");
    };
    match &method.args[0] {
        Expression::Send(send) => assert_eq!(send.fun, fun),
        other => panic!("expected a send, got {other:?}"),
    }
}
