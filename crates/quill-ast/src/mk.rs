//! Node constructors.
//!
//! Every function returns a finished `Expression`, so trees read top-down:
//!
//! ```
//! use quill_ast::mk;
//! use quill_core::{LocOffsets, Names};
//!
//! let loc = LocOffsets { begin: 0, end: 9 };
//! let tree = mk::send0(loc, mk::self_ref(loc, quill_core::Symbols::OBJECT), Names::NEW);
//! assert_eq!(tree.loc(), loc);
//! ```

use crate::nodes::*;
use quill_core::{LocalVariable, Loc, LocOffsets, NameRef, SymbolRef, Symbols};

pub fn empty() -> Expression {
    Expression::EmptyTree
}

// =============================================================================
// Definitions
// =============================================================================

pub fn class_def(
    loc: LocOffsets,
    decl_loc: Loc,
    symbol: SymbolRef,
    name: Expression,
    ancestors: Vec<Expression>,
    rhs: Vec<Expression>,
    kind: ClassDefKind,
) -> Expression {
    Expression::ClassDef(Box::new(ClassDef {
        loc,
        decl_loc,
        symbol,
        kind,
        name,
        ancestors,
        rhs,
    }))
}

pub fn method_def(
    loc: LocOffsets,
    decl_loc: Loc,
    symbol: SymbolRef,
    name: NameRef,
    args: Vec<Expression>,
    rhs: Expression,
    flags: MethodDefFlags,
) -> Expression {
    Expression::MethodDef(Box::new(MethodDef {
        loc,
        decl_loc,
        symbol,
        name,
        args,
        rhs,
        flags,
    }))
}

// =============================================================================
// Control flow
// =============================================================================

pub fn if_(loc: LocOffsets, cond: Expression, thenp: Expression, elsep: Expression) -> Expression {
    Expression::If(Box::new(If {
        loc,
        cond,
        thenp,
        elsep,
    }))
}

pub fn while_(loc: LocOffsets, cond: Expression, body: Expression) -> Expression {
    Expression::While(Box::new(While { loc, cond, body }))
}

pub fn break_(loc: LocOffsets, expr: Expression) -> Expression {
    Expression::Break(Box::new(Break { loc, expr }))
}

pub fn next(loc: LocOffsets, expr: Expression) -> Expression {
    Expression::Next(Box::new(Next { loc, expr }))
}

pub fn return_(loc: LocOffsets, expr: Expression) -> Expression {
    Expression::Return(Box::new(Return { loc, expr }))
}

pub fn retry(loc: LocOffsets) -> Expression {
    Expression::Retry(Box::new(Retry { loc }))
}

pub fn rescue(
    loc: LocOffsets,
    body: Expression,
    rescue_cases: Vec<RescueCase>,
    else_: Expression,
    ensure: Expression,
) -> Expression {
    Expression::Rescue(Box::new(Rescue {
        loc,
        body,
        rescue_cases,
        else_,
        ensure,
    }))
}

/// A rescue clause, unwrapped so it can go straight into `rescue`.
pub fn rescue_case(
    loc: LocOffsets,
    exceptions: Vec<Expression>,
    var: Expression,
    body: Expression,
) -> RescueCase {
    RescueCase {
        loc,
        exceptions,
        var,
        body,
    }
}

// =============================================================================
// Expressions
// =============================================================================

pub fn assign(loc: LocOffsets, lhs: Expression, rhs: Expression) -> Expression {
    Expression::Assign(Box::new(Assign { loc, lhs, rhs }))
}

pub fn send(
    loc: LocOffsets,
    recv: Expression,
    fun: NameRef,
    args: Vec<Expression>,
    block: Option<Box<Block>>,
) -> Expression {
    let flags = if recv.is_empty_tree() {
        SendFlags::PRIVATE_OK
    } else {
        SendFlags::empty()
    };
    Expression::Send(Box::new(Send {
        loc,
        recv,
        fun,
        args,
        block,
        flags,
    }))
}

pub fn send0(loc: LocOffsets, recv: Expression, fun: NameRef) -> Expression {
    send(loc, recv, fun, Vec::new(), None)
}

pub fn send1(loc: LocOffsets, recv: Expression, fun: NameRef, arg: Expression) -> Expression {
    send(loc, recv, fun, vec![arg], None)
}

/// A block, unwrapped so it can go straight into `send`.
pub fn block(loc: LocOffsets, args: Vec<Expression>, body: Expression) -> Box<Block> {
    Box::new(Block {
        loc,
        symbol: Symbols::NO_SYMBOL,
        args,
        body,
    })
}

pub fn hash(loc: LocOffsets, keys: Vec<Expression>, values: Vec<Expression>) -> Expression {
    assert_eq!(keys.len(), values.len(), "hash literal needs one value per key");
    Expression::Hash(Box::new(Hash { loc, keys, values }))
}

pub fn array(loc: LocOffsets, elems: Vec<Expression>) -> Expression {
    Expression::Array(Box::new(Array { loc, elems }))
}

pub fn literal(loc: LocOffsets, value: LiteralValue) -> Expression {
    Expression::Literal(Box::new(Literal { loc, value }))
}

pub fn int(loc: LocOffsets, value: i64) -> Expression {
    literal(loc, LiteralValue::Integer(value))
}

pub fn float(loc: LocOffsets, value: f64) -> Expression {
    literal(loc, LiteralValue::Float(value))
}

pub fn string(loc: LocOffsets, value: NameRef) -> Expression {
    literal(loc, LiteralValue::String(value))
}

pub fn symbol(loc: LocOffsets, value: NameRef) -> Expression {
    literal(loc, LiteralValue::Symbol(value))
}

pub fn nil(loc: LocOffsets) -> Expression {
    literal(loc, LiteralValue::Nil)
}

pub fn true_(loc: LocOffsets) -> Expression {
    literal(loc, LiteralValue::True)
}

pub fn false_(loc: LocOffsets) -> Expression {
    literal(loc, LiteralValue::False)
}

pub fn unresolved_constant(loc: LocOffsets, scope: Expression, cnst: NameRef) -> Expression {
    Expression::UnresolvedConstantLit(Box::new(UnresolvedConstantLit { loc, scope, cnst }))
}

pub fn constant(loc: LocOffsets, symbol: SymbolRef) -> Expression {
    Expression::ConstantLit(Box::new(ConstantLit { loc, symbol }))
}

pub fn ident(loc: LocOffsets, kind: IdentKind, name: NameRef) -> Expression {
    Expression::UnresolvedIdent(Box::new(UnresolvedIdent { loc, kind, name }))
}

pub fn local(loc: LocOffsets, local: LocalVariable) -> Expression {
    Expression::Local(Box::new(Local { loc, local }))
}

pub fn self_ref(loc: LocOffsets, claz: SymbolRef) -> Expression {
    Expression::SelfRef(Box::new(SelfRef { loc, claz }))
}

/// Sequence; collapses to `expr` when there are no statements.
pub fn ins_seq(loc: LocOffsets, stats: Vec<Expression>, expr: Expression) -> Expression {
    if stats.is_empty() {
        return expr;
    }
    Expression::InsSeq(Box::new(InsSeq { loc, stats, expr }))
}
