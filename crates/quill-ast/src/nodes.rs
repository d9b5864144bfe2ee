//! Owned expression trees.
//!
//! A tree is a closed sum type: every node is exactly one `Expression`
//! variant and owns its children outright. There is no sharing and there are
//! no back edges; rewriting moves nodes, it never copies them.
//!
//! Node locations are byte offsets into the file of the compilation unit.
//! Definitions additionally carry the full `Loc` of their declaration.

use bitflags::bitflags;
use quill_core::{LocalVariable, Loc, LocOffsets, NameRef, SymbolRef};

/// One node of a tree. Trees are moved between passes and cannot be cloned:
///
/// ```compile_fail
/// fn copy_of(tree: &quill_ast::Expression) -> quill_ast::Expression {
///     tree.clone()
/// }
/// ```
#[derive(Debug, PartialEq, Default)]
pub enum Expression {
    /// Absent subtree (missing else branch, no receiver, ...).
    #[default]
    EmptyTree,

    // =========================================================================
    // Definitions
    // =========================================================================
    ClassDef(Box<ClassDef>),
    MethodDef(Box<MethodDef>),

    // =========================================================================
    // Control flow
    // =========================================================================
    If(Box<If>),
    While(Box<While>),
    Break(Box<Break>),
    Next(Box<Next>),
    Return(Box<Return>),
    Retry(Box<Retry>),
    Rescue(Box<Rescue>),
    RescueCase(Box<RescueCase>),

    // =========================================================================
    // Expressions
    // =========================================================================
    Assign(Box<Assign>),
    Send(Box<Send>),
    Block(Box<Block>),
    Hash(Box<Hash>),
    Array(Box<Array>),
    Literal(Box<Literal>),
    UnresolvedConstantLit(Box<UnresolvedConstantLit>),
    ConstantLit(Box<ConstantLit>),
    UnresolvedIdent(Box<UnresolvedIdent>),
    Local(Box<Local>),
    SelfRef(Box<SelfRef>),
    InsSeq(Box<InsSeq>),
}

/// Discriminant of an `Expression`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    EmptyTree,
    ClassDef,
    MethodDef,
    If,
    While,
    Break,
    Next,
    Return,
    Retry,
    Rescue,
    RescueCase,
    Assign,
    Send,
    Block,
    Hash,
    Array,
    Literal,
    UnresolvedConstantLit,
    ConstantLit,
    UnresolvedIdent,
    Local,
    SelfRef,
    InsSeq,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::EmptyTree => "EmptyTree",
            NodeKind::ClassDef => "ClassDef",
            NodeKind::MethodDef => "MethodDef",
            NodeKind::If => "If",
            NodeKind::While => "While",
            NodeKind::Break => "Break",
            NodeKind::Next => "Next",
            NodeKind::Return => "Return",
            NodeKind::Retry => "Retry",
            NodeKind::Rescue => "Rescue",
            NodeKind::RescueCase => "RescueCase",
            NodeKind::Assign => "Assign",
            NodeKind::Send => "Send",
            NodeKind::Block => "Block",
            NodeKind::Hash => "Hash",
            NodeKind::Array => "Array",
            NodeKind::Literal => "Literal",
            NodeKind::UnresolvedConstantLit => "UnresolvedConstantLit",
            NodeKind::ConstantLit => "ConstantLit",
            NodeKind::UnresolvedIdent => "UnresolvedIdent",
            NodeKind::Local => "Local",
            NodeKind::SelfRef => "Self",
            NodeKind::InsSeq => "InsSeq",
        }
    }
}

impl Expression {
    pub fn kind(&self) -> NodeKind {
        match self {
            Expression::EmptyTree => NodeKind::EmptyTree,
            Expression::ClassDef(_) => NodeKind::ClassDef,
            Expression::MethodDef(_) => NodeKind::MethodDef,
            Expression::If(_) => NodeKind::If,
            Expression::While(_) => NodeKind::While,
            Expression::Break(_) => NodeKind::Break,
            Expression::Next(_) => NodeKind::Next,
            Expression::Return(_) => NodeKind::Return,
            Expression::Retry(_) => NodeKind::Retry,
            Expression::Rescue(_) => NodeKind::Rescue,
            Expression::RescueCase(_) => NodeKind::RescueCase,
            Expression::Assign(_) => NodeKind::Assign,
            Expression::Send(_) => NodeKind::Send,
            Expression::Block(_) => NodeKind::Block,
            Expression::Hash(_) => NodeKind::Hash,
            Expression::Array(_) => NodeKind::Array,
            Expression::Literal(_) => NodeKind::Literal,
            Expression::UnresolvedConstantLit(_) => NodeKind::UnresolvedConstantLit,
            Expression::ConstantLit(_) => NodeKind::ConstantLit,
            Expression::UnresolvedIdent(_) => NodeKind::UnresolvedIdent,
            Expression::Local(_) => NodeKind::Local,
            Expression::SelfRef(_) => NodeKind::SelfRef,
            Expression::InsSeq(_) => NodeKind::InsSeq,
        }
    }

    /// Offsets of this node; `LocOffsets::NONE` for an empty tree.
    pub fn loc(&self) -> LocOffsets {
        match self {
            Expression::EmptyTree => LocOffsets::NONE,
            Expression::ClassDef(n) => n.loc,
            Expression::MethodDef(n) => n.loc,
            Expression::If(n) => n.loc,
            Expression::While(n) => n.loc,
            Expression::Break(n) => n.loc,
            Expression::Next(n) => n.loc,
            Expression::Return(n) => n.loc,
            Expression::Retry(n) => n.loc,
            Expression::Rescue(n) => n.loc,
            Expression::RescueCase(n) => n.loc,
            Expression::Assign(n) => n.loc,
            Expression::Send(n) => n.loc,
            Expression::Block(n) => n.loc,
            Expression::Hash(n) => n.loc,
            Expression::Array(n) => n.loc,
            Expression::Literal(n) => n.loc,
            Expression::UnresolvedConstantLit(n) => n.loc,
            Expression::ConstantLit(n) => n.loc,
            Expression::UnresolvedIdent(n) => n.loc,
            Expression::Local(n) => n.loc,
            Expression::SelfRef(n) => n.loc,
            Expression::InsSeq(n) => n.loc,
        }
    }

    #[inline]
    pub fn is_empty_tree(&self) -> bool {
        matches!(self, Expression::EmptyTree)
    }
}

// =============================================================================
// Definitions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassDefKind {
    Class,
    Module,
}

#[derive(Debug, PartialEq)]
pub struct ClassDef {
    pub loc: LocOffsets,
    pub decl_loc: Loc,
    pub symbol: SymbolRef,
    pub kind: ClassDefKind,
    /// The constant being defined. A declaration position, not a reference.
    pub name: Expression,
    pub ancestors: Vec<Expression>,
    pub rhs: Vec<Expression>,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodDefFlags: u8 {
        /// `def self.foo`
        const SELF_METHOD = 1 << 0;
        /// Synthesized by a rewriting pass rather than written by the user.
        const REWRITER_SYNTHESIZED = 1 << 1;
    }
}

#[derive(Debug, PartialEq)]
pub struct MethodDef {
    pub loc: LocOffsets,
    pub decl_loc: Loc,
    pub symbol: SymbolRef,
    pub name: NameRef,
    pub args: Vec<Expression>,
    pub rhs: Expression,
    pub flags: MethodDefFlags,
}

// =============================================================================
// Control flow
// =============================================================================

#[derive(Debug, PartialEq)]
pub struct If {
    pub loc: LocOffsets,
    pub cond: Expression,
    pub thenp: Expression,
    pub elsep: Expression,
}

#[derive(Debug, PartialEq)]
pub struct While {
    pub loc: LocOffsets,
    pub cond: Expression,
    pub body: Expression,
}

#[derive(Debug, PartialEq)]
pub struct Break {
    pub loc: LocOffsets,
    pub expr: Expression,
}

#[derive(Debug, PartialEq)]
pub struct Next {
    pub loc: LocOffsets,
    pub expr: Expression,
}

#[derive(Debug, PartialEq)]
pub struct Return {
    pub loc: LocOffsets,
    pub expr: Expression,
}

#[derive(Debug, PartialEq)]
pub struct Retry {
    pub loc: LocOffsets,
}

#[derive(Debug, PartialEq)]
pub struct Rescue {
    pub loc: LocOffsets,
    pub body: Expression,
    pub rescue_cases: Vec<RescueCase>,
    pub else_: Expression,
    pub ensure: Expression,
}

/// One `rescue Foo, Bar => e` clause.
#[derive(Debug, PartialEq)]
pub struct RescueCase {
    pub loc: LocOffsets,
    pub exceptions: Vec<Expression>,
    pub var: Expression,
    pub body: Expression,
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Debug, PartialEq)]
pub struct Assign {
    pub loc: LocOffsets,
    pub lhs: Expression,
    pub rhs: Expression,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SendFlags: u8 {
        /// Receiver was implicit, so private methods may be called.
        const PRIVATE_OK = 1 << 0;
    }
}

/// A method call: `recv.fun(args) { block }`.
#[derive(Debug, PartialEq)]
pub struct Send {
    pub loc: LocOffsets,
    pub recv: Expression,
    pub fun: NameRef,
    pub args: Vec<Expression>,
    pub block: Option<Box<Block>>,
    pub flags: SendFlags,
}

#[derive(Debug, PartialEq)]
pub struct Block {
    pub loc: LocOffsets,
    pub symbol: SymbolRef,
    pub args: Vec<Expression>,
    pub body: Expression,
}

/// `{k1 => v1, ...}`; `keys` and `values` have equal length.
#[derive(Debug, PartialEq)]
pub struct Hash {
    pub loc: LocOffsets,
    pub keys: Vec<Expression>,
    pub values: Vec<Expression>,
}

#[derive(Debug, PartialEq)]
pub struct Array {
    pub loc: LocOffsets,
    pub elems: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Integer(i64),
    Float(f64),
    String(NameRef),
    Symbol(NameRef),
    Nil,
    True,
    False,
}

#[derive(Debug, PartialEq)]
pub struct Literal {
    pub loc: LocOffsets,
    pub value: LiteralValue,
}

/// `scope::Cnst` before resolution; `scope` is `EmptyTree` for a bare constant.
#[derive(Debug, PartialEq)]
pub struct UnresolvedConstantLit {
    pub loc: LocOffsets,
    pub scope: Expression,
    pub cnst: NameRef,
}

/// A constant reference resolved to its symbol.
#[derive(Debug, PartialEq)]
pub struct ConstantLit {
    pub loc: LocOffsets,
    pub symbol: SymbolRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentKind {
    Local,
    Instance,
    Class,
    Global,
}

#[derive(Debug, PartialEq)]
pub struct UnresolvedIdent {
    pub loc: LocOffsets,
    pub kind: IdentKind,
    pub name: NameRef,
}

#[derive(Debug, PartialEq)]
pub struct Local {
    pub loc: LocOffsets,
    pub local: LocalVariable,
}

/// `self`, typed as an instance of `claz`.
#[derive(Debug, PartialEq)]
pub struct SelfRef {
    pub loc: LocOffsets,
    pub claz: SymbolRef,
}

/// Statements evaluated for effect, followed by the result expression.
#[derive(Debug, PartialEq)]
pub struct InsSeq {
    pub loc: LocOffsets,
    pub stats: Vec<Expression>,
    pub expr: Expression,
}
