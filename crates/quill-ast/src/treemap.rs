//! TreeMap: generic rewriting traversal over owned trees.
//!
//! A pass implements `TreeMapper`, overriding only the hooks it cares about.
//! Every hook has a pass-through default, so an empty `impl TreeMapper for X {}`
//! is a valid (identity) pass.
//!
//! For each node the engine:
//! 1. calls the node kind's `pre_transform_*` hook, which receives the node by
//!    value and returns the node to continue with;
//! 2. if the hook returned a node of a different kind, starts over on that
//!    node (its own pre hook runs, then its children, then its post hook);
//! 3. otherwise rewrites every child in the fixed order listed on
//!    `TreeMap::apply`, splicing each result back in place;
//! 4. calls the kind's `post_transform_*` hook and returns its result.
//!
//! `ClassDef::name` is a declaration position and is not traversed.
//!
//! Blocks and rescue clauses live in typed slots (`Send::block`,
//! `Rescue::rescue_cases`); rewriting one into a different node kind is an
//! internal error.

use crate::nodes::*;
use quill_core::MutableContext;
use tracing::trace;

macro_rules! tree_mapper_hooks {
    ($($variant:ident($node:ident) => $pre:ident, $post:ident;)*) => {
        $(
            fn $pre(&mut self, _ctx: &mut MutableContext<'_>, original: Box<$node>) -> Expression {
                Expression::$variant(original)
            }

            fn $post(&mut self, _ctx: &mut MutableContext<'_>, original: Box<$node>) -> Expression {
                Expression::$variant(original)
            }
        )*
    };
}

/// Per-node-kind rewrite hooks.
///
/// Hooks own the node they are given and must hand back a tree to splice in
/// its place; returning `Expression::X(original)` leaves it untouched.
pub trait TreeMapper {
    tree_mapper_hooks! {
        ClassDef(ClassDef) => pre_transform_class_def, post_transform_class_def;
        MethodDef(MethodDef) => pre_transform_method_def, post_transform_method_def;
        If(If) => pre_transform_if, post_transform_if;
        While(While) => pre_transform_while, post_transform_while;
        Break(Break) => pre_transform_break, post_transform_break;
        Next(Next) => pre_transform_next, post_transform_next;
        Return(Return) => pre_transform_return, post_transform_return;
        Retry(Retry) => pre_transform_retry, post_transform_retry;
        Rescue(Rescue) => pre_transform_rescue, post_transform_rescue;
        RescueCase(RescueCase) => pre_transform_rescue_case, post_transform_rescue_case;
        Assign(Assign) => pre_transform_assign, post_transform_assign;
        Send(Send) => pre_transform_send, post_transform_send;
        Block(Block) => pre_transform_block, post_transform_block;
        Hash(Hash) => pre_transform_hash, post_transform_hash;
        Array(Array) => pre_transform_array, post_transform_array;
        Literal(Literal) => pre_transform_literal, post_transform_literal;
        UnresolvedConstantLit(UnresolvedConstantLit) => pre_transform_unresolved_constant_lit, post_transform_unresolved_constant_lit;
        ConstantLit(ConstantLit) => pre_transform_constant_lit, post_transform_constant_lit;
        UnresolvedIdent(UnresolvedIdent) => pre_transform_unresolved_ident, post_transform_unresolved_ident;
        Local(Local) => pre_transform_local, post_transform_local;
        SelfRef(SelfRef) => pre_transform_self, post_transform_self;
        InsSeq(InsSeq) => pre_transform_ins_seq, post_transform_ins_seq;
    }
}

pub struct TreeMap;

impl TreeMap {
    /// Rewrite `tree` with `mapper`, returning the new tree.
    ///
    /// Child order per kind:
    /// - `ClassDef`: ancestors, then rhs (with `ctx.owner` set to the class)
    /// - `MethodDef`: args, then rhs (with `ctx.owner` set to the method)
    /// - `If`: cond, thenp, elsep
    /// - `While`: cond, body
    /// - `Break` / `Next` / `Return`: expr
    /// - `Rescue`: body, rescue cases, else, ensure
    /// - `RescueCase`: exceptions, var, body
    /// - `Assign`: lhs, rhs
    /// - `Send`: recv, args, block
    /// - `Block`: args, body
    /// - `Hash`: keys, then values
    /// - `Array`: elems
    /// - `UnresolvedConstantLit`: scope
    /// - `InsSeq`: stats, expr
    pub fn apply<M: TreeMapper + ?Sized>(
        ctx: &mut MutableContext<'_>,
        mapper: &mut M,
        tree: Expression,
    ) -> Expression {
        Walker { mapper }.map_it(ctx, tree)
    }
}

struct Walker<'m, M: ?Sized> {
    mapper: &'m mut M,
}

impl<M: TreeMapper + ?Sized> Walker<'_, M> {
    fn map_child(&mut self, ctx: &mut MutableContext<'_>, child: &mut Expression) {
        let original = std::mem::take(child);
        *child = self.map_it(ctx, original);
    }

    fn map_children(&mut self, ctx: &mut MutableContext<'_>, children: &mut [Expression]) {
        for child in children {
            self.map_child(ctx, child);
        }
    }

    fn map_block(&mut self, ctx: &mut MutableContext<'_>, block: Box<Block>) -> Box<Block> {
        match self.map_it(ctx, Expression::Block(block)) {
            Expression::Block(block) => block,
            other => panic!("block rewritten into {}", other.kind().as_str()),
        }
    }

    fn map_rescue_case(&mut self, ctx: &mut MutableContext<'_>, case: RescueCase) -> RescueCase {
        match self.map_it(ctx, Expression::RescueCase(Box::new(case))) {
            Expression::RescueCase(case) => *case,
            other => panic!("rescue case rewritten into {}", other.kind().as_str()),
        }
    }

    /// Continue with a node a pre hook swapped in.
    fn redispatch(&mut self, ctx: &mut MutableContext<'_>, from: NodeKind, replacement: Expression) -> Expression {
        trace!(
            from = from.as_str(),
            to = replacement.kind().as_str(),
            "pre-transform replaced node"
        );
        self.map_it(ctx, replacement)
    }

    fn map_it(&mut self, ctx: &mut MutableContext<'_>, tree: Expression) -> Expression {
        match tree {
            Expression::EmptyTree => Expression::EmptyTree,

            Expression::ClassDef(node) => match self.mapper.pre_transform_class_def(ctx, node) {
                Expression::ClassDef(mut node) => {
                    self.map_children(ctx, &mut node.ancestors);
                    {
                        let mut ctx = ctx.with_owner(node.symbol);
                        self.map_children(&mut ctx, &mut node.rhs);
                    }
                    self.mapper.post_transform_class_def(ctx, node)
                }
                other => self.redispatch(ctx, NodeKind::ClassDef, other),
            },

            Expression::MethodDef(node) => match self.mapper.pre_transform_method_def(ctx, node) {
                Expression::MethodDef(mut node) => {
                    {
                        let mut ctx = ctx.with_owner(node.symbol);
                        self.map_children(&mut ctx, &mut node.args);
                        self.map_child(&mut ctx, &mut node.rhs);
                    }
                    self.mapper.post_transform_method_def(ctx, node)
                }
                other => self.redispatch(ctx, NodeKind::MethodDef, other),
            },

            Expression::If(node) => match self.mapper.pre_transform_if(ctx, node) {
                Expression::If(mut node) => {
                    self.map_child(ctx, &mut node.cond);
                    self.map_child(ctx, &mut node.thenp);
                    self.map_child(ctx, &mut node.elsep);
                    self.mapper.post_transform_if(ctx, node)
                }
                other => self.redispatch(ctx, NodeKind::If, other),
            },

            Expression::While(node) => match self.mapper.pre_transform_while(ctx, node) {
                Expression::While(mut node) => {
                    self.map_child(ctx, &mut node.cond);
                    self.map_child(ctx, &mut node.body);
                    self.mapper.post_transform_while(ctx, node)
                }
                other => self.redispatch(ctx, NodeKind::While, other),
            },

            Expression::Break(node) => match self.mapper.pre_transform_break(ctx, node) {
                Expression::Break(mut node) => {
                    self.map_child(ctx, &mut node.expr);
                    self.mapper.post_transform_break(ctx, node)
                }
                other => self.redispatch(ctx, NodeKind::Break, other),
            },

            Expression::Next(node) => match self.mapper.pre_transform_next(ctx, node) {
                Expression::Next(mut node) => {
                    self.map_child(ctx, &mut node.expr);
                    self.mapper.post_transform_next(ctx, node)
                }
                other => self.redispatch(ctx, NodeKind::Next, other),
            },

            Expression::Return(node) => match self.mapper.pre_transform_return(ctx, node) {
                Expression::Return(mut node) => {
                    self.map_child(ctx, &mut node.expr);
                    self.mapper.post_transform_return(ctx, node)
                }
                other => self.redispatch(ctx, NodeKind::Return, other),
            },

            Expression::Retry(node) => match self.mapper.pre_transform_retry(ctx, node) {
                Expression::Retry(node) => self.mapper.post_transform_retry(ctx, node),
                other => self.redispatch(ctx, NodeKind::Retry, other),
            },

            Expression::Rescue(node) => match self.mapper.pre_transform_rescue(ctx, node) {
                Expression::Rescue(mut node) => {
                    self.map_child(ctx, &mut node.body);
                    let cases = std::mem::take(&mut node.rescue_cases);
                    node.rescue_cases = cases
                        .into_iter()
                        .map(|case| self.map_rescue_case(ctx, case))
                        .collect();
                    self.map_child(ctx, &mut node.else_);
                    self.map_child(ctx, &mut node.ensure);
                    self.mapper.post_transform_rescue(ctx, node)
                }
                other => self.redispatch(ctx, NodeKind::Rescue, other),
            },

            Expression::RescueCase(node) => match self.mapper.pre_transform_rescue_case(ctx, node) {
                Expression::RescueCase(mut node) => {
                    self.map_children(ctx, &mut node.exceptions);
                    self.map_child(ctx, &mut node.var);
                    self.map_child(ctx, &mut node.body);
                    self.mapper.post_transform_rescue_case(ctx, node)
                }
                other => self.redispatch(ctx, NodeKind::RescueCase, other),
            },

            Expression::Assign(node) => match self.mapper.pre_transform_assign(ctx, node) {
                Expression::Assign(mut node) => {
                    self.map_child(ctx, &mut node.lhs);
                    self.map_child(ctx, &mut node.rhs);
                    self.mapper.post_transform_assign(ctx, node)
                }
                other => self.redispatch(ctx, NodeKind::Assign, other),
            },

            Expression::Send(node) => match self.mapper.pre_transform_send(ctx, node) {
                Expression::Send(mut node) => {
                    self.map_child(ctx, &mut node.recv);
                    self.map_children(ctx, &mut node.args);
                    if let Some(block) = node.block.take() {
                        node.block = Some(self.map_block(ctx, block));
                    }
                    self.mapper.post_transform_send(ctx, node)
                }
                other => self.redispatch(ctx, NodeKind::Send, other),
            },

            Expression::Block(node) => match self.mapper.pre_transform_block(ctx, node) {
                Expression::Block(mut node) => {
                    self.map_children(ctx, &mut node.args);
                    self.map_child(ctx, &mut node.body);
                    self.mapper.post_transform_block(ctx, node)
                }
                other => self.redispatch(ctx, NodeKind::Block, other),
            },

            Expression::Hash(node) => match self.mapper.pre_transform_hash(ctx, node) {
                Expression::Hash(mut node) => {
                    self.map_children(ctx, &mut node.keys);
                    self.map_children(ctx, &mut node.values);
                    self.mapper.post_transform_hash(ctx, node)
                }
                other => self.redispatch(ctx, NodeKind::Hash, other),
            },

            Expression::Array(node) => match self.mapper.pre_transform_array(ctx, node) {
                Expression::Array(mut node) => {
                    self.map_children(ctx, &mut node.elems);
                    self.mapper.post_transform_array(ctx, node)
                }
                other => self.redispatch(ctx, NodeKind::Array, other),
            },

            Expression::Literal(node) => match self.mapper.pre_transform_literal(ctx, node) {
                Expression::Literal(node) => self.mapper.post_transform_literal(ctx, node),
                other => self.redispatch(ctx, NodeKind::Literal, other),
            },

            Expression::UnresolvedConstantLit(node) => {
                match self.mapper.pre_transform_unresolved_constant_lit(ctx, node) {
                    Expression::UnresolvedConstantLit(mut node) => {
                        self.map_child(ctx, &mut node.scope);
                        self.mapper.post_transform_unresolved_constant_lit(ctx, node)
                    }
                    other => self.redispatch(ctx, NodeKind::UnresolvedConstantLit, other),
                }
            }

            Expression::ConstantLit(node) => match self.mapper.pre_transform_constant_lit(ctx, node) {
                Expression::ConstantLit(node) => self.mapper.post_transform_constant_lit(ctx, node),
                other => self.redispatch(ctx, NodeKind::ConstantLit, other),
            },

            Expression::UnresolvedIdent(node) => {
                match self.mapper.pre_transform_unresolved_ident(ctx, node) {
                    Expression::UnresolvedIdent(node) => {
                        self.mapper.post_transform_unresolved_ident(ctx, node)
                    }
                    other => self.redispatch(ctx, NodeKind::UnresolvedIdent, other),
                }
            }

            Expression::Local(node) => match self.mapper.pre_transform_local(ctx, node) {
                Expression::Local(node) => self.mapper.post_transform_local(ctx, node),
                other => self.redispatch(ctx, NodeKind::Local, other),
            },

            Expression::SelfRef(node) => match self.mapper.pre_transform_self(ctx, node) {
                Expression::SelfRef(node) => self.mapper.post_transform_self(ctx, node),
                other => self.redispatch(ctx, NodeKind::SelfRef, other),
            },

            Expression::InsSeq(node) => match self.mapper.pre_transform_ins_seq(ctx, node) {
                Expression::InsSeq(mut node) => {
                    self.map_children(ctx, &mut node.stats);
                    self.map_child(ctx, &mut node.expr);
                    self.mapper.post_transform_ins_seq(ctx, node)
                }
                other => self.redispatch(ctx, NodeKind::InsSeq, other),
            },
        }
    }
}
