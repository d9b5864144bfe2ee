//! Remapping every handle embedded in a tree through a `GlobalSubstitution`.

use crate::nodes::*;
use crate::treemap::{TreeMap, TreeMapper};
use quill_core::{GlobalSubstitution, MutableContext};

/// Rewrite `tree`, produced against a fork, so every handle in it is valid
/// in `ctx`'s state (the substitution's destination).
pub fn substitute_tree(
    ctx: &mut MutableContext<'_>,
    subst: &GlobalSubstitution,
    tree: Expression,
) -> Expression {
    assert_eq!(
        subst.to_lineage(),
        ctx.lineage(),
        "substituting a tree into a GlobalState the substitution does not target"
    );
    TreeMap::apply(ctx, &mut Substituter { subst }, tree)
}

struct Substituter<'s> {
    subst: &'s GlobalSubstitution,
}

impl TreeMapper for Substituter<'_> {
    fn post_transform_class_def(&mut self, ctx: &mut MutableContext<'_>, mut original: Box<ClassDef>) -> Expression {
        original.symbol = self.subst.substitute(original.symbol);
        // The engine skips the name; it still holds handles.
        let name = std::mem::take(&mut original.name);
        original.name = TreeMap::apply(ctx, self, name);
        Expression::ClassDef(original)
    }

    fn post_transform_method_def(&mut self, _ctx: &mut MutableContext<'_>, mut original: Box<MethodDef>) -> Expression {
        original.symbol = self.subst.substitute(original.symbol);
        original.name = self.subst.substitute(original.name);
        Expression::MethodDef(original)
    }

    fn post_transform_send(&mut self, _ctx: &mut MutableContext<'_>, mut original: Box<Send>) -> Expression {
        original.fun = self.subst.substitute(original.fun);
        Expression::Send(original)
    }

    fn post_transform_block(&mut self, _ctx: &mut MutableContext<'_>, mut original: Box<Block>) -> Expression {
        original.symbol = self.subst.substitute(original.symbol);
        Expression::Block(original)
    }

    fn post_transform_literal(&mut self, _ctx: &mut MutableContext<'_>, mut original: Box<Literal>) -> Expression {
        match &mut original.value {
            LiteralValue::String(name) | LiteralValue::Symbol(name) => {
                *name = self.subst.substitute(*name);
            }
            LiteralValue::Integer(_)
            | LiteralValue::Float(_)
            | LiteralValue::Nil
            | LiteralValue::True
            | LiteralValue::False => {}
        }
        Expression::Literal(original)
    }

    fn post_transform_unresolved_constant_lit(
        &mut self,
        _ctx: &mut MutableContext<'_>,
        mut original: Box<UnresolvedConstantLit>,
    ) -> Expression {
        original.cnst = self.subst.substitute(original.cnst);
        Expression::UnresolvedConstantLit(original)
    }

    fn post_transform_constant_lit(&mut self, _ctx: &mut MutableContext<'_>, mut original: Box<ConstantLit>) -> Expression {
        original.symbol = self.subst.substitute(original.symbol);
        Expression::ConstantLit(original)
    }

    fn post_transform_unresolved_ident(
        &mut self,
        _ctx: &mut MutableContext<'_>,
        mut original: Box<UnresolvedIdent>,
    ) -> Expression {
        original.name = self.subst.substitute(original.name);
        Expression::UnresolvedIdent(original)
    }

    fn post_transform_local(&mut self, _ctx: &mut MutableContext<'_>, mut original: Box<Local>) -> Expression {
        original.local = self.subst.substitute(original.local);
        Expression::Local(original)
    }

    fn post_transform_self(&mut self, _ctx: &mut MutableContext<'_>, mut original: Box<SelfRef>) -> Expression {
        original.claz = self.subst.substitute(original.claz);
        Expression::SelfRef(original)
    }
}
