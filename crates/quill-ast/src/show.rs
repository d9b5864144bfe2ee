//! Structural tree dump for debugging.
//!
//! ```text
//! ClassDef{
//!   kind = class
//!   name = UnresolvedConstantLit{ scope = EmptyTree, cnst = <C <U Foo>> }
//!   symbol = class(Foo, <C <U Foo>>)
//!   ancestors = []
//!   rhs = [
//!     Literal{ value = 5 }
//!   ]
//! }
//! ```

use crate::nodes::*;
use quill_core::GlobalState;
use std::fmt::Write;

impl Expression {
    /// Render the tree with every handle shown in its raw form.
    pub fn show_raw(&self, gs: &GlobalState) -> String {
        let mut printer = RawPrinter {
            gs,
            out: String::new(),
            indent: 0,
        };
        printer.expr(self);
        printer.out
    }
}

struct RawPrinter<'gs> {
    gs: &'gs GlobalState,
    out: String,
    indent: usize,
}

impl RawPrinter<'_> {
    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn open(&mut self, name: &str) {
        self.out.push_str(name);
        self.out.push('{');
        self.indent += 1;
    }

    fn close(&mut self) {
        self.indent -= 1;
        self.newline();
        self.out.push('}');
    }

    fn field(&mut self, name: &str, value: &Expression) {
        self.newline();
        let _ = write!(self.out, "{name} = ");
        self.expr(value);
    }

    fn text_field(&mut self, name: &str, value: &str) {
        self.newline();
        let _ = write!(self.out, "{name} = {value}");
    }

    fn list(&mut self, name: &str, values: &[Expression]) {
        self.newline();
        let _ = write!(self.out, "{name} = [");
        if values.is_empty() {
            self.out.push(']');
            return;
        }
        self.indent += 1;
        for value in values {
            self.newline();
            self.expr(value);
        }
        self.indent -= 1;
        self.newline();
        self.out.push(']');
    }

    /// A node with no children, on one line.
    fn leaf(&mut self, name: &str, fields: &[(&str, String)]) {
        let _ = write!(self.out, "{name}{{");
        for (i, (field, value)) in fields.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            let _ = write!(self.out, "{sep}{field} = {value}");
        }
        self.out.push_str(" }");
    }

    fn rescue_case(&mut self, case: &RescueCase) {
        self.open("RescueCase");
        self.list("exceptions", &case.exceptions);
        self.field("var", &case.var);
        self.field("body", &case.body);
        self.close();
    }

    fn expr(&mut self, tree: &Expression) {
        let gs = self.gs;
        match tree {
            Expression::EmptyTree => self.out.push_str("EmptyTree"),
            Expression::ClassDef(n) => {
                self.open("ClassDef");
                let kind = match n.kind {
                    ClassDefKind::Class => "class",
                    ClassDefKind::Module => "module",
                };
                self.text_field("kind", kind);
                self.field("name", &n.name);
                self.text_field("symbol", &n.symbol.show_raw(gs));
                self.list("ancestors", &n.ancestors);
                self.list("rhs", &n.rhs);
                self.close();
            }
            Expression::MethodDef(n) => {
                self.open("MethodDef");
                self.text_field("name", &n.name.show_raw(gs));
                self.text_field("symbol", &n.symbol.show_raw(gs));
                if !n.flags.is_empty() {
                    self.text_field("flags", &format!("{:?}", n.flags));
                }
                self.list("args", &n.args);
                self.field("rhs", &n.rhs);
                self.close();
            }
            Expression::If(n) => {
                self.open("If");
                self.field("cond", &n.cond);
                self.field("thenp", &n.thenp);
                self.field("elsep", &n.elsep);
                self.close();
            }
            Expression::While(n) => {
                self.open("While");
                self.field("cond", &n.cond);
                self.field("body", &n.body);
                self.close();
            }
            Expression::Break(n) => {
                self.open("Break");
                self.field("expr", &n.expr);
                self.close();
            }
            Expression::Next(n) => {
                self.open("Next");
                self.field("expr", &n.expr);
                self.close();
            }
            Expression::Return(n) => {
                self.open("Return");
                self.field("expr", &n.expr);
                self.close();
            }
            Expression::Retry(_) => self.leaf("Retry", &[]),
            Expression::Rescue(n) => {
                self.open("Rescue");
                self.field("body", &n.body);
                self.newline();
                self.out.push_str("rescue_cases = [");
                self.indent += 1;
                for case in &n.rescue_cases {
                    self.newline();
                    self.rescue_case(case);
                }
                self.indent -= 1;
                self.newline();
                self.out.push(']');
                self.field("else", &n.else_);
                self.field("ensure", &n.ensure);
                self.close();
            }
            Expression::RescueCase(n) => self.rescue_case(n),
            Expression::Assign(n) => {
                self.open("Assign");
                self.field("lhs", &n.lhs);
                self.field("rhs", &n.rhs);
                self.close();
            }
            Expression::Send(n) => {
                self.open("Send");
                self.field("recv", &n.recv);
                self.text_field("fun", &n.fun.show_raw(gs));
                self.list("args", &n.args);
                if let Some(block) = &n.block {
                    self.newline();
                    self.out.push_str("block = ");
                    self.block(block);
                }
                self.close();
            }
            Expression::Block(n) => self.block(n),
            Expression::Hash(n) => {
                self.open("Hash");
                self.list("keys", &n.keys);
                self.list("values", &n.values);
                self.close();
            }
            Expression::Array(n) => {
                self.open("Array");
                self.list("elems", &n.elems);
                self.close();
            }
            Expression::Literal(n) => {
                let value = match &n.value {
                    LiteralValue::Integer(v) => v.to_string(),
                    LiteralValue::Float(v) => v.to_string(),
                    LiteralValue::String(name) => format!("String({})", name.show_raw(gs)),
                    LiteralValue::Symbol(name) => format!("Symbol({})", name.show_raw(gs)),
                    LiteralValue::Nil => "nil".to_string(),
                    LiteralValue::True => "true".to_string(),
                    LiteralValue::False => "false".to_string(),
                };
                self.leaf("Literal", &[("value", value)]);
            }
            Expression::UnresolvedConstantLit(n) => {
                if n.scope.is_empty_tree() {
                    self.leaf(
                        "UnresolvedConstantLit",
                        &[("scope", "EmptyTree".to_string()), ("cnst", n.cnst.show_raw(gs))],
                    );
                } else {
                    self.open("UnresolvedConstantLit");
                    self.field("scope", &n.scope);
                    self.text_field("cnst", &n.cnst.show_raw(gs));
                    self.close();
                }
            }
            Expression::ConstantLit(n) => {
                self.leaf("ConstantLit", &[("symbol", n.symbol.show_raw(gs))]);
            }
            Expression::UnresolvedIdent(n) => {
                let kind = match n.kind {
                    IdentKind::Local => "Local",
                    IdentKind::Instance => "Instance",
                    IdentKind::Class => "Class",
                    IdentKind::Global => "Global",
                };
                self.leaf(
                    "UnresolvedIdent",
                    &[("kind", kind.to_string()), ("name", n.name.show_raw(gs))],
                );
            }
            Expression::Local(n) => {
                self.leaf("Local", &[("local", n.local.show_raw(gs))]);
            }
            Expression::SelfRef(n) => {
                self.leaf("Self", &[("claz", n.claz.show_raw(gs))]);
            }
            Expression::InsSeq(n) => {
                self.open("InsSeq");
                self.list("stats", &n.stats);
                self.field("expr", &n.expr);
                self.close();
            }
        }
    }

    fn block(&mut self, block: &Block) {
        self.open("Block");
        self.list("args", &block.args);
        self.field("body", &block.body);
        self.close();
    }
}
