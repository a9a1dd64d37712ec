//! Statement productions.
//!
//! Statements write their own lines at the cursor and report
//! [`Attempt::Done`]; a production whose preconditions fail reports
//! [`Attempt::Declined`] and another is drawn.
mod control;

use crate::context::Context;
use crate::expr::Attempt;
use crate::types::{Trait, TypeClass, TypeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StmtKind {
    ShortDecl,
    LongDecl,
    Assign,
    IncDec,
    If,
    For,
    Send,
    Recv,
    Select,
    Call,
    TypeSwitch,
    ValueSwitch,
    TypeDecl,
    Break,
    Continue,
    Goto,
    Sink,
}

const STATEMENTS: [StmtKind; 17] = [
    StmtKind::ShortDecl,
    StmtKind::LongDecl,
    StmtKind::Assign,
    StmtKind::IncDec,
    StmtKind::If,
    StmtKind::For,
    StmtKind::Send,
    StmtKind::Recv,
    StmtKind::Select,
    StmtKind::Call,
    StmtKind::TypeSwitch,
    StmtKind::ValueSwitch,
    StmtKind::TypeDecl,
    StmtKind::Break,
    StmtKind::Continue,
    StmtKind::Goto,
    StmtKind::Sink,
];

impl Context {
    pub fn statement(&mut self) {
        if self.counters.stmt_count >= self.config.statements {
            return;
        }
        self.counters.stmt_count += 1;
        self.counters.expr_count = 0;
        let mut table = STATEMENTS.to_vec();
        while !table.is_empty() {
            let kind = table.swap_remove(self.rnd(table.len()));
            if self.attempt_stmt(kind) != Attempt::Declined {
                return;
            }
        }
    }

    fn attempt_stmt(&mut self, kind: StmtKind) -> Attempt {
        match kind {
            StmtKind::ShortDecl => self.stmt_short_decl(),
            StmtKind::LongDecl => self.stmt_long_decl(),
            StmtKind::Assign => self.stmt_assign(),
            StmtKind::IncDec => {
                let t = self.atype(Trait::Class(TypeClass::Numeric));
                let target = self.assignable(t);
                let op = self.choose(&["++", "--"]);
                self.line(format!("{} {}", target, op))
            }
            StmtKind::If => self.stmt_if(),
            StmtKind::For => self.stmt_for(),
            StmtKind::Send => {
                let t = self.atype(Trait::Sendable);
                let elem = self.types[t].elem;
                match elem {
                    Some(elem) => {
                        let (ch, v) = (self.rvalue(t), self.rvalue(elem));
                        self.line(format!("({}) <- ({})", ch, v))
                    }
                    None => Attempt::Declined,
                }
            }
            StmtKind::Recv => self.stmt_recv(),
            StmtKind::Select => self.stmt_select(),
            StmtKind::Call => self.stmt_call(),
            StmtKind::TypeSwitch => self.stmt_type_switch(),
            StmtKind::ValueSwitch => self.stmt_value_switch(),
            StmtKind::TypeDecl => self.stmt_type_decl(),
            StmtKind::Break if self.tree.block(self.cursor.block).breakable => self.line("break"),
            StmtKind::Continue if self.tree.block(self.cursor.block).continuable => self.line("continue"),
            StmtKind::Break | StmtKind::Continue => Attempt::Declined,
            StmtKind::Goto if self.config.nonterminating => {
                let label = self.materialize_label();
                self.line(format!("goto {}", label))
            }
            StmtKind::Goto => Attempt::Declined,
            StmtKind::Sink => {
                let t = self.atype(Trait::Any);
                let v = self.rvalue(t);
                self.line(format!("SINK = {}", v))
            }
        }
    }

    fn line(&mut self, text: impl Into<String>) -> Attempt {
        self.tree.emit(&mut self.cursor, text);
        Attempt::Done
    }

    /// Declare `name` of type `t` on the line just emitted at the cursor.
    fn declare_here(&mut self, line: crate::scope::LineId, name: &str, t: TypeId) {
        let block = self.cursor.block;
        self.tree.declare_var(line, Some(block), name, t);
    }

    // --------------------------- Simple statements ------------------------ //

    fn stmt_short_decl(&mut self) -> Attempt {
        let t = self.atype(Trait::Any);
        let id = self.new_id("Var");
        let init = self.rvalue(t);
        let line = self.tree.emit(&mut self.cursor, format!("{} := {}", id, init));
        self.declare_here(line, &id, t);
        Attempt::Done
    }

    fn stmt_long_decl(&mut self) -> Attempt {
        let t = self.atype(Trait::Any);
        let id = self.new_id("Var");
        let text = if self.coin() {
            let value = self.rvalue(t);
            format!("var {} {} = {}", id, self.types[t].id, value)
        } else {
            format!("var {} {}", id, self.types[t].id)
        };
        let line = self.tree.emit(&mut self.cursor, text);
        self.declare_here(line, &id, t);
        Attempt::Done
    }

    fn stmt_assign(&mut self) -> Attempt {
        let types = self.atype_list(Trait::Any);
        let targets: Vec<String> = types.iter().map(|t| self.assignable(*t)).collect();
        let values = self.rvalue_list(&types);
        self.line(format!("{} = {}", targets.join(", "), values))
    }

    fn stmt_recv(&mut self) -> Attempt {
        let t = self.atype(Trait::Receivable);
        let Some(elem) = self.types[t].elem else { return Attempt::Declined };
        let ch = self.rvalue(t);
        let bool_ = self.types.pre.bool_;
        match self.rnd(5) {
            0 => self.line(format!("<-({})", ch)),
            1 => {
                let v = self.assignable(elem);
                self.line(format!("{} = <-({})", v, ch))
            }
            2 => {
                let (v, ok) = (self.assignable(elem), self.assignable(bool_));
                self.line(format!("{}, {} = <-({})", v, ok, ch))
            }
            3 => {
                let v = self.new_id("Var");
                let line = self.tree.emit(&mut self.cursor, format!("{} := <-({})", v, ch));
                self.declare_here(line, &v, elem);
                Attempt::Done
            }
            _ => {
                let (v, ok) = (self.new_id("Var"), self.new_id("Var"));
                let line = self.tree.emit(&mut self.cursor, format!("{}, {} := <-({})", v, ok, ch));
                self.declare_here(line, &v, elem);
                self.declare_here(line, &ok, bool_);
                Attempt::Done
            }
        }
    }

    fn stmt_call(&mut self) -> Attempt {
        let prefix = self.choose(&["", "", "defer ", "go "]);
        let call = if self.coin() {
            self.builtin_stmt()
        } else {
            let f = self.atype(Trait::Class(TypeClass::Function));
            let params = self.types[f].params.clone();
            format!("({})({})", self.rvalue(f), self.rvalue_list(&params))
        };
        self.line(format!("{}{}", prefix, call))
    }

    /// Built-ins that may stand alone as statements.
    fn builtin_stmt(&mut self) -> String {
        match self.rnd(7) {
            0 => {
                let t = self.atype(Trait::Class(TypeClass::Chan));
                format!("close({})", self.rvalue(t))
            }
            1 => self.copy_call(),
            2 => {
                let m = self.atype(Trait::Class(TypeClass::Map));
                match self.types[m].key {
                    Some(key) => format!("delete({}, {})", self.rvalue(m), self.rvalue(key)),
                    None => "recover()".to_string(),
                }
            }
            3 => {
                let eface = self.types.pre.eface;
                format!("panic({})", self.rvalue(eface))
            }
            4 | 5 => {
                let name = if self.coin() { "print" } else { "println" };
                let args = self.atype_list(Trait::Printable);
                format!("{}({})", name, self.rvalue_list(&args))
            }
            _ => "recover()".to_string(),
        }
    }

    /// `type T U` or the alias form `type T = U`; either way T is a new
    /// local type visible to later statements.
    fn stmt_type_decl(&mut self) -> Attempt {
        let id = self.new_id("Type");
        let underlying = self.atype(Trait::Any);
        let eq = if self.coin() { "= " } else { "" };
        let text = format!("type {} {}{}", id, eq, self.types[underlying].id);
        let named = self.types.named(id, underlying);
        let line = self.tree.emit(&mut self.cursor, text);
        self.tree.declare_type(line, named);
        Attempt::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenConfig;
    use crate::scope::{Cursor, Node};

    fn in_body(seed: u64, config: GenConfig) -> (Context, crate::scope::BlockId) {
        let mut ctx = Context::new(seed, config);
        let top = ctx.units[0].top;
        ctx.cursor = Cursor { block: top, pos: -1 };
        let decl = ctx.tree.enter(&mut ctx.cursor, false);
        ctx.tree.block_mut(decl).func_boundary = true;
        ctx.tree.emit(&mut ctx.cursor, "func F() {");
        let body = ctx.tree.enter(&mut ctx.cursor, true);
        (ctx, body)
    }

    fn body_text(ctx: &Context, body: crate::scope::BlockId) -> Vec<String> {
        let mut out = Vec::new();
        ctx.tree.collect_text(Node::Block(body), &mut out);
        out
    }

    #[test]
    fn statement_count_is_capped() {
        let cfg = GenConfig { statements: 4, ..GenConfig::default() };
        let (mut ctx, _) = in_body(2, cfg);
        for _ in 0..20 {
            ctx.statement();
        }
        assert_eq!(ctx.counters.stmt_count, 4);
    }

    #[test]
    fn break_and_continue_need_an_enclosing_loop() {
        let (mut ctx, body) = in_body(5, GenConfig::default());
        assert_eq!(ctx.attempt_stmt(StmtKind::Break), Attempt::Declined);
        assert_eq!(ctx.attempt_stmt(StmtKind::Continue), Attempt::Declined);
        ctx.tree.block_mut(body).breakable = true;
        assert_eq!(ctx.attempt_stmt(StmtKind::Break), Attempt::Done);
        assert_eq!(ctx.attempt_stmt(StmtKind::Continue), Attempt::Declined);
    }

    #[test]
    fn goto_only_in_nonterminating_mode() {
        let (mut ctx, _) = in_body(6, GenConfig::default());
        assert_eq!(ctx.attempt_stmt(StmtKind::Goto), Attempt::Declined);
        let cfg = GenConfig { nonterminating: true, ..GenConfig::default() };
        let (mut ctx, body) = in_body(6, cfg);
        ctx.tree.emit(&mut ctx.cursor, "println()");
        assert_eq!(ctx.attempt_stmt(StmtKind::Goto), Attempt::Done);
        let text = body_text(&ctx, body);
        let goto = text.iter().position(|l| l.starts_with("goto ")).unwrap();
        let label = format!("{}:", &text[goto]["goto ".len()..]);
        let at = text.iter().position(|l| *l == label).unwrap();
        assert!(at < goto);
    }

    #[test]
    fn type_decl_is_visible_afterwards() {
        let (mut ctx, _) = in_body(8, GenConfig::default());
        ctx.stmt_type_decl();
        let visible = ctx.tree.visible_types(ctx.cursor);
        assert_eq!(visible.len(), 1);
        assert!(ctx.types[visible[0]].is_named());
    }

    #[test]
    fn declared_receives_get_discards() {
        for seed in 0..30 {
            let (mut ctx, body) = in_body(seed, GenConfig::default());
            ctx.stmt_recv();
            ctx.tree.leave(&mut ctx.cursor);
            let unused = ctx.tree.vars().filter(|(_, v)| v.block == Some(body) && !v.used).count();
            assert_eq!(unused, 0, "seed {seed}");
        }
    }
}
