//! Compound statements.
//!
//! Each one opens a non-extendable header block, so later materialization
//! climbs out of it instead of landing between the header and its body,
//! and closes its own `}` inside that block.
use crate::context::Context;
use crate::expr::Attempt;
use crate::scope::LineId;
use crate::types::{Trait, TypeClass, TypeId};

/// How a range clause binds one of its iteration values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Binding {
    Blank,
    Assign,
    Declare,
}

impl Context {
    fn open_header(&mut self) {
        self.tree.enter(&mut self.cursor, false);
    }

    /// Discards for the header's own variables, the closing brace, and back
    /// out to the enclosing block.
    fn close_header(&mut self) {
        self.tree.discard_unused(&mut self.cursor);
        self.tree.emit(&mut self.cursor, "}");
        self.tree.leave(&mut self.cursor);
    }

    fn mark_loop(&mut self, breakable: bool, continuable: bool) {
        let block = self.tree.block_mut(self.cursor.block);
        block.breakable |= breakable;
        block.continuable |= continuable;
    }

    pub(super) fn stmt_if(&mut self) -> Attempt {
        self.open_header();
        let cond_ty = self.atype(Trait::Class(TypeClass::Boolean));
        let cond = self.rvalue(cond_ty);
        self.tree.emit(&mut self.cursor, format!("if ({}) {{", cond));
        self.gen_block();
        if self.coin() {
            self.tree.emit(&mut self.cursor, "} else {");
            self.gen_block();
        }
        self.close_header();
        Attempt::Done
    }

    pub(super) fn stmt_for(&mut self) -> Attempt {
        self.open_header();
        match self.rnd(3) {
            0 => {
                let cond_ty = self.atype(Trait::Class(TypeClass::Boolean));
                let cond = self.rvalue(cond_ty);
                self.tree.emit(&mut self.cursor, format!("for ({}) {{", cond));
            }
            1 => self.three_clause_header(),
            _ => self.range_header(),
        }
        self.mark_loop(true, true);
        self.gen_block();
        self.close_header();
        Attempt::Done
    }

    /// `for i := init; cond; post {`. The header line is placed first so the
    /// condition and post statement can see the loop variable.
    fn three_clause_header(&mut self) {
        let int = self.types.pre.int;
        let id = self.new_id("Var");
        let init = self.rvalue(int);
        let line = self.tree.emit(&mut self.cursor, "");
        self.declare_on(line, &id, int);
        let bool_ = self.types.pre.bool_;
        let cond = self.rvalue(bool_);
        let num = self.atype(Trait::Class(TypeClass::Numeric));
        let target = self.assignable(num);
        let op = self.choose(&["++", "--"]);
        self.tree.set_text(line, format!("for {} := ({}); ({}); {}{} {{", id, init, cond, target, op));
    }

    fn range_header(&mut self) {
        let pre = self.types.pre;
        let (key, value, over) = match self.rnd(4) {
            0 => {
                let elem = self.atype(Trait::Any);
                let sl = self.types.slice_of(elem);
                (Some(pre.int), Some(elem), sl)
            }
            1 => (Some(pre.int), Some(pre.rune), pre.string),
            2 => {
                let ch = self.atype(Trait::Class(TypeClass::Chan));
                (self.types[ch].elem, None, ch)
            }
            _ => {
                let m = self.atype(Trait::Class(TypeClass::Map));
                (self.types[m].key, self.types[m].value, m)
            }
        };
        let Some(key) = key else {
            let bool_ = pre.bool_;
            let cond = self.rvalue(bool_);
            self.tree.emit(&mut self.cursor, format!("for ({}) {{", cond));
            return;
        };
        let expr = self.rvalue(over);
        let mut slots = vec![key];
        if let Some(value) = value {
            if self.coin() {
                slots.push(value);
            }
        }
        if self.rnd(5) == 0 {
            self.tree.emit(&mut self.cursor, format!("for range ({}) {{", expr));
            return;
        }
        if self.coin() {
            // at least one new variable on the left of :=
            let fresh = self.rnd(slots.len());
            let mut names = Vec::new();
            let mut decls = Vec::new();
            for (i, t) in slots.iter().enumerate() {
                let binding = if i == fresh || self.coin() { Binding::Declare } else { Binding::Blank };
                match binding {
                    Binding::Declare => {
                        let id = self.new_id("Var");
                        names.push(id.clone());
                        decls.push((id, *t));
                    }
                    _ => names.push("_".to_string()),
                }
            }
            let line = self
                .tree
                .emit(&mut self.cursor, format!("for {} := range ({}) {{", names.join(", "), expr));
            for (id, t) in decls {
                self.declare_on(line, &id, t);
            }
        } else {
            let mut names = Vec::new();
            for t in slots {
                let binding = if self.coin() { Binding::Assign } else { Binding::Blank };
                names.push(match binding {
                    Binding::Assign => self.lvalue(t),
                    _ => "_".to_string(),
                });
            }
            self.tree.emit(&mut self.cursor, format!("for {} = range ({}) {{", names.join(", "), expr));
        }
    }

    fn declare_on(&mut self, line: LineId, name: &str, t: TypeId) {
        let block = self.cursor.block;
        self.tree.declare_var(line, Some(block), name, t);
    }

    // ------------------------------- select ------------------------------- //

    pub(super) fn stmt_select(&mut self) -> Attempt {
        self.open_header();
        self.tree.emit(&mut self.cursor, "select {");
        self.mark_loop(true, false);
        let mut cases = 0;
        while self.rnd(5) != 0 {
            cases += 1;
            self.open_header();
            let elem = self.atype(Trait::Any);
            let chan = self.types.chan_of(elem);
            let ch = self.rvalue(chan);
            let bool_ = self.types.pre.bool_;
            if self.coin() {
                let v = self.rvalue(elem);
                self.tree.emit(&mut self.cursor, format!("case ({}) <- ({}):", ch, v));
            } else {
                match self.rnd(5) {
                    0 => {
                        self.tree.emit(&mut self.cursor, format!("case <-({}):", ch));
                    }
                    1 => {
                        let v = self.lvalue(elem);
                        self.tree.emit(&mut self.cursor, format!("case {} = <-({}):", v, ch));
                    }
                    2 => {
                        let (v, ok) = (self.lvalue(elem), self.lvalue(bool_));
                        self.tree.emit(&mut self.cursor, format!("case {}, {} = <-({}):", v, ok, ch));
                    }
                    3 => {
                        let v = self.new_id("Var");
                        let line = self.tree.emit(&mut self.cursor, format!("case {} := <-({}):", v, ch));
                        self.declare_on(line, &v, elem);
                    }
                    _ => {
                        let (v, ok) = (self.new_id("Var"), self.new_id("Var"));
                        let line =
                            self.tree.emit(&mut self.cursor, format!("case {}, {} := <-({}):", v, ok, ch));
                        self.declare_on(line, &v, elem);
                        self.declare_on(line, &ok, bool_);
                    }
                }
            }
            self.gen_block();
            self.tree.leave(&mut self.cursor);
        }
        // an empty select blocks forever
        if cases == 0 || self.coin() {
            self.clause("default:");
        }
        self.close_header();
        Attempt::Done
    }

    /// A `case`/`default` clause without bindings.
    fn clause(&mut self, head: &str) {
        self.open_header();
        self.tree.emit(&mut self.cursor, head);
        self.gen_block();
        self.tree.leave(&mut self.cursor);
    }

    // ------------------------------ switches ------------------------------ //

    /// `switch [v :=] x.(type)` with at most one case. A binding is declared
    /// per clause; non-empty interfaces only admit interface-typed cases.
    pub(super) fn stmt_type_switch(&mut self) -> Attempt {
        self.open_header();
        let iface = self.atype(Trait::Class(TypeClass::Interface));
        let x = self.rvalue(iface);
        let case_ty = if self.coin() {
            let trait_ = if self.types[iface].methods > 0 { Trait::Class(TypeClass::Interface) } else { Trait::Any };
            Some(self.atype(trait_))
        } else {
            None
        };
        let default = self.coin();
        let binding = (case_ty.is_some() || default) && self.coin();
        let bind = if binding { Some(self.new_id("Var")) } else { None };
        let head = match &bind {
            Some(v) => format!("switch {} := ({}).(type) {{", v, x),
            None => format!("switch ({}).(type) {{", x),
        };
        self.tree.emit(&mut self.cursor, head);
        self.mark_loop(true, false);
        if let Some(t) = case_ty {
            self.type_clause(format!("case {}:", self.types[t].id), bind.as_deref(), t);
        }
        if default {
            self.type_clause("default:".to_string(), bind.as_deref(), iface);
        }
        self.close_header();
        Attempt::Done
    }

    fn type_clause(&mut self, head: String, bind: Option<&str>, t: TypeId) {
        self.open_header();
        let line = self.tree.emit(&mut self.cursor, head);
        if let Some(v) = bind {
            self.declare_on(line, v, t);
        }
        self.gen_block();
        self.tree.leave(&mut self.cursor);
    }

    /// `switch x` with one optional case. `fallthrough` only appears when a
    /// default clause follows it.
    pub(super) fn stmt_value_switch(&mut self) -> Attempt {
        self.open_header();
        let t = self.atype(Trait::Comparable);
        let tag = self.rvalue(t);
        let case = if self.coin() { Some(self.rvalue(t)) } else { None };
        let default = self.coin();
        self.tree.emit(&mut self.cursor, format!("switch ({}) {{", tag));
        self.mark_loop(true, false);
        if let Some(case) = case {
            self.open_header();
            self.tree.emit(&mut self.cursor, format!("case {}:", case));
            self.gen_block();
            if default && self.coin() {
                // must be the clause's last statement
                self.tree.discard_unused(&mut self.cursor);
                self.tree.emit(&mut self.cursor, "fallthrough");
            }
            self.tree.leave(&mut self.cursor);
        }
        if default {
            self.clause("default:");
        }
        self.close_header();
        Attempt::Done
    }
}
