//! Materialization: inventing a declaration at a legal earlier position when
//! nothing in scope satisfies a requirement.
//!
//! All three entry points share one upward walk ([`Context::seek_insertion_point`]).
//! It climbs out of blocks that can no longer take a line and otherwise
//! steps backwards line by line, stopping on a coin (1 in 3) or at the
//! anchor's hard stop.
use crate::context::{Context, Func};
use crate::scope::{Cursor, Node};
use crate::types::{Trait, TypeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    /// A declaration of this type; must stay below every type it depends on.
    Decl(TypeId),
    /// A goto label; must stay inside the enclosing function body.
    Label,
}

impl Context {
    /// Move the cursor to an insertion point at or above the current one.
    pub fn seek_insertion_point(&mut self, anchor: Anchor) {
        loop {
            let block = self.tree.block(self.cursor.block);
            let Some(parent) = block.parent else { break };
            if anchor == Anchor::Label && self.tree.block(parent).func_boundary && self.cursor.pos <= 0 {
                break;
            }
            if !block.extendable || self.cursor.pos < 0 {
                match self.tree.index_in_parent(self.cursor.block) {
                    Some((parent, idx)) => self.cursor = Cursor { block: parent, pos: idx as isize - 1 },
                    None => break,
                }
                continue;
            }
            if self.rnd(3) == 0 {
                break;
            }
            if let Anchor::Decl(t) = anchor {
                if self.line_declares_dependency(t) {
                    break;
                }
            }
            self.cursor.pos -= 1;
        }
    }

    fn line_declares_dependency(&self, t: TypeId) -> bool {
        let nodes = &self.tree.block(self.cursor.block).nodes;
        match nodes.get(self.cursor.pos as usize) {
            Some(Node::Line(l)) => self.tree.line(*l).types.iter().any(|t1| self.types.depends_on(t, *t1)),
            _ => false,
        }
    }

    /// Declare a fresh variable of type `t` somewhere visible from the
    /// cursor and return the expression naming it. `read` marks the new
    /// variable used; pure assignment targets still need a discard.
    pub fn materialize_var(&mut self, t: TypeId, read: bool) -> String {
        let id = self.new_id("Var");
        self.detached(|ctx| {
            ctx.seek_insertion_point(Anchor::Decl(t));
            if ctx.tree.block(ctx.cursor.block).parent.is_none() {
                return ctx.materialize_global(id, t);
            }
            let init = ctx.rvalue(t);
            let line = ctx.tree.emit(&mut ctx.cursor, format!("{} := {}", id, init));
            let v = ctx.tree.declare_var(line, Some(ctx.cursor.block), id.clone(), t);
            if read {
                ctx.tree.mark_used(v);
            }
            id
        })
    }

    /// Package-level variable in this unit or, for pooled types and on a
    /// coin flip, queued into a later unit and referenced through its import.
    fn materialize_global(&mut self, id: String, t: TypeId) -> String {
        let last = self.units.len() - 1;
        let portable = !self.config.single_unit && self.types.satisfies(t, Trait::Global);
        let mut target = self.cur_unit;
        while portable && target < last && !self.coin() {
            target += 1;
        }
        if target == self.cur_unit {
            self.tree.enter(&mut self.cursor, false);
            let init = self.rvalue(t);
            self.tree.emit(&mut self.cursor, format!("var {} = {}", id, init));
            self.tree.leave(&mut self.cursor);
            self.push_top_var(target, id.clone(), t);
            return id;
        }
        self.units[target].pending_vars.push((id.clone(), t));
        let unit = self.units[target].name.clone();
        self.units[self.cur_unit].imports.insert(unit.clone());
        format!("{}.{}", unit, id)
    }

    /// Top-level function returning `results`. Functions whose signature
    /// mentions nothing local may be deferred into the next unit.
    pub fn materialize_func(&mut self, results: Vec<TypeId>) -> Func {
        let name = self.new_id("Func");
        let params = self.atype_list(Trait::Global);
        let f = Func { name, params, results };
        self.detached(|ctx| {
            let portable = !f.params.iter().chain(&f.results).any(|t| ctx.types.depends_on_local(*t));
            if ctx.coin() && !ctx.config.single_unit && ctx.cur_unit + 1 < ctx.units.len() && portable {
                let next = ctx.cur_unit + 1;
                ctx.units[next].pending_funcs.push(f.clone());
                let unit = ctx.units[next].name.clone();
                ctx.units[ctx.cur_unit].imports.insert(unit.clone());
                return Func { name: format!("{}.{}", unit, f.name), ..f };
            }
            let unit = ctx.cur_unit;
            ctx.gen_toplevel_func(unit, f.clone());
            f
        })
    }

    /// Place a fresh `LabelN:` line at or above the cursor, inside the
    /// current function body.
    pub fn materialize_label(&mut self) -> String {
        let id = self.new_id("Label");
        self.detached(|ctx| {
            ctx.seek_insertion_point(Anchor::Label);
            ctx.tree.emit(&mut ctx.cursor, format!("{}:", id));
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenConfig;
    use crate::scope::BlockId;

    /// `func F() {` / body with three lines, the middle one declaring a
    /// named type. Cursor at the end of the body.
    fn function_with_type_decl(seed: u64) -> (Context, BlockId, TypeId) {
        let mut ctx = Context::new(seed, GenConfig::default());
        let top = ctx.units[0].top;
        ctx.cursor = Cursor { block: top, pos: -1 };
        let decl = ctx.tree.enter(&mut ctx.cursor, false);
        ctx.tree.block_mut(decl).func_boundary = true;
        ctx.tree.emit(&mut ctx.cursor, "func F() {");
        let body = ctx.tree.enter(&mut ctx.cursor, true);
        ctx.tree.emit(&mut ctx.cursor, "print()");
        let line = ctx.tree.emit(&mut ctx.cursor, "type Type1 int");
        let named = ctx.types.named("Type1".into(), ctx.types.pre.int);
        ctx.tree.declare_type(line, named);
        ctx.tree.emit(&mut ctx.cursor, "println()");
        (ctx, body, named)
    }

    #[test]
    fn decl_anchor_never_climbs_above_a_dependency() {
        for seed in 0..200 {
            let (mut ctx, body, named) = function_with_type_decl(seed);
            let sl = ctx.types.slice_of(named);
            ctx.seek_insertion_point(Anchor::Decl(sl));
            assert_eq!(ctx.cursor.block, body);
            assert!(ctx.cursor.pos >= 1, "seed {seed}: {:?}", ctx.cursor);
        }
    }

    #[test]
    fn decl_anchor_can_reach_the_unit_top() {
        let reached = (0..200).any(|seed| {
            let (mut ctx, _, _) = function_with_type_decl(seed);
            ctx.seek_insertion_point(Anchor::Decl(ctx.types.pre.string));
            ctx.cursor.block == ctx.units[0].top
        });
        assert!(reached);
    }

    #[test]
    fn label_anchor_stays_in_the_body() {
        for seed in 0..200 {
            let (mut ctx, body, _) = function_with_type_decl(seed);
            ctx.tree.enter(&mut ctx.cursor, true);
            ctx.seek_insertion_point(Anchor::Label);
            let in_body = ctx.cursor.block == body;
            let nested = ctx.tree.block(ctx.cursor.block).parent == Some(body);
            assert!(in_body || nested, "seed {seed}");
        }
    }

    #[test]
    fn materialized_local_is_visible_and_used() {
        for seed in 0..50 {
            let (mut ctx, _, _) = function_with_type_decl(seed);
            let int = ctx.types.pre.int;
            let name = ctx.materialize_var(int, true);
            if name.contains('.') {
                continue;
            }
            let visible = ctx.visible_vars();
            let v = visible
                .iter()
                .find(|v| ctx.tree.var(**v).name == name)
                .unwrap_or_else(|| panic!("seed {seed}: {name} not visible"));
            assert!(ctx.tree.var(*v).used);
        }
    }

    #[test]
    fn single_unit_keeps_globals_local() {
        let cfg = GenConfig { single_unit: true, ..GenConfig::default() };
        for seed in 0..50 {
            let mut ctx = Context::new(seed, cfg.clone());
            let top = ctx.units[0].top;
            ctx.cursor = Cursor { block: top, pos: -1 };
            let name = ctx.materialize_var(ctx.types.pre.bool_, true);
            assert!(!name.contains('.'));
            assert!(ctx.units[0].imports.is_empty());
        }
    }

    #[test]
    fn only_pooled_globals_cross_units() {
        let mut crossed = false;
        for seed in 0..100 {
            let mut ctx = Context::new(seed, GenConfig::default());
            let top = ctx.units[0].top;
            ctx.cursor = Cursor { block: top, pos: -1 };
            let local = ctx.types.slice_of(ctx.types.pre.int);
            let name = ctx.materialize_var(local, true);
            assert!(!name.contains('.'), "seed {seed}: {name}");
            crossed |= ctx.materialize_var(ctx.types.pre.int, true).contains('.');
        }
        assert!(crossed);
    }
}
