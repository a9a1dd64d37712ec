//! The generation context: one owner for every piece of mutable state a
//! single generator run needs.
//!
//! Units are generated in index order. Earlier units may queue pending
//! functions and variables into later ones (and import them), never the
//! reverse, so the import graph is acyclic by construction.
use indexmap::IndexSet;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::debug;

use crate::config::GenConfig;
use crate::scope::{BlockId, Cursor, ScopeTree, VarId};
use crate::types::{Field, Trait, TypeArena, TypeClass, TypeId};

// ---------------------------- Program pieces ------------------------------ //

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Func {
    pub name: String,
    pub params: Vec<TypeId>,
    pub results: Vec<TypeId>,
}

#[derive(Debug)]
pub struct Unit {
    pub name: String,
    pub imports: IndexSet<String>,
    pub top: BlockId,
    /// Reserved but not yet generated; popped from the back.
    pub pending_funcs: Vec<Func>,
    pub pending_vars: Vec<(String, TypeId)>,
    pub top_vars: Vec<VarId>,
    pub top_funcs: Vec<Func>,
    /// Totals once the unit is complete.
    pub counters: Counters,
}

/// Running totals that bound generation. Statement and total-expression
/// counts are per unit; expression depth and count are per statement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    pub type_depth: usize,
    pub stmt_count: usize,
    pub expr_depth: usize,
    pub expr_count: usize,
    pub total_expr_count: usize,
    /// Requests that got past the caps into a production.
    pub expanded: usize,
    /// Deepest expression nesting reached.
    pub peak_expr_depth: usize,
}

pub fn unit_name(index: usize) -> String {
    match index {
        0 => "main".to_string(),
        i => char::from(b'a' + ((i - 1) % 26) as u8).to_string(),
    }
}

// ------------------------------- Context ---------------------------------- //

pub struct Context {
    pub rng: StdRng,
    pub config: GenConfig,
    pub types: TypeArena,
    pub tree: ScopeTree,
    pub units: Vec<Unit>,
    pub cur_unit: usize,
    pub cursor: Cursor,
    pub counters: Counters,
    id_seq: usize,
}

impl Context {
    pub fn new(seed: u64, config: GenConfig) -> Self {
        let mut tree = ScopeTree::new();
        let units: Vec<Unit> = (0..config.unit_count())
            .map(|i| Unit {
                name: unit_name(i),
                imports: IndexSet::new(),
                top: tree.new_root(),
                pending_funcs: Vec::new(),
                pending_vars: Vec::new(),
                top_vars: Vec::new(),
                top_funcs: Vec::new(),
                counters: Counters::default(),
            })
            .collect();
        let cursor = Cursor { block: units[0].top, pos: -1 };
        let mut ctx = Self {
            rng: StdRng::seed_from_u64(seed),
            config,
            types: TypeArena::new(),
            tree,
            units,
            cur_unit: 0,
            cursor,
            counters: Counters::default(),
            id_seq: 0,
        };
        let entry = |name: &str| Func { name: name.to_string(), params: Vec::new(), results: Vec::new() };
        ctx.units[0].pending_funcs = vec![entry("init"), entry("init"), entry("main")];
        ctx
    }

    /// Drain every unit's pending declarations, entry unit first.
    pub fn generate(&mut self) {
        for u in 0..self.units.len() {
            self.gen_unit(u);
        }
    }

    fn gen_unit(&mut self, u: usize) {
        self.counters = Counters::default();
        loop {
            if let Some(f) = self.units[u].pending_funcs.pop() {
                self.gen_toplevel_func(u, f);
            }
            if let Some((name, ty)) = self.units[u].pending_vars.pop() {
                self.gen_toplevel_var(u, name, ty);
            }
            let unit = &self.units[u];
            if unit.pending_funcs.is_empty() && unit.pending_vars.is_empty() {
                break;
            }
        }
        debug!(
            unit = %self.units[u].name,
            funcs = self.units[u].top_funcs.len(),
            vars = self.units[u].top_vars.len(),
            statements = self.counters.stmt_count,
            "unit generated"
        );
        self.units[u].counters = self.counters;
    }

    // ------------------------------ Randomness ---------------------------- //

    pub fn rnd(&mut self, n: usize) -> usize { self.rng.gen_range(0..n) }

    pub fn coin(&mut self) -> bool { self.rng.gen_bool(0.5) }

    pub fn choose<T: Copy>(&mut self, items: &[T]) -> T { items[self.rnd(items.len())] }

    /// Fresh exported identifier such as `Var12`.
    pub fn new_id(&mut self, prefix: &str) -> String {
        self.id_seq += 1;
        format!("{}{}", prefix, self.id_seq)
    }

    // --------------------------- Scoped state ----------------------------- //

    fn reset_to_unit(&mut self, u: usize) {
        self.cur_unit = u;
        let top = self.units[u].top;
        self.cursor = Cursor { block: top, pos: self.tree.width(top) as isize - 1 };
    }

    /// Run `f` somewhere else in the program and come back. The cursor is
    /// shifted by whatever `f` inserted into the saved block, and the
    /// per-statement expression counters start from zero inside `f`.
    pub fn detached<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let cursor = self.cursor;
        let width = self.tree.width(cursor.block);
        let unit = self.cur_unit;
        let (expr_depth, expr_count) = (self.counters.expr_depth, self.counters.expr_count);
        self.counters.expr_depth = 0;
        self.counters.expr_count = 0;

        let out = f(self);

        let grown = self.tree.width(cursor.block) as isize - width as isize;
        self.cursor = Cursor { block: cursor.block, pos: cursor.pos + grown };
        self.cur_unit = unit;
        self.counters.expr_depth = expr_depth;
        self.counters.expr_count = expr_count;
        out
    }

    // ---------------------------- Declarations ---------------------------- //

    pub(crate) fn gen_toplevel_func(&mut self, u: usize, f: Func) {
        self.reset_to_unit(u);
        let decl = self.tree.enter(&mut self.cursor, false);
        self.tree.block_mut(decl).func_boundary = true;

        let names: Vec<String> = f.params.iter().map(|_| self.new_id("Param")).collect();
        let params: Vec<String> = names
            .iter()
            .zip(&f.params)
            .map(|(n, t)| format!("{} {}", n, self.types[*t].id))
            .collect();
        let header = format!(
            "func {}({}){} {{",
            f.name,
            params.join(", "),
            self.types.fmt_type_list(&f.results, false)
        );
        let line = self.tree.emit(&mut self.cursor, header);
        for (name, ty) in names.into_iter().zip(&f.params) {
            // unused parameters are legal
            let v = self.tree.declare_var(line, Some(decl), name, *ty);
            self.tree.mark_used(v);
        }

        self.tree.enter(&mut self.cursor, true);
        while self.rnd(10) != 0 {
            self.statement();
        }
        let ret = if f.results.is_empty() {
            None
        } else {
            self.counters.expr_count = 0;
            Some(format!("return {}", self.rvalue_list(&f.results)))
        };
        self.tree.leave(&mut self.cursor);
        if let Some(ret) = ret {
            self.tree.emit(&mut self.cursor, ret);
        }
        self.tree.emit(&mut self.cursor, "}");
        self.tree.leave(&mut self.cursor);

        if f.name != "init" {
            self.units[u].top_funcs.push(f);
        }
    }

    fn gen_toplevel_var(&mut self, u: usize, name: String, ty: TypeId) {
        self.reset_to_unit(u);
        self.tree.enter(&mut self.cursor, false);
        let init = self.rvalue(ty);
        self.tree.emit(&mut self.cursor, format!("var {} = {}", name, init));
        self.tree.leave(&mut self.cursor);
        self.push_top_var(u, name, ty);
    }

    pub(crate) fn push_top_var(&mut self, u: usize, name: String, ty: TypeId) {
        let v = self.tree.declare_global(name, ty);
        self.units[u].top_vars.push(v);
    }

    /// Package-level variables of the current unit followed by everything
    /// visible from the cursor, innermost first.
    pub fn visible_vars(&self) -> Vec<VarId> {
        let mut vars = self.units[self.cur_unit].top_vars.clone();
        vars.extend(self.tree.visible_vars(self.cursor));
        vars
    }

    /// Nested statement list: an extendable block holding a random number
    /// of statements.
    pub fn gen_block(&mut self) {
        self.tree.enter(&mut self.cursor, true);
        while self.rnd(10) != 0 {
            self.statement();
        }
        self.tree.leave(&mut self.cursor);
    }

    // ---------------------------- Type oracle ----------------------------- //

    /// A type satisfying `tr`: an existing one when nesting is deep (or on a
    /// coin flip), otherwise a freshly synthesized type literal.
    pub fn atype(&mut self, tr: Trait) -> TypeId {
        self.counters.type_depth += 1;
        let t = self.atype_at_depth(tr);
        self.counters.type_depth -= 1;
        t
    }

    fn atype_at_depth(&mut self, tr: Trait) -> TypeId {
        loop {
            if self.counters.type_depth >= self.config.type_depth || self.coin() {
                let cands = self.existing_types(tr);
                if !cands.is_empty() {
                    return cands[self.rnd(cands.len())];
                }
            }
            let class = match tr.required_class() {
                Some(class) if class.is_composite() => class,
                Some(_) => continue,
                None => self.choose(&TypeClass::COMPOSITE),
            };
            let t = self.type_literal(class);
            if self.types.satisfies(t, tr) {
                return t;
            }
        }
    }

    fn existing_types(&self, tr: Trait) -> Vec<TypeId> {
        let mut all = self.types.pool().to_vec();
        all.extend(self.tree.visible_types(self.cursor));
        all.retain(|t| self.types.satisfies(*t, tr));
        all
    }

    pub fn atype_list(&mut self, tr: Trait) -> Vec<TypeId> {
        let n = self.rnd(4) + 1;
        (0..n).map(|_| self.atype(tr)).collect()
    }

    pub fn type_literal(&mut self, class: TypeClass) -> TypeId {
        match class {
            TypeClass::Array => {
                let elem = self.atype(Trait::Any);
                let len = self.rnd(3);
                self.types.array_of(elem, len)
            }
            TypeClass::Chan => {
                let elem = self.atype(Trait::Any);
                self.types.chan_of(elem)
            }
            TypeClass::Struct => {
                let mut fields = Vec::new();
                while self.coin() {
                    let name = self.new_id("Field");
                    let ty = self.atype(Trait::Any);
                    fields.push(Field { name, ty });
                }
                self.types.struct_of(fields)
            }
            TypeClass::Pointer => {
                let elem = self.atype(Trait::Any);
                self.types.pointer_to(elem)
            }
            TypeClass::Interface => {
                let mut methods = Vec::new();
                while self.coin() {
                    let name = self.new_id("Method");
                    let params = self.atype_list(Trait::Any);
                    let results = self.atype_list(Trait::Any);
                    methods.push((name, params, results));
                }
                self.types.interface_of(&methods)
            }
            TypeClass::Slice => {
                let elem = self.atype(Trait::Any);
                self.types.slice_of(elem)
            }
            TypeClass::Function => {
                let params = self.atype_list(Trait::Any);
                let results = self.atype_list(Trait::Any);
                self.types.func_of(params, results)
            }
            TypeClass::Map => {
                let key = self.atype(Trait::Hashable);
                let value = self.atype(Trait::Any);
                self.types.map_of(key, value)
            }
            TypeClass::Boolean => self.types.pre.bool_,
            TypeClass::Numeric => self.types.pre.int,
            TypeClass::String => self.types.pre.string,
        }
    }
}
