//! Expression productions.
//!
//! [`Context::expression`] draws productions at random without replacement
//! until one accepts. Three counters bound the recursion (depth, count per
//! statement, count per unit); once any is exhausted every request collapses
//! to the type's simple literal.
pub mod builtin;

use crate::context::Context;
use crate::types::{Origin, Trait, TypeClass, TypeId};

/// Outcome of trying one production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    /// Expression text.
    Emitted(String),
    /// A statement wrote its own lines.
    Done,
    Declined,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExprKind {
    Literal,
    Var,
    Func,
    SelectorField,
    Recv,
    Arith,
    Equal,
    Order,
    Builtin,
    Address,
    Deref,
    Slice,
    IndexSlice,
    IndexArray,
    IndexString,
    IndexMap,
    Conversion,
}

const EXPRESSIONS: [ExprKind; 17] = [
    ExprKind::Literal,
    ExprKind::Var,
    ExprKind::Func,
    ExprKind::SelectorField,
    ExprKind::Recv,
    ExprKind::Arith,
    ExprKind::Equal,
    ExprKind::Order,
    ExprKind::Builtin,
    ExprKind::Address,
    ExprKind::Deref,
    ExprKind::Slice,
    ExprKind::IndexSlice,
    ExprKind::IndexArray,
    ExprKind::IndexString,
    ExprKind::IndexMap,
    ExprKind::Conversion,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LvalueKind {
    Var,
    IndexSlice,
    IndexArray,
    Selector,
    Deref,
}

impl Context {
    fn capped(&self) -> bool {
        let c = &self.counters;
        c.expr_depth >= self.config.expr_depth
            || c.expr_count >= self.config.expr_count
            || c.total_expr_count >= self.config.total_expr_count
    }

    fn count_expr(&mut self) {
        self.counters.expr_count += 1;
        self.counters.total_expr_count += 1;
    }

    fn descend(&mut self) {
        let c = &mut self.counters;
        c.expr_depth += 1;
        c.peak_expr_depth = c.peak_expr_depth.max(c.expr_depth);
    }

    fn simple_literal(&mut self, t: TypeId) -> String {
        self.types.simple_literal(t, &mut self.rng)
    }

    pub fn expression(&mut self, res: TypeId) -> String {
        self.count_expr();
        if self.capped() {
            return self.simple_literal(res);
        }
        self.counters.expanded += 1;
        let mut table = EXPRESSIONS.to_vec();
        while !table.is_empty() {
            let kind = table.swap_remove(self.rnd(table.len()));
            self.descend();
            let attempt = self.attempt_expr(kind, res);
            self.counters.expr_depth -= 1;
            if let Attempt::Emitted(text) = attempt {
                return text;
            }
        }
        self.simple_literal(res)
    }

    pub fn rvalue(&mut self, t: TypeId) -> String { self.expression(t) }

    pub fn rvalue_list(&mut self, list: &[TypeId]) -> String {
        list.iter().map(|t| self.rvalue(*t)).collect::<Vec<_>>().join(",")
    }

    /// Index operand that is never a compile-time constant, so bounds are
    /// only checked at run time.
    pub fn non_const_rvalue(&mut self, t: TypeId) -> String { self.lvalue(t) }

    /// An addressable location of type `t`.
    pub fn lvalue(&mut self, t: TypeId) -> String {
        self.count_expr();
        if self.capped() {
            return self.var_ref(t, false);
        }
        self.counters.expanded += 1;
        let kinds = [
            LvalueKind::Var,
            LvalueKind::IndexSlice,
            LvalueKind::IndexArray,
            LvalueKind::Selector,
            LvalueKind::Deref,
        ];
        loop {
            self.descend();
            let out = match self.choose(&kinds) {
                LvalueKind::Var => Some(self.var_ref(t, false)),
                LvalueKind::IndexSlice => {
                    let sl = self.types.slice_of(t);
                    let (s, i) = (self.rvalue(sl), self.rvalue(self.types.pre.int));
                    Some(format!("({})[{}]", s, i))
                }
                LvalueKind::IndexArray => {
                    let len = self.rnd(3);
                    let arr = self.types.array_of(t, len);
                    let (a, i) = (self.lvalue(arr), self.non_const_rvalue(self.types.pre.int));
                    Some(format!("({})[{}]", a, i))
                }
                LvalueKind::Selector => self
                    .struct_with_field(t)
                    .map(|(st, field)| format!("({}).{}", self.lvalue(st), field)),
                LvalueKind::Deref => {
                    let p = self.types.pointer_to(t);
                    Some(format!("(*({}))", self.lvalue(p)))
                }
            };
            self.counters.expr_depth -= 1;
            if let Some(text) = out {
                return text;
            }
        }
    }

    /// Assignment target: any lvalue, or a map element.
    pub fn assignable(&mut self, t: TypeId) -> String {
        if self.coin() {
            if let Some(text) = self.index_map(t) {
                return text;
            }
        }
        self.lvalue(t)
    }

    pub fn lvalue_or_blank(&mut self, t: TypeId) -> String {
        if self.coin() { "_".to_string() } else { self.lvalue(t) }
    }

    /// An existing visible variable of exactly type `t`, or a materialized
    /// one. Only `read` references count as uses.
    pub fn var_ref(&mut self, t: TypeId, read: bool) -> String {
        let cands: Vec<_> = self.visible_vars().into_iter().filter(|v| self.tree.var(*v).ty == t).collect();
        if cands.is_empty() {
            return self.materialize_var(t, read);
        }
        let v = cands[self.rnd(cands.len())];
        if read {
            self.tree.mark_used(v);
        }
        self.tree.var(v).name.clone()
    }

    /// A struct type (up to ten draws) with a field of type `t`.
    fn struct_with_field(&mut self, t: TypeId) -> Option<(TypeId, String)> {
        for _ in 0..10 {
            let st = self.atype(Trait::Class(TypeClass::Struct));
            let fields: Vec<String> =
                self.types[st].fields.iter().filter(|f| f.ty == t).map(|f| f.name.clone()).collect();
            if !fields.is_empty() {
                let field = fields[self.rnd(fields.len())].clone();
                return Some((st, field));
            }
        }
        None
    }

    fn index_map(&mut self, res: TypeId) -> Option<String> {
        for _ in 0..10 {
            let m = self.atype(Trait::Class(TypeClass::Map));
            let (key, value) = (self.types[m].key, self.types[m].value);
            if let (Some(key), Some(value)) = (key, value) {
                if value == res {
                    return Some(format!("({})[{}]", self.rvalue(m), self.rvalue(key)));
                }
            }
        }
        None
    }

    // ----------------------------- Dispatch ------------------------------- //

    fn attempt_expr(&mut self, kind: ExprKind, res: TypeId) -> Attempt {
        let pre = self.types.pre;
        let ty = self.types[res].clone();
        let text = match kind {
            ExprKind::Literal => Some(self.literal(res)),
            ExprKind::Var => Some(self.var_ref(res, true)),
            ExprKind::Func => self.call_func(res),
            ExprKind::SelectorField => self
                .struct_with_field(res)
                .map(|(st, field)| format!("({}).{}", self.rvalue(st), field)),
            ExprKind::Recv => {
                let ch = self.types.chan_of(res);
                Some(format!("(<- {})", self.rvalue(ch)))
            }
            ExprKind::Arith => match ty.class {
                TypeClass::Numeric => {
                    let op = self.choose(&["+", "*"]);
                    Some(format!("({}) {} ({})", self.rvalue(res), op, self.rvalue(res)))
                }
                TypeClass::String => Some(format!("({}) + ({})", self.rvalue(res), self.rvalue(res))),
                _ => None,
            },
            // comparisons yield an untyped bool, which only the predeclared
            // bool keeps through `:=`
            ExprKind::Equal if res == pre.bool_ => {
                let t = self.atype(Trait::Comparable);
                let op = self.choose(&["==", "!="]);
                Some(format!("({}) {} ({})", self.rvalue(t), op, self.rvalue(t)))
            }
            ExprKind::Order if res == pre.bool_ => {
                let t = self.atype(Trait::Ordered);
                let op = self.choose(&["<", "<=", ">", ">="]);
                Some(format!("({}) {} ({})", self.rvalue(t), op, self.rvalue(t)))
            }
            ExprKind::Equal | ExprKind::Order => None,
            ExprKind::Builtin => {
                if self.coin() { self.builtin_call(res) } else { None }
            }
            ExprKind::Address => match (ty.class, ty.elem) {
                (TypeClass::Pointer, Some(elem)) => Some(format!("({})(&({}))", ty.id, self.lvalue(elem))),
                _ => None,
            },
            ExprKind::Deref => {
                let p = self.types.pointer_to(res);
                Some(format!("(*({}))", self.lvalue(p)))
            }
            ExprKind::Slice => (ty.class == TypeClass::Slice).then(|| self.slice_expr(res)),
            ExprKind::IndexSlice => {
                let sl = self.types.slice_of(res);
                Some(format!("({})[{}]", self.rvalue(sl), self.rvalue(pre.int)))
            }
            ExprKind::IndexArray => {
                let len = self.rnd(3);
                let arr = self.types.array_of(res, len);
                Some(format!("({})[{}]", self.rvalue(arr), self.non_const_rvalue(pre.int)))
            }
            ExprKind::IndexString if res == pre.byte => {
                Some(format!("({})[{}]", self.rvalue(pre.string), self.non_const_rvalue(pre.int)))
            }
            ExprKind::IndexString => None,
            ExprKind::IndexMap => self.index_map(res),
            ExprKind::Conversion => self.conversion(res),
        };
        match text {
            Some(text) => Attempt::Emitted(text),
            None => Attempt::Declined,
        }
    }

    /// Call of a top-level function returning `res`, materializing one when
    /// the unit has none. Only pooled result types cross unit boundaries.
    fn call_func(&mut self, res: TypeId) -> Option<String> {
        if !self.types.satisfies(res, Trait::Global) {
            return None;
        }
        let known: Vec<_> = self.units[self.cur_unit]
            .top_funcs
            .iter()
            .filter(|f| f.results == [res])
            .cloned()
            .collect();
        let f = if known.is_empty() {
            self.materialize_func(vec![res])
        } else {
            known[self.rnd(known.len())].clone()
        };
        Some(format!("{}({})", f.name, self.rvalue_list(&f.params)))
    }

    fn slice_expr(&mut self, res: TypeId) -> String {
        let int = self.types.pre.int;
        let low = if self.coin() { self.lvalue(int) } else { String::new() };
        let max = if self.coin() { format!(":{}", self.lvalue(int)) } else { String::new() };
        let high = if self.coin() || !max.is_empty() { format!(":{}", self.lvalue(int)) } else { ":".to_string() };
        format!("({})[{}{}{}]", self.rvalue(res), low, high, max)
    }

    fn conversion(&mut self, res: TypeId) -> Option<String> {
        let pre = self.types.pre;
        let ty = self.types[res].clone();
        let comma = self.choose(&["", ","]);
        if ty.is_complex() {
            let from = self.choose(&[pre.complex64, pre.complex128]);
            return Some(format!("({})({} {})", ty.id, self.rvalue(from), comma));
        }
        if ty.class == TypeClass::Numeric {
            let from = self.atype(Trait::Class(TypeClass::Numeric));
            return Some(format!("({})({} {})", ty.id, self.rvalue(from), comma));
        }
        if res == pre.string {
            return Some(match self.rnd(3) {
                // at least three bytes long, so constant indexes stay in range
                0 => format!("({})(rune(({}) + (1<<24)) {})", ty.id, self.rvalue(pre.int), comma),
                1 => {
                    let bytes = self.types.slice_of(pre.byte);
                    format!("({})({} {})", ty.id, self.rvalue(bytes), comma)
                }
                _ => {
                    let runes = self.types.slice_of(pre.rune);
                    format!("({})({} {})", ty.id, self.rvalue(runes), comma)
                }
            });
        }
        if ty.class == TypeClass::Slice && matches!(ty.elem, Some(e) if e == pre.byte || e == pre.rune) {
            return Some(format!("({})({} {})", ty.id, self.rvalue(pre.string), comma));
        }
        None
    }

    // ------------------------- Composite literals ------------------------- //

    /// Either the simple literal or, where the type has one, a composite
    /// literal built from sub-expressions.
    pub fn literal(&mut self, t: TypeId) -> String {
        if self.coin() {
            if let Some(text) = self.composite_literal(t) {
                return text;
            }
        }
        self.simple_literal(t)
    }

    fn composite_literal(&mut self, t: TypeId) -> Option<String> {
        let ty = self.types[t].clone();
        if let Origin::Named { underlying } = ty.origin {
            return self.composite_literal(underlying).map(|lit| format!("{}({})", ty.id, lit));
        }
        if t == self.types.pre.string {
            return Some(if self.coin() { r#""ab\x0acd""#.to_string() } else { r"`abc\x0acd`".to_string() });
        }
        let elem = ty.elem;
        match (ty.class, elem) {
            (TypeClass::Slice, Some(elem)) => Some(if self.coin() {
                let n = self.rnd(3);
                format!("{}{{{}}}", ty.id, self.rvalue_list(&vec![elem; n]))
            } else {
                let n = self.rnd(3);
                let mut indexes: Vec<usize> = Vec::new();
                while indexes.len() < n {
                    let i = self.rnd(10);
                    if !indexes.contains(&i) {
                        indexes.push(i);
                    }
                }
                let items: Vec<String> = indexes.iter().map(|i| format!("{}: {}", i, self.rvalue(elem))).collect();
                format!("{}{{{}}}", ty.id, items.join(","))
            }),
            (TypeClass::Array, Some(elem)) => Some(if self.coin() {
                let len = if self.coin() { ty.len.to_string() } else { "...".to_string() };
                let elem_id = self.types[elem].id.clone();
                format!("[{}]{}{{{}}}", len, elem_id, self.rvalue_list(&vec![elem; ty.len]))
            } else {
                let items: Vec<String> = (0..ty.len).map(|i| format!("{}: {}", i, self.rvalue(elem))).collect();
                format!("{}{{{}}}", ty.id, items.join(","))
            }),
            (TypeClass::Struct, _) => Some(if self.coin() {
                let items: String = ty.fields.iter().map(|f| format!("{}, ", self.rvalue(f.ty))).collect();
                format!("{}{{{}}}", ty.id, items)
            } else {
                let mut items = String::new();
                for f in &ty.fields {
                    if self.coin() {
                        items.push_str(&format!("{}: {}, ", f.name, self.rvalue(f.ty)));
                    }
                }
                format!("{}{{{}}}", ty.id, items)
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenConfig;
    use crate::scope::Cursor;

    fn in_body(seed: u64, config: GenConfig) -> Context {
        let mut ctx = Context::new(seed, config);
        let top = ctx.units[0].top;
        ctx.cursor = Cursor { block: top, pos: -1 };
        let decl = ctx.tree.enter(&mut ctx.cursor, false);
        ctx.tree.block_mut(decl).func_boundary = true;
        ctx.tree.emit(&mut ctx.cursor, "func F() {");
        ctx.tree.enter(&mut ctx.cursor, true);
        ctx
    }

    #[test]
    fn capped_expressions_are_simple_literals() {
        let cfg = GenConfig { total_expr_count: 0, ..GenConfig::default() };
        let mut ctx = in_body(1, cfg);
        let int = ctx.types.pre.int;
        assert_eq!(ctx.rvalue(int), "1");
        let sl = ctx.types.slice_of(ctx.types.pre.string);
        assert_eq!(ctx.rvalue(sl), "[]string{}");
    }

    #[test]
    fn expression_respects_the_unit_budget() {
        for seed in 0..40 {
            let cfg = GenConfig { total_expr_count: 50, ..GenConfig::default() };
            let mut ctx = in_body(seed, cfg);
            for _ in 0..20 {
                let t = ctx.atype(Trait::Any);
                ctx.counters.expr_count = 0;
                ctx.rvalue(t);
            }
            assert_eq!(ctx.counters.expr_depth, 0);
            assert_eq!(ctx.counters.type_depth, 0);
        }
    }

    #[test]
    fn lvalue_references_do_not_count_as_uses() {
        let mut ctx = in_body(9, GenConfig::default());
        let int = ctx.types.pre.int;
        let name = ctx.var_ref(int, false);
        let v = ctx.visible_vars().into_iter().find(|v| ctx.tree.var(*v).name == name);
        if let Some(v) = v {
            if ctx.tree.var(v).block.is_some() {
                assert!(!ctx.tree.var(v).used);
            }
        }
        let again = ctx.var_ref(int, true);
        let v = ctx.visible_vars().into_iter().find(|v| ctx.tree.var(*v).name == again);
        assert!(v.map_or(true, |v| ctx.tree.var(v).used));
    }

    #[test]
    fn comparisons_only_produce_plain_bool() {
        let mut ctx = in_body(3, GenConfig::default());
        let named = ctx.types.named("Type1".into(), ctx.types.pre.bool_);
        assert_eq!(ctx.attempt_expr(ExprKind::Equal, named), Attempt::Declined);
        assert_eq!(ctx.attempt_expr(ExprKind::Order, named), Attempt::Declined);
        let bool_ = ctx.types.pre.bool_;
        assert!(matches!(ctx.attempt_expr(ExprKind::Equal, bool_), Attempt::Emitted(_)));
    }

    #[test]
    fn complex_conversions_stay_complex() {
        let mut ctx = in_body(4, GenConfig::default());
        let c = ctx.types.pre.complex64;
        for _ in 0..20 {
            let text = ctx.conversion(c).unwrap();
            assert!(text.starts_with("(complex64)("), "{text}");
        }
        let m = ctx.types.map_of(ctx.types.pre.int, ctx.types.pre.int);
        assert_eq!(ctx.conversion(m), None);
    }

    #[test]
    fn array_composites_match_their_length() {
        let mut ctx = in_body(11, GenConfig { total_expr_count: 0, ..GenConfig::default() });
        let arr = ctx.types.array_of(ctx.types.pre.int, 2);
        for _ in 0..20 {
            let lit = ctx.composite_literal(arr).unwrap();
            assert!(
                lit == "[2]int{1,1}" || lit == "[...]int{1,1}" || lit == "[2]int{0: 1,1: 1}",
                "{lit}"
            );
        }
    }
}
