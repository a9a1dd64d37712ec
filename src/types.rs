//! Type model for generated programs.
//!
//! Every type lives in a [`TypeArena`] and is addressed by a [`TypeId`].
//! Nodes are interned by their rendered spelling, immutable once built and
//! shared by every variable, field and signature that mentions them.
//!
//! Composite types only ever point at nodes that already exist, so the
//! relation graph is acyclic and [`TypeArena::depends_on`] can recurse
//! without a visited set.
pub mod literal;
pub mod traits;

use indexmap::IndexMap;

pub use traits::Trait;

// ------------------------------- Nodes ------------------------------------ //

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    pub fn index(self) -> usize { self.0 as usize }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeClass {
    Boolean,
    Numeric,
    String,
    Array,
    Slice,
    Struct,
    Pointer,
    Function,
    Interface,
    Map,
    Chan,
}

impl TypeClass {
    /// Classes a type literal can be synthesized for.
    pub const COMPOSITE: [TypeClass; 8] = [
        TypeClass::Array,
        TypeClass::Chan,
        TypeClass::Struct,
        TypeClass::Pointer,
        TypeClass::Interface,
        TypeClass::Slice,
        TypeClass::Function,
        TypeClass::Map,
    ];

    pub fn is_composite(self) -> bool { Self::COMPOSITE.contains(&self) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumKind {
    Integer,
    Float,
    Complex,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Built into the language. `pooled` types are offered by the type oracle.
    Predeclared { pooled: bool, literal: &'static str },
    /// Unnamed type literal such as `[]int` or `map[string]bool`.
    Literal,
    /// Locally declared `type Name Underlying` (or alias).
    Named { underlying: TypeId },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
}

#[derive(Clone, Debug)]
pub struct Type {
    /// Rendered source spelling; also the interning key.
    pub id: String,
    pub class: TypeClass,
    pub num: Option<NumKind>,
    pub origin: Origin,
    pub elem: Option<TypeId>,   // array, slice, pointer, chan
    pub key: Option<TypeId>,    // map
    pub value: Option<TypeId>,  // map
    pub len: usize,             // array
    pub fields: Vec<Field>,     // struct
    pub params: Vec<TypeId>,    // func
    pub results: Vec<TypeId>,   // func
    pub methods: usize,         // interface
}

impl Type {
    fn bare(id: String, class: TypeClass, origin: Origin) -> Self {
        Self {
            id,
            class,
            num: None,
            origin,
            elem: None,
            key: None,
            value: None,
            len: 0,
            fields: Vec::new(),
            params: Vec::new(),
            results: Vec::new(),
            methods: 0,
        }
    }

    pub fn is_named(&self) -> bool { matches!(self.origin, Origin::Named { .. }) }

    pub fn is_complex(&self) -> bool { self.num == Some(NumKind::Complex) }

    pub fn is_integer(&self) -> bool { self.num == Some(NumKind::Integer) }
}

// ------------------------------- Arena ------------------------------------ //

/// Well-known predeclared types, resolved once at arena construction.
#[derive(Clone, Copy, Debug)]
pub struct Predeclared {
    pub string: TypeId,
    pub bool_: TypeId,
    pub int: TypeId,
    pub byte: TypeId,
    pub eface: TypeId,
    pub rune: TypeId,
    pub float32: TypeId,
    pub float64: TypeId,
    pub error: TypeId,
    pub complex64: TypeId,
    pub complex128: TypeId,
}

#[derive(Debug)]
pub struct TypeArena {
    nodes: Vec<Type>,
    by_id: IndexMap<String, TypeId>,
    pool: Vec<TypeId>,
    pub pre: Predeclared,
}

// (spelling, class, numeric kind, pooled, simple literal)
const PREDECLARED: &[(&str, TypeClass, Option<NumKind>, bool, &str)] = &[
    ("string", TypeClass::String, None, true, "\"foo\""),
    ("bool", TypeClass::Boolean, None, true, "false"),
    ("int", TypeClass::Numeric, Some(NumKind::Integer), true, "1"),
    ("byte", TypeClass::Numeric, Some(NumKind::Integer), true, "byte(0)"),
    ("interface{}", TypeClass::Interface, None, true, "interface{}(nil)"),
    ("rune", TypeClass::Numeric, Some(NumKind::Integer), true, "rune(0)"),
    ("uint", TypeClass::Numeric, Some(NumKind::Integer), true, "uint(1)"),
    ("uintptr", TypeClass::Numeric, Some(NumKind::Integer), true, "uintptr(0)"),
    ("int16", TypeClass::Numeric, Some(NumKind::Integer), true, "int16(1)"),
    ("float64", TypeClass::Numeric, Some(NumKind::Float), true, "1.0"),
    ("float32", TypeClass::Numeric, Some(NumKind::Float), true, "float32(1.0)"),
    ("error", TypeClass::Interface, None, true, "error(nil)"),
    // Reachable only through complex/real/imag; never offered by the oracle.
    ("complex64", TypeClass::Numeric, Some(NumKind::Complex), false, "complex64(1)"),
    ("complex128", TypeClass::Numeric, Some(NumKind::Complex), false, "complex128(1i)"),
];

impl Default for TypeArena {
    fn default() -> Self { Self::new() }
}

impl TypeArena {
    pub fn new() -> Self {
        let mut nodes = Vec::new();
        let mut by_id = IndexMap::new();
        let mut pool = Vec::new();
        for (i, &(name, class, num, pooled, literal)) in PREDECLARED.iter().enumerate() {
            let id = TypeId(i as u32);
            let mut t = Type::bare(name.to_string(), class, Origin::Predeclared { pooled, literal });
            t.num = num;
            if name == "error" {
                t.methods = 1;
            }
            nodes.push(t);
            by_id.insert(name.to_string(), id);
            if pooled {
                pool.push(id);
            }
        }
        let find = |name: &str| by_id[name];
        let pre = Predeclared {
            string: find("string"),
            bool_: find("bool"),
            int: find("int"),
            byte: find("byte"),
            eface: find("interface{}"),
            rune: find("rune"),
            float32: find("float32"),
            float64: find("float64"),
            error: find("error"),
            complex64: find("complex64"),
            complex128: find("complex128"),
        };
        Self { nodes, by_id, pool, pre }
    }

    pub fn get(&self, t: TypeId) -> &Type { &self.nodes[t.index()] }

    pub fn len(&self) -> usize { self.nodes.len() }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    /// The fixed predeclared set offered to the type oracle.
    pub fn pool(&self) -> &[TypeId] { &self.pool }

    pub fn in_pool(&self, t: TypeId) -> bool { self.pool.contains(&t) }

    pub fn lookup(&self, spelling: &str) -> Option<TypeId> { self.by_id.get(spelling).copied() }

    fn intern(&mut self, t: Type) -> TypeId {
        if let Some(&id) = self.by_id.get(&t.id) {
            return id;
        }
        let id = TypeId(self.nodes.len() as u32);
        self.by_id.insert(t.id.clone(), id);
        self.nodes.push(t);
        id
    }

    // ---------------------------- Constructors ---------------------------- //

    pub fn pointer_to(&mut self, elem: TypeId) -> TypeId {
        let mut t = Type::bare(format!("*{}", self.get(elem).id), TypeClass::Pointer, Origin::Literal);
        t.elem = Some(elem);
        self.intern(t)
    }

    pub fn slice_of(&mut self, elem: TypeId) -> TypeId {
        let mut t = Type::bare(format!("[]{}", self.get(elem).id), TypeClass::Slice, Origin::Literal);
        t.elem = Some(elem);
        self.intern(t)
    }

    pub fn array_of(&mut self, elem: TypeId, len: usize) -> TypeId {
        let mut t = Type::bare(format!("[{}]{}", len, self.get(elem).id), TypeClass::Array, Origin::Literal);
        t.elem = Some(elem);
        t.len = len;
        self.intern(t)
    }

    pub fn chan_of(&mut self, elem: TypeId) -> TypeId {
        let mut t = Type::bare(format!("chan {}", self.get(elem).id), TypeClass::Chan, Origin::Literal);
        t.elem = Some(elem);
        self.intern(t)
    }

    pub fn map_of(&mut self, key: TypeId, value: TypeId) -> TypeId {
        let id = format!("map[{}]{}", self.get(key).id, self.get(value).id);
        let mut t = Type::bare(id, TypeClass::Map, Origin::Literal);
        t.key = Some(key);
        t.value = Some(value);
        self.intern(t)
    }

    pub fn func_of(&mut self, params: Vec<TypeId>, results: Vec<TypeId>) -> TypeId {
        let id = format!("func{} {}", self.fmt_type_list(&params, true), self.fmt_type_list(&results, false));
        let mut t = Type::bare(id, TypeClass::Function, Origin::Literal);
        t.params = params;
        t.results = results;
        self.intern(t)
    }

    pub fn struct_of(&mut self, fields: Vec<Field>) -> TypeId {
        let mut id = String::from("struct { ");
        for f in &fields {
            id.push_str(&format!("{} {}\n", f.name, self.get(f.ty).id));
        }
        id.push('}');
        let mut t = Type::bare(id, TypeClass::Struct, Origin::Literal);
        t.fields = fields;
        self.intern(t)
    }

    /// Interface with the given `(name, params, results)` method specs. The
    /// signatures only feed the spelling; see [`TypeArena::depends_on`].
    pub fn interface_of(&mut self, methods: &[(String, Vec<TypeId>, Vec<TypeId>)]) -> TypeId {
        let mut id = String::from("interface { ");
        for (name, params, results) in methods {
            id.push_str(&format!(
                " {} {} {}\n",
                name,
                self.fmt_type_list(params, true),
                self.fmt_type_list(results, false)
            ));
        }
        id.push('}');
        let mut t = Type::bare(id, TypeClass::Interface, Origin::Literal);
        t.methods = methods.len();
        self.intern(t)
    }

    /// `type name underlying`: a fresh node sharing the underlying structure.
    pub fn named(&mut self, name: String, underlying: TypeId) -> TypeId {
        let base = self.get(underlying);
        let t = Type {
            id: name,
            origin: Origin::Named { underlying },
            ..base.clone()
        };
        self.intern(t)
    }

    // ----------------------------- Relations ------------------------------ //

    /// Direct structural relations of `t`, named types included.
    pub fn relations(&self, t: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        let ty = self.get(t);
        let underlying = match ty.origin {
            Origin::Named { underlying } => Some(underlying),
            _ => None,
        };
        ty.elem
            .into_iter()
            .chain(ty.key)
            .chain(ty.value)
            .chain(underlying)
            .chain(ty.fields.iter().map(|f| f.ty))
            .chain(ty.params.iter().copied())
            .chain(ty.results.iter().copied())
    }

    /// Structural reachability of `target` from `t`. Interfaces report
    /// `true` for every target since their method closure is not modeled.
    pub fn depends_on(&self, t: TypeId, target: TypeId) -> bool {
        if self.get(t).class == TypeClass::Interface {
            return true;
        }
        if t == target {
            return true;
        }
        self.relations(t).any(|r| self.depends_on(r, target))
    }

    /// True when `t` reaches a locally declared type (or an interface).
    /// Such types cannot be spelled from another compilation unit.
    pub fn depends_on_local(&self, t: TypeId) -> bool {
        let ty = self.get(t);
        if ty.class == TypeClass::Interface || ty.is_named() {
            return true;
        }
        self.relations(t).any(|r| self.depends_on_local(r))
    }

    // ---------------------------- Rendering ------------------------------- //

    /// `(a,b)` style list; single unparenthesized entries unless `parens`.
    pub fn fmt_type_list(&self, list: &[TypeId], parens: bool) -> String {
        let wrap = parens || list.len() > 1;
        let mut out = String::new();
        if wrap {
            out.push('(');
        }
        for (i, t) in list.iter().enumerate() {
            if i != 0 {
                out.push(',');
            }
            out.push_str(&self.get(*t).id);
        }
        if wrap {
            out.push(')');
        }
        out
    }
}

impl std::ops::Index<TypeId> for TypeArena {
    type Output = Type;
    fn index(&self, t: TypeId) -> &Type { self.get(t) }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_shares_identical_spellings() {
        let mut arena = TypeArena::new();
        let int = arena.pre.int;
        let a = arena.slice_of(int);
        let b = arena.slice_of(int);
        assert_eq!(a, b);
        assert_eq!(arena[a].id, "[]int");
        let m = arena.map_of(arena.pre.string, a);
        assert_eq!(arena[m].id, "map[string][]int");
    }

    #[test]
    fn func_and_struct_spellings() {
        let mut arena = TypeArena::new();
        let (int, s) = (arena.pre.int, arena.pre.string);
        let f = arena.func_of(vec![int, s], vec![int]);
        assert_eq!(arena[f].id, "func(int,string) int");
        let g = arena.func_of(vec![int], vec![int, s]);
        assert_eq!(arena[g].id, "func(int) (int,string)");
        let st = arena.struct_of(vec![Field { name: "Field1".into(), ty: int }]);
        assert_eq!(arena[st].id, "struct { Field1 int\n}");
    }

    #[test]
    fn depends_on_walks_every_relation() {
        let mut arena = TypeArena::new();
        let int = arena.pre.int;
        let named = arena.named("Type1".into(), int);
        let ptr = arena.pointer_to(named);
        let sl = arena.slice_of(ptr);
        let st = arena.struct_of(vec![Field { name: "Field2".into(), ty: sl }]);
        let f = arena.func_of(vec![arena.pre.bool_], vec![st]);
        assert!(arena.depends_on(f, named));
        assert!(arena.depends_on(st, named));
        assert!(!arena.depends_on(ptr, arena.pre.string));
        // the named node also reaches its underlying
        assert!(arena.depends_on(named, int));
    }

    #[test]
    fn interfaces_depend_on_everything() {
        let mut arena = TypeArena::new();
        let eface = arena.pre.eface;
        let named = arena.named("Type3".into(), arena.pre.int);
        assert!(arena.depends_on(eface, named));
        let ch = arena.chan_of(eface);
        assert!(arena.depends_on(ch, named));
        assert!(arena.depends_on_local(ch));
        let plain = arena.map_of(arena.pre.int, arena.pre.string);
        assert!(!arena.depends_on_local(plain));
    }

    #[test]
    fn named_types_copy_structure() {
        let mut arena = TypeArena::new();
        let m = arena.map_of(arena.pre.string, arena.pre.int);
        let named = arena.named("Type7".into(), m);
        assert_eq!(arena[named].class, TypeClass::Map);
        assert_eq!(arena[named].key, Some(arena.pre.string));
        assert!(arena[named].is_named());
        assert_ne!(named, m);
    }

    #[test]
    fn complex_types_stay_out_of_the_pool() {
        let arena = TypeArena::new();
        assert!(!arena.in_pool(arena.pre.complex128));
        assert!(arena.in_pool(arena.pre.float64));
        assert_eq!(arena.pool().len(), 12);
    }
}
