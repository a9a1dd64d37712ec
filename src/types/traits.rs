//! Structural capability predicates gating which productions may use a type.
use super::{TypeArena, TypeClass, TypeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trait {
    Any,
    /// Exactly this class.
    Class(TypeClass),
    Ordered,
    Comparable,
    Indexable,
    Hashable,
    Printable,
    LenCapable,
    Sendable,
    Receivable,
    /// One of the pooled predeclared types; safe to mention from any unit.
    Global,
}

impl Trait {
    /// Class a fresh type literal must have to satisfy this trait, when the
    /// trait pins one down.
    pub fn required_class(self) -> Option<TypeClass> {
        match self {
            Trait::Class(class) => Some(class),
            Trait::Sendable | Trait::Receivable => Some(TypeClass::Chan),
            _ => None,
        }
    }
}

impl TypeArena {
    pub fn satisfies(&self, t: TypeId, tr: Trait) -> bool {
        use TypeClass::*;
        let ty = self.get(t);
        match tr {
            Trait::Any => true,
            Trait::Class(class) => ty.class == class,
            Trait::Ordered => matches!(ty.class, Numeric | String) && !ty.is_complex(),
            Trait::Comparable => matches!(ty.class, Boolean | Numeric | String | Pointer | Chan | Interface),
            Trait::Indexable => matches!(ty.class, Array | Slice | String | Map),
            Trait::Hashable => match ty.class {
                Function | Map | Slice => false,
                Array => ty.elem.is_some_and(|e| self.satisfies(e, Trait::Hashable)),
                Struct => ty.fields.iter().all(|f| self.satisfies(f.ty, Trait::Hashable)),
                _ => true,
            },
            Trait::Printable => matches!(ty.class, Boolean | Numeric | String | Pointer | Interface),
            Trait::LenCapable => matches!(ty.class, String | Slice | Array | Map | Chan),
            Trait::Sendable | Trait::Receivable => ty.class == Chan,
            Trait::Global => self.in_pool(t),
        }
    }
}
