//! Simple literals: the terminal spelling every type can always produce.
//!
//! Composite literals recurse into expression generation and live with the
//! expression productions instead.
use rand::Rng;

use super::{Origin, TypeArena, TypeClass, TypeId};

impl TypeArena {
    pub fn simple_literal<R: Rng + ?Sized>(&self, t: TypeId, rng: &mut R) -> String {
        let ty = self.get(t);
        match ty.origin {
            Origin::Predeclared { literal, .. } => return literal.to_string(),
            Origin::Named { underlying } => {
                return format!("{}({})", ty.id, self.simple_literal(underlying, rng));
            }
            Origin::Literal => {}
        }
        match ty.class {
            TypeClass::Pointer => format!("(*{})(nil)", self.elem_id(t)),
            TypeClass::Slice => format!("{}{{}}", ty.id),
            TypeClass::Array => format!("{}{{}}", ty.id),
            TypeClass::Struct => format!("{}{{}}", ty.id),
            TypeClass::Chan => {
                let cap = if rng.gen_bool(0.5) { ", 1" } else { "" };
                format!("make({}{})", ty.id, cap)
            }
            TypeClass::Map => {
                if rng.gen_bool(0.5) {
                    let cap = if rng.gen_bool(0.5) { ", 1" } else { "" };
                    format!("make({}{})", ty.id, cap)
                } else {
                    format!("{}{{}}", ty.id)
                }
            }
            TypeClass::Function => format!("(({})(nil))", ty.id),
            TypeClass::Interface => format!("{}(nil)", ty.id),
            // Only predeclared types carry these classes without an origin.
            TypeClass::Boolean => "false".to_string(),
            TypeClass::Numeric => "1".to_string(),
            TypeClass::String => "\"\"".to_string(),
        }
    }

    fn elem_id(&self, t: TypeId) -> &str {
        match self.get(t).elem {
            Some(e) => &self.get(e).id,
            None => "",
        }
    }
}
