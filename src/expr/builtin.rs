//! Built-in function calls, each gated by what its result type allows.
use crate::context::Context;
use crate::types::{Trait, TypeClass, TypeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Builtin {
    Append,
    Cap,
    Complex,
    Copy,
    Imag,
    Len,
    Make,
    New,
    Real,
    Recover,
}

const BUILTINS: [Builtin; 10] = [
    Builtin::Append,
    Builtin::Cap,
    Builtin::Complex,
    Builtin::Copy,
    Builtin::Imag,
    Builtin::Len,
    Builtin::Make,
    Builtin::New,
    Builtin::Real,
    Builtin::Recover,
];

impl Context {
    pub(crate) fn builtin_call(&mut self, res: TypeId) -> Option<String> {
        let pre = self.types.pre;
        let ty = self.types[res].clone();
        match self.choose(&BUILTINS) {
            Builtin::Append => {
                let elem = ty.elem.filter(|_| ty.class == TypeClass::Slice)?;
                Some(match self.rnd(3) {
                    0 => format!("append({}, {})", self.rvalue(res), self.rvalue(elem)),
                    1 => format!("append({}, {}, {})", self.rvalue(res), self.rvalue(elem), self.rvalue(elem)),
                    _ => format!("append({}, {}...)", self.rvalue(res), self.rvalue(res)),
                })
            }
            fun @ (Builtin::Len | Builtin::Cap) => {
                if res != pre.int {
                    return None;
                }
                let t = self.atype(Trait::LenCapable);
                let class = self.types[t].class;
                if fun == Builtin::Cap && matches!(class, TypeClass::String | TypeClass::Map) {
                    return None;
                }
                let name = if fun == Builtin::Len { "len" } else { "cap" };
                Some(format!("{}({})", name, self.rvalue(t)))
            }
            Builtin::Copy => (res == pre.int).then(|| self.copy_call()),
            Builtin::Make => {
                let int = pre.int;
                let size = match ty.class {
                    // never "len larger than cap"
                    TypeClass::Slice if self.coin() => format!(", {}", self.rvalue(int)),
                    TypeClass::Slice => format!(", 0, {}", self.rvalue(int)),
                    TypeClass::Map | TypeClass::Chan if self.coin() => format!(", {}", self.rvalue(int)),
                    TypeClass::Map | TypeClass::Chan => String::new(),
                    _ => return None,
                };
                Some(format!("make({}{})", ty.id, size))
            }
            Builtin::New => {
                let elem = ty.elem.filter(|_| ty.class == TypeClass::Pointer)?;
                Some(format!("new({})", self.types[elem].id))
            }
            Builtin::Recover => (res == pre.eface).then(|| "recover()".to_string()),
            Builtin::Complex => {
                let part = if res == pre.complex64 {
                    pre.float32
                } else if res == pre.complex128 {
                    pre.float64
                } else {
                    return None;
                };
                Some(format!("complex({}, {})", self.rvalue(part), self.rvalue(part)))
            }
            fun @ (Builtin::Real | Builtin::Imag) => {
                let whole = if res == pre.float32 {
                    pre.complex64
                } else if res == pre.float64 {
                    pre.complex128
                } else {
                    return None;
                };
                let name = if fun == Builtin::Real { "real" } else { "imag" };
                Some(format!("{}({})", name, self.rvalue(whole)))
            }
        }
    }

    /// `copy` between two slices of one type, or from a string into bytes.
    pub(crate) fn copy_call(&mut self) -> String {
        if self.coin() {
            let t = self.atype(Trait::Class(TypeClass::Slice));
            format!("copy({}, {})", self.rvalue(t), self.rvalue(t))
        } else {
            let bytes = self.types.slice_of(self.types.pre.byte);
            format!("copy({}, {})", self.rvalue(bytes), self.rvalue(self.types.pre.string))
        }
    }
}
