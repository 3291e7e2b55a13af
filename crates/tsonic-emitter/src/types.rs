//! IR type to C# type mapping.

use tsonic_ir::{IrType, Primitive, TypeRef};
use tsonic_passes::csharp_identifier;

use crate::cs::CsType;
use crate::emitter::Emitter;

impl<'a> Emitter<'a> {
    /// Map an IR type to its C# backend type, collecting using directives
    /// for bound references on the way.
    pub(crate) fn cs_type(&mut self, ty: &TypeRef) -> CsType {
        match ty.as_ref() {
            IrType::Primitive(p) => primitive_type(*p),
            IrType::Literal(value) => match value {
                tsonic_ir::LiteralValue::String(_) => CsType::named("string"),
                tsonic_ir::LiteralValue::Number(_) => CsType::named("double"),
                tsonic_ir::LiteralValue::Boolean(_) => CsType::named("bool"),
            },
            IrType::Reference(r) => self.reference_type(r),
            IrType::TypeParameter(name) => CsType::named(name.clone()),
            IrType::Array(elem) => CsType::Array(Box::new(self.cs_type(elem))),
            IrType::Tuple(elems) => CsType::generic(
                "System.ValueTuple",
                elems.iter().map(|e| self.cs_type(e)).collect(),
            ),
            IrType::Union(_) => {
                let (stripped, was_nullish) = IrType::strip_nullish(ty);
                if was_nullish {
                    let inner = self.cs_type(&stripped);
                    if stripped.is_clr_value_type() {
                        return CsType::Nullable(Box::new(inner));
                    }
                    return inner;
                }
                // Non-nullish unions have no C# spelling; they erase.
                CsType::object()
            }
            IrType::Intersection(members) => {
                // tsbindgen view shapes erase to their nominal member.
                let nominal = members.iter().find(|m| {
                    !matches!(m.as_ref(), IrType::Reference(r)
                        if tsonic_bindings_shape(&r.name))
                });
                match nominal {
                    Some(member) => self.cs_type(member),
                    None => CsType::object(),
                }
            }
            IrType::Dictionary { key, value } => {
                self.add_using("System.Collections.Generic");
                CsType::generic(
                    "System.Collections.Generic.Dictionary",
                    vec![self.cs_type(key), self.cs_type(value)],
                )
            }
            IrType::Function(f) => {
                let mut args: Vec<CsType> =
                    f.params.iter().map(|p| self.cs_type(&p.ty)).collect();
                if matches!(f.return_type.as_ref(), IrType::Void) {
                    if args.is_empty() {
                        CsType::named("System.Action")
                    } else {
                        CsType::generic("System.Action", args)
                    }
                } else {
                    args.push(self.cs_type(&f.return_type));
                    CsType::generic("System.Func", args)
                }
            }
            IrType::Object(_) => CsType::object(),
            IrType::Any | IrType::Unknown => CsType::object(),
            IrType::Void | IrType::Never => CsType::Void,
        }
    }

    fn reference_type(&mut self, r: &tsonic_ir::ReferenceType) -> CsType {
        let args: Vec<CsType> = r.type_args.iter().map(|a| self.cs_type(a)).collect();

        // Builtin containers with dedicated CLR shapes.
        match (r.name.as_str(), args.len()) {
            ("Iterable" | "Generator", 1) => {
                self.add_using("System.Collections.Generic");
                return CsType::generic("System.Collections.Generic.IEnumerable", args);
            }
            ("Promise" | "Task", 1) => {
                self.add_using("System.Threading.Tasks");
                return CsType::generic("System.Threading.Tasks.Task", args);
            }
            ("Promise" | "Task", 0) => {
                self.add_using("System.Threading.Tasks");
                return CsType::named("System.Threading.Tasks.Task");
            }
            _ => {}
        }

        if let Some(external) = &r.external {
            if let Some((namespace, _)) = external.rsplit_once('.') {
                self.add_using(namespace);
            }
            return CsType::Named {
                name: external.clone(),
                args,
            };
        }
        CsType::Named {
            name: csharp_identifier(&r.name),
            args,
        }
    }
}

fn primitive_type(p: Primitive) -> CsType {
    match p {
        Primitive::Number => CsType::named("double"),
        Primitive::String => CsType::named("string"),
        Primitive::Boolean => CsType::named("bool"),
        Primitive::Char => CsType::named("char"),
        Primitive::Null | Primitive::Undefined => CsType::object(),
        other => match other.numeric_kind() {
            Some(kind) => CsType::named(kind.cs_keyword()),
            None => CsType::object(),
        },
    }
}

/// tsbindgen synthetic shape names that erase during type mapping.
fn tsonic_bindings_shape(name: &str) -> bool {
    name.starts_with("__Ext_")
        || name.starts_with("__TsonicExtMethods_")
        || name.ends_with("$views")
}
