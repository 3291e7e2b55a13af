//! The nominal environment: declared-type inheritance with type-parameter
//! substitutions along each edge.
//!
//! Extends clauses are stored as `(base DeclId, base type args)` where the
//! args are spelled in the derived type's formal parameters. Instantiating
//! a base walks the chain composing substitutions. Every traversal carries
//! a visited set; cyclic hierarchies terminate and return `None` on
//! re-entry rather than recursing forever.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;
use tsonic_ir::{DeclId, IrType, TypeRef};

use crate::catalog::TypeCatalog;
use crate::substitute::{substitute, Substitution};

#[derive(Debug, Default)]
pub struct NominalEnv {
    /// Local and fully-qualified type names to their declarations.
    names: FxHashMap<String, DeclId>,
    /// Derived → ordered base edges.
    extends: FxHashMap<DeclId, Vec<(DeclId, Vec<TypeRef>)>>,
}

impl NominalEnv {
    pub fn new() -> Self {
        NominalEnv::default()
    }

    pub fn register_name(&mut self, name: impl Into<String>, decl: DeclId) {
        self.names.insert(name.into(), decl);
    }

    pub fn add_extends(&mut self, derived: DeclId, base: DeclId, base_args: Vec<TypeRef>) {
        self.extends.entry(derived).or_default().push((base, base_args));
    }

    pub fn resolve_name(&self, name: &str) -> Option<DeclId> {
        self.names.get(name).copied()
    }

    /// Normalize a receiver type to a nominal `(decl, type args)` pair.
    ///
    /// Fails for structural/non-reference types; callers fall through to
    /// structural lookup.
    pub fn normalize(&self, ty: &TypeRef) -> Option<(DeclId, Vec<TypeRef>)> {
        match ty.as_ref() {
            IrType::Reference(r) => {
                let decl = self.resolve_name(&r.name)?;
                Some((decl, r.type_args.clone()))
            }
            IrType::Intersection(members) => {
                // tsbindgen instance shapes: the `$instance` member carries
                // the nominal identity.
                members.iter().find_map(|m| self.normalize(m))
            }
            _ => None,
        }
    }

    /// Ordered inheritance chain from the type itself to the root,
    /// depth-first over extends edges.
    pub fn inheritance_chain(&self, decl: DeclId) -> Vec<DeclId> {
        let mut chain = Vec::new();
        let mut visited = FxHashSet::default();
        self.chain_into(decl, &mut chain, &mut visited);
        chain
    }

    fn chain_into(&self, decl: DeclId, chain: &mut Vec<DeclId>, visited: &mut FxHashSet<DeclId>) {
        if !visited.insert(decl) {
            return;
        }
        chain.push(decl);
        if let Some(edges) = self.extends.get(&decl) {
            for (base, _) in edges {
                self.chain_into(*base, chain, visited);
            }
        }
    }

    /// The substitution instantiating `target` (a base of `subject`) given
    /// the subject's type arguments.
    ///
    /// Returns `None` when `target` is not in the subject's chain.
    pub fn instantiation(
        &self,
        catalog: &TypeCatalog,
        subject: DeclId,
        subject_args: &[TypeRef],
        target: DeclId,
    ) -> Option<Substitution> {
        let mut visited = FxHashSet::default();
        self.instantiation_inner(catalog, subject, subject_args, target, &mut visited)
    }

    fn instantiation_inner(
        &self,
        catalog: &TypeCatalog,
        subject: DeclId,
        subject_args: &[TypeRef],
        target: DeclId,
        visited: &mut FxHashSet<DeclId>,
    ) -> Option<Substitution> {
        if !visited.insert(subject) {
            return None;
        }
        let params = catalog.type_params(subject);
        let subst = Substitution::from_pairs(params.iter(), subject_args.iter().cloned());
        if subject == target {
            return Some(subst);
        }
        let edges = self.extends.get(&subject)?;
        for (base, base_args) in edges {
            // Rewrite the edge's args from the subject's parameters into
            // concrete types, then descend.
            let instantiated: Vec<TypeRef> =
                base_args.iter().map(|a| substitute(a, &subst)).collect();
            if let Some(result) =
                self.instantiation_inner(catalog, *base, &instantiated, target, visited)
            {
                trace!(?subject, ?target, "instantiated base through chain");
                return Some(result);
            }
        }
        None
    }

    /// First type in the chain declaring `member_name`, with the member's
    /// declaring-type substitution for the given receiver args.
    pub fn find_member_declaring_type(
        &self,
        catalog: &TypeCatalog,
        receiver: DeclId,
        receiver_args: &[TypeRef],
        member_name: &str,
    ) -> Option<(DeclId, Substitution)> {
        for decl in self.inheritance_chain(receiver) {
            if catalog.member(decl, member_name).is_some() {
                let subst = self.instantiation(catalog, receiver, receiver_args, decl)?;
                return Some((decl, subst));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{TypeCatalog, TypeEntry};
    use indexmap::IndexMap;

    fn type_entry(decl: DeclId, name: &str, params: &[&str]) -> TypeEntry {
        TypeEntry {
            decl,
            name: name.into(),
            qualified_name: name.into(),
            type_params: params.iter().map(|s| s.to_string()).collect(),
            members: IndexMap::new(),
            indexers: Vec::new(),
        }
    }

    #[test]
    fn chain_is_self_to_root() {
        let mut env = NominalEnv::new();
        let a = DeclId(0);
        let b = DeclId(1);
        let c = DeclId(2);
        env.add_extends(a, b, vec![]);
        env.add_extends(b, c, vec![]);
        assert_eq!(env.inheritance_chain(a), vec![a, b, c]);
    }

    #[test]
    fn cyclic_chain_terminates() {
        let mut env = NominalEnv::new();
        let a = DeclId(0);
        let b = DeclId(1);
        env.add_extends(a, b, vec![]);
        env.add_extends(b, a, vec![]);
        assert_eq!(env.inheritance_chain(a), vec![a, b]);
    }

    #[test]
    fn instantiation_composes_through_chain() {
        // Derived<U> extends Base<U[]>; Base<T>.
        let mut catalog = TypeCatalog::new();
        let base = DeclId(0);
        let derived = DeclId(1);
        catalog.define_type(type_entry(base, "Base", &["T"]));
        catalog.define_type(type_entry(derived, "Derived", &["U"]));

        let mut env = NominalEnv::new();
        env.register_name("Base", base);
        env.register_name("Derived", derived);
        env.add_extends(
            derived,
            base,
            vec![IrType::array(IrType::type_parameter("U"))],
        );

        // Derived<int> instantiates Base with T = int[].
        let subst = env
            .instantiation(
                &catalog,
                derived,
                &[IrType::primitive(tsonic_ir::Primitive::Int)],
                base,
            )
            .unwrap();
        assert_eq!(
            *subst.get("T").unwrap().as_ref(),
            *IrType::array(IrType::primitive(tsonic_ir::Primitive::Int))
        );
    }

    #[test]
    fn normalize_handles_references_and_intersections() {
        let mut env = NominalEnv::new();
        let list = DeclId(3);
        env.register_name("List", list);

        let plain = IrType::applied_reference("List", vec![IrType::number()]);
        let (decl, args) = env.normalize(&plain).unwrap();
        assert_eq!(decl, list);
        assert_eq!(args.len(), 1);

        let shaped = IrType::intersection(vec![
            IrType::reference("NotKnown"),
            IrType::reference("List"),
        ]);
        assert_eq!(env.normalize(&shaped).map(|(d, _)| d), Some(list));

        assert!(env.normalize(&IrType::number()).is_none());
    }
}
