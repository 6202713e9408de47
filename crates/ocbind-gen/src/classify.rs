//! Pure predicates over declarations.
//!
//! Nothing here raises or mutates; every query is answered from the
//! translation unit and the policy snapshot.

use crate::bases::flatten_bases;
use crate::policy::Policy;
use ocbind_ast::{CtorKind, DeclId, DeclKind, TranslationUnit, TypeRef};

/// Classifier over one translation unit under one policy.
pub struct Classifier<'a> {
    pub tu: &'a TranslationUnit,
    pub policy: &'a Policy,
}

impl<'a> Classifier<'a> {
    pub fn new(tu: &'a TranslationUnit, policy: &'a Policy) -> Self {
        Self { tu, policy }
    }

    /// Does `class` derive (transitively) from the ref-counted root type?
    pub fn is_transient(&self, class: DeclId) -> bool {
        let root = self.policy.transient_root.as_str();
        if self.tu.name(class) == root {
            return true;
        }
        let mut diags = Vec::new();
        flatten_bases(self.tu, class, &mut diags)
            .iter()
            .any(|&b| self.tu.name(b) == root)
    }

    /// Is this method/function an operator the policy knows how to translate?
    pub fn is_operator(&self, decl: DeclId) -> bool {
        let d = self.tu.decl(decl);
        matches!(d.kind, DeclKind::Method | DeclKind::Function)
            && self.policy.is_operator_name(&d.name)
    }

    /// Public method returning an lvalue reference with a public
    /// `Set<Name>` sibling. Documentation use only.
    pub fn is_getter_method(&self, method: DeclId) -> bool {
        let d = self.tu.decl(method);
        if d.kind != DeclKind::Method || !d.is_public() {
            return false;
        }
        let returns_lvalue = d
            .result
            .as_ref()
            .is_some_and(TypeRef::is_lvalue_reference);
        if !returns_lvalue {
            return false;
        }
        let Some(parent) = d.parent else {
            return false;
        };
        let setter = format!("Set{}", d.name);
        self.tu
            .methods(parent)
            .iter()
            .any(|&m| self.tu.name(m) == setter && self.tu.decl(m).is_public())
    }

    /// Is this type (after stripping one indirection level) passed by value
    /// on the Lua side?
    pub fn is_immutable_type(&self, ty: &TypeRef) -> bool {
        let t = ty.strip_indirection();
        if t.kind == ocbind_ast::TypeKind::Enum {
            return true;
        }
        if let Some(decl) = self.tu.type_decl(t) {
            if decl.kind == DeclKind::Enum {
                return true;
            }
            if self.policy.immutable_type.contains(decl.name.as_str()) {
                return true;
            }
            // Typedef: the underlying declaration's spelling counts too.
            if decl.kind == DeclKind::Typedef {
                if let Some(under) = decl.ty.as_ref() {
                    if self.is_immutable_type(under) {
                        return true;
                    }
                }
            }
        }
        self.policy.immutable_type.contains(t.base_name())
    }

    /// A parameter whose pointee comes back to the caller: non-const
    /// pointer-like indirection over an immutable type.
    pub fn is_output_param(&self, param: DeclId) -> bool {
        let Some(ty) = self.tu.decl(param).ty.as_ref() else {
            return false;
        };
        if !ty.is_pointer_like() {
            return false;
        }
        let pointee = ty.strip_indirection();
        !pointee.is_const && self.is_immutable_type(ty)
    }

    /// Does any parameter require the in/out adapter transform?
    pub fn needs_in_out(&self, method: DeclId) -> bool {
        self.tu
            .params(method)
            .iter()
            .any(|&p| self.is_output_param(p))
    }

    /// Partition parameters into kept inputs and converted outputs,
    /// both in declaration order.
    pub fn in_out_params(&self, method: DeclId) -> (Vec<DeclId>, Vec<DeclId>) {
        let mut ins = Vec::new();
        let mut outs = Vec::new();
        for &p in &self.tu.params(method) {
            if self.is_output_param(p) {
                outs.push(p);
            } else {
                ins.push(p);
            }
        }
        (ins, outs)
    }

    fn has_public_ctor(&self, class: DeclId) -> bool {
        self.tu
            .ctors(class, true)
            .iter()
            .any(|&c| !self.tu.decl(c).is_deleted)
    }

    /// Should the binding synthesize a zero-argument constructor?
    pub fn needs_default_ctor(&self, class: DeclId) -> bool {
        if self.tu.decl(class).is_abstract {
            return false;
        }
        if self.has_public_ctor(class) {
            return false;
        }
        let mut diags = Vec::new();
        !flatten_bases(self.tu, class, &mut diags)
            .iter()
            .any(|&b| self.has_public_ctor(b))
    }

    /// A class that only ever gets used through static methods.
    pub fn is_static_class(&self, class: DeclId) -> bool {
        let mut statics = 0;
        for &m in &self.tu.children_of_kind(class, DeclKind::Method, true) {
            // Operators are static too as far as Lua is concerned.
            if self.tu.name(m).starts_with("operator") {
                continue;
            }
            if self.tu.decl(m).is_static {
                statics += 1;
            } else {
                return false;
            }
        }
        if self.policy.static_class_checks_fields
            && self
                .tu
                .fields(class, true)
                .iter()
                .any(|&f| !self.tu.decl(f).is_static)
        {
            return false;
        }
        statics > 0
    }

    /// Can a value copy of this class be constructed?
    pub fn is_copyable(&self, class: DeclId) -> bool {
        let d = self.tu.decl(class);
        if self.is_static_class(class)
            || d.is_abstract
            || self.policy.black_list.copyable.contains(d.name.as_str())
        {
            return false;
        }
        if self
            .tu
            .destructors(class)
            .iter()
            .any(|&dt| !self.tu.decl(dt).is_public())
        {
            return false;
        }
        let ctors = self.tu.ctors(class, false);
        let copy_ctors: Vec<_> = ctors
            .iter()
            .filter(|&&c| self.tu.decl(c).ctor_kind == Some(CtorKind::Copy))
            .collect();
        if !copy_ctors.is_empty() {
            return copy_ctors
                .iter()
                .any(|&&c| self.tu.decl(c).is_public() && !self.tu.decl(c).is_deleted);
        }
        // No user copy constructor: a user move constructor suppresses the
        // implicit copy.
        !ctors
            .iter()
            .any(|&c| self.tu.decl(c).ctor_kind == Some(CtorKind::Move))
    }

    /// Method admission filter. Returns true when the method must not be
    /// bound at all.
    pub fn is_ignored_method(&self, class_name: &str, method: DeclId) -> bool {
        let d = self.tu.decl(method);
        if d.is_override || !d.is_public() || d.is_function_template {
            return true;
        }
        let name = d.name.as_str();
        // The library capitalizes every public method; anything else is an
        // implementation detail leaking through the headers.
        if self.policy.require_uppercase_methods
            && !name.chars().next().is_some_and(char::is_uppercase)
            && !self.is_operator(method)
        {
            return true;
        }
        if self.policy.is_method_blacklisted(class_name, name) {
            return true;
        }
        self.tu.params(method).iter().any(|&p| {
            self.tu
                .decl(p)
                .ty
                .as_ref()
                .is_some_and(TypeRef::is_rvalue_reference)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocbind_ast::{Access, Decl, TranslationUnit, TypeKind};

    fn policy() -> Policy {
        Policy::from_str(
            r#"
modules = ["gp"]
immutable_type = ["Standard_Boolean", "Standard_Integer", "Standard_Real", "NCollection_Array1", "handle"]

[lua_operators]
"operator+" = "__add"
"operator-" = "__sub"
"operator*" = "__mul"
"operator==" = "__eq"

[black_list]
method_by_name = ["DumpJson"]
method = ["gp_Pnt::HashCode"]
copyable = ["Geom_BlackListed"]
            "#,
        )
        .unwrap()
    }

    fn param(tu: &mut TranslationUnit, method: DeclId, name: &str, ty: TypeRef) -> DeclId {
        tu.add(Decl::new(DeclKind::Param, name).with_type(ty), Some(method))
    }

    #[test]
    fn test_is_transient_via_ancestry() {
        let policy = policy();
        let mut tu = TranslationUnit::new();
        let root = tu.add(Decl::new(DeclKind::Class, "Standard_Transient"), None);
        let geom = tu.add(Decl::new(DeclKind::Class, "Geom_Geometry"), None);
        let ty = TypeRef::named("Standard_Transient").with_decl(root);
        tu.add(
            Decl::new(DeclKind::Base, "Standard_Transient").with_type(ty),
            Some(geom),
        );
        let value = tu.add(Decl::new(DeclKind::Class, "gp_Pnt"), None);

        let c = Classifier::new(&tu, &policy);
        assert!(c.is_transient(root));
        assert!(c.is_transient(geom));
        assert!(!c.is_transient(value));
    }

    #[test]
    fn test_immutable_types() {
        let policy = policy();
        let mut tu = TranslationUnit::new();
        let enum_decl = tu.add(Decl::new(DeclKind::Enum, "gp_TrihedronPole"), None);
        let td = tu.add(
            Decl::new(DeclKind::Typedef, "Standard_Real_Alias")
                .with_type(TypeRef::builtin("double").with_spelling("Standard_Real")),
            None,
        );
        let c = Classifier::new(&tu, &policy);

        assert!(c.is_immutable_type(&TypeRef::named("Standard_Real")));
        assert!(c.is_immutable_type(&TypeRef::pointer_to(TypeRef::named("Standard_Integer"))));
        assert!(c.is_immutable_type(&TypeRef::enum_("gp_TrihedronPole").with_decl(enum_decl)));
        assert!(c.is_immutable_type(
            &TypeRef::new(TypeKind::Typedef, "Standard_Real_Alias").with_decl(td)
        ));
        assert!(c.is_immutable_type(&TypeRef::named("NCollection_Array1<Standard_Real>")));
        assert!(!c.is_immutable_type(&TypeRef::named("gp_Pnt")));
    }

    #[test]
    fn test_in_out_partition() {
        let policy = policy();
        let mut tu = TranslationUnit::new();
        let class = tu.add(Decl::new(DeclKind::Class, "Geom_Curve"), None);
        let m = tu.add(Decl::new(DeclKind::Method, "D1"), Some(class));
        let p0 = param(&mut tu, m, "U", TypeRef::named("Standard_Real").const_());
        let p1 = param(
            &mut tu,
            m,
            "theX",
            TypeRef::pointer_to(TypeRef::named("Standard_Real")),
        );
        let p2 = param(
            &mut tu,
            m,
            "theP",
            TypeRef::lvalue_ref_to(TypeRef::named("gp_Pnt")),
        );

        let c = Classifier::new(&tu, &policy);
        assert!(c.needs_in_out(m));
        let (ins, outs) = c.in_out_params(m);
        assert_eq!(ins, vec![p0, p2]);
        assert_eq!(outs, vec![p1]);
    }

    #[test]
    fn test_const_pointee_is_not_output() {
        let policy = policy();
        let mut tu = TranslationUnit::new();
        let class = tu.add(Decl::new(DeclKind::Class, "C"), None);
        let m = tu.add(Decl::new(DeclKind::Method, "Probe"), Some(class));
        param(
            &mut tu,
            m,
            "theIn",
            TypeRef::pointer_to(TypeRef::named("Standard_Real").const_()),
        );
        let c = Classifier::new(&tu, &policy);
        assert!(!c.needs_in_out(m));
    }

    #[test]
    fn test_needs_default_ctor() {
        let policy = policy();
        let mut tu = TranslationUnit::new();
        let plain = tu.add(Decl::new(DeclKind::Class, "gp_Ax1"), None);
        let with_ctor = tu.add(Decl::new(DeclKind::Class, "gp_Pnt"), None);
        tu.add(
            Decl::new(DeclKind::Constructor, "gp_Pnt").with_ctor_kind(CtorKind::Other),
            Some(with_ctor),
        );
        let abstract_ = tu.add(Decl::new(DeclKind::Class, "Geom_Curve").abstract_(), None);
        let private_ctor = tu.add(Decl::new(DeclKind::Class, "Hidden"), None);
        tu.add(
            Decl::new(DeclKind::Constructor, "Hidden").with_access(Access::Private),
            Some(private_ctor),
        );

        let c = Classifier::new(&tu, &policy);
        assert!(c.needs_default_ctor(plain));
        assert!(!c.needs_default_ctor(with_ctor));
        assert!(!c.needs_default_ctor(abstract_));
        // Only non-public ctors declared: nothing to synthesize from.
        assert!(c.needs_default_ctor(private_ctor));
    }

    #[test]
    fn test_static_class() {
        let policy = policy();
        let mut tu = TranslationUnit::new();
        let tool = tu.add(Decl::new(DeclKind::Class, "BRepTools"), None);
        tu.add(Decl::new(DeclKind::Method, "Write").static_(), Some(tool));
        tu.add(Decl::new(DeclKind::Method, "Read").static_(), Some(tool));
        let mixed = tu.add(Decl::new(DeclKind::Class, "gp_Pnt"), None);
        tu.add(Decl::new(DeclKind::Method, "X").const_(), Some(mixed));
        let empty = tu.add(Decl::new(DeclKind::Class, "Empty"), None);

        let c = Classifier::new(&tu, &policy);
        assert!(c.is_static_class(tool));
        assert!(!c.is_static_class(mixed));
        assert!(!c.is_static_class(empty));
    }

    #[test]
    fn test_move_only_class_is_not_copyable() {
        let policy = policy();
        let mut tu = TranslationUnit::new();
        let class = tu.add(Decl::new(DeclKind::Class, "Mover"), None);
        tu.add(
            Decl::new(DeclKind::Constructor, "Mover").with_ctor_kind(CtorKind::Move),
            Some(class),
        );
        let c = Classifier::new(&tu, &policy);
        assert!(!c.is_copyable(class));
    }

    #[test]
    fn test_copyable_rules() {
        let policy = policy();
        let mut tu = TranslationUnit::new();
        let plain = tu.add(Decl::new(DeclKind::Class, "gp_Pnt"), None);
        let with_copy = tu.add(Decl::new(DeclKind::Class, "gp_Vec"), None);
        tu.add(
            Decl::new(DeclKind::Constructor, "gp_Vec").with_ctor_kind(CtorKind::Copy),
            Some(with_copy),
        );
        let deleted_copy = tu.add(Decl::new(DeclKind::Class, "NoCopy"), None);
        tu.add(
            Decl::new(DeclKind::Constructor, "NoCopy")
                .with_ctor_kind(CtorKind::Copy)
                .deleted(),
            Some(deleted_copy),
        );
        let hidden_dtor = tu.add(Decl::new(DeclKind::Class, "HiddenDtor"), None);
        tu.add(
            Decl::new(DeclKind::Destructor, "~HiddenDtor").with_access(Access::Protected),
            Some(hidden_dtor),
        );
        let listed = tu.add(Decl::new(DeclKind::Class, "Geom_BlackListed"), None);

        let c = Classifier::new(&tu, &policy);
        assert!(c.is_copyable(plain));
        assert!(c.is_copyable(with_copy));
        assert!(!c.is_copyable(deleted_copy));
        assert!(!c.is_copyable(hidden_dtor));
        assert!(!c.is_copyable(listed));
    }

    #[test]
    fn test_method_admission() {
        let policy = policy();
        let mut tu = TranslationUnit::new();
        let class = tu.add(Decl::new(DeclKind::Class, "gp_Pnt"), None);
        let ok = tu.add(Decl::new(DeclKind::Method, "Distance"), Some(class));
        let lower = tu.add(Decl::new(DeclKind::Method, "createNewEntity"), Some(class));
        let op = tu.add(Decl::new(DeclKind::Method, "operator+"), Some(class));
        let overridden = tu.add(Decl::new(DeclKind::Method, "Transform").override_(), Some(class));
        let hidden = tu.add(
            Decl::new(DeclKind::Method, "Reset").with_access(Access::Protected),
            Some(class),
        );
        let dumped = tu.add(Decl::new(DeclKind::Method, "DumpJson"), Some(class));
        let hashed = tu.add(Decl::new(DeclKind::Method, "HashCode"), Some(class));
        let moved = tu.add(Decl::new(DeclKind::Method, "Adopt"), Some(class));
        param(
            &mut tu,
            moved,
            "theOther",
            TypeRef::rvalue_ref_to(TypeRef::named("gp_Pnt")),
        );

        let c = Classifier::new(&tu, &policy);
        assert!(!c.is_ignored_method("gp_Pnt", ok));
        assert!(c.is_ignored_method("gp_Pnt", lower));
        assert!(!c.is_ignored_method("gp_Pnt", op));
        assert!(c.is_ignored_method("gp_Pnt", overridden));
        assert!(c.is_ignored_method("gp_Pnt", hidden));
        assert!(c.is_ignored_method("gp_Pnt", dumped));
        assert!(c.is_ignored_method("gp_Pnt", hashed));
        assert!(c.is_ignored_method("gp_Pnt", moved));
    }

    #[test]
    fn test_getter_method() {
        let policy = policy();
        let mut tu = TranslationUnit::new();
        let class = tu.add(Decl::new(DeclKind::Class, "Geom_Axis1Placement"), None);
        let getter = tu.add(
            Decl::new(DeclKind::Method, "Direction")
                .with_result(TypeRef::lvalue_ref_to(TypeRef::named("gp_Dir"))),
            Some(class),
        );
        tu.add(Decl::new(DeclKind::Method, "SetDirection"), Some(class));
        let value_ret = tu.add(
            Decl::new(DeclKind::Method, "Angle").with_result(TypeRef::builtin("double")),
            Some(class),
        );

        let c = Classifier::new(&tu, &policy);
        assert!(c.is_getter_method(getter));
        assert!(!c.is_getter_method(value_ret));
    }
}
