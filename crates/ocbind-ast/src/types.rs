//! Type references.

use crate::decl::DeclId;
use smol_str::SmolStr;

/// Structural kind of a type reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Void,
    Builtin,
    Record,
    Enum,
    Typedef,
    Pointer,
    LValueReference,
    RValueReference,
    /// Anything the backend could not classify further.
    Unexposed,
}

/// A reference to a C++ type as it appears at a declaration site.
#[derive(Debug, Clone)]
pub struct TypeRef {
    /// Verbatim spelling, e.g. `const gp_Pnt &`.
    pub spelling: SmolStr,
    pub kind: TypeKind,
    /// Const qualification at this indirection level.
    pub is_const: bool,
    /// Pointee/referent for pointer and reference types.
    pub pointee: Option<Box<TypeRef>>,
    /// The declaration this type names, when resolved.
    pub decl: Option<DeclId>,
    /// Ordered template arguments, e.g. `[Standard_Real]` for
    /// `NCollection_Array1<Standard_Real>`.
    pub template_args: Vec<TypeRef>,
}

impl TypeRef {
    pub fn new(kind: TypeKind, spelling: impl Into<SmolStr>) -> Self {
        Self {
            spelling: spelling.into(),
            kind,
            is_const: false,
            pointee: None,
            decl: None,
            template_args: Vec::new(),
        }
    }

    pub fn void() -> Self {
        Self::new(TypeKind::Void, "void")
    }

    pub fn builtin(spelling: impl Into<SmolStr>) -> Self {
        Self::new(TypeKind::Builtin, spelling)
    }

    /// A named record type, e.g. `gp_Pnt`.
    pub fn named(spelling: impl Into<SmolStr>) -> Self {
        Self::new(TypeKind::Record, spelling)
    }

    pub fn enum_(spelling: impl Into<SmolStr>) -> Self {
        Self::new(TypeKind::Enum, spelling)
    }

    pub fn pointer_to(pointee: TypeRef) -> Self {
        let spelling = format!("{} *", pointee.spelling);
        let mut ty = Self::new(TypeKind::Pointer, spelling);
        ty.pointee = Some(Box::new(pointee));
        ty
    }

    pub fn lvalue_ref_to(referent: TypeRef) -> Self {
        let spelling = format!("{} &", referent.spelling);
        let mut ty = Self::new(TypeKind::LValueReference, spelling);
        ty.pointee = Some(Box::new(referent));
        ty
    }

    pub fn rvalue_ref_to(referent: TypeRef) -> Self {
        let spelling = format!("{} &&", referent.spelling);
        let mut ty = Self::new(TypeKind::RValueReference, spelling);
        ty.pointee = Some(Box::new(referent));
        ty
    }

    pub fn const_(mut self) -> Self {
        if !self.is_const {
            self.spelling = format!("const {}", self.spelling).into();
            self.is_const = true;
        }
        self
    }

    pub fn with_decl(mut self, decl: DeclId) -> Self {
        self.decl = Some(decl);
        self
    }

    pub fn with_spelling(mut self, spelling: impl Into<SmolStr>) -> Self {
        self.spelling = spelling.into();
        self
    }

    pub fn with_template_args(mut self, args: Vec<TypeRef>) -> Self {
        self.template_args = args;
        self
    }

    pub fn is_pointer(&self) -> bool {
        self.kind == TypeKind::Pointer
    }

    pub fn is_lvalue_reference(&self) -> bool {
        self.kind == TypeKind::LValueReference
    }

    pub fn is_rvalue_reference(&self) -> bool {
        self.kind == TypeKind::RValueReference
    }

    /// Pointer or lvalue reference: one level of indirection the binding
    /// layer may need to see through.
    pub fn is_pointer_like(&self) -> bool {
        matches!(self.kind, TypeKind::Pointer | TypeKind::LValueReference)
    }

    pub fn pointee(&self) -> Option<&TypeRef> {
        self.pointee.as_deref()
    }

    /// The type itself, or its pointee for pointer-like types.
    pub fn strip_indirection(&self) -> &TypeRef {
        if self.is_pointer_like() {
            self.pointee().unwrap_or(self)
        } else {
            self
        }
    }

    /// Identifier naming this type: the spelling with qualifiers, indirection
    /// marks and template arguments removed, e.g. `NCollection_Array1` for
    /// `const NCollection_Array1<Standard_Real> &`.
    pub fn base_name(&self) -> &str {
        let mut s = self.spelling.as_str();
        for prefix in ["const ", "struct ", "class ", "enum "] {
            s = s.trim_start_matches(prefix);
        }
        s = s.trim_end_matches(['&', '*', ' ']);
        match s.find('<') {
            Some(pos) => &s[..pos],
            None => s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_spelling() {
        let ty = TypeRef::pointer_to(TypeRef::builtin("double"));
        assert_eq!(ty.spelling, "double *");
        assert!(ty.is_pointer());
        assert!(ty.is_pointer_like());
        assert_eq!(ty.pointee().unwrap().spelling, "double");
    }

    #[test]
    fn test_strip_indirection() {
        let ty = TypeRef::lvalue_ref_to(TypeRef::named("gp_Pnt").const_());
        assert_eq!(ty.strip_indirection().spelling, "const gp_Pnt");
        let plain = TypeRef::named("gp_Pnt");
        assert_eq!(plain.strip_indirection().spelling, "gp_Pnt");
    }

    #[test]
    fn test_base_name() {
        let ty = TypeRef::lvalue_ref_to(
            TypeRef::named("NCollection_Array1<Standard_Real>").const_(),
        );
        assert_eq!(ty.base_name(), "NCollection_Array1");
        assert_eq!(TypeRef::named("gp_XYZ").base_name(), "gp_XYZ");
    }
}
