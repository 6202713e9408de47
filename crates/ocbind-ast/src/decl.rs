//! Declarations.

use crate::types::TypeRef;
use smol_str::SmolStr;

/// Index of a declaration inside its `TranslationUnit`.
///
/// Ids are only meaningful for the unit that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId(pub(crate) u32);

/// Kinds of declarations the generator cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Class,
    Struct,
    ClassTemplate,
    Enum,
    EnumConstant,
    Typedef,
    Field,
    Method,
    Function,
    Constructor,
    Destructor,
    Param,
    /// A base-class specifier; its type points at the base declaration.
    Base,
    Unknown,
}

/// C++ access specifier for class members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessSpecifier {
    #[default]
    Public,
    Protected,
    Private,
}

pub use AccessSpecifier as Access;

/// C++ constructor kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CtorKind {
    Default,
    Copy,
    Move,
    #[default]
    Other,
}

/// One declaration in a translation unit.
#[derive(Debug, Clone)]
pub struct Decl {
    pub kind: DeclKind,
    /// Short spelling, e.g. `gp_Pnt` or `SetCoord`.
    pub name: SmolStr,
    /// Display spelling; for class templates this includes the parameter
    /// list, e.g. `NCollection_Array1<TheItemType>`.
    pub display_name: SmolStr,
    pub access: Access,
    pub is_static: bool,
    /// Const member function.
    pub is_const: bool,
    pub is_virtual: bool,
    pub is_override: bool,
    /// Pure virtual method, or a class with at least one pure virtual.
    pub is_abstract: bool,
    pub is_deleted: bool,
    pub is_definition: bool,
    /// Member function template (never bound).
    pub is_function_template: bool,
    /// Constructor kind, when `kind == Constructor`.
    pub ctor_kind: Option<CtorKind>,
    /// Enum constant value, when known.
    pub value: Option<i64>,
    /// Param/field type, base-specifier type, or typedef underlying type.
    pub ty: Option<TypeRef>,
    /// Return type of a method or function.
    pub result: Option<TypeRef>,
    /// Primary template this declaration specializes, if any.
    pub specialization_of: Option<DeclId>,
    /// Template type parameter names, in declaration order.
    pub template_params: Vec<SmolStr>,
    pub parent: Option<DeclId>,
    pub children: Vec<DeclId>,
}

impl Decl {
    pub fn new(kind: DeclKind, name: impl Into<SmolStr>) -> Self {
        let name = name.into();
        Self {
            kind,
            display_name: name.clone(),
            name,
            access: Access::Public,
            is_static: false,
            is_const: false,
            is_virtual: false,
            is_override: false,
            is_abstract: false,
            is_deleted: false,
            is_definition: true,
            is_function_template: false,
            ctor_kind: None,
            value: None,
            ty: None,
            result: None,
            specialization_of: None,
            template_params: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_display_name(mut self, display: impl Into<SmolStr>) -> Self {
        self.display_name = display.into();
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn with_type(mut self, ty: TypeRef) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn with_result(mut self, ty: TypeRef) -> Self {
        self.result = Some(ty);
        self
    }

    pub fn with_ctor_kind(mut self, kind: CtorKind) -> Self {
        self.ctor_kind = Some(kind);
        self
    }

    pub fn with_template_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.template_params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn const_(mut self) -> Self {
        self.is_const = true;
        self
    }

    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn virtual_(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    pub fn override_(mut self) -> Self {
        self.is_override = true;
        self.is_virtual = true;
        self
    }

    pub fn deleted(mut self) -> Self {
        self.is_deleted = true;
        self
    }

    pub fn forward(mut self) -> Self {
        self.is_definition = false;
        self
    }

    pub fn is_public(&self) -> bool {
        self.access == Access::Public
    }
}
