//! The translation-unit arena and its query facade.

use crate::decl::{Decl, DeclId, DeclKind};
use crate::types::TypeRef;

/// One parsed translation unit.
///
/// Declarations live in an arena and reference each other by `DeclId`;
/// the insertion order of top-level declarations is the declaration order
/// of the header, which keeps a whole run deterministic.
#[derive(Debug, Default)]
pub struct TranslationUnit {
    decls: Vec<Decl>,
}

impl TranslationUnit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration under `parent` (or at the top level) and return
    /// its id.
    pub fn add(&mut self, mut decl: Decl, parent: Option<DeclId>) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        decl.parent = parent;
        self.decls.push(decl);
        if let Some(parent) = parent {
            self.decls[parent.0 as usize].children.push(id);
        }
        id
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.0 as usize]
    }

    /// Mutable access for backends that fill in types after the skeleton
    /// pass.
    pub fn decl_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn name(&self, id: DeclId) -> &str {
        self.decl(id).name.as_str()
    }

    /// Top-level declarations in header order.
    pub fn roots(&self) -> impl Iterator<Item = DeclId> + '_ {
        self.decls
            .iter()
            .enumerate()
            .filter(|(_, d)| d.parent.is_none())
            .map(|(i, _)| DeclId(i as u32))
    }

    pub fn children(&self, id: DeclId) -> &[DeclId] {
        &self.decl(id).children
    }

    /// Children of one kind, optionally restricted to public ones.
    pub fn children_of_kind(
        &self,
        id: DeclId,
        kind: DeclKind,
        public_only: bool,
    ) -> Vec<DeclId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| {
                let d = self.decl(c);
                d.kind == kind && (!public_only || d.is_public())
            })
            .collect()
    }

    pub fn methods(&self, class: DeclId) -> Vec<DeclId> {
        self.children_of_kind(class, DeclKind::Method, false)
    }

    pub fn ctors(&self, class: DeclId, public_only: bool) -> Vec<DeclId> {
        self.children_of_kind(class, DeclKind::Constructor, public_only)
    }

    pub fn destructors(&self, class: DeclId) -> Vec<DeclId> {
        self.children_of_kind(class, DeclKind::Destructor, false)
    }

    pub fn fields(&self, class: DeclId, public_only: bool) -> Vec<DeclId> {
        self.children_of_kind(class, DeclKind::Field, public_only)
    }

    pub fn bases(&self, class: DeclId) -> Vec<DeclId> {
        self.children_of_kind(class, DeclKind::Base, false)
    }

    pub fn params(&self, callable: DeclId) -> Vec<DeclId> {
        self.children_of_kind(callable, DeclKind::Param, false)
    }

    pub fn enum_constants(&self, enum_: DeclId) -> Vec<DeclId> {
        self.children_of_kind(enum_, DeclKind::EnumConstant, false)
    }

    /// The underlying type of a typedef declaration.
    pub fn typedef_underlying(&self, id: DeclId) -> Option<&TypeRef> {
        let d = self.decl(id);
        if d.kind == DeclKind::Typedef {
            d.ty.as_ref()
        } else {
            None
        }
    }

    /// Follow a type reference to the declaration it names.
    pub fn type_decl(&self, ty: &TypeRef) -> Option<&Decl> {
        ty.decl.map(|id| self.decl(id))
    }
}
