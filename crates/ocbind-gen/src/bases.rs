//! Inheritance flattening.
//!
//! Expands a class's direct bases recursively, resolving each base type
//! through typedef and template-specialization chains until a concrete
//! class declaration is reached. The result is a flat, base-first,
//! duplicate-tolerant ancestor list.

use ocbind_ast::{DeclId, DeclKind, TranslationUnit, TypeRef};
use rustc_hash::FxHashSet;

/// Flatten all ancestors of `class`.
///
/// A base that cannot be traced to a concrete declaration is omitted and
/// reported through `diags`.
pub fn flatten_bases(
    tu: &TranslationUnit,
    class: DeclId,
    diags: &mut Vec<String>,
) -> Vec<DeclId> {
    let mut out = Vec::new();
    let mut guard = FxHashSet::default();
    // A specialization inherits whatever its primary template inherits.
    let start = tu.decl(class).specialization_of.unwrap_or(class);
    collect(tu, start, &mut out, &mut guard, diags);
    out
}

fn collect(
    tu: &TranslationUnit,
    class: DeclId,
    out: &mut Vec<DeclId>,
    guard: &mut FxHashSet<DeclId>,
    diags: &mut Vec<String>,
) {
    // Native hierarchies are acyclic; the guard catches malformed input.
    if !guard.insert(class) {
        return;
    }

    for base in tu.bases(class) {
        let decl = tu.decl(base);
        match decl.ty.as_ref().and_then(|ty| resolve_base_decl(tu, ty)) {
            Some(resolved) => {
                out.push(resolved);
                collect(tu, resolved, out, guard, diags);
            }
            None => diags.push(format!("Failed to find a base for {}", decl.name)),
        }
    }
}

/// Follow a base-specifier type to the class declaration it names,
/// unwrapping typedefs and mapping specializations back to their primary
/// template.
pub(crate) fn resolve_base_decl(tu: &TranslationUnit, ty: &TypeRef) -> Option<DeclId> {
    let mut id = ty.decl?;
    // Typedef chains in practice are one or two levels deep.
    for _ in 0..16 {
        let d = tu.decl(id);
        match d.kind {
            DeclKind::Typedef => id = d.ty.as_ref()?.decl?,
            DeclKind::Class | DeclKind::Struct | DeclKind::ClassTemplate => {
                return Some(d.specialization_of.unwrap_or(id));
            }
            _ => return None,
        }
    }
    None
}
