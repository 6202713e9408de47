//! Declaration and type model for the ocbind binding generator.
//!
//! This crate provides an owned, backend-agnostic view of one parsed
//! translation unit:
//! - `TranslationUnit`: an arena of declarations addressed by `DeclId`
//! - `Decl`: one declaration (class, method, field, base specifier, ...)
//! - `TypeRef`: a type reference with pointer/reference structure and a
//!   link back to the referenced declaration
//!
//! The generator core never talks to libclang directly; whatever backend
//! parses the headers lowers its cursors into this model first. That keeps
//! classification and rendering testable with hand-built units.

mod decl;
mod types;
mod unit;

pub use decl::{Access, CtorKind, Decl, DeclId, DeclKind};
pub use types::{TypeKind, TypeRef};
pub use unit::TranslationUnit;
