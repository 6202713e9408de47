//! libclang AST backend for the ocbind generator.
//!
//! This crate parses C++ module headers via libclang and lowers the cursor
//! tree into the owned `ocbind-ast` model the binding engine consumes:
//!
//! ```text
//! C++ headers → libclang → cursor tree → TranslationUnit
//! ```
//!
//! Everything libclang-specific stays behind this crate; the engine only
//! sees [`ocbind_ast::TranslationUnit`].

mod parse;

pub use parse::ClangBackend;
