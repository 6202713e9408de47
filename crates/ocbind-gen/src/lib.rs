//! Binding decision engine for the ocbind generator.
//!
//! This crate decides, per native declaration, whether and how it becomes a
//! Lua binding, and synthesizes the adapter call expressions:
//!
//! - `policy`: the configurable filtering/override tables (`ocbind.toml`)
//! - `classify`: pure predicates over declarations
//! - `bases`: inheritance flattening through typedefs and specializations
//! - `render`: call-site spellings and Lua type tags
//! - `methods`: method grouping, overloads, operators, in/out transforms
//! - `emit`: per-class/struct/enum adapter and annotation text
//! - `module`: one logical module (name-prefix grouping) of declarations
//! - `generator`: the whole-run driver and output aggregation
//!
//! The AST backend is abstracted behind [`AstBackend`]; everything here
//! operates on the `ocbind-ast` model only.

pub mod bases;
pub mod classify;
pub mod context;
pub mod emit;
pub mod error;
pub mod generator;
pub mod methods;
pub mod module;
pub mod policy;
pub mod render;

pub use context::RunContext;
pub use error::{GenError, Result};
pub use generator::{AstBackend, Generator};
pub use module::{ModuleBinder, ModuleOutput};
pub use policy::Policy;
pub use render::TemplateCtx;
