//! Binding policy (`ocbind.toml` format).
//!
//! Loaded once per run, read-only afterwards. Literal-override tables keep
//! file order (`IndexMap`); name sets iterate sorted (`BTreeSet`) so two runs
//! over the same policy produce byte-identical output.

use crate::error::{GenError, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeSet;

/// Root binding policy.
#[derive(Debug, Clone, Deserialize)]
pub struct Policy {
    /// Module names, in processing order.
    pub modules: Vec<String>,

    /// Lua namespace the bindings are registered under.
    #[serde(default = "default_namespace")]
    pub lua_namespace: String,

    /// Name of the library's intrusive ref-counted root type.
    #[serde(default = "default_transient_root")]
    pub transient_root: String,

    /// Admit only methods whose name starts with an uppercase letter
    /// (the library's public-method naming convention).
    #[serde(default = "default_true")]
    pub require_uppercase_methods: bool,

    /// Whether a public instance field disqualifies a static class.
    #[serde(default)]
    pub static_class_checks_fields: bool,

    /// Class templates whose instantiation typedefs get bound.
    #[serde(default)]
    pub template_class: BTreeSet<String>,

    /// Types passed through by value on the Lua side; a non-const pointer
    /// to one of these is an output parameter.
    #[serde(default)]
    pub immutable_type: BTreeSet<String>,

    /// Operator spelling -> Lua metamethod name.
    #[serde(default)]
    pub lua_operators: IndexMap<String, String>,

    #[serde(default)]
    pub black_list: BlackList,

    /// `Class::Method` -> literal registration text, bypassing generation.
    #[serde(default)]
    pub manual_method: IndexMap<String, String>,

    /// Class name -> literal text appended after its method registrations.
    #[serde(default)]
    pub extra_method: IndexMap<String, String>,
}

/// Names excluded from binding.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlackList {
    /// Class names never bound.
    #[serde(default)]
    pub class: BTreeSet<String>,

    /// Qualified `Class::Method` names never bound.
    #[serde(default)]
    pub method: BTreeSet<String>,

    /// Short method names never bound, on any class.
    #[serde(default)]
    pub method_by_name: BTreeSet<String>,

    /// Classes that never get a synthesized value-copy function.
    #[serde(default)]
    pub copyable: BTreeSet<String>,
}

fn default_namespace() -> String {
    "LuaOCCT".to_string()
}

fn default_transient_root() -> String {
    "Standard_Transient".to_string()
}

fn default_true() -> bool {
    true
}

impl Policy {
    /// Load and validate a policy from a TOML file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(GenError::ReadPolicy)?;
        Self::from_str(&content)
    }

    /// Parse and validate a policy from TOML text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let policy: Policy = toml::from_str(content)?;
        policy.validate()?;
        Ok(policy)
    }

    fn validate(&self) -> Result<()> {
        if self.modules.is_empty() {
            return Err(GenError::Validation(
                "policy declares no modules".to_string(),
            ));
        }
        if self.lua_namespace.is_empty() {
            return Err(GenError::Validation(
                "lua_namespace must not be empty".to_string(),
            ));
        }
        for (op, target) in &self.lua_operators {
            if !op.starts_with("operator") {
                return Err(GenError::Validation(format!(
                    "lua_operators key '{op}' is not an operator spelling"
                )));
            }
            if target.is_empty() {
                return Err(GenError::Validation(format!(
                    "lua_operators entry '{op}' maps to an empty name"
                )));
            }
        }
        Ok(())
    }

    /// Symbol prefix for generated init functions, derived from the
    /// namespace (e.g. `LuaOCCT` -> `luaocct`).
    pub fn init_prefix(&self) -> String {
        self.lua_namespace.to_lowercase()
    }

    pub fn is_operator_name(&self, name: &str) -> bool {
        self.lua_operators.contains_key(name)
    }

    pub fn manual_override(&self, class: &str, method: &str) -> Option<&str> {
        self.manual_method
            .get(&format!("{class}::{method}"))
            .map(String::as_str)
    }

    pub fn is_method_blacklisted(&self, class: &str, method: &str) -> bool {
        self.black_list.method_by_name.contains(method)
            || self
                .black_list
                .method
                .contains(&format!("{class}::{method}"))
    }
}
