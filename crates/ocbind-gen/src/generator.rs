//! Run driver: parses each module, binds it, writes the output tree.

use crate::context::RunContext;
use crate::error::{GenError, Result};
use crate::module::ModuleBinder;
use crate::policy::Policy;
use ocbind_ast::TranslationUnit;
use std::fs;
use std::path::{Path, PathBuf};

/// Source of parsed translation units. The production implementation wraps
/// libclang; tests hand-build units instead.
pub trait AstBackend {
    /// Parse the translation unit for one module's umbrella header.
    fn parse_module(&mut self, module: &str, header: &Path) -> Result<TranslationUnit>;
}

/// Drives one full generation run over the policy's module list.
pub struct Generator {
    policy: Policy,
    mod_dir: PathBuf,
    out_dir: PathBuf,
}

impl Generator {
    pub fn new(policy: Policy, mod_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            policy,
            mod_dir: mod_dir.into(),
            out_dir: out_dir.into(),
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// The umbrella header for one module.
    pub fn module_header(&self, module: &str) -> PathBuf {
        self.mod_dir.join(format!("_{module}.h"))
    }

    fn validate(&self) -> Result<()> {
        if !self.mod_dir.is_dir() {
            return Err(GenError::Validation(format!(
                "module directory does not exist: {}",
                self.mod_dir.display()
            )));
        }
        Ok(())
    }

    /// Run every module in policy order. A parse failure aborts the
    /// remainder of the run; emission anomalies only end up in the returned
    /// context's diagnostics.
    pub fn run(&self, backend: &mut dyn AstBackend) -> Result<RunContext> {
        self.validate()?;

        let meta_dir = self.out_dir.join("_meta");
        fs::create_dir_all(&meta_dir).map_err(|e| GenError::WriteOutput {
            path: meta_dir.display().to_string(),
            source: e,
        })?;

        let mut ctx = RunContext::new();

        for module in &self.policy.modules {
            let header = self.module_header(module);
            let tu = backend.parse_module(module, &header)?;

            let output = ModuleBinder::new(module, &self.policy).generate(&tu, &mut ctx);

            write_file(&self.out_dir.join(format!("l{module}.h")), &output.header)?;
            write_file(&self.out_dir.join(format!("l{module}.cpp")), &output.source)?;
            write_file(&meta_dir.join(format!("{module}.lua")), &output.meta)?;

            println!("Module exported: l{module}");
        }

        self.write_enum_header(&ctx)?;
        self.write_main()?;

        Ok(ctx)
    }

    /// The shared enum-cast registry, finalized once after all modules ran.
    fn write_enum_header(&self, ctx: &RunContext) -> Result<()> {
        let ns = &self.policy.lua_namespace;
        let mut text = format!(
            "/* This file is generated, do not edit. */\n\n\
#ifndef _{ns}_lenums_HeaderFile\n#define _{ns}_lenums_HeaderFile\n\n\
#include \"lbind.h\"\n\n"
        );
        text.push_str(&ctx.enum_casts);
        text.push_str("\n#endif\n");
        write_file(&self.out_dir.join("lenums.h"), &text)
    }

    /// The aggregation unit carrying the `luaopen_` entry point.
    fn write_main(&self) -> Result<()> {
        let prefix = self.policy.init_prefix();
        let mut text = format!(
            "/* This file is generated, do not edit. */\n\n#include \"{prefix}.h\"\n"
        );
        for module in &self.policy.modules {
            text.push_str(&format!("#include \"l{module}.h\"\n"));
        }
        text.push_str(&format!(
            "\nint32_t luaopen_{prefix}(lua_State *L) {{\n"
        ));
        for module in &self.policy.modules {
            text.push_str(&format!("\t{prefix}_init_{module}(L);\n"));
        }
        text.push_str("\n\treturn 0;\n}\n");

        let path = self.out_dir.join(format!("{prefix}.cpp"));
        write_file(&path, &text)?;
        println!("Exported: {}", path.display());
        Ok(())
    }
}

fn write_file(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text).map_err(|e| GenError::WriteOutput {
        path: path.display().to_string(),
        source: e,
    })
}
