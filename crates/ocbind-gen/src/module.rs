//! Per-module binding pass.
//!
//! A module is a name-prefix grouping over one translation unit
//! (`gp_Pnt`, `gp_Vec`, ... under module `gp`). One pass walks the
//! top-level declarations in a fixed order: enums, structs,
//! template-instantiation typedefs, then ordinary classes. The order
//! matters; a class bound later in the same module may derive from a
//! struct or typedef-origin class bound earlier.

use crate::context::RunContext;
use crate::emit::{
    emit_class, emit_enum_cast, emit_enum_values, emit_meta_class, emit_meta_enum, ClassInfo,
};
use crate::policy::Policy;
use ocbind_ast::{DeclId, DeclKind, TranslationUnit};

/// Generated text for one module.
pub struct ModuleOutput {
    /// `l<Mod>.h`: include guard and the init-function prototype.
    pub header: String,
    /// `l<Mod>.cpp`: the init function with the full registration chain.
    pub source: String,
    /// `_meta/<Mod>.lua`: annotation document.
    pub meta: String,
}

/// Binds every admitted declaration of one module.
pub struct ModuleBinder<'a> {
    name: &'a str,
    policy: &'a Policy,
}

impl<'a> ModuleBinder<'a> {
    pub fn new(name: &'a str, policy: &'a Policy) -> Self {
        Self { name, policy }
    }

    /// A declaration belongs to this module if its name carries the module
    /// prefix or equals the module name (e.g. the `gp` utility class in
    /// module `gp`).
    fn in_module(&self, spelling: &str) -> bool {
        spelling == self.name || spelling.starts_with(&format!("{}_", self.name))
    }

    /// Containers are bound through their instantiation typedefs, never as
    /// raw class declarations.
    fn is_container_spelling(spelling: &str) -> bool {
        spelling.starts_with("Handle")
            || spelling.starts_with("NCollection")
            || spelling.contains("Array")
            || spelling.contains("List")
            || spelling.contains("Sequence")
    }

    /// Generate the module's header, source and annotation text. Enum casts
    /// go to the run-shared registry on `ctx`.
    pub fn generate(&self, tu: &TranslationUnit, ctx: &mut RunContext) -> ModuleOutput {
        let ns = &self.policy.lua_namespace;
        let prefix = self.policy.init_prefix();
        let name = self.name;

        let guard = format!("_{ns}_l{name}_HeaderFile");
        let header = format!(
            "/* This file is generated, do not edit. */\n\n\
#ifndef {guard}\n#define {guard}\n\n\
#include \"lbind.h\"\n\n\
void {prefix}_init_{name}(lua_State *L);\n\n\
#endif\n"
        );

        let mut chunk = String::new();
        let mut meta = String::new();

        for id in tu.roots() {
            let decl = tu.decl(id);
            if decl.kind == DeclKind::Enum && self.in_module(&decl.name) {
                self.bind_enum(tu, ctx, id, &mut chunk, &mut meta);
            }
        }
        for id in tu.roots() {
            let decl = tu.decl(id);
            if decl.kind == DeclKind::Struct {
                self.bind_record(tu, ctx, id, &mut chunk, &mut meta);
            }
        }
        for id in tu.roots() {
            let decl = tu.decl(id);
            if decl.kind == DeclKind::Typedef && self.in_module(&decl.name) {
                self.bind_typedef(tu, ctx, id, &mut chunk, &mut meta);
            }
        }
        for id in tu.roots() {
            let decl = tu.decl(id);
            if decl.kind == DeclKind::Class {
                self.bind_record(tu, ctx, id, &mut chunk, &mut meta);
            }
        }

        let mut source = format!(
            "/* This file is generated, do not edit. */\n\n\
#include \"l{name}.h\"\n\n\
void {prefix}_init_{name}(lua_State *L) {{\n\
luabridge::getGlobalNamespace(L)\n\
.beginNamespace(\"{ns}\")\n\
.beginNamespace(\"{name}\")\n\n"
        );
        source.push_str(&chunk);
        source.push_str(".endNamespace()\n.endNamespace();\n}\n");

        ModuleOutput {
            header,
            source,
            meta,
        }
    }

    fn bind_enum(
        &self,
        tu: &TranslationUnit,
        ctx: &mut RunContext,
        id: DeclId,
        chunk: &mut String,
        meta: &mut String,
    ) {
        let spelling = tu.name(id).to_string();
        if spelling.is_empty() || ctx.is_visited(&spelling) {
            return;
        }

        let mut cast = String::new();
        if !emit_enum_cast(tu, id, &mut cast) {
            return;
        }
        ctx.add_visited(&spelling);
        println!("Binding enum: {spelling}");
        ctx.enum_casts.push_str(&cast);
        emit_enum_values(tu, id, chunk);
        emit_meta_enum(tu, id, meta);
    }

    fn bind_typedef(
        &self,
        tu: &TranslationUnit,
        ctx: &mut RunContext,
        id: DeclId,
        chunk: &mut String,
        meta: &mut String,
    ) {
        let mut diags = Vec::new();
        let Some(info) = ClassInfo::from_instantiation_typedef(tu, self.policy, id, &mut diags)
        else {
            ctx.diagnostics.extend(diags);
            return;
        };
        ctx.diagnostics.extend(diags);

        if self.policy.black_list.class.contains(&info.spelling)
            || !ctx.add_visited(&info.spelling)
        {
            return;
        }
        println!("Binding class: {}", info.spelling);
        emit_class(tu, self.policy, ctx, &info, chunk);
        emit_meta_class(tu, self.policy, ctx, &info, meta);
    }

    fn bind_record(
        &self,
        tu: &TranslationUnit,
        ctx: &mut RunContext,
        id: DeclId,
        chunk: &mut String,
        meta: &mut String,
    ) {
        let decl = tu.decl(id);
        let spelling = decl.name.to_string();
        if !self.in_module(&spelling) || Self::is_container_spelling(&spelling) {
            return;
        }
        if self.policy.black_list.class.contains(&spelling) {
            return;
        }
        // Forward declarations carry no members; skipping them keeps the
        // binding order along the inheritance tree.
        if !decl.is_definition || tu.children(id).is_empty() {
            return;
        }
        if !ctx.add_visited(&spelling) {
            return;
        }

        println!("Binding class: {spelling}");
        let info = ClassInfo::plain(tu, id);
        emit_class(tu, self.policy, ctx, &info, chunk);
        emit_meta_class(tu, self.policy, ctx, &info, meta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocbind_ast::{Decl, TypeRef};

    fn policy() -> Policy {
        Policy::from_str(
            r#"
modules = ["gp"]
template_class = ["NCollection_Array1"]
immutable_type = ["Standard_Boolean", "Standard_Integer", "Standard_Real"]

[lua_operators]
"operator+" = "__add"
"operator-" = "__sub"

[black_list]
class = ["gp_VectorWithNullMagnitude"]
            "#,
        )
        .unwrap()
    }

    fn sample_unit() -> TranslationUnit {
        let mut tu = TranslationUnit::new();

        let e = tu.add(Decl::new(DeclKind::Enum, "gp_TrihedronPole"), None);
        tu.add(Decl::new(DeclKind::EnumConstant, "gp_TP_FRONT"), Some(e));

        let base = tu.add(Decl::new(DeclKind::Class, "gp_Ax1"), None);
        tu.add(
            Decl::new(DeclKind::Constructor, "gp_Ax1")
                .with_ctor_kind(ocbind_ast::CtorKind::Default),
            Some(base),
        );

        let derived = tu.add(Decl::new(DeclKind::Class, "gp_Ax2"), None);
        let ty = TypeRef::named("gp_Ax1").with_decl(base);
        tu.add(Decl::new(DeclKind::Base, "gp_Ax1").with_type(ty), Some(derived));
        tu.add(
            Decl::new(DeclKind::Constructor, "gp_Ax2")
                .with_ctor_kind(ocbind_ast::CtorKind::Default),
            Some(derived),
        );

        tu
    }

    #[test]
    fn test_header_shape() {
        let policy = policy();
        let tu = sample_unit();
        let mut ctx = RunContext::new();
        let out = ModuleBinder::new("gp", &policy).generate(&tu, &mut ctx);

        assert!(out.header.contains("#ifndef _LuaOCCT_lgp_HeaderFile"));
        assert!(out.header.contains("void luaocct_init_gp(lua_State *L);"));
    }

    #[test]
    fn test_source_order_and_inheritance() {
        let policy = policy();
        let tu = sample_unit();
        let mut ctx = RunContext::new();
        let out = ModuleBinder::new("gp", &policy).generate(&tu, &mut ctx);

        // Enums first, then classes in header order.
        let enum_at = out.source.find(".beginNamespace(\"gp_TrihedronPole\")").unwrap();
        let ax1_at = out.source.find(".beginClass<gp_Ax1>").unwrap();
        assert!(enum_at < ax1_at);
        // gp_Ax2 sees gp_Ax1 already visited.
        assert!(out
            .source
            .contains(".deriveClass<gp_Ax2, gp_Ax1>(\"gp_Ax2\")"));

        // The cast went to the shared registry, not the module source.
        assert!(ctx.enum_casts.contains("luabridge::Stack<gp_TrihedronPole>"));
        assert!(!out.source.contains("luabridge::Stack"));

        assert!(out.source.ends_with(".endNamespace()\n.endNamespace();\n}\n"));
    }

    #[test]
    fn test_admission_filters() {
        let policy = policy();
        let mut tu = TranslationUnit::new();
        for name in [
            "Geom_Curve",                  // other module
            "gp_VectorWithNullMagnitude",  // blacklisted
            "gp_ArrayOfThings",            // container spelling
        ] {
            let c = tu.add(Decl::new(DeclKind::Class, name), None);
            tu.add(Decl::new(DeclKind::Method, "Dummy"), Some(c));
        }
        tu.add(Decl::new(DeclKind::Class, "gp_Pnt").forward(), None);

        let mut ctx = RunContext::new();
        let out = ModuleBinder::new("gp", &policy).generate(&tu, &mut ctx);
        assert!(!out.source.contains("beginClass"));
    }

    #[test]
    fn test_visited_class_is_not_rebound() {
        let policy = policy();
        let tu = sample_unit();
        let mut ctx = RunContext::new();
        ctx.add_visited("gp_Ax1");

        let out = ModuleBinder::new("gp", &policy).generate(&tu, &mut ctx);
        assert!(!out.source.contains("beginClass<gp_Ax1>"));
        assert!(out.source.contains("deriveClass<gp_Ax2, gp_Ax1>"));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let policy = policy();
        let tu = sample_unit();

        let mut ctx1 = RunContext::new();
        let first = ModuleBinder::new("gp", &policy).generate(&tu, &mut ctx1);
        let mut ctx2 = RunContext::new();
        let second = ModuleBinder::new("gp", &policy).generate(&tu, &mut ctx2);

        assert_eq!(first.source, second.source);
        assert_eq!(first.header, second.header);
        assert_eq!(first.meta, second.meta);
        assert_eq!(ctx1.enum_casts, ctx2.enum_casts);
    }

    #[test]
    fn test_typedef_instantiation_bound_in_typedef_pass() {
        let policy = policy();
        let mut tu = TranslationUnit::new();
        let tmpl = tu.add(
            Decl::new(DeclKind::ClassTemplate, "NCollection_Array1")
                .with_display_name("NCollection_Array1<TheItemType>")
                .with_template_params(["TheItemType"]),
            None,
        );
        tu.add(
            Decl::new(DeclKind::Method, "Length")
                .const_()
                .with_result(TypeRef::named("Standard_Integer")),
            Some(tmpl),
        );
        tu.add(
            Decl::new(DeclKind::Typedef, "gp_Array1OfPnt").with_type(
                TypeRef::named("NCollection_Array1<gp_Pnt>")
                    .with_decl(tmpl)
                    .with_template_args(vec![TypeRef::named("gp_Pnt")]),
            ),
            None,
        );

        let mut ctx = RunContext::new();
        let out = ModuleBinder::new("gp", &policy).generate(&tu, &mut ctx);
        assert!(out
            .source
            .contains(".beginClass<gp_Array1OfPnt>(\"gp_Array1OfPnt\")"));
        assert!(out
            .source
            .contains(".addFunction(\"Length\",&gp_Array1OfPnt::Length)"));
    }
}
