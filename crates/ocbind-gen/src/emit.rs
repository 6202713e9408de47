//! Registration-chain and annotation emission for one bound declaration.
//!
//! Everything here appends to caller-owned string buffers; file layout and
//! ordering are the module binder's business.

use crate::bases::resolve_base_decl;
use crate::classify::Classifier;
use crate::context::RunContext;
use crate::methods::{group_methods, render_method};
use crate::policy::Policy;
use crate::render::{call_spelling, lua_type_tag, TemplateCtx};
use ocbind_ast::{DeclId, DeclKind, TranslationUnit};

/// One class about to be emitted: the declaration whose members are walked,
/// the spelling it is registered under, and the template substitution in
/// effect. For an instantiation typedef the target is the primary template
/// and the spelling is the typedef name.
pub struct ClassInfo {
    pub target: DeclId,
    pub spelling: String,
    pub tctx: TemplateCtx,
}

impl ClassInfo {
    pub fn plain(tu: &TranslationUnit, class: DeclId) -> Self {
        Self {
            target: class,
            spelling: tu.name(class).to_string(),
            tctx: TemplateCtx::inactive(),
        }
    }

    /// Resolve a typedef like `typedef NCollection_Array1<Standard_Real>
    /// TColStd_Array1OfReal;` into a bindable class, if its primary template
    /// is admitted by the policy.
    pub fn from_instantiation_typedef(
        tu: &TranslationUnit,
        policy: &Policy,
        typedef: DeclId,
        diags: &mut Vec<String>,
    ) -> Option<Self> {
        let td = tu.decl(typedef);
        if td.kind != DeclKind::Typedef {
            return None;
        }
        let under = td.ty.as_ref()?;
        let tmpl_id = under.decl?;
        let tmpl = tu.decl(tmpl_id);
        if tmpl.kind != DeclKind::ClassTemplate
            || !policy.template_class.contains(tmpl.name.as_str())
        {
            return None;
        }
        if under.template_args.is_empty() {
            diags.push(format!(
                "No template arguments recorded for {}",
                td.name
            ));
            return None;
        }

        let tctx = if tmpl.template_params.is_empty() {
            // Header-only templates sometimes lose their parameter cursors;
            // fall back to scanning the display name.
            diags.push(format!(
                "Scanning display name for parameters of {}",
                tmpl.name
            ));
            TemplateCtx::from_display_scan(&tmpl.display_name, &under.template_args)
        } else {
            TemplateCtx::structural(&tmpl.template_params, &under.template_args)
        };

        Some(Self {
            target: tmpl_id,
            spelling: td.name.to_string(),
            tctx,
        })
    }
}

/// Append the `luabridge::Stack` specialization for an enum to the shared
/// cast registry. Returns false for enums that cannot be bound.
pub fn emit_enum_cast(tu: &TranslationUnit, enum_id: DeclId, out: &mut String) -> bool {
    let Some((spelling, consts)) = bindable_enum(tu, enum_id) else {
        return false;
    };
    let values = consts
        .iter()
        .map(|&c| format!("{spelling}::{}", tu.name(c)))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&format!(
        "template<> struct luabridge::Stack<{spelling}> : luabridge::Enum<{spelling},{values}>{{}};\n"
    ));
    true
}

/// Append the namespace re-export of an enum's constants.
pub fn emit_enum_values(tu: &TranslationUnit, enum_id: DeclId, out: &mut String) -> bool {
    let Some((spelling, consts)) = bindable_enum(tu, enum_id) else {
        return false;
    };
    out.push_str(&format!(".beginNamespace(\"{spelling}\")\n"));
    for &c in &consts {
        let name = tu.name(c);
        out.push_str(&format!(
            ".addProperty(\"{name}\",+[](){{ return {spelling}::{name}; }})\n"
        ));
    }
    out.push_str(".endNamespace()\n\n");
    true
}

fn bindable_enum(tu: &TranslationUnit, enum_id: DeclId) -> Option<(String, Vec<DeclId>)> {
    let spelling = tu.name(enum_id);
    if spelling.is_empty() || spelling.contains("unnamed enum") {
        return None;
    }
    let consts = tu.enum_constants(enum_id);
    if consts.is_empty() {
        return None;
    }
    Some((spelling.to_string(), consts))
}

/// The base the emitted class derives from on the Lua side: the first direct
/// base whose definition is already registered. Unvisited bases cannot be
/// derived from; luabridge would reject the unknown type.
pub(crate) fn derive_base(
    tu: &TranslationUnit,
    ctx: &RunContext,
    class: DeclId,
) -> Option<String> {
    for base in tu.bases(class) {
        let resolved = tu
            .decl(base)
            .ty
            .as_ref()
            .and_then(|ty| resolve_base_decl(tu, ty));
        if let Some(id) = resolved {
            let name = tu.name(id);
            if ctx.is_visited(name) {
                return Some(name.to_string());
            }
        }
    }
    None
}

/// Append the full registration chain for one class or struct.
pub fn emit_class(
    tu: &TranslationUnit,
    policy: &Policy,
    ctx: &mut RunContext,
    info: &ClassInfo,
    out: &mut String,
) {
    let sp = info.spelling.as_str();
    let c = Classifier::new(tu, policy);

    match derive_base(tu, ctx, info.target) {
        Some(base) => out.push_str(&format!(".deriveClass<{sp}, {base}>(\"{sp}\")\n")),
        None => out.push_str(&format!(".beginClass<{sp}>(\"{sp}\")\n")),
    }

    emit_ctor(tu, &c, info, out);
    emit_fields(tu, info, out);
    emit_methods(tu, policy, &c, ctx, info, out);

    out.push_str(".endClass()\n\n");
}

fn emit_ctor(tu: &TranslationUnit, c: &Classifier, info: &ClassInfo, out: &mut String) {
    let target = info.target;
    if tu.decl(target).is_abstract || c.is_static_class(target) {
        return;
    }

    let ctors: Vec<DeclId> = tu
        .ctors(target, true)
        .into_iter()
        .filter(|&ct| !tu.decl(ct).is_deleted)
        .collect();
    let needs_default = c.needs_default_ctor(target);
    if ctors.is_empty() && !needs_default {
        return;
    }

    let sp = info.spelling.as_str();
    if c.is_transient(target) {
        out.push_str(&format!(".addConstructorFrom<opencascade::handle<{sp}>,"));
    } else {
        out.push_str(".addConstructor<");
    }

    if needs_default {
        out.push_str("void()");
    } else {
        let sigs = ctors
            .iter()
            .map(|&ct| {
                let params = tu
                    .params(ct)
                    .iter()
                    .map(|&p| {
                        tu.decl(p)
                            .ty
                            .as_ref()
                            .map(|ty| call_spelling(ty, &info.tctx))
                            .unwrap_or_default()
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                format!("void({params})")
            })
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&sigs);
    }

    out.push_str(">()\n");
}

/// Data members become properties for structs only; classes expose state
/// through accessors.
fn emit_fields(tu: &TranslationUnit, info: &ClassInfo, out: &mut String) {
    if tu.decl(info.target).kind != DeclKind::Struct {
        return;
    }
    let sp = info.spelling.as_str();
    for &f in &tu.fields(info.target, true) {
        if tu.decl(f).is_static {
            continue;
        }
        let name = tu.name(f);
        out.push_str(&format!(".addProperty(\"{name}\",&{sp}::{name})\n"));
    }
}

fn emit_methods(
    tu: &TranslationUnit,
    policy: &Policy,
    c: &Classifier,
    ctx: &mut RunContext,
    info: &ClassInfo,
    out: &mut String,
) {
    let sp = info.spelling.as_str();
    let target = info.target;
    let groups = group_methods(c, target);

    for (key, group) in &groups {
        let instance = group.instance(c, sp);
        let statics = group.statics(c, sp);

        if !instance.is_empty() {
            let exprs = render_subset(tu, policy, ctx, info, &instance);
            if !exprs.is_empty() {
                out.push_str(&format!(".addFunction(\"{key}\",{exprs})\n"));
            }
        }

        if !statics.is_empty() {
            // A "_" suffix keeps the static apart from a same-named
            // instance registration.
            let suffix = if instance.is_empty() { "" } else { "_" };
            let exprs = render_subset(tu, policy, ctx, info, &statics);
            if !exprs.is_empty() {
                out.push_str(&format!(".addStaticFunction(\"{key}{suffix}\",{exprs})\n"));
            }
        }
    }

    if let Some(extra) = policy.extra_method.get(sp) {
        out.push_str(extra);
        out.push('\n');
    }

    let root = policy.transient_root.as_str();
    if c.is_transient(target) && sp != root {
        out.push_str(&format!(
            ".addStaticFunction(\"DownCast\",+[](const Handle({root}) &h){{ return Handle({sp})::DownCast(h); }})\n"
        ));
    }

    let has_copy_method = tu.methods(target).iter().any(|&m| tu.name(m) == "Copy");
    if !has_copy_method
        && sp != root
        && !tu.ctors(target, true).is_empty()
        && c.is_copyable(target)
    {
        out.push_str(&format!(
            ".addFunction(\"Copy\",+[](const {sp} &__theSelf__){{ return {sp}{{__theSelf__}}; }})\n"
        ));
    }
}

/// Render every member of one subset; unexpected shapes render empty and are
/// dropped with a diagnostic rather than aborting the class.
fn render_subset(
    tu: &TranslationUnit,
    policy: &Policy,
    ctx: &mut RunContext,
    info: &ClassInfo,
    subset: &[DeclId],
) -> String {
    let overload = subset.len() > 1;
    let mut exprs = Vec::with_capacity(subset.len());
    for &m in subset {
        let text = render_method(tu, policy, &info.spelling, &info.tctx, m, overload);
        if text.is_empty() {
            ctx.diag(format!(
                "Skipped unexpected method shape: {}::{}",
                info.spelling,
                tu.name(m)
            ));
        } else {
            exprs.push(text);
        }
    }
    exprs.join(",")
}

/// Append the `---@class` annotation block for one bound class.
pub fn emit_meta_class(
    tu: &TranslationUnit,
    policy: &Policy,
    ctx: &RunContext,
    info: &ClassInfo,
    out: &mut String,
) {
    let sp = info.spelling.as_str();
    let c = Classifier::new(tu, policy);

    match derive_base(tu, ctx, info.target) {
        Some(base) => out.push_str(&format!("---@class {sp}: {base}\n")),
        None => out.push_str(&format!("---@class {sp}\n")),
    }

    if tu.decl(info.target).kind == DeclKind::Struct {
        for &f in &tu.fields(info.target, true) {
            if tu.decl(f).is_static {
                continue;
            }
            let tag = tu
                .decl(f)
                .ty
                .as_ref()
                .map(|ty| lua_type_tag(tu, ty, &info.tctx))
                .unwrap_or_else(|| "any".to_string());
            out.push_str(&format!("---@field {} {tag}\n", tu.name(f)));
        }
    }

    let groups = group_methods(&c, info.target);
    for (key, group) in &groups {
        let instance = group.instance(&c, sp);
        let statics = group.statics(&c, sp);

        // One signature per name is enough for the annotation; overloads
        // share the first member's shape.
        if let Some(&m) = instance.first() {
            out.push_str(&format!(
                "---@field {key} {}\n",
                meta_signature(tu, &c, info, m, Some(sp))
            ));
        }
        if let Some(&m) = statics.first() {
            let suffix = if instance.is_empty() { "" } else { "_" };
            out.push_str(&format!(
                "---@field {key}{suffix} {}\n",
                meta_signature(tu, &c, info, m, None)
            ));
        }
    }

    out.push('\n');
}

/// The annotated signature describes the adapter, not the C++ declaration:
/// output pointers vanish from the parameter list and their pointees join
/// the returned values, after the native result.
fn meta_signature(
    tu: &TranslationUnit,
    c: &Classifier,
    info: &ClassInfo,
    method: DeclId,
    self_type: Option<&str>,
) -> String {
    let all_params = tu.params(method);
    let (ins, outs) = if c.needs_in_out(method) {
        c.in_out_params(method)
    } else {
        (all_params.clone(), Vec::new())
    };

    let mut parts = Vec::new();
    if let Some(sp) = self_type {
        parts.push(format!("self: {sp}"));
    }
    for &p in &ins {
        let name = {
            let n = tu.name(p);
            if n.is_empty() {
                let i = all_params.iter().position(|&q| q == p).unwrap_or(0);
                format!("theArg{i}")
            } else {
                n.to_string()
            }
        };
        let tag = tu
            .decl(p)
            .ty
            .as_ref()
            .map(|ty| lua_type_tag(tu, ty, &info.tctx))
            .unwrap_or_else(|| "any".to_string());
        parts.push(format!("{name}: {tag}"));
    }

    let mut rets = Vec::new();
    if let Some(tag) = tu
        .decl(method)
        .result
        .as_ref()
        .map(|ty| lua_type_tag(tu, ty, &info.tctx))
        .filter(|tag| tag != "nil")
    {
        rets.push(tag);
    }
    for &p in &outs {
        let tag = tu
            .decl(p)
            .ty
            .as_ref()
            .map(|ty| lua_type_tag(tu, ty, &info.tctx))
            .unwrap_or_else(|| "any".to_string());
        rets.push(tag);
    }

    if rets.is_empty() {
        format!("fun({})", parts.join(", "))
    } else {
        format!("fun({}): {}", parts.join(", "), rets.join(", "))
    }
}

/// Append the annotation block for an enum: a class of integer constants.
pub fn emit_meta_enum(tu: &TranslationUnit, enum_id: DeclId, out: &mut String) {
    let Some((spelling, consts)) = bindable_enum(tu, enum_id) else {
        return;
    };
    out.push_str(&format!("---@class {spelling}\n"));
    for &c in &consts {
        out.push_str(&format!("---@field {} integer\n", tu.name(c)));
    }
    out.push('\n');
}
