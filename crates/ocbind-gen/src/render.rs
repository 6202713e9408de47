//! Type-name rendering.
//!
//! Two renderings of one type reference:
//! - the call-site spelling used inside generated adapter code, with
//!   template parameters substituted when emitting a template instantiation
//! - the Lua type tag used in the annotation documents

use ocbind_ast::{DeclKind, TranslationUnit, TypeRef};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// Parameter-name -> argument-spelling substitution for the class emission
/// in progress. Empty outside template-instantiation contexts.
#[derive(Debug, Clone, Default)]
pub struct TemplateCtx {
    subst: FxHashMap<SmolStr, SmolStr>,
}

impl TemplateCtx {
    /// Context for an ordinary (non-template) class.
    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        !self.subst.is_empty()
    }

    /// Build from the template's declared parameter names, paired
    /// positionally with the instantiation's arguments.
    pub fn structural(params: &[SmolStr], args: &[TypeRef]) -> Self {
        let mut subst = FxHashMap::default();
        for (p, a) in params.iter().zip(args) {
            subst.insert(p.clone(), a.spelling.clone());
        }
        Self { subst }
    }

    /// Fallback: scan the template's display name (`Tmpl<A, B>`) for the
    /// identifier runs between `<`, `,` and `>`, pairing them positionally
    /// with the instantiation's arguments. Text scanning is fragile; prefer
    /// [`TemplateCtx::structural`] whenever parameter declarations exist.
    pub fn from_display_scan(display: &str, args: &[TypeRef]) -> Self {
        let mut subst = FxHashMap::default();
        // Find the closing bracket within the tail; a stray '>' before the
        // parameter list (operator spellings) must not derail the slice.
        let inner = match display.find('<') {
            Some(open) => {
                let tail = &display[open + 1..];
                match tail.rfind('>') {
                    Some(close) => &tail[..close],
                    None => tail,
                }
            }
            None => "",
        };
        for (p, a) in inner.split(',').map(str::trim).zip(args) {
            if !p.is_empty() {
                subst.insert(SmolStr::new(p), a.spelling.clone());
            }
        }
        Self { subst }
    }

    pub fn lookup(&self, ident: &str) -> Option<&str> {
        self.subst.get(ident).map(SmolStr::as_str)
    }
}

/// Render the call-site spelling of a type. Inside a template context every
/// identifier token matching a declared parameter is replaced by the
/// concrete argument spelling.
pub fn call_spelling(ty: &TypeRef, ctx: &TemplateCtx) -> String {
    if !ctx.is_active() {
        return ty.spelling.to_string();
    }
    normalize(&substitute_idents(&ty.spelling, ctx))
}

fn substitute_idents(spelling: &str, ctx: &TemplateCtx) -> String {
    let mut out = String::with_capacity(spelling.len());
    let mut ident = String::new();
    let flush = |ident: &mut String, out: &mut String| {
        if !ident.is_empty() {
            match ctx.lookup(ident) {
                Some(arg) => out.push_str(arg),
                None => out.push_str(ident),
            }
            ident.clear();
        }
    };
    for ch in spelling.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            ident.push(ch);
        } else {
            flush(&mut ident, &mut out);
            out.push(ch);
        }
    }
    flush(&mut ident, &mut out);
    out
}

/// Substitution can leave a dangling comma before a closing angle bracket
/// (defaulted or pack parameters); fold it away.
fn normalize(spelling: &str) -> String {
    spelling.replace(", >", ">").replace(",>", ">")
}

/// The Lua-side type tag for an annotation document.
pub fn lua_type_tag(tu: &TranslationUnit, ty: &TypeRef, ctx: &TemplateCtx) -> String {
    let mut t = ty;
    while t.is_pointer_like() {
        t = t.strip_indirection();
    }

    // Typedefs describe whatever they alias.
    if let Some(decl) = tu.type_decl(t) {
        if decl.kind == DeclKind::Typedef {
            if let Some(under) = decl.ty.as_ref() {
                return lua_type_tag(tu, under, ctx);
            }
        }
    }

    let base = t.base_name();
    let name = ctx.lookup(base).unwrap_or(base);

    if let Some(tag) = scalar_tag(name) {
        return tag.to_string();
    }

    // The intrusive smart handle is invisible on the Lua side.
    if (name == "handle" || name == "opencascade::handle") && t.template_args.len() == 1 {
        return lua_type_tag(tu, &t.template_args[0], ctx);
    }

    if name.contains("Array") || name.contains("List") || name.contains("Sequence") {
        match t.template_args.len() {
            1 => return format!("{}[]", lua_type_tag(tu, &t.template_args[0], ctx)),
            2 => return format!("{}[][]", lua_type_tag(tu, &t.template_args[0], ctx)),
            _ => {}
        }
    }

    match tu.type_decl(t) {
        Some(decl) => decl.name.to_string(),
        None => name.to_string(),
    }
}

fn scalar_tag(name: &str) -> Option<&'static str> {
    match name {
        "Standard_Boolean" | "bool" => Some("boolean"),
        "Standard_Integer" | "int" | "long" | "short" | "unsigned int" | "unsigned long"
        | "size_t" => Some("integer"),
        "Standard_Real" | "Standard_ShortReal" | "double" | "float" => Some("number"),
        "Standard_CString" | "TCollection_AsciiString" | "TCollection_ExtendedString"
        | "char" => Some("string"),
        "void" => Some("nil"),
        _ => None,
    }
}
