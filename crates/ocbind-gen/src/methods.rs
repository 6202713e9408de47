//! Method grouping and adapter-expression synthesis.
//!
//! Methods are grouped by their Lua-visible name (operator spellings are
//! translated first), each group keeping independently-filtered instance
//! and static subsets. Per accepted method exactly one strategy applies:
//! manual override, operator adapter, in/out transform, overload wrapper,
//! or a bare pointer-to-member.

use crate::classify::Classifier;
use crate::policy::Policy;
use crate::render::{call_spelling, TemplateCtx};
use ocbind_ast::{DeclId, TranslationUnit};
use std::collections::BTreeMap;

/// Same-named methods within one class.
#[derive(Debug, Default)]
pub struct MethodGroup {
    methods: Vec<DeclId>,
}

impl MethodGroup {
    fn add(&mut self, method: DeclId) {
        self.methods.push(method);
    }

    /// Accepted instance methods, in declaration order.
    pub fn instance(&self, c: &Classifier, class_name: &str) -> Vec<DeclId> {
        self.methods
            .iter()
            .copied()
            .filter(|&m| !c.is_ignored_method(class_name, m) && !c.tu.decl(m).is_static)
            .collect()
    }

    /// Accepted static methods, in declaration order.
    pub fn statics(&self, c: &Classifier, class_name: &str) -> Vec<DeclId> {
        self.methods
            .iter()
            .copied()
            .filter(|&m| !c.is_ignored_method(class_name, m) && c.tu.decl(m).is_static)
            .collect()
    }
}

/// Group a class's methods by Lua-visible name.
///
/// `operator-` maps to `__unm` with zero parameters and `__sub` with one;
/// the two never collide within one class's grouping.
pub fn group_methods(c: &Classifier, class: DeclId) -> BTreeMap<String, MethodGroup> {
    let mut groups: BTreeMap<String, MethodGroup> = BTreeMap::new();

    for &method in &c.tu.methods(class) {
        let name = c.tu.name(method);
        let key = if c.is_operator(method) {
            if name == "operator-" {
                if c.tu.params(method).is_empty() {
                    "__unm".to_string()
                } else {
                    "__sub".to_string()
                }
            } else {
                c.policy
                    .lua_operators
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| name.to_string())
            }
        } else {
            name.to_string()
        };
        groups.entry(key).or_default().add(method);
    }

    groups
}

/// Synthesize the registration expression for one accepted method.
///
/// Returns an empty string when the shape is unexpected (e.g. a binary
/// operator with no parameter); the caller skips that registration.
pub fn render_method(
    tu: &TranslationUnit,
    policy: &Policy,
    class_spelling: &str,
    tctx: &TemplateCtx,
    method: DeclId,
    is_overload: bool,
) -> String {
    let decl = tu.decl(method);
    let name = decl.name.as_str();

    if let Some(literal) = policy.manual_override(class_spelling, name) {
        return literal.to_string();
    }

    if policy.is_operator_name(name) {
        return render_operator(tu, class_spelling, tctx, method);
    }

    let classifier = Classifier::new(tu, policy);
    if classifier.needs_in_out(method) {
        return render_in_out(tu, &classifier, class_spelling, tctx, method);
    }

    if is_overload {
        let param_types = tu
            .params(method)
            .iter()
            .map(|&p| param_type_spelling(tu, tctx, p))
            .collect::<Vec<_>>()
            .join(",");
        format!("luabridge::overload<{param_types}>(&{class_spelling}::{name})")
    } else {
        format!("&{class_spelling}::{name}")
    }
}

fn param_type_spelling(tu: &TranslationUnit, tctx: &TemplateCtx, param: DeclId) -> String {
    tu.decl(param)
        .ty
        .as_ref()
        .map(|ty| call_spelling(ty, tctx))
        .unwrap_or_default()
}

fn param_name(tu: &TranslationUnit, param: DeclId, index: usize) -> String {
    let name = tu.name(param);
    if name.is_empty() {
        format!("theArg{index}")
    } else {
        name.to_string()
    }
}

/// Free-function adapter over a const class reference.
fn render_operator(
    tu: &TranslationUnit,
    class_spelling: &str,
    tctx: &TemplateCtx,
    method: DeclId,
) -> String {
    let name = tu.name(method);
    let params = tu.params(method);
    let mut out = format!("+[](const {class_spelling} &theSelf");

    if name == "operator-" {
        if params.is_empty() {
            // __unm
            out.push_str("){ return -theSelf; }");
        } else {
            // __sub
            let pty = param_type_spelling(tu, tctx, params[0]);
            out.push_str(&format!(",{pty} theOther){{ return theSelf-theOther; }}"));
        }
        return out;
    }

    if params.is_empty() {
        // Binary operator without an operand: emission anomaly.
        return String::new();
    }

    let pty = param_type_spelling(tu, tctx, params[0]);
    let op = &name["operator".len()..];
    out.push_str(&format!(
        ",{pty} theOther){{ return theSelf{op}theOther; }}"
    ));
    out
}

/// Adapter whose visible parameter list keeps only true inputs; each output
/// pointee is default-constructed locally, passed to the native call, and
/// returned.
fn render_in_out(
    tu: &TranslationUnit,
    classifier: &Classifier,
    class_spelling: &str,
    tctx: &TemplateCtx,
    method: DeclId,
) -> String {
    let decl = tu.decl(method);
    let (ins, outs) = classifier.in_out_params(method);
    let is_static = decl.is_static;

    // Fallback names for unnamed parameters are positional in the full
    // parameter list, so declaration and call sites agree.
    let all_params = tu.params(method);
    let pname = |p: DeclId| -> String {
        let i = all_params.iter().position(|&q| q == p).unwrap_or(0);
        param_name(tu, p, i)
    };

    let mut out = String::from("+[](");

    if !is_static {
        if decl.is_const {
            out.push_str("const ");
        }
        out.push_str(class_spelling);
        out.push_str(" &__theSelf__");
        if !ins.is_empty() {
            out.push(',');
        }
    }

    let rendered_ins = ins
        .iter()
        .map(|&p| format!("{} {}", param_type_spelling(tu, tctx, p), pname(p)))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&rendered_ins);

    let ret_spelling = decl
        .result
        .as_ref()
        .map(|ty| call_spelling(ty, tctx))
        .unwrap_or_else(|| "void".to_string());
    let has_ret = ret_spelling != "void";
    let tuple_out = has_ret || outs.len() > 1;

    let out_pointee = |p: DeclId| -> String {
        tu.decl(p)
            .ty
            .as_ref()
            .map(|ty| call_spelling(ty.strip_indirection(), tctx))
            .unwrap_or_default()
    };

    if tuple_out {
        out.push_str(")->std::tuple<");
        if has_ret {
            out.push_str(&ret_spelling);
            out.push(',');
        }
        out.push_str(
            &outs
                .iter()
                .map(|&p| out_pointee(p))
                .collect::<Vec<_>>()
                .join(","),
        );
        out.push_str("> { ");
    } else {
        out.push_str(&format!(")->{} {{ ", out_pointee(outs[0])));
    }

    for &p in &outs {
        out.push_str(&format!("{} {}{{}};", out_pointee(p), pname(p)));
    }

    if has_ret {
        out.push_str(&format!("{ret_spelling} __theRet__="));
    }

    if is_static {
        out.push_str(class_spelling);
        out.push_str("::");
    } else {
        out.push_str("__theSelf__.");
    }

    let call_args = all_params
        .iter()
        .map(|&p| {
            let name = pname(p);
            let is_ptr = tu
                .decl(p)
                .ty
                .as_ref()
                .is_some_and(ocbind_ast::TypeRef::is_pointer);
            if is_ptr {
                format!("&{name}")
            } else {
                name
            }
        })
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&format!("{}({});", decl.name, call_args));

    if tuple_out {
        out.push_str("return {");
        if has_ret {
            out.push_str("__theRet__,");
        }
        out.push_str(
            &outs
                .iter()
                .map(|&p| pname(p))
                .collect::<Vec<_>>()
                .join(","),
        );
        out.push_str("}; }");
    } else {
        out.push_str(&format!("return {}; }}", pname(outs[0])));
    }

    out
}
