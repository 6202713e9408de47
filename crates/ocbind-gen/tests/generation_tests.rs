//! End-to-end generation tests over hand-built translation units.
//!
//! Each test builds a small declaration arena the way the clang backend
//! would, runs a module pass, and checks the emitted registration text.

use ocbind_ast::{Access, CtorKind, Decl, DeclId, DeclKind, TranslationUnit, TypeRef};
use ocbind_gen::{ModuleBinder, Policy, RunContext};

fn policy() -> Policy {
    Policy::from_str(
        r#"
modules = ["gp", "Geom"]
lua_namespace = "LuaOCCT"
template_class = ["NCollection_Array1"]
immutable_type = ["Standard_Boolean", "Standard_Integer", "Standard_Real"]

[lua_operators]
"operator+" = "__add"
"operator-" = "__sub"
"operator*" = "__mul"
"operator==" = "__eq"
        "#,
    )
    .unwrap()
}

fn class(tu: &mut TranslationUnit, name: &str) -> DeclId {
    tu.add(Decl::new(DeclKind::Class, name), None)
}

fn default_ctor(tu: &mut TranslationUnit, class: DeclId) {
    let name = tu.name(class).to_string();
    tu.add(
        Decl::new(DeclKind::Constructor, name).with_ctor_kind(CtorKind::Default),
        Some(class),
    );
}

fn method(tu: &mut TranslationUnit, class: DeclId, name: &str) -> DeclId {
    tu.add(Decl::new(DeclKind::Method, name), Some(class))
}

fn param(tu: &mut TranslationUnit, callable: DeclId, name: &str, ty: TypeRef) {
    tu.add(Decl::new(DeclKind::Param, name).with_type(ty), Some(callable));
}

fn base(tu: &mut TranslationUnit, class: DeclId, target: DeclId) {
    let name = tu.name(target).to_string();
    let ty = TypeRef::named(name.clone()).with_decl(target);
    tu.add(Decl::new(DeclKind::Base, name).with_type(ty), Some(class));
}

fn generate(tu: &TranslationUnit, module: &str, ctx: &mut RunContext) -> String {
    let policy = policy();
    ModuleBinder::new(module, &policy).generate(tu, ctx).source
}

#[test]
fn simple_value_class_end_to_end() {
    let mut tu = TranslationUnit::new();
    let pnt = class(&mut tu, "gp_Pnt");
    default_ctor(&mut tu, pnt);
    let c3 = tu.add(
        Decl::new(DeclKind::Constructor, "gp_Pnt").with_ctor_kind(CtorKind::Other),
        Some(pnt),
    );
    for p in ["theX", "theY", "theZ"] {
        param(&mut tu, c3, p, TypeRef::named("Standard_Real").const_());
    }
    let x = method(&mut tu, pnt, "X");
    tu.decl_mut(x).is_const = true;
    tu.decl_mut(x).result = Some(TypeRef::named("Standard_Real"));
    let setx = method(&mut tu, pnt, "SetX");
    param(&mut tu, setx, "theX", TypeRef::named("Standard_Real").const_());

    let mut ctx = RunContext::new();
    let source = generate(&tu, "gp", &mut ctx);

    assert!(source.contains("void luaocct_init_gp(lua_State *L)"));
    assert!(source.contains(".beginNamespace(\"LuaOCCT\")\n.beginNamespace(\"gp\")"));
    assert!(source.contains(".beginClass<gp_Pnt>(\"gp_Pnt\")"));
    assert!(source.contains(
        ".addConstructor<void(),void(const Standard_Real,const Standard_Real,\
const Standard_Real)>()"
    ));
    assert!(source.contains(".addFunction(\"X\",&gp_Pnt::X)"));
    assert!(source.contains(".addFunction(\"SetX\",&gp_Pnt::SetX)"));
    assert!(source.contains(
        ".addFunction(\"Copy\",+[](const gp_Pnt &__theSelf__){ return gp_Pnt{__theSelf__}; })"
    ));
    assert!(source.contains(".endClass()"));
}

#[test]
fn each_overload_gets_wrapped() {
    let mut tu = TranslationUnit::new();
    let pnt = class(&mut tu, "gp_Pnt");
    default_ctor(&mut tu, pnt);
    for n in 1..=3 {
        let m = method(&mut tu, pnt, "SetCoord");
        for i in 0..n {
            param(
                &mut tu,
                m,
                &format!("theC{i}"),
                TypeRef::named("Standard_Real").const_(),
            );
        }
    }

    let mut ctx = RunContext::new();
    let source = generate(&tu, "gp", &mut ctx);

    let count = source.matches("luabridge::overload<").count();
    assert_eq!(count, 3);
    // All three land in one registration.
    assert_eq!(source.matches(".addFunction(\"SetCoord\",").count(), 1);
}

#[test]
fn in_out_adapter_shapes() {
    let mut tu = TranslationUnit::new();
    let curve = class(&mut tu, "Geom_Curve");
    default_ctor(&mut tu, curve);

    // void D0(double U, double *X) const -> visible return is the pointee.
    let d0 = method(&mut tu, curve, "D0");
    tu.decl_mut(d0).is_const = true;
    param(&mut tu, d0, "U", TypeRef::named("Standard_Real").const_());
    param(&mut tu, d0, "theX", TypeRef::pointer_to(TypeRef::named("Standard_Real")));

    // bool Probe(double *X) -> 2-tuple, native return first.
    let probe = method(&mut tu, curve, "Probe");
    tu.decl_mut(probe).result = Some(TypeRef::named("Standard_Boolean"));
    param(
        &mut tu,
        probe,
        "theX",
        TypeRef::pointer_to(TypeRef::named("Standard_Real")),
    );

    let mut ctx = RunContext::new();
    let source = generate(&tu, "Geom", &mut ctx);

    assert!(source.contains(
        ".addFunction(\"D0\",+[](const Geom_Curve &__theSelf__,const Standard_Real U)\
->Standard_Real { Standard_Real theX{};__theSelf__.D0(U,&theX);return theX; })"
    ));
    assert!(source.contains(
        ".addFunction(\"Probe\",+[](Geom_Curve &__theSelf__)->std::tuple<Standard_Boolean,\
Standard_Real> { Standard_Real theX{};Standard_Boolean __theRet__=__theSelf__.Probe(&theX);\
return {__theRet__,theX}; })"
    ));
}

#[test]
fn unary_and_binary_minus_split() {
    let mut tu = TranslationUnit::new();
    let vec = class(&mut tu, "gp_Vec");
    default_ctor(&mut tu, vec);
    method(&mut tu, vec, "operator-");
    let sub = method(&mut tu, vec, "operator-");
    param(
        &mut tu,
        sub,
        "theOther",
        TypeRef::lvalue_ref_to(TypeRef::named("gp_Vec").const_()),
    );

    let mut ctx = RunContext::new();
    let source = generate(&tu, "gp", &mut ctx);

    assert!(source.contains(
        ".addFunction(\"__unm\",+[](const gp_Vec &theSelf){ return -theSelf; })"
    ));
    assert!(source.contains(
        ".addFunction(\"__sub\",+[](const gp_Vec &theSelf,const gp_Vec & theOther)\
{ return theSelf-theOther; })"
    ));
}

#[test]
fn visited_classes_survive_across_modules() {
    let mut gp = TranslationUnit::new();
    let ax = class(&mut gp, "gp_Ax1");
    default_ctor(&mut gp, ax);

    let mut geom = TranslationUnit::new();
    let g = class(&mut geom, "Geom_Geometry");
    default_ctor(&mut geom, g);
    let gp_dup = class(&mut geom, "gp_Ax1");
    default_ctor(&mut geom, gp_dup);

    let mut ctx = RunContext::new();
    let first = generate(&gp, "gp", &mut ctx);
    assert!(first.contains(".beginClass<gp_Ax1>"));

    // The duplicate declaration in the Geom unit must not re-bind; it
    // belongs to module gp anyway, but the visited set is the hard gate.
    let second = generate(&geom, "gp", &mut ctx);
    assert!(!second.contains("beginClass<gp_Ax1>"));
}

#[test]
fn transient_hierarchy_gets_handle_plumbing() {
    let mut tu = TranslationUnit::new();
    let root = class(&mut tu, "Standard_Transient");
    default_ctor(&mut tu, root);
    let geometry = class(&mut tu, "Geom_Geometry");
    base(&mut tu, geometry, root);
    default_ctor(&mut tu, geometry);
    let point = class(&mut tu, "Geom_CartesianPoint");
    base(&mut tu, point, geometry);
    default_ctor(&mut tu, point);

    let mut ctx = RunContext::new();
    ctx.add_visited("Standard_Transient");
    let source = generate(&tu, "Geom", &mut ctx);

    assert!(source.contains(".deriveClass<Geom_Geometry, Standard_Transient>(\"Geom_Geometry\")"));
    assert!(source.contains(".deriveClass<Geom_CartesianPoint, Geom_Geometry>"));
    assert!(source.contains(
        ".addConstructorFrom<opencascade::handle<Geom_CartesianPoint>,void()>()"
    ));
    assert!(source.contains(
        ".addStaticFunction(\"DownCast\",+[](const Handle(Standard_Transient) &h)\
{ return Handle(Geom_CartesianPoint)::DownCast(h); })"
    ));
}

#[test]
fn template_instantiation_typedef_substitutes_parameters() {
    let mut tu = TranslationUnit::new();
    let tmpl = tu.add(
        Decl::new(DeclKind::ClassTemplate, "NCollection_Array1")
            .with_display_name("NCollection_Array1<TheItemType>")
            .with_template_params(["TheItemType"]),
        None,
    );
    let set = tu.add(Decl::new(DeclKind::Method, "SetValue"), Some(tmpl));
    param(
        &mut tu,
        set,
        "theIndex",
        TypeRef::named("Standard_Integer").const_(),
    );
    param(
        &mut tu,
        set,
        "theItem",
        TypeRef::lvalue_ref_to(TypeRef::named("TheItemType").const_()),
    );
    tu.add(
        Decl::new(DeclKind::Typedef, "gp_Array1OfXYZ").with_type(
            TypeRef::named("NCollection_Array1<gp_XYZ>")
                .with_decl(tmpl)
                .with_template_args(vec![TypeRef::named("gp_XYZ")]),
        ),
        None,
    );

    let mut ctx = RunContext::new();
    let source = generate(&tu, "gp", &mut ctx);

    assert!(source.contains(".beginClass<gp_Array1OfXYZ>(\"gp_Array1OfXYZ\")"));
    assert!(source.contains(
        ".addFunction(\"SetValue\",&gp_Array1OfXYZ::SetValue)"
    ));
    assert!(!source.contains("TheItemType"));
}

#[test]
fn private_and_overridden_members_are_invisible() {
    let mut tu = TranslationUnit::new();
    let c = class(&mut tu, "Geom_Surface");
    default_ctor(&mut tu, c);
    method(&mut tu, c, "UIso");
    let hidden = method(&mut tu, c, "Reset");
    tu.decl_mut(hidden).access = Access::Private;
    let overridden = method(&mut tu, c, "Transform");
    tu.decl_mut(overridden).is_override = true;
    method(&mut tu, c, "createNewEntity");

    let mut ctx = RunContext::new();
    let source = generate(&tu, "Geom", &mut ctx);

    assert!(source.contains(".addFunction(\"UIso\""));
    assert!(!source.contains("Reset"));
    assert!(!source.contains("Transform"));
    assert!(!source.contains("createNewEntity"));
}

#[test]
fn whole_run_is_byte_deterministic() {
    let mut tu = TranslationUnit::new();
    let e = tu.add(Decl::new(DeclKind::Enum, "Geom_Shape"), None);
    tu.add(Decl::new(DeclKind::EnumConstant, "Geom_Open"), Some(e));
    let c = class(&mut tu, "Geom_Axis");
    default_ctor(&mut tu, c);
    for name in ["Reverse", "Direction", "Angle"] {
        method(&mut tu, c, name);
    }

    let run = |tu: &TranslationUnit| {
        let mut ctx = RunContext::new();
        let policy = policy();
        let out = ModuleBinder::new("Geom", &policy).generate(tu, &mut ctx);
        (out.header, out.source, out.meta, ctx.enum_casts.clone())
    };

    assert_eq!(run(&tu), run(&tu));
}
