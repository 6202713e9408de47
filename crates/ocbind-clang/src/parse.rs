//! Header parsing using libclang.
//!
//! Lowering runs in two passes while the translation unit is alive: the
//! first builds the declaration skeleton and a USR index, the second fills
//! in type references so they can link to declarations that appear later
//! in the header.

use ocbind_ast::{Access, CtorKind, Decl, DeclId, DeclKind, TranslationUnit, TypeKind, TypeRef};
use ocbind_gen::{AstBackend, GenError};
use rustc_hash::FxHashMap;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::ptr;

/// AST backend that parses module umbrella headers with libclang.
pub struct ClangBackend {
    index: clang_sys::CXIndex,
    inc_dirs: Vec<PathBuf>,
}

impl ClangBackend {
    pub fn new(inc_dirs: Vec<PathBuf>) -> Result<Self, GenError> {
        unsafe {
            let index = clang_sys::clang_createIndex(0, 0);
            if index.is_null() {
                return Err(GenError::Validation(
                    "Failed to create clang index".to_string(),
                ));
            }
            Ok(Self { index, inc_dirs })
        }
    }

    fn clang_args(&self) -> Vec<CString> {
        let mut args: Vec<String> = [
            "-x",
            "c++",
            "-std=c++17",
            "-D__CODE_GENERATOR__",
            "-DCSFDB",
            "-DHAVE_CONFIG_H",
            "-Wno-deprecated-declarations",
            "-ferror-limit=0",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        for dir in &self.inc_dirs {
            args.push(format!("-I{}", dir.display()));
        }
        args.into_iter()
            .filter_map(|a| CString::new(a).ok())
            .collect()
    }

    fn lower_unit(
        &self,
        module: &str,
        tu_ptr: clang_sys::CXTranslationUnit,
    ) -> Result<TranslationUnit, GenError> {
        unsafe {
            let mut errors = 0u32;
            let num_diagnostics = clang_sys::clang_getNumDiagnostics(tu_ptr);
            for i in 0..num_diagnostics {
                let diag = clang_sys::clang_getDiagnostic(tu_ptr, i);
                if clang_sys::clang_getDiagnosticSeverity(diag) >= clang_sys::CXDiagnostic_Error {
                    errors += 1;
                }
                clang_sys::clang_disposeDiagnostic(diag);
            }
            if errors > 0 {
                // OCCT headers parse with recoverable errors under a bare
                // include path; the declarations we need still come through.
                eprintln!("{module}: {errors} clang error diagnostics");
            }

            let cursor = clang_sys::clang_getTranslationUnitCursor(tu_ptr);

            let mut tu = TranslationUnit::new();
            let mut lowering = Lowering::default();
            lower_children(cursor, None, &mut lowering, &mut tu);
            lowering.resolve(&mut tu);

            Ok(tu)
        }
    }

    /// Parse in-memory source. Test scaffolding for the lowering itself.
    pub fn parse_source(
        &self,
        source: &str,
        filename: &str,
        module: &str,
    ) -> Result<TranslationUnit, GenError> {
        let c_filename =
            CString::new(filename).map_err(|_| parse_error(module, "invalid file name"))?;
        let c_source =
            CString::new(source).map_err(|_| parse_error(module, "source contains NUL"))?;

        let unsaved_file = clang_sys::CXUnsavedFile {
            Filename: c_filename.as_ptr(),
            Contents: c_source.as_ptr(),
            Length: source.len() as u64,
        };

        let args = self.clang_args();
        let c_args: Vec<*const c_char> = args.iter().map(|s| s.as_ptr()).collect();

        unsafe {
            let tu_ptr = clang_sys::clang_parseTranslationUnit(
                self.index,
                c_filename.as_ptr(),
                c_args.as_ptr(),
                c_args.len() as i32,
                &unsaved_file as *const _ as *mut _,
                1,
                clang_sys::CXTranslationUnit_None,
            );
            if tu_ptr.is_null() {
                return Err(parse_error(module, "clang could not parse the source"));
            }

            let result = self.lower_unit(module, tu_ptr);
            clang_sys::clang_disposeTranslationUnit(tu_ptr);
            result
        }
    }
}

impl AstBackend for ClangBackend {
    fn parse_module(
        &mut self,
        module: &str,
        header: &Path,
    ) -> Result<TranslationUnit, GenError> {
        let path_str = header.to_string_lossy();
        let c_path = CString::new(path_str.as_ref())
            .map_err(|_| parse_error(module, "invalid header path"))?;

        let args = self.clang_args();
        let c_args: Vec<*const c_char> = args.iter().map(|s| s.as_ptr()).collect();

        unsafe {
            let tu_ptr = clang_sys::clang_parseTranslationUnit(
                self.index,
                c_path.as_ptr(),
                c_args.as_ptr(),
                c_args.len() as i32,
                ptr::null_mut(),
                0,
                clang_sys::CXTranslationUnit_None,
            );
            if tu_ptr.is_null() {
                return Err(parse_error(
                    module,
                    format!("clang could not parse {path_str}"),
                ));
            }

            let result = self.lower_unit(module, tu_ptr);
            clang_sys::clang_disposeTranslationUnit(tu_ptr);
            result
        }
    }
}

impl Drop for ClangBackend {
    fn drop(&mut self) {
        unsafe {
            clang_sys::clang_disposeIndex(self.index);
        }
    }
}

fn parse_error(module: &str, reason: impl Into<String>) -> GenError {
    GenError::ModuleParse {
        module: module.to_string(),
        reason: reason.into(),
    }
}

/// Which type reference of a declaration gets filled in the second pass.
enum Slot {
    /// Param, field or base-specifier type.
    Type,
    /// Method/function return type.
    Result,
    /// Typedef underlying type.
    Underlying,
    /// Link a specialization back to its primary template.
    Specialization,
}

#[derive(Default)]
struct Lowering {
    /// Cursor USR -> arena id, preferring definitions over forward
    /// declarations.
    usr_map: FxHashMap<String, DeclId>,
    pending: Vec<(clang_sys::CXCursor, DeclId, Slot)>,
}

struct VisitData<'a> {
    lowering: &'a mut Lowering,
    tu: &'a mut TranslationUnit,
    parent: Option<DeclId>,
}

fn lower_children(
    cursor: clang_sys::CXCursor,
    parent: Option<DeclId>,
    lowering: &mut Lowering,
    tu: &mut TranslationUnit,
) {
    extern "C" fn visitor(
        child: clang_sys::CXCursor,
        _parent: clang_sys::CXCursor,
        data: clang_sys::CXClientData,
    ) -> clang_sys::CXChildVisitResult {
        unsafe {
            if clang_sys::clang_Cursor_isNull(child) != 0 {
                return clang_sys::CXChildVisit_Continue;
            }
            let data = &mut *(data as *mut VisitData);
            lower_cursor(child, data.parent, data.lowering, data.tu);
            clang_sys::CXChildVisit_Continue
        }
    }

    let mut data = VisitData {
        lowering,
        tu,
        parent,
    };
    unsafe {
        clang_sys::clang_visitChildren(
            cursor,
            visitor,
            &mut data as *mut VisitData as clang_sys::CXClientData,
        );
    }
}

fn lower_cursor(
    cursor: clang_sys::CXCursor,
    parent: Option<DeclId>,
    lowering: &mut Lowering,
    tu: &mut TranslationUnit,
) {
    unsafe {
        let kind = clang_sys::clang_getCursorKind(cursor);
        match kind {
            // Transparent containers: keep walking with the same parent.
            clang_sys::CXCursor_Namespace
            | clang_sys::CXCursor_UnexposedDecl
            | clang_sys::CXCursor_LinkageSpec => {
                lower_children(cursor, parent, lowering, tu);
            }

            clang_sys::CXCursor_ClassDecl
            | clang_sys::CXCursor_StructDecl
            | clang_sys::CXCursor_ClassTemplate => {
                let decl_kind = match kind {
                    clang_sys::CXCursor_ClassDecl => DeclKind::Class,
                    clang_sys::CXCursor_StructDecl => DeclKind::Struct,
                    _ => DeclKind::ClassTemplate,
                };
                let is_definition = clang_sys::clang_isCursorDefinition(cursor) != 0;
                let mut decl = Decl::new(decl_kind, cursor_spelling(cursor))
                    .with_display_name(cursor_display_name(cursor));
                if !is_definition {
                    decl = decl.forward();
                }
                if is_definition && clang_sys::clang_CXXRecord_isAbstract(cursor) != 0 {
                    decl = decl.abstract_();
                }
                if let Some(access) = member_access(cursor) {
                    decl = decl.with_access(access);
                }

                let id = tu.add(decl, parent);
                lowering.index_usr(cursor, id, is_definition);
                lowering.pending.push((cursor, id, Slot::Specialization));
                if is_definition {
                    lower_children(cursor, Some(id), lowering, tu);
                }
            }

            clang_sys::CXCursor_TemplateTypeParameter => {
                if let Some(parent) = parent {
                    let name = cursor_spelling(cursor);
                    tu.decl_mut(parent).template_params.push(name.into());
                }
            }

            clang_sys::CXCursor_EnumDecl => {
                let is_definition = clang_sys::clang_isCursorDefinition(cursor) != 0;
                let mut decl = Decl::new(DeclKind::Enum, cursor_spelling(cursor));
                if !is_definition {
                    decl = decl.forward();
                }
                if let Some(access) = member_access(cursor) {
                    decl = decl.with_access(access);
                }
                let id = tu.add(decl, parent);
                lowering.index_usr(cursor, id, is_definition);
                if is_definition {
                    lower_children(cursor, Some(id), lowering, tu);
                }
            }

            clang_sys::CXCursor_EnumConstantDecl => {
                let mut decl = Decl::new(DeclKind::EnumConstant, cursor_spelling(cursor));
                decl.value = Some(clang_sys::clang_getEnumConstantDeclValue(cursor));
                tu.add(decl, parent);
            }

            clang_sys::CXCursor_TypedefDecl | clang_sys::CXCursor_TypeAliasDecl => {
                let decl = Decl::new(DeclKind::Typedef, cursor_spelling(cursor));
                let id = tu.add(decl, parent);
                lowering.index_usr(cursor, id, true);
                lowering.pending.push((cursor, id, Slot::Underlying));
            }

            clang_sys::CXCursor_FieldDecl => {
                let mut decl = Decl::new(DeclKind::Field, cursor_spelling(cursor));
                if let Some(access) = member_access(cursor) {
                    decl = decl.with_access(access);
                }
                let id = tu.add(decl, parent);
                lowering.pending.push((cursor, id, Slot::Type));
            }

            // A VarDecl inside a record is a static data member.
            clang_sys::CXCursor_VarDecl => {
                if parent.is_some() {
                    let mut decl = Decl::new(DeclKind::Field, cursor_spelling(cursor)).static_();
                    if let Some(access) = member_access(cursor) {
                        decl = decl.with_access(access);
                    }
                    let id = tu.add(decl, parent);
                    lowering.pending.push((cursor, id, Slot::Type));
                }
            }

            clang_sys::CXCursor_CXXMethod | clang_sys::CXCursor_FunctionDecl => {
                let decl_kind = if kind == clang_sys::CXCursor_CXXMethod {
                    DeclKind::Method
                } else {
                    DeclKind::Function
                };
                let mut decl = Decl::new(decl_kind, cursor_spelling(cursor))
                    .with_display_name(cursor_display_name(cursor));
                if clang_sys::clang_CXXMethod_isStatic(cursor) != 0 {
                    decl = decl.static_();
                }
                if clang_sys::clang_CXXMethod_isConst(cursor) != 0 {
                    decl = decl.const_();
                }
                if clang_sys::clang_CXXMethod_isVirtual(cursor) != 0 {
                    decl = decl.virtual_();
                }
                if clang_sys::clang_CXXMethod_isPureVirtual(cursor) != 0 {
                    decl = decl.abstract_();
                }
                if is_override(cursor) {
                    decl = decl.override_();
                }
                if clang_sys::clang_CXXMethod_isDeleted(cursor) != 0 {
                    decl = decl.deleted();
                }
                if let Some(access) = member_access(cursor) {
                    decl = decl.with_access(access);
                }
                let id = tu.add(decl, parent);
                lowering.pending.push((cursor, id, Slot::Result));
                lower_children(cursor, Some(id), lowering, tu);
            }

            // Member function templates are lowered only far enough to be
            // rejected by the admission filter.
            clang_sys::CXCursor_FunctionTemplate => {
                if parent.is_some() {
                    let mut decl = Decl::new(DeclKind::Method, cursor_spelling(cursor));
                    decl.is_function_template = true;
                    if let Some(access) = member_access(cursor) {
                        decl = decl.with_access(access);
                    }
                    tu.add(decl, parent);
                }
            }

            clang_sys::CXCursor_Constructor => {
                let ctor_kind = if clang_sys::clang_CXXConstructor_isDefaultConstructor(cursor) != 0
                {
                    CtorKind::Default
                } else if clang_sys::clang_CXXConstructor_isCopyConstructor(cursor) != 0 {
                    CtorKind::Copy
                } else if clang_sys::clang_CXXConstructor_isMoveConstructor(cursor) != 0 {
                    CtorKind::Move
                } else {
                    CtorKind::Other
                };
                let mut decl = Decl::new(DeclKind::Constructor, cursor_spelling(cursor))
                    .with_ctor_kind(ctor_kind);
                if clang_sys::clang_CXXMethod_isDeleted(cursor) != 0 {
                    decl = decl.deleted();
                }
                if let Some(access) = member_access(cursor) {
                    decl = decl.with_access(access);
                }
                let id = tu.add(decl, parent);
                lower_children(cursor, Some(id), lowering, tu);
            }

            clang_sys::CXCursor_Destructor => {
                let mut decl = Decl::new(DeclKind::Destructor, cursor_spelling(cursor));
                if let Some(access) = member_access(cursor) {
                    decl = decl.with_access(access);
                }
                tu.add(decl, parent);
            }

            clang_sys::CXCursor_ParmDecl => {
                let decl = Decl::new(DeclKind::Param, cursor_spelling(cursor));
                let id = tu.add(decl, parent);
                lowering.pending.push((cursor, id, Slot::Type));
            }

            clang_sys::CXCursor_CXXBaseSpecifier => {
                let ty = clang_sys::clang_getCursorType(cursor);
                let name = cx_string_to_string(clang_sys::clang_getTypeSpelling(ty));
                let mut decl = Decl::new(DeclKind::Base, name);
                if let Some(access) = member_access(cursor) {
                    decl = decl.with_access(access);
                }
                let id = tu.add(decl, parent);
                lowering.pending.push((cursor, id, Slot::Type));
            }

            _ => {}
        }
    }
}

impl Lowering {
    fn index_usr(&mut self, cursor: clang_sys::CXCursor, id: DeclId, is_definition: bool) {
        let usr = cursor_usr(cursor);
        if usr.is_empty() {
            return;
        }
        if is_definition {
            self.usr_map.insert(usr, id);
        } else {
            self.usr_map.entry(usr).or_insert(id);
        }
    }

    /// Second pass: fill in type references now that every declaration has
    /// an id.
    fn resolve(&mut self, tu: &mut TranslationUnit) {
        let pending = std::mem::take(&mut self.pending);
        for (cursor, id, slot) in pending {
            unsafe {
                match slot {
                    Slot::Type => {
                        let ty = clang_sys::clang_getCursorType(cursor);
                        tu.decl_mut(id).ty = Some(self.convert_type(ty));
                    }
                    Slot::Result => {
                        let ty = clang_sys::clang_getCursorResultType(cursor);
                        tu.decl_mut(id).result = Some(self.convert_type(ty));
                    }
                    Slot::Underlying => {
                        let ty = clang_sys::clang_getTypedefDeclUnderlyingType(cursor);
                        tu.decl_mut(id).ty = Some(self.convert_type(ty));
                    }
                    Slot::Specialization => {
                        let tmpl = clang_sys::clang_getSpecializedCursorTemplate(cursor);
                        if clang_sys::clang_Cursor_isNull(tmpl) == 0 {
                            let usr = cursor_usr(tmpl);
                            tu.decl_mut(id).specialization_of =
                                self.usr_map.get(&usr).copied();
                        }
                    }
                }
            }
        }
    }

    fn convert_type(&self, ty: clang_sys::CXType) -> TypeRef {
        unsafe {
            let spelling = cx_string_to_string(clang_sys::clang_getTypeSpelling(ty));
            let is_const = clang_sys::clang_isConstQualifiedType(ty) != 0;

            match ty.kind {
                clang_sys::CXType_Void => TypeRef::void(),

                clang_sys::CXType_Pointer => {
                    let pointee = self.convert_type(clang_sys::clang_getPointeeType(ty));
                    let mut t = TypeRef::pointer_to(pointee).with_spelling(spelling);
                    t.is_const = is_const;
                    t
                }
                clang_sys::CXType_LValueReference => {
                    let pointee = self.convert_type(clang_sys::clang_getPointeeType(ty));
                    let mut t = TypeRef::lvalue_ref_to(pointee).with_spelling(spelling);
                    t.is_const = is_const;
                    t
                }
                clang_sys::CXType_RValueReference => {
                    let pointee = self.convert_type(clang_sys::clang_getPointeeType(ty));
                    let mut t = TypeRef::rvalue_ref_to(pointee).with_spelling(spelling);
                    t.is_const = is_const;
                    t
                }

                // The syntactic wrapper around `struct X` / `ns::X`.
                clang_sys::CXType_Elaborated => {
                    self.convert_type(clang_sys::clang_Type_getNamedType(ty))
                }

                _ => {
                    let kind = match ty.kind {
                        clang_sys::CXType_Record => TypeKind::Record,
                        clang_sys::CXType_Enum => TypeKind::Enum,
                        clang_sys::CXType_Typedef => TypeKind::Typedef,
                        clang_sys::CXType_Unexposed => TypeKind::Unexposed,
                        _ => TypeKind::Builtin,
                    };
                    let mut t = TypeRef::new(kind, spelling);
                    t.is_const = is_const;

                    let decl_cursor = clang_sys::clang_getTypeDeclaration(ty);
                    if clang_sys::clang_Cursor_isNull(decl_cursor) == 0
                        && clang_sys::clang_getCursorKind(decl_cursor)
                            != clang_sys::CXCursor_NoDeclFound
                    {
                        let usr = cursor_usr(decl_cursor);
                        t.decl = self.usr_map.get(&usr).copied();
                    }

                    let num_args = clang_sys::clang_Type_getNumTemplateArguments(ty);
                    if num_args > 0 {
                        for i in 0..num_args {
                            let arg =
                                clang_sys::clang_Type_getTemplateArgumentAsType(ty, i as u32);
                            if arg.kind != clang_sys::CXType_Invalid {
                                t.template_args.push(self.convert_type(arg));
                            }
                        }
                    }
                    t
                }
            }
        }
    }
}

fn is_override(cursor: clang_sys::CXCursor) -> bool {
    unsafe {
        let mut overridden: *mut clang_sys::CXCursor = ptr::null_mut();
        let mut num: u32 = 0;
        clang_sys::clang_getOverriddenCursors(cursor, &mut overridden, &mut num);
        if !overridden.is_null() {
            clang_sys::clang_disposeOverriddenCursors(overridden);
        }
        num > 0
    }
}

fn member_access(cursor: clang_sys::CXCursor) -> Option<Access> {
    unsafe {
        match clang_sys::clang_getCXXAccessSpecifier(cursor) {
            clang_sys::CX_CXXPublic => Some(Access::Public),
            clang_sys::CX_CXXProtected => Some(Access::Protected),
            clang_sys::CX_CXXPrivate => Some(Access::Private),
            // Not a class member.
            _ => None,
        }
    }
}

/// Convert a CXString to a Rust String.
fn cx_string_to_string(cx_string: clang_sys::CXString) -> String {
    unsafe {
        let c_str = clang_sys::clang_getCString(cx_string);
        let result = if c_str.is_null() {
            String::new()
        } else {
            CStr::from_ptr(c_str).to_string_lossy().into_owned()
        };
        clang_sys::clang_disposeString(cx_string);
        result
    }
}

fn cursor_spelling(cursor: clang_sys::CXCursor) -> String {
    unsafe { cx_string_to_string(clang_sys::clang_getCursorSpelling(cursor)) }
}

fn cursor_display_name(cursor: clang_sys::CXCursor) -> String {
    unsafe { cx_string_to_string(clang_sys::clang_getCursorDisplayName(cursor)) }
}

fn cursor_usr(cursor: clang_sys::CXCursor) -> String {
    unsafe { cx_string_to_string(clang_sys::clang_getCursorUSR(cursor)) }
}
