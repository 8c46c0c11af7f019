//! The built package and its artifacts.
//!
//! [`Package::build`] does all the work that can fail on source problems:
//! collection, identity assignment, export and test construction.
//! [`Package::emit`] only writes text and can fail only on I/O.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write as _};
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use stela_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode};
use stela_ir::{Namespace, PackageAst, VersionedName};
use stela_types::{collect_objects, ObjType};
use uuid::Uuid;

use crate::address::{cpp_index_name, AddressMap, IdentitySource};
use crate::body::{string_literal, PackageScope};
use crate::collect::Collected;
use crate::export::Export;
use crate::native::{cpp_namespace, cpp_type, member, object_name};
use crate::printer::CppPrinter;
use crate::suite::{build_children, Test, TestIdGen};
use crate::type_gen::type_descriptor;
use crate::{CodegenError, API_VERSION};

/// Paths of everything [`Package::emit`] wrote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifacts {
    pub header: PathBuf,
    pub implementation: PathBuf,
    pub link: PathBuf,
    pub signatures: PathBuf,
    pub objects: Vec<PathBuf>,
}

/// One address table row: identity and the descriptors of both sides.
struct LinkEntry {
    id: Uuid,
    from: String,
    to: String,
}

pub struct Package {
    namespace: Namespace,
    version: u64,
    imports: Vec<Namespace>,
    objects: BTreeSet<ObjType>,
    comparisons: BTreeSet<ObjType>,
    scope: PackageScope,
    links: Vec<LinkEntry>,
    exports: BTreeMap<String, Export>,
    tests: Vec<Test>,
}

impl Package {
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(package = %ast.namespace, version = ast.version)
    )]
    pub fn build(
        ast: &PackageAst,
        ids: &mut dyn IdentitySource,
        queue: &mut DiagnosticQueue,
    ) -> Result<Self, CodegenError> {
        if ast.namespace.is_empty() {
            return Err(CodegenError::invariant("package has an empty namespace"));
        }

        let collected = Collected::from_package(ast);

        let mut reported = None;
        for (pair, pos) in &collected.addresses {
            if !pair.is_sequence() && (pair.from.has_opaque_part() || pair.to.has_opaque_part()) {
                reported = Some(
                    queue.emit_error(
                        Diagnostic::error(ErrorCode::E5002)
                            .with_message(format!(
                                "address `{}` -> `{}` cannot be indexed",
                                pair.from, pair.to
                            ))
                            .with_label(*pos, "address used here")
                            .with_note("error and function types have no runtime type descriptor"),
                    ),
                );
            }
        }
        if let Some(guar) = reported {
            return Err(CodegenError::Reported(guar));
        }

        let addresses = AddressMap::assign(collected.addresses.keys(), ids)?;
        let mut links = Vec::with_capacity(addresses.len());
        for (id, pair) in addresses.iter() {
            links.push(LinkEntry {
                id,
                from: descriptor(&pair.from)?,
                to: descriptor(&pair.to)?,
            });
        }

        let scope = PackageScope {
            qualified: cpp_namespace(&ast.namespace),
            exports: ast.functions.iter().map(|f| f.name.clone()).collect(),
            addresses,
        };

        let mut exports = BTreeMap::new();
        let mut reported = None;
        for func in &ast.functions {
            match Export::build(func, &scope, queue) {
                Ok(export) => {
                    exports.insert(func.name.clone(), export);
                }
                Err(CodegenError::Reported(guar)) => reported = Some(guar),
                Err(err) => return Err(err),
            }
        }
        if let Some(guar) = reported {
            return Err(CodegenError::Reported(guar));
        }

        let mut test_ids = TestIdGen::new();
        let tests = build_children(&ast.tests, |test| Test::build(test, &mut test_ids, &scope))?;

        tracing::debug!(
            exports = exports.len(),
            tests = tests.len(),
            identities = scope.addresses.len(),
            "built package"
        );

        Ok(Package {
            namespace: ast.namespace.clone(),
            version: ast.version,
            imports: ast.imports.clone(),
            objects: collected.objects,
            comparisons: collected.comparisons,
            scope,
            links,
            exports,
            tests,
        })
    }

    pub fn versioned_name(&self) -> VersionedName {
        VersionedName::new(self.namespace.clone(), self.version)
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Exports in name order.
    pub fn exports(&self) -> impl Iterator<Item = &Export> {
        self.exports.values()
    }

    pub fn tests(&self) -> &[Test] {
        &self.tests
    }

    pub fn addresses(&self) -> &AddressMap {
        &self.scope.addresses
    }

    pub fn objects(&self) -> &BTreeSet<ObjType> {
        &self.objects
    }

    /// Directory the package's artifacts go in, under `out_dir`.
    pub fn artifact_dir(&self, out_dir: &Path) -> PathBuf {
        self.namespace
            .dirs()
            .iter()
            .fold(out_dir.to_path_buf(), |dir, seg| dir.join(seg))
    }

    /// Write every artifact under `out_dir`, creating directories as needed.
    #[tracing::instrument(level = "debug", skip_all, fields(package = %self.namespace))]
    pub fn emit(&self, out_dir: &Path) -> Result<Artifacts, CodegenError> {
        let dir = self.artifact_dir(out_dir);
        fs::create_dir_all(&dir).map_err(|err| CodegenError::io(&dir, err))?;
        let name = self.name();

        let header = dir.join(format!("{name}.h"));
        write_file(&header, |out| self.write_header(out))?;
        let implementation = dir.join(format!("{name}.cc"));
        write_file(&implementation, |out| self.write_implementation(out))?;
        let link = dir.join(format!("{name}.link.cc"));
        write_file(&link, |out| self.write_link(out))?;
        let signatures = dir.join(format!("{name}.stela.sig"));
        write_file(&signatures, |out| self.write_signatures(out))?;

        let mut objects = Vec::with_capacity(self.objects.len());
        if !self.objects.is_empty() {
            let objects_dir = out_dir.join("objects");
            fs::create_dir_all(&objects_dir).map_err(|err| CodegenError::io(&objects_dir, err))?;
            for obj in &self.objects {
                let path = objects_dir.join(format!("{}.h", object_name(obj)));
                write_file(&path, |out| write_object_header(out, obj))?;
                objects.push(path);
            }
        }

        tracing::debug!(dir = %dir.display(), objects = objects.len(), "wrote artifacts");
        Ok(Artifacts {
            header,
            implementation,
            link,
            signatures,
            objects,
        })
    }

    fn name(&self) -> &str {
        self.namespace.name().unwrap_or_default()
    }

    /// The shared module the toolchain builds: `<dir>/<name>.<version>.so`.
    pub fn module_path(&self, out_dir: &Path) -> PathBuf {
        self.artifact_dir(out_dir)
            .join(format!("{}.{}.so", self.name(), self.version))
    }

    /// Quoted include path of a package header, relative to the output root.
    fn include_of(ns: &Namespace) -> String {
        format!("#include \"{ns}.h\"")
    }

    fn write_object_includes<W: io::Write>(&self, out: &mut CppPrinter<W>) -> fmt::Result {
        if self.objects.is_empty() {
            return Ok(());
        }
        writeln!(out)?;
        for obj in &self.objects {
            writeln!(out, "#include \"objects/{}.h\"", object_name(obj))?;
        }
        Ok(())
    }

    fn write_header<W: io::Write>(&self, out: &mut CppPrinter<W>) -> fmt::Result {
        write_banner(out, &format!("{}.stela", self.namespace))?;
        writeln!(out, "#pragma once")?;
        writeln!(out)?;
        for include in ["cstdint", "functional", "string", "vector"] {
            writeln!(out, "#include <{include}>")?;
        }
        writeln!(out)?;
        writeln!(out, "#include <stela/package/api.h>")?;
        writeln!(out, "#include <stela/package/rt.h>")?;
        writeln!(out, "#include <stela/rt.h>")?;
        self.write_object_includes(out)?;
        writeln!(out)?;

        let mut ns = out.namespace(self.namespace.segments(), "NS");
        writeln!(ns, "extern const Stela::Package::TInfo PackageInfo;")?;
        if !self.links.is_empty() {
            writeln!(ns)?;
            for link in &self.links {
                writeln!(ns, "extern Stela::Rt::TUuid {};", cpp_index_name(link.id))?;
            }
        }
        if !self.exports.is_empty() {
            writeln!(ns)?;
            for export in self.exports.values() {
                export.write_decl(&mut ns)?;
            }
        }
        Ok(())
    }

    fn write_implementation<W: io::Write>(&self, out: &mut CppPrinter<W>) -> fmt::Result {
        write_banner(out, &format!("{}.stela", self.namespace))?;
        for include in ["cassert", "cmath", "limits", "string", "unordered_map", "unordered_set", "vector"] {
            writeln!(out, "#include <{include}>")?;
        }
        writeln!(out)?;
        writeln!(out, "{}", Self::include_of(&self.namespace))?;
        for import in &self.imports {
            writeln!(out, "{}", Self::include_of(import))?;
        }
        writeln!(out)?;

        if !self.comparisons.is_empty() {
            self.write_comparisons(out)?;
        }

        for test in &self.tests {
            test.write(out)?;
        }
        for export in self.exports.values() {
            export.write_dispatch(out, &self.scope.qualified)?;
        }

        let mut ns = out.namespace(self.namespace.segments(), "NS");
        for link in &self.links {
            writeln!(
                ns,
                "Stela::Rt::TUuid {}(\"{}\");",
                cpp_index_name(link.id),
                link.id.hyphenated()
            )?;
        }
        if !self.links.is_empty() {
            writeln!(ns)?;
        }

        writeln!(ns, "const Stela::Package::TInfo PackageInfo {{")?;
        {
            let mut ns = ns.indent();
            writeln!(ns, "{},", string_literal(&self.namespace.to_string()))?;
            writeln!(ns, "{},", self.version)?;
            let exports: Vec<String> = self
                .exports
                .values()
                .filter(|e| e.is_dispatchable())
                .map(|e| format!("{{{}, &IF_{}}}", string_literal(e.name()), e.name()))
                .collect();
            write_braced(
                &mut ns,
                "/* exports */ std::unordered_map<std::string, const Stela::Package::TFuncInfo *>",
                &exports,
                ",",
            )?;
            let tests: Vec<String> = self.tests.iter().map(|t| format!("&TI_{}", t.id())).collect();
            write_braced(
                &mut ns,
                "/* tests */ std::vector<const Stela::Package::TTest *>",
                &tests,
                ",",
            )?;
            let indices: Vec<String> = self
                .links
                .iter()
                .map(|link| format!("&{}", cpp_index_name(link.id)))
                .collect();
            write_braced(
                &mut ns,
                "/* index ids */ std::unordered_set<Stela::Rt::TUuid *>",
                &indices,
                "",
            )?;
        }
        writeln!(ns, "}};")?;

        if !self.exports.is_empty() {
            writeln!(ns)?;
            for export in self.exports.values() {
                export.write_def(&mut ns)?;
            }
        }
        Ok(())
    }

    /// `operator==`/`operator!=` for every compared object, declarations
    /// first so fields of object type can use each other's.
    fn write_comparisons<W: io::Write>(&self, out: &mut CppPrinter<W>) -> fmt::Result {
        let mut ns = out.namespace(&["Stela", "Rt", "Objects"], "");
        for obj in &self.comparisons {
            let name = object_name(obj);
            writeln!(ns, "static bool operator==(const {name} &lhs, const {name} &rhs);")?;
            writeln!(ns, "static bool operator!=(const {name} &lhs, const {name} &rhs);")?;
        }
        writeln!(ns)?;
        for obj in &self.comparisons {
            let name = object_name(obj);
            let fields: Vec<String> = obj
                .fields()
                .map(|(field, _)| {
                    let field = member(field);
                    format!("lhs.{field} == rhs.{field}")
                })
                .collect();
            let test = if fields.is_empty() {
                "true".to_owned()
            } else {
                fields.join(" && ")
            };
            writeln!(ns, "static bool operator==(const {name} &lhs, const {name} &rhs) {{")?;
            writeln!(ns.indent(), "return {test};")?;
            writeln!(ns, "}}")?;
            writeln!(ns)?;
            writeln!(ns, "static bool operator!=(const {name} &lhs, const {name} &rhs) {{")?;
            writeln!(ns.indent(), "return !(lhs == rhs);")?;
            writeln!(ns, "}}")?;
            writeln!(ns)?;
        }
        Ok(())
    }

    fn write_link<W: io::Write>(&self, out: &mut CppPrinter<W>) -> fmt::Result {
        write_banner(out, &format!("{}.stela", self.namespace))?;
        for include in ["cstdint", "string", "unordered_map", "utility"] {
            writeln!(out, "#include <{include}>")?;
        }
        writeln!(out)?;
        writeln!(out, "#include <stela/package/link.h>")?;
        writeln!(out, "#include <stela/rt.h>")?;
        writeln!(out, "#include <stela/type/impl.h>")?;
        writeln!(out)?;
        writeln!(out, "{}", Self::include_of(&self.namespace))?;
        for import in &self.imports {
            writeln!(out, "{}", Self::include_of(import))?;
        }
        writeln!(out)?;

        writeln!(out, "static Stela::Package::TLinkInfo LinkInfo {{")?;
        {
            let mut out = out.indent();
            writeln!(out, "{},", string_literal(&self.namespace.to_string()))?;
            writeln!(out, "{},", self.version)?;
            writeln!(out, "&{}::PackageInfo,", self.scope.qualified)?;
            let imports: Vec<String> = self
                .imports
                .iter()
                .map(|ns| {
                    format!(
                        "{{{}, &{}::PackageInfo}}",
                        string_literal(&ns.to_string()),
                        cpp_namespace(ns)
                    )
                })
                .collect();
            write_braced(
                &mut out,
                "std::unordered_map<std::string, const Stela::Package::TInfo *>",
                &imports,
                ",",
            )?;
            let links: Vec<String> = self
                .links
                .iter()
                .map(|link| {
                    format!(
                        "{{Stela::Rt::TUuid(\"{}\"), std::make_pair({}, {})}}",
                        link.id.hyphenated(),
                        link.from,
                        link.to
                    )
                })
                .collect();
            write_braced(
                &mut out,
                "std::unordered_map<Stela::Rt::TUuid, std::pair<Stela::Type::TType, Stela::Type::TType>>",
                &links,
                "",
            )?;
        }
        writeln!(out, "}};")?;
        writeln!(out)?;

        writeln!(out, "extern \"C\" Stela::Package::TLinkInfo *GetLinkInfo() {{")?;
        writeln!(out.indent(), "return &LinkInfo;")?;
        writeln!(out, "}}")?;
        writeln!(out)?;
        writeln!(out, "extern \"C\" int32_t GetApiVersion() {{")?;
        writeln!(out.indent(), "return {API_VERSION};")?;
        writeln!(out, "}}")
    }

    fn write_signatures<W: io::Write>(&self, out: &mut CppPrinter<W>) -> fmt::Result {
        for export in self.exports.values() {
            writeln!(out, "{} is {};", export.name(), export.signature())?;
        }
        Ok(())
    }
}

fn write_object_header<W: io::Write>(out: &mut CppPrinter<W>, obj: &ObjType) -> fmt::Result {
    let name = object_name(obj);
    write_banner(out, &format!("objects/{name}.h"))?;
    writeln!(out, "#pragma once")?;
    writeln!(out)?;
    writeln!(out, "#include <cstdint>")?;
    writeln!(out, "#include <functional>")?;
    writeln!(out, "#include <string>")?;
    writeln!(out, "#include <vector>")?;
    writeln!(out)?;
    writeln!(out, "#include <stela/rt.h>")?;

    let mut nested = BTreeSet::new();
    for (_, ty) in obj.fields() {
        collect_objects(ty, &mut nested);
    }
    nested.remove(obj);
    if !nested.is_empty() {
        writeln!(out)?;
        for inner in &nested {
            writeln!(out, "#include \"objects/{}.h\"", object_name(inner))?;
        }
    }
    writeln!(out)?;

    let mut ns = out.namespace(&["Stela", "Rt", "Objects"], "");
    writeln!(ns, "struct {name} {{")?;
    {
        let mut ns = ns.indent();
        for (field, ty) in obj.fields() {
            writeln!(ns, "{} {};", cpp_type(ty), member(field))?;
        }
    }
    writeln!(ns, "}};")
}

fn write_banner<W: io::Write>(out: &mut CppPrinter<W>, source: &str) -> fmt::Result {
    writeln!(out, "/* {source}")?;
    writeln!(out)?;
    writeln!(out, "   This file was generated by the Stela compiler. */")?;
    writeln!(out)
}

/// `<head>{}` when empty, else one item per line.
fn write_braced<W: io::Write>(
    out: &mut CppPrinter<W>,
    head: &str,
    items: &[String],
    trailing: &str,
) -> fmt::Result {
    if items.is_empty() {
        return writeln!(out, "{head}{{}}{trailing}");
    }
    writeln!(out, "{head}{{")?;
    {
        let mut out = out.indent();
        for item in items {
            writeln!(out, "{item},")?;
        }
    }
    writeln!(out, "}}{trailing}")
}

fn descriptor(ty: &stela_types::Type) -> Result<String, CodegenError> {
    type_descriptor(ty).map_err(|err| CodegenError::invariant(err.to_string()))
}

/// Create `path`, write it through a printer, and flush.
fn write_file(
    path: &Path,
    write: impl FnOnce(&mut CppPrinter<BufWriter<File>>) -> fmt::Result,
) -> Result<(), CodegenError> {
    let file = File::create(path).map_err(|err| CodegenError::io(path, err))?;
    let mut out = CppPrinter::new(BufWriter::new(file));
    let written = write(&mut out);
    out.finish().map_err(|err| CodegenError::io(path, err))?;
    written.map_err(|_| CodegenError::invariant(format!("formatting `{}` failed", path.display())))
}

#[cfg(test)]
mod tests;
