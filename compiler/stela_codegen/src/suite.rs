//! Package tests.
//!
//! A [`Test`] owns an optional [`With`] fixture and a [`TestBlock`] of
//! [`TestCase`]s; cases may nest blocks of their own. Ids come from one
//! [`TestIdGen`] per package, so they are unique across the whole tree.
//!
//! Construction order, which fixes the ids:
//! - a test takes its id, then builds its fixture, then its block;
//! - a case takes its id, then builds its nested block, then its body.

use std::fmt::{self, Write as _};
use std::io;

use stela_ir::{PosRange, TestCaseBlock, TestCaseDef, TestDef, WithClause};

use crate::body::{string_literal, Lowerer, PackageScope};
use crate::printer::CppPrinter;
use crate::CodegenError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TestId(u32);

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic id source, starting at 1.
#[derive(Debug)]
pub struct TestIdGen {
    next: u32,
}

impl TestIdGen {
    pub fn new() -> Self {
        TestIdGen { next: 1 }
    }

    pub fn next_id(&mut self) -> TestId {
        let id = TestId(self.next);
        self.next += 1;
        id
    }
}

impl Default for TestIdGen {
    fn default() -> Self {
        Self::new()
    }
}

/// Build one child per source, in order.
///
/// All or nothing: if any child fails, the children already built are
/// dropped before the error is returned.
pub fn build_children<S, T, E>(
    sources: &[S],
    mut build: impl FnMut(&S) -> Result<T, E>,
) -> Result<Vec<T>, E> {
    sources.iter().map(|source| build(source)).collect()
}

pub struct TestBlock {
    cases: Vec<TestCase>,
}

impl TestBlock {
    pub fn build(
        block: &TestCaseBlock,
        ids: &mut TestIdGen,
        scope: &PackageScope,
    ) -> Result<Self, CodegenError> {
        let cases = build_children(&block.cases, |case| TestCase::build(case, ids, scope))?;
        Ok(TestBlock { cases })
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    fn write<W: io::Write>(&self, out: &mut CppPrinter<W>) -> fmt::Result {
        for case in &self.cases {
            case.write(out)?;
        }
        Ok(())
    }

    /// `Stela::Package::TTestBlock{&TI_a, &TI_b}`.
    fn meta(&self) -> String {
        let refs: Vec<String> = self.cases.iter().map(|c| format!("&TI_{}", c.id)).collect();
        format!("Stela::Package::TTestBlock{{{}}}", refs.join(", "))
    }
}

pub struct TestCase {
    id: TestId,
    name: Option<String>,
    pos: PosRange,
    block: Option<TestBlock>,
    body: String,
}

impl TestCase {
    pub fn build(
        def: &TestCaseDef,
        ids: &mut TestIdGen,
        scope: &PackageScope,
    ) -> Result<Self, CodegenError> {
        let id = ids.next_id();
        let block = def
            .block
            .as_ref()
            .map(|block| TestBlock::build(block, ids, scope))
            .transpose()?;
        let body = Lowerer::new(scope).lower(&def.body)?;
        Ok(TestCase {
            id,
            name: def.name.clone(),
            pos: def.pos,
            block,
            body,
        })
    }

    pub fn id(&self) -> TestId {
        self.id
    }

    pub fn block(&self) -> Option<&TestBlock> {
        self.block.as_ref()
    }

    fn write<W: io::Write>(&self, out: &mut CppPrinter<W>) -> fmt::Result {
        let id = self.id;
        write_function(out, &format!("T{id}"), &[format!("return {};", self.body)])?;
        write_wrapper(out, &format!("T{id}"), &format!("RT_{id}"), &format!("TF_{id}"))?;
        if let Some(block) = &self.block {
            block.write(out)?;
        }

        let name = match &self.name {
            Some(name) => format!("Stela::Rt::TOpt<std::string>({})", string_literal(name)),
            None => "Stela::Rt::TOpt<std::string>()".to_owned(),
        };
        let empty = TestBlock { cases: Vec::new() };
        writeln!(out, "static const Stela::Package::TTestCase TI_{id} {{")?;
        {
            let mut out = out.indent();
            writeln!(out, "{name},")?;
            writeln!(out, "{},", pos_range(self.pos))?;
            writeln!(out, "&TF_{id},")?;
            writeln!(out, "{}", self.block.as_ref().unwrap_or(&empty).meta())?;
        }
        writeln!(out, "}};")?;
        writeln!(out)
    }
}

/// A test's fixture: `new` bindings registered as effects before the
/// assertions run.
pub struct With {
    effects: Vec<String>,
}

impl With {
    pub fn build(with: &WithClause, scope: &PackageScope) -> Result<Self, CodegenError> {
        let mut lowerer = Lowerer::new(scope);
        let effects = build_children(&with.news, |new| lowerer.lower_new(new))?;
        Ok(With { effects })
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

pub struct Test {
    id: TestId,
    pos: PosRange,
    with: Option<With>,
    block: TestBlock,
}

impl Test {
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn build(
        def: &TestDef,
        ids: &mut TestIdGen,
        scope: &PackageScope,
    ) -> Result<Self, CodegenError> {
        let id = ids.next_id();
        let with = def
            .with
            .as_ref()
            .map(|with| With::build(with, scope))
            .transpose()?;
        let block = TestBlock::build(&def.block, ids, scope)?;
        Ok(Test {
            id,
            pos: def.pos,
            with,
            block,
        })
    }

    pub fn id(&self) -> TestId {
        self.id
    }

    pub fn with(&self) -> Option<&With> {
        self.with.as_ref()
    }

    pub fn block(&self) -> &TestBlock {
        &self.block
    }

    /// Fixture, cases, then the `TI_<id>` record. All at file scope.
    pub(crate) fn write<W: io::Write>(&self, out: &mut CppPrinter<W>) -> fmt::Result {
        let id = self.id;
        if let Some(with) = &self.with {
            let mut lines: Vec<String> = with.effects.iter().map(|e| format!("{e};")).collect();
            lines.push("return true;".to_owned());
            write_function(out, &format!("TW_{id}"), &lines)?;
            write_wrapper(out, &format!("TW_{id}"), &format!("RW_{id}"), &format!("IW_{id}"))?;
        }
        self.block.write(out)?;

        let fixture = if self.with.is_some() {
            format!("&IW_{id}")
        } else {
            "nullptr".to_owned()
        };
        writeln!(out, "static const Stela::Package::TTest TI_{id} {{")?;
        {
            let mut out = out.indent();
            writeln!(out, "{fixture},")?;
            writeln!(out, "{},", pos_range(self.pos))?;
            writeln!(out, "{}", self.block.meta())?;
        }
        writeln!(out, "}};")?;
        writeln!(out)
    }
}

/// `static bool <name>(ctx) { <lines> }`.
fn write_function<W: io::Write>(
    out: &mut CppPrinter<W>,
    name: &str,
    lines: &[String],
) -> fmt::Result {
    writeln!(out, "static bool {name}(Stela::Package::TContext &ctx) {{")?;
    {
        let mut out = out.indent();
        for line in lines {
            writeln!(out, "{line}")?;
        }
    }
    writeln!(out, "}}")?;
    writeln!(out)
}

/// Argument-less dispatch wrapper and its metadata record.
fn write_wrapper<W: io::Write>(
    out: &mut CppPrinter<W>,
    function: &str,
    wrapper: &str,
    info: &str,
) -> fmt::Result {
    writeln!(
        out,
        "static Stela::Rt::TValue {wrapper}(Stela::Package::TContext &ctx, const Stela::Package::TArgs &args) {{"
    )?;
    {
        let mut out = out.indent();
        writeln!(out, "assert(args.empty());")?;
        writeln!(out, "return Stela::Rt::ToValue(ctx, {function}(ctx));")?;
    }
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "static const Stela::Package::TFuncInfo {info} {{")?;
    {
        let mut out = out.indent();
        writeln!(out, "Stela::Package::TParamMap{{}},")?;
        writeln!(out, "/* ret */ Stela::Type::TBool::Get(),")?;
        writeln!(out, "{wrapper}")?;
    }
    writeln!(out, "}};")?;
    writeln!(out)
}

fn pos_range(range: PosRange) -> String {
    format!(
        "Stela::TPosRange(Stela::TPos({}, {}), Stela::TPos({}, {}))",
        range.start.line, range.start.column, range.limit.line, range.limit.column
    )
}

#[cfg(test)]
mod tests;
