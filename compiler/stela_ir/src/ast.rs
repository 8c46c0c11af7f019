//! Type-checked package syntax tree.
//!
//! Owned, boxed tree: packages are small and built once per compile, and
//! the code generator walks each body a handful of times at most.

use stela_types::{AddrDir, Type};

use crate::{Namespace, PosRange};

/// A whole package as produced by the front end.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PackageAst {
    /// Filled in from the source path by the front end, not read from the tree.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing))]
    pub namespace: Namespace,
    pub version: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub imports: Vec<Namespace>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub functions: Vec<FunctionDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub tests: Vec<TestDef>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Param {
            name: name.into(),
            ty,
        }
    }
}

/// A top-level function. Every one is exported.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionDef {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub params: Vec<Param>,
    pub ret: Type,
    pub body: Expr,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pos: PosRange,
}

impl FunctionDef {
    /// The function's signature as a `Func` type.
    pub fn ty(&self) -> Type {
        Type::func(self.params.iter().map(|p| p.ty.clone()).collect(), self.ret.clone())
    }
}

/// A function bound by a `where` clause, visible in the body it qualifies.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalFunction {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub params: Vec<Param>,
    pub ret: Type,
    pub body: Expr,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pos: PosRange,
}

impl LocalFunction {
    pub fn ty(&self) -> Type {
        Type::func(self.params.iter().map(|p| p.ty.clone()).collect(), self.ret.clone())
    }
}

/// `test { ... } with { ... }`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TestDef {
    #[cfg_attr(feature = "serde", serde(default))]
    pub with: Option<WithClause>,
    pub block: TestCaseBlock,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pos: PosRange,
}

/// Fixture evaluated before a test's assertions.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WithClause {
    pub news: Vec<NewStmt>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pos: PosRange,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TestCaseBlock {
    pub cases: Vec<TestCaseDef>,
}

/// One assertion, optionally named, optionally with nested cases.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TestCaseDef {
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    pub body: Expr,
    #[cfg_attr(feature = "serde", serde(default))]
    pub block: Option<TestCaseBlock>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pos: PosRange,
}

/// `new <addr> <- <value>`: store a value at a database address.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewStmt {
    pub lhs: Expr,
    pub rhs: Expr,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pos: PosRange,
}

/// Statement inside an `effecting` block.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stmt {
    New(NewStmt),
    /// `delete <addr>::(<value type>)`.
    Delete {
        addr: Expr,
        value: Type,
        #[cfg_attr(feature = "serde", serde(default))]
        pos: PosRange,
    },
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    /// UUID literal, canonical hyphenated text.
    Id(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

/// An expression with its checked type.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pos: PosRange,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: Type) -> Self {
        Expr {
            kind,
            ty,
            pos: PosRange::default(),
        }
    }

    #[must_use]
    pub fn at(mut self, pos: PosRange) -> Self {
        self.pos = pos;
        self
    }

    pub fn int(value: i64) -> Self {
        Expr::new(ExprKind::Lit(Literal::Int(value)), Type::Int)
    }

    pub fn bool(value: bool) -> Self {
        Expr::new(ExprKind::Lit(Literal::Bool(value)), Type::Bool)
    }

    pub fn str(value: impl Into<String>) -> Self {
        Expr::new(ExprKind::Lit(Literal::Str(value.into())), Type::Str)
    }

    pub fn reference(name: impl Into<String>, ty: Type) -> Self {
        Expr::new(ExprKind::Ref(name.into()), ty)
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExprKind {
    Lit(Literal),
    /// A parameter or a local function in scope.
    Ref(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Call of a local function, a package export, or (with `package`) an
    /// export of an imported package.
    Call {
        #[cfg_attr(feature = "serde", serde(default))]
        package: Option<Namespace>,
        callee: String,
        #[cfg_attr(feature = "serde", serde(default))]
        args: Vec<Expr>,
    },
    List(Vec<Expr>),
    Set(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Obj(Vec<(String, Expr)>),
    Member {
        object: Box<Expr>,
        field: String,
    },
    Addr(Vec<(AddrDir, Expr)>),
    Known(Box<Expr>),
    /// The empty optional; the element type is in the expression's `Opt` type.
    Unknown,
    /// `*<addr>::(<value>)`: a database read. When `addr` is a sequence of
    /// addresses, reads each one and yields a sequence.
    Read {
        addr: Box<Expr>,
        value: Type,
    },
    /// Materialize a sequence into a list.
    Collect(Box<Expr>),
    Where {
        body: Box<Expr>,
        functions: Vec<LocalFunction>,
    },
    Effecting {
        stmts: Vec<Stmt>,
        result: Box<Expr>,
    },
}
