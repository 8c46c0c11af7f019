//! Intermediate representation consumed by the Stela code generator.
//!
//! The front end hands over a fully type-checked [`PackageAst`]: every
//! [`Expr`] carries its resolved [`Type`](stela_types::Type) and the
//! [`PosRange`] it came from. Nothing downstream re-derives types.

mod ast;
mod name;
mod pos;
mod stack;
mod visit;

pub use ast::{
    BinaryOp, Expr, ExprKind, FunctionDef, Literal, LocalFunction, NewStmt, PackageAst, Param,
    Stmt, TestCaseBlock, TestCaseDef, TestDef, UnaryOp, WithClause,
};
pub use name::{Namespace, VersionedName};
pub use pos::{Pos, PosRange};
pub use stack::ensure_sufficient_stack;
pub use visit::{for_each_expr, for_each_test_case_expr};
