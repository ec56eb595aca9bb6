//! Algebraic IR, analysis, and identifier data model for the backend
//! optimizer (`backend-optimizer`).
//!
//! This crate holds everything the evaluator/builder/quoter agree on but
//! that doesn't itself require an evaluation strategy: identifiers and
//! interning, literals/accessors/guards, the `BackendSyntax` algebra, the
//! usage/size analysis, and the directive-interface types. The semantic
//! domain and the passes that move between it and the IR live in
//! `backend-optimizer`.

pub mod analysis;
pub mod directive;
pub mod expr;
pub mod ident;
pub mod interner;
pub mod literal;
pub mod nonempty;
pub mod syntax;

pub use analysis::{ArgumentShape, BackendAnalysis, Complexity, Usage};
pub use directive::{EvalRef, InlineDirective};
pub use expr::{analyze, BackendExpr, LetBinding, NeutralExpr, Rewrite};
pub use ident::{Ident, Level, ModuleName, Qualified};
pub use interner::{Interner, Symbol};
pub use literal::{Accessor, Guard, Literal};
pub use nonempty::NonEmptyVec;
pub use syntax::{BackendSyntax, Param};
