//! Normalization-by-evaluation optimizer for the desugared functional IR
//! (`backend-ir`).
//!
//! Ties together the evaluator (`eval`), the semantic domain (`semantics`,
//! `env`, `thunk`), the builder's smart constructors (`build`), the
//! quoter (`quote`), extern resolution (`extern_impl`), the fixed-point
//! driver (`optimize`), and the final flattening pass (`freeze`). See
//! `DESIGN.md` for how each module grounds in the teacher crate.

pub mod build;
pub mod env;
pub mod eval;
pub mod extern_impl;
pub mod freeze;
pub mod optimize;
pub mod quote;
pub mod semantics;
pub mod thunk;

pub use build::{build, should_inline_extern_app, should_inline_let};
pub use env::{Binding, EvalExtern, Env};
pub use eval::{eval, eval_accessor, eval_app, eval_branches, eval_test, eval_update};
pub use extern_impl::{eval_extern_from_impls, DirectiveTable, ExternTable, Impl};
pub use freeze::{freeze, unfreeze};
pub use optimize::{optimize, OptimizeConfig, OptimizeError};
pub use quote::{quote, Ctx};
pub use semantics::{
    BackendNeutral, BackendSemantics, ExternSpine, GroupFn, LetRecGroup, SemFn1,
};
pub use thunk::Thunk;
