//! The algebraic IR shared by the syntax and semantic layers.
//!
//! `BackendSyntax<T>` is recursive through `T` rather than through itself:
//! the IR proper instantiates `T = Rc<BackendExpr>` (see `expr.rs`), the
//! frozen output instantiates `T = Rc<NeutralExpr>`, and neutral semantic
//! values reuse the same shape with `T = BackendSemantics` for the handful
//! of variants that can appear stuck (literals, accessors, updates, tests).

use std::rc::Rc;

use crate::ident::{Ident, Level, Qualified};
use crate::literal::{Accessor, Guard, Literal};
use crate::nonempty::NonEmptyVec;

/// One binding position: an optional source name (for diagnostics/pretty
/// printing only — binder identity is the `Level`) plus the level itself.
pub type Param = (Option<Ident>, Level);

#[derive(Clone, Debug)]
pub enum BackendSyntax<T> {
    /// A free, module-qualified reference.
    Var(Qualified<Ident>),
    /// A bound reference to a local binder at `Level`.
    Local(Option<Ident>, Level),
    Lit(Literal<T>),
    /// A saturated-or-not application; `args` is non-empty by construction.
    App(T, NonEmptyVec<T>),
    /// A (possibly multi-parameter, after builder merging) lambda.
    Abs(NonEmptyVec<Param>, T),
    Let(Option<Ident>, Level, T, T),
    /// A mutually recursive group: each member's own level plus its binding.
    LetRec(Vec<(Ident, Level, T)>, T),
    /// Monadic sequencing; syntactically similar to `Let` but never
    /// reordered or inlined by the optimizer (see `EffectBind`/`EffectPure`
    /// handling in `eval`/`quote`).
    EffectBind(Option<Ident>, Level, T, T),
    EffectPure(T),
    Accessor(T, Accessor),
    Update(T, Vec<(Rc<str>, T)>),
    /// Multi-branch conditional: ordered `(predicate, body)` arms plus an
    /// optional default taken when every predicate is falsy.
    Branch(Vec<(T, T)>, Option<T>),
    Test(T, Guard),
    /// The curried constructor function itself: `tag` plus its
    /// declaration-order field names.
    CtorDef(Rc<str>, Vec<Ident>),
    /// A fully applied constructor; field order matches `CtorDef`'s and is
    /// what `GetOffset` indexes into.
    CtorSaturated(Qualified<Ident>, Rc<str>, Vec<(Ident, T)>),
    /// A user-visible runtime failure, carried verbatim into the output.
    Fail(Rc<str>),
}

impl<T> BackendSyntax<T> {
    /// Apply `f` to every immediate child, producing the same shape over
    /// a different child representation `U`.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> BackendSyntax<U> {
        match self {
            BackendSyntax::Var(q) => BackendSyntax::Var(q),
            BackendSyntax::Local(ident, level) => BackendSyntax::Local(ident, level),
            BackendSyntax::Lit(lit) => BackendSyntax::Lit(lit.map(f)),
            BackendSyntax::App(hd, args) => BackendSyntax::App(f(hd), args.map(f)),
            BackendSyntax::Abs(params, body) => BackendSyntax::Abs(params, f(body)),
            BackendSyntax::Let(ident, level, binding, body) => {
                BackendSyntax::Let(ident, level, f(binding), f(body))
            }
            BackendSyntax::LetRec(bindings, body) => BackendSyntax::LetRec(
                bindings
                    .into_iter()
                    .map(|(ident, level, b)| (ident, level, f(b)))
                    .collect(),
                f(body),
            ),
            BackendSyntax::EffectBind(ident, level, binding, body) => {
                BackendSyntax::EffectBind(ident, level, f(binding), f(body))
            }
            BackendSyntax::EffectPure(val) => BackendSyntax::EffectPure(f(val)),
            BackendSyntax::Accessor(lhs, acc) => BackendSyntax::Accessor(f(lhs), acc),
            BackendSyntax::Update(lhs, props) => BackendSyntax::Update(
                f(lhs),
                props.into_iter().map(|(k, v)| (k, f(v))).collect(),
            ),
            BackendSyntax::Branch(branches, default) => BackendSyntax::Branch(
                branches
                    .into_iter()
                    .map(|(pred, body)| (f(pred), f(body)))
                    .collect(),
                default.map(f),
            ),
            BackendSyntax::Test(lhs, guard) => BackendSyntax::Test(f(lhs), guard),
            BackendSyntax::CtorDef(tag, fields) => BackendSyntax::CtorDef(tag, fields),
            BackendSyntax::CtorSaturated(qual, tag, fields) => BackendSyntax::CtorSaturated(
                qual,
                tag,
                fields.into_iter().map(|(k, v)| (k, f(v))).collect(),
            ),
            BackendSyntax::Fail(msg) => BackendSyntax::Fail(msg),
        }
    }
}
