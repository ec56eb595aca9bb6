//! `BackendExpr`: syntax nodes decorated with analysis, plus the transient
//! `Rewrite` forms the builder introduces during reification.

use std::rc::Rc;

use crate::analysis::{ArgumentShape, BackendAnalysis, Complexity};
use crate::ident::{Ident, Level};
use crate::literal::Literal;
use crate::syntax::BackendSyntax;

/// An IR term: either a plain syntax node or a transient rewrite.
///
/// Invariant: the `BackendAnalysis` stored in a node always equals the
/// analysis that `analyze` would compute from its *current* children — it
/// is computed once, at construction time (see `backend-optimizer`'s
/// `build`), and never mutated afterward.
#[derive(Clone, Debug)]
pub enum BackendExpr {
    Syntax(BackendAnalysis, BackendSyntax<Rc<BackendExpr>>),
    Rewrite(BackendAnalysis, Rewrite<Rc<BackendExpr>>),
}

/// Transient rewrite forms. These never reach `freeze`'s output; the
/// fixed-point driver re-evaluates whenever one is created (see
/// `BackendAnalysis::rewrite`) and `freeze` flattens them back into plain
/// `Let` chains.
#[derive(Clone, Debug)]
pub enum Rewrite<T> {
    /// A `Let` whose binding was judged cheap/single-use enough to expand
    /// at its call site; `binding`/`body` are simulated as already-merged
    /// for cost-accounting purposes (see `BackendAnalysis::scale`).
    Inline(Option<Ident>, Level, T, T),
    /// A flattened chain of nested `Let`s, innermost-first in `bindings`.
    LetAssoc(Vec<LetBinding<T>>, T),
}

#[derive(Clone, Debug)]
pub struct LetBinding<T> {
    pub ident: Option<Ident>,
    pub level: Level,
    pub binding: T,
}

impl BackendExpr {
    pub fn analysis(&self) -> &BackendAnalysis {
        match self {
            BackendExpr::Syntax(a, _) => a,
            BackendExpr::Rewrite(a, _) => a,
        }
    }

    pub fn is_rewrite_pending(&self) -> bool {
        self.analysis().rewrite
    }
}

/// The frozen output of `freeze`: a `BackendSyntax` tree with no `Rewrite`
/// nodes left, ready for the (out-of-scope) code generator. Unlike
/// `BackendExpr`, intermediate nodes carry no analysis — only the
/// top-level binding's analysis survives freezing, returned alongside the
/// `NeutralExpr` by the freeze entry point.
#[derive(Clone, Debug)]
pub struct NeutralExpr(pub BackendSyntax<Rc<NeutralExpr>>);

/// Compute the bottom-up analysis for a syntax node from its already
/// analyzed children. This is the one place complexity/size contributions
/// are assigned; every node that `build` (in `backend-optimizer`)
/// constructs funnels through here.
pub fn analyze(syntax: &BackendSyntax<Rc<BackendExpr>>) -> BackendAnalysis {
    use BackendSyntax::*;
    match syntax {
        Var(_) => BackendAnalysis::leaf(Complexity::Deref),
        Local(_, level) => BackendAnalysis::var_use(*level),
        Lit(lit) => analyze_literal(lit),
        App(hd, args) => {
            let mut a = hd.analysis().clone();
            for arg in args.iter() {
                a = a.combine(arg.analysis());
            }
            bump(a, Complexity::NonTrivial)
        }
        Abs(params, body) => {
            // Every level still free after this closure's own params are
            // removed is captured: the body doesn't run until the
            // closure is called, and it may be called any number of
            // times, so a single textual reference here isn't "evaluated
            // once" the way a single reference in a straight-line `Let`
            // body is.
            let mut a = body.analysis().clone().mark_captured();
            for (_, level) in params.iter() {
                a = a.bound(*level);
            }
            // `args` records this lambda's own declared arity, not
            // whatever shape hints happened to bubble up from the body —
            // a nested `Abs` further down describes its own binding, not
            // this one's call sites (see `shouldInlineExternApp`, which
            // only reads `a.args.len()`).
            a.args = vec![ArgumentShape::Unknown; params.len()];
            bump(a, Complexity::NonTrivial)
        }
        Let(_, level, binding, body) => {
            let body_bound = body.analysis().clone().bound(*level);
            let a = binding.analysis().combine(&body_bound);
            bump(a, Complexity::Trivial)
        }
        LetRec(bindings, body) => {
            let mut a = body.analysis().clone();
            // Each member's own RHS, like an `Abs` body, runs under a
            // binding that may be invoked repeatedly (directly via
            // recursion, or indirectly via any other member) — so its
            // free usages are captured too, not just the usages inside
            // whatever `Abs` the RHS itself happens to be.
            for (_, _, binding) in bindings {
                a = a.combine(&binding.analysis().clone().mark_captured());
            }
            for (_, level, _) in bindings {
                a = a.bound(*level);
            }
            bump(a, Complexity::NonTrivial)
        }
        EffectBind(_, level, binding, body) => {
            let a = binding
                .analysis()
                .combine(&body.analysis().clone().bound(*level));
            bump(a, Complexity::NonTrivial)
        }
        EffectPure(val) => bump(val.analysis().clone(), val.analysis().complexity),
        Accessor(lhs, _) => bump(lhs.analysis().clone(), Complexity::Deref),
        Update(lhs, props) => {
            let mut a = lhs.analysis().clone();
            for (_, v) in props {
                a = a.combine(v.analysis());
            }
            bump(a, Complexity::NonTrivial)
        }
        Branch(branches, default) => {
            let mut a = BackendAnalysis::default();
            for (pred, body) in branches {
                a = a.combine(pred.analysis()).combine(body.analysis());
            }
            if let Some(def) = default {
                a = a.combine(def.analysis());
            }
            bump(a, Complexity::NonTrivial)
        }
        Test(lhs, _) => bump(lhs.analysis().clone(), Complexity::Deref),
        CtorDef(_, _) => BackendAnalysis::leaf(Complexity::Trivial),
        CtorSaturated(_, _, fields) => {
            let mut a = BackendAnalysis::default();
            for (_, v) in fields {
                a = a.combine(v.analysis());
            }
            bump(a, Complexity::KnownSize)
        }
        Fail(_) => BackendAnalysis::leaf(Complexity::NonTrivial),
    }
}

fn analyze_literal(lit: &Literal<Rc<BackendExpr>>) -> BackendAnalysis {
    match lit {
        Literal::Int(_) | Literal::Float(_) | Literal::Str(_) | Literal::Char(_)
        | Literal::Bool(_) => BackendAnalysis::leaf(Complexity::Trivial),
        Literal::Array(items) => {
            let mut a = BackendAnalysis::default();
            for item in items {
                a = a.combine(item.analysis());
            }
            bump(a, Complexity::KnownSize)
        }
        Literal::Record(props) => {
            let mut a = BackendAnalysis::default();
            for (_, v) in props {
                a = a.combine(v.analysis());
            }
            bump(a, Complexity::KnownSize)
        }
    }
}

fn bump(mut a: BackendAnalysis, floor: Complexity) -> BackendAnalysis {
    a.size += 1;
    a.complexity = a.complexity.max(floor);
    a
}
