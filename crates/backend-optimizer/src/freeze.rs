//! Freeze (§4.7) and its inverse.
//!
//! `freeze` is the final pass handed to the (out-of-scope) code
//! generator: it flattens the transient `Rewrite` forms a fixed-point
//! pass may have left behind into a plain `NeutralExpr` tree, discarding
//! every intermediate node's analysis (only the top-level binding's
//! analysis survives, returned alongside).
//!
//! `unfreeze` is the adapter the other direction: `extern_impl` needs a
//! just-as-analyzed `Rc<BackendExpr>` to evaluate an imported module's
//! already-frozen output, so it re-attaches analysis by running the
//! `NeutralExpr` tree back through [`build`] bottom-up. This re-derives
//! exactly the analysis `freeze` threw away and, as a side effect, lets
//! the builder's rewrites (trivial-let inlining, app/abs merging) fire
//! again on an imported definition the moment it's spliced into a new
//! module — which is the entire point of the extern-lookup callback
//! supplying real definitions rather than opaque neutrals.

use std::rc::Rc;

use backend_ir::{BackendAnalysis, BackendExpr, BackendSyntax, LetBinding, NeutralExpr, Rewrite};

use crate::build::build;

/// Flattens `expr` into a `Rewrite`-free `NeutralExpr`, returning it
/// alongside the original top-level analysis (unchanged, per §4.7).
pub fn freeze(expr: &Rc<BackendExpr>) -> (Rc<NeutralExpr>, BackendAnalysis) {
    (freeze_expr(expr), expr.analysis().clone())
}

fn freeze_expr(expr: &Rc<BackendExpr>) -> Rc<NeutralExpr> {
    match expr.as_ref() {
        BackendExpr::Syntax(_, syntax) => {
            Rc::new(NeutralExpr(syntax.clone().map(|child| freeze_expr(&child))))
        }
        BackendExpr::Rewrite(_, Rewrite::Inline(ident, level, binding, body)) => {
            let syntax = BackendSyntax::Let(*ident, *level, freeze_expr(binding), freeze_expr(body));
            Rc::new(NeutralExpr(syntax))
        }
        BackendExpr::Rewrite(_, Rewrite::LetAssoc(bindings, body)) => {
            freeze_let_assoc(bindings, body)
        }
    }
}

/// Right-folds a flattened let-chain back into nested `Let`s, innermost
/// binding (`bindings[0]`) on the outside — the literal shape from §8
/// scenario C.
fn freeze_let_assoc(bindings: &[LetBinding<Rc<BackendExpr>>], body: &Rc<BackendExpr>) -> Rc<NeutralExpr> {
    match bindings.split_first() {
        None => freeze_expr(body),
        Some((b, rest)) => {
            let inner = freeze_let_assoc(rest, body);
            Rc::new(NeutralExpr(BackendSyntax::Let(
                b.ident,
                b.level,
                freeze_expr(&b.binding),
                inner,
            )))
        }
    }
}

/// Reconstructs an analyzed `BackendExpr` from a frozen `NeutralExpr`,
/// running every node back through [`build`] bottom-up. This is the
/// adapter `extern_impl` uses to evaluate an imported definition (see
/// module doc); it is not part of §4's freeze pass itself.
pub fn unfreeze(expr: &Rc<NeutralExpr>) -> Rc<BackendExpr> {
    let syntax = expr.0.clone().map(|child| unfreeze(&child));
    build(syntax)
}

#[cfg(test)]
mod freeze_tests;
