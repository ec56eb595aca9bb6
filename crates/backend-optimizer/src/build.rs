//! The builder: smart constructors performing algebraic rewrites during
//! reification (§4.2). Every IR node the quoter constructs flows through
//! `build`, which either performs one of the table's structural merges
//! (each one sets the containing node's `rewrite` flag so the fixed-point
//! driver re-evaluates) or falls through to a plain, freshly analyzed
//! `ExprSyntax`.
//!
//! Unlike the distilled spec's `build ctx syntax`, this rendition doesn't
//! thread a `Ctx` through the builder: none of the table's rewrites
//! allocate a fresh level (that's the quoter's job, done before `build`
//! ever sees the node), so `Ctx` would be dead weight here — see
//! `DESIGN.md`.

use std::rc::Rc;

use backend_ir::{
    analyze, BackendAnalysis, BackendExpr, BackendSyntax, Complexity, Ident, LetBinding, Level,
    NonEmptyVec, Param, Rewrite,
};

pub fn build(syntax: BackendSyntax<Rc<BackendExpr>>) -> Rc<BackendExpr> {
    match syntax {
        BackendSyntax::App(hd, args) => build_app(hd, args),
        BackendSyntax::Abs(params, body) => build_abs(params, body),
        BackendSyntax::Let(ident, level, binding, body) => build_let(ident, level, binding, body),
        BackendSyntax::Branch(branches, default) => build_branch(branches, default),
        other => finish(other),
    }
}

fn finish(syntax: BackendSyntax<Rc<BackendExpr>>) -> Rc<BackendExpr> {
    let analysis = analyze(&syntax);
    Rc::new(BackendExpr::Syntax(analysis, syntax))
}

fn rewritten(syntax: BackendSyntax<Rc<BackendExpr>>) -> Rc<BackendExpr> {
    let analysis = analyze(&syntax).with_rewrite();
    Rc::new(BackendExpr::Syntax(analysis, syntax))
}

fn build_app(hd: Rc<BackendExpr>, args: NonEmptyVec<Rc<BackendExpr>>) -> Rc<BackendExpr> {
    if let BackendExpr::Syntax(_, BackendSyntax::App(inner_hd, inner_args)) = hd.as_ref() {
        let merged = inner_args.clone().append(args);
        return rewritten(BackendSyntax::App(inner_hd.clone(), merged));
    }
    finish(BackendSyntax::App(hd, args))
}

fn build_abs(params: NonEmptyVec<Param>, body: Rc<BackendExpr>) -> Rc<BackendExpr> {
    if let BackendExpr::Syntax(_, BackendSyntax::Abs(inner_params, inner_body)) = body.as_ref() {
        let merged = params.clone().append(inner_params.clone());
        return rewritten(BackendSyntax::Abs(merged, inner_body.clone()));
    }
    if params.len() == 1 {
        if let Some(hd) = eta_contractible(&params, &body) {
            return hd;
        }
    }
    finish(BackendSyntax::Abs(params, body))
}

/// `Abs [(_,l1)] (App hd [Local _ l2])` with `l1 == l2`, `hd` a reference
/// that doesn't itself mention `l1` — eta-contracts to `hd`. Single-arg
/// only, per §4.2.
fn eta_contractible(params: &NonEmptyVec<Param>, body: &Rc<BackendExpr>) -> Option<Rc<BackendExpr>> {
    let (_, l1) = *params.first();
    let BackendExpr::Syntax(_, BackendSyntax::App(hd, app_args)) = body.as_ref() else {
        return None;
    };
    if app_args.len() != 1 {
        return None;
    }
    let BackendExpr::Syntax(_, BackendSyntax::Local(_, l2)) = app_args.first().as_ref() else {
        return None;
    };
    if *l2 != l1 {
        return None;
    }
    match hd.as_ref() {
        BackendExpr::Syntax(_, BackendSyntax::Var(_)) => Some(hd.clone()),
        BackendExpr::Syntax(_, BackendSyntax::Local(_, l_hd)) if *l_hd != l1 => Some(hd.clone()),
        _ => None,
    }
}

fn build_let(
    ident: Option<Ident>,
    level: Level,
    binding: Rc<BackendExpr>,
    body: Rc<BackendExpr>,
) -> Rc<BackendExpr> {
    match binding.as_ref() {
        BackendExpr::Syntax(_, BackendSyntax::Let(i2, l2, b2, body2)) => {
            let bindings = vec![
                LetBinding {
                    ident: *i2,
                    level: *l2,
                    binding: b2.clone(),
                },
                LetBinding {
                    ident,
                    level,
                    binding: body2.clone(),
                },
            ];
            return rewrite_node(Rewrite::LetAssoc(bindings, body));
        }
        BackendExpr::Rewrite(_, Rewrite::LetAssoc(bs, body2)) => {
            let mut bindings = bs.clone();
            bindings.push(LetBinding {
                ident,
                level,
                binding: body2.clone(),
            });
            return rewrite_node(Rewrite::LetAssoc(bindings, body));
        }
        _ => {}
    }
    if should_inline_let(level, &binding, &body) {
        return rewrite_node(Rewrite::Inline(ident, level, binding, body));
    }
    finish(BackendSyntax::Let(ident, level, binding, body))
}

fn rewrite_node(rewrite: Rewrite<Rc<BackendExpr>>) -> Rc<BackendExpr> {
    let analysis = match &rewrite {
        Rewrite::Inline(_, level, binding, body) => inline_analysis(*level, binding, body),
        Rewrite::LetAssoc(bindings, body) => let_assoc_analysis(bindings, body),
    };
    Rc::new(BackendExpr::Rewrite(analysis, rewrite))
}

/// `withRewrite(bound(level, b ⊕ count·a))` — the simulated cost of
/// expanding `binding` at every one of its `count` use sites in `body`.
fn inline_analysis(level: Level, binding: &Rc<BackendExpr>, body: &Rc<BackendExpr>) -> BackendAnalysis {
    let b = body.analysis();
    let a = binding.analysis();
    let count = b.usage_of(level).count;
    b.combine(&a.scale(count)).bound(level).with_rewrite()
}

fn let_assoc_analysis(bindings: &[LetBinding<Rc<BackendExpr>>], body: &Rc<BackendExpr>) -> BackendAnalysis {
    let mut acc = body.analysis().clone();
    for b in bindings.iter().rev() {
        let bound = acc.bound(b.level);
        let mut combined = b.binding.analysis().combine(&bound);
        combined.size += 1;
        acc = combined;
    }
    acc.with_rewrite()
}

/// §4.2's inline-let heuristic.
pub fn should_inline_let(level: Level, binding: &Rc<BackendExpr>, body: &Rc<BackendExpr>) -> bool {
    let a = binding.analysis();
    let b = body.analysis();
    let u = b.usage_of(level);

    if u.count == 0 {
        return true;
    }
    if a.complexity == Complexity::Trivial && a.size < 5 {
        return true;
    }
    if !u.captured && (u.count == 1 || (a.complexity <= Complexity::Deref && a.size < 5)) {
        return true;
    }
    if is_abs(binding) && (a.usages.is_empty() || a.size < 128) {
        return true;
    }
    false
}

fn is_abs(expr: &Rc<BackendExpr>) -> bool {
    matches!(expr.as_ref(), BackendExpr::Syntax(_, BackendSyntax::Abs(_, _)))
}

/// §4.6's extern-application inline heuristic: is splicing the body of an
/// extern's definition into this call site (instead of leaving it as an
/// unresolved reference) cheap enough to be worth it? `a` is the
/// definition's own analysis; `arg_count` is the number of arguments
/// supplied at the call site.
pub fn should_inline_extern_app(a: &BackendAnalysis, arg_count: usize) -> bool {
    if a.complexity == Complexity::Trivial && a.size < 5 {
        return true;
    }
    if a.complexity <= Complexity::Deref && a.size < 5 {
        return true;
    }
    if a.args.len() <= arg_count && a.size < 128 {
        return true;
    }
    false
}

fn build_branch(
    branches: Vec<(Rc<BackendExpr>, Rc<BackendExpr>)>,
    default: Option<Rc<BackendExpr>>,
) -> Rc<BackendExpr> {
    if branches.is_empty() {
        return match default {
            Some(def) => def,
            None => finish(BackendSyntax::Branch(branches, default)),
        };
    }
    if let Some(def) = &default {
        if let BackendExpr::Syntax(_, BackendSyntax::Branch(bs2, def2)) = def.as_ref() {
            let mut combined = branches;
            combined.extend(bs2.iter().cloned());
            return build(BackendSyntax::Branch(combined, def2.clone()));
        }
    }
    finish(BackendSyntax::Branch(branches, default))
}

#[cfg(test)]
mod build_tests;
