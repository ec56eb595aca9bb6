//! The quoter (§4.3): reifies a `BackendSemantics` value back into IR at
//! fresh de Bruijn levels. Every constructed node flows through
//! [`build`](crate::build::build), so the algebraic rewrites of §4.2 fire
//! as quoting proceeds, not as a separate pass.
//!
//! `Ctx` carries the next level to allocate and a single "resume" frame
//! (`resume_branch`) for the nearest enclosing `BranchTry`, if any. A
//! `BranchTry` packages a branch whose predicate is already known true
//! together with the branches it never got to try; quoting it installs
//! that pair as the current resume frame — concatenated with whatever
//! frame was already there when both are defaultless, overwritten
//! otherwise — before quoting its body, then restores the prior frame
//! afterward. If quoting bottoms out on a *different*, defaultless
//! `Branch` further down (a nested match that itself got stuck), that
//! inner branch re-resolves the resumed frame through `eval_branches`
//! rather than emitting it unreduced, so it can fall through to the
//! outer match's remaining arms instead of being truncated to no default
//! at all.

use std::rc::Rc;

use backend_ir::{BackendExpr, BackendSyntax, Ident, Level, NonEmptyVec};

use crate::build::build;
use crate::eval::eval_branches;
use crate::semantics::{BackendNeutral, BackendSemantics};
use crate::thunk::Thunk;

type ResumeFrame = (Rc<Vec<(Thunk, Thunk)>>, Option<Thunk>);

pub struct Ctx {
    next_level: u32,
    resume_branch: Option<ResumeFrame>,
}

impl Ctx {
    pub fn new() -> Self {
        Ctx {
            next_level: 0,
            resume_branch: None,
        }
    }

    fn fresh_level(&mut self) -> Level {
        let level = Level(self.next_level);
        self.next_level += 1;
        level
    }
}

impl Default for Ctx {
    fn default() -> Self {
        Ctx::new()
    }
}

pub fn quote(ctx: &mut Ctx, sem: &BackendSemantics) -> Rc<BackendExpr> {
    match sem {
        BackendSemantics::Extern(_, _, fallback) => quote(ctx, &fallback.force()),
        BackendSemantics::Lam(ident, f) => {
            let level = ctx.fresh_level();
            let placeholder = BackendSemantics::neutral(BackendNeutral::Local(*ident, level));
            let body = quote(ctx, &f(placeholder));
            build(BackendSyntax::Abs(NonEmptyVec::new((*ident, level)), body))
        }
        BackendSemantics::Let(ident, binding, k) => {
            let qbinding = quote(ctx, binding);
            let level = ctx.fresh_level();
            let placeholder = BackendSemantics::neutral(BackendNeutral::Local(*ident, level));
            let body = quote(ctx, &k(placeholder));
            build(BackendSyntax::Let(*ident, level, qbinding, body))
        }
        BackendSemantics::LetRec(group) => quote_letrec(ctx, group),
        BackendSemantics::EffectBind(ident, binding, k) => {
            let qbinding = quote(ctx, binding);
            let level = ctx.fresh_level();
            let placeholder = BackendSemantics::neutral(BackendNeutral::Local(*ident, level));
            let body = quote(ctx, &k(placeholder));
            build(BackendSyntax::EffectBind(*ident, level, qbinding, body))
        }
        BackendSemantics::EffectPure(val) => {
            let qval = quote(ctx, val);
            build(BackendSyntax::EffectPure(qval))
        }
        BackendSemantics::Branch(branches, default) => quote_branch(ctx, branches, default.as_ref()),
        BackendSemantics::BranchTry(body, tail, default) => {
            let previous = ctx.resume_branch.clone();
            let frame = match &previous {
                Some((prev_tail, None)) if default.is_none() => {
                    let mut concatenated = (**prev_tail).clone();
                    concatenated.extend((**tail).iter().cloned());
                    (Rc::new(concatenated), None)
                }
                _ => (tail.clone(), default.clone()),
            };
            ctx.resume_branch = Some(frame);
            let quoted = quote(ctx, body);
            ctx.resume_branch = previous;
            quoted
        }
        BackendSemantics::Accessor(lhs, acc) => {
            let qlhs = quote(ctx, lhs);
            build(BackendSyntax::Accessor(qlhs, acc.clone()))
        }
        BackendSemantics::Update(lhs, props) => {
            let qlhs = quote(ctx, lhs);
            let qprops = props
                .iter()
                .map(|(k, v)| (k.clone(), quote(ctx, v)))
                .collect();
            build(BackendSyntax::Update(qlhs, qprops))
        }
        BackendSemantics::Neutral(n) => quote_neutral(ctx, n),
    }
}

fn quote_letrec(ctx: &mut Ctx, group: &crate::semantics::LetRecGroup) -> Rc<BackendExpr> {
    let levels: Vec<Level> = group.members.iter().map(|_| ctx.fresh_level()).collect();
    let realization: Vec<BackendSemantics> = group
        .members
        .iter()
        .zip(levels.iter())
        .map(|((ident, _), level)| BackendSemantics::neutral(BackendNeutral::Local(Some(*ident), *level)))
        .collect();

    let quoted_members: Vec<(Ident, Level, Rc<BackendExpr>)> = group
        .members
        .iter()
        .zip(levels.iter())
        .map(|((ident, f), level)| {
            let value = f(&realization);
            (*ident, *level, quote(ctx, &value))
        })
        .collect();

    let body_value = (group.body)(&realization);
    let body = quote(ctx, &body_value);
    build(BackendSyntax::LetRec(quoted_members, body))
}

/// Quotes a (possibly defaultless) stuck branch table. If `default` is
/// absent and a resume frame is pending, the outer match's remaining arms
/// are re-resolved through `eval_branches` and become this branch's
/// fallback instead of leaving it truncated.
fn quote_branch(
    ctx: &mut Ctx,
    branches: &Rc<Vec<(Thunk, Thunk)>>,
    default: Option<&Thunk>,
) -> Rc<BackendExpr> {
    let qbranches: Vec<(Rc<BackendExpr>, Rc<BackendExpr>)> = branches
        .iter()
        .map(|(pred, body)| (quote(ctx, &pred.force()), quote(ctx, &body.force())))
        .collect();

    match default {
        Some(d) => {
            let qdefault = quote(ctx, &d.force());
            build(BackendSyntax::Branch(qbranches, Some(qdefault)))
        }
        None => match ctx.resume_branch.take() {
            Some((resumed_tail, resumed_default)) => {
                let resumed = eval_branches(resumed_tail, resumed_default);
                let qdefault = quote(ctx, &resumed);
                build(BackendSyntax::Branch(qbranches, Some(qdefault)))
            }
            None => build(BackendSyntax::Branch(qbranches, None)),
        },
    }
}

fn quote_neutral(ctx: &mut Ctx, n: &Rc<BackendNeutral>) -> Rc<BackendExpr> {
    match n.as_ref() {
        BackendNeutral::Local(ident, level) => build(BackendSyntax::Local(*ident, *level)),
        BackendNeutral::Var(qual) => build(BackendSyntax::Var(*qual)),
        BackendNeutral::Data(qual, tag, fields) => {
            // A zero-field constructor is its own canonical reference —
            // there's nothing a `CtorSaturated` node would add over `Var`.
            if fields.is_empty() {
                return build(BackendSyntax::Var(*qual));
            }
            let qfields = fields
                .iter()
                .map(|(ident, th)| (*ident, quote(ctx, &th.force())))
                .collect();
            build(BackendSyntax::CtorSaturated(*qual, tag.clone(), qfields))
        }
        BackendNeutral::CtorDef(tag, fields) => {
            build(BackendSyntax::CtorDef(tag.clone(), fields.clone()))
        }
        BackendNeutral::App(hd, args) => {
            let qhd = quote_neutral(ctx, hd);
            // `evalApp` never constructs a `NeutApp` with an empty spine
            // (it returns the head unchanged instead), but quoting one
            // defensively collapses to the head per §4.3's note.
            if args.is_empty() {
                return qhd;
            }
            let qargs = args.iter().map(|th| quote(ctx, &th.force())).collect::<Vec<_>>();
            let qargs = NonEmptyVec::from_vec(qargs)
                .unwrap_or_else(|| unreachable!("checked non-empty above"));
            build(BackendSyntax::App(qhd, qargs))
        }
        BackendNeutral::Accessor(lhs, acc) => {
            let qlhs = quote_neutral(ctx, lhs);
            build(BackendSyntax::Accessor(qlhs, acc.clone()))
        }
        BackendNeutral::Update(lhs, props) => {
            let qlhs = quote_neutral(ctx, lhs);
            let qprops = props
                .iter()
                .map(|(k, v)| (k.clone(), quote(ctx, v)))
                .collect();
            build(BackendSyntax::Update(qlhs, qprops))
        }
        BackendNeutral::Test(lhs, guard) => {
            let qlhs = quote_neutral(ctx, lhs);
            build(BackendSyntax::Test(qlhs, guard.clone()))
        }
        BackendNeutral::Lit(lit) => {
            let qlit = lit.clone().map(|v| quote(ctx, &v));
            build(BackendSyntax::Lit(qlit))
        }
        BackendNeutral::Fail(msg) => build(BackendSyntax::Fail(msg.clone())),
        BackendNeutral::Opaque(sem) => quote(ctx, sem),
    }
}

#[cfg(test)]
mod quote_tests;
