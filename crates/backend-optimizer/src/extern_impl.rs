//! Extern resolution policy (§4.6): turns a host-supplied table of
//! imported definitions into the `EvalExtern` callback `Env` consults.
//!
//! Each table entry is an [`Impl`] — the shape the driver's extern
//! lookup (§6's `lookupExtern : Qualified -> Maybe (Analysis, NeutralIR)`)
//! resolved an imported name to. Unlike the distilled interface, `Impl`'s
//! `Expr` case carries an already-[`unfreeze`](crate::freeze::unfreeze)d
//! `Rc<BackendExpr>` rather than a separate `(Analysis, NeutralIR)` pair:
//! `unfreeze` recomputes the same bottom-up analysis `freeze` discarded,
//! so the analysis and the expression it describes can't drift apart, and
//! callers don't have to thread a second value through the table for
//! something `BackendExpr::analysis` already carries (see `DESIGN.md`).
//!
//! Resolution only recognizes the exact spine shapes §4.6 lists; anything
//! else declines (`None`), leaving the reference to fall back to the
//! generic unresolved-extern neutral `eval_var`/`eval_app`/`eval_accessor`
//! already build.

use std::rc::Rc;

use backend_ir::{
    Accessor, BackendAnalysis, BackendExpr, BackendSyntax, EvalRef, Ident, InlineDirective,
    Literal, Qualified,
};
use indexmap::IndexMap;

use crate::build::should_inline_extern_app;
use crate::env::{EvalExtern, Env};
use crate::eval::{eval, eval_app};
use crate::semantics::{BackendNeutral, BackendSemantics, ExternSpine};

/// A host-supplied definition, in one of the shapes the optimizer knows
/// how to splice into the semantic domain (§4.6).
#[derive(Clone)]
pub enum Impl {
    /// An imported expression, already unfrozen (re-analyzed) by the
    /// caller via [`crate::freeze::unfreeze`].
    Expr(Rc<BackendExpr>),
    /// A curried data constructor: `tag` plus its declaration-order field
    /// names. Only a *fully saturated* single application resolves; a
    /// partial one is left as a generic unresolved extern (consecutive
    /// applications coalesce in `evalApp` before reaching here, so this
    /// only bites a constructor applied across non-adjacent call sites).
    Ctor(Qualified<Ident>, Rc<str>, Vec<Ident>),
    /// A fixed namespace of further `Impl`s, indexed by property name.
    /// Only `dict.prop(args)` resolves (§4.6); a bare `dict.prop`
    /// projection is left unresolved, exactly as specified.
    Dict(Rc<IndexMap<Rc<str>, Impl>>),
    /// A mutually recursive external binding. Never spliced in — tying
    /// that knot would need the same backpatched realization
    /// `LetRecGroup` leaves to its caller (see module doc in
    /// `semantics.rs`), and nothing here needs it badly enough to earn
    /// the complexity.
    Rec,
}

/// The fixed table of imported definitions for one module, keyed by
/// qualified name.
pub type ExternTable = Rc<IndexMap<Qualified<Ident>, Impl>>;

/// The merged `EvalRef -> InlineDirective` map (§6): directives-file >
/// module-exported > defaults precedence has already been resolved by the
/// (out-of-scope) caller by the time this map reaches the core. An
/// `EvalRef` absent from the table is treated as `InlineDirective::Default`.
pub type DirectiveTable = Rc<IndexMap<EvalRef, InlineDirective>>;

/// Build the `EvalExtern` callback for a fixed table of host
/// definitions. Names absent from `table` stay unresolved (`None`), the
/// same as any other extern the optimizer has no opinion about.
/// `directives` supplies the per-`EvalRef` user overrides to the default
/// size heuristic (§1's "user-marked bindings expanded at their call
/// sites"); a binding with no entry falls back to `should_inline_extern_app`.
pub fn eval_extern_from_impls(table: ExternTable, directives: DirectiveTable) -> EvalExtern {
    Rc::new(move |env, qual, spine| {
        let imp = table.get(&qual)?;
        eval_extern_from_impl(env, qual, imp, spine, &directives)
    })
}

fn directive_for(directives: &DirectiveTable, qual: Qualified<Ident>, path: &[Accessor]) -> InlineDirective {
    let eval_ref = EvalRef {
        binding: qual,
        path: Rc::from(path.to_vec().into_boxed_slice()),
    };
    directives.get(&eval_ref).copied().unwrap_or(InlineDirective::Default)
}

/// Resolves a directive against the default size heuristic: `Never`/
/// `Always` override it outright, `ArityN(n)` inlines call sites supplying
/// at least `n` arguments, and `Default` defers to `should_inline_extern_app`.
fn decide_inline(directive: InlineDirective, analysis: &BackendAnalysis, arg_count: usize) -> bool {
    match directive {
        InlineDirective::Never => false,
        InlineDirective::Always => true,
        InlineDirective::ArityN(n) => arg_count as u32 >= n,
        InlineDirective::Default => should_inline_extern_app(analysis, arg_count),
    }
}

/// §4.6. Given the `Impl` an extern's qualified name resolved to and the
/// spine of operations accumulated on it so far, decide whether (and how)
/// to splice in a resolved semantic value.
fn eval_extern_from_impl(
    env: &Env,
    qual: Qualified<Ident>,
    imp: &Impl,
    spine: &[ExternSpine],
    directives: &DirectiveTable,
) -> Option<BackendSemantics> {
    match imp {
        Impl::Expr(e) => eval_impl_expr(env, qual, e, spine, directives),
        Impl::Ctor(qual, tag, fields) => eval_impl_ctor(*qual, tag, fields, spine),
        Impl::Dict(props) => eval_impl_dict(env, qual, props, spine, directives),
        Impl::Rec => None,
    }
}

fn eval_impl_expr(
    env: &Env,
    qual: Qualified<Ident>,
    e: &Rc<BackendExpr>,
    spine: &[ExternSpine],
    directives: &DirectiveTable,
) -> Option<BackendSemantics> {
    match spine {
        [] => match e.as_ref() {
            BackendExpr::Syntax(_, BackendSyntax::Var(_)) => Some(eval(env, e)),
            _ => None,
        },
        [ExternSpine::Accessor(Accessor::GetProp(p))] => match e.as_ref() {
            BackendExpr::Syntax(_, BackendSyntax::Lit(Literal::Record(props))) => props
                .iter()
                .find(|(k, _)| k == p)
                .map(|(_, v)| eval(env, v)),
            _ => None,
        },
        [ExternSpine::App(args)] => {
            let directive = directive_for(directives, qual, &[]);
            if decide_inline(directive, e.analysis(), args.len()) {
                Some(eval_app(env, eval(env, e), (**args).clone()))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn eval_impl_ctor(
    qual: Qualified<Ident>,
    tag: &Rc<str>,
    fields: &[Ident],
    spine: &[ExternSpine],
) -> Option<BackendSemantics> {
    match spine {
        [] if fields.is_empty() => Some(BackendSemantics::neutral(BackendNeutral::Data(
            qual,
            tag.clone(),
            Vec::new(),
        ))),
        [ExternSpine::App(args)] if fields.len() == args.len() => {
            let realized = fields
                .iter()
                .copied()
                .zip(args.iter().cloned())
                .collect();
            Some(BackendSemantics::neutral(BackendNeutral::Data(
                qual,
                tag.clone(),
                realized,
            )))
        }
        _ => None,
    }
}

fn eval_impl_dict(
    env: &Env,
    qual: Qualified<Ident>,
    props: &IndexMap<Rc<str>, Impl>,
    spine: &[ExternSpine],
    directives: &DirectiveTable,
) -> Option<BackendSemantics> {
    match spine {
        [ExternSpine::Accessor(Accessor::GetProp(p)), ExternSpine::App(args)] => {
            match props.get(p.as_ref())? {
                Impl::Expr(e) => {
                    let directive =
                        directive_for(directives, qual, std::slice::from_ref(&Accessor::GetProp(p.clone())));
                    if decide_inline(directive, e.analysis(), args.len()) {
                        Some(eval_app(env, eval(env, e), (**args).clone()))
                    } else {
                        None
                    }
                }
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod extern_impl_tests;
