//! The evaluator (§4.1): maps `BackendExpr` under an `Env` into
//! `BackendSemantics`. Deterministic and total on well-formed IR; panics
//! only on an unbound `Local` or a recursive-group member missing from
//! its own group (§7 — both are producer bugs, not recoverable errors).

use std::rc::Rc;

use backend_ir::{
    Accessor, BackendExpr, BackendSyntax, Guard, Ident, Level, Literal, Qualified, Rewrite,
};
use indexmap::IndexMap;

use crate::env::Env;
use crate::semantics::{BackendNeutral, BackendSemantics, ExternSpine, GroupFn, LetRecGroup};
use crate::thunk::Thunk;

pub fn eval(env: &Env, expr: &Rc<BackendExpr>) -> BackendSemantics {
    match expr.as_ref() {
        BackendExpr::Syntax(_, syntax) => eval_syntax(env, syntax),
        BackendExpr::Rewrite(_, rewrite) => eval_rewrite(env, rewrite),
    }
}

fn eval_syntax(env: &Env, syntax: &BackendSyntax<Rc<BackendExpr>>) -> BackendSemantics {
    match syntax {
        BackendSyntax::Var(qual) => eval_var(env, *qual),
        BackendSyntax::Local(ident, level) => env.lookup(*ident, *level),
        BackendSyntax::Lit(lit) => {
            BackendSemantics::neutral(BackendNeutral::Lit(lit.clone().map(|e| eval(env, &e))))
        }
        BackendSyntax::App(hd, args) => {
            let head = eval(env, hd);
            let thunks = args
                .iter()
                .map(|a| thunk_of(env, a))
                .collect::<Vec<_>>();
            eval_app(env, head, thunks)
        }
        BackendSyntax::Abs(params, body) => {
            let params: Vec<_> = params.iter().cloned().collect();
            eval_abs(env, &params, body)
        }
        BackendSyntax::Let(ident, level, binding, body) => {
            eval_let(env, *ident, *level, binding, body)
        }
        BackendSyntax::LetRec(bindings, body) => eval_letrec(env, bindings, body),
        BackendSyntax::EffectBind(ident, level, binding, body) => {
            eval_effect_bind(env, *ident, *level, binding, body)
        }
        BackendSyntax::EffectPure(val) => BackendSemantics::EffectPure(Rc::new(eval(env, val))),
        BackendSyntax::Accessor(lhs, acc) => eval_accessor(env, eval(env, lhs), acc.clone()),
        BackendSyntax::Update(lhs, props) => {
            let lhs = eval(env, lhs);
            let props = props
                .iter()
                .map(|(k, v)| (k.clone(), eval(env, v)))
                .collect();
            eval_update(lhs, props)
        }
        BackendSyntax::Branch(branches, default) => {
            let branches: Vec<(Thunk, Thunk)> = branches
                .iter()
                .map(|(pred, body)| (thunk_of(env, pred), thunk_of(env, body)))
                .collect();
            let default = default.as_ref().map(|d| thunk_of(env, d));
            eval_branches(Rc::new(branches), default)
        }
        BackendSyntax::Test(lhs, guard) => eval_test(eval(env, lhs), guard.clone()),
        BackendSyntax::CtorDef(tag, fields) => {
            BackendSemantics::neutral(BackendNeutral::CtorDef(tag.clone(), fields.clone()))
        }
        BackendSyntax::CtorSaturated(qual, tag, fields) => {
            let fields = fields
                .iter()
                .map(|(ident, expr)| (*ident, thunk_of(env, expr)))
                .collect();
            BackendSemantics::neutral(BackendNeutral::Data(*qual, tag.clone(), fields))
        }
        BackendSyntax::Fail(msg) => BackendSemantics::neutral(BackendNeutral::Fail(msg.clone())),
    }
}

fn eval_rewrite(env: &Env, rewrite: &Rewrite<Rc<BackendExpr>>) -> BackendSemantics {
    match rewrite {
        // Unlike a plain `Let` (which always re-wraps as a deferred
        // `SemLet`, so the quoter can decide afresh whether to keep it),
        // `Inline` marks a binding `build_let` already judged cheap/
        // single-use enough to splice in — so evaluating it substitutes
        // the binding into `body`'s environment directly and returns
        // whatever `body` evaluates to, with no `SemLet` left wrapping it.
        // Without this, re-evaluating the same `Inline` node every pass
        // would reconstruct the identical wrapped `SemLet` and the
        // fixed-point loop would never see a rewrite-free top node.
        Rewrite::Inline(_, level, binding, body) => {
            debug_assert_eq!(*level, env.next_level(), "Inline level out of order");
            let bound = eval(env, binding);
            eval(&env.extend_single(bound), body)
        }
        Rewrite::LetAssoc(bindings, body) => eval_let_assoc(env, bindings, body),
    }
}

fn thunk_of(env: &Env, expr: &Rc<BackendExpr>) -> Thunk {
    let env = env.clone();
    let expr = expr.clone();
    Thunk::new(move || eval(&env, &expr))
}

fn eval_var(env: &Env, qual: Qualified<Ident>) -> BackendSemantics {
    match (env.eval_extern)(env, qual, &[]) {
        Some(v) => v,
        None => make_extern(qual, Rc::new(Vec::new())),
    }
}

/// Build (or rebuild) an unresolved extern, wiring up a fallback thunk
/// that reifies the current spine as a neutral when forced.
fn make_extern(qual: Qualified<Ident>, spine: Rc<Vec<ExternSpine>>) -> BackendSemantics {
    let spine_for_thunk = spine.clone();
    let fallback = Thunk::new(move || reify_extern(qual, &spine_for_thunk));
    BackendSemantics::Extern(qual, spine, fallback)
}

fn reify_extern(qual: Qualified<Ident>, spine: &[ExternSpine]) -> BackendSemantics {
    let mut base = BackendNeutral::Var(qual);
    for op in spine {
        base = match op {
            ExternSpine::App(args) => BackendNeutral::App(Rc::new(base), (**args).clone()),
            ExternSpine::Accessor(acc) => BackendNeutral::Accessor(Rc::new(base), acc.clone()),
        };
    }
    BackendSemantics::neutral(base)
}

fn eval_abs(env: &Env, params: &[(Option<Ident>, Level)], body: &Rc<BackendExpr>) -> BackendSemantics {
    match params.split_first() {
        None => eval(env, body),
        Some(((ident, level), rest)) => {
            debug_assert_eq!(*level, env.next_level(), "Abs parameter level out of order");
            let ident = *ident;
            let env = env.clone();
            let rest = rest.to_vec();
            let body = body.clone();
            BackendSemantics::Lam(
                ident,
                Rc::new(move |v| eval_abs(&env.extend_single(v), &rest, &body)),
            )
        }
    }
}

fn eval_let(
    env: &Env,
    ident: Option<Ident>,
    level: Level,
    binding: &Rc<BackendExpr>,
    body: &Rc<BackendExpr>,
) -> BackendSemantics {
    debug_assert_eq!(level, env.next_level(), "Let level out of order");
    let bound = eval(env, binding);
    let env = env.clone();
    let body = body.clone();
    BackendSemantics::Let(
        ident,
        Rc::new(bound),
        Rc::new(move |v| eval(&env.extend_single(v), &body)),
    )
}

fn eval_let_assoc(
    env: &Env,
    bindings: &[backend_ir::LetBinding<Rc<BackendExpr>>],
    body: &Rc<BackendExpr>,
) -> BackendSemantics {
    match bindings.split_first() {
        None => eval(env, body),
        Some((b, rest)) => {
            let bound = eval(env, &b.binding);
            let ident = b.ident;
            let env = env.clone();
            let rest = rest.to_vec();
            let body = body.clone();
            BackendSemantics::Let(
                ident,
                Rc::new(bound),
                Rc::new(move |v| eval_let_assoc(&env.extend_single(v), &rest, &body)),
            )
        }
    }
}

fn eval_effect_bind(
    env: &Env,
    ident: Option<Ident>,
    level: Level,
    binding: &Rc<BackendExpr>,
    body: &Rc<BackendExpr>,
) -> BackendSemantics {
    debug_assert_eq!(level, env.next_level(), "EffectBind level out of order");
    let bound = eval(env, binding);
    let env = env.clone();
    let body = body.clone();
    BackendSemantics::EffectBind(
        ident,
        Rc::new(bound),
        Rc::new(move |v| eval(&env.extend_single(v), &body)),
    )
}

fn eval_letrec(
    env: &Env,
    bindings: &[(Ident, Level, Rc<BackendExpr>)],
    body: &Rc<BackendExpr>,
) -> BackendSemantics {
    let idents: Vec<Ident> = bindings.iter().map(|(ident, _, _)| *ident).collect();

    let members: Vec<(Ident, GroupFn)> = bindings
        .iter()
        .map(|(ident, _, expr)| {
            let env = env.clone();
            let expr = expr.clone();
            let idents = idents.clone();
            let f: GroupFn = Rc::new(move |realization: &[BackendSemantics]| {
                let env2 = {
                    let map: IndexMap<Ident, BackendSemantics> = idents
                        .iter()
                        .copied()
                        .zip(realization.iter().cloned())
                        .collect();
                    env.extend_group(Rc::new(map), idents.len())
                };
                eval(&env2, &expr)
            });
            (*ident, f)
        })
        .collect();

    let body_fn: GroupFn = {
        let env = env.clone();
        let body = body.clone();
        let idents = idents.clone();
        Rc::new(move |realization: &[BackendSemantics]| {
            let map: IndexMap<Ident, BackendSemantics> = idents
                .iter()
                .copied()
                .zip(realization.iter().cloned())
                .collect();
            let env2 = env.extend_group(Rc::new(map), idents.len());
            eval(&env2, &body)
        })
    };

    BackendSemantics::LetRec(Rc::new(LetRecGroup {
        members,
        body: body_fn,
    }))
}

/// §4.1.1. Walks arguments left to right; each application is named via a
/// fresh `SemLet` before being handed to the callee's host closure.
pub fn eval_app(env: &Env, head: BackendSemantics, args: Vec<Thunk>) -> BackendSemantics {
    if args.is_empty() {
        return head;
    }
    match head {
        BackendSemantics::Lam(_, k) => {
            let mut it = args.into_iter();
            let first = it.next().unwrap();
            let rest: Vec<Thunk> = it.collect();
            let arg_val = first.force();
            let env = env.clone();
            BackendSemantics::Let(
                None,
                Rc::new(arg_val),
                Rc::new(move |v| eval_app(&env, k(v), rest.clone())),
            )
        }
        BackendSemantics::Extern(qual, spine, _fallback) => {
            let mut new_spine = (*spine).clone();
            match new_spine.last_mut() {
                Some(ExternSpine::App(existing)) => {
                    let mut merged = (**existing).clone();
                    merged.extend(args);
                    *existing = Rc::new(merged);
                }
                _ => new_spine.push(ExternSpine::App(Rc::new(args))),
            }
            match (env.eval_extern)(env, qual, &new_spine) {
                Some(resolved) => resolved,
                None => make_extern(qual, Rc::new(new_spine)),
            }
        }
        BackendSemantics::Let(ident, v, k) => {
            let env = env.clone();
            BackendSemantics::Let(
                ident,
                v,
                Rc::new(move |v2| {
                    let applied = k(v2);
                    let env = env.clone();
                    let args = args.clone();
                    BackendSemantics::Let(
                        None,
                        Rc::new(applied),
                        Rc::new(move |fn_val| eval_app(&env, fn_val, args.clone())),
                    )
                }),
            )
        }
        BackendSemantics::Neutral(n) => match n.as_ref() {
            BackendNeutral::App(inner_hd, inner_args) => {
                let mut combined = inner_args.clone();
                combined.extend(args);
                BackendSemantics::neutral(BackendNeutral::App(inner_hd.clone(), combined))
            }
            _ => BackendSemantics::neutral(BackendNeutral::App(n, args)),
        },
        // §4.1.1's final rule: a stuck `Branch`/`LetRec`/`EffectPure`/etc.
        // applied directly (e.g. `App(Branch[...] None, [arg])`, or the
        // head of a well-formed `(letrec f = ... in f)(x)`) still reifies
        // as a neutral — the optimizer never rejects well-formed input.
        other => BackendSemantics::neutral(BackendNeutral::App(
            Rc::new(BackendNeutral::Opaque(Rc::new(other))),
            args,
        )),
    }
}

/// §4.1.2.
pub fn eval_accessor(env: &Env, lhs: BackendSemantics, acc: Accessor) -> BackendSemantics {
    match lhs {
        BackendSemantics::Extern(qual, spine, _fallback) => {
            let mut new_spine = (*spine).clone();
            new_spine.push(ExternSpine::Accessor(acc));
            match (env.eval_extern)(env, qual, &new_spine) {
                Some(resolved) => resolved,
                None => make_extern(qual, Rc::new(new_spine)),
            }
        }
        BackendSemantics::Let(ident, v, k) => {
            let env = env.clone();
            BackendSemantics::Let(
                ident,
                v,
                Rc::new(move |v2| eval_accessor(&env, k(v2), acc.clone())),
            )
        }
        BackendSemantics::Neutral(n) => match (n.as_ref(), &acc) {
            (BackendNeutral::Lit(Literal::Record(props)), Accessor::GetProp(p)) => props
                .iter()
                .find(|(k, _)| k == p)
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| BackendSemantics::neutral(BackendNeutral::Accessor(n.clone(), acc))),
            (BackendNeutral::Lit(Literal::Array(items)), Accessor::GetIndex(i)) => items
                .get(*i as usize)
                .cloned()
                .unwrap_or_else(|| BackendSemantics::neutral(BackendNeutral::Accessor(n.clone(), acc))),
            (BackendNeutral::Data(_, _, fields), Accessor::GetOffset(i)) => fields
                .get(*i as usize)
                .map(|(_, th)| th.force())
                .unwrap_or_else(|| BackendSemantics::neutral(BackendNeutral::Accessor(n.clone(), acc))),
            _ => BackendSemantics::neutral(BackendNeutral::Accessor(n, acc)),
        },
        _ => panic!("projected out of a non-accessible semantics value — malformed IR"),
    }
}

/// §4.1.3.
pub fn eval_update(lhs: BackendSemantics, props: Vec<(Rc<str>, BackendSemantics)>) -> BackendSemantics {
    match lhs {
        BackendSemantics::Neutral(n) => match n.as_ref() {
            BackendNeutral::Lit(Literal::Record(old)) => {
                let mut combined: Vec<(Rc<str>, BackendSemantics)> =
                    props.iter().cloned().chain(old.iter().cloned()).collect();
                combined.sort_by(|a, b| a.0.cmp(&b.0));
                let mut seen = std::collections::HashSet::new();
                let mut merged = Vec::with_capacity(combined.len());
                for (k, v) in combined {
                    if seen.insert(k.clone()) {
                        merged.push((k, v));
                    }
                }
                BackendSemantics::neutral(BackendNeutral::Lit(Literal::Record(merged)))
            }
            _ => BackendSemantics::neutral(BackendNeutral::Update(n.clone(), props)),
        },
        BackendSemantics::Let(ident, v, k) => {
            BackendSemantics::Let(ident, v, Rc::new(move |v2| eval_update(k(v2), props.clone())))
        }
        _ => panic!("updated a non-record semantics value — malformed IR"),
    }
}

/// §4.1.4. Scans branches in order, resolving predicates that force to a
/// literal boolean; stuck predicates accumulate into `acc`.
pub fn eval_branches(branches: Rc<Vec<(Thunk, Thunk)>>, default: Option<Thunk>) -> BackendSemantics {
    let original = (branches.clone(), default.clone());
    eval_branches_go(Vec::new(), &branches, default, &original)
}

fn eval_branches_go(
    acc: Vec<(Thunk, Thunk)>,
    remaining: &[(Thunk, Thunk)],
    default: Option<Thunk>,
    original: &(Rc<Vec<(Thunk, Thunk)>>, Option<Thunk>),
) -> BackendSemantics {
    match remaining.split_first() {
        None => {
            if acc.is_empty() {
                match default {
                    Some(d) => d.force(),
                    None => BackendSemantics::Branch(original.0.clone(), original.1.clone()),
                }
            } else {
                BackendSemantics::Branch(Rc::new(acc), default)
            }
        }
        Some(((pred, body), tail)) => match pred.force().as_bool() {
            Some(true) => match body.force() {
                BackendSemantics::Branch(branches2, Some(def2)) => {
                    eval_branches_go(acc, &branches2, Some(def2), original)
                }
                BackendSemantics::Branch(branches2, None) => {
                    let mut new_remaining: Vec<(Thunk, Thunk)> = tail.to_vec();
                    new_remaining.extend((*branches2).iter().cloned());
                    eval_branches_go(acc, &new_remaining, default, original)
                }
                resolved => BackendSemantics::Branch(
                    Rc::new(acc),
                    Some(Thunk::forced(BackendSemantics::BranchTry(
                        Rc::new(resolved),
                        Rc::new(tail.to_vec()),
                        default,
                    ))),
                ),
            },
            Some(false) => eval_branches_go(acc, tail, default, original),
            None => {
                let mut acc = acc;
                acc.push((pred.clone(), body.clone()));
                eval_branches_go(acc, tail, default, original)
            }
        },
    }
}

/// §4.1.5.
pub fn eval_test(lhs: BackendSemantics, guard: Guard) -> BackendSemantics {
    match lhs {
        BackendSemantics::Let(ident, v, k) => {
            BackendSemantics::Let(ident, v, Rc::new(move |v2| eval_test(k(v2), guard.clone())))
        }
        BackendSemantics::Neutral(n) => {
            let result = match (n.as_ref(), &guard) {
                (BackendNeutral::Lit(Literal::Int(i)), Guard::EqInt(g)) => Some(*i == *g),
                (BackendNeutral::Lit(Literal::Float(f)), Guard::EqFloat(g)) => Some(*f == *g),
                (BackendNeutral::Lit(Literal::Str(s)), Guard::EqStr(g)) => Some(s.as_ref() == g.as_ref()),
                (BackendNeutral::Lit(Literal::Char(c)), Guard::EqChar(g)) => Some(*c == *g),
                (BackendNeutral::Lit(Literal::Bool(b)), Guard::EqBool(g)) => Some(*b == *g),
                (BackendNeutral::Lit(Literal::Array(items)), Guard::ArrayLen(n2)) => {
                    Some(items.len() as u32 == *n2)
                }
                (BackendNeutral::Data(_, tag, _), Guard::CtorTag(g)) => Some(tag.as_ref() == g.as_ref()),
                _ => None,
            };
            match result {
                Some(b) => BackendSemantics::bool_lit(b),
                None => BackendSemantics::neutral(BackendNeutral::Test(n, guard)),
            }
        }
        _ => panic!("tested a non-scrutinizable semantics value — malformed IR"),
    }
}

#[cfg(test)]
mod eval_tests;
