use std::rc::Rc;

use backend_ir::{Ident, Level, Literal, NonEmptyVec, Qualified, Symbol};

use super::*;

fn ident(n: u32) -> Ident {
    Ident(Symbol::from_raw(n))
}

fn module() -> backend_ir::ModuleName {
    backend_ir::ModuleName(Symbol::from_raw(9999))
}

fn int_lit(n: i64) -> Rc<BackendExpr> {
    build(BackendSyntax::Lit(Literal::Int(n)))
}

fn local(ident_opt: Option<Ident>, level: Level) -> Rc<BackendExpr> {
    build(BackendSyntax::Local(ident_opt, level))
}

fn var() -> Rc<BackendExpr> {
    build(BackendSyntax::Var(Qualified::new(module(), ident(0))))
}

#[test]
fn merges_nested_app_spines() {
    let hd = var();
    let inner = build(BackendSyntax::App(
        hd.clone(),
        NonEmptyVec::new(int_lit(1)),
    ));
    let outer = build(BackendSyntax::App(
        inner,
        NonEmptyVec::new(int_lit(2)),
    ));

    match outer.as_ref() {
        BackendExpr::Syntax(a, BackendSyntax::App(inner_hd, args)) => {
            assert!(matches!(inner_hd.as_ref(), BackendExpr::Syntax(_, BackendSyntax::Var(_))));
            assert_eq!(args.len(), 2);
            assert!(a.rewrite);
        }
        other => panic!("expected a merged App, got {other:?}"),
    }
}

#[test]
fn merges_nested_abs_params() {
    let l0 = Level(0);
    let l1 = Level(1);
    let body = int_lit(7);
    let inner = build(BackendSyntax::Abs(NonEmptyVec::new((None, l1)), body));
    let outer = build(BackendSyntax::Abs(NonEmptyVec::new((None, l0)), inner));

    match outer.as_ref() {
        BackendExpr::Syntax(a, BackendSyntax::Abs(params, _)) => {
            assert_eq!(params.len(), 2);
            assert!(a.rewrite);
        }
        other => panic!("expected a merged Abs, got {other:?}"),
    }
}

/// A binding non-trivial and large enough to dodge every inlining rule.
fn opaque_binding() -> Rc<BackendExpr> {
    build(BackendSyntax::App(
        var(),
        NonEmptyVec::from_vec(vec![int_lit(1), int_lit(2), int_lit(3), int_lit(4)]).unwrap(),
    ))
}

/// Two references to `level`, so `shouldInlineLet`'s single-use rule
/// doesn't fire either.
fn double_use(level: Level) -> Rc<BackendExpr> {
    build(BackendSyntax::App(
        local(None, level),
        NonEmptyVec::new(local(None, level)),
    ))
}

#[test]
fn flattens_let_under_let_into_let_assoc() {
    let l0 = Level(0);
    let l1 = Level(1);
    let inner_let = build(BackendSyntax::Let(None, l1, opaque_binding(), double_use(l1)));
    let outer_let = build(BackendSyntax::Let(None, l0, inner_let, double_use(l0)));

    match outer_let.as_ref() {
        BackendExpr::Rewrite(a, Rewrite::LetAssoc(bindings, _)) => {
            assert_eq!(bindings.len(), 2);
            assert_eq!(bindings[0].level, l1);
            assert_eq!(bindings[1].level, l0);
            assert!(a.rewrite);
        }
        other => panic!("expected a LetAssoc, got {other:?}"),
    }
}

#[test]
fn extends_existing_let_assoc_with_another_binding() {
    let l0 = Level(0);
    let l1 = Level(1);
    let l2 = Level(2);
    let inner_let = build(BackendSyntax::Let(None, l1, opaque_binding(), double_use(l1)));
    let let_assoc = build(BackendSyntax::Let(None, l0, inner_let, double_use(l0)));
    let outer_let = build(BackendSyntax::Let(None, l2, let_assoc, double_use(l2)));

    match outer_let.as_ref() {
        BackendExpr::Rewrite(_, Rewrite::LetAssoc(bindings, _)) => {
            assert_eq!(bindings.len(), 3);
            assert_eq!(bindings[2].level, l2);
        }
        other => panic!("expected a 3-binding LetAssoc, got {other:?}"),
    }
}

#[test]
fn inlines_a_dead_let() {
    let l0 = Level(0);
    let binding = int_lit(42);
    let body = int_lit(0); // doesn't reference l0 at all
    let result = build(BackendSyntax::Let(None, l0, binding, body));

    assert!(matches!(
        result.as_ref(),
        BackendExpr::Rewrite(_, Rewrite::Inline(_, _, _, _))
    ));
}

#[test]
fn inlines_a_trivial_small_binding() {
    let l0 = Level(0);
    let binding = int_lit(1);
    let body = local(None, l0); // single use, trivial
    let result = build(BackendSyntax::Let(None, l0, binding, body));

    assert!(matches!(
        result.as_ref(),
        BackendExpr::Rewrite(_, Rewrite::Inline(_, _, _, _))
    ));
}

#[test]
fn keeps_a_let_with_a_multiply_used_nontrivial_binding() {
    let l0 = Level(0);
    // A nontrivial, multiply referenced binding: an application.
    let binding = build(BackendSyntax::App(var(), NonEmptyVec::new(int_lit(1))));
    let body = build(BackendSyntax::App(
        local(None, l0),
        NonEmptyVec::new(local(None, l0)),
    ));
    let result = build(BackendSyntax::Let(None, l0, binding, body));

    assert!(matches!(
        result.as_ref(),
        BackendExpr::Syntax(_, BackendSyntax::Let(_, _, _, _))
    ));
}

#[test]
fn keeps_a_single_use_let_when_the_use_is_captured_in_an_abs() {
    let l0 = Level(0);
    let l1 = Level(1);
    let binding = opaque_binding();
    // body = \_ -> x — one textual reference to `x`, but under a closure
    // that may be called any number of times, so it isn't safe to treat
    // as a single evaluation the way an uncaptured single use would be.
    let body = build(BackendSyntax::Abs(
        NonEmptyVec::new((None, l1)),
        local(None, l0),
    ));
    let result = build(BackendSyntax::Let(None, l0, binding, body));

    assert!(matches!(
        result.as_ref(),
        BackendExpr::Syntax(_, BackendSyntax::Let(_, _, _, _))
    ));
}

#[test]
fn eta_contracts_single_arg_abstraction_over_a_reference() {
    let l0 = Level(0);
    let hd = var();
    let app = build(BackendSyntax::App(hd.clone(), NonEmptyVec::new(local(None, l0))));
    let abs = build(BackendSyntax::Abs(NonEmptyVec::new((None, l0)), app));

    assert!(Rc::ptr_eq(&abs, &hd));
}

#[test]
fn does_not_eta_contract_self_application() {
    let l0 = Level(0);
    let app = build(BackendSyntax::App(
        local(None, l0),
        NonEmptyVec::new(local(None, l0)),
    ));
    let abs = build(BackendSyntax::Abs(NonEmptyVec::new((None, l0)), app));

    assert!(matches!(
        abs.as_ref(),
        BackendExpr::Syntax(_, BackendSyntax::Abs(_, _))
    ));
}

#[test]
fn empty_branch_table_collapses_to_its_default() {
    let def = int_lit(9);
    let result = build(BackendSyntax::Branch(vec![], Some(def.clone())));
    assert!(Rc::ptr_eq(&result, &def));
}

#[test]
fn merges_branch_default_chain() {
    let pred1 = build(BackendSyntax::Lit(Literal::Bool(false)));
    let body1 = int_lit(1);
    let pred2 = build(BackendSyntax::Lit(Literal::Bool(false)));
    let body2 = int_lit(2);
    let def = int_lit(0);

    let inner = build(BackendSyntax::Branch(
        vec![(pred2, body2)],
        Some(def.clone()),
    ));
    let outer = build(BackendSyntax::Branch(vec![(pred1, body1)], Some(inner)));

    match outer.as_ref() {
        BackendExpr::Syntax(_, BackendSyntax::Branch(branches, default)) => {
            assert_eq!(branches.len(), 2);
            assert!(default.as_ref().map(|d| Rc::ptr_eq(d, &def)).unwrap_or(false));
        }
        other => panic!("expected a merged Branch, got {other:?}"),
    }
}
