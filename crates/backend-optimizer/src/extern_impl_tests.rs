use std::rc::Rc;

use backend_ir::{
    Accessor, BackendSyntax, EvalRef, Ident, InlineDirective, Literal, ModuleName, NonEmptyVec,
    Qualified, Rewrite, Symbol,
};
use indexmap::IndexMap;

use super::*;
use crate::env::Env;
use crate::quote::{quote, Ctx};
use crate::semantics::{BackendNeutral, BackendSemantics, ExternSpine};
use crate::thunk::Thunk;

fn ident(n: u32) -> Ident {
    Ident(Symbol::from_raw(n))
}

fn module() -> ModuleName {
    ModuleName(Symbol::from_raw(9999))
}

fn qual(n: u32) -> Qualified<Ident> {
    Qualified::new(module(), ident(n))
}

fn no_externs() -> Env {
    Env::new(module(), Rc::new(|_, _, _| None))
}

fn no_directives() -> DirectiveTable {
    Rc::new(IndexMap::new())
}

fn as_int(sem: &BackendSemantics) -> Option<i64> {
    match sem {
        BackendSemantics::Neutral(n) => match n.as_ref() {
            BackendNeutral::Lit(Literal::Int(i)) => Some(*i),
            _ => None,
        },
        _ => None,
    }
}

fn int_thunk(n: i64) -> Thunk {
    Thunk::forced(BackendSemantics::neutral(BackendNeutral::Lit(Literal::Int(n))))
}

/// `e = Var qual(9)` — a trivial forwarding reference, grounded by §4.6's
/// "spine empty, `e` is `Var _`: evaluate `e`" case.
fn forwarding_expr() -> Rc<BackendExpr> {
    crate::build::build(BackendSyntax::Var(qual(9)))
}

#[test]
fn expr_impl_with_empty_spine_forwards_a_bare_var() {
    let env = no_externs();
    let imp = Impl::Expr(forwarding_expr());
    let resolved = eval_extern_from_impl_pub(&env, &imp, &[]);

    assert!(matches!(resolved, Some(BackendSemantics::Extern(q, _, _)) if q == qual(9)));
}

#[test]
fn expr_impl_declines_a_non_var_body_with_empty_spine() {
    let env = no_externs();
    let body = crate::build::build(BackendSyntax::Lit(Literal::Int(1)));
    let imp = Impl::Expr(body);

    assert!(eval_extern_from_impl_pub(&env, &imp, &[]).is_none());
}

#[test]
fn expr_impl_projects_a_property_out_of_a_record_literal() {
    let env = no_externs();
    let record = crate::build::build(BackendSyntax::Lit(Literal::Record(vec![(
        Rc::from("x"),
        crate::build::build(BackendSyntax::Lit(Literal::Int(5))),
    )])));
    let imp = Impl::Expr(record);
    let spine = [ExternSpine::Accessor(Accessor::GetProp(Rc::from("x")))];

    let resolved = eval_extern_from_impl_pub(&env, &imp, &spine);
    assert_eq!(resolved.as_ref().and_then(as_int), Some(5));
}

#[test]
fn expr_impl_declines_a_property_absent_from_the_record() {
    let env = no_externs();
    let record = crate::build::build(BackendSyntax::Lit(Literal::Record(vec![])));
    let imp = Impl::Expr(record);
    let spine = [ExternSpine::Accessor(Accessor::GetProp(Rc::from("missing")))];

    assert!(eval_extern_from_impl_pub(&env, &imp, &spine).is_none());
}

/// `\x -> x`, trivial enough that `shouldInlineExternApp` always fires.
fn identity_fn() -> Rc<BackendExpr> {
    let l0 = backend_ir::Level(0);
    let body = crate::build::build(BackendSyntax::Local(None, l0));
    crate::build::build(BackendSyntax::Abs(NonEmptyVec::new((None, l0)), body))
}

#[test]
fn expr_impl_inlines_a_cheap_application() {
    let env = no_externs();
    let imp = Impl::Expr(identity_fn());
    let spine = [ExternSpine::App(Rc::new(vec![int_thunk(3)]))];

    let resolved = eval_extern_from_impl_pub(&env, &imp, &spine);
    let mut ctx = crate::quote::Ctx::new();
    let quoted = quote(&mut ctx, &resolved.expect("expected the application to inline"));
    assert!(matches!(
        quoted.as_ref(),
        BackendExpr::Rewrite(_, Rewrite::Inline(_, _, _, _))
    ));
}

/// A large, non-trivial, full-arity body that dodges every branch of
/// `shouldInlineExternApp`.
fn opaque_fn_of_arity(arity: usize) -> Rc<BackendExpr> {
    let params: Vec<_> = (0..arity as u32).map(|i| (None, backend_ir::Level(i))).collect();
    let hd = crate::build::build(BackendSyntax::Var(qual(1)));
    let mut app_args = Vec::new();
    for _ in 0..200 {
        app_args.push(crate::build::build(BackendSyntax::Lit(Literal::Int(0))));
    }
    let body = crate::build::build(BackendSyntax::App(hd, NonEmptyVec::from_vec(app_args).unwrap()));
    crate::build::build(BackendSyntax::Abs(NonEmptyVec::from_vec(params).unwrap(), body))
}

#[test]
fn expr_impl_declines_an_expensive_application() {
    let env = no_externs();
    let imp = Impl::Expr(opaque_fn_of_arity(1));
    let spine = [ExternSpine::App(Rc::new(vec![int_thunk(3)]))];

    assert!(eval_extern_from_impl_pub(&env, &imp, &spine).is_none());
}

#[test]
fn ctor_impl_with_matching_arity_realizes_as_data() {
    let env = no_externs();
    let fields = vec![ident(0), ident(1)];
    let imp = Impl::Ctor(qual(2), Rc::from("Pair"), fields);
    let spine = [ExternSpine::App(Rc::new(vec![int_thunk(1), int_thunk(2)]))];

    let resolved = eval_extern_from_impl_pub(&env, &imp, &spine);
    assert!(matches!(
        resolved,
        Some(BackendSemantics::Neutral(n)) if matches!(n.as_ref(), BackendNeutral::Data(_, _, fs) if fs.len() == 2)
    ));
}

#[test]
fn ctor_impl_declines_a_mismatched_arity() {
    let env = no_externs();
    let imp = Impl::Ctor(qual(2), Rc::from("Pair"), vec![ident(0), ident(1)]);
    let spine = [ExternSpine::App(Rc::new(vec![int_thunk(1)]))];

    assert!(eval_extern_from_impl_pub(&env, &imp, &spine).is_none());
}

#[test]
fn nullary_ctor_impl_with_empty_spine_realizes_as_data() {
    let env = no_externs();
    let imp = Impl::Ctor(qual(3), Rc::from("Nothing"), vec![]);
    let resolved = eval_extern_from_impl_pub(&env, &imp, &[]);
    assert!(matches!(
        resolved,
        Some(BackendSemantics::Neutral(n)) if matches!(n.as_ref(), BackendNeutral::Data(_, _, fs) if fs.is_empty())
    ));
}

#[test]
fn dict_impl_inlines_a_property_application() {
    let env = no_externs();
    let mut props = IndexMap::new();
    props.insert(Rc::from("id") as Rc<str>, Impl::Expr(identity_fn()));
    let imp = Impl::Dict(Rc::new(props));
    let spine = [
        ExternSpine::Accessor(Accessor::GetProp(Rc::from("id"))),
        ExternSpine::App(Rc::new(vec![int_thunk(4)])),
    ];

    assert!(eval_extern_from_impl_pub(&env, &imp, &spine).is_some());
}

#[test]
fn dict_impl_declines_a_bare_property_projection() {
    let env = no_externs();
    let mut props = IndexMap::new();
    props.insert(Rc::from("id") as Rc<str>, Impl::Expr(identity_fn()));
    let imp = Impl::Dict(Rc::new(props));
    let spine = [ExternSpine::Accessor(Accessor::GetProp(Rc::from("id")))];

    assert!(eval_extern_from_impl_pub(&env, &imp, &spine).is_none());
}

#[test]
fn never_directive_overrides_a_cheap_default_inline() {
    let env = no_externs();
    let imp = Impl::Expr(identity_fn());
    let spine = [ExternSpine::App(Rc::new(vec![int_thunk(3)]))];
    let mut directives = IndexMap::new();
    directives.insert(EvalRef::top_level(qual(0)), InlineDirective::Never);

    let resolved = super::eval_extern_from_impl(&env, qual(0), &imp, &spine, &Rc::new(directives));
    assert!(resolved.is_none());
}

#[test]
fn always_directive_overrides_an_expensive_default_decline() {
    let env = no_externs();
    let imp = Impl::Expr(opaque_fn_of_arity(1));
    let spine = [ExternSpine::App(Rc::new(vec![int_thunk(3)]))];
    let mut directives = IndexMap::new();
    directives.insert(EvalRef::top_level(qual(0)), InlineDirective::Always);

    let resolved = super::eval_extern_from_impl(&env, qual(0), &imp, &spine, &Rc::new(directives));
    assert!(resolved.is_some());
}

#[test]
fn arity_n_directive_gates_on_supplied_argument_count() {
    let env = no_externs();
    let imp = Impl::Expr(opaque_fn_of_arity(2));
    let mut directives = IndexMap::new();
    directives.insert(EvalRef::top_level(qual(0)), InlineDirective::ArityN(2));

    let one_arg = [ExternSpine::App(Rc::new(vec![int_thunk(3)]))];
    assert!(
        super::eval_extern_from_impl(&env, qual(0), &imp, &one_arg, &Rc::new(directives.clone()))
            .is_none()
    );

    let two_args = [ExternSpine::App(Rc::new(vec![int_thunk(3), int_thunk(4)]))];
    assert!(
        super::eval_extern_from_impl(&env, qual(0), &imp, &two_args, &Rc::new(directives)).is_some()
    );
}

#[test]
fn directive_on_a_dict_entry_is_keyed_by_its_accessor_path() {
    let env = no_externs();
    let mut props = IndexMap::new();
    props.insert(Rc::from("id") as Rc<str>, Impl::Expr(opaque_fn_of_arity(1)));
    let imp = Impl::Dict(Rc::new(props));
    let spine = [
        ExternSpine::Accessor(Accessor::GetProp(Rc::from("id"))),
        ExternSpine::App(Rc::new(vec![int_thunk(4)])),
    ];
    let mut directives = IndexMap::new();
    directives.insert(
        EvalRef {
            binding: qual(0),
            path: Rc::from(vec![Accessor::GetProp(Rc::from("id"))].into_boxed_slice()),
        },
        InlineDirective::Always,
    );

    let resolved = super::eval_extern_from_impl(&env, qual(0), &imp, &spine, &Rc::new(directives));
    assert!(resolved.is_some());
}

#[test]
fn rec_impl_never_resolves() {
    let env = no_externs();
    assert!(eval_extern_from_impl_pub(&env, &Impl::Rec, &[]).is_none());
}

#[test]
fn table_lookup_wires_eval_extern_through_to_the_impl() {
    let mut table = IndexMap::new();
    table.insert(qual(0), Impl::Expr(forwarding_expr()));
    let eval_extern = eval_extern_from_impls(Rc::new(table), no_directives());
    let env = Env::new(module(), eval_extern);

    let resolved = (env.eval_extern)(&env, qual(0), &[]);
    assert!(matches!(resolved, Some(BackendSemantics::Extern(q, _, _)) if q == qual(9)));

    // A name absent from the table stays unresolved.
    assert!((env.eval_extern)(&env, qual(42), &[]).is_none());
}

/// Test-only re-export: `eval_extern_from_impl` is private to the module
/// (only the built `EvalExtern` closure is public API), but the resolution
/// policy per `Impl` variant is exactly what these tests exercise.
fn eval_extern_from_impl_pub(env: &Env, imp: &Impl, spine: &[ExternSpine]) -> Option<BackendSemantics> {
    super::eval_extern_from_impl(env, qual(0), imp, spine, &no_directives())
}
