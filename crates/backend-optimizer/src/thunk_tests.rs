use std::cell::Cell;
use std::rc::Rc;

use super::*;

#[test]
fn force_runs_the_closure_exactly_once() {
    let calls = Rc::new(Cell::new(0));
    let calls_inner = calls.clone();
    let t = Thunk::new(move || {
        calls_inner.set(calls_inner.get() + 1);
        BackendSemantics::bool_lit(true)
    });

    assert_eq!(t.force().as_bool(), Some(true));
    assert_eq!(t.force().as_bool(), Some(true));
    assert_eq!(calls.get(), 1);
}

#[test]
fn forced_skips_the_closure_entirely() {
    let t = Thunk::forced(BackendSemantics::bool_lit(false));
    assert_eq!(t.force().as_bool(), Some(false));
}

#[test]
fn clone_shares_the_same_memoized_cell() {
    let calls = Rc::new(Cell::new(0));
    let calls_inner = calls.clone();
    let t = Thunk::new(move || {
        calls_inner.set(calls_inner.get() + 1);
        BackendSemantics::bool_lit(true)
    });
    let t2 = t.clone();

    t.force();
    t2.force();
    assert_eq!(calls.get(), 1);
}

#[test]
#[should_panic(expected = "reentrantly")]
fn reentrant_force_panics_instead_of_looping() {
    let t = Rc::new(std::cell::RefCell::new(None::<Thunk>));
    let t_inner = t.clone();
    let thunk = Thunk::new(move || t_inner.borrow().as_ref().unwrap().force());
    *t.borrow_mut() = Some(thunk.clone());
    thunk.force();
}
