//! A single-slot memoized cell, guarded by a forced/unforced flag (§9).
//!
//! Backs `App` spine arguments and `Branch` predicates/bodies so that an
//! argument or branch that's never inspected never gets evaluated, and one
//! that's inspected more than once (e.g. a branch body absorbed into a
//! resumed match, see `quote::SemBranchTry`) is only evaluated once.
//! Single-threaded per §5 — no atomics, no `Send`/`Sync` bound.

use std::cell::RefCell;
use std::rc::Rc;

use crate::semantics::BackendSemantics;

enum ThunkRepr {
    Unforced(Box<dyn FnOnce() -> BackendSemantics>),
    Forcing,
    Forced(BackendSemantics),
}

#[derive(Clone)]
pub struct Thunk(Rc<RefCell<ThunkRepr>>);

impl Thunk {
    pub fn new(f: impl FnOnce() -> BackendSemantics + 'static) -> Self {
        Thunk(Rc::new(RefCell::new(ThunkRepr::Unforced(Box::new(f)))))
    }

    pub fn forced(value: BackendSemantics) -> Self {
        Thunk(Rc::new(RefCell::new(ThunkRepr::Forced(value))))
    }

    /// Force the thunk, memoizing the result. Subsequent calls return the
    /// cached value without re-running the closure.
    pub fn force(&self) -> BackendSemantics {
        let repr = std::mem::replace(&mut *self.0.borrow_mut(), ThunkRepr::Forcing);
        match repr {
            ThunkRepr::Forced(v) => {
                *self.0.borrow_mut() = ThunkRepr::Forced(v.clone());
                v
            }
            ThunkRepr::Unforced(f) => {
                let v = f();
                *self.0.borrow_mut() = ThunkRepr::Forced(v.clone());
                v
            }
            ThunkRepr::Forcing => {
                panic!("thunk forced reentrantly — the IR contains a non-productive cycle")
            }
        }
    }
}

impl std::fmt::Debug for Thunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &*self.0.borrow() {
            ThunkRepr::Forced(_) => write!(f, "Thunk(forced)"),
            ThunkRepr::Forcing => write!(f, "Thunk(forcing)"),
            ThunkRepr::Unforced(_) => write!(f, "Thunk(unforced)"),
        }
    }
}

#[cfg(test)]
mod thunk_tests;
