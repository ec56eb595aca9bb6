//! The evaluator's environment (§3 `Env`).
//!
//! Local bindings are stored in an append-only `Vec` indexed directly by
//! `Level` — the quoter allocates levels in the same order the evaluator
//! pushes onto this vector, so `locals[level.0 as usize]` is always the
//! binder `level` refers to. A `LetRec` group occupies one slot per
//! member, every slot pointing at the same shared member map (lookup
//! within the group is then by `Ident`, not position, matching `Local`'s
//! own `(Option<Ident>, Level)` shape).

use std::rc::Rc;

use backend_ir::{Ident, Level, ModuleName, Qualified};
use indexmap::IndexMap;

use crate::semantics::{BackendSemantics, ExternSpine};

#[derive(Clone)]
pub enum Binding {
    Single(BackendSemantics),
    Group(Rc<IndexMap<Ident, BackendSemantics>>),
}

/// The extern-lookup callback (§3, §4.6): given the current env, a
/// qualified name, and the spine accumulated on it so far, return the
/// resolved semantics, or `None` to leave it as an unresolved extern.
pub type EvalExtern = Rc<dyn Fn(&Env, Qualified<Ident>, &[ExternSpine]) -> Option<BackendSemantics>>;

#[derive(Clone)]
pub struct Env {
    pub module: ModuleName,
    pub eval_extern: EvalExtern,
    locals: Rc<Vec<Binding>>,
}

impl Env {
    pub fn new(module: ModuleName, eval_extern: EvalExtern) -> Self {
        Env {
            module,
            eval_extern,
            locals: Rc::new(Vec::new()),
        }
    }

    pub fn next_level(&self) -> Level {
        Level(self.locals.len() as u32)
    }

    /// Extend with one fresh single-value binding (`Abs`/`Let`/`EffectBind`).
    pub fn extend_single(&self, value: BackendSemantics) -> Env {
        let mut locals = (*self.locals).clone();
        locals.push(Binding::Single(value));
        Env {
            module: self.module,
            eval_extern: self.eval_extern.clone(),
            locals: Rc::new(locals),
        }
    }

    /// Extend with `count` slots all pointing at the same recursive group
    /// (`LetRec`'s members occupy contiguous levels).
    pub fn extend_group(&self, members: Rc<IndexMap<Ident, BackendSemantics>>, count: usize) -> Env {
        let mut locals = (*self.locals).clone();
        for _ in 0..count {
            locals.push(Binding::Group(members.clone()));
        }
        Env {
            module: self.module,
            eval_extern: self.eval_extern.clone(),
            locals: Rc::new(locals),
        }
    }

    /// Look up a bound `Local`. `ident` disambiguates within a recursive
    /// group; it's ignored for a single binding.
    ///
    /// # Panics
    /// Panics if `level` is unbound, or if `ident` is absent from its own
    /// recursive group — both are programmer errors in the IR producer
    /// (§7), not recoverable conditions.
    pub fn lookup(&self, ident: Option<Ident>, level: Level) -> BackendSemantics {
        match self.locals.get(level.0 as usize) {
            Some(Binding::Single(v)) => v.clone(),
            Some(Binding::Group(members)) => {
                let ident = ident.unwrap_or_else(|| {
                    panic!("unbound recursive-group reference at level {}: no identifier to disambiguate", level.0)
                });
                members.get(&ident).cloned().unwrap_or_else(|| {
                    panic!(
                        "identifier absent from its own recursive group at level {}",
                        level.0
                    )
                })
            }
            None => panic!("unbound local reference at level {} — malformed IR", level.0),
        }
    }
}

#[cfg(test)]
mod env_tests;
