//! `BackendSemantics`: the NbE evaluation target (§3, §4.1).
//!
//! `SemLam`/`SemLet`/`SemLetRec` are represented as host closures over
//! `BackendSemantics` (option (a) from §9's design note — chosen for
//! legibility, see `DESIGN.md`). `SemLetRec`'s mutual binding is broken
//! with the arena-indexed-handle approach from §9: each member and the
//! body are host functions that accept the *already-realized* group (a
//! slice of `BackendSemantics`, one per member) rather than closing over
//! a self-referential thunk, so tying the knot is the caller's job — the
//! quoter supplies fresh `NeutLocal` placeholders as the realization.

use std::rc::Rc;

use backend_ir::{Accessor, Guard, Ident, Level, Literal, Qualified};

use crate::thunk::Thunk;

/// A host closure from one semantic value to another.
pub type SemFn1 = Rc<dyn Fn(BackendSemantics) -> BackendSemantics>;

/// A host closure realizing a `LetRec` group member or body, given the
/// group's tied-together semantic realization.
pub type GroupFn = Rc<dyn Fn(&[BackendSemantics]) -> BackendSemantics>;

/// One entry in an unresolved extern's accumulated spine (§3 `ExternSpine`).
/// Consecutive `App` entries coalesce into one (`evalApp`/`evalAccessor`).
#[derive(Clone)]
pub enum ExternSpine {
    App(Rc<Vec<Thunk>>),
    Accessor(Accessor),
}

/// A recursive-group realization: one host function per bound member plus
/// one for the body, each taking the tied group's semantic realization.
pub struct LetRecGroup {
    pub members: Vec<(Ident, GroupFn)>,
    pub body: GroupFn,
}

#[derive(Clone)]
pub enum BackendSemantics {
    /// An unresolved reference to an imported definition: the qualified
    /// name, the spine of operations accumulated on it so far, and a lazy
    /// fallback that reifies it as a neutral if it never resolves.
    Extern(Qualified<Ident>, Rc<Vec<ExternSpine>>, Thunk),
    Lam(Option<Ident>, SemFn1),
    Let(Option<Ident>, Rc<BackendSemantics>, SemFn1),
    LetRec(Rc<LetRecGroup>),
    /// Monadic sequencing — mirrors `Let` but is never subject to the
    /// let-floating commuting conversions (§4.4).
    EffectBind(Option<Ident>, Rc<BackendSemantics>, SemFn1),
    EffectPure(Rc<BackendSemantics>),
    /// A stuck multi-way test whose scrutinees are evaluated but not yet
    /// resolved (§4.1.4). The default, like every branch body, stays a
    /// `Thunk` until something actually forces it.
    Branch(Rc<Vec<(Thunk, Thunk)>>, Option<Thunk>),
    /// A "partial match" continuation: a resolved branch's body packaged
    /// with the branches it didn't get to try, for the quoter to resume
    /// via `ctx.resume_branch` (§4.3).
    BranchTry(Rc<BackendSemantics>, Rc<Vec<(Thunk, Thunk)>>, Option<Thunk>),
    Accessor(Rc<BackendSemantics>, Accessor),
    Update(Rc<BackendSemantics>, Rc<Vec<(Rc<str>, BackendSemantics)>>),
    Neutral(Rc<BackendNeutral>),
}

/// A value stuck on an unknown (§3).
#[derive(Clone)]
pub enum BackendNeutral {
    /// A local bound during quoting, at a freshly allocated level.
    Local(Option<Ident>, Level),
    /// An imported variable that never got an extern resolution.
    Var(Qualified<Ident>),
    /// Partially or fully applied data: constructor tag plus fields in
    /// declaration order.
    Data(Qualified<Ident>, Rc<str>, Vec<(Ident, Thunk)>),
    CtorDef(Rc<str>, Vec<Ident>),
    /// Application of a neutral to further arguments; consecutive `App`s
    /// collapse into one (evalApp §4.1.1).
    App(Rc<BackendNeutral>, Vec<Thunk>),
    Accessor(Rc<BackendNeutral>, Accessor),
    Update(Rc<BackendNeutral>, Vec<(Rc<str>, BackendSemantics)>),
    Test(Rc<BackendNeutral>, Guard),
    /// A literal whose sub-values are themselves (possibly stuck) semantics.
    Lit(Literal<BackendSemantics>),
    Fail(Rc<str>),
    /// A semantics value applied to, projected out of, or tested against
    /// directly rather than through a bare `Var`/`Local` reference — a
    /// stuck `Branch`, `LetRec`, `EffectPure`, and the like (§4.1.1's
    /// final "otherwise" rule). Quoting just quotes the wrapped value in
    /// place; it's opaque to every other neutral-specific rewrite.
    Opaque(Rc<BackendSemantics>),
}

impl BackendSemantics {
    pub fn neutral(n: BackendNeutral) -> Self {
        BackendSemantics::Neutral(Rc::new(n))
    }

    pub fn bool_lit(b: bool) -> Self {
        BackendSemantics::neutral(BackendNeutral::Lit(Literal::Bool(b)))
    }

    /// If this value is a literal boolean, return it.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            BackendSemantics::Neutral(n) => match n.as_ref() {
                BackendNeutral::Lit(Literal::Bool(b)) => Some(*b),
                _ => None,
            },
            _ => None,
        }
    }
}

// Host closures aren't `Debug`; these print the variant name only, which
// is all `panic!`/assertion failure messages in this crate ever need.
impl std::fmt::Debug for BackendSemantics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendSemantics::Extern(q, ..) => write!(f, "SemExtern({q:?})"),
            BackendSemantics::Lam(..) => write!(f, "SemLam"),
            BackendSemantics::Let(..) => write!(f, "SemLet"),
            BackendSemantics::LetRec(..) => write!(f, "SemLetRec"),
            BackendSemantics::EffectBind(..) => write!(f, "SemEffectBind"),
            BackendSemantics::EffectPure(..) => write!(f, "SemEffectPure"),
            BackendSemantics::Branch(..) => write!(f, "SemBranch"),
            BackendSemantics::BranchTry(..) => write!(f, "SemBranchTry"),
            BackendSemantics::Accessor(_, acc) => write!(f, "SemAccessor({acc:?})"),
            BackendSemantics::Update(..) => write!(f, "SemUpdate"),
            BackendSemantics::Neutral(n) => write!(f, "SemNeutral({n:?})"),
        }
    }
}

impl std::fmt::Debug for BackendNeutral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendNeutral::Local(_, level) => write!(f, "NeutLocal({level:?})"),
            BackendNeutral::Var(q) => write!(f, "NeutVar({q:?})"),
            BackendNeutral::Data(q, tag, fields) => {
                write!(f, "NeutData({q:?}, {tag:?}, {} fields)", fields.len())
            }
            BackendNeutral::CtorDef(tag, _) => write!(f, "NeutCtorDef({tag:?})"),
            BackendNeutral::App(hd, args) => write!(f, "NeutApp({hd:?}, {} args)", args.len()),
            BackendNeutral::Accessor(lhs, acc) => write!(f, "NeutAccessor({lhs:?}, {acc:?})"),
            BackendNeutral::Update(lhs, _) => write!(f, "NeutUpdate({lhs:?})"),
            BackendNeutral::Test(lhs, guard) => write!(f, "NeutTest({lhs:?}, {guard:?})"),
            BackendNeutral::Lit(_) => write!(f, "NeutLit"),
            BackendNeutral::Fail(msg) => write!(f, "NeutFail({msg:?})"),
            BackendNeutral::Opaque(sem) => write!(f, "NeutOpaque({sem:?})"),
        }
    }
}
