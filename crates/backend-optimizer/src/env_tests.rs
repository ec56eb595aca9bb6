use std::rc::Rc;

use backend_ir::{Ident, ModuleName, Symbol};
use indexmap::IndexMap;

use super::*;

fn ident(n: u32) -> Ident {
    Ident(Symbol::from_raw(n))
}

fn module() -> ModuleName {
    ModuleName(Symbol::from_raw(9999))
}

fn no_externs() -> Env {
    Env::new(module(), Rc::new(|_, _, _| None))
}

#[test]
fn next_level_tracks_how_many_locals_are_bound() {
    let env = no_externs();
    assert_eq!(env.next_level().0, 0);
    let env = env.extend_single(BackendSemantics::bool_lit(true));
    assert_eq!(env.next_level().0, 1);
}

#[test]
fn extend_single_binds_at_the_next_level_and_leaves_the_parent_untouched() {
    let env = no_externs();
    let extended = env.extend_single(BackendSemantics::bool_lit(true));
    assert_eq!(extended.lookup(None, Level(0)).as_bool(), Some(true));
    assert_eq!(env.next_level().0, 0);
}

#[test]
fn extend_group_points_every_slot_at_the_same_member_map() {
    let env = no_externs();
    let mut members = IndexMap::new();
    members.insert(ident(0), BackendSemantics::bool_lit(true));
    members.insert(ident(1), BackendSemantics::bool_lit(false));
    let members = Rc::new(members);
    let env = env.extend_group(members, 2);

    assert_eq!(env.lookup(Some(ident(0)), Level(0)).as_bool(), Some(true));
    assert_eq!(env.lookup(Some(ident(1)), Level(1)).as_bool(), Some(false));
    // Both levels point at the same group, so either level can see either member.
    assert_eq!(env.lookup(Some(ident(1)), Level(0)).as_bool(), Some(false));
}

#[test]
#[should_panic(expected = "unbound local reference")]
fn lookup_panics_on_an_unbound_level() {
    let env = no_externs();
    env.lookup(None, Level(0));
}

#[test]
#[should_panic(expected = "no identifier to disambiguate")]
fn lookup_panics_on_a_group_reference_missing_its_ident() {
    let env = no_externs();
    let mut members = IndexMap::new();
    members.insert(ident(0), BackendSemantics::bool_lit(true));
    let env = env.extend_group(Rc::new(members), 1);
    env.lookup(None, Level(0));
}

#[test]
#[should_panic(expected = "absent from its own recursive group")]
fn lookup_panics_on_an_ident_absent_from_its_group() {
    let env = no_externs();
    let mut members = IndexMap::new();
    members.insert(ident(0), BackendSemantics::bool_lit(true));
    let env = env.extend_group(Rc::new(members), 1);
    env.lookup(Some(ident(99)), Level(0));
}
