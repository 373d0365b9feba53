// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// Tests for element sensitive and smashed array abstractions.

mod common;

use std::rc::Rc;

use common::*;
use test_log::test;
use varsens::abstract_object::AbstractObject;
use varsens::array_object::ArrayValue;
use varsens::environment::Environment;
use varsens::errors::AccessError;
use varsens::expression::Expression;
use varsens::options::{ArrayStrategy, Options, ScalarDomainKind};
use varsens::path::Path;
use varsens::types::Namespace;

fn fill_with(env: &mut Environment, ns: &Namespace, value: i128) {
    let arr = sym(ns, "arr");
    let filled = Expression::ArrayOf {
        value: Box::new(int_const(value)),
        ty: ns.lookup("arr").ty.clone(),
    };
    env.assign(&arr, &filled).unwrap();
}

fn array_value(env: &Environment, ns: &Namespace) -> ArrayValue {
    let root = Path::new_variable(Rc::from("arr"), ns.lookup("arr").ty.clone());
    match env.value_at(&root).map(|v| v.as_ref()) {
        Some(AbstractObject::Array(a)) => a.value().clone(),
        other => panic!("expected an array, found {:?}", other),
    }
}

fn unknown_index(ns: &Namespace) -> Expression {
    Expression::index(sym(ns, "arr"), sym(ns, "i")).unwrap()
}

#[test]
fn smashed_array_summarizes_every_write() {
    let ns = namespace();
    let mut env = environment(
        &ns,
        options(ScalarDomainKind::Intervals, ArrayStrategy::Smashed),
    );
    fill_with(&mut env, &ns, 0);
    assert!(matches!(array_value(&env, &ns), ArrayValue::Smashed(..)));

    assign_int(&mut env, &unknown_index(&ns), 7);

    let range = read_interval(&env, &index(sym(&ns, "arr"), 3));
    assert_eq!(range.lower_bound(), Some(0));
    assert_eq!(range.upper_bound(), Some(7));
}

#[test]
fn smashed_array_write_at_a_constant_index_is_weak() {
    let ns = namespace();
    let mut env = environment(
        &ns,
        options(ScalarDomainKind::Intervals, ArrayStrategy::Smashed),
    );
    fill_with(&mut env, &ns, 1);
    assign_int(&mut env, &index(sym(&ns, "arr"), 2), 4);

    for i in [0, 2, 9] {
        let range = read_interval(&env, &index(sym(&ns, "arr"), i));
        assert_eq!(range.lower_bound(), Some(1));
        assert_eq!(range.upper_bound(), Some(4));
    }
}

#[test]
fn elements_at_constant_indices_are_tracked_separately() {
    let ns = namespace();
    let mut env = constants_environment(&ns);
    let arr = sym(&ns, "arr");
    assign_int(&mut env, &index(arr.clone(), 0), 1);
    assign_int(&mut env, &index(arr.clone(), 1), 2);

    assert_eq!(read_int(&env, &index(arr.clone(), 0)), Some(1));
    assert_eq!(read_int(&env, &index(arr.clone(), 1)), Some(2));
    assert!(env.read(&index(arr.clone(), 5)).unwrap().is_top());

    assign_int(&mut env, &index(arr.clone(), 0), 3);
    assert_eq!(read_int(&env, &index(arr.clone(), 0)), Some(3));
    assert_eq!(read_int(&env, &index(arr, 1)), Some(2));
}

#[test]
fn read_at_an_unknown_index_merges_all_elements() {
    let ns = namespace();
    let mut env = intervals_environment(&ns);
    fill_with(&mut env, &ns, 0);
    assign_int(&mut env, &index(sym(&ns, "arr"), 1), 2);

    let range = read_interval(&env, &unknown_index(&ns));
    assert_eq!(range.lower_bound(), Some(0));
    assert_eq!(range.upper_bound(), Some(2));

    let mut constants = constants_environment(&ns);
    fill_with(&mut constants, &ns, 0);
    assign_int(&mut constants, &index(sym(&ns, "arr"), 1), 2);
    assert!(constants.read(&unknown_index(&ns)).unwrap().is_top());
}

#[test]
fn write_at_an_unknown_index_is_weak_everywhere() {
    let ns = namespace();
    let mut env = intervals_environment(&ns);
    fill_with(&mut env, &ns, 0);
    assign_int(&mut env, &index(sym(&ns, "arr"), 1), 2);

    assign_int(&mut env, &unknown_index(&ns), 5);

    let tracked = read_interval(&env, &index(sym(&ns, "arr"), 1));
    assert_eq!(tracked.lower_bound(), Some(2));
    assert_eq!(tracked.upper_bound(), Some(5));
    let untracked = read_interval(&env, &index(sym(&ns, "arr"), 4));
    assert_eq!(untracked.lower_bound(), Some(0));
    assert_eq!(untracked.upper_bound(), Some(5));
}

#[test]
fn out_of_bounds_writes_are_ignored() {
    let ns = namespace();
    let mut env = constants_environment(&ns);
    let arr = sym(&ns, "arr");
    fill_with(&mut env, &ns, 0);

    assign_int(&mut env, &index(arr.clone(), 12), 4);
    assign_int(&mut env, &index(arr.clone(), -1), 4);

    for i in 0..10 {
        assert_eq!(read_int(&env, &index(arr.clone(), i)), Some(0));
    }
    assert!(env.read(&index(arr, 12)).unwrap().is_top());
}

#[test]
fn arrays_with_too_many_tracked_elements_are_smashed() {
    let ns = namespace();
    let options = Options {
        scalar_domain: ScalarDomainKind::Intervals,
        array_strategy: ArrayStrategy::ElementSensitive,
        max_array_elements: 2,
    };
    let mut env = environment(&ns, options);
    let arr = sym(&ns, "arr");
    fill_with(&mut env, &ns, 0);
    assign_int(&mut env, &index(arr.clone(), 0), 1);
    assign_int(&mut env, &index(arr.clone(), 1), 2);
    assert!(matches!(
        array_value(&env, &ns),
        ArrayValue::Elements { .. }
    ));

    assign_int(&mut env, &index(arr.clone(), 2), 3);

    assert!(matches!(array_value(&env, &ns), ArrayValue::Smashed(..)));
    let range = read_interval(&env, &index(arr, 7));
    assert_eq!(range.lower_bound(), Some(0));
    assert_eq!(range.upper_bound(), Some(3));
}

#[test]
fn non_integer_indices_are_rejected() {
    let ns = namespace();
    let env = constants_environment(&ns);
    let arr = sym(&ns, "arr");

    assert!(matches!(
        Expression::index(arr.clone(), Expression::bool_constant(true)),
        Err(AccessError::IncompatibleIndex { .. })
    ));

    let bogus = Expression::Index {
        array: Box::new(arr),
        index: Box::new(Expression::bool_constant(true)),
        ty: int(),
    };
    assert!(matches!(
        env.read(&bogus),
        Err(AccessError::IncompatibleIndex { .. })
    ));
}

#[test]
fn structs_inside_arrays() {
    let ns = namespace();
    let mut env = constants_environment(&ns);
    let second = index(sym(&ns, "points"), 1);
    assign_int(&mut env, &member(second.clone(), "x", &ns), 3);

    assert_eq!(read_int(&env, &member(second.clone(), "x", &ns)), Some(3));
    assert!(env.read(&member(second, "y", &ns)).unwrap().is_top());
    let first = index(sym(&ns, "points"), 0);
    assert!(env.read(&member(first, "x", &ns)).unwrap().is_top());
}

#[test]
fn merging_arrays_merges_element_by_element() {
    let ns = namespace();
    let mut base = intervals_environment(&ns);
    fill_with(&mut base, &ns, 0);
    let arr = sym(&ns, "arr");

    let mut env = base.clone();
    assign_int(&mut env, &index(arr.clone(), 0), 1);
    let mut other = base;
    assign_int(&mut other, &index(arr.clone(), 1), 2);
    assert!(env.merge(&other));

    let first = read_interval(&env, &index(arr.clone(), 0));
    assert_eq!((first.lower_bound(), first.upper_bound()), (Some(0), Some(1)));
    let second = read_interval(&env, &index(arr.clone(), 1));
    assert_eq!((second.lower_bound(), second.upper_bound()), (Some(0), Some(2)));
    assert_eq!(read_int(&env, &index(arr, 2)), Some(0));
    assert!(other.subset(&env));
    assert!(!env.merge(&other));
}

#[test]
fn filled_array_reads_the_fill_value() {
    let ns = namespace();
    let mut env = constants_environment(&ns);
    fill_with(&mut env, &ns, 6);
    assert_eq!(read_int(&env, &index(sym(&ns, "arr"), 4)), Some(6));
    assert_eq!(read_int(&env, &unknown_index(&ns)), Some(6));
}
