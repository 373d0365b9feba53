// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// Tests for pointer abstractions and writes through pointers.

mod common;

use common::*;
use test_log::test;
use varsens::abstract_object::AbstractObject;
use varsens::bool_domain::BoolDomain;
use varsens::errors::AccessError;
use varsens::expression::Expression;
use varsens::path::Path;
use varsens::types::Type;

fn address_of(ns: &varsens::types::Namespace, name: &str) -> Expression {
    Expression::address_of(sym(ns, name))
}

fn null_point_pointer() -> Expression {
    Expression::null_pointer(Type::pointer_to(Type::struct_tag("point")))
}

#[test]
fn write_through_a_pointer_with_two_targets_merges() {
    let ns = namespace();
    let mut base = intervals_environment(&ns);
    let o1_x = member(sym(&ns, "o1"), "x", &ns);
    let o2_x = member(sym(&ns, "o2"), "x", &ns);
    let p = sym(&ns, "p");
    assign_int(&mut base, &o1_x, 1);
    assign_int(&mut base, &o2_x, 1);

    let mut env = base.clone();
    env.assign(&p, &address_of(&ns, "o1")).unwrap();
    let mut other = base;
    other.assign(&p, &address_of(&ns, "o2")).unwrap();
    assert!(env.merge(&other));

    let p_value = env.read(&p).unwrap();
    assert_eq!(p_value.as_pointer().unwrap().targets().len(), 2);

    assign_int(&mut env, &member(deref(p), "x", &ns), 7);

    for field in [&o1_x, &o2_x] {
        let range = read_interval(&env, field);
        assert_eq!(range.lower_bound(), Some(1));
        assert_eq!(range.upper_bound(), Some(7));
    }
}

#[test]
fn write_through_a_precise_pointer_replaces() {
    let ns = namespace();
    let mut env = constants_environment(&ns);
    let s_x = member(sym(&ns, "s"), "x", &ns);
    let s_y = member(sym(&ns, "s"), "y", &ns);
    let p = sym(&ns, "p");
    assign_int(&mut env, &s_x, 1);
    assign_int(&mut env, &s_y, 2);
    env.assign(&p, &address_of(&ns, "s")).unwrap();

    assign_int(&mut env, &member(deref(p.clone()), "x", &ns), 7);

    assert_eq!(read_int(&env, &s_x), Some(7));
    assert_eq!(read_int(&env, &s_y), Some(2));
    assert_eq!(read_int(&env, &member(deref(p), "y", &ns)), Some(2));
}

#[test]
fn pointer_to_a_variable_is_a_constant_address() {
    let ns = namespace();
    let mut env = constants_environment(&ns);
    let p = sym(&ns, "p");
    env.assign(&p, &address_of(&ns, "s")).unwrap();

    let value = env.read(&p).unwrap();
    let pointer = value.as_pointer().unwrap();
    assert!(pointer.is_precise());
    assert_eq!(pointer.null_status(), BoolDomain::False);
    assert_eq!(pointer.dynamic_status(), BoolDomain::False);
    assert_eq!(value.to_constant(), Some(address_of(&ns, "s")));
}

#[test]
fn comparisons_with_null() {
    let ns = namespace();
    let mut env = constants_environment(&ns);
    let p = sym(&ns, "p");
    let is_null = Expression::equal(p.clone(), null_point_pointer());
    let is_not_null = Expression::not_equal(p.clone(), null_point_pointer());

    env.assign(&p, &null_point_pointer()).unwrap();
    assert_eq!(
        env.read(&is_null).unwrap().to_constant(),
        Some(Expression::bool_constant(true))
    );
    assert_eq!(
        env.read(&is_not_null).unwrap().to_constant(),
        Some(Expression::bool_constant(false))
    );

    let mut other = env.clone();
    other.assign(&p, &address_of(&ns, "o1")).unwrap();
    assert_eq!(
        other.read(&is_null).unwrap().to_constant(),
        Some(Expression::bool_constant(false))
    );

    env.merge(&other);
    assert!(env.read(&is_null).unwrap().is_top());
    let value = env.read(&p).unwrap();
    assert!(value.as_pointer().unwrap().may_be_null());
    assert_eq!(value.as_pointer().unwrap().null_status(), BoolDomain::Top);
}

#[test]
fn zero_cast_to_a_pointer_is_null() {
    let ns = namespace();
    let mut env = constants_environment(&ns);
    let q = sym(&ns, "q");
    let zero = Expression::typecast(int_const(0), Type::pointer_to(int()));
    env.assign(&q, &zero).unwrap();

    let value = env.read(&q).unwrap();
    assert_eq!(value.as_pointer().unwrap().null_status(), BoolDomain::True);
    assert_eq!(
        value.to_constant(),
        Some(Expression::null_pointer(Type::pointer_to(int())))
    );
}

#[test]
fn pointers_to_different_objects_are_not_equal() {
    let ns = namespace();
    let mut env = constants_environment(&ns);
    let q = sym(&ns, "q");
    let r = sym(&ns, "r");
    env.assign(&q, &Expression::address_of(sym(&ns, "i"))).unwrap();
    env.assign(&r, &Expression::address_of(sym(&ns, "j"))).unwrap();

    let equal = Expression::equal(q.clone(), r.clone());
    assert_eq!(
        env.read(&equal).unwrap().to_constant(),
        Some(Expression::bool_constant(false))
    );

    env.assign(&r, &q).unwrap();
    assert_eq!(
        env.read(&equal).unwrap().to_constant(),
        Some(Expression::bool_constant(true))
    );
    let q_value = env.read(&q).unwrap();
    let r_value = env.read(&r).unwrap();
    assert_eq!(
        q_value
            .as_pointer()
            .unwrap()
            .same_object(r_value.as_pointer().unwrap()),
        BoolDomain::True
    );
}

#[test]
fn heap_allocations_are_dynamic_objects() {
    let ns = namespace();
    let mut env = constants_environment(&ns);
    let q = sym(&ns, "q");
    let allocation = Expression::HeapAllocation {
        ordinal: 0,
        ty: Type::pointer_to(int()),
    };
    env.assign(&q, &allocation).unwrap();

    let value = env.read(&q).unwrap();
    let pointer = value.as_pointer().unwrap();
    assert_eq!(pointer.dynamic_status(), BoolDomain::True);
    assert_eq!(pointer.null_status(), BoolDomain::False);
    assert!(env.read(&deref(q.clone())).unwrap().is_top());

    assign_int(&mut env, &deref(q.clone()), 5);
    assert_eq!(read_int(&env, &deref(q)), Some(5));
    let block = Path::new_heap_block(0, Type::array_of(int(), None));
    assert!(matches!(
        env.value_at(&block).map(|v| v.as_ref()),
        Some(AbstractObject::Array(..))
    ));
}

#[test]
fn heap_blocks_are_arrays_of_unknown_length() {
    let ns = namespace();
    let mut env = constants_environment(&ns);
    let q = sym(&ns, "q");
    let r = sym(&ns, "r");
    let allocation = Expression::HeapAllocation {
        ordinal: 2,
        ty: Type::pointer_to(int()),
    };
    env.assign(&q, &allocation).unwrap();
    assign_int(&mut env, &deref(q.clone()), 5);
    env.assign(&r, &Expression::plus(q.clone(), int_const(1)))
        .unwrap();
    assign_int(&mut env, &deref(r.clone()), 3);

    let second = deref(Expression::plus(q.clone(), int_const(1)));
    assert_eq!(read_int(&env, &second), Some(3));
    assert_eq!(read_int(&env, &deref(q)), Some(5));
    let value = env.read(&r).unwrap();
    let pointer = value.as_pointer().unwrap();
    assert!(!pointer.may_be_invalid());
    assert_eq!(pointer.dynamic_status(), BoolDomain::True);
    assert!(pointer.is_precise());
}

#[test]
fn dereferencing_a_pointer_moved_off_its_object_is_unknown() {
    let ns = namespace();
    let mut env = intervals_environment(&ns);
    let i = sym(&ns, "i");
    let j = sym(&ns, "j");
    let q = sym(&ns, "q");
    assign_int(&mut env, &i, 1);
    env.assign(&q, &Expression::address_of(i.clone())).unwrap();
    env.assign(&q, &Expression::plus(q.clone(), int_const(1)))
        .unwrap();

    let value = env.read(&deref(q.clone())).unwrap();
    assert!(value.is_top());
    assert!(!value.is_bottom());

    env.assign(&j, &deref(q.clone())).unwrap();
    assert!(!env.is_bottom());
    assert!(env.read(&j).unwrap().is_top());

    assign_int(&mut env, &deref(q), 7);
    let range = read_interval(&env, &i);
    assert_eq!(range.lower_bound(), Some(1));
    assert_eq!(range.upper_bound(), Some(7));
}

#[test]
fn heap_allocation_of_a_non_pointer_type_is_an_error() {
    let ns = namespace();
    let env = constants_environment(&ns);
    let allocation = Expression::HeapAllocation {
        ordinal: 1,
        ty: int(),
    };
    assert_eq!(
        env.read(&allocation),
        Err(AccessError::NotAPointer { ty: int() })
    );
}

#[test]
fn pointer_arithmetic_moves_between_elements() {
    let ns = namespace();
    let mut env = constants_environment(&ns);
    let q = sym(&ns, "q");
    let arr = sym(&ns, "arr");
    env.assign(&q, &Expression::address_of(index(arr.clone(), 2)))
        .unwrap();
    env.assign(&q, &Expression::plus(q.clone(), int_const(1)))
        .unwrap();

    assign_int(&mut env, &deref(q.clone()), 9);

    assert_eq!(read_int(&env, &index(arr.clone(), 3)), Some(9));
    assert!(env.read(&index(arr.clone(), 2)).unwrap().is_top());

    env.assign(&q, &Expression::minus(q.clone(), int_const(3)))
        .unwrap();
    assign_int(&mut env, &deref(q), 4);
    assert_eq!(read_int(&env, &index(arr.clone(), 0)), Some(4));
    assert_eq!(read_int(&env, &index(arr, 3)), Some(9));
}

#[test]
fn moving_a_pointer_off_a_scalar_makes_it_invalid() {
    let ns = namespace();
    let mut env = constants_environment(&ns);
    let q = sym(&ns, "q");
    env.assign(&q, &Expression::address_of(sym(&ns, "i"))).unwrap();
    env.assign(&q, &Expression::plus(q.clone(), int_const(1)))
        .unwrap();

    let value = env.read(&q).unwrap();
    let pointer = value.as_pointer().unwrap();
    assert!(pointer.may_be_invalid());
    assert!(!pointer.is_precise());
    assert_eq!(pointer.to_constant(), None);
}

#[test]
fn write_through_an_unknown_pointer_weakens_objects_of_the_type() {
    let ns = namespace();
    let mut env = intervals_environment(&ns);
    let i = sym(&ns, "i");
    let flag = sym(&ns, "flag");
    let s_x = member(sym(&ns, "s"), "x", &ns);
    let q = sym(&ns, "q");
    assign_int(&mut env, &i, 1);
    assign_int(&mut env, &s_x, 1);
    env.assign(&flag, &Expression::bool_constant(true)).unwrap();
    env.havoc(&q).unwrap();

    assign_int(&mut env, &deref(q), 7);

    let range = read_interval(&env, &i);
    assert_eq!(range.lower_bound(), Some(1));
    assert_eq!(range.upper_bound(), Some(7));
    assert!(env.read(&s_x).unwrap().is_top());
    assert_eq!(
        env.read(&flag).unwrap().to_constant(),
        Some(Expression::bool_constant(true))
    );
}

#[test]
fn dereferencing_a_non_pointer_is_an_error() {
    let ns = namespace();
    let env = constants_environment(&ns);
    assert!(matches!(
        Expression::dereference(sym(&ns, "i")),
        Err(AccessError::NotAPointer { .. })
    ));

    let bogus = Expression::Dereference {
        pointer: Box::new(sym(&ns, "i")),
        ty: int(),
    };
    assert!(matches!(
        env.read(&bogus),
        Err(AccessError::NotAPointer { .. })
    ));
}

#[test]
fn address_of_a_dereference_is_the_pointer() {
    let ns = namespace();
    let mut env = constants_environment(&ns);
    let p = sym(&ns, "p");
    env.assign(&p, &address_of(&ns, "o2")).unwrap();

    let again = Expression::address_of(deref(p.clone()));
    assert_eq!(env.read(&again).unwrap(), env.read(&p).unwrap());

    let field = Expression::address_of(member(deref(p), "y", &ns));
    let value = env.read(&field).unwrap();
    let targets = value.as_pointer().unwrap().targets();
    assert_eq!(targets.len(), 1);
    assert_eq!(format!("{:?}", targets[0].path), "o2.y");
}

#[test]
fn ill_typed_pointer_casts_give_top() {
    let ns = namespace();
    let mut env = constants_environment(&ns);
    let q = sym(&ns, "q");
    env.assign(&q, &Expression::address_of(index(sym(&ns, "arr"), 1)))
        .unwrap();
    env.assign(&q, &Expression::plus(q.clone(), int_const(1)))
        .unwrap();

    let cast = Expression::typecast(q.clone(), Type::pointer_to(Type::Unsigned(8)));
    assert!(env.read(&cast).unwrap().is_top());

    let mut fresh = constants_environment(&ns);
    fresh
        .assign(&q, &Expression::address_of(sym(&ns, "i")))
        .unwrap();
    let value = fresh.read(&cast).unwrap();
    let pointer = value.as_pointer().unwrap();
    assert_eq!(*pointer.get_type(), Type::pointer_to(Type::Unsigned(8)));
    assert_eq!(pointer.targets().len(), 1);
    assert_eq!(format!("{:?}", pointer.targets()[0]), "&i");
}
