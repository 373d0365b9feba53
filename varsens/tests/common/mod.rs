// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// Shared fixtures. Not every test file uses every helper.
#![allow(dead_code)]

use std::rc::Rc;

use varsens::abstract_object::AbstractObject;
use varsens::environment::Environment;
use varsens::expression::Expression;
use varsens::interval_domain::IntervalDomain;
use varsens::options::{ArrayStrategy, Options, ScalarDomainKind};
use varsens::pointer_predicates;
use varsens::types::{Namespace, Type};

pub fn int() -> Type {
    Type::Signed(32)
}

/// struct point { int x; int y; }
/// struct inner { int b; int c; }
/// struct outer { struct inner a; int d; }
/// plus a handful of variables of these types.
pub fn namespace() -> Rc<Namespace> {
    let mut ns = Namespace::new();
    let point = ns.add_struct("point", vec![("x", int()), ("y", int())]);
    let inner = ns.add_struct("inner", vec![("b", int()), ("c", int())]);
    let outer = ns.add_struct("outer", vec![("a", inner), ("d", int())]);
    for name in ["s", "t", "o1", "o2"] {
        ns.add_symbol(name, point.clone());
    }
    ns.add_symbol("n", outer);
    ns.add_symbol("i", int());
    ns.add_symbol("j", int());
    ns.add_symbol("flag", Type::Bool);
    ns.add_symbol("p", Type::pointer_to(point.clone()));
    ns.add_symbol("q", Type::pointer_to(int()));
    ns.add_symbol("r", Type::pointer_to(int()));
    ns.add_symbol("arr", Type::array_of(int(), Some(10)));
    ns.add_symbol("points", Type::array_of(point, Some(4)));
    let void_pointer = Type::pointer_to(Type::Empty);
    ns.add_symbol(pointer_predicates::MALLOC_OBJECT, void_pointer.clone());
    ns.add_symbol(pointer_predicates::DEALLOCATED, void_pointer.clone());
    ns.add_symbol(pointer_predicates::DEAD_OBJECT, void_pointer);
    Rc::new(ns)
}

pub fn options(scalar_domain: ScalarDomainKind, array_strategy: ArrayStrategy) -> Options {
    Options {
        scalar_domain,
        array_strategy,
        ..Options::default()
    }
}

pub fn environment(ns: &Rc<Namespace>, options: Options) -> Environment {
    Environment::new(ns.clone(), Rc::new(options))
}

pub fn constants_environment(ns: &Rc<Namespace>) -> Environment {
    environment(ns, Options::default())
}

pub fn intervals_environment(ns: &Rc<Namespace>) -> Environment {
    environment(
        ns,
        options(ScalarDomainKind::Intervals, ArrayStrategy::ElementSensitive),
    )
}

pub fn sym(ns: &Namespace, name: &str) -> Expression {
    ns.lookup(name).symbol_expr()
}

pub fn member(compound: Expression, field: &str, ns: &Namespace) -> Expression {
    Expression::member(compound, field, ns).unwrap()
}

pub fn index(array: Expression, i: i128) -> Expression {
    Expression::index(array, int_const(i)).unwrap()
}

pub fn deref(pointer: Expression) -> Expression {
    Expression::dereference(pointer).unwrap()
}

pub fn int_const(value: i128) -> Expression {
    Expression::int_constant(value, int())
}

/// The integer the object is known to be, if any.
pub fn known_int(object: &Rc<AbstractObject>) -> Option<i128> {
    match object.to_constant() {
        Some(Expression::Constant { value, .. }) => value.as_i128(),
        _ => None,
    }
}

pub fn read_int(env: &Environment, expression: &Expression) -> Option<i128> {
    known_int(&env.read(expression).unwrap())
}

pub fn read_interval(env: &Environment, expression: &Expression) -> IntervalDomain {
    env.read(expression)
        .unwrap()
        .as_scalar()
        .expect("a scalar")
        .as_interval()
}

pub fn assign_int(env: &mut Environment, lhs: &Expression, value: i128) {
    env.assign(lhs, &int_const(value)).unwrap();
}
