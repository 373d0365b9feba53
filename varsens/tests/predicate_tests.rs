// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// Tests for the pointer side condition builders and their simplification.

mod common;

use std::rc::Rc;

use common::*;
use test_log::test;
use varsens::expression::Expression;
use varsens::path::Path;
use varsens::pointer_object::PointerAbstractObject;
use varsens::pointer_predicates::*;
use varsens::types::{Namespace, Type};

fn point_pointer() -> Type {
    Type::pointer_to(Type::struct_tag("point"))
}

fn points_to_s() -> PointerAbstractObject {
    let path = Path::new_variable(Rc::from("s"), Type::struct_tag("point"));
    PointerAbstractObject::to_path(point_pointer(), path)
}

fn points_to_heap() -> PointerAbstractObject {
    let block = Path::new_heap_block(3, Type::struct_tag("point"));
    PointerAbstractObject::to_path(point_pointer(), block)
}

#[test]
fn same_object_compares_pointer_objects() {
    let ns = namespace();
    let p = sym(&ns, "p");
    let q = sym(&ns, "q");
    let term = same_object(&p, &q);
    assert_eq!(format!("{:?}", term), "(POINTER_OBJECT(p)) == (POINTER_OBJECT(q))");
    assert_eq!(term.infer_type(), Type::Bool);
}

#[test]
fn allocator_objects_are_namespace_symbols() {
    let ns = namespace();
    let p = sym(&ns, "p");
    assert_eq!(
        format!("{:?}", malloc_object(&p, &ns)),
        "(POINTER_OBJECT(p)) == (POINTER_OBJECT(__malloc_object))"
    );
    assert_eq!(
        format!("{:?}", deallocated(&p, &ns)),
        "(POINTER_OBJECT(p)) == (POINTER_OBJECT(__deallocated))"
    );
    assert_eq!(
        format!("{:?}", dead_object(&p, &ns)),
        "(POINTER_OBJECT(p)) == (POINTER_OBJECT(__dead_object))"
    );
}

#[test]
#[should_panic]
fn allocator_objects_must_be_declared() {
    let ns = Namespace::new();
    let p = Expression::symbol("p", point_pointer());
    malloc_object(&p, &ns);
}

#[test]
fn null_predicates() {
    let ns = namespace();
    let p = sym(&ns, "p");
    assert_eq!(
        format!("{:?}", null_pointer(&p)),
        "(POINTER_OBJECT(p)) == (POINTER_OBJECT(NULL))"
    );
    assert_eq!(
        format!("{:?}", null_object(&p)),
        "(POINTER_OBJECT(NULL)) == (POINTER_OBJECT(p))"
    );
    assert_eq!(
        format!("{:?}", integer_address(&p)),
        "((POINTER_OBJECT(NULL)) == (POINTER_OBJECT(p))) && ((NULL) != (p))"
    );
    assert_eq!(
        format!("{:?}", invalid_pointer(&p)),
        "INVALID_POINTER(p)"
    );
    assert_eq!(format!("{:?}", dynamic_object(&p)), "DYNAMIC_OBJECT(p)");
}

#[test]
fn upper_bound_with_an_access_size() {
    let ns = namespace();
    let p = sym(&ns, "p");
    let size = Expression::int_constant(4, Type::size_type());
    let term = object_upper_bound(&p, Some(&size));

    match &term {
        Expression::GreaterThan { left, right } => {
            assert_eq!(**right, object_size(&p));
            match left.as_ref() {
                Expression::Plus { left, right, ty } => {
                    assert_eq!(*ty, Type::size_type());
                    assert_eq!(**right, size);
                    assert_eq!(
                        **left,
                        Expression::typecast(pointer_offset(&p), Type::size_type())
                    );
                }
                other => panic!("unexpected sum {:?}", other),
            }
        }
        other => panic!("unexpected bound {:?}", other),
    }
}

#[test]
fn upper_bound_without_an_access_size() {
    let ns = namespace();
    let p = sym(&ns, "p");
    let term = object_upper_bound(&p, None);
    assert_eq!(
        term,
        Expression::GreaterOrEqual {
            left: Box::new(Expression::typecast(
                pointer_offset(&p),
                Type::size_type()
            )),
            right: Box::new(object_size(&p)),
        }
    );
}

#[test]
fn lower_bound() {
    let ns = namespace();
    let p = sym(&ns, "p");
    let zero = Expression::int_constant(0, Type::signed_size_type());

    assert_eq!(
        object_lower_bound(&p, None),
        Expression::LessThan {
            left: Box::new(pointer_offset(&p)),
            right: Box::new(zero.clone()),
        }
    );

    let offset = int_const(-2);
    assert_eq!(
        object_lower_bound(&p, Some(&offset)),
        Expression::LessThan {
            left: Box::new(Expression::plus(
                pointer_offset(&p),
                Expression::typecast(offset, Type::signed_size_type())
            )),
            right: Box::new(zero),
        }
    );
}

#[test]
fn simplification_with_a_known_target() {
    let ns = namespace();
    let p = sym(&ns, "p");
    let abstraction = points_to_s();
    let fold = |term: &Expression| simplify_with(term, &p, &abstraction);

    assert_eq!(fold(&null_pointer(&p)), Expression::bool_constant(false));
    assert_eq!(fold(&null_object(&p)), Expression::bool_constant(false));
    assert_eq!(fold(&integer_address(&p)), Expression::bool_constant(false));
    assert_eq!(fold(&invalid_pointer(&p)), Expression::bool_constant(false));
    assert_eq!(fold(&dynamic_object(&p)), Expression::bool_constant(false));
    assert_eq!(fold(&same_object(&p, &p)), Expression::bool_constant(true));
    assert_eq!(
        fold(&Expression::not_equal(
            p.clone(),
            Expression::null_pointer(point_pointer())
        )),
        Expression::bool_constant(true)
    );

    let unrelated = same_object(&p, &sym(&ns, "q"));
    assert_eq!(fold(&unrelated), unrelated);
    let bound = object_upper_bound(&p, None);
    assert_eq!(fold(&bound), bound);
}

#[test]
fn simplification_with_a_heap_target() {
    let ns = namespace();
    let p = sym(&ns, "p");
    let abstraction = points_to_heap();
    assert_eq!(
        simplify_with(&dynamic_object(&p), &p, &abstraction),
        Expression::bool_constant(true)
    );
    let both = Expression::and(dynamic_object(&p), malloc_object(&p, &ns));
    assert_eq!(
        simplify_with(&both, &p, &abstraction),
        malloc_object(&p, &ns)
    );
}

#[test]
fn simplification_with_a_null_pointer() {
    let ns = namespace();
    let p = sym(&ns, "p");
    let abstraction = PointerAbstractObject::null(point_pointer());
    assert_eq!(
        simplify_with(&null_pointer(&p), &p, &abstraction),
        Expression::bool_constant(true)
    );
    assert_eq!(
        simplify_with(&invalid_pointer(&p), &p, &abstraction),
        Expression::bool_constant(false)
    );
}

#[test]
fn an_unknown_pointer_decides_nothing() {
    let ns = namespace();
    let p = sym(&ns, "p");
    let abstraction = PointerAbstractObject::top(point_pointer());
    let terms = [
        null_pointer(&p),
        invalid_pointer(&p),
        dynamic_object(&p),
        integer_address(&p),
    ];
    for term in terms.iter() {
        assert_eq!(simplify_with(term, &p, &abstraction), *term);
    }
}

#[test]
fn terms_about_another_pointer_are_left_alone() {
    let ns = namespace();
    let p = sym(&ns, "p");
    let other = Expression::symbol("other", point_pointer());
    let abstraction = points_to_s();
    let term = null_pointer(&other);
    assert_eq!(simplify_with(&term, &p, &abstraction), term);
    let term = invalid_pointer(&other);
    assert_eq!(simplify_with(&term, &p, &abstraction), term);
}
