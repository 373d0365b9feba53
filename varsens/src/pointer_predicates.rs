// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Builders for the side conditions that guard pointer accesses. The terms are handed to the
//! solver facing layer, which gives meaning to POINTER_OBJECT, OBJECT_SIZE and friends.

use crate::bool_domain::BoolDomain;
use crate::expression::Expression;
use crate::pointer_object::PointerAbstractObject;
use crate::types::Namespace;

use log_derive::logfn_inputs;
use mirai_annotations::*;

/// The symbol standing for the object most recently returned by the allocator.
pub const MALLOC_OBJECT: &str = "__malloc_object";
/// The symbol standing for the object most recently released by the allocator.
pub const DEALLOCATED: &str = "__deallocated";
/// The symbol standing for the most recent stack object whose lifetime ended.
pub const DEAD_OBJECT: &str = "__dead_object";

fn null_pointer_like(pointer: &Expression) -> Expression {
    let ty = pointer.infer_type();
    checked_precondition!(ty.is_pointer());
    Expression::null_pointer(ty)
}

/// POINTER_OBJECT(p)
pub fn pointer_object(pointer: &Expression) -> Expression {
    Expression::PointerObject(Box::new(pointer.clone()))
}

/// POINTER_OBJECT(p1) == POINTER_OBJECT(p2)
#[logfn_inputs(TRACE)]
pub fn same_object(p1: &Expression, p2: &Expression) -> Expression {
    Expression::equal(pointer_object(p1), pointer_object(p2))
}

/// OBJECT_SIZE(p)
pub fn object_size(pointer: &Expression) -> Expression {
    Expression::ObjectSize(Box::new(pointer.clone()))
}

/// POINTER_OFFSET(p)
pub fn pointer_offset(pointer: &Expression) -> Expression {
    Expression::PointerOffset(Box::new(pointer.clone()))
}

/// DYNAMIC_OBJECT(p)
pub fn dynamic_object(pointer: &Expression) -> Expression {
    Expression::DynamicObject(Box::new(pointer.clone()))
}

/// INVALID_POINTER(p)
pub fn invalid_pointer(pointer: &Expression) -> Expression {
    Expression::InvalidPointer(Box::new(pointer.clone()))
}

/// True if p points into the object the allocator returned last.
#[logfn_inputs(TRACE)]
pub fn malloc_object(pointer: &Expression, ns: &Namespace) -> Expression {
    same_object(pointer, &ns.lookup(MALLOC_OBJECT).symbol_expr())
}

/// True if p points into the object the allocator released last.
#[logfn_inputs(TRACE)]
pub fn deallocated(pointer: &Expression, ns: &Namespace) -> Expression {
    same_object(pointer, &ns.lookup(DEALLOCATED).symbol_expr())
}

/// True if p points into the stack object that went out of scope last.
#[logfn_inputs(TRACE)]
pub fn dead_object(pointer: &Expression, ns: &Namespace) -> Expression {
    same_object(pointer, &ns.lookup(DEAD_OBJECT).symbol_expr())
}

/// True if p points into the null object.
pub fn null_object(pointer: &Expression) -> Expression {
    same_object(&null_pointer_like(pointer), pointer)
}

/// True if p is null.
pub fn null_pointer(pointer: &Expression) -> Expression {
    same_object(pointer, &null_pointer_like(pointer))
}

/// True if p is an integer that was cast to a pointer: it points into the null object, but is
/// not null itself.
pub fn integer_address(pointer: &Expression) -> Expression {
    let null = null_pointer_like(pointer);
    Expression::and(
        same_object(&null, pointer),
        Expression::not_equal(null, pointer.clone()),
    )
}

/// True if an access of access_size bytes at p runs past the end of the object.
/// POINTER_OFFSET(p) + access_size > OBJECT_SIZE(p), or
/// POINTER_OFFSET(p) >= OBJECT_SIZE(p) if no access size is given.
#[logfn_inputs(TRACE)]
pub fn object_upper_bound(pointer: &Expression, access_size: Option<&Expression>) -> Expression {
    let object_size = object_size(pointer);
    let mut sum = pointer_offset(pointer);
    if let Some(access_size) = access_size {
        let access_size_type = access_size.infer_type();
        if sum.infer_type() != access_size_type {
            sum = Expression::typecast(sum, access_size_type);
        }
        sum = Expression::plus(sum, access_size.clone());
    }
    let size_type = object_size.infer_type();
    if sum.infer_type() != size_type {
        sum = Expression::typecast(sum, size_type);
    }
    let (left, right) = (Box::new(sum), Box::new(object_size));
    if access_size.is_some() {
        Expression::GreaterThan { left, right }
    } else {
        Expression::GreaterOrEqual { left, right }
    }
}

/// True if p, moved by offset, is before the start of the object.
/// POINTER_OFFSET(p) + offset < 0
#[logfn_inputs(TRACE)]
pub fn object_lower_bound(pointer: &Expression, offset: Option<&Expression>) -> Expression {
    let mut p_offset = pointer_offset(pointer);
    let offset_type = p_offset.infer_type();
    let zero = Expression::int_constant(0, offset_type.clone());
    if let Some(offset) = offset {
        let offset = if offset.infer_type() != offset_type {
            Expression::typecast(offset.clone(), offset_type)
        } else {
            offset.clone()
        };
        p_offset = Expression::plus(p_offset, offset);
    }
    Expression::LessThan {
        left: Box::new(p_offset),
        right: Box::new(zero),
    }
}

/// Folds the parts of term that ask about pointer, where abstraction (the abstract value of
/// pointer) decides them. Parts that cannot be decided are left as they are.
#[logfn_inputs(TRACE)]
pub fn simplify_with(
    term: &Expression,
    pointer: &Expression,
    abstraction: &PointerAbstractObject,
) -> Expression {
    let decided = |b: BoolDomain, original: &Expression| match b.as_bool() {
        Some(b) => Expression::bool_constant(b),
        None => original.clone(),
    };
    match term {
        Expression::Equal { left, right } => match (left.as_ref(), right.as_ref()) {
            (Expression::PointerObject(p1), Expression::PointerObject(p2)) => {
                if p1 == p2 {
                    Expression::bool_constant(true)
                } else if compares_with_null(p1, p2, pointer) {
                    decided(abstraction.null_status(), term)
                } else {
                    term.clone()
                }
            }
            _ => term.clone(),
        },
        Expression::DynamicObject(p) if p.as_ref() == pointer => {
            decided(abstraction.dynamic_status(), term)
        }
        Expression::InvalidPointer(p) if p.as_ref() == pointer => {
            if abstraction.is_top() || abstraction.is_bottom() {
                term.clone()
            } else if !abstraction.may_be_invalid() {
                Expression::bool_constant(false)
            } else if abstraction.targets().is_empty() && !abstraction.may_be_null() {
                Expression::bool_constant(true)
            } else {
                term.clone()
            }
        }
        Expression::And { left, right } => {
            let left = simplify_with(left, pointer, abstraction);
            let right = simplify_with(right, pointer, abstraction);
            match (left.as_bool_if_known(), right.as_bool_if_known()) {
                (Some(false), _) | (_, Some(false)) => Expression::bool_constant(false),
                (Some(true), _) => right,
                (_, Some(true)) => left,
                _ => Expression::and(left, right),
            }
        }
        Expression::NotEqual { left, right } if compares_with_null(left, right, pointer) => {
            decided(abstraction.null_status().not(), term)
        }
        _ => term.clone(),
    }
}

// True if one of the operands is pointer and the other the null pointer.
fn compares_with_null(left: &Expression, right: &Expression, pointer: &Expression) -> bool {
    let is_null = |e: &Expression| matches!(e, Expression::NullPointer { .. });
    (left == pointer && is_null(right)) || (right == pointer && is_null(left))
}
