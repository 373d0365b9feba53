// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::constant_domain::ConstantDomain;
use crate::errors::AccessError;
use crate::types::{Namespace, Type};

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

/// Closely based on the expressions found in the instructions of a goto program.
/// Expressions are used in two roles: as the left and right hand sides of the assignments that
/// the environment evaluates, and as the side condition terms built by the pointer predicates.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Expression {
    /// A program variable.
    Symbol { name: Rc<str>, ty: Type },

    /// A compile time constant of the given scalar type.
    Constant { value: ConstantDomain, ty: Type },

    /// The null pointer of the given pointer type.
    NullPointer { ty: Type },

    /// A value about which nothing is known, such as an input.
    Nondet { ty: Type },

    /// The address of a fresh object allocated at the given site. The type is the pointer type.
    HeapAllocation { ordinal: usize, ty: Type },

    /// An array all of whose elements are the given value.
    ArrayOf { value: Box<Expression>, ty: Type },

    /// A struct value. There is one operand per component, in declaration order.
    StructOf { fields: Vec<Expression>, ty: Type },

    /// The field of the struct denoted by compound. compound.field
    Member {
        compound: Box<Expression>,
        field: Rc<str>,
        ty: Type,
    },

    /// The element of the array at the given index. array[index]
    Index {
        array: Box<Expression>,
        index: Box<Expression>,
        ty: Type,
    },

    /// The object a pointer points to. *pointer
    Dereference { pointer: Box<Expression>, ty: Type },

    /// The address of an object. &object
    AddressOf { object: Box<Expression>, ty: Type },

    /// The operand converted to the target type. (ty)operand
    Typecast { operand: Box<Expression>, ty: Type },

    /// An expression that is the sum of left and right. +
    Plus {
        left: Box<Expression>,
        right: Box<Expression>,
        ty: Type,
    },

    /// An expression that is the right operand subtracted from the left. -
    Minus {
        left: Box<Expression>,
        right: Box<Expression>,
        ty: Type,
    },

    /// An expression that is the product of left and right. *
    Mult {
        left: Box<Expression>,
        right: Box<Expression>,
        ty: Type,
    },

    /// An expression that is the arithmetic negation of its operand. -
    UnaryMinus { operand: Box<Expression>, ty: Type },

    /// An expression that is true if both left and right are true. &&
    And {
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// An expression that is true if left and right are equal. ==
    Equal {
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// An expression that is true if left and right are not equal. !=
    NotEqual {
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// An expression that is true if left is greater than right. >
    GreaterThan {
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// An expression that is true if left is greater than or equal to right. >=
    GreaterOrEqual {
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// An expression that is true if left is less than right. <
    LessThan {
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// The identity of the object the pointer points into.
    PointerObject(Box<Expression>),

    /// The size, in bytes, of the object the pointer points into.
    ObjectSize(Box<Expression>),

    /// The signed byte offset of the pointer from the start of the object it points into.
    PointerOffset(Box<Expression>),

    /// True if the pointer points into a dynamically allocated object.
    DynamicObject(Box<Expression>),

    /// True if the pointer does not point into a live object.
    InvalidPointer(Box<Expression>),
}

impl Debug for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Expression::Symbol { name, .. } => f.write_str(name),
            Expression::Constant { value, .. } => value.fmt(f),
            Expression::NullPointer { .. } => f.write_str("NULL"),
            Expression::Nondet { ty } => f.write_fmt(format_args!("nondet({:?})", ty)),
            Expression::HeapAllocation { ordinal, .. } => {
                f.write_fmt(format_args!("malloc_{}", ordinal))
            }
            Expression::ArrayOf { value, .. } => f.write_fmt(format_args!("array_of({:?})", value)),
            Expression::StructOf { fields, .. } => {
                let mut tuple = f.debug_tuple("struct_of");
                for field in fields.iter() {
                    tuple.field(field);
                }
                tuple.finish()
            }
            Expression::Member {
                compound, field, ..
            } => f.write_fmt(format_args!("{:?}.{}", compound, field)),
            Expression::Index { array, index, .. } => {
                f.write_fmt(format_args!("{:?}[{:?}]", array, index))
            }
            Expression::Dereference { pointer, .. } => f.write_fmt(format_args!("*({:?})", pointer)),
            Expression::AddressOf { object, .. } => f.write_fmt(format_args!("&({:?})", object)),
            Expression::Typecast { operand, ty } => {
                f.write_fmt(format_args!("({:?})({:?})", ty, operand))
            }
            Expression::Plus { left, right, .. } => {
                f.write_fmt(format_args!("({:?}) + ({:?})", left, right))
            }
            Expression::Minus { left, right, .. } => {
                f.write_fmt(format_args!("({:?}) - ({:?})", left, right))
            }
            Expression::Mult { left, right, .. } => {
                f.write_fmt(format_args!("({:?}) * ({:?})", left, right))
            }
            Expression::UnaryMinus { operand, .. } => f.write_fmt(format_args!("-({:?})", operand)),
            Expression::And { left, right } => {
                f.write_fmt(format_args!("({:?}) && ({:?})", left, right))
            }
            Expression::Equal { left, right } => {
                f.write_fmt(format_args!("({:?}) == ({:?})", left, right))
            }
            Expression::NotEqual { left, right } => {
                f.write_fmt(format_args!("({:?}) != ({:?})", left, right))
            }
            Expression::GreaterThan { left, right } => {
                f.write_fmt(format_args!("({:?}) > ({:?})", left, right))
            }
            Expression::GreaterOrEqual { left, right } => {
                f.write_fmt(format_args!("({:?}) >= ({:?})", left, right))
            }
            Expression::LessThan { left, right } => {
                f.write_fmt(format_args!("({:?}) < ({:?})", left, right))
            }
            Expression::PointerObject(p) => f.write_fmt(format_args!("POINTER_OBJECT({:?})", p)),
            Expression::ObjectSize(p) => f.write_fmt(format_args!("OBJECT_SIZE({:?})", p)),
            Expression::PointerOffset(p) => f.write_fmt(format_args!("POINTER_OFFSET({:?})", p)),
            Expression::DynamicObject(p) => f.write_fmt(format_args!("DYNAMIC_OBJECT({:?})", p)),
            Expression::InvalidPointer(p) => f.write_fmt(format_args!("INVALID_POINTER({:?})", p)),
        }
    }
}

/// Constructors
impl Expression {
    pub fn symbol(name: &str, ty: Type) -> Expression {
        Expression::Symbol {
            name: Rc::from(name),
            ty,
        }
    }

    /// An integer constant of the given integer type.
    pub fn int_constant(value: i128, ty: Type) -> Expression {
        Expression::Constant {
            value: ConstantDomain::for_integer(value, &ty),
            ty,
        }
    }

    /// A constant of the signed size type. Used for indices and offsets.
    pub fn signed_constant(value: i128) -> Expression {
        Expression::int_constant(value, Type::signed_size_type())
    }

    pub fn bool_constant(value: bool) -> Expression {
        Expression::Constant {
            value: value.into(),
            ty: Type::Bool,
        }
    }

    pub fn null_pointer(ty: Type) -> Expression {
        Expression::NullPointer { ty }
    }

    /// A value of struct type ty, with the operands as its components.
    pub fn struct_of(
        fields: Vec<Expression>,
        ty: Type,
        ns: &Namespace,
    ) -> std::result::Result<Expression, AccessError> {
        let matches_layout = match ns.struct_type(&ty) {
            Some(struct_type) => {
                struct_type.components.len() == fields.len()
                    && struct_type
                        .components
                        .iter()
                        .zip(fields.iter())
                        .all(|(component, field)| component.ty == field.infer_type())
            }
            None => false,
        };
        if !matches_layout {
            return Err(AccessError::InitializerMismatch { ty, fields });
        }
        Ok(Expression::StructOf { fields, ty })
    }

    /// compound.field, where compound must be a struct with a field of that name.
    pub fn member(
        compound: Expression,
        field: &str,
        ns: &Namespace,
    ) -> std::result::Result<Expression, AccessError> {
        let compound_type = compound.infer_type();
        let struct_type = match ns.struct_type(&compound_type) {
            Some(struct_type) => struct_type,
            None => {
                return Err(AccessError::NotAComposite {
                    ty: compound_type,
                    selector: crate::path::PathSelector::Field(Rc::from(field)),
                })
            }
        };
        match struct_type.component(field) {
            Some(component) => Ok(Expression::Member {
                compound: Box::new(compound),
                field: component.name.clone(),
                ty: component.ty.clone(),
            }),
            None => Err(AccessError::UnknownField {
                tag: struct_type.tag.clone(),
                field: Rc::from(field),
            }),
        }
    }

    /// array[index], where array must be an array and index an integer.
    pub fn index(
        array: Expression,
        index: Expression,
    ) -> std::result::Result<Expression, AccessError> {
        let array_type = array.infer_type();
        let index_type = index.infer_type();
        let element_type = match array_type.element_type() {
            Some(element_type) => element_type.clone(),
            None => {
                return Err(AccessError::NotAComposite {
                    ty: array_type,
                    selector: crate::path::PathSelector::Index(crate::path::ArrayIndex::Unknown),
                })
            }
        };
        if !index_type.is_integer() {
            return Err(AccessError::IncompatibleIndex {
                array_type,
                index_type,
            });
        }
        Ok(Expression::Index {
            array: Box::new(array),
            index: Box::new(index),
            ty: element_type,
        })
    }

    /// *pointer, where pointer must have a pointer type.
    pub fn dereference(pointer: Expression) -> std::result::Result<Expression, AccessError> {
        let pointer_type = pointer.infer_type();
        match pointer_type.pointee() {
            Some(target) => Ok(Expression::Dereference {
                ty: target.clone(),
                pointer: Box::new(pointer),
            }),
            None => Err(AccessError::NotAPointer { ty: pointer_type }),
        }
    }

    /// &object
    pub fn address_of(object: Expression) -> Expression {
        let ty = Type::pointer_to(object.infer_type());
        Expression::AddressOf {
            object: Box::new(object),
            ty,
        }
    }

    /// left + right, typed as left. Pointer arithmetic is expressed with a pointer on the left.
    pub fn plus(left: Expression, right: Expression) -> Expression {
        let ty = left.infer_type();
        Expression::Plus {
            left: Box::new(left),
            right: Box::new(right),
            ty,
        }
    }

    /// left - right, typed as left.
    pub fn minus(left: Expression, right: Expression) -> Expression {
        let ty = left.infer_type();
        Expression::Minus {
            left: Box::new(left),
            right: Box::new(right),
            ty,
        }
    }

    /// left * right, typed as left.
    pub fn mult(left: Expression, right: Expression) -> Expression {
        let ty = left.infer_type();
        Expression::Mult {
            left: Box::new(left),
            right: Box::new(right),
            ty,
        }
    }

    pub fn typecast(operand: Expression, ty: Type) -> Expression {
        Expression::Typecast {
            operand: Box::new(operand),
            ty,
        }
    }

    pub fn and(left: Expression, right: Expression) -> Expression {
        Expression::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn equal(left: Expression, right: Expression) -> Expression {
        Expression::Equal {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not_equal(left: Expression, right: Expression) -> Expression {
        Expression::NotEqual {
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

/// Queries
impl Expression {
    /// Returns the type of the value this expression evaluates to.
    pub fn infer_type(&self) -> Type {
        match self {
            Expression::Symbol { ty, .. }
            | Expression::Constant { ty, .. }
            | Expression::NullPointer { ty }
            | Expression::Nondet { ty }
            | Expression::HeapAllocation { ty, .. }
            | Expression::ArrayOf { ty, .. }
            | Expression::StructOf { ty, .. }
            | Expression::Member { ty, .. }
            | Expression::Index { ty, .. }
            | Expression::Dereference { ty, .. }
            | Expression::AddressOf { ty, .. }
            | Expression::Typecast { ty, .. }
            | Expression::Plus { ty, .. }
            | Expression::Minus { ty, .. }
            | Expression::Mult { ty, .. }
            | Expression::UnaryMinus { ty, .. } => ty.clone(),
            Expression::And { .. }
            | Expression::Equal { .. }
            | Expression::NotEqual { .. }
            | Expression::GreaterThan { .. }
            | Expression::GreaterOrEqual { .. }
            | Expression::LessThan { .. }
            | Expression::DynamicObject(..)
            | Expression::InvalidPointer(..) => Type::Bool,
            Expression::PointerObject(..) | Expression::ObjectSize(..) => Type::size_type(),
            Expression::PointerOffset(..) => Type::signed_size_type(),
        }
    }

    /// Returns the value of a Boolean constant expression.
    pub fn as_bool_if_known(&self) -> Option<bool> {
        match self {
            Expression::Constant {
                value: ConstantDomain::True,
                ..
            } => Some(true),
            Expression::Constant {
                value: ConstantDomain::False,
                ..
            } => Some(false),
            _ => None,
        }
    }
}
