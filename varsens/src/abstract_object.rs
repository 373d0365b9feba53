// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::array_object::ArrayAbstractObject;
use crate::environment::Environment;
use crate::errors::AccessError;
use crate::expression::Expression;
use crate::path::PathSelector;
use crate::pointer_object::PointerAbstractObject;
use crate::scalar_object::ScalarAbstractObject;
use crate::struct_object::StructAbstractObject;
use crate::types::{Namespace, Type};

use log_derive::{logfn, logfn_inputs};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

/// An abstract object is a sound over approximation of the set of concrete values that a
/// program object of a given type may hold at a given program point. Objects are immutable
/// and shared via Rc. An update produces a new object that shares every component that the
/// update did not touch.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq)]
pub enum AbstractObject {
    Scalar(ScalarAbstractObject),
    Pointer(PointerAbstractObject),
    Struct(StructAbstractObject),
    Array(ArrayAbstractObject),
}

impl Debug for AbstractObject {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            AbstractObject::Scalar(s) => s.fmt(f),
            AbstractObject::Pointer(p) => p.fmt(f),
            AbstractObject::Struct(s) => s.fmt(f),
            AbstractObject::Array(a) => a.fmt(f),
        }
    }
}

impl From<ScalarAbstractObject> for AbstractObject {
    fn from(scalar: ScalarAbstractObject) -> Self {
        AbstractObject::Scalar(scalar)
    }
}

impl From<PointerAbstractObject> for AbstractObject {
    fn from(pointer: PointerAbstractObject) -> Self {
        AbstractObject::Pointer(pointer)
    }
}

impl From<StructAbstractObject> for AbstractObject {
    fn from(structure: StructAbstractObject) -> Self {
        AbstractObject::Struct(structure)
    }
}

impl From<ArrayAbstractObject> for AbstractObject {
    fn from(array: ArrayAbstractObject) -> Self {
        AbstractObject::Array(array)
    }
}

/// Constructors
impl AbstractObject {
    /// Returns an object that could be any value of the given type.
    /// The kind of object is determined by the type.
    #[logfn_inputs(TRACE)]
    pub fn top_of(ty: &Type) -> Rc<AbstractObject> {
        let ty = ty.clone();
        Rc::new(match ty {
            Type::Pointer(..) => PointerAbstractObject::top(ty).into(),
            Type::StructTag(..) => StructAbstractObject::top(ty).into(),
            Type::Array { .. } => ArrayAbstractObject::top(ty).into(),
            Type::Bool | Type::Signed(..) | Type::Unsigned(..) | Type::Empty => {
                ScalarAbstractObject::top(ty).into()
            }
        })
    }

    /// Returns an object of the given type that has no value.
    #[logfn_inputs(TRACE)]
    pub fn bottom_of(ty: &Type) -> Rc<AbstractObject> {
        let ty = ty.clone();
        Rc::new(match ty {
            Type::Pointer(..) => PointerAbstractObject::bottom(ty).into(),
            Type::StructTag(..) => StructAbstractObject::bottom(ty).into(),
            Type::Array { .. } => ArrayAbstractObject::bottom(ty).into(),
            Type::Bool | Type::Signed(..) | Type::Unsigned(..) | Type::Empty => {
                ScalarAbstractObject::bottom(ty).into()
            }
        })
    }
}

/// Queries
impl AbstractObject {
    pub fn get_type(&self) -> &Type {
        match self {
            AbstractObject::Scalar(s) => s.get_type(),
            AbstractObject::Pointer(p) => p.get_type(),
            AbstractObject::Struct(s) => s.get_type(),
            AbstractObject::Array(a) => a.get_type(),
        }
    }

    /// True if the object could be any value of its type.
    pub fn is_top(&self) -> bool {
        match self {
            AbstractObject::Scalar(s) => s.is_top(),
            AbstractObject::Pointer(p) => p.is_top(),
            AbstractObject::Struct(s) => s.is_top(),
            AbstractObject::Array(a) => a.is_top(),
        }
    }

    /// True if the object has no value, so that the code that computes it is unreachable.
    pub fn is_bottom(&self) -> bool {
        match self {
            AbstractObject::Scalar(s) => s.is_bottom(),
            AbstractObject::Pointer(p) => p.is_bottom(),
            AbstractObject::Struct(s) => s.is_bottom(),
            AbstractObject::Array(a) => a.is_bottom(),
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarAbstractObject> {
        if let AbstractObject::Scalar(s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub fn as_pointer(&self) -> Option<&PointerAbstractObject> {
        if let AbstractObject::Pointer(p) = self {
            Some(p)
        } else {
            None
        }
    }

    /// Returns an expression for the single concrete value this object represents.
    /// None if the object represents more than one value, or none at all.
    #[logfn(TRACE)]
    pub fn to_constant(&self) -> Option<Expression> {
        match self {
            AbstractObject::Scalar(s) => s.to_constant().map(|value| Expression::Constant {
                value,
                ty: s.get_type().clone(),
            }),
            AbstractObject::Pointer(p) => p.to_constant(),
            AbstractObject::Struct(..) | AbstractObject::Array(..) => None,
        }
    }

    /// Returns the abstraction of the component picked out by selector.
    pub fn read_component(
        &self,
        selector: &PathSelector,
        ns: &Namespace,
    ) -> std::result::Result<Rc<AbstractObject>, AccessError> {
        match (self, selector) {
            (AbstractObject::Struct(s), PathSelector::Field(field)) => s.read_component(field, ns),
            (AbstractObject::Array(a), PathSelector::Index(index)) => a.read_component(index, ns),
            _ => Err(AccessError::NotAComposite {
                ty: self.get_type().clone(),
                selector: selector.clone(),
            }),
        }
    }
}

pub trait AbstractObjectTrait {
    fn merge(&self, other: &Self) -> (Self, bool)
    where
        Self: Sized;
    fn widen(&self, other: &Self) -> (Self, bool)
    where
        Self: Sized;
    fn less_or_equal(&self, other: &Self) -> bool;
    fn read_path(
        &self,
        path: &[PathSelector],
        ns: &Namespace,
    ) -> std::result::Result<Self, AccessError>
    where
        Self: Sized;
    fn write(
        &self,
        env: &Environment,
        ns: &Namespace,
        path: &[PathSelector],
        value: &Self,
        merging_write: bool,
    ) -> std::result::Result<Self, AccessError>
    where
        Self: Sized;
}

impl AbstractObjectTrait for Rc<AbstractObject> {
    /// Returns the least upper bound of self and other, along with a flag that is true if
    /// the result differs from self. If the result is the same as self, it is self.
    #[logfn_inputs(TRACE)]
    fn merge(&self, other: &Rc<AbstractObject>) -> (Rc<AbstractObject>, bool) {
        merge_or_widen(self, other, false)
    }

    /// Like merge, except that scalar intervals drop the bounds that moved.
    /// other is the value of the next iteration, self the value of the previous one.
    #[logfn_inputs(TRACE)]
    fn widen(&self, other: &Rc<AbstractObject>) -> (Rc<AbstractObject>, bool) {
        merge_or_widen(self, other, true)
    }

    /// True if every value represented by self is also represented by other.
    #[logfn_inputs(TRACE)]
    fn less_or_equal(&self, other: &Rc<AbstractObject>) -> bool {
        match (self.as_ref(), other.as_ref()) {
            (AbstractObject::Scalar(s1), AbstractObject::Scalar(s2)) => s1.less_or_equal(s2),
            (AbstractObject::Pointer(p1), AbstractObject::Pointer(p2)) => p1.less_or_equal(p2),
            _ => self.is_bottom() || !other.merge(self).1,
        }
    }

    /// Reads the component at the end of the path.
    fn read_path(
        &self,
        path: &[PathSelector],
        ns: &Namespace,
    ) -> std::result::Result<Rc<AbstractObject>, AccessError> {
        let mut result = self.clone();
        for selector in path.iter() {
            result = result.read_component(selector, ns)?;
        }
        Ok(result)
    }

    /// Returns an object that is self, updated with value at path. A merging write stores the
    /// merge of the old component and value, rather than value itself.
    #[logfn_inputs(TRACE)]
    fn write(
        &self,
        env: &Environment,
        ns: &Namespace,
        path: &[PathSelector],
        value: &Rc<AbstractObject>,
        merging_write: bool,
    ) -> std::result::Result<Rc<AbstractObject>, AccessError> {
        match path.split_first() {
            None => {
                let value = if value.get_type() == self.get_type() {
                    value.clone()
                } else {
                    debug!(
                        "write of {:?} to an object of type {:?} stores top",
                        value.get_type(),
                        self.get_type()
                    );
                    AbstractObject::top_of(self.get_type())
                };
                if merging_write {
                    Ok(self.merge(&value).0)
                } else {
                    Ok(value)
                }
            }
            Some((selector, remaining_path)) => match (self.as_ref(), selector) {
                (AbstractObject::Struct(s), PathSelector::Field(field)) => {
                    let result =
                        s.write_component(env, ns, remaining_path, field, value, merging_write)?;
                    Ok(Rc::new(result.into()))
                }
                (AbstractObject::Array(a), PathSelector::Index(index)) => {
                    let result =
                        a.write_component(env, ns, remaining_path, index, value, merging_write)?;
                    Ok(Rc::new(result.into()))
                }
                _ => Err(AccessError::NotAComposite {
                    ty: self.get_type().clone(),
                    selector: selector.clone(),
                }),
            },
        }
    }
}

fn merge_or_widen(
    x: &Rc<AbstractObject>,
    y: &Rc<AbstractObject>,
    widen: bool,
) -> (Rc<AbstractObject>, bool) {
    if Rc::ptr_eq(x, y) || y.is_bottom() || x.is_top() {
        return (x.clone(), false);
    }
    if x.is_bottom() {
        return (y.clone(), true);
    }
    if x.get_type() != y.get_type() {
        debug!(
            "merging objects of different types {:?} and {:?} gives top",
            x.get_type(),
            y.get_type()
        );
        return (AbstractObject::top_of(x.get_type()), true);
    }
    if y.is_top() {
        return (y.clone(), true);
    }
    let merged: Option<AbstractObject> = match (x.as_ref(), y.as_ref()) {
        (AbstractObject::Scalar(s1), AbstractObject::Scalar(s2)) => {
            let s = if widen { s1.widen(s2) } else { s1.merge(s2) };
            if s == *s1 {
                None
            } else {
                Some(s.into())
            }
        }
        (AbstractObject::Pointer(p1), AbstractObject::Pointer(p2)) => {
            let p = p1.merge(p2);
            if p == *p1 {
                None
            } else {
                Some(p.into())
            }
        }
        (AbstractObject::Struct(s1), AbstractObject::Struct(s2)) => {
            let (s, modified) = s1.merge_or_widen(s2, widen);
            if modified {
                Some(s.into())
            } else {
                None
            }
        }
        (AbstractObject::Array(a1), AbstractObject::Array(a2)) => {
            let (a, modified) = a1.merge_or_widen(a2, widen);
            if modified {
                Some(a.into())
            } else {
                None
            }
        }
        _ => {
            debug!("merging {:?} with {:?} gives top", x, y);
            return (AbstractObject::top_of(x.get_type()), true);
        }
    };
    match merged {
        Some(object) => (Rc::new(object), true),
        None => (x.clone(), false),
    }
}
