// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::abstract_object::{AbstractObject, AbstractObjectTrait};
use crate::environment::Environment;
use crate::errors::AccessError;
use crate::path::PathSelector;
use crate::types::{Component, Namespace, Type};

use log_derive::logfn_inputs;
use mirai_annotations::*;
use rpds::RedBlackTreeMap;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq)]
pub enum StructValue {
    /// Every field could have any value of its type.
    Top,
    /// The struct has no value, the code that produces it is unreachable.
    Bottom,
    /// The abstraction of each field. A field that has no entry is top.
    Fields(RedBlackTreeMap<Rc<str>, Rc<AbstractObject>>),
}

/// A field sensitive abstraction of a struct value.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct StructAbstractObject {
    ty: Type,
    value: StructValue,
}

impl Debug for StructAbstractObject {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match &self.value {
            StructValue::Top => f.write_str("TOP"),
            StructValue::Bottom => f.write_str("BOTTOM"),
            StructValue::Fields(fields) => f.debug_map().entries(fields.iter()).finish(),
        }
    }
}

/// Constructors
impl StructAbstractObject {
    pub fn top(ty: Type) -> StructAbstractObject {
        precondition!(matches!(ty, Type::StructTag(..)));
        StructAbstractObject {
            ty,
            value: StructValue::Top,
        }
    }

    pub fn bottom(ty: Type) -> StructAbstractObject {
        precondition!(matches!(ty, Type::StructTag(..)));
        StructAbstractObject {
            ty,
            value: StructValue::Bottom,
        }
    }

    /// A struct whose fields are abstracted by values, given in component declaration order.
    /// A value of the wrong type is replaced by top.
    #[logfn_inputs(TRACE)]
    pub fn from_components(
        ty: Type,
        values: Vec<Rc<AbstractObject>>,
        ns: &Namespace,
    ) -> StructAbstractObject {
        let struct_type = match ns.struct_type(&ty) {
            Some(struct_type) => struct_type,
            None => assume_unreachable!("struct object of type {:?}", ty),
        };
        checked_precondition!(struct_type.components.len() == values.len());
        let mut fields = RedBlackTreeMap::new();
        for (component, value) in struct_type.components.iter().zip(values.into_iter()) {
            let value = if *value.get_type() == component.ty {
                value
            } else {
                debug!(
                    "initializer of type {:?} for field {} stores top",
                    value.get_type(),
                    component.name
                );
                AbstractObject::top_of(&component.ty)
            };
            fields.insert_mut(component.name.clone(), value);
        }
        Self::canonical(ty, fields)
    }

    /// A struct whose fields are all top, or all bottom, is the same as a top (bottom) struct.
    fn canonical(ty: Type, fields: RedBlackTreeMap<Rc<str>, Rc<AbstractObject>>) -> Self {
        let value = if fields.values().all(|f| f.is_top()) {
            StructValue::Top
        } else if fields.values().all(|f| f.is_bottom()) {
            StructValue::Bottom
        } else {
            StructValue::Fields(fields)
        };
        StructAbstractObject { ty, value }
    }
}

/// Queries
impl StructAbstractObject {
    pub fn get_type(&self) -> &Type {
        &self.ty
    }

    pub fn value(&self) -> &StructValue {
        &self.value
    }

    pub fn is_top(&self) -> bool {
        self.value == StructValue::Top
    }

    pub fn is_bottom(&self) -> bool {
        self.value == StructValue::Bottom
    }

    // Looks up the declared component for the field.
    fn component<'a>(
        &self,
        field: &str,
        ns: &'a Namespace,
    ) -> std::result::Result<&'a Component, AccessError> {
        let tag = match &self.ty {
            Type::StructTag(tag) => tag,
            _ => assume_unreachable!("struct object of type {:?}", self.ty),
        };
        ns.follow_tag(tag)
            .component(field)
            .ok_or_else(|| AccessError::UnknownField {
                tag: tag.clone(),
                field: Rc::from(field),
            })
    }

    /// Returns a map with an entry for every declared field.
    /// Top and bottom structs are turned into structs of top and bottom fields.
    fn reified(&self, ns: &Namespace) -> RedBlackTreeMap<Rc<str>, Rc<AbstractObject>> {
        let struct_type = match ns.struct_type(&self.ty) {
            Some(struct_type) => struct_type,
            None => assume_unreachable!("struct object of type {:?}", self.ty),
        };
        let mut fields = match &self.value {
            StructValue::Fields(fields) => fields.clone(),
            _ => RedBlackTreeMap::new(),
        };
        for component in struct_type.components.iter() {
            if fields.contains_key(&component.name) {
                continue;
            }
            let child = if self.is_bottom() {
                AbstractObject::bottom_of(&component.ty)
            } else {
                AbstractObject::top_of(&component.ty)
            };
            fields.insert_mut(component.name.clone(), child);
        }
        fields
    }
}

/// Component access
impl StructAbstractObject {
    /// Returns the abstraction of the named field.
    #[logfn_inputs(TRACE)]
    pub fn read_component(
        &self,
        field: &str,
        ns: &Namespace,
    ) -> std::result::Result<Rc<AbstractObject>, AccessError> {
        let component = self.component(field, ns)?;
        Ok(match &self.value {
            StructValue::Top => AbstractObject::top_of(&component.ty),
            StructValue::Bottom => AbstractObject::bottom_of(&component.ty),
            StructValue::Fields(fields) => fields
                .get(field)
                .cloned()
                .unwrap_or_else(|| AbstractObject::top_of(&component.ty)),
        })
    }

    /// Returns a new struct in which the component at field.remaining_path has been written.
    /// The receiver is left as is.
    #[logfn_inputs(TRACE)]
    pub fn write_component(
        &self,
        env: &Environment,
        ns: &Namespace,
        remaining_path: &[PathSelector],
        field: &str,
        value: &Rc<AbstractObject>,
        merging_write: bool,
    ) -> std::result::Result<StructAbstractObject, AccessError> {
        let component = self.component(field, ns)?;
        let mut fields = self.reified(ns);
        let old_child = fields
            .get(field)
            .cloned()
            .unwrap_or_else(|| AbstractObject::top_of(&component.ty));
        let new_child = old_child.write(env, ns, remaining_path, value, merging_write)?;
        if Rc::ptr_eq(&old_child, &new_child) {
            return Ok(self.clone());
        }
        fields.insert_mut(component.name.clone(), new_child);
        Ok(Self::canonical(self.ty.clone(), fields))
    }
}

/// Lattice operations
impl StructAbstractObject {
    /// Merges (or widens) the fields of the two structs pairwise.
    /// Callers have already dealt with top and bottom operands.
    /// The flag is true if the result differs from self.
    pub fn merge_or_widen(
        &self,
        other: &StructAbstractObject,
        widen: bool,
    ) -> (StructAbstractObject, bool) {
        let (fields1, fields2) = match (&self.value, &other.value) {
            (StructValue::Fields(f1), StructValue::Fields(f2)) => (f1, f2),
            _ => assume_unreachable!("merging {:?} with {:?}", self, other),
        };
        let mut result = fields1.clone();
        let mut modified = false;
        for (name, child1) in fields1.iter() {
            let merged = match fields2.get(name) {
                Some(child2) if widen => child1.widen(child2),
                Some(child2) => child1.merge(child2),
                None if child1.is_top() => (child1.clone(), false),
                None => (AbstractObject::top_of(child1.get_type()), true),
            };
            if merged.1 {
                result.insert_mut(name.clone(), merged.0);
                modified = true;
            }
        }
        // Fields only tracked by other are top in self, so they stay top.
        (Self::canonical(self.ty.clone(), result), modified)
    }
}
