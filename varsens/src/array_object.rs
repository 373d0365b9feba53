// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::abstract_object::{AbstractObject, AbstractObjectTrait};
use crate::environment::Environment;
use crate::errors::AccessError;
use crate::options::{ArrayStrategy, Options};
use crate::path::{ArrayIndex, PathSelector};
use crate::types::{Namespace, Type};

use log_derive::logfn_inputs;
use mirai_annotations::*;
use rpds::RedBlackTreeMap;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq)]
pub enum ArrayValue {
    /// Every element could have any value of the element type.
    Top,
    /// The array has no value, the code that produces it is unreachable.
    Bottom,
    /// Elements at constant indices are tracked individually. Every other element is
    /// abstracted by default.
    Elements {
        elements: RedBlackTreeMap<i128, Rc<AbstractObject>>,
        default: Rc<AbstractObject>,
    },
    /// A single abstraction summarizes every element of the array.
    Smashed(Rc<AbstractObject>),
}

/// The abstraction of an array value.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct ArrayAbstractObject {
    ty: Type,
    value: ArrayValue,
}

impl Debug for ArrayAbstractObject {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match &self.value {
            ArrayValue::Top => f.write_str("TOP"),
            ArrayValue::Bottom => f.write_str("BOTTOM"),
            ArrayValue::Elements { elements, default } => f
                .debug_map()
                .entries(elements.iter())
                .entry(&"_", default)
                .finish(),
            ArrayValue::Smashed(summary) => f.write_fmt(format_args!("[{:?}; *]", summary)),
        }
    }
}

/// Constructors
impl ArrayAbstractObject {
    pub fn top(ty: Type) -> ArrayAbstractObject {
        precondition!(ty.element_type().is_some());
        ArrayAbstractObject {
            ty,
            value: ArrayValue::Top,
        }
    }

    pub fn bottom(ty: Type) -> ArrayAbstractObject {
        precondition!(ty.element_type().is_some());
        ArrayAbstractObject {
            ty,
            value: ArrayValue::Bottom,
        }
    }

    /// An array every element of which is abstracted by element.
    #[logfn_inputs(TRACE)]
    pub fn filled(ty: Type, element: Rc<AbstractObject>, options: &Options) -> ArrayAbstractObject {
        let value = match options.array_strategy {
            ArrayStrategy::ElementSensitive => ArrayValue::Elements {
                elements: RedBlackTreeMap::new(),
                default: element,
            },
            ArrayStrategy::Smashed => ArrayValue::Smashed(element),
        };
        Self::canonical(ty, value, Some(options.max_array_elements))
    }

    // Collapses trivial representations, and element sensitive ones that track more than
    // max_elements elements.
    fn canonical(ty: Type, value: ArrayValue, max_elements: Option<usize>) -> ArrayAbstractObject {
        let value = match value {
            ArrayValue::Elements { elements, default } => {
                if max_elements.map_or(false, |max| elements.size() > max) {
                    debug!(
                        "array with {} tracked elements is smashed",
                        elements.size()
                    );
                    Self::canonical_summary(Self::summarize(&elements, &default))
                } else if default.is_top() && elements.values().all(|e| e.is_top()) {
                    ArrayValue::Top
                } else if default.is_bottom() && elements.values().all(|e| e.is_bottom()) {
                    ArrayValue::Bottom
                } else {
                    ArrayValue::Elements { elements, default }
                }
            }
            ArrayValue::Smashed(summary) => Self::canonical_summary(summary),
            value => value,
        };
        ArrayAbstractObject { ty, value }
    }

    fn canonical_summary(summary: Rc<AbstractObject>) -> ArrayValue {
        if summary.is_top() {
            ArrayValue::Top
        } else if summary.is_bottom() {
            ArrayValue::Bottom
        } else {
            ArrayValue::Smashed(summary)
        }
    }

    // The merge of the default and every tracked element.
    fn summarize(
        elements: &RedBlackTreeMap<i128, Rc<AbstractObject>>,
        default: &Rc<AbstractObject>,
    ) -> Rc<AbstractObject> {
        elements
            .values()
            .fold(default.clone(), |summary, element| summary.merge(element).0)
    }
}

/// Queries
impl ArrayAbstractObject {
    pub fn get_type(&self) -> &Type {
        &self.ty
    }

    pub fn value(&self) -> &ArrayValue {
        &self.value
    }

    pub fn is_top(&self) -> bool {
        self.value == ArrayValue::Top
    }

    pub fn is_bottom(&self) -> bool {
        self.value == ArrayValue::Bottom
    }

    fn element_type(&self) -> &Type {
        match self.ty.element_type() {
            Some(element_type) => element_type,
            None => assume_unreachable!("array object of type {:?}", self.ty),
        }
    }

    // True if the index is known to select no element of the array.
    fn is_out_of_bounds(&self, index: &ArrayIndex) -> bool {
        match (index, &self.ty) {
            (ArrayIndex::Constant(i), Type::Array { length, .. }) => {
                *i < 0 || length.map_or(false, |n| *i >= n as i128)
            }
            _ => false,
        }
    }
}

/// Component access
impl ArrayAbstractObject {
    /// Returns the abstraction of the element(s) that index may select.
    #[logfn_inputs(TRACE)]
    pub fn read_component(
        &self,
        index: &ArrayIndex,
        _ns: &Namespace,
    ) -> std::result::Result<Rc<AbstractObject>, AccessError> {
        let element_type = self.element_type();
        if self.is_out_of_bounds(index) {
            debug!("read of {:?} at out of bounds index {:?}", self.ty, index);
            return Ok(AbstractObject::top_of(element_type));
        }
        Ok(match (&self.value, index) {
            (ArrayValue::Top, _) => AbstractObject::top_of(element_type),
            (ArrayValue::Bottom, _) => AbstractObject::bottom_of(element_type),
            (ArrayValue::Smashed(summary), _) => summary.clone(),
            (ArrayValue::Elements { elements, default }, ArrayIndex::Constant(i)) => {
                elements.get(i).unwrap_or(default).clone()
            }
            (ArrayValue::Elements { elements, default }, ArrayIndex::Unknown) => {
                Self::summarize(elements, default)
            }
        })
    }

    /// Returns a new array in which the element(s) that index may select have been written
    /// at remaining_path. The receiver is left as is.
    #[logfn_inputs(TRACE)]
    pub fn write_component(
        &self,
        env: &Environment,
        ns: &Namespace,
        remaining_path: &[PathSelector],
        index: &ArrayIndex,
        value: &Rc<AbstractObject>,
        merging_write: bool,
    ) -> std::result::Result<ArrayAbstractObject, AccessError> {
        if self.is_out_of_bounds(index) {
            debug!(
                "write to {:?} at out of bounds index {:?} is ignored",
                self.ty, index
            );
            return Ok(self.clone());
        }
        let options = env.options();
        let new_value = match self.reified(options) {
            ArrayValue::Elements {
                mut elements,
                default,
            } => match index {
                ArrayIndex::Constant(i) => {
                    let old_element = elements.get(i).unwrap_or(&default).clone();
                    let new_element =
                        old_element.write(env, ns, remaining_path, value, merging_write)?;
                    elements.insert_mut(*i, new_element);
                    ArrayValue::Elements { elements, default }
                }
                ArrayIndex::Unknown => {
                    let mut written = RedBlackTreeMap::new();
                    for (i, element) in elements.iter() {
                        let element = element.write(env, ns, remaining_path, value, true)?;
                        written.insert_mut(*i, element);
                    }
                    let default = default.write(env, ns, remaining_path, value, true)?;
                    ArrayValue::Elements {
                        elements: written,
                        default,
                    }
                }
            },
            ArrayValue::Smashed(summary) => {
                ArrayValue::Smashed(summary.write(env, ns, remaining_path, value, true)?)
            }
            ArrayValue::Top | ArrayValue::Bottom => assume_unreachable!(),
        };
        Ok(Self::canonical(
            self.ty.clone(),
            new_value,
            Some(options.max_array_elements),
        ))
    }

    // Returns the value in the strategy specific form, with top and bottom arrays spelled out.
    fn reified(&self, options: &Options) -> ArrayValue {
        let element = match &self.value {
            ArrayValue::Top => AbstractObject::top_of(self.element_type()),
            ArrayValue::Bottom => AbstractObject::bottom_of(self.element_type()),
            value => return value.clone(),
        };
        match options.array_strategy {
            ArrayStrategy::ElementSensitive => ArrayValue::Elements {
                elements: RedBlackTreeMap::new(),
                default: element,
            },
            ArrayStrategy::Smashed => ArrayValue::Smashed(element),
        }
    }
}

/// Lattice operations
impl ArrayAbstractObject {
    /// Merges (or widens) the two arrays element by element. If either side is smashed,
    /// the result is smashed. Callers have already dealt with top and bottom operands.
    /// The flag is true if the result differs from self.
    /// The number of tracked elements is bounded again by the next write.
    pub fn merge_or_widen(
        &self,
        other: &ArrayAbstractObject,
        widen: bool,
    ) -> (ArrayAbstractObject, bool) {
        let join = |x: &Rc<AbstractObject>, y: &Rc<AbstractObject>| {
            if widen {
                x.widen(y)
            } else {
                x.merge(y)
            }
        };
        match (&self.value, &other.value) {
            (
                ArrayValue::Elements {
                    elements: elements1,
                    default: default1,
                },
                ArrayValue::Elements {
                    elements: elements2,
                    default: default2,
                },
            ) => {
                let (default, mut modified) = join(default1, default2);
                let mut elements = RedBlackTreeMap::new();
                for (i, element1) in elements1.iter() {
                    let (element, changed) = join(element1, elements2.get(i).unwrap_or(default2));
                    modified |= changed;
                    elements.insert_mut(*i, element);
                }
                for (i, element2) in elements2.iter() {
                    if elements1.contains_key(i) {
                        continue;
                    }
                    // self reads default1 at i
                    let (element, changed) = join(default1, element2);
                    modified |= changed;
                    elements.insert_mut(*i, element);
                }
                if !modified {
                    return (self.clone(), false);
                }
                let value = ArrayValue::Elements { elements, default };
                (Self::canonical(self.ty.clone(), value, None), true)
            }
            (ArrayValue::Smashed(summary1), ArrayValue::Smashed(summary2)) => {
                let (summary, modified) = join(summary1, summary2);
                if !modified {
                    return (self.clone(), false);
                }
                let value = ArrayValue::Smashed(summary);
                (Self::canonical(self.ty.clone(), value, None), true)
            }
            (ArrayValue::Elements { elements, default }, ArrayValue::Smashed(summary2)) => {
                let (summary, _) = join(&Self::summarize(elements, default), summary2);
                let value = ArrayValue::Smashed(summary);
                (Self::canonical(self.ty.clone(), value, None), true)
            }
            (ArrayValue::Smashed(summary1), ArrayValue::Elements { elements, default }) => {
                let (summary, modified) = join(summary1, &Self::summarize(elements, default));
                if !modified {
                    return (self.clone(), false);
                }
                let value = ArrayValue::Smashed(summary);
                (Self::canonical(self.ty.clone(), value, None), true)
            }
            _ => assume_unreachable!("merging {:?} with {:?}", self, other),
        }
    }
}
