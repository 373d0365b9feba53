// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::bool_domain::BoolDomain;
use crate::expression::Expression;
use crate::k_limits;
use crate::path::Path;
use crate::scalar_object::ScalarAbstractObject;
use crate::types::Type;

use log_derive::{logfn, logfn_inputs};
use rpds::RedBlackTreeSet;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

/// A memory location a pointer may point to: the path of an object, and the distance
/// (in elements of the object's type) of the pointer from that object. An offset of None means
/// that the distance is not known.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PointerTarget {
    pub path: Rc<Path>,
    pub offset: Option<i128>,
}

impl Debug for PointerTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self.offset {
            Some(0) => f.write_fmt(format_args!("&{:?}", self.path)),
            Some(k) => f.write_fmt(format_args!("&{:?} + {}", self.path, k)),
            None => f.write_fmt(format_args!("&{:?} + ?", self.path)),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq)]
pub enum PointerValue {
    /// The pointer could have any value, including values that point nowhere.
    Top,
    /// The pointer has no value, the code that produces it is unreachable.
    Bottom,
    /// The pointer is one of the targets, or null if may_be_null is set, or a dangling or out of
    /// bounds pointer if may_be_invalid is set. may_be_dynamic records that at least one of the
    /// targets (or an untracked target) is a dynamically allocated object.
    Targets {
        targets: RedBlackTreeSet<PointerTarget>,
        may_be_null: bool,
        may_be_invalid: bool,
        may_be_dynamic: bool,
    },
}

/// The abstraction of a pointer value.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct PointerAbstractObject {
    ty: Type,
    value: PointerValue,
}

impl Debug for PointerAbstractObject {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match &self.value {
            PointerValue::Top => f.write_str("TOP"),
            PointerValue::Bottom => f.write_str("BOTTOM"),
            PointerValue::Targets {
                targets,
                may_be_null,
                may_be_invalid,
                ..
            } => {
                let mut set = f.debug_set();
                set.entries(targets.iter());
                if *may_be_null {
                    set.entry(&format_args!("NULL"));
                }
                if *may_be_invalid {
                    set.entry(&format_args!("INVALID"));
                }
                set.finish()
            }
        }
    }
}

/// Constructors
impl PointerAbstractObject {
    pub fn top(ty: Type) -> PointerAbstractObject {
        PointerAbstractObject {
            ty,
            value: PointerValue::Top,
        }
    }

    pub fn bottom(ty: Type) -> PointerAbstractObject {
        PointerAbstractObject {
            ty,
            value: PointerValue::Bottom,
        }
    }

    /// The null pointer of the given pointer type.
    pub fn null(ty: Type) -> PointerAbstractObject {
        PointerAbstractObject {
            ty,
            value: PointerValue::Targets {
                targets: RedBlackTreeSet::new(),
                may_be_null: true,
                may_be_invalid: false,
                may_be_dynamic: false,
            },
        }
    }

    /// A pointer that definitely points to the start of the object at the given path.
    #[logfn_inputs(TRACE)]
    pub fn to_path(ty: Type, path: Rc<Path>) -> PointerAbstractObject {
        let may_be_dynamic = path.is_rooted_by_heap_block();
        PointerAbstractObject {
            ty,
            value: PointerValue::Targets {
                targets: RedBlackTreeSet::new().insert(PointerTarget {
                    path,
                    offset: Some(0),
                }),
                may_be_null: false,
                may_be_invalid: false,
                may_be_dynamic,
            },
        }
    }

    /// A pointer that is one of the given targets, or possibly null.
    #[logfn_inputs(TRACE)]
    pub fn from_targets(
        ty: Type,
        targets: Vec<PointerTarget>,
        may_be_null: bool,
        may_be_invalid: bool,
    ) -> PointerAbstractObject {
        let may_be_dynamic = targets.iter().any(|t| t.path.is_rooted_by_heap_block());
        Self::bounded(
            ty,
            targets.into_iter().collect(),
            may_be_null,
            may_be_invalid,
            may_be_dynamic,
        )
    }

    // Pointer sets that grow too large are not worth tracking.
    fn bounded(
        ty: Type,
        targets: RedBlackTreeSet<PointerTarget>,
        may_be_null: bool,
        may_be_invalid: bool,
        may_be_dynamic: bool,
    ) -> PointerAbstractObject {
        if targets.size() > k_limits::MAX_POINTER_TARGETS {
            debug!(
                "pointer with {} targets is collapsed to top",
                targets.size()
            );
            return PointerAbstractObject::top(ty);
        }
        PointerAbstractObject {
            ty,
            value: PointerValue::Targets {
                targets,
                may_be_null,
                may_be_invalid,
                may_be_dynamic,
            },
        }
    }
}

/// Queries
impl PointerAbstractObject {
    pub fn get_type(&self) -> &Type {
        &self.ty
    }

    pub fn value(&self) -> &PointerValue {
        &self.value
    }

    pub fn is_top(&self) -> bool {
        self.value == PointerValue::Top
    }

    pub fn is_bottom(&self) -> bool {
        self.value == PointerValue::Bottom
    }

    /// The possible targets. Top and bottom pointers have none.
    pub fn targets(&self) -> Vec<PointerTarget> {
        if let PointerValue::Targets { targets, .. } = &self.value {
            targets.iter().cloned().collect()
        } else {
            Vec::new()
        }
    }

    pub fn may_be_null(&self) -> bool {
        match &self.value {
            PointerValue::Top => true,
            PointerValue::Bottom => false,
            PointerValue::Targets { may_be_null, .. } => *may_be_null,
        }
    }

    pub fn may_be_invalid(&self) -> bool {
        match &self.value {
            PointerValue::Top => true,
            PointerValue::Bottom => false,
            PointerValue::Targets { may_be_invalid, .. } => *may_be_invalid,
        }
    }

    pub fn may_be_dynamic(&self) -> bool {
        match &self.value {
            PointerValue::Top => true,
            PointerValue::Bottom => false,
            PointerValue::Targets { may_be_dynamic, .. } => *may_be_dynamic,
        }
    }

    /// True if the pointer definitely points to exactly one known location, so that a write
    /// through it definitely updates that location.
    pub fn is_precise(&self) -> bool {
        match &self.value {
            PointerValue::Targets {
                targets,
                may_be_null: false,
                may_be_invalid: false,
                ..
            } => targets.size() == 1 && targets.iter().all(|t| t.offset.is_some()),
            _ => false,
        }
    }

    /// Returns the concrete value of the pointer, if it is a single known address or null.
    pub fn to_constant(&self) -> Option<Expression> {
        if let PointerValue::Targets {
            targets,
            may_be_null,
            may_be_invalid: false,
            ..
        } = &self.value
        {
            match (targets.size(), *may_be_null) {
                (0, true) => return Some(Expression::NullPointer { ty: self.ty.clone() }),
                (1, false) => {
                    let target = targets.first()?;
                    let address = Expression::AddressOf {
                        object: Box::new(target.path.to_expression()),
                        ty: self.ty.clone(),
                    };
                    return match target.offset {
                        Some(0) => Some(address),
                        Some(k) => Some(Expression::plus(address, Expression::signed_constant(k))),
                        None => None,
                    };
                }
                _ => (),
            }
        }
        None
    }

    /// Is the pointer null? False if it definitely has a target, True if it is definitely null.
    #[logfn(TRACE)]
    pub fn null_status(&self) -> BoolDomain {
        match &self.value {
            PointerValue::Top => BoolDomain::Top,
            PointerValue::Bottom => BoolDomain::Bottom,
            PointerValue::Targets {
                targets,
                may_be_null,
                may_be_invalid,
                ..
            } => {
                if !*may_be_null {
                    BoolDomain::False
                } else if targets.is_empty() && !*may_be_invalid {
                    BoolDomain::True
                } else {
                    BoolDomain::Top
                }
            }
        }
    }

    /// Does the pointer point into a dynamically allocated object?
    #[logfn(TRACE)]
    pub fn dynamic_status(&self) -> BoolDomain {
        match &self.value {
            PointerValue::Top => BoolDomain::Top,
            PointerValue::Bottom => BoolDomain::Bottom,
            PointerValue::Targets {
                targets,
                may_be_null,
                may_be_invalid,
                may_be_dynamic,
            } => {
                if !*may_be_dynamic {
                    BoolDomain::False
                } else if !*may_be_null
                    && !*may_be_invalid
                    && targets.iter().all(|t| t.path.is_rooted_by_heap_block())
                {
                    BoolDomain::True
                } else {
                    BoolDomain::Top
                }
            }
        }
    }

    /// Do self and other point into the same object?
    /// Objects are identified by the roots of the target paths.
    #[logfn_inputs(TRACE)]
    pub fn same_object(&self, other: &PointerAbstractObject) -> BoolDomain {
        match (&self.value, &other.value) {
            (PointerValue::Bottom, _) | (_, PointerValue::Bottom) => BoolDomain::Bottom,
            (PointerValue::Top, _) | (_, PointerValue::Top) => BoolDomain::Top,
            (
                PointerValue::Targets {
                    targets: t1,
                    may_be_null: n1,
                    may_be_invalid: i1,
                    ..
                },
                PointerValue::Targets {
                    targets: t2,
                    may_be_null: n2,
                    may_be_invalid: i2,
                    ..
                },
            ) => {
                if *i1 || *i2 {
                    return BoolDomain::Top;
                }
                // None stands for the null object
                let objects = |targets: &RedBlackTreeSet<PointerTarget>, null: bool| {
                    let mut objects: Vec<Option<Rc<Path>>> =
                        targets.iter().map(|t| Some(t.path.split_root().0)).collect();
                    if null {
                        objects.push(None);
                    }
                    objects
                };
                let objects2 = objects(t2, *n2);
                let mut result = BoolDomain::Bottom;
                for o1 in objects(t1, *n1).iter() {
                    for o2 in objects2.iter() {
                        result = result.join(&(o1 == o2).into());
                    }
                }
                result
            }
        }
    }
}

/// Lattice operations
impl PointerAbstractObject {
    /// Returns the union of the two pointer sets.
    /// Callers have already dealt with top and bottom operands.
    #[logfn_inputs(TRACE)]
    pub fn merge(&self, other: &PointerAbstractObject) -> PointerAbstractObject {
        match (&self.value, &other.value) {
            (PointerValue::Bottom, _) => other.clone(),
            (_, PointerValue::Bottom) => self.clone(),
            (PointerValue::Top, _) | (_, PointerValue::Top) => {
                PointerAbstractObject::top(self.ty.clone())
            }
            (
                PointerValue::Targets {
                    targets: t1,
                    may_be_null: n1,
                    may_be_invalid: i1,
                    may_be_dynamic: d1,
                },
                PointerValue::Targets {
                    targets: t2,
                    may_be_null: n2,
                    may_be_invalid: i2,
                    may_be_dynamic: d2,
                },
            ) => {
                let mut targets = t1.clone();
                for t in t2.iter() {
                    targets.insert_mut(t.clone());
                }
                Self::bounded(self.ty.clone(), targets, *n1 || *n2, *i1 || *i2, *d1 || *d2)
            }
        }
    }

    /// True if every address represented by self is also represented by other.
    pub fn less_or_equal(&self, other: &PointerAbstractObject) -> bool {
        match (&self.value, &other.value) {
            (PointerValue::Bottom, _) | (_, PointerValue::Top) => true,
            (_, PointerValue::Bottom) | (PointerValue::Top, _) => false,
            (
                PointerValue::Targets {
                    targets: t1,
                    may_be_null: n1,
                    may_be_invalid: i1,
                    may_be_dynamic: d1,
                },
                PointerValue::Targets {
                    targets: t2,
                    may_be_null: n2,
                    may_be_invalid: i2,
                    may_be_dynamic: d2,
                },
            ) => {
                (!*n1 || *n2)
                    && (!*i1 || *i2)
                    && (!*d1 || *d2)
                    && t1.iter().all(|t| t2.contains(t))
            }
        }
    }
}

/// Transfer functions
impl PointerAbstractObject {
    /// Returns the pointer that is "self + offset", offset counting elements of the pointee type.
    /// Moving a pointer away from an object that is not an array element makes it invalid.
    #[logfn_inputs(TRACE)]
    pub fn offset_by(&self, offset: &ScalarAbstractObject) -> PointerAbstractObject {
        if offset.is_bottom() {
            return PointerAbstractObject::bottom(self.ty.clone());
        }
        let delta = offset.to_constant().and_then(|c| c.as_i128());
        match &self.value {
            PointerValue::Targets {
                targets,
                may_be_null,
                may_be_invalid,
                may_be_dynamic,
            } => {
                if delta == Some(0) {
                    return self.clone();
                }
                let mut may_be_invalid = *may_be_invalid;
                let mut moved = RedBlackTreeSet::new();
                for target in targets.iter() {
                    let offset = match (target.offset, delta) {
                        (Some(k), Some(d)) => k.checked_add(d),
                        _ => None,
                    };
                    if target.path.with_element_offset(Some(1)).is_none() {
                        may_be_invalid = true;
                    }
                    moved.insert_mut(PointerTarget {
                        path: target.path.clone(),
                        offset,
                    });
                }
                Self::bounded(
                    self.ty.clone(),
                    moved,
                    *may_be_null,
                    may_be_invalid,
                    *may_be_dynamic,
                )
            }
            _ => self.clone(),
        }
    }

    /// The same set of addresses, viewed as a pointer of another type.
    pub fn with_type(&self, ty: Type) -> PointerAbstractObject {
        PointerAbstractObject {
            ty,
            value: self.value.clone(),
        }
    }
}
