// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::bool_domain::BoolDomain;
use crate::constant_domain::ConstantDomain;
use crate::interval_domain::{self, IntervalDomain};
use crate::options::ScalarDomainKind;
use crate::path::ArrayIndex;
use crate::types::Type;

use log_derive::logfn_inputs;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result};

/// The abstract value of a scalar. Which of the non trivial forms is used depends on the
/// configured scalar domain: the constants domain only ever produces `Constant`, the intervals
/// domain produces `Interval` for integers and `Constant` for Booleans.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ScalarValue {
    Top,
    Bottom,
    Constant(ConstantDomain),
    Interval(IntervalDomain),
}

/// The abstraction of a value of Boolean, integer or otherwise non aggregate type.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ScalarAbstractObject {
    ty: Type,
    value: ScalarValue,
}

impl Debug for ScalarAbstractObject {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match &self.value {
            ScalarValue::Top => f.write_str("TOP"),
            ScalarValue::Bottom => f.write_str("BOTTOM"),
            ScalarValue::Constant(c) => c.fmt(f),
            ScalarValue::Interval(i) => i.fmt(f),
        }
    }
}

/// Constructors
impl ScalarAbstractObject {
    pub fn top(ty: Type) -> ScalarAbstractObject {
        ScalarAbstractObject {
            ty,
            value: ScalarValue::Top,
        }
    }

    pub fn bottom(ty: Type) -> ScalarAbstractObject {
        ScalarAbstractObject {
            ty,
            value: ScalarValue::Bottom,
        }
    }

    /// The abstraction of a single constant value, in the form used by the given scalar domain.
    #[logfn_inputs(TRACE)]
    pub fn from_constant(
        constant: ConstantDomain,
        ty: Type,
        kind: ScalarDomainKind,
    ) -> ScalarAbstractObject {
        if constant == ConstantDomain::Bottom {
            return ScalarAbstractObject::bottom(ty);
        }
        let value = match (kind, constant.as_i128()) {
            (ScalarDomainKind::Intervals, Some(i)) if ty.is_integer() => {
                ScalarValue::Interval(IntervalDomain::from(i))
            }
            _ => ScalarValue::Constant(constant),
        };
        ScalarAbstractObject { ty, value }
    }

    /// The abstraction of all integers in [lower_bound, upper_bound].
    pub fn from_interval(interval: IntervalDomain, ty: Type) -> ScalarAbstractObject {
        ScalarAbstractObject::normalized(ty, ScalarValue::Interval(interval))
    }

    /// Turns intervals that carry no information into top or bottom.
    fn normalized(ty: Type, value: ScalarValue) -> ScalarAbstractObject {
        let value = match value {
            ScalarValue::Interval(i) if i.is_bottom() => ScalarValue::Bottom,
            ScalarValue::Interval(i) if i.covers(&ty) => ScalarValue::Top,
            ScalarValue::Constant(ConstantDomain::Bottom) => ScalarValue::Bottom,
            value => value,
        };
        ScalarAbstractObject { ty, value }
    }
}

/// Queries
impl ScalarAbstractObject {
    pub fn get_type(&self) -> &Type {
        &self.ty
    }

    pub fn value(&self) -> &ScalarValue {
        &self.value
    }

    pub fn is_top(&self) -> bool {
        self.value == ScalarValue::Top
    }

    pub fn is_bottom(&self) -> bool {
        self.value == ScalarValue::Bottom
    }

    /// Returns the concrete value of this scalar if it is known to be a single value.
    pub fn to_constant(&self) -> Option<ConstantDomain> {
        match &self.value {
            ScalarValue::Constant(c) => Some(c.clone()),
            ScalarValue::Interval(i) => i
                .singleton()
                .map(|v| ConstantDomain::for_integer(v, &self.ty)),
            _ => None,
        }
    }

    /// Returns the range of integers this scalar may take.
    pub fn as_interval(&self) -> IntervalDomain {
        match &self.value {
            ScalarValue::Bottom => interval_domain::BOTTOM,
            ScalarValue::Constant(c) => match c.as_i128() {
                Some(i) => IntervalDomain::from(i),
                None => interval_domain::TOP,
            },
            ScalarValue::Interval(i) => i.clone(),
            ScalarValue::Top => {
                if self.ty.is_integer() {
                    IntervalDomain::new(self.ty.min_value(), self.ty.max_value())
                } else {
                    interval_domain::TOP
                }
            }
        }
    }

    /// Returns the array index this scalar stands for.
    pub fn as_array_index(&self) -> ArrayIndex {
        match self.to_constant().and_then(|c| c.as_i128()) {
            Some(i) => ArrayIndex::Constant(i),
            None => ArrayIndex::Unknown,
        }
    }

    /// Returns the truth value this scalar stands for.
    pub fn as_bool_domain(&self) -> BoolDomain {
        match &self.value {
            ScalarValue::Bottom => BoolDomain::Bottom,
            ScalarValue::Top => BoolDomain::Top,
            _ => match self.to_constant() {
                Some(ConstantDomain::True) => BoolDomain::True,
                Some(ConstantDomain::False) => BoolDomain::False,
                Some(c) => match c.as_i128() {
                    Some(i) => (i != 0).into(),
                    None => BoolDomain::True,
                },
                None => {
                    if self.as_interval().contains(0) {
                        BoolDomain::Top
                    } else {
                        BoolDomain::True
                    }
                }
            },
        }
    }
}

/// Lattice operations
impl ScalarAbstractObject {
    /// Returns the least upper bound of self and other.
    /// Callers have already dealt with top and bottom operands.
    #[logfn_inputs(TRACE)]
    pub fn merge(&self, other: &ScalarAbstractObject) -> ScalarAbstractObject {
        self.merge_or_widen(other, false)
    }

    /// Like merge, but any bound that moves is dropped so that repeated widening terminates.
    #[logfn_inputs(TRACE)]
    pub fn widen(&self, other: &ScalarAbstractObject) -> ScalarAbstractObject {
        self.merge_or_widen(other, true)
    }

    fn merge_or_widen(&self, other: &ScalarAbstractObject, widen: bool) -> ScalarAbstractObject {
        let value = match (&self.value, &other.value) {
            (ScalarValue::Bottom, v) | (v, ScalarValue::Bottom) => v.clone(),
            (ScalarValue::Top, _) | (_, ScalarValue::Top) => ScalarValue::Top,
            (ScalarValue::Constant(c1), ScalarValue::Constant(c2)) => {
                if c1 == c2 {
                    ScalarValue::Constant(c1.clone())
                } else {
                    ScalarValue::Top
                }
            }
            (ScalarValue::Interval(..), _) | (_, ScalarValue::Interval(..)) => {
                if !self.ty.is_integer() {
                    ScalarValue::Top
                } else if widen {
                    ScalarValue::Interval(self.as_interval().widen(&other.as_interval()))
                } else {
                    ScalarValue::Interval(self.as_interval().join(&other.as_interval()))
                }
            }
        };
        ScalarAbstractObject::normalized(self.ty.clone(), value)
    }

    /// True if every value represented by self is also represented by other.
    pub fn less_or_equal(&self, other: &ScalarAbstractObject) -> bool {
        match (&self.value, &other.value) {
            (ScalarValue::Bottom, _) | (_, ScalarValue::Top) => true,
            (_, ScalarValue::Bottom) | (ScalarValue::Top, _) => false,
            (ScalarValue::Constant(c1), ScalarValue::Constant(c2)) => c1 == c2,
            _ => self.as_interval().is_subset_of(&other.as_interval()),
        }
    }
}

/// Transfer functions
impl ScalarAbstractObject {
    /// Returns an element that is "self + other".
    #[logfn_inputs(TRACE)]
    pub fn add(&self, other: &ScalarAbstractObject) -> ScalarAbstractObject {
        self.binary_op(other, ConstantDomain::add, IntervalDomain::add)
    }

    /// Returns an element that is "self - other".
    #[logfn_inputs(TRACE)]
    pub fn sub(&self, other: &ScalarAbstractObject) -> ScalarAbstractObject {
        self.binary_op(other, ConstantDomain::sub, IntervalDomain::sub)
    }

    /// Returns an element that is "self * other".
    #[logfn_inputs(TRACE)]
    pub fn mul(&self, other: &ScalarAbstractObject) -> ScalarAbstractObject {
        self.binary_op(other, ConstantDomain::mul, IntervalDomain::mul)
    }

    /// Returns an element that is "-self".
    #[logfn_inputs(TRACE)]
    pub fn neg(&self) -> ScalarAbstractObject {
        let value = match &self.value {
            ScalarValue::Constant(c) => ScalarValue::Constant(c.neg().cast(&self.ty)),
            ScalarValue::Interval(i) => self.checked_interval(i.neg()),
            v => v.clone(),
        };
        ScalarAbstractObject::normalized(self.ty.clone(), value)
    }

    /// Returns an element that is "self as target_type".
    #[logfn_inputs(TRACE)]
    pub fn cast(&self, target_type: &Type) -> ScalarAbstractObject {
        let value = match &self.value {
            ScalarValue::Constant(c) => ScalarValue::Constant(c.cast(target_type)),
            ScalarValue::Interval(i) if i.is_contained_in(target_type) => {
                ScalarValue::Interval(i.clone())
            }
            ScalarValue::Bottom => ScalarValue::Bottom,
            _ => ScalarValue::Top,
        };
        ScalarAbstractObject::normalized(target_type.clone(), value)
    }

    /// Returns the Boolean element that is the result of comparing self with other.
    /// The constant operation is used when both operands are known and the interval operation
    /// decides the comparison for ranges.
    pub fn compare(
        &self,
        other: &ScalarAbstractObject,
        const_op: fn(&ConstantDomain, &ConstantDomain) -> ConstantDomain,
        interval_op: fn(&IntervalDomain, &IntervalDomain) -> Option<bool>,
    ) -> ScalarAbstractObject {
        if self.is_bottom() || other.is_bottom() {
            return ScalarAbstractObject::bottom(Type::Bool);
        }
        if let (Some(c1), Some(c2)) = (self.to_constant(), other.to_constant()) {
            let result = const_op(&c1, &c2);
            if result != ConstantDomain::Bottom {
                return ScalarAbstractObject::from_constant(
                    result,
                    Type::Bool,
                    ScalarDomainKind::Constants,
                );
            }
        }
        if self.ty.is_integer() && other.ty.is_integer() {
            if let Some(b) = interval_op(&self.as_interval(), &other.as_interval()) {
                return ScalarAbstractObject::from_constant(
                    b.into(),
                    Type::Bool,
                    ScalarDomainKind::Constants,
                );
            }
        }
        ScalarAbstractObject::top(Type::Bool)
    }

    fn binary_op(
        &self,
        other: &ScalarAbstractObject,
        const_op: fn(&ConstantDomain, &ConstantDomain) -> ConstantDomain,
        interval_op: fn(&IntervalDomain, &IntervalDomain) -> IntervalDomain,
    ) -> ScalarAbstractObject {
        let value = match (&self.value, &other.value) {
            (ScalarValue::Bottom, _) | (_, ScalarValue::Bottom) => ScalarValue::Bottom,
            (ScalarValue::Constant(c1), ScalarValue::Constant(c2)) => {
                let result = const_op(c1, c2);
                if result == ConstantDomain::Bottom {
                    ScalarValue::Top
                } else {
                    ScalarValue::Constant(result.cast(&self.ty))
                }
            }
            (ScalarValue::Interval(..), _) | (_, ScalarValue::Interval(..))
                if self.ty.is_integer() =>
            {
                self.checked_interval(interval_op(&self.as_interval(), &other.as_interval()))
            }
            _ => ScalarValue::Top,
        };
        ScalarAbstractObject::normalized(self.ty.clone(), value)
    }

    // An interval result that does not fit the type may have wrapped around, so it is unknown.
    fn checked_interval(&self, interval: IntervalDomain) -> ScalarValue {
        if interval.is_bottom() {
            ScalarValue::Bottom
        } else if interval.is_contained_in(&self.ty) {
            ScalarValue::Interval(interval)
        } else {
            ScalarValue::Top
        }
    }
}
