// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::types::Type;

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt::{Debug, Formatter, Result};

/// Abstracts over the constant values that appear in the program under analysis.
/// Integers are widened to 16 bytes so that all integer types share the same representation.
#[derive(Serialize, Deserialize, Clone, Eq, PartialOrd, PartialEq, Hash, Ord)]
pub enum ConstantDomain {
    /// The impossible constant. Use this as the result of a partial transfer function.
    Bottom,
    /// The Boolean value false.
    False,
    /// The Boolean true value.
    True,
    /// Signed 16 byte integer.
    I128(i128),
    /// Unsigned 16 byte integer.
    U128(u128),
}

impl Debug for ConstantDomain {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            ConstantDomain::Bottom => f.write_str("BOTTOM"),
            ConstantDomain::False => f.write_str("false"),
            ConstantDomain::True => f.write_str("true"),
            ConstantDomain::I128(val) => val.fmt(f),
            ConstantDomain::U128(val) => val.fmt(f),
        }
    }
}

impl From<bool> for ConstantDomain {
    fn from(b: bool) -> ConstantDomain {
        if b {
            ConstantDomain::True
        } else {
            ConstantDomain::False
        }
    }
}

/// Constructors
impl ConstantDomain {
    /// Returns the constant of the given type that has the given integer value,
    /// truncated to the width of the type.
    pub fn for_integer(value: i128, ty: &Type) -> ConstantDomain {
        match ty {
            Type::Bool => (value != 0).into(),
            Type::Unsigned(..) => ConstantDomain::U128(value as u128).cast(ty),
            _ => ConstantDomain::I128(value).cast(ty),
        }
    }
}

/// Queries
impl ConstantDomain {
    /// Returns the value of an integer constant, if it fits into an i128.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            ConstantDomain::I128(val) => Some(*val),
            ConstantDomain::U128(val) => i128::try_from(*val).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConstantDomain::True => Some(true),
            ConstantDomain::False => Some(false),
            _ => None,
        }
    }
}

/// Transfer functions
impl ConstantDomain {
    /// Returns a constant that is "self + other".
    pub fn add(&self, other: &Self) -> Self {
        match (self, other) {
            (ConstantDomain::I128(val1), ConstantDomain::I128(val2)) => {
                ConstantDomain::I128(val1.wrapping_add(*val2))
            }
            (ConstantDomain::U128(val1), ConstantDomain::U128(val2)) => {
                ConstantDomain::U128(val1.wrapping_add(*val2))
            }
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "self as target_type"
    pub fn cast(&self, target_type: &Type) -> Self {
        match self {
            ConstantDomain::Bottom => self.clone(),
            ConstantDomain::False => ConstantDomain::for_integer(0, target_type),
            ConstantDomain::True => ConstantDomain::for_integer(1, target_type),
            ConstantDomain::U128(val) => match target_type {
                Type::Bool => (*val != 0).into(),
                Type::Signed(..) => ConstantDomain::I128(*val as i128).cast(target_type),
                Type::Unsigned(width) if *width < 128 => {
                    ConstantDomain::U128(*val & ((1u128 << *width) - 1))
                }
                _ => self.clone(),
            },
            ConstantDomain::I128(val) => match target_type {
                Type::Bool => (*val != 0).into(),
                Type::Unsigned(..) => ConstantDomain::U128(*val as u128).cast(target_type),
                Type::Signed(0) => ConstantDomain::I128(0),
                Type::Signed(width) if *width < 128 => {
                    let shift = 128 - *width;
                    ConstantDomain::I128((*val << shift) >> shift)
                }
                _ => self.clone(),
            },
        }
    }

    /// Returns a constant that is "self == other".
    /// Integers of different signedness are not comparable as constants.
    pub fn equals(&self, other: &Self) -> Self {
        match (self, other) {
            (ConstantDomain::I128(val1), ConstantDomain::I128(val2)) => (val1 == val2).into(),
            (ConstantDomain::U128(val1), ConstantDomain::U128(val2)) => (val1 == val2).into(),
            (ConstantDomain::False, ConstantDomain::False)
            | (ConstantDomain::True, ConstantDomain::True) => ConstantDomain::True,
            (ConstantDomain::False, ConstantDomain::True)
            | (ConstantDomain::True, ConstantDomain::False) => ConstantDomain::False,
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "self >= other".
    pub fn greater_or_equal(&self, other: &Self) -> Self {
        other.less_or_equal(self)
    }

    /// Returns a constant that is "self > other".
    pub fn greater_than(&self, other: &Self) -> Self {
        other.less_than(self)
    }

    /// Returns a constant that is "self <= other".
    pub fn less_or_equal(&self, other: &Self) -> Self {
        match (self, other) {
            (ConstantDomain::I128(val1), ConstantDomain::I128(val2)) => (val1 <= val2).into(),
            (ConstantDomain::U128(val1), ConstantDomain::U128(val2)) => (val1 <= val2).into(),
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "self < other".
    pub fn less_than(&self, other: &Self) -> Self {
        match (self, other) {
            (ConstantDomain::I128(val1), ConstantDomain::I128(val2)) => (val1 < val2).into(),
            (ConstantDomain::U128(val1), ConstantDomain::U128(val2)) => (val1 < val2).into(),
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "self * other".
    pub fn mul(&self, other: &Self) -> Self {
        match (self, other) {
            (ConstantDomain::I128(val1), ConstantDomain::I128(val2)) => {
                ConstantDomain::I128(val1.wrapping_mul(*val2))
            }
            (ConstantDomain::U128(val1), ConstantDomain::U128(val2)) => {
                ConstantDomain::U128(val1.wrapping_mul(*val2))
            }
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "-self".
    pub fn neg(&self) -> Self {
        match self {
            ConstantDomain::I128(val) => ConstantDomain::I128(val.wrapping_neg()),
            ConstantDomain::U128(val) => ConstantDomain::U128(val.wrapping_neg()),
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "self != other".
    pub fn not_equals(&self, other: &Self) -> Self {
        match self.equals(other) {
            ConstantDomain::True => ConstantDomain::False,
            ConstantDomain::False => ConstantDomain::True,
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "self - other".
    pub fn sub(&self, other: &Self) -> Self {
        match (self, other) {
            (ConstantDomain::I128(val1), ConstantDomain::I128(val2)) => {
                ConstantDomain::I128(val1.wrapping_sub(*val2))
            }
            (ConstantDomain::U128(val1), ConstantDomain::U128(val2)) => {
                ConstantDomain::U128(val1.wrapping_sub(*val2))
            }
            _ => ConstantDomain::Bottom,
        }
    }
}
