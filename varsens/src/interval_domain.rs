// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.
//

use crate::types::Type;

use serde::{Deserialize, Serialize};
use std::cmp;
use std::fmt::{Debug, Formatter, Result};

/// An element of the Interval domain is a range of i128 numbers denoted by a lower bound and
/// upper bound. A lower bound of std::i128::MIN denotes -infinity and an upper bound of
/// std::i128::MAX denotes +infinity.
/// Scalar abstract objects use intervals when the domain is configured for interval precision.
#[derive(Serialize, Deserialize, Clone, Eq, PartialOrd, PartialEq, Hash, Ord)]
pub struct IntervalDomain {
    lower_bound: i128,
    upper_bound: i128,
}

impl Debug for IntervalDomain {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if self.is_bottom() {
            return f.write_str("[]");
        }
        f.write_str("[")?;
        match self.lower_bound() {
            Some(lb) => lb.fmt(f)?,
            None => f.write_str("-inf")?,
        }
        f.write_str("...")?;
        match self.upper_bound() {
            Some(ub) => ub.fmt(f)?,
            None => f.write_str("+inf")?,
        }
        f.write_str("]")
    }
}

pub const BOTTOM: IntervalDomain = IntervalDomain {
    lower_bound: 1,
    upper_bound: 0,
};

pub const TOP: IntervalDomain = IntervalDomain {
    lower_bound: std::i128::MIN,
    upper_bound: std::i128::MAX,
};

impl From<i128> for IntervalDomain {
    fn from(i: i128) -> IntervalDomain {
        IntervalDomain {
            lower_bound: i,
            upper_bound: i,
        }
    }
}

impl IntervalDomain {
    pub fn new(lower_bound: i128, upper_bound: i128) -> IntervalDomain {
        if upper_bound < lower_bound {
            return BOTTOM;
        }
        IntervalDomain {
            lower_bound,
            upper_bound,
        }
    }

    //[x...y] + [a...b] = [x+a...y+b]
    pub fn add(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return BOTTOM;
        }
        if self.is_top() || other.is_top() {
            return TOP;
        }
        IntervalDomain {
            lower_bound: self.lower_bound.saturating_add(other.lower_bound),
            upper_bound: self.upper_bound.saturating_add(other.upper_bound),
        }
    }

    // True if the value i is an element of the interval.
    pub fn contains(&self, i: i128) -> bool {
        self.lower_bound <= i && i <= self.upper_bound
    }

    // [x...y] >= [a...b] = x >= b
    // !([x...y] >= [a...b]) = [a...b] > [x...y] = a > y
    pub fn greater_or_equal(&self, other: &Self) -> Option<bool> {
        if self.is_bottom() || self.is_top() || other.is_bottom() || other.is_top() {
            None
        } else if self.lower_bound >= other.upper_bound {
            Some(true)
        } else if other.lower_bound > self.upper_bound {
            Some(false)
        } else {
            None
        }
    }

    // [x...y] > [a...b] = x > b
    // !([x...y] > [a...b]) = [a...b] >= [x...y] = a >= y
    pub fn greater_than(&self, other: &Self) -> Option<bool> {
        if self.is_bottom() || self.is_top() || other.is_bottom() || other.is_top() {
            None
        } else if self.lower_bound > other.upper_bound {
            Some(true)
        } else if other.lower_bound >= self.upper_bound {
            Some(false)
        } else {
            None
        }
    }

    // The empty set of integers. No concrete value belongs to this interval.
    pub fn is_bottom(&self) -> bool {
        self.upper_bound < self.lower_bound
    }

    // Returns true if this interval is known to be contained in the interval [target_type::MIN ... target_type::MAX].
    // A false result just means that we don't know, it never means that we know it does not.
    pub fn is_contained_in(&self, target_type: &Type) -> bool {
        if self.is_bottom() || self.is_top() || !target_type.is_integer() {
            return false;
        };
        self.lower_bound >= target_type.min_value() && self.upper_bound <= target_type.max_value()
    }

    // True if every value of the integer type is an element of this interval.
    // For such an interval there is no point in tracking bounds.
    pub fn covers(&self, target_type: &Type) -> bool {
        self.is_top()
            || (self.lower_bound <= target_type.min_value()
                && self.upper_bound >= target_type.max_value())
    }

    // [x...y] is a subset of [a...b] if a <= x and y <= b.
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.is_bottom()
            || (other.lower_bound <= self.lower_bound && self.upper_bound <= other.upper_bound)
    }

    // All concrete integer values belong to this interval, so we know nothing.
    pub fn is_top(&self) -> bool {
        self.lower_bound == std::i128::MIN && self.upper_bound == std::i128::MAX
    }

    // [x...y] join [a...b] = [min(x,a)...max(y,b)]
    pub fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        IntervalDomain {
            lower_bound: cmp::min(self.lower_bound, other.lower_bound),
            upper_bound: cmp::max(self.upper_bound, other.upper_bound),
        }
    }

    // [x...y] < [a...b] = y < a
    // !([x...y] < [a...b]) = [a...b] <= [x...y] = b <= x
    pub fn less_than(&self, other: &Self) -> Option<bool> {
        if self.is_bottom() || self.is_top() || other.is_bottom() || other.is_top() {
            None
        } else if self.upper_bound < other.lower_bound {
            Some(true)
        } else if other.upper_bound <= self.lower_bound {
            Some(false)
        } else {
            None
        }
    }

    pub fn lower_bound(&self) -> Option<i128> {
        if self.lower_bound == TOP.lower_bound {
            None
        } else {
            Some(self.lower_bound)
        }
    }

    pub fn upper_bound(&self) -> Option<i128> {
        if self.upper_bound == TOP.upper_bound {
            None
        } else {
            Some(self.upper_bound)
        }
    }

    // [x...y] * [a...b] = [min(x*a, x*b, y*a, y*b)...max(x*a, x*b, y*a, y*b)]
    pub fn mul(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return BOTTOM;
        }
        if self.is_top() || other.is_top() {
            return TOP;
        }
        let products = [
            self.lower_bound.saturating_mul(other.lower_bound),
            self.lower_bound.saturating_mul(other.upper_bound),
            self.upper_bound.saturating_mul(other.lower_bound),
            self.upper_bound.saturating_mul(other.upper_bound),
        ];
        IntervalDomain {
            lower_bound: products.iter().copied().min().unwrap_or(std::i128::MIN),
            upper_bound: products.iter().copied().max().unwrap_or(std::i128::MAX),
        }
    }

    // -[x...y] = [-y...-x]
    pub fn neg(&self) -> Self {
        if self.is_bottom() {
            return BOTTOM;
        }
        if self.is_top() {
            return TOP;
        }
        IntervalDomain {
            lower_bound: self.upper_bound.checked_neg().unwrap_or(std::i128::MAX),
            upper_bound: self.lower_bound.checked_neg().unwrap_or(std::i128::MAX),
        }
    }

    // Returns the single element of the interval, if there is exactly one.
    pub fn singleton(&self) -> Option<i128> {
        if self.lower_bound == self.upper_bound {
            Some(self.lower_bound)
        } else {
            None
        }
    }

    // [x...y] - [a...b] = [x-b...y-a]
    pub fn sub(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return BOTTOM;
        }
        if self.is_top() || other.is_top() {
            return TOP;
        }
        IntervalDomain {
            lower_bound: self.lower_bound.saturating_sub(other.upper_bound),
            upper_bound: self.upper_bound.saturating_sub(other.lower_bound),
        }
    }

    // [x...y] widen [a...b] = [x' ... y'], where x' is x if a >= x and -inf otherwise,
    // and y' is y if b <= y and +inf otherwise. Self is the value from the previous iteration.
    pub fn widen(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        IntervalDomain {
            lower_bound: if other.lower_bound < self.lower_bound {
                TOP.lower_bound
            } else {
                self.lower_bound
            },
            upper_bound: if other.upper_bound > self.upper_bound {
                TOP.upper_bound
            } else {
                self.upper_bound
            },
        }
    }
}
