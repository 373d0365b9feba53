// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use log_derive::logfn_inputs;
use serde::{Deserialize, Serialize};

/// A standard set-based abstraction for Booleans. `Bottom` represents the empty set,
/// `False` and `True` represent singleton sets {false} and {true}, respectively, and
/// `Top` represents {false, true}. Pointer abstractions answer questions such as
/// "is this pointer null?" or "do these pointers point into the same object?" with
/// elements of this domain.
#[derive(Ord, PartialOrd, Eq, PartialEq, Debug, Copy, Clone, Serialize, Deserialize, Hash)]
pub enum BoolDomain {
    Bottom,
    False,
    True,
    Top,
}

impl From<bool> for BoolDomain {
    #[logfn_inputs(TRACE)]
    fn from(b: bool) -> BoolDomain {
        if b {
            BoolDomain::True
        } else {
            BoolDomain::False
        }
    }
}

impl BoolDomain {
    /// Returns the Boolean value if the element is a singleton set.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            BoolDomain::True => Some(true),
            BoolDomain::False => Some(false),
            _ => None,
        }
    }
}

/// Transfer functions
impl BoolDomain {
    /// Return the join of two Boolean domain elements, which is essentially the set union.
    #[logfn_inputs(TRACE)]
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        match (self, other) {
            // [Top join _] -> Top
            // [False join True] -> Top
            (BoolDomain::Top, _)
            | (_, BoolDomain::Top)
            | (BoolDomain::False, BoolDomain::True)
            | (BoolDomain::True, BoolDomain::False) => BoolDomain::Top,

            // [False join False] -> False
            // [False join Bottom] -> False
            (BoolDomain::False, _) | (_, BoolDomain::False) => BoolDomain::False,

            // [True join True] -> True
            // [True join Bottom] -> True
            (BoolDomain::True, _) | (_, BoolDomain::True) => BoolDomain::True,

            // [Bottom join Bottom] -> Bottom
            (BoolDomain::Bottom, BoolDomain::Bottom) => BoolDomain::Bottom,
        }
    }

    /// Return the logical-and of two Boolean domain elements.
    #[logfn_inputs(TRACE)]
    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        match (self, other) {
            // [Bottom && _] -> Bottom
            (BoolDomain::Bottom, _) | (_, BoolDomain::Bottom) => BoolDomain::Bottom,

            // [False && _] -> False
            (BoolDomain::False, _) | (_, BoolDomain::False) => BoolDomain::False,

            // [Top && True] -> Top
            // [Top && Top] -> Top
            (BoolDomain::Top, _) | (_, BoolDomain::Top) => BoolDomain::Top,

            // [True && True] -> True
            (BoolDomain::True, BoolDomain::True) => BoolDomain::True,
        }
    }

    /// Return the logical-not of a Boolean domain element.
    #[logfn_inputs(TRACE)]
    #[must_use]
    pub fn not(&self) -> Self {
        match self {
            BoolDomain::False => BoolDomain::True,
            BoolDomain::True => BoolDomain::False,
            other => *other,
        }
    }
}
