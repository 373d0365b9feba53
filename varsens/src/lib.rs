// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.
//
// The variable sensitivity domain tracks, for every program variable at every program point,
// an abstract object that over-approximates the set of values the variable may hold.
// Abstract objects are composable: structs and arrays own abstract objects for their components,
// pointers refer to the access paths of the objects they may point to.
// Analysis states (environments) share abstract objects until a write forces them apart.

#[macro_use]
extern crate log;

pub mod abstract_object;
pub mod array_object;
pub mod bool_domain;
pub mod constant_domain;
pub mod environment;
pub mod errors;
pub mod expression;
pub mod interval_domain;
pub mod k_limits;
pub mod options;
pub mod path;
pub mod pointer_object;
pub mod pointer_predicates;
pub mod scalar_object;
pub mod struct_object;
pub mod types;
