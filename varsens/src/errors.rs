// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::expression::Expression;
use crate::path::PathSelector;
use crate::types::Type;

use std::rc::Rc;
use thiserror::Error;

/// An access that the analyzed code performs but that cannot be expressed with the types involved.
/// These are reported to the client of the domain, which decides how to treat the offending
/// instruction.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum AccessError {
    #[error("struct {tag} has no field named {field}")]
    UnknownField { tag: Rc<str>, field: Rc<str> },

    #[error("an index of type {index_type:?} cannot select an element of {array_type:?}")]
    IncompatibleIndex { array_type: Type, index_type: Type },

    #[error("selector {selector:?} cannot be applied to a value of type {ty:?}")]
    NotAComposite { ty: Type, selector: PathSelector },

    #[error("a value of type {ty:?} cannot be dereferenced")]
    NotAPointer { ty: Type },

    #[error("{expression:?} does not denote a memory location")]
    NotAnLvalue { expression: Expression },

    #[error("{fields:?} do not match the components of {ty:?}")]
    InitializerMismatch { ty: Type, fields: Vec<Expression> },
}

/// A problem with the domain configuration supplied by the client.
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("cannot parse argument string: mismatched quotes in {0}")]
    MismatchedQuotes(String),

    #[error("--{option} expects an integer, found {value}")]
    InvalidNumber { option: &'static str, value: String },

    #[error(transparent)]
    Clap(#[from] clap::Error),
}
