// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::OptionsError;
use crate::k_limits;

use clap::{App, AppSettings, Arg};
use itertools::Itertools;
use mirai_annotations::*;
use serde::{Deserialize, Serialize};

/// Creates the clap::App metadata for argument parsing.
fn make_options_parser<'a>() -> App<'a, 'a> {
    App::new("varsens")
    .setting(AppSettings::NoBinaryName)
    .version("v0.1.0")
    .arg(Arg::with_name("scalar_domain")
        .long("scalar_domain")
        .possible_values(&["constants", "intervals"])
        .default_value("constants")
        .help("The abstraction used for scalar values.")
        .long_help("With `constants`, a scalar is either a single known value or unknown.\nWith `intervals`, a scalar is a range of integers.\n"))
    .arg(Arg::with_name("array_strategy")
        .long("array_strategy")
        .possible_values(&["element_sensitive", "smashed"])
        .default_value("element_sensitive")
        .help("How array elements are tracked.")
        .long_help("With `element_sensitive`, every element with a constant index is tracked separately.\nWith `smashed`, all elements of an array are summarized by a single abstract object.\n"))
    .arg(Arg::with_name("max_array_elements")
        .long("max_array_elements")
        .takes_value(true)
        .help("The maximum number of elements of an array that are tracked individually.")
        .long_help("Element sensitive arrays that track more elements are smashed. The default is 100."))
}

/// The abstraction used for scalar values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarDomainKind {
    /// A scalar is bottom, a single constant, or top. Distinct constants merge to top.
    Constants,
    /// A scalar is bottom, a range of integers, or top. Merging forms the smallest enclosing range.
    Intervals,
}

/// How array elements are tracked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrayStrategy {
    /// Every element at a constant index has its own abstract object.
    ElementSensitive,
    /// A single abstract object summarizes all elements, whatever their index.
    Smashed,
}

/// Represents the configuration of the abstract domain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    pub scalar_domain: ScalarDomainKind,
    pub array_strategy: ArrayStrategy,
    pub max_array_elements: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            scalar_domain: ScalarDomainKind::Constants,
            array_strategy: ArrayStrategy::ElementSensitive,
            max_array_elements: k_limits::MAX_ELEMENTS_TO_TRACK,
        }
    }
}

impl Options {
    /// Parse options from an argument string. The argument string will be split using unix
    /// shell escaping rules. Any content beyond the leftmost `--` token will be returned
    /// (excluding this token).
    pub fn parse_from_str(&mut self, s: &str) -> Result<Vec<String>, OptionsError> {
        let args = shellwords::split(s).map_err(|_| OptionsError::MismatchedQuotes(s.to_owned()))?;
        self.parse(&args)
    }

    /// Parses options from a list of strings. Any content beyond the leftmost `--` token
    /// will be returned (excluding this token).
    pub fn parse(&mut self, args: &[String]) -> Result<Vec<String>, OptionsError> {
        let mut domain_args_end = args.len();
        let mut rest_start = args.len();
        if let Some((p, _)) = args.iter().find_position(|s| s.as_str() == "--") {
            domain_args_end = p;
            rest_start = p + 1;
        }
        let domain_args = &args[0..domain_args_end];
        let matches = make_options_parser().get_matches_from_safe(domain_args.iter())?;

        self.scalar_domain = match matches.value_of("scalar_domain") {
            Some("constants") => ScalarDomainKind::Constants,
            Some("intervals") => ScalarDomainKind::Intervals,
            _ => assume_unreachable!(),
        };
        self.array_strategy = match matches.value_of("array_strategy") {
            Some("element_sensitive") => ArrayStrategy::ElementSensitive,
            Some("smashed") => ArrayStrategy::Smashed,
            _ => assume_unreachable!(),
        };
        if let Some(s) = matches.value_of("max_array_elements") {
            self.max_array_elements =
                s.parse::<usize>()
                    .map_err(|_| OptionsError::InvalidNumber {
                        option: "max_array_elements",
                        value: s.to_owned(),
                    })?;
        }
        Ok(args[rest_start..].to_vec())
    }
}
