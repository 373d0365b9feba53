// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// Tests for parsing the domain configuration.

use test_log::test;
use varsens::errors::OptionsError;
use varsens::k_limits;
use varsens::options::{ArrayStrategy, Options, ScalarDomainKind};

#[test]
fn defaults() {
    let options = Options::default();
    assert_eq!(options.scalar_domain, ScalarDomainKind::Constants);
    assert_eq!(options.array_strategy, ArrayStrategy::ElementSensitive);
    assert_eq!(options.max_array_elements, k_limits::MAX_ELEMENTS_TO_TRACK);

    let mut parsed = Options::default();
    let rest = parsed.parse_from_str("").unwrap();
    assert!(rest.is_empty());
    assert_eq!(parsed, options);
}

#[test]
fn all_options() {
    let mut options = Options::default();
    let rest = options
        .parse_from_str("--scalar_domain intervals --array_strategy smashed --max_array_elements 7")
        .unwrap();
    assert!(rest.is_empty());
    assert_eq!(options.scalar_domain, ScalarDomainKind::Intervals);
    assert_eq!(options.array_strategy, ArrayStrategy::Smashed);
    assert_eq!(options.max_array_elements, 7);
}

#[test]
fn arguments_after_the_separator_are_returned() {
    let mut options = Options::default();
    let rest = options
        .parse_from_str("--scalar_domain intervals -- --array_strategy 'two words'")
        .unwrap();
    assert_eq!(rest, vec!["--array_strategy".to_string(), "two words".to_string()]);
    assert_eq!(options.scalar_domain, ScalarDomainKind::Intervals);
    assert_eq!(options.array_strategy, ArrayStrategy::ElementSensitive);
}

#[test]
fn parse_takes_a_list_of_arguments() {
    let mut options = Options::default();
    let args = vec!["--array_strategy".to_string(), "smashed".to_string()];
    options.parse(&args).unwrap();
    assert_eq!(options.array_strategy, ArrayStrategy::Smashed);
}

#[test]
fn element_limit_must_be_a_number() {
    let mut options = Options::default();
    let result = options.parse_from_str("--max_array_elements lots");
    match result {
        Err(OptionsError::InvalidNumber { option, value }) => {
            assert_eq!(option, "max_array_elements");
            assert_eq!(value, "lots");
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn unbalanced_quotes_are_reported() {
    let mut options = Options::default();
    let result = options.parse_from_str("--scalar_domain 'intervals");
    assert!(matches!(result, Err(OptionsError::MismatchedQuotes(..))));
}

#[test]
fn unknown_values_are_rejected() {
    let mut options = Options::default();
    let result = options.parse_from_str("--scalar_domain octagons");
    assert!(matches!(result, Err(OptionsError::Clap(..))));
    let result = options.parse_from_str("--no_such_option");
    assert!(matches!(result, Err(OptionsError::Clap(..))));
}
