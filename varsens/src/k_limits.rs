// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// Somewhat arbitrary constants used to keep abstract objects from growing without bound.

/// The maximum number of elements of an element sensitive array that will be individually tracked.
/// Arrays that grow beyond this are smashed into a single summary element.
pub const MAX_ELEMENTS_TO_TRACK: usize = 100;

/// The maximum number of distinct targets a pointer abstraction keeps before it becomes top.
pub const MAX_POINTER_TARGETS: usize = 16;

/// Access paths longer than this are not tracked. Taking the address of such a path yields a top pointer.
pub const MAX_PATH_LENGTH: usize = 300;
