// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.
//
use crate::errors::AccessError;
use crate::expression::Expression;
use crate::types::{Namespace, Type};

use log_derive::*;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt::{Debug, Formatter, Result};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Paths are used as keys of environments and as the identities of pointer targets, so they
/// get hashed a lot during merges. The hash is computed once, when the path is constructed.
#[derive(Serialize, Deserialize, Clone, Eq, Ord, PartialOrd)]
pub struct Path {
    pub value: PathEnum,
    hash: u64,
}

impl Debug for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.value.fmt(f)
    }
}

impl Hash for Path {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Path) -> bool {
        self.hash == other.hash && self.value == other.value
    }
}

impl From<PathEnum> for Path {
    #[logfn_inputs(TRACE)]
    fn from(value: PathEnum) -> Self {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        Path {
            value,
            hash: hasher.finish(),
        }
    }
}

/// A path denotes a memory location: a root object, followed by the selectors that pick out
/// a component of the root. Every path records the type of the object it denotes.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum PathEnum {
    /// A program variable.
    Variable { name: Rc<str>, ty: Type },

    /// A dynamically allocated object. The ordinal identifies the allocation site.
    HeapBlock { ordinal: usize, ty: Type },

    /// The qualifier denotes a struct or array, the selector a field or element of it.
    QualifiedPath {
        length: usize,
        qualifier: Rc<Path>,
        selector: Rc<PathSelector>,
        ty: Type,
    },
}

impl Debug for PathEnum {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            PathEnum::Variable { name, .. } => f.write_str(name),
            PathEnum::HeapBlock { ordinal, .. } => f.write_fmt(format_args!("heap_{}", ordinal)),
            PathEnum::QualifiedPath {
                qualifier,
                selector,
                ..
            } => match selector.as_ref() {
                PathSelector::Field(..) => {
                    f.write_fmt(format_args!("{:?}.{:?}", qualifier, selector))
                }
                PathSelector::Index(..) => f.write_fmt(format_args!("{:?}{:?}", qualifier, selector)),
            },
        }
    }
}

/// The abstraction of an array index used to select elements.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ArrayIndex {
    /// The index is known to be this value.
    Constant(i128),
    /// The index could be any value.
    Unknown,
}

impl Debug for ArrayIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            ArrayIndex::Constant(i) => i.fmt(f),
            ArrayIndex::Unknown => f.write_str("?"),
        }
    }
}

/// The selector denotes a field of a struct or an element of an array.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum PathSelector {
    /// Selects the field with the given name.
    Field(Rc<str>),
    /// Selects the array element at the given index.
    Index(ArrayIndex),
}

impl Debug for PathSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            PathSelector::Field(name) => f.write_str(name),
            PathSelector::Index(index) => f.write_fmt(format_args!("[{:?}]", index)),
        }
    }
}

/// Constructors
impl Path {
    /// Creates a path to the given program variable.
    #[logfn_inputs(TRACE)]
    pub fn new_variable(name: Rc<str>, ty: Type) -> Rc<Path> {
        Rc::new(PathEnum::Variable { name, ty }.into())
    }

    /// Creates a path to the object allocated at the given allocation site.
    #[logfn_inputs(TRACE)]
    pub fn new_heap_block(ordinal: usize, ty: Type) -> Rc<Path> {
        Rc::new(PathEnum::HeapBlock { ordinal, ty }.into())
    }

    /// Creates a path that selects a component of the object at qualifier.
    /// The type of the component is computed with the help of the namespace.
    #[logfn_inputs(TRACE)]
    pub fn new_qualified(
        qualifier: Rc<Path>,
        selector: Rc<PathSelector>,
        ns: &Namespace,
    ) -> std::result::Result<Rc<Path>, AccessError> {
        let ty = selected_type(qualifier.get_type(), &selector, ns)?;
        let length = qualifier.path_length() + 1;
        Ok(Rc::new(
            PathEnum::QualifiedPath {
                length,
                qualifier,
                selector,
                ty,
            }
            .into(),
        ))
    }

    /// Returns a qualified path of the form root.selectors[0].selectors[1]...
    #[logfn_inputs(TRACE)]
    pub fn add_selectors(
        root: &Rc<Path>,
        selectors: &[PathSelector],
        ns: &Namespace,
    ) -> std::result::Result<Rc<Path>, AccessError> {
        let mut result = root.clone();
        for selector in selectors.iter() {
            result = Path::new_qualified(result, Rc::new(selector.clone()), ns)?;
        }
        Ok(result)
    }
}

/// Returns the type of the component of a value of type ty that is picked out by the selector.
pub fn selected_type(
    ty: &Type,
    selector: &PathSelector,
    ns: &Namespace,
) -> std::result::Result<Type, AccessError> {
    match (ty, selector) {
        (Type::StructTag(tag), PathSelector::Field(field)) => {
            match ns.follow_tag(tag).component(field) {
                Some(component) => Ok(component.ty.clone()),
                None => Err(AccessError::UnknownField {
                    tag: tag.clone(),
                    field: field.clone(),
                }),
            }
        }
        (Type::Array { element, .. }, PathSelector::Index(..)) => Ok(element.as_ref().clone()),
        _ => Err(AccessError::NotAComposite {
            ty: ty.clone(),
            selector: selector.clone(),
        }),
    }
}

/// Queries
impl Path {
    /// The type of the object denoted by this path.
    pub fn get_type(&self) -> &Type {
        match &self.value {
            PathEnum::Variable { ty, .. }
            | PathEnum::HeapBlock { ty, .. }
            | PathEnum::QualifiedPath { ty, .. } => ty,
        }
    }

    // Returns the length of the path.
    #[logfn_inputs(TRACE)]
    pub fn path_length(&self) -> usize {
        match &self.value {
            PathEnum::QualifiedPath { length, .. } => *length,
            _ => 1,
        }
    }

    /// True if path is, or is rooted by, a dynamically allocated object.
    #[logfn_inputs(TRACE)]
    pub fn is_rooted_by_heap_block(&self) -> bool {
        match &self.value {
            PathEnum::QualifiedPath { qualifier, .. } => qualifier.is_rooted_by_heap_block(),
            PathEnum::HeapBlock { .. } => true,
            PathEnum::Variable { .. } => false,
        }
    }

    /// Splits the path into its root and the selectors that lead from the root to this path.
    pub fn split_root(self: &Rc<Path>) -> (Rc<Path>, Vec<PathSelector>) {
        let mut selectors = Vec::new();
        let mut current = self.clone();
        while let PathEnum::QualifiedPath {
            qualifier,
            selector,
            ..
        } = &current.value
        {
            selectors.push(selector.as_ref().clone());
            let qualifier = qualifier.clone();
            current = qualifier;
        }
        selectors.reverse();
        (current, selectors)
    }

    /// Returns the path that is reached by moving offset elements away from this path.
    /// Only paths that select an array element can be moved. A zero offset returns the path itself.
    pub fn with_element_offset(self: &Rc<Path>, offset: Option<i128>) -> Option<Rc<Path>> {
        if offset == Some(0) {
            return Some(self.clone());
        }
        if let PathEnum::QualifiedPath {
            length,
            qualifier,
            selector,
            ty,
        } = &self.value
        {
            if let PathSelector::Index(index) = selector.as_ref() {
                let index = match (index, offset) {
                    (ArrayIndex::Constant(i), Some(k)) => match i.checked_add(k) {
                        Some(j) => ArrayIndex::Constant(j),
                        None => ArrayIndex::Unknown,
                    },
                    _ => ArrayIndex::Unknown,
                };
                return Some(Rc::new(
                    PathEnum::QualifiedPath {
                        length: *length,
                        qualifier: qualifier.clone(),
                        selector: Rc::new(PathSelector::Index(index)),
                        ty: ty.clone(),
                    }
                    .into(),
                ));
            }
        }
        None
    }

    /// Returns an expression that denotes the same memory location as this path.
    /// Heap blocks have no expression form and are expressed via the symbol heap_<ordinal>.
    #[logfn_inputs(TRACE)]
    pub fn to_expression(&self) -> Expression {
        match &self.value {
            PathEnum::Variable { name, ty } => Expression::Symbol {
                name: name.clone(),
                ty: ty.clone(),
            },
            PathEnum::HeapBlock { ordinal, ty } => Expression::Symbol {
                name: Rc::from(format!("heap_{}", ordinal).as_str()),
                ty: ty.clone(),
            },
            PathEnum::QualifiedPath {
                qualifier,
                selector,
                ty,
                ..
            } => {
                let compound = Box::new(qualifier.to_expression());
                match selector.as_ref() {
                    PathSelector::Field(field) => Expression::Member {
                        compound,
                        field: field.clone(),
                        ty: ty.clone(),
                    },
                    PathSelector::Index(ArrayIndex::Constant(i)) => Expression::Index {
                        array: compound,
                        index: Box::new(Expression::signed_constant(*i)),
                        ty: ty.clone(),
                    },
                    PathSelector::Index(ArrayIndex::Unknown) => Expression::Index {
                        array: compound,
                        index: Box::new(Expression::Nondet {
                            ty: Type::signed_size_type(),
                        }),
                        ty: ty.clone(),
                    },
                }
            }
        }
    }
}
