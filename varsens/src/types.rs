// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::expression::Expression;

use log_derive::logfn_inputs;
use mirai_annotations::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

/// The type of a program value, as seen by the abstract domain.
/// Struct layouts are not part of the type itself, they are looked up by tag in a Namespace.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Type {
    /// The Boolean type.
    Bool,
    /// A signed integer with the given bit width.
    Signed(u32),
    /// An unsigned integer with the given bit width.
    Unsigned(u32),
    /// A pointer to a value of the target type.
    Pointer(Rc<Type>),
    /// An array with the given element type. The length is not known for unsized arrays.
    Array { element: Rc<Type>, length: Option<u64> },
    /// A reference to a struct type declared in the namespace.
    StructTag(Rc<str>),
    /// The type of expressions that have no value.
    Empty,
}

impl Debug for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Signed(width) => f.write_fmt(format_args!("i{}", width)),
            Type::Unsigned(width) => f.write_fmt(format_args!("u{}", width)),
            Type::Pointer(target) => f.write_fmt(format_args!("*{:?}", target)),
            Type::Array {
                element,
                length: Some(length),
            } => f.write_fmt(format_args!("[{:?}; {}]", element, length)),
            Type::Array {
                element,
                length: None,
            } => f.write_fmt(format_args!("[{:?}]", element)),
            Type::StructTag(tag) => f.write_fmt(format_args!("struct {}", tag)),
            Type::Empty => f.write_str("void"),
        }
    }
}

/// Constructors
impl Type {
    pub fn pointer_to(target: Type) -> Type {
        Type::Pointer(Rc::new(target))
    }

    pub fn array_of(element: Type, length: Option<u64>) -> Type {
        Type::Array {
            element: Rc::new(element),
            length,
        }
    }

    pub fn struct_tag(tag: &str) -> Type {
        Type::StructTag(Rc::from(tag))
    }

    /// The type of object sizes.
    pub fn size_type() -> Type {
        Type::Unsigned(64)
    }

    /// The type of (possibly negative) pointer offsets.
    pub fn signed_size_type() -> Type {
        Type::Signed(64)
    }
}

/// Queries
impl Type {
    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Signed(..) | Type::Unsigned(..))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(..))
    }

    /// Returns the type of the value a pointer of this type points to.
    pub fn pointee(&self) -> Option<&Type> {
        if let Type::Pointer(target) = self {
            Some(target.as_ref())
        } else {
            None
        }
    }

    /// Returns the element type of an array type.
    pub fn element_type(&self) -> Option<&Type> {
        if let Type::Array { element, .. } = self {
            Some(element.as_ref())
        } else {
            None
        }
    }

    /// The smallest value of an integer type, saturated to the range of i128.
    /// A zero width integer can only hold 0.
    pub fn min_value(&self) -> i128 {
        match self {
            Type::Signed(0) => 0,
            Type::Signed(width) if *width < 128 => -(1i128 << (*width - 1)),
            Type::Signed(..) => i128::MIN,
            _ => 0,
        }
    }

    /// The largest value of an integer type, saturated to the range of i128.
    pub fn max_value(&self) -> i128 {
        match self {
            Type::Bool => 1,
            Type::Signed(0) | Type::Unsigned(0) => 0,
            Type::Signed(width) if *width < 128 => (1i128 << (*width - 1)) - 1,
            Type::Unsigned(width) if *width < 127 => (1i128 << *width) - 1,
            _ => i128::MAX,
        }
    }
}

/// A named component of a struct type.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Component {
    pub name: Rc<str>,
    pub ty: Type,
}

/// The layout of a struct: an ordered list of named components.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash)]
pub struct StructType {
    pub tag: Rc<str>,
    pub components: Vec<Component>,
}

impl StructType {
    /// Returns the component with the given name, if the struct has one.
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name.as_ref() == name)
    }
}

/// A program symbol with a known type.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Symbol {
    pub name: Rc<str>,
    pub ty: Type,
}

impl Symbol {
    /// Returns an expression that refers to this symbol.
    pub fn symbol_expr(&self) -> Expression {
        Expression::Symbol {
            name: self.name.clone(),
            ty: self.ty.clone(),
        }
    }
}

/// The type and symbol table of the program under analysis.
/// It is owned by the client of the domain and shared by all environments.
#[derive(Debug, Default)]
pub struct Namespace {
    structs: HashMap<Rc<str>, Rc<StructType>>,
    symbols: HashMap<Rc<str>, Symbol>,
}

impl Namespace {
    pub fn new() -> Namespace {
        Namespace::default()
    }

    /// Declares a struct type with the given tag and (name, type) components.
    #[logfn_inputs(TRACE)]
    pub fn add_struct(&mut self, tag: &str, components: Vec<(&str, Type)>) -> Type {
        let tag: Rc<str> = Rc::from(tag);
        let components = components
            .into_iter()
            .map(|(name, ty)| Component {
                name: Rc::from(name),
                ty,
            })
            .collect();
        self.structs.insert(
            tag.clone(),
            Rc::new(StructType {
                tag: tag.clone(),
                components,
            }),
        );
        Type::StructTag(tag)
    }

    /// Declares a symbol with the given name and type.
    #[logfn_inputs(TRACE)]
    pub fn add_symbol(&mut self, name: &str, ty: Type) -> Expression {
        let symbol = Symbol {
            name: Rc::from(name),
            ty,
        };
        let expr = symbol.symbol_expr();
        self.symbols.insert(symbol.name.clone(), symbol);
        expr
    }

    /// Returns the layout of the struct with the given tag.
    /// A tag without a layout means the namespace was not built for the program being analyzed.
    pub fn follow_tag(&self, tag: &str) -> &Rc<StructType> {
        match self.structs.get(tag) {
            Some(struct_type) => struct_type,
            None => assume_unreachable!("no type descriptor for struct tag {}", tag),
        }
    }

    /// Returns the struct layout of the type, if it is a struct type.
    pub fn struct_type(&self, ty: &Type) -> Option<&Rc<StructType>> {
        if let Type::StructTag(tag) = ty {
            Some(self.follow_tag(tag))
        } else {
            None
        }
    }

    /// Returns the symbol with the given name. Looking up an undeclared symbol is a client bug.
    pub fn lookup(&self, name: &str) -> &Symbol {
        match self.symbols.get(name) {
            Some(symbol) => symbol,
            None => assume_unreachable!("symbol {} is not declared in the namespace", name),
        }
    }

    /// True if a value of type inner can be stored somewhere inside a value of type outer.
    #[logfn_inputs(TRACE)]
    pub fn contains_type(&self, outer: &Type, inner: &Type) -> bool {
        if outer == inner {
            return true;
        }
        match outer {
            Type::Array { element, .. } => self.contains_type(element, inner),
            Type::StructTag(tag) => self
                .follow_tag(tag)
                .components
                .iter()
                .any(|c| self.contains_type(&c.ty, inner)),
            _ => false,
        }
    }
}
