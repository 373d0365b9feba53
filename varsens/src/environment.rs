// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::abstract_object::{AbstractObject, AbstractObjectTrait};
use crate::array_object::ArrayAbstractObject;
use crate::bool_domain::BoolDomain;
use crate::constant_domain::ConstantDomain;
use crate::errors::AccessError;
use crate::expression::Expression;
use crate::interval_domain::IntervalDomain;
use crate::k_limits;
use crate::options::{Options, ScalarDomainKind};
use crate::path::{ArrayIndex, Path, PathSelector};
use crate::pointer_object::{PointerAbstractObject, PointerTarget};
use crate::scalar_object::ScalarAbstractObject;
use crate::struct_object::StructAbstractObject;
use crate::types::{Namespace, Symbol, Type};

use log_derive::{logfn, logfn_inputs};
use rpds::HashTrieMap;
use serde::{Serialize, Serializer};
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

/// The abstract state of the program at one program point. Every root object (program variable
/// or heap block) that has been declared or written has an entry. Objects without an entry
/// read as top.
#[derive(Clone)]
pub struct Environment {
    pub value_map: HashTrieMap<Rc<Path>, Rc<AbstractObject>>,
    /// True if the program point is unreachable.
    bottom: bool,
    namespace: Rc<Namespace>,
    options: Rc<Options>,
}

impl Debug for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if self.bottom {
            return f.write_str("BOTTOM");
        }
        f.debug_map()
            .entries(self.value_map.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl Serialize for Environment {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.value_map
                .iter()
                .map(|(path, value)| (format!("{:?}", path), value)),
        )
    }
}

/// The memory locations an lvalue may denote.
#[derive(Debug)]
enum Locations {
    /// One of the paths. exact is true if the lvalue definitely denotes the only path.
    /// may_be_invalid is true if the lvalue may denote no object at all.
    Known {
        paths: Vec<Rc<Path>>,
        exact: bool,
        may_be_invalid: bool,
    },
    /// Any object of the given type, because the lvalue is reached via an unknown pointer.
    Anywhere { ty: Type },
}

/// Constructors
impl Environment {
    /// An environment in which nothing is known about any object.
    #[logfn_inputs(TRACE)]
    pub fn new(namespace: Rc<Namespace>, options: Rc<Options>) -> Environment {
        Environment {
            value_map: HashTrieMap::default(),
            bottom: false,
            namespace,
            options,
        }
    }
}

/// Queries
impl Environment {
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// True if the program point this environment describes is unreachable.
    pub fn is_bottom(&self) -> bool {
        self.bottom
    }

    /// Returns a reference to the value associated with the given root path, if there is one.
    #[logfn_inputs(TRACE)]
    #[logfn(TRACE)]
    pub fn value_at(&self, path: &Rc<Path>) -> Option<&Rc<AbstractObject>> {
        self.value_map.get(path)
    }

    /// Returns a JSON rendering of the environment, keyed by root path.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Scope and reachability
impl Environment {
    /// Brings a symbol into scope. Its value is top.
    #[logfn_inputs(TRACE)]
    pub fn declare(&mut self, symbol: &Symbol) {
        let path = Path::new_variable(symbol.name.clone(), symbol.ty.clone());
        self.value_map.insert_mut(path, AbstractObject::top_of(&symbol.ty));
    }

    /// Removes a symbol that goes out of scope.
    #[logfn_inputs(TRACE)]
    pub fn erase(&mut self, symbol: &Symbol) {
        let path = Path::new_variable(symbol.name.clone(), symbol.ty.clone());
        self.value_map.remove_mut(&path);
    }

    /// Forgets everything that is known about the object(s) that lhs denotes.
    #[logfn_inputs(TRACE)]
    pub fn havoc(&mut self, lhs: &Expression) -> std::result::Result<(), AccessError> {
        let top = AbstractObject::top_of(&lhs.infer_type());
        self.write(lhs, &top, false)
    }

    /// Marks the program point as unreachable.
    pub fn make_bottom(&mut self) {
        self.value_map = HashTrieMap::default();
        self.bottom = true;
    }

    /// Forgets everything, the program point is reachable with any state.
    pub fn make_top(&mut self) {
        self.value_map = HashTrieMap::default();
        self.bottom = false;
    }
}

/// Reads
impl Environment {
    /// Returns the abstraction of the value that expression denotes in this state.
    #[logfn_inputs(TRACE)]
    pub fn read(
        &self,
        expression: &Expression,
    ) -> std::result::Result<Rc<AbstractObject>, AccessError> {
        if self.bottom {
            return Ok(AbstractObject::bottom_of(&expression.infer_type()));
        }
        self.eval(expression)
    }

    /// Evaluates the expression in this state.
    /// Expressions the domain cannot interpret evaluate to top.
    #[logfn_inputs(TRACE)]
    pub fn eval(
        &self,
        expression: &Expression,
    ) -> std::result::Result<Rc<AbstractObject>, AccessError> {
        let result_type = expression.infer_type();
        let result = match expression {
            Expression::Constant { value, ty } => self.constant(value, ty),
            Expression::NullPointer { ty } => {
                Rc::new(PointerAbstractObject::null(ty.clone()).into())
            }
            Expression::Nondet { ty } => AbstractObject::top_of(ty),
            // The block is an array of unknown length, the pointer selects its first element.
            Expression::HeapAllocation { ordinal, ty } => match ty.pointee() {
                Some(element_type) => {
                    let block_type = Type::array_of(element_type.clone(), None);
                    let block = Path::new_heap_block(*ordinal, block_type);
                    let first = Path::add_selectors(
                        &block,
                        &[PathSelector::Index(ArrayIndex::Constant(0))],
                        &self.namespace,
                    )?;
                    Rc::new(PointerAbstractObject::to_path(ty.clone(), first).into())
                }
                None => return Err(AccessError::NotAPointer { ty: ty.clone() }),
            },
            Expression::ArrayOf { value, ty } => {
                let element = self.eval(value)?;
                Rc::new(ArrayAbstractObject::filled(ty.clone(), element, &self.options).into())
            }
            Expression::StructOf { fields, ty } => {
                let values = fields
                    .iter()
                    .map(|field| self.eval(field))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                let object =
                    StructAbstractObject::from_components(ty.clone(), values, &self.namespace);
                Rc::new(object.into())
            }
            Expression::Symbol { .. }
            | Expression::Member { .. }
            | Expression::Index { .. }
            | Expression::Dereference { .. } => {
                let locations = self.resolve_lvalue(expression)?;
                self.read_locations(&locations, &result_type)?
            }
            Expression::AddressOf { object, ty } => self.address_of(object, ty)?,
            Expression::Typecast { operand, ty } => self.typecast(operand, ty)?,
            Expression::Plus { left, right, ty } => {
                let (left, right) = (self.eval(left)?, self.eval(right)?);
                match (left.as_ref(), right.as_ref()) {
                    (AbstractObject::Pointer(p), AbstractObject::Scalar(offset)) => {
                        Rc::new(p.offset_by(offset).into())
                    }
                    (AbstractObject::Scalar(x), AbstractObject::Scalar(y)) => {
                        Rc::new(x.add(y).into())
                    }
                    _ => AbstractObject::top_of(ty),
                }
            }
            Expression::Minus { left, right, ty } => {
                let (left, right) = (self.eval(left)?, self.eval(right)?);
                match (left.as_ref(), right.as_ref()) {
                    (AbstractObject::Pointer(p), AbstractObject::Scalar(offset)) => {
                        Rc::new(p.offset_by(&offset.neg()).into())
                    }
                    (AbstractObject::Scalar(x), AbstractObject::Scalar(y)) => {
                        Rc::new(x.sub(y).into())
                    }
                    _ => AbstractObject::top_of(ty),
                }
            }
            Expression::Mult { left, right, ty } => {
                let (left, right) = (self.eval(left)?, self.eval(right)?);
                match (left.as_ref(), right.as_ref()) {
                    (AbstractObject::Scalar(x), AbstractObject::Scalar(y)) => {
                        Rc::new(x.mul(y).into())
                    }
                    _ => AbstractObject::top_of(ty),
                }
            }
            Expression::UnaryMinus { operand, ty } => match self.eval(operand)?.as_scalar() {
                Some(x) => Rc::new(x.neg().into()),
                None => AbstractObject::top_of(ty),
            },
            Expression::And { left, right } => {
                let left = self.truth_value(left)?;
                let right = self.truth_value(right)?;
                bool_object(left.and(&right))
            }
            Expression::Equal { left, right } => self.compare(
                left,
                right,
                ConstantDomain::equals,
                intervals_equal,
                Some(false),
            )?,
            Expression::NotEqual { left, right } => self.compare(
                left,
                right,
                ConstantDomain::not_equals,
                intervals_not_equal,
                Some(true),
            )?,
            Expression::GreaterThan { left, right } => self.compare(
                left,
                right,
                ConstantDomain::greater_than,
                IntervalDomain::greater_than,
                None,
            )?,
            Expression::GreaterOrEqual { left, right } => self.compare(
                left,
                right,
                ConstantDomain::greater_or_equal,
                IntervalDomain::greater_or_equal,
                None,
            )?,
            Expression::LessThan { left, right } => self.compare(
                left,
                right,
                ConstantDomain::less_than,
                IntervalDomain::less_than,
                None,
            )?,
            Expression::PointerObject(..)
            | Expression::ObjectSize(..)
            | Expression::PointerOffset(..)
            | Expression::DynamicObject(..)
            | Expression::InvalidPointer(..) => AbstractObject::top_of(&result_type),
        };
        if *result.get_type() != result_type {
            debug!(
                "{:?} evaluates to an object of type {:?}, using top",
                expression,
                result.get_type()
            );
            return Ok(AbstractObject::top_of(&result_type));
        }
        Ok(result)
    }

    fn constant(&self, value: &ConstantDomain, ty: &Type) -> Rc<AbstractObject> {
        if ty.is_pointer() {
            return if value.as_i128() == Some(0) {
                Rc::new(PointerAbstractObject::null(ty.clone()).into())
            } else {
                AbstractObject::top_of(ty)
            };
        }
        let scalar = ScalarAbstractObject::from_constant(
            value.clone(),
            ty.clone(),
            self.options.scalar_domain,
        );
        Rc::new(scalar.into())
    }

    fn address_of(
        &self,
        object: &Expression,
        ty: &Type,
    ) -> std::result::Result<Rc<AbstractObject>, AccessError> {
        if let Expression::Dereference { pointer, .. } = object {
            return self.eval(pointer);
        }
        Ok(match self.resolve_lvalue(object)? {
            Locations::Anywhere { .. } => AbstractObject::top_of(ty),
            Locations::Known { paths, .. }
                if paths
                    .iter()
                    .any(|p| p.path_length() > k_limits::MAX_PATH_LENGTH) =>
            {
                AbstractObject::top_of(ty)
            }
            Locations::Known {
                paths,
                may_be_invalid,
                ..
            } => {
                let targets = paths
                    .into_iter()
                    .map(|path| PointerTarget {
                        path,
                        offset: Some(0),
                    })
                    .collect();
                let pointer = PointerAbstractObject::from_targets(
                    ty.clone(),
                    targets,
                    false,
                    may_be_invalid,
                );
                Rc::new(pointer.into())
            }
        })
    }

    fn typecast(
        &self,
        operand: &Expression,
        ty: &Type,
    ) -> std::result::Result<Rc<AbstractObject>, AccessError> {
        let value = self.eval(operand)?;
        if value.get_type() == ty {
            return Ok(value);
        }
        let is_scalar_type = ty.is_integer() || *ty == Type::Bool;
        Ok(match value.as_ref() {
            AbstractObject::Scalar(s) if is_scalar_type => Rc::new(s.cast(ty).into()),
            AbstractObject::Scalar(s)
                if ty.is_pointer() && s.to_constant().and_then(|c| c.as_i128()) == Some(0) =>
            {
                Rc::new(PointerAbstractObject::null(ty.clone()).into())
            }
            // Offsets count elements of the pointee type, so they do not survive the cast.
            AbstractObject::Pointer(p)
                if ty.is_pointer() && p.targets().iter().all(|t| t.offset == Some(0)) =>
            {
                Rc::new(p.with_type(ty.clone()).into())
            }
            _ => AbstractObject::top_of(ty),
        })
    }

    fn truth_value(&self, operand: &Expression) -> std::result::Result<BoolDomain, AccessError> {
        Ok(match self.eval(operand)?.as_scalar() {
            Some(s) => s.as_bool_domain(),
            None => BoolDomain::Top,
        })
    }

    // Comparisons of scalars use the given operations. Pointers can only be compared for
    // equality, negated_equality is Some(false) for == and Some(true) for !=.
    fn compare(
        &self,
        left: &Expression,
        right: &Expression,
        const_op: fn(&ConstantDomain, &ConstantDomain) -> ConstantDomain,
        interval_op: fn(&IntervalDomain, &IntervalDomain) -> Option<bool>,
        negated_equality: Option<bool>,
    ) -> std::result::Result<Rc<AbstractObject>, AccessError> {
        let (left, right) = (self.eval(left)?, self.eval(right)?);
        Ok(match (left.as_ref(), right.as_ref()) {
            (AbstractObject::Scalar(x), AbstractObject::Scalar(y)) => {
                Rc::new(x.compare(y, const_op, interval_op).into())
            }
            (AbstractObject::Pointer(p1), AbstractObject::Pointer(p2)) => {
                match negated_equality {
                    Some(false) => bool_object(pointers_equal(p1, p2)),
                    Some(true) => bool_object(pointers_equal(p1, p2).not()),
                    None => AbstractObject::top_of(&Type::Bool),
                }
            }
            _ => AbstractObject::top_of(&Type::Bool),
        })
    }

    // Returns the abstraction of the value stored at one of the locations.
    fn read_locations(
        &self,
        locations: &Locations,
        ty: &Type,
    ) -> std::result::Result<Rc<AbstractObject>, AccessError> {
        match locations {
            Locations::Anywhere { ty } => Ok(AbstractObject::top_of(ty)),
            Locations::Known { paths, .. } => {
                let mut result: Option<Rc<AbstractObject>> = None;
                for path in paths.iter() {
                    let value = self.read_path(path)?;
                    result = Some(match result {
                        None => value,
                        Some(previous) => previous.merge(&value).0,
                    });
                }
                Ok(result.unwrap_or_else(|| AbstractObject::bottom_of(ty)))
            }
        }
    }

    // Returns the abstraction of the object at path. Untracked roots are top.
    fn read_path(&self, path: &Rc<Path>) -> std::result::Result<Rc<AbstractObject>, AccessError> {
        let (root, selectors) = path.split_root();
        let root_value = match self.value_map.get(&root) {
            Some(value) => value.clone(),
            None => AbstractObject::top_of(root.get_type()),
        };
        root_value.read_path(&selectors, &self.namespace)
    }

    // Works out which memory locations the lvalue may denote.
    fn resolve_lvalue(&self, lvalue: &Expression) -> std::result::Result<Locations, AccessError> {
        match lvalue {
            Expression::Symbol { name, ty } => Ok(Locations::Known {
                paths: vec![Path::new_variable(name.clone(), ty.clone())],
                exact: true,
                may_be_invalid: false,
            }),
            Expression::Member {
                compound,
                field,
                ty,
            } => {
                let selector = Rc::new(PathSelector::Field(field.clone()));
                let qualifiers = self.resolve_lvalue(compound)?;
                self.select(qualifiers, selector, ty)
            }
            Expression::Index { array, index, ty } => {
                let index_type = index.infer_type();
                if !index_type.is_integer() {
                    return Err(AccessError::IncompatibleIndex {
                        array_type: array.infer_type(),
                        index_type,
                    });
                }
                let index = match self.eval(index)?.as_scalar() {
                    Some(scalar) => scalar.as_array_index(),
                    None => ArrayIndex::Unknown,
                };
                let selector = Rc::new(PathSelector::Index(index));
                let qualifiers = self.resolve_lvalue(array)?;
                self.select(qualifiers, selector, ty)
            }
            Expression::Dereference { pointer, ty } => {
                let value = self.eval(pointer)?;
                let p = match value.as_pointer() {
                    Some(p) => p,
                    None => {
                        return Err(AccessError::NotAPointer {
                            ty: value.get_type().clone(),
                        })
                    }
                };
                if p.is_top() {
                    return Ok(Locations::Anywhere { ty: ty.clone() });
                }
                let mut paths = Vec::new();
                for target in p.targets() {
                    match target.path.with_element_offset(target.offset) {
                        Some(path) => paths.push(path),
                        // The unknown offset may well be zero.
                        None if target.offset.is_none() => paths.push(target.path.clone()),
                        None => debug!("{:?} points outside of its object", target),
                    }
                }
                // A pointer that only points outside of objects may still be dereferenced.
                if paths.is_empty() && !p.is_bottom() {
                    return Ok(Locations::Anywhere { ty: ty.clone() });
                }
                Ok(Locations::Known {
                    paths,
                    exact: p.is_precise(),
                    may_be_invalid: p.may_be_null() || p.may_be_invalid(),
                })
            }
            _ => Err(AccessError::NotAnLvalue {
                expression: lvalue.clone(),
            }),
        }
    }

    // Extends every location with the selector.
    fn select(
        &self,
        qualifiers: Locations,
        selector: Rc<PathSelector>,
        ty: &Type,
    ) -> std::result::Result<Locations, AccessError> {
        match qualifiers {
            Locations::Anywhere { .. } => Ok(Locations::Anywhere { ty: ty.clone() }),
            Locations::Known {
                paths,
                exact,
                may_be_invalid,
            } => {
                let paths = paths
                    .into_iter()
                    .map(|path| Path::new_qualified(path, selector.clone(), &self.namespace))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(Locations::Known {
                    paths,
                    exact,
                    may_be_invalid,
                })
            }
        }
    }
}

/// Writes
impl Environment {
    /// Updates the object(s) that lhs denotes with value. A merging write, or a write through an
    /// lvalue that may denote more than one object, merges value into the old contents.
    #[logfn_inputs(TRACE)]
    pub fn write(
        &mut self,
        lhs: &Expression,
        value: &Rc<AbstractObject>,
        merging_write: bool,
    ) -> std::result::Result<(), AccessError> {
        if self.bottom {
            return Ok(());
        }
        match self.resolve_lvalue(lhs)? {
            Locations::Known {
                paths,
                exact,
                may_be_invalid,
            } => {
                let merging_write = merging_write || !exact || may_be_invalid || paths.len() > 1;
                for path in paths.iter() {
                    self.write_path(path, value, merging_write)?;
                }
            }
            Locations::Anywhere { ty } => self.write_anywhere(&ty, value),
        }
        Ok(())
    }

    /// Evaluates rhs and writes the result to lhs.
    #[logfn_inputs(TRACE)]
    pub fn assign(
        &mut self,
        lhs: &Expression,
        rhs: &Expression,
    ) -> std::result::Result<(), AccessError> {
        let value = self.eval(rhs)?;
        self.write(lhs, &value, false)
    }

    fn write_path(
        &mut self,
        path: &Rc<Path>,
        value: &Rc<AbstractObject>,
        merging_write: bool,
    ) -> std::result::Result<(), AccessError> {
        let (root, selectors) = path.split_root();
        let old_value = match self.value_map.get(&root) {
            Some(old_value) => old_value.clone(),
            None => AbstractObject::top_of(root.get_type()),
        };
        let new_value = old_value.write(self, &self.namespace, &selectors, value, merging_write)?;
        self.value_map.insert_mut(root, new_value);
        Ok(())
    }

    // A write through an unknown pointer may update any object that can hold a value of type ty.
    fn write_anywhere(&mut self, ty: &Type, value: &Rc<AbstractObject>) {
        debug!("write of {:?} through an unknown pointer", ty);
        let mut updates = Vec::new();
        for (root, object) in self.value_map.iter() {
            if root.get_type() == ty {
                updates.push((root.clone(), object.merge(value).0));
            } else if self.namespace.contains_type(root.get_type(), ty) && !object.is_top() {
                updates.push((root.clone(), AbstractObject::top_of(root.get_type())));
            }
        }
        for (root, object) in updates.into_iter() {
            self.value_map.insert_mut(root, object);
        }
    }
}

/// Lattice operations
impl Environment {
    /// Updates self to be the join of self and other, returning true if anything changed.
    /// A root that only one side tracks is taken from that side, so drivers should declare
    /// variables on every path that reaches the join.
    #[logfn_inputs(TRACE)]
    pub fn merge(&mut self, other: &Environment) -> bool {
        self.join_or_widen(other, false)
    }

    /// Like merge, but intervals that grew are widened so that loops reach a fixed point.
    /// self is the state of the previous iteration.
    #[logfn_inputs(TRACE)]
    pub fn widen(&mut self, other: &Environment) -> bool {
        self.join_or_widen(other, true)
    }

    fn join_or_widen(&mut self, other: &Environment, widen: bool) -> bool {
        if other.bottom {
            return false;
        }
        if self.bottom {
            // joining bottom and other
            self.value_map = other.value_map.clone();
            self.bottom = false;
            return true;
        }
        let mut modified = false;
        for (path, value2) in other.value_map.iter() {
            let (value, changed) = match self.value_map.get(path) {
                Some(value1) if widen => value1.widen(value2),
                Some(value1) => value1.merge(value2),
                None => (value2.clone(), true),
            };
            if changed {
                self.value_map.insert_mut(path.clone(), value);
                modified = true;
            }
        }
        modified
    }

    /// Returns true if for every path, self.value_at(path) is less or equal to other.value_at(path)
    #[logfn_inputs(TRACE)]
    pub fn subset(&self, other: &Environment) -> bool {
        if self.bottom {
            return true;
        }
        if other.bottom {
            return false;
        }
        let value_map1 = &self.value_map;
        let value_map2 = &other.value_map;
        for (path, val1) in value_map1.iter().filter(|(_, v)| !v.is_bottom()) {
            match value_map2.get(path) {
                Some(val2) => {
                    if !val1.less_or_equal(val2) {
                        trace!("self at {:?} is {:?} other is {:?}", path, val1, val2);
                        return false;
                    }
                }
                None => {
                    trace!("self at {:?} is {:?} other is None", path, val1);
                    return false;
                }
            }
        }
        true
    }
}

fn bool_object(value: BoolDomain) -> Rc<AbstractObject> {
    let scalar = match value.as_bool() {
        Some(b) => {
            ScalarAbstractObject::from_constant(b.into(), Type::Bool, ScalarDomainKind::Constants)
        }
        None if value == BoolDomain::Bottom => ScalarAbstractObject::bottom(Type::Bool),
        None => ScalarAbstractObject::top(Type::Bool),
    };
    Rc::new(scalar.into())
}

fn pointers_equal(p1: &PointerAbstractObject, p2: &PointerAbstractObject) -> BoolDomain {
    if p1.is_bottom() || p2.is_bottom() {
        return BoolDomain::Bottom;
    }
    if p2.null_status() == BoolDomain::True {
        return p1.null_status();
    }
    if p1.null_status() == BoolDomain::True {
        return p2.null_status();
    }
    match (p1.to_constant(), p2.to_constant()) {
        (Some(c1), Some(c2)) if c1 == c2 => BoolDomain::True,
        _ if p1.same_object(p2) == BoolDomain::False => BoolDomain::False,
        _ => BoolDomain::Top,
    }
}

fn intervals_equal(x: &IntervalDomain, y: &IntervalDomain) -> Option<bool> {
    if x.less_than(y) == Some(true) || x.greater_than(y) == Some(true) {
        return Some(false);
    }
    match (x.lower_bound(), x.upper_bound(), y.lower_bound(), y.upper_bound()) {
        (Some(a), Some(b), Some(c), Some(d)) if a == b && c == d && a == c => Some(true),
        _ => None,
    }
}

fn intervals_not_equal(x: &IntervalDomain, y: &IntervalDomain) -> Option<bool> {
    intervals_equal(x, y).map(|equal| !equal)
}
