//! ChocoPy type lattice
//!
//! Value types are plain data compared by name; the class hierarchy they are
//! ordered by lives elsewhere (the semantic class arena) and is reached
//! through the [`ClassHierarchy`] trait.

use serde::ser::{Serialize, Serializer};
use std::fmt;

use crate::frontend::ast::{TypeAnnotation, TypeAnnotationKind};

pub const OBJECT: &str = "object";
pub const INT: &str = "int";
pub const STR: &str = "str";
pub const BOOL: &str = "bool";
pub const NONE: &str = "<None>";
pub const EMPTY: &str = "<Empty>";

// ==================== Value Types ====================

/// The type of a value: a named class or a homogeneous list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(tag = "kind")]
pub enum ValueType {
    #[serde(rename = "ClassValueType")]
    Class {
        #[serde(rename = "className")]
        name: String,
    },
    #[serde(rename = "ListValueType")]
    List {
        #[serde(rename = "elementType")]
        element: Box<ValueType>,
    },
}

impl ValueType {
    pub fn class(name: impl Into<String>) -> Self {
        ValueType::Class { name: name.into() }
    }

    pub fn list(element: ValueType) -> Self {
        ValueType::List { element: Box::new(element) }
    }

    pub fn object() -> Self {
        Self::class(OBJECT)
    }

    pub fn int() -> Self {
        Self::class(INT)
    }

    pub fn str() -> Self {
        Self::class(STR)
    }

    pub fn bool() -> Self {
        Self::class(BOOL)
    }

    pub fn none() -> Self {
        Self::class(NONE)
    }

    pub fn empty() -> Self {
        Self::class(EMPTY)
    }

    /// Build the value type an annotation denotes, without validating it.
    pub fn from_annotation(annotation: &TypeAnnotation) -> Self {
        match &annotation.kind {
            TypeAnnotationKind::ClassType { class_name } => Self::class(class_name.as_str()),
            TypeAnnotationKind::ListType { element_type } => Self::list(Self::from_annotation(element_type)),
        }
    }

    /// The class name, or `None` for list types.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            ValueType::Class { name } => Some(name),
            ValueType::List { .. } => None,
        }
    }

    pub fn element_type(&self) -> Option<&ValueType> {
        match self {
            ValueType::List { element } => Some(element),
            ValueType::Class { .. } => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, ValueType::List { .. })
    }

    fn is_named(&self, class: &str) -> bool {
        self.class_name() == Some(class)
    }

    pub fn is_object(&self) -> bool {
        self.is_named(OBJECT)
    }

    pub fn is_int(&self) -> bool {
        self.is_named(INT)
    }

    pub fn is_str(&self) -> bool {
        self.is_named(STR)
    }

    pub fn is_bool(&self) -> bool {
        self.is_named(BOOL)
    }

    pub fn is_none(&self) -> bool {
        self.is_named(NONE)
    }

    pub fn is_empty_list(&self) -> bool {
        self.is_named(EMPTY)
    }

    /// `int`, `str` and `bool`: cannot be extended and never hold None.
    pub fn is_special(&self) -> bool {
        self.is_int() || self.is_str() || self.is_bool()
    }

    /// Values of this type are unboxed words (`int`, `bool`).
    pub fn is_unboxed(&self) -> bool {
        self.is_int() || self.is_bool()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Class { name } => write!(f, "{}", name),
            ValueType::List { element } => write!(f, "[{}]", element),
        }
    }
}

// ==================== Function Types ====================

/// Signature of a function or method; a method's receiver is `params[0]`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename = "FuncType")]
pub struct FuncType {
    #[serde(rename = "parameters")]
    pub params: Vec<ValueType>,
    #[serde(rename = "returnType")]
    pub ret: ValueType,
}

impl FuncType {
    pub fn new(params: Vec<ValueType>, ret: ValueType) -> Self {
        Self { params, ret }
    }

    /// Override compatibility: same arity, same return type, and the same
    /// parameter types after the receiver.
    pub fn can_override(&self, inherited: &FuncType) -> bool {
        self.params.len() == inherited.params.len()
            && self.ret == inherited.ret
            && self.params.iter().skip(1).eq(inherited.params.iter().skip(1))
    }
}

// ==================== Types ====================

/// Anything a name can be bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Value(ValueType),
    Func(FuncType),
    /// A class name used as a name: the class itself, not an instance.
    Class(String),
}

impl Type {
    pub fn as_value(&self) -> Option<&ValueType> {
        match self {
            Type::Value(vt) => Some(vt),
            _ => None,
        }
    }

    pub fn as_func(&self) -> Option<&FuncType> {
        match self {
            Type::Func(ft) => Some(ft),
            _ => None,
        }
    }

    pub fn is_func(&self) -> bool {
        matches!(self, Type::Func(_))
    }
}

impl From<ValueType> for Type {
    fn from(vt: ValueType) -> Self {
        Type::Value(vt)
    }
}

impl From<FuncType> for Type {
    fn from(ft: FuncType) -> Self {
        Type::Func(ft)
    }
}

impl Serialize for Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Type::Value(vt) => vt.serialize(serializer),
            Type::Func(ft) => ft.serialize(serializer),
            Type::Class(name) => ValueType::class(name.as_str()).serialize(serializer),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Value(vt) => write!(f, "{}", vt),
            Type::Func(_) => write!(f, "<function>"),
            Type::Class(name) => write!(f, "{}", name),
        }
    }
}

// ==================== Lattice ====================

/// Single-inheritance class hierarchy the lattice is ordered by.
pub trait ClassHierarchy {
    /// Name of the direct super-class, or `None` at the root.
    fn super_class_of(&self, class: &str) -> Option<&str>;
}

/// `sub` is `sup` itself, `sup` is `object`, or `sub`'s super chain
/// reaches `sup`.
pub fn is_subclass<H: ClassHierarchy + ?Sized>(hierarchy: &H, sub: &ValueType, sup: &ValueType) -> bool {
    if sub == sup || sup.is_object() {
        return true;
    }
    let (Some(mut current), Some(target)) = (sub.class_name(), sup.class_name()) else {
        return false;
    };
    while let Some(parent) = hierarchy.super_class_of(current) {
        if parent == target {
            return true;
        }
        current = parent;
    }
    false
}

/// Assignability `from ⇐ to`.
pub fn can_assign<H: ClassHierarchy + ?Sized>(hierarchy: &H, from: &ValueType, to: &ValueType) -> bool {
    if is_subclass(hierarchy, from, to) {
        return true;
    }
    if from.is_none() {
        return !to.is_special();
    }
    if from.is_empty_list() {
        return to.is_list();
    }
    match (from.element_type(), to.element_type()) {
        (Some(elem_from), Some(elem_to)) => elem_from.is_none() && !elem_to.is_special(),
        _ => false,
    }
}

/// Least upper bound of two value types.
pub fn join<H: ClassHierarchy + ?Sized>(hierarchy: &H, a: &ValueType, b: &ValueType) -> ValueType {
    if can_assign(hierarchy, a, b) {
        return b.clone();
    }
    if can_assign(hierarchy, b, a) {
        return a.clone();
    }
    let (Some(a_name), Some(b_name)) = (a.class_name(), b.class_name()) else {
        return ValueType::object();
    };
    let mut ancestors = vec![a_name];
    let mut current = a_name;
    while let Some(parent) = hierarchy.super_class_of(current) {
        ancestors.push(parent);
        current = parent;
    }
    let mut current = b_name;
    loop {
        if ancestors.contains(&current) {
            return ValueType::class(current);
        }
        match hierarchy.super_class_of(current) {
            Some(parent) => current = parent,
            None => return ValueType::object(),
        }
    }
}
