//! Type system

pub mod type_system;

pub use type_system::{can_assign, is_subclass, join, ClassHierarchy, FuncType, Type, ValueType};
