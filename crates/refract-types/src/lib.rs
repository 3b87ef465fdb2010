//! Refract Type Model
//!
//! Declared and erased types, class hierarchy queries, and generic type
//! resolution across multi-level class/interface inheritance.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod hierarchy;
pub mod resolver;
pub mod ty;

pub use error::TypeError;
pub use hierarchy::TypeHierarchy;
pub use resolver::{type_to_class, GenericField, GenericMethod, TypeResolver};
pub use ty::{
    ClassId, ClassRef, ParameterizedType, Primitive, Type, TypeVariable, VarOwner, WildcardType,
};
