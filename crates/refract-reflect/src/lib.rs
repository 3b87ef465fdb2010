//! Refract Reflection Engine
//!
//! Derives a cached, normalized view of a class's readable and writable
//! properties: which accessor reads or writes each one, and the concrete,
//! generics-resolved type it carries.
//!
//! # Architecture
//!
//! ```text
//! ClassRegistry ──(TypeHierarchy)──> TypeResolver
//!       │                                 │
//!       └──────> ClassMetadata::build <───┘
//!                        │
//!                  MetadataCache (ReflectorFactory)
//! ```
//!
//! - [`registry`]: the host class model (classes, fields, methods, constructors)
//! - [`naming`]: accessor-name to property-name conventions
//! - [`invoker`]: property accessors with the access-override retry
//! - [`metadata`]: per-class property metadata
//! - [`cache`]: the concurrent metadata cache
//! - [`config`]: TOML configuration

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod builder;
pub mod cache;
pub mod class;
pub mod config;
pub mod error;
pub mod invoker;
pub mod metadata;
pub mod naming;
pub mod object;
pub mod permissions;
pub mod registry;
pub mod value;

pub use builder::{ClassBuilder, ConstructorBuilder, FieldBuilder, MethodBuilder};
pub use cache::{MetadataCache, ReflectorFactory};
pub use class::{ClassDef, ClassKind, ConstructorDef, FieldDef, Member, MethodDef, Modifiers};
pub use config::{PermissionsConfig, ReflectConfig};
pub use error::{InvokeError, ReflectError};
pub use invoker::{Direction, Invoker};
pub use metadata::ClassMetadata;
pub use object::{FieldKey, Instance, ObjectRef};
pub use permissions::{AccessKind, PermissionStore, ReflectionPermission};
pub use registry::{builtins, ClassRegistry};
pub use value::Value;

pub use refract_types::{ClassId, ClassRef, Primitive, Type, TypeHierarchy, TypeVariable, WildcardType};
