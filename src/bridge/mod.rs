//! The native/script bridge
//!
//! This module is the core of the crate: the handle registry that maps live
//! native objects to script-visible handles, the binding table that declares
//! what script code may do with each native type, and the dispatcher that
//! routes member access across the boundary with access-control checks.

mod bindings;
mod dispatch;
mod registry;

pub use bindings::{
    BindingTable, ClassBinding, ClassBuilder, ClassDescriptor, ConstructorFn, FreeFn, GetterFn,
    MethodDescriptor, MethodFn, PropertyDescriptor, SetterFn,
};
pub use dispatch::Dispatcher;
pub use registry::{Access, Handle, HandleRegistry};

/// A native type exposable through the bridge.
///
/// Implementors live in registry slots and are reached from script through
/// handles. The class name ties an instance to its `ClassBinding`.
pub trait NativeObject: std::any::Any {
    /// The binding-table name of this type
    fn class_name(&self) -> &'static str;
}
