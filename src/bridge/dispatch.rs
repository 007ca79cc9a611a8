//! Call dispatcher: routes member access across the boundary
//!
//! Every script-side touch of a native object funnels through here:
//! construction, method invocation, property reads and writes, and injected
//! free functions. The dispatcher resolves the receiver through the registry,
//! consults the binding table, and applies the access-control checks before
//! any native code runs.

use crate::bridge::bindings::BindingTable;
use crate::bridge::registry::{Handle, HandleRegistry};
use crate::error::{Error, Result};
use crate::runtime::value::Value;
use tracing::{debug, trace};

/// Dispatcher over a registry and binding table
pub struct Dispatcher<'a> {
    pub registry: &'a mut HandleRegistry,
    pub bindings: &'a BindingTable,
}

impl<'a> Dispatcher<'a> {
    /// Create a dispatcher
    pub fn new(registry: &'a mut HandleRegistry, bindings: &'a BindingTable) -> Self {
        Self { registry, bindings }
    }

    /// Construct an instance of `class_name` from script
    pub fn construct(&mut self, class_name: &str, args: &[Value]) -> Result<Value> {
        let binding = self
            .bindings
            .class(class_name)
            .ok_or_else(|| Error::not_constructible(class_name))?;
        let constructor = binding
            .constructor()
            .ok_or_else(|| Error::not_constructible(class_name))?;

        trace!(class = class_name, "constructing native object");
        let handle = constructor.clone()(self.registry, args)?;
        Ok(Value::Native(handle))
    }

    /// Invoke a bound method through a handle
    pub fn invoke(&mut self, handle: &Handle, member: &str, args: &[Value]) -> Result<Value> {
        // Liveness first: a dangling handle fails before member lookup
        self.registry.resolve(handle)?;

        let binding = class_binding(self.bindings, handle)?;
        let (mutates, func) = match binding.method(member) {
            Some((mutates, func)) => (mutates, func.clone()),
            None => return Err(Error::unknown_member(handle.class(), member)),
        };

        if mutates && !handle.is_mutable() {
            debug!(class = handle.class(), member, "refused mutating call through const handle");
            return Err(Error::access_violation(format!(
                "cannot call mutating method '{}' through a const handle",
                member
            )));
        }

        trace!(class = handle.class(), member, mutates, "invoking method");
        func(self.registry, handle, args)
    }

    /// Read a bound property through a handle
    pub fn get_property(&mut self, handle: &Handle, name: &str) -> Result<Value> {
        self.registry.resolve(handle)?;

        let binding = class_binding(self.bindings, handle)?;
        let getter = match binding.property(name) {
            Some((getter, _setter)) => getter.clone(),
            None => return Err(Error::unknown_member(handle.class(), name)),
        };

        getter(self.registry, handle)
    }

    /// Write a bound property through a handle
    pub fn set_property(&mut self, handle: &Handle, name: &str, value: &Value) -> Result<()> {
        self.registry.resolve(handle)?;

        let binding = class_binding(self.bindings, handle)?;
        let setter = match binding.property(name) {
            Some((_getter, setter)) => setter.cloned(),
            None => return Err(Error::unknown_member(handle.class(), name)),
        };

        if !handle.is_mutable() {
            debug!(class = handle.class(), name, "refused write through const handle");
            return Err(Error::access_violation(format!(
                "cannot write property '{}' through a const handle",
                name
            )));
        }

        let setter = match setter {
            Some(s) => s,
            None => {
                debug!(class = handle.class(), name, "refused write to read-only property");
                return Err(Error::access_violation(format!(
                    "property '{}' is read-only",
                    name
                )));
            }
        };

        setter(self.registry, handle, value)
    }

    /// Whether the class declares `member` at all (method or property)
    pub fn has_member(&self, handle: &Handle, member: &str) -> bool {
        self.bindings
            .class(handle.class())
            .is_some_and(|b| b.has_member(member))
    }

    /// Call an injected free function
    pub fn call_function(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        let func = self
            .bindings
            .function(name)
            .ok_or_else(|| Error::native_invocation(format!("no native function '{}'", name)))?;
        trace!(name, "calling injected function");
        func.clone()(args)
    }
}

fn class_binding<'b>(
    bindings: &'b BindingTable,
    handle: &Handle,
) -> Result<&'b crate::bridge::bindings::ClassBinding> {
    bindings.class(handle.class()).ok_or_else(|| {
        Error::InternalError(format!(
            "no binding registered for class '{}'",
            handle.class()
        ))
    })
}
