//! Runtime environment for the bridge
//!
//! This module provides the execution frontend: the `Host` that owns the
//! handle registry, the binding table, and the persistent global namespace,
//! plus the interpreter and value types.

mod interp;
pub mod scope;
pub mod value;

pub use interp::Interpreter;
pub use value::{ErrorValue, NativeFn, NativeFunction, ScriptFunction, Value};

use crate::bridge::{
    Access, BindingTable, ClassBinding, ClassDescriptor, Dispatcher, Handle, HandleRegistry,
    NativeObject,
};
use crate::error::{Error, Result};
use crate::marshal::{self, Expected, HostValue};
use crate::runtime::scope::{Scope, ScopeKind, ScopeRef};
use std::path::Path;
use tracing::debug;

/// The script-execution host
///
/// One `Host` is one execution domain: registry, bindings, and the persistent
/// global namespace survive across `run` calls, so `var` declarations from
/// one script are visible to the next. A failed run leaves all three intact.
pub struct Host {
    registry: HandleRegistry,
    bindings: BindingTable,
    globals: ScopeRef,
}

impl Host {
    /// Create a new host with an empty surface
    pub fn new() -> Self {
        Self {
            registry: HandleRegistry::new(),
            bindings: BindingTable::new(),
            globals: Scope::global(),
        }
    }

    /// Run script source to completion. The result is the value of the last
    /// expression statement; an uncaught throw yields `Error::ScriptError`.
    pub fn run(&mut self, source: &str) -> Result<Value> {
        debug!(bytes = source.len(), "running script");
        let program = crate::parser::parse(source)?;

        // let/const land here and are discarded when the run ends
        let run_scope = Scope::child(&self.globals, ScopeKind::Block);
        let mut interp = Interpreter::new(&mut self.registry, &self.bindings);
        let result = interp.run_program(&program, &run_scope);
        debug!(ok = result.is_ok(), "script finished");
        result
    }

    /// Run a script from a file
    pub fn run_file(&mut self, path: &Path) -> Result<Value> {
        let source = std::fs::read_to_string(path)?;
        self.run(&source)
    }

    /// Register a native class binding. Must happen before the class is
    /// referenced from script; bindings are immutable once registered.
    pub fn register_class(&mut self, binding: ClassBinding) -> Result<()> {
        self.bindings.register_class(binding)
    }

    /// Inject a free function callable from script
    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> Result<Value> + 'static,
    ) {
        self.bindings.register_function(name, f);
    }

    /// Register a native object directly, returning its handle
    pub fn register_object<T: NativeObject>(&mut self, object: T, access: Access) -> Handle {
        self.registry.register(object, access)
    }

    /// Destroy a native object, invalidating all outstanding handles over it
    pub fn destroy_object(&mut self, handle: &Handle) -> Result<()> {
        self.registry.destroy(handle)
    }

    /// Set a persistent global visible to every subsequent run
    pub fn set_global(&mut self, name: &str, value: HostValue) {
        self.globals.declare(name, marshal::to_script(value), true);
    }

    /// Set a persistent global to a raw script value (e.g. a handle)
    pub fn set_global_value(&mut self, name: &str, value: Value) {
        self.globals.declare(name, value, true);
    }

    /// Read a persistent global
    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.globals.lookup(name)
    }

    /// Call a script-declared function from native code
    pub fn call_function(&mut self, name: &str, args: &[HostValue]) -> Result<HostValue> {
        let result = self.call_function_value(name, args)?;
        marshal::to_native(&result, Expected::Any)
    }

    /// Call a script-declared function, keeping the raw script result
    pub fn call_function_value(&mut self, name: &str, args: &[HostValue]) -> Result<Value> {
        let callee = self
            .globals
            .lookup(name)
            .ok_or_else(|| Error::script_error(format!("'{}' is not defined", name)))?;
        let args: Vec<Value> = args.iter().cloned().map(marshal::to_script).collect();

        debug!(name, argc = args.len(), "calling script function from native");
        let mut interp = Interpreter::new(&mut self.registry, &self.bindings);
        interp.call_value(&callee, &args)
    }

    /// Invoke a bound method on a native object from native code, with the
    /// same access checks script-side calls get
    pub fn invoke(&mut self, handle: &Handle, member: &str, args: &[HostValue]) -> Result<HostValue> {
        let args: Vec<Value> = args.iter().cloned().map(marshal::to_script).collect();
        let mut dispatcher = Dispatcher::new(&mut self.registry, &self.bindings);
        let result = dispatcher.invoke(handle, member, &args)?;
        marshal::to_native(&result, Expected::Any)
    }

    /// Read a bound property through the dispatcher
    pub fn get_property(&mut self, handle: &Handle, name: &str) -> Result<HostValue> {
        let mut dispatcher = Dispatcher::new(&mut self.registry, &self.bindings);
        let result = dispatcher.get_property(handle, name)?;
        marshal::to_native(&result, Expected::Any)
    }

    /// Write a bound property through the dispatcher
    pub fn set_property(&mut self, handle: &Handle, name: &str, value: HostValue) -> Result<()> {
        let value = marshal::to_script(value);
        let mut dispatcher = Dispatcher::new(&mut self.registry, &self.bindings);
        dispatcher.set_property(handle, name, &value)
    }

    /// Describe a registered class for introspection
    pub fn describe(&self, class: &str) -> Option<ClassDescriptor> {
        self.bindings.describe(class)
    }

    /// The handle registry
    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// The handle registry, mutably
    pub fn registry_mut(&mut self) -> &mut HandleRegistry {
        &mut self.registry
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}
