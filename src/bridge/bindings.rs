//! Binding table: per-type declarations of what script code may do
//!
//! A `ClassBinding` declares constructibility, methods (tagged const or
//! mutating), and per-property access modes for one native type. Bindings are
//! built through `ClassBuilder` before the host runs its first script and are
//! immutable afterwards. The table also holds the injected free functions.

use crate::bridge::registry::{Access, Handle, HandleRegistry};
use crate::bridge::NativeObject;
use crate::error::{Error, Result};
use crate::runtime::value::Value;
use rustc_hash::FxHashMap as HashMap;
use serde::Serialize;
use std::rc::Rc;

/// Injected free function implementation
pub type FreeFn = Rc<dyn Fn(&[Value]) -> Result<Value>>;

/// Constructor implementation: allocates and registers a fresh object
pub type ConstructorFn = Rc<dyn Fn(&mut HandleRegistry, &[Value]) -> Result<Handle>>;

/// Method implementation. Methods receive the registry so they can resolve
/// their receiver and mint handles for returned objects.
pub type MethodFn = Rc<dyn Fn(&mut HandleRegistry, &Handle, &[Value]) -> Result<Value>>;

/// Property getter implementation
pub type GetterFn = Rc<dyn Fn(&HandleRegistry, &Handle) -> Result<Value>>;

/// Property setter implementation
pub type SetterFn = Rc<dyn Fn(&HandleRegistry, &Handle, &Value) -> Result<()>>;

struct MethodBinding {
    /// Mutating methods are refused through const handles
    mutates: bool,
    func: MethodFn,
}

struct PropertyBinding {
    getter: GetterFn,
    setter: Option<SetterFn>,
}

/// Static declaration of one native type's script surface
pub struct ClassBinding {
    name: &'static str,
    constructor: Option<ConstructorFn>,
    methods: HashMap<&'static str, MethodBinding>,
    properties: HashMap<&'static str, PropertyBinding>,
}

impl ClassBinding {
    /// The class name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True when script may `new` this type
    pub fn is_constructible(&self) -> bool {
        self.constructor.is_some()
    }

    pub(crate) fn constructor(&self) -> Option<&ConstructorFn> {
        self.constructor.as_ref()
    }

    pub(crate) fn method(&self, name: &str) -> Option<(bool, &MethodFn)> {
        self.methods.get(name).map(|m| (m.mutates, &m.func))
    }

    pub(crate) fn property(&self, name: &str) -> Option<(&GetterFn, Option<&SetterFn>)> {
        self.properties
            .get(name)
            .map(|p| (&p.getter, p.setter.as_ref()))
    }

    pub(crate) fn has_member(&self, name: &str) -> bool {
        self.methods.contains_key(name) || self.properties.contains_key(name)
    }

    /// Describe this binding for host-side introspection
    pub fn describe(&self) -> ClassDescriptor {
        let mut methods: Vec<MethodDescriptor> = self
            .methods
            .iter()
            .map(|(name, m)| MethodDescriptor {
                name: name.to_string(),
                mutates: m.mutates,
            })
            .collect();
        methods.sort_by(|a, b| a.name.cmp(&b.name));

        let mut properties: Vec<PropertyDescriptor> = self
            .properties
            .iter()
            .map(|(name, p)| PropertyDescriptor {
                name: name.to_string(),
                readable: true,
                writable: p.setter.is_some(),
            })
            .collect();
        properties.sort_by(|a, b| a.name.cmp(&b.name));

        ClassDescriptor {
            name: self.name.to_string(),
            constructible: self.is_constructible(),
            methods,
            properties,
        }
    }
}

/// Serializable description of a class binding
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClassDescriptor {
    pub name: String,
    pub constructible: bool,
    pub methods: Vec<MethodDescriptor>,
    pub properties: Vec<PropertyDescriptor>,
}

/// Serializable description of a bound method
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: String,
    pub mutates: bool,
}

/// Serializable description of a bound property
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub readable: bool,
    pub writable: bool,
}

/// Typed builder for a `ClassBinding`
///
/// The const/mut split mirrors receiver mutability: `method` takes `&T`,
/// `method_mut` takes `&mut T`. The `_raw` variants receive the registry and
/// the receiver handle instead, for methods that mint or return handles.
pub struct ClassBuilder<T: NativeObject> {
    name: &'static str,
    constructor: Option<ConstructorFn>,
    methods: HashMap<&'static str, MethodBinding>,
    properties: HashMap<&'static str, PropertyBinding>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: NativeObject> ClassBuilder<T> {
    /// Start a binding for class `name`
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            constructor: None,
            methods: HashMap::default(),
            properties: HashMap::default(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Declare the constructor. Constructed objects are registered mutable.
    pub fn constructor(mut self, f: impl Fn(&[Value]) -> Result<T> + 'static) -> Self {
        self.constructor = Some(Rc::new(move |registry, args| {
            let object = f(args)?;
            Ok(registry.register(object, Access::Mutable))
        }));
        self
    }

    /// Declare a const method over `&T`
    pub fn method(
        mut self,
        name: &'static str,
        f: impl Fn(&T, &[Value]) -> Result<Value> + 'static,
    ) -> Self {
        self.methods.insert(
            name,
            MethodBinding {
                mutates: false,
                func: Rc::new(move |registry, handle, args| {
                    let cell = registry.resolve_as::<T>(handle)?;
                    let object = cell.borrow();
                    f(&object, args)
                }),
            },
        );
        self
    }

    /// Declare a mutating method over `&mut T`
    pub fn method_mut(
        mut self,
        name: &'static str,
        f: impl Fn(&mut T, &[Value]) -> Result<Value> + 'static,
    ) -> Self {
        self.methods.insert(
            name,
            MethodBinding {
                mutates: true,
                func: Rc::new(move |registry, handle, args| {
                    let cell = registry.resolve_as::<T>(handle)?;
                    let mut object = cell.borrow_mut();
                    f(&mut object, args)
                }),
            },
        );
        self
    }

    /// Declare a const method with registry access
    pub fn method_raw(
        mut self,
        name: &'static str,
        f: impl Fn(&mut HandleRegistry, &Handle, &[Value]) -> Result<Value> + 'static,
    ) -> Self {
        self.methods.insert(
            name,
            MethodBinding {
                mutates: false,
                func: Rc::new(f),
            },
        );
        self
    }

    /// Declare a mutating method with registry access
    pub fn method_mut_raw(
        mut self,
        name: &'static str,
        f: impl Fn(&mut HandleRegistry, &Handle, &[Value]) -> Result<Value> + 'static,
    ) -> Self {
        self.methods.insert(
            name,
            MethodBinding {
                mutates: true,
                func: Rc::new(f),
            },
        );
        self
    }

    /// Declare a read-write property
    pub fn property(
        mut self,
        name: &'static str,
        get: impl Fn(&T) -> Value + 'static,
        set: impl Fn(&mut T, &Value) -> Result<()> + 'static,
    ) -> Self {
        self.properties.insert(
            name,
            PropertyBinding {
                getter: Rc::new(move |registry, handle| {
                    let cell = registry.resolve_as::<T>(handle)?;
                    let object = cell.borrow();
                    Ok(get(&object))
                }),
                setter: Some(Rc::new(move |registry, handle, value| {
                    let cell = registry.resolve_as::<T>(handle)?;
                    let mut object = cell.borrow_mut();
                    set(&mut object, value)
                })),
            },
        );
        self
    }

    /// Declare a read-only property
    pub fn property_readonly(
        mut self,
        name: &'static str,
        get: impl Fn(&T) -> Value + 'static,
    ) -> Self {
        self.properties.insert(
            name,
            PropertyBinding {
                getter: Rc::new(move |registry, handle| {
                    let cell = registry.resolve_as::<T>(handle)?;
                    let object = cell.borrow();
                    Ok(get(&object))
                }),
                setter: None,
            },
        );
        self
    }

    /// Finish the binding
    pub fn finish(self) -> ClassBinding {
        ClassBinding {
            name: self.name,
            constructor: self.constructor,
            methods: self.methods,
            properties: self.properties,
        }
    }
}

/// The binding table: classes plus injected free functions
#[derive(Default)]
pub struct BindingTable {
    classes: HashMap<&'static str, ClassBinding>,
    functions: HashMap<String, FreeFn>,
}

impl BindingTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class binding. Redefinition is refused: bindings are
    /// immutable once declared.
    pub fn register_class(&mut self, binding: ClassBinding) -> Result<()> {
        if self.classes.contains_key(binding.name) {
            return Err(Error::InternalError(format!(
                "class '{}' is already registered",
                binding.name
            )));
        }
        self.classes.insert(binding.name, binding);
        Ok(())
    }

    /// Inject a free function callable from script
    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> Result<Value> + 'static,
    ) {
        self.functions.insert(name.into(), Rc::new(f));
    }

    /// Look up a class binding
    pub fn class(&self, name: &str) -> Option<&ClassBinding> {
        self.classes.get(name)
    }

    /// Look up a free function
    pub fn function(&self, name: &str) -> Option<&FreeFn> {
        self.functions.get(name)
    }

    /// Describe a class for host-side introspection
    pub fn describe(&self, name: &str) -> Option<ClassDescriptor> {
        self.classes.get(name).map(|c| c.describe())
    }

    /// Names of all registered classes, sorted
    pub fn class_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.classes.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
