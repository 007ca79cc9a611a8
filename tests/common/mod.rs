//! Shared test helpers for integration tests
//!
//! Builds a host whose surface mirrors the demo catalog: a `sentinel` class
//! (accumulating string value, read-only instance number, owned child with
//! mutable and const accessors), injected `print`/`add` functions, and a
//! `magic` global. `print` writes into a shared buffer so tests can assert
//! on script output.

use amalgam::{
    Access, ClassBinding, ClassBuilder, Error, Expected, Handle, HandleRegistry, Host, HostValue,
    NativeObject, Value,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static SENTINEL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// The classic demo object
pub struct Sentinel {
    pub value: String,
    pub instance: u64,
    pub child: Option<Handle>,
}

impl Sentinel {
    pub fn new() -> Self {
        Self {
            value: String::new(),
            instance: SENTINEL_COUNTER.fetch_add(1, Ordering::Relaxed) + 1,
            child: None,
        }
    }
}

impl NativeObject for Sentinel {
    fn class_name(&self) -> &'static str {
        "sentinel"
    }
}

fn child_of(registry: &HandleRegistry, handle: &Handle) -> Result<Option<Handle>, Error> {
    Ok(registry.resolve_as::<Sentinel>(handle)?.borrow().child)
}

/// The sentinel class binding
pub fn sentinel_binding() -> ClassBinding {
    ClassBuilder::<Sentinel>::new("sentinel")
        .constructor(|_args| Ok(Sentinel::new()))
        .method_mut("foo", |s, args| {
            let text = args.first().map(|v| v.to_display()).unwrap_or_default();
            s.value.push_str(&text);
            Ok(Value::Undefined)
        })
        .method("bar", |s, _args| Ok(Value::String(s.value.clone())))
        .method("has_child", |s, _args| Ok(Value::Boolean(s.child.is_some())))
        .method_mut_raw("create_child", |registry, this, _args| {
            let cell = registry.resolve_as::<Sentinel>(this)?;
            let old = cell.borrow_mut().child.take();
            if let Some(old) = old {
                registry.destroy(&old)?;
            }
            let child = registry.register(Sentinel::new(), Access::Mutable);
            registry.adopt(this, &child)?;
            cell.borrow_mut().child = Some(child);
            Ok(Value::Native(child))
        })
        .method_mut_raw("get_child", |registry, this, _args| {
            match child_of(registry, this)? {
                Some(child) => Ok(Value::Native(child)),
                None => Err(Error::native_invocation("sentinel has no child")),
            }
        })
        .method_raw("get_child_const", |registry, this, _args| {
            match child_of(registry, this)? {
                Some(child) => Ok(Value::Native(child.as_const())),
                None => Err(Error::native_invocation("sentinel has no child")),
            }
        })
        .property(
            "value_",
            |s| Value::String(s.value.clone()),
            |s, v| {
                s.value = v.to_display();
                Ok(())
            },
        )
        .property_readonly("instance_", |s| Value::Number(s.instance as f64))
        .finish()
}

/// A host plus the buffer `print` writes into
pub struct TestHost {
    pub host: Host,
    pub output: Rc<RefCell<String>>,
}

impl TestHost {
    /// Everything `print` has written so far
    #[allow(dead_code)]
    pub fn printed(&self) -> String {
        self.output.borrow().clone()
    }
}

/// Build a host with the demo surface
pub fn demo_host() -> TestHost {
    let mut host = Host::new();
    host.register_class(sentinel_binding())
        .expect("fresh host has no bindings yet");

    let output = Rc::new(RefCell::new(String::new()));
    let sink = Rc::clone(&output);
    host.register_function("print", move |args| {
        let text = args.first().map(|v| v.to_display()).unwrap_or_default();
        sink.borrow_mut().push_str(&text);
        Ok(Value::Undefined)
    });

    host.register_function("add", |args| {
        let a = amalgam::marshal::to_native(
            args.first().unwrap_or(&Value::Undefined),
            Expected::Number,
        )?;
        let b = amalgam::marshal::to_native(args.get(1).unwrap_or(&Value::Undefined), Expected::Number)?;
        match (a, b) {
            (HostValue::Number(a), HostValue::Number(b)) => Ok(Value::Number(a + b)),
            _ => Err(Error::native_invocation("add expects two numbers")),
        }
    });

    host.set_global("magic", HostValue::Number(13.37));

    TestHost { host, output }
}

/// Run a script against a fresh demo host
#[allow(dead_code)]
pub fn run_script(source: &str) -> amalgam::Result<Value> {
    demo_host().host.run(source)
}

/// Run a script and get the string representation of the result
#[allow(dead_code)]
pub fn run_script_string(source: &str) -> String {
    run_script(source)
        .map(|v| v.to_string())
        .unwrap_or_else(|e| format!("Error: {}", e))
}
