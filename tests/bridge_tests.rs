//! Bridge-law tests through the public embedding API
//!
//! These exercise the registry, binding table, dispatcher, and marshal from
//! the native side of the boundary, without going through script source.

mod common;

use amalgam::{Access, BridgeErrorKind, Error, HostValue, Value};
use common::{demo_host, sentinel_binding, Sentinel};
use pretty_assertions::assert_eq;

fn bridge_kind(err: &Error) -> Option<BridgeErrorKind> {
    match err {
        Error::Bridge { kind, .. } => Some(*kind),
        _ => None,
    }
}

#[test]
fn test_native_registration_and_invoke() {
    let mut fixture = demo_host();
    let handle = fixture.host.register_object(Sentinel::new(), Access::Mutable);

    fixture
        .host
        .invoke(&handle, "foo", &[HostValue::string("from native")])
        .unwrap();
    assert_eq!(
        fixture.host.invoke(&handle, "bar", &[]).unwrap(),
        HostValue::string("from native")
    );
}

#[test]
fn test_native_registered_object_visible_to_script() {
    let mut fixture = demo_host();
    let handle = fixture.host.register_object(Sentinel::new(), Access::Mutable);
    fixture.host.set_global_value("shared", Value::Native(handle));

    fixture.host.run("shared.foo('touched by script');").unwrap();

    assert_eq!(
        fixture.host.get_property(&handle, "value_").unwrap(),
        HostValue::string("touched by script")
    );
}

#[test]
fn test_const_registration_blocks_native_writes_too() {
    let mut fixture = demo_host();
    let handle = fixture.host.register_object(Sentinel::new(), Access::Const);

    // Reads pass
    assert!(fixture.host.get_property(&handle, "value_").is_ok());

    // Writes and mutating calls are refused with AccessViolation
    let err = fixture
        .host
        .set_property(&handle, "value_", HostValue::string("x"))
        .unwrap_err();
    assert_eq!(bridge_kind(&err), Some(BridgeErrorKind::AccessViolation));

    let err = fixture
        .host
        .invoke(&handle, "foo", &[HostValue::string("x")])
        .unwrap_err();
    assert_eq!(bridge_kind(&err), Some(BridgeErrorKind::AccessViolation));
}

#[test]
fn test_read_only_property_refuses_native_write() {
    let mut fixture = demo_host();
    let handle = fixture.host.register_object(Sentinel::new(), Access::Mutable);

    let err = fixture
        .host
        .set_property(&handle, "instance_", HostValue::Number(5.0))
        .unwrap_err();
    assert_eq!(bridge_kind(&err), Some(BridgeErrorKind::AccessViolation));

    // Reading still works
    assert!(matches!(
        fixture.host.get_property(&handle, "instance_").unwrap(),
        HostValue::Number(_)
    ));
}

#[test]
fn test_same_identity_across_access_tags() {
    let mut fixture = demo_host();
    let mutable = fixture.host.register_object(Sentinel::new(), Access::Mutable);
    let aliased = fixture
        .host
        .registry()
        .alias(&mutable, Access::Const)
        .unwrap();

    assert!(mutable.same_identity(&aliased));
    assert_ne!(mutable.access(), aliased.access());

    // Write permission is handle-local, not object-global
    assert!(fixture
        .host
        .set_property(&mutable, "value_", HostValue::string("ok"))
        .is_ok());
    assert!(fixture
        .host
        .set_property(&aliased, "value_", HostValue::string("no"))
        .is_err());
}

#[test]
fn test_destroy_makes_all_handles_dangle() {
    let mut fixture = demo_host();
    let handle = fixture.host.register_object(Sentinel::new(), Access::Mutable);
    let alias = fixture.host.registry().alias(&handle, Access::Const).unwrap();

    fixture.host.destroy_object(&handle).unwrap();

    for h in [&handle, &alias] {
        let err = fixture.host.invoke(h, "bar", &[]).unwrap_err();
        assert_eq!(bridge_kind(&err), Some(BridgeErrorKind::DanglingHandle));
    }

    // Destroying again reports the dangle rather than panicking
    let err = fixture.host.destroy_object(&handle).unwrap_err();
    assert_eq!(bridge_kind(&err), Some(BridgeErrorKind::DanglingHandle));
}

#[test]
fn test_native_invocation_error_is_catchable_in_script() {
    // get_child without a child signals failure natively; script sees a
    // catchable NativeInvocationError
    let result = demo_host()
        .host
        .run(
            "
            var s = new sentinel();
            try { s.get_child(); } catch (e) { e.name }
        ",
        )
        .unwrap();
    assert_eq!(result, Value::String("NativeInvocationError".to_string()));
}

#[test]
fn test_script_throw_surfaces_to_native_as_script_error() {
    let mut fixture = demo_host();
    fixture
        .host
        .run("function explode() { throw 'kaboom'; }")
        .unwrap();

    let err = fixture.host.call_function("explode", &[]).unwrap_err();
    assert!(matches!(err, Error::ScriptError { .. }));
    assert_eq!(err.to_string(), "ScriptError: kaboom");
}

#[test]
fn test_call_function_marshals_arguments_both_ways() {
    let mut fixture = demo_host();
    fixture
        .host
        .run("function describe(m) { return `${m['label']}: ${m['score']}`; }")
        .unwrap();

    let mut map = std::collections::HashMap::new();
    map.insert("label".to_string(), HostValue::string("tests"));
    map.insert("score".to_string(), HostValue::Number(100.0));

    let result = fixture
        .host
        .call_function("describe", &[HostValue::Map(map)])
        .unwrap();
    assert_eq!(result, HostValue::string("tests: 100"));
}

#[test]
fn test_script_function_cannot_cross_as_data() {
    let mut fixture = demo_host();
    fixture.host.run("function leak() { return leak; }").unwrap();

    let err = fixture.host.call_function("leak", &[]).unwrap_err();
    assert_eq!(bridge_kind(&err), Some(BridgeErrorKind::UnmarshalableType));

    // The raw-value variant hands it over untouched instead
    let value = fixture.host.call_function_value("leak", &[]).unwrap();
    assert!(matches!(value, Value::Function(_)));
}

#[test]
fn test_describe_sentinel_binding() {
    let fixture = demo_host();
    let descriptor = fixture.host.describe("sentinel").unwrap();

    assert!(descriptor.constructible);

    let mutating: Vec<&str> = descriptor
        .methods
        .iter()
        .filter(|m| m.mutates)
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(mutating, vec!["create_child", "foo", "get_child"]);

    let value_prop = descriptor
        .properties
        .iter()
        .find(|p| p.name == "value_")
        .unwrap();
    assert!(value_prop.writable);
    let instance_prop = descriptor
        .properties
        .iter()
        .find(|p| p.name == "instance_")
        .unwrap();
    assert!(instance_prop.readable);
    assert!(!instance_prop.writable);
}

#[test]
fn test_duplicate_class_registration_is_refused() {
    let mut fixture = demo_host();
    let err = fixture.host.register_class(sentinel_binding()).unwrap_err();
    assert!(matches!(err, Error::InternalError(_)));
}

#[test]
fn test_registry_len_reflects_ownership_cascade() {
    let mut fixture = demo_host();
    fixture
        .host
        .run("var parent = new sentinel(); parent.create_child();")
        .unwrap();
    assert_eq!(fixture.host.registry().len(), 2);

    let parent = match fixture.host.get_global("parent") {
        Some(Value::Native(h)) => h,
        other => panic!("expected a handle, got {:?}", other),
    };
    fixture.host.destroy_object(&parent).unwrap();
    assert!(fixture.host.registry().is_empty());
}
