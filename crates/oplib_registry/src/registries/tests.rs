use std::sync::{Arc, OnceLock};

use super::*;
use oplib_core::{args, CallErrorKind, Obj};
use pretty_assertions::assert_eq;

fn assert_sealed<T: std::fmt::Debug>(result: Result<T, CallError>) {
    let err = result.unwrap_err();
    assert!(
        matches!(err.kind, CallErrorKind::Sealed { .. }),
        "expected Sealed, got {err}"
    );
}

#[test]
fn sealed_registries_reject_every_registration() {
    let registries = Registries::default();
    registries.register_class("ns", "Counter").unwrap();
    registries.seal();
    assert!(registries.is_sealed());

    assert_sealed(registries.register_schema("ns::add", "add(int a, int b) -> int"));
    assert_sealed(registries.register_implementation(
        "ns::add",
        DispatchKey::Cpu,
        Invokable::new(|a: i64, b: i64| a + b),
    ));
    assert_sealed(registries.register_class("ns", "Other"));
    assert_sealed(registries.register_constructor("ns::Counter", Invokable::unbound()));
    assert_sealed(registries.register_method("ns::Counter", "get", Invokable::unbound()));
    assert_sealed(registries.register_static_method("ns::Counter", "make", Invokable::unbound()));

    assert!(registries.operators().is_empty());
    assert_eq!(registries.classes().len(), 1);
}

#[test]
fn sealed_message_names_the_registration() {
    let registries = Registries::default();
    registries.seal();
    let err = registries.register_schema("ns::add", "add()").unwrap_err();
    assert_eq!(err.message, "registries are sealed, cannot register schema for ns::add");
}

#[test]
fn calls_work_after_sealing() {
    let registries = Registries::default();
    registries
        .register_implementation("ns::add", DispatchKey::Cpu, Invokable::new(|a: i64, b: i64| a + b))
        .unwrap();
    registries.seal();

    let result = registries
        .execute_operator_with_args("ns::add", DispatchKey::Cuda, &args![2, 3])
        .unwrap();
    assert_eq!(result.get::<i64>().unwrap(), 5);
}

#[test]
fn config_drives_class_redefinition() {
    let registries =
        Registries::new(RegistryConfig::default().with_class_redefinition(crate::ClassRedefinition::Merge));
    assert_eq!(
        registries.config().class_redefinition,
        crate::ClassRedefinition::Merge
    );
    registries.register_class("ns", "Counter").unwrap();
    assert!(registries.register_class("ns", "Counter").is_ok());

    let strict = Registries::default();
    strict.register_class("ns", "Counter").unwrap();
    assert!(strict.register_class("ns", "Counter").is_err());
}

#[test]
fn implementations_may_call_back_into_registries() {
    let registries: &'static Registries = Box::leak(Box::new(Registries::default()));
    registries
        .register_implementation("ns::double", DispatchKey::Cpu, Invokable::new(|x: i64| x * 2))
        .unwrap();
    registries
        .register_implementation(
            "ns::quadruple",
            DispatchKey::Cpu,
            Invokable::new(move |x: i64| -> Result<i64, CallError> {
                let twice = registries
                    .execute_operator_with_args("ns::double", DispatchKey::Cpu, &args![x])?
                    .get::<i64>()?;
                registries
                    .execute_operator_with_args("ns::double", DispatchKey::Cpu, &args![twice])?
                    .get::<i64>()
            }),
        )
        .unwrap();

    let result = registries
        .execute_operator_with_args("ns::quadruple", DispatchKey::Cpu, &args![3])
        .unwrap();
    assert_eq!(result.get::<i64>().unwrap(), 12);
}

#[test]
fn class_calls_through_registries() {
    #[derive(Default)]
    struct Flag {
        on: bool,
    }

    let registries = Registries::default();
    let name = registries.register_class("ns", "Flag").unwrap();
    registries
        .register_constructor(&name, Invokable::constructor::<Flag, ()>())
        .unwrap();
    registries
        .register_method(&name, "toggle", Invokable::method::<Flag, _, _>(|f: &mut Flag| {
            f.on = !f.on;
            f.on
        }))
        .unwrap();
    registries
        .register_static_method(&name, "describe", Invokable::new(|| "a flag"))
        .unwrap();

    let flag = registries
        .call_constructor_with_args("ns::Flag", &args![])
        .unwrap()
        .into_value();
    let on = registries
        .call_method_on("ns::Flag", "toggle", &flag, &args![])
        .unwrap();
    assert!(on.get::<bool>().unwrap());
    let off = registries
        .call_method_with_args("ns::Flag", "toggle", &args![flag])
        .unwrap();
    assert!(!off.get::<bool>().unwrap());

    let text = registries
        .call_static_method_with_args("ns::Flag", "describe", &args![])
        .unwrap();
    assert_eq!(text.get::<String>().unwrap(), "a flag");
}

#[test]
fn execute_without_args_through_registries() {
    let registries = Registries::default();
    registries
        .register_implementation("ns::ping", DispatchKey::Cpu, Invokable::new(|| ()))
        .unwrap();
    assert_eq!(registries.execute_operator("ns::ping", DispatchKey::Cuda), Ok(true));
    assert!(registries.execute_operator("ns::pong", DispatchKey::Cpu).is_err());
}

#[test]
fn describe_combines_both_reports() {
    let registries = Registries::default();
    registries.register_schema("ns::add", "add()").unwrap();
    registries.register_class("ns", "Counter").unwrap();
    registries.seal();
    assert_eq!(
        registries.describe(),
        "operators: 1\n  ns::add\n    schema: add()\nclasses: 1\n  ns::Counter\nsealed\n"
    );
}

#[test]
fn global_is_a_single_instance() {
    assert!(std::ptr::eq(Registries::global(), Registries::global()));
}

#[test]
fn registries_and_operator_registry_dispatch_alike() {
    fn failing(x: i64) -> Result<i64, String> {
        Err(format!("rejected {x}"))
    }

    let registries = Registries::default();
    let mut registry = OperatorRegistry::new();
    registries
        .register_implementation("ns::inc", DispatchKey::Cpu, Invokable::new(|x: i64| x + 1))
        .unwrap();
    registry.register_implementation("ns::inc", DispatchKey::Cpu, Invokable::new(|x: i64| x + 1));
    registries
        .register_implementation("ns::fail", DispatchKey::Cpu, Invokable::new(failing))
        .unwrap();
    registry.register_implementation("ns::fail", DispatchKey::Cpu, Invokable::new(failing));

    for key in DispatchKey::ALL {
        for name in ["ns::inc", "ns::fail", "ns::missing"] {
            assert_eq!(
                registries.execute_operator_with_args(name, key, &args![1]),
                registry.execute_operator_with_args(name, key, &args![1]),
                "{name} under {key}"
            );
            assert_eq!(
                registries.execute_operator(name, key),
                registry.execute_operator(name, key),
                "{name} under {key}"
            );
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    total: i64,
}

/// Registries with `ns::Tally`, whose `bump` and `peek` call `get` back
/// through the registries on the instance stored in the returned slot.
fn reentrant_tally() -> (&'static Registries, Arc<OnceLock<Value>>) {
    let registries: &'static Registries = Box::leak(Box::new(Registries::default()));
    let slot: Arc<OnceLock<Value>> = Arc::new(OnceLock::new());
    let name = registries.register_class("ns", "Tally").unwrap();
    registries
        .register_constructor(&name, Invokable::constructor::<Tally, ()>())
        .unwrap();
    registries
        .register_method(&name, "get", Invokable::method::<Tally, _, _>(|t: &Tally| t.total))
        .unwrap();

    let this = Arc::clone(&slot);
    registries
        .register_method(
            &name,
            "bump",
            Invokable::method::<Tally, _, _>(move |t: &mut Tally| -> Result<i64, CallError> {
                t.total += 1;
                let instance = this.get().ok_or_else(|| CallError::new("instance not set"))?;
                registries
                    .call_method_on("ns::Tally", "get", instance, &args![])?
                    .get::<i64>()
            }),
        )
        .unwrap();

    let this = Arc::clone(&slot);
    registries
        .register_method(
            &name,
            "peek",
            Invokable::method::<Tally, _, _>(move |t: &Tally| -> Result<i64, CallError> {
                let instance = this.get().ok_or_else(|| CallError::new("instance not set"))?;
                let seen = registries
                    .call_method_on("ns::Tally", "get", instance, &args![])?
                    .get::<i64>()?;
                Ok(seen + t.total)
            }),
        )
        .unwrap();

    let instance = registries
        .call_constructor_with_args("ns::Tally", &args![])
        .unwrap()
        .into_value();
    slot.set(instance).unwrap();
    (registries, slot)
}

#[test]
fn exclusive_method_reentering_its_instance_fails_fast() {
    let (registries, slot) = reentrant_tally();
    let instance = slot.get().unwrap();

    let err = registries
        .call_method_on("ns::Tally", "bump", instance, &args![])
        .unwrap_err();
    assert!(
        err.root()
            .message
            .contains("cannot borrow Tally: instance is mutably borrowed"),
        "{err}"
    );

    // The receiver lock is released after the failed call.
    let total = registries
        .call_method_on("ns::Tally", "get", instance, &args![])
        .unwrap();
    assert_eq!(total.get::<i64>().unwrap(), 1);
}

#[test]
fn shared_method_may_reenter_its_instance() {
    let (registries, slot) = reentrant_tally();
    let instance = slot.get().unwrap();
    instance.convert::<Obj<Tally>>().unwrap().write().total = 4;

    let result = registries
        .call_method_on("ns::Tally", "peek", instance, &args![])
        .unwrap();
    assert_eq!(result.get::<i64>().unwrap(), 8);
}

#[test]
fn receiver_passed_again_as_argument_fails_fast() {
    #[derive(Debug, Default)]
    struct Acc {
        total: i64,
    }

    let registries = Registries::default();
    let name = registries.register_class("ns", "Acc").unwrap();
    registries
        .register_constructor(&name, Invokable::constructor::<Acc, ()>())
        .unwrap();
    registries
        .register_method(
            &name,
            "absorb",
            Invokable::method::<Acc, _, _>(|acc: &mut Acc, other: Obj<Acc>| {
                acc.total += other.read().total;
            }),
        )
        .unwrap();

    let first = registries
        .call_constructor_with_args("ns::Acc", &args![])
        .unwrap()
        .into_value();
    let second = registries
        .call_constructor_with_args("ns::Acc", &args![])
        .unwrap()
        .into_value();
    second.convert::<Obj<Acc>>().unwrap().write().total = 3;

    registries
        .call_method_on("ns::Acc", "absorb", &first, &args![second])
        .unwrap();
    assert_eq!(first.convert::<Obj<Acc>>().unwrap().read().total, 3);

    let err = registries
        .call_method_on("ns::Acc", "absorb", &first, &args![first.clone()])
        .unwrap_err();
    assert_eq!(
        err.root_kind(),
        &CallErrorKind::ReceiverBorrowed {
            type_name: "Acc".into(),
            exclusive: true,
        }
    );
}
