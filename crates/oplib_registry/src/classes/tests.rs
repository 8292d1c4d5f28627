use super::*;
use oplib_core::{args, CallErrorKind, Obj};
use pretty_assertions::assert_eq;

#[derive(Debug, Default)]
struct Counter {
    count: i64,
}

impl From<i64> for Counter {
    fn from(count: i64) -> Self {
        Counter { count }
    }
}

impl Counter {
    fn get(&self) -> i64 {
        self.count
    }

    fn increment(&mut self) {
        self.count += 1;
    }
}

fn counter_registry() -> ClassRegistry {
    let mut registry = ClassRegistry::new();
    let name = registry.register_class("ns", "Counter").unwrap();
    registry
        .register_constructor(&name, Invokable::constructor::<Counter, ()>())
        .unwrap();
    registry
        .register_constructor(&name, Invokable::constructor::<Counter, (i64,)>())
        .unwrap();
    registry
        .register_method(&name, "get", Invokable::method::<Counter, _, _>(Counter::get))
        .unwrap();
    registry
        .register_method(&name, "increment", Invokable::method::<Counter, _, _>(Counter::increment))
        .unwrap();
    registry
        .register_static_method(&name, "zero", Invokable::new(|| 0_i64))
        .unwrap();
    registry
}

#[test]
fn qualified_name_is_namespace_and_class() {
    let mut registry = ClassRegistry::new();
    assert_eq!(registry.register_class("ns", "Counter").unwrap(), "ns::Counter");
    let class = registry.class("ns::Counter").unwrap();
    assert_eq!(class.namespace(), "ns");
    assert_eq!(class.class_name(), "Counter");
    assert_eq!(class.qualified_name(), "ns::Counter");
}

#[test]
fn constructors_by_trial() {
    let registry = counter_registry();

    let zero = registry.call_constructor_with_args("ns::Counter", &args![]).unwrap();
    let zero = zero.get::<Obj<Counter>>().unwrap();
    assert_eq!(zero.read().count, 0);

    let seven = registry.call_constructor_with_args("ns::Counter", &args![7]).unwrap();
    assert_eq!(seven.get::<Obj<Counter>>().unwrap().read().count, 7);

    let err = registry
        .call_constructor_with_args("ns::Counter", &args!["x", "y"])
        .unwrap_err();
    assert_eq!(
        err.kind,
        CallErrorKind::NoMatchingOverload {
            class: "ns::Counter".to_string(),
            candidates: 2,
        }
    );
}

#[test]
fn class_without_constructors_is_not_found() {
    let mut registry = ClassRegistry::new();
    registry.register_class("ns", "Empty").unwrap();
    let err = registry.call_constructor_with_args("ns::Empty", &args![]).unwrap_err();
    assert_eq!(
        err.kind,
        CallErrorKind::NotFound {
            entity: Entity::Constructor,
            name: "ns::Empty".to_string(),
        }
    );
}

#[test]
fn unknown_class_is_not_found() {
    let mut registry = ClassRegistry::new();
    let err = registry.call_constructor_with_args("ns::Nope", &args![]).unwrap_err();
    assert!(matches!(err.kind, CallErrorKind::NotFound { entity: Entity::Class, .. }));

    let err = registry
        .register_constructor("ns::Nope", Invokable::constructor::<Counter, ()>())
        .unwrap_err();
    assert!(matches!(err.kind, CallErrorKind::NotFound { entity: Entity::Class, .. }));
    assert!(registry
        .register_method("ns::Nope", "get", Invokable::unbound())
        .is_err());
    assert!(registry
        .register_static_method("ns::Nope", "make", Invokable::unbound())
        .is_err());
}

#[test]
fn methods_share_the_instance() {
    let registry = counter_registry();
    let instance = registry
        .call_constructor_with_args("ns::Counter", &args![1])
        .unwrap()
        .into_value();

    registry
        .call_method_on("ns::Counter", "increment", &instance, &args![])
        .unwrap();
    let result = registry
        .call_method_with_args("ns::Counter", "get", &args![instance])
        .unwrap();
    assert_eq!(result.get::<i64>().unwrap(), 2);
}

#[test]
fn missing_method_is_method_not_found() {
    let registry = counter_registry();
    let err = registry
        .call_method_with_args("ns::Counter", "reset", &args![])
        .unwrap_err();
    assert_eq!(
        err.kind,
        CallErrorKind::MethodNotFound {
            class: "ns::Counter".to_string(),
            method: "reset".to_string(),
            is_static: false,
        }
    );

    let err = registry
        .call_static_method_with_args("ns::Counter", "get", &args![])
        .unwrap_err();
    assert!(matches!(err.kind, CallErrorKind::MethodNotFound { is_static: true, .. }));
}

#[test]
fn static_methods_take_no_receiver() {
    let registry = counter_registry();
    let result = registry
        .call_static_method_with_args("ns::Counter", "zero", &args![])
        .unwrap();
    assert_eq!(result.get::<i64>().unwrap(), 0);
}

#[test]
fn methods_are_overwritten_by_name() {
    let mut registry = counter_registry();
    registry
        .register_method("ns::Counter", "get", Invokable::method::<Counter, _, _>(|_: &Counter| -1_i64))
        .unwrap();
    let instance = Value::object(Counter { count: 3 });
    let result = registry
        .call_method_on("ns::Counter", "get", &instance, &args![])
        .unwrap();
    assert_eq!(result.get::<i64>().unwrap(), -1);
}

#[test]
fn duplicate_class_is_rejected_by_default() {
    let mut registry = counter_registry();
    let err = registry.register_class("ns", "Counter").unwrap_err();
    assert_eq!(
        err.kind,
        CallErrorKind::DuplicateClass {
            name: "ns::Counter".to_string()
        }
    );
    assert_eq!(registry.class("ns::Counter").map(ClassRegistration::constructor_count), Some(2));
}

#[test]
fn merge_keeps_members() {
    let mut registry = ClassRegistry::with_redefinition(ClassRedefinition::Merge);
    registry.register_class("ns", "Counter").unwrap();
    registry
        .register_method("ns::Counter", "get", Invokable::method::<Counter, _, _>(Counter::get))
        .unwrap();
    registry.register_class("ns", "Counter").unwrap();
    assert!(registry.has_method("ns::Counter", "get"));
}

#[test]
fn replace_discards_members() {
    let mut registry = ClassRegistry::with_redefinition(ClassRedefinition::Replace);
    registry.register_class("ns", "Counter").unwrap();
    registry
        .register_method("ns::Counter", "get", Invokable::method::<Counter, _, _>(Counter::get))
        .unwrap();
    registry.register_class("ns", "Counter").unwrap();
    assert!(registry.has_class("ns::Counter"));
    assert!(!registry.has_method("ns::Counter", "get"));
}

#[test]
fn introspection() {
    let mut registry = counter_registry();
    registry.register_class("aux", "Empty").unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.class_names(), vec!["aux::Empty", "ns::Counter"]);
    assert!(registry.has_method("ns::Counter", "increment"));
    assert!(!registry.has_method("ns::Counter", "zero"));
    assert!(registry.has_static_method("ns::Counter", "zero"));
    assert!(!registry.has_static_method("aux::Missing", "zero"));

    let class = registry.class("ns::Counter").unwrap();
    assert_eq!(class.method_names(), vec!["get", "increment"]);
    assert_eq!(class.static_method_names(), vec!["zero"]);
    assert_eq!(class.constructors().count(), 2);
}

#[test]
fn describe_lists_members() {
    let registry = counter_registry();
    assert_eq!(
        registry.describe(),
        "classes: 1\n  ns::Counter\n    init[0]: () -> Counter\n    init[1]: (i64) -> Counter\n    def get: (&Counter) -> i64\n    def increment: (&mut Counter) -> ()\n    static zero: () -> i64\n"
    );
}
