use super::*;
use crate::ClassRegistration;
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

    fn add(&mut self, n: i64) {
        self.count += n;
    }
}

#[test]
fn operator_name_extraction() {
    assert_eq!(operator_name("add(int a, int b) -> int"), "add");
    assert_eq!(operator_name("add"), "add");
    assert_eq!(operator_name("relu (Tensor x)"), "relu");
    assert_eq!(operator_name("(x)"), "");
}

#[test]
fn def_registers_schema_only() {
    let registries = Registries::default();
    let mut lib = Library::new(&registries, LibraryKind::Def, "ns", None);
    lib.def("add(int a, int b) -> int");
    lib.finish().unwrap();

    let operators = registries.operators();
    let op = operators.find_operator("ns::add").unwrap();
    assert_eq!(op.schema(), Some("add(int a, int b) -> int"));
    assert!(op.keys().is_empty());
}

#[test]
fn def_fn_with_schema_registers_both() {
    let registries = Registries::default();
    let mut lib = Library::new(&registries, LibraryKind::Def, "ns", None);
    lib.def_fn("add(int a, int b) -> int", |a: i64, b: i64| a + b);
    lib.finish().unwrap();

    let operators = registries.operators();
    let op = operators.find_operator("ns::add").unwrap();
    assert_eq!(op.schema(), Some("add(int a, int b) -> int"));
    assert_eq!(op.keys(), vec![DispatchKey::Cpu]);
}

#[test]
fn def_fn_with_bare_name_registers_no_schema() {
    let registries = Registries::default();
    let mut lib = Library::new(&registries, LibraryKind::Fragment, "ns", None);
    lib.def_fn("neg", |x: i64| -x);
    lib.finish().unwrap();

    let operators = registries.operators();
    let op = operators.find_operator("ns::neg").unwrap();
    assert_eq!(op.schema(), None);
    assert!(op.has_implementation(DispatchKey::Cpu));
}

#[test]
fn impl_library_uses_its_key_and_ignores_def() {
    let registries = Registries::default();
    let mut lib = Library::new(&registries, LibraryKind::Impl, "ns", Some(DispatchKey::Cuda));
    lib.def("add(int a, int b) -> int")
        .impl_fn("add", |a: i64, b: i64| a + b + 100);
    lib.finish().unwrap();

    let operators = registries.operators();
    let op = operators.find_operator("ns::add").unwrap();
    assert_eq!(op.schema(), None);
    assert_eq!(op.keys(), vec![DispatchKey::Cuda]);
}

#[test]
fn class_builder_registers_members() {
    let registries = Registries::default();
    let mut lib = Library::new(&registries, LibraryKind::Def, "ns", None);
    lib.class::<Counter>("Counter")
        .def_init::<()>()
        .def_init::<(i64,)>()
        .def("get", Counter::get)
        .def("add", Counter::add)
        .def_static("origin", || 0_i64);
    lib.finish().unwrap();

    let instance = registries
        .call_constructor_with_args("ns::Counter", &args![5])
        .unwrap()
        .into_value();
    registries
        .call_method_on("ns::Counter", "add", &instance, &args![2])
        .unwrap();
    assert_eq!(instance.convert::<Obj<Counter>>().unwrap().read().count, 7);

    let classes = registries.classes();
    let class = classes.class("ns::Counter").unwrap();
    assert_eq!(class.constructor_count(), 2);
    assert_eq!(class.method_names(), vec!["add", "get"]);
    assert_eq!(class.static_method_names(), vec!["origin"]);
}

#[test]
fn builder_reports_qualified_name() {
    let registries = Registries::default();
    let mut lib = Library::new(&registries, LibraryKind::Def, "geo", None);
    let builder = lib.class::<Counter>("Point");
    assert_eq!(builder.qualified_name(), "geo::Point");
}

#[test]
fn duplicate_class_is_collected_and_members_skipped() {
    let registries = Registries::default();
    let mut first = Library::new(&registries, LibraryKind::Def, "ns", None);
    first.class::<Counter>("Counter").def_init::<()>();
    first.finish().unwrap();

    let mut second = Library::new(&registries, LibraryKind::Fragment, "ns", None);
    second.class::<Counter>("Counter").def_init::<(i64,)>();
    assert_eq!(second.errors().len(), 1);
    let err = second.finish().unwrap_err();
    assert!(matches!(err.kind, CallErrorKind::DuplicateClass { .. }));

    let classes = registries.classes();
    assert_eq!(classes.class("ns::Counter").map(ClassRegistration::constructor_count), Some(1));
}

#[test]
fn sealed_failures_are_collected_in_order() {
    let registries = Registries::default();
    registries.seal();
    let mut lib = Library::new(&registries, LibraryKind::Def, "ns", None);
    lib.def("first()").def_fn("second", || ());
    assert_eq!(lib.errors().len(), 2);

    let err = lib.finish().unwrap_err();
    assert_eq!(err.message, "registries are sealed, cannot register schema for ns::first");
}

#[test]
fn info_includes_key_and_location() {
    let registries = Registries::default();
    let lib = Library::new(&registries, LibraryKind::Impl, "ns", Some(DispatchKey::Cuda))
        .at("src/ops.rs", 12);
    assert_eq!(lib.info(), "library impl ns (CUDA) at src/ops.rs:12");
    assert_eq!(
        lib.location(),
        Some(SourceLocation {
            file: "src/ops.rs",
            line: 12
        })
    );

    let plain = Library::new(&registries, LibraryKind::Def, "ns", None);
    assert_eq!(plain.info(), "library def ns");
    assert_eq!(plain.dispatch_key(), None);
    assert_eq!(plain.namespace(), "ns");
    assert_eq!(plain.kind(), LibraryKind::Def);
}
