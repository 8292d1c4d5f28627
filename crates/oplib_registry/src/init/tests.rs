use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use oplib_core::args;
use pretty_assertions::assert_eq;

static RUNS: AtomicUsize = AtomicUsize::new(0);

crate::library!(COUNTED, init_tests_counted, |m| {
    RUNS.fetch_add(1, Ordering::SeqCst);
    m.def_fn("one() -> int", || 1_i64);
});

crate::library_impl!(CUDA_ONLY, init_tests_apply, Cuda, |m| {
    m.impl_fn("twice", |x: i64| x * 2);
});

crate::library_fragment!(pub(crate) FRAGMENT, init_tests_fragment, |m| {
    m.def("declared(int x) -> int");
});

#[test]
fn run_executes_once() {
    assert_eq!(COUNTED.run(), Ok(()));
    assert!(COUNTED.has_run());
    assert_eq!(COUNTED.run(), Ok(()));
    assert_eq!(RUNS.load(Ordering::SeqCst), 1);

    assert!(Registries::global()
        .operators()
        .contains("init_tests_counted::one"));
}

#[test]
fn macros_record_metadata() {
    assert_eq!(CUDA_ONLY.kind(), LibraryKind::Impl);
    assert_eq!(CUDA_ONLY.namespace(), "init_tests_apply");
    assert_eq!(CUDA_ONLY.dispatch_key(), Some(DispatchKey::Cuda));
    assert!(CUDA_ONLY.location().file.ends_with("tests.rs"));

    assert_eq!(FRAGMENT.kind(), LibraryKind::Fragment);
    assert_eq!(FRAGMENT.dispatch_key(), None);
}

#[test]
fn apply_targets_given_registries() {
    let registries = Registries::default();
    CUDA_ONLY.apply(&registries).unwrap();
    FRAGMENT.apply(&registries).unwrap();
    assert!(!CUDA_ONLY.has_run());

    let result = registries
        .execute_operator_with_args("init_tests_apply::twice", DispatchKey::Cuda, &args![4])
        .unwrap();
    assert_eq!(result.get::<i64>().unwrap(), 8);

    let operators = registries.operators();
    let declared = operators.find_operator("init_tests_fragment::declared").unwrap();
    assert_eq!(declared.schema(), Some("declared(int x) -> int"));
}

#[test]
fn apply_reports_first_failure() {
    let registries = Registries::default();
    registries.seal();
    let err = FRAGMENT.apply(&registries).unwrap_err();
    assert!(matches!(err.kind, oplib_core::CallErrorKind::Sealed { .. }));
}
