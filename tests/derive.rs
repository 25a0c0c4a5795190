//! `#[derive(Autowire)]` against the runtime

use autowirer::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

#[derive(Autowire)]
struct Settings;

trait Transport: Send + Sync {
    fn name(&self) -> &'static str;
}

#[derive(Autowire)]
#[autowire(exposes(dyn Transport))]
struct Tcp {
    _settings: Arc<Settings>,
}

impl Transport for Tcp {
    fn name(&self) -> &'static str {
        "tcp"
    }
}

#[derive(Autowire)]
#[autowire(initializable, cleanable)]
struct Client {
    transport: Arc<dyn Transport>,
    settings: Arc<Settings>,
    #[autowire(default)]
    ready: AtomicBool,
    #[autowire(default)]
    closed: AtomicU32,
}

impl Initializable for Client {
    fn initialize(&self) -> std::result::Result<(), BoxError> {
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl Cleanable for Client {
    fn cleanup(&self) -> std::result::Result<(), BoxError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_derived_constructor_shape() {
    let constructors = Client::constructors();
    assert_eq!(constructors.len(), 1);
    assert_eq!(
        constructors[0].dependencies(),
        &[TypeKey::of::<dyn Transport>(), TypeKey::of::<Settings>()]
    );

    assert!(Settings::constructors()[0].dependencies().is_empty());
}

#[test]
fn test_derived_types_wire() {
    let wirer = AutoWirer::new();
    wirer
        .add_singleton::<Client>()
        .unwrap()
        .add_singleton::<Tcp>()
        .unwrap()
        .add_singleton::<Settings>()
        .unwrap();

    wirer.try_wire().unwrap();

    let client = wirer.find_instance::<Client>().unwrap().unwrap();
    let settings = wirer.find_instance::<Settings>().unwrap().unwrap();
    assert_eq!(client.transport.name(), "tcp");
    assert!(Arc::ptr_eq(&client.settings, &settings));
    assert!(client.ready.load(Ordering::SeqCst));

    wirer.cleanup().unwrap();
    assert_eq!(client.closed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_get_or_instantiate_derived() {
    let wirer = AutoWirer::new();
    let first = wirer.get_or_instantiate::<Settings>(true).unwrap();
    let second = wirer.get_or_instantiate::<Settings>(true).unwrap();
    let fresh = wirer.get_or_instantiate::<Settings>(false).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(!Arc::ptr_eq(&first, &fresh));
}
