//! Registering types through `#[derive(Autowire)]`
//!
//! Run with:
//!   cargo run --example derive --features derive

use autowirer::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Autowire)]
struct Clock;

trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

#[derive(Autowire)]
#[autowire(initializable, cleanable)]
#[autowire(exposes(dyn Greeter))]
struct Service {
    clock: Arc<Clock>,
    #[autowire(default)]
    greeted: AtomicU64,
}

impl Greeter for Service {
    fn greet(&self, name: &str) -> String {
        self.greeted.fetch_add(1, Ordering::Relaxed);
        format!("hello, {name}")
    }
}

impl Initializable for Service {
    fn initialize(&self) -> std::result::Result<(), BoxError> {
        println!("service ready (clock at {:p})", Arc::as_ptr(&self.clock));
        Ok(())
    }
}

impl Cleanable for Service {
    fn cleanup(&self) -> std::result::Result<(), BoxError> {
        println!("greeted {} times", self.greeted.load(Ordering::Relaxed));
        Ok(())
    }
}

fn main() -> autowirer::Result<()> {
    let wirer = AutoWirer::new();
    wirer.add_singleton::<Service>()?.add_singleton::<Clock>()?;
    wirer.try_wire()?;

    let greeter = wirer.find_instance::<dyn Greeter>()?.ok_or_else(|| DiError::unknown("dyn Greeter"))?;
    println!("{}", greeter.greet("world"));

    wirer.cleanup()
}
