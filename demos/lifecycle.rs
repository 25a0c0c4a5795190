//! Wiring a small service graph with lifecycle hooks and listeners
//!
//! Run with:
//!   cargo run --example lifecycle --features logging-pretty

use autowirer::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

struct Settings {
    database_url: String,
}

struct Database {
    settings: Arc<Settings>,
    connected: AtomicBool,
}

impl Initializable for Database {
    fn initialize(&self) -> std::result::Result<(), BoxError> {
        println!("  connecting to {}", self.settings.database_url);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl Cleanable for Database {
    fn cleanup(&self) -> std::result::Result<(), BoxError> {
        println!("  closing database connection");
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

trait Handler: Send + Sync {
    fn route(&self) -> &'static str;
}

struct UserHandler {
    database: Arc<Database>,
}

impl Handler for UserHandler {
    fn route(&self) -> &'static str {
        "/users"
    }
}

struct Router {
    routes: parking_lot::Mutex<Vec<&'static str>>,
}

fn main() {
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    autowirer::logging::builder().wirer_only().init();

    let wirer = AutoWirer::builder()
        .on_exception(|err: DiError| eprintln!("wiring failed: {err}"))
        .build();

    wirer
        .add_existing_singleton(Settings {
            database_url: "postgres://localhost/app".into(),
        })
        .add_singleton_with(
            Constructor::new(|args| {
                Ok(UserHandler {
                    database: args.get(0)?,
                })
            })
            .depends_on::<Database>()
            .exposes::<dyn Handler>(|h: Arc<UserHandler>| -> Arc<dyn Handler> { h }),
        )
        .add_singleton_with(
            Constructor::new(|args| {
                Ok(Database {
                    settings: args.get(0)?,
                    connected: AtomicBool::new(false),
                })
            })
            .depends_on::<Settings>()
            .initializable()
            .cleanable(),
        )
        .add_singleton_with(Constructor::new(|_| {
            Ok(Router {
                routes: parking_lot::Mutex::new(Vec::new()),
            })
        }))
        // every handler registers itself with the router as it is built
        .add_instantiation_listener(
            |handler: Arc<dyn Handler>, args: &Arguments| {
                args.get::<Router>(0)?.routes.lock().push(handler.route());
                Ok(())
            },
            &[TypeKey::of::<Router>()],
        );

    println!("Wiring:");
    wirer.wire_with(|wirer| {
        let handler = wirer.find_instance::<UserHandler>().unwrap().unwrap();
        let router = wirer.find_instance::<Router>().unwrap().unwrap();
        println!("  routes: {:?}", router.routes.lock());
        println!(
            "  database connected: {}",
            handler.database.connected.load(Ordering::SeqCst)
        );
        println!("  singletons: {}", wirer.instances_count());
    });

    println!("Cleanup:");
    if let Err(err) = wirer.cleanup() {
        eprintln!("cleanup failed: {err}");
    }
    println!("  singletons left: {}", wirer.instances_count());
}
