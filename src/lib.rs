//! # AutoWirer - Constructor-Driven Dependency Wiring
//!
//! A singleton wirer that takes type declarations, resolves their
//! dependency graphs depth-first, builds every type at most once, and tears
//! everything down again in reverse construction order.
//!
//! ## Features
//!
//! - 🔌 **Single-constructor wiring** - Register by type ([`Autowire`]) or with an explicit [`Constructor`]
//! - 🧭 **Interface keys** - Expose singletons as `dyn Trait` and depend on the trait
//! - 🔁 **Cycle and ambiguity detection** - Circular graphs and multiple candidates are errors, never guesses
//! - 👂 **Instantiation listeners** - React to new or pre-built instances, with their own dependencies
//! - ♻️ **Ordered lifecycle** - Initialize in construction order, clean up in reverse, aggregate teardown errors
//! - 📊 **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use autowirer::{AutoWirer, Cleanable, Constructor, BoxError};
//! use std::sync::Arc;
//!
//! struct Config {
//!     url: String,
//! }
//!
//! struct Database {
//!     config: Arc<Config>,
//! }
//!
//! impl Cleanable for Database {
//!     fn cleanup(&self) -> Result<(), BoxError> {
//!         // close connections to self.config.url
//!         Ok(())
//!     }
//! }
//!
//! let wirer = AutoWirer::new();
//!
//! wirer
//!     .add_singleton_with(
//!         Constructor::new(|args| Ok(Database { config: args.get(0)? }))
//!             .depends_on::<Config>()
//!             .cleanable(),
//!     )
//!     .add_singleton_with(Constructor::new(|_| Ok(Config { url: "postgres://localhost".into() })))
//!     .wire_with(|wirer| {
//!         let db = wirer.find_instance::<Database>().unwrap().unwrap();
//!         assert_eq!(db.config.url, "postgres://localhost");
//!     });
//!
//! // Database is torn down before Config
//! wirer.cleanup().unwrap();
//! ```
//!
//! ## Interfaces
//!
//! ```rust
//! use autowirer::{AutoWirer, Constructor};
//! use std::sync::Arc;
//!
//! trait Store: Send + Sync {
//!     fn name(&self) -> &'static str;
//! }
//!
//! struct MemoryStore;
//!
//! impl Store for MemoryStore {
//!     fn name(&self) -> &'static str { "memory" }
//! }
//!
//! struct Cache {
//!     store: Arc<dyn Store>,
//! }
//!
//! let wirer = AutoWirer::new();
//! wirer
//!     .add_singleton_with(
//!         Constructor::new(|_| Ok(MemoryStore))
//!             .exposes::<dyn Store>(|s: Arc<MemoryStore>| -> Arc<dyn Store> { s }),
//!     )
//!     .add_singleton_with(
//!         Constructor::new(|args| Ok(Cache { store: args.get(0)? })).depends_on::<dyn Store>(),
//!     );
//!
//! wirer.try_wire().unwrap();
//! let cache = wirer.find_instance::<Cache>().unwrap().unwrap();
//! assert_eq!(cache.store.name(), "memory");
//! ```
//!
//! ## Error Handling
//!
//! Resolution problems abort wiring at the first failure. [`AutoWirer::try_wire`]
//! returns it; [`AutoWirer::wire`] routes it to the handler installed with
//! [`AutoWirer::on_exception`] (or logs it). Teardown never stops early:
//! [`AutoWirer::cleanup`] runs every hook and reports all failures as one
//! [`CleanupError`].

mod container;
mod error;
mod factory;
mod lifecycle;
mod listener;
#[cfg(feature = "logging")]
pub mod logging;
mod provider;
mod resolver;
mod storage;

pub use container::*;
pub use error::*;
pub use factory::{Arguments, Autowire, Constructor, ConstructorInfo, Existing};
pub use lifecycle::{Cleanable, Initializable};
pub use listener::InstantiationListener;
pub use provider::*;
pub use storage::SingletonRecord;

#[cfg(feature = "derive")]
pub use autowirer_derive::Autowire;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Arguments, AutoWirer, Autowire, BoxError, Cleanable, Constructor, DiError, Existing,
        Initializable, Injectable, Instance, Result, TypeKey, WirerHandle,
    };
    pub use std::sync::Arc;
}
