//! The wirer: registration, bulk wiring and ordered teardown
//!
//! `AutoWirer` owns all state for one singleton scope. Registration calls
//! only record constructors; [`AutoWirer::wire`] builds everything,
//! notifies listeners for pre-built values and runs initialization hooks;
//! [`AutoWirer::cleanup`] tears singletons down in reverse construction
//! order.

use crate::factory::single_constructor;
use crate::lifecycle::{Cleanable, Initializable};
use crate::listener::InstantiationListener;
use crate::storage::{Registry, SingletonRecord};
use crate::{
    Arguments, Autowire, BoxError, CleanupError, Constructor, DiError, Existing, Injectable,
    Instance, Result, TeardownFailure, TypeKey,
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

#[cfg(feature = "logging")]
use tracing::{debug, error};

/// Receives the first fatal error of a wiring pass
pub type ExceptionHandler = Arc<dyn Fn(DiError) + Send + Sync>;

struct Inner {
    registry: Registry,
    exception_handler: Mutex<Option<ExceptionHandler>>,
}

/// Constructor-driven singleton wirer.
///
/// Cloning is cheap and yields another handle to the same state.
///
/// # Examples
///
/// ```rust
/// use autowirer::{AutoWirer, Constructor};
/// use std::sync::Arc;
///
/// struct Config { url: String }
/// struct Database { config: Arc<Config> }
///
/// let wirer = AutoWirer::new();
/// wirer
///     .add_singleton_with(
///         Constructor::new(|args| Ok(Database { config: args.get(0)? })).depends_on::<Config>(),
///     )
///     .add_singleton_with(Constructor::new(|_| Ok(Config { url: "postgres://localhost".into() })));
///
/// wirer.try_wire().unwrap();
///
/// let db = wirer.find_instance::<Database>().unwrap().unwrap();
/// assert_eq!(db.config.url, "postgres://localhost");
/// wirer.cleanup().unwrap();
/// ```
#[derive(Clone)]
pub struct AutoWirer {
    inner: Arc<Inner>,
}

impl AutoWirer {
    /// Create a wirer with default settings.
    #[inline]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a wirer.
    #[inline]
    pub fn builder() -> AutoWirerBuilder {
        AutoWirerBuilder::default()
    }

    fn from_builder(builder: AutoWirerBuilder) -> Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "autowirer",
            capacity = builder.capacity,
            retain_encountered = builder.retain_encountered,
            "Creating new AutoWirer"
        );

        let wirer = Self {
            inner: Arc::new(Inner {
                registry: Registry::new(builder.capacity, builder.retain_encountered),
                exception_handler: Mutex::new(builder.exception_handler),
            }),
        };

        // The wirer itself is always resolvable as a dependency
        wirer
            .inner
            .registry
            .push_singleton(Instance::new(Arc::new(wirer.handle())), None);

        wirer
    }

    /// A weak handle to this wirer, as injected into constructors that
    /// depend on [`WirerHandle`].
    #[inline]
    pub fn handle(&self) -> WirerHandle {
        WirerHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // =========================================================================
    // Registration Methods
    // =========================================================================

    /// Register `T` through its single constructor.
    ///
    /// Fails with [`DiError::InvalidConstructorShape`] unless
    /// [`Autowire::constructors`] yields exactly one constructor.
    pub fn add_singleton<T: Autowire>(&self) -> Result<&Self> {
        let info = single_constructor::<T>()?;
        self.register(info);
        Ok(self)
    }

    /// Register `T` with an explicit constructor.
    pub fn add_singleton_with<T: Injectable>(&self, constructor: Constructor<T>) -> &Self {
        self.register(constructor.into_info());
        self
    }

    fn register(&self, info: crate::ConstructorInfo) {
        #[cfg(feature = "logging")]
        debug!(
            target: "autowirer",
            service = info.produces().name(),
            dependencies = info.dependencies().len(),
            provides = info.provides().len(),
            external_cleanup = info.has_external_cleanup(),
            "Registering singleton constructor"
        );

        self.inner.registry.insert_constructor(info);
    }

    /// Add a pre-built singleton. It has no constructor, and listeners are
    /// not called for it. Its lifecycle hooks are not run either; declare
    /// them with [`add_existing_singleton_with`](Self::add_existing_singleton_with).
    pub fn add_existing_singleton<T: Injectable>(&self, value: T) -> &Self {
        self.add_existing_instance(Instance::new(Arc::new(value)), false)
    }

    /// Add a pre-built singleton together with the interfaces and lifecycle
    /// hooks declared on its [`Existing`] builder.
    ///
    /// ```rust
    /// use autowirer::{AutoWirer, BoxError, Cleanable, Existing};
    ///
    /// struct Pool;
    ///
    /// impl Cleanable for Pool {
    ///     fn cleanup(&self) -> Result<(), BoxError> {
    ///         Ok(())
    ///     }
    /// }
    ///
    /// let wirer = AutoWirer::new();
    /// wirer.add_existing_singleton_with(Existing::new(Pool).cleanable(), false);
    /// wirer.cleanup().unwrap();
    /// ```
    pub fn add_existing_singleton_with<T: Injectable>(
        &self,
        existing: Existing<T>,
        call_listeners: bool,
    ) -> &Self {
        self.add_existing_instance(existing.into_instance(), call_listeners)
    }

    /// Add a pre-built instance (possibly with extra views). With
    /// `call_listeners`, matching instantiation listeners fire for it during
    /// the next [`wire`](Self::wire).
    pub fn add_existing_instance(&self, instance: Instance, call_listeners: bool) -> &Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "autowirer",
            service = instance.type_name(),
            call_listeners = call_listeners,
            "Adding existing singleton"
        );

        if call_listeners {
            self.inner.registry.queue_for_listeners(instance.clone());
        }
        self.inner.registry.push_singleton(instance, None);
        self
    }

    /// Call `callback` for every instance viewable as `T`, with the
    /// listener's own `dependencies` resolved as singletons.
    ///
    /// ```rust
    /// use autowirer::{Arguments, AutoWirer, Constructor};
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    ///
    /// struct Plugin;
    ///
    /// let seen = Arc::new(AtomicUsize::new(0));
    /// let counter = Arc::clone(&seen);
    ///
    /// let wirer = AutoWirer::new();
    /// wirer
    ///     .add_instantiation_listener(
    ///         move |_plugin: Arc<Plugin>, _args: &Arguments| {
    ///             counter.fetch_add(1, Ordering::SeqCst);
    ///             Ok(())
    ///         },
    ///         &[],
    ///     )
    ///     .add_singleton_with(Constructor::new(|_| Ok(Plugin)))
    ///     .wire();
    ///
    /// assert_eq!(seen.load(Ordering::SeqCst), 1);
    /// ```
    pub fn add_instantiation_listener<T, F>(&self, callback: F, dependencies: &[TypeKey]) -> &Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>, &Arguments) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        let listener = InstantiationListener::new(callback, dependencies);

        #[cfg(feature = "logging")]
        debug!(
            target: "autowirer",
            trigger = listener.trigger().name(),
            dependencies = listener.dependencies().len(),
            "Registering instantiation listener"
        );

        self.inner.registry.add_listener(listener);
        self
    }

    /// Install the handler that receives wiring failures.
    pub fn on_exception<F>(&self, handler: F) -> &Self
    where
        F: Fn(DiError) + Send + Sync + 'static,
    {
        *self.inner.exception_handler.lock() = Some(Arc::new(handler));
        self
    }

    // =========================================================================
    // Wiring
    // =========================================================================

    /// Build every registered singleton, notify listeners about queued
    /// pre-built values, then initialize all singletons in construction
    /// order. Stops at the first failure and returns it.
    pub fn try_wire(&self) -> Result<()> {
        let registry = &self.inner.registry;
        let keys = registry.constructor_keys();

        #[cfg(feature = "logging")]
        debug!(
            target: "autowirer",
            constructors = keys.len(),
            existing = registry.singleton_count(),
            "Wiring singletons"
        );

        for key in keys {
            registry.resolve(key, None, true)?;
        }

        for existing in registry.queued_for_listeners() {
            registry.dispatch(&existing)?;
        }

        for record in registry.singletons() {
            let instance = record.instance();
            if let Some(initializable) = instance.get::<dyn Initializable>() {
                initializable
                    .initialize()
                    .map_err(|source| DiError::InitializationFailed {
                        type_name: instance.type_name(),
                        source,
                    })?;
            }
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "autowirer",
            singletons = registry.singleton_count(),
            "Wiring completed"
        );

        Ok(())
    }

    /// [`try_wire`](Self::try_wire), routing a failure to the exception
    /// handler (or the log, if none is installed).
    #[inline]
    pub fn wire(&self) -> &Self {
        self.wire_with(|_| {})
    }

    /// Like [`wire`](Self::wire), calling `on_success` if every step
    /// succeeded.
    pub fn wire_with<F>(&self, on_success: F) -> &Self
    where
        F: FnOnce(&AutoWirer),
    {
        match self.try_wire() {
            Ok(()) => on_success(self),
            Err(err) => self.report(err),
        }
        self
    }

    fn report(&self, err: DiError) {
        let handler = self.inner.exception_handler.lock().clone();
        match handler {
            Some(handler) => handler(err),
            None => {
                #[cfg(feature = "logging")]
                error!(
                    target: "autowirer",
                    error = %err,
                    details = ?err,
                    "Wiring failed and no exception handler is installed"
                );

                #[cfg(not(feature = "logging"))]
                eprintln!("autowirer: wiring failed: {err}");
            }
        }
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Tear down every singleton in reverse construction order.
    ///
    /// Each record is removed as it is visited. Its [`Cleanable::cleanup`]
    /// and its constructor's external cleanup both run even when earlier
    /// ones failed; all failures are reported together afterwards. Registered
    /// constructors are cleared at the end.
    pub fn cleanup(&self) -> Result<()> {
        let registry = &self.inner.registry;
        let mut failures = Vec::new();

        #[cfg(feature = "logging")]
        debug!(
            target: "autowirer",
            singletons = registry.singleton_count(),
            "Cleaning up singletons"
        );

        while let Some(record) = registry.pop_singleton() {
            let instance = record.instance();

            if let Some(cleanable) = instance.get::<dyn Cleanable>() {
                if let Err(source) = cleanable.cleanup() {
                    failures.push(TeardownFailure {
                        type_name: instance.type_name(),
                        source,
                    });
                }
            }

            if let Some(Err(source)) = record
                .constructor()
                .and_then(|constructor| constructor.external_cleanup(instance))
            {
                failures.push(TeardownFailure {
                    type_name: instance.type_name(),
                    source,
                });
            }
        }

        registry.clear_constructors();
        registry.forget_encountered();
        registry.clear_listener_queue();

        match CleanupError::from_failures(failures) {
            None => Ok(()),
            Some(err) => {
                #[cfg(feature = "logging")]
                debug!(
                    target: "autowirer",
                    failures = err.len(),
                    "Cleanup finished with failures"
                );
                Err(err.into())
            }
        }
    }

    // =========================================================================
    // Resolution Methods
    // =========================================================================

    /// Register `T` through its single constructor (replacing any previous
    /// registration) and resolve it.
    ///
    /// With `as_singleton`, an existing instance is reused and a new one is
    /// recorded; otherwise a fresh, unrecorded instance is built.
    pub fn get_or_instantiate<T: Autowire>(&self, as_singleton: bool) -> Result<Arc<T>> {
        self.add_singleton::<T>()?;
        self.resolve::<T>(as_singleton)
    }

    /// Resolve an already registered key without registering anything.
    ///
    /// Works for interface keys (`dyn Trait`) too.
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self, as_singleton: bool) -> Result<Arc<T>> {
        let instance = self
            .inner
            .registry
            .resolve(TypeKey::of::<T>(), None, as_singleton)?;
        downcast::<T>(&instance)
    }

    /// The unique existing singleton viewable as `T`, if any.
    ///
    /// Fails with [`DiError::AmbiguousInstance`] if more than one matches.
    pub fn find_instance<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>> {
        self.inner
            .registry
            .find_instance(TypeKey::of::<T>())?
            .map(|instance| downcast::<T>(&instance))
            .transpose()
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Number of live singletons, including the wirer's own handle.
    #[inline]
    pub fn instances_count(&self) -> usize {
        self.inner.registry.singleton_count()
    }

    /// Number of registered constructors.
    #[inline]
    pub fn registered_count(&self) -> usize {
        self.inner.registry.constructor_count()
    }

    /// Snapshot of the singleton records in construction order.
    pub fn singletons(&self) -> Vec<SingletonRecord> {
        self.inner.registry.singletons()
    }
}

fn downcast<T: ?Sized + Send + Sync + 'static>(instance: &Instance) -> Result<Arc<T>> {
    instance
        .get::<T>()
        .ok_or_else(|| DiError::unknown(std::any::type_name::<T>()))
}

impl Default for AutoWirer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AutoWirer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoWirer")
            .field("registered", &self.registered_count())
            .field("instances", &self.instances_count())
            .field("has_exception_handler", &self.inner.exception_handler.lock().is_some())
            .finish()
    }
}

/// Weak handle to an [`AutoWirer`], resolvable as a dependency.
///
/// ```rust
/// use autowirer::{AutoWirer, Constructor, WirerHandle};
/// use std::sync::Arc;
///
/// struct Registry { wirer: Arc<WirerHandle> }
///
/// let wirer = AutoWirer::new();
/// wirer
///     .add_singleton_with(
///         Constructor::new(|args| Ok(Registry { wirer: args.get(0)? })).depends_on::<WirerHandle>(),
///     )
///     .wire();
///
/// let registry = wirer.find_instance::<Registry>().unwrap().unwrap();
/// assert_eq!(registry.wirer.instances_count().unwrap(), 2);
/// ```
#[derive(Clone)]
pub struct WirerHandle {
    inner: Weak<Inner>,
}

impl WirerHandle {
    /// Get the wirer back, unless it was dropped.
    pub fn upgrade(&self) -> Result<AutoWirer> {
        self.inner
            .upgrade()
            .map(|inner| AutoWirer { inner })
            .ok_or(DiError::WirerDropped)
    }

    /// See [`AutoWirer::find_instance`].
    pub fn find_instance<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>> {
        self.upgrade()?.find_instance::<T>()
    }

    /// See [`AutoWirer::resolve`].
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self, as_singleton: bool) -> Result<Arc<T>> {
        self.upgrade()?.resolve::<T>(as_singleton)
    }

    /// See [`AutoWirer::instances_count`].
    pub fn instances_count(&self) -> Result<usize> {
        Ok(self.upgrade()?.instances_count())
    }
}

impl std::fmt::Debug for WirerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WirerHandle")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// Runtime configuration for an [`AutoWirer`].
///
/// ```rust
/// use autowirer::AutoWirer;
///
/// let wirer = AutoWirer::builder()
///     .with_capacity(32)
///     .on_exception(|err| eprintln!("wiring failed: {err}"))
///     .build();
/// assert_eq!(wirer.instances_count(), 1);
/// ```
#[derive(Default)]
pub struct AutoWirerBuilder {
    capacity: usize,
    retain_encountered: bool,
    exception_handler: Option<ExceptionHandler>,
}

impl AutoWirerBuilder {
    /// Pre-allocate room for this many registrations
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Once a type went through construction, never construct it again
    /// (until [`AutoWirer::cleanup`]). Off by default: the cycle guard only
    /// covers the active resolution chain.
    pub fn retain_encountered(mut self, retain: bool) -> Self {
        self.retain_encountered = retain;
        self
    }

    /// Install the wiring exception handler up front
    pub fn on_exception<F>(mut self, handler: F) -> Self
    where
        F: Fn(DiError) + Send + Sync + 'static,
    {
        self.exception_handler = Some(Arc::new(handler));
        self
    }

    /// Create the wirer
    pub fn build(self) -> AutoWirer {
        AutoWirer::from_builder(self)
    }
}

impl std::fmt::Debug for AutoWirerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoWirerBuilder")
            .field("capacity", &self.capacity)
            .field("retain_encountered", &self.retain_encountered)
            .field("has_exception_handler", &self.exception_handler.is_some())
            .finish()
    }
}
