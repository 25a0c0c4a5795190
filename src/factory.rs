//! Constructors: how a singleton is built and what it needs
//!
//! A [`Constructor<T>`] is the typed registration builder. It erases into a
//! [`ConstructorInfo`], the immutable record the resolver works with:
//! dependency keys in declaration order, a factory taking the resolved
//! [`Arguments`], the keys the product can be requested as, and an optional
//! external cleanup action.

use crate::lifecycle::{Cleanable, Initializable, as_cleanable, as_initializable};
use crate::{BoxError, DiError, Injectable, Instance, Result, TypeKey};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Type-erased factory producing a finished instance
type ErasedFactory = Box<dyn Fn(&Arguments) -> std::result::Result<Instance, BoxError> + Send + Sync>;

/// Type-erased external cleanup action
type ErasedCleanup = Box<dyn Fn(&Instance) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Adds one view to a freshly built instance
type ViewFn = Box<dyn Fn(Instance) -> Instance + Send + Sync>;

/// The resolved dependency values handed to a factory or listener, in the
/// order the dependencies were declared.
pub struct Arguments {
    values: Vec<Instance>,
}

impl Arguments {
    pub(crate) fn new(values: Vec<Instance>) -> Self {
        Self { values }
    }

    /// Get argument `index` as `D`.
    ///
    /// Fails with [`DiError::ArgumentMismatch`] when the index is out of
    /// range or the value cannot be viewed as `D`.
    pub fn get<D: ?Sized + Send + Sync + 'static>(&self, index: usize) -> Result<Arc<D>> {
        let instance = self.values.get(index).ok_or(DiError::ArgumentMismatch {
            index,
            expected: std::any::type_name::<D>(),
            found: "<missing>",
        })?;

        instance.get::<D>().ok_or(DiError::ArgumentMismatch {
            index,
            expected: std::any::type_name::<D>(),
            found: instance.type_name(),
        })
    }

    /// Raw instance at `index`
    #[inline]
    pub fn instance(&self, index: usize) -> Option<&Instance> {
        self.values.get(index)
    }

    /// Number of arguments
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no arguments
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over the arguments in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.values.iter()
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.values.iter().map(Instance::type_name))
            .finish()
    }
}

/// Immutable registration record for one singleton type.
pub struct ConstructorInfo {
    produces: TypeKey,
    provides: Vec<TypeKey>,
    dependencies: Vec<TypeKey>,
    factory: ErasedFactory,
    external_cleanup: Option<ErasedCleanup>,
}

impl ConstructorInfo {
    /// Key of the concrete type this constructor builds
    #[inline]
    pub fn produces(&self) -> TypeKey {
        self.produces
    }

    /// Every key the product can be requested as, concrete key first
    #[inline]
    pub fn provides(&self) -> &[TypeKey] {
        &self.provides
    }

    /// Whether a request for `key` can be satisfied by this constructor
    #[inline]
    pub fn is_assignable_to(&self, key: TypeKey) -> bool {
        self.provides.contains(&key)
    }

    /// Dependency keys in declaration order
    #[inline]
    pub fn dependencies(&self) -> &[TypeKey] {
        &self.dependencies
    }

    /// Whether an external cleanup action was registered
    #[inline]
    pub fn has_external_cleanup(&self) -> bool {
        self.external_cleanup.is_some()
    }

    pub(crate) fn create(&self, args: &Arguments) -> std::result::Result<Instance, BoxError> {
        (self.factory)(args)
    }

    pub(crate) fn external_cleanup(&self, instance: &Instance) -> Option<std::result::Result<(), BoxError>> {
        self.external_cleanup.as_ref().map(|cleanup| cleanup(instance))
    }
}

impl fmt::Debug for ConstructorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorInfo")
            .field("produces", &self.produces)
            .field("provides", &self.provides)
            .field("dependencies", &self.dependencies)
            .field("external_cleanup", &self.external_cleanup.is_some())
            .finish()
    }
}

/// Typed registration builder.
///
/// # Examples
///
/// ```rust
/// use autowirer::{Constructor, TypeKey};
/// use std::sync::Arc;
///
/// struct Config { port: u16 }
/// struct Server { config: Arc<Config> }
///
/// let config = Constructor::new(|_| Ok(Config { port: 8080 }));
/// let server = Constructor::new(|args| Ok(Server { config: args.get::<Config>(0)? }))
///     .depends_on::<Config>();
///
/// assert!(config.dependencies().is_empty());
/// assert_eq!(server.dependencies(), &[TypeKey::of::<Config>()]);
/// ```
pub struct Constructor<T: Injectable> {
    dependencies: Vec<TypeKey>,
    factory: Box<dyn Fn(&Arguments) -> std::result::Result<T, BoxError> + Send + Sync>,
    provides: Vec<TypeKey>,
    views: Vec<ViewFn>,
    cleanup: Option<Box<dyn Fn(&T) -> std::result::Result<(), BoxError> + Send + Sync>>,
}

impl<T: Injectable> Constructor<T> {
    /// Create a constructor from a factory. Declare what the factory reads
    /// from its [`Arguments`] with [`depends_on`](Self::depends_on).
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&Arguments) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            dependencies: Vec::new(),
            factory: Box::new(factory),
            provides: vec![TypeKey::of::<T>()],
            views: Vec::new(),
            cleanup: None,
        }
    }

    /// Append a dependency on `D`; it becomes the next argument index
    pub fn depends_on<D: ?Sized + 'static>(mut self) -> Self {
        self.dependencies.push(TypeKey::of::<D>());
        self
    }

    /// Append several dependencies at once
    pub fn with_dependencies(mut self, keys: &[TypeKey]) -> Self {
        self.dependencies.extend_from_slice(keys);
        self
    }

    /// Make the product requestable as `U` too (typically a `dyn Trait`)
    pub fn exposes<U>(mut self, cast: fn(Arc<T>) -> Arc<U>) -> Self
    where
        U: ?Sized + Send + Sync + 'static,
    {
        let key = TypeKey::of::<U>();
        if !self.provides.contains(&key) {
            self.provides.push(key);
            self.views.push(Box::new(move |instance: Instance| instance.with_view(cast)));
        }
        self
    }

    /// Run [`Initializable::initialize`] on the product during wiring
    pub fn initializable(self) -> Self
    where
        T: Initializable,
    {
        self.exposes::<dyn Initializable>(as_initializable::<T>)
    }

    /// Run [`Cleanable::cleanup`] on the product during teardown
    pub fn cleanable(self) -> Self
    where
        T: Cleanable,
    {
        self.exposes::<dyn Cleanable>(as_cleanable::<T>)
    }

    /// Register an external cleanup action, run after the product's own
    /// [`Cleanable::cleanup`] (if any)
    pub fn on_cleanup<F>(mut self, cleanup: F) -> Self
    where
        F: Fn(&T) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.cleanup = Some(Box::new(cleanup));
        self
    }

    /// Dependency keys declared so far
    #[inline]
    pub fn dependencies(&self) -> &[TypeKey] {
        &self.dependencies
    }

    /// Keys the product will be requestable as
    #[inline]
    pub fn provides(&self) -> &[TypeKey] {
        &self.provides
    }

    /// Erase into the record the resolver works with
    pub fn into_info(self) -> ConstructorInfo {
        let Constructor {
            dependencies,
            factory,
            provides,
            views,
            cleanup,
        } = self;

        let factory: ErasedFactory = Box::new(move |args| {
            let value = Arc::new(factory(args)?);
            Ok(views.iter().fold(Instance::new(value), |instance, view| view(instance)))
        });

        let external_cleanup = cleanup.map(|cleanup| {
            Box::new(move |instance: &Instance| match instance.get::<T>() {
                Some(value) => cleanup(&value),
                None => Ok(()),
            }) as ErasedCleanup
        });

        ConstructorInfo {
            produces: TypeKey::of::<T>(),
            provides,
            dependencies,
            factory,
            external_cleanup,
        }
    }
}

impl<T: Injectable> fmt::Debug for Constructor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("type", &std::any::type_name::<T>())
            .field("dependencies", &self.dependencies)
            .field("provides", &self.provides)
            .finish()
    }
}

/// Constructor discovery for types registered by type alone.
///
/// Implementations list every public way of building the type. Only types
/// with exactly one constructor can be auto-wired; anything else fails with
/// [`DiError::InvalidConstructorShape`]. With the `derive` feature,
/// `#[derive(Autowire)]` generates the single constructor from the struct's
/// `Arc<_>` fields.
///
/// ```rust
/// use autowirer::{Autowire, Constructor};
/// use std::sync::Arc;
///
/// struct Clock;
/// struct Scheduler { clock: Arc<Clock> }
///
/// impl Autowire for Scheduler {
///     fn constructors() -> Vec<Constructor<Self>> {
///         vec![Constructor::new(|args| Ok(Scheduler { clock: args.get(0)? })).depends_on::<Clock>()]
///     }
/// }
/// ```
pub trait Autowire: Injectable + Sized {
    /// Every public constructor of the type
    fn constructors() -> Vec<Constructor<Self>>;
}

/// Take the one constructor of `T`, or fail if it has zero or several
pub(crate) fn single_constructor<T: Autowire>() -> Result<ConstructorInfo> {
    let mut constructors = T::constructors();
    if constructors.len() != 1 {
        return Err(DiError::invalid_shape::<T>(constructors.len()));
    }
    match constructors.pop() {
        Some(constructor) => Ok(constructor.into_info()),
        None => Err(DiError::invalid_shape::<T>(0)),
    }
}

/// A pre-built singleton and the capabilities it declares.
///
/// Values handed to the wirer ready-made have no constructor, so their
/// lifecycle hooks and interface views are declared here instead.
///
/// ```rust
/// use autowirer::{AutoWirer, BoxError, Existing, Initializable};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct Socket { open: AtomicBool }
///
/// impl Initializable for Socket {
///     fn initialize(&self) -> Result<(), BoxError> {
///         self.open.store(true, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// let wirer = AutoWirer::new();
/// wirer
///     .add_existing_singleton_with(Existing::new(Socket { open: AtomicBool::new(false) }).initializable(), false)
///     .wire();
///
/// let socket: Arc<Socket> = wirer.find_instance().unwrap().unwrap();
/// assert!(socket.open.load(Ordering::SeqCst));
/// ```
pub struct Existing<T: Injectable> {
    instance: Instance,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> Existing<T> {
    pub fn new(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap a value that is already shared
    pub fn from_arc(value: Arc<T>) -> Self {
        Self {
            instance: Instance::new(value),
            _marker: PhantomData,
        }
    }

    /// Make the value requestable as `U` as well
    pub fn exposes<U>(mut self, cast: fn(Arc<T>) -> Arc<U>) -> Self
    where
        U: ?Sized + Send + Sync + 'static,
    {
        self.instance = self.instance.with_view(cast);
        self
    }

    /// Run [`Initializable::initialize`] during wiring
    pub fn initializable(self) -> Self
    where
        T: Initializable,
    {
        self.exposes::<dyn Initializable>(as_initializable::<T>)
    }

    /// Run [`Cleanable::cleanup`] during teardown
    pub fn cleanable(self) -> Self
    where
        T: Cleanable,
    {
        self.exposes::<dyn Cleanable>(as_cleanable::<T>)
    }

    pub fn into_instance(self) -> Instance {
        self.instance
    }
}

impl<T: Injectable> From<Existing<T>> for Instance {
    fn from(existing: Existing<T>) -> Self {
        existing.into_instance()
    }
}

impl<T: Injectable> fmt::Debug for Existing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Existing")
            .field("instance", &self.instance)
            .finish()
    }
}
