//! Instantiation listeners
//!
//! A listener is registered against a trigger key and fires for every
//! instance that can be requested as that key: freshly constructed ones
//! right after their factory returns, and pre-built ones queued with
//! [`AutoWirer::add_existing_instance`](crate::AutoWirer::add_existing_instance)
//! when the wirer runs. Each listener declares its own dependencies, which
//! are resolved as singletons before it is called.

use crate::factory::Arguments;
use crate::storage::Registry;
use crate::{BoxError, DiError, Instance, Result, TypeKey};
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

type ListenerFn = Box<dyn Fn(&Instance, &Arguments) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Callback fired whenever an instance matching `trigger` becomes available.
pub struct InstantiationListener {
    trigger: TypeKey,
    dependencies: Vec<TypeKey>,
    callback: ListenerFn,
}

impl InstantiationListener {
    /// Listen for instances viewable as `T`
    pub fn new<T, F>(callback: F, dependencies: &[TypeKey]) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>, &Arguments) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            trigger: TypeKey::of::<T>(),
            dependencies: dependencies.to_vec(),
            callback: Box::new(move |instance, args| match instance.get::<T>() {
                Some(value) => callback(value, args),
                None => Ok(()),
            }),
        }
    }

    /// Key an instance must be viewable as for this listener to fire
    #[inline]
    pub fn trigger(&self) -> TypeKey {
        self.trigger
    }

    /// Dependency keys in declaration order
    #[inline]
    pub fn dependencies(&self) -> &[TypeKey] {
        &self.dependencies
    }
}

impl fmt::Debug for InstantiationListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstantiationListener")
            .field("trigger", &self.trigger)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

impl Registry {
    pub(crate) fn add_listener(&self, listener: InstantiationListener) {
        self.listeners.lock().push(Arc::new(listener));
    }

    /// Fire every matching listener for `instance`, in registration order.
    ///
    /// The first failing listener (or listener dependency) aborts the rest.
    pub(crate) fn dispatch(&self, instance: &Instance) -> Result<()> {
        let listeners: Vec<Arc<InstantiationListener>> = self.listeners.lock().clone();

        for listener in listeners.iter().filter(|l| instance.is_instance(l.trigger)) {
            let values = listener
                .dependencies
                .iter()
                .map(|dependency| self.resolve(*dependency, None, true))
                .collect::<Result<Vec<_>>>()?;

            #[cfg(feature = "logging")]
            trace!(
                target: "autowirer",
                service = instance.type_name(),
                trigger = listener.trigger.name(),
                dependencies = values.len(),
                "Calling instantiation listener"
            );

            (listener.callback)(instance, &Arguments::new(values)).map_err(|source| {
                DiError::ListenerFailed {
                    type_name: listener.trigger.name(),
                    source,
                }
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Constructor;
    use parking_lot::Mutex;

    trait Plugin: Send + Sync {
        fn id(&self) -> u32;
    }

    struct Audio;

    impl Plugin for Audio {
        fn id(&self) -> u32 {
            7
        }
    }

    struct Host {
        name: &'static str,
    }

    fn audio() -> Instance {
        Instance::new(Arc::new(Audio)).with_view(|a: Arc<Audio>| -> Arc<dyn Plugin> { a })
    }

    #[test]
    fn test_dispatch_matches_trigger() {
        let registry = Registry::new(0, false);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        registry.add_listener(InstantiationListener::new(
            move |plugin: Arc<dyn Plugin>, _args: &Arguments| {
                sink.lock().push(plugin.id());
                Ok(())
            },
            &[],
        ));
        registry.add_listener(InstantiationListener::new(
            |_host: Arc<Host>, _args: &Arguments| -> std::result::Result<(), BoxError> {
                panic!("must not fire for plugins")
            },
            &[],
        ));

        registry.dispatch(&audio()).unwrap();
        assert_eq!(*seen.lock(), vec![7]);
    }

    #[test]
    fn test_dispatch_resolves_listener_dependencies() {
        let registry = Registry::new(0, false);
        registry.insert_constructor(Constructor::new(|_| Ok(Host { name: "main" })).into_info());

        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        registry.add_listener(InstantiationListener::new(
            move |_plugin: Arc<dyn Plugin>, args: &Arguments| {
                *sink.lock() = Some(args.get::<Host>(0)?.name);
                Ok(())
            },
            &[TypeKey::of::<Host>()],
        ));

        registry.dispatch(&audio()).unwrap();
        assert_eq!(*seen.lock(), Some("main"));
        assert_eq!(registry.singleton_count(), 1);
    }

    #[test]
    fn test_failing_listener_stops_dispatch() {
        let registry = Registry::new(0, false);
        let calls = Arc::new(Mutex::new(0));

        registry.add_listener(InstantiationListener::new(
            |_plugin: Arc<dyn Plugin>, _args: &Arguments| Err("rejected".into()),
            &[],
        ));
        let counter = Arc::clone(&calls);
        registry.add_listener(InstantiationListener::new(
            move |_plugin: Arc<dyn Plugin>, _args: &Arguments| {
                *counter.lock() += 1;
                Ok(())
            },
            &[],
        ));

        let err = registry.dispatch(&audio()).unwrap_err();
        assert!(matches!(err, DiError::ListenerFailed { .. }));
        assert_eq!(*calls.lock(), 0);
    }
}
