use crate::di::key::{downcast, erase, Instance, ServiceKey};
use crate::di::provider::{ServiceProvider, ServiceScope};
use crate::di::scope::ContainerScope;
use crate::error::{InjectError, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::sync::Arc;
use strum_macros::{Display, EnumString};

/// Factory closure producing a type-erased instance from a resolver.
pub type FactoryFn = Arc<dyn Fn(&dyn ServiceProvider) -> Result<Instance> + Send + Sync>;

/// Hook run on a scoped instance when its scope is disposed.
pub type DisposeFn = Arc<dyn Fn(&Instance) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    Transient,
    Scoped,
    Singleton,
}

/// Services that release resources when their scope ends.
pub trait Dispose: Send + Sync {
    fn dispose(&self);
}

/// Type-erased registration.
#[derive(Clone)]
pub struct ServiceDescriptor {
    pub key: ServiceKey,
    pub lifetime: Lifetime,
    pub factory: FactoryFn,
    pub disposer: Option<DisposeFn>,
}

impl ServiceDescriptor {
    pub fn new<F>(key: ServiceKey, lifetime: Lifetime, factory: F) -> Self
    where
        F: Fn(&dyn ServiceProvider) -> Result<Instance> + Send + Sync + 'static,
    {
        Self {
            key,
            lifetime,
            factory: Arc::new(factory),
            disposer: None,
        }
    }
}

pub(crate) struct ContainerInner {
    pub(crate) services: DashMap<TypeId, ServiceDescriptor>,
    singletons: DashMap<TypeId, Instance>,
}

/// Thread-safe host container.
///
/// Clones share registrations and singleton instances.
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ContainerInner>,
}

impl Container {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                services: DashMap::new(),
                singletons: DashMap::new(),
            }),
        }
    }

    /// Register an existing instance as a singleton.
    pub fn register<T: 'static + Send + Sync>(&mut self, instance: T) -> &mut Self {
        let key = ServiceKey::of::<T>();
        let instance = erase(Arc::new(instance));
        self.inner.singletons.insert(key.type_id(), instance.clone());
        self.add_descriptor(ServiceDescriptor::new(key, Lifetime::Singleton, move |_| {
            Ok(instance.clone())
        }))
    }

    pub fn add_singleton<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&dyn ServiceProvider) -> Result<T> + Send + Sync + 'static,
    {
        self.add_typed(Lifetime::Singleton, factory)
    }

    pub fn add_scoped<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&dyn ServiceProvider) -> Result<T> + Send + Sync + 'static,
    {
        self.add_typed(Lifetime::Scoped, factory)
    }

    pub fn add_transient<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&dyn ServiceProvider) -> Result<T> + Send + Sync + 'static,
    {
        self.add_typed(Lifetime::Transient, factory)
    }

    /// Register a scoped service whose [`Dispose`] hook runs when its scope is disposed.
    pub fn add_scoped_disposable<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Dispose + 'static,
        F: Fn(&dyn ServiceProvider) -> Result<T> + Send + Sync + 'static,
    {
        let mut descriptor = typed_descriptor(Lifetime::Scoped, factory);
        descriptor.disposer = Some(Arc::new(|instance: &Instance| {
            if let Some(service) = downcast::<T>(instance) {
                service.dispose();
            }
        }));
        self.add_descriptor(descriptor)
    }

    /// Bind a trait to a concrete implementation key.
    ///
    /// Resolving `Arc<dyn Trait>` resolves `Impl` through the same provider and
    /// casts it, so the binding inherits the implementation's lifetime.
    pub fn bind<Trait, Impl, F>(&mut self, caster: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        Impl: 'static + Send + Sync,
        F: Fn(Arc<Impl>) -> Arc<Trait> + 'static + Send + Sync,
    {
        let impl_key = ServiceKey::of::<Impl>();
        let lifetime = self
            .inner
            .services
            .get(&impl_key.type_id())
            .map(|entry| entry.lifetime)
            .unwrap_or(Lifetime::Transient);

        self.add_descriptor(ServiceDescriptor::new(
            ServiceKey::of_trait::<Trait>(),
            lifetime,
            move |provider| {
                let concrete = provider
                    .resolve_keyed::<Impl>(&impl_key)?
                    .ok_or_else(|| InjectError::DependencyNotFound {
                        type_name: format!(
                            "Implementation for trait '{}' not registered",
                            std::any::type_name::<Trait>()
                        ),
                    })?;
                Ok(erase(caster(concrete)))
            },
        ))
    }

    pub fn add_descriptor(&mut self, descriptor: ServiceDescriptor) -> &mut Self {
        tracing::debug!(
            service = descriptor.key.type_name(),
            lifetime = %descriptor.lifetime,
            "registered service"
        );
        self.inner
            .services
            .insert(descriptor.key.type_id(), descriptor);
        self
    }

    /// Strict typed resolution from the root provider.
    pub fn resolve<T: ?Sized + 'static + Send + Sync>(&self) -> Result<Arc<T>> {
        let key = ServiceKey::of::<T>();
        let instance =
            self.get_service(&key)?
                .ok_or_else(|| InjectError::DependencyNotFound {
                    type_name: std::any::type_name::<T>().to_string(),
                })?;
        downcast::<T>(&instance).ok_or_else(|| InjectError::DowncastFailed {
            type_name: std::any::type_name::<T>().to_string(),
        })
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.inner.services.contains_key(&TypeId::of::<T>())
    }

    pub fn contains_key(&self, key: &ServiceKey) -> bool {
        self.inner.services.contains_key(&key.type_id())
    }

    pub fn lifetime_of(&self, key: &ServiceKey) -> Option<Lifetime> {
        self.inner
            .services
            .get(&key.type_id())
            .map(|entry| entry.lifetime)
    }

    pub fn len(&self) -> usize {
        self.inner.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.services.is_empty()
    }

    /// Share this container as a provider for the injection engine.
    pub fn into_provider(self) -> Arc<dyn ServiceProvider> {
        Arc::new(self)
    }

    pub(crate) fn descriptor(&self, key: &ServiceKey) -> Option<ServiceDescriptor> {
        self.inner
            .services
            .get(&key.type_id())
            .map(|entry| entry.value().clone())
    }

    /// Resolve a singleton, creating it at most once.
    ///
    /// The factory runs without holding a map lock so it may resolve other services.
    pub(crate) fn singleton(&self, descriptor: &ServiceDescriptor) -> Result<Instance> {
        let id = descriptor.key.type_id();
        if let Some(existing) = self.inner.singletons.get(&id) {
            return Ok(existing.value().clone());
        }
        let created = (descriptor.factory)(self)?;
        let stored = self.inner.singletons.entry(id).or_insert(created);
        Ok(stored.value().clone())
    }

    fn add_typed<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&dyn ServiceProvider) -> Result<T> + Send + Sync + 'static,
    {
        self.add_descriptor(typed_descriptor(lifetime, factory))
    }
}

fn typed_descriptor<T, F>(lifetime: Lifetime, factory: F) -> ServiceDescriptor
where
    T: 'static + Send + Sync,
    F: Fn(&dyn ServiceProvider) -> Result<T> + Send + Sync + 'static,
{
    ServiceDescriptor::new(ServiceKey::of::<T>(), lifetime, move |provider| {
        factory(provider).map(|value| erase(Arc::new(value)))
    })
}

impl ServiceProvider for Container {
    fn get_service(&self, key: &ServiceKey) -> Result<Option<Instance>> {
        let Some(descriptor) = self.descriptor(key) else {
            return Ok(None);
        };
        match descriptor.lifetime {
            Lifetime::Singleton => self.singleton(&descriptor).map(Some),
            Lifetime::Transient => (descriptor.factory)(self).map(Some),
            Lifetime::Scoped => Err(InjectError::LifetimeMismatch {
                type_name: key.type_name().to_string(),
            }),
        }
    }

    fn create_scope(&self) -> Arc<dyn ServiceScope> {
        Arc::new(ContainerScope::new(self.clone()))
    }

    fn root(&self) -> Arc<dyn ServiceProvider> {
        Arc::new(self.clone())
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TestService {
        value: i32,
    }

    trait MyTrait: Send + Sync {
        fn get_value(&self) -> i32;
    }

    struct MyTraitImpl {
        value: i32,
    }

    impl MyTrait for MyTraitImpl {
        fn get_value(&self) -> i32 {
            self.value
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut container = Container::new();
        container.register(TestService { value: 42 });
        let service = container.resolve::<TestService>().unwrap();
        assert_eq!(service.value, 42);
    }

    #[test]
    fn test_bind_and_resolve_trait() {
        let mut container = Container::new();
        container.register(MyTraitImpl { value: 99 });
        container.bind::<dyn MyTrait, MyTraitImpl, _>(|i| i as Arc<dyn MyTrait>);
        let trait_instance = container.resolve::<dyn MyTrait>().unwrap();
        assert_eq!(trait_instance.get_value(), 99);
    }

    #[test]
    fn test_unregistered_service_is_absent_not_an_error() {
        let container = Container::new();
        let found = container.get_service(&ServiceKey::of::<TestService>()).unwrap();
        assert!(found.is_none());
        assert!(matches!(
            container.resolve::<TestService>(),
            Err(InjectError::DependencyNotFound { .. })
        ));
    }

    #[test]
    fn test_scoped_from_root_signals_lifetime_mismatch() {
        let mut container = Container::new();
        container.add_scoped(|_| Ok(TestService { value: 1 }));
        let err = container
            .get_service(&ServiceKey::of::<TestService>())
            .unwrap_err();
        assert!(err.is_lifetime_mismatch());
    }

    #[test]
    fn test_singleton_factory_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut container = Container::new();
        container.add_singleton(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(TestService { value: 7 })
        });

        let first = container.resolve::<TestService>().unwrap();
        let second = container.resolve::<TestService>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transient_creates_new_instances() {
        let mut container = Container::new();
        container.add_transient(|_| Ok(TestService { value: 3 }));
        let first = container.resolve::<TestService>().unwrap();
        let second = container.resolve::<TestService>().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_factory_errors_propagate() {
        let mut container = Container::new();
        container.add_transient::<TestService, _>(|_| Err(InjectError::Internal("boom".into())));
        assert!(matches!(
            container.get_service(&ServiceKey::of::<TestService>()),
            Err(InjectError::Internal(msg)) if msg == "boom"
        ));
    }

    #[test]
    fn test_lifetime_parses_from_config_strings() {
        assert_eq!("scoped".parse::<Lifetime>().unwrap(), Lifetime::Scoped);
        assert_eq!("Singleton".parse::<Lifetime>().unwrap(), Lifetime::Singleton);
        assert_eq!(Lifetime::Transient.to_string(), "transient");
    }
}
