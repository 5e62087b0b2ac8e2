use crate::di::container::{Container, Dispose, ServiceDescriptor};
use crate::di::provider::ServiceProvider;
use crate::error::Result;
use crate::logging::{Logger, LoggerFactory};
use std::sync::Arc;

/// Builder for constructing a dependency injection container
///
/// Use this to configure and register services before building the final container.
///
/// # Example
/// ```
/// use autoinject::ContainerBuilder;
/// use std::sync::Arc;
///
/// trait Database: Send + Sync {}
/// struct PostgresDatabase;
/// impl Database for PostgresDatabase {}
///
/// let container = ContainerBuilder::new()
///     .register(PostgresDatabase)
///     .bind::<dyn Database, PostgresDatabase, _>(|db| db as Arc<dyn Database>)
///     .add_logging()
///     .build();
/// assert!(container.contains::<dyn Database>());
/// ```
pub struct ContainerBuilder {
    pub(crate) container: Container,
}

impl ContainerBuilder {
    /// Create a new container builder
    pub fn new() -> Self {
        Self {
            container: Container::new(),
        }
    }

    /// Register a service instance as a singleton
    pub fn register<T: 'static + Send + Sync>(mut self, instance: T) -> Self {
        self.container.register(instance);
        self
    }

    /// Bind a trait to a concrete implementation
    ///
    /// This enables resolving `Arc<dyn Trait>` to the registered implementation.
    /// The implementation should be registered first so the binding picks up its lifetime.
    pub fn bind<Trait, Impl, F>(mut self, caster: F) -> Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        Impl: 'static + Send + Sync,
        F: Fn(Arc<Impl>) -> Arc<Trait> + 'static + Send + Sync,
    {
        self.container.bind::<Trait, Impl, F>(caster);
        self
    }

    pub fn add_singleton<T, F>(mut self, factory: F) -> Self
    where
        T: 'static + Send + Sync,
        F: Fn(&dyn ServiceProvider) -> Result<T> + Send + Sync + 'static,
    {
        self.container.add_singleton(factory);
        self
    }

    pub fn add_scoped<T, F>(mut self, factory: F) -> Self
    where
        T: 'static + Send + Sync,
        F: Fn(&dyn ServiceProvider) -> Result<T> + Send + Sync + 'static,
    {
        self.container.add_scoped(factory);
        self
    }

    pub fn add_scoped_disposable<T, F>(mut self, factory: F) -> Self
    where
        T: Dispose + 'static,
        F: Fn(&dyn ServiceProvider) -> Result<T> + Send + Sync + 'static,
    {
        self.container.add_scoped_disposable(factory);
        self
    }

    pub fn add_transient<T, F>(mut self, factory: F) -> Self
    where
        T: 'static + Send + Sync,
        F: Fn(&dyn ServiceProvider) -> Result<T> + Send + Sync + 'static,
    {
        self.container.add_transient(factory);
        self
    }

    pub fn add_descriptor(mut self, descriptor: ServiceDescriptor) -> Self {
        self.container.add_descriptor(descriptor);
        self
    }

    /// Register the logger factory and a generic `Logger`
    pub fn add_logging(self) -> Self {
        self.register(LoggerFactory::default())
            .add_transient(|_| Ok(Logger::new("default")))
    }

    /// Build the container
    pub fn build(self) -> Container {
        self.container
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
