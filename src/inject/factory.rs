use crate::config::{AmbiguityPolicy, FactoryOptions};
use crate::di::{downcast, Instance, ServiceKey, ServiceProvider, ServiceScope, TypeInfo};
use crate::error::{InjectError, Result};
use crate::inject::base::InjectBase;
use crate::inject::marker::{Injectable, TypeDescriptor};
use crate::inject::registry::{Implementation, ImplementationRegistry};
use crate::inject::request::{RequestContext, RequestId};
use crate::inject::strategy::{Attempt, RESOLUTION_CHAIN};
use crate::logging::{Logger, LoggerFactory, TypedLogger};
use chrono::{DateTime, Utc};
use std::any::TypeId;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

static GLOBAL_FACTORY: OnceLock<Arc<Factory>> = OnceLock::new();

struct ScopeEntry {
    scope: Arc<dyn ServiceScope>,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct FactoryState {
    provider: Option<Arc<dyn ServiceProvider>>,
    marker_cache: HashMap<TypeId, bool>,
    // first writer wins, never overwritten
    implementation_cache: HashMap<TypeId, Implementation>,
    request_scopes: HashMap<RequestId, ScopeEntry>,
}

/// Snapshot of the engine's caches and scope table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactoryStats {
    pub cached_markers: usize,
    pub cached_implementations: usize,
    pub active_scopes: usize,
    pub registry_scans: usize,
}

/// The injection engine.
///
/// Holds the configured host provider, the marker and implementation caches and
/// the table of per-request scopes. All of it sits behind one lock, which is never
/// held while calling into the provider's factories or into nested injection.
pub struct Factory {
    registry: ImplementationRegistry,
    options: FactoryOptions,
    state: Mutex<FactoryState>,
    registry_scans: AtomicUsize,
}

impl Factory {
    pub fn new(registry: ImplementationRegistry, options: FactoryOptions) -> Self {
        Self {
            registry,
            options,
            state: Mutex::new(FactoryState::default()),
            registry_scans: AtomicUsize::new(0),
        }
    }

    /// Process-wide factory over the linked registry, with options from the environment.
    pub fn global() -> Arc<Factory> {
        GLOBAL_FACTORY
            .get_or_init(|| {
                Arc::new(Factory::new(
                    ImplementationRegistry::linked(),
                    FactoryOptions::from_env(),
                ))
            })
            .clone()
    }

    pub fn registry(&self) -> &ImplementationRegistry {
        &self.registry
    }

    pub fn options(&self) -> &FactoryOptions {
        &self.options
    }

    /// Replace the host provider; `None` returns the engine to the unconfigured state.
    ///
    /// Caches and open scopes are kept.
    pub fn configure(&self, provider: Option<Arc<dyn ServiceProvider>>) {
        let configured = provider.is_some();
        self.lock().provider = provider;
        tracing::info!(configured, "factory provider replaced");
    }

    pub fn is_configured(&self) -> bool {
        self.lock().provider.is_some()
    }

    pub fn provider(&self) -> Result<Arc<dyn ServiceProvider>> {
        self.lock()
            .provider
            .clone()
            .ok_or_else(InjectError::unconfigured)
    }

    /// Populate every `#[injectable]`, writable, still-empty member of `instance`.
    ///
    /// Stops at the first member that cannot be resolved; members populated before
    /// it keep their values.
    pub fn inject_dependencies(&self, instance: &mut dyn Injectable) -> Result<()> {
        let provider = self.provider()?;
        let owner = instance.descriptor().info;

        for mut member in instance.members() {
            if !member.is_injectable() || !member.is_writable() || member.is_populated() {
                continue;
            }
            let key = *member.key();
            let Some(dependency) = self.get_service_with(provider.as_ref(), &key)? else {
                return Err(InjectError::resolution(
                    member.name(),
                    key.type_name(),
                    owner.name,
                ));
            };
            if !member.populate(&dependency) {
                return Err(InjectError::DowncastFailed {
                    type_name: key.type_name().to_string(),
                });
            }
            tracing::trace!(owner = owner.name, member = member.name(), "injected member");
        }
        Ok(())
    }

    /// Resolve `T` through the full resolution chain.
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>> {
        let key = ServiceKey::inferred::<T>();
        match self.get_service(&key)? {
            Some(instance) => downcast::<T>(&instance)
                .map(Some)
                .ok_or_else(|| InjectError::DowncastFailed {
                    type_name: key.type_name().to_string(),
                }),
            None => Ok(None),
        }
    }

    pub(crate) fn get_service(&self, key: &ServiceKey) -> Result<Option<Instance>> {
        let provider = self.provider()?;
        self.get_service_with(provider.as_ref(), key)
    }

    fn get_service_with(
        &self,
        provider: &dyn ServiceProvider,
        key: &ServiceKey,
    ) -> Result<Option<Instance>> {
        let mut scope_required = false;
        for strategy in RESOLUTION_CHAIN {
            match strategy.attempt(self, provider, key, scope_required)? {
                Attempt::Found(instance) => {
                    tracing::trace!(service = key.type_name(), ?strategy, "resolved");
                    return Ok(Some(instance));
                }
                Attempt::RequiresScope => scope_required = true,
                Attempt::Absent => {}
            }
        }
        Ok(None)
    }

    /// Scope of the current logical request, created on first use.
    pub(crate) fn request_scope(&self, provider: &dyn ServiceProvider) -> Arc<dyn ServiceScope> {
        let request_id = RequestContext::current_request_id();
        if let Some(entry) = self.lock().request_scopes.get(&request_id) {
            return entry.scope.clone();
        }

        let created = provider.create_scope();
        let (scope, inserted) = match self.lock().request_scopes.entry(request_id.clone()) {
            Entry::Occupied(entry) => (entry.get().scope.clone(), false),
            Entry::Vacant(entry) => {
                let entry = entry.insert(ScopeEntry {
                    scope: created.clone(),
                    created_at: Utc::now(),
                });
                (entry.scope.clone(), true)
            }
        };

        if inserted {
            tracing::debug!(request = %request_id, "created request scope");
        } else {
            // another caller of the same request got there first
            created.dispose();
        }
        scope
    }

    pub(crate) fn auto_resolve(
        &self,
        provider: &dyn ServiceProvider,
        key: &ServiceKey,
    ) -> Result<Option<Instance>> {
        let cached = self
            .lock()
            .implementation_cache
            .get(&key.type_id())
            .copied();

        let implementation = match cached {
            Some(implementation) => implementation,
            None => {
                let Some(discovered) = self.discover(key)? else {
                    return Ok(None);
                };
                *self
                    .lock()
                    .implementation_cache
                    .entry(key.type_id())
                    .or_insert(discovered)
            }
        };
        Ok(self.instantiate(provider, key, &implementation))
    }

    fn discover(&self, key: &ServiceKey) -> Result<Option<Implementation>> {
        self.registry_scans.fetch_add(1, Ordering::Relaxed);
        let candidates: Vec<&Implementation> = self
            .registry
            .candidates(key, &self.options.excluded_prefixes)
            .collect();

        match candidates.as_slice() {
            [] => {
                tracing::debug!(interface = key.type_name(), "no implementation registered");
                Ok(None)
            }
            [only] => Ok(Some(**only)),
            [first, ..] => {
                let names: Vec<String> = candidates
                    .iter()
                    .map(|c| c.concrete_descriptor().info.name.to_string())
                    .collect();
                match self.options.ambiguity {
                    AmbiguityPolicy::FirstWins => {
                        tracing::warn!(
                            interface = key.type_name(),
                            chosen = %names[0],
                            candidates = ?names,
                            "several implementations qualify; using the first"
                        );
                        Ok(Some(**first))
                    }
                    AmbiguityPolicy::Reject => Err(InjectError::AmbiguousImplementation {
                        interface: key.type_name().to_string(),
                        candidates: names,
                    }),
                }
            }
        }
    }

    /// Container construction first, then bare construction; failures of either
    /// are reported and end in absence.
    fn instantiate(
        &self,
        provider: &dyn ServiceProvider,
        key: &ServiceKey,
        implementation: &Implementation,
    ) -> Option<Instance> {
        if let Some(construct) = implementation.construct {
            match construct(provider) {
                Ok(instance) => return Some(instance),
                Err(e) => self.report_fallback(key, implementation, "container construction", &e),
            }
        }
        match (implementation.instantiate)(self) {
            Ok(instance) => Some(instance),
            Err(e) => {
                self.report_fallback(key, implementation, "bare construction", &e);
                None
            }
        }
    }

    fn report_fallback(
        &self,
        key: &ServiceKey,
        implementation: &Implementation,
        path: &str,
        error: &InjectError,
    ) {
        if self.options.warn_on_fallback {
            tracing::warn!(
                interface = key.type_name(),
                concrete = implementation.concrete_descriptor().info.name,
                path,
                error = %error,
                "auto-instantiation failed"
            );
        }
    }

    pub(crate) fn instantiate_bare<C: Injectable + Default>(&self) -> Result<Arc<C>> {
        let mut instance = C::default();
        if C::describe().inject_base {
            InjectBase::run_hook(self, &mut instance)?;
        } else {
            self.inject_dependencies(&mut instance)?;
        }
        Ok(Arc::new(instance))
    }

    pub(crate) fn has_auto_inject_marker(&self, descriptor: &TypeDescriptor) -> bool {
        *self
            .lock()
            .marker_cache
            .entry(descriptor.info.id)
            .or_insert(descriptor.auto_inject)
    }

    /// Dispose the scope of the current logical request, if there is one.
    pub fn dispose_request_scope(&self) {
        self.dispose_scope(&RequestContext::current_request_id());
    }

    /// Dispose the scope tracked under `request_id`; returns whether one existed.
    pub fn dispose_scope(&self, request_id: &RequestId) -> bool {
        let Some(entry) = self.lock().request_scopes.remove(request_id) else {
            return false;
        };
        entry.scope.dispose();
        tracing::debug!(request = %request_id, "disposed request scope");
        true
    }

    /// Dispose every tracked scope.
    pub fn dispose_all_scopes(&self) {
        let drained: Vec<ScopeEntry> = self
            .lock()
            .request_scopes
            .drain()
            .map(|(_, entry)| entry)
            .collect();
        let count = drained.len();
        for entry in drained {
            entry.scope.dispose();
        }
        if count > 0 {
            tracing::debug!(count, "disposed all request scopes");
        }
    }

    pub fn get_logger<T: ?Sized + 'static>(&self) -> Result<TypedLogger<T>> {
        let provider = self.provider()?;
        if let Some(logger) = provider.resolve::<TypedLogger<T>>()? {
            return Ok((*logger).clone());
        }
        if let Some(factory) = provider.resolve::<LoggerFactory>()? {
            return Ok(factory.create_typed::<T>());
        }
        Err(InjectError::resolution(
            "logger",
            std::any::type_name::<TypedLogger<T>>(),
            std::any::type_name::<T>(),
        ))
    }

    pub fn get_logger_for(&self, info: &TypeInfo) -> Result<Logger> {
        let provider = self.provider()?;
        if let Some(factory) = provider.resolve::<LoggerFactory>()? {
            return Ok(factory.create(info.name));
        }
        if let Some(logger) = provider.resolve::<Logger>()? {
            return Ok((*logger).clone());
        }
        Err(InjectError::resolution(
            "logger",
            std::any::type_name::<Logger>(),
            info.name,
        ))
    }

    pub fn stats(&self) -> FactoryStats {
        let state = self.lock();
        FactoryStats {
            cached_markers: state.marker_cache.len(),
            cached_implementations: state.implementation_cache.len(),
            active_scopes: state.request_scopes.len(),
            registry_scans: self.registry_scans.load(Ordering::Relaxed),
        }
    }

    /// Open request scopes with their creation time, oldest first.
    pub fn active_scopes(&self) -> Vec<(RequestId, DateTime<Utc>)> {
        let mut scopes: Vec<_> = self
            .lock()
            .request_scopes
            .iter()
            .map(|(id, entry)| (id.clone(), entry.created_at))
            .collect();
        scopes.sort_by_key(|(_, created_at)| *created_at);
        scopes
    }

    fn lock(&self) -> MutexGuard<'_, FactoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Factory {
    fn default() -> Self {
        Self::new(ImplementationRegistry::linked(), FactoryOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::{Container, ContainerBuilder};
    use crate::Injectable;

    pub trait Repository: Send + Sync {
        fn name(&self) -> &'static str;
    }

    #[derive(Default)]
    struct SqlRepository;

    impl Repository for SqlRepository {
        fn name(&self) -> &'static str {
            "sql"
        }
    }

    struct RequestSession {
        serial: usize,
    }

    #[derive(Default, Injectable)]
    #[auto_inject]
    struct OrderService {
        #[injectable]
        repository: Option<Arc<dyn Repository>>,
        #[injectable]
        logger: Option<Arc<Logger>>,
        audit: Option<Arc<dyn Repository>>,
    }

    #[derive(Default, Injectable)]
    struct SessionConsumer {
        #[injectable]
        session: Option<Arc<RequestSession>>,
    }

    #[derive(Default, Injectable)]
    struct WithReadonlyProperty {
        #[injectable(property, readonly)]
        locked: Option<Arc<dyn Repository>>,
        #[injectable(property)]
        open: Option<Arc<dyn Repository>>,
    }

    pub trait Ledger: Send + Sync {}

    #[derive(Default, Injectable)]
    struct MemoryLedger;

    impl Ledger for MemoryLedger {}

    #[derive(Default, Injectable)]
    struct LedgerConsumer {
        #[injectable]
        ledger: Option<Arc<dyn Ledger>>,
    }

    /// Provider whose scope creation reads back from the factory it serves.
    struct ReentrantProvider {
        inner: Container,
        factory: OnceLock<Arc<Factory>>,
        observed_scopes: AtomicUsize,
    }

    impl ServiceProvider for ReentrantProvider {
        fn get_service(&self, key: &ServiceKey) -> Result<Option<Instance>> {
            self.inner.get_service(key)
        }

        fn create_scope(&self) -> Arc<dyn ServiceScope> {
            if let Some(factory) = self.factory.get() {
                self.observed_scopes
                    .store(factory.stats().active_scopes, Ordering::SeqCst);
            }
            self.inner.create_scope()
        }

        fn root(&self) -> Arc<dyn ServiceProvider> {
            self.inner.root()
        }
    }

    const THREADS: usize = 8;

    fn container() -> Container {
        let serial = Arc::new(AtomicUsize::new(0));
        ContainerBuilder::new()
            .register(SqlRepository)
            .bind::<dyn Repository, SqlRepository, _>(|r| r as Arc<dyn Repository>)
            .add_scoped(move |_| {
                Ok(RequestSession {
                    serial: serial.fetch_add(1, Ordering::SeqCst),
                })
            })
            .add_logging()
            .build()
    }

    fn configured() -> Factory {
        let factory = Factory::new(ImplementationRegistry::new(), FactoryOptions::default());
        factory.configure(Some(container().into_provider()));
        factory
    }

    #[test]
    fn test_configure_and_reset() {
        let factory = Factory::new(ImplementationRegistry::new(), FactoryOptions::default());
        assert!(!factory.is_configured());
        factory.configure(Some(container().into_provider()));
        assert!(factory.is_configured());
        factory.configure(None);
        assert!(!factory.is_configured());
    }

    #[test]
    fn test_unconfigured_injection_fails_without_mutation() {
        let factory = Factory::new(ImplementationRegistry::new(), FactoryOptions::default());
        let mut service = OrderService::default();
        let err = factory.inject_dependencies(&mut service).unwrap_err();
        assert!(err.is_configuration());
        assert!(service.repository.is_none());
        assert!(service.logger.is_none());
    }

    #[test]
    fn test_injects_only_marked_members() {
        let factory = configured();
        let mut service = OrderService::default();
        factory.inject_dependencies(&mut service).unwrap();
        assert_eq!(service.repository.as_ref().unwrap().name(), "sql");
        assert!(service.logger.is_some());
        assert!(service.audit.is_none());
    }

    #[test]
    fn test_second_injection_keeps_existing_values() {
        let factory = configured();
        let mut service = OrderService::default();
        factory.inject_dependencies(&mut service).unwrap();
        let logger = service.logger.clone().unwrap();

        factory.inject_dependencies(&mut service).unwrap();
        assert!(Arc::ptr_eq(&logger, service.logger.as_ref().unwrap()));
    }

    #[test]
    fn test_readonly_property_is_skipped() {
        let factory = configured();
        let mut subject = WithReadonlyProperty::default();
        factory.inject_dependencies(&mut subject).unwrap();
        assert!(subject.locked.is_none());
        assert!(subject.open.is_some());
    }

    #[test]
    fn test_scoped_service_reuses_request_scope() {
        let factory = configured();
        let mut first = SessionConsumer::default();
        let mut second = SessionConsumer::default();
        factory.inject_dependencies(&mut first).unwrap();
        factory.inject_dependencies(&mut second).unwrap();

        assert!(Arc::ptr_eq(
            first.session.as_ref().unwrap(),
            second.session.as_ref().unwrap()
        ));
        assert_eq!(factory.stats().active_scopes, 1);
    }

    #[test]
    fn test_disposing_request_scope_creates_fresh_scope_next_time() {
        let factory = configured();
        let mut first = SessionConsumer::default();
        factory.inject_dependencies(&mut first).unwrap();

        factory.dispose_request_scope();
        assert_eq!(factory.stats().active_scopes, 0);

        let mut second = SessionConsumer::default();
        factory.inject_dependencies(&mut second).unwrap();
        assert_ne!(
            first.session.as_ref().unwrap().serial,
            second.session.as_ref().unwrap().serial
        );
    }

    #[test]
    fn test_dispose_request_scope_without_scope_is_noop() {
        let factory = configured();
        factory.dispose_request_scope();
        assert_eq!(factory.stats().active_scopes, 0);
    }

    #[test]
    fn test_dispose_all_scopes_twice() {
        let factory = configured();
        factory.dispose_all_scopes();
        factory.dispose_all_scopes();
        assert!(factory.active_scopes().is_empty());
    }

    #[test]
    fn test_unrelated_container_errors_propagate() {
        let container = ContainerBuilder::new()
            .add_transient::<RequestSession, _>(|_| Err(InjectError::Internal("db down".into())))
            .build();
        let factory = Factory::new(ImplementationRegistry::new(), FactoryOptions::default());
        factory.configure(Some(container.into_provider()));

        let mut consumer = SessionConsumer::default();
        assert!(matches!(
            factory.inject_dependencies(&mut consumer),
            Err(InjectError::Internal(msg)) if msg == "db down"
        ));
        assert_eq!(factory.stats().active_scopes, 0);
    }

    #[test]
    fn test_missing_concrete_dependency_is_a_resolution_error() {
        let factory = Factory::new(ImplementationRegistry::new(), FactoryOptions::default());
        factory.configure(Some(Container::new().into_provider()));
        let mut consumer = SessionConsumer::default();
        match factory.inject_dependencies(&mut consumer) {
            Err(InjectError::Resolution { member, owner, .. }) => {
                assert_eq!(member, "session");
                assert!(owner.ends_with("SessionConsumer"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_marker_lookups_are_cached() {
        let factory = configured();
        let descriptor = OrderService::describe();
        assert!(factory.has_auto_inject_marker(&descriptor));
        assert!(factory.has_auto_inject_marker(&descriptor));
        assert!(!factory.has_auto_inject_marker(&SessionConsumer::describe()));
        assert_eq!(factory.stats().cached_markers, 2);
    }

    #[test]
    fn test_loggers() {
        let factory = configured();
        let typed = factory.get_logger::<OrderService>().unwrap();
        assert!(typed.category().ends_with("OrderService"));
        let by_type = factory
            .get_logger_for(&TypeInfo::of::<OrderService>())
            .unwrap();
        assert!(by_type.category().ends_with("OrderService"));
    }

    #[test]
    fn test_untyped_logger_falls_back_to_generic_logger() {
        let container = ContainerBuilder::new()
            .add_transient(|_| Ok(Logger::new("generic")))
            .build();
        let factory = Factory::new(ImplementationRegistry::new(), FactoryOptions::default());
        factory.configure(Some(container.into_provider()));

        let logger = factory.get_logger_for(&TypeInfo::of::<OrderService>()).unwrap();
        assert_eq!(logger.category(), "generic");
        assert!(factory.get_logger::<OrderService>().unwrap_err().is_resolution());
    }

    #[test]
    fn test_logger_requires_configuration() {
        let factory = Factory::new(ImplementationRegistry::new(), FactoryOptions::default());
        assert!(factory.get_logger::<OrderService>().unwrap_err().is_configuration());
        assert!(factory
            .get_logger_for(&TypeInfo::of::<OrderService>())
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn test_threads_of_one_request_share_one_scope() {
        let factory = configured();
        let sessions: Vec<Arc<RequestSession>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        RequestContext::sync_scope("shared", || {
                            let mut consumer = SessionConsumer::default();
                            factory.inject_dependencies(&mut consumer).unwrap();
                            consumer.session.unwrap()
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(factory.stats().active_scopes, 1);
        assert!(sessions.iter().all(|s| Arc::ptr_eq(s, &sessions[0])));
    }

    #[test]
    fn test_concurrent_discovery_caches_one_implementation() {
        let factory = Factory::new(
            ImplementationRegistry::new().with(crate::implementation!(dyn Ledger => MemoryLedger)),
            FactoryOptions::default(),
        );
        factory.configure(Some(container().into_provider()));

        std::thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    let mut consumer = LedgerConsumer::default();
                    factory.inject_dependencies(&mut consumer).unwrap();
                    assert!(consumer.ledger.is_some());
                });
            }
        });

        let stats = factory.stats();
        assert_eq!(stats.cached_implementations, 1);
        assert!(stats.registry_scans >= 1);
    }

    #[test]
    fn test_dispose_all_scopes_while_scopes_are_created() {
        let factory = configured();
        std::thread::scope(|s| {
            for i in 0..THREADS {
                let factory = &factory;
                s.spawn(move || {
                    RequestContext::sync_scope(format!("req-{i}"), || {
                        let mut consumer = SessionConsumer::default();
                        match factory.inject_dependencies(&mut consumer) {
                            Ok(()) => assert!(consumer.session.is_some()),
                            // swept between scope lookup and resolution
                            Err(InjectError::ScopeDisposed { .. }) => {}
                            Err(other) => panic!("unexpected error: {other}"),
                        }
                    })
                });
            }
            s.spawn(|| {
                for _ in 0..THREADS {
                    factory.dispose_all_scopes();
                }
            });
        });

        factory.dispose_all_scopes();
        assert_eq!(factory.stats().active_scopes, 0);
    }

    #[test]
    fn test_create_scope_may_call_back_into_the_factory() {
        let provider = Arc::new(ReentrantProvider {
            inner: container(),
            factory: OnceLock::new(),
            observed_scopes: AtomicUsize::new(usize::MAX),
        });
        let factory = Arc::new(Factory::new(
            ImplementationRegistry::new(),
            FactoryOptions::default(),
        ));
        factory.configure(Some(provider.clone() as Arc<dyn ServiceProvider>));
        assert!(provider.factory.set(factory.clone()).is_ok());

        let mut consumer = SessionConsumer::default();
        factory.inject_dependencies(&mut consumer).unwrap();

        assert!(consumer.session.is_some());
        assert_eq!(provider.observed_scopes.load(Ordering::SeqCst), 0);
        assert_eq!(factory.stats().active_scopes, 1);
    }
}
