use crate::di::container::{Container, Lifetime};
use crate::di::key::{Instance, ServiceKey};
use crate::di::provider::{ServiceProvider, ServiceScope};
use crate::error::{InjectError, Result};
use dashmap::DashMap;
use std::any::TypeId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Child scope of a [`Container`].
///
/// Scoped services are created once per scope; singletons are delegated to the
/// root container and transients are created with the scope as their resolver.
pub struct ContainerScope {
    id: Uuid,
    root: Container,
    scoped: DashMap<TypeId, Instance>,
    // creation order, disposed in reverse
    created: Mutex<Vec<TypeId>>,
    disposed: AtomicBool,
}

impl ContainerScope {
    pub(crate) fn new(root: Container) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(scope = %id, "created container scope");
        Self {
            id,
            root,
            scoped: DashMap::new(),
            created: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(InjectError::ScopeDisposed {
                scope: self.id.to_string(),
            });
        }
        Ok(())
    }
}

impl ServiceProvider for ContainerScope {
    fn get_service(&self, key: &ServiceKey) -> Result<Option<Instance>> {
        self.ensure_alive()?;
        let Some(descriptor) = self.root.descriptor(key) else {
            return Ok(None);
        };
        match descriptor.lifetime {
            Lifetime::Singleton => self.root.singleton(&descriptor).map(Some),
            Lifetime::Transient => (descriptor.factory)(self).map(Some),
            Lifetime::Scoped => {
                let id = key.type_id();
                if let Some(existing) = self.scoped.get(&id) {
                    return Ok(Some(existing.value().clone()));
                }
                let created = (descriptor.factory)(self)?;
                let stored = self.scoped.entry(id).or_insert_with(|| {
                    self.created
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(id);
                    created
                });
                Ok(Some(stored.value().clone()))
            }
        }
    }

    fn create_scope(&self) -> Arc<dyn ServiceScope> {
        self.root.create_scope()
    }

    fn root(&self) -> Arc<dyn ServiceProvider> {
        Arc::new(self.root.clone())
    }
}

impl ServiceScope for ContainerScope {
    fn provider(&self) -> &dyn ServiceProvider {
        self
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let created =
            std::mem::take(&mut *self.created.lock().unwrap_or_else(PoisonError::into_inner));
        for id in created.iter().rev() {
            let Some((_, instance)) = self.scoped.remove(id) else {
                continue;
            };
            let disposer = self
                .root
                .inner
                .services
                .get(id)
                .and_then(|entry| entry.disposer.clone());
            if let Some(disposer) = disposer {
                disposer(&instance);
            }
        }
        self.scoped.clear();
        tracing::debug!(scope = %self.id, disposed = created.len(), "disposed container scope");
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}
