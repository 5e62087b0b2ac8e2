use crate::di::key::{downcast, Instance, ServiceKey};
use crate::error::{InjectError, Result};
use std::sync::Arc;

/// Host container abstraction the injection engine layers on top of.
///
/// Implementations must return `Ok(None)` for unregistered keys and
/// [`InjectError::LifetimeMismatch`] when a scoped registration is resolved
/// outside of any scope. Every other error is propagated unchanged by the engine.
pub trait ServiceProvider: Send + Sync {
    fn get_service(&self, key: &ServiceKey) -> Result<Option<Instance>>;

    /// Create a child scope resolving scoped services once per scope.
    fn create_scope(&self) -> Arc<dyn ServiceScope>;

    /// The root provider this provider belongs to (itself when already root).
    fn root(&self) -> Arc<dyn ServiceProvider>;
}

/// A child resolution scope owned by whoever created it.
pub trait ServiceScope: Send + Sync {
    fn provider(&self) -> &dyn ServiceProvider;

    /// Release scoped instances. Only the first call has an effect.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

impl dyn ServiceProvider + '_ {
    /// Resolve `T`, returning `None` when it is not registered.
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>> {
        self.resolve_keyed::<T>(&ServiceKey::of::<T>())
    }

    /// Resolve `T` or fail with [`InjectError::DependencyNotFound`].
    pub fn resolve_required<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.resolve::<T>()?
            .ok_or_else(|| InjectError::DependencyNotFound {
                type_name: std::any::type_name::<T>().to_string(),
            })
    }

    pub(crate) fn resolve_keyed<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: &ServiceKey,
    ) -> Result<Option<Arc<T>>> {
        match self.get_service(key)? {
            Some(instance) => downcast::<T>(&instance)
                .map(Some)
                .ok_or_else(|| InjectError::DowncastFailed {
                    type_name: key.type_name().to_string(),
                }),
            None => Ok(None),
        }
    }
}
