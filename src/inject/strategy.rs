//! The ordered fallback chain used to satisfy a single service key.

use crate::di::{Instance, ServiceKey, ServiceProvider};
use crate::error::Result;
use crate::inject::factory::Factory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Resolve from the configured root provider.
    Root,
    /// Resolve from the current request's scope; only after the root reported
    /// a lifetime mismatch.
    RequestScope,
    /// Instantiate a registered implementation of an unregistered trait.
    AutoDiscovery,
}

pub const RESOLUTION_CHAIN: [Strategy; 3] = [
    Strategy::Root,
    Strategy::RequestScope,
    Strategy::AutoDiscovery,
];

pub enum Attempt {
    Found(Instance),
    Absent,
    /// The root refused a scoped service; later strategies may use a scope.
    RequiresScope,
}

impl Strategy {
    pub(crate) fn attempt(
        self,
        factory: &Factory,
        provider: &dyn ServiceProvider,
        key: &ServiceKey,
        scope_required: bool,
    ) -> Result<Attempt> {
        match self {
            Strategy::Root => match provider.get_service(key) {
                Ok(Some(instance)) => Ok(Attempt::Found(instance)),
                Ok(None) => Ok(Attempt::Absent),
                Err(e) if e.is_lifetime_mismatch() => {
                    tracing::debug!(service = key.type_name(), "root refused scoped service");
                    Ok(Attempt::RequiresScope)
                }
                Err(e) => Err(e),
            },
            Strategy::RequestScope => {
                if !scope_required {
                    return Ok(Attempt::Absent);
                }
                let scope = factory.request_scope(provider);
                Ok(scope
                    .provider()
                    .get_service(key)?
                    .map_or(Attempt::Absent, Attempt::Found))
            }
            Strategy::AutoDiscovery => {
                if !key.is_trait() {
                    return Ok(Attempt::Absent);
                }
                Ok(factory
                    .auto_resolve(provider, key)?
                    .map_or(Attempt::Absent, Attempt::Found))
            }
        }
    }
}
