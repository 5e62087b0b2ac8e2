use crate::error::Result;
use crate::inject::factory::Factory;
use crate::inject::marker::Injectable;

/// Entry point for container-created instances.
///
/// Runs the engine's injection pass only for types carrying `#[auto_inject]`;
/// marker lookups go through the factory's marker cache.
pub struct AutoInjectInterceptor<'a> {
    factory: &'a Factory,
}

impl<'a> AutoInjectInterceptor<'a> {
    pub fn new(factory: &'a Factory) -> Self {
        Self { factory }
    }

    /// Inject `instance` if its type is marked.
    ///
    /// Returns `Ok(false)` without touching anything for `None` or an unmarked type.
    pub fn process_if_marked(&self, instance: Option<&mut dyn Injectable>) -> Result<bool> {
        let Some(instance) = instance else {
            return Ok(false);
        };
        let descriptor = instance.descriptor();
        if !self.factory.has_auto_inject_marker(&descriptor) {
            return Ok(false);
        }
        self.factory.inject_dependencies(instance)?;
        Ok(true)
    }
}
