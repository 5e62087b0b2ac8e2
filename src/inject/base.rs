use crate::error::{InjectError, Result};
use crate::inject::factory::Factory;
use crate::inject::marker::Injectable;
use crate::logging::Logger;

/// Construction hook for types that embed it.
///
/// A struct opts in by deriving [`Injectable`] and marking a field of this type
/// with `#[inject_base]`. Building it through [`InjectBase::construct`] injects
/// every `#[injectable]` member and attaches a logger for the runtime type, before
/// any type-specific initialization runs.
///
/// ```
/// use autoinject::{ContainerBuilder, Factory, ImplementationRegistry, InjectBase, Injectable};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Clock;
///
/// #[derive(Default, Injectable)]
/// struct ReportJob {
///     #[inject_base]
///     base: InjectBase,
///     #[injectable]
///     clock: Option<Arc<Clock>>,
/// }
///
/// let factory = Factory::new(ImplementationRegistry::new(), Default::default());
/// factory.configure(Some(
///     ContainerBuilder::new().register(Clock).add_logging().build().into_provider(),
/// ));
///
/// let job: ReportJob = InjectBase::construct(&factory).unwrap();
/// assert!(job.clock.is_some());
/// assert!(job.base.logger().category().ends_with("ReportJob"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct InjectBase {
    logger: Logger,
}

impl InjectBase {
    /// Logger for the embedding type; detached until the hook has run.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn construct<T: Injectable + Default>(factory: &Factory) -> Result<T> {
        Self::construct_with(factory, |_| Ok(()))
    }

    /// Construct `T`, run the hook, then run `init` on the injected instance.
    pub fn construct_with<T, F>(factory: &Factory, init: F) -> Result<T>
    where
        T: Injectable + Default,
        F: FnOnce(&mut T) -> Result<()>,
    {
        let mut instance = T::default();
        Self::run_hook(factory, &mut instance)?;
        init(&mut instance)?;
        Ok(instance)
    }

    /// Inject `instance` and attach its logger.
    pub(crate) fn run_hook(factory: &Factory, instance: &mut dyn Injectable) -> Result<()> {
        let descriptor = instance.descriptor();
        if !descriptor.inject_base {
            return Err(InjectError::configuration(format!(
                "{} does not embed an #[inject_base] field",
                descriptor.info.name
            )));
        }
        factory.inject_dependencies(instance)?;
        let logger = factory.get_logger_for(&descriptor.info)?;
        if let Some(base) = instance.inject_base() {
            base.logger = logger;
        }
        Ok(())
    }
}
