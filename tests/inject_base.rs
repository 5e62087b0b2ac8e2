use autoinject::{
    ContainerBuilder, Factory, ImplementationRegistry, InjectBase, InjectError, Injectable,
    LoggerFactory, TypedLogger,
};
use std::sync::Arc;

#[derive(Debug)]
struct Clock;

#[derive(Debug, Default, Injectable)]
struct ReportJob {
    #[inject_base]
    base: InjectBase,
    #[injectable]
    clock: Option<Arc<Clock>>,
    ready: bool,
}

#[derive(Debug, Default, Injectable)]
struct PlainJob {
    #[injectable]
    clock: Option<Arc<Clock>>,
}

fn factory(builder: ContainerBuilder) -> Factory {
    let factory = Factory::new(ImplementationRegistry::new(), Default::default());
    builder.register(Clock).build_and_configure(&factory);
    factory
}

#[test]
fn test_construct_injects_and_attaches_logger() {
    let factory = factory(ContainerBuilder::new().add_logging());
    let job: ReportJob = InjectBase::construct(&factory).unwrap();

    assert!(job.clock.is_some());
    assert!(job.base.logger().category().ends_with("ReportJob"));
}

#[test]
fn test_initializer_sees_injected_members() {
    let factory = factory(ContainerBuilder::new().add_logging());
    let job: ReportJob = InjectBase::construct_with(&factory, |job: &mut ReportJob| {
        job.ready = job.clock.is_some();
        Ok(())
    })
    .unwrap();
    assert!(job.ready);
}

#[test]
fn test_logger_factory_prefix_is_applied() {
    let factory = factory(ContainerBuilder::new().register(LoggerFactory::with_prefix("billing")));
    let job: ReportJob = InjectBase::construct(&factory).unwrap();
    assert!(job.base.logger().category().starts_with("billing::"));
}

#[test]
fn test_missing_logger_is_a_resolution_error() {
    let factory = factory(ContainerBuilder::new());
    let err = InjectBase::construct::<ReportJob>(&factory).unwrap_err();
    assert!(err.is_resolution());
}

#[test]
fn test_types_without_base_are_rejected() {
    let factory = factory(ContainerBuilder::new().add_logging());
    let err = InjectBase::construct::<PlainJob>(&factory).unwrap_err();
    assert!(matches!(err, InjectError::Configuration { .. }));
}

#[test]
fn test_unconfigured_factory_is_reported() {
    let factory = Factory::new(ImplementationRegistry::new(), Default::default());
    let err = InjectBase::construct::<ReportJob>(&factory).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_registered_typed_logger_is_preferred() {
    let factory = factory(
        ContainerBuilder::new()
            .add_logging()
            .add_singleton(|_| Ok(TypedLogger::<ReportJob>::new())),
    );
    let logger = factory.get_logger::<ReportJob>().unwrap();
    assert!(logger.category().ends_with("ReportJob"));
}
