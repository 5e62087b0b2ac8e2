//! Loggers handed out by the injection engine.
//!
//! A [`Logger`] is a category name plus a `tracing` span; every event it emits is
//! recorded inside that span with the category attached, so subscribers can filter
//! on either.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;
use tracing::Span;

#[derive(Clone)]
pub struct Logger {
    category: Arc<str>,
    span: Span,
}

impl Logger {
    pub fn new(category: impl Into<Arc<str>>) -> Self {
        let category = category.into();
        let span = tracing::info_span!("logger", category = %category);
        Self { category, span }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn debug(&self, message: impl fmt::Display) {
        let _entered = self.span.enter();
        tracing::debug!(category = %self.category, "{}", message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        let _entered = self.span.enter();
        tracing::info!(category = %self.category, "{}", message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        let _entered = self.span.enter();
        tracing::warn!(category = %self.category, "{}", message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        let _entered = self.span.enter();
        tracing::error!(category = %self.category, "{}", message);
    }
}

impl Default for Logger {
    /// A logger that has not been attached to any category yet.
    fn default() -> Self {
        Self {
            category: Arc::from(""),
            span: Span::none(),
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("category", &self.category)
            .finish()
    }
}

/// Logger whose category is the type `T`.
pub struct TypedLogger<T: ?Sized> {
    logger: Logger,
    _category: PhantomData<fn() -> T>,
}

impl<T: ?Sized> TypedLogger<T> {
    pub fn new() -> Self {
        Self {
            logger: Logger::new(std::any::type_name::<T>()),
            _category: PhantomData,
        }
    }

    pub fn into_inner(self) -> Logger {
        self.logger
    }
}

impl<T: ?Sized> Default for TypedLogger<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for TypedLogger<T> {
    fn clone(&self) -> Self {
        Self {
            logger: self.logger.clone(),
            _category: PhantomData,
        }
    }
}

impl<T: ?Sized> Deref for TypedLogger<T> {
    type Target = Logger;

    fn deref(&self) -> &Self::Target {
        &self.logger
    }
}

impl<T: ?Sized> fmt::Debug for TypedLogger<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.logger.fmt(f)
    }
}

/// Creates loggers by category; registered in the container by `add_logging()`.
#[derive(Debug, Clone, Default)]
pub struct LoggerFactory {
    prefix: Option<String>,
}

impl LoggerFactory {
    /// Prefix every category with `prefix` (e.g. an application name).
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    pub fn create(&self, category: &str) -> Logger {
        match &self.prefix {
            Some(prefix) => Logger::new(format!("{prefix}::{category}")),
            None => Logger::new(category),
        }
    }

    pub fn create_typed<T: ?Sized>(&self) -> TypedLogger<T> {
        TypedLogger {
            logger: self.create(std::any::type_name::<T>()),
            _category: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Billing;

    #[test]
    fn test_typed_logger_uses_type_name_as_category() {
        let logger = TypedLogger::<Billing>::new();
        assert!(logger.category().ends_with("logging::tests::Billing"));
    }

    #[test]
    fn test_factory_prefixes_categories() {
        let factory = LoggerFactory::with_prefix("shop");
        assert_eq!(factory.create("orders").category(), "shop::orders");
        assert!(factory.create_typed::<Billing>().category().starts_with("shop::"));
    }

    #[test]
    fn test_default_logger_is_detached() {
        let logger = Logger::default();
        assert_eq!(logger.category(), "");
        assert!(logger.span().is_none());
        logger.info("dropped without a span");
    }
}
