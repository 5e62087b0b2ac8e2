//! Markers and member descriptors produced by `#[derive(Injectable)]`.
//!
//! ```
//! use autoinject::Injectable;
//! use std::sync::Arc;
//!
//! pub trait Mailer: Send + Sync {}
//!
//! #[derive(Default, Injectable)]
//! #[auto_inject]
//! pub struct SignupService {
//!     #[injectable]
//!     mailer: Option<Arc<dyn Mailer>>,
//!     // not a member candidate: no marker
//!     audit: Option<Arc<dyn Mailer>>,
//! }
//! ```

use crate::di::{downcast, Instance, ServiceKey, TypeInfo};
use crate::inject::base::InjectBase;
use std::sync::Arc;

/// Runtime identity of an injectable type together with its class-level markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub info: TypeInfo,
    /// Carries `#[auto_inject]`.
    pub auto_inject: bool,
    /// Embeds an [`InjectBase`] via `#[inject_base]`.
    pub inject_base: bool,
}

impl TypeDescriptor {
    pub fn of<T: 'static>(auto_inject: bool, inject_base: bool) -> Self {
        Self {
            info: TypeInfo::of::<T>(),
            auto_inject,
            inject_base,
        }
    }
}

/// A type whose members can be populated by the injection engine.
pub trait Injectable: Send + Sync + 'static {
    /// Static descriptor, available without an instance.
    fn describe() -> TypeDescriptor
    where
        Self: Sized;

    /// Descriptor of the runtime type behind `self`.
    fn descriptor(&self) -> TypeDescriptor;

    /// Member candidates in a stable order: properties first, then fields.
    fn members(&mut self) -> Vec<Member<'_>>;

    fn inject_base(&mut self) -> Option<&mut InjectBase> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Fields are always writable, whatever their declared mutability.
    Field,
    Property { writable: bool },
}

/// Storage a member value can be written into.
pub trait Slot {
    fn is_populated(&self) -> bool;

    /// Store `instance`; returns `false` if it is not of the slot's type.
    fn populate(&mut self, instance: &Instance) -> bool;
}

impl<T: ?Sized + Send + Sync + 'static> Slot for Option<Arc<T>> {
    fn is_populated(&self) -> bool {
        self.is_some()
    }

    fn populate(&mut self, instance: &Instance) -> bool {
        match downcast::<T>(instance) {
            Some(value) => {
                *self = Some(value);
                true
            }
            None => false,
        }
    }
}

/// Descriptor of one member of an [`Injectable`] instance.
pub struct Member<'a> {
    name: &'static str,
    kind: MemberKind,
    key: ServiceKey,
    injectable: bool,
    slot: &'a mut dyn Slot,
}

impl<'a> Member<'a> {
    pub fn field(
        name: &'static str,
        key: ServiceKey,
        injectable: bool,
        slot: &'a mut dyn Slot,
    ) -> Self {
        Self {
            name,
            kind: MemberKind::Field,
            key,
            injectable,
            slot,
        }
    }

    pub fn property(
        name: &'static str,
        key: ServiceKey,
        injectable: bool,
        writable: bool,
        slot: &'a mut dyn Slot,
    ) -> Self {
        Self {
            name,
            kind: MemberKind::Property { writable },
            key,
            injectable,
            slot,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    pub fn is_injectable(&self) -> bool {
        self.injectable
    }

    pub fn is_writable(&self) -> bool {
        match self.kind {
            MemberKind::Field => true,
            MemberKind::Property { writable } => writable,
        }
    }

    pub fn is_populated(&self) -> bool {
        self.slot.is_populated()
    }

    pub(crate) fn populate(&mut self, instance: &Instance) -> bool {
        self.slot.populate(instance)
    }
}

impl std::fmt::Debug for Member<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("injectable", &self.injectable)
            .field("populated", &self.slot.is_populated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::erase;

    trait Clock: Send + Sync {}
    struct SystemClock;
    impl Clock for SystemClock {}

    #[test]
    fn test_option_arc_slot_accepts_matching_instance() {
        let mut slot: Option<Arc<dyn Clock>> = None;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        assert!(slot.populate(&erase(clock)));
        assert!(slot.is_populated());
    }

    #[test]
    fn test_option_arc_slot_rejects_other_types() {
        let mut slot: Option<Arc<dyn Clock>> = None;
        assert!(!slot.populate(&erase(Arc::new(5_u32))));
        assert!(!slot.is_populated());
    }

    #[test]
    fn test_readonly_property_is_not_writable() {
        let mut slot: Option<Arc<dyn Clock>> = None;
        let member = Member::property(
            "clock",
            ServiceKey::of_trait::<dyn Clock>(),
            true,
            false,
            &mut slot,
        );
        assert!(!member.is_writable());
        let mut other: Option<Arc<dyn Clock>> = None;
        let field = Member::field("clock", ServiceKey::of_trait::<dyn Clock>(), true, &mut other);
        assert!(field.is_writable());
    }
}
