use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A type-erased service instance.
///
/// The erased value is always an `Arc<T>` (where `T` may be unsized, e.g. `dyn Trait`),
/// so that trait objects and concrete services share one representation.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Erase a shared service into an [`Instance`].
pub fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Instance {
    Arc::new(value)
}

/// Recover the `Arc<T>` stored in an [`Instance`].
pub fn downcast<T: ?Sized + Send + Sync + 'static>(instance: &Instance) -> Option<Arc<T>> {
    instance.downcast_ref::<Arc<T>>().cloned()
}

/// Identity of a Rust type at runtime.
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub id: TypeId,
    pub name: &'static str,
}

impl TypeInfo {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The name without its module path.
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// A concrete struct or enum.
    Concrete,
    /// A `dyn Trait` capability; the only kind eligible for auto-discovery.
    Trait,
}

/// Key under which a service is registered and resolved.
#[derive(Debug, Clone, Copy)]
pub struct ServiceKey {
    info: TypeInfo,
    kind: KeyKind,
}

impl ServiceKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            info: TypeInfo::of::<T>(),
            kind: KeyKind::Concrete,
        }
    }

    pub fn of_trait<T: ?Sized + 'static>() -> Self {
        Self {
            info: TypeInfo::of::<T>(),
            kind: KeyKind::Trait,
        }
    }

    /// Key whose kind is inferred from the type name (`dyn ...` is a trait).
    pub fn new(info: TypeInfo, kind: KeyKind) -> Self {
        Self { info, kind }
    }

    pub fn inferred<T: ?Sized + 'static>() -> Self {
        let info = TypeInfo::of::<T>();
        let kind = if info.name.starts_with("dyn ") {
            KeyKind::Trait
        } else {
            KeyKind::Concrete
        };
        Self { info, kind }
    }

    pub fn type_id(&self) -> TypeId {
        self.info.id
    }

    pub fn type_name(&self) -> &'static str {
        self.info.name
    }

    pub fn info(&self) -> TypeInfo {
        self.info
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn is_trait(&self) -> bool {
        self.kind == KeyKind::Trait
    }

    /// Module path of the keyed type, e.g. `app::repo` for `dyn app::repo::Repository`.
    pub fn module_path(&self) -> &'static str {
        let name = self.info.name.trim_start_matches("dyn ");
        // drop auto-trait bounds such as `+ core::marker::Send`
        let name = name.split(" + ").next().unwrap_or(name);
        let base = name.split('<').next().unwrap_or(name);
        match base.rfind("::") {
            Some(idx) => &base[..idx],
            None => "",
        }
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.info.id == other.info.id
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.info.id.hash(state);
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info.name)
    }
}

fn short_type_name(name: &'static str) -> &'static str {
    let base = name.split('<').next().unwrap_or(name);
    match base.rfind("::") {
        Some(idx) => &name[idx + 2..],
        None => name,
    }
}
