//! Handle registry: native object storage and identity
//!
//! Native objects live in a slot arena. A `Handle` carries the slot index,
//! the slot's generation at registration time, and an access tag; it never
//! carries a pointer. Destroying an object bumps the slot generation, so
//! every outstanding handle over it resolves to `DanglingHandle` from then
//! on. Ownership edges recorded with `adopt` cascade on destroy.

use crate::bridge::NativeObject;
use crate::error::{Error, Result};
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// Per-handle capability tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Reads, writes, and mutating method calls
    Mutable,
    /// Reads and const method calls only
    Const,
}

/// Slot identity: index plus generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RawHandle {
    index: u32,
    generation: u32,
}

/// A script-visible reference to a native object
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Handle {
    raw: RawHandle,
    access: Access,
    class: &'static str,
}

impl Handle {
    /// The access tag of this handle
    pub fn access(&self) -> Access {
        self.access
    }

    /// The class name of the referenced object
    pub fn class(&self) -> &'static str {
        self.class
    }

    /// True when this handle permits writes
    pub fn is_mutable(&self) -> bool {
        self.access == Access::Mutable
    }

    /// Check whether two handles reference the same object, regardless of
    /// their access tags
    pub fn same_identity(&self, other: &Handle) -> bool {
        self.raw == other.raw
    }

    /// A const-tagged handle over the same object
    pub fn as_const(&self) -> Handle {
        Handle {
            raw: self.raw,
            access: Access::Const,
            class: self.class,
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Handle({}#{}@{} {:?})",
            self.class, self.raw.index, self.raw.generation, self.access
        )
    }
}

struct Entry {
    object: Rc<dyn Any>,
    class: &'static str,
    /// Identities of objects this one owns; stale raws are skipped on cascade
    owned: Vec<RawHandle>,
}

struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// The handle registry
#[derive(Default)]
pub struct HandleRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl HandleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    /// True when no objects are live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a fresh native object, returning a handle with the requested
    /// access tag. The registry takes ownership; each object has exactly one
    /// bookkeeping entry for its whole life.
    pub fn register<T: NativeObject>(&mut self, object: T, access: Access) -> Handle {
        let class = object.class_name();
        let cell: Rc<RefCell<T>> = Rc::new(RefCell::new(object));
        self.insert(cell, class, access)
    }

    fn insert(&mut self, object: Rc<dyn Any>, class: &'static str, access: Access) -> Handle {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: None,
                });
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.entry = Some(Entry {
            object,
            class,
            owned: Vec::new(),
        });

        let handle = Handle {
            raw: RawHandle {
                index,
                generation: slot.generation,
            },
            access,
            class,
        };
        debug!(?handle, "registered native object");
        handle
    }

    fn live_entry(&self, handle: &Handle) -> Result<&Entry> {
        let slot = self
            .slots
            .get(handle.raw.index as usize)
            .ok_or_else(Error::dangling_handle)?;
        if slot.generation != handle.raw.generation {
            return Err(Error::dangling_handle());
        }
        slot.entry.as_ref().ok_or_else(Error::dangling_handle)
    }

    /// Resolve a handle to its object cell; fails with `DanglingHandle` when
    /// the object has been destroyed
    pub fn resolve(&self, handle: &Handle) -> Result<Rc<dyn Any>> {
        Ok(Rc::clone(&self.live_entry(handle)?.object))
    }

    /// Resolve and downcast to a concrete native type
    pub fn resolve_as<T: NativeObject>(&self, handle: &Handle) -> Result<Rc<RefCell<T>>> {
        let object = self.resolve(handle)?;
        object.downcast::<RefCell<T>>().map_err(|_| {
            Error::InternalError(format!(
                "handle class '{}' does not match the requested native type",
                handle.class
            ))
        })
    }

    /// True when the handle still resolves
    pub fn is_live(&self, handle: &Handle) -> bool {
        self.live_entry(handle).is_ok()
    }

    /// The class name recorded for a live handle
    pub fn class_of(&self, handle: &Handle) -> Result<&'static str> {
        Ok(self.live_entry(handle)?.class)
    }

    /// Check whether two handles reference the same object
    pub fn same_identity(&self, a: &Handle, b: &Handle) -> bool {
        a.same_identity(b)
    }

    /// Mint a handle with a different access tag over the same identity.
    /// Never creates a new bookkeeping entry. Widening a const handle to
    /// mutable is refused.
    pub fn alias(&self, handle: &Handle, access: Access) -> Result<Handle> {
        self.live_entry(handle)?;
        if handle.access == Access::Const && access == Access::Mutable {
            return Err(Error::access_violation(
                "cannot obtain a mutable handle from a const handle",
            ));
        }
        trace!(?handle, ?access, "aliased handle");
        Ok(Handle {
            raw: handle.raw,
            access,
            class: handle.class,
        })
    }

    /// Record that `parent` owns `child`: destroying the parent destroys the
    /// child as well
    pub fn adopt(&mut self, parent: &Handle, child: &Handle) -> Result<()> {
        let slot = self
            .slots
            .get_mut(parent.raw.index as usize)
            .ok_or_else(Error::dangling_handle)?;
        if slot.generation != parent.raw.generation {
            return Err(Error::dangling_handle());
        }
        let entry = slot.entry.as_mut().ok_or_else(Error::dangling_handle)?;
        entry.owned.push(child.raw);
        Ok(())
    }

    /// Remove an ownership edge: the child keeps living but no longer dies
    /// with the parent
    pub fn release(&mut self, parent: &Handle, child: &Handle) -> Result<()> {
        let slot = self
            .slots
            .get_mut(parent.raw.index as usize)
            .ok_or_else(Error::dangling_handle)?;
        if slot.generation != parent.raw.generation {
            return Err(Error::dangling_handle());
        }
        let entry = slot.entry.as_mut().ok_or_else(Error::dangling_handle)?;
        entry.owned.retain(|raw| *raw != child.raw);
        Ok(())
    }

    /// Destroy an object, invalidating every outstanding handle over it and
    /// cascading to its owned children
    pub fn destroy(&mut self, handle: &Handle) -> Result<()> {
        self.destroy_raw(handle.raw)
    }

    fn destroy_raw(&mut self, raw: RawHandle) -> Result<()> {
        let slot = self
            .slots
            .get_mut(raw.index as usize)
            .ok_or_else(Error::dangling_handle)?;
        if slot.generation != raw.generation {
            return Err(Error::dangling_handle());
        }
        let entry = slot.entry.take().ok_or_else(Error::dangling_handle)?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(raw.index);
        debug!(index = raw.index, class = entry.class, "destroyed native object");

        // Owned lists may contain raws already destroyed through other paths
        for child in entry.owned {
            let _ = self.destroy_raw(child);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        value: i64,
    }

    impl NativeObject for Probe {
        fn class_name(&self) -> &'static str {
            "probe"
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = HandleRegistry::new();
        let handle = registry.register(Probe { value: 7 }, Access::Mutable);
        let cell = registry.resolve_as::<Probe>(&handle).unwrap();
        assert_eq!(cell.borrow().value, 7);
        assert_eq!(handle.class(), "probe");
    }

    #[test]
    fn test_aliasing_shares_identity() {
        let mut registry = HandleRegistry::new();
        let h1 = registry.register(Probe { value: 1 }, Access::Mutable);
        let h2 = registry.alias(&h1, Access::Const).unwrap();
        assert!(registry.same_identity(&h1, &h2));
        assert_eq!(h2.access(), Access::Const);

        // Writes through one are visible through the other
        registry.resolve_as::<Probe>(&h1).unwrap().borrow_mut().value = 42;
        assert_eq!(registry.resolve_as::<Probe>(&h2).unwrap().borrow().value, 42);
    }

    #[test]
    fn test_alias_refuses_widening() {
        let mut registry = HandleRegistry::new();
        let h = registry.register(Probe { value: 1 }, Access::Const);
        let err = registry.alias(&h, Access::Mutable).unwrap_err();
        assert_eq!(err.script_name(), "AccessViolation");
    }

    #[test]
    fn test_destroy_invalidates_handles() {
        let mut registry = HandleRegistry::new();
        let h1 = registry.register(Probe { value: 1 }, Access::Mutable);
        let h2 = registry.alias(&h1, Access::Const).unwrap();
        registry.destroy(&h1).unwrap();

        assert!(registry.resolve(&h1).is_err());
        assert!(registry.resolve(&h2).is_err());
        assert_eq!(
            registry.resolve(&h2).unwrap_err().script_name(),
            "DanglingHandle"
        );
    }

    #[test]
    fn test_slot_reuse_does_not_resurrect() {
        let mut registry = HandleRegistry::new();
        let old = registry.register(Probe { value: 1 }, Access::Mutable);
        registry.destroy(&old).unwrap();

        // Reuses the slot with a bumped generation
        let fresh = registry.register(Probe { value: 2 }, Access::Mutable);
        assert!(registry.resolve(&old).is_err());
        assert!(!old.same_identity(&fresh));
        assert_eq!(
            registry.resolve_as::<Probe>(&fresh).unwrap().borrow().value,
            2
        );
    }

    #[test]
    fn test_destroy_cascades_to_owned_children() {
        let mut registry = HandleRegistry::new();
        let parent = registry.register(Probe { value: 1 }, Access::Mutable);
        let child = registry.register(Probe { value: 2 }, Access::Mutable);
        registry.adopt(&parent, &child).unwrap();

        registry.destroy(&parent).unwrap();
        assert!(registry.resolve(&child).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_release_breaks_ownership_edge() {
        let mut registry = HandleRegistry::new();
        let parent = registry.register(Probe { value: 1 }, Access::Mutable);
        let child = registry.register(Probe { value: 2 }, Access::Mutable);
        registry.adopt(&parent, &child).unwrap();
        registry.release(&parent, &child).unwrap();

        registry.destroy(&parent).unwrap();
        assert!(registry.resolve(&child).is_ok());
    }

    #[test]
    fn test_len_counts_live_objects() {
        let mut registry = HandleRegistry::new();
        assert!(registry.is_empty());
        let a = registry.register(Probe { value: 1 }, Access::Mutable);
        let _b = registry.register(Probe { value: 2 }, Access::Mutable);
        assert_eq!(registry.len(), 2);
        registry.destroy(&a).unwrap();
        assert_eq!(registry.len(), 1);
    }
}
