//! Generic typed handle storage, shared by every object type the device tracks.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Error;
use crate::handle::{HandleId, ObjectType, Shared};

/// A thread-safe map from handle id to the layer's shared object for a single Vulkan object
/// type. Every `Device` field that tracks a given object type (buffers, images, descriptor
/// sets, ...) is one of these.
///
/// Insertion happens at `vkCreate*`/`vkAllocate*` time, removal at `vkDestroy*`/`vkFree*` time.
/// Because entries are `Shared<T>` (`Arc`), removing an entry here does not necessarily drop
/// the object immediately: submissions or GUI views may be holding their own clone (§3).
#[derive(Debug)]
pub struct HandleMap<T> {
    object_type: ObjectType,
    entries: RwLock<HashMap<HandleId, Shared<T>>>,
}

impl<T> HandleMap<T> {
    pub fn new(object_type: ObjectType) -> Self {
        Self {
            object_type,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register a newly created object under `id`, returning the shared handle to it.
    pub fn insert(&self, id: HandleId, value: T) -> Shared<T> {
        let shared = Shared::new(value);
        self.entries.write().unwrap().insert(id, shared.clone());
        shared
    }

    /// Look up a tracked object by id.
    pub fn get(&self, id: HandleId) -> Result<Shared<T>, Error> {
        self.entries
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(Error::UnknownHandle(id, self.object_type))
    }

    /// Remove an object from the registry. The returned `Shared<T>` may still have other
    /// strong references outstanding; dropping it here only releases the registry's own
    /// reference.
    pub fn remove(&self, id: HandleId) -> Result<Shared<T>, Error> {
        self.entries
            .write()
            .unwrap()
            .remove(&id)
            .ok_or(Error::UnknownHandle(id, self.object_type))
    }

    /// Number of currently registered objects of this type.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot the currently registered handles. Used by introspection callers that need a
    /// stable view to iterate without holding the registry lock (e.g. a GUI listing all live
    /// buffers).
    pub fn snapshot(&self) -> Vec<Shared<T>> {
        self.entries.read().unwrap().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_round_trips() {
        let map: HandleMap<u32> = HandleMap::new(ObjectType::Buffer);
        let handle = map.insert(1, 42);
        assert_eq!(*map.get(1).unwrap(), 42);
        assert_eq!(*handle, 42);
    }

    #[test]
    fn get_missing_errors() {
        let map: HandleMap<u32> = HandleMap::new(ObjectType::Image);
        assert!(matches!(map.get(7), Err(Error::UnknownHandle(7, ObjectType::Image))));
    }

    #[test]
    fn remove_drops_registry_reference_but_not_outstanding_ones() {
        let map: HandleMap<u32> = HandleMap::new(ObjectType::Buffer);
        let handle = map.insert(1, 42);
        let removed = map.remove(1).unwrap();
        assert_eq!(*removed, 42);
        assert_eq!(*handle, 42);
        assert!(map.get(1).is_err());
    }
}
