use std::collections::HashMap;

use glam::{UVec3, Vec3};
use rubble_core::types::WorldCoord;

use crate::object::{ObjectId, SeparatedObject};

/// Lightweight description of a separated object for collaborators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeparatedObjectRef {
    pub id: ObjectId,
    /// World cell the object's local origin came from.
    pub origin: WorldCoord,
    pub position: Vec3,
    pub dims: UVec3,
    pub cell_count: u32,
}

impl From<&SeparatedObject> for SeparatedObjectRef {
    fn from(object: &SeparatedObject) -> Self {
        Self {
            id: object.id(),
            origin: object.origin(),
            position: object.position(),
            dims: object.grid().dims(),
            cell_count: object.cell_count(),
        }
    }
}

/// Spawns and despawns bodies for separated objects.
pub trait SeparationListener {
    fn objects_created(&mut self, objects: &[SeparatedObjectRef]);
    fn object_removed(&mut self, id: ObjectId);
}

/// Listener that records what it is told.
#[derive(Debug, Default)]
pub struct RecordingSeparationListener {
    pub created: Vec<SeparatedObjectRef>,
    pub removed: Vec<ObjectId>,
}

impl SeparationListener for RecordingSeparationListener {
    fn objects_created(&mut self, objects: &[SeparatedObjectRef]) {
        self.created.extend_from_slice(objects);
    }

    fn object_removed(&mut self, id: ObjectId) {
        self.removed.push(id);
    }
}

fn notify_removed(listener: Option<&mut (dyn SeparationListener + '_)>, id: ObjectId) {
    match listener {
        Some(listener) => listener.object_removed(id),
        None => log::debug!("Object {id} removed with no separation listener attached"),
    }
}

/// Every live separated object, keyed by id.
#[derive(Debug, Default)]
pub struct SeparatedObjectRegistry {
    objects: HashMap<ObjectId, SeparatedObject>,
    next_id: ObjectId,
}

impl SeparatedObjectRegistry {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            next_id: 1,
        }
    }

    /// Reserve an id for an object about to be built.
    pub fn allocate_id(&mut self) -> ObjectId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    pub fn insert(&mut self, object: SeparatedObject) -> SeparatedObjectRef {
        let reference = SeparatedObjectRef::from(&object);
        self.objects.insert(object.id(), object);
        reference
    }

    /// Remove an object on request, telling the listener.
    pub fn remove(
        &mut self,
        id: ObjectId,
        listener: Option<&mut (dyn SeparationListener + '_)>,
    ) -> Option<SeparatedObject> {
        let object = self.objects.remove(&id)?;
        notify_removed(listener, id);
        Some(object)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SeparatedObject> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SeparatedObject> {
        self.objects.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeparatedObject> {
        self.objects.values()
    }

    /// Objects whose bounding sphere overlaps the query sphere.
    pub fn query_in_range(&self, center: Vec3, radius: f32) -> Vec<SeparatedObjectRef> {
        let radius = radius.max(0.0);
        let mut found: Vec<SeparatedObjectRef> = self
            .objects
            .values()
            .filter(|object| {
                let reach = radius + object.size().length() * 0.5;
                object.center().distance_squared(center) <= reach * reach
            })
            .map(SeparatedObjectRef::from)
            .collect();
        found.sort_by_key(|r| r.id);
        found
    }

    /// Advance every object's timer and drop the expired ones.
    pub fn tick(
        &mut self,
        dt: f32,
        mut listener: Option<&mut (dyn SeparationListener + '_)>,
    ) -> Vec<ObjectId> {
        let mut expired: Vec<ObjectId> = self
            .objects
            .values_mut()
            .filter_map(|object| object.tick(dt).then_some(object.id()))
            .collect();
        expired.sort_unstable();
        for id in &expired {
            self.objects.remove(id);
            notify_removed(listener.as_deref_mut(), *id);
        }
        if !expired.is_empty() {
            log::debug!("Removed {} expired object(s)", expired.len());
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::VoxelGrid;
    use glam::IVec3;
    use rubble_core::config::ObjectConfig;
    use rubble_core::math::CellSpace;
    use rubble_core::types::Voxel;

    fn object(registry: &mut SeparatedObjectRegistry, origin: IVec3, cells: u32) -> SeparatedObject {
        let mut grid = VoxelGrid::new(UVec3::new(cells, 1, 1));
        for x in 0..cells {
            grid.set(IVec3::new(x as i32, 0, 0), Voxel::solid(1));
        }
        SeparatedObject::new(
            registry.allocate_id(),
            origin,
            grid,
            CellSpace::new(1.0),
            ObjectConfig {
                low_count_threshold: 2,
                low_count_timeout_secs: 1.0,
            },
        )
    }

    #[test]
    fn test_query_in_range() {
        let mut registry = SeparatedObjectRegistry::new();
        let near = object(&mut registry, IVec3::new(0, 0, 0), 4);
        let far = object(&mut registry, IVec3::new(100, 0, 0), 4);
        let near = registry.insert(near);
        registry.insert(far);

        let found = registry.query_in_range(Vec3::new(2.0, 0.5, 0.5), 1.0);
        assert_eq!(found, vec![near]);
        assert_eq!(registry.query_in_range(Vec3::new(50.0, 0.0, 0.0), 200.0).len(), 2);
        assert!(registry.query_in_range(Vec3::new(50.0, 50.0, 0.0), 1.0).is_empty());
    }

    #[test]
    fn test_tick_removes_expired_and_notifies() {
        let mut registry = SeparatedObjectRegistry::new();
        let big = object(&mut registry, IVec3::ZERO, 5);
        let small = object(&mut registry, IVec3::new(0, 10, 0), 1);
        let small_id = small.id();
        registry.insert(big);
        registry.insert(small);

        let mut listener = RecordingSeparationListener::default();
        assert!(registry.tick(0.5, Some(&mut listener)).is_empty());
        assert_eq!(registry.tick(0.6, Some(&mut listener)), vec![small_id]);
        assert_eq!(listener.removed, vec![small_id]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_explicit_remove() {
        let mut registry = SeparatedObjectRegistry::new();
        let obj = object(&mut registry, IVec3::ZERO, 5);
        let id = registry.insert(obj).id;
        assert!(registry.remove(id, None).is_some());
        assert!(registry.remove(id, None).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let mut registry = SeparatedObjectRegistry::new();
        let a = registry.allocate_id();
        let b = registry.allocate_id();
        assert_ne!(a, b);
        assert!(a > 0);
    }
}
