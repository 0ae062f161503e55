//! Projection registry
//!
//! Keeps every registered instance in a group for its definition. Groups are
//! stored in ascending definition priority; within a group, instances keep
//! registration order. Draw order is recomputed at most once per frame in
//! [`ProjectionRegistry::update`], after all registration changes for the
//! frame, so every camera sees the same order.
//!
//! Draw-order granularity is uneven: an instanced group takes one counter
//! value for the whole group, a non-instanced group takes one per instance.


use decalforge_shared::{DefinitionId, InstanceId};
use hashbrown::HashMap;

use crate::definition::DefinitionStore;
use crate::instance::ProjectionInstance;

/// Active instances of one definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionGroup {
    definition: DefinitionId,
    priority: i32,
    instanced: bool,
    instances: Vec<InstanceId>,
}

impl ProjectionGroup {
    pub fn definition(&self) -> DefinitionId {
        self.definition
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn is_instanced(&self) -> bool {
        self.instanced
    }

    /// Instances in registration order
    pub fn instances(&self) -> &[InstanceId] {
        &self.instances
    }
}

/// What [`ProjectionRegistry::update`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryUpdate {
    /// Definitions whose shared material was re-applied
    pub definitions_applied: usize,
    /// Draw order was reassigned
    pub reordered: bool,
}

/// Ordered registry of active instances
#[derive(Debug, Default)]
pub struct ProjectionRegistry {
    groups: Vec<ProjectionGroup>,
    /// Which group's definition each instance is registered under
    membership: HashMap<InstanceId, DefinitionId>,
    draw_order: HashMap<InstanceId, u32>,
    order_dirty: bool,
}

impl ProjectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups in draw order
    pub fn groups(&self) -> &[ProjectionGroup] {
        &self.groups
    }

    pub fn group(&self, definition: DefinitionId) -> Option<&ProjectionGroup> {
        self.groups.iter().find(|g| g.definition == definition)
    }

    pub fn contains(&self, instance: InstanceId) -> bool {
        self.membership.contains_key(&instance)
    }

    pub fn group_of(&self, instance: InstanceId) -> Option<DefinitionId> {
        self.membership.get(&instance).copied()
    }

    pub fn len(&self) -> usize {
        self.membership.len()
    }

    pub fn is_empty(&self) -> bool {
        self.membership.is_empty()
    }

    pub fn is_order_dirty(&self) -> bool {
        self.order_dirty
    }

    /// Draw order assigned by the last [`update`](Self::update)
    pub fn draw_order(&self, instance: InstanceId) -> Option<u32> {
        self.draw_order.get(&instance).copied()
    }

    /// Add an instance to its definition's group.
    ///
    /// Returns false if the instance has no definition or the definition is
    /// unknown. Registering an instance already in the right group changes
    /// nothing; one registered under another definition is moved.
    pub fn register(
        &mut self,
        instance: &ProjectionInstance,
        definitions: &DefinitionStore,
    ) -> bool {
        let Some(definition) = instance.definition.and_then(|id| definitions.get(id)) else {
            return false;
        };
        let id = instance.id();
        let def_id = definition.id();

        match self.membership.get(&id) {
            Some(&current) if current == def_id => return true,
            Some(_) => {
                self.deregister(id);
            }
            None => {}
        }

        let index = match self.groups.iter().position(|g| g.definition == def_id) {
            Some(index) => index,
            None => {
                let group = ProjectionGroup {
                    definition: def_id,
                    priority: definition.priority(),
                    instanced: definition.is_instanced(),
                    instances: Vec::new(),
                };
                self.insert_group(group)
            }
        };
        self.groups[index].instances.push(id);
        self.membership.insert(id, def_id);
        self.order_dirty = true;
        true
    }

    /// Remove an instance from its group, dropping the group if it empties.
    ///
    /// Returns false if the instance was not registered.
    pub fn deregister(&mut self, instance: InstanceId) -> bool {
        let Some(definition) = self.membership.remove(&instance) else {
            return false;
        };
        self.draw_order.remove(&instance);
        if let Some(index) = self.groups.iter().position(|g| g.definition == definition) {
            let group = &mut self.groups[index];
            group.instances.retain(|&i| i != instance);
            if group.instances.is_empty() {
                self.groups.remove(index);
            }
        }
        self.order_dirty = true;
        true
    }

    /// Move a definition's group to match its current priority and
    /// instancing flag.
    ///
    /// Returns false if the definition has no group or is unknown.
    pub fn reorder(&mut self, definition: DefinitionId, definitions: &DefinitionStore) -> bool {
        let Some(def) = definitions.get(definition) else {
            return false;
        };
        let Some(index) = self.groups.iter().position(|g| g.definition == definition) else {
            return false;
        };
        let mut group = self.groups.remove(index);
        group.priority = def.priority();
        group.instanced = def.is_instanced();
        self.insert_group(group);
        self.order_dirty = true;
        true
    }

    /// Drop a definition's whole group, returning its instances.
    pub fn remove_definition(&mut self, definition: DefinitionId) -> Vec<InstanceId> {
        let Some(index) = self.groups.iter().position(|g| g.definition == definition) else {
            return Vec::new();
        };
        let group = self.groups.remove(index);
        for id in &group.instances {
            self.membership.remove(id);
            self.draw_order.remove(id);
        }
        self.order_dirty = true;
        group.instances
    }

    /// Per-frame tick: apply dirty definitions, move groups whose definition
    /// changed priority or instancing since the last tick, then reassign draw
    /// order if anything moved.
    pub fn update(&mut self, definitions: &mut DefinitionStore) -> RegistryUpdate {
        let mut result = RegistryUpdate::default();
        for definition in definitions.iter_mut() {
            if definition.update() {
                result.definitions_applied += 1;
            }
        }

        let stale: Vec<DefinitionId> = self
            .groups
            .iter()
            .filter(|g| {
                definitions.get(g.definition).is_some_and(|d| {
                    d.priority() != g.priority || d.is_instanced() != g.instanced
                })
            })
            .map(|g| g.definition)
            .collect();
        for definition in stale {
            self.reorder(definition, definitions);
        }

        if self.order_dirty {
            self.assign_draw_order();
            self.order_dirty = false;
            result.reordered = true;
        }
        result
    }

    fn assign_draw_order(&mut self) {
        self.draw_order.clear();
        let mut counter = 0u32;
        for group in &self.groups {
            if group.instanced {
                for &id in &group.instances {
                    self.draw_order.insert(id, counter);
                }
                counter += 1;
            } else {
                for &id in &group.instances {
                    self.draw_order.insert(id, counter);
                    counter += 1;
                }
            }
        }
    }

    /// Insert after every group with priority <= `group.priority`.
    fn insert_group(&mut self, group: ProjectionGroup) -> usize {
        let index = self
            .groups
            .iter()
            .position(|g| g.priority > group.priority)
            .unwrap_or(self.groups.len());
        self.groups.insert(index, group);
        index
    }
}
