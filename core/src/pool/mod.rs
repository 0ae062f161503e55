//! Bounded instance pools
//!
//! Each named partition wraps a fixed set of slots, each owning one instance
//! in the [`InstanceArena`]. A request reuses an inactive slot, then grows the
//! pool up to the capacity of the current quality tier, and past that evicts
//! the oldest active slot. Requests never fail because a pool is full.
//!
//! Active slots are kept in activation order, so the front of the queue is
//! always the eviction candidate.


use std::collections::VecDeque;

use decalforge_shared::{BehaviorHandle, InstanceId, PoolConfig, PoolId, SlotId};
use glam::Vec3;

use crate::instance::{InstanceArena, ProjectionTemplate};

/// How a request obtained its slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotReuse {
    /// A new slot and instance were created
    Allocated,
    /// An inactive slot was reinitialized
    Recycled,
    /// The oldest active slot was taken over
    Evicted,
}

/// Successful request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolRequest {
    pub pool: PoolId,
    pub slot: SlotId,
    pub instance: InstanceId,
    pub reuse: SlotReuse,
}

/// A slot moved from active to inactive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnedSlot {
    pub slot: SlotId,
    pub instance: InstanceId,
    /// Auxiliary behaviours stripped from the instance, for the host to detach
    pub behaviors: Vec<BehaviorHandle>,
}

/// One named pool partition
#[derive(Debug)]
pub struct InstancePool {
    id: PoolId,
    config: PoolConfig,
    tier: usize,
    /// Instance owned by each slot, indexed by `SlotId`
    slots: Vec<InstanceId>,
    /// Oldest activation at the front
    active: VecDeque<SlotId>,
    inactive: Vec<SlotId>,
}

impl InstancePool {
    pub fn new(id: PoolId, config: &PoolConfig, tier: usize) -> Self {
        Self {
            id,
            config: config.clone(),
            tier,
            slots: Vec::new(),
            active: VecDeque::new(),
            inactive: Vec::new(),
        }
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn tier(&self) -> usize {
        self.tier
    }

    /// Capacity at the current quality tier
    pub fn capacity(&self) -> usize {
        self.config.capacity(self.tier)
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn inactive_len(&self) -> usize {
        self.inactive.len()
    }

    /// Slots ever created; never exceeds the highest capacity seen
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn instance(&self, slot: SlotId) -> Option<InstanceId> {
        self.slots.get(slot.0 as usize).copied()
    }

    pub fn is_active(&self, slot: SlotId) -> bool {
        self.active.contains(&slot)
    }

    /// Active slots, oldest first
    pub fn active_slots(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.active.iter().copied()
    }

    /// Hand out a slot initialized from `template` (or blank).
    ///
    /// Returns `None` only when the pool's capacity at this tier is zero.
    pub fn request(
        &mut self,
        template: Option<&ProjectionTemplate>,
        arena: &mut InstanceArena,
    ) -> Option<PoolRequest> {
        let capacity = self.capacity();
        if capacity == 0 {
            return None;
        }
        let blank = ProjectionTemplate::default();
        let template = template.unwrap_or(&blank);

        let (slot, reuse) = if self.active.len() < capacity {
            match self.inactive.pop() {
                Some(slot) => (slot, SlotReuse::Recycled),
                None => {
                    let slot = SlotId(self.slots.len() as u32);
                    self.slots.push(arena.spawn(template));
                    (slot, SlotReuse::Allocated)
                }
            }
        } else {
            let slot = self.active.pop_front()?;
            tracing::debug!(pool = %self.config.name, ?slot, "pool full, evicting oldest");
            (slot, SlotReuse::Evicted)
        };

        let instance = self.slots[slot.0 as usize];
        if let Some(state) = arena.get_mut(instance) {
            if reuse != SlotReuse::Allocated {
                state.reinitialize(template);
            }
            state.set_active(true);
        }
        self.active.push_back(slot);

        Some(PoolRequest {
            pool: self.id,
            slot,
            instance,
            reuse,
        })
    }

    /// Deactivate a slot and make it available for reuse.
    ///
    /// Returns `None` if the slot is unknown or not active.
    pub fn return_slot(
        &mut self,
        slot: SlotId,
        arena: &mut InstanceArena,
    ) -> Option<ReturnedSlot> {
        let position = self.active.iter().position(|&s| s == slot)?;
        self.active.remove(position);
        self.inactive.push(slot);

        let instance = self.slots[slot.0 as usize];
        let behaviors = match arena.get_mut(instance) {
            Some(state) => {
                state.set_active(false);
                state.strip_behaviors()
            }
            None => Vec::new(),
        };
        Some(ReturnedSlot {
            slot,
            instance,
            behaviors,
        })
    }

    /// Switch quality tier, returning oldest-first any slots over the new
    /// capacity.
    pub fn set_tier(&mut self, tier: usize, arena: &mut InstanceArena) -> Vec<ReturnedSlot> {
        self.tier = tier;
        let capacity = self.capacity();
        let mut trimmed = Vec::new();
        while self.active.len() > capacity {
            let Some(&oldest) = self.active.front() else {
                break;
            };
            if let Some(returned) = self.return_slot(oldest, arena) {
                trimmed.push(returned);
            }
        }
        if !trimmed.is_empty() {
            tracing::debug!(
                pool = %self.config.name,
                tier,
                trimmed = trimmed.len(),
                "pool trimmed to tier capacity"
            );
        }
        trimmed
    }

    /// Whether `point` is inside any active instance's projection box, with
    /// box half-extents scaled by `threshold`.
    pub fn check_intersecting(
        &self,
        point: Vec3,
        threshold: f32,
        arena: &InstanceArena,
    ) -> bool {
        self.find_intersecting(point, threshold, arena).is_some()
    }

    /// Most recently activated slot whose box contains `point`
    pub fn find_intersecting(
        &self,
        point: Vec3,
        threshold: f32,
        arena: &InstanceArena,
    ) -> Option<SlotId> {
        self.active.iter().rev().copied().find(|&slot| {
            arena
                .get(self.slots[slot.0 as usize])
                .is_some_and(|i| i.transform.contains_point(point, threshold))
        })
    }
}

/// Every pool partition, addressable by id or name
#[derive(Debug, Default)]
pub struct PoolSet {
    pools: Vec<InstancePool>,
    tier: usize,
}

impl PoolSet {
    pub fn new(configs: &[PoolConfig], tier: usize) -> Self {
        let pools = configs
            .iter()
            .enumerate()
            .map(|(i, config)| InstancePool::new(PoolId(i as u32), config, tier))
            .collect();
        Self { pools, tier }
    }

    pub fn tier(&self) -> usize {
        self.tier
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn get(&self, id: PoolId) -> Option<&InstancePool> {
        self.pools.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: PoolId) -> Option<&mut InstancePool> {
        self.pools.get_mut(id.0 as usize)
    }

    pub fn id_of(&self, name: &str) -> Option<PoolId> {
        self.pools.iter().find(|p| p.config.name == name).map(|p| p.id)
    }

    pub fn by_name(&self, name: &str) -> Option<&InstancePool> {
        self.pools.iter().find(|p| p.config.name == name)
    }

    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut InstancePool> {
        self.pools.iter_mut().find(|p| p.config.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstancePool> {
        self.pools.iter()
    }

    /// Apply a quality tier to every partition, returning trimmed slots.
    pub fn set_quality_tier(
        &mut self,
        tier: usize,
        arena: &mut InstanceArena,
    ) -> Vec<(PoolId, ReturnedSlot)> {
        self.tier = tier;
        self.pools
            .iter_mut()
            .flat_map(|pool| {
                let id = pool.id;
                pool.set_tier(tier, arena)
                    .into_iter()
                    .map(move |returned| (id, returned))
            })
            .collect()
    }
}
