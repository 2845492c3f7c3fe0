use std::collections::HashSet;

use lf_core::curve::ResponseCurve;
use rand::Rng;

use crate::objects::{ObjectId, Scene};
use crate::record::RecordId;
use crate::selection::{weighted_random, KindFilter};
use crate::store::RecordStore;

/// Drops a new egg or seed into the scene every few seconds.
///
/// Only records the store has announced with `Added` are candidates; the host
/// marks them ready as the events arrive and forgets them on `Removed`.
/// After each spawn the timer restarts at a random head start in
/// `0..interval_randomness`, so spawns drift instead of ticking like a clock.
#[derive(Debug)]
pub struct Spawner {
    pub interval: f32,
    pub interval_randomness: f32,
    timer: f32,
    ready: HashSet<RecordId>,
}

impl Spawner {
    pub fn new(interval: f32, interval_randomness: f32) -> Self {
        Self {
            interval,
            interval_randomness,
            timer: 0.0,
            ready: HashSet::new(),
        }
    }

    pub fn mark_ready(&mut self, id: RecordId) {
        self.ready.insert(id);
    }

    pub fn forget(&mut self, id: &RecordId) {
        self.ready.remove(id);
    }

    #[cfg(test)]
    pub fn is_ready(&self, id: &RecordId) -> bool {
        self.ready.contains(id)
    }

    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        dt: f32,
        store: &mut RecordStore,
        scene: &mut Scene,
        curve: &ResponseCurve,
        rng: &mut R,
    ) -> Option<ObjectId> {
        self.timer += dt;
        if self.timer < self.interval {
            return None;
        }
        self.timer = rng.gen::<f32>() * self.interval_randomness;
        self.spawn_now(store, scene, KindFilter::Any, curve, rng)
    }

    /// Spawn one object for a weighted-random ready record passing `filter`.
    pub fn spawn_now<R: Rng + ?Sized>(
        &self,
        store: &mut RecordStore,
        scene: &mut Scene,
        filter: KindFilter,
        curve: &ResponseCurve,
        rng: &mut R,
    ) -> Option<ObjectId> {
        let record = weighted_random(
            store.records(),
            |r| filter.accepts(r.kind) && self.ready.contains(&r.id),
            curve,
            rng,
        )?
        .clone();
        store.materials_mut().get_or_create(&record);
        Some(scene.spawn(&record))
    }
}
