//! Host state advanced once per frame.

use lf_core::curve::ResponseCurve;
use lf_core::scanner::{Suspension, TickReport, TimeSlicer};
use lf_core::time::{Clock, FrameClock};
use rand::rngs::StdRng;

use crate::config::ClientConfig;
use crate::effects::EffectTable;
use crate::objects::Scene;
use crate::source::ImageSource;
use crate::spawner::Spawner;
use crate::store::{RecordEvent, RecordStore};

pub struct World {
    pub store: RecordStore,
    pub scene: Scene,
    pub effects: EffectTable,
    pub spawner: Spawner,
    pub curve: ResponseCurve,
    pub rng: StdRng,
    slicer: TimeSlicer,
    frames: FrameClock,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameSummary {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub spawned: bool,
    pub expired: usize,
}

impl World {
    pub fn new(config: &ClientConfig, source: Box<dyn ImageSource>, rng: StdRng) -> Self {
        Self {
            store: RecordStore::new(
                config.image_dir.clone(),
                &config.manifest_name,
                source,
                config.palette_blend_top,
            ),
            scene: Scene::new(),
            effects: EffectTable::new(config.effect_duration_secs),
            spawner: Spawner::new(
                config.spawn_interval_secs,
                config.spawn_interval_randomness_secs,
            ),
            curve: config.age_weighting.clone(),
            rng,
            slicer: TimeSlicer::from_millis(config.frame_budget_ms),
            frames: FrameClock::new(config.max_frame_dt),
        }
    }

    pub fn frames(&self) -> &FrameClock {
        &self.frames
    }

    /// Run one host frame: scan, react to record changes, spawn, expire effects.
    pub fn frame(&mut self, clock: &impl Clock) -> FrameSummary {
        let dt = self.frames.begin_frame(clock) as f32;
        let report = self.slicer.run_tick(&mut self.store, clock);
        self.log_tick(&report);

        let mut summary = FrameSummary::default();
        let events: Vec<RecordEvent> = self.store.drain_events().collect();
        for event in events {
            match event {
                RecordEvent::Added(id) => {
                    log::debug!("Record added: {id}");
                    self.spawner.mark_ready(id);
                    summary.added += 1;
                }
                RecordEvent::Updated(id) => {
                    if let Some(record) = self.store.get(&id).cloned() {
                        self.store.materials_mut().refresh(&record);
                        let touched = self.scene.refresh_record(&record);
                        log::debug!("Record updated: {id} ({touched} live objects refreshed)");
                    }
                    summary.updated += 1;
                }
                RecordEvent::Removed(record) => {
                    let despawned = self.scene.despawn_record(&record.id);
                    self.effects.cancel_record(&record.id);
                    self.spawner.forget(&record.id);
                    log::info!("Record {} removed, despawned {despawned} objects", record.id);
                    summary.removed += 1;
                }
            }
        }

        summary.spawned = self
            .spawner
            .tick(dt, &mut self.store, &mut self.scene, &self.curve, &mut self.rng)
            .is_some();

        for (record, kind) in self.effects.tick(dt) {
            self.scene.set_effect(&record, kind, false);
            summary.expired += 1;
        }
        summary
    }

    fn log_tick(&self, report: &TickReport) {
        match report.suspension {
            Suspension::FrameYield => log::trace!(
                "Scan cycle {} done after {} steps",
                self.store.cycles(),
                report.steps
            ),
            Suspension::BudgetExhausted => log::trace!(
                "Scan budget spent after {} steps ({:?})",
                report.steps,
                report.elapsed
            ),
            // The slicer already logged the step error.
            Suspension::Failed | Suspension::Finished => {}
        }
    }
}
