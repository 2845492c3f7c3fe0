use std::cell::RefCell;
use std::rc::Rc;

use lf_protocol::{CommandEntry, CommandKind};

use crate::poller::{ApplyOutcome, CommandApplier};
use crate::world::World;

/// Applies polled commands to the shared host world.
///
/// Every command re-resolves its drawing through the store, so a record
/// removed while the poll was in flight is reported as missing instead of
/// touching a stale object.
pub struct SceneApplier {
    world: Rc<RefCell<World>>,
}

impl SceneApplier {
    pub fn new(world: Rc<RefCell<World>>) -> Self {
        Self { world }
    }
}

impl CommandApplier for SceneApplier {
    fn apply(&mut self, entry: &CommandEntry) -> Result<ApplyOutcome, String> {
        let mut world = self.world.borrow_mut();
        let world = &mut *world;
        let Some(record) = world.store.get_by_str(&entry.uuid).cloned() else {
            return Ok(ApplyOutcome::SubjectMissing);
        };
        let id = record.id.clone();

        match entry.kind {
            CommandKind::Wiggle | CommandKind::Glimmer => {
                let touched = world.scene.set_effect(&id, entry.kind, true);
                world.effects.start(id.clone(), entry.kind);
                log::info!("{} on {id} ({touched} live objects)", entry.kind);
            }
            CommandKind::Spawn => {
                world.store.materials_mut().get_or_create(&record);
                let object = world.scene.spawn(&record);
                if !world.scene.request_focus(object) {
                    return Err(format!("spawned object {object} vanished before focus"));
                }
                log::info!("Spawned object {object} for {id} and focused the camera");
            }
        }
        Ok(ApplyOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::Form;
    use crate::poller::tests::{entry, FakeTransport};
    use crate::poller::CommandPoller;
    use crate::source::memory::MemorySource;
    use crate::store::tests::{image_path, manifest_path, png, ID_A, ID_B};
    use crate::world::tests::{run_until_cycle, test_world};
    use lf_core::time::ManualClock;
    use std::time::Duration;

    fn loaded_world() -> Rc<RefCell<World>> {
        let source = MemorySource::new();
        source.put(manifest_path(), format!("{ID_A}-a-r\n{ID_B}-t-l\n"), 1);
        source.put(image_path(ID_A), png(4, 4, [255, 0, 0, 255]), 2);
        source.put(image_path(ID_B), png(4, 4, [0, 255, 0, 255]), 3);
        let mut world = test_world(&source);
        run_until_cycle(&mut world, &ManualClock::new());
        Rc::new(RefCell::new(world))
    }

    #[test]
    fn wiggle_flags_live_objects_and_starts_timer() {
        let world = loaded_world();
        let record = world.borrow().store.get_by_str(ID_A).expect("loaded").clone();
        let id = record.id.clone();
        world.borrow_mut().scene.spawn(&record);
        let mut applier = SceneApplier::new(world.clone());

        let outcome = applier
            .apply(&entry(ID_A, CommandKind::Wiggle, 1))
            .expect("apply should succeed");
        assert_eq!(outcome, ApplyOutcome::Applied);
        let world = world.borrow();
        assert!(world.scene.objects()[0].wiggling);
        assert!(world.effects.is_active(&id, CommandKind::Wiggle));
    }

    #[test]
    fn spawn_creates_focused_object_with_material() {
        let world = loaded_world();
        let mut applier = SceneApplier::new(world.clone());

        applier
            .apply(&entry(ID_B, CommandKind::Spawn, 1))
            .expect("apply should succeed");
        let world = world.borrow();
        let focus = world.scene.focus().expect("camera should have a target");
        let object = world.scene.get(focus).expect("focused object is live");
        assert_eq!(object.record.as_str(), ID_B);
        assert_eq!(object.form, Form::Seed);
        let material = world
            .store
            .materials()
            .get(&object.record)
            .expect("material created");
        assert!(material.mirrored);
    }

    #[test]
    fn unknown_subject_is_reported_missing() {
        let world = loaded_world();
        let mut applier = SceneApplier::new(world.clone());
        let outcome = applier
            .apply(&entry("ffffffff-0000-0000-0000-00000000000f", CommandKind::Glimmer, 1))
            .expect("apply should succeed");
        assert_eq!(outcome, ApplyOutcome::SubjectMissing);
        assert_eq!(world.borrow().effects.len(), 0);
    }

    #[tokio::test]
    async fn polled_commands_reach_the_scene() {
        let world = loaded_world();
        let transport = FakeTransport::default();
        transport.respond(10, vec![]);
        transport.respond(20, vec![entry(ID_A, CommandKind::Spawn, 2)]);
        let mut poller = CommandPoller::new(
            transport.clone(),
            SceneApplier::new(world.clone()),
            Duration::from_secs(1),
        );

        poller.poll_once().await.expect("bootstrap");
        let report = poller.poll_once().await.expect("poll should succeed");
        assert_eq!(report.applied, 1);
        // One spawn per pending entry regardless of its count.
        assert_eq!(world.borrow().scene.len(), 1);
        assert_eq!(transport.clears.borrow().len(), 1);
    }
}
