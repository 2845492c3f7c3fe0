//! Live objects in the installation scene.
//!
//! Objects refer to their drawing by `RecordId` only. The look they copy from
//! the record at spawn (tint and size) is pushed again through
//! `refresh_record` whenever the store re-decodes the drawing, so nothing
//! holds a reference into the store.

use glam::Vec2;
use lf_core::color::Color;
use lf_protocol::{CommandKind, ImageKind};

use crate::record::{ImageRecord, RecordId};

pub type ObjectId = u64;

/// How an object enters the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// Animals hatch.
    Egg,
    /// Everything else is planted.
    Seed,
}

impl Form {
    pub fn for_kind(kind: ImageKind) -> Self {
        if kind.is_animal() {
            Form::Egg
        } else {
            Form::Seed
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedObject {
    pub id: ObjectId,
    pub record: RecordId,
    pub form: Form,
    /// Dominant palette color of the drawing.
    pub tint: Color,
    /// World-space size of the drawing; zero until it has been decoded.
    pub size: Vec2,
    pub wiggling: bool,
    pub glimmering: bool,
}

impl SpawnedObject {
    fn effect_flag(&mut self, kind: CommandKind) -> Option<&mut bool> {
        match kind {
            CommandKind::Wiggle => Some(&mut self.wiggling),
            CommandKind::Glimmer => Some(&mut self.glimmering),
            CommandKind::Spawn => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    objects: Vec<SpawnedObject>,
    next_id: ObjectId,
    focus: Option<ObjectId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, record: &ImageRecord) -> ObjectId {
        self.next_id += 1;
        let id = self.next_id;
        let form = Form::for_kind(record.kind);
        log::debug!("Spawned object {id} ({form:?}) for {}", record.id);
        self.objects.push(SpawnedObject {
            id,
            record: record.id.clone(),
            form,
            tint: record.palette.dominant,
            size: record.dimensions,
            wiggling: false,
            glimmering: false,
        });
        id
    }

    /// Copy the record's current look onto its live objects. Returns how many
    /// were touched.
    pub fn refresh_record(&mut self, record: &ImageRecord) -> usize {
        let mut touched = 0;
        for object in self.objects.iter_mut().filter(|o| o.record == record.id) {
            object.tint = record.palette.dominant;
            object.size = record.dimensions;
            touched += 1;
        }
        touched
    }

    /// Remove every object showing `record`. Returns how many were removed.
    pub fn despawn_record(&mut self, record: &RecordId) -> usize {
        let before = self.objects.len();
        self.objects.retain(|o| &o.record != record);
        if let Some(focus) = self.focus {
            if !self.objects.iter().any(|o| o.id == focus) {
                self.focus = None;
            }
        }
        before - self.objects.len()
    }

    pub fn get(&self, id: ObjectId) -> Option<&SpawnedObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    #[cfg(test)]
    pub fn objects(&self) -> &[SpawnedObject] {
        &self.objects
    }

    /// Turn a timed effect on or off for every object of `record`. Returns the
    /// number of objects touched.
    pub fn set_effect(&mut self, record: &RecordId, kind: CommandKind, on: bool) -> usize {
        let mut touched = 0;
        for object in self.objects.iter_mut().filter(|o| &o.record == record) {
            if let Some(flag) = object.effect_flag(kind) {
                *flag = on;
                touched += 1;
            }
        }
        touched
    }

    /// Ask the camera to follow `object`. Ignored if it is not live.
    pub fn request_focus(&mut self, object: ObjectId) -> bool {
        if self.get(object).is_some() {
            self.focus = Some(object);
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    pub fn focus(&self) -> Option<ObjectId> {
        self.focus
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }
}
