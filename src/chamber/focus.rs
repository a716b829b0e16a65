//! Focus and worldview: the engine's attention anchors.
//!
//! The focus is the view currently being worked on; the worldview is the
//! best interpretation accepted so far. Both are part of the garbage
//! collector's root set — nothing reachable from them may be deleted.

use crate::core::StructureId;

#[derive(Clone, Copy, Debug, Default)]
pub struct Focus {
    pub view: Option<StructureId>,
    pub satisfaction: f32,
}

impl Focus {
    pub fn set(&mut self, view: StructureId) {
        self.view = Some(view);
        self.satisfaction = 0.0;
    }

    pub fn unset(&mut self) {
        self.view = None;
        self.satisfaction = 0.0;
    }

    pub fn is_set(&self) -> bool {
        self.view.is_some()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Worldview {
    pub view: Option<StructureId>,
    pub satisfaction: f32,
}

impl Worldview {
    pub fn set(&mut self, view: StructureId, satisfaction: f32) {
        self.view = Some(view);
        self.satisfaction = satisfaction.clamp(0.0, 1.0);
    }

    pub fn is_set(&self) -> bool {
        self.view.is_some()
    }
}
