//! The scene side of the activity: the view manager collaborator and the rendering callback
//! bundle that forwards native draw callbacks to it.

use std::sync::{Arc, RwLock};

use crate::input::{KeyEvent, MotionEvent};
use crate::native::{Eye, RenderingCallbacks};

/// The scene graph and its renderer, owned by the application script.
pub trait ViewManager: Send + Sync {
  fn on_surface_created(&self);
  fn on_surface_changed(&self, width: i32, height: i32);
  fn before_draw_eyes(&self);
  fn on_draw_frame(&self);
  fn after_draw_eyes(&self);
  fn on_draw_eye_view(&self, eye: Eye) -> anyhow::Result<()>;
  fn on_pause(&self);
  fn on_resume(&self);
  fn on_destroy(&self);
  /// Returns true if the event was consumed.
  fn dispatch_key_event(&self, event: &KeyEvent) -> bool;
  fn dispatch_motion_event(&self, event: &MotionEvent) -> bool;
}

/**
 * The callback bundle handed to the native session.  It exists before any script is set, so the
 * view manager is attached later; callbacks before that are dropped.
 */
#[derive(Default)]
pub struct ViewManagerCallbacks {
  active: RwLock<Option<Arc<dyn ViewManager>>>,
}

impl ViewManagerCallbacks {
  pub fn new() -> ViewManagerCallbacks {
    ViewManagerCallbacks::default()
  }

  pub fn attach(&self, view_manager: Arc<dyn ViewManager>) {
    *self.active.write().unwrap_or_else(|e| e.into_inner()) = Some(view_manager);
  }

  pub fn detach(&self) {
    *self.active.write().unwrap_or_else(|e| e.into_inner()) = None;
  }

  fn with<F: FnOnce(&dyn ViewManager)>(&self, f: F) {
    let active = self.active.read().unwrap_or_else(|e| e.into_inner()).clone();
    if let Some(view_manager) = active {
      f(&*view_manager);
    }
  }
}

impl RenderingCallbacks for ViewManagerCallbacks {
  fn on_surface_created(&self) {
    self.with(|vm| vm.on_surface_created());
  }

  fn on_surface_changed(&self, width: i32, height: i32) {
    self.with(|vm| vm.on_surface_changed(width, height));
  }

  fn on_before_draw_eyes(&self) {
    self.with(|vm| {
      vm.before_draw_eyes();
      vm.on_draw_frame();
    });
  }

  // A failing eye costs one frame, never the render loop.
  fn on_draw_eye(&self, eye: Eye) {
    self.with(|vm| {
      if let Err(e) = vm.on_draw_eye_view(eye) {
        error!("drawing {:?} eye failed: {:#}", eye, e);
      }
    });
  }

  fn on_after_draw_eyes(&self) {
    self.with(|vm| vm.after_draw_eyes());
  }
}
