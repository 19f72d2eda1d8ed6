use std::sync::Arc;

use time::precise_time_ns;

use crate::egl;
use crate::egl::{Config, Context, Error, Surface};
use crate::egl_context::{log_config, window_surface_attribs, ConfigChooser, EglBackend, CONTEXT_ATTRIBS,
  PBUFFER_ATTRIBS};
use crate::native_window::NativeWindow;
use crate::settings::AppSettings;

/**
 * Owns the EGL context and the two surfaces used by the VR render path: the on-screen window
 * surface the native runtime attaches to, and a small pbuffer that keeps the context current
 * while the runtime owns the window.  Everything here runs on the render thread.
 */
pub struct SurfaceLifecycle {
  egl: Box<dyn EglBackend>,
  chooser: Arc<dyn ConfigChooser>,
  settings: Arc<AppSettings>,
  config: Option<Config>,
  context: Context,
  main_surface: Surface,
  pbuffer_surface: Surface,
}

impl SurfaceLifecycle {
  pub fn new(egl: Box<dyn EglBackend>, chooser: Arc<dyn ConfigChooser>, settings: Arc<AppSettings>) ->
    SurfaceLifecycle {
    SurfaceLifecycle {
      egl: egl,
      chooser: chooser,
      settings: settings,
      config: None,
      context: egl::NO_CONTEXT,
      main_surface: egl::NO_SURFACE,
      pbuffer_surface: egl::NO_SURFACE,
    }
  }

  /// Chooses the config and creates the ES3 context unless one already exists.  Returns true
  /// when a new context was created.
  pub fn on_surface_created(&mut self) -> Result<bool, Error> {
    if self.context != egl::NO_CONTEXT {
      return Ok(false);
    }

    let start_ns = precise_time_ns();
    let config = self.chooser.choose_config(&*self.egl)?;
    log_config(&*self.egl, config);
    let context = self.egl.create_context(config, &CONTEXT_ATTRIBS)?;
    if context == egl::NO_CONTEXT {
      return Err(Error::NoContext);
    }
    self.config = Some(config);
    self.context = context;
    info!("EGL context created in {:.3}ms", (precise_time_ns() - start_ns) as f64 / 1_000_000.0);
    Ok(true)
  }

  /**
   * Rebuilds both surfaces for `window`.  The main surface is made current while `notify` runs,
   * so the native runtime can bind to it, and the pbuffer is current once this returns.
   * Surfaces from a previous call are released first.
   */
  pub fn on_surface_changed<F>(&mut self, window: &NativeWindow, notify: F) -> Result<(), Error>
    where F: FnOnce() {
    let config = match self.config {
      Some(config) => config,
      None => return Err(Error::NoContext),
    };
    let start_ns = precise_time_ns();
    self.release_surfaces();

    self.pbuffer_surface = self.egl.create_pbuffer_surface(config, &PBUFFER_ATTRIBS)?;
    let attribs = window_surface_attribs(&self.settings);
    self.main_surface = self.egl.create_window_surface(config, window, &attribs)?;

    self.with_main_current(notify)?;
    debug!("surfaces rebuilt in {:.3}ms", (precise_time_ns() - start_ns) as f64 / 1_000_000.0);
    Ok(())
  }

  /// Runs `f` with the main surface current, then makes the pbuffer current again.
  pub fn with_main_current<F>(&mut self, f: F) -> Result<(), Error> where F: FnOnce() {
    if !self.is_ready() {
      return Err(Error::BadSurface);
    }
    self.egl.make_current(self.main_surface, self.context)?;
    f();
    self.egl.make_current(self.pbuffer_surface, self.context)
  }

  /// Releases the surfaces but keeps the context for the next surface.
  pub fn on_surface_destroyed(&mut self) {
    self.release_surfaces();
  }

  /// True once the main and pbuffer surfaces exist.
  pub fn is_ready(&self) -> bool {
    self.main_surface != egl::NO_SURFACE && self.pbuffer_surface != egl::NO_SURFACE
  }

  fn release_surfaces(&mut self) {
    if self.main_surface == egl::NO_SURFACE && self.pbuffer_surface == egl::NO_SURFACE {
      return;
    }
    if let Err(e) = self.egl.make_current(egl::NO_SURFACE, egl::NO_CONTEXT) {
      warn!("eglMakeCurrent(NO_SURFACE) failed: {}", e);
    }
    for surface in [self.main_surface, self.pbuffer_surface].iter().cloned() {
      if surface != egl::NO_SURFACE {
        if let Err(e) = self.egl.destroy_surface(surface) {
          warn!("eglDestroySurface failed: {}", e);
        }
      }
    }
    self.main_surface = egl::NO_SURFACE;
    self.pbuffer_surface = egl::NO_SURFACE;
  }
}

impl Drop for SurfaceLifecycle {
  fn drop(&mut self) {
    self.release_surfaces();
    if self.context != egl::NO_CONTEXT {
      if let Err(e) = self.egl.destroy_context(self.context) {
        warn!("eglDestroyContext failed: {}", e);
      }
      self.context = egl::NO_CONTEXT;
    }
  }
}
