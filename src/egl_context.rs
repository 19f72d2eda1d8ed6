//! EGL config selection and the backend seam the surface lifecycle drives.

use crate::egl;
use crate::egl::{Config, Context, Error, Int, Surface};
use crate::native_window::NativeWindow;
use crate::settings::AppSettings;

/// Explicit GLES3 context.
pub const CONTEXT_ATTRIBS: [Int; 3] = [
  egl::CONTEXT_CLIENT_VERSION, 3,
  egl::NONE,
];

/// The off-screen surface only keeps the context current, its size is irrelevant.
pub const PBUFFER_ATTRIBS: [Int; 5] = [
  egl::WIDTH, 16,
  egl::HEIGHT, 16,
  egl::NONE,
];

// Alpha is required: the timewarp compositor blends in multiple passes.
const EXACT_CONFIG_ATTRIBS: [(Int, Int); 6] = [
  (egl::ALPHA_SIZE, 8),
  (egl::BLUE_SIZE, 8),
  (egl::GREEN_SIZE, 8),
  (egl::RED_SIZE, 8),
  (egl::DEPTH_SIZE, 0),
  (egl::SAMPLES, 0),
];

/// Attribute list for the on-screen window surface, terminated by `EGL_NONE`.
pub fn window_surface_attribs(settings: &AppSettings) -> Vec<Int> {
  let mut attribs = Vec::with_capacity(5);
  if settings.use_srgb_framebuffer() {
    attribs.push(egl::GL_COLORSPACE_KHR);
    attribs.push(egl::GL_COLORSPACE_SRGB_KHR);
  }
  if settings.use_protected_framebuffer() {
    attribs.push(egl::PROTECTED_CONTENT_EXT);
    attribs.push(egl::TRUE);
  }
  attribs.push(egl::NONE);
  attribs
}

/**
 * The EGL operations the surface lifecycle needs, bound to one display.  All calls happen on the
 * render thread.  The Android implementation is `EglDisplay`; tests substitute a recording fake.
 */
pub trait EglBackend {
  fn configs(&self) -> Result<Vec<Config>, Error>;
  fn config_attrib(&self, config: Config, attribute: Int) -> Result<Int, Error>;
  fn create_context(&mut self, config: Config, attribs: &[Int]) -> Result<Context, Error>;
  fn create_pbuffer_surface(&mut self, config: Config, attribs: &[Int]) -> Result<Surface, Error>;
  fn create_window_surface(&mut self, config: Config, window: &NativeWindow, attribs: &[Int]) ->
    Result<Surface, Error>;
  /// Binds `surface` for both draw and read.  `NO_SURFACE` with `NO_CONTEXT` releases the thread.
  fn make_current(&mut self, surface: Surface, context: Context) -> Result<(), Error>;
  fn destroy_surface(&mut self, surface: Surface) -> Result<(), Error>;
  fn destroy_context(&mut self, context: Context) -> Result<(), Error>;
}

/// Strategy that picks the EGL config for the render surfaces.
pub trait ConfigChooser: Send + Sync {
  fn choose_config(&self, egl: &dyn EglBackend) -> Result<Config, Error>;
}

/// Picks the first config usable by the VR compositor, see `select_config`.
pub struct VrConfigChooser;

impl ConfigChooser for VrConfigChooser {
  fn choose_config(&self, egl: &dyn EglBackend) -> Result<Config, Error> {
    let configs = egl.configs()?;
    debug!("choosing among {} EGL configs", configs.len());
    select_config(&configs, |config, attribute| egl.config_attrib(config, attribute))
      .ok_or(Error::NoMatchingConfig)
  }
}

/**
 * Returns the first config that is ES3 renderable, supports both window and pbuffer surfaces,
 * and has exactly 8 bits per RGBA channel, no depth buffer and no multisampling.  A config
 * whose attributes cannot be queried does not match.
 */
pub fn select_config<F>(configs: &[Config], mut attrib: F) -> Option<Config>
  where F: FnMut(Config, Int) -> Result<Int, Error> {
  let surface_bits = egl::WINDOW_BIT | egl::PBUFFER_BIT;

  configs.iter().cloned().find(|&config| {
    let mut has_bits = |attribute: Int, bits: Int| match attrib(config, attribute) {
      Ok(value) => value & bits == bits,
      Err(e) => {
        debug!("eglGetConfigAttrib(0x{:x}) failed: {}", attribute, e);
        false
      },
    };
    if !has_bits(egl::RENDERABLE_TYPE, egl::OPENGL_ES3_BIT_KHR) || !has_bits(egl::SURFACE_TYPE, surface_bits) {
      return false;
    }
    EXACT_CONFIG_ATTRIBS.iter().all(|&(attribute, wanted)| attrib(config, attribute) == Ok(wanted))
  })
}

/// Dumps the chosen configuration to the log.
pub fn log_config(egl: &dyn EglBackend, config: Config) {
  let attrib = |a: Int| egl.config_attrib(config, a).unwrap_or(-1);
  info!("EGL configuration: id: 0x{:x}, {}/{}/{}/{} RGBA bits, {}/{} depth/stencil bits, {} samples",
    attrib(egl::CONFIG_ID), attrib(egl::RED_SIZE), attrib(egl::GREEN_SIZE), attrib(egl::BLUE_SIZE),
    attrib(egl::ALPHA_SIZE), attrib(egl::DEPTH_SIZE), attrib(egl::STENCIL_SIZE), attrib(egl::SAMPLES));
}

#[cfg(target_os = "android")]
pub use self::display::EglDisplay;

#[cfg(target_os = "android")]
mod display {
  use std::sync::Mutex;

  use super::EglBackend;
  use crate::egl;
  use crate::egl::{Config, Context, Display, Error, Int, Surface};
  use crate::native_window::NativeWindow;

  // eglInitialize/eglTerminate are reference counted per process display and not thread-safe.
  lazy_static! {
    static ref DISPLAY_LOCK: Mutex<()> = Mutex::new(());
  }

  /// The default EGL display, initialized for the lifetime of this value.
  pub struct EglDisplay {
    display: Display,
  }

  impl EglDisplay {
    pub fn new() -> Result<EglDisplay, Error> {
      let _guard = DISPLAY_LOCK.lock().unwrap_or_else(|e| e.into_inner());
      let display = egl::get_display(egl::DEFAULT_DISPLAY)?;
      let (major, minor) = egl::initialize(display)?;
      info!("EGL {}.{} initialized", major, minor);
      Ok(EglDisplay { display: display })
    }
  }

  impl EglBackend for EglDisplay {
    fn configs(&self) -> Result<Vec<Config>, Error> {
      egl::get_configs(self.display)
    }

    fn config_attrib(&self, config: Config, attribute: Int) -> Result<Int, Error> {
      egl::get_config_attrib(self.display, config, attribute)
    }

    fn create_context(&mut self, config: Config, attribs: &[Int]) -> Result<Context, Error> {
      egl::create_context(self.display, config, egl::NO_CONTEXT, attribs)
    }

    fn create_pbuffer_surface(&mut self, config: Config, attribs: &[Int]) -> Result<Surface, Error> {
      egl::create_pbuffer_surface(self.display, config, attribs)
    }

    fn create_window_surface(&mut self, config: Config, window: &NativeWindow, attribs: &[Int]) ->
      Result<Surface, Error> {
      // EGL_NATIVE_VISUAL_ID is guaranteed to be accepted by ANativeWindow_setBuffersGeometry(), so
      // the window buffers can be reconfigured to match the chosen config.
      let format = egl::get_config_attrib(self.display, config, egl::NATIVE_VISUAL_ID)?;
      window.set_buffers_geometry(0, 0, format);
      let surface = egl::create_window_surface(self.display, config, window.as_ptr(), attribs)?;
      let width = egl::query_surface(self.display, surface, egl::WIDTH).unwrap_or(-1);
      let height = egl::query_surface(self.display, surface, egl::HEIGHT).unwrap_or(-1);
      debug!("window surface {}x{}", width, height);
      Ok(surface)
    }

    fn make_current(&mut self, surface: Surface, context: Context) -> Result<(), Error> {
      egl::make_current(self.display, surface, surface, context)
    }

    fn destroy_surface(&mut self, surface: Surface) -> Result<(), Error> {
      egl::destroy_surface(self.display, surface)
    }

    fn destroy_context(&mut self, context: Context) -> Result<(), Error> {
      egl::destroy_context(self.display, context)
    }
  }

  impl Drop for EglDisplay {
    fn drop(&mut self) {
      let _guard = DISPLAY_LOCK.lock().unwrap_or_else(|e| e.into_inner());
      if let Err(e) = egl::terminate(self.display) {
        warn!("eglTerminate failed: {}", e);
      }
    }
  }
}
