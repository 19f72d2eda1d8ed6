//! EGL types, constants and (on Android) safe wrappers over the entry points the surface
//! lifecycle needs.  Every wrapper maps a failed call to `Error` via `eglGetError()`.

use libc::c_void;
use thiserror::Error;

pub type Display = *const c_void;
pub const NO_DISPLAY: Display = 0 as Display;

pub type NativeDisplayType = *const c_void;
pub const DEFAULT_DISPLAY: NativeDisplayType = 0 as NativeDisplayType;

pub type Surface = *const c_void;
pub const NO_SURFACE: Surface = 0 as Surface;
pub type Context = *const c_void;
pub const NO_CONTEXT: Context = 0 as Context;

pub type Config = *const c_void;

pub type Int = i32;

pub const FALSE: Int = 0;
pub const TRUE: Int = 1;

// Config attributes.
pub const ALPHA_SIZE: Int = 0x3021;
pub const BLUE_SIZE: Int = 0x3022;
pub const GREEN_SIZE: Int = 0x3023;
pub const RED_SIZE: Int = 0x3024;
pub const DEPTH_SIZE: Int = 0x3025;
pub const STENCIL_SIZE: Int = 0x3026;
pub const CONFIG_ID: Int = 0x3028;
pub const NATIVE_VISUAL_ID: Int = 0x302E;
pub const SAMPLES: Int = 0x3031;
pub const SURFACE_TYPE: Int = 0x3033;
pub const NONE: Int = 0x3038;  /* Attrib list terminator */
pub const RENDERABLE_TYPE: Int = 0x3040;

// EGL_SURFACE_TYPE mask bits.
pub const PBUFFER_BIT: Int = 0x0001;
pub const WINDOW_BIT: Int = 0x0004;

// EGL_RENDERABLE_TYPE mask bits.
pub const OPENGL_ES2_BIT: Int = 0x0004;
pub const OPENGL_ES3_BIT_KHR: Int = 0x0040;

// Context attributes.
pub const CONTEXT_CLIENT_VERSION: Int = 0x3098;

// Surface attributes, also QuerySurface targets.
pub const HEIGHT: Int = 0x3056;
pub const WIDTH: Int = 0x3057;

// EGL_KHR_gl_colorspace.
pub const GL_COLORSPACE_KHR: Int = 0x309D;
pub const GL_COLORSPACE_SRGB_KHR: Int = 0x3089;

// EGL_EXT_protected_content.
pub const PROTECTED_CONTENT_EXT: Int = 0x32C0;

// Error codes.
const NOT_INITIALIZED: Int = 0x3001;
const BAD_ACCESS: Int = 0x3002;
const BAD_ALLOC: Int = 0x3003;
const BAD_ATTRIBUTE: Int = 0x3004;
const BAD_CONFIG: Int = 0x3005;
const BAD_CONTEXT: Int = 0x3006;
const BAD_CURRENT_SURFACE: Int = 0x3007;
const BAD_DISPLAY: Int = 0x3008;
const BAD_MATCH: Int = 0x3009;
const BAD_NATIVE_PIXMAP: Int = 0x300A;
const BAD_NATIVE_WINDOW: Int = 0x300B;
const BAD_PARAMETER: Int = 0x300C;
const BAD_SURFACE: Int = 0x300D;
const CONTEXT_LOST: Int = 0x300E;  // EGL 1.1 - IMG_power_management

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum Error {
  #[error("EGL_NOT_INITIALIZED")]
  NotInitialized,
  #[error("EGL_BAD_ACCESS")]
  BadAccess,
  #[error("EGL_BAD_ALLOC")]
  BadAlloc,
  #[error("EGL_BAD_ATTRIBUTE")]
  BadAttribute,
  #[error("EGL_BAD_CONFIG")]
  BadConfig,
  #[error("EGL_BAD_CONTEXT")]
  BadContext,
  #[error("EGL_BAD_CURRENT_SURFACE")]
  BadCurrentSurface,
  #[error("EGL_BAD_DISPLAY")]
  BadDisplay,
  #[error("EGL_BAD_MATCH")]
  BadMatch,
  #[error("EGL_BAD_NATIVE_PIXMAP")]
  BadNativePixmap,
  #[error("EGL_BAD_NATIVE_WINDOW")]
  BadNativeWindow,
  #[error("EGL_BAD_PARAMETER")]
  BadParameter,
  #[error("EGL_BAD_SURFACE")]
  BadSurface,
  #[error("EGL_CONTEXT_LOST")]
  ContextLost,
  #[error("unknown EGL error 0x{0:x}")]
  Unknown(Int),
  /// No config offers ES3, window + pbuffer surfaces and exactly RGBA8, no depth, no MSAA.
  #[error("no EGL config matches ES3 / window+pbuffer / RGBA8 / D0 / MSAA0")]
  NoMatchingConfig,
  #[error("eglCreateContext returned EGL_NO_CONTEXT")]
  NoContext,
}

impl Error {
  pub fn from_code(code: Int) -> Error {
    match code {
      NOT_INITIALIZED => Error::NotInitialized,
      BAD_ACCESS => Error::BadAccess,
      BAD_ALLOC => Error::BadAlloc,
      BAD_ATTRIBUTE => Error::BadAttribute,
      BAD_CONFIG => Error::BadConfig,
      BAD_CONTEXT => Error::BadContext,
      BAD_CURRENT_SURFACE => Error::BadCurrentSurface,
      BAD_DISPLAY => Error::BadDisplay,
      BAD_MATCH => Error::BadMatch,
      BAD_NATIVE_PIXMAP => Error::BadNativePixmap,
      BAD_NATIVE_WINDOW => Error::BadNativeWindow,
      BAD_PARAMETER => Error::BadParameter,
      BAD_SURFACE => Error::BadSurface,
      CONTEXT_LOST => Error::ContextLost,
      _ => Error::Unknown(code),
    }
  }
}

#[cfg(target_os = "android")]
pub use self::ffi::*;

#[cfg(target_os = "android")]
mod ffi {
  use libc::c_uint;
  use std::ptr;

  use super::{Config, Context, Display, Error, Int, NativeDisplayType, Surface, NO_CONTEXT, NO_DISPLAY,
    NO_SURFACE};
  use crate::native_window::ANativeWindow;

  type Boolean = c_uint;
  const FALSE: Boolean = 0;

  fn last_error() -> Error {
    Error::from_code(unsafe { eglGetError() })
  }

  fn check(res: Boolean) -> Result<(), Error> {
    if res == FALSE { Err(last_error()) } else { Ok(()) }
  }

  pub fn get_display(display_id: NativeDisplayType) -> Result<Display, Error> {
    let display = unsafe { eglGetDisplay(display_id) };
    if display == NO_DISPLAY { Err(last_error()) } else { Ok(display) }
  }

  /// Initializes the display, returns EGL (major, minor) version.
  pub fn initialize(display: Display) -> Result<(Int, Int), Error> {
    let mut major: Int = 0;
    let mut minor: Int = 0;
    check(unsafe { eglInitialize(display, &mut major, &mut minor) })?;
    Ok((major, minor))
  }

  /// All configs the display offers, unfiltered.
  pub fn get_configs(display: Display) -> Result<Vec<Config>, Error> {
    let mut count: Int = 0;
    check(unsafe { eglGetConfigs(display, ptr::null_mut(), 0, &mut count) })?;
    let mut configs: Vec<Config> = vec![ptr::null(); count.max(0) as usize];
    check(unsafe { eglGetConfigs(display, configs.as_mut_ptr(), count, &mut count) })?;
    configs.truncate(count.max(0) as usize);
    Ok(configs)
  }

  pub fn get_config_attrib(display: Display, config: Config, attribute: Int) -> Result<Int, Error> {
    let mut value: Int = 0;
    check(unsafe { eglGetConfigAttrib(display, config, attribute, &mut value) })?;
    Ok(value)
  }

  pub fn create_window_surface(display: Display, config: Config, window: *mut ANativeWindow,
    attribs: &[Int]) -> Result<Surface, Error> {
    let surface = unsafe { eglCreateWindowSurface(display, config, window, attribs.as_ptr()) };
    if surface == NO_SURFACE { Err(last_error()) } else { Ok(surface) }
  }

  pub fn create_pbuffer_surface(display: Display, config: Config, attribs: &[Int]) -> Result<Surface, Error> {
    let surface = unsafe { eglCreatePbufferSurface(display, config, attribs.as_ptr()) };
    if surface == NO_SURFACE { Err(last_error()) } else { Ok(surface) }
  }

  pub fn create_context(display: Display, config: Config, share_context: Context, attribs: &[Int]) ->
    Result<Context, Error> {
    let context = unsafe { eglCreateContext(display, config, share_context, attribs.as_ptr()) };
    if context == NO_CONTEXT {
      match last_error() {
        Error::Unknown(_) => Err(Error::NoContext),
        e => Err(e),
      }
    } else {
      Ok(context)
    }
  }

  pub fn make_current(display: Display, draw: Surface, read: Surface, context: Context) -> Result<(), Error> {
    check(unsafe { eglMakeCurrent(display, draw, read, context) })
  }

  pub fn query_surface(display: Display, surface: Surface, attribute: Int) -> Result<Int, Error> {
    let mut value: Int = 0;
    check(unsafe { eglQuerySurface(display, surface, attribute, &mut value) })?;
    Ok(value)
  }

  pub fn destroy_context(display: Display, context: Context) -> Result<(), Error> {
    check(unsafe { eglDestroyContext(display, context) })
  }

  pub fn destroy_surface(display: Display, surface: Surface) -> Result<(), Error> {
    check(unsafe { eglDestroySurface(display, surface) })
  }

  pub fn terminate(display: Display) -> Result<(), Error> {
    check(unsafe { eglTerminate(display) })
  }

  #[link(name = "EGL")]
  extern "C" {
    fn eglGetDisplay(display_id: NativeDisplayType) -> Display;
    fn eglInitialize(display: Display, major: *mut Int, minor: *mut Int) -> Boolean;
    fn eglGetConfigs(display: Display, configs: *mut Config, config_size: Int, num_config: *mut Int) -> Boolean;
    fn eglGetConfigAttrib(display: Display, config: Config, attribute: Int, value: *mut Int) -> Boolean;
    fn eglCreateWindowSurface(display: Display, config: Config, window: *mut ANativeWindow,
      attrib_list: *const Int) -> Surface;
    fn eglCreatePbufferSurface(display: Display, config: Config, attrib_list: *const Int) -> Surface;
    fn eglGetError() -> Int;
    fn eglCreateContext(display: Display, config: Config, share_context: Context, attrib_list: *const Int) -> Context;
    fn eglMakeCurrent(display: Display, draw: Surface, read: Surface, context: Context) -> Boolean;
    fn eglQuerySurface(display: Display, surface: Surface, attribute: Int, value: *mut Int) -> Boolean;
    fn eglDestroyContext(display: Display, context: Context) -> Boolean;
    fn eglDestroySurface(display: Display, surface: Surface) -> Boolean;
    fn eglTerminate(display: Display) -> Boolean;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn error_codes_map_to_variants() {
    assert_eq!(Error::from_code(0x3009), Error::BadMatch);
    assert_eq!(Error::from_code(0x300E), Error::ContextLost);
    assert_eq!(Error::from_code(0x1234), Error::Unknown(0x1234));
  }
}
