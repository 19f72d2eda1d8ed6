//! The boundary to the native VR runtime and the session handle that owns one runtime instance.

use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};
use crate::settings::AppSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Eye {
  Left,
  Right,
}

impl Eye {
  pub const ALL: [Eye; 2] = [Eye::Left, Eye::Right];

  pub fn index(self) -> i32 {
    match self {
      Eye::Left => 0,
      Eye::Right => 1,
    }
  }

  pub fn from_index(index: i32) -> Option<Eye> {
    match index {
      0 => Some(Eye::Left),
      1 => Some(Eye::Right),
      _ => None,
    }
  }
}

/// Called back by the native runtime from the render thread while it draws a frame.
pub trait RenderingCallbacks: Send + Sync {
  fn on_surface_created(&self);
  fn on_surface_changed(&self, width: i32, height: i32);
  fn on_before_draw_eyes(&self);
  fn on_draw_eye(&self, eye: Eye);
  fn on_after_draw_eyes(&self);
}

/**
 * Entry points of the native VR runtime.  Every call except `create` takes the handle `create`
 * returned; a zero handle means creation failed.  Implementations must tolerate calls from any
 * thread, the callers serialize per call site.
 */
pub trait VrRuntime: Send + Sync {
  fn create(&self, settings: &AppSettings, callbacks: Arc<dyn RenderingCallbacks>) -> i64;
  fn destroy(&self, handle: i64);
  fn on_surface_created(&self, handle: i64);
  fn on_surface_changed(&self, handle: i64);
  fn on_draw_frame(&self, handle: i64);
  /// Must run on the render thread with the context current.
  fn leave_vr_mode(&self, handle: i64);
  fn on_dock(&self, handle: i64);
  fn on_undock(&self, handle: i64);
  fn show_global_menu(&self, handle: i64);
  fn show_confirm_quit(&self, handle: i64);
  fn set_camera(&self, handle: i64, camera: i64);
  fn set_camera_rig(&self, handle: i64, rig: i64);
}

/**
 * Owning handle to one native session.  The handle is non-zero from a successful `create` until
 * `destroy`, which reaches the runtime exactly once.  Calls on a destroyed session are dropped
 * with a warning.
 */
pub struct Session {
  handle: RwLock<i64>,
  runtime: Arc<dyn VrRuntime>,
}

impl Session {
  pub fn create(runtime: Arc<dyn VrRuntime>, settings: &AppSettings, callbacks: Arc<dyn RenderingCallbacks>) ->
    Result<Session> {
    let handle = runtime.create(settings, callbacks);
    if handle == 0 {
      return Err(Error::SessionCreate);
    }
    info!("native session 0x{:x} created", handle);
    Ok(Session {
      handle: RwLock::new(handle),
      runtime: runtime,
    })
  }

  pub fn handle(&self) -> i64 {
    *self.handle.read().unwrap_or_else(|e| e.into_inner())
  }

  pub fn is_alive(&self) -> bool {
    self.handle() != 0
  }

  // The read lock keeps `destroy` from racing a call already in flight.
  fn with_handle<F: FnOnce(&dyn VrRuntime, i64)>(&self, op: &str, f: F) {
    let handle = self.handle.read().unwrap_or_else(|e| e.into_inner());
    if *handle == 0 {
      warn!("{} on a destroyed session ignored", op);
      return;
    }
    f(&*self.runtime, *handle);
  }

  pub fn on_surface_created(&self) {
    self.with_handle("on_surface_created", |rt, h| rt.on_surface_created(h));
  }

  pub fn on_surface_changed(&self) {
    self.with_handle("on_surface_changed", |rt, h| rt.on_surface_changed(h));
  }

  pub fn on_draw_frame(&self) {
    self.with_handle("on_draw_frame", |rt, h| rt.on_draw_frame(h));
  }

  pub fn leave_vr_mode(&self) {
    self.with_handle("leave_vr_mode", |rt, h| rt.leave_vr_mode(h));
  }

  pub fn on_dock(&self) {
    self.with_handle("on_dock", |rt, h| rt.on_dock(h));
  }

  pub fn on_undock(&self) {
    self.with_handle("on_undock", |rt, h| rt.on_undock(h));
  }

  pub fn show_global_menu(&self) {
    self.with_handle("show_global_menu", |rt, h| rt.show_global_menu(h));
  }

  pub fn show_confirm_quit(&self) {
    self.with_handle("show_confirm_quit", |rt, h| rt.show_confirm_quit(h));
  }

  pub fn set_camera(&self, camera: i64) {
    self.with_handle("set_camera", |rt, h| rt.set_camera(h, camera));
  }

  pub fn set_camera_rig(&self, rig: i64) {
    self.with_handle("set_camera_rig", |rt, h| rt.set_camera_rig(h, rig));
  }

  /// Destroys the native session.  Returns false if it was already destroyed.
  pub fn destroy(&self) -> bool {
    let mut handle = self.handle.write().unwrap_or_else(|e| e.into_inner());
    if *handle == 0 {
      return false;
    }
    self.runtime.destroy(*handle);
    info!("native session 0x{:x} destroyed", *handle);
    *handle = 0;
    true
  }
}

impl Drop for Session {
  fn drop(&mut self) {
    if self.destroy() {
      warn!("session dropped while alive, destroyed on drop");
    }
  }
}

#[cfg(target_os = "android")]
pub use self::ffi::GvrfRuntime;

#[cfg(target_os = "android")]
mod ffi {
  use std::collections::HashMap;
  use std::sync::{Arc, Mutex};

  use jni::objects::GlobalRef;
  use jni::JavaVM;
  use libc::c_void;

  use super::{Eye, RenderingCallbacks, VrRuntime};
  use crate::settings::AppSettings;

  #[repr(C)]
  struct RawSettings {
    framebuffer_width: i32,
    framebuffer_height: i32,
    use_srgb_framebuffer: u8,
    use_protected_framebuffer: u8,
    refresh_rate_hz: u32,
  }

  #[repr(C)]
  struct RawCallbacks {
    user_data: *const c_void,
    on_surface_created: extern "C" fn(*const c_void),
    on_surface_changed: extern "C" fn(*const c_void, i32, i32),
    on_before_draw_eyes: extern "C" fn(*const c_void),
    on_draw_eye: extern "C" fn(*const c_void, i32),
    on_after_draw_eyes: extern "C" fn(*const c_void),
  }

  #[link(name = "gvrf")]
  extern "C" {
    fn gvrf_session_create(vm: *mut jni::sys::JavaVM, activity: jni::sys::jobject, settings: *const RawSettings,
      callbacks: *const RawCallbacks) -> i64;
    fn gvrf_session_destroy(session: i64);
    fn gvrf_session_on_surface_created(session: i64);
    fn gvrf_session_on_surface_changed(session: i64);
    fn gvrf_session_on_draw_frame(session: i64);
    fn gvrf_session_leave_vr_mode(session: i64);
    fn gvrf_session_on_dock(session: i64);
    fn gvrf_session_on_undock(session: i64);
    fn gvrf_session_show_global_menu(session: i64);
    fn gvrf_session_show_confirm_quit(session: i64);
    fn gvrf_session_set_camera(session: i64, camera: i64);
    fn gvrf_session_set_camera_rig(session: i64, rig: i64);
  }

  type CallbacksBox = Box<Arc<dyn RenderingCallbacks>>;

  unsafe fn callbacks<'a>(user_data: *const c_void) -> &'a Arc<dyn RenderingCallbacks> {
    &*(user_data as *const Arc<dyn RenderingCallbacks>)
  }

  extern "C" fn on_surface_created(user_data: *const c_void) {
    unsafe { callbacks(user_data) }.on_surface_created();
  }

  extern "C" fn on_surface_changed(user_data: *const c_void, width: i32, height: i32) {
    unsafe { callbacks(user_data) }.on_surface_changed(width, height);
  }

  extern "C" fn on_before_draw_eyes(user_data: *const c_void) {
    unsafe { callbacks(user_data) }.on_before_draw_eyes();
  }

  extern "C" fn on_draw_eye(user_data: *const c_void, eye: i32) {
    match Eye::from_index(eye) {
      Some(eye) => unsafe { callbacks(user_data) }.on_draw_eye(eye),
      None => warn!("native asked to draw unknown eye {}", eye),
    }
  }

  extern "C" fn on_after_draw_eyes(user_data: *const c_void) {
    unsafe { callbacks(user_data) }.on_after_draw_eyes();
  }

  /**
   * The runtime linked in as `libgvrf.so`.  It keeps the callback bundle of every live session
   * boxed here, so the pointer handed to native code stays valid until `destroy`.
   */
  pub struct GvrfRuntime {
    vm: JavaVM,
    activity: GlobalRef,
    live: Mutex<HashMap<i64, CallbacksBox>>,
  }

  impl GvrfRuntime {
    pub fn new(vm: JavaVM, activity: GlobalRef) -> GvrfRuntime {
      GvrfRuntime {
        vm: vm,
        activity: activity,
        live: Mutex::new(HashMap::new()),
      }
    }
  }

  impl VrRuntime for GvrfRuntime {
    fn create(&self, settings: &AppSettings, callbacks: Arc<dyn RenderingCallbacks>) -> i64 {
      let (width, height) = settings.framebuffer_pixels().unwrap_or((0, 0));
      let raw_settings = RawSettings {
        framebuffer_width: width,
        framebuffer_height: height,
        use_srgb_framebuffer: settings.use_srgb_framebuffer() as u8,
        use_protected_framebuffer: settings.use_protected_framebuffer() as u8,
        refresh_rate_hz: settings.refresh_rate_hz(),
      };
      let boxed: CallbacksBox = Box::new(callbacks);
      let raw_callbacks = RawCallbacks {
        user_data: &*boxed as *const Arc<dyn RenderingCallbacks> as *const c_void,
        on_surface_created: on_surface_created,
        on_surface_changed: on_surface_changed,
        on_before_draw_eyes: on_before_draw_eyes,
        on_draw_eye: on_draw_eye,
        on_after_draw_eyes: on_after_draw_eyes,
      };
      let handle = unsafe {
        gvrf_session_create(self.vm.get_java_vm_pointer(), self.activity.as_obj().as_raw(), &raw_settings,
          &raw_callbacks)
      };
      if handle != 0 {
        self.live.lock().unwrap_or_else(|e| e.into_inner()).insert(handle, boxed);
      }
      handle
    }

    fn destroy(&self, handle: i64) {
      unsafe { gvrf_session_destroy(handle) };
      self.live.lock().unwrap_or_else(|e| e.into_inner()).remove(&handle);
    }

    fn on_surface_created(&self, handle: i64) {
      unsafe { gvrf_session_on_surface_created(handle) }
    }

    fn on_surface_changed(&self, handle: i64) {
      unsafe { gvrf_session_on_surface_changed(handle) }
    }

    fn on_draw_frame(&self, handle: i64) {
      unsafe { gvrf_session_on_draw_frame(handle) }
    }

    fn leave_vr_mode(&self, handle: i64) {
      unsafe { gvrf_session_leave_vr_mode(handle) }
    }

    fn on_dock(&self, handle: i64) {
      unsafe { gvrf_session_on_dock(handle) }
    }

    fn on_undock(&self, handle: i64) {
      unsafe { gvrf_session_on_undock(handle) }
    }

    fn show_global_menu(&self, handle: i64) {
      unsafe { gvrf_session_show_global_menu(handle) }
    }

    fn show_confirm_quit(&self, handle: i64) {
      unsafe { gvrf_session_show_confirm_quit(handle) }
    }

    fn set_camera(&self, handle: i64, camera: i64) {
      unsafe { gvrf_session_set_camera(handle, camera) }
    }

    fn set_camera_rig(&self, handle: i64, rig: i64) {
      unsafe { gvrf_session_set_camera_rig(handle, rig) }
    }
  }
}
