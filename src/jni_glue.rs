//! JNI entry points for `org.gearvrf.GVRActivityNative` and the Java-backed collaborators.

use std::sync::{Arc, Mutex};

use anyhow::Context;
use jni::objects::{GlobalRef, JClass, JObject, JValue, JValueOwned};
use jni::sys::{jboolean, jfloat, jint, jlong, JNI_FALSE, JNI_TRUE};
use jni::{JNIEnv, JavaVM};

use crate::activity::{ActivityRemote, HostActivity};
use crate::egl_context::{EglBackend, EglDisplay};
use crate::factory::ActivityHandlerFactory;
use crate::frame_pacer::IntervalVsync;
use crate::handler::EglFactory;
use crate::input::{KeyAction, KeyEvent, MotionAction, MotionEvent};
use crate::logger;
use crate::native::{Eye, GvrfRuntime};
use crate::native_window::NativeWindow;
use crate::platform::Platform;
use crate::settings::AppSettings;
use crate::view::ViewManager;

/// A Java object plus the VM to call it from any thread.
struct JavaPeer {
  vm: JavaVM,
  object: GlobalRef,
}

impl JavaPeer {
  fn new(env: &mut JNIEnv, object: &JObject) -> anyhow::Result<JavaPeer> {
    Ok(JavaPeer {
      vm: env.get_java_vm()?,
      object: env.new_global_ref(object)?,
    })
  }

  fn call<T, F>(&self, name: &str, sig: &str, args: &[JValue], convert: F) -> anyhow::Result<T>
    where F: FnOnce(JValueOwned) -> jni::errors::Result<T> {
    let mut env = self.vm.attach_current_thread()?;
    let result = env.call_method(&self.object, name, sig, args);
    if env.exception_check()? {
      env.exception_describe()?;
      env.exception_clear()?;
    }
    let value = result.with_context(|| format!("{}{}", name, sig))?;
    Ok(convert(value)?)
  }

  fn call_void(&self, name: &str, sig: &str, args: &[JValue]) {
    if let Err(e) = self.call(name, sig, args, |_| Ok(())) {
      error!("Java call failed: {:#}", e);
    }
  }

  fn call_bool(&self, name: &str, sig: &str, args: &[JValue]) -> bool {
    self.call(name, sig, args, |v| v.z()).unwrap_or_else(|e| {
      error!("Java call failed: {:#}", e);
      false
    })
  }

  fn call_int(&self, name: &str) -> i32 {
    self.call(name, "()I", &[], |v| v.i()).unwrap_or_else(|e| {
      error!("Java call failed: {:#}", e);
      0
    })
  }
}

struct JavaPlatform(JavaPeer);

impl Platform for JavaPlatform {
  fn display_size(&self) -> (i32, i32) {
    (self.0.call_int("getDisplayWidth"), self.0.call_int("getDisplayHeight"))
  }

  fn is_docked(&self) -> bool {
    self.0.call_bool("isHmtConnected", "()Z", &[])
  }

  fn set_fixed_surface_size(&self, width: i32, height: i32) {
    self.0.call_void("setFixedSurfaceSize", "(II)V", &[JValue::Int(width), JValue::Int(height)]);
  }

  fn pause_surface(&self) {
    self.0.call_void("pauseSurfaceView", "()V", &[]);
  }

  fn resume_surface(&self) {
    self.0.call_void("resumeSurfaceView", "()V", &[]);
  }

  fn finish(&self) {
    self.0.call_void("finish", "()V", &[]);
  }
}

struct JavaViewManager(JavaPeer);

impl ViewManager for JavaViewManager {
  fn on_surface_created(&self) {
    self.0.call_void("onSurfaceCreated", "()V", &[]);
  }

  fn on_surface_changed(&self, width: i32, height: i32) {
    self.0.call_void("onSurfaceChanged", "(II)V", &[JValue::Int(width), JValue::Int(height)]);
  }

  fn before_draw_eyes(&self) {
    self.0.call_void("beforeDrawEyes", "()V", &[]);
  }

  fn on_draw_frame(&self) {
    self.0.call_void("onDrawFrame", "()V", &[]);
  }

  fn after_draw_eyes(&self) {
    self.0.call_void("afterDrawEyes", "()V", &[]);
  }

  fn on_draw_eye_view(&self, eye: Eye) -> anyhow::Result<()> {
    self.0.call("onDrawEyeView", "(I)V", &[JValue::Int(eye.index())], |_| Ok(()))
  }

  fn on_pause(&self) {
    self.0.call_void("onPause", "()V", &[]);
  }

  fn on_resume(&self) {
    self.0.call_void("onResume", "()V", &[]);
  }

  fn on_destroy(&self) {
    self.0.call_void("onDestroy", "()V", &[]);
  }

  fn dispatch_key_event(&self, event: &KeyEvent) -> bool {
    let action = match event.action {
      KeyAction::Down => 0,
      KeyAction::Up => 1,
      KeyAction::LongPress => return false,
    };
    self.0.call_bool("dispatchKeyEvent", "(II)Z", &[JValue::Int(event.key_code), JValue::Int(action)])
  }

  fn dispatch_motion_event(&self, event: &MotionEvent) -> bool {
    let action = match event.action {
      MotionAction::Down => 0,
      MotionAction::Up => 1,
      MotionAction::Move => 2,
      MotionAction::Cancel => 3,
      MotionAction::Other(action) => action,
    };
    self.0.call_bool("dispatchMotionEvent", "(IFF)Z",
      &[JValue::Int(action), JValue::Float(event.x), JValue::Float(event.y)])
  }
}

fn to_jboolean(value: bool) -> jboolean {
  if value { JNI_TRUE } else { JNI_FALSE }
}

/**
 * What the Java side holds as its native pointer.  Lifecycle, surface and input calls from the UI
 * thread serialize on `activity`.  Camera, rig and dock calls go through `remote` and never take
 * that lock, because the script calls them from the render thread while `on_pause` may be waiting
 * on it.
 */
struct NativeActivity {
  activity: Mutex<HostActivity>,
  remote: ActivityRemote,
}

fn native_activity<'a>(ptr: jlong, op: &str) -> Option<&'a NativeActivity> {
  if ptr == 0 {
    warn!("{} on a null activity", op);
    return None;
  }
  Some(unsafe { &*(ptr as *const NativeActivity) })
}

fn with_activity<T, F>(ptr: jlong, op: &str, f: F) -> Option<T> where F: FnOnce(&mut HostActivity) -> T {
  let native = native_activity(ptr, op)?;
  let mut activity = native.activity.lock().unwrap_or_else(|e| e.into_inner());
  Some(f(&mut activity))
}

fn with_remote<F>(ptr: jlong, op: &str, f: F) where F: FnOnce(&ActivityRemote) {
  if let Some(native) = native_activity(ptr, op) {
    f(&native.remote);
  }
}

fn log_err(op: &str, result: crate::error::Result<()>) {
  if let Err(e) = result {
    warn!("{} failed: {}", op, e);
  }
}

fn create(env: &mut JNIEnv, activity: &JObject, settings: AppSettings) -> anyhow::Result<HostActivity> {
  let runtime = GvrfRuntime::new(env.get_java_vm()?, env.new_global_ref(activity)?);
  let platform = JavaPlatform(JavaPeer::new(env, activity)?);
  let egl: EglFactory = Arc::new(|| EglDisplay::new().map(|d| Box::new(d) as Box<dyn EglBackend>));
  let vsync = IntervalVsync::factory(settings.refresh_rate_hz());
  let factory = ActivityHandlerFactory::new(Arc::new(runtime), egl, vsync);
  Ok(HostActivity::create(&factory, Arc::new(platform), settings))
}

#[no_mangle]
pub extern "system" fn Java_org_gearvrf_GVRActivityNative_nativeOnCreate(mut env: JNIEnv, _: JClass,
  activity: JObject, width: jint, height: jint, srgb: jboolean, protected: jboolean, monoscopic: jboolean,
  refresh_rate_hz: jint) -> jlong {
  logger::init();
  let settings = AppSettings::default()
    .with_framebuffer_pixels(width, height)
    .with_srgb_framebuffer(srgb == JNI_TRUE)
    .with_protected_framebuffer(protected == JNI_TRUE)
    .with_monoscopic(monoscopic == JNI_TRUE)
    .with_refresh_rate(refresh_rate_hz.max(0) as u32);
  match create(&mut env, &activity, settings) {
    Ok(activity) => {
      let remote = activity.remote();
      Box::into_raw(Box::new(NativeActivity { activity: Mutex::new(activity), remote: remote })) as jlong
    },
    Err(e) => {
      error!("activity creation failed: {:#}", e);
      0
    },
  }
}

#[no_mangle]
pub extern "system" fn Java_org_gearvrf_GVRActivityNative_nativeSetMain(mut env: JNIEnv, _: JClass, ptr: jlong,
  view_manager: JObject) {
  let peer = match JavaPeer::new(&mut env, &view_manager) {
    Ok(peer) => peer,
    Err(e) => {
      error!("view manager reference failed: {:#}", e);
      return;
    },
  };
  with_activity(ptr, "set_main", |a| log_err("set_main", a.set_main(Arc::new(JavaViewManager(peer)))));
}

#[no_mangle]
pub extern "system" fn Java_org_gearvrf_GVRActivityNative_nativeOnPause(_: JNIEnv, _: JClass, ptr: jlong) {
  with_activity(ptr, "on_pause", |a| log_err("on_pause", a.on_pause()));
}

#[no_mangle]
pub extern "system" fn Java_org_gearvrf_GVRActivityNative_nativeOnResume(_: JNIEnv, _: JClass, ptr: jlong) {
  with_activity(ptr, "on_resume", |a| log_err("on_resume", a.on_resume()));
}

/// Destroys and frees the activity.  `ptr` is invalid afterwards.
#[no_mangle]
pub extern "system" fn Java_org_gearvrf_GVRActivityNative_nativeOnDestroy(_: JNIEnv, _: JClass, ptr: jlong) {
  if ptr == 0 {
    return;
  }
  let native = unsafe { Box::from_raw(ptr as *mut NativeActivity) };
  native.activity.lock().unwrap_or_else(|e| e.into_inner()).on_destroy();
}

#[no_mangle]
pub extern "system" fn Java_org_gearvrf_GVRActivityNative_nativeOnSurfaceCreated(env: JNIEnv, _: JClass, ptr: jlong,
  surface: JObject) {
  let window = match unsafe { NativeWindow::from_surface(env.get_raw(), surface.as_raw()) } {
    Some(window) => window,
    None => {
      error!("no native window behind the surface");
      return;
    },
  };
  with_activity(ptr, "on_surface_created", |a| log_err("on_surface_created", a.on_surface_created(window)));
}

#[no_mangle]
pub extern "system" fn Java_org_gearvrf_GVRActivityNative_nativeOnSurfaceChanged(_: JNIEnv, _: JClass, ptr: jlong,
  width: jint, height: jint) {
  with_activity(ptr, "on_surface_changed", |a| log_err("on_surface_changed", a.on_surface_changed(width, height)));
}

#[no_mangle]
pub extern "system" fn Java_org_gearvrf_GVRActivityNative_nativeOnSurfaceDestroyed(_: JNIEnv, _: JClass,
  ptr: jlong) {
  with_activity(ptr, "on_surface_destroyed", |a| log_err("on_surface_destroyed", a.on_surface_destroyed()));
}

fn key_event(ptr: jlong, key_code: jint, action: KeyAction, repeat_count: jint) -> jboolean {
  let event = KeyEvent { key_code: key_code, action: action, repeat_count: repeat_count };
  to_jboolean(with_activity(ptr, "key event", |a| a.on_key_event(&event)).unwrap_or(false))
}

#[no_mangle]
pub extern "system" fn Java_org_gearvrf_GVRActivityNative_nativeOnKeyDown(_: JNIEnv, _: JClass, ptr: jlong,
  key_code: jint, repeat_count: jint) -> jboolean {
  key_event(ptr, key_code, KeyAction::Down, repeat_count)
}

#[no_mangle]
pub extern "system" fn Java_org_gearvrf_GVRActivityNative_nativeOnKeyUp(_: JNIEnv, _: JClass, ptr: jlong,
  key_code: jint) -> jboolean {
  key_event(ptr, key_code, KeyAction::Up, 0)
}

#[no_mangle]
pub extern "system" fn Java_org_gearvrf_GVRActivityNative_nativeOnKeyLongPress(_: JNIEnv, _: JClass, ptr: jlong,
  key_code: jint) -> jboolean {
  key_event(ptr, key_code, KeyAction::LongPress, 0)
}

#[no_mangle]
pub extern "system" fn Java_org_gearvrf_GVRActivityNative_nativeOnTouchEvent(_: JNIEnv, _: JClass, ptr: jlong,
  action: jint, x: jfloat, y: jfloat) -> jboolean {
  let event = MotionEvent { action: MotionAction::from_masked(action), x: x, y: y };
  to_jboolean(with_activity(ptr, "touch event", |a| a.on_motion_event(&event)).unwrap_or(false))
}

#[no_mangle]
pub extern "system" fn Java_org_gearvrf_GVRActivityNative_nativeOnDock(_: JNIEnv, _: JClass, ptr: jlong) {
  with_remote(ptr, "on_dock", |r| r.on_dock());
}

#[no_mangle]
pub extern "system" fn Java_org_gearvrf_GVRActivityNative_nativeOnUndock(_: JNIEnv, _: JClass, ptr: jlong) {
  with_remote(ptr, "on_undock", |r| r.on_undock());
}

#[no_mangle]
pub extern "system" fn Java_org_gearvrf_GVRActivityNative_nativeSetCamera(_: JNIEnv, _: JClass, ptr: jlong,
  camera: jlong) {
  with_remote(ptr, "set_camera", |r| r.set_camera(camera));
}

#[no_mangle]
pub extern "system" fn Java_org_gearvrf_GVRActivityNative_nativeSetCameraRig(_: JNIEnv, _: JClass, ptr: jlong,
  rig: jlong) {
  with_remote(ptr, "set_camera_rig", |r| r.set_camera_rig(rig));
}
