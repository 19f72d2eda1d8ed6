//! Recording fakes for the native runtime, EGL, the platform and vsync.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crate::egl;
use crate::egl::{Config, Context, Error, Int, Surface};
use crate::egl_context::EglBackend;
use crate::frame_pacer::{VsyncFactory, VsyncSource};
use crate::input::{KeyEvent, MotionEvent};
use crate::native::{Eye, RenderingCallbacks, VrRuntime};
use crate::native_window::NativeWindow;
use crate::platform::Platform;
use crate::settings::AppSettings;
use crate::view::ViewManager;

#[derive(Clone, Debug, PartialEq)]
pub enum NativeCall {
  Create,
  Destroy,
  SurfaceCreated,
  SurfaceChanged,
  DrawFrame,
  LeaveVrMode,
  Dock,
  Undock,
  GlobalMenu,
  ConfirmQuit,
  SetCamera(i64),
  SetCameraRig(i64),
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlatformCall {
  FixedSize(i32, i32),
  PauseSurface,
  ResumeSurface,
  Finish,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
  Native(NativeCall),
  Platform(PlatformCall),
  /// Lifecycle call on a `RecordingViewManager`.
  View(&'static str),
}

/// Call log shared between fakes, so ordering across them can be asserted.
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<Call>>>);

impl Trace {
  pub fn push(&self, call: Call) {
    self.0.lock().unwrap().push(call);
  }

  pub fn calls(&self) -> Vec<Call> {
    self.0.lock().unwrap().clone()
  }
}

pub struct FakeRuntime {
  trace: Trace,
  fail_create: bool,
  callbacks: Mutex<Option<Arc<dyn RenderingCallbacks>>>,
}

const SESSION: i64 = 0x5e55;

impl FakeRuntime {
  pub fn new() -> FakeRuntime {
    FakeRuntime::with_trace(Trace::default())
  }

  pub fn with_trace(trace: Trace) -> FakeRuntime {
    FakeRuntime { trace: trace, fail_create: false, callbacks: Mutex::new(None) }
  }

  pub fn failing() -> FakeRuntime {
    FakeRuntime { fail_create: true, ..FakeRuntime::new() }
  }

  /// The native calls seen so far.
  pub fn trace(&self) -> Vec<NativeCall> {
    self.trace.calls().into_iter().filter_map(|c| match c {
      Call::Native(call) => Some(call),
      _ => None,
    }).collect()
  }

  fn record(&self, handle: i64, call: NativeCall) {
    assert_eq!(handle, SESSION, "{:?} with a stale handle", call);
    self.trace.push(Call::Native(call));
  }
}

impl VrRuntime for FakeRuntime {
  fn create(&self, _: &AppSettings, callbacks: Arc<dyn RenderingCallbacks>) -> i64 {
    self.trace.push(Call::Native(NativeCall::Create));
    if self.fail_create {
      return 0;
    }
    *self.callbacks.lock().unwrap() = Some(callbacks);
    SESSION
  }

  fn destroy(&self, handle: i64) {
    self.record(handle, NativeCall::Destroy);
    self.callbacks.lock().unwrap().take();
  }

  fn on_surface_created(&self, handle: i64) {
    self.record(handle, NativeCall::SurfaceCreated);
  }

  fn on_surface_changed(&self, handle: i64) {
    self.record(handle, NativeCall::SurfaceChanged);
  }

  // Like the real runtime, draws both eyes through the callback bundle.
  fn on_draw_frame(&self, handle: i64) {
    self.record(handle, NativeCall::DrawFrame);
    let callbacks = self.callbacks.lock().unwrap().clone();
    if let Some(callbacks) = callbacks {
      for &eye in Eye::ALL.iter() {
        callbacks.on_draw_eye(eye);
      }
    }
  }

  fn leave_vr_mode(&self, handle: i64) {
    self.record(handle, NativeCall::LeaveVrMode);
  }

  fn on_dock(&self, handle: i64) {
    self.record(handle, NativeCall::Dock);
  }

  fn on_undock(&self, handle: i64) {
    self.record(handle, NativeCall::Undock);
  }

  fn show_global_menu(&self, handle: i64) {
    self.record(handle, NativeCall::GlobalMenu);
  }

  fn show_confirm_quit(&self, handle: i64) {
    self.record(handle, NativeCall::ConfirmQuit);
  }

  fn set_camera(&self, handle: i64, camera: i64) {
    self.record(handle, NativeCall::SetCamera(camera));
  }

  fn set_camera_rig(&self, handle: i64, rig: i64) {
    self.record(handle, NativeCall::SetCameraRig(rig));
  }
}

pub struct NullCallbacks;

impl RenderingCallbacks for NullCallbacks {
  fn on_surface_created(&self) {}
  fn on_surface_changed(&self, _: i32, _: i32) {}
  fn on_before_draw_eyes(&self) {}
  fn on_draw_eye(&self, _: Eye) {}
  fn on_after_draw_eyes(&self) {}
}

pub struct FakePlatform {
  display: (i32, i32),
  docked: bool,
  trace: Trace,
}

impl FakePlatform {
  pub fn with_trace(display: (i32, i32), trace: Trace) -> FakePlatform {
    FakePlatform { display: display, docked: false, trace: trace }
  }

  /// Reports the headset as already docked.
  pub fn docked(self) -> FakePlatform {
    FakePlatform { docked: true, ..self }
  }
}

impl Platform for FakePlatform {
  fn display_size(&self) -> (i32, i32) {
    self.display
  }

  fn is_docked(&self) -> bool {
    self.docked
  }

  fn set_fixed_surface_size(&self, width: i32, height: i32) {
    self.trace.push(Call::Platform(PlatformCall::FixedSize(width, height)));
  }

  fn pause_surface(&self) {
    self.trace.push(Call::Platform(PlatformCall::PauseSurface));
  }

  fn resume_surface(&self) {
    self.trace.push(Call::Platform(PlatformCall::ResumeSurface));
  }

  fn finish(&self) {
    self.trace.push(Call::Platform(PlatformCall::Finish));
  }
}

/// Attribute values of one synthetic EGL config.
#[derive(Clone, Copy, Debug)]
pub struct ConfigAttribs {
  pub renderable: Int,
  pub surface_type: Int,
  pub red: Int,
  pub green: Int,
  pub blue: Int,
  pub alpha: Int,
  pub depth: Int,
  pub samples: Int,
}

impl ConfigAttribs {
  /// A config the VR chooser accepts.
  pub fn vr_ready() -> ConfigAttribs {
    ConfigAttribs {
      renderable: egl::OPENGL_ES2_BIT | egl::OPENGL_ES3_BIT_KHR,
      surface_type: egl::WINDOW_BIT | egl::PBUFFER_BIT | 0x0400,
      red: 8,
      green: 8,
      blue: 8,
      alpha: 8,
      depth: 0,
      samples: 0,
    }
  }

  pub fn get(&self, attribute: Int) -> Int {
    match attribute {
      egl::RENDERABLE_TYPE => self.renderable,
      egl::SURFACE_TYPE => self.surface_type,
      egl::RED_SIZE => self.red,
      egl::GREEN_SIZE => self.green,
      egl::BLUE_SIZE => self.blue,
      egl::ALPHA_SIZE => self.alpha,
      egl::DEPTH_SIZE => self.depth,
      egl::SAMPLES => self.samples,
      _ => 0,
    }
  }
}

/// Config handle of the entry at `index` in a `FakeEgl` table.
pub fn fake_config(index: usize) -> Config {
  (index + 1) as Config
}

const CONTEXT: usize = 0x30;

/// Handle of the `n`th surface a `FakeEgl` creates, counting pbuffers and windows together.
pub fn fake_surface(n: usize) -> usize {
  0x100 + n * 0x10
}

#[derive(Clone, Debug, PartialEq)]
pub enum EglCall {
  CreateContext(Vec<Int>),
  CreatePbuffer(Vec<Int>),
  CreateWindow(Vec<Int>),
  /// Surface made current, 0 for none.
  MakeCurrent(usize),
  DestroySurface(usize),
  DestroyContext,
  /// Inserted by tests to mark a point in the sequence.
  Marker,
}

/// Hands out a fresh handle for every surface and tracks which ones are still alive.
pub struct FakeEgl {
  configs: Vec<ConfigAttribs>,
  calls: Arc<Mutex<Vec<EglCall>>>,
  live: Arc<Mutex<Vec<usize>>>,
  created: usize,
}

impl FakeEgl {
  pub fn with_configs(configs: Vec<ConfigAttribs>) -> FakeEgl {
    FakeEgl {
      configs: configs,
      calls: Arc::new(Mutex::new(Vec::new())),
      live: Arc::new(Mutex::new(Vec::new())),
      created: 0,
    }
  }

  pub fn calls(&self) -> Arc<Mutex<Vec<EglCall>>> {
    self.calls.clone()
  }

  /// Surfaces created and not yet destroyed.
  pub fn live_surfaces(&self) -> Arc<Mutex<Vec<usize>>> {
    self.live.clone()
  }

  fn record(&self, call: EglCall) {
    self.calls.lock().unwrap().push(call);
  }

  fn new_surface(&mut self) -> Surface {
    let handle = fake_surface(self.created);
    self.created += 1;
    self.live.lock().unwrap().push(handle);
    handle as Surface
  }
}

impl EglBackend for FakeEgl {
  fn configs(&self) -> Result<Vec<Config>, Error> {
    Ok((0..self.configs.len()).map(fake_config).collect())
  }

  fn config_attrib(&self, config: Config, attribute: Int) -> Result<Int, Error> {
    let index = (config as usize).wrapping_sub(1);
    self.configs.get(index).map(|c| c.get(attribute)).ok_or(Error::BadConfig)
  }

  fn create_context(&mut self, _: Config, attribs: &[Int]) -> Result<Context, Error> {
    self.record(EglCall::CreateContext(attribs.to_vec()));
    Ok(CONTEXT as Context)
  }

  fn create_pbuffer_surface(&mut self, _: Config, attribs: &[Int]) -> Result<Surface, Error> {
    self.record(EglCall::CreatePbuffer(attribs.to_vec()));
    Ok(self.new_surface())
  }

  fn create_window_surface(&mut self, _: Config, _: &NativeWindow, attribs: &[Int]) -> Result<Surface, Error> {
    self.record(EglCall::CreateWindow(attribs.to_vec()));
    Ok(self.new_surface())
  }

  fn make_current(&mut self, surface: Surface, _: Context) -> Result<(), Error> {
    self.record(EglCall::MakeCurrent(surface as usize));
    Ok(())
  }

  fn destroy_surface(&mut self, surface: Surface) -> Result<(), Error> {
    self.record(EglCall::DestroySurface(surface as usize));
    let mut live = self.live.lock().unwrap();
    match live.iter().position(|&s| s == surface as usize) {
      Some(index) => {
        live.remove(index);
        Ok(())
      },
      None => Err(Error::BadSurface),
    }
  }

  fn destroy_context(&mut self, _: Context) -> Result<(), Error> {
    self.record(EglCall::DestroyContext);
    Ok(())
  }
}

#[derive(Default)]
struct TickState {
  sent: u64,
  taken: u64,
  polls: u64,
  created: usize,
  cancelled: usize,
}

/// Test side of `ManualVsync`: delivers ticks one at a time.
#[derive(Clone, Default)]
pub struct ManualTicks(Arc<(Mutex<TickState>, Condvar)>);

impl ManualTicks {
  fn state(&self) -> MutexGuard<TickState> {
    (self.0).0.lock().unwrap()
  }

  /// Sends one tick and waits until the pacer has handled it and is polling again.
  pub fn tick_and_wait(&self) {
    let (ref lock, ref cond) = *self.0;
    let mut state = lock.lock().unwrap();
    state.sent += 1;
    cond.notify_all();
    while state.taken < state.sent {
      state = cond.wait(state).unwrap();
    }
    let polls = state.polls;
    while state.polls == polls {
      state = cond.wait(state).unwrap();
    }
  }

  pub fn sources_created(&self) -> usize {
    self.state().created
  }

  pub fn sources_cancelled(&self) -> usize {
    self.state().cancelled
  }
}

/// Vsync source that only ticks when the test says so.
pub struct ManualVsync(ManualTicks);

impl ManualVsync {
  pub fn factory() -> (VsyncFactory, ManualTicks) {
    let ticks = ManualTicks::default();
    let shared = ticks.clone();
    let factory: VsyncFactory = Arc::new(move || {
      shared.state().created += 1;
      Box::new(ManualVsync(shared.clone())) as Box<dyn VsyncSource>
    });
    (factory, ticks)
  }
}

impl VsyncSource for ManualVsync {
  fn next_frame(&mut self) -> Option<u64> {
    let (ref lock, ref cond) = *(self.0).0;
    let mut state = lock.lock().unwrap();
    state.polls += 1;
    cond.notify_all();
    if state.taken == state.sent {
      state = cond.wait_timeout(state, Duration::from_millis(2)).unwrap().0;
    }
    if state.taken < state.sent {
      state.taken += 1;
      cond.notify_all();
      Some(state.taken)
    } else {
      None
    }
  }

  fn cancel(&mut self) {
    self.0.state().cancelled += 1;
  }
}

/// View manager that records what the callbacks asked of it.
#[derive(Default)]
pub struct RecordingViewManager {
  trace: Mutex<Vec<String>>,
  failing_eye: Option<Eye>,
  lifecycle: Option<Trace>,
}

impl RecordingViewManager {
  pub fn new() -> RecordingViewManager {
    RecordingViewManager::default()
  }

  pub fn failing_eye(eye: Eye) -> RecordingViewManager {
    RecordingViewManager { failing_eye: Some(eye), ..RecordingViewManager::default() }
  }

  /// Also logs pause, resume and destroy into `lifecycle`, next to the native and platform calls.
  pub fn with_lifecycle(lifecycle: Trace) -> RecordingViewManager {
    RecordingViewManager { lifecycle: Some(lifecycle), ..RecordingViewManager::default() }
  }

  pub fn trace(&self) -> Vec<String> {
    self.trace.lock().unwrap().clone()
  }

  fn lifecycle(&self, call: &'static str) {
    if let Some(ref trace) = self.lifecycle {
      trace.push(Call::View(call));
    }
  }

  fn push<S: Into<String>>(&self, entry: S) {
    self.trace.lock().unwrap().push(entry.into());
  }
}

impl ViewManager for RecordingViewManager {
  fn on_surface_created(&self) {
    self.push("surface_created");
  }

  fn on_surface_changed(&self, width: i32, height: i32) {
    self.push(format!("surface_changed {}x{}", width, height));
  }

  fn before_draw_eyes(&self) {
    self.push("before_draw_eyes");
  }

  fn on_draw_frame(&self) {
    self.push("on_draw_frame");
  }

  fn after_draw_eyes(&self) {
    self.push("after_draw_eyes");
  }

  fn on_draw_eye_view(&self, eye: Eye) -> anyhow::Result<()> {
    self.push(format!("draw_eye {:?}", eye));
    if self.failing_eye == Some(eye) {
      anyhow::bail!("shader for {:?} eye not compiled", eye);
    }
    Ok(())
  }

  fn on_pause(&self) {
    self.lifecycle("pause");
  }

  fn on_resume(&self) {
    self.lifecycle("resume");
  }

  fn on_destroy(&self) {
    self.lifecycle("destroy");
  }

  fn dispatch_key_event(&self, event: &KeyEvent) -> bool {
    self.push(format!("key {}", event.key_code));
    true
  }

  fn dispatch_motion_event(&self, event: &MotionEvent) -> bool {
    self.push(format!("motion {},{}", event.x, event.y));
    true
  }
}
