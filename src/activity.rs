//! The host activity: forwards Android callbacks to the handler and the view manager.

use std::sync::Arc;

use crate::dock::{DockListener, DockMonitor};
use crate::error::{Error, Result};
use crate::factory::ActivityHandlerFactory;
use crate::handler::ActivityHandler;
use crate::input::{KeyAction, KeyEvent, MotionEvent};
use crate::native::Session;
use crate::native_window::NativeWindow;
use crate::platform::Platform;
use crate::settings::AppSettings;
use crate::view::{ViewManager, ViewManagerCallbacks};

/**
 * The calls that may arrive from any thread while the UI thread is inside a lifecycle call:
 * camera and rig updates from the script running on the render thread, and dock broadcasts.
 * None of them touch the handler, so holding one never waits on `HostActivity`.
 */
#[derive(Clone)]
pub struct ActivityRemote {
  session: Option<Arc<Session>>,
  dock: Arc<DockMonitor>,
}

impl ActivityRemote {
  pub fn set_camera(&self, camera: i64) {
    if let Some(ref session) = self.session {
      session.set_camera(camera);
    }
  }

  pub fn set_camera_rig(&self, rig: i64) {
    if let Some(ref session) = self.session {
      session.set_camera_rig(rig);
    }
  }

  pub fn on_dock(&self) {
    self.dock.dock();
  }

  pub fn on_undock(&self) {
    self.dock.undock();
  }
}

pub struct HostActivity {
  platform: Arc<dyn Platform>,
  settings: Arc<AppSettings>,
  handler: Box<dyn ActivityHandler>,
  callbacks: Arc<ViewManagerCallbacks>,
  view_manager: Option<Arc<dyn ViewManager>>,
  remote: ActivityRemote,
  paused: bool,
  tracking_back: bool,
}

impl HostActivity {
  pub fn create(factory: &ActivityHandlerFactory, platform: Arc<dyn Platform>, settings: AppSettings) ->
    HostActivity {
    let settings = Arc::new(settings);
    let callbacks = Arc::new(ViewManagerCallbacks::new());
    let handler = factory.create(platform.clone(), settings.clone(), callbacks.clone());
    let dock = Arc::new(DockMonitor::new(false));
    let session = handler.session().cloned();
    if let Some(ref session) = session {
      dock.add_listener(session.clone());
    }
    info!("activity created, {} mode", if handler.is_monoscopic() { "monoscopic" } else { "VR" });

    HostActivity {
      platform: platform,
      settings: settings,
      handler: handler,
      callbacks: callbacks,
      view_manager: None,
      remote: ActivityRemote { session: session, dock: dock },
      paused: false,
      tracking_back: false,
    }
  }

  pub fn settings(&self) -> &AppSettings {
    &self.settings
  }

  pub fn handler(&self) -> &dyn ActivityHandler {
    &*self.handler
  }

  pub fn is_monoscopic(&self) -> bool {
    self.handler.is_monoscopic()
  }

  pub fn remote(&self) -> ActivityRemote {
    self.remote.clone()
  }

  /// Attaches the application's scene and builds the render surface.  The activity finishes if
  /// the surface cannot be set up.  A headset that was docked before launch is announced here.
  pub fn set_main(&mut self, view_manager: Arc<dyn ViewManager>) -> Result<()> {
    if self.view_manager.is_some() {
      return Err(Error::ScriptAlreadySet);
    }
    self.callbacks.attach(view_manager.clone());
    self.view_manager = Some(view_manager);
    if let Err(e) = self.handler.on_set_script() {
      error!("setting the script failed: {}", e);
      self.platform.finish();
      return Err(e);
    }
    if self.platform.is_docked() {
      self.remote.on_dock();
    }
    Ok(())
  }

  pub fn add_dock_listener(&self, listener: Arc<dyn DockListener>) {
    self.remote.dock.add_listener(listener);
  }

  pub fn on_pause(&mut self) -> Result<()> {
    self.paused = true;
    let result = self.handler.on_pause();
    if let Some(ref vm) = self.view_manager {
      vm.on_pause();
    }
    result
  }

  pub fn on_resume(&mut self) -> Result<()> {
    self.paused = false;
    self.handler.on_resume()?;
    if let Some(ref vm) = self.view_manager {
      vm.on_resume();
    }
    Ok(())
  }

  pub fn on_destroy(&mut self) {
    if let Some(ref vm) = self.view_manager {
      vm.on_destroy();
    }
    self.handler.on_destroy();
    self.callbacks.detach();
  }

  pub fn on_surface_created(&mut self, window: NativeWindow) -> Result<()> {
    self.handler.on_surface_created(window)
  }

  pub fn on_surface_changed(&mut self, width: i32, height: i32) -> Result<()> {
    self.handler.on_surface_changed(width, height)
  }

  pub fn on_surface_destroyed(&mut self) -> Result<()> {
    self.handler.on_surface_destroyed()
  }

  /**
   * Returns true if the event was consumed.  Back is tracked from its down event: the up event
   * asks to quit unless a long press already opened the global menu, and is ignored while paused.
   * Everything else goes to the view manager.
   */
  pub fn on_key_event(&mut self, event: &KeyEvent) -> bool {
    if event.is_back() {
      let handled = match event.action {
        KeyAction::Down => {
          if event.repeat_count == 0 {
            self.tracking_back = true;
          }
          return true;
        },
        KeyAction::LongPress => {
          self.tracking_back = false;
          self.handler.on_back_long_press()
        },
        KeyAction::Up => {
          if !self.tracking_back || self.paused {
            self.tracking_back = false;
            return false;
          }
          self.tracking_back = false;
          self.handler.on_back()
        },
      };
      match handled {
        Ok(true) => return true,
        Ok(false) => (),
        Err(e) => {
          warn!("back key dropped: {}", e);
          return false;
        },
      }
    }
    self.view_manager.as_ref().map_or(false, |vm| vm.dispatch_key_event(event))
  }

  pub fn on_motion_event(&mut self, event: &MotionEvent) -> bool {
    self.view_manager.as_ref().map_or(false, |vm| vm.dispatch_motion_event(event))
  }

  pub fn on_dock(&self) {
    self.remote.on_dock();
  }

  pub fn on_undock(&self) {
    self.remote.on_undock();
  }

  pub fn set_camera(&self, camera: i64) {
    self.remote.set_camera(camera);
  }

  pub fn set_camera_rig(&self, rig: i64) {
    self.remote.set_camera_rig(rig);
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};
  use std::thread;

  use super::*;
  use crate::egl_context::EglBackend;
  use crate::handler::EglFactory;
  use crate::input::{KeyAction, KeyEvent, KEYCODE_BACK};
  use crate::testing::{Call, ConfigAttribs, FakeEgl, FakePlatform, FakeRuntime, ManualVsync, NativeCall,
    PlatformCall, RecordingViewManager, Trace};

  fn activity_on(runtime: Arc<FakeRuntime>, platform: FakePlatform, settings: AppSettings) -> HostActivity {
    let egl: EglFactory = Arc::new(|| {
      let egl = FakeEgl::with_configs(vec![ConfigAttribs::vr_ready()]);
      Ok::<_, crate::egl::Error>(Box::new(egl) as Box<dyn EglBackend>)
    });
    let (vsync, _) = ManualVsync::factory();
    let factory = ActivityHandlerFactory::new(runtime, egl, vsync);
    HostActivity::create(&factory, Arc::new(platform), settings)
  }

  fn activity(runtime: Arc<FakeRuntime>, settings: AppSettings) -> HostActivity {
    activity_on(runtime, FakePlatform::with_trace((1920, 1080), Trace::default()), settings)
  }

  fn back(action: KeyAction) -> KeyEvent {
    KeyEvent::new(KEYCODE_BACK, action)
  }

  #[test]
  fn short_press_then_long_press() {
    let runtime = Arc::new(FakeRuntime::new());
    let mut activity = activity(runtime.clone(), AppSettings::default());

    assert!(activity.on_key_event(&back(KeyAction::Down)));
    assert!(activity.on_key_event(&back(KeyAction::Up)));
    assert!(activity.on_key_event(&back(KeyAction::Down)));
    assert!(activity.on_key_event(&back(KeyAction::LongPress)));
    assert!(!activity.on_key_event(&back(KeyAction::Up)));

    assert_eq!(runtime.trace(), vec![NativeCall::Create, NativeCall::ConfirmQuit, NativeCall::GlobalMenu]);
  }

  #[test]
  fn back_up_while_paused_is_ignored() {
    let runtime = Arc::new(FakeRuntime::new());
    let mut activity = activity(runtime.clone(), AppSettings::default());
    activity.on_pause().unwrap();

    activity.on_key_event(&back(KeyAction::Down));
    assert!(!activity.on_key_event(&back(KeyAction::Up)));
    assert!(!runtime.trace().contains(&NativeCall::ConfirmQuit));
  }

  #[test]
  fn other_keys_and_motion_reach_the_view_manager() {
    let runtime = Arc::new(FakeRuntime::new());
    let mut activity = activity(runtime, AppSettings::default());
    let view = Arc::new(RecordingViewManager::new());
    activity.set_main(view.clone()).unwrap();

    assert!(activity.on_key_event(&KeyEvent::new(24, KeyAction::Down)));
    let touch = MotionEvent { action: crate::input::MotionAction::Down, x: 10.0, y: 20.5 };
    assert!(activity.on_motion_event(&touch));
    assert_eq!(view.trace(), vec!["key 24", "motion 10,20.5"]);
  }

  #[test]
  fn dock_events_are_debounced_into_the_session() {
    let runtime = Arc::new(FakeRuntime::new());
    let activity = activity(runtime.clone(), AppSettings::default());
    activity.on_dock();
    activity.on_dock();
    activity.on_undock();
    activity.on_undock();
    activity.on_dock();

    assert_eq!(runtime.trace(), vec![NativeCall::Create, NativeCall::Dock, NativeCall::Undock, NativeCall::Dock]);
  }

  #[test]
  fn camera_and_rig_are_forwarded() {
    let runtime = Arc::new(FakeRuntime::new());
    let activity = activity(runtime.clone(), AppSettings::default());
    activity.set_camera(11);
    activity.set_camera_rig(12);
    assert_eq!(runtime.trace(), vec![NativeCall::Create, NativeCall::SetCamera(11), NativeCall::SetCameraRig(12)]);
  }

  #[test]
  fn camera_calls_do_not_wait_for_the_lifecycle_lock() {
    let runtime = Arc::new(FakeRuntime::new());
    let activity = Mutex::new(activity(runtime.clone(), AppSettings::default()));
    let remote = activity.lock().unwrap().remote();

    let held = activity.lock().unwrap();
    thread::spawn(move || {
      remote.set_camera(5);
      remote.set_camera_rig(6);
    }).join().unwrap();
    drop(held);

    assert_eq!(runtime.trace(), vec![NativeCall::Create, NativeCall::SetCamera(5), NativeCall::SetCameraRig(6)]);
  }

  #[test_log::test]
  fn headset_docked_at_launch_is_announced_once() {
    let trace = Trace::default();
    let runtime = Arc::new(FakeRuntime::with_trace(trace.clone()));
    let platform = FakePlatform::with_trace((1920, 1080), trace.clone()).docked();
    let mut activity = activity_on(runtime.clone(), platform, AppSettings::default());
    assert_eq!(runtime.trace(), vec![NativeCall::Create]);

    activity.set_main(Arc::new(RecordingViewManager::new())).unwrap();
    activity.on_dock();
    assert_eq!(runtime.trace(), vec![NativeCall::Create, NativeCall::Dock]);
  }

  #[test_log::test]
  fn handler_pauses_before_the_view_manager() {
    let trace = Trace::default();
    let runtime = Arc::new(FakeRuntime::with_trace(trace.clone()));
    let platform = FakePlatform::with_trace((1920, 1080), trace.clone());
    let mut activity = activity_on(runtime, platform, AppSettings::default());
    activity.set_main(Arc::new(RecordingViewManager::with_lifecycle(trace.clone()))).unwrap();
    activity.on_pause().unwrap();

    assert_eq!(trace.calls(), vec![
      Call::Native(NativeCall::Create),
      Call::Native(NativeCall::LeaveVrMode),
      Call::Platform(PlatformCall::PauseSurface),
      Call::View("pause"),
    ]);
  }

  #[test]
  fn monoscopic_back_falls_through_to_the_view_manager() {
    let runtime = Arc::new(FakeRuntime::new());
    let mut activity = activity(runtime.clone(), AppSettings::default().with_monoscopic(true));
    let view = Arc::new(RecordingViewManager::new());
    activity.set_main(view.clone()).unwrap();
    activity.set_camera(3);
    activity.on_dock();

    activity.on_key_event(&back(KeyAction::Down));
    assert!(activity.on_key_event(&back(KeyAction::Up)));
    assert_eq!(view.trace(), vec!["key 4"]);
    assert!(runtime.trace().is_empty());
  }

  #[test]
  fn second_main_is_rejected() {
    let mut activity = activity(Arc::new(FakeRuntime::new()), AppSettings::default());
    activity.set_main(Arc::new(RecordingViewManager::new())).unwrap();
    assert!(matches!(activity.set_main(Arc::new(RecordingViewManager::new())), Err(Error::ScriptAlreadySet)));
  }
}
