//! Activity handlers: the state machine that decides when VR mode is entered and left, and its
//! monoscopic fallback.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::egl;
use crate::egl_context::{ConfigChooser, EglBackend, VrConfigChooser};
use crate::error::{Error, Result};
use crate::fps::Fps;
use crate::frame_pacer::{FramePacer, VsyncFactory};
use crate::native::{RenderingCallbacks, Session, VrRuntime};
use crate::native_window::NativeWindow;
use crate::platform::Platform;
use crate::render_thread::{RenderThread, Renderer};
use crate::settings::AppSettings;
use crate::surface::SurfaceLifecycle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerState {
  Created,
  SurfaceBuilt,
  Resumed,
  Paused,
  Destroyed,
}

/// Opens the EGL display on the render thread.
pub type EglFactory = Arc<dyn Fn() -> std::result::Result<Box<dyn EglBackend>, egl::Error> + Send + Sync>;

/**
 * Receives the host activity's lifecycle, surface and back key callbacks, all from the UI thread.
 * After `on_destroy` every operation that would reach native code is rejected.
 */
pub trait ActivityHandler: Send {
  /// Builds the render surface and arms the renderer.  At most once per handler.
  fn on_set_script(&mut self) -> Result<()>;
  fn on_pause(&mut self) -> Result<()>;
  fn on_resume(&mut self) -> Result<()>;
  /// Tears the handler down.  Repeated calls are no-ops.
  fn on_destroy(&mut self);
  /// Returns whether the press was consumed.
  fn on_back(&mut self) -> Result<bool>;
  fn on_back_long_press(&mut self) -> Result<bool>;
  fn is_monoscopic(&self) -> bool;
  fn state(&self) -> HandlerState;
  fn session(&self) -> Option<&Arc<Session>>;

  fn on_surface_created(&mut self, window: NativeWindow) -> Result<()>;
  fn on_surface_changed(&mut self, width: i32, height: i32) -> Result<()>;
  fn on_surface_destroyed(&mut self) -> Result<()>;
}

fn reject(op: &'static str, state: HandlerState) -> Error {
  Error::InvalidState { op: op, state: state }
}

// State shared between the UI thread and the render thread.  Holding the lock serializes
// pacer start/stop against lifecycle transitions.
struct Shared {
  state: HandlerState,
  pacer: Option<FramePacer>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<Shared> {
  shared.lock().unwrap_or_else(|e| e.into_inner())
}

/**
 * Handler for devices with a working VR runtime.  Owns the session, the render thread and the
 * frame pacer.  The pacer runs only between a surface change or resume and the next pause.
 */
pub struct VrActivityHandler {
  settings: Arc<AppSettings>,
  session: Arc<Session>,
  platform: Arc<dyn Platform>,
  callbacks: Arc<dyn RenderingCallbacks>,
  egl: EglFactory,
  chooser: Arc<dyn ConfigChooser>,
  vsync: VsyncFactory,
  shared: Arc<Mutex<Shared>>,
  render: Option<RenderThread>,
}

impl VrActivityHandler {
  /// Creates the native session.  Fails without leaving native state behind if it cannot be created.
  pub fn new(settings: Arc<AppSettings>, runtime: Arc<dyn VrRuntime>, platform: Arc<dyn Platform>,
    callbacks: Arc<dyn RenderingCallbacks>, egl: EglFactory, vsync: VsyncFactory) -> Result<VrActivityHandler> {
    let session = Session::create(runtime, &settings, callbacks.clone())?;
    Ok(VrActivityHandler {
      settings: settings,
      session: Arc::new(session),
      platform: platform,
      callbacks: callbacks,
      egl: egl,
      chooser: Arc::new(VrConfigChooser),
      vsync: vsync,
      shared: Arc::new(Mutex::new(Shared { state: HandlerState::Created, pacer: None })),
      render: None,
    })
  }

  /// True while the frame pacer thread is running.
  pub fn is_pacing(&self) -> bool {
    lock(&self.shared).pacer.as_ref().map_or(false, |p| p.is_running())
  }

  /// Queues `event` on the render thread, where the GL context is current.
  pub fn run_on_render_thread<F>(&self, event: F) -> Result<()> where F: FnOnce() + Send + 'static {
    match self.render {
      Some(ref render) => render.queue_event(event),
      None => Err(reject("run_on_render_thread", self.state())),
    }
  }

  fn render(&self, op: &'static str) -> Result<&RenderThread> {
    let state = self.state();
    match self.render {
      Some(ref render) if state != HandlerState::Destroyed => Ok(render),
      _ => Err(reject(op, state)),
    }
  }

  fn check_alive(&self, op: &'static str) -> Result<()> {
    match self.state() {
      HandlerState::Destroyed => Err(reject(op, HandlerState::Destroyed)),
      _ => Ok(()),
    }
  }
}

impl ActivityHandler for VrActivityHandler {
  fn on_set_script(&mut self) -> Result<()> {
    self.check_alive("on_set_script")?;
    if self.render.is_some() {
      return Err(Error::ScriptAlreadySet);
    }

    if let Some((width, height)) = self.settings.desired_surface_size(self.platform.display_size()) {
      info!("requesting fixed surface size {}x{}", width, height);
      self.platform.set_fixed_surface_size(width, height);
    }

    let renderer = VrRenderer::new(self.settings.clone(), self.session.clone(), self.callbacks.clone(),
      self.platform.clone(), self.shared.clone(), self.egl.clone(), self.chooser.clone());
    let render = RenderThread::spawn("gvrf-render", renderer)?;
    let pacer = FramePacer::new(self.vsync.clone(), render.requester());
    self.render = Some(render);

    let mut shared = lock(&self.shared);
    shared.pacer = Some(pacer);
    if shared.state == HandlerState::Created {
      shared.state = HandlerState::SurfaceBuilt;
    }
    debug!("script set, state {:?}", shared.state);
    Ok(())
  }

  fn on_pause(&mut self) -> Result<()> {
    {
      let mut shared = lock(&self.shared);
      if shared.state == HandlerState::Destroyed {
        return Err(reject("on_pause", shared.state));
      }
      shared.state = HandlerState::Paused;
      if let Some(pacer) = shared.pacer.as_mut() {
        pacer.stop();
      }
    }

    // The native layer tears down VR mode with the context current, so the surface view may only
    // pause after that has run.
    if let Some(ref render) = self.render {
      let session = self.session.clone();
      render.run_sync(move || session.leave_vr_mode())?;
      render.pause()?;
    }
    self.platform.pause_surface();
    info!("paused");
    Ok(())
  }

  fn on_resume(&mut self) -> Result<()> {
    {
      let mut shared = lock(&self.shared);
      if shared.state == HandlerState::Destroyed {
        return Err(reject("on_resume", shared.state));
      }
      shared.state = HandlerState::Resumed;
      if let Some(pacer) = shared.pacer.as_mut() {
        pacer.start()?;
      }
    }

    if let Some(ref render) = self.render {
      render.resume()?;
    }
    self.platform.resume_surface();
    info!("resumed");
    Ok(())
  }

  fn on_destroy(&mut self) {
    let pacer = {
      let mut shared = lock(&self.shared);
      if shared.state == HandlerState::Destroyed {
        return;
      }
      shared.state = HandlerState::Destroyed;
      shared.pacer.take()
    };
    drop(pacer);

    // Rendering has quiesced once the render thread is joined.
    if let Some(mut render) = self.render.take() {
      render.shutdown();
    }
    self.session.destroy();
    info!("destroyed");
  }

  fn on_back(&mut self) -> Result<bool> {
    self.check_alive("on_back")?;
    self.session.show_confirm_quit();
    Ok(true)
  }

  fn on_back_long_press(&mut self) -> Result<bool> {
    self.check_alive("on_back_long_press")?;
    self.session.show_global_menu();
    Ok(true)
  }

  fn is_monoscopic(&self) -> bool {
    false
  }

  fn state(&self) -> HandlerState {
    lock(&self.shared).state
  }

  fn session(&self) -> Option<&Arc<Session>> {
    Some(&self.session)
  }

  fn on_surface_created(&mut self, window: NativeWindow) -> Result<()> {
    self.render("on_surface_created")?.surface_created(window)
  }

  fn on_surface_changed(&mut self, width: i32, height: i32) -> Result<()> {
    self.render("on_surface_changed")?.surface_changed(width, height)
  }

  fn on_surface_destroyed(&mut self) -> Result<()> {
    self.render("on_surface_destroyed")?.surface_destroyed()
  }
}

impl Drop for VrActivityHandler {
  fn drop(&mut self) {
    self.on_destroy();
  }
}

/// Lives on the render thread.  Brings up EGL, hands the window surface to the native session
/// and drives one native frame per draw request.
struct VrRenderer {
  settings: Arc<AppSettings>,
  session: Arc<Session>,
  callbacks: Arc<dyn RenderingCallbacks>,
  platform: Arc<dyn Platform>,
  shared: Arc<Mutex<Shared>>,
  egl: EglFactory,
  chooser: Arc<dyn ConfigChooser>,
  surfaces: Option<SurfaceLifecycle>,
  window: Option<NativeWindow>,
  fresh_context: bool,
  // Size of a surface rebuilt while paused; native hears about it on resume.
  pending_surface: Option<(i32, i32)>,
  failed: bool,
  fps: Fps,
}

fn notify_native(session: &Session, fresh: bool) {
  if fresh {
    session.on_surface_created();
  }
  session.on_surface_changed();
}

impl VrRenderer {
  // Returns the constructor for the render thread; EGL state is created there, never here.
  fn new(settings: Arc<AppSettings>, session: Arc<Session>, callbacks: Arc<dyn RenderingCallbacks>,
    platform: Arc<dyn Platform>, shared: Arc<Mutex<Shared>>, egl: EglFactory, chooser: Arc<dyn ConfigChooser>) ->
    impl FnOnce() -> VrRenderer + Send + 'static {
    move || VrRenderer {
      settings: settings,
      session: session,
      callbacks: callbacks,
      platform: platform,
      shared: shared,
      egl: egl,
      chooser: chooser,
      surfaces: None,
      window: None,
      fresh_context: false,
      pending_surface: None,
      failed: false,
      fps: Fps::stopped(),
    }
  }

  fn fail(&mut self, what: &str, e: Error) {
    error!("{}: {}, finishing activity", what, e);
    self.failed = true;
    self.platform.finish();
  }

  fn bring_up(&mut self) -> Result<bool> {
    if self.surfaces.is_none() {
      let egl = (self.egl)()?;
      self.surfaces = Some(SurfaceLifecycle::new(egl, self.chooser.clone(), self.settings.clone()));
    }
    match self.surfaces.as_mut() {
      Some(surfaces) => Ok(surfaces.on_surface_created()?),
      None => Ok(false),
    }
  }

  // Native surface notifications re-enter VR mode, so they must not run between a pause and
  // the next resume.
  fn is_paused(&self) -> bool {
    match lock(&self.shared).state {
      HandlerState::Paused | HandlerState::Destroyed => true,
      _ => false,
    }
  }

  fn announce_surface(&mut self, width: i32, height: i32) {
    if self.fresh_context {
      self.callbacks.on_surface_created();
      self.fresh_context = false;
    }
    self.callbacks.on_surface_changed(width, height);
    info!("surface ready, {}x{}", width, height);
    if !self.fps.is_started() {
      self.fps.start();
    }
    self.start_pacer();
  }

  fn start_pacer(&self) {
    let mut shared = lock(&self.shared);
    match shared.state {
      HandlerState::Paused | HandlerState::Destroyed => (),
      _ => if let Some(pacer) = shared.pacer.as_mut() {
        if let Err(e) = pacer.start() {
          error!("frame pacer failed to start: {}", e);
        }
      },
    }
  }
}

impl Renderer for VrRenderer {
  fn on_surface_created(&mut self, window: NativeWindow) {
    self.window = Some(window);
    if self.failed {
      return;
    }
    match self.bring_up() {
      Ok(fresh) => self.fresh_context |= fresh,
      Err(e) => self.fail("EGL bring-up failed", e),
    }
  }

  fn on_surface_changed(&mut self, width: i32, height: i32) {
    if self.failed {
      return;
    }
    let paused = self.is_paused();
    let fresh = self.fresh_context;
    let session = &self.session;
    let result = match (self.surfaces.as_mut(), self.window.as_ref()) {
      (Some(surfaces), Some(window)) => surfaces.on_surface_changed(window, || {
        if !paused {
          notify_native(session, fresh);
        }
      }),
      _ => {
        warn!("surface changed to {}x{} before it was created", width, height);
        return;
      },
    };
    if let Err(e) = result {
      self.fail("window surface setup failed", Error::from(e));
      return;
    }

    if paused {
      info!("surface rebuilt at {}x{} while paused, deferred to resume", width, height);
      self.pending_surface = Some((width, height));
      return;
    }
    self.pending_surface = None;
    self.announce_surface(width, height);
  }

  fn on_surface_destroyed(&mut self) {
    if let Some(surfaces) = self.surfaces.as_mut() {
      surfaces.on_surface_destroyed();
    }
    self.window = None;
    self.pending_surface = None;
    if let Some(stats) = self.fps.stop() {
      debug!("{}", stats);
    }
  }

  fn on_draw_frame(&mut self) {
    if self.failed || !self.surfaces.as_ref().map_or(false, |s| s.is_ready()) {
      return;
    }
    self.callbacks.on_before_draw_eyes();
    self.session.on_draw_frame();
    self.callbacks.on_after_draw_eyes();
    if let Some(stats) = self.fps.tick() {
      debug!("{}", stats);
    }
  }

  fn on_pause(&mut self) {
    if let Some(stats) = self.fps.stop() {
      debug!("{}", stats);
    }
  }

  fn on_resume(&mut self) {
    if let Some((width, height)) = self.pending_surface.take() {
      if self.failed {
        return;
      }
      let fresh = self.fresh_context;
      let session = &self.session;
      let result = match self.surfaces.as_mut() {
        Some(surfaces) => surfaces.with_main_current(|| notify_native(session, fresh)),
        None => return,
      };
      match result {
        Ok(()) => self.announce_surface(width, height),
        Err(e) => self.fail("deferred surface notification failed", Error::from(e)),
      }
      return;
    }
    if self.surfaces.as_ref().map_or(false, |s| s.is_ready()) {
      self.fps.start();
    }
  }
}

/// Fallback when VR mode is unavailable or disabled.  Never touches native code.
pub struct MonoscopicActivityHandler {
  state: HandlerState,
}

impl MonoscopicActivityHandler {
  pub fn new() -> MonoscopicActivityHandler {
    MonoscopicActivityHandler {
      state: HandlerState::Created,
    }
  }

  fn enter(&mut self, op: &'static str, next: HandlerState) -> Result<()> {
    if self.state == HandlerState::Destroyed {
      return Err(reject(op, self.state));
    }
    self.state = next;
    Ok(())
  }
}

impl ActivityHandler for MonoscopicActivityHandler {
  fn on_set_script(&mut self) -> Result<()> {
    let next = if self.state == HandlerState::Created { HandlerState::SurfaceBuilt } else { self.state };
    self.enter("on_set_script", next)
  }

  fn on_pause(&mut self) -> Result<()> {
    self.enter("on_pause", HandlerState::Paused)
  }

  fn on_resume(&mut self) -> Result<()> {
    self.enter("on_resume", HandlerState::Resumed)
  }

  fn on_destroy(&mut self) {
    self.state = HandlerState::Destroyed;
  }

  fn on_back(&mut self) -> Result<bool> {
    let state = self.state;
    self.enter("on_back", state).map(|_| false)
  }

  fn on_back_long_press(&mut self) -> Result<bool> {
    let state = self.state;
    self.enter("on_back_long_press", state).map(|_| false)
  }

  fn is_monoscopic(&self) -> bool {
    true
  }

  fn state(&self) -> HandlerState {
    self.state
  }

  fn session(&self) -> Option<&Arc<Session>> {
    None
  }

  fn on_surface_created(&mut self, _: NativeWindow) -> Result<()> {
    let state = self.state;
    self.enter("on_surface_created", state)
  }

  fn on_surface_changed(&mut self, _: i32, _: i32) -> Result<()> {
    let state = self.state;
    self.enter("on_surface_changed", state)
  }

  fn on_surface_destroyed(&mut self) -> Result<()> {
    let state = self.state;
    self.enter("on_surface_destroyed", state)
  }
}
