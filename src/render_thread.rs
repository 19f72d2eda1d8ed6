//! The render thread: owns the GL context and runs surface callbacks, draws and queued events
//! strictly in order.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle, ThreadId};

use crate::error::{Error, Result};
use crate::frame_pacer::RenderRequester;
use crate::native_window::NativeWindow;

/// Driven by the render thread; every method runs there.
pub trait Renderer {
  fn on_surface_created(&mut self, window: NativeWindow);
  fn on_surface_changed(&mut self, width: i32, height: i32);
  fn on_surface_destroyed(&mut self);
  fn on_draw_frame(&mut self);
  fn on_pause(&mut self) {}
  fn on_resume(&mut self) {}
}

enum Command {
  SurfaceCreated(NativeWindow),
  SurfaceChanged { width: i32, height: i32 },
  SurfaceDestroyed,
  Draw,
  Run(Box<dyn FnOnce() + Send>),
  Pause,
  Resume,
  Quit,
}

pub struct RenderThread {
  sender: Sender<Command>,
  requester: RenderRequester,
  thread_id: ThreadId,
  thread: Option<JoinHandle<()>>,
}

impl RenderThread {
  /// Spawns the thread and builds the renderer on it, so EGL state never crosses threads.
  pub fn spawn<R, F>(name: &str, make: F) -> Result<RenderThread>
    where R: Renderer, F: FnOnce() -> R + Send + 'static {
    let (sender, receiver) = mpsc::channel();
    let wake = Mutex::new(sender.clone());
    let requester = RenderRequester::new(move || match wake.lock() {
      Ok(sender) => sender.send(Command::Draw).is_ok(),
      Err(_) => false,
    });

    let loop_requester = requester.clone();
    let thread = thread::Builder::new()
      .name(name.to_string())
      .spawn(move || {
        let renderer = make();
        run(renderer, receiver, loop_requester);
      })
      .map_err(|e| Error::Spawn { name: name.to_string(), source: e })?;

    info!("render thread {} started", name);
    Ok(RenderThread {
      sender: sender,
      requester: requester,
      thread_id: thread.thread().id(),
      thread: Some(thread),
    })
  }

  fn send(&self, command: Command) -> Result<()> {
    self.sender.send(command).map_err(|_| Error::RenderThreadGone)
  }

  /// Handle for the frame pacer to request draws.
  pub fn requester(&self) -> RenderRequester {
    self.requester.clone()
  }

  pub fn surface_created(&self, window: NativeWindow) -> Result<()> {
    self.send(Command::SurfaceCreated(window))
  }

  pub fn surface_changed(&self, width: i32, height: i32) -> Result<()> {
    self.send(Command::SurfaceChanged { width: width, height: height })
  }

  pub fn surface_destroyed(&self) -> Result<()> {
    self.send(Command::SurfaceDestroyed)
  }

  /// Draws are skipped until the matching `resume`.
  pub fn pause(&self) -> Result<()> {
    self.send(Command::Pause)
  }

  pub fn resume(&self) -> Result<()> {
    self.send(Command::Resume)
  }

  /// Runs `event` on the render thread after everything queued before it.
  pub fn queue_event<F>(&self, event: F) -> Result<()> where F: FnOnce() + Send + 'static {
    self.send(Command::Run(Box::new(event)))
  }

  /// Like `queue_event`, but blocks until `f` has run and returns its result.  Runs `f` inline
  /// when called from the render thread itself.
  pub fn run_sync<T, F>(&self, f: F) -> Result<T> where T: Send + 'static, F: FnOnce() -> T + Send + 'static {
    if thread::current().id() == self.thread_id {
      return Ok(f());
    }
    let (done, result) = mpsc::sync_channel(1);
    self.queue_event(move || {
      let _ = done.send(f());
    })?;
    result.recv().map_err(|_| Error::RenderThreadGone)
  }

  /// Stops the loop after the queued work and joins the thread.  The renderer is dropped on the
  /// render thread.
  pub fn shutdown(&mut self) {
    let thread = match self.thread.take() {
      Some(thread) => thread,
      None => return,
    };
    let _ = self.sender.send(Command::Quit);
    if thread.join().is_err() {
      error!("render thread panicked");
    } else {
      info!("render thread stopped");
    }
  }
}

impl Drop for RenderThread {
  fn drop(&mut self) {
    self.shutdown();
  }
}

fn run<R: Renderer>(mut renderer: R, receiver: Receiver<Command>, requester: RenderRequester) {
  let mut paused = false;
  for command in receiver.iter() {
    match command {
      Command::SurfaceCreated(window) => renderer.on_surface_created(window),
      Command::SurfaceChanged { width, height } => renderer.on_surface_changed(width, height),
      Command::SurfaceDestroyed => renderer.on_surface_destroyed(),
      Command::Draw => {
        requester.acknowledge();
        if !paused {
          renderer.on_draw_frame();
        }
      },
      Command::Run(event) => event(),
      Command::Pause => {
        paused = true;
        renderer.on_pause();
      },
      Command::Resume => {
        paused = false;
        renderer.on_resume();
      },
      Command::Quit => break,
    }
  }
}
