//! Vsync-driven frame pacing, coalescing ticks into at most one outstanding draw request.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use time::precise_time_ns;

use crate::error::{Error, Result};

/// A source of vsync ticks, consumed on the pacer's own thread.
pub trait VsyncSource: Send {
  /// Blocks until the next tick and returns its timestamp in nanoseconds.  May return None
  /// after a bounded wait without a tick, so the pacer can notice it was stopped.
  fn next_frame(&mut self) -> Option<u64>;

  /// Drops any pending registration.  Called once the pacer thread leaves its loop.
  fn cancel(&mut self) {}
}

/// Creates a fresh vsync source for every start of the pacer.
pub type VsyncFactory = Arc<dyn Fn() -> Box<dyn VsyncSource> + Send + Sync>;

/// Ticks at a fixed rate, aligned to multiples of the period since the source was created.
pub struct IntervalVsync {
  period_ns: u64,
  origin_ns: u64,
}

impl IntervalVsync {
  pub fn new(hz: u32) -> IntervalVsync {
    IntervalVsync {
      period_ns: 1_000_000_000 / hz.max(1) as u64,
      origin_ns: precise_time_ns(),
    }
  }

  pub fn factory(hz: u32) -> VsyncFactory {
    Arc::new(move || Box::new(IntervalVsync::new(hz)) as Box<dyn VsyncSource>)
  }
}

impl VsyncSource for IntervalVsync {
  fn next_frame(&mut self) -> Option<u64> {
    let now = precise_time_ns();
    let elapsed = now - self.origin_ns;
    let next = self.origin_ns + (elapsed / self.period_ns + 1) * self.period_ns;
    thread::sleep(Duration::from_nanos(next - now));
    Some(next)
  }
}

/**
 * One-slot draw request shared by the pacer and the render thread.  `request` wakes the render
 * thread only on the empty to pending edge, and `acknowledge` clears the slot once the render
 * thread takes the frame, so ticks that arrive while a frame is in flight are dropped.
 */
#[derive(Clone)]
pub struct RenderRequester {
  pending: Arc<AtomicBool>,
  wake: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl RenderRequester {
  /// `wake` delivers one draw request to the render thread and returns false if it is gone.
  pub fn new<F>(wake: F) -> RenderRequester where F: Fn() -> bool + Send + Sync + 'static {
    RenderRequester {
      pending: Arc::new(AtomicBool::new(false)),
      wake: Arc::new(wake),
    }
  }

  /// Returns true if a new draw request was delivered, false if it coalesced into a pending one.
  pub fn request(&self) -> bool {
    if self.pending.swap(true, Ordering::AcqRel) {
      return false;
    }
    if !(self.wake)() {
      self.pending.store(false, Ordering::Release);
      return false;
    }
    true
  }

  pub fn acknowledge(&self) {
    self.pending.store(false, Ordering::Release);
  }

  pub fn is_pending(&self) -> bool {
    self.pending.load(Ordering::Acquire)
  }
}

struct Worker {
  running: Arc<AtomicBool>,
  dropped: Arc<AtomicU64>,
  thread: JoinHandle<()>,
}

/**
 * Owns the choreographer thread.  `start` and `stop` are idempotent; `stop` returns only once the
 * thread has exited and its vsync source was cancelled.
 */
pub struct FramePacer {
  vsync: VsyncFactory,
  requester: RenderRequester,
  worker: Option<Worker>,
}

impl FramePacer {
  pub fn new(vsync: VsyncFactory, requester: RenderRequester) -> FramePacer {
    FramePacer {
      vsync: vsync,
      requester: requester,
      worker: None,
    }
  }

  pub fn is_running(&self) -> bool {
    self.worker.is_some()
  }

  pub fn start(&mut self) -> Result<()> {
    if self.worker.is_some() {
      return Ok(());
    }

    let running = Arc::new(AtomicBool::new(true));
    let dropped = Arc::new(AtomicU64::new(0));
    let mut source = (self.vsync)();
    let requester = self.requester.clone();
    let name = format!("gvrf-choreographer-{:x}", precise_time_ns() & 0xffff);
    let (thread_running, thread_dropped) = (running.clone(), dropped.clone());

    let thread = thread::Builder::new()
      .name(name.clone())
      .spawn(move || {
        while thread_running.load(Ordering::Acquire) {
          if source.next_frame().is_some() && thread_running.load(Ordering::Acquire) && !requester.request() {
            thread_dropped.fetch_add(1, Ordering::Relaxed);
          }
        }
        source.cancel();
      })
      .map_err(|e| Error::Spawn { name: name.clone(), source: e })?;

    debug!("frame pacer {} started", name);
    self.worker = Some(Worker { running: running, dropped: dropped, thread: thread });
    Ok(())
  }

  pub fn stop(&mut self) {
    let worker = match self.worker.take() {
      Some(worker) => worker,
      None => return,
    };
    worker.running.store(false, Ordering::Release);
    if worker.thread.join().is_err() {
      error!("frame pacer thread panicked");
    }
    debug!("frame pacer stopped, {} ticks coalesced", worker.dropped.load(Ordering::Relaxed));
  }
}

impl Drop for FramePacer {
  fn drop(&mut self) {
    self.stop();
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  use super::*;
  use crate::testing::ManualVsync;

  #[test]
  fn requests_coalesce_until_acknowledged() {
    let wakes = Arc::new(AtomicUsize::new(0));
    let counter = wakes.clone();
    let requester = RenderRequester::new(move || { counter.fetch_add(1, Ordering::SeqCst); true });

    assert!(requester.request());
    assert!(!requester.request());
    assert!(!requester.request());
    assert_eq!(wakes.load(Ordering::SeqCst), 1);

    requester.acknowledge();
    assert!(requester.request());
    assert_eq!(wakes.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn failed_wake_leaves_the_slot_empty() {
    let requester = RenderRequester::new(|| false);
    assert!(!requester.request());
    assert!(!requester.is_pending());
  }

  #[test_log::test]
  fn start_and_stop_are_idempotent() {
    let (vsync, ticks) = ManualVsync::factory();
    let wakes = Arc::new(AtomicUsize::new(0));
    let counter = wakes.clone();
    let requester = RenderRequester::new(move || { counter.fetch_add(1, Ordering::SeqCst); true });
    let mut pacer = FramePacer::new(vsync, requester.clone());

    pacer.start().unwrap();
    pacer.start().unwrap();
    assert!(pacer.is_running());
    assert_eq!(ticks.sources_created(), 1);

    ticks.tick_and_wait();
    ticks.tick_and_wait();
    assert_eq!(wakes.load(Ordering::SeqCst), 1);

    pacer.stop();
    pacer.stop();
    assert!(!pacer.is_running());
    assert_eq!(ticks.sources_cancelled(), 1);

    requester.acknowledge();
    pacer.start().unwrap();
    ticks.tick_and_wait();
    assert_eq!(wakes.load(Ordering::SeqCst), 2);
    assert_eq!(ticks.sources_created(), 2);
  }
}
