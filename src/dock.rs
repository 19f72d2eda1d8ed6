use std::sync::{Arc, Mutex};

use crate::native::Session;

/// Told about debounced headset dock transitions.
pub trait DockListener: Send + Sync {
  fn on_dock(&self);
  fn on_undock(&self);
}

impl DockListener for Session {
  fn on_dock(&self) {
    Session::on_dock(self);
  }

  fn on_undock(&self) {
    Session::on_undock(self);
  }
}

/**
 * Collapses raw dock broadcasts into one notification per real transition.  The state lock is
 * held while listeners run, so concurrent broadcasts are delivered in order.
 */
pub struct DockMonitor {
  docked: Mutex<bool>,
  listeners: Mutex<Vec<Arc<dyn DockListener>>>,
}

impl DockMonitor {
  pub fn new(docked: bool) -> DockMonitor {
    DockMonitor {
      docked: Mutex::new(docked),
      listeners: Mutex::new(Vec::new()),
    }
  }

  pub fn add_listener(&self, listener: Arc<dyn DockListener>) {
    self.listeners.lock().unwrap_or_else(|e| e.into_inner()).push(listener);
  }

  pub fn is_docked(&self) -> bool {
    *self.docked.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Returns true if this was a transition and listeners were notified.
  pub fn dock(&self) -> bool {
    self.transition(true)
  }

  pub fn undock(&self) -> bool {
    self.transition(false)
  }

  fn transition(&self, docked: bool) -> bool {
    let mut state = self.docked.lock().unwrap_or_else(|e| e.into_inner());
    if *state == docked {
      debug!("repeated {} ignored", if docked { "dock" } else { "undock" });
      return false;
    }
    *state = docked;
    info!("headset {}", if docked { "docked" } else { "undocked" });

    let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner()).clone();
    for listener in listeners.iter() {
      if docked {
        listener.on_dock();
      } else {
        listener.on_undock();
      }
    }
    true
  }
}
