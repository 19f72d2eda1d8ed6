use std::cmp::{max, min};
use std::fmt;

use time;

const REPORT_INTERVAL_NS: u64 = 1_000_000_000;

/// Collects frame rate statistics for the render thread.
pub struct Fps {
  state: State,
}

/// FPS statistics over one report interval.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stats {
  pub min: f32,
  pub avg: f32,
  pub max: f32,
  pub frames: u64,
}

impl fmt::Display for Stats {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{} frames, FPS min: {:.2}, avg: {:.2}, max: {:.2}", self.frames, self.min, self.avg, self.max)
  }
}

#[derive(Debug)]
enum State {
  Stopped,
  Started { start_ns: u64, },
  FirstTick { start_ns: u64, first_ns: u64, },
  MoreTicks { start_ns: u64, prev_ns: u64, stats: StatsCollected, },
}

#[derive(Clone, Debug)]
struct StatsCollected {
  count: u64,
  sum: u64,
  min: u64,
  max: u64,
}

impl StatsCollected {
  fn new(interval: u64) -> StatsCollected {
    let interval = max(interval, 1);
    StatsCollected {
      count: 1,
      sum: interval,
      min: interval,
      max: interval,
    }
  }

  // Two frames within the same nanosecond are clamped rather than dividing by zero later.
  fn add(&mut self, interval: u64) {
    let interval = max(interval, 1);
    self.count += 1;
    self.sum += interval;
    self.min = min(self.min, interval);
    self.max = max(self.max, interval);
  }

  fn done(&self) -> Stats {
    Stats {
      min: 1e9 / self.max as f32,
      avg: self.count as f32 * 1e9 / self.sum as f32,
      max: 1e9 / self.min as f32,
      frames: self.count + 1,
    }
  }
}

impl Fps {
  pub fn stopped() -> Fps {
    Fps {
      state: State::Stopped,
    }
  }

  pub fn is_started(&self) -> bool {
    match self.state {
      State::Stopped => false,
      _ => true,
    }
  }

  pub fn start(&mut self) {
    self.start_at(time::precise_time_ns());
  }

  fn start_at(&mut self, start_ns: u64) {
    self.state = State::Started {
      start_ns: start_ns,
    }
  }

  /// Stop timing.  Returns the statistics collected since the last report.
  pub fn stop(&mut self) -> Option<Stats> {
    let stats = self.stats();
    self.state = State::Stopped;
    stats.map(|s| s.done())
  }

  /// Register a frame.  Returns statistics once per report interval.  Ticks while stopped are
  /// ignored.
  pub fn tick(&mut self) -> Option<Stats> {
    self.tick_at(time::precise_time_ns())
  }

  fn tick_at(&mut self, curr_ns: u64) -> Option<Stats> {
    let (start_ns, new_state) = match self.state {
      State::Stopped => return None,
      State::Started { start_ns } => (start_ns, State::FirstTick {
        start_ns: start_ns,
        first_ns: curr_ns,
      }),
      State::FirstTick { start_ns, first_ns } => (start_ns, State::MoreTicks {
        start_ns: start_ns,
        prev_ns: curr_ns,
        stats: StatsCollected::new(curr_ns.saturating_sub(first_ns)),
      }),
      State::MoreTicks { start_ns, prev_ns, ref stats } => (start_ns, State::MoreTicks {
        start_ns: start_ns,
        prev_ns: curr_ns,
        stats: {
          let mut result = stats.clone();
          result.add(curr_ns.saturating_sub(prev_ns));
          result
        },
      }),
    };
    self.state = new_state;

    if curr_ns.saturating_sub(start_ns) > REPORT_INTERVAL_NS {
      let stats = self.stats();
      self.state = State::FirstTick {
        start_ns: curr_ns,
        first_ns: curr_ns,
      };
      stats.map(|s| s.done())
    } else {
      None
    }
  }

  fn stats(&self) -> Option<StatsCollected> {
    match self.state {
      State::MoreTicks { ref stats, .. } => Some(stats.clone()),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const MS: u64 = 1_000_000;

  #[test]
  fn reports_once_per_interval() {
    let mut fps = Fps::stopped();
    fps.start_at(0);
    let mut reports = Vec::new();
    // 10ms, 10ms, then a 20ms hitch, then 10ms frames until past one second.
    let mut now = 0;
    for interval in [10, 10, 20].iter().chain([10; 100].iter()) {
      now += interval * MS;
      if let Some(stats) = fps.tick_at(now) {
        reports.push(stats);
      }
    }
    assert_eq!(reports.len(), 1);
    let stats = reports[0];
    assert_eq!(stats.min, 50.0);
    assert_eq!(stats.max, 100.0);
    assert!(stats.avg > 95.0 && stats.avg < 100.0);
  }

  #[test]
  fn stopped_ignores_ticks_and_stop_flushes() {
    let mut fps = Fps::stopped();
    assert_eq!(fps.tick_at(5), None);
    assert!(!fps.is_started());

    fps.start_at(0);
    fps.tick_at(10 * MS);
    fps.tick_at(20 * MS);
    fps.tick_at(20 * MS);
    let stats = fps.stop().unwrap();
    assert_eq!(stats.frames, 3);
    assert_eq!(fps.stop(), None);
  }
}
