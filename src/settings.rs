/// Application settings that shape the render surfaces and the handler choice.
///
/// Built once while the activity is created and shared as `Arc<AppSettings>`
/// afterwards; nothing mutates it once the render surfaces exist.
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
  framebuffer_pixels: Option<(i32, i32)>,
  use_srgb_framebuffer: bool,
  use_protected_framebuffer: bool,
  monoscopic: bool,
  refresh_rate_hz: u32,
}

pub const DEFAULT_REFRESH_RATE_HZ: u32 = 60;

impl Default for AppSettings {
  fn default() -> AppSettings {
    AppSettings {
      framebuffer_pixels: None,
      use_srgb_framebuffer: false,
      use_protected_framebuffer: false,
      monoscopic: false,
      refresh_rate_hz: DEFAULT_REFRESH_RATE_HZ,
    }
  }
}

impl AppSettings {
  /// Fixed size of the on-screen window surface.  When unset the natural display size is used.
  pub fn with_framebuffer_pixels(mut self, width: i32, height: i32) -> AppSettings {
    self.framebuffer_pixels = if width > 0 && height > 0 { Some((width, height)) } else { None };
    self
  }

  pub fn with_srgb_framebuffer(mut self, enabled: bool) -> AppSettings {
    self.use_srgb_framebuffer = enabled;
    self
  }

  pub fn with_protected_framebuffer(mut self, enabled: bool) -> AppSettings {
    self.use_protected_framebuffer = enabled;
    self
  }

  pub fn with_monoscopic(mut self, enabled: bool) -> AppSettings {
    self.monoscopic = enabled;
    self
  }

  pub fn with_refresh_rate(mut self, hz: u32) -> AppSettings {
    self.refresh_rate_hz = if hz == 0 { DEFAULT_REFRESH_RATE_HZ } else { hz };
    self
  }

  pub fn framebuffer_pixels(&self) -> Option<(i32, i32)> {
    self.framebuffer_pixels
  }

  pub fn use_srgb_framebuffer(&self) -> bool {
    self.use_srgb_framebuffer
  }

  pub fn use_protected_framebuffer(&self) -> bool {
    self.use_protected_framebuffer
  }

  pub fn is_monoscopic(&self) -> bool {
    self.monoscopic
  }

  pub fn refresh_rate_hz(&self) -> u32 {
    self.refresh_rate_hz
  }

  /**
   * The size to pin the platform surface to, given the natural display size.  Returns None when
   * no framebuffer size is configured or when it already matches the display, in which case the
   * platform layer must not be asked for a fixed size at all.
   */
  pub fn desired_surface_size(&self, natural: (i32, i32)) -> Option<(i32, i32)> {
    match self.framebuffer_pixels {
      Some(size) if size != natural => Some(size),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fixed_size_only_when_it_differs_from_display() {
    let natural = (2560, 1440);
    assert_eq!(AppSettings::default().desired_surface_size(natural), None);

    let same = AppSettings::default().with_framebuffer_pixels(2560, 1440);
    assert_eq!(same.desired_surface_size(natural), None);

    let smaller = AppSettings::default().with_framebuffer_pixels(1920, 1080);
    assert_eq!(smaller.desired_surface_size(natural), Some((1920, 1080)));
  }

  #[test]
  fn non_positive_sizes_and_rates_fall_back() {
    let s = AppSettings::default().with_framebuffer_pixels(0, 1080).with_refresh_rate(0);
    assert_eq!(s.framebuffer_pixels(), None);
    assert_eq!(s.refresh_rate_hz(), DEFAULT_REFRESH_RATE_HZ);
  }
}
