//! Logger bring-up: logcat on Android, `RUST_LOG` filtered stderr elsewhere.

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs the logger.  Safe to call from every JNI entry point, only the first call has effect.
pub fn init() {
  INIT.call_once(|| {
    install();
    debug!("logging initialized");
  });
}

#[cfg(target_os = "android")]
fn install() {
  use android_logger::Config;
  use log::LevelFilter;

  android_logger::init_once(Config::default().with_max_level(LevelFilter::Debug).with_tag("gvrf"));
}

#[cfg(not(target_os = "android"))]
fn install() {
  // Test harnesses may have installed a logger already.
  let _ = env_logger::Builder::from_default_env().is_test(cfg!(test)).try_init();
}
