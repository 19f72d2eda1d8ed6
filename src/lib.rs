//! Activity and render lifecycle glue between an Android activity, EGL and the native GearVRf
//! VR runtime.

#[cfg(target_os = "android")]
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

pub mod activity;
pub mod dock;
pub mod egl;
pub mod egl_context;
pub mod error;
pub mod factory;
pub mod fps;
pub mod frame_pacer;
pub mod handler;
pub mod input;
#[cfg(target_os = "android")]
mod jni_glue;
pub mod logger;
pub mod native;
pub mod native_window;
pub mod platform;
pub mod render_thread;
pub mod settings;
pub mod surface;
pub mod view;

#[cfg(test)]
mod testing;

pub use crate::activity::{ActivityRemote, HostActivity};
pub use crate::error::{Error, Result};
pub use crate::factory::ActivityHandlerFactory;
pub use crate::handler::{ActivityHandler, HandlerState, MonoscopicActivityHandler, VrActivityHandler};
pub use crate::native::{Eye, RenderingCallbacks, Session, VrRuntime};
pub use crate::settings::AppSettings;
