use std::sync::Arc;

use crate::frame_pacer::VsyncFactory;
use crate::handler::{ActivityHandler, EglFactory, MonoscopicActivityHandler, VrActivityHandler};
use crate::native::{RenderingCallbacks, VrRuntime};
use crate::platform::Platform;
use crate::settings::AppSettings;

/**
 * Picks the handler for a new activity: the VR handler when the native session can be created,
 * the monoscopic one otherwise or when the settings ask for it.
 */
pub struct ActivityHandlerFactory {
  runtime: Arc<dyn VrRuntime>,
  egl: EglFactory,
  vsync: VsyncFactory,
}

impl ActivityHandlerFactory {
  pub fn new(runtime: Arc<dyn VrRuntime>, egl: EglFactory, vsync: VsyncFactory) -> ActivityHandlerFactory {
    ActivityHandlerFactory {
      runtime: runtime,
      egl: egl,
      vsync: vsync,
    }
  }

  pub fn create(&self, platform: Arc<dyn Platform>, settings: Arc<AppSettings>,
    callbacks: Arc<dyn RenderingCallbacks>) -> Box<dyn ActivityHandler> {
    if settings.is_monoscopic() {
      info!("monoscopic mode forced by settings");
      return Box::new(MonoscopicActivityHandler::new());
    }

    match VrActivityHandler::new(settings, self.runtime.clone(), platform, callbacks, self.egl.clone(),
      self.vsync.clone()) {
      Ok(handler) => Box::new(handler),
      Err(e) => {
        warn!("VR mode unavailable ({}), falling back to monoscopic", e);
        Box::new(MonoscopicActivityHandler::new())
      },
    }
  }
}
