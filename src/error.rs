use std::io;

use thiserror::Error;

use crate::egl;
use crate::handler::HandlerState;

#[derive(Debug, Error)]
pub enum Error {
  /// EGL bring-up failed: no usable config, no ES3 context, or a surface could not be built.
  #[error("EGL failure: {0}")]
  Egl(#[from] egl::Error),
  /// The native VR runtime refused to create a session.
  #[error("native VR session could not be created")]
  SessionCreate,
  /// A lifecycle operation was invoked out of order.
  #[error("{op} is not allowed in the {state:?} state")]
  InvalidState {
    op: &'static str,
    state: HandlerState,
  },
  #[error("a script was already set on this handler")]
  ScriptAlreadySet,
  #[error("the render thread has exited")]
  RenderThreadGone,
  #[error("failed to spawn thread {name}: {source}")]
  Spawn {
    name: String,
    #[source]
    source: io::Error,
  },
}

pub type Result<T> = std::result::Result<T, Error>;
