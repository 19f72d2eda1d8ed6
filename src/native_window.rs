use std::ptr::NonNull;

/// Opaque struct for the Android native window.
pub enum ANativeWindow {}

/**
 * Owned reference to the platform window backing the surface view.  Acquired from a Java
 * `Surface` on the UI thread and handed to the render thread; the reference is released on drop.
 */
#[derive(Debug)]
pub struct NativeWindow {
  ptr: NonNull<ANativeWindow>,
}

// ANativeWindow is reference counted and safe to use from any thread.
unsafe impl Send for NativeWindow {}

impl NativeWindow {
  /// Takes ownership of one reference to `ptr`.  Returns None for a null pointer.
  pub unsafe fn from_raw(ptr: *mut ANativeWindow) -> Option<NativeWindow> {
    NonNull::new(ptr).map(|ptr| NativeWindow { ptr: ptr })
  }

  /// Acquires the window behind a `android.view.Surface`.
  #[cfg(target_os = "android")]
  pub unsafe fn from_surface(env: *mut jni::sys::JNIEnv, surface: jni::sys::jobject) -> Option<NativeWindow> {
    NativeWindow::from_raw(ANativeWindow_fromSurface(env, surface))
  }

  pub fn as_ptr(&self) -> *mut ANativeWindow {
    self.ptr.as_ptr()
  }

  /// Reconfigures the window buffers to the given EGL native visual format.
  #[cfg(target_os = "android")]
  pub fn set_buffers_geometry(&self, width: i32, height: i32, format: i32) -> i32 {
    unsafe {
      ANativeWindow_setBuffersGeometry(self.as_ptr(), width, height, format)
    }
  }

  #[cfg(test)]
  pub fn fake() -> NativeWindow {
    NativeWindow { ptr: NonNull::dangling() }
  }
}

#[cfg(target_os = "android")]
impl Drop for NativeWindow {
  fn drop(&mut self) {
    unsafe {
      ANativeWindow_release(self.as_ptr());
    }
  }
}

#[cfg(target_os = "android")]
#[link(name = "android")]
extern "C" {
  fn ANativeWindow_fromSurface(env: *mut jni::sys::JNIEnv, surface: jni::sys::jobject) -> *mut ANativeWindow;
  fn ANativeWindow_release(window: *mut ANativeWindow);
  fn ANativeWindow_setBuffersGeometry(window: *mut ANativeWindow, width: i32, height: i32, format: i32) -> i32;
}
