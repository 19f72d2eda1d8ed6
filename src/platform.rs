/**
 * Services of the hosting Android activity and its surface view that the handlers need.  The JNI
 * layer implements this over the Java objects; tests record the calls.
 */
pub trait Platform: Send + Sync {
  /// Natural size of the display in pixels.
  fn display_size(&self) -> (i32, i32);

  /// True if the headset is already docked, checked once the scene is set.
  fn is_docked(&self) -> bool;

  /// Pins the surface view's buffer to a fixed size instead of the display size.
  fn set_fixed_surface_size(&self, width: i32, height: i32);

  /// Lets the surface view release its surface while the activity is in the background.
  fn pause_surface(&self);

  fn resume_surface(&self);

  /// Ends the activity.  Used when the render surfaces cannot be brought up.
  fn finish(&self);
}
