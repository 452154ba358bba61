use crate::sys::{Driver, Handle, HandleType};

/// Provides access to the raw underlying handle and the driver it has been allocated with.
///
/// # Safety
///
/// The handle provided by `as_handle` must be valid and match the type returned by `handle_type`.
/// It must have been allocated by the driver returned from `driver`.
pub unsafe trait AsHandle {
    /// The raw underlying handle used to talk to the driver. The handle must be valid.
    fn as_handle(&self) -> Handle;

    /// The type of the handle returned by `as_handle`. This is a method rather than a constant
    /// in order to make the type object safe.
    fn handle_type(&self) -> HandleType;

    /// Driver owning the handle.
    fn driver(&self) -> &dyn Driver;
}
