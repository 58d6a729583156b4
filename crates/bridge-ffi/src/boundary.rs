//! Argument decoding and panic containment for `extern "C"` entry points.

use bridge_types::{BridgeError, ResultCode, TopicSet};
use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error};

/// Run one entry point body and collapse its outcome into a [`ResultCode`].
///
/// A panic never crosses the boundary; it is logged and reported as `Error`.
pub(crate) fn guard<F>(operation: &'static str, body: F) -> ResultCode
where
    F: FnOnce() -> Result<(), BridgeError>,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => ResultCode::Ok,
        Ok(Err(e)) => {
            let code = ResultCode::from(&e);
            debug!(operation, error = %e, ?code, "Call rejected");
            code
        }
        Err(_) => {
            error!(operation, "Panic caught at the C boundary");
            ResultCode::Error
        }
    }
}

/// Copy a required C string.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
pub(crate) unsafe fn read_str(ptr: *const c_char, name: &'static str) -> Result<String, BridgeError> {
    if ptr.is_null() {
        return Err(BridgeError::NullArgument(name));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(str::to_owned)
        .map_err(|_| BridgeError::InvalidArgument(format!("{name} is not valid UTF-8")))
}

/// Copy a caller-supplied topic array into a [`TopicSet`].
///
/// # Safety
///
/// `list` must be null or point to `size` entries, each null or a
/// NUL-terminated string.
pub(crate) unsafe fn read_topic_list(
    list: *const *const c_char,
    size: i32,
) -> Result<TopicSet, BridgeError> {
    if list.is_null() {
        return Err(BridgeError::NullArgument("topic list"));
    }
    let size = usize::try_from(size)
        .map_err(|_| BridgeError::InvalidArgument(format!("topic list size {size}")))?;
    if size == 0 {
        return Err(BridgeError::EmptyTopicList);
    }

    let entries = std::slice::from_raw_parts(list, size);
    let topics = entries
        .iter()
        .map(|&entry| read_str(entry, "topic"))
        .collect::<Result<Vec<_>, _>>()?;
    TopicSet::from_list(topics)
}

/// Write through a required out-pointer.
///
/// # Safety
///
/// `out` must be null or valid for a write of `T`.
pub(crate) unsafe fn write_out<T>(out: *mut T, value: T, name: &'static str) -> Result<(), BridgeError> {
    if out.is_null() {
        return Err(BridgeError::NullArgument(name));
    }
    out.write(value);
    Ok(())
}
