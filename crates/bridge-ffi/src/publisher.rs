//! Publisher entry points.

use crate::boundary::{guard, read_str, read_topic_list, write_out};
use crate::message::{BridgeMessage, CLifecycleListener, LifecycleCallback};
use crate::registry::{Registry, NULL_HANDLE};
use crate::transport;
use bridge_bus::Publisher;
use bridge_telemetry::log_endpoint;
use bridge_types::{validate_port, BridgeError, CurveKey, ResultCode};
use lazy_static::lazy_static;
use std::os::raw::c_char;
use std::sync::Arc;

lazy_static! {
    static ref PUBLISHERS: Registry<Publisher> = Registry::new();
}

/// Create a publisher for `port`. The new token is written to `handle`.
///
/// # Safety
///
/// `handle` must be null or valid for a write of `u64`.
#[no_mangle]
pub unsafe extern "C" fn bridge_create_publisher(
    port: i32,
    start_cb: LifecycleCallback,
    stop_cb: LifecycleCallback,
    error_cb: LifecycleCallback,
    handle: *mut u64,
) -> ResultCode {
    guard("create_publisher", || {
        if handle.is_null() {
            return Err(BridgeError::NullArgument("handle"));
        }
        let port = validate_port(port)?;
        let listener = Arc::new(CLifecycleListener {
            on_start: start_cb,
            on_stop: stop_cb,
            on_error: error_cb,
        });
        let publisher = Publisher::create(transport(), port, listener)?;
        let token = PUBLISHERS.insert(publisher);
        log_endpoint!(debug, "publisher", "Handle issued", token = token, port = port);
        write_out(handle, token, "handle")
    })
}

/// Install the server secret key. Must precede start.
///
/// # Safety
///
/// `key` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn bridge_set_server_private_key(handle: u64, key: *const c_char) -> ResultCode {
    guard("set_server_private_key", || {
        let key = CurveKey::new(read_str(key, "key")?);
        PUBLISHERS.with(handle, |publisher| publisher.set_server_secret_key(key))
    })
}

#[no_mangle]
pub extern "C" fn bridge_start_publisher(handle: u64) -> ResultCode {
    guard("start_publisher", || PUBLISHERS.with(handle, Publisher::start))
}

/// Publish without a topic.
///
/// # Safety
///
/// `message` must be null or point to a valid [`BridgeMessage`].
#[no_mangle]
pub unsafe extern "C" fn bridge_publish(handle: u64, message: *const BridgeMessage) -> ResultCode {
    guard("publish", || {
        let publisher = PUBLISHERS.get(handle)?;
        let message = BridgeMessage::read(message)?;
        let mut publisher = publisher.lock();
        publisher.publish(&message)
    })
}

/// Publish on one topic.
///
/// # Safety
///
/// `topic` must be null or a NUL-terminated string; `message` must be null or
/// point to a valid [`BridgeMessage`].
#[no_mangle]
pub unsafe extern "C" fn bridge_publish_on_topic(
    handle: u64,
    topic: *const c_char,
    message: *const BridgeMessage,
) -> ResultCode {
    guard("publish_on_topic", || {
        let publisher = PUBLISHERS.get(handle)?;
        let topic = read_str(topic, "topic")?;
        let message = BridgeMessage::read(message)?;
        let mut publisher = publisher.lock();
        publisher.publish_on_topic(&topic, &message)
    })
}

/// Publish once per topic in `topic_list`, in order.
///
/// # Safety
///
/// `topic_list` must hold `list_size` readable entries; `message` must be
/// null or point to a valid [`BridgeMessage`].
#[no_mangle]
pub unsafe extern "C" fn bridge_publish_on_topic_list(
    handle: u64,
    topic_list: *const *const c_char,
    list_size: i32,
    message: *const BridgeMessage,
) -> ResultCode {
    guard("publish_on_topic_list", || {
        let publisher = PUBLISHERS.get(handle)?;
        let message = BridgeMessage::read(message)?;
        let topics = read_topic_list(topic_list, list_size)?;
        let mut publisher = publisher.lock();
        publisher.publish_on_topics(&topics, &message)
    })
}

#[no_mangle]
pub extern "C" fn bridge_stop_publisher(handle: u64) -> ResultCode {
    guard("stop_publisher", || PUBLISHERS.with(handle, Publisher::stop))
}

/// Write the publisher's port to `port`.
///
/// # Safety
///
/// `port` must be null or valid for a write of `i32`.
#[no_mangle]
pub unsafe extern "C" fn bridge_get_pub_port(handle: u64, port: *mut i32) -> ResultCode {
    guard("get_pub_port", || {
        let value = PUBLISHERS.with(handle, |publisher| Ok(publisher.port()))?;
        write_out(port, i32::from(value), "port")
    })
}

/// Destroy the publisher and clear the caller's token.
///
/// # Safety
///
/// `handle` must be null or valid for reads and writes of `u64`.
#[no_mangle]
pub unsafe extern "C" fn bridge_destroy_publisher(handle: *mut u64) -> ResultCode {
    guard("destroy_publisher", || {
        let token = handle
            .as_ref()
            .copied()
            .ok_or(BridgeError::NullArgument("handle"))?;
        let removed = PUBLISHERS.remove(token)?;
        handle.write(NULL_HANDLE);
        log_endpoint!(debug, "publisher", "Handle released", token = token);
        match removed {
            Some(publisher) => publisher.destroy(),
            // The last in-flight call drops and closes it.
            None => Ok(()),
        }
    })
}
