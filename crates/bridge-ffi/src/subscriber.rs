//! Subscriber entry points.

use crate::boundary::{guard, read_str, read_topic_list, write_out};
use crate::message::{CMessageListener, MessageCallback, TopicMessageCallback};
use crate::registry::{Registry, NULL_HANDLE};
use crate::transport;
use bridge_bus::Subscriber;
use bridge_telemetry::log_endpoint;
use bridge_types::{validate_port, BridgeError, CurveKey, ResultCode};
use lazy_static::lazy_static;
use std::ffi::CString;
use std::os::raw::c_char;
use std::sync::Arc;

/// A subscriber plus the C copy of its host handed out by
/// [`bridge_get_sub_ip`].
struct SubscriberEntry {
    endpoint: Subscriber,
    ip: CString,
}

lazy_static! {
    static ref SUBSCRIBERS: Registry<SubscriberEntry> = Registry::new();
}

fn with_subscriber<R>(
    handle: u64,
    f: impl FnOnce(&mut Subscriber) -> Result<R, BridgeError>,
) -> Result<R, BridgeError> {
    SUBSCRIBERS.with(handle, |entry| f(&mut entry.endpoint))
}

/// Create a subscriber for `ip:port`. The new token is written to `handle`.
///
/// # Safety
///
/// `ip` must be null or a NUL-terminated string; `handle` must be null or
/// valid for a write of `u64`.
#[no_mangle]
pub unsafe extern "C" fn bridge_create_subscriber(
    ip: *const c_char,
    port: i32,
    sub_cb: MessageCallback,
    topic_cb: TopicMessageCallback,
    handle: *mut u64,
) -> ResultCode {
    guard("create_subscriber", || {
        let ip = read_str(ip, "ip")?;
        if handle.is_null() {
            return Err(BridgeError::NullArgument("handle"));
        }
        let port = validate_port(port)?;
        let listener = Arc::new(CMessageListener {
            on_message: sub_cb,
            on_topic_message: topic_cb,
        });
        let endpoint = Subscriber::create(transport(), &ip, port, listener)?;
        let ip = CString::new(endpoint.ip())
            .map_err(|_| BridgeError::InvalidArgument("ip contains NUL".to_string()))?;
        let token = SUBSCRIBERS.insert(SubscriberEntry { endpoint, ip });
        log_endpoint!(debug, "subscriber", "Handle issued", token = token, port = port);
        write_out(handle, token, "handle")
    })
}

/// Install the client key pair. Must precede start.
///
/// # Safety
///
/// Both keys must be null or NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn bridge_set_client_keys(
    handle: u64,
    client_private_key: *const c_char,
    client_public_key: *const c_char,
) -> ResultCode {
    guard("set_client_keys", || {
        let secret = CurveKey::new(read_str(client_private_key, "client private key")?);
        let public = CurveKey::new(read_str(client_public_key, "client public key")?);
        with_subscriber(handle, |s| s.set_client_keys(secret, public))
    })
}

/// Install the server's public key. Must precede start.
///
/// # Safety
///
/// `key` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn bridge_set_server_public_key(handle: u64, key: *const c_char) -> ResultCode {
    guard("set_server_public_key", || {
        let key = CurveKey::new(read_str(key, "key")?);
        with_subscriber(handle, |s| s.set_server_public_key(key))
    })
}

#[no_mangle]
pub extern "C" fn bridge_start_subscriber(handle: u64) -> ResultCode {
    guard("start_subscriber", || with_subscriber(handle, Subscriber::start))
}

/// Subscribe to every message.
#[no_mangle]
pub extern "C" fn bridge_subscribe(handle: u64) -> ResultCode {
    guard("subscribe", || with_subscriber(handle, Subscriber::subscribe))
}

/// # Safety
///
/// `topic` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn bridge_subscribe_for_topic(handle: u64, topic: *const c_char) -> ResultCode {
    guard("subscribe_for_topic", || {
        let topic = read_str(topic, "topic")?;
        with_subscriber(handle, |s| s.subscribe_topic(&topic))
    })
}

/// # Safety
///
/// `topic_list` must hold `list_size` readable entries.
#[no_mangle]
pub unsafe extern "C" fn bridge_subscribe_for_topic_list(
    handle: u64,
    topic_list: *const *const c_char,
    list_size: i32,
) -> ResultCode {
    guard("subscribe_for_topic_list", || {
        let subscriber = SUBSCRIBERS.get(handle)?;
        let topics = read_topic_list(topic_list, list_size)?;
        let mut entry = subscriber.lock();
        entry.endpoint.subscribe_topics(&topics)
    })
}

/// Connect to the publisher at `ip:port` and subscribe to `topic` there.
///
/// # Safety
///
/// `ip` and `topic` must be null or NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn bridge_subscribe_with_ip_port(
    handle: u64,
    ip: *const c_char,
    port: i32,
    topic: *const c_char,
) -> ResultCode {
    guard("subscribe_with_ip_port", || {
        let ip = read_str(ip, "ip")?;
        let port = validate_port(port)?;
        let topic = read_str(topic, "topic")?;
        with_subscriber(handle, |s| s.subscribe_at(&ip, port, &topic))
    })
}

/// Remove the catch-all subscription.
#[no_mangle]
pub extern "C" fn bridge_unsubscribe(handle: u64) -> ResultCode {
    guard("unsubscribe", || with_subscriber(handle, Subscriber::unsubscribe))
}

/// # Safety
///
/// `topic` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn bridge_unsubscribe_for_topic(handle: u64, topic: *const c_char) -> ResultCode {
    guard("unsubscribe_for_topic", || {
        let topic = read_str(topic, "topic")?;
        with_subscriber(handle, |s| s.unsubscribe_topic(&topic))
    })
}

/// # Safety
///
/// `topic_list` must hold `list_size` readable entries.
#[no_mangle]
pub unsafe extern "C" fn bridge_unsubscribe_for_topic_list(
    handle: u64,
    topic_list: *const *const c_char,
    list_size: i32,
) -> ResultCode {
    guard("unsubscribe_for_topic_list", || {
        let subscriber = SUBSCRIBERS.get(handle)?;
        let topics = read_topic_list(topic_list, list_size)?;
        let mut entry = subscriber.lock();
        entry.endpoint.unsubscribe_topics(&topics)
    })
}

#[no_mangle]
pub extern "C" fn bridge_stop_subscriber(handle: u64) -> ResultCode {
    guard("stop_subscriber", || with_subscriber(handle, Subscriber::stop))
}

/// Write a borrowed pointer to the subscriber's host into `ip`.
///
/// The string stays valid until the next call on the same handle or destroy.
///
/// # Safety
///
/// `ip` must be null or valid for a write of a pointer.
#[no_mangle]
pub unsafe extern "C" fn bridge_get_sub_ip(handle: u64, ip: *mut *const c_char) -> ResultCode {
    guard("get_sub_ip", || {
        if ip.is_null() {
            return Err(BridgeError::NullArgument("ip"));
        }
        let view = SUBSCRIBERS.with(handle, |entry| {
            entry.ip = CString::new(entry.endpoint.ip())
                .map_err(|_| BridgeError::InvalidArgument("ip contains NUL".to_string()))?;
            Ok(entry.ip.as_ptr())
        })?;
        write_out(ip, view, "ip")
    })
}

/// # Safety
///
/// `port` must be null or valid for a write of `i32`.
#[no_mangle]
pub unsafe extern "C" fn bridge_get_sub_port(handle: u64, port: *mut i32) -> ResultCode {
    guard("get_sub_port", || {
        let value = with_subscriber(handle, |s| Ok(s.port()))?;
        write_out(port, i32::from(value), "port")
    })
}

/// Destroy the subscriber and clear the caller's token.
///
/// # Safety
///
/// `handle` must be null or valid for reads and writes of `u64`.
#[no_mangle]
pub unsafe extern "C" fn bridge_destroy_subscriber(handle: *mut u64) -> ResultCode {
    guard("destroy_subscriber", || {
        let token = handle
            .as_ref()
            .copied()
            .ok_or(BridgeError::NullArgument("handle"))?;
        let removed = SUBSCRIBERS.remove(token)?;
        handle.write(NULL_HANDLE);
        log_endpoint!(debug, "subscriber", "Handle released", token = token);
        match removed {
            Some(entry) => entry.endpoint.destroy(),
            None => Ok(()),
        }
    })
}
