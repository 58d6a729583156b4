//! # C ABI Flows
//!
//! Drives endpoints only through the `extern "C"` surface, the way a C host
//! would: integer tokens, NUL-terminated strings, message views and plain
//! function-pointer callbacks.

#[cfg(test)]
mod tests {
    use bridge_ffi::publisher::*;
    use bridge_ffi::subscriber::*;
    use bridge_ffi::{
        BridgeMessage, BRIDGE_CONTENT_TYPE_BYTEDATA, BRIDGE_CONTENT_TYPE_EVENT, NULL_HANDLE,
    };
    use bridge_types::{Event, ResultCode};
    use parking_lot::{const_mutex, Mutex};
    use std::ffi::{CStr, CString};
    use std::os::raw::c_char;
    use std::ptr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};

    use crate::fixtures::{sample_event, CLIENT_PUBLIC_KEY, DELIVERY_TIMEOUT, QUIET_PERIOD};

    // =========================================================================
    // CALLBACK PLUMBING
    // =========================================================================

    type Delivered = (Option<String>, u32, Vec<u8>);

    static EVENTS_LOG: Mutex<Vec<Delivered>> = const_mutex(Vec::new());
    static TOPICS_LOG: Mutex<Vec<Delivered>> = const_mutex(Vec::new());
    static STARTS: AtomicUsize = AtomicUsize::new(0);
    static STOPS: AtomicUsize = AtomicUsize::new(0);

    unsafe fn payload(message: *const BridgeMessage) -> (u32, Vec<u8>) {
        let view = &*message;
        let bytes = if view.payload_len == 0 {
            Vec::new()
        } else {
            std::slice::from_raw_parts(view.payload, view.payload_len).to_vec()
        };
        (view.content_type, bytes)
    }

    extern "C" fn events_untopiced(message: *const BridgeMessage, content_type: u32) {
        let (_, bytes) = unsafe { payload(message) };
        EVENTS_LOG.lock().push((None, content_type, bytes));
    }

    extern "C" fn events_topiced(topic: *const c_char, message: *const BridgeMessage, content_type: u32) {
        let topic = unsafe { CStr::from_ptr(topic) }.to_string_lossy().into_owned();
        let (_, bytes) = unsafe { payload(message) };
        EVENTS_LOG.lock().push((Some(topic), content_type, bytes));
    }

    extern "C" fn topics_topiced(topic: *const c_char, message: *const BridgeMessage, content_type: u32) {
        let topic = unsafe { CStr::from_ptr(topic) }.to_string_lossy().into_owned();
        let (_, bytes) = unsafe { payload(message) };
        TOPICS_LOG.lock().push((Some(topic), content_type, bytes));
    }

    extern "C" fn count_start(code: ResultCode) {
        if code == ResultCode::Ok {
            STARTS.fetch_add(1, Ordering::SeqCst);
        }
    }

    extern "C" fn count_stop(code: ResultCode) {
        if code == ResultCode::Ok {
            STOPS.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn wait_for(log: &Mutex<Vec<Delivered>>, count: usize, within: Duration) -> Vec<Delivered> {
        let deadline = Instant::now() + within;
        while log.lock().len() < count && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        log.lock().clone()
    }

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    // =========================================================================
    // SCENARIOS
    // =========================================================================

    #[test]
    fn test_publish_hello_on_topic_without_subscribers() {
        let mut publisher = NULL_HANDLE;
        unsafe {
            assert_eq!(
                bridge_create_publisher(5562, None, None, None, &mut publisher),
                ResultCode::Ok
            );
            assert_eq!(bridge_start_publisher(publisher), ResultCode::Ok);

            let topic = c("topicA");
            let message = BridgeMessage::view(BRIDGE_CONTENT_TYPE_BYTEDATA, b"hello");
            assert_eq!(
                bridge_publish_on_topic(publisher, topic.as_ptr(), &message),
                ResultCode::Ok
            );
            assert_eq!(bridge_destroy_publisher(&mut publisher), ResultCode::Ok);
        }
        assert_eq!(publisher, NULL_HANDLE);
    }

    #[test]
    fn test_subscribe_for_empty_topic_list() {
        let ip = c("localhost");
        let (a, b) = (c("a"), c("b"));
        let list = [a.as_ptr(), b.as_ptr()];
        let mut subscriber = NULL_HANDLE;
        unsafe {
            assert_eq!(
                bridge_create_subscriber(ip.as_ptr(), 5562, None, None, &mut subscriber),
                ResultCode::Ok
            );
            assert_eq!(
                bridge_subscribe_for_topic_list(subscriber, list.as_ptr(), 0),
                ResultCode::InvalidTopicList
            );
            assert_eq!(bridge_destroy_subscriber(&mut subscriber), ResultCode::Ok);
        }
    }

    #[test]
    fn test_empty_client_private_key() {
        let ip = c("localhost");
        let empty = c("");
        let public = c(CLIENT_PUBLIC_KEY);
        let mut subscriber = NULL_HANDLE;
        unsafe {
            bridge_create_subscriber(ip.as_ptr(), 5562, None, None, &mut subscriber);
            assert_eq!(
                bridge_set_client_keys(subscriber, empty.as_ptr(), public.as_ptr()),
                ResultCode::Error
            );
            assert_eq!(bridge_destroy_subscriber(&mut subscriber), ResultCode::Ok);
            assert_eq!(
                bridge_destroy_subscriber(&mut subscriber),
                ResultCode::NullArgument
            );
        }
    }

    #[test]
    fn test_negative_ports_never_issue_handles() {
        let ip = c("localhost");
        for port in [-1, -5562, i32::MIN] {
            let mut publisher = NULL_HANDLE;
            let mut subscriber = NULL_HANDLE;
            unsafe {
                assert_eq!(
                    bridge_create_publisher(port, None, None, None, &mut publisher),
                    ResultCode::InvalidArgument
                );
                assert_eq!(
                    bridge_create_subscriber(ip.as_ptr(), port, None, None, &mut subscriber),
                    ResultCode::InvalidArgument
                );
            }
            assert_eq!(publisher, NULL_HANDLE);
            assert_eq!(subscriber, NULL_HANDLE);
        }
    }

    #[test]
    fn test_event_and_bytes_round_trip_through_callbacks() {
        let ip = c("localhost");
        let mut subscriber = NULL_HANDLE;
        let mut publisher = NULL_HANDLE;
        let event = sample_event("c-abi");
        let encoded = event.encode().unwrap();

        unsafe {
            bridge_create_subscriber(
                ip.as_ptr(),
                5700,
                Some(events_untopiced),
                Some(events_topiced),
                &mut subscriber,
            );
            assert_eq!(bridge_subscribe(subscriber), ResultCode::Ok);
            assert_eq!(bridge_start_subscriber(subscriber), ResultCode::Ok);

            bridge_create_publisher(5700, Some(count_start), Some(count_stop), None, &mut publisher);
            assert_eq!(bridge_start_publisher(publisher), ResultCode::Ok);

            let as_event = BridgeMessage::view(BRIDGE_CONTENT_TYPE_EVENT, &encoded);
            let as_bytes = BridgeMessage::view(BRIDGE_CONTENT_TYPE_BYTEDATA, b"\x00\x01\x02");
            let topic = c("readings/kitchen");
            assert_eq!(bridge_publish(publisher, &as_event), ResultCode::Ok);
            assert_eq!(
                bridge_publish_on_topic(publisher, topic.as_ptr(), &as_bytes),
                ResultCode::Ok
            );
        }

        let log = wait_for(&EVENTS_LOG, 2, DELIVERY_TIMEOUT);
        assert_eq!(log.len(), 2);

        let (topic, tag, bytes) = &log[0];
        assert_eq!(*topic, None);
        assert_eq!(*tag, BRIDGE_CONTENT_TYPE_EVENT);
        assert_eq!(Event::decode(bytes).unwrap(), event);

        assert_eq!(
            log[1],
            (
                Some("readings/kitchen".to_string()),
                BRIDGE_CONTENT_TYPE_BYTEDATA,
                vec![0, 1, 2]
            )
        );

        unsafe {
            assert_eq!(bridge_stop_publisher(publisher), ResultCode::Ok);
            bridge_destroy_publisher(&mut publisher);
            bridge_destroy_subscriber(&mut subscriber);
        }
        assert_eq!(STARTS.load(Ordering::SeqCst), 1);
        assert_eq!(STOPS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_topic_list_and_unsubscribe_through_c_abi() {
        let ip = c("localhost");
        let (alpha, beta) = (c("alpha"), c("beta"));
        let list = [alpha.as_ptr(), beta.as_ptr()];
        let only_alpha = [alpha.as_ptr()];
        let mut subscriber = NULL_HANDLE;
        let mut publisher = NULL_HANDLE;

        unsafe {
            bridge_create_subscriber(ip.as_ptr(), 5701, None, Some(topics_topiced), &mut subscriber);
            assert_eq!(
                bridge_subscribe_for_topic_list(subscriber, list.as_ptr(), 2),
                ResultCode::Ok
            );
            assert_eq!(bridge_start_subscriber(subscriber), ResultCode::Ok);
            assert_eq!(
                bridge_unsubscribe_for_topic_list(subscriber, only_alpha.as_ptr(), 1),
                ResultCode::Ok
            );

            bridge_create_publisher(5701, None, None, None, &mut publisher);
            bridge_start_publisher(publisher);
            let message = BridgeMessage::view(BRIDGE_CONTENT_TYPE_BYTEDATA, b"m");
            assert_eq!(
                bridge_publish_on_topic_list(publisher, list.as_ptr(), 2, &message),
                ResultCode::Ok
            );
        }

        let log = wait_for(&TOPICS_LOG, 1, DELIVERY_TIMEOUT);
        thread::sleep(QUIET_PERIOD);
        let topics: Vec<_> = TOPICS_LOG.lock().iter().map(|d| d.0.clone()).collect();
        assert_eq!(log.len(), 1);
        assert_eq!(topics, vec![Some("beta".to_string())]);

        unsafe {
            bridge_destroy_publisher(&mut publisher);
            bridge_destroy_subscriber(&mut subscriber);
        }
    }

    #[test]
    fn test_unknown_content_type_rejected_before_send() {
        let mut publisher = NULL_HANDLE;
        unsafe {
            bridge_create_publisher(5702, None, None, None, &mut publisher);
            bridge_start_publisher(publisher);

            let bogus = BridgeMessage::view(99, b"x");
            assert_eq!(
                bridge_publish(publisher, &bogus),
                ResultCode::InvalidContentType
            );

            let not_json = BridgeMessage::view(BRIDGE_CONTENT_TYPE_EVENT, b"{broken");
            assert_eq!(
                bridge_publish(publisher, &not_json),
                ResultCode::InvalidContentType
            );
            bridge_destroy_publisher(&mut publisher);
        }
    }

    #[test]
    fn test_get_ip_tracks_subscribe_with_ip_port() {
        let ip = c("localhost");
        let other = c("10.0.0.7");
        let topic = c("news");
        let mut subscriber = NULL_HANDLE;
        let mut reported: *const c_char = ptr::null();
        let mut port = 0;

        unsafe {
            bridge_create_subscriber(ip.as_ptr(), 5703, None, None, &mut subscriber);
            assert_eq!(bridge_get_sub_ip(subscriber, &mut reported), ResultCode::Ok);
            assert_eq!(CStr::from_ptr(reported).to_str().unwrap(), "localhost");

            assert_eq!(
                bridge_subscribe_with_ip_port(subscriber, other.as_ptr(), 5704, topic.as_ptr()),
                ResultCode::Error
            );
            assert_eq!(bridge_start_subscriber(subscriber), ResultCode::Ok);

            assert_eq!(
                bridge_subscribe_with_ip_port(subscriber, other.as_ptr(), 5704, topic.as_ptr()),
                ResultCode::Ok
            );
            assert_eq!(bridge_get_sub_ip(subscriber, &mut reported), ResultCode::Ok);
            assert_eq!(CStr::from_ptr(reported).to_str().unwrap(), "10.0.0.7");
            assert_eq!(bridge_get_sub_port(subscriber, &mut port), ResultCode::Ok);
            assert_eq!(port, 5704);

            assert_eq!(
                bridge_subscribe_with_ip_port(subscriber, other.as_ptr(), -1, topic.as_ptr()),
                ResultCode::InvalidArgument
            );
            bridge_destroy_subscriber(&mut subscriber);
        }
    }

    #[test]
    fn test_stale_tokens_resolve_to_null_argument() {
        let mut publisher = NULL_HANDLE;
        unsafe {
            bridge_create_publisher(5705, None, None, None, &mut publisher);
        }
        let stale = publisher;
        unsafe {
            bridge_destroy_publisher(&mut publisher);
        }

        let mut port = 0;
        assert_eq!(bridge_start_publisher(stale), ResultCode::NullArgument);
        assert_eq!(bridge_stop_publisher(stale), ResultCode::NullArgument);
        assert_eq!(
            unsafe { bridge_get_pub_port(stale, &mut port) },
            ResultCode::NullArgument
        );
        assert_eq!(port, 0);
    }
}
