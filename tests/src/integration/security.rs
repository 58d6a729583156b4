//! # Secured Channels
//!
//! Key configuration on both endpoints and its effect on delivery.

#[cfg(test)]
mod tests {
    use crate::fixtures::{
        ChannelListener, CLIENT_PUBLIC_KEY, CLIENT_SECRET_KEY, SERVER_PUBLIC_KEY,
        SERVER_SECRET_KEY,
    };
    use bridge_bus::{MemoryTransport, NoopListener, Publisher, Subscriber};
    use bridge_types::{BridgeError, ByteData, CurveKey, Message, ResultCode, TransportError};
    use std::sync::Arc;

    fn key(s: &str) -> CurveKey {
        CurveKey::new(s)
    }

    fn secured_subscriber(
        transport: &MemoryTransport,
        port: u16,
    ) -> (Subscriber, crate::fixtures::Inbox) {
        let (listener, inbox) = ChannelListener::new();
        let mut sub = Subscriber::create(transport, "localhost", port, Arc::new(listener)).unwrap();
        sub.set_client_keys(key(CLIENT_SECRET_KEY), key(CLIENT_PUBLIC_KEY))
            .unwrap();
        sub.set_server_public_key(key(SERVER_PUBLIC_KEY)).unwrap();
        (sub, inbox)
    }

    #[test]
    fn test_secured_pair_exchanges_messages() {
        let transport = MemoryTransport::new();
        let (mut sub, inbox) = secured_subscriber(&transport, 5600);
        sub.subscribe().unwrap();
        sub.start().unwrap();

        let mut publisher = Publisher::create(&transport, 5600, Arc::new(NoopListener)).unwrap();
        publisher
            .set_server_secret_key(key(SERVER_SECRET_KEY))
            .unwrap();
        publisher.start().unwrap();
        publisher
            .publish(&Message::from(ByteData::from("classified")))
            .unwrap();

        assert_eq!(inbox.next().1, Message::from(ByteData::from("classified")));
    }

    #[test]
    fn test_plain_subscriber_cannot_read_secured_publisher() {
        let transport = MemoryTransport::new();
        let (listener, inbox) = ChannelListener::new();
        let mut sub = Subscriber::create(&transport, "localhost", 5601, Arc::new(listener)).unwrap();
        sub.subscribe().unwrap();
        sub.start().unwrap();

        let mut publisher = Publisher::create(&transport, 5601, Arc::new(NoopListener)).unwrap();
        publisher
            .set_server_secret_key(key(SERVER_SECRET_KEY))
            .unwrap();
        publisher.start().unwrap();
        publisher
            .publish(&Message::from(ByteData::from("classified")))
            .unwrap();

        assert!(inbox.is_quiet());
    }

    #[test]
    fn test_empty_client_key_is_error_and_endpoint_survives() {
        let transport = MemoryTransport::new();
        let (listener, _inbox) = ChannelListener::new();
        let mut sub = Subscriber::create(&transport, "localhost", 5602, Arc::new(listener)).unwrap();

        let err = sub
            .set_client_keys(key(""), key(CLIENT_PUBLIC_KEY))
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Transport(TransportError::InvalidKey(_))
        ));
        assert_eq!(ResultCode::from(&err), ResultCode::Error);

        assert!(sub.start().is_ok());
        assert!(sub.destroy().is_ok());
    }

    #[test]
    fn test_keys_after_start_rejected_on_both_endpoints() {
        let transport = MemoryTransport::new();
        let (listener, _inbox) = ChannelListener::new();
        let mut sub = Subscriber::create(&transport, "localhost", 5603, Arc::new(listener)).unwrap();
        let mut publisher = Publisher::create(&transport, 5603, Arc::new(NoopListener)).unwrap();
        sub.start().unwrap();
        publisher.start().unwrap();

        assert_eq!(
            sub.set_server_public_key(key(SERVER_PUBLIC_KEY)),
            Err(BridgeError::AlreadyStarted)
        );
        assert_eq!(
            publisher.set_server_secret_key(key(SERVER_SECRET_KEY)),
            Err(BridgeError::AlreadyStarted)
        );
    }

    #[test]
    fn test_key_debug_output_is_redacted() {
        let rendered = format!("{:?}", key(SERVER_SECRET_KEY));
        assert!(!rendered.contains(SERVER_SECRET_KEY));
    }
}
