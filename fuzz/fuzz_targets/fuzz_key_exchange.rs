#![no_main]
use kxtls_tls::handshake::codec12;
use kxtls_tls::ProtocolVersion;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First byte picks the protocol version for the version-aware decoders
    let Some((&selector, body)) = data.split_first() else {
        return;
    };
    let version = match selector % 3 {
        0 => ProtocolVersion::SSL30,
        1 => ProtocolVersion::TLS10,
        _ => ProtocolVersion::TLS12,
    };

    let _ = codec12::parse_handshake_header(body);
    let _ = codec12::decode_rsa_client_key_exchange(body, version);
    let _ = codec12::decode_ecdhe_client_key_exchange(body);
    let _ = codec12::decode_dhe_client_key_exchange(body);

    if let Ok(ske) = codec12::decode_ecdhe_server_key_exchange(body, version) {
        assert!(ske.params.len() >= 4);
        assert_eq!(&body[..ske.params.len()], ske.params);
    }
    if let Ok(ske) = codec12::decode_dhe_server_key_exchange(body, version) {
        assert_eq!(ske.params.len(), 6 + ske.p.len() + ske.g.len() + ske.public.len());
    }
});
