//! End-to-end key agreement tests for kxtls.
//! Client and server instances talk only through encoded handshake messages.

#[cfg(test)]
mod tests {
    use kxtls_tls::alert::{Alert, AlertDescription};
    use kxtls_tls::config::TlsConfig;
    use kxtls_tls::crypt::dh::DhParams;
    use kxtls_tls::crypt::keys::{EcdsaServerKey, PeerPublicKey, PrivateKey, RsaServerKey};
    use kxtls_tls::crypt::{NamedGroup, SignatureScheme};
    use kxtls_tls::handshake::codec12::{decode_ecdhe_server_key_exchange, parse_handshake_header};
    use kxtls_tls::handshake::HandshakeType;
    use kxtls_tls::{CipherSuite, ClientHelloInfo, KeyAgreement, PreMasterSecret, ProtocolVersion};
    use kxtls_types::TlsError;
    use num_bigint::BigUint;
    use rand_core::OsRng;
    use std::sync::OnceLock;

    const SERVER_RANDOM: [u8; 32] = [0xA5; 32];

    // 512-bit safe prime, generator 2
    const TEST_P: &str = "cf561c44ccc34e8f5a43b6862b5ab17a8a22b6da78b4892d547341c22b9e71ea3955e14d882da1c3d98fa29f4edfd2d9197b569d20e659a104808068edcc451b";

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn rsa_key() -> RsaServerKey {
        static KEY: OnceLock<rsa::RsaPrivateKey> = OnceLock::new();
        let key = KEY.get_or_init(|| rsa::RsaPrivateKey::new(&mut OsRng, 1024).unwrap());
        RsaServerKey::new(key.clone())
    }

    fn hello(
        version: ProtocolVersion,
        groups: &[NamedGroup],
        schemes: &[SignatureScheme],
    ) -> ClientHelloInfo {
        ClientHelloInfo {
            version,
            random: [0x3C; 32],
            supported_groups: groups.to_vec(),
            signature_algorithms: schemes.to_vec(),
        }
    }

    fn body(msg: &[u8]) -> &[u8] {
        let (_, body, used) = parse_handshake_header(msg).unwrap();
        assert_eq!(used, msg.len());
        body
    }

    struct Transcript {
        server_key_exchange: Option<Vec<u8>>,
        client_key_exchange: Vec<u8>,
        client_secret: PreMasterSecret,
        server_secret: PreMasterSecret,
    }

    /// Drive both sides of the key agreement for `suite`.
    fn handshake(
        suite: CipherSuite,
        config: &TlsConfig,
        key: &dyn PrivateKey,
        peer_key: &PeerPublicKey,
        hello: &ClientHelloInfo,
    ) -> Result<Transcript, TlsError> {
        let mut server = KeyAgreement::for_suite(suite, hello.version)?;
        let mut client = KeyAgreement::for_suite(suite, hello.version)?;

        let ske = server.generate_server_key_exchange(config, key, hello, &SERVER_RANDOM, &mut OsRng)?;
        if let Some(ske) = &ske {
            assert_eq!(ske[0], HandshakeType::ServerKeyExchange as u8);
            client.process_server_key_exchange(config, hello, &SERVER_RANDOM, peer_key, body(ske))?;
        }
        let (client_secret, cke) = client.generate_client_key_exchange(hello, peer_key, &mut OsRng)?;
        assert_eq!(cke[0], HandshakeType::ClientKeyExchange as u8);
        let server_secret =
            server.process_client_key_exchange(key, body(&cke), hello.version, &mut OsRng)?;
        Ok(Transcript {
            server_key_exchange: ske,
            client_key_exchange: cke,
            client_secret,
            server_secret,
        })
    }

    // -------------------------------------------------------
    // 1. ECDHE-RSA, TLS 1.2, X25519, client offers only SHA-256
    // -------------------------------------------------------
    #[test]
    fn test_ecdhe_rsa_x25519_sha256() {
        init_tracing();
        let key = rsa_key();
        let hello = hello(
            ProtocolVersion::TLS12,
            &[NamedGroup::X25519],
            &[SignatureScheme::RSA_PKCS1_SHA256],
        );
        let t = handshake(
            CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
            &TlsConfig::default(),
            &key,
            &key.public_key(),
            &hello,
        )
        .unwrap();

        let ske = t.server_key_exchange.unwrap();
        let parsed = decode_ecdhe_server_key_exchange(body(&ske), ProtocolVersion::TLS12).unwrap();
        assert_eq!(parsed.named_curve, NamedGroup::X25519);
        assert_eq!(parsed.signed.scheme, Some(SignatureScheme::RSA_PKCS1_SHA256));
        assert_eq!(t.client_secret.len(), 32);
        assert_eq!(t.client_secret, t.server_secret);
        // pubLen(1) || 32-byte u-coordinate
        assert_eq!(body(&t.client_key_exchange).len(), 33);
    }

    // -------------------------------------------------------
    // 2. ECDHE over every curve, RSA and P-256/P-384 ECDSA certificates,
    //    TLS 1.0 and 1.2
    // -------------------------------------------------------
    #[test]
    fn test_ecdhe_matrix() {
        let groups = [
            NamedGroup::X25519,
            NamedGroup::SECP256R1,
            NamedGroup::SECP384R1,
            NamedGroup::SECP521R1,
        ];
        let rsa = rsa_key();
        let ecdsa = EcdsaServerKey::P256(p256::ecdsa::SigningKey::random(&mut OsRng));
        let ecdsa384 = EcdsaServerKey::P384(p384::ecdsa::SigningKey::random(&mut OsRng));
        let certs: [(&dyn PrivateKey, PeerPublicKey, CipherSuite); 3] = [
            (
                &rsa,
                rsa.public_key(),
                CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA,
            ),
            (
                &ecdsa,
                ecdsa.public_key(),
                CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA,
            ),
            (
                &ecdsa384,
                ecdsa384.public_key(),
                CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA,
            ),
        ];
        for version in [ProtocolVersion::TLS10, ProtocolVersion::TLS12] {
            for group in groups {
                for (key, public, suite) in &certs {
                    let config = TlsConfig::builder().curve_preferences(&[group]).build();
                    let hello = hello(version, &groups, &[]);
                    let t = handshake(*suite, &config, *key, public, &hello).unwrap();
                    assert_eq!(t.client_secret, t.server_secret, "{group:?} {version:?}");
                }
            }
        }
    }

    // -------------------------------------------------------
    // 3. ECDHE-ECDSA with a P-384 certificate and SHA-384
    // -------------------------------------------------------
    #[test]
    fn test_ecdhe_ecdsa_p384_certificate() {
        let key = EcdsaServerKey::P384(p384::ecdsa::SigningKey::random(&mut OsRng));
        let hello = hello(
            ProtocolVersion::TLS12,
            &[NamedGroup::SECP384R1],
            &[
                SignatureScheme::RSA_PKCS1_SHA256,
                SignatureScheme::ECDSA_SECP384R1_SHA384,
            ],
        );
        let t = handshake(
            CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
            &TlsConfig::default(),
            &key,
            &key.public_key(),
            &hello,
        )
        .unwrap();
        assert_eq!(t.client_secret, t.server_secret);
        assert_eq!(t.server_secret.len(), 48);
    }

    // -------------------------------------------------------
    // 4. DHE-RSA with the RFC 7919 group, TLS 1.1 framing
    // -------------------------------------------------------
    #[test]
    fn test_dhe_rsa_ffdhe2048() {
        let key = rsa_key();
        let config = TlsConfig::builder().dh_params(DhParams::ffdhe2048()).build();
        let hello = hello(ProtocolVersion::TLS11, &[], &[]);
        let t = handshake(
            CipherSuite::TLS_DHE_RSA_WITH_AES_128_CBC_SHA,
            &config,
            &key,
            &key.public_key(),
            &hello,
        )
        .unwrap();
        assert_eq!(t.client_secret, t.server_secret);
        assert!(t.client_secret.len() <= 256);
        assert_ne!(t.client_secret[0], 0);
    }

    // -------------------------------------------------------
    // 5. DHE-RSA, 512-bit group, client sends P-1
    // -------------------------------------------------------
    #[test]
    fn test_dhe_client_sends_p_minus_one() {
        let key = rsa_key();
        let p = BigUint::parse_bytes(TEST_P.as_bytes(), 16).unwrap();
        let config = TlsConfig::builder()
            .dh_params(DhParams::new(&p.to_bytes_be(), &[2]).unwrap())
            .min_dh_bits(512)
            .build();
        let hello = hello(
            ProtocolVersion::TLS12,
            &[],
            &[SignatureScheme::RSA_PKCS1_SHA256],
        );
        let mut server =
            KeyAgreement::for_suite(CipherSuite::TLS_DHE_RSA_WITH_AES_128_GCM_SHA256, hello.version)
                .unwrap();
        let ske = server
            .generate_server_key_exchange(&config, &key, &hello, &SERVER_RANDOM, &mut OsRng)
            .unwrap()
            .unwrap();
        assert!(body(&ske).starts_with(&[0x00, 0x40]));

        let p_minus_one = (&p - 1u32).to_bytes_be();
        let mut cke = (p_minus_one.len() as u16).to_be_bytes().to_vec();
        cke.extend_from_slice(&p_minus_one);
        let err = server
            .process_client_key_exchange(&key, &cke, hello.version, &mut OsRng)
            .unwrap_err();
        assert!(matches!(err, TlsError::IllegalParameter(_)));
        assert!(err.is_security_failure());
        assert_eq!(
            Alert::fatal_for(&err).description,
            AlertDescription::IllegalParameter
        );
    }

    // -------------------------------------------------------
    // 6. Static RSA, TLS 1.2 and SSL 3.0 framing
    // -------------------------------------------------------
    #[test]
    fn test_static_rsa() {
        let key = rsa_key();
        for version in [ProtocolVersion::SSL30, ProtocolVersion::TLS12] {
            let hello = hello(version, &[], &[]);
            let t = handshake(
                CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
                &TlsConfig::default(),
                &key,
                &key.public_key(),
                &hello,
            )
            .unwrap();
            assert!(t.server_key_exchange.is_none());
            assert_eq!(t.client_secret, t.server_secret);
            assert_eq!(&t.server_secret[..2], &version.0.to_be_bytes());
            let expected = if version == ProtocolVersion::SSL30 { 128 } else { 130 };
            assert_eq!(body(&t.client_key_exchange).len(), expected);
        }
    }

    // -------------------------------------------------------
    // 7. A forged ServerKeyExchange maps to decrypt_error
    // -------------------------------------------------------
    #[test]
    fn test_forged_server_key_exchange() {
        let key = rsa_key();
        let impostor = RsaServerKey::new(rsa::RsaPrivateKey::new(&mut OsRng, 1024).unwrap());
        let hello = hello(ProtocolVersion::TLS12, &[NamedGroup::SECP256R1], &[]);
        let err = handshake(
            CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
            &TlsConfig::default(),
            &impostor,
            &key.public_key(),
            &hello,
        )
        .err()
        .unwrap();
        assert!(matches!(err, TlsError::SignatureVerifyFailed(_)));
        assert_eq!(Alert::fatal_for(&err).to_bytes(), [2, 51]);
    }

    // -------------------------------------------------------
    // 8. One byte short anywhere is a decode error
    // -------------------------------------------------------
    #[test]
    fn test_truncated_messages() {
        let key = rsa_key();
        let p = BigUint::parse_bytes(TEST_P.as_bytes(), 16).unwrap();
        let config = TlsConfig::builder()
            .dh_params(DhParams::new(&p.to_bytes_be(), &[2]).unwrap())
            .min_dh_bits(512)
            .build();
        let suites = [
            CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA,
            CipherSuite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
            CipherSuite::TLS_DHE_RSA_WITH_AES_256_GCM_SHA384,
        ];
        let hello = hello(ProtocolVersion::TLS12, &[NamedGroup::SECP256R1], &[]);
        for suite in suites {
            let t = handshake(suite, &config, &key, &key.public_key(), &hello).unwrap();

            if let Some(ske) = &t.server_key_exchange {
                let ske = body(ske);
                let mut client = KeyAgreement::for_suite(suite, hello.version).unwrap();
                let err = client
                    .process_server_key_exchange(
                        &config,
                        &hello,
                        &SERVER_RANDOM,
                        &key.public_key(),
                        &ske[..ske.len() - 1],
                    )
                    .unwrap_err();
                assert!(matches!(err, TlsError::DecodeError(_)), "{suite:?}: {err}");
            }

            let mut server = KeyAgreement::for_suite(suite, hello.version).unwrap();
            server
                .generate_server_key_exchange(&config, &key, &hello, &SERVER_RANDOM, &mut OsRng)
                .unwrap();
            let cke = body(&t.client_key_exchange);
            let err = server
                .process_client_key_exchange(&key, &cke[..cke.len() - 1], hello.version, &mut OsRng)
                .unwrap_err();
            assert!(matches!(err, TlsError::DecodeError(_)), "{suite:?}: {err}");
            assert_eq!(
                Alert::fatal_for(&err).description,
                AlertDescription::DecodeError
            );
        }
    }
}
