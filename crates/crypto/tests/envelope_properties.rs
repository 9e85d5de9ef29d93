//! Property tests for the request/response envelopes

use pcc_crypto::{ChaincodeRequestMessage, EnclaveCrypto, EncryptionContext, WireMessage};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

fn enclave() -> &'static EnclaveCrypto {
    static ENCLAVE: OnceLock<EnclaveCrypto> = OnceLock::new();
    ENCLAVE.get_or_init(|| EnclaveCrypto::generate().unwrap())
}

fn context() -> EncryptionContext {
    let encoded = enclave().public_encryption_key().unwrap();
    let key = pcc_crypto::keys::decode_public_key(&encoded).unwrap();
    EncryptionContext::new(Arc::new(key))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn response_roundtrip(
        function in "[a-zA-Z_]{1,16}",
        args in prop::collection::vec(".{0,24}", 0..4),
        result in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        let mut ctx = context();
        let request_text = ctx.conceal(&function, &args).unwrap();

        let request = enclave().open_request(&request_text).unwrap();
        prop_assert_eq!(&request.function, &function);
        prop_assert_eq!(&request.args, &args);

        let response = enclave().seal_response(&request, "cc", &result).unwrap();
        prop_assert_eq!(ctx.reveal(response.as_bytes()).unwrap(), result);
    }

    #[test]
    fn conceal_never_reuses_keys(calls in 2usize..6) {
        let mut ctx = context();
        let mut response_keys = HashSet::new();
        let mut transports = HashSet::new();

        for _ in 0..calls {
            let text = ctx.conceal("get", &[]).unwrap();
            let request = enclave().open_request(&text).unwrap();
            let message = ChaincodeRequestMessage::from_base64(text.as_bytes()).unwrap();

            prop_assert!(response_keys.insert(request.return_encryption_key));
            prop_assert!(transports.insert(message.encrypted_key_transport_message));
        }
    }
}
