//! PCC Crypto
//!
//! Hybrid envelopes that let a client talk to enclave-hosted chaincode through an
//! untrusted host and ledger.
//!
//! A request is encrypted under a fresh symmetric *request key*, which is wrapped for
//! the enclave with its attested RSA public key. The cleartext request carries a second
//! fresh *response key* the enclave encrypts its result with; the enclave then signs the
//! response with its attested P-256 key so validators can trace it back to the enclave.
//!
//! ```text
//! client                         ledger / host                     enclave
//!   │ EncryptionProvider ──query key──▶ registry                      │
//!   │ ctx.conceal() ─────── ChaincodeRequestMessage ───────────▶ open_request()
//!   │                                                              seal_response()
//!   │ ctx.reveal() ◀──── SignedChaincodeResponseMessage ──────────────┘
//! ```

pub mod context;
pub mod enclave;
pub mod error;
pub mod keys;
pub mod messages;
pub mod provider;

pub use context::EncryptionContext;
pub use enclave::{enclave_id_for, EnclaveCrypto};
pub use error::{CryptoError, CryptoResult, PrimitiveError, PrimitiveResult};
pub use keys::SymmetricKey;
pub use messages::{
    AttestedCredentials, ChaincodeRequestMessage, ChaincodeResponseMessage,
    CleartextChaincodeRequest, SignedChaincodeResponseMessage, WireMessage,
};
pub use provider::{ChaincodeKeySource, EncryptionProvider};

// Re-exported so downstream crates name the same key types.
pub use rsa::{RsaPrivateKey, RsaPublicKey};
