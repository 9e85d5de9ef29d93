//! Enclave registration and ledger-side validation of its responses

use pcc_attestation::{
    simulation::simulated_measurement, DcapIssuer, IssuerRegistry, SimulationIssuer,
    DCAP_EVIDENCE_TYPE, SIMULATION_EVIDENCE_TYPE,
};
use pcc_crypto::{
    CleartextChaincodeRequest, EnclaveCrypto, SignedChaincodeResponseMessage, SymmetricKey,
    WireMessage,
};
use pcc_rs::pcc_validation::endorsement::{enclave_key, measurement_key};
use pcc_rs::pcc_validation::{
    Block, ContextDatum, Dependency, State, StateFetcher, ValidationError, ValidationPlugin,
    ValidationPluginFactory, ValidationResult, ValidatorChain,
};
use pcc_rs::PccConfig;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

const CHAINCODE: &str = "secret-cc";

fn enclave() -> &'static EnclaveCrypto {
    static ENCLAVE: OnceLock<EnclaveCrypto> = OnceLock::new();
    ENCLAVE.get_or_init(|| EnclaveCrypto::generate().unwrap())
}

/// World state snapshot shared by all fetched [`State`] handles
#[derive(Default)]
struct InMemoryWorldState {
    entries: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryWorldState {
    fn put(&self, namespace: &str, key: String, value: Vec<u8>) {
        self.entries
            .lock()
            .unwrap()
            .insert((namespace.to_string(), key), value);
    }
}

struct Snapshot(HashMap<(String, String), Vec<u8>>);

impl State for Snapshot {
    fn get_state(&self, namespace: &str, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.0.get(&(namespace.to_string(), key.to_string())).cloned())
    }

    fn done(&mut self) {}
}

impl StateFetcher for InMemoryWorldState {
    fn fetch_state(&self) -> anyhow::Result<Box<dyn State>> {
        Ok(Box::new(Snapshot(self.entries.lock().unwrap().clone())))
    }
}

/// Default validator accepting every transaction with a non-empty policy
struct PolicyPresent;

impl ValidationPlugin for PolicyPresent {
    fn init(&mut self, _dependencies: &[Dependency]) -> ValidationResult<()> {
        Ok(())
    }

    fn validate(
        &self,
        _block: &Block,
        _namespace: &str,
        _tx_position: usize,
        _action_position: usize,
        context: &[ContextDatum],
    ) -> ValidationResult<()> {
        match context.first() {
            Some(ContextDatum::SerializedPolicy(policy)) if !policy.is_empty() => Ok(()),
            _ => Err(ValidationError::EndorsementPolicy("no policy".to_string())),
        }
    }
}

struct PolicyPresentFactory;

impl ValidationPluginFactory for PolicyPresentFactory {
    fn new_plugin(&self) -> Box<dyn ValidationPlugin> {
        Box::new(PolicyPresent)
    }
}

/// Register the enclave the way a peer would after attesting it
fn register_enclave(world: &InMemoryWorldState, issuers: &IssuerRegistry) {
    register_enclave_for(world, issuers, CHAINCODE);
}

fn register_enclave_for(world: &InMemoryWorldState, issuers: &IssuerRegistry, chaincode: &str) {
    let evidence = issuers.issue(&enclave().verifying_key_bytes()).unwrap();
    let credentials = enclave().attested_credentials(chaincode, evidence).unwrap();

    world.put(
        "ercc",
        measurement_key(chaincode),
        hex::encode(simulated_measurement()).into_bytes(),
    );
    world.put(
        "ercc",
        enclave_key(chaincode, &enclave().enclave_id()),
        credentials.to_bytes().unwrap(),
    );
}

fn enclave_response(result: &[u8]) -> Vec<u8> {
    enclave_response_for(CHAINCODE, result)
}

fn enclave_response_for(chaincode: &str, result: &[u8]) -> Vec<u8> {
    let request = CleartextChaincodeRequest {
        function: "transfer".to_string(),
        args: vec!["alice".into(), "bob".into(), "10".into()],
        return_encryption_key: SymmetricKey::generate().as_bytes().to_vec(),
    };
    let sealed = enclave().seal_response(&request, chaincode, result).unwrap();
    SignedChaincodeResponseMessage::from_base64(sealed.as_bytes())
        .unwrap()
        .to_bytes()
        .unwrap()
}

fn chain(config: &PccConfig, world: Arc<InMemoryWorldState>) -> ValidatorChain {
    let mut chain = ValidatorChain::new(
        Arc::new(PolicyPresentFactory),
        config.endorsement_validator_factory().unwrap(),
    );
    chain.init(&[Dependency::StateFetcher(world)]).unwrap();
    chain
}

fn simulation_config() -> PccConfig {
    let mut config = PccConfig::new(CHAINCODE);
    config.attestation.allow_simulation = true;
    config
}

fn issuers_without_hardware() -> (tempfile::TempDir, IssuerRegistry) {
    let dir = tempfile::tempdir().unwrap();
    let mut issuers =
        IssuerRegistry::new(DCAP_EVIDENCE_TYPE).with_fallback(SIMULATION_EVIDENCE_TYPE);
    issuers.register(Arc::new(DcapIssuer::new(dir.path().join("attestation"))));
    issuers.register(Arc::new(SimulationIssuer::default()));
    (dir, issuers)
}

#[test]
fn fallback_evidence_is_accepted_when_simulation_allowed() {
    let (_dir, issuers) = issuers_without_hardware();
    let world = Arc::new(InMemoryWorldState::default());
    register_enclave(&world, &issuers);

    let chain = chain(&simulation_config(), world);
    let block = Block::new(7, vec![enclave_response(b"ok")]);
    let context = [ContextDatum::SerializedPolicy(b"policy".to_vec())];

    chain.validate(&block, CHAINCODE, 0, 0, &context).unwrap();
}

#[test]
fn simulation_evidence_rejected_in_production_config() {
    let (_dir, issuers) = issuers_without_hardware();
    let world = Arc::new(InMemoryWorldState::default());
    register_enclave(&world, &issuers);

    let chain = chain(&PccConfig::new(CHAINCODE), world);
    let block = Block::new(7, vec![enclave_response(b"ok")]);
    let context = [ContextDatum::SerializedPolicy(b"policy".to_vec())];

    assert!(matches!(
        chain.validate(&block, CHAINCODE, 0, 0, &context),
        Err(ValidationError::EndorsementPolicy(_))
    ));
}

#[test]
fn unregistered_enclave_is_rejected() {
    let world = Arc::new(InMemoryWorldState::default());
    let chain = chain(&simulation_config(), world);
    let block = Block::new(1, vec![enclave_response(b"ok")]);
    let context = [ContextDatum::SerializedPolicy(b"policy".to_vec())];

    assert!(matches!(
        chain.validate(&block, CHAINCODE, 0, 0, &context),
        Err(ValidationError::EndorsementPolicy(_))
    ));
}

#[test]
fn response_attested_for_other_chaincode_is_rejected() {
    let (_dir, issuers) = issuers_without_hardware();
    let world = Arc::new(InMemoryWorldState::default());
    register_enclave_for(&world, &issuers, "evil-cc");

    let secret_chain = chain(&simulation_config(), world.clone());
    let block = Block::new(5, vec![enclave_response_for("evil-cc", b"ok")]);
    let context = [ContextDatum::SerializedPolicy(b"policy".to_vec())];
    match secret_chain.validate(&block, CHAINCODE, 0, 0, &context) {
        Err(ValidationError::EndorsementPolicy(msg)) => assert!(msg.contains("evil-cc")),
        other => panic!("Expected EndorsementPolicy, got {:?}", other),
    }

    // The same response is valid for the chaincode it was produced for.
    let mut config = simulation_config();
    config.chaincode_name = "evil-cc".to_string();
    chain(&config, world)
        .validate(&block, "evil-cc", 0, 0, &context)
        .unwrap();
}

#[test]
fn tampered_response_is_rejected() {
    let (_dir, issuers) = issuers_without_hardware();
    let world = Arc::new(InMemoryWorldState::default());
    register_enclave(&world, &issuers);
    let chain = chain(&simulation_config(), world);

    // Signature of one response attached to another
    let mut signed = SignedChaincodeResponseMessage::from_bytes(&enclave_response(b"ok")).unwrap();
    let forged = SignedChaincodeResponseMessage::from_bytes(&enclave_response(b"forged")).unwrap();
    signed.chaincode_response_message = forged.chaincode_response_message;

    let block = Block::new(2, vec![signed.to_bytes().unwrap()]);
    let context = [ContextDatum::SerializedPolicy(b"policy".to_vec())];
    assert!(matches!(
        chain.validate(&block, CHAINCODE, 0, 0, &context),
        Err(ValidationError::EndorsementPolicy(_))
    ));
}

#[test]
fn default_validator_short_circuits() {
    let world = Arc::new(InMemoryWorldState::default());
    let chain = chain(&simulation_config(), world);
    let block = Block::new(3, vec![b"not a response".to_vec()]);

    // Empty policy is rejected by the default validator before the custom one runs.
    let context = [ContextDatum::SerializedPolicy(Vec::new())];
    assert_eq!(
        chain.validate(&block, CHAINCODE, 0, 0, &context),
        Err(ValidationError::EndorsementPolicy("no policy".to_string()))
    );

    let context = [ContextDatum::SerializedPolicy(b"policy".to_vec())];
    assert!(matches!(
        chain.validate(&block, CHAINCODE, 0, 0, &context),
        Err(ValidationError::ExecutionFailure(_))
    ));
}

#[test]
fn structural_errors() {
    let world = Arc::new(InMemoryWorldState::default());
    let chain = chain(&simulation_config(), world);
    let context = [ContextDatum::SerializedPolicy(b"policy".to_vec())];

    assert!(matches!(
        chain.validate(&Block::new(4, Vec::new()), CHAINCODE, 0, 0, &context),
        Err(ValidationError::Structural(_))
    ));
    assert!(matches!(
        chain.validate(&Block::new(4, vec![Vec::new()]), CHAINCODE, 0, 0, &[]),
        Err(ValidationError::Structural(_))
    ));
}
