use std::sync::Arc;

use ethers::abi::{encode, Token};
use ethers::types::{Address, Bytes, H256};
use ethers::utils::id;

use motusdao_common::{AppError, ChainConfig};

use super::signer::{RegistrarSigner, SmartAccountSigner};

/// Inputs for mirroring an off-chain assignment on the contract.
#[derive(Debug, Clone)]
pub struct AssignmentParams {
    pub user_wallet: String,
    pub psm_wallet: String,
    pub user_off_chain_id: String,
    pub psm_off_chain_id: String,
    pub assignment_type: String,
    pub therapeutic_focus: String,
}

/// Client for the assignments contract. Writes are submitted through
/// the smart-account signer; nothing here waits for finality or
/// retries a failed user operation.
pub struct AssignmentRegistry {
    signer: Arc<dyn RegistrarSigner>,
    contract: Address,
}

impl AssignmentRegistry {
    pub fn new(signer: Arc<dyn RegistrarSigner>, contract: Address) -> Self {
        Self { signer, contract }
    }

    pub fn from_config(config: &ChainConfig) -> Result<Self, AppError> {
        let contract = config
            .contract_address
            .parse::<Address>()
            .map_err(|e| AppError::ExternalService(format!("Invalid contract address: {}", e)))?;

        let signer = SmartAccountSigner::from_config(config)?;
        Ok(Self::new(Arc::new(signer), contract))
    }

    pub fn signer_address(&self) -> Address {
        self.signer.address()
    }

    /// Record an off-chain profile on the contract, keyed by its
    /// database id plus a role tag and therapeutic focus.
    pub async fn register_user(
        &self,
        off_chain_id: &str,
        assignment_type: &str,
        therapeutic_focus: &str,
    ) -> Result<H256, AppError> {
        let data = encode_call(
            "registerUser(string,string,string)",
            &[
                Token::String(off_chain_id.to_string()),
                Token::String(assignment_type.to_string()),
                Token::String(therapeutic_focus.to_string()),
            ],
        );

        tracing::debug!(
            "Submitting registerUser({}, {}, {}) to {:?}",
            off_chain_id,
            assignment_type,
            therapeutic_focus,
            self.contract
        );

        self.signer.send_transaction(self.contract, data).await
    }

    /// Mirror a patient/PSM pairing as an on-chain assignment entry.
    pub async fn create_assignment(&self, params: AssignmentParams) -> Result<H256, AppError> {
        let user_wallet = parse_wallet(&params.user_wallet)?;
        let psm_wallet = parse_wallet(&params.psm_wallet)?;

        let data = encode_call(
            "createAssignment(address,address,string,string,string,string)",
            &[
                Token::Address(user_wallet),
                Token::Address(psm_wallet),
                Token::String(params.user_off_chain_id),
                Token::String(params.psm_off_chain_id),
                Token::String(params.assignment_type),
                Token::String(params.therapeutic_focus),
            ],
        );

        self.signer.send_transaction(self.contract, data).await
    }
}

fn parse_wallet(wallet: &str) -> Result<Address, AppError> {
    wallet
        .parse::<Address>()
        .map_err(|e| AppError::ExternalService(format!("Invalid wallet address {}: {}", wallet, e)))
}

fn encode_call(signature: &str, tokens: &[Token]) -> Bytes {
    let selector = id(signature);
    let mut data = selector.to_vec();
    data.extend(encode(tokens));
    Bytes::from(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockSigner {
        fail_with: Option<String>,
        sent: Mutex<Vec<(Address, Bytes)>>,
    }

    impl MockSigner {
        fn ok() -> Self {
            Self {
                fail_with: None,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RegistrarSigner for MockSigner {
        fn address(&self) -> Address {
            Address::zero()
        }

        async fn send_transaction(&self, to: Address, data: Bytes) -> Result<H256, AppError> {
            if let Some(message) = &self.fail_with {
                return Err(AppError::ExternalService(message.clone()));
            }
            self.sent.lock().unwrap().push((to, data));
            Ok(H256::from_low_u64_be(7))
        }
    }

    fn registry_with(signer: Arc<MockSigner>) -> AssignmentRegistry {
        AssignmentRegistry::new(signer, Address::from_low_u64_be(0xC0FFEE))
    }

    #[tokio::test]
    async fn register_user_encodes_the_expected_selector() {
        let signer = Arc::new(MockSigner::ok());
        let registry = registry_with(signer.clone());

        registry
            .register_user("user-123", "registration", "general")
            .await
            .unwrap();

        let sent = signer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (to, data) = &sent[0];
        assert_eq!(*to, Address::from_low_u64_be(0xC0FFEE));
        assert_eq!(&data[..4], id("registerUser(string,string,string)").as_slice());
        // Three dynamic strings: offsets + contents follow the selector.
        assert!(data.len() > 4 + 32 * 3);
    }

    #[tokio::test]
    async fn create_assignment_encodes_both_wallets() {
        let signer = Arc::new(MockSigner::ok());
        let registry = registry_with(signer.clone());

        registry
            .create_assignment(AssignmentParams {
                user_wallet: "0x1234567890123456789012345678901234567890".to_string(),
                psm_wallet: "0x0000000000000000000000000000000000000000".to_string(),
                user_off_chain_id: "u-1".to_string(),
                psm_off_chain_id: "p-1".to_string(),
                assignment_type: "therapy".to_string(),
                therapeutic_focus: "Ansiedad".to_string(),
            })
            .await
            .unwrap();

        let sent = signer.sent.lock().unwrap();
        let (_, data) = &sent[0];
        assert_eq!(
            &data[..4],
            id("createAssignment(address,address,string,string,string,string)").as_slice()
        );
    }

    #[tokio::test]
    async fn malformed_wallet_is_rejected_before_signing() {
        let signer = Arc::new(MockSigner::ok());
        let registry = registry_with(signer.clone());

        let err = registry
            .create_assignment(AssignmentParams {
                user_wallet: "not-a-wallet".to_string(),
                psm_wallet: "0x0000000000000000000000000000000000000000".to_string(),
                user_off_chain_id: "u-1".to_string(),
                psm_off_chain_id: "p-1".to_string(),
                assignment_type: "therapy".to_string(),
                therapeutic_focus: "general".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ExternalService(_)));
        assert!(signer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn signer_failure_surfaces_the_sdk_message() {
        let signer = Arc::new(MockSigner::failing("user operation rejected by bundler"));
        let registry = registry_with(signer);

        let err = registry
            .register_user("user-123", "registration", "therapist")
            .await
            .unwrap_err();

        match err {
            AppError::ExternalService(message) => {
                assert_eq!(message, "user operation rejected by bundler")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
