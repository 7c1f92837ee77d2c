use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, TransactionRequest, H256};

use motusdao_common::{AppError, ChainConfig};

/// The transaction-submitting half of the smart-account SDK, kept
/// behind a trait so the rest of the service treats it as a black box
/// and tests can substitute their own.
#[async_trait]
pub trait RegistrarSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Submit a zero-value contract call and return its hash without
    /// waiting for inclusion. Retry and timeout behavior is whatever
    /// the underlying client does; nothing is layered on top here.
    async fn send_transaction(&self, to: Address, data: Bytes) -> Result<H256, AppError>;
}

/// Signer backed by an RPC provider and a local key via
/// `SignerMiddleware`, standing in for the hosted smart-account
/// ("gasless") signer the platform uses in production.
pub struct SmartAccountSigner {
    inner: SignerMiddleware<Provider<Http>, LocalWallet>,
}

impl SmartAccountSigner {
    pub fn from_config(config: &ChainConfig) -> Result<Self, AppError> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| AppError::ExternalService(format!("Failed to create RPC provider: {}", e)))?;

        let key = config
            .signer_key
            .as_deref()
            .ok_or_else(|| AppError::ExternalService("Chain signer key not configured".to_string()))?;

        let wallet = key
            .parse::<LocalWallet>()
            .map_err(|e| AppError::ExternalService(format!("Invalid chain signer key: {}", e)))?
            .with_chain_id(config.chain_id);

        Ok(Self {
            inner: SignerMiddleware::new(provider, wallet),
        })
    }
}

#[async_trait]
impl RegistrarSigner for SmartAccountSigner {
    fn address(&self) -> Address {
        self.inner.signer().address()
    }

    async fn send_transaction(&self, to: Address, data: Bytes) -> Result<H256, AppError> {
        let tx = TransactionRequest::new().to(to).data(data).value(0u64);

        let pending = self
            .inner
            .send_transaction(tx, None)
            .await
            .map_err(|e| AppError::ExternalService(e.to_string()))?;

        Ok(pending.tx_hash())
    }
}
