use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use motusdao_database::{Psm, Usuario};

use crate::chain::{AssignmentParams, AssignmentRegistry};

/// Which side of the platform an account registers as.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationRole {
    Patient,
    Psm,
}

impl RegistrationRole {
    /// The free-text focus tag the contract stores with a
    /// registration entry.
    pub fn therapeutic_focus(&self) -> &'static str {
        match self {
            RegistrationRole::Patient => "general",
            RegistrationRole::Psm => "therapist",
        }
    }
}

impl FromStr for RegistrationRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(RegistrationRole::Patient),
            "psm" => Ok(RegistrationRole::Psm),
            other => Err(format!("unknown registration role: {}", other)),
        }
    }
}

/// Result of a best-effort contract write. A failed mirror never undoes
/// the off-chain record it was mirroring; the caller reports the error
/// and the client may retry later against the same off-chain id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnChainOutcome {
    pub success: bool,
    pub transaction_hash: Option<String>,
    pub error: Option<String>,
}

impl OnChainOutcome {
    pub fn submitted(hash: ethers::types::H256) -> Self {
        Self {
            success: true,
            transaction_hash: Some(format!("{:#x}", hash)),
            error: None,
        }
    }

    pub fn failed(message: String) -> Self {
        Self {
            success: false,
            transaction_hash: None,
            error: Some(message),
        }
    }
}

/// Mirror a freshly upserted off-chain profile on the contract.
pub async fn mirror_user(
    registry: &AssignmentRegistry,
    off_chain_id: Uuid,
    role: RegistrationRole,
) -> OnChainOutcome {
    match registry
        .register_user(
            &off_chain_id.to_string(),
            "registration",
            role.therapeutic_focus(),
        )
        .await
    {
        Ok(hash) => {
            tracing::info!("On-chain registration submitted for {}: {:#x}", off_chain_id, hash);
            OnChainOutcome::submitted(hash)
        }
        Err(err) => {
            // The off-chain row stays committed; the two stores are
            // allowed to diverge until the client retries.
            tracing::warn!("On-chain registration failed for {}: {}", off_chain_id, err);
            OnChainOutcome::failed(err.to_string())
        }
    }
}

/// Mirror a committed patient/PSM assignment on the contract.
pub async fn mirror_assignment(
    registry: &AssignmentRegistry,
    usuario: &Usuario,
    psm: &Psm,
) -> OnChainOutcome {
    let params = AssignmentParams {
        user_wallet: usuario.wallet.clone().unwrap_or_default(),
        psm_wallet: psm.wallet.clone().unwrap_or_default(),
        user_off_chain_id: usuario.id.to_string(),
        psm_off_chain_id: psm.id.to_string(),
        assignment_type: "therapy".to_string(),
        therapeutic_focus: usuario
            .tipo_atencion
            .clone()
            .unwrap_or_else(|| "general".to_string()),
    };

    match registry.create_assignment(params).await {
        Ok(hash) => OnChainOutcome::submitted(hash),
        Err(err) => {
            tracing::warn!(
                "On-chain assignment mirror failed for user {} / psm {}: {}",
                usuario.id,
                psm.id,
                err
            );
            OnChainOutcome::failed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::RegistrarSigner;
    use async_trait::async_trait;
    use ethers::types::{Address, Bytes, H256};
    use motusdao_common::AppError;
    use std::sync::Arc;

    struct FailingSigner;

    #[async_trait]
    impl RegistrarSigner for FailingSigner {
        fn address(&self) -> Address {
            Address::zero()
        }

        async fn send_transaction(&self, _to: Address, _data: Bytes) -> Result<H256, AppError> {
            Err(AppError::ExternalService("execution reverted".to_string()))
        }
    }

    struct AcceptingSigner;

    #[async_trait]
    impl RegistrarSigner for AcceptingSigner {
        fn address(&self) -> Address {
            Address::zero()
        }

        async fn send_transaction(&self, _to: Address, _data: Bytes) -> Result<H256, AppError> {
            Ok(H256::from_low_u64_be(42))
        }
    }

    #[test]
    fn roles_parse_and_carry_their_focus() {
        assert_eq!(
            "patient".parse::<RegistrationRole>().unwrap(),
            RegistrationRole::Patient
        );
        assert_eq!(RegistrationRole::Psm.therapeutic_focus(), "therapist");
        assert!("therapist".parse::<RegistrationRole>().is_err());
    }

    #[tokio::test]
    async fn failed_mirror_reports_the_error_without_propagating() {
        let registry =
            AssignmentRegistry::new(Arc::new(FailingSigner), Address::from_low_u64_be(1));

        let outcome = mirror_user(&registry, Uuid::from_u128(9), RegistrationRole::Patient).await;

        // The caller keeps its committed off-chain row; the outcome
        // only records the divergence.
        assert!(!outcome.success);
        assert!(outcome.transaction_hash.is_none());
        assert_eq!(
            outcome.error.as_deref(),
            Some("External service error: execution reverted")
        );
    }

    #[tokio::test]
    async fn successful_mirror_returns_the_hash() {
        let registry =
            AssignmentRegistry::new(Arc::new(AcceptingSigner), Address::from_low_u64_be(1));

        let outcome = mirror_user(&registry, Uuid::from_u128(9), RegistrationRole::Psm).await;

        assert!(outcome.success);
        let esperado = format!("{:#x}", H256::from_low_u64_be(42));
        assert_eq!(outcome.transaction_hash.as_deref(), Some(esperado.as_str()));
        assert!(outcome.error.is_none());
    }
}
