//! Transport and signer adapters over ethers providers and wallets

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::providers::{Http, JsonRpcClient, JsonRpcError, Middleware, Provider, ProviderError, RpcError, Ws};
use ethers::signers::LocalWallet;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, BlockId, BlockNumber, Bytes, Eip1559TransactionRequest, Filter, Log, Signature, TransactionReceipt,
    TransactionRequest, U256,
};
use tracing::{debug, info};

use bindery_core::{Error, Result, RpcConfig};

use crate::fees::Fees;
use crate::transport::{CallRequest, Signer, TransactionSubmission, Transport, TransportError};

/// Ethereum provider types
#[derive(Debug, Clone)]
pub enum EthereumProvider {
    /// HTTP provider
    Http(Arc<Provider<Http>>),

    /// WebSocket provider
    Websocket(Arc<Provider<Ws>>),
}

impl EthereumProvider {
    /// Connect according to the RPC configuration
    pub async fn connect(config: &RpcConfig) -> Result<Self> {
        if config.use_websocket {
            let ws_provider = Provider::<Ws>::connect(&config.url)
                .await
                .map_err(|e| Error::transport(format!("Failed to connect to Ethereum node via WebSocket: {}", e)))?;

            Ok(Self::Websocket(Arc::new(ws_provider)))
        } else {
            let http_provider = Provider::<Http>::try_from(config.url.as_str())
                .map_err(|e| Error::transport(format!("Failed to create Ethereum HTTP provider: {}", e)))?;

            Ok(Self::Http(Arc::new(http_provider)))
        }
    }
}

/// [`Transport`] over an ethers provider.
///
/// Calls and log queries are bounded by the request timeout. Submitted
/// transactions are awaited until they have the configured number of
/// confirmations.
#[derive(Debug, Clone)]
pub struct EthersTransport {
    provider: EthereumProvider,
    timeout: Duration,
    confirmations: usize,
    chain_id: Option<u64>,
}

impl EthersTransport {
    pub fn new(provider: EthereumProvider, config: &RpcConfig) -> Self {
        Self {
            provider,
            timeout: Duration::from_secs(config.request_timeout_secs),
            confirmations: config.confirmations,
            chain_id: config.chain_id,
        }
    }

    /// Connect to the configured node
    pub async fn connect(config: &RpcConfig) -> Result<Self> {
        let provider = EthereumProvider::connect(config).await?;
        info!(url = %config.url, websocket = config.use_websocket, "Connected to Ethereum node");
        Ok(Self::new(provider, config))
    }

    pub fn provider(&self) -> &EthereumProvider {
        &self.provider
    }

    /// Chain id reported by the node
    pub async fn chain_id(&self) -> Result<u64> {
        let id = match &self.provider {
            EthereumProvider::Http(provider) => with_timeout(self.timeout, provider.get_chainid()).await,
            EthereumProvider::Websocket(provider) => with_timeout(self.timeout, provider.get_chainid()).await,
        };
        id.and_then(chain_id_from).map_err(|e| Error::transport(e.to_string()))
    }
}

#[async_trait]
impl Transport for EthersTransport {
    async fn call(&self, request: &CallRequest, block: BlockNumber) -> std::result::Result<Bytes, TransportError> {
        match &self.provider {
            EthereumProvider::Http(provider) => call_with(provider, request, block, self.timeout).await,
            EthereumProvider::Websocket(provider) => call_with(provider, request, block, self.timeout).await,
        }
    }

    async fn send_transaction(
        &self,
        submission: &TransactionSubmission,
        fees: &Fees,
        signer: Arc<dyn Signer>,
    ) -> std::result::Result<TransactionReceipt, TransportError> {
        match &self.provider {
            EthereumProvider::Http(provider) => {
                send_with(provider, submission, fees, signer, self).await
            }
            EthereumProvider::Websocket(provider) => {
                send_with(provider, submission, fees, signer, self).await
            }
        }
    }

    async fn get_logs(&self, filter: &Filter) -> std::result::Result<Vec<Log>, TransportError> {
        match &self.provider {
            EthereumProvider::Http(provider) => with_timeout(self.timeout, provider.get_logs(filter)).await,
            EthereumProvider::Websocket(provider) => with_timeout(self.timeout, provider.get_logs(filter)).await,
        }
    }
}

async fn call_with<P: JsonRpcClient>(
    provider: &Provider<P>,
    request: &CallRequest,
    block: BlockNumber,
    timeout: Duration,
) -> std::result::Result<Bytes, TransportError> {
    let mut tx = TransactionRequest::new().to(request.to).data(request.data.clone());
    if let Some(from) = request.from {
        tx = tx.from(from);
    }
    let tx: TypedTransaction = tx.into();

    with_timeout(timeout, provider.call(&tx, Some(BlockId::Number(block)))).await
}

async fn send_with<P: JsonRpcClient>(
    provider: &Provider<P>,
    submission: &TransactionSubmission,
    fees: &Fees,
    signer: Arc<dyn Signer>,
    settings: &EthersTransport,
) -> std::result::Result<TransactionReceipt, TransportError> {
    let mut tx: TypedTransaction = match fees {
        Fees::Legacy { gas_price, .. } => TransactionRequest::new().gas_price(*gas_price).into(),
        Fees::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
            ..
        } => Eip1559TransactionRequest::new()
            .max_fee_per_gas(*max_fee_per_gas)
            .max_priority_fee_per_gas(*max_priority_fee_per_gas)
            .into(),
        Fees::Estimate { .. } => Eip1559TransactionRequest::new().into(),
    };

    tx.set_from(signer.address());
    if let Some(to) = submission.to {
        tx.set_to(to);
    }
    tx.set_data(submission.data.clone());
    tx.set_value(submission.value);
    if let Some(gas_limit) = fees.gas_limit() {
        tx.set_gas(gas_limit);
    }

    let chain_id = match settings.chain_id {
        Some(id) => id,
        None => chain_id_from(with_timeout(settings.timeout, provider.get_chainid()).await?)?,
    };
    tx.set_chain_id(chain_id);

    // Fills nonce, missing fee fields and the gas estimate; a reverting call fails here
    with_timeout(settings.timeout, provider.fill_transaction(&mut tx, None)).await?;

    let signature = signer.sign_transaction(&tx).await?;
    let raw = tx.rlp_signed(&signature);

    let pending = with_timeout(settings.timeout, provider.send_raw_transaction(raw)).await?;
    let tx_hash = pending.tx_hash();
    debug!(tx = ?tx_hash, confirmations = settings.confirmations, "Transaction broadcast");

    pending
        .confirmations(settings.confirmations)
        .await
        .map_err(provider_error)?
        .ok_or_else(|| TransportError::rpc(format!("transaction {:?} was dropped from the mempool", tx_hash)))
}

async fn with_timeout<T, F>(timeout: Duration, fut: F) -> std::result::Result<T, TransportError>
where
    F: Future<Output = std::result::Result<T, ProviderError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(provider_error),
        Err(_) => Err(TransportError::rpc(format!("request timed out after {:?}", timeout))),
    }
}

fn chain_id_from(id: U256) -> std::result::Result<u64, TransportError> {
    if id > U256::from(u64::MAX) {
        return Err(TransportError::rpc(format!("node reported chain id {} which does not fit in u64", id)));
    }
    Ok(id.low_u64())
}

fn provider_error(err: ProviderError) -> TransportError {
    err.as_error_response()
        .and_then(revert_from_response)
        .unwrap_or_else(|| TransportError::Rpc(err.to_string()))
}

/// Recognize a JSON-RPC error that reports a revert, with or without revert data.
fn revert_from_response(response: &JsonRpcError) -> Option<TransportError> {
    if let Some(data) = response.as_revert_data() {
        return Some(TransportError::Revert {
            data,
            message: Some(response.message.clone()),
        });
    }
    if response.message.contains("revert") {
        return Some(TransportError::Revert {
            data: Bytes::new(),
            message: Some(response.message.clone()),
        });
    }
    None
}

/// [`Signer`] over any ethers signer
#[derive(Debug, Clone)]
pub struct WalletSigner<S>(S);

impl<S> WalletSigner<S> {
    pub fn new(signer: S) -> Self {
        Self(signer)
    }

    pub fn inner(&self) -> &S {
        &self.0
    }
}

impl WalletSigner<LocalWallet> {
    /// Local wallet from a hex private key
    pub fn from_private_key(key: &str) -> Result<Self> {
        let wallet = key
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| Error::config(format!("Invalid private key: {}", e)))?;
        Ok(Self(wallet))
    }
}

#[async_trait]
impl<S> Signer for WalletSigner<S>
where
    S: ethers::signers::Signer + 'static,
{
    fn address(&self) -> Address {
        ethers::signers::Signer::address(&self.0)
    }

    async fn sign_transaction(&self, tx: &TypedTransaction) -> std::result::Result<Signature, TransportError> {
        ethers::signers::Signer::sign_transaction(&self.0, tx)
            .await
            .map_err(|e| TransportError::rpc(format!("signing failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(message: &str, data: Option<serde_json::Value>) -> JsonRpcError {
        JsonRpcError {
            code: 3,
            message: message.to_string(),
            data,
        }
    }

    #[test]
    fn test_revert_with_data() {
        let reverted = revert_from_response(&response("execution reverted: nope", Some(json!("0x08c379a0")))).unwrap();
        assert_eq!(
            reverted,
            TransportError::Revert {
                data: Bytes::from(vec![0x08, 0xc3, 0x79, 0xa0]),
                message: Some("execution reverted: nope".to_string()),
            }
        );
    }

    #[test]
    fn test_revert_without_data() {
        let reverted = revert_from_response(&response("execution reverted", None)).unwrap();
        assert!(matches!(reverted, TransportError::Revert { data, .. } if data.is_empty()));
        assert!(revert_from_response(&response("nonce too low", None)).is_none());
    }

    #[test]
    fn test_chain_id_out_of_range() {
        assert_eq!(chain_id_from(U256::from(31337u64)), Ok(31337));
        assert!(matches!(chain_id_from(U256::MAX), Err(TransportError::Rpc(_))));
    }

    #[test]
    fn test_wallet_signer_address() {
        // Well-known development key
        let signer =
            WalletSigner::from_private_key("0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80").unwrap();
        assert_eq!(
            format!("{:?}", Signer::address(&signer)),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
        assert!(WalletSigner::from_private_key("not a key").is_err());
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_http_url() {
        let config = RpcConfig {
            url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(EthersTransport::connect(&config).await, Err(Error::Transport(_))));
    }
}
