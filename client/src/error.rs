use hashswap_core::{EligibilityState, SwapError};

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// RPC or network failure while reading the EVM chain.
    #[error("Chain query failed: {0}")]
    ChainQuery(String),
    /// A wallet-module refund/claim failed; the message is passed through untouched.
    #[error("Remote action failed: {0}")]
    RemoteAction(String),
    #[error("Wallet initialization failed: {0}")]
    WalletInit(String),
    #[error("Refund not permitted while swap is {0}")]
    RefundNotReady(EligibilityState),
    #[error("Counterparty HTLC not detected yet")]
    ClaimNotReady,
    #[error(transparent)]
    Core(#[from] SwapError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("URL parse error")]
    UrlParse(#[from] url::ParseError),
}

impl From<ethers::providers::ProviderError> for ClientError {
    fn from(value: ethers::providers::ProviderError) -> Self {
        Self::ChainQuery(value.to_string())
    }
}
