use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueHint};
use hashswap_client::{ChainEventWatcher, ClientConfig, EthereumReader};
use hashswap_core::{
    unix_now, Amounts, HashLock, JsonFileStore, Network, Secret, SecretVault, SwapRecord,
    SwapStore,
};
use tokio::sync::oneshot;

const DEFAULT_CONFIG_PATH: &str = "./hashswap_config.json";
const DEFAULT_STORE_DIR: &str = "./swaps";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // In order to view logs, run with e.g. `RUST_LOG=info`
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Secret => {
            let (secret, hash_lock) = SecretVault::generate()?;
            let out = serde_json::json!({
                "secret": secret.expose_hex(),
                "hash_lock": hash_lock.to_hex(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Verify { secret, hash_lock } => {
            if !SecretVault::verify(&secret, &hash_lock) {
                anyhow::bail!("secret does not match hash lock {hash_lock}");
            }
            tracing::info!("Secret matches hash lock");
            println!("ok");
        }
        Commands::Watch {
            config,
            hash_lock,
            once,
        } => {
            let config = ClientConfig::load(&config)?;
            let reader = Arc::new(EthereumReader::new(&config.rpc_url)?);
            let watcher = ChainEventWatcher::new(reader, config.watcher_config())?;

            if once {
                match watcher.poll_once(&hash_lock).await? {
                    Some(detection) => println!("{}", detection.swap_id),
                    None => anyhow::bail!("no SwapCreated event for hash lock {hash_lock}"),
                }
                return Ok(());
            }

            let (tx, rx) = oneshot::channel();
            let handle = watcher.start(
                hash_lock,
                move |detection| {
                    let _ = tx.send(detection);
                },
                |e| tracing::error!(%e, "Still waiting; chain query failed"),
            );
            tokio::select! {
                detection = rx => {
                    let detection = detection.context("watch session ended without a detection")?;
                    println!("{}", detection.swap_id);
                }
                res = tokio::signal::ctrl_c() => {
                    res.context("listening for Ctrl-C")?;
                    handle.stop();
                    anyhow::bail!("interrupted before the counterparty HTLC was seen");
                }
            }
        }
        Commands::Init {
            store,
            id,
            own_sk,
            counterparty_pk,
            server_pk,
            refund_locktime,
            claim_delay,
            refund_delay,
            refund_without_receiver_delay,
            network,
            htlc_address,
        } => {
            let store = JsonFileStore::new(&store)?;
            if store.get(&id)?.is_some() {
                anyhow::bail!("swap `{id}` already exists in {:?}", store.base_dir());
            }
            let own_sk: [u8; 32] = own_sk.0.try_into().map_err(|sk: Vec<u8>| {
                anyhow::anyhow!("own secret key must be 32 bytes, got {}", sk.len())
            })?;
            let (secret, hash_lock) = SecretVault::generate()?;
            let record = SwapRecord {
                swap_id: id,
                evm_swap_id: None,
                hash_lock,
                secret,
                own_sk,
                counterparty_pk: counterparty_pk.0,
                server_pk: server_pk.0,
                refund_locktime,
                unilateral_claim_delay: claim_delay,
                unilateral_refund_delay: refund_delay,
                unilateral_refund_without_receiver_delay: refund_without_receiver_delay,
                network,
                htlc_address,
            };
            store.put(&record).context("storing new swap record")?;
            tracing::info!(swap_id = %record.swap_id, %hash_lock, network = ?record.network, "Swap record created");
            let out = serde_json::json!({
                "swap_id": record.swap_id,
                "hash_lock": hash_lock.to_hex(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Eligibility {
            store,
            id,
            spendable,
            spent,
            recoverable,
            now,
        } => {
            let store = JsonFileStore::new(&store)?;
            let record = store
                .get(&id)?
                .with_context(|| format!("no swap `{id}` in {:?}", store.base_dir()))?;
            let amounts = Amounts {
                spendable,
                spent,
                recoverable,
            };
            let state = record.eligibility(&amounts, now.unwrap_or_else(unix_now));
            println!("{}", serde_json::to_string(&state)?);
        }
        Commands::Show { store, id } => {
            let store = JsonFileStore::new(&store)?;
            let record = store
                .get(&id)?
                .with_context(|| format!("no swap `{id}` in {:?}", store.base_dir()))?;
            let mut value = serde_json::to_value(&record)?;
            if let Some(obj) = value.as_object_mut() {
                for key in ["secret", "own_sk"] {
                    obj.insert(key.into(), "<redacted>".into());
                }
            }
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "hashswap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a fresh secret and its hash lock
    Secret,
    /// Check that a secret opens a hash lock
    Verify {
        #[arg(short, long)]
        secret: Secret,

        #[arg(long)]
        hash_lock: HashLock,
    },
    /// Wait for the counterparty's HTLC on the EVM chain
    Watch {
        #[arg(short, long,
            value_parser,
            default_value = DEFAULT_CONFIG_PATH,
            value_hint = ValueHint::FilePath)]
        config: PathBuf,

        #[arg(long)]
        hash_lock: HashLock,

        /// Poll a single time instead of waiting
        #[arg(long)]
        once: bool,
    },
    /// Create and store a new swap record with a fresh secret
    Init {
        #[arg(short, long,
            value_parser,
            default_value = DEFAULT_STORE_DIR,
            value_hint = ValueHint::DirPath)]
        store: PathBuf,

        #[arg(long)]
        id: String,

        /// Own 32-byte secret key, hex
        #[arg(long)]
        own_sk: HexBytes,

        /// Compressed public key, hex
        #[arg(long)]
        counterparty_pk: HexBytes,

        /// Compressed public key, hex
        #[arg(long)]
        server_pk: HexBytes,

        /// Unix time after which the HTLC can be refunded
        #[arg(long)]
        refund_locktime: u64,

        #[arg(long)]
        claim_delay: u64,

        #[arg(long)]
        refund_delay: u64,

        #[arg(long)]
        refund_without_receiver_delay: u64,

        /// bitcoin (or mainnet), testnet, signet, regtest, mutinynet
        #[arg(long)]
        network: Network,

        #[arg(long)]
        htlc_address: String,
    },
    /// Classify a stored swap's refund eligibility from a balance snapshot
    Eligibility {
        #[arg(short, long,
            value_parser,
            default_value = DEFAULT_STORE_DIR,
            value_hint = ValueHint::DirPath)]
        store: PathBuf,

        #[arg(long)]
        id: String,

        #[arg(long, default_value_t = 0)]
        spendable: u64,

        #[arg(long, default_value_t = 0)]
        spent: u64,

        #[arg(long, default_value_t = 0)]
        recoverable: u64,

        /// Unix time to evaluate at; defaults to now
        #[arg(long)]
        now: Option<u64>,
    },
    /// Print a stored swap record with key material redacted
    Show {
        #[arg(short, long,
            value_parser,
            default_value = DEFAULT_STORE_DIR,
            value_hint = ValueHint::DirPath)]
        store: PathBuf,

        #[arg(long)]
        id: String,
    },
}

/// Hex-encoded bytes from the command line, with or without a `0x` prefix.
#[derive(Clone, Debug)]
struct HexBytes(Vec<u8>);

impl FromStr for HexBytes {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex::decode(s.strip_prefix("0x").unwrap_or(s)).map(Self)
    }
}
