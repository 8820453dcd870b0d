//! Command-line driver: runs bridge operations against a wallet reachable
//! through an EIP-1193 JSON-RPC proxy or relay bridge and prints every host message.

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use clap::{Parser, Subcommand};
    use eyre::{eyre, Result, WrapErr};
    use serde_json::json;

    use wallet_bridge::{BridgeConfig, RecordingHost, RuntimeProfile, WalletBridge};

    #[derive(Debug, Parser)]
    #[command(name = "wallet-bridge", version, about = "Drive a wallet through the bridge")]
    pub struct Cli {
        /// JSON-RPC endpoint forwarding EIP-1193 requests to a wallet.
        #[arg(long, env = "WALLET_BRIDGE_EIP1193_PROXY_URL")]
        proxy_url: Option<String>,

        #[arg(long, env = "WALLET_BRIDGE_RELAY_URL")]
        relay_url: Option<String>,

        #[arg(long, env = "WALLET_BRIDGE_RELAY_PROJECT_ID")]
        project_id: Option<String>,

        /// Pair through the relay instead of the injected provider.
        #[arg(long)]
        relay: bool,

        #[arg(long, env = "WALLET_BRIDGE_PROFILE")]
        profile: Option<RuntimeProfile>,

        #[arg(long, env = "WALLET_BRIDGE_BALANCE_PRECISION")]
        precision: Option<u8>,

        #[arg(long, env = "WALLET_BRIDGE_MESSAGE_PREFIX")]
        message_prefix: Option<String>,

        #[command(subcommand)]
        command: Command,
    }

    #[derive(Debug, Subcommand)]
    enum Command {
        /// List the networks the bridge can switch to.
        Chains,
        Connect,
        Balance,
        Switch {
            /// Hex (`0xa`) or decimal (`10`) chain id.
            chain_id: String,
        },
        Sign {
            text: String,
        },
        /// Submit a transaction, switching networks first when needed.
        Send {
            #[arg(long)]
            chain_id: String,
            #[arg(long)]
            to: String,
            #[arg(long, default_value = "0x")]
            data: String,
            #[arg(long, default_value = "0x0")]
            value: String,
            #[arg(long, default_value = "transfer")]
            action: String,
        },
    }

    impl Cli {
        fn config(&self) -> BridgeConfig {
            let mut cfg = BridgeConfig::from_env();
            if let Some(url) = &self.proxy_url {
                cfg.eip1193_proxy_url = Some(url.clone());
            }
            if let Some(url) = &self.relay_url {
                cfg.relay_bridge_url = Some(url.clone());
            }
            if let Some(project_id) = &self.project_id {
                cfg.relay_project_id = Some(project_id.clone());
            }
            if let Some(profile) = self.profile {
                cfg.runtime_profile = profile;
            }
            if let Some(precision) = self.precision {
                cfg.balance_precision = precision;
            }
            if let Some(prefix) = &self.message_prefix {
                cfg.message_type_prefix = prefix.clone();
            }
            cfg
        }
    }

    pub async fn run(cli: Cli) -> Result<()> {
        let cfg = cli.config();
        let host = RecordingHost::default();
        let bridge = WalletBridge::new(&cfg, host.clone());

        let outcome = execute(&cli, &bridge).await;
        for posted in host.messages() {
            println!("{}", posted.message);
        }
        outcome
    }

    async fn execute(cli: &Cli, bridge: &WalletBridge<RecordingHost>) -> Result<()> {
        if let Command::Chains = cli.command {
            for chain in bridge.orchestrator().registry().iter() {
                println!(
                    "{:<12} {:<10} {:<6} {}",
                    chain.chain_id.to_string(),
                    chain.slug,
                    chain.native_currency.symbol,
                    chain.rpc_urls.first().map(String::as_str).unwrap_or("-"),
                );
            }
            return Ok(());
        }

        let info = if cli.relay {
            bridge.connect_via_relay(None).await
        } else {
            bridge.connect().await
        }
        .wrap_err("connect failed")?;
        tracing::info!(account = %info.account, chain_id = %info.chain_id, "connected");

        match &cli.command {
            Command::Chains | Command::Connect => Ok(()),
            Command::Balance => bridge
                .get_balance()
                .await
                .wrap_err("balance failed")?
                .map(|_| ())
                .ok_or_else(|| eyre!("balance unavailable")),
            Command::Switch { chain_id } => {
                if bridge.switch_network(chain_id).await {
                    Ok(())
                } else {
                    Err(eyre!("switch to {chain_id} failed"))
                }
            }
            Command::Sign { text } => bridge
                .sign_message(text)
                .await
                .map(|_| ())
                .wrap_err("sign failed"),
            Command::Send {
                chain_id,
                to,
                data,
                value,
                action,
            } => {
                let request = json!({
                    "chainId": chain_id,
                    "to": to,
                    "data": data,
                    "value": value,
                });
                bridge
                    .perform_action(action, &request)
                    .await
                    .map(|_| ())
                    .wrap_err_with(|| format!("{action} failed"))
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    use clap::Parser;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    cli::run(cli::Cli::parse()).await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
