use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use neodapps_chain::{Chain, InvokeFile, InvokeFileItem, PrivateChain};
use neodapps_express::CommandOutput;
use neodapps_rpc::BlockInfo;
use neodapps_session::{Session, Settings, DEFAULT_BLOCK_POLL, DEFAULT_RECENT_BLOCKS, SETTINGS_FILE};
use serde_json::Value;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "neodapps", version, about = "Neo N3 dApp project helper")]
struct Cli {
    /// Project directory holding the `.neo-express` configs.
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Settings file, `<root>/neodapps.toml` when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// List the chains of the project.
    Chains,
    /// Probe the nodes of a chain.
    Status { chain: String },
    /// Create a neo-express private net with 1, 4 or 7 nodes.
    Create {
        name: String,
        #[arg(long, default_value_t = 1)]
        nodes: u32,
    },
    /// Run one node of a private net until it exits.
    Run {
        chain: String,
        #[arg(long, default_value_t = 0)]
        node: usize,
    },
    #[command(subcommand)]
    Wallet(WalletCmd),
    /// Transfer an asset between wallets of a private net.
    Transfer {
        chain: String,
        amount: String,
        asset: String,
        from: String,
        to: String,
    },
    /// List deployed and native contracts through the selected node.
    Contracts {
        chain: String,
        #[arg(long)]
        node: Option<usize>,
    },
    /// NEP-17 balances of every wallet account visible for a chain.
    Balances {
        chain: String,
        #[arg(long)]
        node: Option<usize>,
    },
    /// Print the latest blocks, optionally following new ones.
    Blocks {
        chain: String,
        #[arg(long)]
        node: Option<usize>,
        #[arg(long, default_value_t = DEFAULT_RECENT_BLOCKS)]
        count: u32,
        #[arg(long)]
        follow: bool,
    },
    #[command(subcommand)]
    Invoke(InvokeCmd),
    #[command(subcommand)]
    Settings(SettingsCmd),
}

#[derive(Subcommand)]
enum WalletCmd {
    /// Create a wallet in a private net.
    Create { chain: String, name: String },
    /// List the wallets visible for a chain.
    List {
        chain: String,
        #[arg(long)]
        node: Option<usize>,
    },
    /// Import a NEP-6 file for a public chain.
    Import {
        chain: String,
        name: String,
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum InvokeCmd {
    List { file: PathBuf },
    /// Append a call; `args` are JSON values, bare words are taken as strings.
    Add {
        file: PathBuf,
        contract: String,
        operation: String,
        args: Vec<String>,
    },
    /// Remove every call matching contract and operation.
    Remove {
        file: PathBuf,
        contract: String,
        operation: String,
    },
    /// Test-invoke every call matching contract and operation; with `--send`,
    /// sign it with `--account` and broadcast it.
    Run {
        file: PathBuf,
        chain: String,
        contract: String,
        operation: String,
        #[arg(long)]
        account: Option<String>,
        #[arg(long, requires = "account")]
        send: bool,
        #[arg(long)]
        node: Option<usize>,
    },
}

#[derive(Subcommand)]
enum SettingsCmd {
    Show,
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let settings_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.root.join(SETTINGS_FILE));
    debug!(root = %cli.root.display(), settings = %settings_path.display(), "starting");

    match cli.cmd {
        Cmd::Settings(cmd) => cmd_settings(&settings_path, cmd),
        Cmd::Invoke(cmd) if !matches!(cmd, InvokeCmd::Run { .. }) => cmd_invoke(cmd),
        cmd => {
            let settings = Settings::load(&settings_path)
                .with_context(|| format!("loading {}", settings_path.display()))?;
            let session = Session::open(&cli.root, settings)?;
            session.chains().load_chains();
            run_session(&session, cmd).await
        }
    }
}

async fn run_session(session: &Session, cmd: Cmd) -> Result<()> {
    let limit = session.settings().completion_timeout();
    match cmd {
        Cmd::Chains => {
            for chain in session.chains().chains() {
                let nodes = chain.nodes().map(|n| n.len()).unwrap_or(0);
                println!("{:<24} {:<8} nodes: {nodes}", chain.to_string(), chain.chain_type().to_string());
            }
        }
        Cmd::Status { chain } => {
            let chain = find_chain(session, &chain, None)?;
            let nodes = chain.nodes()?;
            for (index, state) in session.refresh_node_status(&chain).await? {
                let url = nodes.get(index).map(|n| n.rpc_url()).unwrap_or_default();
                println!("{index}  {url:<32} {state}");
            }
        }
        Cmd::Create { name, nodes } => {
            let output = session
                .express()
                .create_private_net(nodes, &name)?
                .wait(limit)
                .await?;
            report(&output)?;
            session.chains().load_and_look_for_new_chain(&name).await;
            match session.chains().find(&name) {
                Some(chain) => println!("Created {chain}"),
                None => bail!("neo-express finished but {name}.neo-express did not appear"),
            }
        }
        Cmd::Run { chain, node } => {
            let chain = find_chain(session, &chain, Some(node))?;
            let handle = session.express().run_private_net(private(&chain)?, node)?;
            info!(id = %handle.id(), "node started, waiting for it to exit");
            handle.wait(Duration::MAX).await?;
        }
        Cmd::Wallet(WalletCmd::Create { chain, name }) => {
            let chain = find_chain(session, &chain, None)?;
            let output = session
                .express()
                .create_wallet(&name, private(&chain)?)?
                .wait(limit)
                .await?;
            report(&output)?;
        }
        Cmd::Wallet(WalletCmd::List { chain, node }) => {
            let chain = find_chain(session, &chain, node)?;
            for wallet in session.wallets().get_wallets(&chain).await? {
                println!("{}", wallet.name.as_deref().unwrap_or("(unnamed)"));
                for account in &wallet.accounts {
                    let marker = if account.is_default { "*" } else { " " };
                    let label = account.label.as_deref().unwrap_or("");
                    println!("  {marker} {} {label}", account.address);
                }
            }
        }
        Cmd::Wallet(WalletCmd::Import { chain, name, path }) => {
            let chain = find_chain(session, &chain, None)?;
            let wallet = session.wallets().import_nep6(&chain, &name, &path).await?;
            println!("Imported {name} ({} accounts)", wallet.accounts.len());
        }
        Cmd::Transfer {
            chain,
            amount,
            asset,
            from,
            to,
        } => {
            let chain = find_chain(session, &chain, None)?;
            let output = session
                .express()
                .transfer(&amount, &asset, &from, &to, private(&chain)?)?
                .wait(limit)
                .await?;
            report(&output)?;
        }
        Cmd::Contracts { chain, node } => {
            let chain = find_chain(session, &chain, node)?;
            let deployed = session.contracts().get_contracts(&chain).await?;
            let native = session.contracts().get_native_contracts(&chain).await?;
            for (kind, contracts) in [("deployed", deployed), ("native", native)] {
                println!("{kind}:");
                for contract in contracts {
                    println!("  {} {}", contract.hash, contract.name().unwrap_or("?"));
                }
            }
        }
        Cmd::Balances { chain, node } => {
            let chain = find_chain(session, &chain, node)?;
            for wallet in session.wallets().get_token_balances(&chain).await? {
                println!("{}", wallet.wallet);
                for account in &wallet.accounts {
                    println!("  {}", account.address);
                    for balance in &account.balance {
                        let symbol = balance.symbol.as_deref().unwrap_or("?");
                        println!("    {symbol:<8} {:>20} {}", balance.amount, balance.assethash);
                    }
                }
            }
        }
        Cmd::Blocks {
            chain,
            node,
            count,
            follow,
        } => {
            let chain = find_chain(session, &chain, node)?;
            if follow {
                let mut blocks = session.blocks().subscribe(&chain, count, DEFAULT_BLOCK_POLL).await?;
                while let Some(block) = blocks.recv().await {
                    print_block(&block);
                }
            } else {
                for block in session.blocks().recent_blocks(&chain, count).await? {
                    print_block(&block);
                }
            }
        }
        Cmd::Invoke(InvokeCmd::Run {
            file,
            chain,
            contract,
            operation,
            account,
            send,
            node,
        }) => {
            let chain = find_chain(session, &chain, node)?;
            let items = matching_items(&file, &contract, &operation)?;
            if items.is_empty() {
                bail!("{} has no {contract} {operation} call", file.display());
            }
            for item in items {
                let args = Value::Array(item.args.clone());
                if send {
                    let account = account.as_deref().context("--send needs --account")?;
                    let hash = session.invoke_item(&chain, &item, account).await?;
                    println!("{contract} {operation} {args} sent {hash}");
                } else {
                    let result = session
                        .test_invoke_item(&chain, &item, account.as_deref())
                        .await?;
                    println!("{contract} {operation} {args} {} gas {}", result.state, result.gasconsumed);
                    if let Some(exception) = &result.exception {
                        println!("  exception: {exception}");
                    }
                    for value in &result.stack {
                        println!("  {value}");
                    }
                }
            }
        }
        Cmd::Invoke(_) | Cmd::Settings(_) => unreachable!("handled without a session"),
    }
    Ok(())
}

fn print_block(block: &BlockInfo) {
    println!("{:>8} {} {} tx", block.index, block.hash, block.tx.len());
}

/// Looks `name` up and applies it, selecting `node` when given.
fn find_chain(session: &Session, name: &str, node: Option<usize>) -> Result<Arc<Chain>> {
    let Some(chain) = session.chains().find(name) else {
        let known: Vec<String> = session.chains().chains().iter().map(|c| c.to_string()).collect();
        bail!("no chain named {name}; known chains: {}", known.join(", "));
    };
    let node = match node {
        Some(node) => node,
        None => chain.selected_index()?,
    };
    session.chains().set_applied_chain(Some(chain.clone()), node)?;
    Ok(chain)
}

fn private(chain: &Chain) -> Result<&PrivateChain> {
    chain
        .as_private()
        .with_context(|| format!("{chain} is not a neo-express chain"))
}

fn report(output: &CommandOutput) -> Result<()> {
    if let Some(failure) = output.failure() {
        bail!("{failure}");
    }
    let stdout = output.stdout.trim();
    if !stdout.is_empty() {
        println!("{stdout}");
    }
    Ok(())
}

fn cmd_invoke(cmd: InvokeCmd) -> Result<()> {
    match cmd {
        InvokeCmd::List { file } => {
            let invoke = InvokeFile::open(&file)?;
            let mut items: Vec<_> = invoke.items()?.into_values().collect();
            items.sort_by(|a, b| (&a.contract, &a.operation).cmp(&(&b.contract, &b.operation)));
            for item in items {
                println!("{} {} {}", item.contract, item.operation, Value::Array(item.args));
            }
        }
        InvokeCmd::Add {
            file,
            contract,
            operation,
            args,
        } => {
            let invoke = open_or_create(&file)?;
            let args = args.iter().map(String::as_str).map(parse_arg).collect();
            invoke.add_item(InvokeFileItem::new(contract, operation, args));
            invoke.save_changes()?;
        }
        InvokeCmd::Run { .. } => bail!("invoke run needs a session"),
        InvokeCmd::Remove {
            file,
            contract,
            operation,
        } => {
            let invoke = InvokeFile::open(&file)?;
            let mut removed = 0;
            for (id, item) in invoke.items()? {
                if item.contract == contract && item.operation == operation {
                    invoke.remove_item(&id);
                    removed += 1;
                }
            }
            invoke.save_changes()?;
            println!("Removed {removed} item(s)");
        }
    }
    Ok(())
}

/// Calls of `file` naming `contract` and `operation`, ordered by arguments.
fn matching_items(file: &Path, contract: &str, operation: &str) -> Result<Vec<InvokeFileItem>> {
    let invoke = InvokeFile::open(file)?;
    let mut items: Vec<_> = invoke
        .items()?
        .into_values()
        .filter(|item| item.contract == contract && item.operation == operation)
        .collect();
    items.sort_by_cached_key(|item| Value::Array(item.args.clone()).to_string());
    Ok(items)
}

fn open_or_create(file: &Path) -> Result<InvokeFile> {
    if !file.exists() {
        std::fs::write(file, "[]").with_context(|| format!("creating {}", file.display()))?;
    }
    Ok(InvokeFile::open(file)?)
}

fn parse_arg(arg: &str) -> Value {
    serde_json::from_str(arg).unwrap_or_else(|_| Value::String(arg.to_string()))
}

fn cmd_settings(path: &Path, cmd: SettingsCmd) -> Result<()> {
    match cmd {
        SettingsCmd::Show => {
            let settings = Settings::load(path)?;
            print!("{}", toml::to_string_pretty(&settings)?);
        }
        SettingsCmd::Set { key, value } => {
            // Environment overrides stay out of the file.
            let mut settings = Settings::from_file(path)?;
            settings.set(&key, &value)?;
            settings.save(path)?;
            info!(%key, path = %path.display(), "setting saved");
        }
    }
    Ok(())
}
