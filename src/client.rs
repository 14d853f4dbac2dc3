use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use enterprise_sync::{
    actions::{
        ActionKind,
        acquire::KeepChoice,
    },
    config::EngineConfig,
    gateway::{
        BlockSource,
        ChainGateway,
        in_memory::{
            InMemoryChain,
            IntervalBlocks,
        },
    },
    session::Session,
    types::{
        Address,
        EnterpriseId,
    },
};
use itertools::Itertools;
use std::time::Duration;
use tracing::{
    info,
    warn,
};

#[derive(Parser, Debug)]
#[command(
    name = "enterprise-sync",
    about = "Resolve Enterprise holdings, searches and action eligibility against a chain fixture",
    version
)]
pub struct Args {
    /// Chain state fixture (JSON) backing the in-memory gateway
    #[arg(long)]
    pub fixture: String,

    /// Connected wallet address (0x + 40 hex digits)
    #[arg(long)]
    pub account: Option<String>,

    /// Engine config file (JSON); ENTERPRISE_SYNC_* variables override it
    #[arg(long)]
    pub config: Option<String>,

    /// Search by address or Enterprise id
    #[arg(long)]
    pub query: Option<String>,

    /// Pick a random opponent instead of searching
    #[arg(long, conflicts_with = "query")]
    pub random: bool,

    /// Widen an address search this many times
    #[arg(long, default_value_t = 0)]
    pub show_more: usize,

    /// Owned Enterprise that acts (defaults to the first holding)
    #[arg(long)]
    pub signer: Option<u64>,

    /// Search result to select (defaults to the first result)
    #[arg(long)]
    pub select: Option<u64>,

    #[arg(long)]
    pub compete_amount: Option<String>,

    #[arg(long)]
    pub deposit_amount: Option<String>,

    #[arg(long)]
    pub withdraw_amount: Option<String>,

    #[arg(long)]
    pub new_name: Option<String>,

    #[arg(long)]
    pub art: Option<u32>,

    /// Which Enterprise survives an acquisition
    #[arg(long, value_enum)]
    pub keep: Option<KeepArg>,

    /// Owned Enterprise to merge into the signer
    #[arg(long)]
    pub merge_partner: Option<u64>,

    #[arg(long)]
    pub shop_item: Option<u32>,

    /// Submit this action once everything has loaded
    #[arg(short, long, value_enum)]
    pub execute: Option<ActionArg>,

    /// Keep producing blocks and reprint the view after each one
    #[arg(long)]
    pub watch: bool,

    #[arg(long, default_value_t = 2)]
    pub block_interval_secs: u64,

    /// Write logs to a daily rolling file in this directory instead of stderr
    #[arg(long)]
    pub log_dir: Option<String>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ActionArg {
    Compete,
    Acquire,
    Merge,
    Revive,
    Deposit,
    Withdraw,
    Rename,
    Rebrand,
    Shop,
    Intern,
}

impl From<ActionArg> for ActionKind {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Compete => ActionKind::Compete,
            ActionArg::Acquire => ActionKind::Acquire,
            ActionArg::Merge => ActionKind::Merge,
            ActionArg::Revive => ActionKind::Revive,
            ActionArg::Deposit => ActionKind::Deposit,
            ActionArg::Withdraw => ActionKind::Withdraw,
            ActionArg::Rename => ActionKind::Rename,
            ActionArg::Rebrand => ActionKind::Rebrand,
            ActionArg::Shop => ActionKind::Shop,
            ActionArg::Intern => ActionKind::Intern,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum KeepArg {
    Mine,
    Theirs,
}

impl From<KeepArg> for KeepChoice {
    fn from(arg: KeepArg) -> Self {
        match arg {
            KeepArg::Mine => KeepChoice::Acquirer,
            KeepArg::Theirs => KeepChoice::Target,
        }
    }
}

fn apply_forms<G: ChainGateway>(session: &mut Session<G>, args: &Args) {
    let forms = session.forms_mut();
    if let Some(amount) = &args.compete_amount {
        forms.compete_amount = amount.clone();
    }
    if let Some(amount) = &args.deposit_amount {
        forms.deposit_amount = amount.clone();
    }
    if let Some(amount) = &args.withdraw_amount {
        forms.withdraw_amount = amount.clone();
    }
    if let Some(name) = &args.new_name {
        forms.new_name = name.clone();
    }
    forms.art = args.art;
    forms.keep = args.keep.map(KeepChoice::from);
    forms.shop_item = args.shop_item;
}

fn apply_selections<G: ChainGateway>(session: &mut Session<G>, args: &Args) {
    if let Some(id) = args.signer
        && !session.select_signer(EnterpriseId(id))
    {
        warn!(id, "--signer is not one of the account's Enterprises");
    }
    if let Some(id) = args.merge_partner
        && !session.select_merge_partner(EnterpriseId(id))
    {
        warn!(id, "--merge-partner is not one of the account's Enterprises");
    }
    if let Some(id) = args.select
        && !session.select_result(EnterpriseId(id))
    {
        warn!(id, "--select is not among the search results");
    }
}

fn print_view<G: ChainGateway>(session: &Session<G>) -> Result<()> {
    let json = serde_json::to_string_pretty(&session.view())
        .wrap_err("Failed to serialize session view")?;
    println!("{json}");
    Ok(())
}

pub async fn run_app(args: Args) -> Result<()> {
    let config = match args.config.as_deref() {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::from_env(),
    };
    let fixture = shellexpand::tilde(&args.fixture).into_owned();
    let chain = InMemoryChain::from_fixture_file(fixture)?;
    let account = args
        .account
        .as_deref()
        .map(str::parse::<Address>)
        .transpose()
        .wrap_err("Invalid --account address")?;

    let mut session = Session::new(chain.clone(), config);
    session.on_new_block(chain.block());
    session.set_account(account);
    apply_forms(&mut session, &args);
    if let Some(query) = &args.query {
        session.search(query);
    } else if args.random {
        session.search_random();
    }
    for _ in 0..args.show_more {
        session.show_more();
    }
    session.settle().await?;
    apply_selections(&mut session, &args);
    let rounds = session.settle().await?;
    info!(
        rounds,
        holdings = %session.holdings().slots().ids().join(","),
        results = %session.search_state().results().ids().join(","),
        "session settled"
    );

    if let Some(action) = args.execute {
        let kind = ActionKind::from(action);
        match session.execute(kind).await {
            Some(receipt) => info!(%kind, hash = %receipt.hash, "transaction confirmed"),
            None => warn!(%kind, label = %session.action_view(kind).label, "action not submitted"),
        }
        session.settle().await?;
    }
    print_view(&session)?;

    if args.watch {
        let interval = Duration::from_secs(args.block_interval_secs.max(1));
        watch(&mut session, IntervalBlocks::new(chain, interval)).await?;
    }
    Ok(())
}

/// Follows `blocks` until ctrl-c, settling and reprinting after every block.
pub async fn watch<G: ChainGateway, B: BlockSource>(
    session: &mut Session<G>,
    mut blocks: B,
) -> Result<()> {
    info!("watching for new blocks");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("stopping watch");
                break;
            }
            header = blocks.next_block() => {
                if session.on_new_block(header?) {
                    session.settle().await?;
                    print_view(session)?;
                }
            }
        }
    }
    Ok(())
}
