use crate::{
    error::GatewayError,
    gateway::{
        Art,
        BlockSource,
        ChainGateway,
        EnterpriseRaw,
        GameConfig,
        MintStats,
        ReadCall,
        ReadValue,
        ShopItem,
        TxReceipt,
        TxRequest,
    },
    types::{
        Address,
        BlockHeader,
        EnterpriseId,
        Rp,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use serde::{
    Deserialize,
    Serialize,
};
use sha2::{
    Digest,
    Sha256,
};
use std::{
    collections::VecDeque,
    fs,
    path::Path,
    sync::{
        Arc,
        Mutex,
        PoisonError,
    },
    time::Duration,
};
use tokio::{
    sync::mpsc,
    time,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnterpriseRecord {
    pub id: EnterpriseId,
    pub owner: Address,
    pub raw: EnterpriseRaw,
    pub rp: Rp,
    pub art: Art,
    pub immune: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletRecord {
    pub address: Address,
    pub rp: Rp,
    pub native_gwei: u64,
    pub intern_last_task: u64,
}

/// Whole contract state as the in-memory chain sees it. Deserializable so the
/// binary can load it from a fixture file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainState {
    pub block: BlockHeader,
    pub config: GameConfig,
    pub passive_rp_per_day: Vec<Rp>,
    pub mint_stats: MintStats,
    pub enterprises: Vec<EnterpriseRecord>,
    pub wallets: Vec<WalletRecord>,
    pub shop_items: Vec<ShopItem>,
}

impl ChainState {
    fn enterprise(&self, id: EnterpriseId) -> Option<&EnterpriseRecord> {
        self.enterprises.iter().find(|e| e.id == id)
    }

    fn wallet(&self, address: &Address) -> Option<&WalletRecord> {
        self.wallets.iter().find(|w| w.address == *address)
    }

    /// Tokens of `owner` in enumeration order.
    fn tokens_of(&self, owner: &Address) -> Vec<EnterpriseId> {
        self.enterprises
            .iter()
            .filter(|e| e.owner == *owner)
            .map(|e| e.id)
            .collect()
    }

    fn answer(&self, call: &ReadCall) -> Result<ReadValue, GatewayError> {
        let missing = |what: &str| GatewayError::NotFound(what.to_string());
        let value = match call {
            ReadCall::GameConfig => ReadValue::Config(self.config.clone()),
            ReadCall::PassiveRpTable => {
                ReadValue::PassiveTable(self.passive_rp_per_day.clone())
            }
            ReadCall::MintStats => ReadValue::MintStats(self.mint_stats),
            ReadCall::Enterprise(id) => ReadValue::Enterprise(
                self.enterprise(*id)
                    .ok_or_else(|| missing(&format!("enterprise {id}")))?
                    .raw
                    .clone(),
            ),
            ReadCall::VirtualRpBalance(id) => ReadValue::Rp(
                self.enterprise(*id)
                    .ok_or_else(|| missing(&format!("enterprise {id}")))?
                    .rp,
            ),
            ReadCall::Art(id) => ReadValue::Art(
                self.enterprise(*id)
                    .ok_or_else(|| missing(&format!("art {id}")))?
                    .art
                    .clone(),
            ),
            ReadCall::OwnerOf(id) => ReadValue::Address(
                self.enterprise(*id)
                    .ok_or_else(|| missing(&format!("owner of {id}")))?
                    .owner,
            ),
            ReadCall::IsImmune(id) => ReadValue::Bool(
                self.enterprise(*id)
                    .ok_or_else(|| missing(&format!("enterprise {id}")))?
                    .immune,
            ),
            ReadCall::IsMinted(id) => ReadValue::Bool(self.enterprise(*id).is_some()),
            ReadCall::BalanceOf(owner) => {
                ReadValue::U64(self.tokens_of(owner).len() as u64)
            }
            ReadCall::TokenOfOwnerByIndex(owner, index) => {
                let tokens = self.tokens_of(owner);
                let id = usize::try_from(*index)
                    .ok()
                    .and_then(|i| tokens.get(i).copied())
                    .ok_or_else(|| missing(&format!("token {index} of {owner}")))?;
                ReadValue::Id(id)
            }
            ReadCall::WalletRpBalance(owner) => {
                ReadValue::Rp(self.wallet(owner).map(|w| w.rp).unwrap_or_default())
            }
            ReadCall::NativeBalance(owner) => ReadValue::U64(
                self.wallet(owner).map(|w| w.native_gwei).unwrap_or_default(),
            ),
            ReadCall::ShopItems => ReadValue::ShopItems(self.shop_items.clone()),
            ReadCall::InternLastTask(owner) => ReadValue::U64(
                self.wallet(owner)
                    .map(|w| w.intern_last_task)
                    .unwrap_or_default(),
            ),
        };
        Ok(value)
    }
}

/// Gateway backed by an in-process [`ChainState`]. Records every read and
/// submitted transaction; submissions can be scripted to fail.
#[derive(Clone, Default)]
pub struct InMemoryChain {
    state: Arc<Mutex<ChainState>>,
    reads: Arc<Mutex<Vec<ReadCall>>>,
    submitted: Arc<Mutex<Vec<TxRequest>>>,
    failures: Arc<Mutex<VecDeque<GatewayError>>>,
}

impl InMemoryChain {
    pub fn new(state: ChainState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            ..Self::default()
        }
    }

    pub fn from_fixture_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)
            .wrap_err_with(|| format!("Failed to read chain fixture {}", path.display()))?;
        let state = serde_json::from_slice::<ChainState>(&data)
            .wrap_err("Failed to parse chain fixture JSON")?;
        Ok(Self::new(state))
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut ChainState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn block(&self) -> BlockHeader {
        self.with_state(|s| s.block)
    }

    /// Produces one block `seconds` after the current one.
    pub fn advance_block(&self, seconds: u64) -> BlockHeader {
        self.with_state(|s| {
            s.block.height += 1;
            s.block.timestamp += seconds;
            s.block
        })
    }

    pub fn set_owner(&self, id: EnterpriseId, owner: Address) {
        self.with_state(|s| {
            if let Some(record) = s.enterprises.iter_mut().find(|e| e.id == id) {
                record.owner = owner;
            }
        });
    }

    pub fn read_log(&self) -> Vec<ReadCall> {
        self.reads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_read_log(&self) {
        self.reads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn submitted(&self) -> Vec<TxRequest> {
        self.submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn fail_next_submit(&self, error: GatewayError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    fn transaction_hash(
        request: &TxRequest,
        nonce: usize,
    ) -> Result<String, GatewayError> {
        let payload = serde_json::to_vec(&(nonce, request))
            .map_err(|e| GatewayError::Rpc(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(payload);
        Ok(format!("0x{}", hex::encode(hasher.finalize())))
    }
}

impl ChainGateway for InMemoryChain {
    async fn read(&self, call: &ReadCall) -> Result<ReadValue, GatewayError> {
        self.reads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call.clone());
        self.with_state(|s| s.answer(call))
    }

    async fn submit(&self, request: &TxRequest) -> Result<TxReceipt, GatewayError> {
        let scripted = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(error) = scripted {
            return Err(error);
        }
        let mut submitted = self
            .submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let hash = Self::transaction_hash(request, submitted.len())?;
        submitted.push(request.clone());
        Ok(TxReceipt { hash })
    }
}

/// Produces a block on the in-memory chain every `interval`.
pub struct IntervalBlocks {
    chain: InMemoryChain,
    ticker: time::Interval,
    block_seconds: u64,
}

impl IntervalBlocks {
    pub fn new(chain: InMemoryChain, interval: Duration) -> Self {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        Self {
            chain,
            ticker,
            block_seconds: interval.as_secs().max(1),
        }
    }
}

impl BlockSource for IntervalBlocks {
    async fn next_block(&mut self) -> Result<BlockHeader, GatewayError> {
        self.ticker.tick().await;
        Ok(self.chain.advance_block(self.block_seconds))
    }
}

/// Block headers pushed by hand, for tests.
pub struct ChannelBlocks {
    recv: mpsc::Receiver<BlockHeader>,
}

impl ChannelBlocks {
    pub fn new_with_sender() -> (Self, mpsc::Sender<BlockHeader>) {
        let (send, recv) = mpsc::channel(16);
        (Self { recv }, send)
    }
}

impl BlockSource for ChannelBlocks {
    async fn next_block(&mut self) -> Result<BlockHeader, GatewayError> {
        self.recv
            .recv()
            .await
            .ok_or_else(|| GatewayError::Rpc("block feed closed".to_string()))
    }
}
