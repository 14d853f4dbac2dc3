use crate::{
    config::EngineConfig,
    gateway::{
        Art,
        EnterpriseRaw,
        GameConfig,
        MintStats,
        ShopItem,
        in_memory::{
            ChainState,
            EnterpriseRecord,
            InMemoryChain,
            WalletRecord,
        },
    },
    session::Session,
    types::{
        Address,
        BlockHeader,
        EnterpriseId,
        Rp,
    },
};

pub const ALICE: Address = Address::new([0xa1; 20]);
pub const BOB: Address = Address::new([0xb0; 20]);
pub const CAROL: Address = Address::new([0xc4; 20]);

pub const GENESIS: BlockHeader = BlockHeader {
    height: 100,
    timestamp: 1_700_000_000,
};

/// Builder for an in-memory chain and a session on top of it.
///
/// Mint stats follow the enterprises added: ids `0..=max` form the auctioned
/// range, so the opponent sampler draws from exactly those ids.
pub struct TestWorld {
    state: ChainState,
    config: EngineConfig,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    pub fn new() -> Self {
        let state = ChainState {
            block: GENESIS,
            config: GameConfig::default(),
            passive_rp_per_day: vec![Rp::whole(1), Rp::whole(2), Rp::whole(4)],
            ..ChainState::default()
        };
        let config = EngineConfig {
            sampler_seed: Some(7),
            ..EngineConfig::default()
        };
        Self { state, config }
    }

    pub fn enterprise(mut self, id: u64, name: &str, owner: Address, rp: u64) -> Self {
        self.state.enterprises.push(EnterpriseRecord {
            id: EnterpriseId(id),
            owner,
            raw: EnterpriseRaw {
                name: name.to_string(),
                ..EnterpriseRaw::default()
            },
            rp: Rp::whole(rp),
            art: Art {
                id: 1,
                uri: format!("ipfs://art/{id}"),
            },
            immune: false,
        });
        let next = id.saturating_add(1);
        let stats = &mut self.state.mint_stats;
        stats.auction_count = stats.auction_count.max(next);
        stats.max_auctioned = stats.max_auctioned.max(next);
        self
    }

    /// An enterprise whose owner is the empty address.
    pub fn burned(self, id: u64, name: &str) -> Self {
        self.enterprise(id, name, Address::EMPTY, 0)
    }

    /// Edits an already added enterprise.
    pub fn modify(mut self, id: u64, f: impl FnOnce(&mut EnterpriseRecord)) -> Self {
        if let Some(record) = self
            .state
            .enterprises
            .iter_mut()
            .find(|e| e.id == EnterpriseId(id))
        {
            f(record);
        }
        self
    }

    pub fn wallet(mut self, address: Address, rp: u64, native_gwei: u64) -> Self {
        self.state.wallets.push(WalletRecord {
            address,
            rp: Rp::whole(rp),
            native_gwei,
            intern_last_task: 0,
        });
        self
    }

    pub fn shop_item(mut self, id: u32, rp: u64, price_gwei: u64) -> Self {
        self.state.shop_items.push(ShopItem {
            id,
            rp: Rp::whole(rp),
            price_gwei,
        });
        self
    }

    pub fn mint_stats(mut self, stats: MintStats) -> Self {
        self.state.mint_stats = stats;
        self
    }

    pub fn game_config(mut self, f: impl FnOnce(&mut GameConfig)) -> Self {
        f(&mut self.state.config);
        self
    }

    pub fn engine_config(mut self, f: impl FnOnce(&mut EngineConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn chain(&self) -> InMemoryChain {
        InMemoryChain::new(self.state.clone())
    }

    /// A session on a fresh chain, already at the genesis block.
    pub fn session(&self) -> (Session<InMemoryChain>, InMemoryChain) {
        let chain = self.chain();
        let mut session = Session::new(chain.clone(), self.config.clone());
        session.on_new_block(chain.block());
        (session, chain)
    }

    /// Same as [`TestWorld::session`] with `account` connected.
    pub fn session_for(&self, account: Address) -> (Session<InMemoryChain>, InMemoryChain) {
        let (mut session, chain) = self.session();
        session.set_account(Some(account));
        (session, chain)
    }
}
