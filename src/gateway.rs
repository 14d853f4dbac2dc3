//! Interface to the chain. Reads and transactions are executed by a
//! collaborator; this module only defines the calls, their payloads and the
//! traits a backend implements.

use crate::{
    error::GatewayError,
    types::{
        Address,
        BlockHeader,
        EnterpriseId,
        Rp,
    },
};
use serde::{
    Deserialize,
    Serialize,
};
use std::future::Future;

pub mod in_memory;

/// A contract read: method plus arguments. Doubles as the cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadCall {
    GameConfig,
    PassiveRpTable,
    MintStats,
    Enterprise(EnterpriseId),
    VirtualRpBalance(EnterpriseId),
    Art(EnterpriseId),
    OwnerOf(EnterpriseId),
    IsImmune(EnterpriseId),
    IsMinted(EnterpriseId),
    BalanceOf(Address),
    TokenOfOwnerByIndex(Address, u64),
    WalletRpBalance(Address),
    NativeBalance(Address),
    ShopItems,
    InternLastTask(Address),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadValue {
    Config(GameConfig),
    PassiveTable(Vec<Rp>),
    MintStats(MintStats),
    Enterprise(EnterpriseRaw),
    Rp(Rp),
    Art(Art),
    Address(Address),
    Bool(bool),
    U64(u64),
    Id(EnterpriseId),
    ShopItems(Vec<ShopItem>),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnterpriseStats {
    pub acquisitions: u64,
    pub competes: u64,
    pub mergers: u64,
    pub renames: u64,
    pub rebrands: u64,
    pub revives: u64,
}

/// Enterprise struct as stored by the contract. Timestamps are unix seconds,
/// zero meaning "never happened".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnterpriseRaw {
    pub name: String,
    pub level: u8,
    pub stats: EnterpriseStats,
    pub acquired_at: u64,
    pub merged_at: u64,
    pub revived_at: u64,
    pub moat_lost_at: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Art {
    pub id: u32,
    pub uri: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintStats {
    pub auction_count: u64,
    pub free_count: u64,
    pub max_auctioned: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    pub id: u32,
    pub rp: Rp,
    pub price_gwei: u64,
}

/// Game parameters read from the contract. Periods are in seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub acquire_cost: Rp,
    pub acquire_damage_pct: Option<u32>,
    pub merge_cost: Rp,
    pub compete_damage_pct: u32,
    pub revive_cost: Rp,
    pub rename_cost: Rp,
    pub rebrand_cost: Rp,
    pub moat_threshold: Rp,
    pub moat_period: u64,
    pub acquisition_immunity: u64,
    pub merger_immunity: u64,
    pub revival_immunity: u64,
    pub withdraw_burn_pct: u32,
    pub intern_reward: Rp,
    pub intern_cooldown: u64,
    pub max_name_length: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        const DAY: u64 = 86_400;
        Self {
            acquire_cost: Rp::whole(100),
            acquire_damage_pct: Some(50),
            merge_cost: Rp::whole(50),
            compete_damage_pct: 50,
            revive_cost: Rp::whole(100),
            rename_cost: Rp::whole(10),
            rebrand_cost: Rp::whole(10),
            moat_threshold: Rp::whole(1_000),
            moat_period: DAY,
            acquisition_immunity: DAY,
            merger_immunity: DAY,
            revival_immunity: 2 * DAY,
            withdraw_burn_pct: 10,
            intern_reward: Rp::whole(5),
            intern_cooldown: DAY,
            max_name_length: 32,
        }
    }
}

/// One mutating game action, ready to be signed and sent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxRequest {
    Compete {
        attacker: EnterpriseId,
        target: EnterpriseId,
        amount: Rp,
    },
    Acquire {
        acquirer: EnterpriseId,
        target: EnterpriseId,
        keep: EnterpriseId,
    },
    Merge {
        keep: EnterpriseId,
        burn: EnterpriseId,
    },
    Revive {
        target: EnterpriseId,
    },
    Deposit {
        target: EnterpriseId,
        amount: Rp,
    },
    Withdraw {
        source: EnterpriseId,
        amount: Rp,
    },
    Rename {
        target: EnterpriseId,
        name: String,
    },
    Rebrand {
        target: EnterpriseId,
        art: u32,
    },
    ShopPurchase {
        item: u32,
        price_gwei: u64,
    },
    InternTask,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub hash: String,
}

pub trait ChainGateway {
    fn read(
        &self,
        call: &ReadCall,
    ) -> impl Future<Output = Result<ReadValue, GatewayError>>;

    /// Signs, sends and waits for the transaction. Reverts come back as `Err`.
    fn submit(
        &self,
        request: &TxRequest,
    ) -> impl Future<Output = Result<TxReceipt, GatewayError>>;
}

/// Push side of the gateway: new block headers as they are observed.
pub trait BlockSource {
    fn next_block(&mut self) -> impl Future<Output = Result<BlockHeader, GatewayError>>;
}

/// Typed view over a [`ReadValue`].
pub trait FromReadValue: Sized {
    fn from_read_value(value: &ReadValue) -> Option<Self>;
}

macro_rules! from_read_value {
    ($ty:ty, $variant:ident) => {
        impl FromReadValue for $ty {
            fn from_read_value(value: &ReadValue) -> Option<Self> {
                match value {
                    ReadValue::$variant(inner) => Some(inner.clone()),
                    _ => None,
                }
            }
        }
    };
}

from_read_value!(GameConfig, Config);
from_read_value!(Vec<Rp>, PassiveTable);
from_read_value!(MintStats, MintStats);
from_read_value!(EnterpriseRaw, Enterprise);
from_read_value!(Rp, Rp);
from_read_value!(Art, Art);
from_read_value!(Address, Address);
from_read_value!(bool, Bool);
from_read_value!(u64, U64);
from_read_value!(EnterpriseId, Id);
from_read_value!(Vec<ShopItem>, ShopItems);
