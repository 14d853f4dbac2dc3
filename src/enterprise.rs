//! Enterprise model and the two-phase resolver.
//!
//! Basic fields (name, RP, stats, immunity, moat) are cheap and populate lists.
//! Detail fields (art, owner, burn and immune flags) cost extra reads per
//! entity and are only fetched for entities that are on screen or selected.

use crate::{
    cache::CallCache,
    gateway::{
        Art,
        EnterpriseRaw,
        EnterpriseStats,
        GameConfig,
        MintStats,
        ReadCall,
        ShopItem,
    },
    loadable::Loadable,
    types::{
        Address,
        EnterpriseId,
        Rp,
    },
};
use serde::Serialize;
use std::{
    collections::HashMap,
    sync::Arc,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImmunityWindows {
    pub acquisition_end: u64,
    pub merger_end: u64,
    pub revival_end: u64,
}

impl ImmunityWindows {
    pub fn from_raw(raw: &EnterpriseRaw, config: &GameConfig) -> Self {
        let end = |start: u64, period: u64| {
            if start == 0 {
                0
            } else {
                start.saturating_add(period)
            }
        };
        Self {
            acquisition_end: end(raw.acquired_at, config.acquisition_immunity),
            merger_end: end(raw.merged_at, config.merger_immunity),
            revival_end: end(raw.revived_at, config.revival_immunity),
        }
    }

    pub fn until(&self) -> u64 {
        self.acquisition_end
            .max(self.merger_end)
            .max(self.revival_end)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MoatStatus {
    pub has_moat: bool,
    pub moat_until: Option<u64>,
    pub countdown: Option<u64>,
}

impl MoatStatus {
    /// A moat needs RP at or above the threshold, and after RP last dipped
    /// below it the moat only comes back once the recovery period has run.
    pub fn compute(rp: Rp, moat_lost_at: Option<u64>, config: &GameConfig, now: u64) -> Self {
        let moat_until = moat_lost_at.map(|lost| lost.saturating_add(config.moat_period));
        let recovered = moat_until.is_none_or(|until| now >= until);
        let countdown = moat_until
            .map(|until| until.saturating_sub(now))
            .filter(|left| *left > 0);
        Self {
            has_moat: rp >= config.moat_threshold && recovered,
            moat_until,
            countdown,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EnterpriseBasic {
    pub id: EnterpriseId,
    pub name: String,
    pub level: u8,
    pub rp: Rp,
    pub rp_per_day: Rp,
    pub stats: EnterpriseStats,
    pub immunity: ImmunityWindows,
    pub immune_until: u64,
    pub moat: MoatStatus,
}

impl EnterpriseBasic {
    pub fn from_chain(
        id: EnterpriseId,
        raw: &EnterpriseRaw,
        passive_rp_per_day: &[Rp],
        rp: Rp,
        config: &GameConfig,
        now: u64,
    ) -> Self {
        let rp_per_day = passive_rp_per_day
            .get(usize::from(raw.level))
            .or_else(|| passive_rp_per_day.last())
            .copied()
            .unwrap_or_default();
        let immunity = ImmunityWindows::from_raw(raw, config);
        Self {
            id,
            name: raw.name.clone(),
            level: raw.level,
            rp,
            rp_per_day,
            stats: raw.stats,
            immune_until: immunity.until(),
            immunity,
            moat: MoatStatus::compute(rp, raw.moat_lost_at, config, now),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EnterpriseDetail {
    pub art: Art,
    pub owner: Address,
    pub burned: bool,
    pub immune: bool,
}

impl EnterpriseDetail {
    pub fn new(art: Art, owner: Address, immune: bool) -> Self {
        Self {
            art,
            burned: owner.is_empty(),
            owner,
            immune,
        }
    }
}

/// Basic fields plus, once resolved, the detail fields. A Basic-only
/// enterprise is a valid "details loading" state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Enterprise {
    pub basic: EnterpriseBasic,
    pub detail: Option<EnterpriseDetail>,
}

impl Enterprise {
    pub fn id(&self) -> EnterpriseId {
        self.basic.id
    }

    pub fn name(&self) -> &str {
        &self.basic.name
    }

    pub fn rp(&self) -> Rp {
        self.basic.rp
    }

    pub fn has_detail(&self) -> bool {
        self.detail.is_some()
    }

    /// `None` while the owner lookup is outstanding.
    pub fn burned(&self) -> Option<bool> {
        self.detail.as_ref().map(|d| d.burned)
    }

    /// Immune flag; meaningless and reported `false` for a burned enterprise.
    pub fn immune(&self) -> Option<bool> {
        self.detail.as_ref().map(|d| d.immune && !d.burned)
    }

    /// Moat status; meaningless and reported `false` for a burned enterprise.
    pub fn has_moat(&self) -> bool {
        self.burned() != Some(true) && self.basic.moat.has_moat
    }
}

/// Read-side view over the cache for one recompute pass.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    cache: &'a CallCache,
    now: u64,
}

impl<'a> Resolver<'a> {
    pub fn new(cache: &'a CallCache, now: u64) -> Self {
        Self { cache, now }
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn game_config(&self) -> Loadable<GameConfig> {
        self.cache.read_as(&ReadCall::GameConfig)
    }

    pub fn mint_stats(&self) -> Loadable<MintStats> {
        self.cache.read_as(&ReadCall::MintStats)
    }

    pub fn balance_of(&self, owner: &Address) -> Loadable<u64> {
        self.cache.read_as(&ReadCall::BalanceOf(*owner))
    }

    pub fn token_of_owner_by_index(&self, owner: &Address, index: u64) -> Loadable<EnterpriseId> {
        self.cache
            .read_as(&ReadCall::TokenOfOwnerByIndex(*owner, index))
    }

    pub fn is_minted(&self, id: EnterpriseId) -> Loadable<bool> {
        self.cache.read_as(&ReadCall::IsMinted(id))
    }

    pub fn wallet_rp(&self, owner: &Address) -> Loadable<Rp> {
        self.cache.read_as(&ReadCall::WalletRpBalance(*owner))
    }

    pub fn native_balance(&self, owner: &Address) -> Loadable<u64> {
        self.cache.read_as(&ReadCall::NativeBalance(*owner))
    }

    pub fn shop_items(&self) -> Loadable<Vec<ShopItem>> {
        self.cache.read_as(&ReadCall::ShopItems)
    }

    pub fn intern_last_task(&self, owner: &Address) -> Loadable<u64> {
        self.cache.read_as(&ReadCall::InternLastTask(*owner))
    }

    /// Raw struct, passive table, virtual balance and game config; all four
    /// are read in the same pass.
    pub fn basic(&self, id: EnterpriseId) -> Loadable<EnterpriseBasic> {
        let raw = self.cache.read_as::<EnterpriseRaw>(&ReadCall::Enterprise(id));
        let table = self.cache.read_as::<Vec<Rp>>(&ReadCall::PassiveRpTable);
        let rp = self.cache.read_as::<Rp>(&ReadCall::VirtualRpBalance(id));
        let config = self.game_config();
        raw.zip(table)
            .zip(rp)
            .zip(config)
            .map(|(((raw, table), rp), config)| {
                EnterpriseBasic::from_chain(id, &raw, &table, rp, &config, self.now)
            })
    }

    pub fn detail(&self, id: EnterpriseId) -> Loadable<EnterpriseDetail> {
        let art = self.cache.read_as::<Art>(&ReadCall::Art(id));
        let owner = self.cache.read_as::<Address>(&ReadCall::OwnerOf(id));
        let immune = self.cache.read_as::<bool>(&ReadCall::IsImmune(id));
        art.zip(owner)
            .zip(immune)
            .map(|((art, owner), immune)| EnterpriseDetail::new(art, owner, immune))
    }
}

/// Enterprises resolved this session, keyed by id. Re-resolving an id merges
/// into the existing record, and an unchanged record keeps its `Arc`, so
/// callers can compare with `Arc::ptr_eq`.
#[derive(Debug, Default)]
pub struct EnterpriseRegistry {
    entries: HashMap<EnterpriseId, Arc<Enterprise>>,
}

impl EnterpriseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: EnterpriseId) -> Option<Arc<Enterprise>> {
        self.entries.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn upsert_basic(&mut self, basic: EnterpriseBasic) -> Arc<Enterprise> {
        let id = basic.id;
        let detail = match self.entries.get(&id) {
            Some(existing) if existing.basic == basic => return existing.clone(),
            Some(existing) => existing.detail.clone(),
            None => None,
        };
        let merged = Arc::new(Enterprise { basic, detail });
        self.entries.insert(id, merged.clone());
        merged
    }

    /// Attaches detail fields to an enterprise whose basic fields are known.
    pub fn attach_detail(
        &mut self,
        id: EnterpriseId,
        detail: EnterpriseDetail,
    ) -> Option<Arc<Enterprise>> {
        let existing = self.entries.get(&id)?;
        if existing.detail.as_ref() == Some(&detail) {
            return Some(existing.clone());
        }
        let merged = Arc::new(Enterprise {
            basic: existing.basic.clone(),
            detail: Some(detail),
        });
        self.entries.insert(id, merged.clone());
        Some(merged)
    }

    /// Resolves `id` and merges the result. Detail reads are only issued when
    /// `with_detail` is set; the enterprise is returned as soon as its basic
    /// fields are known. A failed detail read fails the resolve unless an
    /// earlier detail is still held.
    pub fn resolve(
        &mut self,
        resolver: &Resolver<'_>,
        id: EnterpriseId,
        with_detail: bool,
    ) -> Loadable<Arc<Enterprise>> {
        let basic = resolver.basic(id);
        let detail = with_detail.then(|| resolver.detail(id));
        match basic {
            Loadable::Loading => Loadable::Loading,
            Loadable::Failed(err) => Loadable::Failed(err),
            Loadable::Ready(basic) => {
                let mut enterprise = self.upsert_basic(basic);
                match detail {
                    Some(Loadable::Ready(detail)) => {
                        if let Some(merged) = self.attach_detail(id, detail) {
                            enterprise = merged;
                        }
                    }
                    Some(Loadable::Failed(err)) if !enterprise.has_detail() => {
                        return Loadable::Failed(err);
                    }
                    _ => {}
                }
                Loadable::Ready(enterprise)
            }
        }
    }

    pub fn retain(&mut self, mut keep: impl FnMut(EnterpriseId) -> bool) {
        self.entries.retain(|id, _| keep(*id));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
