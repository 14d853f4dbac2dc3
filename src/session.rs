//! Session driver: one connected wallet, its holdings, the search box, the
//! action forms and the transactions they produce.
//!
//! All derived state is rebuilt by [`Session::recompute`], a single pass over
//! the call cache. Reads that pass could not answer are left pending in the
//! cache; [`Session::settle`] fetches them and recomputes until nothing is
//! pending.

use crate::{
    actions::{
        ActionKind,
        ActionView,
        Evaluation,
        acquire::{
            self,
            AcquireInputs,
            KeepChoice,
        },
        compete::{
            self,
            CompeteInputs,
        },
        deposit::{
            self,
            DepositInputs,
        },
        intern::{
            self,
            InternInputs,
        },
        merge::{
            self,
            MergeInputs,
        },
        rebrand::{
            self,
            RebrandInputs,
        },
        rename::{
            self,
            RenameInputs,
        },
        revive::{
            self,
            ReviveInputs,
        },
        shop::{
            self,
            ShopInputs,
        },
        withdraw::{
            self,
            WithdrawInputs,
        },
    },
    busy::BusyFlags,
    cache::CallCache,
    config::EngineConfig,
    enterprise::{
        Enterprise,
        EnterpriseRegistry,
        Resolver,
    },
    error::{
        EngineError,
        Result,
    },
    gateway::{
        ChainGateway,
        TxReceipt,
        TxRequest,
    },
    loadable::Loadable,
    notifications::{
        Notice,
        Notifications,
    },
    pagination::{
        IndexedSlots,
        OwnerList,
    },
    sampler::{
        NO_OPPONENTS_NOTICE,
        OpponentSampler,
        SamplerState,
    },
    search::{
        QueryKind,
        SELF_SEARCH_NOTICE,
        SearchState,
    },
    types::{
        Address,
        BlockHeader,
        EnterpriseId,
        Rp,
    },
};
use futures::future::join_all;
use serde::Serialize;
use std::{
    collections::{
        BTreeMap,
        HashSet,
    },
    sync::Arc,
};
use tracing::{
    debug,
    info,
    warn,
};

/// User-entered action parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ActionForms {
    pub compete_amount: String,
    pub deposit_amount: String,
    pub withdraw_amount: String,
    pub new_name: String,
    pub art: Option<u32>,
    pub keep: Option<KeepChoice>,
    pub merge_partner: Option<EnterpriseId>,
    pub shop_item: Option<u32>,
}

impl ActionForms {
    fn clear_for(&mut self, kind: ActionKind) {
        match kind {
            ActionKind::Compete => self.compete_amount.clear(),
            ActionKind::Acquire => self.keep = None,
            ActionKind::Merge => self.merge_partner = None,
            ActionKind::Deposit => self.deposit_amount.clear(),
            ActionKind::Withdraw => self.withdraw_amount.clear(),
            ActionKind::Rename => self.new_name.clear(),
            ActionKind::Rebrand => self.art = None,
            ActionKind::Shop => self.shop_item = None,
            ActionKind::Revive | ActionKind::Intern => {}
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct HoldingsView {
    pub owner: Option<Address>,
    pub status: Loadable<usize>,
    pub slots: IndexedSlots<Arc<Enterprise>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchView {
    pub query: String,
    pub kind: QueryKind,
    pub generation: u64,
    pub slides: usize,
    pub status: Loadable<usize>,
    pub results: IndexedSlots<Arc<Enterprise>>,
    pub selected: Option<EnterpriseId>,
    pub sampler: SamplerState,
}

/// Everything a front end renders, in one serializable snapshot.
#[derive(Clone, Debug, Serialize)]
pub struct SessionView {
    pub block: BlockHeader,
    pub account: Option<Address>,
    pub wallet_rp: Loadable<Rp>,
    pub holdings: HoldingsView,
    pub signer: Option<EnterpriseId>,
    pub search: SearchView,
    pub forms: ActionForms,
    pub notices: Vec<Notice>,
    pub actions: BTreeMap<ActionKind, ActionView>,
}

pub struct Session<G> {
    gateway: G,
    config: EngineConfig,
    cache: CallCache,
    registry: EnterpriseRegistry,
    account: Option<Address>,
    holdings: OwnerList,
    signer: Option<EnterpriseId>,
    search: SearchState,
    sampler: OpponentSampler,
    forms: ActionForms,
    busy: BusyFlags,
    notices: Notifications,
    /// Set when a pass advanced a state machine without scheduling reads.
    needs_pass: bool,
}

/// Keeps the current signer while it is still held, otherwise falls back to
/// the first loaded holding.
fn pick_signer(
    current: Option<EnterpriseId>,
    holdings: &IndexedSlots<Arc<Enterprise>>,
) -> Option<EnterpriseId> {
    let still_held = current
        .is_some_and(|id| holdings.contains_id(id) || !holdings.is_fully_loaded());
    if still_held {
        current
    } else {
        holdings.first_ready().map(|e| e.id())
    }
}

impl<G: ChainGateway> Session<G> {
    pub fn new(gateway: G, config: EngineConfig) -> Self {
        Self {
            gateway,
            cache: CallCache::new(),
            registry: EnterpriseRegistry::new(),
            account: None,
            holdings: OwnerList::new(),
            signer: None,
            search: SearchState::new(config.initial_slides),
            sampler: OpponentSampler::new(config.sampler_seed),
            forms: ActionForms::default(),
            busy: BusyFlags::new(),
            notices: Notifications::new(config.notice_capacity),
            needs_pass: false,
            config,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &CallCache {
        &self.cache
    }

    pub fn registry(&self) -> &EnterpriseRegistry {
        &self.registry
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn holdings(&self) -> &OwnerList {
        &self.holdings
    }

    pub fn search_state(&self) -> &SearchState {
        &self.search
    }

    pub fn sampler_state(&self) -> SamplerState {
        self.sampler.state()
    }

    pub fn forms(&self) -> &ActionForms {
        &self.forms
    }

    pub fn forms_mut(&mut self) -> &mut ActionForms {
        &mut self.forms
    }

    pub fn busy_flags(&self) -> BusyFlags {
        self.busy.clone()
    }

    pub fn notices(&self) -> &Notifications {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.cache, self.cache.block().timestamp)
    }

    /// Records a new block; every cached read becomes stale. Returns `false`
    /// for a header that is not newer than the current one.
    pub fn on_new_block(&mut self, header: BlockHeader) -> bool {
        let advanced = self.cache.advance_block(header);
        if advanced {
            info!(height = header.height, timestamp = header.timestamp, "new block");
        }
        advanced
    }

    /// Switches the connected wallet. Holdings, signer and forms are reset;
    /// a search that depends on the caller's address is re-run. An address
    /// search for some third party keeps its slides and selection.
    pub fn set_account(&mut self, account: Option<Address>) {
        if self.account == account {
            return;
        }
        match account {
            Some(address) => info!(%address, "account connected"),
            None => info!("account disconnected"),
        }
        let previous = std::mem::replace(&mut self.account, account);
        self.holdings.retarget(account);
        self.signer = None;
        self.forms = ActionForms::default();
        let rerun = match self.search.kind() {
            QueryKind::OwnAddress | QueryKind::Id(_) => true,
            QueryKind::Address(address) => {
                Some(*address) == previous || Some(*address) == account
            }
            QueryKind::Empty | QueryKind::Invalid | QueryKind::Random => false,
        };
        if rerun {
            let query = self.search.query().to_string();
            self.search
                .set_query(&query, account.as_ref(), self.config.initial_slides);
        }
        self.prune_registry();
    }

    pub fn signer(&self) -> Option<Arc<Enterprise>> {
        self.signer.and_then(|id| self.registry.get(id))
    }

    /// Picks which owned enterprise acts. Ids outside the holdings are
    /// rejected.
    pub fn select_signer(&mut self, id: EnterpriseId) -> bool {
        if !self.holdings.slots().contains_id(id) {
            return false;
        }
        self.signer = Some(id);
        true
    }

    pub fn select_merge_partner(&mut self, id: EnterpriseId) -> bool {
        if !self.holdings.slots().contains_id(id) {
            return false;
        }
        self.forms.merge_partner = Some(id);
        true
    }

    /// Runs a new search. Searching the caller's own address is rejected with
    /// an error notice on every call.
    pub fn search(&mut self, query: &str) -> QueryKind {
        let kind = self
            .search
            .set_query(query, self.account.as_ref(), self.config.initial_slides)
            .clone();
        self.sampler.reset();
        if kind == QueryKind::OwnAddress {
            self.notices.error(SELF_SEARCH_NOTICE);
        }
        self.prune_registry();
        kind
    }

    pub fn search_random(&mut self) {
        self.search.start_random(self.config.initial_slides);
        self.sampler.request();
        self.prune_registry();
    }

    pub fn clear_search(&mut self) {
        self.search.clear(self.config.initial_slides);
        self.sampler.reset();
        self.prune_registry();
    }

    pub fn show_more(&mut self) -> usize {
        self.search.show_more(self.config.slide_step)
    }

    pub fn select_result(&mut self, id: EnterpriseId) -> bool {
        self.search.select(id)
    }

    pub fn selected_result(&self) -> Option<Arc<Enterprise>> {
        self.search.selected().and_then(|id| self.registry.get(id))
    }

    fn prune_registry(&mut self) {
        let mut keep: HashSet<EnterpriseId> = self.holdings.slots().ids().collect();
        keep.extend(self.search.results().ids());
        keep.extend(self.search.selected());
        keep.extend(self.signer);
        keep.extend(self.forms.merge_partner);
        keep.extend(self.sampler.candidate());
        let before = self.registry.len();
        self.registry.retain(|id| keep.contains(&id));
        if self.registry.len() != before {
            debug!(evicted = before - self.registry.len(), "pruned enterprise registry");
        }
    }

    /// One consistent pass over the cache. Never blocks; reads it needs but
    /// cannot answer are left pending.
    pub fn recompute(&mut self) {
        self.needs_pass = false;
        {
            let resolver = Resolver::new(&self.cache, self.cache.block().timestamp);

            self.holdings.refresh(
                &resolver,
                &mut self.registry,
                self.config.holdings_window,
                true,
            );
            self.signer = pick_signer(self.signer, self.holdings.slots());
            if let Some(id) = self.signer {
                let _ = self.registry.resolve(&resolver, id, true);
            }
            if let Some(id) = self.forms.merge_partner {
                let _ = self.registry.resolve(&resolver, id, true);
            }

            let own_ids = match self.account {
                Some(_) => self.holdings.all_ids(),
                None => Loadable::Ready(Vec::new()),
            };
            self.search.resolve(&resolver, &mut self.registry, &own_ids);
            if self.search.is_random() {
                let before = self.sampler.state();
                let outcome = self.sampler.step(&resolver, &mut self.registry, self.account);
                // a redraw only reads its candidate on the next pass
                self.needs_pass = self.sampler.state() != before;
                self.search.publish_sampled(outcome);
                if self.sampler.take_exhausted_notice() {
                    self.notices.info(NO_OPPONENTS_NOTICE);
                }
            }
            if let Some(id) = self.search.selected() {
                let _ = self.registry.resolve(&resolver, id, true);
            }
        }

        // evaluating schedules every read the action guards depend on
        for kind in ActionKind::ALL {
            let _ = self.evaluate(kind);
        }
    }

    /// Fetches every pending read concurrently. Returns `false` if nothing
    /// was pending.
    async fn fetch_pending(&mut self) -> bool {
        let (calls, epoch) = self.cache.take_pending();
        if calls.is_empty() {
            return false;
        }
        debug!(reads = calls.len(), epoch, "fetching pending reads");
        let gateway = &self.gateway;
        let results = join_all(calls.into_iter().map(|call| async move {
            let result = gateway.read(&call).await;
            (call, result)
        }))
        .await;
        for (call, result) in results {
            self.cache.complete(call, result, epoch);
        }
        true
    }

    /// Recomputes and fetches until no reads are pending. Returns the number
    /// of passes it took.
    pub async fn settle(&mut self) -> Result<usize> {
        let limit = self.config.max_settle_rounds;
        for round in 1..=limit {
            self.recompute();
            if !self.fetch_pending().await && !self.needs_pass {
                debug!(round, "session settled");
                return Ok(round);
            }
        }
        warn!(rounds = limit, "session did not settle");
        Err(EngineError::SettleOverrun { rounds: limit })
    }

    /// Drives the session until `extract` yields a value, then returns it once.
    pub async fn until_ready<T>(
        &mut self,
        mut extract: impl FnMut(&Self) -> Loadable<T>,
    ) -> Result<T> {
        let limit = self.config.max_settle_rounds;
        for _ in 0..limit {
            self.recompute();
            match extract(&*self) {
                Loadable::Ready(value) => return Ok(value),
                Loadable::Failed(err) => return Err(EngineError::ReadFailed(err)),
                Loadable::Loading => {}
            }
            if !self.fetch_pending().await && !self.needs_pass {
                return Err(EngineError::Unresolved);
            }
        }
        Err(EngineError::SettleOverrun { rounds: limit })
    }

    /// Searches and waits for the results in view.
    pub async fn search_and_wait(&mut self, query: &str) -> Result<Vec<Arc<Enterprise>>> {
        self.search(query);
        self.wait_for_results().await
    }

    pub async fn random_opponent(&mut self) -> Result<Option<Arc<Enterprise>>> {
        self.search_random();
        Ok(self.wait_for_results().await?.into_iter().next())
    }

    async fn wait_for_results(&mut self) -> Result<Vec<Arc<Enterprise>>> {
        self.until_ready(|session| session.search.visible()).await
    }

    fn owned_count(&self) -> Loadable<u64> {
        match self.account {
            None => Loadable::Ready(0),
            Some(_) => self.holdings.status().clone().map(|n| n as u64),
        }
    }

    fn signer_input(&self) -> Loadable<Arc<Enterprise>> {
        match (self.signer(), self.holdings.status()) {
            (Some(enterprise), _) => Loadable::Ready(enterprise),
            (None, Loadable::Failed(err)) => Loadable::Failed(err.clone()),
            _ => Loadable::Loading,
        }
    }

    /// A selected enterprise as an action input: ready only once its detail
    /// fields are known.
    fn selection_input(&self, resolver: &Resolver<'_>, id: EnterpriseId) -> Loadable<Arc<Enterprise>> {
        match self.registry.get(id) {
            Some(enterprise) if enterprise.has_detail() => Loadable::Ready(enterprise),
            _ => resolver
                .basic(id)
                .zip(resolver.detail(id))
                .and_then(|_| Loadable::Loading),
        }
    }

    fn wallet_rp(&self, resolver: &Resolver<'_>) -> Loadable<Rp> {
        match self.account {
            Some(address) => resolver.wallet_rp(&address),
            None => Loadable::Loading,
        }
    }

    /// Pure evaluation of one action against the current state.
    pub fn evaluate(&self, kind: ActionKind) -> Evaluation {
        let resolver = self.resolver();
        let busy = self.busy.is_busy(kind);
        let now = resolver.now();
        let connected = self.account.is_some();
        let opponent = || {
            self.search
                .selected()
                .map(|id| self.selection_input(&resolver, id))
        };
        match kind {
            ActionKind::Compete => compete::evaluate(&CompeteInputs {
                busy,
                owned_count: self.owned_count(),
                signer: self.signer_input(),
                opponent: opponent(),
                config: resolver.game_config(),
                amount: self.forms.compete_amount.clone(),
            }),
            ActionKind::Acquire => acquire::evaluate(&AcquireInputs {
                busy,
                owned_count: self.owned_count(),
                signer: self.signer_input(),
                opponent: opponent(),
                wallet_rp: self.wallet_rp(&resolver),
                config: resolver.game_config(),
                keep: self.forms.keep,
                now,
            }),
            ActionKind::Merge => merge::evaluate(&MergeInputs {
                busy,
                owned_count: self.owned_count(),
                signer: self.signer_input(),
                partner: self
                    .forms
                    .merge_partner
                    .map(|id| self.selection_input(&resolver, id)),
                wallet_rp: self.wallet_rp(&resolver),
                config: resolver.game_config(),
                now,
            }),
            ActionKind::Revive => revive::evaluate(&ReviveInputs {
                busy,
                connected,
                target: opponent(),
                wallet_rp: self.wallet_rp(&resolver),
                config: resolver.game_config(),
                now,
            }),
            ActionKind::Deposit => deposit::evaluate(&DepositInputs {
                busy,
                owned_count: self.owned_count(),
                signer: self.signer_input(),
                wallet_rp: self.wallet_rp(&resolver),
                config: resolver.game_config(),
                amount: self.forms.deposit_amount.clone(),
            }),
            ActionKind::Withdraw => withdraw::evaluate(&WithdrawInputs {
                busy,
                owned_count: self.owned_count(),
                signer: self.signer_input(),
                wallet_rp: self.wallet_rp(&resolver),
                config: resolver.game_config(),
                amount: self.forms.withdraw_amount.clone(),
            }),
            ActionKind::Rename => rename::evaluate(&RenameInputs {
                busy,
                owned_count: self.owned_count(),
                signer: self.signer_input(),
                wallet_rp: self.wallet_rp(&resolver),
                config: resolver.game_config(),
                name: self.forms.new_name.clone(),
            }),
            ActionKind::Rebrand => rebrand::evaluate(&RebrandInputs {
                busy,
                owned_count: self.owned_count(),
                signer: self.signer_input(),
                wallet_rp: self.wallet_rp(&resolver),
                config: resolver.game_config(),
                art: self.forms.art,
            }),
            ActionKind::Shop => shop::evaluate(&ShopInputs {
                busy,
                connected,
                items: resolver.shop_items(),
                native_balance: match self.account {
                    Some(address) => resolver.native_balance(&address),
                    None => Loadable::Loading,
                },
                wallet_rp: self.wallet_rp(&resolver),
                item: self.forms.shop_item,
            }),
            ActionKind::Intern => intern::evaluate(&InternInputs {
                busy,
                connected,
                last_task: match self.account {
                    Some(address) => resolver.intern_last_task(&address),
                    None => Loadable::Loading,
                },
                wallet_rp: self.wallet_rp(&resolver),
                config: resolver.game_config(),
                now,
            }),
        }
    }

    pub fn action_view(&self, kind: ActionKind) -> ActionView {
        ActionView::from(self.evaluate(kind))
    }

    fn build_request(&self, kind: ActionKind) -> Option<TxRequest> {
        let signer = self.signer;
        let opponent = self.search.selected();
        let request = match kind {
            ActionKind::Compete => TxRequest::Compete {
                attacker: signer?,
                target: opponent?,
                amount: Rp::parse_amount(&self.forms.compete_amount)?,
            },
            ActionKind::Acquire => TxRequest::Acquire {
                acquirer: signer?,
                target: opponent?,
                keep: match self.forms.keep? {
                    KeepChoice::Acquirer => signer?,
                    KeepChoice::Target => opponent?,
                },
            },
            ActionKind::Merge => TxRequest::Merge {
                keep: signer?,
                burn: self.forms.merge_partner?,
            },
            ActionKind::Revive => TxRequest::Revive { target: opponent? },
            ActionKind::Deposit => TxRequest::Deposit {
                target: signer?,
                amount: Rp::parse_amount(&self.forms.deposit_amount)?,
            },
            ActionKind::Withdraw => TxRequest::Withdraw {
                source: signer?,
                amount: Rp::parse_amount(&self.forms.withdraw_amount)?,
            },
            ActionKind::Rename => TxRequest::Rename {
                target: signer?,
                name: self.forms.new_name.trim().to_string(),
            },
            ActionKind::Rebrand => TxRequest::Rebrand {
                target: signer?,
                art: self.forms.art?,
            },
            ActionKind::Shop => {
                let id = self.forms.shop_item?;
                let items = self.resolver().shop_items().ready()?;
                let item = items.into_iter().find(|item| item.id == id)?;
                TxRequest::ShopPurchase {
                    item: item.id,
                    price_gwei: item.price_gwei,
                }
            }
            ActionKind::Intern => TxRequest::InternTask,
        };
        Some(request)
    }

    /// Submits `kind` if it is enabled. The action is marked busy for the
    /// duration of the submission. Failures end up as error notices and are
    /// not returned.
    pub async fn execute(&mut self, kind: ActionKind) -> Option<TxReceipt> {
        let evaluation = self.evaluate(kind);
        if !evaluation.eligibility.is_enabled() {
            debug!(%kind, reason = evaluation.eligibility.label(), "action not enabled");
            return None;
        }
        let label = evaluation.eligibility.label().to_string();
        let request = self.build_request(kind)?;
        let _guard = self.busy.try_acquire(kind)?;
        info!(%kind, %label, "submitting transaction");
        match self.gateway.submit(&request).await {
            Ok(receipt) => {
                self.notices.success(format!(
                    "{label}: confirmed in {}",
                    hash_preview(&receipt.hash)
                ));
                self.forms.clear_for(kind);
                self.cache.invalidate_all();
                Some(receipt)
            }
            Err(err) => {
                self.notices.error(format!("{kind} failed: {err}"));
                None
            }
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            block: self.cache.block(),
            account: self.account,
            wallet_rp: self.wallet_rp(&self.resolver()),
            holdings: HoldingsView {
                owner: self.holdings.owner(),
                status: self.holdings.status().clone(),
                slots: self.holdings.slots().clone(),
            },
            signer: self.signer,
            search: SearchView {
                query: self.search.query().to_string(),
                kind: self.search.kind().clone(),
                generation: self.search.generation(),
                slides: self.search.slides(),
                status: self.search.status().clone(),
                results: self.search.results().clone(),
                selected: self.search.selected(),
                sampler: self.sampler.state(),
            },
            forms: self.forms.clone(),
            notices: self.notices.iter().cloned().collect(),
            actions: ActionKind::ALL
                .into_iter()
                .map(|kind| (kind, self.action_view(kind)))
                .collect(),
        }
    }
}

/// Shortened transaction hash for notices, e.g. `0x1234…cdef`.
pub fn hash_preview(hash: &str) -> String {
    if hash.len() <= 12 || !hash.is_ascii() {
        return hash.to_string();
    }
    format!("{}…{}", &hash[..6], &hash[hash.len() - 4..])
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn hash_preview__keeps_short_hashes() {
        assert_eq!(hash_preview("0xabc"), "0xabc");
        assert_eq!(
            hash_preview("0x1234567890abcdef1234567890abcdef"),
            "0x1234…cdef"
        );
    }

    #[test]
    fn clear_for__only_touches_the_submitted_action() {
        let mut forms = ActionForms {
            compete_amount: "10".into(),
            deposit_amount: "5".into(),
            ..ActionForms::default()
        };
        forms.clear_for(ActionKind::Compete);
        assert!(forms.compete_amount.is_empty());
        assert_eq!(forms.deposit_amount, "5");
    }
}
