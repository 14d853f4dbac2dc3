//! Search query classification and result resolution.

use crate::{
    enterprise::{
        Enterprise,
        EnterpriseRegistry,
        Resolver,
    },
    loadable::Loadable,
    pagination::{
        self,
        IndexedSlots,
        LoadRequest,
    },
    types::{
        Address,
        EnterpriseId,
    },
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{
    debug,
    info,
};

pub const SELF_SEARCH_NOTICE: &str = "cannot search your own address";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum QueryKind {
    #[default]
    Empty,
    OwnAddress,
    Address(Address),
    Id(EnterpriseId),
    Invalid,
    Random,
}

/// Classifies a free-text query. Checks run in order: empty, own address,
/// any address, non-negative integer id, anything else is invalid.
pub fn classify(query: &str, own: Option<&Address>) -> QueryKind {
    let query = query.trim();
    if query.is_empty() {
        return QueryKind::Empty;
    }
    if Address::looks_like(query) {
        return match query.parse::<Address>() {
            Ok(address) if Some(&address) == own => QueryKind::OwnAddress,
            Ok(address) => QueryKind::Address(address),
            Err(_) => QueryKind::Invalid,
        };
    }
    if query.bytes().all(|b| b.is_ascii_digit()) {
        return query
            .parse::<u64>()
            .map(|id| QueryKind::Id(EnterpriseId(id)))
            .unwrap_or(QueryKind::Invalid);
    }
    QueryKind::Invalid
}

/// Syntactic pre-check for the search box.
pub fn is_searchable(query: &str) -> bool {
    let query = query.trim();
    Address::looks_like(query)
        || (!query.is_empty() && query.bytes().all(|b| b.is_ascii_digit()))
}

#[derive(Debug, Default)]
pub struct SearchState {
    query: String,
    kind: QueryKind,
    generation: u64,
    slides: usize,
    results: IndexedSlots<Arc<Enterprise>>,
    status: Loadable<usize>,
    selected: Option<EnterpriseId>,
}

impl SearchState {
    pub fn new(initial_slides: usize) -> Self {
        Self {
            slides: initial_slides,
            status: Loadable::Ready(0),
            ..Self::default()
        }
    }

    /// Starts a new search. Results, selection and slides from the previous
    /// query are dropped before anything is loaded.
    pub fn set_query(
        &mut self,
        query: &str,
        own: Option<&Address>,
        initial_slides: usize,
    ) -> &QueryKind {
        let kind = classify(query, own);
        info!(query, ?kind, "search query changed");
        self.query = query.trim().to_string();
        self.restart(kind, initial_slides);
        &self.kind
    }

    pub fn start_random(&mut self, initial_slides: usize) {
        info!("random opponent search started");
        self.query.clear();
        self.restart(QueryKind::Random, initial_slides);
    }

    pub fn clear(&mut self, initial_slides: usize) {
        self.query.clear();
        self.restart(QueryKind::Empty, initial_slides);
    }

    fn restart(&mut self, kind: QueryKind, initial_slides: usize) {
        self.generation += 1;
        self.results.clear();
        self.selected = None;
        self.slides = initial_slides;
        self.status = match kind {
            QueryKind::Empty | QueryKind::OwnAddress | QueryKind::Invalid => {
                Loadable::Ready(0)
            }
            QueryKind::Address(_) | QueryKind::Id(_) | QueryKind::Random => Loadable::Loading,
        };
        self.kind = kind;
    }

    /// Widens the address-search window. Returns the new slide count.
    pub fn show_more(&mut self, step: usize) -> usize {
        if matches!(self.kind, QueryKind::Address(_)) {
            self.slides = self.slides.saturating_add(step);
            debug!(slides = self.slides, "search window widened");
        }
        self.slides
    }

    /// One pass over the current query. `own_ids` are the caller's holdings
    /// and keep an id search from targeting them. Random searches are fed
    /// through [`SearchState::publish_sampled`] instead.
    pub fn resolve(
        &mut self,
        resolver: &Resolver<'_>,
        registry: &mut EnterpriseRegistry,
        own_ids: &Loadable<Vec<EnterpriseId>>,
    ) {
        match self.kind.clone() {
            QueryKind::Address(owner) => {
                let request = LoadRequest {
                    owner,
                    window: self.slides,
                    force_basic_for_all: false,
                };
                self.status = pagination::load(resolver, registry, &request, &mut self.results);
            }
            QueryKind::Id(id) => self.resolve_id(resolver, registry, own_ids, id),
            QueryKind::Empty | QueryKind::OwnAddress | QueryKind::Invalid | QueryKind::Random => {}
        }
        self.auto_select();
    }

    fn resolve_id(
        &mut self,
        resolver: &Resolver<'_>,
        registry: &mut EnterpriseRegistry,
        own_ids: &Loadable<Vec<EnterpriseId>>,
        id: EnterpriseId,
    ) {
        let minted = match resolver.is_minted(id) {
            Loadable::Ready(minted) => minted,
            Loadable::Loading => {
                self.status = Loadable::Loading;
                return;
            }
            Loadable::Failed(err) => {
                self.status = Loadable::Failed(err);
                return;
            }
        };
        let own = match own_ids {
            Loadable::Ready(ids) => ids.contains(&id),
            Loadable::Loading => {
                self.status = Loadable::Loading;
                return;
            }
            Loadable::Failed(err) => {
                self.status = Loadable::Failed(err.clone());
                return;
            }
        };
        if !minted || own {
            debug!(%id, minted, own, "id search yields nothing");
            self.results.clear();
            self.status = Loadable::Ready(0);
            return;
        }
        match registry.resolve(resolver, id, true) {
            Loadable::Ready(enterprise) if enterprise.has_detail() => {
                self.results.resize(1);
                self.results.set(0, enterprise);
                self.status = Loadable::Ready(1);
            }
            Loadable::Failed(err) => self.status = Loadable::Failed(err),
            _ => self.status = Loadable::Loading,
        }
    }

    /// Stores the sampler's outcome as the single random result.
    pub fn publish_sampled(&mut self, outcome: Loadable<Option<Arc<Enterprise>>>) {
        if self.kind != QueryKind::Random {
            return;
        }
        self.status = match outcome {
            Loadable::Loading => Loadable::Loading,
            Loadable::Failed(err) => Loadable::Failed(err),
            Loadable::Ready(None) => {
                self.results.clear();
                Loadable::Ready(0)
            }
            Loadable::Ready(Some(enterprise)) => {
                self.results.resize(1);
                self.results.set(0, enterprise);
                Loadable::Ready(1)
            }
        };
        self.auto_select();
    }

    fn auto_select(&mut self) {
        if self.selected.is_none()
            && let Some(first) = self.results.first_ready()
        {
            debug!(id = %first.id(), "auto-selecting first search result");
            self.selected = Some(first.id());
        }
    }

    /// Selects a result by id. Ids that are not in the results are rejected.
    pub fn select(&mut self, id: EnterpriseId) -> bool {
        if self.results.contains_id(id) {
            self.selected = Some(id);
            true
        } else {
            false
        }
    }

    pub fn selected(&self) -> Option<EnterpriseId> {
        self.selected
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn kind(&self) -> &QueryKind {
        &self.kind
    }

    pub fn is_random(&self) -> bool {
        self.kind == QueryKind::Random
    }

    /// Bumped on every query change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn slides(&self) -> usize {
        self.slides
    }

    pub fn status(&self) -> &Loadable<usize> {
        &self.status
    }

    pub fn results(&self) -> &IndexedSlots<Arc<Enterprise>> {
        &self.results
    }

    /// Results in view, `Loading` until each of them has resolved.
    pub fn visible(&self) -> Loadable<Vec<Arc<Enterprise>>> {
        let len = match &self.status {
            Loadable::Ready(len) => *len,
            Loadable::Loading => return Loadable::Loading,
            Loadable::Failed(err) => return Loadable::Failed(err.clone()),
        };
        let shown = match self.kind {
            QueryKind::Address(_) => len.min(self.slides),
            _ => len,
        };
        (0..shown)
            .map(|index| self.results.ready(index).cloned())
            .collect::<Option<Vec<_>>>()
            .map_or(Loadable::Loading, Loadable::Ready)
    }
}
