//! Lazy, windowed loading of the enterprises held by one owner.

use crate::{
    enterprise::{
        Enterprise,
        EnterpriseRegistry,
        Resolver,
    },
    loadable::Loadable,
    types::{
        Address,
        EnterpriseId,
    },
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Slot<T> {
    Loading,
    Ready(T),
}

impl<T> Slot<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Slot::Ready(value) => Some(value),
            Slot::Loading => None,
        }
    }
}

/// Positional arena. Length changes only through [`resize`], [`truncate`] and
/// [`clear`]; new positions start as [`Slot::Loading`].
///
/// [`resize`]: IndexedSlots::resize
/// [`truncate`]: IndexedSlots::truncate
/// [`clear`]: IndexedSlots::clear
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IndexedSlots<T> {
    slots: Vec<Slot<T>>,
}

impl<T> Default for IndexedSlots<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> IndexedSlots<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Slot<T>> {
        self.slots.get(index)
    }

    pub fn ready(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Slot::ready)
    }

    pub fn resize(&mut self, len: usize) {
        if len <= self.slots.len() {
            self.slots.truncate(len);
        } else {
            self.slots.resize_with(len, || Slot::Loading);
        }
    }

    pub fn truncate(&mut self, len: usize) {
        self.slots.truncate(len);
    }

    /// Writes `value` at `index`. Returns `false` when the index is outside
    /// the current length.
    pub fn set(&mut self, index: usize, value: T) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = Slot::Ready(value);
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Slot::Loading;
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slot<T>> {
        self.slots.iter()
    }

    pub fn ready_items(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(Slot::ready)
    }

    pub fn first_ready(&self) -> Option<&T> {
        self.ready_items().next()
    }

    pub fn is_fully_loaded(&self) -> bool {
        self.slots.iter().all(|slot| matches!(slot, Slot::Ready(_)))
    }
}

impl IndexedSlots<Arc<Enterprise>> {
    pub fn ids(&self) -> impl Iterator<Item = EnterpriseId> + '_ {
        self.ready_items().map(|e| e.id())
    }

    pub fn contains_id(&self, id: EnterpriseId) -> bool {
        self.ids().any(|known| known == id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadRequest {
    pub owner: Address,
    /// Number of entities in view; only these get detail reads.
    pub window: usize,
    /// Resolve basic fields for the whole balance instead of the window.
    pub force_basic_for_all: bool,
}

/// Loads `request.owner`'s enterprises into `out`, index by index.
///
/// The list length is forced to the owner's balance on every call, so a
/// shrinking balance drops trailing entries. Returns the balance, or
/// `Loading` while the balance itself is unknown (in which case `out` is not
/// touched). A failed index or entity read fails the whole load once every
/// other index has been visited.
pub fn load(
    resolver: &Resolver<'_>,
    registry: &mut EnterpriseRegistry,
    request: &LoadRequest,
    out: &mut IndexedSlots<Arc<Enterprise>>,
) -> Loadable<usize> {
    let balance = match resolver.balance_of(&request.owner) {
        Loadable::Ready(balance) => balance,
        Loadable::Loading => return Loadable::Loading,
        Loadable::Failed(err) => return Loadable::Failed(err),
    };
    let len = usize::try_from(balance).unwrap_or(usize::MAX);
    out.resize(len);

    let effective = if request.force_basic_for_all {
        len
    } else {
        len.min(request.window)
    };
    let mut failure = None;
    for index in 0..effective {
        let id = match resolver.token_of_owner_by_index(&request.owner, index as u64) {
            Loadable::Ready(id) => id,
            Loadable::Loading => continue,
            Loadable::Failed(err) => {
                failure.get_or_insert(err);
                continue;
            }
        };
        if out.ready(index).is_some_and(|current| current.id() != id) {
            debug!(index, %id, "slot now holds a different enterprise");
            out.reset(index);
        }
        match registry.resolve(resolver, id, index < request.window) {
            Loadable::Ready(enterprise) => {
                out.set(index, enterprise);
            }
            Loadable::Loading => {}
            Loadable::Failed(err) => {
                failure.get_or_insert(err);
            }
        }
    }
    match failure {
        Some(err) => Loadable::Failed(err),
        None => Loadable::Ready(len),
    }
}

/// The enterprises of a single owner. Retargeting to another owner drops the
/// previous owner's entries before anything new is loaded.
#[derive(Debug, Default)]
pub struct OwnerList {
    owner: Option<Address>,
    slots: IndexedSlots<Arc<Enterprise>>,
    status: Loadable<usize>,
}

impl OwnerList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(&self) -> Option<Address> {
        self.owner
    }

    /// Returns `true` when the owner changed and the list was reset.
    pub fn retarget(&mut self, owner: Option<Address>) -> bool {
        if self.owner == owner {
            return false;
        }
        self.owner = owner;
        self.slots.clear();
        self.status = Loadable::Loading;
        true
    }

    pub fn refresh(
        &mut self,
        resolver: &Resolver<'_>,
        registry: &mut EnterpriseRegistry,
        window: usize,
        force_basic_for_all: bool,
    ) -> &Loadable<usize> {
        if let Some(owner) = self.owner {
            let request = LoadRequest {
                owner,
                window,
                force_basic_for_all,
            };
            self.status = load(resolver, registry, &request, &mut self.slots);
        }
        &self.status
    }

    pub fn slots(&self) -> &IndexedSlots<Arc<Enterprise>> {
        &self.slots
    }

    /// Balance of the owner as last loaded.
    pub fn status(&self) -> &Loadable<usize> {
        &self.status
    }

    /// Ids of every enterprise in the list, `Loading` until all are known.
    pub fn all_ids(&self) -> Loadable<Vec<EnterpriseId>> {
        match &self.status {
            Loadable::Ready(_) if self.slots.is_fully_loaded() => {
                Loadable::Ready(self.slots.ids().collect())
            }
            Loadable::Failed(err) => Loadable::Failed(err.clone()),
            _ => Loadable::Loading,
        }
    }

    pub fn clear(&mut self) {
        self.owner = None;
        self.slots.clear();
        self.status = Loadable::Loading;
    }
}
