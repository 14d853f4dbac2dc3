//! Random opponent sampling over the minted id space.

use crate::{
    enterprise::{
        Enterprise,
        EnterpriseRegistry,
        Resolver,
    },
    gateway::MintStats,
    loadable::Loadable,
    types::{
        Address,
        EnterpriseId,
    },
};
use rand::{
    Rng,
    SeedableRng,
    rngs::StdRng,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{
    debug,
    info,
};

pub const NO_OPPONENTS_NOTICE: &str = "no opponents available";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SamplerState {
    #[default]
    Idle,
    Requested,
    Drawing {
        candidate: EnterpriseId,
        attempts: u32,
    },
    Chosen {
        id: EnterpriseId,
    },
    Exhausted,
}

/// Maps a uniform draw from `[0, auction_count + free_count)` onto a token id.
/// Auctioned ids occupy `[0, auction_count)`; free mints start right after
/// the auction range reserved by `max_auctioned`.
pub fn map_draw(draw: u64, stats: &MintStats) -> EnterpriseId {
    if draw >= stats.auction_count {
        let gap = stats.max_auctioned.saturating_sub(stats.auction_count);
        EnterpriseId(draw.saturating_add(gap))
    } else {
        EnterpriseId(draw)
    }
}

pub struct OpponentSampler {
    state: SamplerState,
    rng: StdRng,
    exhausted_reported: bool,
}

impl OpponentSampler {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            state: SamplerState::Idle,
            rng,
            exhausted_reported: false,
        }
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    pub fn request(&mut self) {
        self.state = SamplerState::Requested;
        self.exhausted_reported = false;
    }

    pub fn reset(&mut self) {
        self.state = SamplerState::Idle;
        self.exhausted_reported = false;
    }

    /// Id the sampler is currently looking at, if any.
    pub fn candidate(&self) -> Option<EnterpriseId> {
        match self.state {
            SamplerState::Drawing { candidate, .. } => Some(candidate),
            SamplerState::Chosen { id } => Some(id),
            _ => None,
        }
    }

    /// Returns `true` once per exhaustion so the caller notifies only once.
    pub fn take_exhausted_notice(&mut self) -> bool {
        if self.state == SamplerState::Exhausted && !self.exhausted_reported {
            self.exhausted_reported = true;
            return true;
        }
        false
    }

    fn draw(&mut self, stats: &MintStats, attempts: u32) -> Option<EnterpriseId> {
        let total = stats.auction_count.saturating_add(stats.free_count);
        if total == 0 {
            info!("no minted enterprises to sample from");
            self.state = SamplerState::Exhausted;
            return None;
        }
        let candidate = map_draw(self.rng.random_range(0..total), stats);
        debug!(%candidate, attempts, "drew opponent candidate");
        self.state = SamplerState::Drawing {
            candidate,
            attempts,
        };
        Some(candidate)
    }

    /// Advances the sampler by one recompute pass. A rejected candidate
    /// (burned, owned by `own`, or unreadable) is replaced by a fresh draw,
    /// at most one per pass. `Ready(None)` means there is nothing to sample.
    pub fn step(
        &mut self,
        resolver: &Resolver<'_>,
        registry: &mut EnterpriseRegistry,
        own: Option<Address>,
    ) -> Loadable<Option<Arc<Enterprise>>> {
        let (candidate, attempts) = match self.state {
            SamplerState::Idle => return Loadable::Loading,
            SamplerState::Exhausted => return Loadable::Ready(None),
            SamplerState::Chosen { id } => {
                return registry.resolve(resolver, id, true).map(Some);
            }
            SamplerState::Requested => {
                let stats = match resolver.mint_stats() {
                    Loadable::Ready(stats) => stats,
                    Loadable::Loading => return Loadable::Loading,
                    Loadable::Failed(err) => return Loadable::Failed(err),
                };
                match self.draw(&stats, 1) {
                    Some(candidate) => (candidate, 1),
                    None => return Loadable::Ready(None),
                }
            }
            SamplerState::Drawing {
                candidate,
                attempts,
            } => (candidate, attempts),
        };

        match registry.resolve(resolver, candidate, true) {
            Loadable::Loading => return Loadable::Loading,
            Loadable::Failed(err) => debug!(%candidate, %err, "candidate unreadable"),
            Loadable::Ready(enterprise) => {
                let Some(detail) = &enterprise.detail else {
                    return Loadable::Loading;
                };
                let acceptable = !detail.burned && Some(detail.owner) != own;
                if acceptable {
                    info!(id = %candidate, attempts, "random opponent chosen");
                    self.state = SamplerState::Chosen { id: candidate };
                    return Loadable::Ready(Some(enterprise));
                }
            }
        }

        debug!(%candidate, "candidate rejected, redrawing");
        let stats = match resolver.mint_stats() {
            Loadable::Ready(stats) => stats,
            Loadable::Loading => return Loadable::Loading,
            Loadable::Failed(err) => return Loadable::Failed(err),
        };
        match self.draw(&stats, attempts.saturating_add(1)) {
            Some(_) => Loadable::Loading,
            None => Loadable::Ready(None),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn map_draw__skips_unminted_auction_range() {
        let stats = MintStats {
            auction_count: 3,
            free_count: 4,
            max_auctioned: 10,
        };
        assert_eq!(map_draw(0, &stats), EnterpriseId(0));
        assert_eq!(map_draw(2, &stats), EnterpriseId(2));
        assert_eq!(map_draw(3, &stats), EnterpriseId(10));
        assert_eq!(map_draw(6, &stats), EnterpriseId(13));
    }

    #[test]
    fn map_draw__full_auction_has_no_gap() {
        let stats = MintStats {
            auction_count: 5,
            free_count: 2,
            max_auctioned: 5,
        };
        assert_eq!(map_draw(5, &stats), EnterpriseId(5));
    }

    #[test]
    fn take_exhausted_notice__fires_once_per_request() {
        let mut sampler = OpponentSampler::new(Some(1));
        sampler.request();
        sampler.draw(&MintStats::default(), 1);

        assert!(sampler.take_exhausted_notice());
        assert!(!sampler.take_exhausted_notice());

        sampler.request();
        sampler.draw(&MintStats::default(), 1);
        assert!(sampler.take_exhausted_notice());
    }
}
