use super::{
    ActionKind,
    Decision,
    Evaluation,
    Gate,
    INSUFFICIENT_RP,
    INSUFFICIENT_WALLET_RP,
    NO_OWNED,
    OPPONENT_BURNED,
    OPPONENT_IMMUNE,
    Projection,
    SELECT_OPPONENT,
    deny_if,
    disabled,
    gate_selection,
    require_owned,
};
use crate::{
    enterprise::Enterprise,
    gateway::GameConfig,
    loadable::Loadable,
    types::Rp,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::sync::Arc;

pub const OPPONENT_MOAT: &str = "Opponent has a moat";
pub const CHOOSE_KEEP: &str = "Choose which Enterprise to keep";

/// Which of the two enterprises survives the acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepChoice {
    Acquirer,
    Target,
}

#[derive(Clone, Debug, Default)]
pub struct AcquireInputs {
    pub busy: bool,
    pub owned_count: Loadable<u64>,
    pub signer: Loadable<Arc<Enterprise>>,
    pub opponent: Option<Loadable<Arc<Enterprise>>>,
    pub wallet_rp: Loadable<Rp>,
    pub config: Loadable<GameConfig>,
    pub keep: Option<KeepChoice>,
    pub now: u64,
}

/// RP the acquirer's enterprise pays on top of the wallet cost, when the
/// game charges one.
pub fn damage_cost(config: &GameConfig, target: &Enterprise) -> Option<Rp> {
    config.acquire_damage_pct.map(|pct| target.rp().percent(pct))
}

pub fn evaluate(inputs: &AcquireInputs) -> Evaluation {
    Evaluation::new(decide(inputs), project(inputs))
}

fn decide(inputs: &AcquireInputs) -> Decision {
    deny_if(inputs.busy, ActionKind::Acquire.busy_reason())?;
    require_owned(&inputs.owned_count, 1, NO_OWNED)?;
    let signer = inputs.signer.as_ref().gate()?;
    let wallet_rp = *inputs.wallet_rp.as_ref().gate()?;
    let config = inputs.config.as_ref().gate()?;
    let opponent = gate_selection(&inputs.opponent)?.ok_or_else(|| disabled(SELECT_OPPONENT))?;
    deny_if(opponent.burned() == Some(true), OPPONENT_BURNED)?;
    deny_if(opponent.has_moat(), OPPONENT_MOAT)?;
    deny_if(opponent.immune() == Some(true), OPPONENT_IMMUNE)?;
    deny_if(wallet_rp < config.acquire_cost, INSUFFICIENT_WALLET_RP)?;
    if let Some(cost) = damage_cost(config, opponent) {
        deny_if(signer.rp() < cost, INSUFFICIENT_RP)?;
    }
    let kept = match inputs.keep.ok_or_else(|| disabled(CHOOSE_KEEP))? {
        KeepChoice::Acquirer => signer.name(),
        KeepChoice::Target => opponent.name(),
    };
    Ok(format!("Acquire {} and keep {}", opponent.name(), kept))
}

fn project(inputs: &AcquireInputs) -> Vec<Projection> {
    let mut projections = Vec::new();
    let Loadable::Ready(config) = &inputs.config else {
        return projections;
    };
    if let Loadable::Ready(wallet_rp) = inputs.wallet_rp {
        projections.push(Projection::rp(
            "Wallet RP",
            wallet_rp,
            wallet_rp.saturating_sub(config.acquire_cost),
        ));
    }
    if let Loadable::Ready(signer) = &inputs.signer {
        if let Some(Loadable::Ready(opponent)) = &inputs.opponent
            && let Some(cost) = damage_cost(config, opponent)
        {
            projections.push(Projection::rp(
                "Your RP",
                signer.rp(),
                signer.rp().saturating_sub(cost),
            ));
        }
        projections.push(Projection::increment(
            "Acquisitions",
            signer.basic.stats.acquisitions,
        ));
        let immune_until = inputs.now.saturating_add(config.acquisition_immunity);
        projections.push(Projection::timestamp(
            "Immune until",
            signer.basic.immune_until,
            immune_until.max(signer.basic.immune_until),
        ));
    }
    projections
}
