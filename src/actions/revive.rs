use super::{
    ActionKind,
    Decision,
    Evaluation,
    Gate,
    INSUFFICIENT_WALLET_RP,
    NO_WALLET,
    Projection,
    deny_if,
    disabled,
    gate_selection,
};
use crate::{
    enterprise::Enterprise,
    gateway::GameConfig,
    loadable::Loadable,
    types::Rp,
};
use std::sync::Arc;

pub const SELECT_TARGET: &str = "Select an Enterprise to revive";
pub const NOT_BURNED: &str = "Enterprise is not burned";

#[derive(Clone, Debug, Default)]
pub struct ReviveInputs {
    pub busy: bool,
    pub connected: bool,
    pub target: Option<Loadable<Arc<Enterprise>>>,
    pub wallet_rp: Loadable<Rp>,
    pub config: Loadable<GameConfig>,
    pub now: u64,
}

pub fn evaluate(inputs: &ReviveInputs) -> Evaluation {
    Evaluation::new(decide(inputs), project(inputs))
}

fn decide(inputs: &ReviveInputs) -> Decision {
    deny_if(inputs.busy, ActionKind::Revive.busy_reason())?;
    deny_if(!inputs.connected, NO_WALLET)?;
    let wallet_rp = *inputs.wallet_rp.as_ref().gate()?;
    let config = inputs.config.as_ref().gate()?;
    let target = gate_selection(&inputs.target)?.ok_or_else(|| disabled(SELECT_TARGET))?;
    deny_if(target.burned() != Some(true), NOT_BURNED)?;
    deny_if(wallet_rp < config.revive_cost, INSUFFICIENT_WALLET_RP)?;
    Ok(format!(
        "Revive {} for {} RP",
        target.name(),
        config.revive_cost.to_exact_string()
    ))
}

fn project(inputs: &ReviveInputs) -> Vec<Projection> {
    let mut projections = Vec::new();
    let (Some(Loadable::Ready(target)), Loadable::Ready(config)) = (&inputs.target, &inputs.config)
    else {
        return projections;
    };
    projections.push(Projection::increment("Revives", target.basic.stats.revives));
    projections.push(Projection::timestamp(
        "Immune until",
        target.basic.immune_until,
        inputs.now.saturating_add(config.revival_immunity),
    ));
    if let Loadable::Ready(wallet_rp) = inputs.wallet_rp {
        projections.push(Projection::rp(
            "Wallet RP",
            wallet_rp,
            wallet_rp.saturating_sub(config.revive_cost),
        ));
    }
    projections
}
