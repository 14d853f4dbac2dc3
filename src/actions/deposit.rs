use super::{
    ActionKind,
    Decision,
    Evaluation,
    Gate,
    INSUFFICIENT_WALLET_RP,
    NO_OWNED,
    Projection,
    deny_if,
    parse_amount,
    require_owned,
};
use crate::{
    enterprise::Enterprise,
    gateway::GameConfig,
    loadable::Loadable,
    types::Rp,
};
use std::sync::Arc;

pub const ENTER_AMOUNT: &str = "Enter deposit amount";

/// Moves RP from the wallet into the signer's enterprise.
#[derive(Clone, Debug, Default)]
pub struct DepositInputs {
    pub busy: bool,
    pub owned_count: Loadable<u64>,
    pub signer: Loadable<Arc<Enterprise>>,
    pub wallet_rp: Loadable<Rp>,
    pub config: Loadable<GameConfig>,
    pub amount: String,
}

pub fn evaluate(inputs: &DepositInputs) -> Evaluation {
    Evaluation::new(decide(inputs), project(inputs))
}

fn decide(inputs: &DepositInputs) -> Decision {
    deny_if(inputs.busy, ActionKind::Deposit.busy_reason())?;
    require_owned(&inputs.owned_count, 1, NO_OWNED)?;
    let signer = inputs.signer.as_ref().gate()?;
    let wallet_rp = *inputs.wallet_rp.as_ref().gate()?;
    inputs.config.as_ref().gate()?;
    let amount = parse_amount(&inputs.amount, ENTER_AMOUNT)?;
    deny_if(amount > wallet_rp, INSUFFICIENT_WALLET_RP)?;
    Ok(format!(
        "Deposit {} RP into {}",
        amount.to_exact_string(),
        signer.name()
    ))
}

fn project(inputs: &DepositInputs) -> Vec<Projection> {
    let mut projections = Vec::new();
    let Some(amount) = Rp::parse_amount(&inputs.amount) else {
        return projections;
    };
    if let Loadable::Ready(wallet_rp) = inputs.wallet_rp {
        projections.push(Projection::rp(
            "Wallet RP",
            wallet_rp,
            wallet_rp.saturating_sub(amount),
        ));
    }
    if let Loadable::Ready(signer) = &inputs.signer {
        let after = signer.rp().saturating_add(amount);
        projections.push(Projection::rp("Enterprise RP", signer.rp(), after));
        if let Loadable::Ready(config) = &inputs.config {
            projections.push(Projection::flag(
                "Above moat threshold",
                signer.rp() >= config.moat_threshold,
                after >= config.moat_threshold,
            ));
        }
    }
    projections
}
