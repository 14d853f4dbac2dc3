use super::{
    ActionKind,
    Decision,
    Evaluation,
    Gate,
    INSUFFICIENT_WALLET_RP,
    Projection,
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
use std::sync::Arc;

pub const NEED_TWO: &str = "Need two Enterprises to merge";
pub const SELECT_PARTNER: &str = "Select an Enterprise to merge";
pub const SELF_MERGE: &str = "Cannot merge an Enterprise with itself";
pub const PARTNER_BURNED: &str = "Enterprise is burned";

/// Merges `partner` into `signer`; the partner is burned.
#[derive(Clone, Debug, Default)]
pub struct MergeInputs {
    pub busy: bool,
    pub owned_count: Loadable<u64>,
    pub signer: Loadable<Arc<Enterprise>>,
    pub partner: Option<Loadable<Arc<Enterprise>>>,
    pub wallet_rp: Loadable<Rp>,
    pub config: Loadable<GameConfig>,
    pub now: u64,
}

pub fn evaluate(inputs: &MergeInputs) -> Evaluation {
    Evaluation::new(decide(inputs), project(inputs))
}

fn decide(inputs: &MergeInputs) -> Decision {
    deny_if(inputs.busy, ActionKind::Merge.busy_reason())?;
    require_owned(&inputs.owned_count, 2, NEED_TWO)?;
    let signer = inputs.signer.as_ref().gate()?;
    let wallet_rp = *inputs.wallet_rp.as_ref().gate()?;
    let config = inputs.config.as_ref().gate()?;
    let partner = gate_selection(&inputs.partner)?.ok_or_else(|| disabled(SELECT_PARTNER))?;
    deny_if(partner.id() == signer.id(), SELF_MERGE)?;
    deny_if(partner.burned() == Some(true), PARTNER_BURNED)?;
    deny_if(wallet_rp < config.merge_cost, INSUFFICIENT_WALLET_RP)?;
    Ok(format!("Merge {} into {}", partner.name(), signer.name()))
}

fn project(inputs: &MergeInputs) -> Vec<Projection> {
    let mut projections = Vec::new();
    let Loadable::Ready(signer) = &inputs.signer else {
        return projections;
    };
    if let Some(Loadable::Ready(partner)) = &inputs.partner
        && partner.id() != signer.id()
    {
        projections.push(Projection::rp(
            "Your RP",
            signer.rp(),
            signer.rp().saturating_add(partner.rp()),
        ));
    }
    projections.push(Projection::increment("Mergers", signer.basic.stats.mergers));
    if let Loadable::Ready(config) = &inputs.config {
        if let Loadable::Ready(wallet_rp) = inputs.wallet_rp {
            projections.push(Projection::rp(
                "Wallet RP",
                wallet_rp,
                wallet_rp.saturating_sub(config.merge_cost),
            ));
        }
        let immune_until = inputs.now.saturating_add(config.merger_immunity);
        projections.push(Projection::timestamp(
            "Immune until",
            signer.basic.immune_until,
            immune_until.max(signer.basic.immune_until),
        ));
    }
    projections
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::actions::{
        Eligibility,
        ProjectedValue,
        fixtures::*,
    };

    fn ready_inputs() -> MergeInputs {
        MergeInputs {
            busy: false,
            owned_count: Loadable::Ready(2),
            signer: Loadable::Ready(enterprise(1, "Acme", 100)),
            partner: Some(Loadable::Ready(enterprise(2, "Beta", 40))),
            wallet_rp: Loadable::Ready(Rp::whole(50)),
            config: Loadable::Ready(GameConfig::default()),
            now: NOW,
        }
    }

    #[test]
    fn evaluate__enabled_merges_partner_into_signer() {
        // when
        let evaluation = evaluate(&ready_inputs());

        // then
        assert_eq!(
            evaluation.eligibility,
            Eligibility::Enabled("Merge Beta into Acme".to_string())
        );
        assert_eq!(evaluation.projections[0].after, ProjectedValue::Rp(Rp::whole(140)));
    }

    #[test]
    fn evaluate__single_holding_cannot_merge() {
        let inputs = MergeInputs {
            owned_count: Loadable::Ready(1),
            ..ready_inputs()
        };
        assert_eq!(evaluate(&inputs).eligibility, disabled(NEED_TWO));
    }

    #[test]
    fn evaluate__self_merge_is_rejected() {
        let inputs = MergeInputs {
            partner: Some(Loadable::Ready(enterprise(1, "Acme", 100))),
            ..ready_inputs()
        };
        assert_eq!(evaluate(&inputs).eligibility, disabled(SELF_MERGE));
    }

    #[test]
    fn evaluate__guards_in_order() {
        let no_partner = MergeInputs {
            partner: None,
            wallet_rp: Loadable::Ready(Rp::ZERO),
            ..ready_inputs()
        };
        assert_eq!(evaluate(&no_partner).eligibility, disabled(SELECT_PARTNER));

        let burned_partner = MergeInputs {
            partner: Some(Loadable::Ready(burned(2, "Beta"))),
            wallet_rp: Loadable::Ready(Rp::ZERO),
            ..ready_inputs()
        };
        assert_eq!(evaluate(&burned_partner).eligibility, disabled(PARTNER_BURNED));

        let poor = MergeInputs {
            wallet_rp: Loadable::Ready(Rp::whole(49)),
            ..ready_inputs()
        };
        assert_eq!(evaluate(&poor).eligibility, disabled(INSUFFICIENT_WALLET_RP));
    }
}
