use super::{
    ActionKind,
    Decision,
    Eligibility,
    Evaluation,
    Gate,
    INSUFFICIENT_WALLET_RP,
    NO_OWNED,
    Projection,
    deny_if,
    disabled,
    require_owned,
};
use crate::{
    enterprise::Enterprise,
    gateway::GameConfig,
    loadable::Loadable,
    types::Rp,
};
use std::sync::Arc;

pub const SELECT_ART: &str = "Select new art";
pub const ART_UNCHANGED: &str = "Art is unchanged";

#[derive(Clone, Debug, Default)]
pub struct RebrandInputs {
    pub busy: bool,
    pub owned_count: Loadable<u64>,
    /// Needs detail fields for the current art.
    pub signer: Loadable<Arc<Enterprise>>,
    pub wallet_rp: Loadable<Rp>,
    pub config: Loadable<GameConfig>,
    pub art: Option<u32>,
}

pub fn evaluate(inputs: &RebrandInputs) -> Evaluation {
    Evaluation::new(decide(inputs), project(inputs))
}

fn decide(inputs: &RebrandInputs) -> Decision {
    deny_if(inputs.busy, ActionKind::Rebrand.busy_reason())?;
    require_owned(&inputs.owned_count, 1, NO_OWNED)?;
    let signer = inputs.signer.as_ref().gate()?;
    let current_art = signer
        .detail
        .as_ref()
        .map(|detail| detail.art.id)
        .ok_or(Eligibility::Loading)?;
    let wallet_rp = *inputs.wallet_rp.as_ref().gate()?;
    let config = inputs.config.as_ref().gate()?;
    let art = inputs.art.ok_or_else(|| disabled(SELECT_ART))?;
    deny_if(art == current_art, ART_UNCHANGED)?;
    deny_if(wallet_rp < config.rebrand_cost, INSUFFICIENT_WALLET_RP)?;
    Ok(format!("Rebrand {}", signer.name()))
}

fn project(inputs: &RebrandInputs) -> Vec<Projection> {
    let mut projections = Vec::new();
    if let Loadable::Ready(signer) = &inputs.signer {
        projections.push(Projection::increment("Rebrands", signer.basic.stats.rebrands));
    }
    if let (Loadable::Ready(wallet_rp), Loadable::Ready(config)) =
        (&inputs.wallet_rp, &inputs.config)
    {
        projections.push(Projection::rp(
            "Wallet RP",
            *wallet_rp,
            wallet_rp.saturating_sub(config.rebrand_cost),
        ));
    }
    projections
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::actions::fixtures::*;

    fn ready_inputs() -> RebrandInputs {
        RebrandInputs {
            busy: false,
            owned_count: Loadable::Ready(1),
            signer: Loadable::Ready(enterprise(1, "Acme", 10)),
            wallet_rp: Loadable::Ready(Rp::whole(10)),
            config: Loadable::Ready(GameConfig::default()),
            art: Some(4),
        }
    }

    #[test]
    fn evaluate__enabled_label() {
        assert_eq!(
            evaluate(&ready_inputs()).eligibility,
            Eligibility::Enabled("Rebrand Acme".to_string())
        );
    }

    #[test]
    fn evaluate__signer_without_detail_is_loading() {
        let inputs = RebrandInputs {
            signer: Loadable::Ready(basic_only(1, "Acme", 10)),
            ..ready_inputs()
        };
        assert_eq!(evaluate(&inputs).eligibility, Eligibility::Loading);
    }

    #[test]
    fn evaluate__art_guards_in_order() {
        let none = RebrandInputs {
            art: None,
            ..ready_inputs()
        };
        assert_eq!(evaluate(&none).eligibility, disabled(SELECT_ART));

        // fixture art id is 1
        let same = RebrandInputs {
            art: Some(1),
            ..ready_inputs()
        };
        assert_eq!(evaluate(&same).eligibility, disabled(ART_UNCHANGED));

        let poor = RebrandInputs {
            wallet_rp: Loadable::Ready(Rp::ZERO),
            ..ready_inputs()
        };
        assert_eq!(evaluate(&poor).eligibility, disabled(INSUFFICIENT_WALLET_RP));
    }

    #[test]
    fn evaluate__projects_wallet_after_cost() {
        let evaluation = evaluate(&ready_inputs());

        let wallet = evaluation
            .projections
            .iter()
            .find(|p| p.label == "Wallet RP")
            .unwrap();
        assert_eq!(wallet.before, crate::actions::ProjectedValue::Rp(Rp::whole(10)));
        assert_eq!(wallet.after, crate::actions::ProjectedValue::Rp(Rp::ZERO));
        assert!(evaluation.projections.iter().any(|p| p.label == "Rebrands"));
    }
}
