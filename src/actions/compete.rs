use super::{
    ActionKind,
    Decision,
    Evaluation,
    Gate,
    INSUFFICIENT_RP,
    NO_OWNED,
    OPPONENT_BURNED,
    OPPONENT_IMMUNE,
    Projection,
    SELECT_OPPONENT,
    deny_if,
    disabled,
    gate_selection,
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

pub const ENTER_AMOUNT: &str = "Enter compete amount";

#[derive(Clone, Debug, Default)]
pub struct CompeteInputs {
    pub busy: bool,
    pub owned_count: Loadable<u64>,
    pub signer: Loadable<Arc<Enterprise>>,
    /// `None` when nothing is selected.
    pub opponent: Option<Loadable<Arc<Enterprise>>>,
    pub config: Loadable<GameConfig>,
    pub amount: String,
}

pub fn evaluate(inputs: &CompeteInputs) -> Evaluation {
    Evaluation::new(decide(inputs), project(inputs))
}

fn decide(inputs: &CompeteInputs) -> Decision {
    deny_if(inputs.busy, ActionKind::Compete.busy_reason())?;
    require_owned(&inputs.owned_count, 1, NO_OWNED)?;
    let signer = inputs.signer.as_ref().gate()?;
    inputs.config.as_ref().gate()?;
    let opponent = gate_selection(&inputs.opponent)?.ok_or_else(|| disabled(SELECT_OPPONENT))?;
    deny_if(opponent.burned() == Some(true), OPPONENT_BURNED)?;
    deny_if(opponent.immune() == Some(true), OPPONENT_IMMUNE)?;
    let amount = parse_amount(&inputs.amount, ENTER_AMOUNT)?;
    deny_if(amount > signer.rp(), INSUFFICIENT_RP)?;
    Ok(format!(
        "Attack {} with {} RP",
        opponent.name(),
        amount.to_exact_string()
    ))
}

fn project(inputs: &CompeteInputs) -> Vec<Projection> {
    let mut projections = Vec::new();
    let Some(amount) = Rp::parse_amount(&inputs.amount) else {
        return projections;
    };
    if let Loadable::Ready(signer) = &inputs.signer {
        projections.push(Projection::rp(
            "Your RP",
            signer.rp(),
            signer.rp().saturating_sub(amount),
        ));
        projections.push(Projection::increment("Competes", signer.basic.stats.competes));
    }
    if let (Some(Loadable::Ready(opponent)), Loadable::Ready(config)) =
        (&inputs.opponent, &inputs.config)
    {
        let damage = amount.percent(config.compete_damage_pct);
        projections.push(Projection::rp(
            "Opponent RP",
            opponent.rp(),
            opponent.rp().saturating_sub(damage),
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
        UNAVAILABLE,
        fixtures::*,
    };

    fn ready_inputs() -> CompeteInputs {
        CompeteInputs {
            busy: false,
            owned_count: Loadable::Ready(1),
            signer: Loadable::Ready(enterprise(1, "Acme", 100)),
            opponent: Some(Loadable::Ready(enterprise(2, "Rival", 80))),
            config: Loadable::Ready(GameConfig::default()),
            amount: "50".to_string(),
        }
    }

    #[test]
    fn evaluate__amount_above_signer_rp_is_insufficient() {
        // given
        let inputs = CompeteInputs {
            amount: "150".to_string(),
            ..ready_inputs()
        };

        // when
        let evaluation = evaluate(&inputs);

        // then
        assert_eq!(evaluation.eligibility, disabled(INSUFFICIENT_RP));
    }

    #[test]
    fn evaluate__earlier_guard_wins_when_several_trip() {
        // given
        let inputs = CompeteInputs {
            opponent: None,
            amount: String::new(),
            ..ready_inputs()
        };

        // when
        let evaluation = evaluate(&inputs);

        // then
        assert_eq!(evaluation.eligibility, disabled(SELECT_OPPONENT));
    }

    #[test]
    fn evaluate__busy_is_checked_before_anything_else() {
        let inputs = CompeteInputs {
            busy: true,
            owned_count: Loadable::Ready(0),
            ..CompeteInputs::default()
        };
        assert_eq!(evaluate(&inputs).eligibility, disabled("Attack in progress"));
    }

    #[test]
    fn evaluate__no_owned_enterprise_precedes_loading() {
        let inputs = CompeteInputs {
            owned_count: Loadable::Ready(0),
            signer: Loadable::Loading,
            ..ready_inputs()
        };
        assert_eq!(evaluate(&inputs).eligibility, disabled(NO_OWNED));
    }

    #[test]
    fn evaluate__pending_reads_report_loading() {
        let inputs = CompeteInputs {
            opponent: Some(Loadable::Loading),
            ..ready_inputs()
        };
        assert_eq!(evaluate(&inputs).eligibility, Eligibility::Loading);
    }

    #[test]
    fn evaluate__failed_config_read_is_unavailable() {
        let inputs = CompeteInputs {
            config: Loadable::Failed("rpc down".into()),
            ..ready_inputs()
        };
        assert_eq!(evaluate(&inputs).eligibility, disabled(UNAVAILABLE));
    }

    #[test]
    fn evaluate__burned_and_immune_opponents_are_rejected() {
        let burned_opponent = CompeteInputs {
            opponent: Some(Loadable::Ready(burned(2, "Ghost"))),
            ..ready_inputs()
        };
        assert_eq!(evaluate(&burned_opponent).eligibility, disabled(OPPONENT_BURNED));

        let immune_opponent = CompeteInputs {
            opponent: Some(Loadable::Ready(enterprise_with(2, "Rival", 80, owner(), true))),
            ..ready_inputs()
        };
        assert_eq!(evaluate(&immune_opponent).eligibility, disabled(OPPONENT_IMMUNE));
    }

    #[test]
    fn evaluate__amount_guards_in_order() {
        let empty = CompeteInputs {
            amount: "  ".to_string(),
            ..ready_inputs()
        };
        assert_eq!(evaluate(&empty).eligibility, disabled(ENTER_AMOUNT));

        let malformed = CompeteInputs {
            amount: "ten".to_string(),
            ..ready_inputs()
        };
        assert_eq!(evaluate(&malformed).eligibility, disabled("Invalid amount"));
    }

    #[test]
    fn evaluate__enabled_label_and_projections() {
        // when
        let evaluation = evaluate(&ready_inputs());

        // then
        assert_eq!(
            evaluation.eligibility,
            Eligibility::Enabled("Attack Rival with 50 RP".to_string())
        );
        let opponent = evaluation
            .projections
            .iter()
            .find(|p| p.label == "Opponent RP")
            .unwrap();
        assert_eq!(opponent.after, ProjectedValue::Rp(Rp::whole(55)));
    }

    #[test]
    fn evaluate__label_keeps_sub_cent_amounts() {
        for (amount, expected) in [
            ("0.004", "Attack Rival with 0.004 RP"),
            ("1.999", "Attack Rival with 1.999 RP"),
        ] {
            let inputs = CompeteInputs {
                amount: amount.to_string(),
                ..ready_inputs()
            };
            assert_eq!(
                evaluate(&inputs).eligibility,
                Eligibility::Enabled(expected.to_string())
            );
        }
    }

    #[test]
    fn evaluate__is_idempotent() {
        let inputs = ready_inputs();
        assert_eq!(evaluate(&inputs), evaluate(&inputs));
    }
}
