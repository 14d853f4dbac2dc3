use super::{
    ActionKind,
    Decision,
    Evaluation,
    Gate,
    INSUFFICIENT_RP,
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

pub const ENTER_AMOUNT: &str = "Enter withdraw amount";

#[derive(Clone, Debug, Default)]
pub struct WithdrawInputs {
    pub busy: bool,
    pub owned_count: Loadable<u64>,
    pub signer: Loadable<Arc<Enterprise>>,
    pub wallet_rp: Loadable<Rp>,
    pub config: Loadable<GameConfig>,
    pub amount: String,
}

/// Splits a withdrawal into what reaches the wallet and what is burned.
pub fn split(amount: Rp, config: &GameConfig) -> (Rp, Rp) {
    let burned = amount.percent(config.withdraw_burn_pct);
    (amount.saturating_sub(burned), burned)
}

pub fn evaluate(inputs: &WithdrawInputs) -> Evaluation {
    Evaluation::new(decide(inputs), project(inputs))
}

fn decide(inputs: &WithdrawInputs) -> Decision {
    deny_if(inputs.busy, ActionKind::Withdraw.busy_reason())?;
    require_owned(&inputs.owned_count, 1, NO_OWNED)?;
    let signer = inputs.signer.as_ref().gate()?;
    inputs.wallet_rp.as_ref().gate()?;
    let config = inputs.config.as_ref().gate()?;
    let amount = parse_amount(&inputs.amount, ENTER_AMOUNT)?;
    deny_if(amount > signer.rp(), INSUFFICIENT_RP)?;
    let (received, burned) = split(amount, config);
    Ok(format!(
        "Withdraw {} RP ({} RP burned)",
        received.to_exact_string(),
        burned.to_exact_string()
    ))
}

fn project(inputs: &WithdrawInputs) -> Vec<Projection> {
    let mut projections = Vec::new();
    let (Some(amount), Loadable::Ready(config)) =
        (Rp::parse_amount(&inputs.amount), &inputs.config)
    else {
        return projections;
    };
    let (received, _) = split(amount, config);
    if let Loadable::Ready(signer) = &inputs.signer {
        let after = signer.rp().saturating_sub(amount);
        projections.push(Projection::rp("Enterprise RP", signer.rp(), after));
        projections.push(Projection::flag(
            "Has moat",
            signer.has_moat(),
            signer.has_moat() && after >= config.moat_threshold,
        ));
    }
    if let Loadable::Ready(wallet_rp) = inputs.wallet_rp {
        projections.push(Projection::rp(
            "Wallet RP",
            wallet_rp,
            wallet_rp.saturating_add(received),
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
        disabled,
        fixtures::*,
    };

    fn ready_inputs() -> WithdrawInputs {
        WithdrawInputs {
            busy: false,
            owned_count: Loadable::Ready(1),
            signer: Loadable::Ready(enterprise(1, "Acme", 1_200)),
            wallet_rp: Loadable::Ready(Rp::whole(10)),
            config: Loadable::Ready(GameConfig::default()),
            amount: "300".to_string(),
        }
    }

    #[test]
    fn evaluate__label_shows_received_and_burned() {
        assert_eq!(
            evaluate(&ready_inputs()).eligibility,
            Eligibility::Enabled("Withdraw 270 RP (30 RP burned)".to_string())
        );
    }

    #[test]
    fn evaluate__label_keeps_fractional_split() {
        let inputs = WithdrawInputs {
            amount: "0.005".to_string(),
            ..ready_inputs()
        };
        assert_eq!(
            evaluate(&inputs).eligibility,
            Eligibility::Enabled("Withdraw 0.0045 RP (0.0005 RP burned)".to_string())
        );
    }

    #[test]
    fn evaluate__more_than_enterprise_rp_is_insufficient() {
        let inputs = WithdrawInputs {
            amount: "1200.5".to_string(),
            ..ready_inputs()
        };
        assert_eq!(evaluate(&inputs).eligibility, disabled(INSUFFICIENT_RP));
    }

    #[test]
    fn evaluate__empty_amount() {
        let inputs = WithdrawInputs {
            amount: String::new(),
            ..ready_inputs()
        };
        assert_eq!(evaluate(&inputs).eligibility, disabled(ENTER_AMOUNT));
    }

    #[test]
    fn project__dropping_below_threshold_loses_moat() {
        // when
        let evaluation = evaluate(&ready_inputs());

        // then
        let moat = evaluation
            .projections
            .iter()
            .find(|p| p.label == "Has moat")
            .unwrap();
        assert_eq!(moat.before, ProjectedValue::Flag(true));
        assert_eq!(moat.after, ProjectedValue::Flag(false));
        let wallet = evaluation
            .projections
            .iter()
            .find(|p| p.label == "Wallet RP")
            .unwrap();
        assert_eq!(wallet.after, ProjectedValue::Rp(Rp::whole(280)));
    }
}
