use super::{
    ActionKind,
    Decision,
    Evaluation,
    Gate,
    INSUFFICIENT_WALLET_RP,
    NO_OWNED,
    Projection,
    deny_if,
    require_owned,
};
use crate::{
    enterprise::Enterprise,
    gateway::GameConfig,
    loadable::Loadable,
    types::Rp,
};
use std::sync::Arc;

pub const ENTER_NAME: &str = "Enter a new name";
pub const NAME_TOO_LONG: &str = "Name is too long";
pub const NAME_UNCHANGED: &str = "Name is unchanged";

#[derive(Clone, Debug, Default)]
pub struct RenameInputs {
    pub busy: bool,
    pub owned_count: Loadable<u64>,
    pub signer: Loadable<Arc<Enterprise>>,
    pub wallet_rp: Loadable<Rp>,
    pub config: Loadable<GameConfig>,
    pub name: String,
}

pub fn evaluate(inputs: &RenameInputs) -> Evaluation {
    Evaluation::new(decide(inputs), project(inputs))
}

fn decide(inputs: &RenameInputs) -> Decision {
    deny_if(inputs.busy, ActionKind::Rename.busy_reason())?;
    require_owned(&inputs.owned_count, 1, NO_OWNED)?;
    let signer = inputs.signer.as_ref().gate()?;
    let wallet_rp = *inputs.wallet_rp.as_ref().gate()?;
    let config = inputs.config.as_ref().gate()?;
    let name = inputs.name.trim();
    deny_if(name.is_empty(), ENTER_NAME)?;
    deny_if(name.chars().count() > config.max_name_length, NAME_TOO_LONG)?;
    deny_if(name == signer.name(), NAME_UNCHANGED)?;
    deny_if(wallet_rp < config.rename_cost, INSUFFICIENT_WALLET_RP)?;
    Ok(format!("Rename {} to {}", signer.name(), name))
}

fn project(inputs: &RenameInputs) -> Vec<Projection> {
    let mut projections = Vec::new();
    if let Loadable::Ready(signer) = &inputs.signer {
        projections.push(Projection::increment("Renames", signer.basic.stats.renames));
    }
    if let (Loadable::Ready(wallet_rp), Loadable::Ready(config)) =
        (&inputs.wallet_rp, &inputs.config)
    {
        projections.push(Projection::rp(
            "Wallet RP",
            *wallet_rp,
            wallet_rp.saturating_sub(config.rename_cost),
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
        disabled,
        fixtures::*,
    };

    fn ready_inputs() -> RenameInputs {
        RenameInputs {
            busy: false,
            owned_count: Loadable::Ready(1),
            signer: Loadable::Ready(enterprise(1, "Acme", 10)),
            wallet_rp: Loadable::Ready(Rp::whole(10)),
            config: Loadable::Ready(GameConfig::default()),
            name: " Acme Holdings ".to_string(),
        }
    }

    #[test]
    fn evaluate__enabled_uses_trimmed_name() {
        assert_eq!(
            evaluate(&ready_inputs()).eligibility,
            Eligibility::Enabled("Rename Acme to Acme Holdings".to_string())
        );
    }

    #[test]
    fn evaluate__name_guards_in_order() {
        let empty = RenameInputs {
            name: "   ".to_string(),
            ..ready_inputs()
        };
        assert_eq!(evaluate(&empty).eligibility, disabled(ENTER_NAME));

        let long = RenameInputs {
            name: "x".repeat(33),
            ..ready_inputs()
        };
        assert_eq!(evaluate(&long).eligibility, disabled(NAME_TOO_LONG));

        let same = RenameInputs {
            name: "Acme".to_string(),
            wallet_rp: Loadable::Ready(Rp::ZERO),
            ..ready_inputs()
        };
        assert_eq!(evaluate(&same).eligibility, disabled(NAME_UNCHANGED));
    }

    #[test]
    fn evaluate__name_length_counts_characters() {
        let inputs = RenameInputs {
            name: "é".repeat(32),
            ..ready_inputs()
        };
        assert!(evaluate(&inputs).eligibility.is_enabled());
    }

    #[test]
    fn evaluate__rename_cost() {
        let inputs = RenameInputs {
            wallet_rp: Loadable::Ready(Rp::whole(9)),
            ..ready_inputs()
        };
        assert_eq!(evaluate(&inputs).eligibility, disabled(INSUFFICIENT_WALLET_RP));
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
        assert!(evaluation.projections.iter().any(|p| p.label == "Renames"));
    }
}
