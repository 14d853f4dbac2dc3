use super::{
    ActionKind,
    Decision,
    Evaluation,
    Gate,
    NO_WALLET,
    Projection,
    deny_if,
    disabled,
};
use crate::{
    gateway::GameConfig,
    loadable::Loadable,
    types::{
        Rp,
        format_countdown,
    },
};

#[derive(Clone, Debug, Default)]
pub struct InternInputs {
    pub busy: bool,
    pub connected: bool,
    /// Timestamp of the wallet's last task, 0 if never.
    pub last_task: Loadable<u64>,
    pub wallet_rp: Loadable<Rp>,
    pub config: Loadable<GameConfig>,
    pub now: u64,
}

/// Seconds until the next task is allowed, if the cooldown is running.
pub fn cooldown_left(last_task: u64, config: &GameConfig, now: u64) -> Option<u64> {
    if last_task == 0 {
        return None;
    }
    let ready_at = last_task.saturating_add(config.intern_cooldown);
    (ready_at > now).then(|| ready_at - now)
}

pub fn evaluate(inputs: &InternInputs) -> Evaluation {
    Evaluation::new(decide(inputs), project(inputs))
}

fn decide(inputs: &InternInputs) -> Decision {
    deny_if(inputs.busy, ActionKind::Intern.busy_reason())?;
    deny_if(!inputs.connected, NO_WALLET)?;
    let last_task = *inputs.last_task.as_ref().gate()?;
    let config = inputs.config.as_ref().gate()?;
    if let Some(left) = cooldown_left(last_task, config, inputs.now) {
        return Err(disabled(format!("Next task in {}", format_countdown(left))));
    }
    Ok(format!(
        "Complete intern task (+{} RP)",
        config.intern_reward.to_exact_string()
    ))
}

fn project(inputs: &InternInputs) -> Vec<Projection> {
    match (&inputs.wallet_rp, &inputs.config) {
        (Loadable::Ready(wallet_rp), Loadable::Ready(config)) => vec![Projection::rp(
            "Wallet RP",
            *wallet_rp,
            wallet_rp.saturating_add(config.intern_reward),
        )],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::actions::{
        Eligibility,
        fixtures::NOW,
    };

    fn ready_inputs() -> InternInputs {
        InternInputs {
            busy: false,
            connected: true,
            last_task: Loadable::Ready(0),
            wallet_rp: Loadable::Ready(Rp::ZERO),
            config: Loadable::Ready(GameConfig::default()),
            now: NOW,
        }
    }

    #[test]
    fn evaluate__first_task_is_available() {
        assert_eq!(
            evaluate(&ready_inputs()).eligibility,
            Eligibility::Enabled("Complete intern task (+5 RP)".to_string())
        );
    }

    #[test]
    fn evaluate__cooldown_shows_countdown() {
        // given
        let inputs = InternInputs {
            last_task: Loadable::Ready(NOW - 86_400 + 3 * 3_600 + 12 * 60),
            ..ready_inputs()
        };

        // when
        let evaluation = evaluate(&inputs);

        // then
        assert_eq!(evaluation.eligibility, disabled("Next task in 3h 12m"));
    }

    #[test]
    fn evaluate__cooldown_ends_exactly_at_period() {
        let inputs = InternInputs {
            last_task: Loadable::Ready(NOW - 86_400),
            ..ready_inputs()
        };
        assert!(evaluate(&inputs).eligibility.is_enabled());
    }

    #[test]
    fn evaluate__disconnected_wallet() {
        let inputs = InternInputs {
            connected: false,
            ..ready_inputs()
        };
        assert_eq!(evaluate(&inputs).eligibility, disabled(NO_WALLET));
    }
}
