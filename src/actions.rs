//! Eligibility of the mutating game actions.
//!
//! Each action has a pure evaluator over an inputs struct. Guards are checked
//! in a fixed order and the first one that trips decides the outcome.
//! Projections (before/after previews) are computed from whatever inputs are
//! ready and never influence the decision.

use crate::{
    enterprise::Enterprise,
    loadable::Loadable,
    types::{
        Rp,
        format_timestamp,
    },
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    sync::Arc,
};

pub mod acquire;
pub mod compete;
pub mod deposit;
pub mod intern;
pub mod merge;
pub mod rebrand;
pub mod rename;
pub mod revive;
pub mod shop;
pub mod withdraw;

pub const LOADING_LABEL: &str = "Loading...";
pub const UNAVAILABLE: &str = "Unable to load game data";
pub const NO_OWNED: &str = "No owned Enterprise";
pub const NO_WALLET: &str = "Connect a wallet";
pub const SELECT_OPPONENT: &str = "Select an opponent";
pub const OPPONENT_BURNED: &str = "Opponent is burned";
pub const OPPONENT_IMMUNE: &str = "Opponent is immune";
pub const INVALID_AMOUNT: &str = "Invalid amount";
pub const ZERO_AMOUNT: &str = "Amount must be greater than zero";
pub const INSUFFICIENT_RP: &str = "insufficient RP";
pub const INSUFFICIENT_WALLET_RP: &str = "Insufficient wallet RP";

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Compete,
    Acquire,
    Merge,
    Revive,
    Deposit,
    Withdraw,
    Rename,
    Rebrand,
    Shop,
    Intern,
}

impl ActionKind {
    pub const ALL: [ActionKind; 10] = [
        ActionKind::Compete,
        ActionKind::Acquire,
        ActionKind::Merge,
        ActionKind::Revive,
        ActionKind::Deposit,
        ActionKind::Withdraw,
        ActionKind::Rename,
        ActionKind::Rebrand,
        ActionKind::Shop,
        ActionKind::Intern,
    ];

    /// Reason shown while a transaction of this kind is outstanding.
    pub fn busy_reason(self) -> &'static str {
        match self {
            ActionKind::Compete => "Attack in progress",
            ActionKind::Acquire => "Acquisition in progress",
            ActionKind::Merge => "Merge in progress",
            ActionKind::Revive => "Revival in progress",
            ActionKind::Deposit => "Deposit in progress",
            ActionKind::Withdraw => "Withdrawal in progress",
            ActionKind::Rename => "Rename in progress",
            ActionKind::Rebrand => "Rebrand in progress",
            ActionKind::Shop => "Purchase in progress",
            ActionKind::Intern => "Task in progress",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ActionKind::Compete => "Compete",
            ActionKind::Acquire => "Acquire",
            ActionKind::Merge => "Merge",
            ActionKind::Revive => "Revive",
            ActionKind::Deposit => "Deposit",
            ActionKind::Withdraw => "Withdraw",
            ActionKind::Rename => "Rename",
            ActionKind::Rebrand => "Rebrand",
            ActionKind::Shop => "Shop purchase",
            ActionKind::Intern => "Intern task",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "text", rename_all = "snake_case")]
pub enum Eligibility {
    Loading,
    Disabled(String),
    Enabled(String),
}

impl Eligibility {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Eligibility::Enabled(_))
    }

    pub fn label(&self) -> &str {
        match self {
            Eligibility::Loading => LOADING_LABEL,
            Eligibility::Disabled(reason) => reason,
            Eligibility::Enabled(label) => label,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ProjectedValue {
    Rp(Rp),
    Count(u64),
    Timestamp(u64),
    Flag(bool),
}

impl fmt::Display for ProjectedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectedValue::Rp(rp) => write!(f, "{rp} RP"),
            ProjectedValue::Count(count) => write!(f, "{count}"),
            ProjectedValue::Timestamp(ts) => f.write_str(&format_timestamp(*ts)),
            ProjectedValue::Flag(true) => f.write_str("yes"),
            ProjectedValue::Flag(false) => f.write_str("no"),
        }
    }
}

/// Before/after preview of one field the action would change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Projection {
    pub label: &'static str,
    pub before: ProjectedValue,
    pub after: ProjectedValue,
}

impl Projection {
    pub fn rp(label: &'static str, before: Rp, after: Rp) -> Self {
        Self {
            label,
            before: ProjectedValue::Rp(before),
            after: ProjectedValue::Rp(after),
        }
    }

    /// Counter that goes up by one.
    pub fn increment(label: &'static str, before: u64) -> Self {
        Self {
            label,
            before: ProjectedValue::Count(before),
            after: ProjectedValue::Count(before.saturating_add(1)),
        }
    }

    pub fn timestamp(label: &'static str, before: u64, after: u64) -> Self {
        Self {
            label,
            before: ProjectedValue::Timestamp(before),
            after: ProjectedValue::Timestamp(after),
        }
    }

    pub fn flag(label: &'static str, before: bool, after: bool) -> Self {
        Self {
            label,
            before: ProjectedValue::Flag(before),
            after: ProjectedValue::Flag(after),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub eligibility: Eligibility,
    pub projections: Vec<Projection>,
}

impl Evaluation {
    pub(crate) fn new(decision: Decision, projections: Vec<Projection>) -> Self {
        let eligibility = match decision {
            Ok(label) => Eligibility::Enabled(label),
            Err(blocked) => blocked,
        };
        Self {
            eligibility,
            projections,
        }
    }
}

/// What a button needs: whether it is disabled, its text, and previews.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionView {
    pub disabled: bool,
    pub label: String,
    pub projections: Vec<Projection>,
}

impl From<Evaluation> for ActionView {
    fn from(evaluation: Evaluation) -> Self {
        Self {
            disabled: !evaluation.eligibility.is_enabled(),
            label: evaluation.eligibility.label().to_string(),
            projections: evaluation.projections,
        }
    }
}

/// `Ok(label)` when every guard passed, otherwise the blocking outcome.
pub(crate) type Decision = Result<String, Eligibility>;

pub(crate) fn disabled(reason: impl Into<String>) -> Eligibility {
    Eligibility::Disabled(reason.into())
}

/// Trips with `reason` when `condition` holds.
pub(crate) fn deny_if(condition: bool, reason: &str) -> Result<(), Eligibility> {
    if condition {
        Err(disabled(reason))
    } else {
        Ok(())
    }
}

/// Owned-count guard: trips only once the count is known to be below `min`.
pub(crate) fn require_owned(
    owned: &Loadable<u64>,
    min: u64,
    reason: &str,
) -> Result<(), Eligibility> {
    deny_if(matches!(owned, Loadable::Ready(count) if *count < min), reason)
}

/// Loading guard for one required read.
pub(crate) trait Gate<T> {
    fn gate(self) -> Result<T, Eligibility>;
}

impl<T> Gate<T> for Loadable<T> {
    fn gate(self) -> Result<T, Eligibility> {
        match self {
            Loadable::Ready(value) => Ok(value),
            Loadable::Loading => Err(Eligibility::Loading),
            Loadable::Failed(_) => Err(disabled(UNAVAILABLE)),
        }
    }
}

/// An optional selection that, once made, must resolve.
pub(crate) fn gate_selection(
    selection: &Option<Loadable<Arc<Enterprise>>>,
) -> Result<Option<&Arc<Enterprise>>, Eligibility> {
    selection.as_ref().map(|loadable| loadable.as_ref().gate()).transpose()
}

/// Parses a form amount: empty text trips `empty_reason`, malformed text
/// trips [`INVALID_AMOUNT`], zero trips [`ZERO_AMOUNT`].
pub(crate) fn parse_amount(text: &str, empty_reason: &str) -> Result<Rp, Eligibility> {
    if text.trim().is_empty() {
        return Err(disabled(empty_reason));
    }
    let amount = Rp::parse_amount(text).ok_or_else(|| disabled(INVALID_AMOUNT))?;
    deny_if(amount.is_zero(), ZERO_AMOUNT)?;
    Ok(amount)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::{
        enterprise::{
            EnterpriseBasic,
            EnterpriseDetail,
        },
        gateway::{
            Art,
            EnterpriseRaw,
            GameConfig,
        },
        types::{
            Address,
            EnterpriseId,
        },
    };

    pub const NOW: u64 = 1_000_000;

    pub fn owner() -> Address {
        Address::new([0xaa; 20])
    }

    pub fn enterprise(id: u64, name: &str, rp: u64) -> Arc<Enterprise> {
        enterprise_with(id, name, rp, owner(), false)
    }

    pub fn enterprise_with(
        id: u64,
        name: &str,
        rp: u64,
        owner: Address,
        immune: bool,
    ) -> Arc<Enterprise> {
        let raw = EnterpriseRaw {
            name: name.to_string(),
            ..EnterpriseRaw::default()
        };
        let basic = EnterpriseBasic::from_chain(
            EnterpriseId(id),
            &raw,
            &[Rp::whole(1)],
            Rp::whole(rp),
            &GameConfig::default(),
            NOW,
        );
        let art = Art {
            id: 1,
            uri: "ipfs://art/1".to_string(),
        };
        Arc::new(Enterprise {
            basic,
            detail: Some(EnterpriseDetail::new(art, owner, immune)),
        })
    }

    pub fn burned(id: u64, name: &str) -> Arc<Enterprise> {
        enterprise_with(id, name, 0, Address::EMPTY, false)
    }

    pub fn basic_only(id: u64, name: &str, rp: u64) -> Arc<Enterprise> {
        let mut enterprise = (*enterprise(id, name, rp)).clone();
        enterprise.detail = None;
        Arc::new(enterprise)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn parse_amount__distinguishes_empty_malformed_and_zero() {
        assert_eq!(parse_amount(" ", "Enter amount"), Err(disabled("Enter amount")));
        assert_eq!(parse_amount("1.2.3", "Enter amount"), Err(disabled(INVALID_AMOUNT)));
        assert_eq!(parse_amount("0", "Enter amount"), Err(disabled(ZERO_AMOUNT)));
        assert_eq!(parse_amount("2.5", "Enter amount"), Ok(Rp::parse_amount("2.5").unwrap()));
    }

    #[test]
    fn gate__failed_read_disables_with_unavailable() {
        let failed: Loadable<u8> = Loadable::Failed("rpc down".into());
        assert_eq!(failed.gate(), Err(disabled(UNAVAILABLE)));
        assert_eq!(Loadable::<u8>::Loading.gate(), Err(Eligibility::Loading));
    }

    #[test]
    fn action_view__loading_renders_disabled_with_loading_label() {
        let view = ActionView::from(Evaluation::new(Err(Eligibility::Loading), vec![]));
        assert!(view.disabled);
        assert_eq!(view.label, LOADING_LABEL);
    }

    #[test]
    fn require_owned__waits_for_count() {
        assert_eq!(require_owned(&Loadable::Loading, 1, NO_OWNED), Ok(()));
        assert_eq!(
            require_owned(&Loadable::Ready(0), 1, NO_OWNED),
            Err(disabled(NO_OWNED))
        );
        assert_eq!(require_owned(&Loadable::Ready(1), 1, NO_OWNED), Ok(()));
    }
}
