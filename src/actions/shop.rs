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
    gateway::ShopItem,
    loadable::Loadable,
    types::Rp,
};

pub const SELECT_PACKAGE: &str = "Select a package";
pub const PACKAGE_UNAVAILABLE: &str = "Package unavailable";
pub const INSUFFICIENT_FUNDS: &str = "Insufficient funds";

/// Buys an RP package with the native token.
#[derive(Clone, Debug, Default)]
pub struct ShopInputs {
    pub busy: bool,
    pub connected: bool,
    pub items: Loadable<Vec<ShopItem>>,
    pub native_balance: Loadable<u64>,
    /// Preview only.
    pub wallet_rp: Loadable<Rp>,
    pub item: Option<u32>,
}

impl ShopInputs {
    pub fn selected_item(&self) -> Option<&ShopItem> {
        let id = self.item?;
        match &self.items {
            Loadable::Ready(items) => items.iter().find(|item| item.id == id),
            _ => None,
        }
    }
}

pub fn evaluate(inputs: &ShopInputs) -> Evaluation {
    Evaluation::new(decide(inputs), project(inputs))
}

fn decide(inputs: &ShopInputs) -> Decision {
    deny_if(inputs.busy, ActionKind::Shop.busy_reason())?;
    deny_if(!inputs.connected, NO_WALLET)?;
    let items = inputs.items.as_ref().gate()?;
    let native_balance = *inputs.native_balance.as_ref().gate()?;
    let id = inputs.item.ok_or_else(|| disabled(SELECT_PACKAGE))?;
    let item = items
        .iter()
        .find(|item| item.id == id)
        .ok_or_else(|| disabled(PACKAGE_UNAVAILABLE))?;
    deny_if(native_balance < item.price_gwei, INSUFFICIENT_FUNDS)?;
    Ok(format!("Buy {} RP", item.rp.to_exact_string()))
}

fn project(inputs: &ShopInputs) -> Vec<Projection> {
    match (inputs.selected_item(), &inputs.wallet_rp) {
        (Some(item), Loadable::Ready(wallet_rp)) => vec![Projection::rp(
            "Wallet RP",
            *wallet_rp,
            wallet_rp.saturating_add(item.rp),
        )],
        _ => Vec::new(),
    }
}
