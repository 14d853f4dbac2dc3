pub mod actions;
pub mod busy;
pub mod cache;
pub mod config;
pub mod enterprise;
pub mod error;
pub mod gateway;
pub mod loadable;
pub mod notifications;
pub mod pagination;
pub mod sampler;
pub mod search;
pub mod session;
pub mod types;

pub mod test_helpers;
