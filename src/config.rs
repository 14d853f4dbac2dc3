use color_eyre::eyre::{
    Result,
    WrapErr,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fs,
    path::PathBuf,
    str::FromStr,
};

pub const ENV_PREFIX: &str = "ENTERPRISE_SYNC_";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Entities in view when an address search starts.
    pub initial_slides: usize,
    /// Entities added to the view by each `show_more`.
    pub slide_step: usize,
    /// Own holdings that get detail reads.
    pub holdings_window: usize,
    pub max_settle_rounds: usize,
    pub notice_capacity: usize,
    pub sampler_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_slides: 3,
            slide_step: 3,
            holdings_window: 6,
            max_settle_rounds: 64,
            notice_capacity: 50,
            sampler_seed: None,
        }
    }
}

impl EngineConfig {
    /// Reads a JSON config file (`~` is expanded), then applies environment
    /// overrides.
    pub fn load(path: &str) -> Result<Self> {
        let path = PathBuf::from(shellexpand::tilde(path).into_owned());
        let data = fs::read(&path)
            .wrap_err_with(|| format!("Failed to read engine config {}", path.display()))?;
        let config = serde_json::from_slice::<EngineConfig>(&data)
            .wrap_err("Failed to parse engine config JSON")?;
        Ok(config.with_env_overrides())
    }

    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())
    }

    /// Applies overrides from `lookup`, keyed by upper-case field name.
    /// Unparseable and zero values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn positive<T: FromStr + PartialEq + Default>(raw: Option<String>) -> Option<T> {
            raw.and_then(|value| value.trim().parse::<T>().ok())
                .filter(|value| *value != T::default())
        }
        if let Some(value) = positive(lookup("INITIAL_SLIDES")) {
            self.initial_slides = value;
        }
        if let Some(value) = positive(lookup("SLIDE_STEP")) {
            self.slide_step = value;
        }
        if let Some(value) = positive(lookup("HOLDINGS_WINDOW")) {
            self.holdings_window = value;
        }
        if let Some(value) = positive(lookup("MAX_SETTLE_ROUNDS")) {
            self.max_settle_rounds = value;
        }
        if let Some(value) = positive(lookup("NOTICE_CAPACITY")) {
            self.notice_capacity = value;
        }
        if let Some(seed) = lookup("SAMPLER_SEED").and_then(|v| v.trim().parse().ok()) {
            self.sampler_seed = Some(seed);
        }
        self
    }
}
