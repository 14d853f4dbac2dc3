use chrono::{
    DateTime,
    TimeDelta,
    Utc,
};
use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};
use std::{
    fmt,
    str::FromStr,
};
use thiserror::Error;

/// Number of fractional digits in on-chain RP values.
pub const RP_DECIMALS: u32 = 18;
const ONE_RP: u128 = 10u128.pow(RP_DECIMALS);
const DISPLAY_UNIT: u128 = 10u128.pow(RP_DECIMALS - 2);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid address: {0}")]
    Address(String),
    #[error("invalid RP amount: {0}")]
    Rp(String),
}

/// A 20-byte account address.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    /// The null owner. Tokens owned by it are burned.
    pub const EMPTY: Address = Address([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Cheap syntactic check used before a search is attempted.
    pub fn looks_like(text: &str) -> bool {
        let Some(body) = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
        else {
            return false;
        };
        body.len() == 40 && body.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if !Self::looks_like(trimmed) {
            return Err(ParseError::Address(s.to_string()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(&trimmed[2..], &mut bytes)
            .map_err(|_| ParseError::Address(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EnterpriseId(pub u64);

impl EnterpriseId {
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EnterpriseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EnterpriseId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// RP amount in raw fixed point (18 decimals).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rp(u128);

impl Rp {
    pub const ZERO: Rp = Rp(0);

    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    pub const fn whole(units: u64) -> Self {
        Self(units as u128 * ONE_RP)
    }

    pub const fn raw(self) -> u128 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn saturating_add(self, other: Rp) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub const fn saturating_sub(self, other: Rp) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// `pct` percent of this amount, rounded down.
    pub const fn percent(self, pct: u32) -> Self {
        Self(self.0.saturating_mul(pct as u128) / 100)
    }

    /// Parses user-entered text such as `"150"` or `"1.5"`.
    pub fn parse_amount(text: &str) -> Option<Self> {
        let text = text.trim();
        let (whole, frac) = match text.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (text, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        if !whole.bytes().all(|b| b.is_ascii_digit())
            || !frac.bytes().all(|b| b.is_ascii_digit())
            || frac.len() > RP_DECIMALS as usize
        {
            return None;
        }
        let whole_units: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().ok()?
        };
        let frac_units: u128 = if frac.is_empty() {
            0
        } else {
            let padding = RP_DECIMALS - frac.len() as u32;
            frac.parse::<u128>().ok()?.checked_mul(10u128.pow(padding))?
        };
        whole_units
            .checked_mul(ONE_RP)?
            .checked_add(frac_units)
            .map(Self)
    }

    /// Full-precision decimal text, trailing zeros trimmed.
    pub fn to_exact_string(self) -> String {
        let whole = self.0 / ONE_RP;
        let frac = self.0 % ONE_RP;
        if frac == 0 {
            return whole.to_string();
        }
        let digits = format!("{frac:018}");
        format!("{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl fmt::Display for Rp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / ONE_RP;
        let cents = (self.0 % ONE_RP) / DISPLAY_UNIT;
        if cents == 0 {
            return write!(f, "{whole}");
        }
        let cents = format!("{cents:02}");
        write!(f, "{whole}.{}", cents.trim_end_matches('0'))
    }
}

impl FromStr for Rp {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_amount(s).ok_or_else(|| ParseError::Rp(s.to_string()))
    }
}

impl Serialize for Rp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_exact_string())
    }
}

impl<'de> Deserialize<'de> for Rp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Latest block observed from the gateway. `timestamp` is unix seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub height: u64,
    pub timestamp: u64,
}

/// Compact countdown such as `2d 4h`, `3h 12m` or `45s`.
pub fn format_countdown(seconds: u64) -> String {
    let delta = i64::try_from(seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX);
    let days = delta.num_days();
    let hours = delta.num_hours() % 24;
    let minutes = delta.num_minutes() % 60;
    let secs = delta.num_seconds() % 60;
    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

pub fn format_timestamp(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
