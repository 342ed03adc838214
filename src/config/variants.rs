//! Variant groups
//!
//! A document may encode several mutually exclusive candidates per pipeline
//! position with keys of the form `<base>__I<index>[F<frequency>][qualifier]`.
//! Selection keeps exactly one candidate per index, weighted by frequency,
//! and rewrites its key to `<base><qualifier>`.

use crate::error::ConfigError;
use rand::Rng;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

fn variant_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<base>.+?)__I(?P<index>\d+)(?:F(?P<frequency>[1-9]\d*))?(?P<qualifier>.*)$")
            .expect("variant key pattern is valid")
    })
}

/// A parsed variant-group key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantKey {
    pub base: String,
    pub index: usize,
    pub frequency: u64,
    pub qualifier: String,
}

impl VariantKey {
    /// Parse a key, returning `None` if it is not a variant key
    pub fn parse(key: &str) -> Option<Self> {
        let captures = variant_key_pattern().captures(key)?;
        let index = captures["index"].parse().ok()?;
        let frequency = match captures.name("frequency") {
            Some(m) => m.as_str().parse().ok()?,
            None => 1,
        };
        Some(Self {
            base: captures["base"].to_string(),
            index,
            frequency,
            qualifier: captures["qualifier"].to_string(),
        })
    }

    /// The key with its index and frequency removed
    pub fn resolved_key(&self) -> String {
        format!("{}{}", self.base, self.qualifier)
    }
}

/// Keep one candidate entry per pipeline position
///
/// Documents without variant keys are returned unchanged.
pub fn select_variants<R: Rng + ?Sized>(
    document: Map<String, Value>,
    rng: &mut R,
) -> Result<Map<String, Value>, ConfigError> {
    let parsed: Vec<(Option<VariantKey>, String, Value)> = document
        .into_iter()
        .map(|(key, value)| (VariantKey::parse(&key), key, value))
        .collect();

    let matched = parsed.iter().filter(|(variant, _, _)| variant.is_some()).count();
    if matched == 0 {
        return Ok(parsed.into_iter().map(|(_, key, value)| (key, value)).collect());
    }
    if matched < parsed.len() {
        let plain = parsed
            .iter()
            .filter(|(variant, _, _)| variant.is_none())
            .map(|(_, key, _)| key.clone())
            .collect();
        return Err(ConfigError::MixedFormat(plain));
    }

    let mut groups: BTreeMap<usize, Vec<(VariantKey, Value)>> = BTreeMap::new();
    for (variant, _, value) in parsed {
        if let Some(variant) = variant {
            groups.entry(variant.index).or_default().push((variant, value));
        }
    }

    let indices: Vec<usize> = groups.keys().copied().collect();
    if indices.iter().enumerate().any(|(position, index)| position != *index) {
        return Err(ConfigError::NonSequentialIndex {
            expected: indices.len(),
            found: indices,
        });
    }

    let mut selected = Map::new();
    for (index, mut candidates) in groups {
        let chosen = choose_weighted(&candidates, rng).ok_or_else(|| {
            ConfigError::ConfigFormat(format!("variant frequencies at position {} add up past {}", index, u64::MAX))
        })?;
        let (variant, value) = candidates.swap_remove(chosen);
        let key = variant.resolved_key();
        debug!("Selected variant '{}' for position {}", key, index);

        if selected.contains_key(&key) {
            return Err(ConfigError::DuplicateKey(key));
        }
        selected.insert(key, value);
    }

    Ok(selected)
}

/// Pick a candidate as if each appeared `frequency` times in a uniform pool
///
/// Returns `None` when the frequencies do not fit in a `u64` total.
fn choose_weighted<R: Rng + ?Sized>(candidates: &[(VariantKey, Value)], rng: &mut R) -> Option<usize> {
    let total = candidates
        .iter()
        .try_fold(0u64, |sum, (variant, _)| sum.checked_add(variant.frequency))?;
    let mut ticket = rng.random_range(0..total);
    for (position, (variant, _)) in candidates.iter().enumerate() {
        if ticket < variant.frequency {
            return Some(position);
        }
        ticket -= variant.frequency;
    }
    Some(candidates.len() - 1)
}
