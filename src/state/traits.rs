use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

pub const TRAIT_MIN: f64 = 0.0;
pub const TRAIT_MAX: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TraitName {
    Logic,
    Creativity,
    Memory,
    Adaptability,
    Ethics,
}

impl TraitName {
    pub const ALL: [TraitName; 5] = [
        TraitName::Logic,
        TraitName::Creativity,
        TraitName::Memory,
        TraitName::Adaptability,
        TraitName::Ethics,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TraitName::Logic => "Logic",
            TraitName::Creativity => "Creativity",
            TraitName::Memory => "Memory",
            TraitName::Adaptability => "Adaptability",
            TraitName::Ethics => "Ethics",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let v = value.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(v))
    }
}

impl fmt::Display for TraitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Personality vector. Every value stays inside `[TRAIT_MIN, TRAIT_MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Traits {
    #[serde(rename = "Logic")]
    pub logic: f64,
    #[serde(rename = "Creativity")]
    pub creativity: f64,
    #[serde(rename = "Memory")]
    pub memory: f64,
    #[serde(rename = "Adaptability")]
    pub adaptability: f64,
    #[serde(rename = "Ethics")]
    pub ethics: f64,
}

impl Default for Traits {
    fn default() -> Self {
        Self {
            logic: 8.0,
            creativity: 5.0,
            memory: 5.0,
            adaptability: 7.0,
            ethics: 5.0,
        }
    }
}

impl Traits {
    pub fn get(&self, name: TraitName) -> f64 {
        match name {
            TraitName::Logic => self.logic,
            TraitName::Creativity => self.creativity,
            TraitName::Memory => self.memory,
            TraitName::Adaptability => self.adaptability,
            TraitName::Ethics => self.ethics,
        }
    }

    fn slot(&mut self, name: TraitName) -> &mut f64 {
        match name {
            TraitName::Logic => &mut self.logic,
            TraitName::Creativity => &mut self.creativity,
            TraitName::Memory => &mut self.memory,
            TraitName::Adaptability => &mut self.adaptability,
            TraitName::Ethics => &mut self.ethics,
        }
    }

    /// Add each delta and clamp the result into range.
    pub fn apply(&mut self, adjustments: &TraitAdjustments) {
        for (name, delta) in adjustments.iter() {
            if !delta.is_finite() {
                continue;
            }
            let slot = self.slot(name);
            *slot = (*slot + delta).clamp(TRAIT_MIN, TRAIT_MAX);
        }
    }

    /// Highest trait; ties resolve to declaration order.
    pub fn dominant(&self) -> TraitName {
        let mut best = TraitName::Logic;
        for name in TraitName::ALL {
            if self.get(name) > self.get(best) {
                best = name;
            }
        }
        best
    }

    pub fn iter(&self) -> impl Iterator<Item = (TraitName, f64)> + '_ {
        TraitName::ALL.into_iter().map(move |n| (n, self.get(n)))
    }
}

/// Sparse per-trait deltas as returned by the model. Unknown trait names and
/// non-numeric values are dropped while deserializing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TraitAdjustments(BTreeMap<TraitName, f64>);

impl TraitAdjustments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: TraitName, delta: f64) -> Self {
        self.0.insert(name, delta);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TraitName, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    /// Entries worth showing in the log: non-zero deltas only.
    pub fn visible(&self) -> Vec<(TraitName, f64)> {
        self.iter().filter(|(_, v)| *v != 0.0).collect()
    }
}

impl<'de> Deserialize<'de> for TraitAdjustments {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?
            .unwrap_or_default();
        let map = raw
            .into_iter()
            .filter_map(|(k, v)| Some((TraitName::parse(&k)?, v.as_f64()?)))
            .collect();
        Ok(Self(map))
    }
}
