use std::fmt;
use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use enum_map::EnumMap;
use serde::de::Error as _;
use serde::Deserialize;
use strum::IntoStaticStr;

/// One scored dimension of a hypothetical placement. Hard conflicts are the
/// first three; the rest are soft preferences.
#[derive(Debug, enum_map::Enum, Deserialize, IntoStaticStr, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PenaltyKind {
    TeacherOverlap,
    ClassOverlap,
    IntervalViolation,
    TeacherGap,
    SubjectImbalance,
    DailyOverload,
    WeeklyOverload,
}

impl PenaltyKind {
    fn default_weight(self) -> u32 {
        match self {
            Self::TeacherOverlap => 1000,
            Self::ClassOverlap => 1000,
            Self::IntervalViolation => 500,
            Self::TeacherGap => 100,
            Self::SubjectImbalance => 50,
            Self::DailyOverload => 20,
            Self::WeeklyOverload => 10,
        }
    }
}

/// Per-dimension hit counts for one assessed placement. The weighted sum is
/// the placement's penalty; the reporter reads the raw counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PenaltyCount {
    counts: EnumMap<PenaltyKind, u32>,
}

impl PenaltyCount {
    pub fn new() -> Self {
        PenaltyCount::default()
    }

    pub fn add(&mut self, kind: PenaltyKind, count: u32) {
        self.counts[kind] += count;
    }

    pub fn count(&self, kind: PenaltyKind) -> u32 {
        self.counts[kind]
    }

    pub fn total(&self, weights: &PenaltyWeights) -> u32 {
        self.counts
            .iter()
            .map(|(kind, &count)| count * weights.get(kind))
            .sum()
    }
}

impl fmt::Display for PenaltyCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (kind, count) in self.counts {
            let kind_name: &str = kind.into();
            writeln!(f, "{kind_name}: {count}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PenaltyWeights {
    map: EnumMap<PenaltyKind, u32>,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        PenaltyWeights {
            map: EnumMap::from_fn(PenaltyKind::default_weight),
        }
    }
}

impl PenaltyWeights {
    pub fn get(&self, kind: PenaltyKind) -> u32 {
        self.map[kind]
    }

    pub fn read_from_toml(path: &Path) -> Result<Self> {
        let toml_string = fs::read_to_string(path)
            .with_context(|| anyhow!("failed to read weights toml at {}", path.display()))?;
        toml::from_str(&toml_string)
            .with_context(|| anyhow!("failed to parse penalty weights at {}", path.display()))
    }
}

// EnumMap's own Deserialize insists on every key being present; here a
// missing key means "use the built-in weight", so deserialize by hand.
impl<'de> Deserialize<'de> for PenaltyWeights {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(PenaltyWeightsVisitor)
    }
}

struct PenaltyWeightsVisitor;

impl<'de> serde::de::Visitor<'de> for PenaltyWeightsVisitor {
    type Value = PenaltyWeights;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "a map of penalty kinds to weights")
    }

    fn visit_map<M: serde::de::MapAccess<'de>>(
        self,
        mut access: M,
    ) -> Result<Self::Value, M::Error> {
        let mut seen: EnumMap<PenaltyKind, bool> = EnumMap::default();
        let mut weights = PenaltyWeights::default();

        while let Some((kind, value)) = access.next_entry::<PenaltyKind, u32>()? {
            if seen[kind] {
                return Err(M::Error::duplicate_field(kind.into()));
            }
            seen[kind] = true;
            weights.map[kind] = value;
        }

        Ok(weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_weight_table() {
        let weights = PenaltyWeights::default();
        assert_eq!(weights.get(PenaltyKind::TeacherOverlap), 1000);
        assert_eq!(weights.get(PenaltyKind::ClassOverlap), 1000);
        assert_eq!(weights.get(PenaltyKind::IntervalViolation), 500);
        assert_eq!(weights.get(PenaltyKind::TeacherGap), 100);
        assert_eq!(weights.get(PenaltyKind::SubjectImbalance), 50);
        assert_eq!(weights.get(PenaltyKind::DailyOverload), 20);
        assert_eq!(weights.get(PenaltyKind::WeeklyOverload), 10);
    }

    #[test]
    fn toml_overrides_only_named_weights() {
        let weights: PenaltyWeights =
            toml::from_str("teacher_gap = 250\nweekly_overload = 0\n").unwrap();
        assert_eq!(weights.get(PenaltyKind::TeacherGap), 250);
        assert_eq!(weights.get(PenaltyKind::WeeklyOverload), 0);
        assert_eq!(weights.get(PenaltyKind::TeacherOverlap), 1000);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        assert!(toml::from_str::<PenaltyWeights>("teacher_gap = 1\nteacher_gap = 2\n").is_err());
    }

    #[test]
    fn weighted_total_sums_dimensions() {
        let mut count = PenaltyCount::new();
        count.add(PenaltyKind::TeacherOverlap, 2);
        count.add(PenaltyKind::TeacherGap, 3);
        assert_eq!(count.total(&PenaltyWeights::default()), 2300);
    }
}
