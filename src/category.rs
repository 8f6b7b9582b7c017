//! Categorical lookups: free-text loop and archetype labels mapped onto fixed
//! enums, each carrying its base color.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s-]+").unwrap());
static NON_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// Canonicalize a display label into a lookup key, e.g.
/// `"Fixes that Fail"` becomes `"FIXES_THAT_FAIL"`.
pub fn normalize_key(s: &str) -> String {
    let collapsed = SEPARATOR_RE.replace_all(s.trim(), "_");
    NON_WORD_RE.replace_all(&collapsed, "").to_uppercase()
}

/// Title-cases a type name for display: `"FIXES_THAT_FAIL"` becomes
/// `"Fixes That Fail"`.
pub fn humanize(name: &str) -> String {
    name.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopKind {
    Reinforcing,
    Balancing,
    Unmapped,
}

impl LoopKind {
    pub fn from_label(label: &str) -> Self {
        match normalize_key(label).as_str() {
            "REINFORCING" => Self::Reinforcing,
            "BALANCING" => Self::Balancing,
            _ => Self::Unmapped,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Reinforcing => "#27AE60",
            Self::Balancing => "#E74C3C",
            Self::Unmapped => "#999999",
        }
    }
}

pub fn loop_color(label: &str) -> &'static str {
    LoopKind::from_label(label).color()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchetypeKind {
    ShiftingTheBurden,
    FixesThatFail,
    LimitsToSuccess,
    DriftingGoals,
    GrowthAndUnderinvestment,
    SuccessToTheSuccessful,
    Escalation,
    TragedyOfTheCommons,
    Unmapped,
}

impl ArchetypeKind {
    pub const KNOWN: [ArchetypeKind; 8] = [
        Self::ShiftingTheBurden,
        Self::FixesThatFail,
        Self::LimitsToSuccess,
        Self::DriftingGoals,
        Self::GrowthAndUnderinvestment,
        Self::SuccessToTheSuccessful,
        Self::Escalation,
        Self::TragedyOfTheCommons,
    ];

    pub fn from_label(label: &str) -> Self {
        Self::from_key(&normalize_key(label))
    }

    pub fn from_key(key: &str) -> Self {
        match key {
            "SHIFTING_THE_BURDEN" => Self::ShiftingTheBurden,
            "FIXES_THAT_FAIL" => Self::FixesThatFail,
            "LIMITS_TO_SUCCESS" => Self::LimitsToSuccess,
            "DRIFTING_GOALS" => Self::DriftingGoals,
            "GROWTH_AND_UNDERINVESTMENT" => Self::GrowthAndUnderinvestment,
            "SUCCESS_TO_THE_SUCCESSFUL" => Self::SuccessToTheSuccessful,
            "ESCALATION" => Self::Escalation,
            "TRAGEDY_OF_THE_COMMONS" => Self::TragedyOfTheCommons,
            _ => Self::Unmapped,
        }
    }

    pub fn key(self) -> Option<&'static str> {
        Some(match self {
            Self::ShiftingTheBurden => "SHIFTING_THE_BURDEN",
            Self::FixesThatFail => "FIXES_THAT_FAIL",
            Self::LimitsToSuccess => "LIMITS_TO_SUCCESS",
            Self::DriftingGoals => "DRIFTING_GOALS",
            Self::GrowthAndUnderinvestment => "GROWTH_AND_UNDERINVESTMENT",
            Self::SuccessToTheSuccessful => "SUCCESS_TO_THE_SUCCESSFUL",
            Self::Escalation => "ESCALATION",
            Self::TragedyOfTheCommons => "TRAGEDY_OF_THE_COMMONS",
            Self::Unmapped => return None,
        })
    }

    pub fn base_color(self) -> &'static str {
        match self {
            Self::ShiftingTheBurden => "#66BB6A",
            Self::FixesThatFail => "#BA68C8",
            Self::LimitsToSuccess => "#FFB74D",
            Self::DriftingGoals => "#4FC3F7",
            Self::GrowthAndUnderinvestment => "#F5CBA7",
            Self::SuccessToTheSuccessful => "#D4E6F1",
            Self::Escalation => "#F48FB1",
            Self::TragedyOfTheCommons => "#A3E4D7",
            Self::Unmapped => "#BED7ED",
        }
    }
}

/// Base color for an archetype label. Unmapped labels log a warning and fall
/// back to the pale-blue default; an empty label falls back silently.
pub fn archetype_base_color(label: &str) -> &'static str {
    let key = normalize_key(label);
    let kind = ArchetypeKind::from_key(&key);
    if kind == ArchetypeKind::Unmapped && !key.is_empty() {
        warn!(archetype = label, "unmapped archetype type");
    }
    kind.base_color()
}

/// Icon name shown next to an archetype in the detail panel.
pub fn archetype_icon(label: &str) -> &'static str {
    match normalize_key(label).as_str() {
        "BALANCING_PROCESS_WITH_DELAY" => "fa-clock",
        "LIMITS_TO_GROWTH" => "fa-chart-line",
        "SHIFTING_THE_BURDEN" => "fa-weight-hanging",
        "TRAGEDY_OF_THE_COMMONS" => "fa-users",
        "FIXES_THAT_FAIL" => "fa-tools",
        "GROWTH_AND_UNDERINVESTMENT" => "fa-chart-bar",
        "SUCCESS_TO_THE_SUCCESSFUL" => "fa-trophy",
        "ERODING_GOALS" => "fa-bullseye",
        "ESCALATION" => "fa-level-up-alt",
        "ACCIDENTAL_ADVERSARIES" => "fa-angry",
        _ => "fa-question-circle",
    }
}
