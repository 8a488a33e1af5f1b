use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Top-level reason a patient gives for booking a consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsultReason {
    Dolor,
    Estetica,
    Implantes,
    Ortodoncia,
    Prevencion,
    Otro,
}

impl ConsultReason {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Dolor,
            Self::Estetica,
            Self::Implantes,
            Self::Ortodoncia,
            Self::Prevencion,
            Self::Otro,
        ]
    }

    pub const fn slug(self) -> &'static str {
        match self {
            Self::Dolor => "dolor",
            Self::Estetica => "estetica",
            Self::Implantes => "implantes",
            Self::Ortodoncia => "ortodoncia",
            Self::Prevencion => "prevencion",
            Self::Otro => "otro",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Dolor => "Dolor o molestia",
            Self::Estetica => "Estética de la sonrisa",
            Self::Implantes => "Implantes y piezas perdidas",
            Self::Ortodoncia => "Ortodoncia",
            Self::Prevencion => "Prevención y control",
            Self::Otro => "Otro motivo",
        }
    }
}

impl fmt::Display for ConsultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ConsultReason {
    type Err = UnknownSlug;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|reason| reason.slug() == needle)
            .ok_or_else(|| UnknownSlug {
                kind: "reason",
                value: value.to_string(),
            })
    }
}

/// Patient-declared time pressure, from most to least urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    Urgente,
    EstaSemana,
    EsteMes,
    Explorando,
}

impl Urgency {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Urgente,
            Self::EstaSemana,
            Self::EsteMes,
            Self::Explorando,
        ]
    }

    pub const fn slug(self) -> &'static str {
        match self {
            Self::Urgente => "urgente",
            Self::EstaSemana => "esta-semana",
            Self::EsteMes => "este-mes",
            Self::Explorando => "explorando",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Urgente => "Lo antes posible",
            Self::EstaSemana => "Esta semana",
            Self::EsteMes => "Este mes",
            Self::Explorando => "Solo estoy explorando",
        }
    }

    /// Urgencies that trigger the "book soon" recommendation.
    pub const fn is_pressing(self) -> bool {
        matches!(self, Self::Urgente | Self::EstaSemana)
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Urgency {
    type Err = UnknownSlug;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|urgency| urgency.slug() == needle)
            .ok_or_else(|| UnknownSlug {
                kind: "urgency",
                value: value.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownSlug {
    pub kind: &'static str,
    pub value: String,
}

/// Selectable symptom shown in the second wizard step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomOption {
    pub id: String,
    pub label: String,
    pub reasons: BTreeSet<ConsultReason>,
    pub weight: u8,
    pub tags: BTreeSet<String>,
}

impl SymptomOption {
    /// `otro` bypasses the reason filter so every symptom is offered.
    pub fn applies_to(&self, reason: ConsultReason) -> bool {
        reason == ConsultReason::Otro || self.reasons.contains(&reason)
    }
}

/// Treatment program used as the recommendation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramOption {
    pub id: String,
    pub name: String,
    pub tagline: String,
    pub description: String,
    pub url: String,
    pub keywords: BTreeSet<String>,
}

/// Inputs collected by the wizard for a single scoring run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticInput {
    pub reason: ConsultReason,
    #[serde(default)]
    pub symptom_ids: BTreeSet<String>,
    pub urgency: Urgency,
    #[serde(default)]
    pub has_photo: bool,
}

/// Closed price band in CLP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: u64,
    pub max: u64,
}

impl PriceRange {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub const fn midpoint(self) -> u64 {
        (self.min + self.max) / 2
    }

    pub fn clamp(self, amount: u64) -> u64 {
        amount.clamp(self.min, self.max)
    }
}
