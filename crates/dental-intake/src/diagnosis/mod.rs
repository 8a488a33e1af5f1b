//! Rule-based recommendation engine behind the intake wizard's "diagnosis" screen.
//!
//! Scores are additive keyword matches plus fixed reason and urgency bonuses. The
//! resulting confidence is a bounded heuristic in `[0.3, 0.95]`, not a probability.

mod catalog;
mod currency;
pub mod domain;
mod policy;
mod rules;

pub use catalog::{
    Catalog, CatalogError, ALIGN_PRO, IMPLANT_ONE, PROGRAM_COUNT, SMILE_DESIGN, ZERO_CARIES,
};
pub use currency::format_currency;
pub use domain::{
    ConsultReason, DiagnosticInput, PriceRange, ProgramOption, SymptomOption, UnknownSlug,
    Urgency,
};

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Stateless scorer over a shared read-only catalog.
#[derive(Debug, Clone)]
pub struct DiagnosisEngine {
    catalog: Arc<Catalog>,
}

impl DiagnosisEngine {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Price band for a catalog program; `None` when the id is not in the catalog.
    pub fn price_range(&self, program_id: &str) -> Option<PriceRange> {
        self.catalog
            .program(program_id)
            .map(|program| policy::price_range(&program.id))
    }

    pub fn diagnose(&self, input: &DiagnosticInput) -> DiagnosticResult {
        self.score(
            input.reason,
            &input.symptom_ids,
            input.urgency,
            input.has_photo,
        )
    }

    pub fn score<'a, I>(
        &self,
        reason: ConsultReason,
        symptom_ids: I,
        urgency: Urgency,
        has_photo: bool,
    ) -> DiagnosticResult
    where
        I: IntoIterator<Item = &'a String>,
    {
        let tags = rules::collect_tags(&self.catalog, symptom_ids);
        let ranking = rules::rank_programs(&self.catalog, &tags, reason, urgency);

        // Catalog construction guarantees PROGRAM_COUNT entries.
        let best = rules::winner(&ranking);
        let program = self.catalog.programs()[best].clone();
        let best_score = ranking[best].score;

        let confidence = rules::confidence(best_score, tags.len());
        let recommendations = policy::recommendations(urgency, has_photo, &tags);
        let price_estimate = policy::price_range(&program.id);

        DiagnosticResult {
            route_key: format!("{}:{}", reason.slug(), program.id),
            program,
            confidence,
            tags_count: tags.len(),
            tags,
            urgency,
            recommendations,
            price_estimate,
            ranking,
        }
    }
}

/// Contribution of one program to the ranking, kept for transparent audits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramScore {
    pub program_id: String,
    pub score: u32,
    pub matched_tags: Vec<String>,
    pub reason_bonus: bool,
    pub urgency_bonus: bool,
}

/// Output consumed by the summary, financing and call-to-action screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticResult {
    pub route_key: String,
    pub program: ProgramOption,
    pub confidence: f64,
    pub tags: BTreeSet<String>,
    pub tags_count: usize,
    pub urgency: Urgency,
    pub recommendations: Vec<String>,
    pub price_estimate: PriceRange,
    pub ranking: Vec<ProgramScore>,
}

impl DiagnosticResult {
    pub fn confidence_pct(&self) -> u8 {
        (self.confidence * 100.0).round().clamp(0.0, 100.0) as u8
    }

    pub fn price_label(&self) -> String {
        format!(
            "{} - {}",
            format_currency(self.price_estimate.min as i64),
            format_currency(self.price_estimate.max as i64)
        )
    }
}
