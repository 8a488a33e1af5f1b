use std::collections::BTreeSet;

use super::catalog::{Catalog, ALIGN_PRO, IMPLANT_ONE, SMILE_DESIGN, ZERO_CARIES};
use super::domain::{ConsultReason, ProgramOption, Urgency};
use super::ProgramScore;

pub(crate) const TAG_POINTS: u32 = 2;
pub(crate) const REASON_BONUS: u32 = 5;
pub(crate) const URGENCY_BONUS: u32 = 2;

/// Program a reason maps to directly. `otro` and `dolor` have none.
pub(crate) fn direct_program(reason: ConsultReason) -> Option<&'static str> {
    match reason {
        ConsultReason::Prevencion => Some(ZERO_CARIES),
        ConsultReason::Implantes => Some(IMPLANT_ONE),
        ConsultReason::Estetica => Some(SMILE_DESIGN),
        ConsultReason::Ortodoncia => Some(ALIGN_PRO),
        ConsultReason::Dolor | ConsultReason::Otro => None,
    }
}

pub(crate) fn urgency_program(urgency: Urgency) -> Option<&'static str> {
    match urgency {
        Urgency::Urgente => Some(ZERO_CARIES),
        Urgency::Explorando => Some(SMILE_DESIGN),
        Urgency::EstaSemana | Urgency::EsteMes => None,
    }
}

/// Union of the tags of every known symptom; unknown ids are skipped.
pub(crate) fn collect_tags<'a, I>(catalog: &Catalog, symptom_ids: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a String>,
{
    symptom_ids
        .into_iter()
        .filter_map(|id| catalog.symptom(id))
        .flat_map(|symptom| symptom.tags.iter().cloned())
        .collect()
}

pub(crate) fn score_program(
    program: &ProgramOption,
    tags: &BTreeSet<String>,
    reason: ConsultReason,
    urgency: Urgency,
) -> ProgramScore {
    let matched_tags: Vec<String> = tags
        .iter()
        .filter(|tag| program.keywords.contains(*tag))
        .cloned()
        .collect();

    let mut score = matched_tags.len() as u32 * TAG_POINTS;
    let reason_bonus = direct_program(reason) == Some(program.id.as_str());
    if reason_bonus {
        score += REASON_BONUS;
    }
    let urgency_bonus = urgency_program(urgency) == Some(program.id.as_str());
    if urgency_bonus {
        score += URGENCY_BONUS;
    }

    ProgramScore {
        program_id: program.id.clone(),
        score,
        matched_tags,
        reason_bonus,
        urgency_bonus,
    }
}

/// Scores in catalog order.
pub(crate) fn rank_programs(
    catalog: &Catalog,
    tags: &BTreeSet<String>,
    reason: ConsultReason,
    urgency: Urgency,
) -> Vec<ProgramScore> {
    catalog
        .programs()
        .iter()
        .map(|program| score_program(program, tags, reason, urgency))
        .collect()
}

/// Index of the first program holding the highest score.
pub(crate) fn winner(scores: &[ProgramScore]) -> usize {
    let mut best = 0;
    for (position, candidate) in scores.iter().enumerate().skip(1) {
        if candidate.score > scores[best].score {
            best = position;
        }
    }
    best
}

/// Heuristic normalization capped at 0.95; not a probability.
pub(crate) fn confidence(score: u32, tag_count: usize) -> f64 {
    let max_possible = tag_count as u32 * TAG_POINTS + REASON_BONUS + URGENCY_BONUS;
    (f64::from(score) / f64::from(max_possible) + 0.3).min(0.95)
}
