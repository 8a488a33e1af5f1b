use std::collections::BTreeSet;

use super::catalog::{ALIGN_PRO, IMPLANT_ONE, SMILE_DESIGN, ZERO_CARIES};
use super::domain::{PriceRange, Urgency};

pub(crate) const PRESSING_URGENCY_NOTE: &str =
    "Por la urgencia que indicas, te recomendamos agendar una evaluación en los próximos días.";
pub(crate) const PHOTO_NOTE: &str =
    "Revisaremos las fotos que adjuntaste antes de tu evaluación para agilizar el diagnóstico.";
pub(crate) const PERIODONTAL_NOTE: &str =
    "Incluiremos una evaluación periodontal completa para revisar el estado de tus encías.";
pub(crate) const BRUXISM_NOTE: &str =
    "Evaluaremos el uso de una placa de descarga para proteger tus dientes del bruxismo.";

pub(crate) const FALLBACK_PRICE: PriceRange = PriceRange::new(100_000, 500_000);

/// Fixed sentences in fixed order: urgency, photo, periodontal, bruxism.
pub(crate) fn recommendations(
    urgency: Urgency,
    has_photo: bool,
    tags: &BTreeSet<String>,
) -> Vec<String> {
    let mut notes = Vec::new();

    if urgency.is_pressing() {
        notes.push(PRESSING_URGENCY_NOTE.to_string());
    }
    if has_photo {
        notes.push(PHOTO_NOTE.to_string());
    }
    if tags.contains("periodontal") {
        notes.push(PERIODONTAL_NOTE.to_string());
    }
    if tags.contains("bruxismo") {
        notes.push(BRUXISM_NOTE.to_string());
    }

    notes
}

/// Program ids outside the built-in four (e.g. from a CSV catalog) get the fallback band.
pub(crate) fn price_range(program_id: &str) -> PriceRange {
    match program_id {
        ZERO_CARIES => PriceRange::new(150_000, 450_000),
        IMPLANT_ONE => PriceRange::new(800_000, 1_800_000),
        SMILE_DESIGN => PriceRange::new(350_000, 1_200_000),
        ALIGN_PRO => PriceRange::new(1_200_000, 3_500_000),
        _ => FALLBACK_PRICE,
    }
}
