use crate::infra::load_catalog;
use clap::Args;
use dental_intake::diagnosis::{
    format_currency, ConsultReason, DiagnosisEngine, DiagnosticResult, Urgency,
};
use dental_intake::error::AppError;
use dental_intake::intake::FinancingEstimate;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DiagnoseArgs {
    /// Consultation reason (dolor, estetica, implantes, ortodoncia, prevencion, otro)
    #[arg(long)]
    pub(crate) reason: ConsultReason,
    /// Symptom id from the catalog; repeat for several symptoms
    #[arg(long = "symptom")]
    pub(crate) symptoms: Vec<String>,
    /// How soon care is needed (urgente, esta-semana, este-mes, explorando)
    #[arg(long)]
    pub(crate) urgency: Urgency,
    /// Whether the patient attached photos
    #[arg(long)]
    pub(crate) photo: bool,
    /// Directory with symptoms.csv and programs.csv replacing the built-in catalog
    #[arg(long)]
    pub(crate) catalog_dir: Option<PathBuf>,
    /// Print the raw result as JSON instead of the summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct SymptomsArgs {
    /// Only list symptoms offered for this reason
    #[arg(long)]
    pub(crate) reason: Option<ConsultReason>,
    /// Directory with symptoms.csv and programs.csv replacing the built-in catalog
    #[arg(long)]
    pub(crate) catalog_dir: Option<PathBuf>,
}

pub(crate) fn run_diagnose(args: DiagnoseArgs) -> Result<(), AppError> {
    let catalog = load_catalog(args.catalog_dir.as_deref())?;
    let unknown: Vec<&str> = args
        .symptoms
        .iter()
        .filter(|id| catalog.symptom(id).is_none())
        .map(String::as_str)
        .collect();

    let engine = DiagnosisEngine::new(Arc::new(catalog));
    let result = engine.score(args.reason, &args.symptoms, args.urgency, args.photo);

    if args.json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Result unavailable as JSON: {err}"),
        }
        return Ok(());
    }

    if !unknown.is_empty() {
        println!("Ignoring unknown symptoms: {}", unknown.join(", "));
    }
    print!("{}", render_diagnosis(&result));
    Ok(())
}

pub(crate) fn run_symptoms(args: SymptomsArgs) -> Result<(), AppError> {
    let catalog = load_catalog(args.catalog_dir.as_deref())?;
    let engine = DiagnosisEngine::new(Arc::new(catalog));
    print!("{}", render_symptoms(&engine, args.reason));
    Ok(())
}

pub(crate) fn render_diagnosis(result: &DiagnosticResult) -> String {
    let mut out = String::new();
    let financing = FinancingEstimate::seeded(result.price_estimate);

    let _ = writeln!(out, "Recommended program: {}", result.program.name);
    let _ = writeln!(out, "  {}", result.program.tagline);
    let _ = writeln!(out, "Route: {}", result.route_key);
    let _ = writeln!(
        out,
        "Confidence: {}% ({} matching tags)",
        result.confidence_pct(),
        result.tags_count
    );
    let _ = writeln!(out, "Urgency: {}", result.urgency.label());
    let _ = writeln!(out, "Estimated price: {}", result.price_label());
    let _ = writeln!(out, "Financing: {}", financing.summary());

    let _ = writeln!(out, "\nRanking");
    for entry in &result.ranking {
        let mut bonuses = Vec::new();
        if entry.reason_bonus {
            bonuses.push("reason");
        }
        if entry.urgency_bonus {
            bonuses.push("urgency");
        }
        let _ = writeln!(
            out,
            "  {:<14} {:>3} pts  tags: {}{}",
            entry.program_id,
            entry.score,
            if entry.matched_tags.is_empty() {
                "-".to_string()
            } else {
                entry.matched_tags.join(", ")
            },
            if bonuses.is_empty() {
                String::new()
            } else {
                format!("  bonus: {}", bonuses.join(", "))
            }
        );
    }

    if result.recommendations.is_empty() {
        let _ = writeln!(out, "\nNext steps: none");
    } else {
        let _ = writeln!(out, "\nNext steps");
        for note in &result.recommendations {
            let _ = writeln!(out, "  - {note}");
        }
    }

    out
}

pub(crate) fn render_symptoms(engine: &DiagnosisEngine, reason: Option<ConsultReason>) -> String {
    let catalog = engine.catalog();
    let mut out = String::new();
    let symptoms = match reason {
        Some(reason) => {
            let _ = writeln!(out, "Symptoms for {}", reason.label());
            catalog.symptoms_for_reason(reason)
        }
        None => {
            let _ = writeln!(out, "All symptoms");
            catalog.symptoms().iter().collect()
        }
    };

    for symptom in symptoms {
        let tags: Vec<&str> = symptom.tags.iter().map(String::as_str).collect();
        let _ = writeln!(
            out,
            "  {:<20} {}  [{}]",
            symptom.id,
            symptom.label,
            tags.join(", ")
        );
    }

    let _ = writeln!(out, "\nPrograms");
    for program in catalog.programs() {
        let _ = writeln!(out, "  {:<14} {}", program.id, program.name);
    }
    let floor = catalog
        .programs()
        .iter()
        .filter_map(|program| engine.price_range(&program.id).map(|range| range.min))
        .min()
        .unwrap_or_default();
    let _ = writeln!(out, "Treatments from {}", format_currency(floor as i64));

    out
}
