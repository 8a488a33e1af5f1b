use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::domain::{ConsultReason, ProgramOption, SymptomOption, UnknownSlug};

pub const ZERO_CARIES: &str = "zero-caries";
pub const IMPLANT_ONE: &str = "implant-one";
pub const SMILE_DESIGN: &str = "smile-design";
pub const ALIGN_PRO: &str = "align-pro";

/// The clinic offers exactly this many programs.
pub const PROGRAM_COUNT: usize = 4;

/// Read-only symptom and program tables, indexed by id.
#[derive(Debug, Clone)]
pub struct Catalog {
    symptoms: Vec<SymptomOption>,
    programs: Vec<ProgramOption>,
    symptom_index: HashMap<String, usize>,
    program_index: HashMap<String, usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    UnknownReason(#[from] UnknownSlug),
    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },
    #[error("{kind} '{id}' has no {field}")]
    MissingField {
        kind: &'static str,
        id: String,
        field: &'static str,
    },
    #[error("expected 4 programs, found {0}")]
    ProgramCount(usize),
}

impl Catalog {
    /// Built-in catalog used when no override directory is configured.
    pub fn standard() -> Self {
        Self::index(standard_symptoms(), standard_programs())
            .expect("built-in catalog is consistent")
    }

    pub fn new(
        symptoms: Vec<SymptomOption>,
        programs: Vec<ProgramOption>,
    ) -> Result<Self, CatalogError> {
        for symptom in &symptoms {
            if symptom.reasons.is_empty() {
                return Err(CatalogError::MissingField {
                    kind: "symptom",
                    id: symptom.id.clone(),
                    field: "reasons",
                });
            }
            if symptom.tags.is_empty() {
                return Err(CatalogError::MissingField {
                    kind: "symptom",
                    id: symptom.id.clone(),
                    field: "tags",
                });
            }
        }

        if programs.len() != PROGRAM_COUNT {
            return Err(CatalogError::ProgramCount(programs.len()));
        }
        for program in &programs {
            if program.keywords.is_empty() {
                return Err(CatalogError::MissingField {
                    kind: "program",
                    id: program.id.clone(),
                    field: "keywords",
                });
            }
        }

        Self::index(symptoms, programs)
    }

    fn index(
        symptoms: Vec<SymptomOption>,
        programs: Vec<ProgramOption>,
    ) -> Result<Self, CatalogError> {
        let mut symptom_index = HashMap::with_capacity(symptoms.len());
        for (position, symptom) in symptoms.iter().enumerate() {
            if symptom_index.insert(symptom.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateId {
                    kind: "symptom",
                    id: symptom.id.clone(),
                });
            }
        }

        let mut program_index = HashMap::with_capacity(programs.len());
        for (position, program) in programs.iter().enumerate() {
            if program_index.insert(program.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateId {
                    kind: "program",
                    id: program.id.clone(),
                });
            }
        }

        Ok(Self {
            symptoms,
            programs,
            symptom_index,
            program_index,
        })
    }

    /// Load both tables from a directory holding `symptoms.csv` and `programs.csv`.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, CatalogError> {
        let dir = dir.as_ref();
        let symptoms = std::fs::File::open(dir.join("symptoms.csv"))?;
        let programs = std::fs::File::open(dir.join("programs.csv"))?;
        Self::from_csv_readers(symptoms, programs)
    }

    /// Multi-valued columns (`reasons`, `tags`, `keywords`) are pipe separated.
    pub fn from_csv_readers<S: Read, P: Read>(
        symptoms: S,
        programs: P,
    ) -> Result<Self, CatalogError> {
        let mut symptom_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(symptoms);
        let mut parsed_symptoms = Vec::new();
        for row in symptom_reader.deserialize::<SymptomRow>() {
            parsed_symptoms.push(row?.into_option()?);
        }

        let mut program_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(programs);
        let mut parsed_programs = Vec::new();
        for row in program_reader.deserialize::<ProgramRow>() {
            parsed_programs.push(row?.into_option());
        }

        Self::new(parsed_symptoms, parsed_programs)
    }

    pub fn symptoms(&self) -> &[SymptomOption] {
        &self.symptoms
    }

    pub fn programs(&self) -> &[ProgramOption] {
        &self.programs
    }

    pub fn symptom(&self, id: &str) -> Option<&SymptomOption> {
        self.symptom_index.get(id).map(|&pos| &self.symptoms[pos])
    }

    pub fn program(&self, id: &str) -> Option<&ProgramOption> {
        self.program_index.get(id).map(|&pos| &self.programs[pos])
    }

    /// Symptoms offered for a reason, in catalog order.
    pub fn symptoms_for_reason(&self, reason: ConsultReason) -> Vec<&SymptomOption> {
        self.symptoms
            .iter()
            .filter(|symptom| symptom.applies_to(reason))
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Deserialize)]
struct SymptomRow {
    id: String,
    label: String,
    reasons: String,
    weight: u8,
    tags: String,
}

impl SymptomRow {
    fn into_option(self) -> Result<SymptomOption, UnknownSlug> {
        let reasons = split_pipes(&self.reasons)
            .into_iter()
            .map(|slug| slug.parse::<ConsultReason>())
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(SymptomOption {
            id: self.id,
            label: self.label,
            reasons,
            weight: self.weight,
            tags: split_pipes(&self.tags),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ProgramRow {
    id: String,
    name: String,
    tagline: String,
    description: String,
    url: String,
    keywords: String,
}

impl ProgramRow {
    fn into_option(self) -> ProgramOption {
        ProgramOption {
            keywords: split_pipes(&self.keywords),
            id: self.id,
            name: self.name,
            tagline: self.tagline,
            description: self.description,
            url: self.url,
        }
    }
}

fn split_pipes(raw: &str) -> BTreeSet<String> {
    raw.split('|')
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .collect()
}

fn tags(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn symptom(
    id: &str,
    label: &str,
    reasons: &[ConsultReason],
    weight: u8,
    symptom_tags: &[&str],
) -> SymptomOption {
    SymptomOption {
        id: id.to_string(),
        label: label.to_string(),
        reasons: reasons.iter().copied().collect(),
        weight,
        tags: tags(symptom_tags),
    }
}

fn standard_symptoms() -> Vec<SymptomOption> {
    use ConsultReason::*;

    vec![
        symptom(
            "dolor-muelas",
            "Dolor de muelas o al masticar",
            &[Dolor],
            3,
            &["caries", "dolor", "endodoncia"],
        ),
        symptom(
            "sensibilidad",
            "Sensibilidad al frío o al calor",
            &[Dolor, Prevencion],
            2,
            &["sensibilidad", "caries", "esmalte"],
        ),
        symptom(
            "encias-sangrantes",
            "Encías que sangran o están inflamadas",
            &[Dolor, Prevencion],
            2,
            &["periodontal", "encias"],
        ),
        symptom(
            "mal-aliento",
            "Mal aliento persistente",
            &[Prevencion],
            1,
            &["periodontal", "higiene"],
        ),
        symptom(
            "dientes-flojos",
            "Dientes que se mueven",
            &[Dolor, Implantes],
            3,
            &["periodontal", "perdida-dental"],
        ),
        symptom(
            "diente-perdido",
            "Me falta uno o más dientes",
            &[Implantes],
            3,
            &["perdida-dental", "implante", "hueso"],
        ),
        symptom(
            "protesis-incomoda",
            "Mi prótesis se suelta o molesta",
            &[Implantes],
            2,
            &["protesis", "implante"],
        ),
        symptom(
            "dientes-manchados",
            "Dientes manchados u oscuros",
            &[Estetica],
            1,
            &["color", "blanqueamiento"],
        ),
        symptom(
            "dientes-desgastados",
            "Dientes desgastados o quebrados",
            &[Estetica, Dolor],
            2,
            &["desgaste", "esmalte", "bruxismo"],
        ),
        symptom(
            "rechinar",
            "Aprieto o rechino los dientes",
            &[Dolor, Estetica],
            2,
            &["bruxismo", "atm"],
        ),
        symptom(
            "dientes-chuecos",
            "Dientes chuecos o apiñados",
            &[Ortodoncia, Estetica],
            2,
            &["alineacion", "ortodoncia"],
        ),
        symptom(
            "mordida",
            "Problemas de mordida",
            &[Ortodoncia],
            2,
            &["mordida", "ortodoncia", "atm"],
        ),
        symptom(
            "limpieza",
            "Necesito una limpieza",
            &[Prevencion],
            1,
            &["higiene", "prevencion"],
        ),
        symptom(
            "revision-general",
            "Quiero una revisión general",
            &[Prevencion],
            1,
            &["prevencion", "control"],
        ),
    ]
}

fn standard_programs() -> Vec<ProgramOption> {
    vec![
        ProgramOption {
            id: ZERO_CARIES.to_string(),
            name: "Programa Zero Caries".to_string(),
            tagline: "Salud bucal completa, sin sorpresas".to_string(),
            description: "Diagnóstico integral, limpieza profunda, tratamiento de caries y control periodontal en un plan por etapas.".to_string(),
            url: "/programas/zero-caries".to_string(),
            keywords: tags(&[
                "caries",
                "dolor",
                "endodoncia",
                "sensibilidad",
                "esmalte",
                "periodontal",
                "encias",
                "higiene",
                "prevencion",
                "control",
            ]),
        },
        ProgramOption {
            id: IMPLANT_ONE.to_string(),
            name: "Implant One".to_string(),
            tagline: "Recupera tus dientes con implantes".to_string(),
            description: "Evaluación con escáner 3D, planificación guiada e implantes con corona definitiva.".to_string(),
            url: "/programas/implant-one".to_string(),
            keywords: tags(&["perdida-dental", "implante", "hueso", "protesis"]),
        },
        ProgramOption {
            id: SMILE_DESIGN.to_string(),
            name: "Smile Design".to_string(),
            tagline: "Diseña la sonrisa que quieres".to_string(),
            description: "Diseño digital de sonrisa, blanqueamiento, carillas y rehabilitación del desgaste.".to_string(),
            url: "/programas/smile-design".to_string(),
            keywords: tags(&["color", "blanqueamiento", "desgaste", "bruxismo", "estetica"]),
        },
        ProgramOption {
            id: ALIGN_PRO.to_string(),
            name: "Align Pro".to_string(),
            tagline: "Ortodoncia invisible y brackets".to_string(),
            description: "Alineadores transparentes o brackets con controles mensuales y retención incluida.".to_string(),
            url: "/programas/align-pro".to_string(),
            keywords: tags(&["alineacion", "ortodoncia", "mordida", "atm"]),
        },
    ]
}
