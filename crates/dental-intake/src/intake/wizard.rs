use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::contact::{ContactDetails, ContactError};
use super::financing::{FinancingError, FinancingEstimate};
use super::second_opinion::{validate_photo, UploadDescriptor, UploadError};
use crate::diagnosis::{ConsultReason, DiagnosisEngine, DiagnosticInput, DiagnosticResult, Urgency};

pub const MAX_PHOTOS: usize = 5;

/// Screens of the intake wizard, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Reason,
    Symptoms,
    Photos,
    Result,
    Financing,
    Contact,
}

impl WizardStep {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Reason => "Motivo de consulta",
            Self::Symptoms => "Síntomas y urgencia",
            Self::Photos => "Fotos",
            Self::Result => "Resultado",
            Self::Financing => "Financiamiento",
            Self::Contact => "Contacto",
        }
    }

    const fn previous(self) -> Option<Self> {
        match self {
            Self::Reason => None,
            Self::Symptoms => Some(Self::Reason),
            Self::Photos => Some(Self::Symptoms),
            Self::Result => Some(Self::Photos),
            Self::Financing => Some(Self::Result),
            Self::Contact => Some(Self::Financing),
        }
    }
}

/// User actions the wizard reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WizardEvent {
    SelectReason { reason: ConsultReason },
    ToggleSymptom { symptom_id: String },
    SetUrgency { urgency: Urgency },
    AttachPhoto { photo: UploadDescriptor },
    RemovePhoto { file_name: String },
    ChooseFinancing {
        amount: Option<u64>,
        installments: Option<u32>,
    },
    ProvideContact { contact: ContactDetails },
    Advance,
    Back,
    Restart,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("'{event}' is not available on the {step:?} step")]
    WrongStep { step: WizardStep, event: &'static str },
    #[error("choose a consultation reason first")]
    MissingReason,
    #[error("choose how soon you need care")]
    MissingUrgency,
    #[error("no diagnosis has been computed for this session")]
    MissingResult,
    #[error("contact details have not been provided")]
    MissingContact,
    #[error("unknown symptom '{0}'")]
    UnknownSymptom(String),
    #[error("symptom '{symptom_id}' does not apply to reason {reason}")]
    SymptomNotApplicable {
        symptom_id: String,
        reason: ConsultReason,
    },
    #[error("at most 5 photos can be attached")]
    TooManyPhotos,
    #[error("cannot leave the contact step; submit the lead instead")]
    Finished,
    #[error(transparent)]
    Financing(#[from] FinancingError),
    #[error(transparent)]
    Contact(#[from] ContactError),
    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// Whole wizard state, threaded through [`IntakeSession::apply`] one event at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeSession {
    pub step: WizardStep,
    pub reason: Option<ConsultReason>,
    pub symptom_ids: BTreeSet<String>,
    pub urgency: Option<Urgency>,
    pub photos: Vec<UploadDescriptor>,
    pub result: Option<DiagnosticResult>,
    pub financing: Option<FinancingEstimate>,
    pub contact: Option<ContactDetails>,
}

impl Default for IntakeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl IntakeSession {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Reason,
            reason: None,
            symptom_ids: BTreeSet::new(),
            urgency: None,
            photos: Vec::new(),
            result: None,
            financing: None,
            contact: None,
        }
    }

    /// Engine input once reason and urgency are both known.
    pub fn diagnostic_input(&self) -> Result<DiagnosticInput, WizardError> {
        Ok(DiagnosticInput {
            reason: self.reason.ok_or(WizardError::MissingReason)?,
            symptom_ids: self.symptom_ids.clone(),
            urgency: self.urgency.ok_or(WizardError::MissingUrgency)?,
            has_photo: !self.photos.is_empty(),
        })
    }

    pub fn is_complete(&self) -> bool {
        self.step == WizardStep::Contact && self.contact.is_some() && self.result.is_some()
    }

    pub fn apply(
        mut self,
        event: WizardEvent,
        engine: &DiagnosisEngine,
    ) -> Result<Self, WizardError> {
        match (self.step, event) {
            (_, WizardEvent::Restart) => Ok(Self::new()),

            (step, WizardEvent::Back) => {
                if let Some(previous) = step.previous() {
                    self.step = previous;
                    // Results depend on everything before them.
                    if previous <= WizardStep::Photos {
                        self.result = None;
                        self.financing = None;
                    }
                }
                Ok(self)
            }

            (WizardStep::Reason, WizardEvent::SelectReason { reason }) => {
                let catalog = engine.catalog();
                self.symptom_ids.retain(|id| {
                    catalog
                        .symptom(id)
                        .map(|symptom| symptom.applies_to(reason))
                        .unwrap_or(false)
                });
                self.reason = Some(reason);
                Ok(self)
            }
            (WizardStep::Reason, WizardEvent::Advance) => {
                self.reason.ok_or(WizardError::MissingReason)?;
                self.step = WizardStep::Symptoms;
                Ok(self)
            }

            (WizardStep::Symptoms, WizardEvent::ToggleSymptom { symptom_id }) => {
                let reason = self.reason.ok_or(WizardError::MissingReason)?;
                let symptom = engine
                    .catalog()
                    .symptom(&symptom_id)
                    .ok_or_else(|| WizardError::UnknownSymptom(symptom_id.clone()))?;
                if !symptom.applies_to(reason) {
                    return Err(WizardError::SymptomNotApplicable { symptom_id, reason });
                }
                if !self.symptom_ids.remove(&symptom_id) {
                    self.symptom_ids.insert(symptom_id);
                }
                Ok(self)
            }
            (WizardStep::Symptoms, WizardEvent::SetUrgency { urgency }) => {
                self.urgency = Some(urgency);
                Ok(self)
            }
            (WizardStep::Symptoms, WizardEvent::Advance) => {
                self.urgency.ok_or(WizardError::MissingUrgency)?;
                self.step = WizardStep::Photos;
                Ok(self)
            }

            (WizardStep::Photos, WizardEvent::AttachPhoto { photo }) => {
                if self.photos.len() >= MAX_PHOTOS {
                    return Err(WizardError::TooManyPhotos);
                }
                validate_photo(&photo)?;
                self.photos.push(photo);
                Ok(self)
            }
            (WizardStep::Photos, WizardEvent::RemovePhoto { file_name }) => {
                self.photos.retain(|photo| photo.file_name != file_name);
                Ok(self)
            }
            (WizardStep::Photos, WizardEvent::Advance) => {
                let input = self.diagnostic_input()?;
                self.result = Some(engine.diagnose(&input));
                self.step = WizardStep::Result;
                Ok(self)
            }

            (WizardStep::Result, WizardEvent::Advance) => {
                let range = self
                    .result
                    .as_ref()
                    .map(|result| result.price_estimate)
                    .ok_or(WizardError::MissingResult)?;
                self.financing = Some(FinancingEstimate::seeded(range));
                self.step = WizardStep::Financing;
                Ok(self)
            }

            (
                WizardStep::Financing,
                WizardEvent::ChooseFinancing {
                    amount,
                    installments,
                },
            ) => {
                let range = self
                    .financing
                    .map(|estimate| estimate.range)
                    .ok_or(WizardError::MissingResult)?;
                self.financing = Some(FinancingEstimate::new(range, amount, installments)?);
                Ok(self)
            }
            (WizardStep::Financing, WizardEvent::Advance) => {
                self.step = WizardStep::Contact;
                Ok(self)
            }

            (WizardStep::Contact, WizardEvent::ProvideContact { contact }) => {
                self.contact = Some(contact.normalized()?);
                Ok(self)
            }
            (WizardStep::Contact, WizardEvent::Advance) => Err(WizardError::Finished),

            (step, event) => Err(WizardError::WrongStep {
                step,
                event: event.name(),
            }),
        }
    }
}

impl WizardEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SelectReason { .. } => "select_reason",
            Self::ToggleSymptom { .. } => "toggle_symptom",
            Self::SetUrgency { .. } => "set_urgency",
            Self::AttachPhoto { .. } => "attach_photo",
            Self::RemovePhoto { .. } => "remove_photo",
            Self::ChooseFinancing { .. } => "choose_financing",
            Self::ProvideContact { .. } => "provide_contact",
            Self::Advance => "advance",
            Self::Back => "back",
            Self::Restart => "restart",
        }
    }
}
