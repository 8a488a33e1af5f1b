use serde::{Deserialize, Serialize};

use crate::diagnosis::DiagnosticResult;

const MIN_PHONE_DIGITS: usize = 8;
const MAX_PHONE_DIGITS: usize = 15;

/// Patient contact captured on the final wizard screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContactError {
    #[error("contact name is required")]
    MissingName,
    #[error("phone number must contain between 8 and 15 digits (found {0})")]
    InvalidPhone(usize),
    #[error("email address '{0}' is not valid")]
    InvalidEmail(String),
}

impl ContactDetails {
    /// Trimmed copy with the phone reduced to digits.
    pub fn normalized(&self) -> Result<Self, ContactError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ContactError::MissingName);
        }

        let phone = phone_digits(&self.phone);
        if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&phone.len()) {
            return Err(ContactError::InvalidPhone(phone.len()));
        }

        let email = match self.email.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => {
                let valid = value
                    .split_once('@')
                    .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
                    .unwrap_or(false);
                if !valid {
                    return Err(ContactError::InvalidEmail(value.to_string()));
                }
                Some(value.to_string())
            }
        };

        Ok(Self {
            name: name.to_string(),
            phone,
            email,
        })
    }
}

pub fn phone_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Message sent to the clinic's WhatsApp line.
pub fn whatsapp_message(patient_name: Option<&str>, result: &DiagnosticResult) -> String {
    let greeting = match patient_name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => format!("Hola, soy {name}."),
        None => "Hola.".to_string(),
    };

    format!(
        "{greeting} Completé la evaluación en línea y me recomendaron el programa {}. Urgencia: {}. Quiero agendar una evaluación.",
        result.program.name,
        result.urgency.label()
    )
}

/// `https://wa.me/<digits>?text=<percent-encoded message>`.
pub fn whatsapp_link(
    clinic_number: &str,
    patient_name: Option<&str>,
    result: &DiagnosticResult,
) -> String {
    let message = whatsapp_message(patient_name, result);
    format!(
        "https://wa.me/{}?text={}",
        phone_digits(clinic_number),
        urlencoding::encode(&message)
    )
}
