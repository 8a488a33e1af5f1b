use serde::{Deserialize, Serialize};

use crate::diagnosis::{format_currency, PriceRange};

pub const INSTALLMENT_OPTIONS: [u32; 6] = [1, 3, 6, 12, 18, 24];
pub const DEFAULT_INSTALLMENTS: u32 = 12;

/// Slider state plus the derived monthly payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingEstimate {
    pub range: PriceRange,
    pub amount: u64,
    pub installments: u32,
    pub monthly_payment: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FinancingError {
    #[error("{0} installments not offered (choose one of 1, 3, 6, 12, 18, 24)")]
    UnsupportedInstallments(u32),
    #[error("price range is inverted ({min} > {max})")]
    InvertedRange { min: u64, max: u64 },
}

impl FinancingEstimate {
    /// Seeded at the range midpoint with the default installment count.
    pub fn seeded(range: PriceRange) -> Self {
        Self::compute(range, range.midpoint(), DEFAULT_INSTALLMENTS)
    }

    pub fn new(
        range: PriceRange,
        amount: Option<u64>,
        installments: Option<u32>,
    ) -> Result<Self, FinancingError> {
        if range.min > range.max {
            return Err(FinancingError::InvertedRange {
                min: range.min,
                max: range.max,
            });
        }

        let installments = installments.unwrap_or(DEFAULT_INSTALLMENTS);
        if !INSTALLMENT_OPTIONS.contains(&installments) {
            return Err(FinancingError::UnsupportedInstallments(installments));
        }

        let amount = range.clamp(amount.unwrap_or_else(|| range.midpoint()));
        Ok(Self::compute(range, amount, installments))
    }

    fn compute(range: PriceRange, amount: u64, installments: u32) -> Self {
        let monthly_payment = amount.div_ceil(u64::from(installments));
        Self {
            range,
            amount,
            installments,
            monthly_payment,
        }
    }

    pub fn summary(&self) -> String {
        if self.installments == 1 {
            format!("{} al contado", format_currency(self.amount as i64))
        } else {
            format!(
                "{} cuotas de {} (total {})",
                self.installments,
                format_currency(self.monthly_payment as i64),
                format_currency(self.amount as i64)
            )
        }
    }
}
