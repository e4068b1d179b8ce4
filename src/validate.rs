// src/validate.rs
use crate::error::{DashboardError, Result};
use std::collections::HashMap;

/// Raw field values of a form, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormInput {
    fields: HashMap<String, String>,
}

impl FormInput {
    pub fn new() -> Self {
        FormInput::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        self.fields.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn reset(&mut self) {
        self.fields.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.fields.values().all(|v| v.is_empty())
    }
}

pub fn symbol(input: &FormInput, field: &str) -> Result<String> {
    let symbol = input.get(field).trim().to_uppercase();
    if symbol.is_empty() {
        return Err(DashboardError::Validation("Enter a symbol.".into()));
    }
    Ok(symbol)
}

fn number(input: &FormInput, field: &str, label: &str) -> Result<f64> {
    input
        .get(field)
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| DashboardError::Validation(format!("{} must be a number.", label)))
}

pub fn amount(input: &FormInput, field: &str) -> Result<f64> {
    let amount = number(input, field, "Amount")?;
    if amount <= 0.0 {
        return Err(DashboardError::Validation("Amount must be greater than zero.".into()));
    }
    Ok(amount)
}

pub fn threshold(input: &FormInput, field: &str) -> Result<f64> {
    number(input, field, "Threshold")
}

/// A removal may not exceed what is held.
pub fn removal_amount(input: &FormInput, field: &str, held: f64) -> Result<f64> {
    let amount = amount(input, field)?;
    if amount > held {
        return Err(DashboardError::Validation(format!(
            "Cannot remove more than the held {}.",
            held
        )));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_is_trimmed_and_uppercased() {
        let input = FormInput::new().with("crypto", "  btc ");
        assert_eq!(symbol(&input, "crypto").unwrap(), "BTC");
        assert!(symbol(&FormInput::new().with("crypto", "   "), "crypto").is_err());
        assert!(symbol(&FormInput::new(), "crypto").is_err());
    }

    #[test]
    fn amount_rejects_non_numeric_and_non_positive() {
        for bad in ["", "abc", "NaN", "inf", "0", "-1.5"] {
            let input = FormInput::new().with("amount", bad);
            assert!(
                matches!(amount(&input, "amount"), Err(DashboardError::Validation(_))),
                "accepted {:?}",
                bad
            );
        }
        let input = FormInput::new().with("amount", "0.25");
        assert_eq!(amount(&input, "amount").unwrap(), 0.25);
    }

    #[test]
    fn threshold_allows_zero_but_not_nan() {
        assert_eq!(threshold(&FormInput::new().with("t", "0"), "t").unwrap(), 0.0);
        assert!(threshold(&FormInput::new().with("t", "NaN"), "t").is_err());
    }

    #[test]
    fn removal_is_capped_at_the_held_amount() {
        let input = FormInput::new().with("amount", "1.5");
        assert_eq!(removal_amount(&input, "amount", 1.5).unwrap(), 1.5);
        assert!(removal_amount(&input, "amount", 1.0).is_err());
    }

    #[test]
    fn reset_clears_fields() {
        let mut input = FormInput::new().with("crypto", "BTC");
        assert!(!input.is_empty());
        input.reset();
        assert!(input.is_empty());
        assert_eq!(input.get("crypto"), "");
    }
}
