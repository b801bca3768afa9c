//! services/studio/src/payment.rs
//!
//! Reads the `payment` flag the checkout page appends to the return URL.

use podcast_core::{FlowError, FlowResult};
use reqwest::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Success,
    Cancelled,
}

/// Result of consuming a return URL: the outcome (if the flag was present)
/// and the URL with the flag removed, so a reload does not replay it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReturn {
    pub outcome: Option<PaymentOutcome>,
    pub cleaned: Url,
}

impl PaymentReturn {
    const FLAG: &'static str = "payment";

    pub fn consume(url: &Url) -> Self {
        let mut outcome = None;
        let mut kept = Vec::new();
        for (key, value) in url.query_pairs() {
            if key == Self::FLAG {
                outcome = match value.to_ascii_lowercase().as_str() {
                    "success" => Some(PaymentOutcome::Success),
                    "cancelled" | "canceled" => Some(PaymentOutcome::Cancelled),
                    _ => outcome,
                };
            } else {
                kept.push((key.into_owned(), value.into_owned()));
            }
        }

        let mut cleaned = url.clone();
        if kept.is_empty() {
            cleaned.set_query(None);
        } else {
            cleaned.query_pairs_mut().clear().extend_pairs(&kept);
        }
        Self { outcome, cleaned }
    }

    pub fn parse(raw: &str) -> FlowResult<Self> {
        let url = Url::parse(raw.trim())
            .map_err(|e| FlowError::Validation(format!("'{}' is not a valid URL: {}", raw.trim(), e)))?;
        Ok(Self::consume(&url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_flag_is_read_and_stripped() {
        let ret = PaymentReturn::parse("https://app.example.test/?payment=success").unwrap();
        assert_eq!(ret.outcome, Some(PaymentOutcome::Success));
        assert_eq!(ret.cleaned.as_str(), "https://app.example.test/");
    }

    #[test]
    fn other_query_parameters_survive() {
        let ret = PaymentReturn::parse("https://app.example.test/home?tab=hoots&payment=canceled").unwrap();
        assert_eq!(ret.outcome, Some(PaymentOutcome::Cancelled));
        assert_eq!(ret.cleaned.as_str(), "https://app.example.test/home?tab=hoots");
    }

    #[test]
    fn no_flag_means_no_outcome() {
        let ret = PaymentReturn::parse("https://app.example.test/home?tab=hoots").unwrap();
        assert_eq!(ret.outcome, None);
        assert_eq!(ret.cleaned.as_str(), "https://app.example.test/home?tab=hoots");

        let unknown = PaymentReturn::parse("https://app.example.test/?payment=maybe").unwrap();
        assert_eq!(unknown.outcome, None);
        assert_eq!(unknown.cleaned.as_str(), "https://app.example.test/");
    }

    #[test]
    fn garbage_is_a_validation_error() {
        assert!(matches!(PaymentReturn::parse("not a url"), Err(FlowError::Validation(_))));
    }
}
