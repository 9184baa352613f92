use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::GatewayError;
use crate::zibal::status::PaymentStatus;

/// Merchant identifier assigned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MerchantId(String);

impl MerchantId {
    pub fn new(merchant: impl Into<String>) -> Result<Self, GatewayError> {
        let merchant = merchant.into();
        if merchant.trim().is_empty() {
            return Err(GatewayError::invalid_argument(
                "merchant",
                "non-empty merchant id",
                merchant,
            ));
        }
        Ok(Self(merchant))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MerchantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provider-assigned id of one payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(u64);

impl TrackId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for TrackId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A payment to open on the gateway.
///
/// Only `amount` and `callback_url` are required; the provider treats empty
/// optional fields as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentRequest {
    /// In minor currency units (Rials).
    pub amount: u64,
    pub callback_url: String,
    pub description: String,
    pub order_id: String,
    pub mobile: String,
    /// Restricts the payment to these card numbers when non-empty.
    pub allowed_cards: Vec<String>,
    pub ledger_id: String,
    pub national_code: String,
}

impl PaymentRequest {
    pub fn new(amount: u64, callback_url: impl Into<String>) -> Self {
        Self {
            amount,
            callback_url: callback_url.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = order_id.into();
        self
    }

    pub fn mobile(mut self, mobile: impl Into<String>) -> Self {
        self.mobile = mobile.into();
        self
    }

    pub fn allowed_cards<I, S>(mut self, cards: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_cards = cards.into_iter().map(Into::into).collect();
        self
    }

    pub fn ledger_id(mut self, ledger_id: impl Into<String>) -> Self {
        self.ledger_id = ledger_id.into();
        self
    }

    pub fn national_code(mut self, national_code: impl Into<String>) -> Self {
        self.national_code = national_code.into();
        self
    }

    /// Checks the shape of the request. Business rules (minimum amount,
    /// callback scheme, card and national code checks) are left to the
    /// provider.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.amount == 0 {
            return Err(GatewayError::invalid_argument(
                "amount",
                "positive amount in minor units",
                self.amount.to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaymentRequestParams<'a> {
    pub merchant: &'a MerchantId,
    pub amount: u64,
    pub callback_url: &'a str,
    pub description: &'a str,
    pub order_id: &'a str,
    pub mobile: &'a str,
    pub allowed_cards: &'a [String],
    pub ledger_id: &'a str,
    pub national_code: &'a str,
}

impl<'a> PaymentRequestParams<'a> {
    pub fn new(merchant: &'a MerchantId, request: &'a PaymentRequest) -> Self {
        Self {
            merchant,
            amount: request.amount,
            callback_url: &request.callback_url,
            description: &request.description,
            order_id: &request.order_id,
            mobile: &request.mobile,
            allowed_cards: &request.allowed_cards,
            ledger_id: &request.ledger_id,
            national_code: &request.national_code,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaymentRequestResponse {
    pub result: i64,
    pub track_id: Option<TrackId>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VerifyParams<'a> {
    pub merchant: &'a MerchantId,
    pub track_id: TrackId,
}

/// Reply of the verify endpoint, used to branch on `result` before the body
/// is interpreted as a [`VerificationResult`].
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResultEnvelope {
    pub result: i64,
    pub message: Option<String>,
}

/// Details of a confirmed payment.
///
/// Fields the provider adds beyond the named ones are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub result: i64,
    #[serde(default)]
    pub paid_at: Option<String>,
    /// Masked, e.g. `62741****44`.
    #[serde(default)]
    pub card_number: Option<String>,
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VerificationResult {
    /// `paidAt` as a timestamp. The provider sends local time without an
    /// offset; RFC 3339 values are accepted too.
    pub fn paid_at_time(&self) -> Option<NaiveDateTime> {
        let raw = self.paid_at.as_deref()?;
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|dt| dt.naive_local())
            })
    }

    pub fn payment_status(&self) -> Option<PaymentStatus> {
        self.status.map(PaymentStatus::from_code)
    }
}

/// Outcome of a verify call that the provider did not reject.
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    Verified(VerificationResult),
    /// A previous verify call already confirmed this payment.
    AlreadyVerified,
    /// The payer has not finished paying, or the payment failed.
    NotYetPaid,
}
