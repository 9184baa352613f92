//! Zibal `result` codes.
//!
//! Every provider reply carries an integer `result`. `100` always means the
//! call went through; the failure codes below are the ones the provider
//! documents for the request and verify endpoints.

/// Provider `result` code for a successful call.
pub const RESULT_SUCCESS: i64 = 100;
/// Verify only: the payment was already confirmed by an earlier call.
pub const RESULT_ALREADY_VERIFIED: i64 = 201;
/// Verify only: the payer has not completed (or has failed) the payment.
pub const RESULT_NOT_YET_PAID: i64 = 202;

/// A business-rule failure reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("merchant not found")]
    MerchantNotFound,
    #[error("merchant is inactive")]
    MerchantInactive,
    #[error("merchant is invalid")]
    MerchantInvalid,
    #[error("amount below minimum (1,000 minor units)")]
    AmountBelowMinimum,
    #[error("callback URL invalid (must start with http/https)")]
    InvalidCallbackUrl,
    #[error("amount exceeds transaction ceiling")]
    AmountAboveCeiling,
    #[error("national code invalid")]
    InvalidNationalCode,
    #[error("trackId is invalid")]
    InvalidTrackId,
}

impl Rejection {
    /// The provider code this rejection was decoded from.
    pub fn code(&self) -> i64 {
        match self {
            Rejection::MerchantNotFound => 102,
            Rejection::MerchantInactive => 103,
            Rejection::MerchantInvalid => 104,
            Rejection::AmountBelowMinimum => 105,
            Rejection::InvalidCallbackUrl => 106,
            Rejection::AmountAboveCeiling => 113,
            Rejection::InvalidNationalCode => 114,
            Rejection::InvalidTrackId => 203,
        }
    }

    /// Failure codes of `POST /v1/request`.
    pub fn for_request(code: i64) -> Option<Self> {
        match code {
            105 => Some(Rejection::AmountBelowMinimum),
            106 => Some(Rejection::InvalidCallbackUrl),
            113 => Some(Rejection::AmountAboveCeiling),
            114 => Some(Rejection::InvalidNationalCode),
            _ => Self::for_merchant(code),
        }
    }

    /// Failure codes of `POST /v1/verify`.
    pub fn for_verify(code: i64) -> Option<Self> {
        match code {
            203 => Some(Rejection::InvalidTrackId),
            _ => Self::for_merchant(code),
        }
    }

    fn for_merchant(code: i64) -> Option<Self> {
        match code {
            102 => Some(Rejection::MerchantNotFound),
            103 => Some(Rejection::MerchantInactive),
            104 => Some(Rejection::MerchantInvalid),
            _ => None,
        }
    }
}

/// State of a payment as reported in the verification `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    InternalError,
    AwaitingPayment,
    PaidVerified,
    PaidUnverified,
    CancelledByPayer,
    InvalidCardNumber,
    InsufficientBalance,
    WrongPin,
    TooManyRequests,
    DailyCountExceeded,
    DailyAmountExceeded,
    InvalidCardIssuer,
    SwitchError,
    CardNotAccessible,
    Refunded,
    Refunding,
    Reversed,
    Unknown(i64),
}

impl PaymentStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            -2 => PaymentStatus::InternalError,
            -1 => PaymentStatus::AwaitingPayment,
            1 => PaymentStatus::PaidVerified,
            2 => PaymentStatus::PaidUnverified,
            3 => PaymentStatus::CancelledByPayer,
            4 => PaymentStatus::InvalidCardNumber,
            5 => PaymentStatus::InsufficientBalance,
            6 => PaymentStatus::WrongPin,
            7 => PaymentStatus::TooManyRequests,
            8 => PaymentStatus::DailyCountExceeded,
            9 => PaymentStatus::DailyAmountExceeded,
            10 => PaymentStatus::InvalidCardIssuer,
            11 => PaymentStatus::SwitchError,
            12 => PaymentStatus::CardNotAccessible,
            15 => PaymentStatus::Refunded,
            16 => PaymentStatus::Refunding,
            18 => PaymentStatus::Reversed,
            other => PaymentStatus::Unknown(other),
        }
    }

    /// Money has left the payer's card.
    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::PaidVerified | PaymentStatus::PaidUnverified)
    }
}
