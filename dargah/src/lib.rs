pub mod error;
pub mod zibal;

pub use error::GatewayError;
pub use zibal::{GatewayClient, PaymentRequest, TrackId, Verification, ZibalConfig};
