use log::{debug, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use url::Url;

mod config;
mod model;
mod status;
mod transport;

pub use config::{
    DEFAULT_API_URL, DEFAULT_START_URL, DEFAULT_TIMEOUT_SECS, SANDBOX_MERCHANT, ZibalConfig,
};
pub use model::{MerchantId, PaymentRequest, TrackId, Verification, VerificationResult};
pub use status::{
    PaymentStatus, RESULT_ALREADY_VERIFIED, RESULT_NOT_YET_PAID, RESULT_SUCCESS, Rejection,
};
pub use transport::{HttpTransport, Transport, TransportError};

use crate::{
    error::GatewayError,
    zibal::model::{PaymentRequestParams, PaymentRequestResponse, ResultEnvelope, VerifyParams},
};

const REQUEST_CONTEXT: &str = "POST /v1/request";
const VERIFY_CONTEXT: &str = "POST /v1/verify";

/// Client for the Zibal payment gateway.
///
/// Holds the merchant id and the endpoint URLs; every operation is a single
/// stateless round trip keyed by the caller-supplied [`TrackId`].
#[derive(Clone, Debug)]
pub struct GatewayClient<T = HttpTransport> {
    merchant: MerchantId,
    /// Full URL to `POST /v1/request` requests
    request_url: Url,
    /// Full URL to `POST /v1/verify` requests
    verify_url: Url,
    /// Payer-facing page the track id is appended to
    start_url: Url,
    transport: T,
}

impl GatewayClient<HttpTransport> {
    /// Constructs a client that talks to the provider over HTTP.
    pub fn try_new(config: &ZibalConfig) -> Result<Self, GatewayError> {
        let transport = HttpTransport::new(Duration::from_secs(config.timeout_secs))?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> GatewayClient<T> {
    /// Constructs a client on top of an arbitrary [`Transport`].
    ///
    /// This sets up `./request` and `./verify` endpoint URLs relative to
    /// `config.api_url`, which is treated as a directory whether or not it
    /// ends in `/`.
    pub fn with_transport(config: &ZibalConfig, transport: T) -> Result<Self, GatewayError> {
        let merchant = MerchantId::new(config.merchant.clone())?;
        let api_url = with_trailing_slash(&config.api_url);
        let request_url =
            api_url
                .join("./request")
                .map_err(|e| GatewayError::UrlParse {
                    context: "Failed to construct ./request URL",
                    source: e,
                })?;
        let verify_url =
            api_url
                .join("./verify")
                .map_err(|e| GatewayError::UrlParse {
                    context: "Failed to construct ./verify URL",
                    source: e,
                })?;
        Ok(Self {
            merchant,
            request_url,
            verify_url,
            start_url: config.start_url.clone(),
            transport,
        })
    }

    pub fn merchant(&self) -> &MerchantId {
        &self.merchant
    }

    /// Opens a payment on the gateway and returns its track id.
    ///
    /// The request is validated locally first; nothing is sent if any field
    /// has the wrong shape.
    pub async fn initiate_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<TrackId, GatewayError> {
        request.validate()?;
        info!(
            "Requesting payment: merchant={} amount={} order_id={:?}",
            self.merchant, request.amount, request.order_id
        );

        let params = PaymentRequestParams::new(&self.merchant, request);
        let body = self.post(&self.request_url, REQUEST_CONTEXT, &params).await?;
        let response: PaymentRequestResponse = decode(REQUEST_CONTEXT, body)?;

        if response.result == RESULT_SUCCESS {
            let track_id = response
                .track_id
                .ok_or_else(|| GatewayError::MalformedResponse {
                    endpoint: REQUEST_CONTEXT,
                    reason: "result 100 without trackId".to_string(),
                })?;
            info!("Payment request accepted: track_id={}", track_id);
            return Ok(track_id);
        }

        Err(reject(
            REQUEST_CONTEXT,
            response.result,
            response.message,
            Rejection::for_request,
        ))
    }

    /// URL the payer must be sent to in order to pay `track_id`.
    pub fn redirect_url(&self, track_id: TrackId) -> Url {
        let mut url = self.start_url.clone();
        let path = format!("{}/{}", url.path().trim_end_matches('/'), track_id);
        url.set_path(&path);
        url
    }

    /// Confirms a payment after the payer returns to the callback URL.
    ///
    /// A payment that is not paid yet, or that was confirmed before, is a
    /// normal outcome and comes back as a [`Verification`] variant.
    pub async fn verify_payment(&self, track_id: TrackId) -> Result<Verification, GatewayError> {
        info!(
            "Verifying payment: merchant={} track_id={}",
            self.merchant, track_id
        );
        let params = VerifyParams {
            merchant: &self.merchant,
            track_id,
        };
        let body = self.post(&self.verify_url, VERIFY_CONTEXT, &params).await?;
        let envelope: ResultEnvelope = decode(VERIFY_CONTEXT, body.clone())?;

        match envelope.result {
            RESULT_SUCCESS => {
                let result: VerificationResult = decode(VERIFY_CONTEXT, body)?;
                info!(
                    "Payment verified: track_id={} status={:?} amount={:?}",
                    track_id,
                    result.payment_status(),
                    result.amount
                );
                Ok(Verification::Verified(result))
            }
            RESULT_ALREADY_VERIFIED => {
                info!("Payment already verified: track_id={}", track_id);
                Ok(Verification::AlreadyVerified)
            }
            RESULT_NOT_YET_PAID => {
                info!("Payment not yet paid: track_id={}", track_id);
                Ok(Verification::NotYetPaid)
            }
            code => Err(reject(
                VERIFY_CONTEXT,
                code,
                envelope.message,
                Rejection::for_verify,
            )),
        }
    }

    async fn post<P: Serialize>(
        &self,
        url: &Url,
        context: &'static str,
        params: &P,
    ) -> Result<Value, GatewayError> {
        let payload = serde_json::to_value(params)
            .map_err(|e| GatewayError::JsonEncode { context, source: e })?;
        let body = self.transport.post_json(url, context, &payload).await?;
        debug!("{} replied: {}", context, body);
        Ok(body)
    }
}

fn with_trailing_slash(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn decode<R: DeserializeOwned>(context: &'static str, body: Value) -> Result<R, GatewayError> {
    serde_json::from_value(body).map_err(|e| GatewayError::MalformedResponse {
        endpoint: context,
        reason: e.to_string(),
    })
}

fn reject(
    context: &'static str,
    code: i64,
    message: Option<String>,
    classify: fn(i64) -> Option<Rejection>,
) -> GatewayError {
    match classify(code) {
        Some(rejection) => {
            warn!("{} rejected: result={} ({})", context, code, rejection);
            GatewayError::Rejected {
                endpoint: context,
                rejection,
            }
        }
        None => {
            warn!(
                "{} returned unrecognized result={} message={:?}",
                context, code, message
            );
            GatewayError::UnrecognizedStatus {
                endpoint: context,
                code,
                message,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Records every call and answers with a canned body.
    #[derive(Debug)]
    struct SpyTransport {
        reply: Value,
        calls: Mutex<Vec<(String, &'static str, Value)>>,
    }

    impl SpyTransport {
        fn replying(reply: Value) -> Self {
            Self {
                reply,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, &'static str, Value)> {
            self.calls.lock().clone()
        }
    }

    impl Transport for SpyTransport {
        fn post_json<'a>(
            &'a self,
            url: &'a Url,
            context: &'static str,
            payload: &'a Value,
        ) -> impl Future<Output = Result<Value, TransportError>> + Send + 'a {
            self.calls
                .lock()
                .push((url.to_string(), context, payload.clone()));
            let reply = self.reply.clone();
            async move { Ok(reply) }
        }
    }

    fn client(reply: Value) -> GatewayClient<SpyTransport> {
        let config = ZibalConfig::sandbox().unwrap();
        GatewayClient::with_transport(&config, SpyTransport::replying(reply)).unwrap()
    }

    #[test]
    fn blank_merchant_fails_construction() {
        let config = ZibalConfig::for_merchant("").unwrap();
        let err = GatewayClient::with_transport(&config, SpyTransport::replying(json!({})))
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::InvalidArgument {
                field: "merchant",
                ..
            }
        ));
    }

    #[test]
    fn endpoints_resolve_against_api_url() {
        let client = client(json!({}));
        assert_eq!(client.request_url.as_str(), "https://gateway.zibal.ir/v1/request");
        assert_eq!(client.verify_url.as_str(), "https://gateway.zibal.ir/v1/verify");
        assert_eq!(client.merchant().as_str(), "zibal");
    }

    #[test]
    fn api_url_without_trailing_slash_keeps_its_path() {
        let mut config = ZibalConfig::sandbox().unwrap();
        config.api_url = Url::parse("https://gateway.zibal.ir/v1").unwrap();
        let client = GatewayClient::with_transport(&config, SpyTransport::replying(json!({})))
            .unwrap();
        assert_eq!(client.request_url.as_str(), "https://gateway.zibal.ir/v1/request");
        assert_eq!(client.verify_url.as_str(), "https://gateway.zibal.ir/v1/verify");
    }

    #[tokio::test]
    async fn initiate_returns_track_id_on_success() {
        let client = client(json!({"result": 100, "trackId": 3726123664u64, "message": "success"}));
        let track_id = client
            .initiate_payment(&PaymentRequest::new(450_000, "https://cb"))
            .await
            .unwrap();
        assert_eq!(track_id, TrackId::new(3726123664));

        let calls = client.transport.calls();
        assert_eq!(calls.len(), 1);
        let (url, context, body) = &calls[0];
        assert_eq!(url, "https://gateway.zibal.ir/v1/request");
        assert_eq!(*context, REQUEST_CONTEXT);
        assert_eq!(body["merchant"], "zibal");
        assert_eq!(body["amount"], 450000);
        assert_eq!(body["callbackUrl"], "https://cb");
        assert_eq!(body["allowedCards"], json!([]));
        assert_eq!(body["nationalCode"], "");
    }

    #[tokio::test]
    async fn zero_amount_never_reaches_the_transport() {
        let client = client(json!({"result": 100, "trackId": 1}));
        let err = client
            .initiate_payment(&PaymentRequest::new(0, "https://cb"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::InvalidArgument {
                field: "amount",
                ..
            }
        ));
        assert!(client.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn schemeless_callback_is_judged_by_the_provider() {
        let client = client(json!({"result": 106}));
        let err = client
            .initiate_payment(
                &PaymentRequest::new(10_000, "shop.example/cb").allowed_cards(["6037-9912"]),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Rejected {
                rejection: Rejection::InvalidCallbackUrl,
                ..
            }
        ));

        let calls = client.transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].2["callbackUrl"], "shop.example/cb");
        assert_eq!(calls[0].2["allowedCards"], json!(["6037-9912"]));
    }

    #[tokio::test]
    async fn below_minimum_amount_is_a_rejection() {
        let client = client(json!({"result": 105, "message": "amount is less than 1000"}));
        let err = client
            .initiate_payment(&PaymentRequest::new(500, "https://cb"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Rejected {
                rejection: Rejection::AmountBelowMinimum,
                ..
            }
        ));
        assert!(err.to_string().contains("1,000 minor units"));
    }

    #[tokio::test]
    async fn each_request_failure_code_is_reported() {
        for code in [102, 103, 104, 105, 106, 113, 114] {
            let client = client(json!({"result": code}));
            let err = client
                .initiate_payment(&PaymentRequest::new(10_000, "https://cb"))
                .await
                .unwrap_err();
            match err {
                GatewayError::Rejected { rejection, endpoint } => {
                    assert_eq!(rejection.code(), code);
                    assert_eq!(endpoint, REQUEST_CONTEXT);
                }
                other => panic!("code {code}: unexpected {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn unknown_request_code_is_unrecognized() {
        let client = client(json!({"result": 999, "message": "mystery"}));
        let err = client
            .initiate_payment(&PaymentRequest::new(10_000, "https://cb"))
            .await
            .unwrap_err();
        match err {
            GatewayError::UnrecognizedStatus { code, message, .. } => {
                assert_eq!(code, 999);
                assert_eq!(message.as_deref(), Some("mystery"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn success_without_track_id_is_malformed() {
        let client = client(json!({"result": 100}));
        let err = client
            .initiate_payment(&PaymentRequest::new(10_000, "https://cb"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse { .. }));
    }

    #[test]
    fn redirect_url_appends_track_id() {
        let client = client(json!({}));
        let url = client.redirect_url(TrackId::new(3726418593));
        assert_eq!(url.as_str(), "https://gateway.zibal.ir/start/3726418593");
        assert!(client.transport.calls().is_empty());
    }

    #[test]
    fn redirect_url_tolerates_start_url_without_trailing_slash() {
        let mut config = ZibalConfig::sandbox().unwrap();
        config.start_url = Url::parse("https://gateway.zibal.ir/start").unwrap();
        let client = GatewayClient::with_transport(&config, SpyTransport::replying(json!({})))
            .unwrap();
        assert_eq!(
            client.redirect_url(TrackId::new(7)).as_str(),
            "https://gateway.zibal.ir/start/7"
        );
    }

    #[tokio::test]
    async fn verify_returns_full_mapping_on_success() {
        let client = client(json!({
            "result": 100,
            "paidAt": "2018-03-25T23:43:01.053000",
            "cardNumber": "62741****44",
            "status": 1,
            "amount": 1600,
            "refNumber": 1234567,
        }));
        let outcome = client.verify_payment(TrackId::new(3726418593)).await.unwrap();
        let Verification::Verified(result) = outcome else {
            panic!("expected Verified, got {outcome:?}");
        };
        assert_eq!(result.card_number.as_deref(), Some("62741****44"));
        assert_eq!(result.extra["refNumber"], 1234567);

        let calls = client.transport.calls();
        assert_eq!(calls[0].0, "https://gateway.zibal.ir/v1/verify");
        assert_eq!(calls[0].2, json!({"merchant": "zibal", "trackId": 3726418593u64}));
    }

    #[tokio::test]
    async fn verify_not_yet_paid_is_not_an_error() {
        let client = client(json!({"result": 202, "message": "order not paid"}));
        let outcome = client.verify_payment(TrackId::new(1)).await.unwrap();
        assert_eq!(outcome, Verification::NotYetPaid);
    }

    #[tokio::test]
    async fn verify_already_verified_is_not_an_error() {
        let client = client(json!({"result": 201}));
        let outcome = client.verify_payment(TrackId::new(1)).await.unwrap();
        assert_eq!(outcome, Verification::AlreadyVerified);
    }

    #[tokio::test]
    async fn verify_invalid_track_id_is_a_rejection() {
        let client = client(json!({"result": 203}));
        let err = client.verify_payment(TrackId::new(1)).await.unwrap_err();
        assert!(err.to_string().contains("trackId is invalid"));
        assert!(matches!(
            err,
            GatewayError::Rejected {
                rejection: Rejection::InvalidTrackId,
                endpoint: VERIFY_CONTEXT,
            }
        ));
    }

    #[tokio::test]
    async fn verify_unknown_code_is_unrecognized() {
        let client = client(json!({"result": 105}));
        let err = client.verify_payment(TrackId::new(1)).await.unwrap_err();
        assert!(matches!(err, GatewayError::UnrecognizedStatus { code: 105, .. }));
    }

    #[tokio::test]
    async fn track_id_flows_through_unchanged() {
        let client = client(json!({"result": 100, "trackId": 3726123664u64}));
        let track_id = client
            .initiate_payment(&PaymentRequest::new(450_000, "https://cb"))
            .await
            .unwrap();
        assert!(client.redirect_url(track_id).as_str().ends_with("/3726123664"));

        client.verify_payment(track_id).await.unwrap();
        let calls = client.transport.calls();
        assert_eq!(calls[1].2["trackId"], 3726123664u64);
    }
}
