//! Mobile-money operations mounted under `/api/momo`.
//!
//! Only the balance check answers successfully; every other operation is a
//! placeholder that answers `501 Not Implemented` until a payment provider is
//! wired in.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult, FieldViolation};
use crate::middleware::ip::MaybeRemoteAddr;
use crate::state::AppState;
use crate::types::{timestamp_now, OperationResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MomoOperation {
    TransferToSubscriber,
    TransferToNetwork,
    BillPayment,
    BuyAirtime,
    BuyData,
    ScheduleAirtime,
    AllowCashout,
    BalanceCheck,
    MyApprovals,
    BankToWallet,
    WalletToBank,
    LoanRequest,
    Pay,
}

impl MomoOperation {
    pub const ALL: [MomoOperation; 13] = [
        MomoOperation::TransferToSubscriber,
        MomoOperation::TransferToNetwork,
        MomoOperation::BillPayment,
        MomoOperation::BuyAirtime,
        MomoOperation::BuyData,
        MomoOperation::ScheduleAirtime,
        MomoOperation::AllowCashout,
        MomoOperation::BalanceCheck,
        MomoOperation::MyApprovals,
        MomoOperation::BankToWallet,
        MomoOperation::WalletToBank,
        MomoOperation::LoanRequest,
        MomoOperation::Pay,
    ];

    /// Route path relative to `/api/momo`.
    pub fn path(self) -> &'static str {
        match self {
            MomoOperation::TransferToSubscriber => "/transfer-to-subscriber",
            MomoOperation::TransferToNetwork => "/transfer-to-network",
            MomoOperation::BillPayment => "/bill-payment",
            MomoOperation::BuyAirtime => "/buy-airtime",
            MomoOperation::BuyData => "/buy-data",
            MomoOperation::ScheduleAirtime => "/schedule-airtime",
            MomoOperation::AllowCashout => "/allow-cashout",
            MomoOperation::BalanceCheck => "/balance",
            MomoOperation::MyApprovals => "/approvals",
            MomoOperation::BankToWallet => "/bank-to-wallet",
            MomoOperation::WalletToBank => "/wallet-to-bank",
            MomoOperation::LoanRequest => "/loan-request",
            MomoOperation::Pay => "/pay",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MomoOperation::TransferToSubscriber => "Transfer to MoMo subscriber",
            MomoOperation::TransferToNetwork => "Transfer to other network",
            MomoOperation::BillPayment => "MoMo and bill payment",
            MomoOperation::BuyAirtime => "Buy airtime",
            MomoOperation::BuyData => "Buy data",
            MomoOperation::ScheduleAirtime => "Schedule airtime",
            MomoOperation::AllowCashout => "Allow cashout",
            MomoOperation::BalanceCheck => "Balance check",
            MomoOperation::MyApprovals => "My approvals",
            MomoOperation::BankToWallet => "Bank to wallet",
            MomoOperation::WalletToBank => "Wallet to bank",
            MomoOperation::LoanRequest => "Loan request",
            MomoOperation::Pay => "MoMo pay",
        }
    }

    /// Read-only operations are served on GET, everything else on POST.
    pub fn is_query(self) -> bool {
        matches!(self, MomoOperation::BalanceCheck | MomoOperation::MyApprovals)
    }

    pub fn is_implemented(self) -> bool {
        matches!(self, MomoOperation::BalanceCheck)
    }
}

/// Optional JSON object body.
///
/// An empty body is accepted as `None`. Malformed JSON is a 400 carrying the
/// parser message; valid JSON that is not an object is a validation failure
/// on `body`.
#[derive(Debug, Clone, Default)]
pub struct JsonPayload(pub Option<Map<String, Value>>);

impl<S> FromRequest<S> for JsonPayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::with_status(rejection.status(), rejection.body_text()))?;

        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(JsonPayload(None));
        }

        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::with_status(StatusCode::BAD_REQUEST, format!("Malformed JSON body: {}", e)))?;

        match value {
            Value::Object(map) => Ok(JsonPayload(Some(map))),
            other => Err(AppError::validation(
                "request body must be a JSON object",
                vec![FieldViolation::new(["body"], format!("expected an object, got {}", json_type(&other)))],
            )),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

async fn handle(
    op: MomoOperation,
    remote: MaybeRemoteAddr,
    headers: HeaderMap,
    JsonPayload(body): JsonPayload,
) -> AppResult<Response> {
    let user_agent = headers.get(USER_AGENT).and_then(|v| v.to_str().ok()).unwrap_or("-");
    let ip = remote.ip().map(|ip| ip.to_string()).unwrap_or_else(|| "unknown".to_string());
    tracing::info!(
        operation = op.label(),
        ip = %ip,
        user_agent,
        body_fields = body.as_ref().map(|b| b.len()).unwrap_or(0),
        "{} requested",
        op.label()
    );

    let (status, response) = if op.is_implemented() {
        (
            StatusCode::OK,
            OperationResponse {
                success: true,
                message: format!("{} successful", op.label()),
                timestamp: timestamp_now(),
            },
        )
    } else {
        (
            StatusCode::NOT_IMPLEMENTED,
            OperationResponse {
                success: false,
                message: format!("{} not implemented yet", op.label()),
                timestamp: timestamp_now(),
            },
        )
    };
    Ok((status, Json(response)).into_response())
}

/// The `/api/momo` route table. Authentication is layered on by the caller.
pub fn routes() -> Router<AppState> {
    MomoOperation::ALL.into_iter().fold(Router::new(), |router, op| {
        let handler = move |remote: MaybeRemoteAddr, headers: HeaderMap, payload: JsonPayload| {
            handle(op, remote, headers, payload)
        };
        let method_router = if op.is_query() { get(handler) } else { post(handler) };
        router.route(op.path(), method_router)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn paths_are_unique() {
        let paths: HashSet<_> = MomoOperation::ALL.iter().map(|op| op.path()).collect();
        assert_eq!(paths.len(), MomoOperation::ALL.len());
    }

    #[test]
    fn only_balance_is_implemented() {
        let implemented: Vec<_> = MomoOperation::ALL.into_iter().filter(|op| op.is_implemented()).collect();
        assert_eq!(implemented, vec![MomoOperation::BalanceCheck]);
    }

    #[tokio::test]
    async fn payload_rules() {
        let empty = Request::builder().body(axum::body::Body::empty()).unwrap();
        assert!(JsonPayload::from_request(empty, &()).await.unwrap().0.is_none());

        let object = Request::builder().body(axum::body::Body::from(r#"{"amount": 5}"#)).unwrap();
        assert_eq!(JsonPayload::from_request(object, &()).await.unwrap().0.unwrap()["amount"], 5);

        let array = Request::builder().body(axum::body::Body::from("[1,2]")).unwrap();
        let err = JsonPayload::from_request(array, &()).await.unwrap_err();
        assert_eq!(err.classify().0, StatusCode::BAD_REQUEST);
        assert_eq!(err.violations()[0].path, vec!["body".to_string()]);

        let broken = Request::builder().body(axum::body::Body::from("{nope")).unwrap();
        let err = JsonPayload::from_request(broken, &()).await.unwrap_err();
        let (status, message) = err.classify();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(message.starts_with("Malformed JSON body"));
    }
}
