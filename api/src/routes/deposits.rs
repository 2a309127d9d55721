//! The deposit side of the LNURL handshake (§4.D Deposit 1-3, §6).

use app::request_flow;
use rocket::{get, serde::json::Json, State};
use serde::Serialize;

use crate::access::AuthGuard;
use crate::error::{self, JsonResult};
use crate::lnurl_response::LnurlErrorResponse;
use crate::state::RocketState;

#[derive(Debug, Serialize)]
pub(super) struct DepositRequestResponse {
    lnurl: String,
    lnurlp: String,
}

#[derive(Debug, Serialize)]
struct LnurlPayResponse {
    tag: &'static str,
    callback: String,
    #[serde(rename = "minSendable")]
    min_sendable: i64,
    #[serde(rename = "maxSendable")]
    max_sendable: i64,
    metadata: String,
}

#[derive(Debug, Serialize)]
struct SuccessAction {
    tag: &'static str,
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct LnurlPayActionResponse {
    pr: String,
    routes: Vec<()>,
    #[serde(rename = "successAction")]
    success_action: SuccessAction,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum DepositCallbackResponse {
    Ok(LnurlPayResponse),
    Err(LnurlErrorResponse),
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum DepositInvoiceResponse {
    Ok(LnurlPayActionResponse),
    Err(LnurlErrorResponse),
}

/// `GET /deposit/ln/request` — Deposit 1, the authenticated leg that mints the `lnurl`/`lnurlp`
/// strings the wallet scans.
#[get("/deposit/ln/request")]
pub(super) async fn request(
    state: &State<RocketState>,
    auth: AuthGuard,
) -> JsonResult<DepositRequestResponse> {
    request_flow::create_deposit_request(&state.ctx, &auth.0)
        .await
        .map(|created| Json(DepositRequestResponse { lnurl: created.lnurl, lnurlp: created.lnurlp }))
        .map_err(error::from_request_flow_error)
}

/// `GET /deposit/ln/cb?k1=` — Deposit 2, invoked by the wallet after scanning the QR code.
#[get("/deposit/ln/cb?<k1>")]
pub(super) async fn callback(state: &State<RocketState>, k1: String) -> Json<DepositCallbackResponse> {
    match request_flow::lnurlp_callback(&state.ctx, &k1).await {
        Ok(callback) => Json(DepositCallbackResponse::Ok(LnurlPayResponse {
            tag: "payRequest",
            callback: callback.callback,
            min_sendable: callback.min_sendable,
            max_sendable: callback.max_sendable,
            metadata: callback.metadata,
        })),
        Err(e) => {
            log::info!("deposit callback error: {}", e);
            Json(DepositCallbackResponse::Err(LnurlErrorResponse::new(e.lnurl_reason())))
        }
    }
}

/// `GET /deposit/ln?k1=&amount=` — Deposit 3, invoked by the wallet with the amount to receive.
/// `amount` is taken as a raw string and parsed by hand so a non-numeric value surfaces as an
/// `LnurlErrorResponse` like every other InputInvalid case, rather than as a routing-level 404
/// from a typed form guard.
#[get("/deposit/ln?<k1>&<amount>")]
pub(super) async fn issue_invoice(
    state: &State<RocketState>,
    k1: String,
    amount: String,
) -> Json<DepositInvoiceResponse> {
    let amount: i64 = match amount.parse() {
        Ok(amount) => amount,
        Err(_) => return Json(DepositInvoiceResponse::Err(LnurlErrorResponse::new("Invalid amount"))),
    };
    match request_flow::issue_deposit_invoice(&state.ctx, &k1, amount).await {
        Ok(issued) => Json(DepositInvoiceResponse::Ok(LnurlPayActionResponse {
            pr: issued.bolt11,
            routes: Vec::new(),
            success_action: SuccessAction {
                tag: "message",
                message: "Thank you!",
            },
        })),
        Err(e) => {
            log::info!("deposit invoice error: {}", e);
            Json(DepositInvoiceResponse::Err(LnurlErrorResponse::new(e.lnurl_reason())))
        }
    }
}
