//! The withdraw side of the LNURL handshake (§4.D Withdraw 1-3, §6).

use app::request_flow;
use rocket::{get, serde::json::Json, State};
use serde::Serialize;

use crate::access::AuthGuard;
use crate::error::{self, JsonResult};
use crate::lnurl_response::{LnurlErrorResponse, LnurlSuccessResponse};
use crate::state::RocketState;

#[derive(Debug, Serialize)]
pub(super) struct WithdrawRequestResponse {
    lnurl: String,
    lnurlw: String,
}

#[derive(Debug, Serialize)]
struct LnurlWithdrawResponse {
    tag: &'static str,
    callback: String,
    k1: String,
    #[serde(rename = "maxWithdrawable")]
    max_withdrawable: i64,
    #[serde(rename = "minWithdrawable")]
    min_withdrawable: i64,
    #[serde(rename = "defaultDescription")]
    default_description: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WithdrawCallbackResponse {
    Ok(LnurlWithdrawResponse),
    Err(LnurlErrorResponse),
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WithdrawSubmitResponse {
    Ok(LnurlSuccessResponse),
    Err(LnurlErrorResponse),
}

/// `GET /withdraw/ln/request` — Withdraw 1, the authenticated leg that mints the `lnurl`/`lnurlw`
/// strings the wallet scans.
#[get("/withdraw/ln/request")]
pub(super) async fn request(
    state: &State<RocketState>,
    auth: AuthGuard,
) -> JsonResult<WithdrawRequestResponse> {
    request_flow::create_withdraw_request(&state.ctx, &auth.0)
        .await
        .map(|created| {
            Json(WithdrawRequestResponse {
                lnurl: created.lnurl,
                lnurlw: created.lnurlw,
            })
        })
        .map_err(error::from_request_flow_error)
}

/// `GET /withdraw/ln/cb?k1=` — Withdraw 2, invoked by the wallet after scanning the QR code.
#[get("/withdraw/ln/cb?<k1>")]
pub(super) async fn callback(state: &State<RocketState>, k1: String) -> Json<WithdrawCallbackResponse> {
    match request_flow::lnurlw_callback(&state.ctx, &k1).await {
        Ok(callback) => Json(WithdrawCallbackResponse::Ok(LnurlWithdrawResponse {
            tag: "withdrawRequest",
            callback: callback.callback,
            k1: callback.k1,
            max_withdrawable: callback.max_withdrawable,
            min_withdrawable: callback.min_withdrawable,
            default_description: callback.default_description,
        })),
        Err(e) => {
            log::info!("withdraw callback error: {}", e);
            Json(WithdrawCallbackResponse::Err(LnurlErrorResponse::new(e.lnurl_reason())))
        }
    }
}

/// `GET /withdraw/ln?k1=&pr=` — Withdraw 3, invoked by the wallet with the invoice to pay.
#[get("/withdraw/ln?<k1>&<pr>")]
pub(super) async fn submit(state: &State<RocketState>, k1: String, pr: String) -> Json<WithdrawSubmitResponse> {
    match request_flow::submit_invoice(&state.ctx, &k1, &pr).await {
        Ok(()) => Json(WithdrawSubmitResponse::Ok(LnurlSuccessResponse::default())),
        Err(e) => {
            log::info!("withdraw submit error: {}", e);
            Json(WithdrawSubmitResponse::Err(LnurlErrorResponse::new(e.lnurl_reason())))
        }
    }
}
