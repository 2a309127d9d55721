//! The two response shapes every LNURL endpoint can return alongside its success body (§6, §7).
//! Errors from these endpoints are never an HTTP error status; they're a 200 with one of these
//! bodies instead, per LUD-03/LUD-06.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct LnurlErrorResponse {
    status: &'static str,
    reason: String,
}

impl LnurlErrorResponse {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            status: "ERROR",
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LnurlSuccessResponse {
    status: &'static str,
}

impl Default for LnurlSuccessResponse {
    fn default() -> Self {
        Self { status: "OK" }
    }
}
