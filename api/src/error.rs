use rocket::{http::Status, serde::json::Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Error {
    pub error: Inner,
}

#[derive(Debug, Serialize)]
pub struct Inner {
    pub code: u16,
    pub description: String,
}

impl Error {
    fn new(http_status: Status, description: String) -> Self {
        Self {
            error: Inner {
                code: http_status.code,
                description,
            },
        }
    }
}

pub type JsonError = (Status, Json<Error>);

pub type JsonResult<T> = Result<Json<T>, JsonError>;

pub fn bad_request(description: String) -> JsonError {
    (Status::BadRequest, Json(Error::new(Status::BadRequest, description)))
}

/// Maps a core [`app::request_flow::Error`] onto the plain JSON error shape used by the two
/// `*/request` endpoints (§7: "HTTP 400 otherwise"). The callback/submit/invoice endpoints never
/// go through here; they surface the same errors as `LnurlErrorResponse` bodies instead.
pub fn from_request_flow_error(e: app::request_flow::Error) -> JsonError {
    log::info!("request flow error: {}", e);
    bad_request(e.lnurl_reason().to_owned())
}
