use app::{auth, user};
use rocket::{
    async_trait,
    http::Status,
    request::{FromRequest, Outcome},
    Request,
};

use crate::state::RocketState;

/// Guards the two `*/request` endpoints (§6 "Auth collaborator"). The four capability-by-`k1`
/// endpoints don't use this; a valid `k1` is itself the credential there.
pub struct AuthGuard(pub user::Id);

#[async_trait]
impl<'r> FromRequest<'r> for AuthGuard {
    type Error = auth::AccessDenied;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let state = req.rocket().state::<RocketState>().unwrap();
        let header = req.headers().get_one("Authorization");
        match auth::verify_bearer(header, &state.auth) {
            Ok(user_id) => Outcome::Success(AuthGuard(user_id)),
            Err(e) => Outcome::Failure((Status::BadRequest, e)),
        }
    }
}
