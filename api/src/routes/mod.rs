//! Add top-level routes as submodules here.

use crate::state::RocketState;
use rocket::{routes, Build, Rocket};

mod deposits;
mod withdrawals;

pub fn register(rocket: Rocket<Build>, state: RocketState) -> Rocket<Build> {
    rocket.manage(state).mount(
        "/",
        routes![
            withdrawals::request,
            withdrawals::callback,
            withdrawals::submit,
            deposits::request,
            deposits::callback,
            deposits::issue_invoice,
        ],
    )
}
