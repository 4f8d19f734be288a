use rocket::http::Status;
use rocket::{Catcher, Request};

use crate::resp::jwt::{auth_problem, GuardProblem};
use crate::resp::problem::{problems, Problem};

/// Problem left behind by a failing request guard, if any.
fn guard_problem(req: &Request<'_>) -> Option<Problem> {
    req.local_cache(|| GuardProblem(None)).0.clone()
}

#[catch(400)]
pub fn bad_request(req: &Request<'_>) -> Problem {
    guard_problem(req).unwrap_or_else(problems::parse_problem)
}

#[catch(401)]
pub fn unauthorized(req: &Request<'_>) -> Problem {
    guard_problem(req).unwrap_or_else(|| auth_problem("Token is missing."))
}

#[catch(403)]
pub fn forbidden(req: &Request<'_>) -> Problem {
    guard_problem(req)
        .unwrap_or_else(|| Problem::new_untyped(Status::Forbidden, "Access denied."))
}

#[catch(404)]
pub fn not_found(req: &Request<'_>) -> Problem {
    problems::route_not_found(req.uri().path())
}

#[catch(422)]
pub fn unprocessable(req: &Request<'_>) -> Problem {
    guard_problem(req).unwrap_or_else(problems::unprocessable_problem)
}

#[catch(500)]
pub fn server_error(req: &Request<'_>) -> Problem {
    guard_problem(req).unwrap_or_else(problems::server_problem)
}

#[catch(default)]
pub fn fallback(status: Status, req: &Request<'_>) -> Problem {
    guard_problem(req).unwrap_or_else(|| {
        Problem::new_untyped(status, status.reason().unwrap_or("Request failed."))
    })
}

pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        unprocessable,
        server_error,
        fallback
    ]
}
