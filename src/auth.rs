// Session handling lives in the upstream gateway; by the time a request
// reaches this service the caller's numeric id and role arrive as headers.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl Role {
    fn parse(s: &str) -> Option<Role> {
        match s {
            "student" => Some(Role::Student),
            "instructor" => Some(Role::Instructor),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub user_id: i64,
    pub role: Role,
}

fn caller_from_headers(headers: &HeaderMap) -> Option<Caller> {
    let user_id = headers.get("x-user-id")?.to_str().ok()?.parse().ok()?;
    let role = Role::parse(headers.get("x-user-role")?.to_str().ok()?)?;
    Some(Caller { user_id, role })
}

/// Decodes the gateway identity headers and stashes the caller in request
/// extensions. Anonymous requests pass through; the role guards and the
/// `Caller` extractor decide whether that is acceptable per route.
pub async fn identity(mut req: Request, next: Next) -> Response {
    if let Some(caller) = caller_from_headers(req.headers()) {
        req.extensions_mut().insert(caller);
    }
    next.run(req).await
}

pub async fn require_instructor(req: Request, next: Next) -> Result<Response, AppError> {
    require_role(req, next, Role::Instructor).await
}

pub async fn require_student(req: Request, next: Next) -> Result<Response, AppError> {
    require_role(req, next, Role::Student).await
}

async fn require_role(req: Request, next: Next, role: Role) -> Result<Response, AppError> {
    match req.extensions().get::<Caller>() {
        Some(caller) if caller.role == role => Ok(next.run(req).await),
        Some(_) => Err(AppError::Forbidden),
        None => Err(AppError::Unauthorized),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .copied()
            .ok_or(AppError::Unauthorized)
    }
}
