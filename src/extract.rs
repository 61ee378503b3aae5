//! Request extractors whose rejections answer with the usual `{kind, message}` body.

use axum::extract::{FromRequest, FromRequestParts};

use crate::app_error::AppError;

/// `axum::Json`, rejecting malformed bodies with a `BAD_REQUEST` error.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `axum::extract::Path`, rejecting unparsable segments with a `BAD_REQUEST` error.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);
