//! Request extractors

use axum::extract::FromRequest;

use crate::error::Error;

/// `axum::Json` whose rejection renders as a `validation_error` body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ValidJson<T>(pub T);
