use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

// Taken from https://github.com/tokio-rs/axum/blob/main/examples/anyhow-error-response/src/main.rs
#[derive(Debug)]
pub struct RelayError {
    pub status: StatusCode,
    pub message: HttpErrorResponse,
}

#[derive(Debug, Serialize)]
pub struct HttpErrorResponse {
    detail: String,
}

impl HttpErrorResponse {
    #[cfg(test)]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<String> for HttpErrorResponse {
    fn from(message: String) -> Self {
        HttpErrorResponse { detail: message }
    }
}

impl From<&str> for HttpErrorResponse {
    fn from(message: &str) -> Self {
        HttpErrorResponse {
            detail: message.to_string(),
        }
    }
}

impl RelayError {
    pub fn new(status: StatusCode, message: impl Into<HttpErrorResponse>) -> Self {
        RelayError {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let mut res = Json(self.message).into_response();
        *res.status_mut() = self.status;
        res
    }
}

impl<E> From<E> for RelayError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        RelayError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: HttpErrorResponse::from(format!(
                "Error processing request: {}",
                err.into()
            )),
        }
    }
}

pub type RelayResult<T, E = RelayError> = Result<T, E>;

#[macro_export]
macro_rules! bail_relay {
    ($error_message:expr) => {
        return Err($crate::error::RelayError::new(
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            $error_message,
        ))
    };
    ($status_code:expr, $error_message:expr) => {
        return Err($crate::error::RelayError::new($status_code, $error_message))
    };
    ($status:expr, $fmt:expr $(, $arg:expr)*) => {
        return Err($crate::error::RelayError::new($status, format!($fmt $(, $arg)*)))
    };
}
