use axum::async_trait;
use axum::extract::{FromRequest, Multipart, Request};

use crate::error::RelayError;

/// `Multipart` whose rejections render as the relay's JSON error body.
pub(crate) struct MultipartForm(pub(crate) Multipart);

#[async_trait]
impl<S> FromRequest<S> for MultipartForm
where
    S: Send + Sync,
{
    type Rejection = RelayError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| RelayError::new(rejection.status(), rejection.body_text()))?;
        Ok(MultipartForm(multipart))
    }
}
