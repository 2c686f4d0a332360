use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::bail_relay;
use crate::error::{RelayError, RelayResult};

/// An uploaded image as received from the caller.
#[derive(Debug)]
pub(crate) struct ImageUpload {
    pub(crate) field: &'static str,
    pub(crate) filename: Option<String>,
    pub(crate) content_type: Option<String>,
    pub(crate) bytes: Bytes,
}

impl ImageUpload {
    pub(crate) fn display_name(&self) -> &str {
        self.filename.as_deref().unwrap_or(self.field)
    }

    fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|content_type| content_type.starts_with("image/"))
    }

    /// Re-attaches the original filename, content type and bytes for the upstream request.
    pub(crate) fn into_part(self) -> RelayResult<Part> {
        let mut part = Part::bytes(self.bytes.to_vec());
        if let Some(filename) = self.filename {
            part = part.file_name(filename);
        }
        if let Some(content_type) = self.content_type {
            part = part.mime_str(&content_type)?;
        }
        Ok(part)
    }
}

/// The fields of one inbound multipart form, read fully into memory.
#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    images: HashMap<&'static str, ImageUpload>,
    texts: HashMap<&'static str, String>,
}

impl UploadForm {
    /// Reads every part of `multipart`, keeping the `image_fields` and `text_fields` asked for.
    ///
    /// All image fields must be present (422 otherwise) and every one of them must declare an
    /// `image/*` content type (400 otherwise), checked in the order given.
    pub(crate) async fn read(
        mut multipart: Multipart,
        image_fields: &[&'static str],
        text_fields: &[&'static str],
    ) -> RelayResult<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name() else {
                continue;
            };

            if let Some(&image_field) = image_fields.iter().find(|f| **f == name) {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.images.insert(
                    image_field,
                    ImageUpload {
                        field: image_field,
                        filename,
                        content_type,
                        bytes,
                    },
                );
            } else if let Some(&text_field) = text_fields.iter().find(|f| **f == name) {
                let value = field.text().await.map_err(multipart_error)?;
                form.texts.insert(text_field, value);
            } else {
                debug!("Ignoring unexpected form field {}", name);
            }
        }

        for name in image_fields {
            if !form.images.contains_key(name) {
                bail_relay!(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Missing field {} in multipart form",
                    name
                );
            }
        }
        for name in image_fields {
            if form.images.get(name).is_some_and(|image| !image.is_image()) {
                bail_relay!(StatusCode::BAD_REQUEST, "{} must be an image", name);
            }
        }

        Ok(form)
    }

    pub(crate) fn take_image(&mut self, name: &str) -> RelayResult<ImageUpload> {
        match self.images.remove(name) {
            Some(image) => Ok(image),
            None => bail_relay!(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Missing field {} in multipart form",
                name
            ),
        }
    }

    pub(crate) fn take_text(&mut self, name: &str) -> Option<String> {
        self.texts.remove(name)
    }
}

/// Builds the outbound form with one file part per image, named after its inbound field.
pub(crate) fn image_form(images: Vec<ImageUpload>) -> RelayResult<Form> {
    let mut form = Form::new();
    for image in images {
        let field = image.field;
        form = form.part(field, image.into_part()?);
    }
    Ok(form)
}

fn multipart_error(err: MultipartError) -> RelayError {
    RelayError::new(err.status(), err.body_text())
}
