//! Multipart receipt upload for manual bank transfers.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::AppState;
use crate::error::AppError;
use crate::receipts::{ReceiptFile, ReceiptUpload};

pub async fn upload(
    State(state): State<AppState>,
    Path(order_id): Path<u64>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ReceiptUpload>), AppError> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("receipt") | Some("file") => {
                let file_name = field.file_name().unwrap_or("receipt").to_string();
                let mime_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("failed to read upload: {e}")))?;
                file = Some(ReceiptFile {
                    file_name,
                    mime_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => continue,
        }
    }

    let file = file.ok_or_else(|| AppError::validation("no receipt file in request"))?;
    let upload = state.receipts.submit(order_id, file).await?;
    Ok((StatusCode::CREATED, Json(upload)))
}
