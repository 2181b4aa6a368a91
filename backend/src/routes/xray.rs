use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use shared::XrayAnalysisResponse;
use uuid::Uuid;

use super::run_inference;
use crate::assemble::{encode_jpeg_base64, rank};
use crate::error::AnalysisError;
use crate::report::prompt::xray_prompt;
use crate::report::{InlineImage, NarrativeGenerator, narrate};
use crate::upload::{UploadError, read_file_field};
use crate::vision::labels::CHEST_XRAY_LABELS;
use crate::vision::model::Classifier;
use crate::vision::preprocess::preprocess_xray;

#[derive(Clone)]
pub struct XrayState {
    pub classifier: Arc<dyn Classifier>,
    pub reporter: Arc<dyn NarrativeGenerator>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/analyze").route(web::post().to(analyze_xray)));
}

fn upload_error(err: UploadError) -> AnalysisError {
    match err {
        UploadError::MissingFile => AnalysisError::BadRequest("No file part".into()),
        UploadError::EmptyFilename => AnalysisError::BadRequest("No selected file".into()),
        UploadError::Read(msg) => AnalysisError::Internal(msg),
    }
}

async fn analyze_xray(
    state: web::Data<XrayState>,
    payload: Multipart,
) -> Result<HttpResponse, AnalysisError> {
    let upload = read_file_field(payload).await.map_err(upload_error)?;
    let request_id = Uuid::new_v4();
    log::info!("[{}] X-ray upload '{}' ({} bytes)", request_id, upload.filename, upload.bytes.len());

    let image = upload
        .decode()
        .map_err(|e| AnalysisError::BadRequest(e.to_string()))?;
    let input = preprocess_xray(&image);

    let scores = run_inference(state.classifier.clone(), input, CHEST_XRAY_LABELS.len())
        .await
        .map_err(|e| AnalysisError::Internal(e.to_string()))?;
    let predictions = rank(&CHEST_XRAY_LABELS, &scores);
    if let Some((label, prob)) = predictions.iter().next() {
        log::info!("[{}] top finding {} ({:.4})", request_id, label, prob);
    }

    let encoded = encode_jpeg_base64(&image).map_err(|e| AnalysisError::Internal(e.to_string()))?;
    let attachment = InlineImage::jpeg(encoded);
    let ai_analysis = narrate(
        state.reporter.as_ref(),
        &xray_prompt(&predictions),
        Some(&attachment),
    )
    .await;

    Ok(HttpResponse::Ok().json(XrayAnalysisResponse {
        predictions,
        ai_analysis,
        image: attachment.data,
    }))
}
