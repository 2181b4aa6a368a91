use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use shared::{CtScanAnalysisResponse, HealthResponse};
use uuid::Uuid;

use super::run_inference;
use crate::assemble::{argmax, rank};
use crate::error::AnalysisError;
use crate::report::prompt::ctscan_prompt;
use crate::report::{NarrativeGenerator, narrate};
use crate::upload::{UploadError, read_file_field};
use crate::vision::labels::CT_SCAN_LABELS;
use crate::vision::model::{Classifier, InferenceError};
use crate::vision::preprocess::preprocess_ctscan;

/// `classifier` is `None` when the model failed to load at startup.
#[derive(Clone)]
pub struct CtScanState {
    pub classifier: Option<Arc<dyn Classifier>>,
    pub reporter: Arc<dyn NarrativeGenerator>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/analyzectscan").route(web::post().to(analyze_ctscan)))
        .service(web::resource("/health").route(web::get().to(health)));
}

fn upload_error(err: UploadError) -> AnalysisError {
    match err {
        UploadError::MissingFile => AnalysisError::BadRequest("No file provided".into()),
        UploadError::EmptyFilename => AnalysisError::BadRequest("No file selected".into()),
        UploadError::Read(msg) => AnalysisError::Internal(format!("Analysis failed: {}", msg)),
    }
}

fn analysis_failed(err: InferenceError) -> AnalysisError {
    AnalysisError::Internal(format!("Analysis failed: {}", err))
}

async fn analyze_ctscan(
    state: web::Data<CtScanState>,
    payload: Multipart,
) -> Result<HttpResponse, AnalysisError> {
    let upload = read_file_field(payload).await.map_err(upload_error)?;
    let request_id = Uuid::new_v4();
    log::info!("[{}] CT upload '{}' ({} bytes)", request_id, upload.filename, upload.bytes.len());

    let image = upload.decode().map_err(|e| {
        log::warn!("[{}] Error preprocessing image: {}", request_id, e);
        AnalysisError::BadRequest("Failed to preprocess image".into())
    })?;
    let input = preprocess_ctscan(&image);

    let classifier = state
        .classifier
        .clone()
        .ok_or(AnalysisError::ModelUnavailable)?;
    let scores = run_inference(classifier, input, CT_SCAN_LABELS.len())
        .await
        .map_err(analysis_failed)?;

    let (class_idx, confidence) = argmax(&scores).ok_or_else(|| {
        analysis_failed(InferenceError::OutputShape {
            expected: CT_SCAN_LABELS.len(),
            actual: 0,
        })
    })?;
    let predicted_class = CT_SCAN_LABELS[class_idx].to_string();
    log::info!("[{}] predicted {} ({:.4})", request_id, predicted_class, confidence);

    let predictions = rank(&CT_SCAN_LABELS, &scores);
    let ai_analysis = narrate(state.reporter.as_ref(), &ctscan_prompt(&predictions), None).await;

    Ok(HttpResponse::Ok().json(CtScanAnalysisResponse {
        predictions,
        predicted_class,
        confidence,
        ai_analysis,
    }))
}

async fn health(state: web::Data<CtScanState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        model_loaded: state.classifier.is_some(),
    })
}
