pub mod ctscan;
pub mod xray;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::web;

use crate::vision::model::{Classifier, InferenceError, check_scores};

pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .max_age(3600)
}

/// Run the forward pass on the blocking pool and check one finite score per label.
async fn run_inference(
    classifier: std::sync::Arc<dyn Classifier>,
    input: ndarray::Array4<f32>,
    expected: usize,
) -> Result<Vec<f32>, InferenceError> {
    let scores = web::block(move || classifier.predict(&input))
        .await
        .map_err(|e| InferenceError::Blocking(e.to_string()))??;
    check_scores(&scores, expected)?;
    Ok(scores)
}
