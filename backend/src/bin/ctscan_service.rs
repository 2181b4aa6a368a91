use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use backend::config::ServiceConfig;
use backend::report::gemini::GeminiReporter;
use backend::routes::ctscan::{CtScanState, configure_routes};
use backend::routes::cors;
use backend::vision::labels::CT_SCAN_LABELS;
use backend::vision::model::{Classifier, CtScanModel};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let config = ServiceConfig::ctscan_from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;
    if config.gemini.api_key.is_none() {
        log::warn!("GOOGLE_API_KEY is not set; AI analysis will report an error");
    }

    let classifier = config
        .model_path
        .as_deref()
        .and_then(|path| CtScanModel::try_load(path, CT_SCAN_LABELS.len()))
        .map(|model| Arc::new(model) as Arc<dyn Classifier>);
    if classifier.is_none() {
        log::warn!("Failed to load model. Server will run but predictions will fail.");
    }
    let reporter = GeminiReporter::new(config.gemini.clone()).map_err(std::io::Error::other)?;

    let state = web::Data::new(CtScanState {
        classifier,
        reporter: Arc::new(reporter),
    });

    let bind_address = config.bind_address();
    log::info!("Starting CT scan service on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(cors())
            .app_data(state.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
