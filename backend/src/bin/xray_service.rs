use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use backend::config::ServiceConfig;
use backend::report::gemini::GeminiReporter;
use backend::routes::xray::{XrayState, configure_routes};
use backend::routes::cors;
use backend::vision::labels::CHEST_XRAY_LABELS;
use backend::vision::model::XrayModel;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let config = ServiceConfig::xray_from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    let model = XrayModel::load(config.model_path.as_deref(), CHEST_XRAY_LABELS.len()).map_err(|e| {
        log::error!("Failed to load X-ray model at startup: {:?}", e);
        std::io::Error::other(format!("Model loading failed: {:?}", e))
    })?;
    let reporter = GeminiReporter::new(config.gemini.clone()).map_err(std::io::Error::other)?;

    let state = web::Data::new(XrayState {
        classifier: Arc::new(model),
        reporter: Arc::new(reporter),
    });

    let bind_address = config.bind_address();
    log::info!("Starting X-ray service on {}", bind_address);

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
