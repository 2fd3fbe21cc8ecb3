use actix_web::middleware::NormalizePath;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;
use std::sync::Arc;

use attendance_desk::backend::init_backend;
use attendance_desk::config::Config;
use attendance_desk::docs::ApiDoc;
use attendance_desk::routes::{self, AppState};
use attendance_desk::vocabulary::{StaticVocabulary, Vocabulary};

use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Attendance Desk"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let vocabulary: Arc<dyn Vocabulary> = match &config.vocabulary_path {
        Some(path) => {
            info!(path = %path.display(), "Loading vocabulary file");
            Arc::new(StaticVocabulary::from_file(path)?)
        }
        None => Arc::new(StaticVocabulary::default()),
    };
    let backend = init_backend(&config)?;

    let server_addr = config.server_addr.clone();
    let state = AppState::new(config, backend, vocabulary)?;

    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard matches the JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .service(index)
            .configure(|cfg| routes::configure(cfg, &state))
    })
    .bind(&server_addr)
    .with_context(|| format!("binding {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
