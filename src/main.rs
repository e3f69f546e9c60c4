use std::{str::FromStr, sync::Arc};

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use tracing::{Level, info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use hrm_leave::{
    config::Config,
    docs::ApiDoc,
    leave::LeaveEngine,
    notify::{LogNotifier, Notifier, SmtpNotifier},
    routes, scheduler,
    storage::LocalFileStorage,
    store::{LeaveStore, MemoryStore, MySqlStore},
};

#[get("/")]
async fn index() -> impl Responder {
    "HRM leave service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(Level::from_str(&config.log_level).unwrap_or(Level::DEBUG))
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let store: Arc<dyn LeaveStore> = match &config.database_url {
        Some(url) => Arc::new(
            MySqlStore::connect(url, config.db_max_connections)
                .await
                .context("Failed to connect to database")?,
        ),
        None => {
            warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match config.email.clone() {
        Some(email) => Arc::new(SmtpNotifier::new(email)),
        None => {
            warn!("SMTP_HOST not set, leave notifications are only logged");
            Arc::new(LogNotifier)
        }
    };

    let engine = LeaveEngine::new(
        store,
        Arc::new(LocalFileStorage::new(&config.upload_dir)),
        notifier,
    )
    .with_settings(config.engine_settings());

    engine
        .seed_quota_catalog()
        .await
        .context("Failed to seed quota catalog")?;

    if config.accrual_enabled {
        actix_web::rt::spawn(scheduler::run_accrual_loop(engine.clone()));
    }

    let server_addr = config.server_addr.clone();
    let engine_data = Data::new(engine);
    let config_data = Data::new(config);

    HttpServer::new(move || {
        let config = config_data.clone();
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(engine_data.clone())
            .app_data(config.clone())
            .service(index)
            // protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &config))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
