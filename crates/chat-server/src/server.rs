use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use std::io;

use crate::error::AppError;
use crate::handlers::{chat, greeting};
use crate::state::AppState;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Routes shared by the server and the handler tests.
///
/// Only `GET` is routed on the greeting path; every other method there falls
/// through to `404`, same as an unknown path.
pub fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .service(
        web::resource(greeting::GREETING_PATH)
            .route(web::get().to(greeting::handler))
            .default_service(web::route().to(HttpResponse::NotFound)),
    )
    .route(chat::CHAT_PATH, web::post().to(chat::handler));
}

pub async fn run_server(config: ServerConfig, state: AppState) -> io::Result<()> {
    let state = web::Data::new(state);
    let address = config.bind_address();
    log::info!("Listening on http://{}", address);
    log::info!("Greeting endpoint: GET {}", greeting::GREETING_PATH);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .configure(app_config)
    })
    .bind(address)?
    .run()
    .await
}
