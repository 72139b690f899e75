#[macro_use]
extern crate lazy_static;
use std::sync::Arc;

use actix_files::{Files, NamedFile};
use actix_identity::IdentityMiddleware;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{
    cookie::Key,
    http::{Method, StatusCode},
    middleware,
    web::{self, Data},
    App, Either, HttpResponse, HttpServer, Responder,
};
use log::info;
use tera::Tera;

mod api;
mod attendance;
mod auth;
mod config;
mod errors;
mod receipt;
mod resources;
mod routes;
mod tenant;
mod utils;

use api::{ApiClient, Backend};
use config::Config;
use tenant::TenantRegistry;

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn Backend>,
    pub tenants: Arc<TenantRegistry>,
}

lazy_static! {
    pub static ref TEMPLATES: Tera = {
        let mut tera = match Tera::new("templates/**/*") {
            Ok(t) => t,
            Err(e) => {
                log::error!("Parsing error(s): {}", e);
                ::std::process::exit(1);
            }
        };
        tera.autoescape_on(vec![".html"]);
        tera
    };
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env()?;
    let session_key = Key::from(config.session_key.as_bytes());

    let backend = ApiClient::new(&config.api_base_url, config.api_timeout)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    let tenants = TenantRegistry::load(&config.clients_config)?;

    let state = AppState {
        backend: Arc::new(backend),
        tenants: Arc::new(tenants),
    };

    info!("Using backend at {}", config.api_base_url);
    info!("Starting HTTP server on http://{}/", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            // enable automatic response compression - usually register this first
            .wrap(middleware::Compress::default())
            .wrap(IdentityMiddleware::default())
            .wrap(SessionMiddleware::new(
                CookieSessionStore::default(),
                session_key.clone(),
            ))
            // enable logger - always register Actix Web Logger middleware last
            .wrap(middleware::Logger::default())
            .service(Files::new("/static", "static"))
            .app_data(Data::new(state.clone()))
            .configure(routes::configure)
            .default_service(web::to(default_handler))
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}

async fn default_handler(req_method: Method) -> Result<impl Responder, std::io::Error> {
    match req_method {
        Method::GET => {
            let file = NamedFile::open("static/404.html")?
                .customize()
                .with_status(StatusCode::NOT_FOUND);
            Ok(Either::Left(file))
        }
        _ => Ok(Either::Right(HttpResponse::MethodNotAllowed().finish())),
    }
}
