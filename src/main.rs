#[macro_use]
extern crate lazy_static;

use actix_files::{Files, NamedFile};
use actix_web::{
    http::{Method, StatusCode},
    middleware,
    web::{self, Data},
    App, Either, HttpResponse, HttpServer, Responder,
};
use log::info;
use tera::Tera;

mod config;
mod credentials;
mod db;
mod errors;
mod flash;
mod inventory;
mod routes;
mod session;
mod structs;
mod utils;

use config::Config;
use db::Repository;

#[derive(Debug, Clone)]
pub struct AppState {
    repo: Repository,
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

    let config = Config::from_env().map_err(|e| {
        log::error!("FATAL: {}", e);
        e
    })?;

    let db_pool = db::connect(&config.database_url).await.map_err(|e| {
        log::error!("FATAL: {}", e);
        e
    })?;
    let state = AppState {
        repo: Repository::new(db_pool),
    };

    lazy_static::initialize(&TEMPLATES);

    info!(
        "Starting HTTP server on http://{}:{}/",
        config.bind_addr, config.port
    );

    let session_key = config.session_key.clone();
    let cookie_secure = config.cookie_secure;
    let session_ttl = config.session_ttl;

    HttpServer::new(move || {
        App::new()
            // enable automatic response compression - usually register this first
            .wrap(middleware::Compress::default())
            .wrap(session::identity_middleware(session_ttl))
            .wrap(session::session_middleware(session_key.clone(), cookie_secure))
            // enable logger - always register Actix Web Logger middleware last
            .wrap(middleware::Logger::default())
            .service(Files::new("/static", "static"))
            .app_data(Data::new(state.clone()))
            .configure(routes::configure)
            .default_service(web::to(default_handler))
    })
    .bind((config.bind_addr.as_str(), config.port))?
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
