extern crate actix_web;
extern crate bytes;
extern crate chrono;
extern crate default;
extern crate dotenv;
extern crate env_logger;
extern crate futures;
extern crate itertools;
extern crate jsonwebtoken;
extern crate log;
extern crate serde;
extern crate serde_json;
extern crate sqlx;
extern crate thiserror;
extern crate tokio;
extern crate uuid;

mod context;
mod core;
mod database;
mod error;
mod handlers;
mod impls;
mod middlewares;
mod response;

use std::sync::Arc;

use actix_web::web::{get, post, put, scope, Data};
use actix_web::HttpServer;
use sqlx::postgres::PgPoolOptions;

use crate::core::feed::FeedHub;
use crate::database::sqlx::PgStoreManager;
use crate::middlewares::jwt::{Jwt, JWT_SECRET};

#[actix_web::main]
async fn main() -> Result<(), std::io::Error> {
    dotenv::dotenv().ok();
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "actix_web=info,cityconnect=info");
    }
    env_logger::init();
    let secret = dotenv::var(JWT_SECRET).expect("environment variable JWT_SECRET not been set");
    let database_url = dotenv::var("DATABASE_URL").expect("environment variable DATABASE_URL not been set");
    let bind_addr = dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("failed to connect to database");
    let hub = Arc::new(FeedHub::new());
    log::info!("listening on {}", bind_addr);
    HttpServer::new(move || {
        actix_web::App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(Data::new(PgStoreManager::new(pool.clone(), hub.clone())))
            .service(
                scope("")
                    .wrap(Jwt::new(secret.clone().into_bytes()))
                    .service(
                        scope("polls")
                            .route("", post().to(handlers::poll::create))
                            .route("", get().to(handlers::poll::list))
                            .service(
                                scope("{poll_id}")
                                    .route("", get().to(handlers::poll::detail))
                                    .route("tally", get().to(handlers::vote::tally))
                                    .route("live", get().to(handlers::vote::live))
                                    .service(
                                        scope("vote")
                                            .route("", put().to(handlers::vote::cast))
                                            .route("", get().to(handlers::vote::my_vote)),
                                    ),
                            ),
                    ),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
