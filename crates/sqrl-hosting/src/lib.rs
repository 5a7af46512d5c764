//! HTTP hosting for the SQRL server.
//!
//! Thin actix-web surface over the synchronous engine: the backchannel
//! endpoint the authenticator client talks to, the poll endpoint the
//! browser watches, and the page-preparation endpoint that starts an
//! attempt. All protocol decisions live in `sqrl-engine`; this crate only
//! moves bytes, cookies, and background timers.
//!
//! ## Endpoints
//!
//! - [`handlers::backchannel`] — client command requests (POST)
//! - [`handlers::poll`] — browser status polling (POST, JSON)
//! - [`handlers::prepare`] — starts an attempt and sets cookies (GET)
//! - [`handlers::logout`] — ends an attempt and clears the cookies (POST)
//!
//! ## Housekeeping
//!
//! - [`spawn_cleanup`] — periodic expired-entry purge
//! - [`spawn_monitor`] — periodic listener notification rounds
mod cookies;
pub mod handlers;
mod housekeeping;

pub use cookies::*;
pub use housekeeping::*;

use actix_web::App;
use actix_web::HttpResponse;
use actix_web::HttpServer;
use actix_web::Responder;
use actix_web::middleware::Logger;
use actix_web::web;
use sqrl_core::SqrlConfig;
use sqrl_engine::SqrlOperations;
use sqrl_store::MemoryStore;
use std::sync::Arc;

async fn health() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

/// Milliseconds since the unix epoch, the timebase every engine call uses.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Runs a standalone SQRL server over the in-memory store. Embedders with
/// their own persistence wire up the same handlers against their own
/// `Persistence` implementation.
pub async fn run(config: SqrlConfig) -> Result<(), std::io::Error> {
    let backchannel = config.backchannel_path.clone();
    let operations = SqrlOperations::new(config, MemoryStore::new())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let operations = web::Data::new(Arc::new(operations));
    spawn_cleanup(operations.get_ref().clone());
    log::info!("starting sqrl server, backchannel at {}", backchannel);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%r %s %Ts"))
            .app_data(operations.clone())
            .route("/health", web::get().to(health))
            .route(&backchannel, web::post().to(handlers::backchannel::<MemoryStore>))
            .route("/sqrlpoll", web::post().to(handlers::poll::<MemoryStore>))
            .route("/sqrlpage", web::get().to(handlers::prepare::<MemoryStore>))
            .route("/sqrllogout", web::post().to(handlers::logout::<MemoryStore>))
    })
    .bind(std::env::var("BIND_ADDR").expect("BIND_ADDR must be set"))?
    .run()
    .await
}
