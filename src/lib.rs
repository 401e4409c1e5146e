#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, DatabaseFairing, NotifierFairing};
use crate::engine::Engine;
use crate::logging::LoggerFairing;

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod notify;
pub mod store;

/// Build the server. The engine and its collaborators are constructed from
/// configuration by fairings when the server ignites.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(NotifierFairing)
        .attach(DatabaseFairing)
}

/// Build the server around an already constructed engine.
pub fn rocket_for_services(engine: Engine) -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .manage(engine)
}
