use std::sync::Arc;

use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::engine::Engine;
use crate::model::mongodb::ensure_indexes_exist;
use crate::notify::{LogNotifier, Notifier, WebhookNotifier};
use crate::store::MongoStore;

/// Name of the production database.
const DATABASE: &str = "dac";

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    // non-secrets
    notification_url: Option<String>,
}

impl Config {
    /// Where workflow events are posted, if anywhere.
    pub fn notification_url(&self) -> Option<&str> {
        self.notification_url.as_deref()
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// A fairing that builds the notification collaborator from the application
/// config and places it into managed state. Must be attached after
/// [`ConfigFairing`].
pub struct NotifierFairing;

#[rocket::async_trait]
impl Fairing for NotifierFairing {
    fn info(&self) -> Info {
        Info {
            name: "Notifier",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = rocket.state::<Config>() else {
            error!("Notifier requires the application config");
            return Err(rocket);
        };
        let notifier: Arc<dyn Notifier> = match config.notification_url() {
            Some(url) => {
                info!("Posting notifications to {url}");
                Arc::new(WebhookNotifier::new(url.to_string()))
            }
            None => {
                warn!("No `notification_url` configured, notifications will only be logged");
                Arc::new(LogNotifier)
            }
        };
        Ok(rocket.manage(notifier))
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// ensures its indexes exist, and places the workflow [`Engine`] into
/// managed state. Must be attached after [`NotifierFairing`].
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        let Some(notifier) = rocket.state::<Arc<dyn Notifier>>().cloned() else {
            error!("Database requires the notifier");
            return Err(rocket);
        };
        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(DATABASE);

        // Ensure the required indexes exist.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to connect to database: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        let engine = Engine::new(Arc::new(MongoStore::new(client, db)), notifier);
        rocket = rocket.manage(engine);
        Ok(rocket)
    }
}
