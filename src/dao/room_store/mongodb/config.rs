use std::{env, time::Duration};

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::debug;

use super::error::{MongoStoreError, MongoResult};

const DEFAULT_DATABASE: &str = "cineguess";
const PING_ATTEMPTS: u32 = 10;
const FIRST_PING_DELAY: Duration = Duration::from_millis(250);
const MAX_PING_DELAY: Duration = Duration::from_secs(5);

/// Where the room collection lives.
#[derive(Clone)]
pub struct MongoConfig {
    options: ClientOptions,
    database: String,
}

impl MongoConfig {
    /// Parse a connection string; `database` defaults to `cineguess`.
    pub async fn parse(uri: &str, database: Option<&str>) -> MongoResult<Self> {
        let options = ClientOptions::parse(uri)
            .await
            .map_err(|source| MongoStoreError::InvalidUri {
                uri: uri.to_owned(),
                source,
            })?;

        Ok(Self {
            options,
            database: database.unwrap_or(DEFAULT_DATABASE).to_owned(),
        })
    }

    /// `MONGO_URI` is required, `MONGO_DB` is optional.
    pub async fn from_env() -> MongoResult<Self> {
        let uri = env::var("MONGO_URI").map_err(|_| MongoStoreError::MissingUri)?;
        let database = env::var("MONGO_DB").ok();
        Self::parse(&uri, database.as_deref()).await
    }

    /// Build a client and wait for the database to answer a ping.
    pub(super) async fn open(&self) -> MongoResult<(Client, Database)> {
        let client = Client::with_options(self.options.clone())
            .map_err(|source| MongoStoreError::Client { source })?;
        let database = client.database(&self.database);

        let mut delay = FIRST_PING_DELAY;
        let mut attempt = 1;
        loop {
            match database.run_command(doc! { "ping": 1 }).await {
                Ok(_) => return Ok((client, database)),
                Err(source) if attempt >= PING_ATTEMPTS => {
                    return Err(MongoStoreError::Unreachable {
                        attempts: attempt,
                        source,
                    });
                }
                Err(err) => {
                    debug!(attempt, error = %err, "MongoDB not reachable yet");
                    sleep(delay).await;
                    delay = (delay * 2).min(MAX_PING_DELAY);
                    attempt += 1;
                }
            }
        }
    }
}
