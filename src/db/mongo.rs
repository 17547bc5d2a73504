// src/db/mongo.rs

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use mongodb::bson::{doc, oid::ObjectId, Bson, DateTime as BsonDateTime, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, ServerAddress, Tls};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{RequestStore, StoreError};
use crate::models::{Member, TeamRequest, TeamRequestPayload};

pub const COLLECTION_NAME: &str = "teamrequests";

const FALLBACK_DATABASE: &str = "teamup";
const DEFAULT_MONGODB_PORT: u16 = 27017;
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(45);
const DUPLICATE_KEY: i32 = 11000;

/// A request as it lives in the `teamrequests` collection.
#[derive(Debug, Serialize, Deserialize)]
struct TeamRequestDocument {
    /// ObjectId for records created through the API, plain string for
    /// imported legacy records.
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<Bson>,
    #[serde(default)]
    user_personal_phone: Option<String>,
    user_name: String,
    #[serde(default)]
    user_gender: Option<String>,
    #[serde(default)]
    user_abstract: Option<String>,
    #[serde(default)]
    members: Vec<Member>,
    #[serde(alias = "ownerFingerprint")]
    owner_fingerprint: String,
    #[serde(alias = "createdAt")]
    created_at: BsonDateTime,
    #[serde(alias = "updatedAt")]
    updated_at: BsonDateTime,
}

impl TeamRequestDocument {
    fn from_request(request: &TeamRequest, id: Option<Bson>) -> Self {
        Self {
            id,
            user_personal_phone: request.user_personal_phone.clone(),
            user_name: request.user_name.clone(),
            user_gender: request.user_gender.clone(),
            user_abstract: request.user_abstract.clone(),
            members: request.members.clone(),
            owner_fingerprint: request.owner_fingerprint.clone(),
            created_at: to_bson_datetime(request.created_at),
            updated_at: to_bson_datetime(request.updated_at),
        }
    }

    fn into_request(self) -> Result<TeamRequest, StoreError> {
        let id = self
            .id
            .as_ref()
            .map(bson_to_id)
            .ok_or_else(|| StoreError::Serialization("document without _id".to_string()))?;

        Ok(TeamRequest {
            id,
            user_personal_phone: self.user_personal_phone,
            user_name: self.user_name,
            user_gender: self.user_gender,
            user_abstract: self.user_abstract,
            members: self.members,
            owner_fingerprint: self.owner_fingerprint,
            created_at: to_chrono(self.created_at)?,
            updated_at: to_chrono(self.updated_at)?,
        })
    }
}

/// Hex strings address ObjectId keys, anything else a legacy string key.
fn id_to_bson(id: &str) -> Bson {
    ObjectId::parse_str(id)
        .map(Bson::ObjectId)
        .unwrap_or_else(|_| Bson::String(id.to_string()))
}

/// `_id` filter for a client-supplied id. A 24-hex id may be an ObjectId or a
/// legacy string key of the same shape, so both are matched.
fn id_filter(id: &str) -> Document {
    match ObjectId::parse_str(id) {
        Ok(oid) => doc! { "_id": { "$in": [Bson::ObjectId(oid), id] } },
        Err(_) => doc! { "_id": id },
    }
}

fn bson_to_id(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_bson_datetime(at: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(at.timestamp_millis())
}

fn to_chrono(at: BsonDateTime) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).ok_or_else(|| {
        StoreError::Serialization(format!("timestamp out of range: {}", at.timestamp_millis()))
    })
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

/// Database name taken from the path of a connection string, e.g. `teamup`
/// in `mongodb://host:27017/teamup?retryWrites=true`.
pub fn database_name_from_uri(uri: &str) -> Option<String> {
    let rest = uri.split_once("://").map(|(_, rest)| rest).unwrap_or(uri);
    let (_, path) = rest.split_once('/')?;
    let name = path.split('?').next().unwrap_or_default();
    (!name.is_empty()).then(|| name.to_string())
}

struct Connection {
    client: Client,
    database: Database,
}

/// Owns the process's MongoDB client.
///
/// Constructed once in `main` and shared through `AppState`. The client is
/// opened by [`MongoStore::connect`], or lazily by the first operation that
/// needs it, and released by [`MongoStore::close`].
pub struct MongoStore {
    uri: String,
    database_name: Option<String>,
    connection: RwLock<Option<Connection>>,
}

impl MongoStore {
    pub fn new(uri: impl Into<String>, database_name: Option<String>) -> Self {
        Self {
            uri: uri.into(),
            database_name,
            connection: RwLock::new(None),
        }
    }

    /// Opens the client, verifies the deployment and registers the
    /// collection. Does nothing if a connection is already held.
    pub async fn connect(&self) -> Result<(), StoreError> {
        let mut connection = self.connection.write().await;
        if connection.is_some() {
            debug!("MongoDB connection already established");
            return Ok(());
        }

        match open(&self.uri, self.database_name.as_deref()).await {
            Ok(opened) => {
                info!("Connected to MongoDB database '{}'", opened.database.name());
                *connection = Some(opened);
                Ok(())
            }
            Err(e) => {
                error!("Failed to connect to MongoDB: {}", e);
                Err(e)
            }
        }
    }

    pub async fn close(&self) {
        let connection = self.connection.write().await.take();
        if let Some(connection) = connection {
            connection.client.shutdown().await;
            info!("Closed MongoDB connection");
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.read().await.is_some()
    }

    async fn database(&self) -> Result<Database, StoreError> {
        if let Some(connection) = self.connection.read().await.as_ref() {
            return Ok(connection.database.clone());
        }

        self.connect().await?;
        self.connection
            .read()
            .await
            .as_ref()
            .map(|connection| connection.database.clone())
            .ok_or_else(|| StoreError::Unavailable("connection closed".to_string()))
    }

    async fn collection(&self) -> Result<Collection<TeamRequestDocument>, StoreError> {
        Ok(self.database().await?.collection(COLLECTION_NAME))
    }
}

async fn open(uri: &str, database_name: Option<&str>) -> Result<Connection, StoreError> {
    let unavailable = |e: mongodb::error::Error| StoreError::Unavailable(e.to_string());

    let mut options = ClientOptions::parse(uri).await.map_err(unavailable)?;
    options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
    options.connect_timeout = Some(CONNECT_TIMEOUT);
    options
        .app_name
        .get_or_insert_with(|| env!("CARGO_PKG_NAME").to_string());
    prefer_ipv4(&mut options).await;

    let name = database_name
        .map(str::to_string)
        .or_else(|| database_name_from_uri(uri))
        .unwrap_or_else(|| FALLBACK_DATABASE.to_string());

    let client = Client::with_options(options).map_err(unavailable)?;
    let database = client.database(&name);

    database
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(unavailable)?;
    register_collection(&database).await.map_err(unavailable)?;

    Ok(Connection { client, database })
}

/// Ensures the index backing the oldest-first listing.
async fn register_collection(database: &Database) -> Result<(), mongodb::error::Error> {
    let index = IndexModel::builder().keys(doc! { "created_at": 1 }).build();
    database
        .collection::<TeamRequestDocument>(COLLECTION_NAME)
        .create_index(index)
        .await?;
    debug!("Registered collection '{}'", COLLECTION_NAME);
    Ok(())
}

/// Rewrites plain-TCP host names to their IPv4 address so the driver never
/// dials an IPv6 address first. TLS deployments keep their names, the
/// certificate is checked against them.
async fn prefer_ipv4(options: &mut ClientOptions) {
    if matches!(options.tls, Some(Tls::Enabled(_))) {
        debug!("TLS enabled, keeping MongoDB host names");
        return;
    }

    for address in options.hosts.iter_mut() {
        if let ServerAddress::Tcp { host, port, .. } = address {
            let target = (host.clone(), port.unwrap_or(DEFAULT_MONGODB_PORT));
            let v4 = match tokio::net::lookup_host(target).await {
                Ok(mut resolved) => resolved.find(SocketAddr::is_ipv4),
                Err(e) => {
                    warn!("Could not resolve MongoDB host {}: {}", host, e);
                    None
                }
            };
            if let Some(v4) = v4 {
                debug!("Using {} for MongoDB host {}", v4.ip(), host);
                *host = v4.ip().to_string();
            }
        }
    }
}

#[async_trait]
impl RequestStore for MongoStore {
    async fn list(&self) -> Result<Vec<TeamRequest>, StoreError> {
        let collection = self.collection().await?;
        let mut cursor = collection
            .find(doc! {})
            .sort(doc! { "created_at": 1, "createdAt": 1 })
            .await?;

        let mut requests = Vec::new();
        while let Some(document) = cursor.next().await {
            requests.push(document?.into_request()?);
        }
        // Documents written by the old service carry `createdAt` instead.
        requests.sort_by_key(|request| request.created_at);
        Ok(requests)
    }

    async fn get(&self, id: &str) -> Result<Option<TeamRequest>, StoreError> {
        let collection = self.collection().await?;
        collection
            .find_one(id_filter(id))
            .await?
            .map(TeamRequestDocument::into_request)
            .transpose()
    }

    async fn insert(
        &self,
        payload: TeamRequestPayload,
        now: DateTime<Utc>,
    ) -> Result<TeamRequest, StoreError> {
        let collection = self.collection().await?;
        let mut request = TeamRequest::from_payload(String::new(), payload, now);
        let document = TeamRequestDocument::from_request(&request, None);

        let result = collection.insert_one(&document).await?;
        request.id = bson_to_id(&result.inserted_id);
        Ok(request)
    }

    async fn replace(&self, request: &TeamRequest) -> Result<bool, StoreError> {
        let collection = self.collection().await?;
        let document = TeamRequestDocument::from_request(request, None);

        let result = collection
            .replace_one(id_filter(&request.id), &document)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let collection = self.collection().await?;
        let result = collection.delete_one(id_filter(id)).await?;
        Ok(result.deleted_count > 0)
    }

    async fn import(&self, request: TeamRequest) -> Result<(), StoreError> {
        let collection = self.collection().await?;
        let document = TeamRequestDocument::from_request(&request, Some(id_to_bson(&request.id)));

        match collection.insert_one(&document).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Conflict(request.id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let database = self.database().await?;
        database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
