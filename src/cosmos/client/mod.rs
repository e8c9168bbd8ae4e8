
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::CosmosError;
use super::auth::{MasterKey, aad_authorization, http_date};
use super::credential::{AccessToken, TokenCredential, cosmos_scope};

const API_VERSION: &str = "2018-12-31";
const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
const TOKEN_REFRESH_MARGIN_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    Identity,
    Key,
}

#[derive(Debug)]
enum Auth {
    Key(MasterKey),
    Identity {
        credential: Arc<dyn TokenCredential>,
        scope: String,
        cached: Mutex<Option<AccessToken>>,
    },
}

#[derive(Debug, Clone, Copy)]
enum Verb {
    Get,
    Post,
}

impl Verb {
    fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

struct Request<'a> {
    verb: Verb,
    segments: Vec<&'a str>,
    resource_type: &'static str,
    resource_link: String,
    body: Option<String>,
    headers: Vec<(&'static str, String)>,
}

impl<'a> Request<'a> {
    fn get(segments: Vec<&'a str>, resource_type: &'static str, resource_link: String) -> Self {
        Self {
            verb: Verb::Get,
            segments,
            resource_type,
            resource_link,
            body: None,
            headers: Vec::new(),
        }
    }

    fn post(
        segments: Vec<&'a str>,
        resource_type: &'static str,
        resource_link: String,
        body: String,
    ) -> Self {
        Self {
            verb: Verb::Post,
            segments,
            resource_type,
            resource_link,
            body: Some(body),
            headers: Vec::new(),
        }
    }

    fn with_header(mut self, name: &'static str, value: String) -> Self {
        self.headers.push((name, value));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseProperties {
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct DatabaseList {
    #[serde(rename = "Databases", default)]
    databases: Vec<DatabaseProperties>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionKeyDefinition {
    pub paths: Vec<String>,
    #[serde(default)]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerProperties {
    pub id: String,
    #[serde(rename = "partitionKey", default)]
    pub partition_key: Option<PartitionKeyDefinition>,
}

/// Destination for upserted documents
pub trait ItemSink {
    /// Document field holding the partition key value
    fn partition_key_field(&self) -> &str;

    fn upsert_item(&self, item: &Map<String, Value>) -> Result<(), CosmosError>;
}

/// Blocking client for one Cosmos DB account
#[derive(Debug, Clone)]
pub struct CosmosClient {
    endpoint: Url,
    auth: Arc<Auth>,
    agent: ureq::Agent,
}

impl CosmosClient {
    /// Client signing requests with the account's shared key
    #[inline]
    pub fn with_key(endpoint: &str, key: &str) -> Result<Self, CosmosError> {
        let endpoint = parse_endpoint(endpoint)?;
        let key = MasterKey::from_base64(key)?;
        Ok(Self::build(endpoint, Auth::Key(key)))
    }

    /// Client presenting Azure AD tokens from `credential`
    #[inline]
    pub fn with_credential(
        endpoint: &str,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Self, CosmosError> {
        let endpoint = parse_endpoint(endpoint)?;
        let scope = cosmos_scope(&endpoint);
        Ok(Self::build(
            endpoint,
            Auth::Identity {
                credential,
                scope,
                cached: Mutex::new(None),
            },
        ))
    }

    fn build(endpoint: Url, auth: Auth) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            endpoint,
            auth: Arc::new(auth),
            agent,
        }
    }

    #[inline]
    pub fn auth_kind(&self) -> AuthKind {
        match self.auth.as_ref() {
            Auth::Key(_) => AuthKind::Key,
            Auth::Identity { .. } => AuthKind::Identity,
        }
    }

    #[inline]
    pub fn list_databases(&self) -> Result<Vec<DatabaseProperties>, CosmosError> {
        let body = self.execute(Request::get(vec!["dbs"], "dbs", String::new()))?;
        let list: DatabaseList = serde_json::from_str(&body)?;
        debug!("Account lists {} databases", list.databases.len());
        Ok(list.databases)
    }

    /// Cheap authenticated call used to validate credentials
    #[inline]
    pub fn probe(&self) -> Result<(), CosmosError> {
        self.list_databases().map(|_| ())
    }

    #[inline]
    pub fn database(&self, id: impl Into<String>) -> DatabaseClient {
        DatabaseClient {
            client: self.clone(),
            id: id.into(),
        }
    }

    #[inline]
    pub fn create_database_if_not_exists(&self, id: &str) -> Result<DatabaseClient, CosmosError> {
        let database = self.database(id);

        match database.read() {
            Ok(_) => {
                debug!("Database {} already exists", id);
                return Ok(database);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        match database.create() {
            Ok(_) => info!("Created database {}", id),
            Err(e) if e.is_conflict() => debug!("Database {} was created concurrently", id),
            Err(e) => return Err(e),
        }
        Ok(database)
    }

    fn authorization(
        &self,
        verb: Verb,
        resource_type: &str,
        resource_link: &str,
        date: &str,
    ) -> Result<String, CosmosError> {
        match self.auth.as_ref() {
            Auth::Key(key) => key.authorization(verb.as_str(), resource_type, resource_link, date),
            Auth::Identity {
                credential,
                scope,
                cached,
            } => {
                let mut cached = cached.lock().unwrap_or_else(PoisonError::into_inner);
                let margin = ChronoDuration::minutes(TOKEN_REFRESH_MARGIN_MINUTES);

                let stale = cached
                    .as_ref()
                    .is_none_or(|token| token.expires_within(Utc::now(), margin));
                if stale {
                    debug!("Requesting Azure AD token for {}", scope);
                    *cached = Some(credential.get_token(scope)?);
                }

                let token = cached
                    .as_ref()
                    .map(|token| token.token.as_str())
                    .unwrap_or_default();
                Ok(aad_authorization(token))
            }
        }
    }

    fn execute(&self, request: Request<'_>) -> Result<String, CosmosError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| CosmosError::InvalidUrl(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(request.segments.iter());

        let date = http_date(Utc::now());
        let authorization = self.authorization(
            request.verb,
            request.resource_type,
            &request.resource_link,
            &date,
        )?;

        let mut headers = vec![
            ("authorization", authorization),
            ("x-ms-date", date),
            ("x-ms-version", API_VERSION.to_string()),
            ("Accept", "application/json".to_string()),
        ];
        headers.extend(request.headers);

        debug!("{} {}", request.verb.as_str(), url.path());

        let response = match request.verb {
            Verb::Get => {
                let mut builder = self.agent.get(url.as_str());
                for (name, value) in &headers {
                    builder = builder.header(*name, value.as_str());
                }
                builder.call()
            }
            Verb::Post => {
                let mut builder = self
                    .agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json");
                for (name, value) in &headers {
                    builder = builder.header(*name, value.as_str());
                }
                builder.send(request.body.as_deref().unwrap_or_default())
            }
        };

        let mut response = response?;
        let status = response.status().as_u16();
        let substatus = response
            .headers()
            .get("x-ms-substatus")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());
        let body = response.body_mut().read_to_string()?;

        if !(200..300).contains(&status) {
            return Err(CosmosError::from_response(status, substatus, &body));
        }

        Ok(body)
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, CosmosError> {
    let url = Url::parse(endpoint.trim()).map_err(|_| CosmosError::InvalidUrl(endpoint.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(CosmosError::InvalidUrl(endpoint.to_string()));
    }
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct DatabaseClient {
    client: CosmosClient,
    id: String,
}

impl DatabaseClient {
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    fn link(&self) -> String {
        format!("dbs/{}", self.id)
    }

    #[inline]
    pub fn read(&self) -> Result<DatabaseProperties, CosmosError> {
        let body = self
            .client
            .execute(Request::get(vec!["dbs", self.id.as_str()], "dbs", self.link()))?;
        Ok(serde_json::from_str(&body)?)
    }

    #[inline]
    pub fn create(&self) -> Result<DatabaseProperties, CosmosError> {
        let payload = serde_json::to_string(&json!({ "id": self.id }))?;
        let body = self
            .client
            .execute(Request::post(vec!["dbs"], "dbs", String::new(), payload))?;
        Ok(serde_json::from_str(&body)?)
    }

    #[inline]
    pub fn container(
        &self,
        id: impl Into<String>,
        partition_key_path: impl Into<String>,
    ) -> ContainerClient {
        let partition_key_path = partition_key_path.into();
        ContainerClient {
            client: self.client.clone(),
            database: self.id.clone(),
            id: id.into(),
            partition_key_field: partition_key_path.trim_start_matches('/').to_string(),
            partition_key_path,
        }
    }

    #[inline]
    pub fn read_container(&self, id: &str) -> Result<ContainerProperties, CosmosError> {
        let link = format!("{}/colls/{}", self.link(), id);
        let body = self
            .client
            .execute(Request::get(vec!["dbs", self.id.as_str(), "colls", id], "colls", link))?;
        Ok(serde_json::from_str(&body)?)
    }

    #[inline]
    pub fn create_container(
        &self,
        id: &str,
        partition_key_path: &str,
    ) -> Result<ContainerProperties, CosmosError> {
        let properties = ContainerProperties {
            id: id.to_string(),
            partition_key: Some(PartitionKeyDefinition {
                paths: vec![partition_key_path.to_string()],
                kind: "Hash".to_string(),
            }),
        };
        let payload = serde_json::to_string(&properties)?;
        let body = self.client.execute(Request::post(
            vec!["dbs", self.id.as_str(), "colls"],
            "colls",
            self.link(),
            payload,
        ))?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Read the container, creating it on 404. An existing container keeps
    /// its own partition key path.
    #[inline]
    pub fn create_container_if_not_exists(
        &self,
        id: &str,
        partition_key_path: &str,
    ) -> Result<ContainerClient, CosmosError> {
        let existing = match self.read_container(id) {
            Ok(properties) => Some(properties),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        let properties = match existing {
            Some(properties) => {
                debug!("Container {} already exists", id);
                properties
            }
            None => match self.create_container(id, partition_key_path) {
                Ok(properties) => {
                    info!(
                        "Created container {} with partition key {}",
                        id, partition_key_path
                    );
                    properties
                }
                Err(e) if e.is_conflict() => self.read_container(id)?,
                Err(e) => return Err(e),
            },
        };

        let actual_path = properties
            .partition_key
            .and_then(|definition| definition.paths.into_iter().next())
            .unwrap_or_else(|| partition_key_path.to_string());

        if actual_path != partition_key_path {
            warn!(
                "Container {} is partitioned on {} rather than {}",
                id, actual_path, partition_key_path
            );
        }

        Ok(self.container(id, actual_path))
    }
}

#[derive(Debug, Clone)]
pub struct ContainerClient {
    client: CosmosClient,
    database: String,
    id: String,
    partition_key_path: String,
    partition_key_field: String,
}

impl ContainerClient {
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn partition_key_path(&self) -> &str {
        &self.partition_key_path
    }
}

impl ItemSink for ContainerClient {
    fn partition_key_field(&self) -> &str {
        &self.partition_key_field
    }

    fn upsert_item(&self, item: &Map<String, Value>) -> Result<(), CosmosError> {
        let partition_key = match item.get(&self.partition_key_field) {
            Some(Value::String(value)) => value.as_str(),
            _ => {
                return Err(CosmosError::InvalidDocument(format!(
                    "missing string partition key field '{}'",
                    self.partition_key_field
                )));
            }
        };

        let payload = serde_json::to_string(item)?;
        let link = format!("dbs/{}/colls/{}", self.database, self.id);

        self.client.execute(
            Request::post(
                vec!["dbs", self.database.as_str(), "colls", self.id.as_str(), "docs"],
                "docs",
                link,
                payload,
            )
            .with_header("x-ms-documentdb-is-upsert", "True".to_string())
            .with_header(
                "x-ms-documentdb-partitionkey",
                serde_json::to_string(&[partition_key])?,
            ),
        )?;

        Ok(())
    }
}
