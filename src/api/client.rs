//! GraphQL transport.
//!
//! Every call is one `POST <address>/graphql` carrying `{query, variables}`
//! and returning `{data, errors}`. Anything but `200 OK`, or a non-empty
//! `errors` list, is a failure and the `data` member is discarded.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::{GraphQlError, ProviderError};

/// GraphQL variables. Absent values are left out of the request entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Variables(serde_json::Map<String, Value>);

impl Variables {
    /// Create an empty set of variables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    /// Set a variable only when a value is present.
    pub fn with_opt<V: Into<Value>>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(name, v),
            None => self,
        }
    }

    /// Look up a variable.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Whether no variables are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The request envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQlRequest {
    /// The query or mutation document.
    pub query: String,
    /// The variables referenced by the document.
    #[serde(skip_serializing_if = "Variables::is_empty")]
    pub variables: Variables,
}

impl GraphQlRequest {
    /// The operation name declared by the document, e.g. `CreateAlert`.
    pub fn operation_name(&self) -> &str {
        operation_name(&self.query)
    }
}

/// Extract the operation name from a `query Name(...)` / `mutation Name {` document.
pub fn operation_name(document: &str) -> &str {
    let trimmed = document.trim_start();
    let rest = ["query", "mutation"]
        .iter()
        .find_map(|kw| trimmed.strip_prefix(kw))
        .unwrap_or("");
    let rest = rest.trim_start();
    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    &rest[..end]
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

/// Raw HTTP result handed back by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A `200 OK` response with a JSON body.
    pub fn ok_json(body: &Value) -> Self {
        Self {
            status: 200,
            body: body.to_string().into_bytes(),
        }
    }
}

/// Sends one GraphQL request and returns the raw HTTP answer.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// POST the request to the GraphQL endpoint.
    async fn post(&self, request: &GraphQlRequest) -> Result<HttpResponse, ProviderError>;
}

/// [`Transport`] over HTTPS using `reqwest`.
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: Url,
    token: String,
}

impl HttpTransport {
    /// Build a transport for the given configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let mut builder = reqwest::Client::builder().no_proxy();
        if let Some(pem) = &config.ca_certificate {
            // rustls parses PEM lazily and silently skips garbage
            if !pem.contains("-----BEGIN CERTIFICATE-----") {
                return Err(ProviderError::Configuration(
                    "invalid CA certificate: no PEM certificate block found".to_string(),
                ));
            }
            let cert = reqwest::Certificate::from_pem(pem.as_bytes()).map_err(|e| {
                ProviderError::Configuration(format!("invalid CA certificate: {}", e))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        Ok(Self {
            http: builder.build()?,
            endpoint: graphql_endpoint(&config.address)?,
            token: config.api_token.clone(),
        })
    }

    /// The resolved GraphQL endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, request: &GraphQlRequest) -> Result<HttpResponse, ProviderError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

/// Append the `graphql` path segment to a base address.
pub fn graphql_endpoint(address: &Url) -> Result<Url, ProviderError> {
    let mut url = address.clone();
    url.path_segments_mut()
        .map_err(|_| {
            ProviderError::Configuration(format!("address '{}' cannot be a base URL", address))
        })?
        .pop_if_empty()
        .push("graphql");
    Ok(url)
}

/// Humio GraphQL client.
///
/// Cheap to clone; clones share one transport.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client talking HTTPS to the configured cluster.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self::with_transport(HttpTransport::new(config)?))
    }

    /// Create a client over an arbitrary transport.
    pub fn with_transport(transport: impl Transport) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// Run a query and decode its `data` member into `T`.
    pub async fn query<T: DeserializeOwned>(
        &self,
        document: &str,
        variables: Variables,
    ) -> Result<T, ProviderError> {
        let data = self.send(document, variables).await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Run a mutation whose payload is not needed.
    pub async fn execute(&self, document: &str, variables: Variables) -> Result<(), ProviderError> {
        self.send(document, variables).await.map(|_| ())
    }

    async fn send(&self, document: &str, variables: Variables) -> Result<Value, ProviderError> {
        let request = GraphQlRequest {
            query: document.to_string(),
            variables,
        };
        let operation = request.operation_name().to_string();
        debug!(operation = %operation, "Sending GraphQL request");

        let response = self.transport.post(&request).await?;
        if response.status != 200 {
            warn!(operation = %operation, status = response.status, "GraphQL request rejected");
            return Err(ProviderError::HttpStatus {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }

        let envelope: GraphQlResponse = serde_json::from_slice(&response.body)?;
        if let Some(errors) = envelope.errors.filter(|e| !e.is_empty()) {
            warn!(operation = %operation, errors = errors.len(), "GraphQL response has errors");
            return Err(ProviderError::GraphQl(errors));
        }
        Ok(envelope.data.unwrap_or(Value::Null))
    }

    /// Repository operations.
    pub fn repositories(&self) -> super::Repositories<'_> {
        super::Repositories::new(self)
    }

    /// Alert operations.
    pub fn alerts(&self) -> super::Alerts<'_> {
        super::Alerts::new(self)
    }

    /// Action operations.
    pub fn actions(&self) -> super::Actions<'_> {
        super::Actions::new(self)
    }

    /// Ingest token operations.
    pub fn ingest_tokens(&self) -> super::IngestTokens<'_> {
        super::IngestTokens::new(self)
    }

    /// Parser operations.
    pub fn parsers(&self) -> super::Parsers<'_> {
        super::Parsers::new(self)
    }

    /// User operations.
    pub fn users(&self) -> super::Users<'_> {
        super::Users::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Replays one canned response and records the request.
    struct Canned {
        response: HttpResponse,
        seen: Arc<Mutex<Vec<GraphQlRequest>>>,
    }

    impl Canned {
        fn new(status: u16, body: Value) -> (Self, Arc<Mutex<Vec<GraphQlRequest>>>) {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let canned = Self {
                response: HttpResponse {
                    status,
                    body: body.to_string().into_bytes(),
                },
                seen: Arc::clone(&seen),
            };
            (canned, seen)
        }
    }

    #[async_trait]
    impl Transport for Canned {
        async fn post(&self, request: &GraphQlRequest) -> Result<HttpResponse, ProviderError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.response.clone())
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct CurrentUser {
        #[serde(rename = "currentUser")]
        current_user: Named,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Named {
        name: String,
    }

    #[test]
    fn test_operation_name() {
        assert_eq!(
            operation_name("\nquery ListAlerts($SearchDomainName: String!) {"),
            "ListAlerts"
        );
        assert_eq!(operation_name("mutation CreateRepository($Name: String!)"), "CreateRepository");
        assert_eq!(operation_name("query CurrentUser {"), "CurrentUser");
        assert_eq!(operation_name("{ currentUser { id } }"), "");
    }

    #[test]
    fn test_variables_skip_absent_values() {
        let vars = Variables::new()
            .with("Name", "web")
            .with_opt("Parser", None::<String>)
            .with_opt("RetentionDays", Some(30.0));
        assert_eq!(
            serde_json::to_value(&vars).unwrap(),
            json!({"Name": "web", "RetentionDays": 30.0})
        );

        let request = GraphQlRequest {
            query: "query CurrentUser { currentUser { id } }".to_string(),
            variables: Variables::new(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"query": "query CurrentUser { currentUser { id } }"})
        );
    }

    #[test]
    fn test_graphql_endpoint() {
        let base = Url::parse("https://cloud.humio.com").unwrap();
        assert_eq!(
            graphql_endpoint(&base).unwrap().as_str(),
            "https://cloud.humio.com/graphql"
        );

        let base = Url::parse("https://logs.example.com/humio/").unwrap();
        assert_eq!(
            graphql_endpoint(&base).unwrap().as_str(),
            "https://logs.example.com/humio/graphql"
        );
    }

    #[tokio::test]
    async fn test_query_decodes_data() {
        let (canned, seen) = Canned::new(200, json!({"data": {"currentUser": {"name": "ada"}}}));
        let client = Client::with_transport(canned);

        let user: CurrentUser = client
            .query("query CurrentUser { currentUser { name } }", Variables::new())
            .await
            .unwrap();
        assert_eq!(user.current_user.name, "ada");
        assert_eq!(seen.lock().unwrap()[0].operation_name(), "CurrentUser");
    }

    #[tokio::test]
    async fn test_errors_never_populate_target() {
        let (canned, _) = Canned::new(
            200,
            json!({
                "data": {"currentUser": {"name": "ada"}},
                "errors": [{"message": "first"}, {"message": "second"}]
            }),
        );
        let client = Client::with_transport(canned);

        let result: Result<CurrentUser, _> = client
            .query("query CurrentUser { currentUser { name } }", Variables::new())
            .await;
        match result {
            Err(ProviderError::GraphQl(errors)) => {
                assert_eq!(errors.len(), 2);
                let err = ProviderError::GraphQl(errors);
                assert_eq!(err.to_string(), "GraphQL error: first; second");
            }
            other => panic!("expected GraphQL error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_error_list_is_success() {
        let (canned, _) = Canned::new(200, json!({"data": {"deleteAlert": true}, "errors": []}));
        let client = Client::with_transport(canned);
        tokio_test::assert_ok!(
            client
                .execute("mutation DeleteAlert { deleteAlert }", Variables::new())
                .await
        );
    }

    #[tokio::test]
    async fn test_non_200_status() {
        let (canned, _) = Canned::new(401, json!("The token is invalid"));
        let client = Client::with_transport(canned);

        let err = client
            .execute("mutation DeleteAlert { deleteAlert }", Variables::new())
            .await
            .unwrap_err();
        match err {
            ProviderError::HttpStatus { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("The token is invalid"));
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_null_data_with_target_is_decode_error() {
        let (canned, _) = Canned::new(200, json!({"data": null}));
        let client = Client::with_transport(canned);
        let result: Result<CurrentUser, _> = client
            .query("query CurrentUser { currentUser { name } }", Variables::new())
            .await;
        assert!(matches!(result, Err(ProviderError::Serialization(_))));
    }

    fn header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n")
    }

    #[tokio::test]
    async fn test_http_transport_sends_bearer_post() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = header_end(&buf) {
                    let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                    let len = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + len {
                        break;
                    }
                }
            }

            let body = r#"{"data":{"currentUser":{"name":"ada"}}}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&buf).into_owned()
        });

        let config =
            ProviderConfig::new(&format!("http://{}/humio", addr), "secret-token").unwrap();
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.endpoint().path(), "/humio/graphql");

        let client = Client::with_transport(transport);
        let user: CurrentUser = client
            .query("query CurrentUser { currentUser { name } }", Variables::new())
            .await
            .unwrap();
        assert_eq!(user.current_user.name, "ada");

        let raw = server.await.unwrap();
        let lower = raw.to_lowercase();
        assert!(lower.starts_with("post /humio/graphql "));
        assert!(lower.contains("authorization: bearer secret-token"));
        assert!(lower.contains("content-type: application/json"));
        assert!(raw.contains(r#""query":"query CurrentUser { currentUser { name } }""#));
    }

    #[tokio::test]
    async fn test_invalid_ca_certificate() {
        let config = ProviderConfig::new("https://cloud.humio.com", "t")
            .unwrap()
            .with_ca_certificate("not a certificate");
        let err = HttpTransport::new(&config).err();
        assert!(matches!(err, Some(ProviderError::Configuration(_))));
    }
}
