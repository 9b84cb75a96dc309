// Odoo JSON-RPC web client
//
// Two endpoints are used: /web/session/authenticate to obtain a session_id
// cookie, and /web/dataset/call_kw/{model}/{method} for every ORM call made
// with that cookie.

use regex::Regex;
use reqwest::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::LazyLock;

use crate::config::OdooCredentials;
use crate::error::{WebhookError, WebhookResult};

static SESSION_COOKIE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"session_id=([^;]+)").expect("session cookie pattern is a valid regex"));

/// Session token issued by Odoo for one call chain.
#[derive(Clone, PartialEq, Eq)]
pub struct Session(String);

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Value for the `Cookie` request header
    pub fn cookie_header(&self) -> String {
        format!("session_id={}", self.0)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Session(<redacted>)")
    }
}

/// One `[field, operator, value]` term of an Odoo search domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainTerm(pub String, pub String, pub Value);

impl DomainTerm {
    pub fn new(field: &str, operator: &str, value: impl Into<Value>) -> Self {
        Self(field.to_string(), operator.to_string(), value.into())
    }
}

#[derive(Debug, Serialize)]
struct CallKwRequest<'a> {
    model: &'a str,
    method: &'a str,
    args: Value,
    kwargs: Value,
}

/// Odoo client bound to one base URL.
#[derive(Clone, Debug)]
pub struct OdooClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OdooClient {
    /// Create a client with its own HTTP connection pool.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(reqwest::Client::new(), base_url)
    }

    pub fn with_http_client(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Log in and return the session token from the `session_id` cookie.
    pub async fn authenticate(&self, credentials: &OdooCredentials) -> WebhookResult<Session> {
        let body = json!({
            "jsonrpc": "2.0",
            "params": {
                "db": credentials.db,
                "login": credentials.login,
                "password": credentials.password,
            }
        });

        tracing::debug!(db = %credentials.db, login = %credentials.login, "Authenticating with Odoo");

        let response = self
            .http_client
            .post(format!("{}/web/session/authenticate", self.base_url))
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let session_id = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|cookie| {
                SESSION_COOKIE
                    .captures(cookie)
                    .map(|caps| caps[1].to_string())
            });

        // Odoo hands out a session cookie even when the login is refused
        let envelope: Option<Value> = response.json().await.ok();
        if let Some(error) = envelope.as_ref().and_then(|e| e.get("error")) {
            let message = error_message(error);
            tracing::warn!(message = %message, "Odoo rejected login");
            return Err(WebhookError::Auth(format!("Auth failed: {}", message)));
        }

        match session_id {
            Some(id) => {
                tracing::info!(db = %credentials.db, "Authenticated with Odoo");
                Ok(Session::new(id))
            }
            None => {
                tracing::warn!("Odoo login response carried no session cookie");
                Err(WebhookError::Auth("Auth failed".to_string()))
            }
        }
    }

    /// Call an ORM method and return the `result` of the envelope.
    pub async fn call_kw(
        &self,
        session: &Session,
        model: &str,
        method: &str,
        args: Value,
        kwargs: Value,
    ) -> WebhookResult<Value> {
        let request = CallKwRequest {
            model,
            method,
            args,
            kwargs,
        };

        tracing::debug!(model, method, "Calling Odoo");

        let response = self
            .http_client
            .post(format!(
                "{}/web/dataset/call_kw/{}/{}",
                self.base_url, model, method
            ))
            .header(CONTENT_TYPE, "application/json")
            .header(COOKIE, session.cookie_header())
            .json(&request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        let envelope: Value = serde_json::from_str(&body).map_err(|_| {
            tracing::error!(model, method, status, "Odoo returned a non-JSON body");
            WebhookError::RemoteCall(format!(
                "Odoo returned a non-JSON response (HTTP {})",
                status
            ))
        })?;

        if let Some(error) = envelope.get("error") {
            let message = error_message(error);
            tracing::error!(model, method, message = %message, "Odoo call failed");
            return Err(WebhookError::RemoteCall(message));
        }

        envelope.get("result").cloned().ok_or_else(|| {
            WebhookError::RemoteCall(format!("Odoo response to {}.{} carried no result", model, method))
        })
    }

    /// `search` with a domain, returning matching record ids.
    pub async fn search(
        &self,
        session: &Session,
        model: &str,
        domain: &[DomainTerm],
        limit: Option<u32>,
    ) -> WebhookResult<Vec<i64>> {
        let kwargs = match limit {
            Some(limit) => json!({ "limit": limit }),
            None => json!({}),
        };
        let result = self
            .call_kw(session, model, "search", json!([domain]), kwargs)
            .await?;

        serde_json::from_value(result).map_err(|e| {
            WebhookError::RemoteCall(format!("Unexpected {}.search result: {}", model, e))
        })
    }

    /// `create` one record, returning its id.
    pub async fn create(&self, session: &Session, model: &str, values: Value) -> WebhookResult<i64> {
        let result = self
            .call_kw(session, model, "create", json!([values]), json!({}))
            .await?;

        record_id(&result).ok_or_else(|| {
            WebhookError::RemoteCall(format!("Unexpected {}.create result: {}", model, result))
        })
    }
}

/// Odoo answers `create` with an id, or a one-element list of ids on newer versions.
fn record_id(result: &Value) -> Option<i64> {
    match result {
        Value::Array(ids) if ids.len() == 1 => ids[0].as_i64(),
        other => other.as_i64(),
    }
}

/// `error.data.message`, then `error.message`, then a generic label.
fn error_message(error: &Value) -> String {
    let non_empty = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    non_empty(error.pointer("/data/message"))
        .or_else(|| non_empty(error.get("message")))
        .unwrap_or_else(|| "Odoo error".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials(url: &str) -> OdooCredentials {
        OdooCredentials {
            url: url.to_string(),
            db: "acme".to_string(),
            login: "bot@acme.gy".to_string(),
            password: "key-123".to_string(),
        }
    }

    #[test]
    fn test_error_message_preference() {
        let error = json!({ "message": "Odoo Server Error", "data": { "message": "Access Denied" } });
        assert_eq!(error_message(&error), "Access Denied");

        let error = json!({ "message": "Odoo Server Error", "data": { "message": "" } });
        assert_eq!(error_message(&error), "Odoo Server Error");

        assert_eq!(error_message(&json!({})), "Odoo error");
    }

    #[test]
    fn test_domain_term_serializes_as_triple() {
        let domain = vec![
            DomainTerm::new("name", "=", "OpenAI"),
            DomainTerm::new("supplier_rank", ">=", 1),
        ];
        assert_eq!(
            serde_json::to_value(&domain).unwrap(),
            json!([["name", "=", "OpenAI"], ["supplier_rank", ">=", 1]])
        );
    }

    #[test]
    fn test_record_id_shapes() {
        assert_eq!(record_id(&json!(42)), Some(42));
        assert_eq!(record_id(&json!([42])), Some(42));
        assert_eq!(record_id(&json!([1, 2])), None);
        assert_eq!(record_id(&json!(false)), None);
    }

    #[test]
    fn test_session_debug_is_redacted() {
        let session = Session::new("abc123");
        assert_eq!(format!("{:?}", session), "Session(<redacted>)");
        assert_eq!(session.cookie_header(), "session_id=abc123");
    }

    #[tokio::test]
    async fn test_authenticate_extracts_session_cookie() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/web/session/authenticate"))
            .and(body_json(json!({
                "jsonrpc": "2.0",
                "params": { "db": "acme", "login": "bot@acme.gy", "password": "key-123" }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "session_id=abc123; Expires=Sat, 01 Jan 2000 00:00:00 GMT; Path=/; HttpOnly")
                    .set_body_json(json!({ "jsonrpc": "2.0", "result": { "uid": 2 } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = OdooClient::new(server.uri());
        let session = client.authenticate(&credentials(&server.uri())).await.unwrap();
        assert_eq!(session, Session::new("abc123"));
    }

    #[tokio::test]
    async fn test_authenticate_without_cookie_fails() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/web/session/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": {} })))
            .mount(&server)
            .await;

        let client = OdooClient::new(server.uri());
        let err = client
            .authenticate(&credentials(&server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::Auth(_)));
        assert_eq!(err.to_string(), "Auth failed");
    }

    #[tokio::test]
    async fn test_authenticate_surfaces_login_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/web/session/authenticate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "session_id=anon; Path=/")
                    .set_body_json(json!({
                        "error": { "message": "Odoo Server Error", "data": { "message": "Access Denied" } }
                    })),
            )
            .mount(&server)
            .await;

        let client = OdooClient::new(server.uri());
        let err = client
            .authenticate(&credentials(&server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Auth failed: Access Denied");
    }

    #[tokio::test]
    async fn test_call_kw_sends_envelope_and_cookie() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/web/dataset/call_kw/res.partner/search"))
            .and(header("cookie", "session_id=abc123"))
            .and(body_json(json!({
                "model": "res.partner",
                "method": "search",
                "args": [[["name", "=", "OpenAI"]]],
                "kwargs": { "limit": 1 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": [7] })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OdooClient::new(format!("{}/", server.uri()));
        let ids = client
            .search(
                &Session::new("abc123"),
                "res.partner",
                &[DomainTerm::new("name", "=", "OpenAI")],
                Some(1),
            )
            .await
            .unwrap();
        assert_eq!(ids, vec![7]);
    }

    #[tokio::test]
    async fn test_call_kw_error_envelope() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/web/dataset/call_kw/account.move/create"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": { "message": "Odoo Server Error", "data": { "message": "Invalid field 'foo' on model 'account.move'" } }
            })))
            .mount(&server)
            .await;

        let client = OdooClient::new(server.uri());
        let err = client
            .create(&Session::new("abc123"), "account.move", json!({ "foo": 1 }))
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::RemoteCall(_)));
        assert_eq!(err.to_string(), "Invalid field 'foo' on model 'account.move'");
    }

    #[tokio::test]
    async fn test_call_kw_non_json_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
            .mount(&server)
            .await;

        let client = OdooClient::new(server.uri());
        let err = client
            .call_kw(&Session::new("abc123"), "res.partner", "search", json!([[]]), json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Odoo returned a non-JSON response (HTTP 502)");
    }
}
