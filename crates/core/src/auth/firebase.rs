//! Firebase backend: Identity Toolkit for accounts, Firestore for the
//! `users` collection. Both are spoken to over their REST APIs.
//!
//! Provider error codes are translated into [`AuthError`] in
//! [`translate_code`] and nowhere else.

use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{Account, AuthBackend, AuthError, AuthResult, UserRecord};
use crate::config::FirebaseConfig;

const USERS: &str = "users";

pub struct FirebaseBackend {
    http: reqwest::Client,
    config: FirebaseConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

impl FirebaseBackend {
    pub fn new(config: FirebaseConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.config.firestore_url.trim_end_matches('/'),
            self.config.project_id
        )
    }

    async fn password_call(&self, method: &str, email: &str, password: &str) -> AuthResult<Account> {
        let url = format!("{}/accounts:{}", self.config.auth_url.trim_end_matches('/'), method);
        debug!("POST accounts:{method}");
        let response = self
            .http
            .post(url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await
            .map_err(network)?;

        let token: TokenResponse = parse(response).await?;
        Ok(Account {
            uid: token.local_id,
            email: if token.email.is_empty() { email.to_string() } else { token.email },
            id_token: token.id_token,
        })
    }
}

impl AuthBackend for FirebaseBackend {
    async fn find_email_by_username(&self, username: &str) -> AuthResult<Option<String>> {
        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": USERS }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": "username" },
                        "op": "EQUAL",
                        "value": { "stringValue": username },
                    }
                },
                "limit": 1,
            }
        });
        let response = self
            .http
            .post(format!("{}:runQuery", self.documents_url()))
            .query(&[("key", self.config.api_key.as_str())])
            .json(&query)
            .send()
            .await
            .map_err(network)?;

        let rows: Vec<Value> = parse(response).await?;
        Ok(rows.iter().find_map(|row| {
            row.pointer("/document/fields/email/stringValue")
                .and_then(Value::as_str)
                .map(str::to_string)
        }))
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Account> {
        self.password_call("signInWithPassword", email, password).await
    }

    async fn create_account(&self, email: &str, password: &str) -> AuthResult<Account> {
        self.password_call("signUp", email, password).await
    }

    async fn store_user(&self, account: &Account, record: &UserRecord) -> AuthResult<()> {
        let body = json!({
            "fields": {
                "username": { "stringValue": record.username },
                "email": { "stringValue": record.email },
                "createdAt": { "stringValue": record.created_at.to_rfc3339() },
            }
        });
        let response = self
            .http
            .patch(format!("{}/{}/{}", self.documents_url(), USERS, account.uid))
            .bearer_auth(&account.id_token)
            .json(&body)
            .send()
            .await
            .map_err(network)?;

        let _: Value = parse(response).await?;
        Ok(())
    }
}

fn network(e: reqwest::Error) -> AuthError {
    warn!("auth request failed: {}", e);
    AuthError::Network
}

async fn parse<T: for<'de> Deserialize<'de>>(response: Response) -> AuthResult<T> {
    let status = response.status();
    let body = response.bytes().await.map_err(network)?;

    if !status.is_success() {
        let code = serde_json::from_slice::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or_default();
        warn!("auth backend returned {}: {}", status, code);
        return Err(if code.is_empty() {
            fallback(status)
        } else {
            translate_code(&code)
        });
    }

    serde_json::from_slice(&body).map_err(|e| {
        warn!("unreadable auth response: {}", e);
        AuthError::Backend("Unexpected response from the authentication service.".to_string())
    })
}

fn fallback(status: StatusCode) -> AuthError {
    AuthError::Backend(format!("The authentication service returned {status}."))
}

/// Maps an Identity Toolkit / Firestore error message to [`AuthError`].
///
/// Messages look like `WEAK_PASSWORD : Password should be at least 6
/// characters`; only the code before ` : ` is significant.
pub fn translate_code(message: &str) -> AuthError {
    let code = message.split(" : ").next().unwrap_or(message).trim();
    match code {
        "EMAIL_EXISTS" => AuthError::EmailInUse,
        "INVALID_EMAIL" => AuthError::InvalidEmail,
        "WEAK_PASSWORD" => AuthError::WeakPassword,
        "EMAIL_NOT_FOUND" => AuthError::UserNotFound,
        "INVALID_PASSWORD" => AuthError::WrongPassword,
        "INVALID_LOGIN_CREDENTIALS" => AuthError::InvalidCredentials,
        "MISSING_EMAIL" | "MISSING_PASSWORD" => AuthError::MissingFields,
        "USER_DISABLED" => AuthError::Backend("This account has been disabled.".to_string()),
        c if c.starts_with("TOO_MANY_ATTEMPTS_TRY_LATER") => {
            AuthError::Backend("Too many attempts. Please try again later.".to_string())
        }
        _ => AuthError::Backend(message.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{patch, post};
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn backend(base: &str) -> FirebaseBackend {
        FirebaseBackend::new(FirebaseConfig {
            api_key: "test-key".to_string(),
            project_id: "plantguard".to_string(),
            auth_url: format!("{base}/v1"),
            firestore_url: format!("{base}/v1"),
        })
    }

    #[test]
    fn translates_provider_codes() {
        assert_eq!(translate_code("EMAIL_EXISTS"), AuthError::EmailInUse);
        assert_eq!(
            translate_code("WEAK_PASSWORD : Password should be at least 6 characters"),
            AuthError::WeakPassword
        );
        assert_eq!(translate_code("INVALID_PASSWORD"), AuthError::WrongPassword);
        assert_eq!(translate_code("EMAIL_NOT_FOUND"), AuthError::UserNotFound);
        assert_eq!(
            translate_code("SOMETHING_NEW"),
            AuthError::Backend("SOMETHING_NEW".to_string())
        );
    }

    #[tokio::test]
    async fn sign_in_returns_account() {
        let router = Router::new().route(
            "/v1/accounts:signInWithPassword",
            post(|Query(q): Query<HashMap<String, String>>, Json(body): Json<Value>| async move {
                assert_eq!(q.get("key").map(String::as_str), Some("test-key"));
                Json(json!({
                    "localId": "uid-42",
                    "email": body["email"],
                    "idToken": "id-token",
                    "refreshToken": "refresh",
                    "expiresIn": "3600"
                }))
            }),
        );
        let base = serve(router).await;

        let account = backend(&base).sign_in("farmer@example.com", "secret1").await.unwrap();
        assert_eq!(account.uid, "uid-42");
        assert_eq!(account.email, "farmer@example.com");
        assert_eq!(account.id_token, "id-token");
    }

    #[tokio::test]
    async fn provider_errors_are_translated() {
        let router = Router::new().route(
            "/v1/accounts:signUp",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": { "code": 400, "message": "EMAIL_EXISTS" } })),
                )
            }),
        );
        let base = serve(router).await;

        let err = backend(&base).create_account("taken@example.com", "secret1").await.unwrap_err();
        assert_eq!(err, AuthError::EmailInUse);
    }

    #[tokio::test]
    async fn username_lookup_reads_email_field() {
        let router = Router::new().route(
            "/v1/projects/plantguard/databases/(default)/documents:runQuery",
            post(|Json(query): Json<Value>| async move {
                let wanted = query
                    .pointer("/structuredQuery/where/fieldFilter/value/stringValue")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                if wanted == "farmer" {
                    Json(json!([{
                        "document": {
                            "name": "projects/plantguard/databases/(default)/documents/users/uid-1",
                            "fields": {
                                "username": { "stringValue": "farmer" },
                                "email": { "stringValue": "farmer@example.com" }
                            }
                        },
                        "readTime": "2024-05-01T10:00:00Z"
                    }]))
                } else {
                    Json(json!([{ "readTime": "2024-05-01T10:00:00Z" }]))
                }
            }),
        );
        let base = serve(router).await;
        let backend = backend(&base);

        assert_eq!(
            backend.find_email_by_username("farmer").await.unwrap().as_deref(),
            Some("farmer@example.com")
        );
        assert_eq!(backend.find_email_by_username("ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn store_user_sends_bearer_token_and_fields() {
        let seen: Arc<Mutex<Option<(String, String, Value)>>> = Arc::default();
        let captured = seen.clone();
        let router = Router::new().route(
            "/v1/projects/plantguard/databases/(default)/documents/users/{uid}",
            patch(move |Path(uid): Path<String>, headers: HeaderMap, Json(body): Json<Value>| {
                let captured = captured.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    *captured.lock().unwrap() = Some((uid, auth, body));
                    Json(json!({ "name": "users/doc" }))
                }
            }),
        );
        let base = serve(router).await;

        let account = Account {
            uid: "uid-7".to_string(),
            email: "new@example.com".to_string(),
            id_token: "tok".to_string(),
        };
        let record = UserRecord {
            username: "grower_1".to_string(),
            email: "new@example.com".to_string(),
            created_at: "2024-05-01T10:00:00Z".parse().unwrap(),
        };
        backend(&base).store_user(&account, &record).await.unwrap();

        let (uid, auth, body) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(uid, "uid-7");
        assert_eq!(auth, "Bearer tok");
        assert_eq!(body.pointer("/fields/username/stringValue"), Some(&json!("grower_1")));
    }

    #[tokio::test]
    async fn unreachable_service_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = backend(&format!("http://{addr}"))
            .sign_in("a@b.c", "secret1")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Network);
    }
}
