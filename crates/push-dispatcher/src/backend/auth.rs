//! Google 服务账号鉴权
//!
//! 用服务账号私钥签发 RS256 JWT，在 token_uri 换取 OAuth2 访问令牌。
//! 令牌在过期前 60 秒内刷新，刷新过程持有异步锁，避免并发分发重复换取。

use std::fmt;
use std::path::Path;

use chrono::{DateTime, TimeDelta, Utc};
use immo_shared::error::SharedError;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::NotificationError;

const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// 服务账号密钥文件中用到的字段
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish()
    }
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, NotificationError> {
        serde_json::from_str(raw)
            .map_err(|e| NotificationError::Credentials(format!("服务账号文件格式错误: {e}")))
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, NotificationError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SharedError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_json(&raw)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - TimeDelta::seconds(REFRESH_MARGIN_SECS) > now
    }
}

/// OAuth2 访问令牌提供者
pub struct AccessTokenProvider {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl AccessTokenProvider {
    pub fn new(key: ServiceAccountKey, http: reqwest::Client) -> Result<Self, NotificationError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| NotificationError::Credentials(format!("private_key 无法解析: {e}")))?;

        Ok(Self {
            key,
            encoding_key,
            http,
            cached: Mutex::new(None),
        })
    }

    /// 获取有效的访问令牌，必要时刷新
    pub async fn access_token(&self) -> Result<String, NotificationError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let fresh = self.exchange(now).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, NotificationError> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: FCM_SCOPE,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| NotificationError::Credentials(format!("JWT 签名失败: {e}")))
    }

    async fn exchange(&self, now: DateTime<Utc>) -> Result<CachedToken, NotificationError> {
        let assertion = self.assertion(now)?;

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Credentials(format!(
                "访问令牌交换失败: HTTP {status} {body}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        debug!(
            client_email = %self.key.client_email,
            expires_in = token.expires_in,
            "已刷新 FCM 访问令牌"
        );

        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + TimeDelta::seconds(token.expires_in),
        })
    }
}
