use std::sync::Mutex;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{ElectionApi, IdentityApi, ListResponse};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{
    Candidate, Credentials, Election, ElectionId, ElectionStats, NewVote, Position,
    PublishReceipt, Tokens, User, VoteRecord,
};

/// HTTP client for the association backend.
///
/// Tokens live behind a mutex so the status watcher and the command loop
/// can share one client; the lock is never held across an await.
pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
    tokens: Mutex<Option<Tokens>>,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
}

#[derive(Serialize)]
struct ActivationRequest {
    is_active: bool,
}

impl HttpApi {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        let tokens = config.access_token.clone().map(|access| Tokens {
            access,
            refresh: config.refresh_token.clone(),
        });

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            tokens: Mutex::new(tokens),
        })
    }

    #[cfg(test)]
    pub fn tokens(&self) -> Option<Tokens> {
        self.lock_tokens().clone()
    }

    fn lock_tokens(&self) -> std::sync::MutexGuard<'_, Option<Tokens>> {
        // A poisoned lock only means another thread panicked mid-assignment of
        // an Option; the value is still usable.
        self.tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.lock_tokens().as_ref() {
            Some(tokens) => builder.bearer_auth(&tokens.access),
            None => builder,
        }
    }

    /// Sends a request, replaying it once after a successful token refresh
    /// when the first attempt comes back 401.
    async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<String>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.url(path);
        let build = || {
            let builder = self.http.request(method.clone(), &url);
            match body {
                Some(body) => builder.json(body),
                None => builder,
            }
        };

        debug!("{} {}", method, path);
        let mut response = self
            .authorized(build())
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        if response.status() == StatusCode::UNAUTHORIZED && self.refresh_access().await {
            debug!("Retrying {} {} with refreshed token", method, path);
            response = self
                .authorized(build())
                .send()
                .await
                .map_err(classify_reqwest_error)?;
        }

        let status = response.status();
        let text = response.text().await.map_err(classify_reqwest_error)?;
        if !status.is_success() {
            warn!("{} {} failed with HTTP {}", method, path, status.as_u16());
            return Err(Error::from_status(status.as_u16(), &text));
        }
        Ok(text)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let text = self.send::<()>(Method::GET, path, None).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn post_json<B, T>(&self, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let text = self.send(Method::POST, path, body).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let text = self.send(Method::PATCH, path, Some(body)).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        Ok(self.get_json::<ListResponse<T>>(path).await?.into_vec())
    }

    /// Exchanges the refresh token for a new access token. Any failure
    /// drops the stored tokens so the session falls back to signed-out.
    async fn refresh_access(&self) -> bool {
        let refresh = {
            let tokens = self.lock_tokens();
            tokens.as_ref().and_then(|t| t.refresh.clone())
        };
        let Some(refresh) = refresh else {
            return false;
        };

        let result = self
            .http
            .post(self.url("/auth/refresh/"))
            .json(&RefreshRequest { refresh: &refresh })
            .send()
            .await;

        let access = match result {
            Ok(response) if response.status().is_success() => {
                response.json::<RefreshResponse>().await.ok().map(|r| r.access)
            }
            Ok(response) => {
                debug!("Token refresh rejected with HTTP {}", response.status().as_u16());
                None
            }
            Err(e) => {
                warn!("Token refresh failed: {}", e);
                None
            }
        };

        let mut tokens = self.lock_tokens();
        match access {
            Some(access) => {
                *tokens = Some(Tokens {
                    access,
                    refresh: Some(refresh),
                });
                true
            }
            None => {
                *tokens = None;
                false
            }
        }
    }
}

#[async_trait]
impl ElectionApi for HttpApi {
    async fn list_elections(&self) -> Result<Vec<Election>> {
        self.get_list("/elections/elections/").await
    }

    async fn get_election(&self, election_id: ElectionId) -> Result<Election> {
        self.get_json(&format!("/elections/elections/{election_id}/"))
            .await
    }

    async fn positions(&self, election_id: ElectionId) -> Result<Vec<Position>> {
        self.get_list(&format!("/elections/positions/?election={election_id}"))
            .await
    }

    async fn candidates(&self, election_id: ElectionId) -> Result<Vec<Candidate>> {
        self.get_list(&format!("/elections/candidates/?election={election_id}"))
            .await
    }

    async fn my_votes(&self) -> Result<Vec<VoteRecord>> {
        self.get_list("/elections/votes/my_votes/").await
    }

    async fn cast_vote(&self, vote: &NewVote) -> Result<VoteRecord> {
        self.post_json("/elections/votes/", Some(vote)).await
    }

    async fn publish_results(&self, election_id: ElectionId) -> Result<PublishReceipt> {
        self.post_json::<(), _>(
            &format!("/elections/elections/{election_id}/publish_results/"),
            None,
        )
        .await
    }

    async fn election_stats(&self, election_id: ElectionId) -> Result<ElectionStats> {
        self.get_json(&format!("/elections/elections/{election_id}/stats/"))
            .await
    }

    async fn set_active(&self, election_id: ElectionId, is_active: bool) -> Result<Election> {
        self.patch_json(
            &format!("/elections/elections/{election_id}/"),
            &ActivationRequest { is_active },
        )
        .await
    }
}

#[async_trait]
impl IdentityApi for HttpApi {
    fn has_credentials(&self) -> bool {
        self.lock_tokens().is_some()
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<()> {
        // Stale tokens must not ride along on the login request.
        self.sign_out();
        let tokens: Tokens = self.post_json("/auth/login/", Some(credentials)).await?;
        *self.lock_tokens() = Some(tokens);
        Ok(())
    }

    async fn current_user(&self) -> Result<User> {
        self.get_json("/users/me/").await
    }

    fn sign_out(&self) {
        *self.lock_tokens() = None;
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Network(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        Error::Network(format!("Connection failed: {e}"))
    } else if e.is_decode() || e.is_body() {
        Error::Server {
            status: e.status().map(|s| s.as_u16()).unwrap_or(0),
            message: format!("Unreadable response: {e}"),
        }
    } else {
        Error::Network(format!("Network error: {e}"))
    }
}
