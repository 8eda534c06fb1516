//! Client for the hosted backend: PostgREST tables and procedures under
//! `/rest/v1`, GoTrue auth under `/auth/v1`.
//!
//! This type is cheap to clone; clones share the HTTP client and session.

mod query;
mod realtime;

pub use query::Query;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use shadow_tag_api_types::prelude::*;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::auth::{AuthUser, NoSessionStorage, Session, SessionStorage};
use crate::config::BackendConfig;
use crate::error::{BackendError, NO_ROWS_CODE, Result};
use crate::traits::*;

const REST_PATH: &str = "rest/v1";
const AUTH_PATH: &str = "auth/v1";

/// SQLSTATE for `RAISE EXCEPTION` inside a procedure.
const RAISED_EXCEPTION_CODE: &str = "P0001";

#[derive(Clone)]
pub struct RestBackend {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    base: Url,
    config: BackendConfig,
    session: RwLock<Option<Session>>,
    storage: Arc<dyn SessionStorage>,
}

impl RestBackend {
    pub fn new(config: BackendConfig) -> Result<Self> {
        Self::with_storage(config, Arc::new(NoSessionStorage))
    }

    /// Restores any session found in `storage` and keeps it updated.
    pub fn with_storage(config: BackendConfig, storage: Arc<dyn SessionStorage>) -> Result<Self> {
        let mut base = Url::parse(&config.url)
            .map_err(|e| BackendError::Config(format!("invalid backend url: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            "apikey",
            header::HeaderValue::from_str(&config.anon_key)
                .map_err(|_| BackendError::Config("anon key is not a valid header value".into()))?,
        );
        let http = reqwest::Client::builder().default_headers(headers).build()?;

        let session = storage.load().unwrap_or_else(|e| {
            warn!("discarding stored session: {e}");
            None
        });

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base,
                config,
                session: RwLock::new(session),
                storage,
            }),
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.inner.config
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.inner
            .base
            .join(path)
            .map_err(|e| BackendError::Config(format!("invalid path {path}: {e}")))
    }

    fn table_url(&self, table: &str, query: &Query) -> Result<Url> {
        let mut url = self.url(&format!("{REST_PATH}/{table}"))?;
        query.apply(&mut url);
        Ok(url)
    }

    /// Signed-in requests carry the user's token, anonymous ones the anon key.
    async fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let token = match &*self.inner.session.read().await {
            Some(session) => session.access_token.clone(),
            None => self.inner.config.anon_key.clone(),
        };
        self.inner.http.request(method, url).bearer_auth(token)
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: Query) -> Result<Vec<T>> {
        let url = self.table_url(table, &query)?;
        let response = self.request(Method::GET, url).await.send().await?;
        decode(response).await
    }

    async fn select_first<T: DeserializeOwned>(&self, table: &str, query: Query) -> Result<Option<T>> {
        Ok(self.select(table, query.limit(1)).await?.into_iter().next())
    }

    /// Zero rows is `None`; more than one is an error, as with a
    /// single-object request.
    async fn select_maybe_single<T: DeserializeOwned>(
        &self,
        table: &str,
        query: Query,
    ) -> Result<Option<T>> {
        let mut rows: Vec<T> = self.select(table, query.limit(2)).await?;
        if rows.len() > 1 {
            return Err(BackendError::Api {
                status: StatusCode::NOT_ACCEPTABLE.as_u16(),
                code: Some(NO_ROWS_CODE.into()),
                message: format!("multiple rows returned from {table}"),
            });
        }
        Ok(rows.pop())
    }

    async fn insert<B: Serialize + Sync, T: DeserializeOwned>(&self, table: &str, body: &B) -> Result<T> {
        let url = self.table_url(table, &Query::filter())?;
        let response = self
            .request(Method::POST, url)
            .await
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let rows: Vec<T> = decode(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("inserted {table} row")))
    }

    async fn patch<B: Serialize + Sync>(&self, table: &str, filter: Query, body: &B) -> Result<()> {
        let url = self.table_url(table, &filter)?;
        let response = self
            .request(Method::PATCH, url)
            .await
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        check(response).await.map(drop)
    }

    async fn rpc<A: Serialize + Sync, T: DeserializeOwned>(&self, procedure: Procedure, args: &A) -> Result<T> {
        let url = self.url(&format!("{REST_PATH}/rpc/{}", procedure.name()))?;
        debug!("calling {procedure}");
        let response = self.request(Method::POST, url).await.json(args).send().await?;
        decode(response).await
    }

    /// Procedures answer with a boolean, or nothing when declared `void`.
    async fn rpc_flag<A: Serialize + Sync>(&self, procedure: Procedure, args: &A) -> Result<bool> {
        let value: Value = self.rpc(procedure, args).await?;
        Ok(value.as_bool().unwrap_or(true))
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session> {
        let mut url = self.url(&format!("{AUTH_PATH}/token"))?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        let response = self.inner.http.post(url).json(&body).send().await?;
        let token: TokenResponse = decode(response).await?;
        Ok(token.into_session(Utc::now()))
    }

    async fn store_session(&self, session: Option<Session>) {
        let persisted = match &session {
            Some(session) => self.inner.storage.save(session),
            None => self.inner.storage.clear(),
        };
        if let Err(e) = persisted {
            warn!("failed to persist session: {e}");
        }
        *self.inner.session.write().await = session;
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| now.timestamp() + secs));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(api_error(status, &body))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = check(response).await?.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_slice(b"null")?);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

/// Understands both PostgREST (`code`/`message`) and GoTrue
/// (`error_code`/`msg`/`error_description`) error bodies.
fn api_error(status: StatusCode, body: &str) -> BackendError {
    let value: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let field = |name: &str| match value.get(name) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let code = field("code").or_else(|| field("error_code"));
    let message = field("message")
        .or_else(|| field("msg"))
        .or_else(|| field("error_description"))
        .or_else(|| field("error"))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_owned());

    if code.as_deref() == Some(RAISED_EXCEPTION_CODE) {
        return BackendError::Rejected(message);
    }
    BackendError::Api {
        status: status.as_u16(),
        code,
        message,
    }
}

impl AuthApi for RestBackend {
    fn session(&self) -> BackendFuture<'_, Option<Session>> {
        Box::pin(async move {
            let current = self.inner.session.read().await.clone();
            let Some(session) = current else {
                return Ok(None);
            };
            let Some(refresh_token) = session.refresh_token.clone() else {
                return Ok(Some(session));
            };
            if !session.needs_refresh(Utc::now()) {
                return Ok(Some(session));
            }

            match self
                .token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
                .await
            {
                Ok(fresh) => {
                    debug!("refreshed session for {}", fresh.user.id);
                    self.store_session(Some(fresh.clone())).await;
                    Ok(Some(fresh))
                }
                Err(BackendError::Api { status: 400 | 401, message, .. }) => {
                    warn!("session refresh rejected ({message}); signing out");
                    self.store_session(None).await;
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
    }

    fn sign_in_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BackendFuture<'a, Session> {
        Box::pin(async move {
            let session = match self
                .token_grant("password", json!({ "email": email, "password": password }))
                .await
            {
                Ok(session) => session,
                Err(BackendError::Api { status: 400, .. }) => return Err(BackendError::InvalidCredentials),
                Err(e) => return Err(e),
            };
            info!("signed in as {}", session.user.id);
            self.store_session(Some(session.clone())).await;
            Ok(session)
        })
    }

    fn sign_up<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BackendFuture<'a, Option<Session>> {
        Box::pin(async move {
            let url = self.url(&format!("{AUTH_PATH}/signup"))?;
            let response = self
                .inner
                .http
                .post(url)
                .json(&json!({ "email": email, "password": password }))
                .send()
                .await?;

            let value: Value = match decode(response).await {
                Ok(value) => value,
                Err(BackendError::Api { message, .. }) if message.contains("already registered") => {
                    return Err(BackendError::AlreadyRegistered);
                }
                Err(e) => return Err(e),
            };

            // No token means the account needs confirming before it can sign in.
            if value.get("access_token").is_none() {
                return Ok(None);
            }
            let session = serde_json::from_value::<TokenResponse>(value)?.into_session(Utc::now());
            self.store_session(Some(session.clone())).await;
            Ok(Some(session))
        })
    }

    fn sign_out(&self) -> BackendFuture<'_, ()> {
        Box::pin(async move {
            let token = self
                .inner
                .session
                .read()
                .await
                .as_ref()
                .map(|s| s.access_token.clone());

            if let Some(token) = token {
                let url = self.url(&format!("{AUTH_PATH}/logout"))?;
                match self.inner.http.post(url).bearer_auth(token).send().await {
                    Ok(response) => {
                        if let Err(e) = check(response).await {
                            warn!("server-side sign out failed: {e}");
                        }
                    }
                    Err(e) => warn!("server-side sign out failed: {e}"),
                }
            }
            self.store_session(None).await;
            Ok(())
        })
    }
}

impl TableApi for RestBackend {
    fn find_player<'a>(&'a self, id: &'a PlayerId) -> BackendFuture<'a, Option<Player>> {
        Box::pin(self.select_maybe_single::<Player>("players", Query::new().eq("id", id)))
    }

    fn find_player_by_codename<'a>(&'a self, codename: &'a str) -> BackendFuture<'a, Option<Player>> {
        Box::pin(self.select_maybe_single::<Player>("players", Query::new().eq("codename", codename)))
    }

    fn insert_player(&self, player: NewPlayer) -> BackendFuture<'_, Player> {
        Box::pin(async move { self.insert::<NewPlayer, Player>("players", &player).await })
    }

    fn list_players(&self) -> BackendFuture<'_, Vec<Player>> {
        Box::pin(self.select::<Player>("players", Query::new()))
    }

    fn update_player_location<'a>(
        &'a self,
        id: &'a PlayerId,
        update: LocationUpdate,
    ) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            self.patch("players", Query::filter().eq("id", id), &update)
                .await
        })
    }

    fn recent_tags(&self, limit: usize) -> BackendFuture<'_, Vec<Tag>> {
        Box::pin(self.select::<Tag>("tags", Query::new().order("created_at", false).limit(limit)))
    }

    fn recent_dodges(&self, limit: usize) -> BackendFuture<'_, Vec<Dodge>> {
        Box::pin(self.select::<Dodge>("dodges", Query::new().order("created_at", false).limit(limit)))
    }

    fn active_season(&self) -> BackendFuture<'_, Option<Season>> {
        Box::pin(self.select_first::<Season>(
            "seasons",
            Query::new().eq("is_active", true).order("start_date", false),
        ))
    }

    fn list_seasons(&self) -> BackendFuture<'_, Vec<Season>> {
        Box::pin(self.select::<Season>("seasons", Query::new().order("start_date", false)))
    }

    fn insert_season(&self, season: NewSeason) -> BackendFuture<'_, Season> {
        Box::pin(async move { self.insert::<NewSeason, Season>("seasons", &season).await })
    }

    fn end_season<'a>(&'a self, id: &'a SeasonId, end: SeasonEnd) -> BackendFuture<'a, ()> {
        Box::pin(async move { self.patch("seasons", Query::filter().eq("id", id), &end).await })
    }

    fn active_match(&self) -> BackendFuture<'_, Option<Match>> {
        Box::pin(self.select_first::<Match>(
            "matches",
            Query::new().eq("is_active", true).order("started_at", false),
        ))
    }

    fn list_matches(&self) -> BackendFuture<'_, Vec<Match>> {
        Box::pin(self.select::<Match>("matches", Query::new().order("started_at", false)))
    }

    fn active_flash_event(&self, now: DateTime<Utc>) -> BackendFuture<'_, Option<FlashEvent>> {
        let now = now.to_rfc3339();
        Box::pin(self.select_first::<FlashEvent>(
            "flash_events",
            Query::new()
                .eq("is_active", true)
                .lte("started_at", &now)
                .gte("ends_at", &now),
        ))
    }

    fn whispers_for<'a>(&'a self, receiver: &'a PlayerId) -> BackendFuture<'a, Vec<Whisper>> {
        Box::pin(self.select::<Whisper>(
            "whispers",
            Query::new().eq("receiver_id", receiver).order("created_at", false),
        ))
    }
}

impl RpcApi for RestBackend {
    fn tag_player(&self, args: TagPlayerArgs) -> BackendFuture<'_, bool> {
        Box::pin(async move { self.rpc_flag(Procedure::TagPlayer, &args).await })
    }

    fn handle_dodge(&self, args: HandleDodgeArgs) -> BackendFuture<'_, bool> {
        Box::pin(async move { self.rpc_flag(Procedure::HandleDodge, &args).await })
    }

    fn get_nearby_players(&self, args: NearbyPlayersArgs) -> BackendFuture<'_, Vec<Player>> {
        Box::pin(async move {
            let players: Option<Vec<Player>> = self.rpc(Procedure::GetNearbyPlayers, &args).await?;
            Ok(players.unwrap_or_default())
        })
    }

    fn join_regional_match(&self, args: JoinRegionalMatchArgs) -> BackendFuture<'_, ()> {
        Box::pin(async move {
            let _: Value = self.rpc(Procedure::JoinRegionalMatch, &args).await?;
            Ok(())
        })
    }

    fn activate_disguise(&self) -> BackendFuture<'_, bool> {
        Box::pin(async move { self.rpc_flag(Procedure::ActivateDisguise, &NoArgs::default()).await })
    }

    fn send_whisper(&self, args: SendWhisperArgs) -> BackendFuture<'_, bool> {
        Box::pin(async move { self.rpc_flag(Procedure::SendWhisper, &args).await })
    }

    fn create_fake_dodge(&self, args: FakeDodgeArgs) -> BackendFuture<'_, bool> {
        Box::pin(async move { self.rpc_flag(Procedure::CreateFakeDodge, &args).await })
    }

    fn create_bait_ping(&self, args: BaitPingArgs) -> BackendFuture<'_, bool> {
        Box::pin(async move { self.rpc_flag(Procedure::CreateBaitPing, &args).await })
    }

    fn use_tracker_ability(&self) -> BackendFuture<'_, Option<Coordinates>> {
        Box::pin(async move {
            self.rpc::<NoArgs, Option<Coordinates>>(Procedure::UseTrackerAbility, &NoArgs::default())
                .await
        })
    }

    fn use_decoy_ability(&self) -> BackendFuture<'_, bool> {
        Box::pin(async move { self.rpc_flag(Procedure::UseDecoyAbility, &NoArgs::default()).await })
    }

    fn reset_game(&self) -> BackendFuture<'_, ()> {
        Box::pin(async move {
            let _: Value = self.rpc(Procedure::ResetGame, &NoArgs::default()).await?;
            info!("game reset");
            Ok(())
        })
    }
}

impl RealtimeApi for RestBackend {
    fn player_updates(&self) -> BackendFuture<'_, PlayerChanges> {
        Box::pin(async move { Ok(realtime::player_changes(self.clone())) })
    }
}
