use shadow_tag_api_types::{Avatar, NewPlayer, Player, PlayerStatus};
use shadow_tag_backend::BackendError;
use tracing::{debug, error, info, warn};

use super::GameStore;
use crate::error::{AuthError, Result};
use crate::rules::credentials::{validate_login, validate_signup};

impl GameStore {
    /// Picks up a session left by a previous launch. Failures are logged;
    /// the store simply stays signed out.
    pub async fn restore_session(&self) {
        if let Err(e) = self.try_restore_session().await {
            error!("failed to restore session: {e}");
        }
    }

    async fn try_restore_session(&self) -> Result<()> {
        let Some(session) = self.backend().session().await? else {
            return Ok(());
        };
        match self.backend().find_player(&session.user.id).await? {
            Some(player) => {
                debug!("restored session for {}", player.codename);
                self.update(|s| s.current_player = Some(player));
                self.start_location_tracking().await;
            }
            None => warn!("session user {} has no player row", session.user.id),
        }
        Ok(())
    }

    pub async fn login(&self, codename: &str, password: &str) -> Result<()> {
        let player = self.authenticate(codename.trim(), password).await?;
        info!("signed in as {}", player.codename);
        self.update(|s| s.current_player = Some(player));
        self.start_location_tracking().await;
        Ok(())
    }

    async fn authenticate(&self, codename: &str, password: &str) -> std::result::Result<Player, AuthError> {
        validate_login(codename, password)?;

        match self.backend().find_player_by_codename(codename).await {
            Ok(Some(_)) => {}
            Ok(None) => return Err(AuthError::PlayerNotFound),
            Err(e) if e.is_no_rows() => return Err(AuthError::PlayerNotFound),
            Err(e) => {
                error!("player lookup failed: {e}");
                return Err(AuthError::Lookup);
            }
        }

        let email = self.shared.config.email_for(codename);
        if let Err(e) = self.backend().sign_in_with_password(&email, password).await {
            warn!("sign in failed for {codename}: {e}");
            return Err(AuthError::InvalidPassword);
        }

        match self.backend().find_player_by_codename(codename).await {
            Ok(Some(player)) => Ok(player),
            Ok(None) => {
                error!("player {codename} missing after sign in");
                Err(AuthError::PlayerDataUnavailable)
            }
            Err(e) => {
                error!("failed to load player data: {e}");
                Err(AuthError::PlayerDataUnavailable)
            }
        }
    }

    /// Creates the account and its neutral player row. An unknown
    /// `avatar_id` falls back to the first avatar.
    pub async fn signup(&self, codename: &str, password: &str, avatar_id: Option<&str>) -> Result<()> {
        let player = self.register(codename.trim(), password, avatar_id).await?;
        info!("registered {}", player.codename);
        self.update(|s| s.current_player = Some(player));
        self.start_location_tracking().await;
        Ok(())
    }

    async fn register(
        &self,
        codename: &str,
        password: &str,
        avatar_id: Option<&str>,
    ) -> std::result::Result<Player, AuthError> {
        validate_signup(codename, password)?;

        // a failed lookup is not a reason to stop; the insert will catch
        // a duplicate anyway
        if let Ok(Some(_)) = self.backend().find_player_by_codename(codename).await {
            return Err(AuthError::CodenameTaken);
        }

        let email = self.shared.config.email_for(codename);
        let session = match self.backend().sign_up(&email, password).await {
            Ok(Some(session)) => session,
            Ok(None) => return Err(AuthError::AccountNotCreated),
            Err(BackendError::AlreadyRegistered) => return Err(AuthError::AlreadyRegistered),
            Err(e) => {
                error!("sign up failed: {e}");
                return Err(AuthError::Failed(e.to_string()));
            }
        };

        let avatar = Avatar::find_or_default(avatar_id);
        self.backend()
            .insert_player(NewPlayer {
                id: session.user.id,
                codename: codename.to_owned(),
                avatar_id: avatar.id.to_owned(),
                avatar_url: avatar.url.to_owned(),
                status: PlayerStatus::Neutral,
                tag_streak: 0,
                total_tags: 0,
            })
            .await
            .map_err(|e| {
                error!("failed to create player row: {e}");
                AuthError::Failed(e.to_string())
            })
    }

    /// Stops tracking and signs out. Local player data is cleared only once
    /// the backend has ended the session.
    pub async fn logout(&self) -> Result<()> {
        self.stop_location_tracking().await;
        self.backend().sign_out().await?;

        self.throttle().reset();
        self.update(|s| {
            s.current_player = None;
            s.nearby_players.clear();
            s.whispers.clear();
            s.last_location_update = None;
        });
        info!("signed out");
        Ok(())
    }
}
