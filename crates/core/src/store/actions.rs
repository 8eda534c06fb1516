use chrono::Utc;
use shadow_tag_api_types::{
    BaitPingArgs, Coordinates, FakeDodgeArgs, HandleDodgeArgs, JoinRegionalMatchArgs, MysteryRole,
    NewSeason, PlayerId, SeasonEnd, SendWhisperArgs, TagPlayerArgs,
};
use tracing::{error, info};

use super::{GameStore, JOIN_MATCH_FAILED_MESSAGE};
use crate::error::{GameError, Result};
use crate::rules::mind_games::bait_location;
use crate::rules::whisper::validate_whisper;

/// Turns a `false` from a procedure into an error naming the action.
fn accepted(ok: bool, action: &'static str) -> Result<()> {
    if ok { Ok(()) } else { Err(GameError::Refused(action)) }
}

impl GameStore {
    pub async fn tag_player(&self, tagged_id: &PlayerId) -> Result<()> {
        let me = self.require_player()?;
        if !me.is_it() {
            return Err(GameError::NotAllowed("Only the player who is it can tag"));
        }

        let tagged = self
            .backend()
            .tag_player(TagPlayerArgs {
                tagger_id: me.id,
                tagged_id: tagged_id.clone(),
            })
            .await?;
        accepted(tagged, "tag that player")?;
        info!("tagged {tagged_id}");
        self.refresh().await;
        Ok(())
    }

    pub async fn dodge_player(&self, dodged_id: &PlayerId) -> Result<()> {
        let me = self.require_player()?;
        let fix = self.current_fix().await?;

        let dodged = self
            .backend()
            .handle_dodge(HandleDodgeArgs {
                dodging_player_id: me.id,
                dodged_player_id: dodged_id.clone(),
                dodge_location: fix.coordinates,
            })
            .await?;
        accepted(dodged, "dodge")?;
        info!("dodged {dodged_id}");
        self.refresh().await;
        Ok(())
    }

    /// Joins the nearest active match around the current position, or
    /// starts one. Failures set the snapshot `error` as well.
    pub async fn join_match(&self) -> Result<()> {
        let me = self.require_player()?;
        self.update(|s| {
            s.is_loading = true;
            s.error = None;
        });

        let joined = async {
            let fix = self.current_fix().await?;
            self.backend()
                .join_regional_match(JoinRegionalMatchArgs {
                    player_id: me.id.clone(),
                    player_lat: fix.coordinates.lat,
                    player_lng: fix.coordinates.lng,
                })
                .await?;
            Ok::<_, GameError>(())
        }
        .await;

        match joined {
            Ok(()) => {
                info!("{} joined a match", me.codename);
                self.refresh().await;
                Ok(())
            }
            Err(e) => {
                error!("failed to join match: {e}");
                self.update(|s| {
                    s.error = Some(JOIN_MATCH_FAILED_MESSAGE.into());
                    s.is_loading = false;
                });
                Err(e)
            }
        }
    }

    /// Records a dodge that grants nothing, to mislead whoever is watching.
    pub async fn fake_dodge(&self, target_id: &PlayerId) -> Result<()> {
        let me = self.require_player()?;
        let fix = self.current_fix().await?;

        let faked = self
            .backend()
            .create_fake_dodge(FakeDodgeArgs {
                player_id: me.id,
                target_id: target_id.clone(),
                dodge_location: fix.coordinates,
            })
            .await?;
        accepted(faked, "fake a dodge")?;
        self.refresh().await;
        Ok(())
    }

    pub async fn bait_ping(&self, location: Coordinates) -> Result<()> {
        let me = self.require_player()?;

        let pinged = self
            .backend()
            .create_bait_ping(BaitPingArgs {
                player_id: me.id,
                ping_location: location,
            })
            .await?;
        accepted(pinged, "place a bait ping")?;
        self.refresh().await;
        Ok(())
    }

    /// Drops a bait ping a short random hop from the player's last known
    /// position and returns where it landed.
    pub async fn bait_ping_near_me(&self) -> Result<Coordinates> {
        let me = self.require_player()?;
        let location = bait_location(me.location, &mut rand::rng());
        self.bait_ping(location).await?;
        Ok(location)
    }

    /// Each player gets one whisper.
    pub async fn send_whisper(&self, receiver_id: &PlayerId, message: &str) -> Result<()> {
        let me = self.require_player()?;
        if me.has_used_whisper {
            return Err(GameError::NotAllowed("You have already used your whisper"));
        }
        let message = validate_whisper(message)?.to_owned();

        let sent = self
            .backend()
            .send_whisper(SendWhisperArgs {
                receiver_id: receiver_id.clone(),
                message,
            })
            .await?;
        accepted(sent, "send the whisper")?;
        self.refresh().await;
        Ok(())
    }

    pub async fn activate_disguise(&self) -> Result<()> {
        let me = self.require_player()?;
        if !me.is_it() {
            return Err(GameError::NotAllowed("Only the player who is it can disguise"));
        }

        let disguised = self.backend().activate_disguise().await?;
        accepted(disguised, "activate the disguise")?;
        self.refresh().await;
        Ok(())
    }

    /// The last known location of a player who is it, if the backend still
    /// lets the tracker look.
    pub async fn use_tracker_ability(&self) -> Result<Option<Coordinates>> {
        let me = self.require_player()?;
        if me.mystery_role != MysteryRole::Tracker {
            return Err(GameError::NotAllowed("Only the tracker can locate \"It\""));
        }

        let location = self.backend().use_tracker_ability().await?;
        self.refresh().await;
        Ok(location)
    }

    pub async fn use_decoy_ability(&self) -> Result<()> {
        let me = self.require_player()?;
        if me.mystery_role != MysteryRole::Decoy {
            return Err(GameError::NotAllowed("Only the decoy can toggle the decoy"));
        }

        let toggled = self.backend().use_decoy_ability().await?;
        accepted(toggled, "toggle the decoy")?;
        self.refresh().await;
        Ok(())
    }

    // ---- admin ----

    pub async fn start_season(&self, name: &str) -> Result<()> {
        self.require_admin()?;

        let season = self
            .backend()
            .insert_season(NewSeason {
                name: name.to_owned(),
                is_active: true,
            })
            .await?;
        info!("season {} started", season.name);
        self.update(|s| {
            s.seasons.insert(0, season.clone());
            s.current_season = Some(season);
        });
        Ok(())
    }

    /// No-op without a current season.
    pub async fn end_current_season(&self) -> Result<()> {
        self.require_admin()?;
        let Some(season) = self.shared.state.borrow().current_season.clone() else {
            return Ok(());
        };

        let end = Utc::now();
        self.backend().end_season(&season.id, SeasonEnd::at(end)).await?;
        info!("season {} ended", season.name);
        self.update(|s| {
            for known in s.seasons.iter_mut().filter(|known| known.id == season.id) {
                known.is_active = false;
                known.end_date = Some(end);
            }
            if let Some(current) = s.current_season.as_mut() {
                current.is_active = false;
                current.end_date = Some(end);
            }
        });
        Ok(())
    }

    /// Wipes matches and activity and returns every player to neutral.
    pub async fn reset_game(&self) -> Result<()> {
        let admin = self.require_admin()?;
        self.backend().reset_game().await?;
        info!("game reset by {}", admin.codename);
        self.refresh().await;
        Ok(())
    }
}
