//! In-process backend holding every table in memory.
//!
//! It applies the same rules the hosted procedures do, so the store can be
//! exercised end to end in tests, demos and offline play. All work happens
//! synchronously under one lock; the returned futures are already resolved.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use futures_util::stream;
use rstar::RTree;
use shadow_tag_api_types::prelude::*;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{AuthUser, Session};
use crate::error::{BackendError, Result};
use crate::spatial::haversine_distance;
use crate::spatial::index::{PlayerNode, within_radius};
use crate::traits::*;

pub const TAG_POINTS: i64 = 100;
pub const DODGE_POINTS: i64 = 25;
pub const DODGE_COOLDOWN_HOURS: i64 = 8;
/// A dodger cannot be tagged by the player they dodged for this long.
pub const DODGE_IMMUNITY_MINUTES: i64 = 15;
pub const DISGUISE_MINUTES: i64 = 2;
/// Players within this distance of an active match's region join it.
pub const MATCH_REGION_RADIUS_M: f64 = 5_000.0;
pub const MATCH_DURATION: &str = "00:30:00";
pub const WHISPER_MAX_CHARS: usize = 100;
pub const MIN_PASSWORD_CHARS: usize = 6;

const UPDATE_CHANNEL_CAPACITY: usize = 256;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct InMemoryBackend {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    clock: Clock,
    updates: broadcast::Sender<PlayerChange>,
}

/// A recorded bait ping.
#[derive(Clone, Debug, PartialEq)]
pub struct BaitPing {
    pub player_id: PlayerId,
    pub location: Coordinates,
    pub created_at: DateTime<Utc>,
}

struct Account {
    password: String,
    user_id: PlayerId,
}

struct DodgeRecord {
    dodge: Dodge,
    fake: bool,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    session: Option<Session>,
    players: HashMap<PlayerId, Player>,
    tags: Vec<Tag>,
    dodges: Vec<DodgeRecord>,
    seasons: Vec<Season>,
    matches: Vec<Match>,
    members: HashMap<PlayerId, MatchId>,
    flash_events: Vec<FlashEvent>,
    whispers: Vec<Whisper>,
    bait_pings: Vec<BaitPing>,
    /// Players touched by the current operation, announced once it finishes.
    changed: Vec<PlayerId>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    pub fn with_clock(clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                clock: Arc::new(clock),
                updates,
            }),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.inner.clock)()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` under the lock, then announces every player row it touched.
    fn with_state<T>(&self, f: impl FnOnce(&mut State, DateTime<Utc>) -> Result<T>) -> Result<T> {
        let now = self.now();
        let mut guard = self.lock();
        let result = f(&mut guard, now);

        let state = &mut *guard;
        let mut changed = std::mem::take(&mut state.changed);
        let mut seen = HashSet::new();
        changed.retain(|id| seen.insert(id.clone()));
        let rows: Vec<Player> = changed
            .iter()
            .filter_map(|id| state.players.get(id).cloned())
            .collect();
        drop(guard);

        if result.is_ok() {
            for row in rows {
                // No subscribers is fine.
                let _ = self.inner.updates.send(PlayerChange { new: row });
            }
        }
        result
    }

    // ---- seeding and inspection ----

    /// Registers an account without signing in.
    pub fn seed_account(&self, email: &str, password: &str) -> Result<PlayerId> {
        self.with_state(|state, _| state.create_account(email, password))
    }

    /// Inserts or replaces a player row.
    pub fn seed_player(&self, player: Player) {
        let _ = self.with_state(|state, _| {
            state.changed.push(player.id.clone());
            state.players.insert(player.id.clone(), player);
            Ok(())
        });
    }

    pub fn update_player(&self, id: &PlayerId, f: impl FnOnce(&mut Player)) -> Result<()> {
        self.with_state(|state, _| {
            f(state.player_mut(id)?);
            Ok(())
        })
    }

    pub fn grant_role(&self, id: &PlayerId, role: MysteryRole) -> Result<()> {
        self.update_player(id, |player| {
            player.mystery_role = role;
            player.role_cooldown = None;
        })
    }

    pub fn set_admin(&self, id: &PlayerId, is_admin: bool) -> Result<()> {
        self.update_player(id, |player| player.is_admin = is_admin)
    }

    pub fn add_flash_event(
        &self,
        kind: EventType,
        started_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> FlashEvent {
        let event = FlashEvent {
            id: FlashEventId::new(Uuid::new_v4().to_string()),
            kind,
            started_at,
            ends_at,
            is_active: true,
        };
        self.lock().flash_events.push(event.clone());
        event
    }

    pub fn player(&self, id: &PlayerId) -> Option<Player> {
        self.lock().players.get(id).cloned()
    }

    pub fn bait_pings(&self) -> Vec<BaitPing> {
        self.lock().bait_pings.clone()
    }

    pub fn match_of(&self, id: &PlayerId) -> Option<MatchId> {
        self.lock().members.get(id).cloned()
    }
}

fn ready<'a, T: Send + 'a>(result: Result<T>) -> BackendFuture<'a, T> {
    Box::pin(std::future::ready(result))
}

fn rejected(message: &str) -> BackendError {
    BackendError::Rejected(message.to_owned())
}

fn new_id<T: From<String>>() -> T {
    T::from(Uuid::new_v4().to_string())
}

/// How `player` looks to someone else: a disguised "it" reads as neutral,
/// an active decoy reads as "it".
fn as_seen_by_others(player: &Player, now: DateTime<Utc>) -> Player {
    let mut seen = player.clone();
    if seen.is_it() && seen.is_disguised_at(now) {
        seen.status = PlayerStatus::Neutral;
    } else if seen.is_neutral() && seen.is_additional_it {
        seen.status = PlayerStatus::It;
    }
    seen
}

impl State {
    fn player(&self, id: &PlayerId) -> Result<&Player> {
        self.players
            .get(id)
            .ok_or_else(|| BackendError::NotFound(format!("player {id}")))
    }

    fn player_mut(&mut self, id: &PlayerId) -> Result<&mut Player> {
        self.changed.push(id.clone());
        self.players
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(format!("player {id}")))
    }

    fn session_user(&self) -> Result<PlayerId> {
        self.session
            .as_ref()
            .map(|s| s.user.id.clone())
            .ok_or(BackendError::NotSignedIn)
    }

    fn event_running(&self, kind: EventType, now: DateTime<Utc>) -> bool {
        self.flash_events
            .iter()
            .any(|event| event.kind == kind && event.is_running_at(now))
    }

    fn expire_matches(&mut self, now: DateTime<Utc>) {
        for m in self.matches.iter_mut().filter(|m| m.is_active) {
            let Some(duration) = m.parsed_duration() else {
                continue;
            };
            let ends = m.started_at + duration;
            if ends <= now {
                debug!("match {} expired", m.id);
                m.is_active = false;
                m.ended_at = Some(ends);
            }
        }
    }

    // ---- auth ----

    fn create_account(&mut self, email: &str, password: &str) -> Result<PlayerId> {
        let key = email.to_lowercase();
        if self.accounts.contains_key(&key) {
            return Err(BackendError::AlreadyRegistered);
        }
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(BackendError::Api {
                status: 422,
                code: Some("weak_password".into()),
                message: format!("Password should be at least {MIN_PASSWORD_CHARS} characters."),
            });
        }

        let user_id: PlayerId = new_id();
        self.accounts.insert(
            key,
            Account {
                password: password.to_owned(),
                user_id: user_id.clone(),
            },
        );
        Ok(user_id)
    }

    fn open_session(&mut self, user_id: PlayerId, email: &str) -> Session {
        let session = Session {
            access_token: format!("memory-{}", Uuid::new_v4()),
            refresh_token: None,
            expires_at: None,
            user: AuthUser {
                id: user_id,
                email: Some(email.to_lowercase()),
            },
        };
        self.session = Some(session.clone());
        session
    }

    fn sign_in(&mut self, email: &str, password: &str) -> Result<Session> {
        let user_id = match self.accounts.get(&email.to_lowercase()) {
            Some(account) if account.password == password => account.user_id.clone(),
            _ => return Err(BackendError::InvalidCredentials),
        };
        Ok(self.open_session(user_id, email))
    }

    fn sign_up(&mut self, email: &str, password: &str) -> Result<Option<Session>> {
        let user_id = self.create_account(email, password)?;
        Ok(Some(self.open_session(user_id, email)))
    }

    // ---- tables ----

    fn insert_player(&mut self, new: NewPlayer, now: DateTime<Utc>) -> Result<Player> {
        let duplicate = self.players.contains_key(&new.id)
            || self.players.values().any(|p| p.codename == new.codename);
        if duplicate {
            return Err(BackendError::Api {
                status: 409,
                code: Some("23505".into()),
                message: "duplicate key value violates unique constraint".into(),
            });
        }

        let mut player = Player::new(new.id, new.codename, now);
        player.status = new.status;
        player.tag_streak = new.tag_streak;
        player.total_tags = new.total_tags;
        player.avatar_id = Some(new.avatar_id);
        player.avatar_url = Some(new.avatar_url);

        self.changed.push(player.id.clone());
        self.players.insert(player.id.clone(), player.clone());
        Ok(player)
    }

    fn list_players(&self) -> Vec<Player> {
        let mut players: Vec<Player> = self.players.values().cloned().collect();
        players.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.codename.cmp(&b.codename)));
        players
    }

    fn update_location(&mut self, id: &PlayerId, update: LocationUpdate) -> Result<()> {
        let player = self.player_mut(id)?;
        player.location = Some(update.location);
        player.last_location_update = Some(update.last_location_update);
        Ok(())
    }

    fn recent_tags(&self, limit: usize) -> Vec<Tag> {
        let mut tags = self.tags.clone();
        tags.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        tags.truncate(limit);
        tags
    }

    fn recent_dodges(&self, limit: usize) -> Vec<Dodge> {
        let mut dodges: Vec<Dodge> = self.dodges.iter().map(|r| r.dodge.clone()).collect();
        dodges.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        dodges.truncate(limit);
        dodges
    }

    fn seasons_newest_first(&self) -> Vec<Season> {
        let mut seasons = self.seasons.clone();
        seasons.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        seasons
    }

    fn insert_season(&mut self, new: NewSeason, now: DateTime<Utc>) -> Season {
        if new.is_active {
            for season in self.seasons.iter_mut().filter(|s| s.is_active) {
                season.is_active = false;
                season.end_date.get_or_insert(now);
            }
        }
        let season = Season {
            id: new_id(),
            name: new.name,
            start_date: now,
            end_date: None,
            is_active: new.is_active,
        };
        info!("season {:?} started", season.name);
        self.seasons.push(season.clone());
        season
    }

    fn end_season(&mut self, id: &SeasonId, end: SeasonEnd) -> Result<()> {
        let season = self
            .seasons
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("season {id}")))?;
        season.is_active = end.is_active;
        season.end_date = Some(end.end_date);
        Ok(())
    }

    fn matches_newest_first(&self) -> Vec<Match> {
        let mut matches = self.matches.clone();
        matches.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        matches
    }

    fn whispers_for(&self, receiver: &PlayerId) -> Vec<Whisper> {
        let mut whispers: Vec<Whisper> = self
            .whispers
            .iter()
            .filter(|w| &w.receiver_id == receiver)
            .cloned()
            .collect();
        whispers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        whispers
    }

    // ---- procedures ----

    fn is_immune(&self, target: &PlayerId, tagger: &PlayerId, now: DateTime<Utc>) -> bool {
        let window = Duration::minutes(DODGE_IMMUNITY_MINUTES);
        self.dodges.iter().any(|r| {
            !r.fake
                && &r.dodge.player_id == target
                && &r.dodge.dodged_player_id == tagger
                && now - r.dodge.created_at < window
        })
    }

    fn tag_player(&mut self, args: TagPlayerArgs, now: DateTime<Utc>) -> Result<bool> {
        if args.tagger_id == args.tagged_id {
            return Err(rejected("Players cannot tag themselves"));
        }
        let tagger = self.player(&args.tagger_id)?;
        if !tagger.is_it() {
            return Err(rejected("Only the player who is it can tag"));
        }
        let tagger_location = tagger.location;
        let target = self.player(&args.tagged_id)?;
        if !target.is_neutral() {
            return Err(rejected("Target is not neutral"));
        }
        let target_location = target.location;
        if self.is_immune(&args.tagged_id, &args.tagger_id, now) {
            return Err(rejected("Target recently dodged you"));
        }

        let award = if self.event_running(EventType::DoubleTag, now) {
            TAG_POINTS * 2
        } else {
            TAG_POINTS
        };

        let tagged = self.player_mut(&args.tagged_id)?;
        tagged.status = PlayerStatus::It;
        tagged.became_it_at = Some(now);
        tagged.last_tagged_at = Some(now);
        tagged.tag_streak = 0;
        tagged.disguise_active = false;
        tagged.disguise_until = None;

        let tagger = self.player_mut(&args.tagger_id)?;
        tagger.status = PlayerStatus::Neutral;
        tagger.became_it_at = None;
        tagger.total_tags += 1;
        tagger.tag_streak += 1;
        tagger.points += award;
        tagger.disguise_active = false;
        tagger.disguise_until = None;

        self.tags.push(Tag {
            id: new_id(),
            tagger_id: args.tagger_id.clone(),
            tagged_id: args.tagged_id.clone(),
            location: target_location
                .or(tagger_location)
                .unwrap_or(Coordinates::new(0.0, 0.0)),
            timestamp: now,
        });
        info!("{} tagged {} (+{award})", args.tagger_id, args.tagged_id);
        Ok(true)
    }

    fn handle_dodge(&mut self, args: HandleDodgeArgs, now: DateTime<Utc>) -> Result<bool> {
        let dodger = self.player(&args.dodging_player_id)?;
        if !dodger.is_neutral() {
            return Err(rejected("Only neutral players can dodge"));
        }
        let cooldown = Duration::hours(DODGE_COOLDOWN_HOURS);
        if dodger.last_dodge_at.is_some_and(|at| now - at < cooldown) {
            return Err(rejected("Dodge is on cooldown"));
        }
        if !self.player(&args.dodged_player_id)?.is_it() {
            return Err(rejected("Only a player who is it can be dodged"));
        }

        let dodger = self.player_mut(&args.dodging_player_id)?;
        dodger.dodge_count += 1;
        dodger.last_dodge_at = Some(now);
        dodger.points += DODGE_POINTS;

        self.dodges.push(DodgeRecord {
            dodge: Dodge {
                id: new_id(),
                player_id: args.dodging_player_id,
                dodged_player_id: args.dodged_player_id,
                location: args.dodge_location,
                created_at: now,
            },
            fake: false,
        });
        Ok(true)
    }

    fn nearby_players(&self, args: NearbyPlayersArgs, now: DateTime<Utc>) -> Vec<Player> {
        if self.event_running(EventType::SilentMode, now) {
            return Vec::new();
        }

        let me = self.session.as_ref().map(|s| &s.user.id);
        let nodes: Vec<PlayerNode<&Player>> = self
            .players
            .values()
            .filter(|p| p.status != PlayerStatus::Out && Some(&p.id) != me)
            .filter_map(|p| Some(PlayerNode::new(p.location?, p)))
            .collect();
        let tree = RTree::bulk_load(nodes);

        let center = Coordinates::new(args.user_lat, args.user_lng);
        within_radius(&tree, center, args.radius_meters)
            .into_iter()
            .map(|(node, _)| as_seen_by_others(node.item, now))
            .collect()
    }

    fn join_regional_match(&mut self, args: JoinRegionalMatchArgs, now: DateTime<Utc>) -> Result<()> {
        self.expire_matches(now);
        self.player(&args.player_id)?;
        let here = Coordinates::new(args.player_lat, args.player_lng);

        let nearest = self
            .matches
            .iter()
            .filter(|m| m.is_active)
            .filter_map(|m| Some((m.id.clone(), haversine_distance(here, m.region()?))))
            .filter(|(_, distance)| *distance <= MATCH_REGION_RADIUS_M)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id);

        let match_id = match nearest {
            Some(id) => id,
            None => {
                let m = Match {
                    id: new_id(),
                    started_at: now,
                    ended_at: None,
                    duration: Some(MATCH_DURATION.to_owned()),
                    is_active: true,
                    winner_id: None,
                    created_at: Some(now),
                    region_lat: Some(here.lat),
                    region_lng: Some(here.lng),
                    region_name: Some(format!("Zone {:.2}, {:.2}", here.lat, here.lng)),
                };
                info!("created match {} at {:.4},{:.4}", m.id, here.lat, here.lng);
                let id = m.id.clone();
                self.matches.push(m);
                id
            }
        };

        self.members.insert(args.player_id.clone(), match_id.clone());
        let has_it = self
            .members
            .iter()
            .filter(|(_, joined)| **joined == match_id)
            .any(|(id, _)| self.players.get(id).is_some_and(Player::is_it));

        let player = self.player_mut(&args.player_id)?;
        if !has_it {
            player.status = PlayerStatus::It;
            player.became_it_at = Some(now);
        } else if player.status == PlayerStatus::Out {
            player.status = PlayerStatus::Neutral;
        }
        player.location = Some(here);
        player.last_location_update = Some(now);
        Ok(())
    }

    fn activate_disguise(&mut self, now: DateTime<Utc>) -> Result<bool> {
        let id = self.session_user()?;
        let player = self.player_mut(&id)?;
        if !player.is_it() {
            return Err(rejected("Only the player who is it can disguise"));
        }
        player.disguise_active = true;
        player.disguise_until = Some(now + Duration::minutes(DISGUISE_MINUTES));
        Ok(true)
    }

    fn send_whisper(&mut self, args: SendWhisperArgs, now: DateTime<Utc>) -> Result<bool> {
        let sender = self.session_user()?;
        if self.player(&sender)?.has_used_whisper {
            return Err(rejected("Whisper already used"));
        }
        if sender == args.receiver_id {
            return Err(rejected("Cannot whisper to yourself"));
        }
        self.player(&args.receiver_id)?;

        let message = args.message.trim();
        if message.is_empty() || message.chars().count() > WHISPER_MAX_CHARS {
            return Err(rejected("Whisper must be 1 to 100 characters"));
        }

        self.whispers.push(Whisper {
            id: new_id(),
            sender_id: sender.clone(),
            receiver_id: args.receiver_id,
            message: message.to_owned(),
            created_at: now,
        });
        self.player_mut(&sender)?.has_used_whisper = true;
        Ok(true)
    }

    fn create_fake_dodge(&mut self, args: FakeDodgeArgs, now: DateTime<Utc>) -> Result<bool> {
        self.player(&args.target_id)?;
        let player = self.player_mut(&args.player_id)?;
        player.fake_dodge_count += 1;
        player.last_fake_dodge_at = Some(now);

        self.dodges.push(DodgeRecord {
            dodge: Dodge {
                id: new_id(),
                player_id: args.player_id,
                dodged_player_id: args.target_id,
                location: args.dodge_location,
                created_at: now,
            },
            fake: true,
        });
        Ok(true)
    }

    fn create_bait_ping(&mut self, args: BaitPingArgs, now: DateTime<Utc>) -> Result<bool> {
        let player = self.player_mut(&args.player_id)?;
        player.bait_ping_count += 1;
        player.last_bait_ping_at = Some(now);

        self.bait_pings.push(BaitPing {
            player_id: args.player_id,
            location: args.ping_location,
            created_at: now,
        });
        Ok(true)
    }

    fn use_tracker_ability(&mut self, now: DateTime<Utc>) -> Result<Option<Coordinates>> {
        let id = self.session_user()?;
        let tracker = self.player(&id)?;
        if tracker.mystery_role != MysteryRole::Tracker {
            return Err(rejected("Only trackers can use this ability"));
        }
        if tracker.role_cooldown.is_some() {
            return Err(rejected("Tracker ability already used"));
        }

        let target = self
            .players
            .values()
            .filter(|p| p.is_it() && p.id != id)
            .filter_map(|p| Some((p.location?, p.last_location_update)))
            .max_by_key(|(_, updated)| *updated)
            .map(|(location, _)| location);

        if target.is_some() {
            let tracker = self.player_mut(&id)?;
            tracker.role_cooldown = Some(now.to_rfc3339());
            tracker.role_revealed_at = Some(now);
        }
        Ok(target)
    }

    fn use_decoy_ability(&mut self) -> Result<bool> {
        let id = self.session_user()?;
        let player = self.player_mut(&id)?;
        if player.mystery_role != MysteryRole::Decoy {
            return Err(rejected("Only decoys can use this ability"));
        }
        player.is_additional_it = !player.is_additional_it;
        Ok(true)
    }

    fn reset_game(&mut self, now: DateTime<Utc>) -> Result<()> {
        let id = self.session_user()?;
        if !self.player(&id)?.is_admin {
            return Err(rejected("Only admins can reset the game"));
        }

        for player in self.players.values_mut() {
            player.status = PlayerStatus::Neutral;
            player.last_tagged_at = None;
            player.became_it_at = None;
            player.tag_streak = 0;
            player.total_tags = 0;
            player.points = 0;
            player.dodge_count = 0;
            player.last_dodge_at = None;
            player.role_cooldown = None;
            player.role_revealed_at = None;
            player.disguise_active = false;
            player.disguise_until = None;
            player.is_additional_it = false;
            player.fake_dodge_count = 0;
            player.last_fake_dodge_at = None;
            player.bait_ping_count = 0;
            player.last_bait_ping_at = None;
            player.has_used_whisper = false;
            self.changed.push(player.id.clone());
        }
        for m in self.matches.iter_mut().filter(|m| m.is_active) {
            m.is_active = false;
            m.ended_at = Some(now);
        }
        self.members.clear();
        self.tags.clear();
        self.dodges.clear();
        self.whispers.clear();
        self.bait_pings.clear();
        info!("game reset by {id}");
        Ok(())
    }
}

impl AuthApi for InMemoryBackend {
    fn session(&self) -> BackendFuture<'_, Option<Session>> {
        ready(Ok(self.lock().session.clone()))
    }

    fn sign_in_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BackendFuture<'a, Session> {
        ready(self.with_state(|state, _| state.sign_in(email, password)))
    }

    fn sign_up<'a>(&'a self, email: &'a str, password: &'a str) -> BackendFuture<'a, Option<Session>> {
        ready(self.with_state(|state, _| state.sign_up(email, password)))
    }

    fn sign_out(&self) -> BackendFuture<'_, ()> {
        self.lock().session = None;
        ready(Ok(()))
    }
}

impl TableApi for InMemoryBackend {
    fn find_player<'a>(&'a self, id: &'a PlayerId) -> BackendFuture<'a, Option<Player>> {
        ready(Ok(self.player(id)))
    }

    fn find_player_by_codename<'a>(&'a self, codename: &'a str) -> BackendFuture<'a, Option<Player>> {
        let found = self
            .lock()
            .players
            .values()
            .find(|p| p.codename == codename)
            .cloned();
        ready(Ok(found))
    }

    fn insert_player(&self, player: NewPlayer) -> BackendFuture<'_, Player> {
        ready(self.with_state(|state, now| state.insert_player(player, now)))
    }

    fn list_players(&self) -> BackendFuture<'_, Vec<Player>> {
        ready(Ok(self.lock().list_players()))
    }

    fn update_player_location<'a>(
        &'a self,
        id: &'a PlayerId,
        update: LocationUpdate,
    ) -> BackendFuture<'a, ()> {
        ready(self.with_state(|state, _| state.update_location(id, update)))
    }

    fn recent_tags(&self, limit: usize) -> BackendFuture<'_, Vec<Tag>> {
        ready(Ok(self.lock().recent_tags(limit)))
    }

    fn recent_dodges(&self, limit: usize) -> BackendFuture<'_, Vec<Dodge>> {
        ready(Ok(self.lock().recent_dodges(limit)))
    }

    fn active_season(&self) -> BackendFuture<'_, Option<Season>> {
        let season = self
            .lock()
            .seasons_newest_first()
            .into_iter()
            .find(|s| s.is_active);
        ready(Ok(season))
    }

    fn list_seasons(&self) -> BackendFuture<'_, Vec<Season>> {
        ready(Ok(self.lock().seasons_newest_first()))
    }

    fn insert_season(&self, season: NewSeason) -> BackendFuture<'_, Season> {
        ready(self.with_state(|state, now| Ok(state.insert_season(season, now))))
    }

    fn end_season<'a>(&'a self, id: &'a SeasonId, end: SeasonEnd) -> BackendFuture<'a, ()> {
        ready(self.with_state(|state, _| state.end_season(id, end)))
    }

    fn active_match(&self) -> BackendFuture<'_, Option<Match>> {
        ready(self.with_state(|state, now| {
            state.expire_matches(now);
            Ok(state.matches_newest_first().into_iter().find(|m| m.is_active))
        }))
    }

    fn list_matches(&self) -> BackendFuture<'_, Vec<Match>> {
        ready(self.with_state(|state, now| {
            state.expire_matches(now);
            Ok(state.matches_newest_first())
        }))
    }

    fn active_flash_event(&self, now: DateTime<Utc>) -> BackendFuture<'_, Option<FlashEvent>> {
        let event = self
            .lock()
            .flash_events
            .iter()
            .filter(|e| e.is_running_at(now))
            .max_by_key(|e| e.started_at)
            .cloned();
        ready(Ok(event))
    }

    fn whispers_for<'a>(&'a self, receiver: &'a PlayerId) -> BackendFuture<'a, Vec<Whisper>> {
        ready(Ok(self.lock().whispers_for(receiver)))
    }
}

impl RpcApi for InMemoryBackend {
    fn tag_player(&self, args: TagPlayerArgs) -> BackendFuture<'_, bool> {
        ready(self.with_state(|state, now| state.tag_player(args, now)))
    }

    fn handle_dodge(&self, args: HandleDodgeArgs) -> BackendFuture<'_, bool> {
        ready(self.with_state(|state, now| state.handle_dodge(args, now)))
    }

    fn get_nearby_players(&self, args: NearbyPlayersArgs) -> BackendFuture<'_, Vec<Player>> {
        let now = self.now();
        ready(Ok(self.lock().nearby_players(args, now)))
    }

    fn join_regional_match(&self, args: JoinRegionalMatchArgs) -> BackendFuture<'_, ()> {
        ready(self.with_state(|state, now| state.join_regional_match(args, now)))
    }

    fn activate_disguise(&self) -> BackendFuture<'_, bool> {
        ready(self.with_state(|state, now| state.activate_disguise(now)))
    }

    fn send_whisper(&self, args: SendWhisperArgs) -> BackendFuture<'_, bool> {
        ready(self.with_state(|state, now| state.send_whisper(args, now)))
    }

    fn create_fake_dodge(&self, args: FakeDodgeArgs) -> BackendFuture<'_, bool> {
        ready(self.with_state(|state, now| state.create_fake_dodge(args, now)))
    }

    fn create_bait_ping(&self, args: BaitPingArgs) -> BackendFuture<'_, bool> {
        ready(self.with_state(|state, now| state.create_bait_ping(args, now)))
    }

    fn use_tracker_ability(&self) -> BackendFuture<'_, Option<Coordinates>> {
        ready(self.with_state(|state, now| state.use_tracker_ability(now)))
    }

    fn use_decoy_ability(&self) -> BackendFuture<'_, bool> {
        ready(self.with_state(|state, _| state.use_decoy_ability()))
    }

    fn reset_game(&self) -> BackendFuture<'_, ()> {
        ready(self.with_state(|state, now| state.reset_game(now)))
    }
}

impl RealtimeApi for InMemoryBackend {
    fn player_updates(&self) -> BackendFuture<'_, PlayerChanges> {
        let receiver = self.inner.updates.subscribe();
        let changes: PlayerChanges = Box::pin(stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(change) => return Some((change, receiver)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("realtime subscriber lagged, skipped {skipped} changes");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        }));
        ready(Ok(changes))
    }
}
