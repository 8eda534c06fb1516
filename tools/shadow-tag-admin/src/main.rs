use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use shadow_tag_backend::{BackendConfig, RestBackend};
use shadow_tag_core::config::GameConfig;
use shadow_tag_core::location::SimulatedGeolocation;
use shadow_tag_core::rules::leaderboard::{LeaderboardSort, SortDirection, SortField};
use shadow_tag_core::store::GameStore;

mod demo;
mod report;

#[derive(Parser, Debug)]
#[command(
    name = "shadow-tag-admin",
    author,
    version,
    about = "Operator commands for a Shadow Tag backend",
    long_about = "Signs in as an admin player and runs dashboard commands: game stats, \
                  the leaderboard, season management and a full game reset.\n\n\
                  The backend is read from SHADOW_TAG_SUPABASE_URL and \
                  SHADOW_TAG_SUPABASE_ANON_KEY. `demo` needs neither and plays a round \
                  against an in-memory world."
)]
struct Args {
    /// Admin codename
    #[arg(long, env = "SHADOW_TAG_ADMIN_CODENAME", global = true)]
    codename: Option<String>,

    /// Admin password
    #[arg(long, env = "SHADOW_TAG_ADMIN_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Game settings JSON (email domain, radii, throttling)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output (show debug messages)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dashboard numbers: players, matches, tags today, top lists
    Stats,

    /// Ranked players
    Leaderboard {
        /// points, tags, dodges or streak
        #[arg(short, long, default_value = "points")]
        sort: SortField,

        #[arg(long)]
        ascending: bool,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Start or end a season
    Season {
        #[command(subcommand)]
        action: SeasonAction,
    },

    /// Write activity zones and recent tags as GeoJSON
    Activity {
        #[arg(short, long)]
        output: PathBuf,
    },

    /// End every match and wipe all progress
    Reset {
        /// Required; there is no undo
        #[arg(long)]
        yes: bool,
    },

    /// Play a scripted round against an in-memory world
    Demo {
        #[arg(long, default_value = "warden")]
        as_codename: String,
    },
}

#[derive(Subcommand, Debug)]
enum SeasonAction {
    Start { name: String },
    End,
}

async fn admin_store(args: &Args, config: GameConfig) -> Result<GameStore> {
    let (Some(codename), Some(password)) = (&args.codename, &args.password) else {
        bail!("Admin credentials required: pass --codename and --password");
    };

    let backend = RestBackend::new(BackendConfig::from_env()?).context("Failed to set up the backend client")?;
    let store = GameStore::builder(Arc::new(backend), Arc::new(SimulatedGeolocation::new()))
        .config(config)
        .build();

    sign_in_admin(&store, codename, password).await?;
    Ok(store)
}

/// Signs in, loads the game and checks the admin flag. Leaves location
/// tracking off since the console has no position to share.
async fn sign_in_admin(store: &GameStore, codename: &str, password: &str) -> Result<()> {
    store.login(codename, password).await?;
    store.init_game().await.context("Failed to load game data")?;
    store.stop_location_tracking().await;

    let signed_in = store.current_player().context("Not signed in")?;
    if !signed_in.is_admin {
        bail!("{} is not an admin", signed_in.codename);
    }
    log::info!("Signed in as {}", signed_in.codename);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .format_timestamp(None)
    .init();

    let config = match &args.config {
        Some(path) => GameConfig::load(path).with_context(|| format!("Failed to read {}", path.display()))?,
        None => GameConfig::default(),
    };

    match &args.command {
        Command::Demo { as_codename } => {
            let snapshot = demo::run(as_codename, demo::DEFAULT_ORIGIN).await?;
            print!("{}", report::leaderboard(&snapshot.players, LeaderboardSort::default(), 10));
        }
        Command::Stats => {
            let store = admin_store(&args, config).await?;
            print!("{}", report::stats(&store.snapshot(), &Local::now()));
        }
        Command::Leaderboard {
            sort,
            ascending,
            limit,
        } => {
            let store = admin_store(&args, config).await?;
            let sort = LeaderboardSort {
                field: *sort,
                direction: if *ascending {
                    SortDirection::Ascending
                } else {
                    SortDirection::Descending
                },
            };
            print!("{}", report::leaderboard(&store.snapshot().players, sort, *limit));
        }
        Command::Season { action } => {
            let store = admin_store(&args, config).await?;
            match action {
                SeasonAction::Start { name } => {
                    store.start_season(name).await?;
                    log::info!("Season {name} started");
                }
                SeasonAction::End => match store.snapshot().current_season {
                    Some(season) => {
                        store.end_current_season().await?;
                        log::info!("Season {} ended", season.name);
                    }
                    None => log::warn!("No active season to end"),
                },
            }
        }
        Command::Activity { output } => {
            let store = admin_store(&args, config).await?;
            report::write_activity_geojson(&store.snapshot(), &Local::now(), output)?;
        }
        Command::Reset { yes } => {
            if !yes {
                bail!("Refusing to reset without --yes");
            }
            let store = admin_store(&args, config).await?;
            store.reset_game().await?;
            log::info!("Game reset");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_leaderboard() {
        let args = Args::try_parse_from(["shadow-tag-admin", "leaderboard", "--sort", "dodges", "--ascending"]).unwrap();
        let Command::Leaderboard { sort, ascending, limit } = args.command else {
            panic!("parsed {:?}", args.command);
        };
        assert_eq!(sort, SortField::Dodges);
        assert!(ascending);
        assert_eq!(limit, 20);
    }

    #[test]
    fn test_unknown_sort_field() {
        assert!(Args::try_parse_from(["shadow-tag-admin", "leaderboard", "--sort", "speed"]).is_err());
    }

    #[tokio::test]
    async fn test_admin_sign_in_leaves_tracking_off() {
        use shadow_tag_api_types::{Player, PlayerId};
        use shadow_tag_backend::InMemoryBackend;

        let backend = InMemoryBackend::new();
        let store = GameStore::builder(Arc::new(backend.clone()), Arc::new(SimulatedGeolocation::new())).build();

        let warden: PlayerId = backend.seed_account("warden@shadowtag.game", "hunter22").unwrap();
        backend.seed_player(Player::new(warden.clone(), "warden", chrono::Utc::now()));
        let rookie: PlayerId = backend.seed_account("rookie@shadowtag.game", "hunter22").unwrap();
        backend.seed_player(Player::new(rookie, "rookie", chrono::Utc::now()));

        let refused = sign_in_admin(&store, "warden", "hunter22").await.unwrap_err();
        assert_eq!(refused.to_string(), "warden is not an admin");

        backend.set_admin(&warden, true).unwrap();
        sign_in_admin(&store, "warden", "hunter22").await.unwrap();
        let snapshot = store.snapshot();
        assert!(!snapshot.is_tracking);
        assert!(snapshot.players.iter().any(|p| p.codename == "rookie"));
    }
}
