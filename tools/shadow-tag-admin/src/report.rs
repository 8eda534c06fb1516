use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use geojson::GeoJson;
use shadow_tag_api_types::Player;
use shadow_tag_core::rules::activity::{activity_zones, recent_tag_heat, to_feature_collection};
use shadow_tag_core::rules::admin::admin_stats;
use shadow_tag_core::rules::leaderboard::{LeaderboardSort, ranked};
use shadow_tag_core::rules::presentation::status_label;
use shadow_tag_core::store::GameSnapshot;

fn top_list(out: &mut String, title: &str, players: &[&Player], value: impl Fn(&Player) -> u32) {
    let _ = writeln!(out, "{title}:");
    if players.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for (i, player) in players.iter().enumerate() {
        let _ = writeln!(out, "  {}. {} ({})", i + 1, player.codename, value(player));
    }
}

/// The admin dashboard as plain text.
pub fn stats<Tz: TimeZone>(snapshot: &GameSnapshot, now: &DateTime<Tz>) -> String {
    let stats = admin_stats(&snapshot.players, &snapshot.matches, &snapshot.tags, now);
    let mut out = String::new();

    let _ = writeln!(out, "Active players: {}", stats.active_players);
    let _ = writeln!(out, "Players who are it: {}", stats.it_players);
    let _ = writeln!(out, "Active matches: {}", stats.active_matches);
    let _ = writeln!(out, "Tags today: {}", stats.tags_today);
    match &snapshot.current_season {
        Some(season) if season.is_active => {
            let _ = writeln!(out, "Season: {} (since {})", season.name, season.start_date.date_naive());
        }
        _ => {
            let _ = writeln!(out, "Season: none active");
        }
    }
    top_list(&mut out, "Top taggers", &stats.top_taggers, |p| p.total_tags);
    top_list(&mut out, "Top dodgers", &stats.top_dodgers, |p| p.dodge_count);
    out
}

pub fn leaderboard(players: &[Player], sort: LeaderboardSort, limit: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<16} {:<8} {:>7} {:>5} {:>6} {:>6}   (by {} {})",
        "#", "codename", "status", "points", "tags", "dodges", "streak", sort.field, sort.indicator()
    );
    for entry in ranked(players, sort).into_iter().take(limit) {
        let p = entry.player;
        let _ = writeln!(
            out,
            "{:>4}  {:<16} {:<8} {:>7} {:>5} {:>6} {:>6}",
            entry.rank,
            p.codename,
            status_label(p.status),
            p.points,
            p.total_tags,
            p.dodge_count,
            p.tag_streak
        );
    }
    out
}

/// Write activity zones and recent tags as GeoJSON.
pub fn write_activity_geojson<Tz: TimeZone>(
    snapshot: &GameSnapshot,
    now: &DateTime<Tz>,
    output_path: &Path,
) -> Result<()> {
    let heat = recent_tag_heat(&snapshot.tags, now.to_utc());
    let zones = activity_zones(&snapshot.players, &heat);
    log::info!(
        "Writing {} zones and {} recent tags to {}",
        zones.len(),
        heat.len(),
        output_path.display()
    );

    let geojson = GeoJson::from(to_feature_collection(&zones, &heat));
    let json_string = serde_json::to_string_pretty(&geojson).context("Failed to serialize GeoJSON")?;

    std::fs::write(output_path, json_string)
        .with_context(|| format!("Failed to write GeoJSON to {}", output_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use shadow_tag_api_types::{Coordinates, PlayerId, PlayerStatus, Season, SeasonId, Tag, TagId};
    use shadow_tag_core::rules::leaderboard::SortField;

    use super::*;

    fn player(id: &str, points: i64, tags: u32) -> Player {
        let mut p = Player::new(PlayerId::new(id), id, Utc::now());
        p.points = points;
        p.total_tags = tags;
        p
    }

    #[test]
    fn test_leaderboard_ranks_and_limits() {
        let players = vec![player("low", 10, 0), player("high", 300, 3), player("mid", 100, 1)];
        let sort = LeaderboardSort::default();
        let text = leaderboard(&players, sort, 2);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("by points ↓"));
        assert!(lines[1].contains("high"));
        assert!(lines[2].contains("mid"));

        let by_tags = leaderboard(&players, sort.toggle(SortField::Tags).toggle(SortField::Tags), 1);
        assert!(by_tags.lines().nth(1).unwrap().contains("low"));
    }

    #[test]
    fn test_stats_text() {
        let now = Utc::now();
        let mut it = player("hunter", 0, 4);
        it.status = PlayerStatus::It;
        let snapshot = GameSnapshot {
            players: vec![it, player("runner", 0, 0)],
            tags: vec![Tag {
                id: TagId::new("t1"),
                tagger_id: PlayerId::new("hunter"),
                tagged_id: PlayerId::new("runner"),
                location: Coordinates::new(1.0, 1.0),
                timestamp: now - Duration::minutes(1),
            }],
            current_season: Some(Season {
                id: SeasonId::new("s1"),
                name: "Spring".into(),
                start_date: now,
                end_date: None,
                is_active: true,
            }),
            ..GameSnapshot::default()
        };

        let text = stats(&snapshot, &now);
        assert!(text.contains("Active players: 2"));
        assert!(text.contains("Players who are it: 1"));
        assert!(text.contains("Tags today: 1"));
        assert!(text.contains("Season: Spring"));
        assert!(text.contains("1. hunter (4)"));
    }

    #[test]
    fn test_write_activity_geojson() {
        let path = std::env::temp_dir().join(format!("shadow-tag-activity-{}.geojson", std::process::id()));
        write_activity_geojson(&GameSnapshot::default(), &Utc::now(), &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(written.contains("FeatureCollection"));
    }
}
