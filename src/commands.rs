use std::path::Path;

use ladder_harvest::storage::SaveOutcome;
use tracing::{error, info};

/// The name a table will be saved under, or `None` when nothing is written.
fn output_file_name(
    out_dir: Option<&Path>,
    name: impl FnOnce() -> ladder_harvest::Result<String>,
) -> ladder_harvest::Result<Option<String>> {
    out_dir.map(|_| name()).transpose()
}

fn report_save(table: &str, save: &SaveOutcome) {
    match save {
        SaveOutcome::Skipped => info!("Not saving {}", table),
        SaveOutcome::Saved(path) => info!("Saved {} to {}", table, path.display()),
        SaveOutcome::Failed(e) => error!("Failed to save {} to .csv file: {}", table, e),
    }
}

pub mod players {
    use std::path::Path;

    use anyhow::{Context, Result};
    use ladder_harvest::ladder::load_players;
    use ladder_harvest::models::Region;
    use ladder_harvest::riot_utils::GameApi;
    use ladder_harvest::storage::{persist, raw_player_file_name, write_players};
    use tracing::info;

    pub async fn run<A: GameApi>(
        api: &A,
        region: &str,
        count: usize,
        out_dir: Option<&Path>,
    ) -> Result<()> {
        let players = load_players(api, region, count)
            .await
            .context("Failed to load players")?;
        let region: Region = region.parse()?;
        let file_name = raw_player_file_name(region, chrono::Utc::now().timestamp());
        let persisted = persist(players, out_dir, &file_name, |path, players| {
            write_players(path, players)
        });
        super::report_save("player data", &persisted.save);
        info!("Loaded {} players", persisted.data.len());
        Ok(())
    }
}

pub mod matches {
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use anyhow::{anyhow, Context, Result};
    use ladder_harvest::crawler::crawl_matches;
    use ladder_harvest::ladder::load_players;
    use ladder_harvest::models::{Region, TimeWindow};
    use ladder_harvest::riot_utils::GameApi;
    use ladder_harvest::storage::{persist, raw_match_file_name, read_seed_puuids, write_match_rows};
    use tracing::info;

    /// Where the crawl's seed players come from.
    #[derive(Debug, Clone)]
    pub enum PlayerSource {
        File(PathBuf),
        /// The top N players of the region's ladder.
        Ladder(usize),
    }

    pub fn budget_from_hours(hours: f64) -> Result<Duration> {
        Duration::try_from_secs_f64(hours * 3600.0)
            .ok()
            .filter(|b| !b.is_zero())
            .ok_or_else(|| anyhow!("Invalid time limit {} (must be > 0).", hours))
    }

    /// An open-ended window stops one second before `now`.
    pub fn crawl_window(start: i64, end: Option<i64>, now: i64) -> ladder_harvest::Result<TimeWindow> {
        TimeWindow::new(start, end.unwrap_or(now - 1), now)
    }

    pub async fn seed_puuids<A: GameApi>(
        api: &A,
        region: &str,
        source: PlayerSource,
    ) -> Result<Vec<String>> {
        match source {
            PlayerSource::File(path) => read_seed_puuids(&path)
                .with_context(|| format!("Failed to read players from {}", path.display())),
            PlayerSource::Ladder(count) => Ok(load_players(api, region, count)
                .await
                .context("Failed to load players")?
                .into_iter()
                .map(|p| p.puuid)
                .collect()),
        }
    }

    pub async fn run<A: GameApi>(
        api: &A,
        region: &str,
        start: i64,
        end: Option<i64>,
        hours: f64,
        source: PlayerSource,
        out_dir: Option<&Path>,
    ) -> Result<()> {
        let budget = budget_from_hours(hours)?;
        let region_code = region;
        let region: Region = region.parse()?;
        let window = crawl_window(start, end, chrono::Utc::now().timestamp())?;
        let puuids = seed_puuids(api, region_code, source).await?;

        let report = crawl_matches(api, region, &puuids, window, budget)
            .await
            .context("Failed to crawl matches")?;
        info!(
            "{} out of {} players' match history processed ({} skipped, {} aborted).",
            report.players_processed,
            report.players_total,
            report.players_skipped,
            report.players_aborted
        );

        let file_name = raw_match_file_name(region, window.start, window.end);
        let persisted = persist(report.matches, out_dir, &file_name, |path, rows| {
            write_match_rows(path, rows)
        });
        super::report_save("match data", &persisted.save);
        info!("Collected {} matches", persisted.data.len());
        Ok(())
    }
}

pub mod process_players {
    use std::path::Path;

    use anyhow::{Context, Result};
    use ladder_harvest::storage::{
        persist, processed_player_file_name, read_match_rows, write_player_directory,
    };
    use ladder_harvest::tables::build_player_directory;
    use tracing::info;

    pub fn run(matches: &Path, include_key: bool, out_dir: Option<&Path>) -> Result<()> {
        let file_name = super::output_file_name(out_dir, || processed_player_file_name(matches))?
            .unwrap_or_default();
        let rows = read_match_rows(matches).context("Failed to read match data")?;
        let directory = build_player_directory(&rows);
        let persisted = persist(directory, out_dir, &file_name, |path, directory| {
            write_player_directory(path, directory, include_key)
        });
        super::report_save("processed player data", &persisted.save);
        info!("Directory holds {} rows", persisted.data.len());
        Ok(())
    }
}

pub mod process_matches {
    use std::path::Path;

    use anyhow::{Context, Result};
    use ladder_harvest::riot_utils::GameApi;
    use ladder_harvest::storage::{
        persist, processed_match_file_name, read_match_rows, read_player_directory,
        write_processed_matches,
    };
    use ladder_harvest::tables::{process_matches, validate_noise_rate};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tracing::info;

    pub async fn run<A: GameApi>(
        api: &A,
        matches: &Path,
        players: &Path,
        noise_rate: f64,
        seed: Option<u64>,
        out_dir: Option<&Path>,
    ) -> Result<()> {
        validate_noise_rate(noise_rate)?;
        let file_name = super::output_file_name(out_dir, || processed_match_file_name(matches))?
            .unwrap_or_default();
        let rows = read_match_rows(matches).context("Invalid load paths")?;
        let directory = read_player_directory(players).context("Invalid load paths")?;
        let champions = api
            .list_champions()
            .await
            .context("Failed to fetch static champion data")?;

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let table = process_matches(&rows, &directory, noise_rate, &champions, &mut rng)?;

        let persisted = persist(table, out_dir, &file_name, |path, table| {
            write_processed_matches(path, table)
        });
        super::report_save("processed match data", &persisted.save);
        info!("Processed {} matches", persisted.data.len());
        Ok(())
    }
}
