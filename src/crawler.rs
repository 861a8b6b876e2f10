//! Match-history crawl across a set of seed players.
//!
//! One [`MatchCrawler`] is one crawl run: it owns the set of match ids already
//! fetched, so a match that shows up in several seed players' histories costs a
//! single remote fetch. Players are processed strictly in order and one call at
//! a time; the time budget is checked between players, never mid-player.

use std::collections::HashSet;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::error::{HarvestError, Result};
use crate::models::{MatchRecord, Region, TimeWindow};
use crate::riot_utils::GameApi;

/// Match ids requested per player (one API page).
pub const MATCH_PAGE_SIZE: i32 = 100;

const PROGRESS_EVERY: usize = 100;

/// How one player's sub-crawl ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubCrawlOutcome {
    Completed,
    /// The match list itself could not be fetched.
    ListingFailed,
    /// A match detail fetch failed; the player's remaining candidates were dropped.
    Aborted { match_id: String },
}

#[derive(Debug)]
pub struct SubCrawl {
    pub puuid: String,
    pub records: Vec<MatchRecord>,
    pub outcome: SubCrawlOutcome,
}

#[derive(Debug, Default)]
pub struct CrawlReport {
    /// Fetched matches in discovery order, each exactly once.
    pub matches: Vec<MatchRecord>,
    pub searched: usize,
    pub players_total: usize,
    pub players_processed: usize,
    pub players_skipped: usize,
    pub players_aborted: usize,
    pub budget_exhausted: bool,
}

impl CrawlReport {
    pub fn get(&self, match_id: &str) -> Option<&MatchRecord> {
        self.matches.iter().find(|m| m.match_id == match_id)
    }
}

/// Whether a count going from `previous` to `current` passed a multiple of
/// [`PROGRESS_EVERY`].
fn crossed_progress_mark(previous: usize, current: usize) -> bool {
    current / PROGRESS_EVERY > previous / PROGRESS_EVERY
}

pub struct MatchCrawler<'a, A> {
    api: &'a A,
    region: Region,
    window: TimeWindow,
    searched: HashSet<String>,
    matches: Vec<MatchRecord>,
    last_searched: usize,
}

impl<'a, A: GameApi> MatchCrawler<'a, A> {
    /// Starts a run after checking the credential once.
    pub async fn start(api: &'a A, region: Region, window: TimeWindow) -> Result<Self> {
        api.verify_credential(region).await.inspect_err(|e| {
            if matches!(e, HarvestError::Authentication) {
                error!("Invalid API key.");
            }
        })?;
        Ok(Self {
            api,
            region,
            window,
            searched: HashSet::new(),
            matches: Vec::new(),
            last_searched: 0,
        })
    }

    pub fn searched(&self) -> &HashSet<String> {
        &self.searched
    }

    /// Fetches the unseen matches in one player's history.
    #[instrument(skip(self))]
    pub async fn crawl_player(&mut self, puuid: &str) -> SubCrawl {
        let mut records = Vec::new();
        let candidates = match self
            .api
            .list_match_ids(self.region, puuid, self.window, MATCH_PAGE_SIZE)
            .await
        {
            Ok(ids) => ids,
            Err(e) => {
                warn!("There was an issue finding the matches of player {}: {}", puuid, e);
                return SubCrawl {
                    puuid: puuid.to_string(),
                    records,
                    outcome: SubCrawlOutcome::ListingFailed,
                };
            }
        };

        for match_id in candidates {
            if self.searched.contains(&match_id) {
                continue;
            }
            let detail = match self.api.get_match(self.region, &match_id).await {
                Ok(detail) => detail,
                Err(e) => {
                    warn!(
                        "There was an issue finding the match information for match_id = {}: {}",
                        match_id, e
                    );
                    return SubCrawl {
                        puuid: puuid.to_string(),
                        records,
                        outcome: SubCrawlOutcome::Aborted { match_id },
                    };
                }
            };
            let participants = detail.participants.len();
            match MatchRecord::from_detail(detail) {
                Some(record) => records.push(record),
                None => warn!(
                    "Skipping match {} with {} participants",
                    match_id, participants
                ),
            }
            self.searched.insert(match_id);
        }

        SubCrawl {
            puuid: puuid.to_string(),
            records,
            outcome: SubCrawlOutcome::Completed,
        }
    }

    /// Crawls `puuids` in order until they run out or `budget` has elapsed.
    pub async fn run(mut self, puuids: &[String], budget: Duration) -> CrawlReport {
        let started = Instant::now();
        let mut report = CrawlReport {
            players_total: puuids.len(),
            ..Default::default()
        };

        for puuid in puuids {
            let sub_crawl = self.crawl_player(puuid).await;
            match sub_crawl.outcome {
                SubCrawlOutcome::Completed => {}
                SubCrawlOutcome::ListingFailed => report.players_skipped += 1,
                SubCrawlOutcome::Aborted { .. } => report.players_aborted += 1,
            }
            self.matches.extend(sub_crawl.records);
            report.players_processed += 1;

            if crossed_progress_mark(self.last_searched, self.searched.len()) {
                info!("{} matches searched.", self.searched.len());
            }
            self.last_searched = self.searched.len();

            if started.elapsed() >= budget {
                info!("Time limit of {:?} exceeded.", budget);
                info!(
                    "{} out of {} players' match history processed.",
                    report.players_processed, report.players_total
                );
                report.budget_exhausted = report.players_processed < report.players_total;
                break;
            }
        }

        report.searched = self.searched.len();
        report.matches = self.matches;
        report
    }
}

/// Validates the request, then crawls every seed player's history in `window`.
#[instrument(skip(api, puuids), fields(players = puuids.len()))]
pub async fn crawl_matches<A: GameApi>(
    api: &A,
    region: Region,
    puuids: &[String],
    window: TimeWindow,
    budget: Duration,
) -> Result<CrawlReport> {
    if budget.is_zero() {
        return Err(HarvestError::invalid("Invalid time limit (must be > 0)."));
    }
    let now = chrono::Utc::now().timestamp();
    let window = TimeWindow::new(window.start, window.end, now)?;

    let crawler = MatchCrawler::start(api, region, window).await?;
    let report = crawler.run(puuids, budget).await;
    info!(
        "Crawl finished with {} matches from {} players",
        report.matches.len(),
        report.players_processed
    );
    Ok(report)
}
