//! Harvests ranked-ladder players and their match histories from the Riot API
//! and reshapes them into a player directory and a keyed match table.

pub mod crawler;
pub mod error;
pub mod ladder;
pub mod models;
pub mod riot_utils;
pub mod storage;
pub mod tables;

pub use error::{HarvestError, Result};

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::time::Duration;

    use crate::error::{HarvestError, Result};
    use crate::models::{
        ChampionMap, LadderEntry, LadderTier, MatchDetail, MatchRecord, ParticipantDetail,
        Profile, Region, TimeWindow,
    };
    use crate::riot_utils::GameApi;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Call {
        Verify,
        Ladder(LadderTier),
        Profile(String),
        MatchIds(String),
        Match(String),
        Champions,
    }

    /// Scripted [`GameApi`] that records every call it receives.
    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub unauthorized: bool,
        pub ladders: HashMap<LadderTier, Vec<LadderEntry>>,
        pub failing_tiers: HashSet<LadderTier>,
        pub failing_profiles: HashSet<String>,
        pub histories: HashMap<String, Vec<String>>,
        pub failing_histories: HashSet<String>,
        pub failing_matches: HashSet<String>,
        pub participant_counts: HashMap<String, usize>,
        /// Virtual time spent on every match fetch.
        pub fetch_delay: Duration,
        pub champions: ChampionMap,
        pub calls: RefCell<Vec<Call>>,
    }

    impl FakeApi {
        pub(crate) fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        pub(crate) fn match_fetches(&self) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .filter_map(|c| match c {
                    Call::Match(id) => Some(id.clone()),
                    _ => None,
                })
                .collect()
        }

        fn record(&self, call: Call) {
            self.calls.borrow_mut().push(call);
        }
    }

    impl GameApi for FakeApi {
        async fn verify_credential(&self, _region: Region) -> Result<()> {
            self.record(Call::Verify);
            if self.unauthorized {
                return Err(HarvestError::Authentication);
            }
            Ok(())
        }

        async fn list_ladder(&self, _region: Region, tier: LadderTier) -> Result<Vec<LadderEntry>> {
            self.record(Call::Ladder(tier));
            if self.failing_tiers.contains(&tier) {
                return Err(HarvestError::lookup(format!("{} ladder", tier), "HTTP 503"));
            }
            Ok(self.ladders.get(&tier).cloned().unwrap_or_default())
        }

        async fn get_profile(&self, _region: Region, entry: &LadderEntry) -> Result<Profile> {
            self.record(Call::Profile(entry.puuid.clone()));
            if self.failing_profiles.contains(&entry.puuid) {
                return Err(HarvestError::lookup(format!("profile of {}", entry.puuid), "HTTP 404"));
            }
            Ok(Profile {
                puuid: entry.puuid.clone(),
                account_id: format!("acc-{}", entry.puuid),
                name: format!("name-{}", entry.puuid),
            })
        }

        async fn list_match_ids(
            &self,
            _region: Region,
            puuid: &str,
            _window: TimeWindow,
            limit: i32,
        ) -> Result<Vec<String>> {
            self.record(Call::MatchIds(puuid.to_string()));
            if self.failing_histories.contains(puuid) {
                return Err(HarvestError::lookup(format!("match history of {}", puuid), "HTTP 500"));
            }
            let mut ids = self.histories.get(puuid).cloned().unwrap_or_default();
            ids.truncate(usize::try_from(limit).unwrap_or(0));
            Ok(ids)
        }

        async fn get_match(&self, _region: Region, match_id: &str) -> Result<MatchDetail> {
            self.record(Call::Match(match_id.to_string()));
            if !self.fetch_delay.is_zero() {
                tokio::time::sleep(self.fetch_delay).await;
            }
            if self.failing_matches.contains(match_id) {
                return Err(HarvestError::lookup(format!("match {}", match_id), "HTTP 500"));
            }
            let count = self.participant_counts.get(match_id).copied().unwrap_or(10);
            Ok(create_test_detail(match_id, count))
        }

        async fn list_champions(&self) -> Result<ChampionMap> {
            self.record(Call::Champions);
            Ok(self.champions.clone())
        }
    }

    pub(crate) fn create_test_entry(puuid: &str, league_points: i32) -> LadderEntry {
        LadderEntry {
            summoner_id: format!("sid-{}", puuid),
            puuid: puuid.to_string(),
            league_points,
        }
    }

    pub(crate) fn create_test_detail(match_id: &str, participants: usize) -> MatchDetail {
        MatchDetail {
            match_id: match_id.to_string(),
            participants: (1..=participants)
                .map(|i| ParticipantDetail {
                    name: format!("{}-player{}", match_id, i),
                    puuid: format!("{}-puuid{}", match_id, i),
                    summoner_id: format!("{}-sid{}", match_id, i),
                    champion_id: i as i64,
                    win: i <= 5,
                })
                .collect(),
        }
    }

    /// A ten-player match whose participants are named by `names`.
    pub(crate) fn create_test_record(match_id: &str, names: [&str; 10]) -> MatchRecord {
        let mut detail = create_test_detail(match_id, 10);
        for (participant, name) in detail.participants.iter_mut().zip(names) {
            participant.name = name.to_string();
            participant.puuid = format!("puuid-{}", name);
            participant.summoner_id = format!("sid-{}", name);
        }
        MatchRecord::from_detail(detail).expect("ten participants")
    }

    pub(crate) fn test_window() -> TimeWindow {
        TimeWindow {
            start: 1_700_000_000,
            end: 1_700_600_000,
        }
    }
}
