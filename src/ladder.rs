use tracing::{error, info, instrument, warn};

use crate::error::{HarvestError, Result};
use crate::models::{LadderEntry, LadderTier, PlayerRef, Region};
use crate::riot_utils::GameApi;

const PROGRESS_EVERY: usize = 100;

/// Fetches the top of the region's solo-queue ladder, highest league points first.
///
/// Up to `player_count` ladder entries are *attempted*: entries whose profile
/// can't be resolved are logged and skipped, so fewer players may come back.
#[instrument(skip(api))]
pub async fn load_players<A: GameApi>(
    api: &A,
    region: &str,
    player_count: usize,
) -> Result<Vec<PlayerRef>> {
    let region: Region = region.parse()?;
    if player_count == 0 {
        return Err(HarvestError::invalid(
            "Invalid player count (must be > 0).",
        ));
    }

    api.verify_credential(region).await.inspect_err(|e| {
        if matches!(e, HarvestError::Authentication) {
            error!("Invalid API key.");
        }
    })?;

    let mut entries: Vec<LadderEntry> = Vec::new();
    for tier in LadderTier::ALL {
        match api.list_ladder(region, tier).await {
            Ok(tier_entries) => entries.extend(tier_entries),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => error!("Skipping the {} ladder: {}", tier, e),
        }
    }

    let mut players = Vec::with_capacity(player_count.min(entries.len()));
    for (attempted, entry) in (1..=player_count).zip(entries.iter()) {
        match api.get_profile(region, entry).await {
            Ok(profile) => players.push(PlayerRef {
                puuid: profile.puuid,
                account_id: profile.account_id,
                summoner_id: entry.summoner_id.clone(),
                name: profile.name,
                league_points: entry.league_points,
            }),
            Err(e) => warn!(
                "An exception occurred when processing {}: {}",
                entry.puuid, e
            ),
        }
        if attempted % PROGRESS_EVERY == 0 {
            info!("{} players processed.", attempted);
        }
    }

    // Tier boundaries can overlap in league points.
    players.sort_by(|a, b| b.league_points.cmp(&a.league_points));
    info!(
        "Loaded {} players from the {} ladder",
        players.len(),
        region
    );
    Ok(players)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{create_test_entry, Call, FakeApi};
    use std::collections::HashMap;
    use tokio_test::assert_ok;

    fn ladder_api() -> FakeApi {
        FakeApi {
            ladders: HashMap::from([
                (
                    LadderTier::Challenger,
                    vec![create_test_entry("c1", 50), create_test_entry("c2", 200)],
                ),
                (LadderTier::Grandmaster, vec![create_test_entry("g1", 100)]),
                (LadderTier::Master, vec![create_test_entry("m1", 10)]),
            ]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_players_sorted_by_league_points() {
        let api = ladder_api();
        let players = assert_ok!(load_players(&api, "na1", 3).await);
        let lp: Vec<i32> = players.iter().map(|p| p.league_points).collect();
        assert_eq!(lp, vec![200, 100, 50]);
        assert_eq!(players[0].puuid, "c2");
        assert_eq!(players[0].summoner_id, "sid-c2");
        assert_eq!(players[0].account_id, "acc-c2");
    }

    #[tokio::test]
    async fn test_player_count_limits_attempts_in_tier_order() {
        let api = ladder_api();
        let players = load_players(&api, "kr", 2).await.unwrap();
        assert_eq!(players.len(), 2);
        let profiles: Vec<Call> = api
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Profile(_)))
            .collect();
        assert_eq!(
            profiles,
            vec![Call::Profile("c1".into()), Call::Profile("c2".into())]
        );
    }

    #[tokio::test]
    async fn test_failed_profiles_count_as_attempts() {
        let mut api = ladder_api();
        api.failing_profiles.insert("c2".into());
        let players = load_players(&api, "euw1", 3).await.unwrap();
        let puuids: Vec<&str> = players.iter().map(|p| p.puuid.as_str()).collect();
        assert_eq!(puuids, vec!["g1", "c1"]);
    }

    #[tokio::test]
    async fn test_failed_tier_is_skipped() {
        let mut api = ladder_api();
        api.failing_tiers.insert(LadderTier::Grandmaster);
        let players = load_players(&api, "na1", 10).await.unwrap();
        let puuids: Vec<&str> = players.iter().map(|p| p.puuid.as_str()).collect();
        assert_eq!(puuids, vec!["c2", "c1", "m1"]);
    }

    #[tokio::test]
    async fn test_unauthorized_makes_no_ladder_calls() {
        let api = FakeApi {
            unauthorized: true,
            ..ladder_api()
        };
        let result = load_players(&api, "na1", 5).await;
        assert!(matches!(result, Err(HarvestError::Authentication)));
        assert_eq!(api.calls(), vec![Call::Verify]);
    }

    #[tokio::test]
    async fn test_invalid_arguments_make_no_calls() {
        let api = ladder_api();
        assert!(matches!(
            load_players(&api, "eun1kr", 5).await,
            Err(HarvestError::InvalidArgument(_))
        ));
        assert!(matches!(
            load_players(&api, "na1", 0).await,
            Err(HarvestError::InvalidArgument(_))
        ));
        assert!(api.calls().is_empty());
    }
}
