use std::collections::HashMap;

use riven::consts::QueueType;
use riven::reqwest::StatusCode;
use riven::{RiotApi, RiotApiError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_derive::Deserialize;
use tracing::{debug, warn};

use crate::error::{HarvestError, Result};
use crate::models::{
    ChampionMap, LadderEntry, LadderTier, MatchDetail, ParticipantDetail, Profile, Region,
    TimeWindow,
};

const DDRAGON_REALM_URL: &str = "https://ddragon.leagueoflegends.com/realms/na.json";

/// Everything the loader, crawler and table builder need from the game's API.
///
/// Every call can fail on its own; callers decide whether a failure is fatal.
/// A rejected credential is reported as [`HarvestError::Authentication`], any
/// other failure as [`HarvestError::RemoteLookup`].
#[allow(async_fn_in_trait)]
pub trait GameApi {
    /// Lightweight status probe used to check the credential.
    async fn verify_credential(&self, region: Region) -> Result<()>;

    async fn list_ladder(&self, region: Region, tier: LadderTier) -> Result<Vec<LadderEntry>>;

    async fn get_profile(&self, region: Region, entry: &LadderEntry) -> Result<Profile>;

    async fn list_match_ids(
        &self,
        region: Region,
        puuid: &str,
        window: TimeWindow,
        limit: i32,
    ) -> Result<Vec<String>>;

    async fn get_match(&self, region: Region, match_id: &str) -> Result<MatchDetail>;

    async fn list_champions(&self) -> Result<ChampionMap>;
}

/// Maps a failed Riot call to our taxonomy. 401 and 403 both mean the key is bad.
pub fn classify_error(what: &str, e: RiotApiError) -> HarvestError {
    match e.status_code() {
        Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN) => {
            HarvestError::Authentication
        }
        Some(status) => HarvestError::lookup(what, format!("HTTP {}: {}", status, e)),
        None => HarvestError::lookup(what, e),
    }
}

// Riot keeps retiring identity fields (summoner names, summoner ids, account
// ids), so the typed riven models are read back through these lenient views.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LeagueListView {
    entries: Vec<LeagueItemView>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LeagueItemView {
    summoner_id: Option<String>,
    puuid: Option<String>,
    league_points: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SummonerView {
    puuid: String,
    account_id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AccountView {
    game_name: Option<String>,
    tag_line: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MatchView {
    metadata: MetadataView,
    info: InfoView,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MetadataView {
    match_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct InfoView {
    participants: Vec<ParticipantView>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ParticipantView {
    summoner_name: Option<String>,
    riot_id_game_name: Option<String>,
    riot_id_tagline: Option<String>,
    puuid: String,
    summoner_id: Option<String>,
    champion_id: i64,
    win: bool,
}

#[derive(Debug, Deserialize)]
struct RealmView {
    n: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ChampionListView {
    data: HashMap<String, ChampionView>,
}

#[derive(Debug, Deserialize)]
struct ChampionView {
    key: String,
    name: String,
}

fn reshape<T: Serialize, V: DeserializeOwned>(what: &str, model: &T) -> Result<V> {
    serde_json::to_value(model)
        .and_then(serde_json::from_value)
        .map_err(|e| HarvestError::lookup(what, e))
}

/// Joins a Riot ID, or returns `None` when the game name is blank.
fn riot_id(game_name: Option<String>, tag_line: Option<String>) -> Option<String> {
    let game_name = game_name.filter(|n| !n.is_empty())?;
    match tag_line.filter(|t| !t.is_empty()) {
        Some(tag) => Some(format!("{game_name}#{tag}")),
        None => Some(game_name),
    }
}

impl ParticipantView {
    fn into_detail(self) -> ParticipantDetail {
        let name = self
            .summoner_name
            .filter(|n| !n.is_empty())
            .or_else(|| riot_id(self.riot_id_game_name, self.riot_id_tagline))
            .unwrap_or_default();
        ParticipantDetail {
            name,
            puuid: self.puuid,
            summoner_id: self.summoner_id.unwrap_or_default(),
            champion_id: self.champion_id,
            win: self.win,
        }
    }
}

fn champion_map(list: ChampionListView) -> ChampionMap {
    let mut champions = ChampionMap::new();
    for (id, champion) in list.data {
        match champion.key.parse::<i64>() {
            Ok(key) => {
                champions.insert(key, champion.name);
            }
            Err(_) => warn!("Skipping champion {} with non-numeric key '{}'", id, champion.key),
        }
    }
    champions
}

/// [`GameApi`] backed by `riven` for the Riot endpoints and Data Dragon for
/// static champion data.
pub struct RiotClient {
    riot_api: Option<RiotApi>,
    http_client: reqwest::Client,
}

impl RiotClient {
    /// A missing key is only reported once a call is made.
    pub fn new(api_key: Option<&str>) -> Self {
        Self {
            riot_api: api_key.filter(|k| !k.is_empty()).map(RiotApi::new),
            http_client: reqwest::Client::new(),
        }
    }

    fn api(&self) -> Result<&RiotApi> {
        self.riot_api.as_ref().ok_or(HarvestError::Authentication)
    }

    async fn fetch_json<V: DeserializeOwned>(&self, what: &str, url: &str) -> Result<V> {
        self.http_client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| HarvestError::lookup(what, e))?
            .json()
            .await
            .map_err(|e| HarvestError::lookup(what, e))
    }
}

impl GameApi for RiotClient {
    async fn verify_credential(&self, region: Region) -> Result<()> {
        let what = format!("platform status for {}", region);
        self.api()?
            .lol_status_v4()
            .get_platform_data(region.platform())
            .await
            .map_err(|e| classify_error(&what, e))?;
        Ok(())
    }

    async fn list_ladder(&self, region: Region, tier: LadderTier) -> Result<Vec<LadderEntry>> {
        let what = format!("{} ladder for {}", tier, region);
        let league = self.api()?.league_v4();
        let queue = QueueType::RANKED_SOLO_5x5;
        let route = region.platform();
        let list: LeagueListView = match tier {
            LadderTier::Challenger => reshape(
                &what,
                &league
                    .get_challenger_league(route, queue)
                    .await
                    .map_err(|e| classify_error(&what, e))?,
            )?,
            LadderTier::Grandmaster => reshape(
                &what,
                &league
                    .get_grandmaster_league(route, queue)
                    .await
                    .map_err(|e| classify_error(&what, e))?,
            )?,
            LadderTier::Master => reshape(
                &what,
                &league
                    .get_master_league(route, queue)
                    .await
                    .map_err(|e| classify_error(&what, e))?,
            )?,
        };
        debug!("Fetched {} entries for {}", list.entries.len(), what);
        Ok(list
            .entries
            .into_iter()
            .map(|item| LadderEntry {
                summoner_id: item.summoner_id.unwrap_or_default(),
                puuid: item.puuid.unwrap_or_default(),
                league_points: item.league_points,
            })
            .collect())
    }

    async fn get_profile(&self, region: Region, entry: &LadderEntry) -> Result<Profile> {
        let what = format!("profile of {}", entry.puuid);
        if entry.puuid.is_empty() {
            return Err(HarvestError::lookup(what, "ladder entry carries no puuid"));
        }
        let riot_api = self.api()?;
        let summoner: SummonerView = reshape(
            &what,
            &riot_api
                .summoner_v4()
                .get_by_puuid(region.platform(), &entry.puuid)
                .await
                .map_err(|e| classify_error(&what, e))?,
        )?;

        let account = riot_api
            .account_v1()
            .get_by_puuid(region.regional(), &summoner.puuid)
            .await;
        let riot_name = match account {
            Ok(account) => {
                let view: AccountView = reshape(&what, &account)?;
                riot_id(view.game_name, view.tag_line)
            }
            Err(e) => match classify_error(&what, e) {
                HarvestError::Authentication => return Err(HarvestError::Authentication),
                e => {
                    warn!("Falling back to the summoner name: {}", e);
                    None
                }
            },
        };

        Ok(Profile {
            name: riot_name.or(summoner.name).unwrap_or_default(),
            account_id: summoner.account_id.unwrap_or_default(),
            puuid: summoner.puuid,
        })
    }

    async fn list_match_ids(
        &self,
        region: Region,
        puuid: &str,
        window: TimeWindow,
        limit: i32,
    ) -> Result<Vec<String>> {
        let what = format!("match history of {}", puuid);
        self.api()?
            .match_v5()
            .get_match_ids_by_puuid(
                region.regional(),
                puuid,
                Some(limit),
                Some(window.end),
                None,
                Some(window.start),
                None,
                None,
            )
            .await
            .map_err(|e| classify_error(&what, e))
    }

    async fn get_match(&self, region: Region, match_id: &str) -> Result<MatchDetail> {
        let what = format!("match {}", match_id);
        let found = self
            .api()?
            .match_v5()
            .get_match(region.regional(), match_id)
            .await
            .map_err(|e| classify_error(&what, e))?;
        let Some(found) = found else {
            return Err(HarvestError::lookup(what, "not found"));
        };
        let view: MatchView = reshape(&what, &found)?;
        Ok(MatchDetail {
            match_id: if view.metadata.match_id.is_empty() {
                match_id.to_string()
            } else {
                view.metadata.match_id
            },
            participants: view
                .info
                .participants
                .into_iter()
                .map(ParticipantView::into_detail)
                .collect(),
        })
    }

    async fn list_champions(&self) -> Result<ChampionMap> {
        let realm: RealmView = self
            .fetch_json("Data Dragon realm", DDRAGON_REALM_URL)
            .await?;
        let version = realm
            .n
            .get("champion")
            .ok_or_else(|| HarvestError::lookup("Data Dragon realm", "no champion version"))?;
        let url = format!(
            "https://ddragon.leagueoflegends.com/cdn/{}/data/en_US/champion.json",
            version
        );
        let list: ChampionListView = self.fetch_json("Data Dragon champions", &url).await?;
        Ok(champion_map(list))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_participant_prefers_summoner_name() {
        let view: ParticipantView = serde_json::from_value(json!({
            "summonerName": "Faker",
            "riotIdGameName": "Hide on bush",
            "riotIdTagline": "KR1",
            "puuid": "p-1",
            "summonerId": "s-1",
            "championId": 7,
            "win": true
        }))
        .unwrap();
        let detail = view.into_detail();
        assert_eq!(detail.name, "Faker");
        assert_eq!(detail.champion_id, 7);
        assert!(detail.win);
    }

    #[test]
    fn test_participant_falls_back_to_riot_id() {
        let view: ParticipantView = serde_json::from_value(json!({
            "summonerName": "",
            "riotIdGameName": "Hide on bush",
            "riotIdTagline": "KR1",
            "puuid": "p-1",
            "championId": 7,
            "win": false
        }))
        .unwrap();
        let detail = view.into_detail();
        assert_eq!(detail.name, "Hide on bush#KR1");
        assert_eq!(detail.summoner_id, "");
    }

    #[test]
    fn test_league_view_tolerates_missing_fields() {
        let view: LeagueListView = serde_json::from_value(json!({
            "tier": "CHALLENGER",
            "entries": [
                { "puuid": "p-1", "leaguePoints": 1200 },
                { "summonerId": "s-2", "leaguePoints": 900, "wins": 10 }
            ]
        }))
        .unwrap();
        assert_eq!(view.entries.len(), 2);
        assert_eq!(view.entries[0].puuid.as_deref(), Some("p-1"));
        assert_eq!(view.entries[1].summoner_id.as_deref(), Some("s-2"));
        assert_eq!(view.entries[1].league_points, 900);
    }

    #[test]
    fn test_champion_map_parses_keys() {
        let list: ChampionListView = serde_json::from_value(json!({
            "data": {
                "Aatrox": { "key": "266", "name": "Aatrox" },
                "MonkeyKing": { "key": "62", "name": "Wukong" },
                "Broken": { "key": "x", "name": "Broken" }
            }
        }))
        .unwrap();
        let map = champion_map(list);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&62).map(String::as_str), Some("Wukong"));
    }

    #[test]
    fn test_riot_id_formatting() {
        assert_eq!(riot_id(Some("a".into()), Some("b".into())), Some("a#b".into()));
        assert_eq!(riot_id(Some("a".into()), None), Some("a".into()));
        assert_eq!(riot_id(Some(String::new()), Some("b".into())), None);
    }

    #[tokio::test]
    async fn test_missing_key_is_an_authentication_error() {
        let client = RiotClient::new(None);
        let result = client.verify_credential(Region::Na1).await;
        assert!(matches!(result, Err(HarvestError::Authentication)));

        assert!(RiotClient::new(Some("")).riot_api.is_none());
        assert!(RiotClient::new(Some("RGAPI-test")).riot_api.is_some());
    }
}
