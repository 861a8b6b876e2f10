use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use riven::consts::{PlatformRoute, RegionalRoute};
use serde_derive::Deserialize;
use serde_derive::Serialize;

use crate::error::HarvestError;

/// Number of participants in every match we keep.
pub const SLOT_COUNT: usize = 10;

/// Name token used for unknown or noised-out players.
pub const UNKNOWN_NAME: &str = "<U>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Na1,
    Euw1,
    Eun1,
    Kr,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::Na1, Region::Euw1, Region::Eun1, Region::Kr];

    pub fn code(self) -> &'static str {
        match self {
            Region::Na1 => "na1",
            Region::Euw1 => "euw1",
            Region::Eun1 => "eun1",
            Region::Kr => "kr",
        }
    }

    pub fn platform(self) -> PlatformRoute {
        match self {
            Region::Na1 => PlatformRoute::NA1,
            Region::Euw1 => PlatformRoute::EUW1,
            Region::Eun1 => PlatformRoute::EUN1,
            Region::Kr => PlatformRoute::KR,
        }
    }

    /// Routing cluster used by the match and account endpoints.
    pub fn regional(self) -> RegionalRoute {
        match self {
            Region::Na1 => RegionalRoute::AMERICAS,
            Region::Euw1 | Region::Eun1 => RegionalRoute::EUROPE,
            Region::Kr => RegionalRoute::ASIA,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Region {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_lowercase();
        Region::ALL
            .into_iter()
            .find(|r| r.code() == code)
            .ok_or_else(|| {
                HarvestError::invalid(format!(
                    "Invalid region '{}' (expected one of na1, euw1, eun1, kr).",
                    s
                ))
            })
    }
}

/// Ranked ladder tiers, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LadderTier {
    Challenger,
    Grandmaster,
    Master,
}

impl LadderTier {
    pub const ALL: [LadderTier; 3] = [
        LadderTier::Challenger,
        LadderTier::Grandmaster,
        LadderTier::Master,
    ];
}

impl fmt::Display for LadderTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LadderTier::Challenger => "challenger",
            LadderTier::Grandmaster => "grandmaster",
            LadderTier::Master => "master",
        };
        f.write_str(name)
    }
}

/// Epoch-second bounds of a match history search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn new(start: i64, end: i64, now: i64) -> Result<Self, HarvestError> {
        if start >= now {
            return Err(HarvestError::invalid(format!(
                "Invalid start time {} (must be before the current time {}).",
                start, now
            )));
        }
        if end <= start {
            return Err(HarvestError::invalid(format!(
                "Invalid end time {} (must be after the start time {}).",
                end, start
            )));
        }
        Ok(Self { start, end })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LadderEntry {
    pub summoner_id: String,
    pub puuid: String,
    pub league_points: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub puuid: String,
    pub account_id: String,
    pub name: String,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRef {
    pub puuid: String,
    pub account_id: String,
    pub summoner_id: String,
    pub name: String,
    pub league_points: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantDetail {
    pub name: String,
    pub puuid: String,
    pub summoner_id: String,
    pub champion_id: i64,
    pub win: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchDetail {
    pub match_id: String,
    pub participants: Vec<ParticipantDetail>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantSlot {
    /// 1-based position in the API's participant order.
    pub slot_index: usize,
    pub name: String,
    pub puuid: String,
    pub summoner_id: String,
    pub champ_id: i64,
    pub win: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub match_id: String,
    pub participants: Vec<ParticipantSlot>,
}

impl MatchRecord {
    /// Lays out the participants positionally. Returns `None` unless there are
    /// exactly [`SLOT_COUNT`] of them.
    pub fn from_detail(detail: MatchDetail) -> Option<Self> {
        if detail.participants.len() != SLOT_COUNT {
            return None;
        }
        let participants = detail
            .participants
            .into_iter()
            .enumerate()
            .map(|(i, p)| ParticipantSlot {
                slot_index: i + 1,
                name: p.name,
                puuid: p.puuid,
                summoner_id: p.summoner_id,
                champ_id: p.champion_id,
                win: p.win,
            })
            .collect();
        Some(Self {
            match_id: detail.match_id,
            participants,
        })
    }
}

pub type ChampionMap = HashMap<i64, String>;
