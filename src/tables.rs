use std::collections::{HashMap, HashSet};

use rand::seq::index;
use rand::Rng;
use tracing::{debug, info};

use crate::error::{HarvestError, Result};
use crate::models::{ChampionMap, MatchRecord, SLOT_COUNT, UNKNOWN_NAME};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectoryEntry {
    pub key: usize,
    pub name: String,
    pub puuid: String,
    pub summoner_id: String,
}

/// Every distinct player seen in a set of matches. Key 0 is always the
/// unknown-player sentinel and keys are dense row positions.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerDirectory {
    entries: Vec<DirectoryEntry>,
}

impl PlayerDirectory {
    pub fn sentinel() -> DirectoryEntry {
        DirectoryEntry {
            key: 0,
            name: UNKNOWN_NAME.to_string(),
            puuid: "0".to_string(),
            summoner_id: "0".to_string(),
        }
    }

    /// Rebuilds a directory from stored rows, keeping their keys.
    pub fn from_entries(entries: Vec<DirectoryEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name to key, first occurrence winning when a name repeats.
    fn key_index(&self) -> HashMap<&str, usize> {
        let mut index = HashMap::with_capacity(self.entries.len());
        for entry in &self.entries {
            index.entry(entry.name.as_str()).or_insert(entry.key);
        }
        index
    }
}

pub fn build_player_directory(rows: &[MatchRecord]) -> PlayerDirectory {
    let sentinel = PlayerDirectory::sentinel();
    let mut seen: HashSet<(&str, &str, &str)> = HashSet::new();
    seen.insert((
        sentinel.name.as_str(),
        sentinel.puuid.as_str(),
        sentinel.summoner_id.as_str(),
    ));

    let mut triples = Vec::new();
    for slot in 0..SLOT_COUNT {
        for row in rows {
            let Some(p) = row.participants.get(slot) else {
                continue;
            };
            let triple = (p.name.as_str(), p.puuid.as_str(), p.summoner_id.as_str());
            if seen.insert(triple) {
                triples.push(triple);
            }
        }
    }

    let mut entries = Vec::with_capacity(triples.len() + 1);
    entries.push(sentinel.clone());
    entries.extend(
        triples
            .into_iter()
            .enumerate()
            .map(|(i, (name, puuid, summoner_id))| DirectoryEntry {
                key: i + 1,
                name: name.to_string(),
                puuid: puuid.to_string(),
                summoner_id: summoner_id.to_string(),
            }),
    );
    info!(
        "Built a player directory of {} players from {} matches",
        entries.len() - 1,
        rows.len()
    );
    PlayerDirectory { entries }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedSlot {
    pub name: String,
    pub key: Option<usize>,
    pub champ_id: i64,
    pub champ_name: Option<String>,
    pub win: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedMatch {
    pub match_id: String,
    pub slots: Vec<ProcessedSlot>,
}

pub type ProcessedMatchTable = Vec<ProcessedMatch>;

/// Column names of the processed match table, in output order.
pub fn processed_columns() -> Vec<String> {
    let mut columns = vec!["match_id".to_string()];
    for i in 1..=SLOT_COUNT {
        for field in ["name", "key", "champId", "champName", "win"] {
            columns.push(format!("p{}_{}", i, field));
        }
    }
    columns
}

pub fn validate_noise_rate(noise_rate: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&noise_rate) {
        return Err(HarvestError::invalid(format!(
            "Invalid noise_rate {} (must be in-between 0 and 1).",
            noise_rate
        )));
    }
    Ok(())
}

/// Keys every participant against `directory` and names their champions.
///
/// Before the join, each slot independently has a random `noise_rate` share
/// of its rows renamed to `<U>`, so those rows land on the sentinel key.
/// Names missing from the directory get no key at all.
pub fn process_matches<R: Rng + ?Sized>(
    rows: &[MatchRecord],
    directory: &PlayerDirectory,
    noise_rate: f64,
    champions: &ChampionMap,
    rng: &mut R,
) -> Result<ProcessedMatchTable> {
    validate_noise_rate(noise_rate)?;

    let mut names: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.participants.iter().map(|p| p.name.clone()).collect())
        .collect();

    let noised = (noise_rate * rows.len() as f64).round() as usize;
    if noised > 0 {
        for slot in 0..SLOT_COUNT {
            for row in index::sample(rng, rows.len(), noised.min(rows.len())) {
                if let Some(name) = names[row].get_mut(slot) {
                    *name = UNKNOWN_NAME.to_string();
                }
            }
        }
        debug!("Noised {} rows per slot", noised);
    }

    let keys = directory.key_index();
    let table = rows
        .iter()
        .zip(names)
        .map(|(row, names)| ProcessedMatch {
            match_id: row.match_id.clone(),
            slots: row
                .participants
                .iter()
                .zip(names)
                .map(|(p, name)| ProcessedSlot {
                    key: keys.get(name.as_str()).copied(),
                    name,
                    champ_id: p.champ_id,
                    champ_name: champions.get(&p.champ_id).cloned(),
                    win: p.win,
                })
                .collect(),
        })
        .collect();
    Ok(table)
}
