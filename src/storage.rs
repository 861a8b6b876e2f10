//! Flat CSV files for the four tables, and their naming convention.

use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::{error, info};

use crate::error::{HarvestError, Result};
use crate::models::{MatchRecord, ParticipantSlot, PlayerRef, Region, SLOT_COUNT};
use crate::tables::{processed_columns, DirectoryEntry, PlayerDirectory, ProcessedMatchTable};

const SLOT_FIELDS: [&str; 5] = ["name", "puuid", "summonerId", "champId", "win"];

pub fn raw_player_file_name(region: Region, timestamp: i64) -> String {
    format!("raw_player_data_{}_{}.csv", region, timestamp)
}

pub fn raw_match_file_name(region: Region, start: i64, end: i64) -> String {
    format!("raw_match_data_{}_{}_{}.csv", region, start, end)
}

fn derived_file_name(raw_match_path: &Path, replacement: &str) -> Result<String> {
    let file_name = raw_match_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if !file_name.contains("raw_match_data") {
        return Err(HarvestError::invalid(format!(
            "Expected a raw_match_data file, got '{}'.",
            raw_match_path.display()
        )));
    }
    Ok(file_name.replace("raw_match_data", replacement))
}

pub fn processed_player_file_name(raw_match_path: &Path) -> Result<String> {
    derived_file_name(raw_match_path, "processed_player_data")
}

pub fn processed_match_file_name(raw_match_path: &Path) -> Result<String> {
    derived_file_name(raw_match_path, "processed_match_data")
}

/// How an attempt to write a computed table went.
#[derive(Debug)]
pub enum SaveOutcome {
    /// No output directory was given.
    Skipped,
    Saved(PathBuf),
    Failed(HarvestError),
}

/// A computed table together with the outcome of saving it. The table is
/// returned whether or not the save worked.
#[derive(Debug)]
pub struct Persisted<T> {
    pub data: T,
    pub save: SaveOutcome,
}

pub fn persist<T>(
    data: T,
    out_dir: Option<&Path>,
    file_name: &str,
    write: impl FnOnce(&Path, &T) -> Result<()>,
) -> Persisted<T> {
    let save = match out_dir {
        None => SaveOutcome::Skipped,
        Some(dir) => {
            let path = dir.join(file_name);
            match write(&path, &data) {
                Ok(()) => {
                    info!("Saved {}", path.display());
                    SaveOutcome::Saved(path)
                }
                Err(e) => {
                    error!("{}", e);
                    SaveOutcome::Failed(e)
                }
            }
        }
    };
    Persisted { data, save }
}

fn persistence_error(path: &Path) -> impl FnOnce(csv::Error) -> HarvestError + '_ {
    move |source| HarvestError::Persistence {
        path: path.to_path_buf(),
        source,
    }
}

fn writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    csv::Writer::from_path(path).map_err(persistence_error(path))
}

fn finish(path: &Path, mut wtr: csv::Writer<std::fs::File>) -> Result<()> {
    wtr.flush()
        .map_err(|e| persistence_error(path)(csv::Error::from(e)))
}

/// Opens `path` and returns its header row.
fn reader(path: &Path) -> Result<(csv::Reader<std::fs::File>, StringRecord)> {
    let mut rdr =
        csv::Reader::from_path(path).map_err(|e| HarvestError::schema(path, e.to_string()))?;
    let headers = rdr
        .headers()
        .map_err(|e| HarvestError::schema(path, e.to_string()))?
        .clone();
    Ok((rdr, headers))
}

fn column(path: &Path, headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| HarvestError::schema(path, format!("missing column '{}'", name)))
}

fn cell<'r>(record: &'r StringRecord, index: usize) -> &'r str {
    record.get(index).unwrap_or_default()
}

fn parse_int(path: &Path, line: usize, column: &str, value: &str) -> Result<i64> {
    let value = value.trim();
    if let Ok(v) = value.parse::<i64>() {
        return Ok(v);
    }
    // Tools that round-trip through floats write "266.0".
    match value.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v.is_finite() => Ok(v as i64),
        _ => Err(HarvestError::schema(
            path,
            format!("row {}: '{}' in column '{}' is not an integer", line, value, column),
        )),
    }
}

fn parse_bool(path: &Path, line: usize, column: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(HarvestError::schema(
            path,
            format!("row {}: '{}' in column '{}' is not a boolean", line, other, column),
        )),
    }
}

pub fn write_players(path: &Path, players: &[PlayerRef]) -> Result<()> {
    let mut wtr = writer(path)?;
    for player in players {
        wtr.serialize(player).map_err(persistence_error(path))?;
    }
    finish(path, wtr)
}

/// Reads the seed puuids of a crawl; only the `puuid` column is required.
pub fn read_seed_puuids(path: &Path) -> Result<Vec<String>> {
    let (mut rdr, headers) = reader(path)?;
    let puuid = column(path, &headers, "puuid")?;
    let mut puuids = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| HarvestError::schema(path, e.to_string()))?;
        let value = cell(&record, puuid).trim();
        if !value.is_empty() {
            puuids.push(value.to_string());
        }
    }
    Ok(puuids)
}

fn raw_match_headers() -> Vec<String> {
    let mut headers = vec!["match_id".to_string()];
    for i in 1..=SLOT_COUNT {
        for field in SLOT_FIELDS {
            headers.push(format!("p{}_{}", i, field));
        }
    }
    headers
}

pub fn write_match_rows(path: &Path, rows: &[MatchRecord]) -> Result<()> {
    let mut wtr = writer(path)?;
    wtr.write_record(raw_match_headers())
        .map_err(persistence_error(path))?;
    for row in rows {
        let mut record = vec![row.match_id.clone()];
        for p in &row.participants {
            record.push(p.name.clone());
            record.push(p.puuid.clone());
            record.push(p.summoner_id.clone());
            record.push(p.champ_id.to_string());
            record.push(p.win.to_string());
        }
        wtr.write_record(&record).map_err(persistence_error(path))?;
    }
    finish(path, wtr)
}

pub fn read_match_rows(path: &Path) -> Result<Vec<MatchRecord>> {
    let (mut rdr, headers) = reader(path)?;
    let match_id = column(path, &headers, "match_id")?;
    let mut slot_columns = Vec::with_capacity(SLOT_COUNT);
    for i in 1..=SLOT_COUNT {
        let mut indices = [0usize; 5];
        for (index, field) in indices.iter_mut().zip(SLOT_FIELDS) {
            *index = column(path, &headers, &format!("p{}_{}", i, field))?;
        }
        slot_columns.push(indices);
    }

    let mut rows = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| HarvestError::schema(path, e.to_string()))?;
        let line = line + 1;
        let mut participants = Vec::with_capacity(SLOT_COUNT);
        for (slot, [name, puuid, summoner_id, champ_id, win]) in slot_columns.iter().enumerate() {
            let slot_index = slot + 1;
            participants.push(ParticipantSlot {
                slot_index,
                name: cell(&record, *name).to_string(),
                puuid: cell(&record, *puuid).to_string(),
                summoner_id: cell(&record, *summoner_id).to_string(),
                champ_id: parse_int(
                    path,
                    line,
                    &format!("p{}_champId", slot_index),
                    cell(&record, *champ_id),
                )?,
                win: parse_bool(
                    path,
                    line,
                    &format!("p{}_win", slot_index),
                    cell(&record, *win),
                )?,
            });
        }
        rows.push(MatchRecord {
            match_id: cell(&record, match_id).to_string(),
            participants,
        });
    }
    Ok(rows)
}

pub fn write_player_directory(
    path: &Path,
    directory: &PlayerDirectory,
    include_key: bool,
) -> Result<()> {
    let mut wtr = writer(path)?;
    let mut headers = vec!["name", "puuid", "summonerId"];
    if include_key {
        headers.push("key");
    }
    wtr.write_record(&headers).map_err(persistence_error(path))?;
    for entry in directory.entries() {
        let mut record = vec![
            entry.name.clone(),
            entry.puuid.clone(),
            entry.summoner_id.clone(),
        ];
        if include_key {
            record.push(entry.key.to_string());
        }
        wtr.write_record(&record).map_err(persistence_error(path))?;
    }
    finish(path, wtr)
}

/// Reads a stored directory. Without a `key` column, keys are row positions.
pub fn read_player_directory(path: &Path) -> Result<PlayerDirectory> {
    let (mut rdr, headers) = reader(path)?;
    let name = column(path, &headers, "name")?;
    let puuid = column(path, &headers, "puuid")?;
    let summoner_id = column(path, &headers, "summonerId")?;
    let key = column(path, &headers, "key").ok();

    let mut entries = Vec::new();
    for (position, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| HarvestError::schema(path, e.to_string()))?;
        let key = match key {
            Some(index) => {
                let value = parse_int(path, position + 1, "key", cell(&record, index))?;
                usize::try_from(value).map_err(|_| {
                    HarvestError::schema(path, format!("row {}: negative key", position + 1))
                })?
            }
            None => position,
        };
        entries.push(DirectoryEntry {
            key,
            name: cell(&record, name).to_string(),
            puuid: cell(&record, puuid).to_string(),
            summoner_id: cell(&record, summoner_id).to_string(),
        });
    }
    Ok(PlayerDirectory::from_entries(entries))
}

pub fn write_processed_matches(path: &Path, table: &ProcessedMatchTable) -> Result<()> {
    let mut wtr = writer(path)?;
    wtr.write_record(processed_columns())
        .map_err(persistence_error(path))?;
    for processed in table {
        let mut record = vec![processed.match_id.clone()];
        for slot in &processed.slots {
            record.push(slot.name.clone());
            record.push(slot.key.map(|k| k.to_string()).unwrap_or_default());
            record.push(slot.champ_id.to_string());
            record.push(slot.champ_name.clone().unwrap_or_default());
            record.push(slot.win.to_string());
        }
        wtr.write_record(&record).map_err(persistence_error(path))?;
    }
    finish(path, wtr)
}
