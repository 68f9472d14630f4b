//! Play-by-play CSV reading and writing.
//!
//! The layout follows ESPN's `plays` export: one row per event, camelCase
//! column names, and dict/list cells for `type`, `team` and `participants`.
//! A row whose fields cannot be read is skipped; a missing column fails the
//! whole log.

use std::io::{Read, Write};

use serde_json::{json, Value};

use super::literal::parse_literal;
use super::ExtractError;
use crate::models::{EventLog, PlayEvent};

const REQUIRED_COLUMNS: [&str; 10] = [
    "homeScore",
    "awayScore",
    "period",
    "scoringPlay",
    "scoreValue",
    "shootingPlay",
    "text",
    "type",
    "team",
    "participants",
];

const WRITE_COLUMNS: [&str; 12] = [
    "homeScore",
    "awayScore",
    "period",
    "clock",
    "clockSec",
    "scoringPlay",
    "scoreValue",
    "shootingPlay",
    "text",
    "team",
    "participants",
    "type",
];

/// Column positions resolved from the header row
struct Columns {
    required: [usize; REQUIRED_COLUMNS.len()],
    clock_sec: Option<usize>,
    clock: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, ExtractError> {
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);

        let mut required = [0; REQUIRED_COLUMNS.len()];
        for (slot, name) in required.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = position(name).ok_or(ExtractError::MissingColumn(name))?;
        }

        let clock_sec = position("clockSec");
        let clock = position("clock");
        if clock_sec.is_none() && clock.is_none() {
            return Err(ExtractError::MissingColumn("clockSec"));
        }

        Ok(Self {
            required,
            clock_sec,
            clock,
        })
    }

    fn cell<'r>(&self, record: &'r csv::StringRecord, name: &str) -> &'r str {
        REQUIRED_COLUMNS
            .iter()
            .position(|c| *c == name)
            .and_then(|i| record.get(self.required[i]))
            .unwrap_or("")
    }
}

/// Why a single row was skipped
#[derive(Debug, thiserror::Error)]
enum RowError {
    #[error("column `{column}` has unreadable value `{value}`")]
    Field { column: &'static str, value: String },
}

fn field_error(column: &'static str, value: &str) -> RowError {
    RowError::Field {
        column,
        value: value.to_string(),
    }
}

/// Reads a play-by-play CSV into an [`EventLog`]
pub fn read_event_log<R: Read>(reader: R) -> Result<EventLog, ExtractError> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| ExtractError::Unreadable(e.to_string()))?
        .clone();
    let columns = Columns::resolve(&headers)?;

    let mut log = EventLog::default();
    for (row, record) in csv_reader.records().enumerate() {
        let parsed = record
            .map_err(|e| RowError::Field {
                column: "row",
                value: e.to_string(),
            })
            .and_then(|record| parse_row(&record, &columns));

        match parsed {
            Ok(event) => log.events.push(event),
            Err(e) => {
                tracing::debug!(row = row, error = %e, "Skipping play-by-play row");
                log.skipped_rows += 1;
            }
        }
    }

    if log.skipped_rows > 0 {
        tracing::warn!(
            skipped = log.skipped_rows,
            parsed = log.events.len(),
            "Skipped unreadable play-by-play rows"
        );
    }

    Ok(log)
}

fn parse_row(record: &csv::StringRecord, columns: &Columns) -> Result<PlayEvent, RowError> {
    let cell = |name: &str| columns.cell(record, name);
    let (type_id, type_text) = parse_type(cell("type"))?;

    Ok(PlayEvent {
        home_score: required("homeScore", cell("homeScore"), parse_count)?,
        away_score: required("awayScore", cell("awayScore"), parse_count)?,
        period: required("period", cell("period"), parse_period)?,
        clock_seconds: parse_clock(record, columns),
        scoring_play: required("scoringPlay", cell("scoringPlay"), parse_bool)?,
        score_value: required("scoreValue", cell("scoreValue"), parse_count)?,
        shooting_play: required("shootingPlay", cell("shootingPlay"), parse_bool)?,
        text: cell("text").to_string(),
        team_id: parse_team(cell("team"))?,
        participants: parse_participants(cell("participants"))?,
        type_id,
        type_text,
    })
}

fn required<T>(
    column: &'static str,
    raw: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, RowError> {
    parse(raw).ok_or_else(|| field_error(column, raw))
}

fn parse_count(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<u32>() {
        return Some(value);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0)
        .map(|v| v as u32)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "True" | "true" | "TRUE" | "1" | "1.0" => Some(true),
        "False" | "false" | "FALSE" | "0" | "0.0" => Some(false),
        _ => None,
    }
}

/// Plain number, or a `{'number': 2, ...}` dict from unflattened exports
fn parse_period(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        let value = parse_literal(trimmed).ok()?;
        return value.get("number").and_then(Value::as_u64).map(|n| n as u32);
    }
    parse_count(trimmed)
}

fn parse_clock(record: &csv::StringRecord, columns: &Columns) -> Option<f64> {
    let seconds = columns
        .clock_sec
        .and_then(|i| record.get(i))
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite());
    if seconds.is_some() {
        return seconds;
    }

    let display = columns.clock.and_then(|i| record.get(i))?.trim();
    if display.starts_with('{') {
        let value = parse_literal(display).ok()?;
        return value
            .get("displayValue")
            .and_then(Value::as_str)
            .and_then(clock_to_seconds);
    }
    clock_to_seconds(display)
}

/// Converts a game clock display (`"11:42"` or `"8.3"`) to seconds
pub fn clock_to_seconds(display: &str) -> Option<f64> {
    let display = display.trim();
    match display.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes = minutes.parse::<u32>().ok()?;
            let seconds = seconds.parse::<f64>().ok()?;
            Some(minutes as f64 * 60.0 + seconds)
        }
        None => display.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}

fn parse_structured(column: &'static str, raw: &str) -> Result<Option<Value>, RowError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "nan" {
        return Ok(None);
    }
    parse_literal(trimmed)
        .map(Some)
        .map_err(|_| field_error(column, raw))
}

fn id_of(value: &Value) -> Option<String> {
    match value.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn parse_type(raw: &str) -> Result<(Option<String>, Option<String>), RowError> {
    match parse_structured("type", raw)? {
        None => Ok((None, None)),
        Some(value @ Value::Object(_)) => {
            let text = value.get("text").and_then(Value::as_str).map(str::to_string);
            Ok((id_of(&value), text))
        }
        Some(_) => Err(field_error("type", raw)),
    }
}

fn parse_team(raw: &str) -> Result<Option<String>, RowError> {
    match parse_structured("team", raw)? {
        None => Ok(None),
        Some(value @ Value::Object(_)) => Ok(id_of(&value)),
        Some(_) => Err(field_error("team", raw)),
    }
}

/// Keeps one slot per entry so the primary actor stays first even without an athlete
fn parse_participants(raw: &str) -> Result<Vec<Option<String>>, RowError> {
    match parse_structured("participants", raw)? {
        None => Ok(Vec::new()),
        Some(Value::Array(entries)) => Ok(entries
            .iter()
            .map(|entry| entry.get("athlete").and_then(id_of))
            .collect()),
        Some(_) => Err(field_error("participants", raw)),
    }
}

/// Formats seconds remaining the way ESPN displays the clock
fn format_clock(seconds: f64) -> String {
    if seconds >= 60.0 {
        let whole = seconds as u32;
        format!("{}:{:02}", whole / 60, whole % 60)
    } else {
        format!("{:.1}", seconds)
    }
}

/// Writes an event log in the layout [`read_event_log`] accepts
pub fn write_event_log<W: Write>(writer: W, log: &EventLog) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(WRITE_COLUMNS)?;

    for event in &log.events {
        let team = event
            .team_id
            .as_ref()
            .map(|id| json!({ "id": id }).to_string())
            .unwrap_or_default();
        let participants = if event.participants.is_empty() {
            String::new()
        } else {
            Value::Array(
                event
                    .participants
                    .iter()
                    .map(|slot| match slot {
                        Some(id) => json!({ "athlete": { "id": id } }),
                        None => json!({}),
                    })
                    .collect(),
            )
            .to_string()
        };
        let event_type = event
            .type_id
            .as_ref()
            .map(|id| json!({ "id": id, "text": event.type_text }).to_string())
            .unwrap_or_default();
        let clock = event.clock_seconds.map(format_clock).unwrap_or_default();
        let clock_sec = event
            .clock_seconds
            .map(|s| s.to_string())
            .unwrap_or_default();

        csv_writer.write_record([
            event.home_score.to_string(),
            event.away_score.to_string(),
            event.period.to_string(),
            clock,
            clock_sec,
            event.scoring_play.to_string(),
            event.score_value.to_string(),
            event.shooting_play.to_string(),
            event.text.clone(),
            team,
            participants,
            event_type,
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "homeScore,awayScore,period,clock,clockSec,scoringPlay,scoreValue,shootingPlay,text,team,participants,type\n";

    fn read(body: &str) -> Result<EventLog, ExtractError> {
        read_event_log(format!("{}{}", HEADER, body).as_bytes())
    }

    #[test]
    fn test_reads_python_literal_rows() {
        let log = read(concat!(
            "0,0,1,12:00,720,False,0,False,Start of the 1st Quarter,,,\"{'id': '615', 'text': 'Jumpball'}\"\n",
            "2,0,1,11:42,702.0,True,2,True,Tatum makes two point shot,\"{'id': '2'}\",\"[{'athlete': {'id': '4065648'}}]\",\"{'id': '96', 'text': 'Slam Dunk Shot'}\"\n",
        ))
        .unwrap();

        assert_eq!(log.len(), 2);
        assert_eq!(log.skipped_rows, 0);
        let dunk = &log.events[1];
        assert_eq!(dunk.home_score, 2);
        assert_eq!(dunk.clock_seconds, Some(702.0));
        assert!(dunk.scoring_play && dunk.shooting_play);
        assert_eq!(dunk.team_id.as_deref(), Some("2"));
        assert_eq!(dunk.participants, vec![Some("4065648".to_string())]);
        assert_eq!(dunk.type_id.as_deref(), Some("96"));
        assert_eq!(dunk.type_text.as_deref(), Some("Slam Dunk Shot"));
        assert_eq!(log.events[0].team_id, None);
    }

    #[test]
    fn test_unparseable_row_is_skipped() {
        let log = read(concat!(
            "0,0,1,12:00,720,False,0,False,Jumpball,,,\n",
            "2,0,1,11:42,702,True,2,True,Broken,\"{'id': '2'\",,\n",
            "two,0,1,11:30,690,True,2,True,Bad score,,,\n",
            "4,0,1,11:00,660,True,2,True,Layup,\"{'id': '2'}\",,\n",
        ))
        .unwrap();

        assert_eq!(log.len(), 2);
        assert_eq!(log.skipped_rows, 2);
        assert_eq!(log.events[1].home_score, 4);
    }

    #[test]
    fn test_participant_without_athlete_keeps_its_slot() {
        let log = read("2,0,1,11:42,702,True,2,True,Team rebound,\"{'id': '2'}\",\"[{'type': 'team'}, {'athlete': {'id': '4065648'}}]\",\n").unwrap();
        let event = &log.events[0];
        assert_eq!(event.participants, vec![None, Some("4065648".to_string())]);
        assert_eq!(event.primary_athlete(), None);
    }

    #[test]
    fn test_missing_score_column_is_fatal() {
        let csv = "awayScore,period,clockSec,scoringPlay,scoreValue,shootingPlay,text,team,participants,type\n0,1,720,False,0,False,x,,,\n";
        let err = read_event_log(csv.as_bytes()).unwrap_err();
        assert_eq!(err, ExtractError::MissingColumn("homeScore"));
    }

    #[test]
    fn test_missing_clock_columns_is_fatal() {
        let csv = "homeScore,awayScore,period,scoringPlay,scoreValue,shootingPlay,text,team,participants,type\n";
        let err = read_event_log(csv.as_bytes()).unwrap_err();
        assert_eq!(err, ExtractError::MissingColumn("clockSec"));
    }

    #[test]
    fn test_clock_falls_back_to_display_value() {
        let log = read("0,0,1,5:30,,False,0,False,x,,,\n0,0,1,8.5,,False,0,False,y,,,\n").unwrap();
        assert_eq!(log.events[0].clock_seconds, Some(330.0));
        assert_eq!(log.events[1].clock_seconds, Some(8.5));
    }

    #[test]
    fn test_float_scores_and_dict_period() {
        let log = read("101.0,99.0,\"{'number': 4, 'displayValue': '4th Quarter'}\",0:00,0,False,0,False,End of Game,,,\"{'id': '402'}\"\n").unwrap();
        let event = &log.events[0];
        assert_eq!((event.home_score, event.away_score), (101, 99));
        assert_eq!(event.period, 4);
        assert_eq!(event.type_id.as_deref(), Some("402"));
    }

    #[test]
    fn test_clock_to_seconds() {
        assert_eq!(clock_to_seconds("12:00"), Some(720.0));
        assert_eq!(clock_to_seconds("0:45"), Some(45.0));
        assert_eq!(clock_to_seconds("3.2"), Some(3.2));
        assert_eq!(clock_to_seconds("soon"), None);
    }

    #[test]
    fn test_written_log_reads_back() {
        let log = EventLog::new(vec![
            PlayEvent {
                home_score: 3,
                away_score: 0,
                period: 1,
                clock_seconds: Some(695.0),
                scoring_play: true,
                score_value: 3,
                shooting_play: true,
                text: "Brown makes 24-foot three, \"assisted\"".to_string(),
                team_id: Some("2".to_string()),
                participants: vec![Some("3917376".to_string()), None, Some("4065648".to_string())],
                type_id: Some("92".to_string()),
                type_text: Some("Jump Shot".to_string()),
            },
            PlayEvent {
                home_score: 3,
                away_score: 0,
                period: 1,
                clock_seconds: Some(12.5),
                ..Default::default()
            },
        ]);

        let mut buffer = Vec::new();
        write_event_log(&mut buffer, &log).unwrap();
        let reread = read_event_log(buffer.as_slice()).unwrap();

        assert_eq!(reread, log);
    }
}
