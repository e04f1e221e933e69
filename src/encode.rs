use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike;

use crate::enrich::MatchRow;
use crate::error::PipelineError;
use crate::expand::Venue;

/// A match row with the integer codes the classifier consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRow {
    pub row: MatchRow,
    /// home = 1, away = 0
    pub venue_code: u8,
    pub opponent_code: u32,
    pub hour: u32,
    /// 0 = Monday .. 6 = Sunday
    pub weekday: u32,
}

/// Opponent names in lexical order, numbered from zero.
#[derive(Debug, Clone, Default)]
pub struct OpponentCodes {
    codes: BTreeMap<String, u32>,
}

impl OpponentCodes {
    pub fn from_rows(rows: &[MatchRow]) -> Self {
        let names: BTreeSet<&str> = rows.iter().map(|r| r.opponent.as_str()).collect();
        let codes = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| (name.to_string(), idx as u32))
            .collect();
        Self { codes }
    }

    pub fn code(&self, opponent: &str) -> Option<u32> {
        self.codes.get(opponent).copied()
    }
}

pub fn venue_code(venue: Venue) -> u8 {
    match venue {
        Venue::Home => 1,
        Venue::Away => 0,
    }
}

/// Hour of a `HH:MM` kickoff time.
pub fn kickoff_hour(time: &str) -> Result<u32, PipelineError> {
    time.split(':')
        .next()
        .and_then(|hour| hour.trim().parse::<u32>().ok())
        .filter(|hour| *hour < 24)
        .ok_or_else(|| PipelineError::InvalidTimestamp {
            value: time.to_string(),
        })
}

pub fn encode(rows: Vec<MatchRow>) -> Result<Vec<EncodedRow>, PipelineError> {
    let opponents = OpponentCodes::from_rows(&rows);

    rows.into_iter()
        .map(|row| {
            let hour = kickoff_hour(&row.time)?;
            // every opponent was collected above
            let opponent_code = opponents.code(&row.opponent).unwrap_or_default();
            Ok(EncodedRow {
                venue_code: venue_code(row.venue),
                opponent_code,
                hour,
                weekday: row.kickoff.weekday().num_days_from_monday(),
                row,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::MatchResult;
    use chrono::NaiveDate;

    fn row(opponent: &str, venue: Venue, day: u32, time: &str) -> MatchRow {
        MatchRow {
            kickoff: NaiveDate::from_ymd_opt(2024, 9, day)
                .unwrap()
                .and_hms_opt(19, 0, 0)
                .unwrap(),
            time: time.to_string(),
            comp: "Ligue 1".to_string(),
            round: "Matchweek 1".to_string(),
            day: String::new(),
            venue,
            result: MatchResult::Draw,
            goals_for: 0,
            goals_against: 0,
            opponent: opponent.to_string(),
            attendance: 0,
            captain: String::new(),
            formation: "4-3-3".to_string(),
            referee: String::new(),
            match_report: String::new(),
            notes: String::new(),
            sh: 12,
            sot: 4,
            dist: 17.5,
            fk: 1,
            pk: 0,
            pkatt: 0,
            season: "2025".to_string(),
            team: "Lille OSC".to_string(),
        }
    }

    #[test]
    fn codes_are_stable_and_ordered() {
        let rows = vec![
            row("Stade de Reims", Venue::Home, 2, "20:00"),
            row("AJ Auxerre", Venue::Away, 8, "17:00"),
            row("Stade de Reims", Venue::Away, 15, "20:45"),
        ];

        let encoded = encode(rows).unwrap();
        assert_eq!(encoded[0].opponent_code, 1);
        assert_eq!(encoded[1].opponent_code, 0);
        assert_eq!(encoded[2].opponent_code, encoded[0].opponent_code);
        assert_eq!(encoded[0].venue_code, 1);
        assert_eq!(encoded[1].venue_code, 0);
        assert_eq!(encoded[1].hour, 17);
        assert_eq!(encoded[2].hour, 20);
        // 2024-09-02 was a Monday, 2024-09-08 a Sunday
        assert_eq!(encoded[0].weekday, 0);
        assert_eq!(encoded[1].weekday, 6);
    }

    #[test]
    fn malformed_kickoff_time_is_rejected() {
        assert!(kickoff_hour("late").is_err());
        assert!(kickoff_hour("25:00").is_err());
        assert_eq!(kickoff_hour("09:30").unwrap(), 9);
    }
}
