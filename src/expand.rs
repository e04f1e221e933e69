use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::fixtures::Fixture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    Home,
    Away,
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Home => write!(f, "Home"),
            Venue::Away => write!(f, "Away"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchResult {
    #[serde(rename = "W")]
    Win,
    #[serde(rename = "D")]
    Draw,
    #[serde(rename = "L")]
    Loss,
}

impl MatchResult {
    pub fn from_goals(goals_for: u32, goals_against: u32) -> Self {
        if goals_for > goals_against {
            MatchResult::Win
        } else if goals_for == goals_against {
            MatchResult::Draw
        } else {
            MatchResult::Loss
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            MatchResult::Win => "W",
            MatchResult::Draw => "D",
            MatchResult::Loss => "L",
        }
    }

    pub fn is_win(self) -> bool {
        self == MatchResult::Win
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One team's side of a fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantRecord {
    pub kickoff: NaiveDateTime,
    pub competition: String,
    pub team: String,
    pub opponent: String,
    pub venue: Venue,
    pub goals_for: u32,
    pub goals_against: u32,
    pub result: MatchResult,
}

/// Both perspectives of a fixture, home first. `None` when the score is
/// undefined; the caller decides how to account for the drop.
pub fn expand_fixture(fixture: &Fixture) -> Option<[ParticipantRecord; 2]> {
    let score = fixture.score?;

    let side = |team: &str, opponent: &str, venue: Venue, gf: u32, ga: u32| ParticipantRecord {
        kickoff: fixture.kickoff,
        competition: fixture.competition.clone(),
        team: team.to_string(),
        opponent: opponent.to_string(),
        venue,
        goals_for: gf,
        goals_against: ga,
        result: MatchResult::from_goals(gf, ga),
    };

    Some([
        side(
            &fixture.home_team,
            &fixture.away_team,
            Venue::Home,
            score.home,
            score.away,
        ),
        side(
            &fixture.away_team,
            &fixture.home_team,
            Venue::Away,
            score.away,
            score.home,
        ),
    ])
}

/// Expands every scored fixture. Returns the records and the number of
/// fixtures left out because their score was undefined.
pub fn expand_fixtures(fixtures: &[Fixture]) -> (Vec<ParticipantRecord>, usize) {
    let mut records = Vec::with_capacity(fixtures.len() * 2);
    let mut undefined = 0usize;

    for fixture in fixtures {
        match expand_fixture(fixture) {
            Some(pair) => records.extend(pair),
            None => undefined += 1,
        }
    }

    (records, undefined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{MatchStatus, Score};
    use chrono::NaiveDate;

    fn fixture(home: &str, away: &str, score: Option<(u32, u32)>) -> Fixture {
        Fixture {
            kickoff: NaiveDate::from_ymd_opt(2024, 9, 1)
                .unwrap()
                .and_hms_opt(15, 0, 0)
                .unwrap(),
            competition: "FL1".to_string(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            score: score.map(|(home, away)| Score { home, away }),
            status: MatchStatus::Finished,
        }
    }

    #[test]
    fn sides_are_mirrored() {
        let [home, away] = expand_fixture(&fixture("Lille OSC", "FC Nantes", Some((2, 1)))).unwrap();

        assert_eq!(home.team, "Lille OSC");
        assert_eq!(home.opponent, "FC Nantes");
        assert_eq!(home.venue, Venue::Home);
        assert_eq!(away.team, "FC Nantes");
        assert_eq!(away.opponent, "Lille OSC");
        assert_eq!(away.venue, Venue::Away);
        assert_eq!((home.goals_for, home.goals_against), (away.goals_against, away.goals_for));
        assert_eq!(home.kickoff, away.kickoff);
    }

    #[test]
    fn results_follow_goal_difference() {
        let cases = [
            ((3, 0), MatchResult::Win, MatchResult::Loss),
            ((1, 1), MatchResult::Draw, MatchResult::Draw),
            ((0, 2), MatchResult::Loss, MatchResult::Win),
        ];

        for ((h, a), home_result, away_result) in cases {
            let [home, away] = expand_fixture(&fixture("Toulouse FC", "Angers SCO", Some((h, a)))).unwrap();
            assert_eq!(home.result, home_result);
            assert_eq!(away.result, away_result);
            for record in [&home, &away] {
                assert_eq!(
                    record.result,
                    MatchResult::from_goals(record.goals_for, record.goals_against)
                );
            }
        }
    }

    #[test]
    fn undefined_scores_are_counted_not_expanded() {
        let fixtures = vec![
            fixture("Lille OSC", "FC Nantes", Some((2, 1))),
            fixture("AJ Auxerre", "Stade de Reims", None),
        ];

        let (records, undefined) = expand_fixtures(&fixtures);
        assert_eq!(records.len(), 2);
        assert_eq!(undefined, 1);
    }
}
