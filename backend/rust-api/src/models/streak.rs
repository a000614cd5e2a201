use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use super::{bson_datetime_as_chrono, id_hex};

/// Streak threshold in days. Stored and serialised as the plain number.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "i32", into = "i32")]
pub enum StreakType {
    Week,
    TwoWeeks,
    Month,
    Quarter,
    FourMonths,
    Year,
}

impl StreakType {
    pub const ALL: [StreakType; 6] = [
        StreakType::Week,
        StreakType::TwoWeeks,
        StreakType::Month,
        StreakType::Quarter,
        StreakType::FourMonths,
        StreakType::Year,
    ];

    pub fn days(&self) -> i32 {
        match self {
            StreakType::Week => 7,
            StreakType::TwoWeeks => 14,
            StreakType::Month => 30,
            StreakType::Quarter => 90,
            StreakType::FourMonths => 120,
            StreakType::Year => 365,
        }
    }
}

impl TryFrom<i32> for StreakType {
    type Error = String;

    fn try_from(days: i32) -> Result<Self, Self::Error> {
        StreakType::ALL
            .into_iter()
            .find(|t| t.days() == days)
            .ok_or_else(|| {
                format!(
                    "\"{}\" is not a valid streak type, expected one of 7, 14, 30, 90, 120, 365",
                    days
                )
            })
    }
}

impl From<StreakType> for i32 {
    fn from(streak_type: StreakType) -> Self {
        streak_type.days()
    }
}

impl fmt::Display for StreakType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} days", self.days())
    }
}

/// What a recorded interaction did to the streak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakOutcome {
    Started,
    Extended,
    Reset,
    Unchanged,
}

impl StreakOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreakOutcome::Started => "started",
            StreakOutcome::Extended => "extended",
            StreakOutcome::Reset => "reset",
            StreakOutcome::Unchanged => "unchanged",
        }
    }
}

/// Consecutive-day counter per (user, streak type)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Streak {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    #[serde(rename = "type")]
    pub streak_type: StreakType,
    #[serde(default)]
    pub last_interaction: Option<NaiveDate>,
    pub current_streak: i32,
    pub highest_streak: i32,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

impl Streak {
    pub fn new(user_id: ObjectId, streak_type: StreakType) -> Self {
        let now = Utc::now();
        Streak {
            id: None,
            user_id,
            streak_type,
            last_interaction: None,
            current_streak: 0,
            highest_streak: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies one interaction on `date`.
    ///
    /// A repeat on the same day, or a date before the last interaction, keeps
    /// the count. `last_interaction` always becomes `date`.
    pub fn record_interaction(&mut self, date: NaiveDate) -> StreakOutcome {
        let outcome = match self.last_interaction {
            None => {
                self.current_streak = 1;
                StreakOutcome::Started
            }
            Some(last) => match (date - last).num_days() {
                1 => {
                    self.current_streak += 1;
                    StreakOutcome::Extended
                }
                gap if gap > 1 => {
                    self.current_streak = 1;
                    StreakOutcome::Reset
                }
                _ => StreakOutcome::Unchanged,
            },
        };

        self.last_interaction = Some(date);
        self.highest_streak = self.highest_streak.max(self.current_streak);

        outcome
    }

    /// Days left in the streak window, 0 when there was never an interaction.
    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        match self.last_interaction {
            None => 0,
            Some(last) => {
                let passed = (today - last).num_days();
                (i64::from(self.streak_type.days()) - passed).max(0)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StreakResponse {
    pub id: String,
    pub user: String,
    #[serde(rename = "type")]
    pub streak_type: StreakType,
    pub last_interaction: Option<NaiveDate>,
    pub current_streak: i32,
    pub highest_streak: i32,
    pub days_remaining: i64,
}

impl StreakResponse {
    pub fn new(streak: Streak, today: NaiveDate) -> Self {
        StreakResponse {
            id: id_hex(&streak.id),
            user: streak.user_id.to_hex(),
            days_remaining: streak.days_remaining(today),
            streak_type: streak.streak_type,
            last_interaction: streak.last_interaction,
            current_streak: streak.current_streak,
            highest_streak: streak.highest_streak,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStreakRequest {
    #[serde(rename = "type")]
    pub streak_type: StreakType,

    /// Staff may create a streak for another user
    pub user: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateStreakRequest {
    #[serde(rename = "type")]
    pub streak_type: Option<StreakType>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordInteractionRequest {
    pub interaction_date: Option<NaiveDate>,
}

/// Records an interaction on the caller's streak of `type`, creating it if needed
#[derive(Debug, Clone, Deserialize)]
pub struct RecordOwnInteractionRequest {
    #[serde(rename = "type")]
    pub streak_type: StreakType,
    pub interaction_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn streak() -> Streak {
        Streak::new(ObjectId::new(), StreakType::Week)
    }

    #[test]
    fn first_interaction_starts_streak() {
        let mut s = streak();
        assert_eq!(s.record_interaction(day(1)), StreakOutcome::Started);
        assert_eq!(s.current_streak, 1);
        assert_eq!(s.highest_streak, 1);
        assert_eq!(s.last_interaction, Some(day(1)));
    }

    #[test]
    fn consecutive_days_extend_and_track_highest() {
        let mut s = streak();
        s.record_interaction(day(1));
        for d in 2..=5 {
            assert_eq!(s.record_interaction(day(d)), StreakOutcome::Extended);
            assert_eq!(s.current_streak, d as i32);
            assert_eq!(s.highest_streak, d as i32);
        }
    }

    #[test]
    fn gap_resets_but_keeps_highest() {
        let mut s = streak();
        for d in 1..=3 {
            s.record_interaction(day(d));
        }
        assert_eq!(s.record_interaction(day(10)), StreakOutcome::Reset);
        assert_eq!(s.current_streak, 1);
        assert_eq!(s.highest_streak, 3);
    }

    #[test]
    fn same_day_is_a_no_op() {
        let mut s = streak();
        s.record_interaction(day(1));
        s.record_interaction(day(2));

        assert_eq!(s.record_interaction(day(2)), StreakOutcome::Unchanged);
        assert_eq!(s.current_streak, 2);
        assert_eq!(s.last_interaction, Some(day(2)));
    }

    #[test]
    fn backdated_interaction_keeps_count_and_moves_last_interaction() {
        let mut s = streak();
        s.record_interaction(day(5));
        s.record_interaction(day(6));

        assert_eq!(s.record_interaction(day(3)), StreakOutcome::Unchanged);
        assert_eq!(s.current_streak, 2);
        assert_eq!(s.last_interaction, Some(day(3)));

        assert_eq!(s.record_interaction(day(4)), StreakOutcome::Extended);
        assert_eq!(s.current_streak, 3);
        assert_eq!(s.highest_streak, 3);
        assert_eq!(s.last_interaction, Some(day(4)));
    }

    #[test]
    fn days_remaining_counts_down_to_zero() {
        let mut s = streak();
        assert_eq!(s.days_remaining(day(1)), 0);

        s.record_interaction(day(1));
        assert_eq!(s.days_remaining(day(1)), 7);
        assert_eq!(s.days_remaining(day(4)), 4);
        assert_eq!(s.days_remaining(day(20)), 0);
    }

    #[test]
    fn streak_type_accepts_only_known_thresholds() {
        assert_eq!(StreakType::try_from(30), Ok(StreakType::Month));
        assert!(StreakType::try_from(10).is_err());

        let parsed: StreakType = serde_json::from_str("365").unwrap();
        assert_eq!(parsed, StreakType::Year);
        assert_eq!(serde_json::to_string(&StreakType::TwoWeeks).unwrap(), "14");
        assert!(serde_json::from_str::<StreakType>("8").is_err());
    }
}
