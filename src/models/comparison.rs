//! Stored AI room comparison reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which of the two compared rooms the analysis recommends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    #[default]
    RoomA,
    RoomB,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoomA => f.write_str("room_a"),
            Self::RoomB => f.write_str("room_b"),
        }
    }
}

impl FromStr for Recommendation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "room_a" => Ok(Self::RoomA),
            "room_b" => Ok(Self::RoomB),
            _ => Err(anyhow::anyhow!("Invalid recommendation: {}", s)),
        }
    }
}

/// Structured result extracted from the model's free-text answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonAnalysis {
    pub summary: String,
    pub detailed_comparison: serde_json::Value,
    pub recommendation: Recommendation,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub id: i64,
    pub user_id: i64,
    pub room_a_id: i64,
    pub room_b_id: i64,
    pub comparison_criteria: serde_json::Value,
    pub analysis_summary: String,
    pub detailed_comparison: serde_json::Value,
    pub recommendation: Recommendation,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ComparisonReport {
    /// Id of the recommended room
    pub fn winner_room_id(&self) -> i64 {
        match self.recommendation {
            Recommendation::RoomA => self.room_a_id,
            Recommendation::RoomB => self.room_b_id,
        }
    }
}
