//! Room review model and rating aggregation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's review of a room. Each rating dimension is optional (1-5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub room_id: i64,
    pub rating_safety: Option<i64>,
    pub rating_noise: Option<i64>,
    pub rating_light: Option<i64>,
    pub rating_traffic: Option<i64>,
    pub rating_clean: Option<i64>,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateReviewInput {
    #[serde(default)]
    pub rating_safety: Option<i64>,
    #[serde(default)]
    pub rating_noise: Option<i64>,
    #[serde(default)]
    pub rating_light: Option<i64>,
    #[serde(default)]
    pub rating_traffic: Option<i64>,
    #[serde(default)]
    pub rating_clean: Option<i64>,
    #[serde(default)]
    pub content: Option<String>,
}

impl CreateReviewInput {
    /// Ratings paired with their field names
    pub fn ratings(&self) -> [(&'static str, Option<i64>); 5] {
        [
            ("rating_safety", self.rating_safety),
            ("rating_noise", self.rating_noise),
            ("rating_light", self.rating_light),
            ("rating_traffic", self.rating_traffic),
            ("rating_clean", self.rating_clean),
        ]
    }
}

/// Raw per-dimension averages as returned by SQL `AVG`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingAverages {
    pub review_count: i64,
    pub safety: Option<f64>,
    pub noise: Option<f64>,
    pub light: Option<f64>,
    pub traffic: Option<f64>,
    pub clean: Option<f64>,
}

/// Aggregated ratings of a room, rounded to one decimal.
///
/// A dimension nobody rated is `None`; `overall` is the mean of the
/// dimensions that have an average.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingSummary {
    pub review_count: i64,
    pub safety: Option<f64>,
    pub noise: Option<f64>,
    pub light: Option<f64>,
    pub traffic: Option<f64>,
    pub clean: Option<f64>,
    pub overall: Option<f64>,
}

impl From<RatingAverages> for RatingSummary {
    fn from(avg: RatingAverages) -> Self {
        let dims = [avg.safety, avg.noise, avg.light, avg.traffic, avg.clean];
        let present: Vec<f64> = dims.iter().flatten().copied().collect();
        let overall = if present.is_empty() {
            None
        } else {
            Some(round1(present.iter().sum::<f64>() / present.len() as f64))
        };

        Self {
            review_count: avg.review_count,
            safety: avg.safety.map(round1),
            noise: avg.noise.map(round1),
            light: avg.light.map(round1),
            traffic: avg.traffic.map(round1),
            clean: avg.clean.map(round1),
            overall,
        }
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_rounds_and_averages_present_dimensions() {
        let summary = RatingSummary::from(RatingAverages {
            review_count: 3,
            safety: Some(4.333333),
            noise: Some(3.0),
            light: None,
            traffic: None,
            clean: Some(5.0),
        });

        assert_eq!(summary.safety, Some(4.3));
        assert_eq!(summary.light, None);
        // (4.333333 + 3 + 5) / 3 = 4.111
        assert_eq!(summary.overall, Some(4.1));
    }

    #[test]
    fn test_summary_without_reviews() {
        let summary = RatingSummary::from(RatingAverages::default());
        assert_eq!(summary.review_count, 0);
        assert_eq!(summary.overall, None);
    }
}
