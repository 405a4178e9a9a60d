//! AI room comparison
//!
//! Builds the prompt for two rooms, asks the chat-completion provider,
//! extracts the `요약:` / `상세비교:` / `추천:` / `이유:` answer lines and stores
//! one report per (user, room pair).

use crate::db::repositories::{BookmarkRepository, ComparisonRepository, RoomRepository};
use crate::models::{
    format_thousands, ComparisonAnalysis, ComparisonReport, Recommendation, Room, RoomCard,
};
use crate::services::ai_client::{ChatCompletion, ChatMessage};
use crate::services::room_import;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const SYSTEM_PROMPT: &str = "당신은 부동산 전문가입니다. 두 개의 방을 객관적으로 비교 분석하고, 사용자의 선호사항을 고려하여 더 나은 선택을 추천해주세요.";
pub const MAX_PREFERENCES_CHARS: usize = 500;
const MARKET_SAMPLE_SIZE: usize = 3;
const RAW_SUMMARY_CHARS: usize = 200;

const DEFAULT_SUMMARY: &str = "AI 분석 완료";
const DEFAULT_REASONING: &str = "종합적인 분석 결과";
const RAW_REASONING: &str = "AI 분석 결과";

#[derive(Debug, thiserror::Error)]
pub enum ComparisonServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("AI provider is not configured")]
    NotConfigured,

    #[error("AI provider error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompareInput {
    pub room_a_id: i64,
    pub room_b_id: i64,
    #[serde(default)]
    pub comparison_criteria: Option<Value>,
    #[serde(default)]
    pub user_preferences: Option<String>,
}

/// Stored report with both rooms
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    #[serde(flatten)]
    pub report: ComparisonReport,
    pub room_a: Room,
    pub room_b: Room,
    pub winner_room_id: i64,
}

/// History entry
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    #[serde(flatten)]
    pub report: ComparisonReport,
    pub winner_room_id: i64,
}

impl From<ComparisonReport> for ReportSummary {
    fn from(report: ComparisonReport) -> Self {
        let winner_room_id = report.winner_room_id();
        Self {
            report,
            winner_room_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookmarkedRooms {
    pub bookmarked_rooms: Vec<RoomCard>,
    pub total_count: usize,
}

/// One reference listing from the market data file
#[derive(Debug, Clone, PartialEq)]
pub struct MarketRow {
    pub title: String,
    pub monthly_fee: String,
    pub address: String,
}

pub struct ComparisonService {
    room_repo: Arc<dyn RoomRepository>,
    report_repo: Arc<dyn ComparisonRepository>,
    bookmark_repo: Arc<dyn BookmarkRepository>,
    client: Option<Arc<dyn ChatCompletion>>,
    market_data_path: PathBuf,
}

impl ComparisonService {
    pub fn new(
        room_repo: Arc<dyn RoomRepository>,
        report_repo: Arc<dyn ComparisonRepository>,
        bookmark_repo: Arc<dyn BookmarkRepository>,
        client: Option<Arc<dyn ChatCompletion>>,
        market_data_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            room_repo,
            report_repo,
            bookmark_repo,
            client,
            market_data_path: market_data_path.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub async fn compare(&self, user_id: i64, input: CompareInput) -> Result<ComparisonResult, ComparisonServiceError> {
        if input.room_a_id == input.room_b_id {
            return Err(ComparisonServiceError::ValidationError(
                "room_a_id and room_b_id must differ".to_string(),
            ));
        }
        let criteria = match input.comparison_criteria {
            None | Some(Value::Null) => json!({}),
            Some(Value::Object(map)) => Value::Object(map),
            Some(_) => {
                return Err(ComparisonServiceError::ValidationError(
                    "comparison_criteria must be a JSON object".to_string(),
                ))
            }
        };
        let preferences = input.user_preferences.unwrap_or_default();
        if preferences.chars().count() > MAX_PREFERENCES_CHARS {
            return Err(ComparisonServiceError::ValidationError(format!(
                "user_preferences must be at most {} characters",
                MAX_PREFERENCES_CHARS
            )));
        }

        let room_a = self.room(input.room_a_id).await?;
        let room_b = self.room(input.room_b_id).await?;

        let client = self.client.as_ref().ok_or(ComparisonServiceError::NotConfigured)?;

        let market = load_market_rows(&self.market_data_path).await;
        let prompt = build_prompt(&room_a, &room_b, &criteria, preferences.trim(), &market);
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];

        let answer = client.complete(&messages).await.map_err(|e| {
            tracing::warn!("AI comparison failed: {:#}", e);
            ComparisonServiceError::Upstream(e.to_string())
        })?;
        let analysis = parse_answer(&answer);

        let report = self
            .report_repo
            .upsert(user_id, room_a.id, room_b.id, &criteria, &analysis)
            .await?;
        tracing::info!(
            "User {} compared rooms {} and {}: {}",
            user_id,
            room_a.id,
            room_b.id,
            report.recommendation
        );

        let winner_room_id = report.winner_room_id();
        Ok(ComparisonResult {
            report,
            room_a,
            room_b,
            winner_room_id,
        })
    }

    /// Reports of a user, most recent first
    pub async fn history(&self, user_id: i64) -> Result<Vec<ReportSummary>, ComparisonServiceError> {
        let reports = self.report_repo.list_by_user(user_id).await?;
        Ok(reports.into_iter().map(ReportSummary::from).collect())
    }

    /// A report owned by `user_id`; anyone else's report is not found
    pub async fn get_report(&self, user_id: i64, id: i64) -> Result<ComparisonResult, ComparisonServiceError> {
        let report = self
            .report_repo
            .get_for_user(id, user_id)
            .await?
            .ok_or(ComparisonServiceError::NotFound("Report"))?;
        let room_a = self.room(report.room_a_id).await?;
        let room_b = self.room(report.room_b_id).await?;
        let winner_room_id = report.winner_room_id();

        Ok(ComparisonResult {
            report,
            room_a,
            room_b,
            winner_room_id,
        })
    }

    pub async fn bookmarked_rooms(&self, user_id: i64) -> Result<BookmarkedRooms, ComparisonServiceError> {
        let cards = self.bookmark_repo.cards_by_user(user_id).await?;
        Ok(BookmarkedRooms {
            total_count: cards.len(),
            bookmarked_rooms: cards,
        })
    }

    async fn room(&self, id: i64) -> Result<Room, ComparisonServiceError> {
        self.room_repo
            .get_by_id(id)
            .await?
            .ok_or(ComparisonServiceError::NotFound("Room"))
    }
}

/// First listings of the market data file; unreadable files give none
pub async fn load_market_rows(path: &Path) -> Vec<MarketRow> {
    let blob = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) => {
            tracing::debug!("No market data at {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    let value: Value = match serde_json::from_str(&blob) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Ignoring malformed market data {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    market_rows(&value)
}

fn market_rows(value: &Value) -> Vec<MarketRow> {
    let Ok(items) = room_import::extract_items(value) else {
        return Vec::new();
    };
    items
        .iter()
        .take(MARKET_SAMPLE_SIZE)
        .map(|item| MarketRow {
            title: display_value(item.get("제목")),
            monthly_fee: display_value(item.get("월세")),
            address: display_value(item.get("주소")),
        })
        .collect()
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "N/A".to_string(),
        Some(other) => other.to_string(),
    }
}

fn won(amount: Option<i64>) -> String {
    amount
        .map(|v| format!("{}원", format_thousands(v)))
        .unwrap_or_else(|| "N/A".to_string())
}

fn or_na<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
}

fn describe_room(label: &str, room: &Room) -> String {
    format!(
        "방 {label}: {title}\n\
         - 타입: {room_type}\n\
         - 보증금: {deposit}\n\
         - 월세: {monthly}\n\
         - 관리비: {maintenance}\n\
         - 면적: 공급 {supply}㎡, 전용 {real}㎡\n\
         - 층수: {floor}\n\
         - 주소: {address}\n\
         - 위치: 위도 {lat}, 경도 {lng}\n",
        title = room.title,
        room_type = room.room_type.as_deref().unwrap_or("N/A"),
        deposit = won(room.deposit),
        monthly = won(room.monthly_fee),
        maintenance = won(room.maintenance_cost),
        supply = or_na(room.supply_area),
        real = or_na(room.real_area),
        floor = room.floor.as_deref().unwrap_or("N/A"),
        address = room.address.as_deref().unwrap_or("N/A"),
        lat = or_na(room.latitude),
        lng = or_na(room.longitude),
    )
}

/// User message asking for a comparison in the four-line answer format
pub fn build_prompt(room_a: &Room, room_b: &Room, criteria: &Value, preferences: &str, market: &[MarketRow]) -> String {
    let mut prompt = String::from("다음 두 방을 비교 분석해주세요:\n\n");
    prompt.push_str(&describe_room("A", room_a));
    prompt.push('\n');
    prompt.push_str(&describe_room("B", room_b));

    if criteria.as_object().is_some_and(|c| !c.is_empty()) {
        prompt.push_str(&format!("\n비교 기준: {}\n", criteria));
    }
    if !preferences.is_empty() {
        prompt.push_str(&format!("\n사용자 선호사항: {}\n", preferences));
    }
    if !market.is_empty() {
        prompt.push_str("\n시장 참고 데이터 (샘플):\n");
        for row in market {
            prompt.push_str(&format!("- {}: {}원, {}\n", row.title, row.monthly_fee, row.address));
        }
    }

    prompt.push_str(
        "\n다음 형식으로 응답해주세요:\n\n\
         요약: [두 방의 주요 차이점을 간단히 요약]\n\
         상세비교: [가격, 위치, 면적, 편의성 등을 구체적으로 비교]\n\
         추천: [room_a 또는 room_b 중 하나 선택]\n\
         이유: [추천 이유를 구체적으로 설명]\n",
    );
    prompt
}

/// Extract the structured analysis from the model's answer
pub fn parse_answer(answer: &str) -> ComparisonAnalysis {
    let mut summary: Option<String> = None;
    let mut comparison: Option<String> = None;
    let mut recommendation: Option<Recommendation> = None;
    let mut reasoning: Option<String> = None;

    for line in answer.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("요약:") {
            summary = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("상세비교:") {
            comparison = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("추천:") {
            recommendation = Some(parse_recommendation(rest));
        } else if let Some(rest) = line.strip_prefix("이유:") {
            reasoning = Some(rest.trim().to_string());
        }
    }

    let found_marker =
        summary.is_some() || comparison.is_some() || recommendation.is_some() || reasoning.is_some();
    if !found_marker {
        return raw_analysis(answer);
    }

    let detailed_comparison = match comparison {
        Some(text) => json!({ "comparison": text }),
        None => json!({}),
    };

    ComparisonAnalysis {
        summary: summary
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
        detailed_comparison,
        recommendation: recommendation.unwrap_or_default(),
        reasoning: reasoning
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_REASONING.to_string()),
    }
}

fn parse_recommendation(text: &str) -> Recommendation {
    let text = text.trim().to_lowercase();
    if text.contains("room_a") || text.contains("방 a") {
        Recommendation::RoomA
    } else if text.contains("room_b") || text.contains("방 b") {
        Recommendation::RoomB
    } else {
        Recommendation::RoomA
    }
}

/// Fallback for answers that ignore the requested format
fn raw_analysis(answer: &str) -> ComparisonAnalysis {
    let summary = if answer.chars().count() > RAW_SUMMARY_CHARS {
        let head: String = answer.chars().take(RAW_SUMMARY_CHARS).collect();
        format!("{}...", head)
    } else {
        answer.to_string()
    };

    ComparisonAnalysis {
        summary,
        detailed_comparison: json!({ "raw_response": answer }),
        recommendation: Recommendation::RoomA,
        reasoning: RAW_REASONING.to_string(),
    }
}
