//! Row types handed out by the record store.
//!
//! These mirror what the store's join queries return: a record plus the few
//! columns of its parent feedback the engine needs for bucketing or averaging.

use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::api::{
    AnswerId, CarrierId, FeedbackId, OptionId, PushId, QuestionId, RatingId, RewardId, TeamId,
    UserId,
};

/// A carrier is the survey/form feedback is collected through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carrier {
    pub id: CarrierId,
    pub team_id: TeamId,
    pub name: String,
    pub creator_id: UserId,
}

/// One feedback submission, as used for date-range discovery and bucketing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub id: FeedbackId,
    pub carrier_id: CarrierId,
    /// Satisfaction ratio in percent; `None` when nothing was rated.
    pub satisfaction_ratio: Option<f64>,
    pub completed: bool,
    pub created_at: NaiveDateTime,
}

/// Question kinds the engine dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionType {
    Text,
    Textarea,
    Nps,
    Slider,
    LargeSlider,
    Select,
    Dropdown,
    Image,
    Smiley,
    Toggle,
    #[serde(other)]
    Unknown,
}

impl QuestionType {
    /// Free-text questions, the source of insight terms.
    pub const FREE_TEXT: [QuestionType; 2] = [QuestionType::Text, QuestionType::Textarea];

    pub fn is_free_text(&self) -> bool {
        Self::FREE_TEXT.contains(self)
    }
}

impl FromStr for QuestionType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "text" => Self::Text,
            "textarea" => Self::Textarea,
            "nps" => Self::Nps,
            "slider" => Self::Slider,
            "largeSlider" => Self::LargeSlider,
            "select" => Self::Select,
            "dropdown" => Self::Dropdown,
            "image" => Self::Image,
            "smiley" => Self::Smiley,
            "toggle" => Self::Toggle,
            _ => Self::Unknown,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub carrier_id: CarrierId,
    pub question_type: QuestionType,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: OptionId,
    pub question_id: QuestionId,
    pub name: String,
    /// Image location, only set for image questions.
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub id: RatingId,
    pub carrier_id: CarrierId,
    pub label: String,
}

/// A stored answer to a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub feedback_id: FeedbackId,
    pub question_id: QuestionId,
    pub value: String,
    /// Sentiment score in [-100, 100], set once the answer was analysed.
    pub sentiment_score: Option<f64>,
    pub created_at: NaiveDateTime,
}

impl Answer {
    /// Numeric view of the raw value (NPS, sliders).
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.trim().parse::<f64>().ok()
    }
}

/// Answer joined with its question type and parent feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerWithFeedback {
    pub answer: Answer,
    pub question_type: QuestionType,
    pub carrier_id: CarrierId,
    pub carrier_name: String,
    pub satisfaction_ratio: Option<f64>,
}

/// A stored answer to a rating item. Values are on a 0..=100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingAnswer {
    pub feedback_id: FeedbackId,
    pub rating_id: RatingId,
    pub value: f64,
}

/// Known feedback meta keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaName {
    CountryCode,
    City,
    Email,
    EngagementEmail,
    EngagementType,
}

impl MetaName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetaName::CountryCode => "country_code",
            MetaName::City => "city",
            MetaName::Email => "email",
            MetaName::EngagementEmail => "engagement_email",
            MetaName::EngagementType => "engagement_type",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackMeta {
    pub feedback_id: FeedbackId,
    pub name: MetaName,
    pub value: String,
}

/// Meta row joined with the creation date of its feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaEntry {
    pub feedback_id: FeedbackId,
    pub name: MetaName,
    pub value: String,
    pub feedback_created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardStatus {
    Pending,
    Sent,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardTransaction {
    pub feedback_id: FeedbackId,
    pub reward_id: RewardId,
    pub status: RewardStatus,
}

/// Reward transaction joined with the creation date of its feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardEntry {
    pub transaction: RewardTransaction,
    pub feedback_created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushStatus {
    Scheduled,
    Sent,
    Clicked,
}

/// A push notification sent for a carrier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEvent {
    pub id: PushId,
    pub carrier_id: CarrierId,
    pub status: PushStatus,
    pub created_at: NaiveDateTime,
}

/// Carrier name attached to one of its feedback submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierActivity {
    pub carrier_id: CarrierId,
    pub carrier_name: String,
    pub feedback_created_at: NaiveDateTime,
}

/// Answer value grouped under a geographic location (region or country code).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionAnswer {
    pub feedback_id: FeedbackId,
    pub location: String,
    pub value: String,
}

impl RegionAnswer {
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.trim().parse::<f64>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_type_serde_camel_case() {
        let json = serde_json::to_string(&QuestionType::LargeSlider).unwrap();
        assert_eq!(json, "\"largeSlider\"");
        let parsed: QuestionType = serde_json::from_str("\"matrix\"").unwrap();
        assert_eq!(parsed, QuestionType::Unknown);
    }

    #[test]
    fn test_question_type_from_str() {
        assert_eq!("nps".parse::<QuestionType>().unwrap(), QuestionType::Nps);
        assert_eq!(
            "largeSlider".parse::<QuestionType>().unwrap(),
            QuestionType::LargeSlider
        );
        assert_eq!("?".parse::<QuestionType>().unwrap(), QuestionType::Unknown);
        assert!(QuestionType::Textarea.is_free_text());
        assert!(!QuestionType::Nps.is_free_text());
    }

    #[test]
    fn test_meta_name_as_str() {
        assert_eq!(MetaName::CountryCode.as_str(), "country_code");
        assert_eq!(MetaName::EngagementEmail.as_str(), "engagement_email");
    }
}
