//! Review service

use crate::db::repositories::{ReviewRepository, RoomRepository};
use crate::models::{CreateReviewInput, RatingSummary, Review, User};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not allowed to delete this review")]
    Forbidden,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Reviews of a room together with their aggregate
#[derive(Debug, Clone, Serialize)]
pub struct RoomReviews {
    pub reviews: Vec<Review>,
    pub summary: RatingSummary,
}

pub struct ReviewService {
    review_repo: Arc<dyn ReviewRepository>,
    room_repo: Arc<dyn RoomRepository>,
}

impl ReviewService {
    pub fn new(review_repo: Arc<dyn ReviewRepository>, room_repo: Arc<dyn RoomRepository>) -> Self {
        Self {
            review_repo,
            room_repo,
        }
    }

    async fn ensure_room(&self, room_id: i64) -> Result<(), ReviewServiceError> {
        match self.room_repo.get_by_id(room_id).await? {
            Some(_) => Ok(()),
            None => Err(ReviewServiceError::NotFound("Room")),
        }
    }

    pub async fn list(&self, room_id: i64) -> Result<RoomReviews, ReviewServiceError> {
        self.ensure_room(room_id).await?;
        let reviews = self.review_repo.list_by_room(room_id).await?;
        let summary = self.review_repo.averages(room_id).await?.into();
        Ok(RoomReviews { reviews, summary })
    }

    pub async fn summary(&self, room_id: i64) -> Result<RatingSummary, ReviewServiceError> {
        self.ensure_room(room_id).await?;
        Ok(self.review_repo.averages(room_id).await?.into())
    }

    pub async fn create(
        &self,
        user: &User,
        room_id: i64,
        mut input: CreateReviewInput,
    ) -> Result<Review, ReviewServiceError> {
        validate_review(&input)?;
        self.ensure_room(room_id).await?;

        input.content = input
            .content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let review = self.review_repo.create(user.id, room_id, &input).await?;
        tracing::info!("User {} reviewed room {}", user.id, room_id);
        Ok(review)
    }

    /// Delete a review; only its author or an admin may
    pub async fn delete(&self, user: &User, id: i64) -> Result<(), ReviewServiceError> {
        let review = self
            .review_repo
            .get_by_id(id)
            .await?
            .ok_or(ReviewServiceError::NotFound("Review"))?;

        if !user.can_manage(review.user_id) {
            return Err(ReviewServiceError::Forbidden);
        }

        self.review_repo.delete(id).await?;
        Ok(())
    }
}

/// Ratings must be 1-5 and a review needs a rating or some text
pub fn validate_review(input: &CreateReviewInput) -> Result<(), ReviewServiceError> {
    for (name, rating) in input.ratings() {
        if let Some(value) = rating {
            if !(1..=5).contains(&value) {
                return Err(ReviewServiceError::ValidationError(format!(
                    "{} must be between 1 and 5",
                    name
                )));
            }
        }
    }

    let has_rating = input.ratings().iter().any(|(_, r)| r.is_some());
    let has_content = input
        .content
        .as_deref()
        .is_some_and(|c| !c.trim().is_empty());

    if !has_rating && !has_content {
        return Err(ReviewServiceError::ValidationError(
            "A review needs at least one rating or some content".to_string(),
        ));
    }
    Ok(())
}
