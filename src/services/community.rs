//! Community board service
//!
//! Posts, threaded comments, likes and reports. Likes, comments and replies
//! by someone other than the content's author produce a notification.

use crate::db;
use crate::db::repositories::{CommentRepository, NotificationRepository, PostRepository};
use crate::models::{
    build_comment_tree, Comment, CommentWithMeta, CommunityCategory, CreateCommentInput,
    CreatePostInput, LikeStatus, ListParams, NewNotification, NotificationKind, PagedResult,
    Post, PostFilter, PostWithMeta, ReportInput, ReportOutcome, ReportReason, UpdatePostInput, User,
};
use std::sync::Arc;

pub const TITLE_MAX_CHARS: usize = 200;
pub const DEFAULT_REPORT_HIDE_THRESHOLD: i64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum CommunityServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

type ServiceResult<T> = Result<T, CommunityServiceError>;

pub struct CommunityService {
    post_repo: Arc<dyn PostRepository>,
    comment_repo: Arc<dyn CommentRepository>,
    notification_repo: Arc<dyn NotificationRepository>,
    report_hide_threshold: i64,
}

impl CommunityService {
    pub fn new(
        post_repo: Arc<dyn PostRepository>,
        comment_repo: Arc<dyn CommentRepository>,
        notification_repo: Arc<dyn NotificationRepository>,
    ) -> Self {
        Self {
            post_repo,
            comment_repo,
            notification_repo,
            report_hide_threshold: DEFAULT_REPORT_HIDE_THRESHOLD,
        }
    }

    pub fn with_report_hide_threshold(mut self, threshold: i64) -> Self {
        self.report_hide_threshold = threshold.max(1);
        self
    }

    // ------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------

    pub async fn categories(&self) -> ServiceResult<Vec<CommunityCategory>> {
        Ok(self.post_repo.categories().await?)
    }

    pub async fn list_posts(&self, filter: &PostFilter, params: &ListParams) -> ServiceResult<PagedResult<PostWithMeta>> {
        Ok(self.post_repo.list(filter, params).await?)
    }

    pub async fn get_post(&self, id: i64) -> ServiceResult<PostWithMeta> {
        self.post_repo
            .get_with_meta(id)
            .await?
            .ok_or(CommunityServiceError::NotFound("Post"))
    }

    pub async fn create_post(&self, user: &User, mut input: CreatePostInput) -> ServiceResult<PostWithMeta> {
        input.title = validate_title(&input.title)?;
        input.content = validate_content(&input.content, "content")?;
        input.image = clean_optional(input.image);
        if let Some(category_id) = input.category_id {
            self.ensure_category(category_id).await?;
        }

        let post = self.post_repo.create(user.id, &input).await?;
        tracing::info!("User {} created post {}", user.id, post.id);
        Ok(post)
    }

    /// Update a post; only its author may
    pub async fn update_post(&self, user: &User, id: i64, mut input: UpdatePostInput) -> ServiceResult<PostWithMeta> {
        let post = self.active_post(id).await?;
        if post.user_id != user.id {
            return Err(CommunityServiceError::Forbidden(
                "Only the author can edit this post".to_string(),
            ));
        }

        if let Some(title) = input.title.as_deref() {
            input.title = Some(validate_title(title)?);
        }
        if let Some(content) = input.content.as_deref() {
            input.content = Some(validate_content(content, "content")?);
        }
        if let Some(category_id) = input.category_id {
            self.ensure_category(category_id).await?;
        }

        self.post_repo
            .update(id, &input)
            .await?
            .ok_or(CommunityServiceError::NotFound("Post"))
    }

    /// Delete a post; its author or an admin may
    pub async fn delete_post(&self, user: &User, id: i64) -> ServiceResult<()> {
        let post = self
            .post_repo
            .get_by_id(id)
            .await?
            .ok_or(CommunityServiceError::NotFound("Post"))?;
        if !user.can_manage(post.user_id) {
            return Err(CommunityServiceError::Forbidden(
                "Not allowed to delete this post".to_string(),
            ));
        }

        self.post_repo.delete(id).await?;
        tracing::info!("User {} deleted post {}", user.id, id);
        Ok(())
    }

    async fn active_post(&self, id: i64) -> ServiceResult<Post> {
        match self.post_repo.get_by_id(id).await? {
            Some(post) if post.is_active => Ok(post),
            _ => Err(CommunityServiceError::NotFound("Post")),
        }
    }

    async fn ensure_category(&self, id: i64) -> ServiceResult<()> {
        match self.post_repo.category_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(CommunityServiceError::ValidationError(format!(
                "category_id: category {} does not exist",
                id
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    /// Root comments of a post, oldest first, replies nested
    pub async fn comments(&self, post_id: i64) -> ServiceResult<Vec<CommentWithMeta>> {
        self.active_post(post_id).await?;
        let flat = self.comment_repo.list_by_post(post_id).await?;
        Ok(build_comment_tree(flat))
    }

    pub async fn create_comment(&self, user: &User, post_id: i64, input: CreateCommentInput) -> ServiceResult<Comment> {
        let post = self.active_post(post_id).await?;
        let text = validate_content(&input.comment, "comment")?;

        let parent = match input.parent_id {
            Some(parent_id) => {
                let parent = self.comment_repo.get_by_id(parent_id).await?.ok_or_else(|| {
                    CommunityServiceError::ValidationError(format!(
                        "parent_id: comment {} does not exist",
                        parent_id
                    ))
                })?;
                if parent.post_id != post_id {
                    return Err(CommunityServiceError::ValidationError(
                        "parent_id: comment belongs to another post".to_string(),
                    ));
                }
                Some(parent)
            }
            None => None,
        };

        // Replies are one level deep
        let attach_to = parent.as_ref().map(|p| p.parent_id.unwrap_or(p.id));
        let comment = self
            .comment_repo
            .create(post_id, user.id, attach_to, &text)
            .await?;

        match parent {
            Some(parent) => {
                self.notify(user, parent.user_id, NotificationKind::CommentReply, Some(post_id), Some(comment.id))
                    .await?
            }
            None => {
                self.notify(user, post.user_id, NotificationKind::PostComment, Some(post_id), Some(comment.id))
                    .await?
            }
        }

        Ok(comment)
    }

    /// Soft delete a comment; its author or an admin may
    pub async fn delete_comment(&self, user: &User, id: i64) -> ServiceResult<()> {
        let comment = self.active_comment(id).await?;
        if !user.can_manage(comment.user_id) {
            return Err(CommunityServiceError::Forbidden(
                "Not allowed to delete this comment".to_string(),
            ));
        }
        self.comment_repo.soft_delete(id).await?;
        Ok(())
    }

    async fn active_comment(&self, id: i64) -> ServiceResult<Comment> {
        match self.comment_repo.get_by_id(id).await? {
            Some(comment) if comment.is_active => Ok(comment),
            _ => Err(CommunityServiceError::NotFound("Comment")),
        }
    }

    // ------------------------------------------------------------------
    // Likes and reports
    // ------------------------------------------------------------------

    pub async fn like_post(&self, user: &User, post_id: i64) -> ServiceResult<LikeStatus> {
        let post = self.active_post(post_id).await?;
        let status = self.post_repo.toggle_like(post_id, user.id).await?;
        if status.liked {
            self.notify(user, post.user_id, NotificationKind::PostLike, Some(post_id), None)
                .await?;
        }
        Ok(status)
    }

    pub async fn like_comment(&self, user: &User, comment_id: i64) -> ServiceResult<LikeStatus> {
        let comment = self.active_comment(comment_id).await?;
        let status = self.comment_repo.toggle_like(comment_id, user.id).await?;
        if status.liked {
            self.notify(
                user,
                comment.user_id,
                NotificationKind::CommentLike,
                Some(comment.post_id),
                Some(comment_id),
            )
            .await?;
        }
        Ok(status)
    }

    pub async fn report_post(&self, user: &User, post_id: i64, input: ReportInput) -> ServiceResult<ReportOutcome> {
        let post = self.active_post(post_id).await?;
        if post.user_id == user.id {
            return Err(CommunityServiceError::ValidationError(
                "You cannot report your own post".to_string(),
            ));
        }
        let detail = validate_report(&input)?;
        if self.post_repo.has_reported(post_id, user.id).await? {
            return Err(CommunityServiceError::Conflict(
                "You have already reported this post".to_string(),
            ));
        }

        let outcome = duplicate_report_conflict(
            self.post_repo
                .report(post_id, user.id, input.reason, detail.as_deref(), self.report_hide_threshold)
                .await,
            "post",
        )?;
        if outcome.hidden {
            tracing::warn!("Post {} hidden after {} reports", post_id, outcome.report_count);
        }
        Ok(outcome)
    }

    pub async fn report_comment(&self, user: &User, comment_id: i64, input: ReportInput) -> ServiceResult<ReportOutcome> {
        let comment = self.active_comment(comment_id).await?;
        if comment.user_id == user.id {
            return Err(CommunityServiceError::ValidationError(
                "You cannot report your own comment".to_string(),
            ));
        }
        let detail = validate_report(&input)?;
        if self.comment_repo.has_reported(comment_id, user.id).await? {
            return Err(CommunityServiceError::Conflict(
                "You have already reported this comment".to_string(),
            ));
        }

        let outcome = duplicate_report_conflict(
            self.comment_repo
                .report(comment_id, user.id, input.reason, detail.as_deref(), self.report_hide_threshold)
                .await,
            "comment",
        )?;
        if outcome.hidden {
            tracing::warn!("Comment {} hidden after {} reports", comment_id, outcome.report_count);
        }
        Ok(outcome)
    }

    async fn notify(
        &self,
        actor: &User,
        recipient_id: i64,
        kind: NotificationKind,
        post_id: Option<i64>,
        comment_id: Option<i64>,
    ) -> ServiceResult<()> {
        if actor.id == recipient_id {
            return Ok(());
        }
        let notification = NewNotification {
            recipient_id,
            actor_id: actor.id,
            kind,
            post_id,
            comment_id,
            message: kind.message(&actor.username),
        };
        self.notification_repo.create(&notification).await?;
        Ok(())
    }
}

fn validate_title(title: &str) -> ServiceResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CommunityServiceError::ValidationError("title: required".to_string()));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(CommunityServiceError::ValidationError(format!(
            "title: at most {} characters",
            TITLE_MAX_CHARS
        )));
    }
    Ok(title.to_string())
}

fn validate_content(content: &str, field: &str) -> ServiceResult<String> {
    if content.trim().is_empty() {
        return Err(CommunityServiceError::ValidationError(format!("{}: required", field)));
    }
    Ok(content.to_string())
}

/// `other` reports must say why; returns the trimmed detail
fn validate_report(input: &ReportInput) -> ServiceResult<Option<String>> {
    let detail = clean_optional(input.detail.clone());
    if input.reason == ReportReason::Other && detail.is_none() {
        return Err(CommunityServiceError::ValidationError(
            "detail: required when reason is other".to_string(),
        ));
    }
    Ok(detail)
}

/// A concurrent duplicate report trips the unique index after the pre-check passed
fn duplicate_report_conflict(
    result: anyhow::Result<ReportOutcome>,
    target: &str,
) -> ServiceResult<ReportOutcome> {
    result.map_err(|e| {
        if db::is_unique_violation(&e) {
            CommunityServiceError::Conflict(format!("You have already reported this {}", target))
        } else {
            CommunityServiceError::InternalError(e)
        }
    })
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_user, setup_pool};
    use crate::db::repositories::{
        SqlxCommentRepository, SqlxNotificationRepository, SqlxPostRepository, SqlxUserRepository,
        UserRepository,
    };
    use crate::models::{UserRole, DELETED_COMMENT_TEXT};
    use sqlx::SqlitePool;

    struct Fixture {
        service: CommunityService,
        notifications: Arc<dyn NotificationRepository>,
        author: User,
        reader: User,
        pool: SqlitePool,
    }

    async fn fixture() -> Fixture {
        let pool = setup_pool().await;
        let users = SqlxUserRepository::new(pool.clone());
        let author_id = insert_user(&pool, "author").await;
        let reader_id = insert_user(&pool, "reader").await;

        let notifications = SqlxNotificationRepository::boxed(pool.clone());
        let service = CommunityService::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxCommentRepository::boxed(pool.clone()),
            notifications.clone(),
        )
        .with_report_hide_threshold(2);

        Fixture {
            service,
            notifications,
            author: users.get_by_id(author_id).await.unwrap().unwrap(),
            reader: users.get_by_id(reader_id).await.unwrap().unwrap(),
            pool,
        }
    }

    fn post_input(title: &str) -> CreatePostInput {
        CreatePostInput {
            title: title.to_string(),
            content: "자취방 구하는 팁 공유합니다".to_string(),
            category_id: Some(1),
            image: None,
        }
    }

    fn comment(text: &str, parent_id: Option<i64>) -> CreateCommentInput {
        CreateCommentInput {
            comment: text.to_string(),
            parent_id,
        }
    }

    fn report(reason: ReportReason, detail: Option<&str>) -> ReportInput {
        ReportInput {
            reason,
            detail: detail.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_post_validation() {
        let f = fixture().await;

        let long = "가".repeat(TITLE_MAX_CHARS + 1);
        assert!(matches!(
            f.service.create_post(&f.author, post_input(&long)).await,
            Err(CommunityServiceError::ValidationError(_))
        ));

        let mut bad_category = post_input("ok");
        bad_category.category_id = Some(999);
        assert!(matches!(
            f.service.create_post(&f.author, bad_category).await,
            Err(CommunityServiceError::ValidationError(_))
        ));

        let post = f.service.create_post(&f.author, post_input("  첫 글  ")).await.unwrap();
        assert_eq!(post.title, "첫 글");
    }

    #[tokio::test]
    async fn test_update_is_author_only_and_delete_allows_admin() {
        let mut f = fixture().await;
        let post = f.service.create_post(&f.author, post_input("mine")).await.unwrap();

        let edit = UpdatePostInput {
            title: Some("edited".to_string()),
            ..UpdatePostInput::default()
        };
        assert!(matches!(
            f.service.update_post(&f.reader, post.id, edit.clone()).await,
            Err(CommunityServiceError::Forbidden(_))
        ));
        let updated = f.service.update_post(&f.author, post.id, edit).await.unwrap();
        assert_eq!(updated.title, "edited");

        assert!(matches!(
            f.service.delete_post(&f.reader, post.id).await,
            Err(CommunityServiceError::Forbidden(_))
        ));
        f.reader.role = UserRole::Admin;
        f.service.delete_post(&f.reader, post.id).await.unwrap();
        assert!(matches!(
            f.service.get_post(post.id).await,
            Err(CommunityServiceError::NotFound("Post"))
        ));
    }

    #[tokio::test]
    async fn test_reply_to_reply_attaches_to_root() {
        let f = fixture().await;
        let post = f.service.create_post(&f.author, post_input("thread")).await.unwrap();

        let root = f.service.create_comment(&f.reader, post.id, comment("root", None)).await.unwrap();
        let reply = f.service.create_comment(&f.author, post.id, comment("reply", Some(root.id))).await.unwrap();
        let nested = f
            .service
            .create_comment(&f.reader, post.id, comment("nested", Some(reply.id)))
            .await
            .unwrap();

        assert_eq!(reply.parent_id, Some(root.id));
        assert_eq!(nested.parent_id, Some(root.id));

        let tree = f.service.comments(post.id).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].replies.len(), 2);
    }

    #[tokio::test]
    async fn test_parent_on_other_post_rejected() {
        let f = fixture().await;
        let first = f.service.create_post(&f.author, post_input("first")).await.unwrap();
        let second = f.service.create_post(&f.author, post_input("second")).await.unwrap();
        let root = f.service.create_comment(&f.reader, first.id, comment("root", None)).await.unwrap();

        assert!(matches!(
            f.service.create_comment(&f.reader, second.id, comment("x", Some(root.id))).await,
            Err(CommunityServiceError::ValidationError(_))
        ));
        assert!(matches!(
            f.service.create_comment(&f.reader, second.id, comment("x", Some(999))).await,
            Err(CommunityServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_deleted_root_becomes_placeholder() {
        let f = fixture().await;
        let post = f.service.create_post(&f.author, post_input("thread")).await.unwrap();
        let root = f.service.create_comment(&f.reader, post.id, comment("root", None)).await.unwrap();
        f.service.create_comment(&f.author, post.id, comment("reply", Some(root.id))).await.unwrap();

        assert!(matches!(
            f.service.delete_comment(&f.author, root.id).await,
            Err(CommunityServiceError::Forbidden(_))
        ));
        f.service.delete_comment(&f.reader, root.id).await.unwrap();

        let tree = f.service.comments(post.id).await.unwrap();
        assert_eq!(tree[0].comment, DELETED_COMMENT_TEXT);
        assert!(tree[0].is_deleted);
    }

    #[tokio::test]
    async fn test_notifications_skip_self_actions() {
        let f = fixture().await;
        let post = f.service.create_post(&f.author, post_input("notify")).await.unwrap();

        // Self-actions
        f.service.like_post(&f.author, post.id).await.unwrap();
        f.service.create_comment(&f.author, post.id, comment("own", None)).await.unwrap();
        assert!(f.notifications.list_unread(f.author.id).await.unwrap().is_empty());

        let liked = f.service.like_post(&f.reader, post.id).await.unwrap();
        assert_eq!(liked, LikeStatus { liked: true, like_count: 2 });
        let root = f.service.create_comment(&f.reader, post.id, comment("hi", None)).await.unwrap();

        // Unliking does not notify
        let unliked = f.service.like_post(&f.reader, post.id).await.unwrap();
        assert!(!unliked.liked);

        let unread = f.notifications.list_unread(f.author.id).await.unwrap();
        let kinds: Vec<NotificationKind> = unread.iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NotificationKind::PostComment, NotificationKind::PostLike]);

        f.service.create_comment(&f.author, post.id, comment("reply", Some(root.id))).await.unwrap();
        f.service.like_comment(&f.author, root.id).await.unwrap();
        let reader_kinds: Vec<NotificationKind> = f
            .notifications
            .list_unread(f.reader.id)
            .await
            .unwrap()
            .iter()
            .map(|n| n.kind)
            .collect();
        assert_eq!(reader_kinds, vec![NotificationKind::CommentLike, NotificationKind::CommentReply]);
    }

    #[tokio::test]
    async fn test_report_rules_and_hiding() {
        let f = fixture().await;
        let post = f.service.create_post(&f.author, post_input("reported")).await.unwrap();

        assert!(matches!(
            f.service.report_post(&f.author, post.id, report(ReportReason::Spam, None)).await,
            Err(CommunityServiceError::ValidationError(_))
        ));
        assert!(matches!(
            f.service.report_post(&f.reader, post.id, report(ReportReason::Other, Some("  "))).await,
            Err(CommunityServiceError::ValidationError(_))
        ));

        let first = f
            .service
            .report_post(&f.reader, post.id, report(ReportReason::Spam, None))
            .await
            .unwrap();
        assert_eq!(first, ReportOutcome { report_count: 1, hidden: false });
        assert!(matches!(
            f.service.report_post(&f.reader, post.id, report(ReportReason::Abuse, None)).await,
            Err(CommunityServiceError::Conflict(_))
        ));

        let third_id = insert_user(&f.pool, "third").await;
        let third = SqlxUserRepository::new(f.pool.clone())
            .get_by_id(third_id)
            .await
            .unwrap()
            .unwrap();
        let second = f
            .service
            .report_post(&third, post.id, report(ReportReason::Other, Some("광고글")))
            .await
            .unwrap();
        assert!(second.hidden);
        assert!(matches!(
            f.service.get_post(post.id).await,
            Err(CommunityServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_racing_duplicate_report_is_conflict() {
        let f = fixture().await;
        let post = f.service.create_post(&f.author, post_input("경쟁 신고")).await.unwrap();
        let posts = SqlxPostRepository::new(f.pool.clone());

        let first = posts.report(post.id, f.reader.id, ReportReason::Spam, None, 5).await;
        assert_eq!(
            duplicate_report_conflict(first, "post").unwrap(),
            ReportOutcome { report_count: 1, hidden: false }
        );

        let second = posts.report(post.id, f.reader.id, ReportReason::Abuse, None, 5).await;
        match duplicate_report_conflict(second, "post") {
            Err(CommunityServiceError::Conflict(message)) => {
                assert_eq!(message, "You have already reported this post")
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let other = duplicate_report_conflict(Err(anyhow::anyhow!("disk full")), "post");
        assert!(matches!(other, Err(CommunityServiceError::InternalError(_))));
    }
}
