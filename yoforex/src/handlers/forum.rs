use crate::app::AppState;
use crate::errors::{ApiResult, AppError, AppResult};
use crate::handlers::page_offset;
use crate::models::forum::nest_comments;
use crate::models::{ForumCategory, ForumComment, ForumPost};
use crate::security::AuthUser;
use crate::services::forum::{self, CategoryPatch, PostListParams, PostPatch, PostSort};
use crate::services::users;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use governor::DefaultKeyedRateLimiter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

const DEFAULT_COLOR: &str = "#3498db";
const CATEGORY_NAME_MAX: usize = 100;
const POST_TITLE_MAX: usize = 200;
const DEFAULT_PER_PAGE: i64 = 20;
const MAX_PER_PAGE: i64 = 100;
const LATEST_COMMENTS: i64 = 3;
const ROOT_COMMENTS: usize = 10;
const RECENT_POSTS: i64 = 5;

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct CategoriesQuery {
    #[serde(default)]
    #[ts(optional)]
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[ts(optional)]
    pub description: Option<String>,
    #[ts(optional)]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct UpdateCategoryRequest {
    #[ts(optional)]
    pub name: Option<String>,
    #[ts(optional)]
    pub description: Option<String>,
    #[ts(optional)]
    pub color: Option<String>,
    #[ts(optional)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct PostsQuery {
    #[ts(optional, type = "number")]
    pub category_id: Option<i64>,
    #[ts(optional)]
    pub search: Option<String>,
    #[ts(optional)]
    pub sort_by: Option<String>,
    #[ts(optional)]
    pub sort_order: Option<String>,
    #[ts(optional, type = "number")]
    pub page: Option<i64>,
    #[ts(optional, type = "number")]
    pub per_page: Option<i64>,
    #[ts(optional)]
    pub pinned_first: Option<bool>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    #[ts(type = "number")]
    pub category_id: i64,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[ts(optional)]
    pub title: Option<String>,
    #[ts(optional)]
    pub content: Option<String>,
    #[ts(optional, type = "number")]
    pub category_id: Option<i64>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub content: String,
    #[ts(optional, type = "number")]
    pub parent_id: Option<i64>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct UpdateCommentRequest {
    pub content: String,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct PostList {
    pub posts: Vec<ForumPost>,
    #[ts(type = "number")]
    pub total: i64,
    #[ts(type = "number")]
    pub page: i64,
    #[ts(type = "number")]
    pub per_page: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct LikeResponse {
    pub liked: bool,
    #[ts(type = "number")]
    pub like_count: i64,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ForumStats {
    #[ts(type = "number")]
    pub total_posts: i64,
    #[ts(type = "number")]
    pub total_comments: i64,
    #[ts(type = "number")]
    pub total_users: i64,
    pub recent_posts: Vec<ForumPost>,
}

// Validation

fn validate_length(value: &str, field: &str, max: Option<usize>) -> AppResult<()> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(AppError::BadRequest(format!("{} must not be empty.", field)));
    }
    if let Some(max) = max {
        if len > max {
            return Err(AppError::BadRequest(format!(
                "{} must be at most {} characters.",
                field, max
            )));
        }
    }
    Ok(())
}

fn validate_color(color: &str) -> AppResult<()> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(AppError::BadRequest(format!(
            "Invalid color '{}', expected #RRGGBB.",
            color
        )));
    }
    Ok(())
}

fn list_params(query: PostsQuery) -> AppResult<PostListParams> {
    let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE);
    if !(1..=MAX_PER_PAGE).contains(&per_page) {
        return Err(AppError::BadRequest(format!(
            "per_page must be between 1 and {}.",
            MAX_PER_PAGE
        )));
    }

    let page = query.page.unwrap_or(1);
    let offset = page_offset(page, per_page)?;

    Ok(PostListParams {
        category_id: query.category_id,
        search: query.search,
        sort: PostSort::parse(query.sort_by.as_deref().unwrap_or("created_at")),
        descending: query.sort_order.as_deref().unwrap_or("desc") == "desc",
        page,
        per_page,
        offset,
        pinned_first: query.pinned_first.unwrap_or(true),
    })
}

fn ensure_author(author_id: i64, user_id: i64, action: &str) -> AppResult<()> {
    if author_id != user_id {
        return Err(AppError::Forbidden(format!(
            "You can only {} your own content.",
            action
        )));
    }
    Ok(())
}

fn check_post_quota(limiter: &DefaultKeyedRateLimiter<i64>, user_id: i64) -> AppResult<()> {
    if limiter.check_key(&user_id).is_err() {
        return Err(AppError::TooManyRequests(
            "Too many posts. Please wait before posting again.".to_string(),
        ));
    }
    Ok(())
}

fn post_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Post with id '{}' not found", id))
}

fn comment_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Comment with id '{}' not found", id))
}

async fn live_post(state: &AppState, id: i64) -> AppResult<ForumPost> {
    forum::get_post(&state.db_pool, id)
        .await?
        .ok_or_else(|| post_not_found(id))
}

async fn live_comment(state: &AppState, id: i64) -> AppResult<ForumComment> {
    forum::find_comment(&state.db_pool, id)
        .await?
        .filter(|c| !c.is_deleted)
        .ok_or_else(|| comment_not_found(id))
}

async fn ensure_active_category(state: &AppState, id: i64) -> AppResult<()> {
    forum::get_category(&state.db_pool, id)
        .await?
        .filter(|c| c.is_active)
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound("Category not found or inactive".to_string()))
}

// Categories

pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoriesQuery>,
) -> ApiResult<Vec<ForumCategory>> {
    let categories =
        forum::list_categories(&state.db_pool, query.include_inactive.unwrap_or(false)).await?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateCategoryRequest>,
) -> AppResult<(StatusCode, Json<ForumCategory>)> {
    let name = request.name.trim();
    validate_length(name, "Category name", Some(CATEGORY_NAME_MAX))?;
    let color = request.color.as_deref().unwrap_or(DEFAULT_COLOR);
    validate_color(color)?;

    if forum::category_name_taken(&state.db_pool, name, None).await? {
        return Err(AppError::BadRequest(
            "Category with this name already exists".to_string(),
        ));
    }

    let category =
        forum::create_category(&state.db_pool, name, request.description.as_deref(), color)
            .await?;
    tracing::info!(category_id = category.id, user_id = user.id, "Forum category created");

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateCategoryRequest>,
) -> ApiResult<ForumCategory> {
    let name = request.name.as_deref().map(str::trim);
    if let Some(name) = name {
        validate_length(name, "Category name", Some(CATEGORY_NAME_MAX))?;
        if forum::category_name_taken(&state.db_pool, name, Some(id)).await? {
            return Err(AppError::BadRequest(
                "Category with this name already exists".to_string(),
            ));
        }
    }
    if let Some(color) = request.color.as_deref() {
        validate_color(color)?;
    }

    let patch = CategoryPatch {
        name: name.map(str::to_string),
        description: request.description,
        color: request.color,
        is_active: request.is_active,
    };

    let category = forum::update_category(&state.db_pool, id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category with id '{}' not found", id)))?;
    Ok(Json(category))
}

// Posts

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostsQuery>,
) -> ApiResult<PostList> {
    let params = list_params(query)?;
    let (mut posts, total) = forum::list_posts(&state.db_pool, &params).await?;

    let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
    let mut latest: HashMap<i64, Vec<ForumComment>> = HashMap::new();
    for comment in forum::latest_comments(&state.db_pool, &ids, LATEST_COMMENTS).await? {
        latest
            .entry(comment.post_id)
            .or_default()
            .push(comment.preview());
    }
    for post in &mut posts {
        post.latest_comments = latest.remove(&post.id).unwrap_or_default();
    }

    Ok(Json(PostList {
        posts,
        total,
        page: params.page,
        per_page: params.per_page,
        has_next: params.offset + params.per_page < total,
        has_prev: params.page > 1,
    }))
}

pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreatePostRequest>,
) -> AppResult<(StatusCode, Json<ForumPost>)> {
    check_post_quota(&state.post_limiter, user.id)?;

    validate_length(&request.title, "Title", Some(POST_TITLE_MAX))?;
    validate_length(&request.content, "Content", None)?;
    ensure_active_category(&state, request.category_id).await?;

    let post = forum::create_post(
        &state.db_pool,
        user.id,
        request.title.trim(),
        &request.content,
        request.category_id,
    )
    .await?;
    tracing::info!(post_id = post.id, user_id = user.id, "Forum post created");

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<ForumPost> {
    let mut post = live_post(&state, id).await?;

    forum::increment_views(&state.db_pool, id).await?;
    post.view_count += 1;

    let comments = forum::comments_for_post(&state.db_pool, id).await?;
    post.latest_comments = nest_comments(comments)
        .into_iter()
        .take(ROOT_COMMENTS)
        .collect();

    Ok(Json(post))
}

pub async fn update_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdatePostRequest>,
) -> ApiResult<ForumPost> {
    let post = live_post(&state, id).await?;
    ensure_author(post.author_id, user.id, "edit")?;
    if post.is_locked {
        return Err(AppError::BadRequest("Cannot edit a locked post.".to_string()));
    }

    if let Some(title) = &request.title {
        validate_length(title, "Title", Some(POST_TITLE_MAX))?;
    }
    if let Some(content) = &request.content {
        validate_length(content, "Content", None)?;
    }
    if let Some(category_id) = request.category_id {
        ensure_active_category(&state, category_id).await?;
    }

    let patch = PostPatch {
        title: request.title.map(|t| t.trim().to_string()),
        content: request.content,
        category_id: request.category_id,
    };
    forum::update_post(&state.db_pool, id, &patch).await?;

    Ok(Json(live_post(&state, id).await?))
}

pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let post = live_post(&state, id).await?;
    ensure_author(post.author_id, user.id, "delete")?;

    forum::soft_delete_post(&state.db_pool, id).await?;
    tracing::info!(post_id = id, user_id = user.id, "Forum post deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<LikeResponse> {
    live_post(&state, id).await?;
    let (liked, like_count) = forum::toggle_post_like(&state.db_pool, user.id, id).await?;
    Ok(Json(LikeResponse { liked, like_count }))
}

// Comments

pub async fn create_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(post_id): Path<i64>,
    Json(request): Json<CreateCommentRequest>,
) -> AppResult<(StatusCode, Json<ForumComment>)> {
    validate_length(&request.content, "Content", None)?;

    let post = live_post(&state, post_id).await?;
    if post.is_locked {
        return Err(AppError::BadRequest(
            "Cannot comment on a locked post.".to_string(),
        ));
    }

    if let Some(parent_id) = request.parent_id {
        let parent = live_comment(&state, parent_id).await?;
        if parent.post_id != post_id {
            return Err(comment_not_found(parent_id));
        }
    }

    let comment = forum::create_comment(
        &state.db_pool,
        post_id,
        user.id,
        &request.content,
        request.parent_id,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn update_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateCommentRequest>,
) -> ApiResult<ForumComment> {
    validate_length(&request.content, "Content", None)?;

    let comment = live_comment(&state, id).await?;
    ensure_author(comment.author_id, user.id, "edit")?;

    let locked = forum::find_post(&state.db_pool, comment.post_id)
        .await?
        .is_some_and(|post| post.is_locked);
    if locked {
        return Err(AppError::BadRequest(
            "Cannot edit comments on a locked post.".to_string(),
        ));
    }

    let updated = forum::update_comment(&state.db_pool, id, &request.content)
        .await?
        .ok_or_else(|| comment_not_found(id))?;
    Ok(Json(updated))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let comment = live_comment(&state, id).await?;
    ensure_author(comment.author_id, user.id, "delete")?;

    forum::soft_delete_comment(&state.db_pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<LikeResponse> {
    live_comment(&state, id).await?;
    let (liked, like_count) = forum::toggle_comment_like(&state.db_pool, user.id, id).await?;
    Ok(Json(LikeResponse { liked, like_count }))
}

pub async fn get_stats(State(state): State<AppState>) -> ApiResult<ForumStats> {
    Ok(Json(ForumStats {
        total_posts: forum::count_posts(&state.db_pool).await?,
        total_comments: forum::count_comments(&state.db_pool).await?,
        total_users: users::count(&state.db_pool).await?,
        recent_posts: forum::recent_posts(&state.db_pool, RECENT_POSTS).await?,
    }))
}
