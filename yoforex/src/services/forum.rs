use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::errors::AppResult;
use crate::models::{ForumCategory, ForumComment, ForumPost};

const POST_SELECT: &str = "SELECT p.id, p.title, p.content, p.category_id, p.author_id, \
        p.is_pinned, p.is_locked, p.is_deleted, p.view_count, p.created_at, p.updated_at, \
        (SELECT COUNT(*) FROM forum_post_likes l WHERE l.post_id = p.id) AS like_count, \
        (SELECT COUNT(*) FROM forum_comments c WHERE c.post_id = p.id AND NOT c.is_deleted) AS comment_count, \
        COALESCE(u.name, 'Unknown') AS author_username, \
        COALESCE(cat.name, 'Unknown') AS category_name \
   FROM forum_posts p \
   LEFT JOIN users u ON u.id = p.author_id \
   LEFT JOIN forum_categories cat ON cat.id = p.category_id";

const COMMENT_COLUMNS: &str = "c.id, c.content, c.author_id, c.post_id, c.parent_id, \
        c.is_deleted, c.created_at, c.updated_at, \
        (SELECT COUNT(*) FROM forum_comment_likes cl WHERE cl.comment_id = c.id) AS like_count, \
        COALESCE(u.name, 'Unknown') AS author_username";

const CATEGORY_SELECT: &str = "SELECT cat.id, cat.name, cat.description, cat.color, cat.is_active, cat.created_at, \
        (SELECT COUNT(*) FROM forum_posts p WHERE p.category_id = cat.id AND NOT p.is_deleted) AS post_count \
   FROM forum_categories cat";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSort {
    CreatedAt,
    UpdatedAt,
    Likes,
    Comments,
}

impl PostSort {
    /// Unknown keys fall back to creation time.
    pub fn parse(key: &str) -> Self {
        match key {
            "updated_at" => PostSort::UpdatedAt,
            "likes" => PostSort::Likes,
            "comments" => PostSort::Comments,
            _ => PostSort::CreatedAt,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            PostSort::CreatedAt => "p.created_at",
            PostSort::UpdatedAt => "p.updated_at",
            PostSort::Likes => "like_count",
            PostSort::Comments => "comment_count",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostListParams {
    pub category_id: Option<i64>,
    pub search: Option<String>,
    pub sort: PostSort,
    pub descending: bool,
    pub page: i64,
    pub per_page: i64,
    /// Rows preceding `page`, checked against overflow by the caller.
    pub offset: i64,
    pub pinned_first: bool,
}

#[derive(Debug, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<i64>,
}

/// `%term%` with LIKE wildcards in `term` escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_post_filters(query_builder: &mut QueryBuilder<'_, Postgres>, params: &PostListParams) {
    query_builder.push(" WHERE NOT p.is_deleted");

    if let Some(category_id) = params.category_id {
        query_builder.push(" AND p.category_id = ");
        query_builder.push_bind(category_id);
    }

    if let Some(search) = params.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search.trim());
        query_builder.push(" AND (p.title ILIKE ");
        query_builder.push_bind(pattern.clone());
        query_builder.push(" OR p.content ILIKE ");
        query_builder.push_bind(pattern);
        query_builder.push(")");
    }
}

// Categories

pub async fn list_categories(pool: &PgPool, include_inactive: bool) -> AppResult<Vec<ForumCategory>> {
    let mut query_builder = QueryBuilder::<Postgres>::new(CATEGORY_SELECT);
    if !include_inactive {
        query_builder.push(" WHERE cat.is_active");
    }
    query_builder.push(" ORDER BY cat.name ASC");

    let categories = query_builder
        .build_query_as::<ForumCategory>()
        .fetch_all(pool)
        .await?;
    Ok(categories)
}

pub async fn get_category(pool: &PgPool, id: i64) -> AppResult<Option<ForumCategory>> {
    let category = sqlx::query_as::<_, ForumCategory>(&format!("{} WHERE cat.id = $1", CATEGORY_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(category)
}

pub async fn category_name_taken(pool: &PgPool, name: &str, except_id: Option<i64>) -> AppResult<bool> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM forum_categories WHERE name = $1 AND id IS DISTINCT FROM $2)",
    )
    .bind(name)
    .bind(except_id)
    .fetch_one(pool)
    .await?;
    Ok(taken)
}

pub async fn create_category(
    pool: &PgPool,
    name: &str,
    description: Option<&str>,
    color: &str,
) -> AppResult<ForumCategory> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO forum_categories (name, description, color) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(name)
    .bind(description)
    .bind(color)
    .fetch_one(pool)
    .await?;

    get_category(pool, id)
        .await?
        .ok_or_else(|| format!("Category {} vanished after insert", id).into())
}

pub async fn update_category(
    pool: &PgPool,
    id: i64,
    patch: &CategoryPatch,
) -> AppResult<Option<ForumCategory>> {
    let updated = sqlx::query(
        "UPDATE forum_categories SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            color = COALESCE($4, color),
            is_active = COALESCE($5, is_active)
          WHERE id = $1",
    )
    .bind(id)
    .bind(patch.name.as_deref())
    .bind(patch.description.as_deref())
    .bind(patch.color.as_deref())
    .bind(patch.is_active)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Ok(None);
    }
    get_category(pool, id).await
}

// Posts

pub async fn list_posts(pool: &PgPool, params: &PostListParams) -> AppResult<(Vec<ForumPost>, i64)> {
    let mut count_builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM forum_posts p");
    push_post_filters(&mut count_builder, params);
    let total: i64 = count_builder.build_query_scalar().fetch_one(pool).await?;

    let mut query_builder = QueryBuilder::<Postgres>::new(POST_SELECT);
    push_post_filters(&mut query_builder, params);

    let direction = if params.descending { "DESC" } else { "ASC" };
    query_builder.push(" ORDER BY ");
    if params.pinned_first {
        query_builder.push("p.is_pinned DESC, ");
    }
    query_builder.push(format!(
        "{col} {dir}, p.id {dir}",
        col = params.sort.column(),
        dir = direction
    ));

    query_builder.push(" LIMIT ");
    query_builder.push_bind(params.per_page);
    query_builder.push(" OFFSET ");
    query_builder.push_bind(params.offset);

    let posts = query_builder
        .build_query_as::<ForumPost>()
        .fetch_all(pool)
        .await?;

    Ok((posts, total))
}

/// Non-deleted post by id.
pub async fn get_post(pool: &PgPool, id: i64) -> AppResult<Option<ForumPost>> {
    let post = sqlx::query_as::<_, ForumPost>(&format!(
        "{} WHERE p.id = $1 AND NOT p.is_deleted",
        POST_SELECT
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(post)
}

/// Post by id, soft-deleted ones included.
pub async fn find_post(pool: &PgPool, id: i64) -> AppResult<Option<ForumPost>> {
    let post = sqlx::query_as::<_, ForumPost>(&format!("{} WHERE p.id = $1", POST_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(post)
}

pub async fn create_post(
    pool: &PgPool,
    author_id: i64,
    title: &str,
    content: &str,
    category_id: i64,
) -> AppResult<ForumPost> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO forum_posts (title, content, category_id, author_id)
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(title)
    .bind(content)
    .bind(category_id)
    .bind(author_id)
    .fetch_one(pool)
    .await?;

    get_post(pool, id)
        .await?
        .ok_or_else(|| format!("Post {} vanished after insert", id).into())
}

pub async fn increment_views(pool: &PgPool, id: i64) -> AppResult<()> {
    sqlx::query("UPDATE forum_posts SET view_count = view_count + 1 WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_post(pool: &PgPool, id: i64, patch: &PostPatch) -> AppResult<()> {
    sqlx::query(
        "UPDATE forum_posts SET
            title = COALESCE($2, title),
            content = COALESCE($3, content),
            category_id = COALESCE($4, category_id),
            updated_at = NOW()
          WHERE id = $1",
    )
    .bind(id)
    .bind(patch.title.as_deref())
    .bind(patch.content.as_deref())
    .bind(patch.category_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn soft_delete_post(pool: &PgPool, id: i64) -> AppResult<()> {
    sqlx::query("UPDATE forum_posts SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn recent_posts(pool: &PgPool, limit: i64) -> AppResult<Vec<ForumPost>> {
    let posts = sqlx::query_as::<_, ForumPost>(&format!(
        "{} WHERE NOT p.is_deleted ORDER BY p.created_at DESC, p.id DESC LIMIT $1",
        POST_SELECT
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(posts)
}

// Comments

/// The `per_post` most recent non-deleted comments of each post, newest
/// first within a post.
pub async fn latest_comments(
    pool: &PgPool,
    post_ids: &[i64],
    per_post: i64,
) -> AppResult<Vec<ForumComment>> {
    if post_ids.is_empty() {
        return Ok(Vec::new());
    }

    let comments = sqlx::query_as::<_, ForumComment>(&format!(
        "SELECT id, content, author_id, post_id, parent_id, is_deleted, created_at, updated_at,
                like_count, author_username
           FROM (
                SELECT {}, ROW_NUMBER() OVER (PARTITION BY c.post_id ORDER BY c.created_at DESC, c.id DESC) AS rn
                  FROM forum_comments c
                  LEFT JOIN users u ON u.id = c.author_id
                 WHERE c.post_id = ANY($1) AND NOT c.is_deleted
           ) ranked
          WHERE rn <= $2
          ORDER BY post_id, created_at DESC, id DESC",
        COMMENT_COLUMNS
    ))
    .bind(post_ids)
    .bind(per_post)
    .fetch_all(pool)
    .await?;

    Ok(comments)
}

/// All non-deleted comments of a post in chronological order.
pub async fn comments_for_post(pool: &PgPool, post_id: i64) -> AppResult<Vec<ForumComment>> {
    let comments = sqlx::query_as::<_, ForumComment>(&format!(
        "SELECT {} FROM forum_comments c LEFT JOIN users u ON u.id = c.author_id
          WHERE c.post_id = $1 AND NOT c.is_deleted
          ORDER BY c.created_at ASC, c.id ASC",
        COMMENT_COLUMNS
    ))
    .bind(post_id)
    .fetch_all(pool)
    .await?;
    Ok(comments)
}

/// Comment by id, soft-deleted ones included.
pub async fn find_comment(pool: &PgPool, id: i64) -> AppResult<Option<ForumComment>> {
    let comment = sqlx::query_as::<_, ForumComment>(&format!(
        "SELECT {} FROM forum_comments c LEFT JOIN users u ON u.id = c.author_id WHERE c.id = $1",
        COMMENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(comment)
}

pub async fn create_comment(
    pool: &PgPool,
    post_id: i64,
    author_id: i64,
    content: &str,
    parent_id: Option<i64>,
) -> AppResult<ForumComment> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO forum_comments (content, post_id, author_id, parent_id)
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(content)
    .bind(post_id)
    .bind(author_id)
    .bind(parent_id)
    .fetch_one(pool)
    .await?;

    find_comment(pool, id)
        .await?
        .ok_or_else(|| format!("Comment {} vanished after insert", id).into())
}

pub async fn update_comment(pool: &PgPool, id: i64, content: &str) -> AppResult<Option<ForumComment>> {
    sqlx::query("UPDATE forum_comments SET content = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(content)
        .execute(pool)
        .await?;
    find_comment(pool, id).await
}

pub async fn soft_delete_comment(pool: &PgPool, id: i64) -> AppResult<()> {
    sqlx::query("UPDATE forum_comments SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

// Likes

/// Flips the user's like on a post. Returns the new state and like count.
pub async fn toggle_post_like(pool: &PgPool, user_id: i64, post_id: i64) -> AppResult<(bool, i64)> {
    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM forum_post_likes WHERE user_id = $1 AND post_id = $2")
        .bind(user_id)
        .bind(post_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let liked = removed == 0;
    if liked {
        sqlx::query(
            "INSERT INTO forum_post_likes (user_id, post_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(post_id)
        .execute(&mut *tx)
        .await?;
    }

    let like_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM forum_post_likes WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok((liked, like_count))
}

/// Flips the user's like on a comment. Returns the new state and like count.
pub async fn toggle_comment_like(
    pool: &PgPool,
    user_id: i64,
    comment_id: i64,
) -> AppResult<(bool, i64)> {
    let mut tx = pool.begin().await?;

    let removed =
        sqlx::query("DELETE FROM forum_comment_likes WHERE user_id = $1 AND comment_id = $2")
            .bind(user_id)
            .bind(comment_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

    let liked = removed == 0;
    if liked {
        sqlx::query(
            "INSERT INTO forum_comment_likes (user_id, comment_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(comment_id)
        .execute(&mut *tx)
        .await?;
    }

    let like_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM forum_comment_likes WHERE comment_id = $1")
            .bind(comment_id)
            .fetch_one(&mut *tx)
            .await?;

    tx.commit().await?;
    Ok((liked, like_count))
}

// Stats

pub async fn count_posts(pool: &PgPool) -> AppResult<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM forum_posts WHERE NOT is_deleted")
        .fetch_one(pool)
        .await?;
    Ok(total)
}

pub async fn count_comments(pool: &PgPool) -> AppResult<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM forum_comments WHERE NOT is_deleted")
        .fetch_one(pool)
        .await?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_keys_fall_back_to_creation_time() {
        assert_eq!(PostSort::parse("likes"), PostSort::Likes);
        assert_eq!(PostSort::parse("comments"), PostSort::Comments);
        assert_eq!(PostSort::parse("updated_at"), PostSort::UpdatedAt);
        assert_eq!(PostSort::parse("views"), PostSort::CreatedAt);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("eur"), "%eur%");
        assert_eq!(like_pattern("100%_win"), "%100\\%\\_win%");
    }

    #[test]
    fn list_query_orders_pinned_first() {
        let params = PostListParams {
            category_id: Some(3),
            search: Some("gold".into()),
            sort: PostSort::Likes,
            descending: true,
            page: 2,
            per_page: 20,
            offset: 20,
            pinned_first: true,
        };
        let mut query_builder = QueryBuilder::<Postgres>::new(POST_SELECT);
        push_post_filters(&mut query_builder, &params);
        let sql = query_builder.sql().to_string();
        assert!(sql.contains("WHERE NOT p.is_deleted AND p.category_id = $1"));
        assert!(sql.contains("p.title ILIKE $2 OR p.content ILIKE $3"));
    }
}
