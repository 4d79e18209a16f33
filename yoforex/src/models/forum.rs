use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use std::collections::HashMap;
use ts_rs::TS;

/// Characters of comment content kept in post list previews.
pub const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize, FromRow, TS)]
#[ts(export)]
pub struct ForumCategory {
    #[ts(type = "number")]
    pub id: i64,
    pub name: String,
    #[ts(optional)]
    pub description: Option<String>,
    pub color: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[ts(type = "number")]
    pub post_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, TS)]
#[ts(export)]
pub struct ForumComment {
    #[ts(type = "number")]
    pub id: i64,
    pub content: String,
    #[ts(type = "number")]
    pub author_id: i64,
    #[ts(type = "number")]
    pub post_id: i64,
    #[ts(optional, type = "number")]
    pub parent_id: Option<i64>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[ts(type = "number")]
    pub like_count: i64,
    pub author_username: String,
    #[sqlx(skip)]
    #[ts(type = "Array<ForumComment>")]
    pub replies: Vec<ForumComment>,
}

impl ForumComment {
    /// Shortened copy for post list previews.
    pub fn preview(mut self) -> Self {
        if self.content.chars().count() > PREVIEW_CHARS {
            let cut: String = self.content.chars().take(PREVIEW_CHARS).collect();
            self.content = format!("{}...", cut);
        }
        self.replies.clear();
        self
    }
}

#[derive(Debug, Clone, Serialize, FromRow, TS)]
#[ts(export)]
pub struct ForumPost {
    #[ts(type = "number")]
    pub id: i64,
    pub title: String,
    pub content: String,
    #[ts(type = "number")]
    pub category_id: i64,
    #[ts(type = "number")]
    pub author_id: i64,
    pub is_pinned: bool,
    pub is_locked: bool,
    pub is_deleted: bool,
    pub view_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[ts(type = "number")]
    pub like_count: i64,
    #[ts(type = "number")]
    pub comment_count: i64,
    pub author_username: String,
    pub category_name: String,
    #[sqlx(skip)]
    pub latest_comments: Vec<ForumComment>,
}

/// Builds the reply tree from a flat, chronologically ordered comment list.
///
/// Replies whose parent is absent from `comments` (deleted or on another
/// post) are dropped along with their own replies.
pub fn nest_comments(comments: Vec<ForumComment>) -> Vec<ForumComment> {
    let mut roots = Vec::new();
    let mut children: HashMap<i64, Vec<ForumComment>> = HashMap::new();

    for comment in comments {
        match comment.parent_id {
            None => roots.push(comment),
            Some(parent_id) => children.entry(parent_id).or_default().push(comment),
        }
    }

    fn attach(mut node: ForumComment, children: &mut HashMap<i64, Vec<ForumComment>>) -> ForumComment {
        if let Some(replies) = children.remove(&node.id) {
            node.replies = replies
                .into_iter()
                .map(|reply| attach(reply, children))
                .collect();
        }
        node
    }

    roots
        .into_iter()
        .map(|root| attach(root, &mut children))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: i64, parent_id: Option<i64>, content: &str) -> ForumComment {
        let now = Utc::now();
        ForumComment {
            id,
            content: content.to_string(),
            author_id: 1,
            post_id: 1,
            parent_id,
            is_deleted: false,
            created_at: now,
            updated_at: now,
            like_count: 0,
            author_username: "alice".into(),
            replies: Vec::new(),
        }
    }

    #[test]
    fn nests_replies_under_parents() {
        let tree = nest_comments(vec![
            comment(1, None, "root"),
            comment(2, Some(1), "reply"),
            comment(3, Some(2), "reply to reply"),
            comment(4, None, "second root"),
            comment(5, Some(1), "another reply"),
        ]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].id, 1);
        assert_eq!(
            tree[0].replies.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![2, 5]
        );
        assert_eq!(tree[0].replies[0].replies[0].id, 3);
        assert!(tree[1].replies.is_empty());
    }

    #[test]
    fn drops_orphaned_replies() {
        let tree = nest_comments(vec![comment(1, None, "root"), comment(9, Some(42), "orphan")]);
        assert_eq!(tree.len(), 1);
        assert!(tree[0].replies.is_empty());
    }

    #[test]
    fn preview_truncates_long_content() {
        let long = "x".repeat(150);
        let preview = comment(1, None, &long).preview();
        assert_eq!(preview.content.chars().count(), PREVIEW_CHARS + 3);
        assert!(preview.content.ends_with("..."));

        let short = comment(2, None, "short").preview();
        assert_eq!(short.content, "short");
    }
}
