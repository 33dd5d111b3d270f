use serde::{Deserialize, Serialize};

/// Request body for `POST /wp/v2/posts`.
///
/// `status` carries the wire value the REST API expects:
/// "draft", "publish", or "future" (with `date` set).
#[derive(Debug, Clone, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub status: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<u64>,
    /// Site-local timestamp ("YYYY-MM-DDTHH:MM:SS") for scheduled posts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Fields of interest from a created post.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPost {
    pub id: u64,
    pub link: String,
    pub status: String,
}

/// A category or tag as returned by the taxonomy endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Term {
    pub id: u64,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_post_omits_empty_metadata() {
        let post = NewPost {
            title: "t".to_string(),
            content: "c".to_string(),
            status: "draft".to_string(),
            categories: Vec::new(),
            tags: Vec::new(),
            date: None,
        };
        let json = serde_json::to_value(&post).expect("serializable");
        assert!(json.get("categories").is_none());
        assert!(json.get("tags").is_none());
        assert!(json.get("date").is_none());
    }
}
