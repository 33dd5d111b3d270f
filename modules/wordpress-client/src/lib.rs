pub mod error;
pub mod types;

pub use error::{Result, WordPressError};
pub use types::{CreatedPost, NewPost, Term};

use std::time::Duration;

/// Per-request timeout. WordPress installs behind slow hosts are common;
/// anything beyond this is treated as a transient network failure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct WordPressClient {
    http: reqwest::Client,
    api_url: String,
    username: String,
    app_password: String,
}

impl WordPressClient {
    pub fn new(site_url: &str, username: &str, app_password: &str) -> Result<Self> {
        let parsed = url::Url::parse(site_url)
            .map_err(|e| WordPressError::InvalidUrl(format!("{site_url}: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(WordPressError::InvalidUrl(format!(
                "only http/https URLs are allowed, got: {}",
                parsed.scheme()
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_url: format!("{}/wp-json/wp/v2", site_url.trim_end_matches('/')),
            username: username.to_string(),
            app_password: app_password.to_string(),
        })
    }

    /// Create a post. One attempt, no retries; retry policy belongs to the
    /// caller.
    pub async fn create_post(&self, post: &NewPost) -> Result<CreatedPost> {
        let url = format!("{}/posts", self.api_url);

        tracing::info!(
            title = %post.title,
            status = %post.status,
            scheduled = post.date.is_some(),
            "Creating WordPress post"
        );

        let resp = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.app_password))
            .json(post)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WordPressError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let created: CreatedPost = resp.json().await?;
        tracing::info!(post_id = created.id, link = %created.link, status = %created.status, "Post created");
        Ok(created)
    }

    /// Find a category by name. Returns the first match, if any.
    pub async fn find_category(&self, name: &str) -> Result<Option<Term>> {
        self.find_term("categories", name).await
    }

    /// Create a new category.
    pub async fn create_category(&self, name: &str) -> Result<Term> {
        self.create_term("categories", name).await
    }

    /// Find a tag by name. Returns the first match, if any.
    pub async fn find_tag(&self, name: &str) -> Result<Option<Term>> {
        self.find_term("tags", name).await
    }

    /// Create a new tag.
    pub async fn create_tag(&self, name: &str) -> Result<Term> {
        self.create_term("tags", name).await
    }

    /// Category id by name, creating the category on a search miss.
    /// Looking up before creating keeps repeated runs from accumulating
    /// duplicate taxonomy objects remotely.
    pub async fn get_or_create_category(&self, name: &str) -> Result<u64> {
        if let Some(term) = self.find_category(name).await? {
            return Ok(term.id);
        }
        let term = self.create_category(name).await?;
        tracing::debug!(category = %term.name, id = term.id, "Created category");
        Ok(term.id)
    }

    /// Tag id by name, creating the tag on a search miss.
    pub async fn get_or_create_tag(&self, name: &str) -> Result<u64> {
        if let Some(term) = self.find_tag(name).await? {
            return Ok(term.id);
        }
        let term = self.create_tag(name).await?;
        tracing::debug!(tag = %term.name, id = term.id, "Created tag");
        Ok(term.id)
    }

    async fn find_term(&self, endpoint: &str, name: &str) -> Result<Option<Term>> {
        let url = format!("{}/{}", self.api_url, endpoint);

        let resp = self
            .http
            .get(&url)
            .query(&[("search", name)])
            .basic_auth(&self.username, Some(&self.app_password))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WordPressError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let terms: Vec<Term> = resp.json().await?;
        Ok(terms.into_iter().next())
    }

    async fn create_term(&self, endpoint: &str, name: &str) -> Result<Term> {
        let url = format!("{}/{}", self.api_url, endpoint);

        let resp = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.app_password))
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WordPressError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_site_urls() {
        assert!(WordPressClient::new("ftp://blog.example.com", "user", "pass").is_err());
        assert!(WordPressClient::new("not a url", "user", "pass").is_err());
    }

    #[test]
    fn api_url_strips_trailing_slash() {
        let client = WordPressClient::new("https://blog.example.com/", "user", "pass")
            .expect("valid URL");
        assert_eq!(client.api_url, "https://blog.example.com/wp-json/wp/v2");
    }
}
