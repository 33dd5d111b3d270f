//! Delivery to the CMS: taxonomy-derived metadata, bounded retry with
//! backoff, and fallback-to-draft.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use arcana_common::{Article, PipelineError, PostStatus, Topic};
use wordpress_client::{CreatedPost, NewPost, WordPressClient, WordPressError};

use crate::retry::{run_with_retry, Attempt, RetryPolicy, Sleeper};

/// Seam between the gateway and the CMS.
#[async_trait]
pub trait Cms: Send + Sync {
    async fn create_post(&self, post: &NewPost) -> Result<CreatedPost, WordPressError>;
    async fn get_or_create_category(&self, name: &str) -> Result<u64, WordPressError>;
    async fn get_or_create_tag(&self, name: &str) -> Result<u64, WordPressError>;
}

#[async_trait]
impl Cms for WordPressClient {
    async fn create_post(&self, post: &NewPost) -> Result<CreatedPost, WordPressError> {
        WordPressClient::create_post(self, post).await
    }

    async fn get_or_create_category(&self, name: &str) -> Result<u64, WordPressError> {
        WordPressClient::get_or_create_category(self, name).await
    }

    async fn get_or_create_tag(&self, name: &str) -> Result<u64, WordPressError> {
        WordPressClient::get_or_create_tag(self, name).await
    }
}

/// Requested publication mode for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredStatus {
    Draft,
    Publish,
    Scheduled,
}

impl DesiredStatus {
    /// Wire value the CMS expects.
    pub fn wire(&self) -> &'static str {
        match self {
            DesiredStatus::Draft => "draft",
            DesiredStatus::Publish => "publish",
            DesiredStatus::Scheduled => "future",
        }
    }

    fn as_post_status(&self) -> PostStatus {
        match self {
            DesiredStatus::Draft => PostStatus::Draft,
            DesiredStatus::Publish => PostStatus::Published,
            DesiredStatus::Scheduled => PostStatus::Scheduled,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PublishResult {
    pub remote_id: u64,
    pub remote_url: String,
    pub final_status: PostStatus,
    pub attempts_used: u32,
}

// Editorial categories every article belongs to, alongside the
// per-personality-type category.
const BASE_CATEGORIES: [&str; 2] = ["타로 심리 해석", "연애 심리"];

pub struct PublishGateway {
    cms: Arc<dyn Cms>,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl PublishGateway {
    pub fn new(cms: Arc<dyn Cms>, retry: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            cms,
            retry,
            sleeper,
        }
    }

    /// Category labels derived from the topic. Pure.
    pub fn category_labels(topic: &Topic) -> Vec<String> {
        let mut labels = vec![format!("MBTI {}", topic.personality)];
        labels.extend(BASE_CATEGORIES.iter().map(|s| s.to_string()));
        labels
    }

    /// Tag labels derived from the topic. Pure.
    pub fn tag_labels(topic: &Topic) -> Vec<String> {
        vec![
            topic.personality.clone(),
            topic.card.name.clone(),
            topic.card.korean.clone(),
            topic.situation_keyword().to_string(),
        ]
    }

    /// Deliver the article. Transient failures are retried with backoff;
    /// when the preferred status is not draft and the retry budget runs
    /// out, one fallback pass saves the post as a draft so the work is
    /// recoverable by hand.
    pub async fn publish(
        &self,
        article: &Article,
        topic: &Topic,
        desired: DesiredStatus,
        schedule_time: Option<DateTime<Utc>>,
    ) -> Result<PublishResult, PipelineError> {
        let (categories, tags) = self.resolve_metadata(topic).await;

        let post = NewPost {
            title: article.title.clone(),
            content: article.body.clone(),
            status: desired.wire().to_string(),
            categories,
            tags,
            date: (desired == DesiredStatus::Scheduled)
                .then(|| schedule_time.map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string()))
                .flatten(),
        };

        let (result, attempts) = self.deliver(&post).await;
        match result {
            Ok(created) => Ok(Self::result_from(created, desired.as_post_status(), attempts)),
            Err(e) if desired != DesiredStatus::Draft => {
                warn!(
                    error = %e,
                    preferred = desired.wire(),
                    "Delivery failed with preferred status, falling back to draft"
                );

                let fallback = NewPost {
                    status: "draft".to_string(),
                    date: None,
                    ..post
                };
                let (fallback_result, fallback_attempts) = self.deliver(&fallback).await;
                match fallback_result {
                    Ok(created) => {
                        info!(post_id = created.id, "Fallback draft saved");
                        Ok(Self::result_from(
                            created,
                            PostStatus::Draft,
                            attempts + fallback_attempts,
                        ))
                    }
                    Err(fallback_err) => Err(PipelineError::Publish(format!(
                        "preferred status failed ({e}); draft fallback failed ({fallback_err})"
                    ))),
                }
            }
            Err(e) => Err(PipelineError::Publish(e.to_string())),
        }
    }

    async fn deliver(&self, post: &NewPost) -> (Result<CreatedPost, WordPressError>, u32) {
        let cms = &self.cms;
        run_with_retry(self.retry, self.sleeper.as_ref(), |_| {
            let post = post.clone();
            async move {
                match cms.create_post(&post).await {
                    Ok(created) => Attempt::Success(created),
                    Err(e) if e.is_transient() => Attempt::Transient(e),
                    Err(e) => Attempt::Permanent(e),
                }
            }
        })
        .await
    }

    /// Resolve category/tag labels to remote ids with get-or-create
    /// semantics. Metadata failures never fail the run; the post goes out
    /// untagged instead.
    async fn resolve_metadata(&self, topic: &Topic) -> (Vec<u64>, Vec<u64>) {
        let categories = match self.resolve_categories(topic).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Failed to resolve categories");
                Vec::new()
            }
        };
        let tags = match self.resolve_tags(topic).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Failed to resolve tags");
                Vec::new()
            }
        };
        (categories, tags)
    }

    async fn resolve_categories(&self, topic: &Topic) -> Result<Vec<u64>, WordPressError> {
        let mut ids = Vec::new();
        for label in Self::category_labels(topic) {
            ids.push(self.cms.get_or_create_category(&label).await?);
        }
        Ok(ids)
    }

    async fn resolve_tags(&self, topic: &Topic) -> Result<Vec<u64>, WordPressError> {
        let mut ids = Vec::new();
        for label in Self::tag_labels(topic) {
            ids.push(self.cms.get_or_create_tag(&label).await?);
        }
        Ok(ids)
    }

    fn result_from(created: CreatedPost, requested: PostStatus, attempts_used: u32) -> PublishResult {
        // Trust the status the remote reports where it parses; fall back
        // to the requested one otherwise.
        let final_status = PostStatus::from_wire(&created.status).unwrap_or(requested);
        PublishResult {
            remote_id: created.id,
            remote_url: created.link,
            final_status,
            attempts_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcana_common::types::{Card, DeckKind};

    fn topic() -> Topic {
        Topic {
            personality: "ENFP".to_string(),
            situation: "짝사랑 (unrequited love)".to_string(),
            card: Card::new("The Star", "별", DeckKind::Tarot),
        }
    }

    #[test]
    fn category_labels_carry_personality_and_editorial_sections() {
        let labels = PublishGateway::category_labels(&topic());
        assert_eq!(labels[0], "MBTI ENFP");
        assert!(labels.contains(&"타로 심리 해석".to_string()));
        assert!(labels.contains(&"연애 심리".to_string()));
    }

    #[test]
    fn tag_labels_use_situation_keyword_without_gloss() {
        let labels = PublishGateway::tag_labels(&topic());
        assert!(labels.contains(&"ENFP".to_string()));
        assert!(labels.contains(&"The Star".to_string()));
        assert!(labels.contains(&"별".to_string()));
        assert!(labels.contains(&"짝사랑".to_string()));
        assert!(!labels.iter().any(|l| l.contains('(')));
    }
}
