//! The pipeline run state machine.
//!
//! One run walks Selecting → Generating → Validating → (Sanitizing) →
//! Publishing → Recording. Every path past selection records exactly one
//! ledger entry, success or failure, so no topic is ever spent without a
//! trace. Selection failures record nothing: there is no topic yet to key
//! an entry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info};
use uuid::Uuid;

use ai_client::AiError;
use arcana_common::{Article, PipelineError, PostStatus, Topic};
use arcana_ledger::{NewEntry, TopicLedger};

use crate::gateway::{DesiredStatus, PublishGateway, PublishResult};
use crate::generator::ArticleGenerator;
use crate::retry::{run_with_retry, Attempt, RetryPolicy, Sleeper};
use crate::selector::TopicSelector;
use crate::validator::ContentValidator;

/// Stage a run failed in, for structured diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Selecting,
    Generating,
    Validating,
    Sanitizing,
    Publishing,
    Recording,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Selecting => "selecting",
            Stage::Generating => "generating",
            Stage::Validating => "validating",
            Stage::Sanitizing => "sanitizing",
            Stage::Publishing => "publishing",
            Stage::Recording => "recording",
        }
    }
}

/// Options for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub desired_status: DesiredStatus,
    pub schedule_time: Option<DateTime<Utc>>,
    pub sanitize: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            desired_status: DesiredStatus::Draft,
            schedule_time: None,
            sanitize: true,
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub topic: Topic,
    pub title: String,
    pub status: PostStatus,
    pub remote_id: u64,
    pub remote_url: String,
    pub attempts_used: u32,
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Pipeline Run Complete ===")?;
        writeln!(f, "Topic:     {}", self.topic)?;
        writeln!(f, "Title:     {}", self.title)?;
        writeln!(f, "Status:    {}", self.status)?;
        writeln!(f, "Post ID:   {}", self.remote_id)?;
        writeln!(f, "URL:       {}", self.remote_url)?;
        writeln!(f, "Attempts:  {}", self.attempts_used)?;
        Ok(())
    }
}

/// A failure inside the recordable part of a run: the stage it happened
/// in, the title when generation got that far, and the error itself.
struct FailedAttempt {
    stage: Stage,
    title: Option<String>,
    error: PipelineError,
}

pub struct Pipeline {
    ledger: TopicLedger,
    selector: TopicSelector,
    generator: Box<dyn ArticleGenerator>,
    validator: ContentValidator,
    gateway: PublishGateway,
    generation_retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl Pipeline {
    pub fn new(
        ledger: TopicLedger,
        selector: TopicSelector,
        generator: Box<dyn ArticleGenerator>,
        validator: ContentValidator,
        gateway: PublishGateway,
        generation_retry: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            ledger,
            selector,
            generator,
            validator,
            gateway,
            generation_retry,
            sleeper,
        }
    }

    pub fn ledger(&self) -> &TopicLedger {
        &self.ledger
    }

    /// Execute one full run.
    pub async fn run(&mut self, opts: &RunOptions) -> Result<RunReport, PipelineError> {
        let run_id = Uuid::new_v4();
        info!(
            %run_id,
            status = opts.desired_status.wire(),
            sanitize = opts.sanitize,
            "Pipeline run starting"
        );

        // Selecting. No topic exists yet to key a ledger entry, so a
        // failure here aborts with no side effects beyond logs.
        let topic = self.selector.select_unique(&self.ledger).await?;
        let remaining = self
            .ledger
            .remaining_combinations(self.selector.taxonomy())
            .await
            .map_err(|e| PipelineError::Storage(e.to_string()))?;
        info!(%topic, remaining, "Topic selected");

        match self.attempt(&topic, opts).await {
            Ok((article, result)) => {
                self.record(NewEntry {
                    topic: topic.clone(),
                    title: article.title.clone(),
                    remote_id: Some(result.remote_id as i64),
                    remote_url: Some(result.remote_url.clone()),
                    status: result.final_status,
                    error: None,
                })
                .await?;

                info!(
                    %run_id,
                    post_id = result.remote_id,
                    status = %result.final_status,
                    "Pipeline run complete"
                );

                Ok(RunReport {
                    run_id,
                    topic,
                    title: article.title,
                    status: result.final_status,
                    remote_id: result.remote_id,
                    remote_url: result.remote_url,
                    attempts_used: result.attempts_used,
                })
            }
            Err(failure) => {
                error!(
                    %run_id,
                    %topic,
                    stage = failure.stage.as_str(),
                    error = %failure.error,
                    "Pipeline run failed"
                );

                self.record(NewEntry {
                    topic: topic.clone(),
                    title: failure.title.unwrap_or_default(),
                    remote_id: None,
                    remote_url: None,
                    status: PostStatus::Failed,
                    error: Some(failure.error.to_string()),
                })
                .await?;

                Err(failure.error)
            }
        }
    }

    /// The recordable stages: generate, validate (with at most one
    /// sanitization pass), publish.
    async fn attempt(
        &self,
        topic: &Topic,
        opts: &RunOptions,
    ) -> Result<(Article, PublishResult), FailedAttempt> {
        let article = match self.generate(topic).await {
            Ok(article) => article,
            Err(e) => {
                return Err(FailedAttempt {
                    stage: Stage::Generating,
                    title: None,
                    error: PipelineError::Generation(e.to_string()),
                })
            }
        };

        let article = match self.ensure_safe(article, opts) {
            Ok(article) => article,
            Err((stage, title, error)) => {
                return Err(FailedAttempt {
                    stage,
                    title: Some(title),
                    error,
                })
            }
        };

        match self
            .gateway
            .publish(&article, topic, opts.desired_status, opts.schedule_time)
            .await
        {
            Ok(result) => Ok((article, result)),
            Err(error) => Err(FailedAttempt {
                stage: Stage::Publishing,
                title: Some(article.title.clone()),
                error,
            }),
        }
    }

    /// Generate with bounded retry on transient generator errors.
    async fn generate(&self, topic: &Topic) -> Result<Article, AiError> {
        let generator = &self.generator;
        let (result, attempts) =
            run_with_retry(self.generation_retry, self.sleeper.as_ref(), |_| async move {
                match generator.generate(topic).await {
                    Ok(article) => Attempt::Success(article),
                    Err(e) if e.is_transient() => Attempt::Transient(e),
                    Err(e) => Attempt::Permanent(e),
                }
            })
            .await;

        if result.is_err() {
            error!(attempts, "Generation failed after retries");
        }
        result
    }

    /// Validate, sanitizing at most once. A second rewrite pass is never
    /// attempted; persistent violations fail the run.
    fn ensure_safe(
        &self,
        article: Article,
        opts: &RunOptions,
    ) -> Result<Article, (Stage, String, PipelineError)> {
        let report = self.validator.validate(&article.title, &article.body);
        if report.is_valid() {
            return Ok(article);
        }

        if !opts.sanitize {
            return Err((
                Stage::Validating,
                article.title,
                PipelineError::Validation(report.violations),
            ));
        }

        info!(violations = report.violations.len(), "Sanitizing content");
        let sanitized_body = self.validator.sanitize(&article.body);
        let article = article.with_body(sanitized_body);

        let recheck = self.validator.validate(&article.title, &article.body);
        if recheck.is_valid() {
            Ok(article)
        } else {
            Err((
                Stage::Sanitizing,
                article.title,
                PipelineError::Validation(recheck.violations),
            ))
        }
    }

    async fn record(&self, entry: NewEntry) -> Result<(), PipelineError> {
        self.ledger
            .record(entry)
            .await
            .map(|_| ())
            .map_err(|e| PipelineError::Storage(e.to_string()))
    }
}
