//! Article generation through the Messages API.

use async_trait::async_trait;
use tracing::info;

use ai_client::{AiError, AnthropicClient, ChatRequest, WireMessage};
use arcana_common::{Article, Topic};

/// Seam between the coordinator and the text-generation service, so tests
/// substitute canned generators without a network.
#[async_trait]
pub trait ArticleGenerator: Send + Sync {
    async fn generate(&self, topic: &Topic) -> Result<Article, AiError>;
}

const MODEL: &str = "claude-sonnet-4-5-20250929";
// High enough that articles are never truncated mid-section.
const MAX_TOKENS: u32 = 6000;
const TEMPERATURE: f32 = 0.7;

pub struct ClaudeGenerator {
    client: AnthropicClient,
}

impl ClaudeGenerator {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: AnthropicClient::new(api_key),
        }
    }

    fn prompt(topic: &Topic) -> String {
        format!(
            "당신은 심리 칼럼니스트입니다. 아래 주제로 한국어 블로그 글을 작성하세요.\n\n\
             성격 유형: {personality}\n\
             연애 상황: {situation}\n\
             카드: {card} ({korean}, {deck})\n\n\
             형식 요건:\n\
             - 첫 줄은 '#'로 시작하는 제목\n\
             - '##' 소제목 3개 이상, 본문 1500자 이상\n\
             - 단정하거나 예언하는 표현(확실히, 반드시 등)은 쓰지 않기\n\
             - 마지막에 \"이 글은 참고 자료일 뿐, 해석은 사람마다 다를 수 있습니다.\" 문장 포함",
            personality = topic.personality,
            situation = topic.situation,
            card = topic.card.name,
            korean = topic.card.korean,
            deck = topic.card.deck.as_str(),
        )
    }
}

#[async_trait]
impl ArticleGenerator for ClaudeGenerator {
    async fn generate(&self, topic: &Topic) -> Result<Article, AiError> {
        let request = ChatRequest {
            model: MODEL.to_string(),
            max_tokens: MAX_TOKENS,
            messages: vec![WireMessage::user(Self::prompt(topic))],
            system: None,
            temperature: Some(TEMPERATURE),
        };

        let response = self.client.chat(&request).await?;
        let text = response
            .text()
            .ok_or_else(|| AiError::Parse("response contained no text".to_string()))?;
        let article = parse_article(&text)
            .ok_or_else(|| AiError::Parse("response contained no usable article".to_string()))?;

        info!(
            title = %article.title,
            words = article.word_count,
            tokens = response.usage.total(),
            "Article generated"
        );
        Ok(article)
    }
}

/// The first markdown heading becomes the title and everything after it
/// the body. When the model skipped the heading, the first non-empty line
/// stands in as the title.
pub fn parse_article(text: &str) -> Option<Article> {
    let lines: Vec<&str> = text.lines().collect();

    let title_idx = lines
        .iter()
        .position(|line| line.trim_start().starts_with('#'))
        .or_else(|| lines.iter().position(|line| !line.trim().is_empty()))?;

    let title = lines[title_idx]
        .trim_start()
        .trim_start_matches('#')
        .trim()
        .to_string();
    let body = lines[title_idx + 1..].join("\n").trim().to_string();

    if title.is_empty() || body.is_empty() {
        return None;
    }
    Some(Article::new(title, body))
}
