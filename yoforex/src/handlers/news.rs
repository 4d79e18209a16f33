use crate::app::AppState;
use crate::errors::{ApiResult, AppError};
use crate::integrations::finnhub::FinnhubArticle;
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use ts_rs::TS;

const TOP_NEWS: usize = 3;
const MARKET_EVENTS: usize = 2;
const COMPANY_NEWS_DAYS: i64 = 30;

const POSITIVE_WORDS: &[&str] = &[
    "surge", "rally", "gain", "rise", "jump", "beat", "record", "growth", "soar", "optimism",
    "upgrade", "boost", "rebound",
];
const NEGATIVE_WORDS: &[&str] = &[
    "fall", "drop", "plunge", "slump", "loss", "miss", "fear", "crisis", "cut", "decline",
    "tumble", "recession", "warn", "selloff", "sell-off", "downgrade",
];
const HIGH_IMPACT_WORDS: &[&str] = &[
    "fed", "rate", "inflation", "cpi", "payroll", "jobs", "gdp", "ecb", "central bank", "tariff",
    "war", "opec",
];

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Impact {
    High,
    Medium,
    Low,
    Positive,
    Neutral,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct NewsArticle {
    pub headline: String,
    pub summary: String,
    pub url: String,
    pub time: String,
    pub source: String,
    pub sentiment: Sentiment,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct Insight {
    pub message: String,
    pub impact: Impact,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct RiskReminder {
    pub message: String,
    pub impact: Impact,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct MarketEvent {
    pub event: String,
    pub time: String,
    pub impact: Impact,
    pub url: String,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct TradingNewsResponse {
    pub daily_insight: Insight,
    pub risk_reminder: RiskReminder,
    pub market_events: Vec<MarketEvent>,
    pub top_news: Vec<NewsArticle>,
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// `word` itself or a plain inflection of it ("rate", "rates", "rated").
fn is_form_of(word: &str, stem: &str) -> bool {
    word.strip_prefix(stem)
        .is_some_and(|rest| matches!(rest, "" | "s" | "es" | "d" | "ed" | "ing"))
}

/// Counts the keywords appearing as whole words. Multi-word keywords must
/// appear as consecutive words.
fn mentions(words_in: &[String], keywords: &[&str]) -> usize {
    keywords
        .iter()
        .filter(|keyword| {
            let parts = words(keyword);
            words_in
                .windows(parts.len())
                .any(|window| window.iter().zip(&parts).all(|(w, p)| is_form_of(w, p)))
        })
        .count()
}

pub fn sentiment(headline: &str) -> Sentiment {
    let headline = words(headline);
    let positive = mentions(&headline, POSITIVE_WORDS);
    let negative = mentions(&headline, NEGATIVE_WORDS);

    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

pub fn event_impact(headline: &str) -> Impact {
    if mentions(&words(headline), HIGH_IMPACT_WORDS) > 0 {
        return Impact::High;
    }
    match sentiment(headline) {
        Sentiment::Neutral => Impact::Low,
        _ => Impact::Medium,
    }
}

fn format_time(unix_secs: i64, format: &str) -> String {
    DateTime::<Utc>::from_timestamp(unix_secs, 0)
        .unwrap_or_default()
        .format(format)
        .to_string()
}

fn or_default(value: &str, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

fn to_article(article: &FinnhubArticle) -> NewsArticle {
    NewsArticle {
        headline: or_default(&article.headline, "No headline"),
        summary: or_default(&article.summary, "No summary available"),
        url: or_default(&article.url, "#"),
        time: format_time(article.datetime, "%Y-%m-%d %H:%M:%S"),
        source: or_default(&article.source, "Unknown"),
        sentiment: sentiment(&article.headline),
    }
}

fn build_news(articles: &[FinnhubArticle], now: DateTime<Utc>) -> Option<TradingNewsResponse> {
    let latest = articles.first()?;

    let top_news: Vec<NewsArticle> = articles.iter().take(TOP_NEWS).map(to_article).collect();

    let daily_insight = Insight {
        message: or_default(&latest.headline, "Market update available"),
        impact: match sentiment(&latest.headline) {
            Sentiment::Positive => Impact::Positive,
            Sentiment::Neutral => Impact::Neutral,
            Sentiment::Negative => Impact::High,
        },
        source: or_default(&latest.source, "Market Data"),
        timestamp: now,
    };

    let bearish = top_news
        .iter()
        .any(|article| article.sentiment == Sentiment::Negative);
    let risk_reminder = RiskReminder {
        message: "Market shows increased volatility".to_string(),
        impact: if bearish { Impact::High } else { Impact::Medium },
        symbol: "SPY".to_string(),
        timestamp: now,
    };

    let market_events = articles
        .iter()
        .take(MARKET_EVENTS)
        .map(|article| MarketEvent {
            event: or_default(&article.headline, "Market Event"),
            time: format_time(article.datetime, "%Y-%m-%d %H:%M"),
            impact: event_impact(&article.headline),
            url: or_default(&article.url, "#"),
        })
        .collect();

    Some(TradingNewsResponse {
        daily_insight,
        risk_reminder,
        market_events,
        top_news,
    })
}

pub async fn get_news(State(state): State<AppState>) -> ApiResult<TradingNewsResponse> {
    let articles = state.finnhub.market_news().await?;
    let news = build_news(&articles, Utc::now())
        .ok_or_else(|| AppError::Upstream("Failed to fetch market news".to_string()))?;
    Ok(Json(news))
}

pub async fn get_company_news(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<Vec<NewsArticle>> {
    let to = Utc::now().date_naive();
    let from = to - Duration::days(COMPANY_NEWS_DAYS);

    let articles = state
        .finnhub
        .company_news(&symbol.to_ascii_uppercase(), from, to)
        .await?;
    Ok(Json(articles.iter().map(to_article).collect()))
}
