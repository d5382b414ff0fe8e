//! Narrative commentary for a verdict.
//!
//! Text generation itself is delegated to a [`NarrativeProvider`]; this module only builds the
//! prompt and turns the provider's outcome into an [`LlmAnalysis`] section, substituting a fixed
//! fallback when the provider fails or returns nothing.

use std::future::Future;

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::types::{IndicatorSet, LlmAnalysis, PriceSeries};
use super::utils::round_to;
use crate::config::AnalysisConfig;

pub const ANALYSIS_TYPE: &str = "AI analysis";

const ANALYSIS_QUESTIONS: [&str; 4] = [
    "Overall trend assessment",
    "Key support and resistance levels",
    "Short-term investment advice",
    "Risk points to watch",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptPoint {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptIndicators {
    pub rsi: Option<f64>,
    pub ma5: Option<f64>,
    pub ma20: Option<f64>,
    /// Annualized volatility as a percent string, e.g. `"23.41%"`.
    pub volatility: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrativePrompt {
    pub recent: Vec<PromptPoint>,
    pub indicators: PromptIndicators,
}

impl NarrativePrompt {
    pub fn build(series: &PriceSeries, indicators: &IndicatorSet, config: &AnalysisConfig) -> Self {
        let recent = series
            .tail(config.narrative_recent_points)
            .iter()
            .map(|p| PromptPoint {
                date: p.date.to_string(),
                open: round_to(p.open, 2),
                high: round_to(p.high, 2),
                low: round_to(p.low, 2),
                close: round_to(p.close, 2),
                volume: p.volume,
            })
            .collect();

        let volatility = if indicators.volatility > 0.0 {
            Some(format!("{:.2}%", indicators.volatility * 100.0))
        } else {
            None
        };

        Self {
            recent,
            indicators: PromptIndicators {
                rsi: indicators.latest_rsi().map(|v| round_to(v, 2)),
                ma5: indicators.latest_moving_average(5).map(|v| round_to(v, 2)),
                ma20: indicators.latest_moving_average(20).map(|v| round_to(v, 2)),
                volatility,
            },
        }
    }

    pub fn render(&self) -> String {
        let data = serde_json::to_string_pretty(&self.recent).unwrap_or_else(|_| "[]".to_string());
        let indicators = serde_json::to_string_pretty(&json!({
            "RSI": self.indicators.rsi,
            "MA5": self.indicators.ma5,
            "MA20": self.indicators.ma20,
            "volatility": self.indicators.volatility,
        }))
        .unwrap_or_else(|_| "{}".to_string());

        let questions: Vec<String> = ANALYSIS_QUESTIONS
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{}. {}", i + 1, q))
            .collect();

        format!(
            "As a professional stock analyst, analyze this stock based on the data below.\n\n\
             Recent price data:\n{}\n\n\
             Technical indicators:\n{}\n\n\
             Please cover:\n{}\n\n\
             Support each point with concrete figures.",
            data,
            indicators,
            questions.join("\n")
        )
    }
}

/// Opaque text generator behind the narrative section.
pub trait NarrativeProvider {
    fn model(&self) -> &str;

    fn generate(&self, prompt: &NarrativePrompt) -> impl Future<Output = anyhow::Result<String>> + Send;
}

pub fn fallback_narrative(config: &AnalysisConfig) -> LlmAnalysis {
    LlmAnalysis {
        llm_analysis: config.narrative_fallback.clone(),
        analysis_type: ANALYSIS_TYPE.to_string(),
        model: config.narrative_model.clone(),
    }
}

/// Turns a provider outcome into the narrative section; errors and blank text use the fallback.
pub fn resolve_narrative(outcome: anyhow::Result<String>, model: &str, config: &AnalysisConfig) -> LlmAnalysis {
    match outcome {
        Ok(text) if !text.trim().is_empty() => LlmAnalysis {
            llm_analysis: text,
            analysis_type: ANALYSIS_TYPE.to_string(),
            model: model.to_string(),
        },
        Ok(_) => {
            warn!(model, "narrative provider returned empty text, using fallback");
            LlmAnalysis {
                model: model.to_string(),
                ..fallback_narrative(config)
            }
        }
        Err(e) => {
            warn!(model, "narrative provider failed: {:#}", e);
            LlmAnalysis {
                model: model.to_string(),
                ..fallback_narrative(config)
            }
        }
    }
}

pub async fn generate_narrative<P: NarrativeProvider>(
    provider: &P,
    series: &PriceSeries,
    indicators: &IndicatorSet,
    config: &AnalysisConfig,
) -> LlmAnalysis {
    let prompt = NarrativePrompt::build(series, indicators, config);
    info!(model = provider.model(), points = prompt.recent.len(), "requesting narrative");
    let outcome = provider.generate(&prompt).await;
    resolve_narrative(outcome, provider.model(), config)
}
