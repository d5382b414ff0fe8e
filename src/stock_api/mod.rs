pub mod types;
pub mod utils;
pub mod technical_indicators;
pub mod support_resistance;
pub mod structure;
pub mod market_context;
pub mod risk_rules;
pub mod risk_analysis;
pub mod narrative;
pub mod http_client;
pub mod chat_narrator;
pub mod overview;
pub mod pipeline;

pub use types::*;
#[allow(unused_imports)]
pub use utils::*;
pub use technical_indicators::*;
pub use support_resistance::*;
pub use structure::*;
pub use market_context::*;
pub use risk_rules::{evaluate_rules, RiskRule, RiskSignals, RuleOutcome, BASE_RISK_SCORE, NO_SIGNAL_FACTOR, RISK_RULES};
pub use risk_analysis::*;
pub use narrative::{fallback_narrative, generate_narrative, resolve_narrative, NarrativePrompt, NarrativeProvider};
pub use chat_narrator::ChatNarrator;
pub use overview::OverviewReport;
pub use pipeline::*;
