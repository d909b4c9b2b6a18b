//! Classification rules and the two-pass description classifier.

use serde::Deserialize;
use tracing::debug;

/// Amount comparisons tolerate floating rounding in statement exports.
const AMOUNT_EPSILON: f64 = 0.01;

/// A description pattern. In YAML a bare string is a single token; a list of
/// strings requires every token to be present.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Pattern {
    Token(String),
    AllOf(Vec<String>),
}

impl Pattern {
    /// Case-insensitive containment check against a pre-lowercased
    /// description. `AllOf` tokens are order-independent.
    fn matches(&self, description_lower: &str) -> bool {
        match self {
            Pattern::Token(token) => {
                !token.is_empty() && description_lower.contains(&token.to_lowercase())
            }
            Pattern::AllOf(tokens) => {
                !tokens.is_empty()
                    && tokens
                        .iter()
                        .all(|t| description_lower.contains(&t.to_lowercase()))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValueCondition {
    pub amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MutualFundSpec {
    pub fund_house: String,
    pub amfi_scheme_code: String,
    #[serde(default)]
    pub price_determine: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    /// Destination account path, colon-delimited.
    pub account: String,
    #[serde(default)]
    pub patterns: Vec<Pattern>,
    #[serde(default)]
    pub value_conditions: Vec<ValueCondition>,
    #[serde(default)]
    pub mutual_fund: Option<MutualFundSpec>,
}

impl Rule {
    fn pattern_matches(&self, description_lower: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(description_lower))
    }

    fn amount_matches(&self, amount: f64) -> bool {
        self.value_conditions
            .iter()
            .any(|c| (c.amount - amount).abs() < AMOUNT_EPSILON)
    }
}

/// Selects the best-matching rule for a transaction.
///
/// Pass 1 considers only rules carrying value conditions: a pattern must
/// match and some condition amount must be within epsilon of the transaction
/// amount. Rules with an exact expected amount are higher-confidence signals
/// and out-rank generic keyword rules even when the keywords also appear.
/// Pass 2 falls back to pattern-only rules. Within each pass the first rule
/// in declaration order wins, so rule authors control priority by ordering.
pub fn classify<'a>(description: &str, amount: f64, rules: &'a [Rule]) -> Option<&'a Rule> {
    let description_lower = description.to_lowercase();

    let valued = rules
        .iter()
        .filter(|r| !r.value_conditions.is_empty())
        .find(|r| r.pattern_matches(&description_lower) && r.amount_matches(amount));
    if let Some(rule) = valued {
        debug!(account = %rule.account, "Matched value-conditioned rule");
        return Some(rule);
    }

    let keyword = rules
        .iter()
        .filter(|r| r.value_conditions.is_empty())
        .find(|r| r.pattern_matches(&description_lower));
    if let Some(rule) = keyword {
        debug!(account = %rule.account, "Matched keyword rule");
    }
    keyword
}
