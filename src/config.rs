//! Rules file loading: classification rules, fund house map, and optional
//! calendar/account overrides.

use crate::calendar::TradingCalendar;
use crate::error::ConvertError;
use crate::rules::Rule;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::{fs, path::Path};
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct FundHouse {
    /// Feed-specific fund house number used in NAV history queries.
    pub mf_number: u32,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

/// Holiday overrides. When present this replaces the built-in calendar
/// entirely, so a config must list everything it needs.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    #[serde(default)]
    pub fixed: Vec<MonthDay>,
    #[serde(default)]
    pub years: HashMap<i32, Vec<NaiveDate>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountsConfig {
    #[serde(default = "default_source_account")]
    pub source: String,
    #[serde(default = "default_unclassified_account")]
    pub unclassified: String,
    #[serde(default = "default_stamp_duty_account")]
    pub stamp_duty: String,
}

fn default_source_account() -> String {
    "Assets:Current Assets:Savings".to_string()
}

fn default_unclassified_account() -> String {
    "Expenses:Unknown".to_string()
}

fn default_stamp_duty_account() -> String {
    "Expenses:Stamp Duty".to_string()
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            source: default_source_account(),
            unclassified: default_unclassified_account(),
            stamp_duty: default_stamp_duty_account(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub base_url: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://portal.amfiindia.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub mutual_funds: HashMap<String, FundHouse>,
    #[serde(default)]
    pub calendar: Option<CalendarConfig>,
    #[serde(default)]
    pub accounts: AccountsConfig,
    #[serde(default)]
    pub feed: FeedConfig,
}

impl RulesConfig {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read rules file: {}", path.as_ref().display()))?;

        let config = Self::load_from_str(&config_str)
            .with_context(|| format!("Failed to load rules file: {}", path.as_ref().display()))?;
        debug!("Loaded {} rules", config.rules.len());
        Ok(config)
    }

    pub fn load_from_str(config_str: &str) -> Result<Self, ConvertError> {
        let config: Self = serde_yaml::from_str(config_str)
            .map_err(|e| ConvertError::RuleSetInvalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks beyond what serde enforces. Unresolvable fund
    /// houses only warn here; pricing for those rules is skipped at run
    /// time, not rejected.
    fn validate(&self) -> Result<(), ConvertError> {
        for (idx, rule) in self.rules.iter().enumerate() {
            if rule.account.trim().is_empty() {
                return Err(ConvertError::RuleSetInvalid(format!(
                    "rule {} has an empty account",
                    idx + 1
                )));
            }
            if rule.patterns.is_empty() {
                warn!(account = %rule.account, "Rule has no patterns and can never match");
            }
            if let Some(mf) = &rule.mutual_fund
                && !self.mutual_funds.contains_key(&mf.fund_house)
            {
                warn!(
                    fund_house = %mf.fund_house,
                    account = %rule.account,
                    "Fund house not found in mutual_funds mapping; pricing will be skipped"
                );
            }
        }
        Ok(())
    }

    /// Builds the trading calendar, preferring the config's override.
    pub fn trading_calendar(&self) -> TradingCalendar {
        match &self.calendar {
            None => TradingCalendar::default(),
            Some(cal) => {
                let fixed: HashSet<(u32, u32)> =
                    cal.fixed.iter().map(|md| (md.month, md.day)).collect();
                let years: HashMap<i32, HashSet<NaiveDate>> = cal
                    .years
                    .iter()
                    .map(|(year, dates)| (*year, dates.iter().copied().collect()))
                    .collect();
                TradingCalendar::new(fixed, years)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Pattern;

    const SAMPLE_RULES: &str = r#"
mutual_funds:
  PPFAS:
    mf_number: 64
    aliases: ["ppfas", "parag parikh"]
  UTI:
    mf_number: 28

rules:
  - account: "Income:Salary"
    patterns:
      - "salary"
    value_conditions:
      - amount: 85000
  - account: "Expenses:Utilities:Power"
    patterns:
      - ["electricity", "board"]
  - account: "Assets:Investments:PPFAS Flexi Cap"
    patterns:
      - "ppfas"
    mutual_fund:
      fund_house: "PPFAS"
      amfi_scheme_code: "122639"
      price_determine: true
"#;

    #[test]
    fn test_rules_deserialization() {
        let config = RulesConfig::load_from_str(SAMPLE_RULES).unwrap();

        assert_eq!(config.rules.len(), 3);
        assert_eq!(config.mutual_funds["PPFAS"].mf_number, 64);
        assert_eq!(config.mutual_funds["UTI"].aliases.len(), 0);

        assert!(matches!(config.rules[0].patterns[0], Pattern::Token(_)));
        assert_eq!(config.rules[0].value_conditions[0].amount, 85000.0);
        assert!(matches!(config.rules[1].patterns[0], Pattern::AllOf(_)));

        let mf = config.rules[2].mutual_fund.as_ref().unwrap();
        assert_eq!(mf.fund_house, "PPFAS");
        assert_eq!(mf.amfi_scheme_code, "122639");
        assert!(mf.price_determine);
    }

    #[test]
    fn test_default_accounts() {
        let config = RulesConfig::load_from_str(SAMPLE_RULES).unwrap();
        assert_eq!(config.accounts.source, "Assets:Current Assets:Savings");
        assert_eq!(config.accounts.unclassified, "Expenses:Unknown");
        assert_eq!(config.accounts.stamp_duty, "Expenses:Stamp Duty");
    }

    #[test]
    fn test_value_condition_without_amount_is_invalid() {
        let yaml = r#"
rules:
  - account: "Income:Salary"
    patterns: ["salary"]
    value_conditions:
      - note: "missing the amount key"
"#;
        let result = RulesConfig::load_from_str(yaml);
        assert!(matches!(result, Err(ConvertError::RuleSetInvalid(_))));
    }

    #[test]
    fn test_empty_account_is_invalid() {
        let yaml = r#"
rules:
  - account: ""
    patterns: ["salary"]
"#;
        let result = RulesConfig::load_from_str(yaml);
        assert!(matches!(result, Err(ConvertError::RuleSetInvalid(_))));
    }

    #[test]
    fn test_calendar_override() {
        let yaml = r#"
rules: []
calendar:
  fixed:
    - { month: 1, day: 1 }
  years:
    2025:
      - 2025-04-14
"#;
        let config = RulesConfig::load_from_str(yaml).unwrap();
        let calendar = config.trading_calendar();

        assert!(calendar.is_holiday(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()));
        assert!(calendar.is_holiday(NaiveDate::from_ymd_opt(2025, 4, 14).unwrap()));
        // Built-in defaults are replaced, not merged.
        assert!(!calendar.is_holiday(NaiveDate::from_ymd_opt(2025, 1, 26).unwrap()));
    }

    #[test]
    fn test_feed_defaults_to_amfi_portal() {
        let config = RulesConfig::load_from_str(SAMPLE_RULES).unwrap();
        assert_eq!(config.feed.base_url, "https://portal.amfiindia.com");

        let yaml = r#"
rules: []
feed:
  base_url: "http://localhost:8080"
"#;
        let config = RulesConfig::load_from_str(yaml).unwrap();
        assert_eq!(config.feed.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_default_calendar_when_section_absent() {
        let config = RulesConfig::load_from_str(SAMPLE_RULES).unwrap();
        let calendar = config.trading_calendar();
        assert!(calendar.is_holiday(NaiveDate::from_ymd_opt(2026, 1, 26).unwrap()));
    }
}
