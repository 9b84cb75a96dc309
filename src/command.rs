// Command Parser
// Free text ("Bill: OpenAI 5000 GYD admin software") -> typed intent

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Line label used when the command carries no trailing text
pub const DEFAULT_DESCRIPTION: &str = "Expense";

static BILL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^bill:\s*(\S.*?)\s+([0-9]+(?:\.[0-9]+)?)\s*(?:(gyd|usd|gy|us)\b)?\s*(.*)$")
        .expect("bill pattern is a valid regex")
});

// ============================================================================
// CORE TYPES
// ============================================================================

/// Currency - Only the two currencies the webhook understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Gyd,
    Usd,
}

impl Currency {
    /// Normalize a currency token. "GY..." -> GYD, "US..." -> USD, anything else -> GYD.
    pub fn from_token(token: Option<&str>) -> Self {
        let upper = token.unwrap_or_default().trim().to_uppercase();
        if upper.starts_with("US") {
            Currency::Usd
        } else {
            Currency::Gyd
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Gyd => "GYD",
            Currency::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// BillIntent - A vendor bill request extracted from command text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillIntent {
    pub vendor: String,
    /// Non-negative and finite
    pub amount: f64,
    pub currency: Currency,
    pub description: String,
}

/// CommandIntent - Output of parsing one command
///
/// Serialized with a `kind` tag so it can be echoed back to the caller:
/// `{"kind":"bill","vendor":"OpenAI",...}` or `{"kind":"unknown","raw":"..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CommandIntent {
    Bill(BillIntent),
    Unknown { raw: String },
}

impl CommandIntent {
    /// Parse free text into an intent. Never fails: unrecognized text is `Unknown`.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();

        let Some(caps) = BILL_PATTERN.captures(trimmed) else {
            return CommandIntent::Unknown {
                raw: trimmed.to_string(),
            };
        };

        let amount = match caps[2].parse::<f64>() {
            Ok(value) if f64::is_finite(value) => value,
            _ => {
                return CommandIntent::Unknown {
                    raw: trimmed.to_string(),
                }
            }
        };

        let description = caps
            .get(4)
            .map(|m| m.as_str().trim())
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_DESCRIPTION);

        CommandIntent::Bill(BillIntent {
            vendor: caps[1].trim().to_string(),
            amount,
            currency: Currency::from_token(caps.get(3).map(|m| m.as_str())),
            description: description.to_string(),
        })
    }

    /// The bill payload, if this is a bill command
    pub fn as_bill(&self) -> Option<&BillIntent> {
        match self {
            CommandIntent::Bill(bill) => Some(bill),
            CommandIntent::Unknown { .. } => None,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
