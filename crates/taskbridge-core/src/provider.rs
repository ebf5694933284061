//! Supported external project-management tools.

use serde::{Deserialize, Serialize};

/// An external PM tool a connector can talk to.
///
/// The wire contract is the same for every provider; the variant is carried
/// for display, linking (`external_source` on records), and configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Jira,
    Asana,
    Linear,
    Trello,
    ClickUp,
    Notion,
}

impl Provider {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Jira => "jira",
            Provider::Asana => "asana",
            Provider::Linear => "linear",
            Provider::Trello => "trello",
            Provider::ClickUp => "clickup",
            Provider::Notion => "notion",
        }
    }

    /// All supported providers.
    #[must_use]
    pub fn all() -> &'static [Provider] {
        &[
            Provider::Jira,
            Provider::Asana,
            Provider::Linear,
            Provider::Trello,
            Provider::ClickUp,
            Provider::Notion,
        ]
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jira" => Ok(Provider::Jira),
            "asana" => Ok(Provider::Asana),
            "linear" => Ok(Provider::Linear),
            "trello" => Ok(Provider::Trello),
            "clickup" => Ok(Provider::ClickUp),
            "notion" => Ok(Provider::Notion),
            _ => Err(format!("Unknown provider: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_roundtrip() {
        for provider in Provider::all() {
            let parsed: Provider = provider.as_str().parse().unwrap();
            assert_eq!(*provider, parsed);
        }
    }

    #[test]
    fn test_provider_invalid() {
        let result: Result<Provider, _> = "basecamp".parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_provider_serde_snake_case() {
        let json = serde_json::to_string(&Provider::ClickUp).unwrap();
        assert_eq!(json, "\"click_up\"");
    }
}
