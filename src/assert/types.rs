use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssertType {
    Visible,
    Hidden,
    Text,
    ContainsText,
    Value,
    Checked,
    Unchecked,
    Enabled,
    Disabled,
    DataQuery,
    ApiRequest,
}

impl AssertType {
    pub const ALL: [AssertType; 11] = [
        AssertType::Visible,
        AssertType::Hidden,
        AssertType::Text,
        AssertType::ContainsText,
        AssertType::Value,
        AssertType::Checked,
        AssertType::Unchecked,
        AssertType::Enabled,
        AssertType::Disabled,
        AssertType::DataQuery,
        AssertType::ApiRequest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssertType::Visible => "VISIBLE",
            AssertType::Hidden => "HIDDEN",
            AssertType::Text => "TEXT",
            AssertType::ContainsText => "CONTAINS_TEXT",
            AssertType::Value => "VALUE",
            AssertType::Checked => "CHECKED",
            AssertType::Unchecked => "UNCHECKED",
            AssertType::Enabled => "ENABLED",
            AssertType::Disabled => "DISABLED",
            AssertType::DataQuery => "DATA_QUERY",
            AssertType::ApiRequest => "API_REQUEST",
        }
    }

    /// Types whose click opens the input surface instead of emitting at once.
    pub fn requires_input(&self) -> bool {
        matches!(
            self,
            AssertType::Text
                | AssertType::ContainsText
                | AssertType::Value
                | AssertType::DataQuery
                | AssertType::ApiRequest
        )
    }
}

impl std::fmt::Display for AssertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssertType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim().to_ascii_uppercase().replace('-', "_");
        AssertType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| format!("unknown assert type '{}'", raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_types() {
        let needing: Vec<_> = AssertType::ALL
            .iter()
            .filter(|kind| kind.requires_input())
            .map(AssertType::as_str)
            .collect();
        assert_eq!(
            needing,
            vec!["TEXT", "CONTAINS_TEXT", "VALUE", "DATA_QUERY", "API_REQUEST"]
        );
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!("contains-text".parse::<AssertType>(), Ok(AssertType::ContainsText));
        assert_eq!(
            serde_json::to_string(&AssertType::ApiRequest).unwrap(),
            "\"API_REQUEST\""
        );
        assert!("SOMETIMES".parse::<AssertType>().is_err());
    }
}
