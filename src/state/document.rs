use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use super::DecodeError;

/// Schema version written into every document.
pub const FORMAT_VERSION: u32 = 1;

/// Source shown when neither a link nor a saved session is available.
pub const DEFAULT_DIAGRAM_CODE: &str = "sequenceDiagram
  participant Alice
  participant Bob
  Alice->>Bob: Hello Bob, how are you?
  Bob-->>Alice: I'm good thanks!
  Alice->>Bob: Do you know about Mermaid?
  Bob-->>Alice: Yes! It's what we're using now!";

/// Rendering theme. The set is closed; unknown names are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    Base,
    #[default]
    Default,
    Dark,
    Forest,
    Neutral,
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported theme value: {0:?}")]
pub struct UnsupportedThemeValue(pub String);

impl Theme {
    pub const ALL: [Self; 6] = [
        Self::Base,
        Self::Default,
        Self::Dark,
        Self::Forest,
        Self::Neutral,
        Self::Null,
    ];

    /// Themes offered by the theme switcher.
    pub const SELECTABLE: [Self; 4] = [Self::Default, Self::Dark, Self::Forest, Self::Neutral];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Default => "default",
            Self::Dark => "dark",
            Self::Forest => "forest",
            Self::Neutral => "neutral",
            Self::Null => "null",
        }
    }

    /// The next theme in the switcher order. Themes outside the switcher
    /// restart the cycle.
    pub fn next_selectable(self) -> Self {
        Self::SELECTABLE
            .iter()
            .position(|t| *t == self)
            .map_or(Self::SELECTABLE[0], |i| {
                Self::SELECTABLE[(i + 1) % Self::SELECTABLE.len()]
            })
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = UnsupportedThemeValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnsupportedThemeValue(s.to_string()))
    }
}

/// The persisted and shareable unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramDocument {
    pub source_text: String,
    pub theme: Theme,
    pub format_version: u32,
}

impl DiagramDocument {
    pub fn new(source_text: impl Into<String>, theme: Theme) -> Self {
        Self {
            source_text: source_text.into(),
            theme,
            format_version: FORMAT_VERSION,
        }
    }

    /// Serialize to the wire JSON shape.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&WireDocument {
            mermaid_code: &self.source_text,
            settings: WireSettings {
                theme: self.theme.as_str(),
            },
            app_version: self.format_version,
        })
    }

    /// Parse the wire JSON shape.
    ///
    /// `fallback_theme` is used when the payload has no theme or carries
    /// one outside the supported set; the rest of the payload is still
    /// adopted.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Json`] for malformed JSON and
    /// [`DecodeError::Schema`] when required fields are missing or mistyped.
    pub fn from_json(json: &str, fallback_theme: Theme) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(json)?;
        let Value::Object(root) = value else {
            return Err(DecodeError::Schema("document is not an object".into()));
        };

        let source_text = match root.get("mermaidCode") {
            Some(Value::String(code)) => code.clone(),
            Some(_) => return Err(DecodeError::Schema("mermaidCode is not a string".into())),
            None => return Err(DecodeError::Schema("mermaidCode is missing".into())),
        };

        let theme = match root.get("settings") {
            None | Some(Value::Null) => fallback_theme,
            Some(Value::Object(settings)) => match settings.get("theme") {
                Some(Value::String(name)) => name.parse().unwrap_or_else(|err| {
                    tracing::warn!(%err, fallback = %fallback_theme, "ignoring theme");
                    fallback_theme
                }),
                _ => fallback_theme,
            },
            Some(_) => return Err(DecodeError::Schema("settings is not an object".into())),
        };

        let format_version = match root.get("appVersion") {
            None | Some(Value::Null) => FORMAT_VERSION,
            Some(v) => v
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| DecodeError::Schema("appVersion is not an integer".into()))?,
        };

        Ok(Self {
            source_text,
            theme,
            format_version,
        })
    }
}

#[derive(Serialize)]
struct WireDocument<'a> {
    #[serde(rename = "mermaidCode")]
    mermaid_code: &'a str,
    settings: WireSettings<'a>,
    #[serde(rename = "appVersion")]
    app_version: u32,
}

#[derive(Serialize)]
struct WireSettings<'a> {
    theme: &'a str,
}
