use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CodepadError;

/// Language tag attached to every execution request.
///
/// Each tag maps to exactly one execution strategy. JavaScript appears twice:
/// `Script` evaluates in-process, `Sandboxed` evaluates in a disposable worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// JavaScript evaluated inside the calling process
    #[value(alias = "js-inline")]
    Script,
    /// JavaScript evaluated in an isolated worker process
    #[value(alias = "javascript", alias = "js")]
    Sandboxed,
    /// Python evaluated by the managed interpreter
    #[value(alias = "python", alias = "py")]
    Managed,
    /// Java compiled and run by the remote compile service
    #[value(alias = "java")]
    Compiled,
    /// HTML returned inside a document shell
    #[value(alias = "html")]
    Markup,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Script,
        Language::Sandboxed,
        Language::Managed,
        Language::Compiled,
        Language::Markup,
    ];

    /// Canonical tag, as accepted by `FromStr` and written in configuration.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Sandboxed => "sandboxed",
            Self::Managed => "managed",
            Self::Compiled => "compiled",
            Self::Markup => "markup",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Script => "JavaScript",
            Self::Sandboxed => "JavaScript (worker)",
            Self::Managed => "Python",
            Self::Compiled => "Java",
            Self::Markup => "HTML",
        }
    }

    /// Snippet a fresh editor for this language starts with.
    pub fn starter_snippet(&self) -> &'static str {
        match self {
            Self::Script | Self::Sandboxed => "console.log('hola');",
            Self::Managed => "print(\"¡Hola, mundo! 🚀\")",
            Self::Compiled => "System.out.println(\"Hola mundo\");",
            Self::Markup => "<h1>¡Ejecutando HTML!</h1>",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Language {
    type Err = CodepadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "script" | "js-inline" => Ok(Self::Script),
            "sandboxed" | "javascript" | "js" => Ok(Self::Sandboxed),
            "managed" | "python" | "py" => Ok(Self::Managed),
            "compiled" | "java" => Ok(Self::Compiled),
            "markup" | "html" => Ok(Self::Markup),
            _ => Err(CodepadError::UnsupportedLanguage {
                language: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("python".parse::<Language>().unwrap(), Language::Managed);
        assert_eq!("JavaScript".parse::<Language>().unwrap(), Language::Sandboxed);
        assert_eq!("js-inline".parse::<Language>().unwrap(), Language::Script);
        assert_eq!("java".parse::<Language>().unwrap(), Language::Compiled);
        assert_eq!(" html ".parse::<Language>().unwrap(), Language::Markup);
    }

    #[test]
    fn test_parse_unsupported() {
        for tag in ["ruby", "", "c++"] {
            match tag.parse::<Language>() {
                Err(CodepadError::UnsupportedLanguage { language }) => assert_eq!(language, tag),
                other => panic!("expected UnsupportedLanguage, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_tag_round_trip() {
        for language in Language::ALL {
            assert_eq!(language.tag().parse::<Language>().unwrap(), language);
        }
    }
}
