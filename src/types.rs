use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, path::PathBuf, str::FromStr};

/// Destructive potential of a command. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Low,
    Medium,
    High,
}

impl Risk {
    pub fn as_str(self) -> &'static str {
        match self {
            Risk::Low => "low",
            Risk::Medium => "medium",
            Risk::High => "high",
        }
    }

    /// Lenient parse used for configured thresholds: anything unrecognised is `Medium`.
    pub fn parse_lenient(s: &str) -> Risk {
        s.parse().unwrap_or(Risk::Medium)
    }
}

impl FromStr for Risk {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Risk::Low),
            "medium" => Ok(Risk::Medium),
            "high" => Ok(Risk::High),
            other => Err(format!("invalid risk: {}", other)),
        }
    }
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    OpenUrl,
    OpenApp,
    Search,
    RunShell,
    // Recognised names with no plan mapping of their own.
    FileFind,
    GitHelper,
    Ai,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::OpenUrl => "open_url",
            Action::OpenApp => "open_app",
            Action::Search => "search",
            Action::RunShell => "run_shell",
            Action::FileFind => "file_find",
            Action::GitHelper => "git_helper",
            Action::Ai => "ai",
        }
    }

    /// Argument key every intent of this action must carry.
    pub fn required_arg(self) -> Option<&'static str> {
        match self {
            Action::OpenUrl => Some("url"),
            Action::OpenApp => Some("app"),
            Action::Search => Some("query"),
            Action::RunShell => Some("command"),
            Action::FileFind | Action::GitHelper | Action::Ai => None,
        }
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "open_url" => Ok(Action::OpenUrl),
            "open_app" => Ok(Action::OpenApp),
            "search" => Ok(Action::Search),
            "run_shell" => Ok(Action::RunShell),
            "file_find" => Ok(Action::FileFind),
            "git_helper" => Ok(Action::GitHelper),
            "ai" => Ok(Action::Ai),
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: Action,
    pub args: HashMap<String, String>,
    pub risk: Option<Risk>,
}

impl Intent {
    pub fn new(action: Action, key: &str, value: impl Into<String>) -> Self {
        let mut args = HashMap::new();
        args.insert(key.to_string(), value.into());
        Self {
            action,
            args,
            risk: None,
        }
    }

    pub fn arg(&self, key: &str) -> &str {
        self.args.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn validate(&self) -> Result<()> {
        match self.action.required_arg() {
            Some(key) if self.arg(key).trim().is_empty() => Err(Error::MissingArgument {
                action: self.action.to_string(),
                arg: key,
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    pub cmd: String,
    pub risk: Risk,
}

impl Command {
    pub fn new(cmd: impl Into<String>, risk: Risk) -> Self {
        Self {
            cmd: cmd.into(),
            risk,
        }
    }

    /// Raise the risk to at least `risk`. Never lowers it.
    pub fn escalate(&mut self, risk: Risk) {
        self.risk = self.risk.max(risk);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandPlan {
    pub intent: String,
    pub summary: String,
    pub cwd: Option<PathBuf>,
    pub commands: Vec<Command>,
    pub questions: Vec<String>,
}

impl CommandPlan {
    /// Worst risk across all commands, `Low` for an empty plan.
    pub fn max_risk(&self) -> Risk {
        self.commands
            .iter()
            .map(|c| c.risk)
            .max()
            .unwrap_or(Risk::Low)
    }
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub input: String,
    pub success: bool,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub count: i64,
    pub last_used: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_is_totally_ordered() {
        assert!(Risk::Low < Risk::Medium);
        assert!(Risk::Medium < Risk::High);
        assert_eq!(Risk::parse_lenient("HIGH "), Risk::High);
        assert_eq!(Risk::parse_lenient("critical"), Risk::Medium);
        assert!("critical".parse::<Risk>().is_err());
    }

    #[test]
    fn escalate_never_lowers() {
        let mut cmd = Command::new("ls", Risk::High);
        cmd.escalate(Risk::Low);
        assert_eq!(cmd.risk, Risk::High);

        let mut cmd = Command::new("ls", Risk::Low);
        cmd.escalate(Risk::Medium);
        assert_eq!(cmd.risk, Risk::Medium);
    }

    #[test]
    fn unknown_action_is_an_input_error() {
        assert!(matches!(
            "launch_rocket".parse::<Action>(),
            Err(Error::UnknownAction(_))
        ));
        assert_eq!("git_helper".parse::<Action>().unwrap(), Action::GitHelper);
    }

    #[test]
    fn missing_required_argument() {
        let intent = Intent::new(Action::OpenUrl, "link", "https://example.com");
        assert!(matches!(
            intent.validate(),
            Err(Error::MissingArgument { arg: "url", .. })
        ));
        assert!(Intent::new(Action::Search, "query", "rust").validate().is_ok());
    }
}
