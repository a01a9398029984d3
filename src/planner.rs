use crate::error::{Error, Result};
use crate::types::{Action, Command, CommandPlan, Intent, Risk};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    env,
    io::Write,
    path::{Path, PathBuf},
    process::{Command as Process, Stdio},
};

pub const MAX_COMMANDS: usize = 8;
pub const DEFAULT_SEARCH_ENGINE: &str = "https://google.com/search?q=%s";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanPayload {
    #[serde(default)]
    intent: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    cwd: String,
    #[serde(default)]
    commands: Vec<CommandPayload>,
    #[serde(default)]
    questions: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CommandPayload {
    #[serde(default)]
    cmd: String,
    #[serde(default)]
    risk: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IntentPayload {
    action: String,
    #[serde(default)]
    args: HashMap<String, String>,
    #[serde(default)]
    risk: Option<String>,
}

/// Decode a plan payload, rejecting unknown fields, then validate it.
/// Nothing is returned unless the whole plan is valid.
pub fn parse_strict(input: &str) -> Result<CommandPlan> {
    let payload: PlanPayload = serde_json::from_str(input.trim())?;
    validate_plan(payload)
}

fn validate_plan(payload: PlanPayload) -> Result<CommandPlan> {
    if payload.intent.trim().is_empty() {
        return Err(Error::InvalidPlan("missing intent".into()));
    }
    if payload.commands.is_empty() && payload.questions.is_empty() {
        return Err(Error::InvalidPlan(
            "plan must have commands or questions".into(),
        ));
    }
    if payload.commands.len() > MAX_COMMANDS {
        return Err(Error::InvalidPlan(format!(
            "too many commands (max {})",
            MAX_COMMANDS
        )));
    }

    let cwd = match payload.cwd.trim() {
        "" => None,
        dir if Path::new(dir).is_absolute() => Some(PathBuf::from(dir)),
        dir => {
            return Err(Error::InvalidPlan(format!(
                "working directory must be absolute: {}",
                dir
            )))
        }
    };

    let mut commands = Vec::with_capacity(payload.commands.len());
    for (i, cmd) in payload.commands.into_iter().enumerate() {
        if cmd.cmd.trim().is_empty() {
            return Err(Error::InvalidPlan(format!("command {} is empty", i + 1)));
        }
        let risk = match cmd.risk.as_str() {
            "low" => Risk::Low,
            "medium" => Risk::Medium,
            "high" => Risk::High,
            other => {
                return Err(Error::InvalidPlan(format!(
                    "command {} has invalid risk: {:?}",
                    i + 1,
                    other
                )))
            }
        };
        commands.push(Command { cmd: cmd.cmd, risk });
    }

    Ok(CommandPlan {
        intent: payload.intent,
        summary: payload.summary,
        cwd,
        commands,
        questions: payload.questions,
    })
}

/// Decode an intent payload `{action, args, risk}`. The action must be
/// known, its required argument present, and a declared risk one of
/// `low|medium|high`.
pub fn parse_intent(input: &str) -> Result<Intent> {
    let payload: IntentPayload = serde_json::from_str(input.trim())?;
    let action: Action = payload.action.parse()?;
    let risk = match payload.risk.as_deref() {
        None | Some("") => None,
        Some("low") => Some(Risk::Low),
        Some("medium") => Some(Risk::Medium),
        Some("high") => Some(Risk::High),
        Some(other) => {
            return Err(Error::InvalidPlan(format!(
                "intent has invalid risk: {:?}",
                other
            )))
        }
    };

    let intent = Intent {
        action,
        args: payload.args,
        risk,
    };
    intent.validate()?;
    Ok(intent)
}

/// What a planner answered with.
#[derive(Debug, Clone, PartialEq)]
pub enum Inferred {
    Plan(CommandPlan),
    Intent(Intent),
}

/// Single-command plan for a routed intent. Never fails: actions without a
/// mapping produce a diagnostic `echo`.
pub fn from_intent(intent: &Intent, search_engine: &str) -> CommandPlan {
    let cmd = match intent.action {
        Action::OpenUrl => format!("open {}", shell_quote(intent.arg("url"))),
        Action::OpenApp => format!("open -a {}", shell_quote(intent.arg("app"))),
        Action::Search => {
            let engine = if search_engine.is_empty() {
                DEFAULT_SEARCH_ENGINE
            } else {
                search_engine
            };
            let query: String =
                url::form_urlencoded::byte_serialize(intent.arg("query").as_bytes()).collect();
            format!("open {}", shell_quote(&engine.replacen("%s", &query, 1)))
        }
        Action::RunShell => intent.arg("command").to_string(),
        other => format!("echo 'Unknown action: {}'", other),
    };

    CommandPlan {
        intent: intent.action.to_string(),
        summary: format!("Execute {}", intent.action),
        cwd: None,
        commands: vec![Command::new(cmd, intent.risk.unwrap_or(Risk::Low))],
        questions: Vec::new(),
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// What a planner is told about the environment it plans for.
#[derive(Debug, Clone, Serialize)]
pub struct PlanContext {
    pub cwd: String,
    pub shell: String,
    pub os: String,
}

impl PlanContext {
    pub fn current() -> Self {
        Self {
            cwd: env::current_dir()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|_| ".".to_string()),
            shell: env::var("SHELL").unwrap_or_else(|_| "sh".to_string()),
            os: env::consts::OS.to_string(),
        }
    }
}

/// External collaborator that turns free text into a plan payload.
pub trait PlanProvider {
    fn infer(&self, input: &str, context: &PlanContext) -> Result<String>;
}

/// Ask the provider and strictly decode its reply. A reply object with an
/// `action` field is an intent, anything else must be a full plan.
pub fn infer(
    provider: &dyn PlanProvider,
    input: &str,
    context: &PlanContext,
) -> Result<Inferred> {
    let payload = provider.infer(input, context)?;
    let is_intent = serde_json::from_str::<serde_json::Value>(payload.trim())
        .map(|v| v.get("action").is_some())
        .unwrap_or(false);

    let inferred = if is_intent {
        parse_intent(&payload).map(Inferred::Intent)
    } else {
        parse_strict(&payload).map(Inferred::Plan)
    };
    inferred.map_err(|e| {
        log::warn!("planner output rejected: {}", e);
        e
    })
}

#[derive(Serialize)]
struct PlanRequest<'a> {
    input: &'a str,
    #[serde(flatten)]
    context: &'a PlanContext,
}

/// Runs a user-configured program: request JSON on stdin, plan JSON on stdout.
pub struct CommandProvider {
    program: String,
}

impl CommandProvider {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl PlanProvider for CommandProvider {
    fn infer(&self, input: &str, context: &PlanContext) -> Result<String> {
        let request = serde_json::to_string(&PlanRequest { input, context })?;
        log::debug!("planner: invoking {}", self.program);

        let mut child = Process::new("sh")
            .arg("-c")
            .arg(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Provider(format!("cannot start {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(request.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(Error::Provider(format!(
                "{} exited with {} (stderr: {})",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(Error::Provider(format!(
                "{} returned an empty response (stderr: {})",
                self.program,
                stderr.trim()
            )));
        }
        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "intent": "setup_nextjs",
        "summary": "Create app",
        "cwd": "/tmp",
        "commands": [{"cmd": "echo hello", "risk": "low"}],
        "questions": []
    }"#;

    #[test]
    fn parses_a_valid_plan() {
        let plan = parse_strict(VALID).unwrap();
        assert_eq!(plan.intent, "setup_nextjs");
        assert_eq!(plan.cwd, Some(PathBuf::from("/tmp")));
        assert_eq!(plan.commands, vec![Command::new("echo hello", Risk::Low)]);
    }

    #[test]
    fn rejects_unknown_fields() {
        let top = r#"{"intent": "bad", "extra_field": "x", "commands": [{"cmd": "ls", "risk": "low"}]}"#;
        assert!(matches!(parse_strict(top), Err(Error::PlanJson(_))));

        let nested = r#"{"intent": "bad", "commands": [{"cmd": "ls", "risk": "low", "why": "x"}]}"#;
        assert!(matches!(parse_strict(nested), Err(Error::PlanJson(_))));
    }

    #[test]
    fn rejects_structural_violations() {
        let cases = [
            r#"{"commands": [{"cmd": "ls", "risk": "low"}]}"#,
            r#"{"intent": "empty"}"#,
            r#"{"intent": "empty", "commands": [], "questions": []}"#,
            r#"{"intent": "blank", "commands": [{"cmd": "   ", "risk": "low"}]}"#,
            r#"{"intent": "risk", "commands": [{"cmd": "ls", "risk": "critical"}]}"#,
            r#"{"intent": "risk", "commands": [{"cmd": "ls"}]}"#,
            r#"{"intent": "rel", "cwd": "src", "commands": [{"cmd": "ls", "risk": "low"}]}"#,
        ];
        for input in cases {
            assert!(
                matches!(parse_strict(input), Err(Error::InvalidPlan(_))),
                "expected rejection: {}",
                input
            );
        }
    }

    #[test]
    fn rejects_more_than_eight_commands() {
        let commands: Vec<String> = (1..=9)
            .map(|i| format!(r#"{{"cmd": "echo {}", "risk": "low"}}"#, i))
            .collect();
        let input = format!(r#"{{"intent": "flood", "commands": [{}]}}"#, commands.join(","));
        assert!(matches!(parse_strict(&input), Err(Error::InvalidPlan(_))));

        let eight = format!(
            r#"{{"intent": "ok", "commands": [{}]}}"#,
            commands[..8].join(",")
        );
        assert_eq!(parse_strict(&eight).unwrap().commands.len(), 8);
    }

    #[test]
    fn questions_only_plan_is_valid() {
        let plan = parse_strict(r#"{"intent": "clarify", "questions": ["Which directory?"]}"#)
            .unwrap();
        assert!(plan.commands.is_empty());
        assert_eq!(plan.questions, vec!["Which directory?".to_string()]);
        assert_eq!(plan.cwd, None);
    }

    #[test]
    fn intent_conversion() {
        let plan = from_intent(
            &Intent::new(Action::OpenUrl, "url", "https://github.com"),
            DEFAULT_SEARCH_ENGINE,
        );
        assert_eq!(plan.commands, vec![Command::new("open 'https://github.com'", Risk::Low)]);
        assert_eq!(plan.intent, "open_url");

        let plan = from_intent(
            &Intent::new(Action::OpenApp, "app", "/Applications/Safari.app"),
            DEFAULT_SEARCH_ENGINE,
        );
        assert_eq!(plan.commands[0].cmd, "open -a '/Applications/Safari.app'");

        let mut shell = Intent::new(Action::RunShell, "command", "ls -la");
        shell.risk = Some(Risk::Medium);
        let plan = from_intent(&shell, DEFAULT_SEARCH_ENGINE);
        assert_eq!(plan.commands, vec![Command::new("ls -la", Risk::Medium)]);
    }

    #[test]
    fn search_encodes_query_into_template() {
        let intent = Intent::new(Action::Search, "query", "rust & cargo");
        let plan = from_intent(&intent, "https://duckduckgo.com/?q=%s");
        assert_eq!(
            plan.commands[0].cmd,
            "open 'https://duckduckgo.com/?q=rust+%26+cargo'"
        );

        let plan = from_intent(&intent, "");
        assert_eq!(
            plan.commands[0].cmd,
            "open 'https://google.com/search?q=rust+%26+cargo'"
        );
    }

    #[test]
    fn unmapped_action_is_a_diagnostic_echo() {
        let intent = Intent::new(Action::FileFind, "pattern", "*.rs");
        let plan = from_intent(&intent, DEFAULT_SEARCH_ENGINE);
        assert_eq!(plan.commands[0].cmd, "echo 'Unknown action: file_find'");
    }

    #[test]
    fn quotes_are_escaped() {
        let plan = from_intent(
            &Intent::new(Action::OpenUrl, "url", "https://x.com/it's"),
            DEFAULT_SEARCH_ENGINE,
        );
        assert_eq!(plan.commands[0].cmd, r"open 'https://x.com/it'\''s'");
    }

    struct Canned(&'static str);

    impl PlanProvider for Canned {
        fn infer(&self, _input: &str, _context: &PlanContext) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn provider_output_is_strictly_parsed() {
        let ctx = PlanContext::current();
        assert!(matches!(
            infer(&Canned(VALID), "make an app", &ctx),
            Ok(Inferred::Plan(_))
        ));
        assert!(infer(&Canned("Sure! here you go"), "make an app", &ctx).is_err());
    }

    #[test]
    fn provider_may_answer_with_an_intent() {
        let reply = Canned(
            r#"{"action": "run_shell", "args": {"command": "make deploy"}, "risk": "medium"}"#,
        );
        match infer(&reply, "deploy it", &PlanContext::current()).unwrap() {
            Inferred::Intent(intent) => {
                assert_eq!(intent.action, Action::RunShell);
                assert_eq!(intent.arg("command"), "make deploy");
                assert_eq!(intent.risk, Some(Risk::Medium));
            }
            other => panic!("expected an intent, got {:?}", other),
        }
    }

    #[test]
    fn intent_payload_is_strict() {
        assert!(matches!(
            parse_intent(r#"{"action": "launch_rocket"}"#),
            Err(Error::UnknownAction(_))
        ));
        assert!(matches!(
            parse_intent(r#"{"action": "open_url", "args": {}}"#),
            Err(Error::MissingArgument { arg: "url", .. })
        ));
        assert!(matches!(
            parse_intent(r#"{"action": "search", "args": {"query": "x"}, "why": "y"}"#),
            Err(Error::PlanJson(_))
        ));
        assert!(matches!(
            parse_intent(r#"{"action": "search", "args": {"query": "x"}, "risk": "severe"}"#),
            Err(Error::InvalidPlan(_))
        ));

        let intent = parse_intent(r#"{"action": "git_helper"}"#).unwrap();
        assert_eq!(intent.risk, None);
        assert_eq!(
            from_intent(&intent, DEFAULT_SEARCH_ENGINE).commands[0].cmd,
            "echo 'Unknown action: git_helper'"
        );
    }

    #[test]
    fn command_provider_round_trip() {
        let provider = CommandProvider::new(
            r#"cat >/dev/null; echo '{"intent":"t","commands":[{"cmd":"pwd","risk":"low"}]}'"#,
        );
        let inferred = infer(&provider, "where am i", &PlanContext::current()).unwrap();
        match inferred {
            Inferred::Plan(plan) => assert_eq!(plan.commands[0].cmd, "pwd"),
            other => panic!("expected a plan, got {:?}", other),
        }

        let failing = CommandProvider::new("cat >/dev/null; exit 3");
        assert!(matches!(
            failing.infer("x", &PlanContext::current()),
            Err(Error::Provider(_))
        ));
    }
}
