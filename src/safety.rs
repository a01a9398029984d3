use crate::error::{Error, Result};
use crate::types::{Action, CommandPlan, Intent, Risk};

// Substring matches. Obfuscated or separator-chained payloads can slip past
// these lists; they are a first line, not a shell parser.
const FORBIDDEN_PATTERNS: &[&str] = &[
    "rm -rf /",
    "rm -fr /",
    ":(){ :|:& };:",
    "> /dev/sd",
    "> /dev/disk",
    "of=/dev/sd",
    "of=/dev/disk",
    "mkfs",
];

const PROTECTED_PATH: &str = "/System";

const HIGH_RISK_KEYWORDS: &[&str] = &["sudo", "chmod -R", "chown -R", "mv /*", "rm /*"];

const SENSITIVE_PATHS: &[&str] = &["~/.ssh", "/etc", "/Library", "/var"];

const DESTRUCTIVE_PATTERNS: &[&str] = &[
    "rm -rf /",
    "rm -fr /",
    "--no-preserve-root",
    "mkfs",
    "dd if=",
    "diskutil erase",
];

const MUTATING_TOKENS: &[&str] = &["rm ", "sudo ", "chmod ", "chown ", "kill ", "mv ", "cp "];

/// Fail the plan on any forbidden command, then escalate risky ones to
/// `High`. Declared risk is never lowered.
pub fn validate_safety(plan: &mut CommandPlan) -> Result<()> {
    for (i, command) in plan.commands.iter_mut().enumerate() {
        match check_command(&command.cmd) {
            Err(reason) => {
                log::warn!("blocked command {}: {}", i + 1, reason);
                return Err(Error::UnsafeCommand {
                    index: i + 1,
                    reason,
                });
            }
            Ok(true) => {
                if command.risk != Risk::High {
                    log::debug!("escalating to high: {}", command.cmd);
                }
                command.escalate(Risk::High);
            }
            Ok(false) => {}
        }
    }
    Ok(())
}

/// `Err(reason)` when forbidden, `Ok(true)` when it needs escalation.
fn check_command(cmd: &str) -> std::result::Result<bool, String> {
    let cmd = cmd.trim();

    if let Some(pattern) = FORBIDDEN_PATTERNS.iter().find(|p| cmd.contains(*p)) {
        return Err(format!("unsafe command detected: {}", pattern));
    }

    if cmd.starts_with(PROTECTED_PATH) || cmd.contains(&format!(" {}", PROTECTED_PATH)) {
        return Err("modification of /System is forbidden".to_string());
    }
    if cmd.contains("csrutil disable") {
        return Err("disabling system integrity protection is forbidden".to_string());
    }

    let high_risk = HIGH_RISK_KEYWORDS
        .iter()
        .any(|kw| cmd.starts_with(kw) || cmd.contains(&format!(" {}", kw)));
    if high_risk {
        return Ok(true);
    }

    Ok(SENSITIVE_PATHS.iter().any(|p| cmd.contains(p)))
}

/// Local risk estimate for a routed intent, before any plan exists.
pub fn assess(intent: &Intent) -> Risk {
    if intent.action != Action::RunShell {
        return Risk::Low;
    }
    let cmd = intent.arg("command").to_lowercase();
    if DESTRUCTIVE_PATTERNS.iter().any(|p| cmd.contains(p)) {
        return Risk::High;
    }
    let mutating = MUTATING_TOKENS
        .iter()
        .any(|t| cmd.starts_with(t) || cmd.contains(&format!(" {}", t)));
    if mutating {
        Risk::Medium
    } else {
        Risk::Low
    }
}
