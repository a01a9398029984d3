use crate::gate::Confirm;
use crate::types::{CommandPlan, Risk};
use crossterm::style::{StyledContent, Stylize};
use std::io::{self, BufRead, Write};

pub fn risk_label(risk: Risk) -> StyledContent<&'static str> {
    match risk {
        Risk::Low => risk.as_str().green(),
        Risk::Medium => risk.as_str().yellow(),
        Risk::High => risk.as_str().red().bold(),
    }
}

pub fn print_plan<W: Write>(out: &mut W, plan: &CommandPlan) -> io::Result<()> {
    writeln!(out)?;
    if !plan.summary.is_empty() {
        writeln!(out, "plan: {}", plan.summary.as_str().bold())?;
    }
    for question in &plan.questions {
        writeln!(out, "  ? {}", question)?;
    }
    if let Some(cwd) = &plan.cwd {
        writeln!(out, "  in {}", cwd.display())?;
    }
    for (i, cmd) in plan.commands.iter().enumerate() {
        if plan.commands.len() > 1 {
            writeln!(out, "  {}. {} ({})", i + 1, cmd.cmd, risk_label(cmd.risk))?;
        } else {
            writeln!(out, "  {} ({})", cmd.cmd, risk_label(cmd.risk))?;
        }
    }
    if plan.max_risk() == Risk::High {
        writeln!(out)?;
        writeln!(out, "  {}", "warning: this plan may be destructive".red())?;
    }
    writeln!(out)
}

/// Left-aligned two-column table.
pub fn print_table<W: Write>(
    out: &mut W,
    header: (&str, &str),
    rows: &[(String, String)],
) -> io::Result<()> {
    let width = rows
        .iter()
        .map(|(left, _)| left.chars().count())
        .chain(std::iter::once(header.0.len()))
        .max()
        .unwrap_or(0);

    let head = format!("{:<width$}   {}", header.0, header.1, width = width);
    writeln!(out, "{}", head.bold())?;
    for (left, right) in rows {
        writeln!(out, "{:<width$}   {}", left, right, width = width)?;
    }
    Ok(())
}

/// `[y/N]` prompt on stdout, answer read from stdin.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        print!("{} [y/N]: ", prompt);
        io::stdout().flush()?;
        read_answer(&mut io::stdin().lock())
    }
}

fn read_answer<R: BufRead>(input: &mut R) -> io::Result<bool> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no answer"));
    }
    let answer = line.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Command;

    #[test]
    fn answers() {
        assert!(read_answer(&mut "y\n".as_bytes()).unwrap());
        assert!(read_answer(&mut " YES \n".as_bytes()).unwrap());
        assert!(!read_answer(&mut "\n".as_bytes()).unwrap());
        assert!(!read_answer(&mut "nope\n".as_bytes()).unwrap());
        assert!(read_answer(&mut "".as_bytes()).is_err());
    }

    #[test]
    fn plan_lists_numbered_commands_and_questions() {
        let plan = CommandPlan {
            intent: "setup".into(),
            summary: "Set up project".into(),
            cwd: None,
            commands: vec![
                Command::new("mkdir app", Risk::Low),
                Command::new("sudo make install", Risk::High),
            ],
            questions: vec!["Which port?".into()],
        };
        let mut out = Vec::new();
        print_plan(&mut out, &plan).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Set up project"));
        assert!(text.contains("? Which port?"));
        assert!(text.contains("1. mkdir app"));
        assert!(text.contains("2. sudo make install"));
        assert!(text.contains("may be destructive"));
    }
}
