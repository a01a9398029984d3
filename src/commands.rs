use crate::apps::{AppIndex, AppLocator};
use crate::config::{
    get_config_path, get_history_path, get_logs_dir, get_shortcuts_path, save_config, Config,
    CONFIG_KEYS,
};
use crate::db::HistoryStore;
use crate::error::Result;
use crate::executor::{list_logs, Executor};
use crate::pipeline::{Outcome, Pipeline};
use crate::planner::{parse_strict, CommandProvider};
use crate::ranking::ranked_keys;
use crate::shortcuts::{normalize, ShortcutMap};
use crate::types::Risk;
use crate::ui::{print_plan, print_table, StdinConfirm};
use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

fn open_store() -> Result<HistoryStore> {
    let path = get_history_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    HistoryStore::open(&path)
}

fn app_index(config: &Config) -> AppIndex {
    config.apps.iter().collect()
}

fn executor(config: &Config) -> Executor {
    Executor::new(get_logs_dir()).with_shell(config.exec.shell.as_str())
}

pub fn cmd_run(input: &str, config: &Config, yes: bool) -> Result<()> {
    let shortcuts = ShortcutMap::load(&get_shortcuts_path())?;
    let apps = app_index(config);
    let provider = config.planner_command().map(CommandProvider::new);
    let mut store = open_store()?;

    let mut pipeline = Pipeline::new(config, &shortcuts, &apps, executor(config)).approve_all(yes);
    if let Some(provider) = &provider {
        pipeline = pipeline.with_provider(provider);
    }

    let outcome = pipeline.run_input(input, &mut store, &mut StdinConfirm, &mut io::stdout())?;
    report(outcome);
    Ok(())
}

fn report(outcome: Outcome) {
    if let Some(run) = outcome.execution {
        log::info!(
            "{} step(s) at {} risk, log: {}",
            run.steps,
            outcome.risk,
            run.log_path
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "none".to_string())
        );
    }
}

pub fn cmd_plan(file: Option<&Path>, config: &Config, yes: bool) -> Result<()> {
    let (payload, source) = match file {
        Some(path) => (fs::read_to_string(path)?, path.display().to_string()),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            (buf, "-".to_string())
        }
    };
    let plan = parse_strict(&payload)?;

    let shortcuts = ShortcutMap::new();
    let apps = AppIndex::new();
    let mut store = open_store()?;
    let mut stdout = io::stdout();

    print_plan(&mut stdout, &plan)?;
    let label = format!("plan {}", source);
    let outcome = Pipeline::new(config, &shortcuts, &apps, executor(config))
        .approve_all(yes)
        .without_usage()
        .run_plan(&label, plan, Risk::Low, &mut store, &mut StdinConfirm, &mut stdout)?;
    report(outcome);
    Ok(())
}

pub fn cmd_add(phrase: &str, command: &[String]) -> Result<()> {
    let command = command.join(" ");
    let path = get_shortcuts_path();
    let mut shortcuts = ShortcutMap::load(&path)?;

    shortcuts.insert(phrase, command.as_str());
    shortcuts.save(&path)?;

    println!("added shortcut: {} -> {}", phrase, command);
    Ok(())
}

/// Short display form of a shortcut's target.
fn prettify_target(cmd: &str) -> String {
    if cmd.starts_with("open -a") {
        if let Some(path) = cmd.split('\'').nth(1) {
            return file_name(path);
        }
    }
    cmd.strip_prefix("open ").unwrap_or(cmd).to_string()
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

pub fn cmd_list(config: &Config, ranked: bool, apps: bool) -> Result<()> {
    let mut stdout = io::stdout();

    if apps {
        let all = app_index(config).list_all();
        if all.is_empty() {
            println!("no applications configured. add them under [apps] in the config file.");
            return Ok(());
        }
        let rows: Vec<(String, String)> = all
            .into_iter()
            .map(|(name, path)| (name, file_name(&path)))
            .collect();
        print_table(&mut stdout, ("command", "application"), &rows)?;
        return Ok(());
    }

    let shortcuts = ShortcutMap::load(&get_shortcuts_path())?;
    if shortcuts.is_empty() {
        println!("no shortcuts found.");
        return Ok(());
    }

    let mut keys = shortcuts.keys();
    if ranked {
        let store = open_store()?;
        let normalized: Vec<String> = keys.iter().map(|k| normalize(k)).collect();
        let usage = store.usage(&normalized)?;
        keys = ranked_keys(&keys, &usage);
    }

    let rows: Vec<(String, String)> = keys
        .into_iter()
        .map(|key| {
            let target = prettify_target(shortcuts.get(&key).unwrap_or_default());
            (key, target)
        })
        .collect();
    print_table(&mut stdout, ("command", "target"), &rows)?;
    Ok(())
}

pub fn cmd_logs(last: bool) -> Result<()> {
    let logs = list_logs(&get_logs_dir())?;

    let newest = match logs.last() {
        Some(path) => path,
        None => {
            println!("no logs found.");
            return Ok(());
        }
    };

    if last {
        println!("log: {}", newest.display());
        println!();
        let mut file = fs::File::open(newest)?;
        io::copy(&mut file, &mut io::stdout())?;
        return Ok(());
    }

    println!("recent logs:");
    for path in &logs {
        println!("  {}", file_name(&path.to_string_lossy()));
    }
    println!();
    println!("use 'o logs --last' to see the latest log.");
    Ok(())
}

pub fn cmd_history(limit: usize) -> Result<()> {
    let path = get_history_path();
    if !path.exists() {
        println!("no history yet.");
        return Ok(());
    }

    let store = HistoryStore::open(&path)?;
    let entries = store.recent(limit)?;
    if entries.is_empty() {
        println!("no history yet.");
        return Ok(());
    }

    for entry in entries {
        let status = if entry.success { "+" } else { "x" };
        let when = chrono::DateTime::from_timestamp(entry.timestamp, 0)
            .map(|t| {
                t.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_default();
        println!("{} {}  {}", status, when, entry.input);
    }
    Ok(())
}

pub enum ConfigAction {
    List,
    Get(String),
    Set(String, String),
}

pub fn cmd_config(config: &mut Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::List => {
            for key in CONFIG_KEYS {
                println!("{} = {}", key.name, (key.get)(config));
            }
            println!();
            println!("file: {}", get_config_path().display());
        }
        ConfigAction::Get(key) => println!("{}", config.get(&key)?),
        ConfigAction::Set(key, value) => {
            config.set(&key, &value)?;
            save_config(config)?;
            println!("{} = {}", key, config.get(&key)?);
        }
    }
    Ok(())
}

fn check(label: &str) {
    print!("  {} ... ", label);
    io::stdout().flush().ok();
}

pub fn cmd_doctor(config: &Config) -> Result<()> {
    println!("diagnostics:");
    println!();

    check("config");
    if get_config_path().exists() {
        println!("ok");
    } else {
        println!("using defaults");
    }

    check("search engine");
    match config.search_template() {
        Ok(template) => println!("ok ({})", template),
        Err(e) => {
            println!("failed");
            println!("    error: {}", e);
            println!("    try: o config set search.engine 'https://duckduckgo.com/?q=%s'");
        }
    }

    check("risk threshold");
    match config.safety.risk_threshold.parse::<Risk>() {
        Ok(risk) => println!("ok ({})", risk),
        Err(_) => println!(
            "unrecognised {:?}, using {}",
            config.safety.risk_threshold,
            config.threshold()
        ),
    }

    check("shortcuts");
    match ShortcutMap::load(&get_shortcuts_path()) {
        Ok(map) => println!("ok ({} entries)", map.len()),
        Err(e) => {
            println!("failed");
            println!("    error: {}", e);
        }
    }

    check("history");
    match open_store() {
        Ok(_) => println!("ok"),
        Err(e) => {
            println!("failed");
            println!("    error: {}", e);
        }
    }

    check("logs");
    let logs_dir: PathBuf = get_logs_dir();
    match fs::create_dir_all(&logs_dir).and_then(|_| list_logs(&logs_dir)) {
        Ok(logs) => println!("ok ({} files)", logs.len()),
        Err(e) => {
            println!("failed");
            println!("    error: {}", e);
            println!("    runs will only print to the terminal");
        }
    }

    check("planner");
    match config.planner_command() {
        Some(cmd) => println!("{}", cmd),
        None => println!("not configured (unmatched input becomes a web search)"),
    }

    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prettified_targets() {
        assert_eq!(
            prettify_target("open -a '/Applications/Google Chrome.app'"),
            "Google Chrome.app"
        );
        assert_eq!(prettify_target("open https://github.com"), "https://github.com");
        assert_eq!(prettify_target("ls -la"), "ls -la");
    }
}
