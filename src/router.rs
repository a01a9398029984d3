use crate::apps::AppLocator;
use crate::error::{Error, Result};
use crate::shortcuts::ShortcutMap;
use crate::types::{Action, Intent};

const DOMAIN_TLDS: &[&str] = &["com", "org", "edu"];

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub intent: Intent,
    /// Nothing matched; the search is a last resort and a planner may be
    /// consulted instead.
    pub fallback: bool,
}

impl Route {
    fn matched(intent: Intent) -> Self {
        Self {
            intent,
            fallback: false,
        }
    }
}

/// Classify raw input. First matching rule wins:
/// shortcut + app, shortcut, `open <app>`, known app, `search <q>`, URL,
/// bare domain, then fallback search.
pub fn route(input: &str, shortcuts: &ShortcutMap, apps: &dyn AppLocator) -> Result<Route> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyInput);
    }

    if let Some(cmd) = shortcut_in_app(trimmed, shortcuts, apps) {
        log::debug!("route: shortcut opened in app -> {}", cmd);
        return Ok(Route::matched(Intent::new(Action::RunShell, "command", cmd)));
    }

    if let Some(cmd) = shortcuts.resolve(trimmed) {
        log::debug!("route: shortcut -> {}", cmd);
        return Ok(Route::matched(Intent::new(Action::RunShell, "command", cmd)));
    }

    if let Some(app) = strip_prefix_ci(trimmed, "open ") {
        let app = app.trim();
        if !app.is_empty() {
            return Ok(Route::matched(Intent::new(Action::OpenApp, "app", app)));
        }
    }

    if let Some(path) = find_app(apps, trimmed) {
        log::debug!("route: application {}", path);
        return Ok(Route::matched(Intent::new(Action::OpenApp, "app", path)));
    }

    if let Some(query) = strip_prefix_ci(trimmed, "search ") {
        let query = query.trim();
        let query = strip_prefix_ci(query, "for ")
            .or_else(|| strip_prefix_ci(query, "about "))
            .unwrap_or(query)
            .trim();
        if !query.is_empty() {
            return Ok(Route::matched(Intent::new(Action::Search, "query", query)));
        }
    }

    if is_url(trimmed) {
        return Ok(Route::matched(Intent::new(Action::OpenUrl, "url", trimmed)));
    }

    if is_domain(trimmed) {
        return Ok(Route::matched(Intent::new(
            Action::OpenUrl,
            "url",
            format!("https://{}", trimmed),
        )));
    }

    log::debug!("route: no match, falling back to search");
    Ok(Route {
        intent: Intent::new(Action::Search, "query", trimmed),
        fallback: true,
    })
}

/// `<url shortcut> <app>`, e.g. `gh chrome` → `open -a '<chrome>' https://github.com`.
fn shortcut_in_app(input: &str, shortcuts: &ShortcutMap, apps: &dyn AppLocator) -> Option<String> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    if parts.len() < 2 {
        return None;
    }
    let shortcut_cmd = shortcuts.resolve(parts[0])?;
    if !shortcut_cmd.starts_with("open http") {
        return None;
    }

    let app_name = parts[1..].join(" ");
    let app_path = find_app(apps, &app_name).or_else(|| {
        shortcuts
            .resolve(&app_name)
            .and_then(app_path_from_shortcut)
            .map(String::from)
    })?;

    let url = shortcut_cmd.strip_prefix("open ").unwrap_or(shortcut_cmd);
    Some(format!("open -a '{}' {}", app_path, url))
}

fn find_app(apps: &dyn AppLocator, name: &str) -> Option<String> {
    apps.find(name).or_else(|| apps.find(&name.replace(' ', "")))
}

/// Path out of a shortcut shaped like `open -a '<path>'`.
fn app_path_from_shortcut(cmd: &str) -> Option<&str> {
    let rest = cmd.strip_prefix("open -a '")?;
    let end = rest.rfind('\'')?;
    (end > 0).then(|| &rest[..end])
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

pub fn is_url(input: &str) -> bool {
    match url::Url::parse(input) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}

pub fn is_domain(input: &str) -> bool {
    let value = input.trim();
    if value.is_empty() || value.contains(' ') || value.contains('/') {
        return false;
    }
    if value.starts_with("http://") || value.starts_with("https://") {
        return false;
    }
    let labels: Vec<&str> = value.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return false;
    }
    let tld = labels[labels.len() - 1].to_lowercase();
    DOMAIN_TLDS.contains(&tld.as_str())
}
