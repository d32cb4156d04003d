//! Doctor command - verify credentials, directories and configurations.

use crate::cli::Output;
use crate::config::{available_configs, Settings, TextProvider};
use crate::keys::KeyRotator;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Sofy Doctor");
    println!();
    println!("Checking credentials and configuration...\n");

    let lookup = |name: &str| std::env::var(name).ok();
    let sections = [
        ("API Keys", check_api_keys(settings, &lookup)),
        ("Directories", check_directories(settings)),
        ("Video Configurations", check_video_configs(&settings.config_dir())),
        ("Configuration", vec![check_config_file(config_path)]),
    ];

    let mut errors = 0;
    let mut warnings = 0;
    for (title, checks) in &sections {
        println!("{}", style(title).bold());
        for check in checks {
            check.print();
            match check.status {
                CheckStatus::Error => errors += 1,
                CheckStatus::Warning => warnings += 1,
                CheckStatus::Ok => {}
            }
        }
        println!();
    }

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Sofy.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Sofy is ready to use.");
    }

    Ok(())
}

/// Count the rotation keys for each provider the pipeline needs.
fn check_api_keys<F>(settings: &Settings, lookup: &F) -> Vec<CheckResult>
where
    F: Fn(&str) -> Option<String>,
{
    let mut providers = vec![TextProvider::Gemini];
    if settings.text.provider != TextProvider::Gemini {
        providers.push(settings.text.provider);
    }

    let mut results: Vec<CheckResult> = providers
        .into_iter()
        .map(|provider| {
            let prefix = provider.key_prefix();
            match KeyRotator::discover(prefix, lookup) {
                Ok(rotator) => CheckResult::ok(prefix, &format!("{} key(s) configured", rotator.len())),
                Err(_) => CheckResult::error(
                    prefix,
                    "not set",
                    &format!("Set with: export {}='...' (or {}_1, {}_2, ...)", prefix, prefix, prefix),
                ),
            }
        })
        .collect();

    let token_env = settings.youtube.access_token_env.as_str();
    results.push(match lookup(token_env) {
        Some(token) if !token.trim().is_empty() => CheckResult::ok(token_env, "configured"),
        _ => CheckResult::warning(
            token_env,
            "not set",
            "Uploads will be skipped until an OAuth access token is exported",
        ),
    });

    results
}

/// Check data directories.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    for (name, dir) in [
        ("Data directory", settings.data_dir()),
        ("Temp directory", settings.temp_dir()),
    ] {
        if dir.exists() {
            results.push(CheckResult::ok(name, &dir.display().to_string()));
        } else {
            results.push(CheckResult::warning(
                name,
                &format!("{} (will be created)", dir.display()),
                "Directory will be created on first use",
            ));
        }
    }

    let db_path = settings.jobs_db_path();
    if db_path.exists() {
        let size = std::fs::metadata(&db_path)
            .map(|m| format_size(m.len()))
            .unwrap_or_else(|_| "unknown size".to_string());
        results.push(CheckResult::ok(
            "Job database",
            &format!("{} ({})", db_path.display(), size),
        ));
    } else {
        results.push(CheckResult::warning(
            "Job database",
            &format!("{} (not created yet)", db_path.display()),
            "Database will be created by the first job",
        ));
    }

    results
}

/// Parse every video configuration in `config_dir`.
fn check_video_configs(config_dir: &Path) -> Vec<CheckResult> {
    let files = available_configs(config_dir);
    if files.is_empty() {
        return vec![CheckResult::error(
            "Config directory",
            &format!("no YAML configurations in {}", config_dir.display()),
            "Add a <niche>.yaml file or set general.config_dir",
        )];
    }

    files
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            let parsed = std::fs::read_to_string(path)
                .map_err(crate::SofyError::from)
                .and_then(|content| crate::config::VideoConfig::from_yaml(&content));
            match parsed {
                Ok(config) => CheckResult::ok(
                    &name,
                    &format!("{} ({} clip(s))", config.niche, config.clip_count()),
                ),
                Err(e) => CheckResult::error(&name, &e.to_string(), "Fix the file or remove it"),
            }
        })
        .collect()
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: sofy config set <key> <value>",
        )
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
    }

    #[test]
    fn test_api_keys_counted() {
        let settings = Settings::default();
        let lookup = |name: &str| match name {
            "GEMINI_API_KEY" | "GEMINI_API_KEY_2" => Some("k".to_string()),
            _ => None,
        };

        let results = check_api_keys(&settings, &lookup);

        assert_eq!(results[0].status, CheckStatus::Ok);
        assert_eq!(results[0].message, "2 key(s) configured");
        assert_eq!(results.last().map(|r| &r.status), Some(&CheckStatus::Warning));
    }

    #[test]
    fn test_missing_key_is_error() {
        let results = check_api_keys(&Settings::default(), &|_: &str| None);
        assert_eq!(results[0].status, CheckStatus::Error);
    }

    #[test]
    fn test_video_configs_checked() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(check_video_configs(dir.path())[0].status, CheckStatus::Error);

        std::fs::write(dir.path().join("good.yaml"), crate::config::SAMPLE_YAML).unwrap();
        std::fs::write(dir.path().join("bad.yml"), "niche: [").unwrap();

        let results = check_video_configs(dir.path());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "bad.yml");
        assert_eq!(results[0].status, CheckStatus::Error);
        assert_eq!(results[1].status, CheckStatus::Ok);
    }
}
