use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{errors::Error, Result};

/// Typed configuration for the broadcast bot.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,
    /// Operators allowed to drive the bot. Everyone else is rejected.
    pub telegram_admin_users: Vec<i64>,

    // Storage files
    pub targets_file: PathBuf,
    pub settings_file: PathBuf,

    // Delivery tuning
    /// Upper bound on simultaneous in-flight deliveries per cycle.
    /// `None` preserves the default unbounded fan-out.
    pub max_concurrent_sends: Option<usize>,
    /// Wrap the transport in the outbound-spacing decorator.
    pub throttle_sends: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        let telegram_admin_users = parse_csv_i64(env_str("TELEGRAM_ADMIN_USERS"));

        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }
        if telegram_admin_users.is_empty() {
            return Err(Error::Config(
                "TELEGRAM_ADMIN_USERS environment variable is required".to_string(),
            ));
        }

        let targets_file =
            PathBuf::from(env_str("TARGETS_FILE").unwrap_or("groups.json".to_string()));
        let settings_file =
            PathBuf::from(env_str("SETTINGS_FILE").unwrap_or("bot_settings.json".to_string()));

        let max_concurrent_sends = env_usize("MAX_CONCURRENT_SENDS").filter(|&n| n > 0);
        let throttle_sends = env_bool("THROTTLE_SENDS").unwrap_or(false);

        Ok(Self {
            telegram_bot_token,
            telegram_admin_users,
            targets_file,
            settings_file,
            max_concurrent_sends,
            throttle_sends,
        })
    }

    /// The opaque "is this the owning operator" check.
    pub fn is_operator(&self, user_id: Option<i64>) -> bool {
        let Some(user_id) = user_id else {
            return false;
        };
        self.telegram_admin_users.contains(&user_id)
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_admin_user_csv() {
        assert_eq!(
            parse_csv_i64(Some("1, 2,three,4".to_string())),
            vec![1, 2, 4]
        );
        assert!(parse_csv_i64(None).is_empty());
    }

    #[test]
    fn operator_check_rejects_unknown_and_missing_users() {
        let cfg = Config {
            telegram_bot_token: "t".to_string(),
            telegram_admin_users: vec![42],
            targets_file: PathBuf::from("groups.json"),
            settings_file: PathBuf::from("bot_settings.json"),
            max_concurrent_sends: None,
            throttle_sends: false,
        };
        assert!(cfg.is_operator(Some(42)));
        assert!(!cfg.is_operator(Some(7)));
        assert!(!cfg.is_operator(None));
    }
}
