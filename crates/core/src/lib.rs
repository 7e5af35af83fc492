pub mod analysis;
pub mod domain;
pub mod error;
pub mod pipeline;
pub mod review;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;
    use std::time::Duration;

    const DEFAULT_PORT: u16 = 3001;
    const DEFAULT_DATA_DIR: &str = "data";
    const DEFAULT_ANALYSIS_COMMAND: &str = "python3 scripts/update_analysis.py";
    const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 600;
    const DEFAULT_REVIEW_ENDPOINT: &str = "https://api.manus.ai/v1/analysis/review";
    const DEFAULT_REVIEW_TIMEOUT_SECS: u64 = 30;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub port: u16,
        pub recommendations_path: PathBuf,
        pub new_recommendations_path: PathBuf,
        pub analysis_command: Vec<String>,
        pub analysis_timeout: Duration,
        pub review_enabled: bool,
        pub review_endpoint: String,
        pub review_api_key: Option<String>,
        pub review_timeout: Duration,
        /// Opt-in: approve locally when the remote reviewer cannot be reached.
        pub review_fallback_auto_approve: bool,
        pub schedule_enabled: bool,
        pub schedule_utc_offset_minutes: i32,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let data_dir = PathBuf::from(
                env_non_empty("DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            );

            let recommendations_path = env_non_empty("RECOMMENDATIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("recommendations.json"));
            let new_recommendations_path = env_non_empty("NEW_RECOMMENDATIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("new_recommendations.json"));

            let analysis_command = parse_command(
                &env_non_empty("ANALYSIS_COMMAND")
                    .unwrap_or_else(|| DEFAULT_ANALYSIS_COMMAND.to_string()),
            )?;

            let port = match env_non_empty("PORT") {
                Some(s) => s.parse::<u16>().with_context(|| format!("invalid PORT: {s}"))?,
                None => DEFAULT_PORT,
            };

            Ok(Self {
                port,
                recommendations_path,
                new_recommendations_path,
                analysis_command,
                analysis_timeout: Duration::from_secs(env_parse(
                    "ANALYSIS_TIMEOUT_SECS",
                    DEFAULT_ANALYSIS_TIMEOUT_SECS,
                )?),
                // Matches the dashboard deployment: only the literal "true" turns review on.
                review_enabled: std::env::var("USE_MANUS_API").ok().as_deref() == Some("true"),
                review_endpoint: env_non_empty("MANUS_API_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_REVIEW_ENDPOINT.to_string()),
                review_api_key: env_non_empty("MANUS_API_KEY"),
                review_timeout: Duration::from_secs(env_parse(
                    "REVIEW_TIMEOUT_SECS",
                    DEFAULT_REVIEW_TIMEOUT_SECS,
                )?),
                review_fallback_auto_approve: env_flag("REVIEW_FALLBACK_AUTO_APPROVE", false)?,
                schedule_enabled: env_flag("UPDATE_SCHEDULE_ENABLED", true)?,
                schedule_utc_offset_minutes: env_parse("UPDATE_SCHEDULE_UTC_OFFSET_MINUTES", 0)?,
                sentry_dsn: env_non_empty("SENTRY_DSN"),
            })
        }

        pub fn require_review_api_key(&self) -> anyhow::Result<&str> {
            self.review_api_key
                .as_deref()
                .context("MANUS_API_KEY is required when USE_MANUS_API=true")
        }
    }

    fn env_non_empty(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match env_non_empty(key) {
            Some(s) => s
                .parse::<T>()
                .with_context(|| format!("invalid {key}: {s}")),
            None => Ok(default),
        }
    }

    fn env_flag(key: &str, default: bool) -> anyhow::Result<bool> {
        match env_non_empty(key).map(|s| s.to_ascii_lowercase()) {
            None => Ok(default),
            Some(s) if matches!(s.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
            Some(s) if matches!(s.as_str(), "0" | "false" | "no" | "off") => Ok(false),
            Some(s) => anyhow::bail!("invalid boolean for {key}: {s}"),
        }
    }

    pub fn parse_command(raw: &str) -> anyhow::Result<Vec<String>> {
        let parts: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
        anyhow::ensure!(!parts.is_empty(), "ANALYSIS_COMMAND must not be empty");
        Ok(parts)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn parse_command_splits_on_whitespace() {
            let cmd = parse_command("  python3   scripts/update_analysis.py --fast ").unwrap();
            assert_eq!(cmd, vec!["python3", "scripts/update_analysis.py", "--fast"]);
        }

        #[test]
        fn parse_command_rejects_blank() {
            assert!(parse_command("   ").is_err());
        }
    }
}
