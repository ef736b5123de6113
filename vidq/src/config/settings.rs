//! Optional upload and scheduler settings.

use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use super::ConfigError;

/// Placeholder substituted with the job title in [`UploadSettings::title_template`].
pub const TITLE_PLACEHOLDER: &str = "{title}";

/// What the scheduler does with a job whose upload failed for a reason other
/// than quota exhaustion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Hold the job and retry it after the next quota reset.
    #[default]
    Suspend,
    /// Discard the job and move on to the next one.
    Drop,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Suspend => "suspend",
            Self::Drop => "drop",
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata sent with every upload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSettings {
    /// Video title; `{title}` is replaced by the file's base name.
    #[serde(default = "default_title_template")]
    pub title_template: String,
    /// Fixed description text.
    #[serde(default = "default_description")]
    pub description: String,
    /// Tags; the job title is always appended.
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_title_template() -> String {
    TITLE_PLACEHOLDER.to_string()
}

fn default_description() -> String {
    "Uploaded automatically by vidq.".to_string()
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            title_template: default_title_template(),
            description: default_description(),
            tags: Vec::new(),
        }
    }
}

impl UploadSettings {
    /// Render the video title for a job.
    pub fn render_title(&self, title: &str) -> String {
        self.title_template.replace(TITLE_PLACEHOLDER, title)
    }

    /// Configured tags followed by the job title.
    pub fn tags_for(&self, title: &str) -> Vec<String> {
        let mut tags = self.tags.clone();
        tags.push(title.to_string());
        tags
    }
}

/// Scheduler tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerSettings {
    /// Handling of non-quota upload failures.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// IANA zone whose midnight resets the daily quota.
    #[serde(default = "default_quota_time_zone")]
    pub quota_time_zone: String,
    /// Observation/render tick in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_quota_time_zone() -> String {
    "America/Los_Angeles".to_string()
}

fn default_tick_interval_ms() -> u64 {
    1000
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            quota_time_zone: default_quota_time_zone(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl SchedulerSettings {
    /// Parse the configured quota time zone.
    pub fn time_zone(&self) -> Result<Tz, ConfigError> {
        self.quota_time_zone.parse::<Tz>().map_err(|e| {
            ConfigError::invalid(format!(
                "unknown quota time zone '{}': {}",
                self.quota_time_zone, e
            ))
        })
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_settings_defaults() {
        let settings: UploadSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.title_template, "{title}");
        assert!(settings.tags.is_empty());
        assert_eq!(settings.render_title("intro"), "intro");
    }

    #[test]
    fn test_render_title_and_tags() {
        let settings = UploadSettings {
            title_template: "VS Code Setting: {title}".to_string(),
            description: "desc".to_string(),
            tags: vec!["vs code".to_string()],
        };
        assert_eq!(
            settings.render_title("editor.tabSize"),
            "VS Code Setting: editor.tabSize"
        );
        assert_eq!(
            settings.tags_for("editor.tabSize"),
            vec!["vs code".to_string(), "editor.tabSize".to_string()]
        );
    }

    #[test]
    fn test_failure_policy_serde() {
        let settings: SchedulerSettings =
            serde_json::from_str(r#"{"failurePolicy":"drop"}"#).unwrap();
        assert_eq!(settings.failure_policy, FailurePolicy::Drop);
        assert_eq!(settings.quota_time_zone, "America/Los_Angeles");
        assert_eq!(settings.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_time_zone() {
        let settings = SchedulerSettings {
            quota_time_zone: "Mars/Olympus_Mons".to_string(),
            ..Default::default()
        };
        assert!(settings.time_zone().is_err());
        assert_eq!(
            SchedulerSettings::default().time_zone().unwrap(),
            chrono_tz::America::Los_Angeles
        );
    }
}
