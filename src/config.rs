use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file structure for SprintLens.
///
/// Allows users to save tracker credentials and report settings and reuse
/// them across runs. Configuration files are loaded from the current
/// directory, the platform config directory, or a specified path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Issue tracker connection settings
    #[serde(default)]
    pub jira: JiraConfig,

    /// Engineering metrics service settings
    #[serde(default)]
    pub linearb: LinearbConfig,

    /// Report content parameters
    #[serde(default)]
    pub report: ReportConfig,

    /// Output format preferences
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JiraConfig {
    /// Tracker base URL (e.g., 'https://yourcompany.atlassian.net')
    pub base_url: Option<String>,

    /// Account email for basic auth; leave unset to send the token as a bearer credential
    pub email: Option<String>,

    /// API token
    pub token: Option<String>,

    /// Scrum board name to report on
    pub board_name: Option<String>,

    /// Only consider sprints whose name starts with this prefix
    pub sprint_prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LinearbConfig {
    /// LinearB API base URL
    #[serde(default = "default_linearb_base_url")]
    pub base_url: String,

    /// LinearB API key
    pub token: Option<String>,

    /// LinearB team identifier to query measurements for
    pub team_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReportConfig {
    /// Epic key whose completed children count as tech-debt work
    pub tech_debt_epic: Option<String>,

    /// Epic key holding cross-sprint action items
    pub action_items_epic: Option<String>,

    /// Issue type names treated as story-like work
    #[serde(default = "default_story_types")]
    pub story_types: Vec<String>,

    /// Status names excluded from completion tallies and hygiene audits
    #[serde(default = "default_excluded_statuses")]
    pub excluded_statuses: Vec<String>,

    /// Maximum characters kept from an issue summary in tables
    #[serde(default = "default_summary_max_chars")]
    pub summary_max_chars: usize,

    /// Assignees whose display name or email matches this pattern are
    /// dropped from the team roster
    #[serde(default = "default_bot_assignee_pattern")]
    pub bot_assignee_pattern: String,

    /// UTC offset used for all report-local dates (format: '+05:30')
    #[serde(default = "default_timezone_offset")]
    pub timezone_offset: String,

    /// Number of rows in the top completed items table
    #[serde(default = "default_top_completed_limit")]
    pub top_completed_limit: usize,

    /// Number of recent sprints shown in the velocity history
    #[serde(default = "default_velocity_history")]
    pub velocity_history: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Default output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Summary,
    Json,
    Csv,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jira: JiraConfig::default(),
            linearb: LinearbConfig::default(),
            report: ReportConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            email: None,
            token: None,
            board_name: None,
            sprint_prefix: None,
        }
    }
}

impl Default for LinearbConfig {
    fn default() -> Self {
        Self {
            base_url: default_linearb_base_url(),
            token: None,
            team_id: None,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            tech_debt_epic: None,
            action_items_epic: None,
            story_types: default_story_types(),
            excluded_statuses: default_excluded_statuses(),
            summary_max_chars: default_summary_max_chars(),
            bot_assignee_pattern: default_bot_assignee_pattern(),
            timezone_offset: default_timezone_offset(),
            top_completed_limit: default_top_completed_limit(),
            velocity_history: default_velocity_history(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Summary,
            pretty: false,
        }
    }
}

fn default_linearb_base_url() -> String {
    "https://public-api.linearb.io".to_string()
}

fn default_story_types() -> Vec<String> {
    [
        "Story",
        "Task",
        "Spike",
        "Enabler Story",
        "Technical Story",
        "User Story",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

fn default_excluded_statuses() -> Vec<String> {
    ["Cancelled", "Canceled", "Not Needed"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_summary_max_chars() -> usize {
    120
}

fn default_bot_assignee_pattern() -> String {
    "(automation|bot|svc|service|ci|pipeline|system)".to_string()
}

fn default_timezone_offset() -> String {
    "+05:30".to_string()
}

fn default_top_completed_limit() -> usize {
    5
}

fn default_velocity_history() -> usize {
    5
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./sprintlens.toml
    /// 3. ./sprintlens.json
    /// 4. ./sprintlens.yaml
    /// 5. ./sprintlens.yml
    /// 6. {config dir}/sprintlens/config.toml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        // Try common configuration file names
        let candidates = [
            "sprintlens.toml",
            "sprintlens.json",
            "sprintlens.yaml",
            "sprintlens.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(path) = Self::user_config_file() {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        // No config file found, return defaults
        Ok(Self::default())
    }

    /// Platform config file, e.g. `~/.config/sprintlens/config.toml` on Linux.
    fn user_config_file() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sprintlens").join("config.toml"))
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => {
                // Try TOML first, then JSON, then YAML
                toml::from_str(&contents)
                    .or_else(|_| serde_json::from_str(&contents))
                    .or_else(|_| serde_yaml::from_str(&contents))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml") | Some("yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

/// Parses a UTC offset of the form `+05:30` or `-08:00`.
pub fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let (sign, rest) = match value.chars().next()? {
        '+' => (1, &value[1..]),
        '-' => (-1, &value[1..]),
        _ => (1, value),
    };

    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
