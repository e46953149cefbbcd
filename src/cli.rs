use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use crate::auth::Token;
use crate::config::{parse_utc_offset, Config, OutputFormat};
use crate::output;
use crate::providers::jira::{JiraClient, ReportProvider, SprintSelection};
use crate::providers::linearb::LinearbClient;

#[derive(Parser)]
#[command(name = "sprintlens")]
#[command(author, version, about = "Sprint Retrospective Metrics", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Write machine-readable output to this file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format; defaults to the configured format
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the retrospective report for one sprint
    Report {
        /// Scrum board name
        #[arg(short, long)]
        board: Option<String>,

        /// Report on a specific sprint id
        #[arg(long, conflicts_with = "sprint_name")]
        sprint_id: Option<u64>,

        /// Report on the sprint with this exact name
        #[arg(long)]
        sprint_name: Option<String>,

        /// Tracker base URL
        #[arg(long)]
        jira_url: Option<String>,

        #[arg(long, env = "JIRA_EMAIL")]
        jira_email: Option<String>,

        #[arg(long, env = "JIRA_TOKEN")]
        jira_token: Option<String>,

        #[arg(long, env = "LINEARB_TOKEN")]
        linearb_token: Option<String>,

        /// Engineering-metrics team id
        #[arg(long)]
        linearb_team: Option<u64>,
    },
    /// List the board's recent closed sprints
    Sprints {
        #[arg(short, long)]
        board: Option<String>,

        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        #[arg(long)]
        jira_url: Option<String>,

        #[arg(long, env = "JIRA_EMAIL")]
        jira_email: Option<String>,

        #[arg(long, env = "JIRA_TOKEN")]
        jira_token: Option<String>,
    },
}

/// CLI flags override the corresponding configuration keys.
fn pick(flag: &Option<String>, configured: &Option<String>) -> Option<String> {
    flag.clone().or_else(|| configured.clone())
}

fn build_jira_client(
    config: &Config,
    url: &Option<String>,
    email: &Option<String>,
    token: &Option<String>,
) -> Result<JiraClient> {
    let base_url = pick(url, &config.jira.base_url)
        .context("Tracker base URL required (--jira-url or config)")?;
    let email = pick(email, &config.jira.email);
    let token = pick(token, &config.jira.token).map(|t| Token::from(t.as_str()));

    Ok(JiraClient::new(&base_url, email, token)?)
}

impl Cli {
    #[allow(clippy::too_many_arguments)]
    async fn execute_report(
        &self,
        board: &Option<String>,
        sprint_id: Option<u64>,
        sprint_name: &Option<String>,
        jira_url: &Option<String>,
        jira_email: &Option<String>,
        jira_token: &Option<String>,
        linearb_token: &Option<String>,
        linearb_team: Option<u64>,
    ) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        let board_name = pick(board, &config.jira.board_name)
            .context("Board name required (--board or config)")?;
        let tz = parse_utc_offset(&config.report.timezone_offset).with_context(|| {
            format!(
                "Invalid timezone offset '{}' in config",
                config.report.timezone_offset
            )
        })?;

        let jira = build_jira_client(&config, jira_url, jira_email, jira_token)?;

        let linearb = match pick(linearb_token, &config.linearb.token) {
            Some(token) => Some(LinearbClient::new(
                &config.linearb.base_url,
                Token::from(token.as_str()),
            )?),
            None => None,
        };
        let linearb_team = linearb_team.or(config.linearb.team_id);

        info!("Building sprint report for board: {}", board_name);

        let provider = ReportProvider::new(
            jira,
            linearb,
            linearb_team,
            board_name,
            config.jira.sprint_prefix.clone(),
            config.report.clone(),
            tz,
        );

        let selection = match (sprint_id, sprint_name) {
            (Some(id), _) => SprintSelection::ById(id),
            (None, Some(name)) => SprintSelection::ByName(name.clone()),
            (None, None) => SprintSelection::MostRecent,
        };

        let report = provider.collect_report(&selection).await?;

        let format = self.format.unwrap_or(config.output.format);
        let pretty = self.pretty || config.output.pretty;

        if format == OutputFormat::Summary {
            output::print_summary(&report);
            return Ok(());
        }

        if let Some(output_path) = &self.output {
            let mut file = std::fs::File::create(output_path)
                .with_context(|| format!("Failed to create {}", output_path.display()))?;
            output::export_report(&report, format, pretty, &mut file)?;
            info!("Report written to: {}", output_path.display());
        } else {
            let mut stdout = std::io::stdout();
            output::export_report(&report, format, pretty, &mut stdout)?;
        }

        Ok(())
    }

    async fn execute_sprints(
        &self,
        board: &Option<String>,
        limit: usize,
        jira_url: &Option<String>,
        jira_email: &Option<String>,
        jira_token: &Option<String>,
    ) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        let board_name = pick(board, &config.jira.board_name)
            .context("Board name required (--board or config)")?;
        let tz = parse_utc_offset(&config.report.timezone_offset).with_context(|| {
            format!(
                "Invalid timezone offset '{}' in config",
                config.report.timezone_offset
            )
        })?;

        let jira = build_jira_client(&config, jira_url, jira_email, jira_token)?;
        let provider = ReportProvider::new(
            jira,
            None,
            None,
            board_name,
            config.jira.sprint_prefix.clone(),
            config.report.clone(),
            tz,
        );

        let sprints = provider.list_sprints(limit).await?;
        for closed in &sprints {
            let completed = closed
                .completed_at
                .map_or_else(|| "unknown".to_string(), |d| d.format("%Y-%m-%d").to_string());
            println!(
                "{:>8}  {}  {}",
                closed.sprint.id, completed, closed.sprint.name
            );
        }

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Report {
                board,
                sprint_id,
                sprint_name,
                jira_url,
                jira_email,
                jira_token,
                linearb_token,
                linearb_team,
            } => {
                self.execute_report(
                    board,
                    *sprint_id,
                    sprint_name,
                    jira_url,
                    jira_email,
                    jira_token,
                    linearb_token,
                    *linearb_team,
                )
                .await
            }
            Commands::Sprints {
                board,
                limit,
                jira_url,
                jira_email,
                jira_token,
            } => {
                self.execute_sprints(board, *limit, jira_url, jira_email, jira_token)
                    .await
            }
        }
    }
}
