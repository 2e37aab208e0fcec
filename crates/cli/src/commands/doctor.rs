use coindash_core::config::{AppConfig, LoadOptions};
use coindash_store::{connect, ScoreStore};
use coindash_telegram::api::{BotApi, HttpBotApi};
use serde::Serialize;

use crate::commands::{runtime, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
pub struct DoctorCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub details: String,
}

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub overall_status: CheckStatus,
    pub summary: String,
    pub checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    fn from_checks(checks: Vec<DoctorCheck>) -> Self {
        let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
        let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
        let summary = if all_pass {
            "doctor: all readiness checks passed".to_string()
        } else {
            "doctor: one or more readiness checks failed".to_string()
        };

        Self { overall_status, summary, checks }
    }
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return DoctorReport::from_checks(vec![
                DoctorCheck {
                    name: "config_validation",
                    status: CheckStatus::Fail,
                    details: error.to_string(),
                },
                skipped("telegram_token"),
                skipped("store_connectivity"),
            ]);
        }
    };

    let mut checks = vec![DoctorCheck {
        name: "config_validation",
        status: CheckStatus::Pass,
        details: "configuration loaded and validated".to_string(),
    }];

    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(details) => {
            checks.push(DoctorCheck { name: "telegram_token", status: CheckStatus::Fail, details });
            checks.push(skipped("store_connectivity"));
            return DoctorReport::from_checks(checks);
        }
    };

    checks.push(match HttpBotApi::new(
        &config.telegram.api_base_url,
        config.telegram.bot_token.clone(),
        config.telegram.poll_timeout_secs,
    ) {
        Ok(api) => runtime.block_on(check_telegram_token(&api)),
        Err(error) => DoctorCheck {
            name: "telegram_token",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    });

    checks.push(match connect(&config.store) {
        Ok(store) => runtime.block_on(check_store_connectivity(store.as_ref())),
        Err(error) => DoctorCheck {
            name: "store_connectivity",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    });

    DoctorReport::from_checks(checks)
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because configuration did not load".to_string(),
    }
}

pub async fn check_telegram_token(api: &dyn BotApi) -> DoctorCheck {
    match api.get_me().await {
        Ok(me) => DoctorCheck {
            name: "telegram_token",
            status: CheckStatus::Pass,
            details: format!(
                "authenticated as @{} (id {})",
                me.username.as_deref().unwrap_or(&me.first_name),
                me.id
            ),
        },
        Err(error) => DoctorCheck {
            name: "telegram_token",
            status: CheckStatus::Fail,
            details: format!("getMe failed: {error}"),
        },
    }
}

pub async fn check_store_connectivity(store: &dyn ScoreStore) -> DoctorCheck {
    match store.fetch_top_scores(1).await {
        Ok(records) => DoctorCheck {
            name: "store_connectivity",
            status: CheckStatus::Pass,
            details: format!(
                "{} store answered a top-score query ({} row)",
                store.backend(),
                records.len()
            ),
        },
        Err(error) => DoctorCheck {
            name: "store_connectivity",
            status: CheckStatus::Fail,
            details: format!("{} store query failed: {error}", store.backend()),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
