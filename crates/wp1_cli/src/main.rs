//! CLI smoke and inspection entry point.
//!
//! # Responsibility
//! - Verify `wp1_core` linkage with deterministic output.
//! - Print per-project counters of a wp10 database.
//! - Run one reconciliation cycle against a local wiki replica.
//!
//! Usage:
//! - `wp1`
//! - `wp1 <wp10.db>`
//! - `wp1 <wp10.db> reconcile <replica.db> <project> [--config <config.json>] [--extra <params.json>]`
//!
//! `--extra` takes the project's template parameters as a flat JSON object
//! (`homepage`, `parent`, `shortname`, `extraN-title`, ...).
//!
//! Set `WP1_LOG_DIR` to an absolute path to enable file logging;
//! `WP1_LOG_LEVEL` and `WP1_WORKER` refine it.

use log::error;
use std::process::ExitCode;
use wp1_core::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use wp1_core::wiki::replica::open_replica;
use wp1_core::{
    init_logging, open_db, ExtraAssessments, LogSettings, NamespaceDirectory, ProjectReconciler,
    ReconcileConfig, SqliteWikiReplica,
};

const USAGE: &str = "usage: wp1 [<wp10.db> [reconcile <replica.db> <project> \
[--config <config.json>] [--extra <template-params.json>]]]";

/// Optional inputs of the `reconcile` command.
#[derive(Debug, Default, PartialEq, Eq)]
struct ReconcileOptions {
    config_path: Option<String>,
    extra_path: Option<String>,
}

impl ReconcileOptions {
    fn parse(args: &[String]) -> Result<Self, Box<dyn std::error::Error>> {
        let mut options = Self::default();
        let mut args = args.iter();
        while let Some(flag) = args.next() {
            let slot = match flag.as_str() {
                "--config" => &mut options.config_path,
                "--extra" => &mut options.extra_path,
                _ => return Err(format!("unknown option `{flag}`\n{USAGE}").into()),
            };
            let Some(value) = args.next() else {
                return Err(format!("option `{flag}` needs a file path").into());
            };
            *slot = Some(value.clone());
        }
        Ok(options)
    }
}

fn main() -> ExitCode {
    println!("wp1_core ping={}", wp1_core::ping());
    println!("wp1_core version={}", wp1_core::core_version());

    let logging = LogSettings::from_env()
        .and_then(|settings| settings.map_or(Ok(false), |settings| init_logging(&settings)));
    if let Err(err) = logging {
        eprintln!("logging disabled: {err}");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.as_slice() {
        [] => Ok(()),
        [db_path] => print_projects(db_path),
        [db_path, command, replica_path, project, options @ ..] if command == "reconcile" => {
            ReconcileOptions::parse(options)
                .and_then(|options| reconcile(db_path, replica_path, project, &options))
        }
        _ => Err(USAGE.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_projects(db_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_db(db_path)?;
    let projects = SqliteProjectRepository::new(&conn).list_all()?;
    println!("projects={}", projects.len());
    for project in projects {
        println!(
            "{} count={} quality_count={} importance_count={}",
            project.name,
            project.count.unwrap_or(0),
            project.quality_count.unwrap_or(0),
            project.importance_count.unwrap_or(0)
        );
    }
    Ok(())
}

fn reconcile(
    db_path: &str,
    replica_path: &str,
    project: &str,
    options: &ReconcileOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &options.config_path {
        Some(path) => ReconcileConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => ReconcileConfig::default(),
    };
    let extra = match &options.extra_path {
        Some(path) => ExtraAssessments::from_template_json(
            &std::fs::read_to_string(path)?,
            &config.category_ns,
        )?,
        None => ExtraAssessments::default(),
    };
    println!("extra overrides={}", extra.overrides.len());

    let mut conn = open_db(db_path)?;
    let replica_conn = open_replica(replica_path)?;
    let replica = SqliteWikiReplica::try_new(&replica_conn)?;
    let namespaces = NamespaceDirectory::load(&conn, &config.wiki_dbname)?;

    let report = ProjectReconciler::new(&config, &replica, &replica, &namespaces)
        .update_project(&mut conn, project, &extra)?;

    println!("run_id={}", report.run_id);
    for kind in &report.kinds {
        println!(
            "{} buckets={} accepted={} rejected={} writes={} logged={}",
            kind.kind,
            kind.buckets,
            kind.accepted_pages,
            kind.rejected_pages,
            kind.writes,
            kind.logged
        );
    }
    println!(
        "unseen processed={} skipped={} moves_found={}",
        report.unseen.processed, report.unseen.skipped, report.unseen.moves_found
    );
    println!(
        "normalized deleted={} quality_backfilled={} importance_backfilled={}",
        report.normalized.deleted,
        report.normalized.quality_backfilled,
        report.normalized.importance_backfilled
    );
    println!(
        "{} count={} quality_count={} importance_count={}",
        report.project.name,
        report.project.count.unwrap_or(0),
        report.project.quality_count.unwrap_or(0),
        report.project.importance_count.unwrap_or(0)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ReconcileOptions;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn reconcile_options_accept_config_and_extra_in_any_order() {
        let options =
            ReconcileOptions::parse(&args(&["--extra", "params.json", "--config", "wp1.json"]))
                .unwrap();
        assert_eq!(options.config_path.as_deref(), Some("wp1.json"));
        assert_eq!(options.extra_path.as_deref(), Some("params.json"));
        assert_eq!(
            ReconcileOptions::parse(&[]).unwrap(),
            ReconcileOptions::default()
        );
    }

    #[test]
    fn reconcile_options_reject_unknown_and_dangling_flags() {
        assert!(ReconcileOptions::parse(&args(&["wp1.json"])).is_err());
        assert!(ReconcileOptions::parse(&args(&["--extra"])).is_err());
    }
}
