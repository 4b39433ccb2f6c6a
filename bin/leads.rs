use anyhow::{anyhow, Context};
use clap::{Arg, ArgAction, ArgMatches, Command};
use lead_ingest::{
    charset_for_label, inspect_lead_source, parse_leads, read_lead_file, reader_from_path,
    refresh_after_upload, refresh_projects, write_template, BatchUploader, CancellationToken,
    HttpLeadStore, IngestConfig, LeadStore, ParseMode, ProjectSnapshot, UploadConfig,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::prelude::*;

fn path_arg() -> Arg {
    Arg::new("path")
        .long("path")
        .value_parser(clap::value_parser!(PathBuf))
        .required(true)
        .help("Lead sheet (.csv, .csv.gz or .csv.zst)")
}

fn charset_arg() -> Arg {
    Arg::new("charset")
        .long("charset")
        .default_value("utf-8")
        .help("Character set of the sheet, e.g. windows-1256")
}

fn positional_arg() -> Arg {
    Arg::new("positional")
        .long("positional")
        .help("Columns are in fixed order (bulk paste format) instead of named by a header row")
        .action(ArgAction::SetTrue)
}

fn cli() -> Command {
    Command::new("leads")
        .about("Parse, preview and upload SaleMate lead sheets")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("Settings file (defaults to the per-user ingest.toml)"),
        )
        .subcommand(
            Command::new("template")
                .about("Write an example lead sheet")
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(clap::value_parser!(PathBuf))
                        .default_value("."),
                ),
        )
        .subcommand(
            Command::new("parse")
                .about("Parse a sheet and report kept and skipped rows")
                .arg(path_arg())
                .arg(charset_arg())
                .arg(positional_arg())
                .arg(Arg::new("json").long("json").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("inspect")
                .about("Show headers, their lead fields and row counts")
                .arg(path_arg())
                .arg(charset_arg()),
        )
        .subcommand(
            Command::new("upload")
                .about("Upload a sheet to a project in batches")
                .arg(Arg::new("project").long("project").required(true))
                .arg(path_arg())
                .arg(charset_arg())
                .arg(positional_arg())
                .arg(
                    Arg::new("batch-size")
                        .long("batch-size")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("concurrency")
                        .long("concurrency")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("cpl")
                        .long("cpl")
                        .help("Set the project's price per lead before uploading")
                        .value_parser(clap::value_parser!(f64)),
                ),
        )
        .subcommand(Command::new("projects").about("List projects and lead stats"))
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let matches = cli().get_matches();
    let config = IngestConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))
        .context("loading settings")?;

    match matches.subcommand() {
        Some(("template", sub)) => {
            let dir = sub
                .get_one::<PathBuf>("out")
                .ok_or_else(|| anyhow!("--out is required"))?;
            let path = write_template(dir).await?;
            println!("{}", path.display());
        }
        Some(("parse", sub)) => run_parse(sub).await?,
        Some(("inspect", sub)) => run_inspect(sub).await?,
        Some(("upload", sub)) => run_upload(sub, config).await?,
        Some(("projects", _)) => {
            let store = HttpLeadStore::new(&config.store)?;
            print_snapshot(&refresh_projects(&store).await?);
        }
        _ => unreachable!("subcommand_required"),
    }
    Ok(())
}

fn source_args(sub: &ArgMatches) -> anyhow::Result<(&Path, &'static encoding_rs::Encoding)> {
    let path = sub
        .get_one::<PathBuf>("path")
        .ok_or_else(|| anyhow!("--path is required"))?;
    let label = sub
        .get_one::<String>("charset")
        .map(String::as_str)
        .unwrap_or("utf-8");
    let charset = charset_for_label(label).ok_or_else(|| anyhow!("unknown charset: {label}"))?;
    Ok((path.as_path(), charset))
}

fn parse_mode(sub: &ArgMatches) -> ParseMode {
    if sub.get_flag("positional") {
        ParseMode::Positional
    } else {
        ParseMode::NamedHeader
    }
}

async fn run_parse(sub: &ArgMatches) -> anyhow::Result<()> {
    let (path, charset) = source_args(sub)?;
    let start = Instant::now();
    let text = read_lead_file(path, charset).await?;
    let outcome = parse_leads(&text, parse_mode(sub))?;
    let elapsed = start.elapsed().as_secs_f64();

    if sub.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    println!(
        "source={} leads={} skipped={} elapsed={:.3}s",
        path.display(),
        outcome.records.len(),
        outcome.skipped.len(),
        elapsed
    );
    for lead in outcome.records.iter().take(3) {
        println!("  {} - {}", lead.client_name, lead.client_phone);
    }
    if outcome.records.len() > 3 {
        println!("  ... and {} more leads", outcome.records.len() - 3);
    }
    for skipped in &outcome.skipped {
        println!("  skipped line {}: {:?}", skipped.line, skipped.reason);
    }
    Ok(())
}

async fn run_inspect(sub: &ArgMatches) -> anyhow::Result<()> {
    let (path, charset) = source_args(sub)?;
    let (reader, _meta) = reader_from_path(path, charset).await?;
    let summary = inspect_lead_source(reader).await?;
    println!(
        "source={} rows={} with_name_and_phone={}",
        path.display(),
        summary.row_count,
        summary.candidate_rows
    );
    for (header, field) in summary.headers.iter().zip(summary.layout.columns()) {
        match field {
            Some(field) => println!("  {header:<24} -> {}", field.column_name()),
            None => println!("  {header:<24} (ignored)"),
        }
    }
    Ok(())
}

async fn run_upload(sub: &ArgMatches, config: IngestConfig) -> anyhow::Result<()> {
    let (path, charset) = source_args(sub)?;
    let project_id = sub
        .get_one::<String>("project")
        .ok_or_else(|| anyhow!("--project is required"))?;

    let mut upload_config = UploadConfig::from(config.upload.clone());
    if let Some(&size) = sub.get_one::<usize>("batch-size") {
        upload_config.batch_size = size;
    }
    if let Some(&n) = sub.get_one::<usize>("concurrency") {
        upload_config.concurrency = n;
    }

    let store = HttpLeadStore::new(&config.store)?;
    if let Some(&cpl) = sub.get_one::<f64>("cpl") {
        update_cpl_if_changed(&store, project_id, cpl).await;
    }

    let text = read_lead_file(path, charset).await?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, no further batches will start");
            ctrl_c.cancel();
        }
    });

    let uploader = BatchUploader::new(store, upload_config);
    let start = Instant::now();
    let summary = uploader
        .upload_csv(project_id, &text, parse_mode(sub), &cancel, |p| {
            println!("{}/{} ({}%)", p.current, p.total, p.percentage);
        })
        .await?;
    let elapsed = start.elapsed();

    println!(
        "uploaded={} of {} failed_batches={} cancelled={} elapsed={:.1}s",
        summary.count,
        summary.total,
        summary.failed_batches.len(),
        summary.cancelled,
        elapsed.as_secs_f64()
    );
    for failure in &summary.failed_batches {
        println!(
            "  batch {} ({} leads): {}",
            failure.index + 1,
            failure.size,
            failure.error
        );
    }

    // available_leads changed on the backend side
    if let Some(snapshot) = refresh_after_upload(uploader.store()).await {
        print_snapshot(&snapshot);
    }
    Ok(())
}

async fn update_cpl_if_changed(store: &HttpLeadStore, project_id: &str, cpl: f64) {
    let current = match store.list_projects().await {
        Ok(projects) => projects
            .into_iter()
            .find(|p| p.id == project_id)
            .map(|p| p.price_per_lead),
        Err(err) => {
            tracing::warn!(error = %err, "could not read current CPL");
            None
        }
    };
    if current.is_some_and(|price| (price - cpl).abs() < f64::EPSILON) {
        return;
    }
    // CPL failures never block the upload.
    match store.update_project_cpl(project_id, cpl).await {
        Ok(()) => tracing::info!(project_id, cpl, "updated project CPL"),
        Err(err) => tracing::warn!(error = %err, "CPL update failed, uploading anyway"),
    }
}

fn print_snapshot(snapshot: &ProjectSnapshot) {
    let stats = &snapshot.stats;
    println!(
        "projects={} with_leads={} available_leads={} developers={}",
        stats.total_projects,
        stats.projects_with_leads,
        stats.total_available_leads,
        stats.total_developers
    );
    for project in &snapshot.projects {
        println!(
            "  {:<12} {:<32} leads={:<6} cpl={:.2}",
            project.id, project.name, project.available_leads, project.price_per_lead
        );
    }
}
