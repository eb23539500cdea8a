use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use colored::Colorize;
use dialoguer::Confirm;

use chatlens_sessions::{
    copy_original, render_export, ExportFormat, SearchMode, SessionFilter, SessionIndex,
    SessionSummary,
};

use crate::config::ChatlensConfig;
use crate::Command;

pub async fn run(
    index: &mut SessionIndex,
    config: &ChatlensConfig,
    command: Command,
) -> Result<()> {
    match command {
        Command::Scan { json } => scan(index, json).await,
        Command::List {
            search,
            container,
            after,
            before,
            limit,
            json,
        } => {
            index.scan().await;
            let filter = build_filter(search, container, after, before)?;
            let mut sessions = index.list(&filter);
            sessions.truncate(limit.unwrap_or_else(|| config.max_recent()));
            list(&sessions, json)
        }
        Command::Show { id, json } => show(index, &id, json).await,
        Command::Search { terms, mode, json } => {
            index.scan().await;
            search(index, &terms, mode.into(), json)
        }
        Command::Topics { ids, limit, json } => {
            index.scan().await;
            topics(index, &ids, limit, json)
        }
        Command::Export {
            ids,
            format,
            output,
            original,
        } => export(index, config, ids, format.into(), output, original).await,
        Command::Import { file, json } => import(index, &file, json),
        Command::Stats { json } => stats(index, json).await,
    }
}

async fn scan(index: &mut SessionIndex, json: bool) -> Result<()> {
    index.scan().await;
    let stats = index.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!(
            "{} {} sessions across {} containers",
            "Indexed".green().bold(),
            stats.sessions,
            stats.containers
        );
        println!(
            "  {} from cache, {} parse errors, {} oversize skipped",
            stats.cache_hits, stats.parse_errors, stats.skipped_large
        );
    }
    Ok(())
}

fn list(sessions: &[SessionSummary], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }

    for session in sessions {
        let count = session.message_count;
        let marker = if count.is_exact() { "" } else { "~" };
        println!(
            "{}  {}  {}{} msgs  {}",
            session.id.yellow(),
            session.updated_at.format("%Y-%m-%d %H:%M"),
            marker,
            count.value(),
            session.container_label.cyan(),
        );
        if !session.first_preview.is_empty() {
            println!("    {}", clip(&session.first_preview, 100).dimmed());
        }
    }
    Ok(())
}

async fn show(index: &mut SessionIndex, id: &str, json: bool) -> Result<()> {
    index.scan().await;
    index.load(id);

    let Some(session) = index.get(id) else {
        bail!("No session with id {id}");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(session)?);
        return Ok(());
    }

    println!(
        "{} {} ({})",
        "Session".bold(),
        session.id.yellow(),
        session.container_label.cyan()
    );
    println!(
        "Created {}  Updated {}  {} bytes",
        session.created_at.format("%Y-%m-%d %H:%M"),
        session.updated_at.format("%Y-%m-%d %H:%M"),
        session.size_bytes
    );
    if !session.tags.is_empty() {
        println!("Tags: {}", session.tags.join(", "));
    }

    for message in &session.messages {
        let role = match message.role {
            chatlens_sessions::Role::User => "user".green().bold(),
            chatlens_sessions::Role::Assistant => "assistant".blue().bold(),
        };
        println!("\n[{}] {}", role, message.timestamp.format("%H:%M:%S"));
        println!("{}", message.content);
    }
    Ok(())
}

fn search(index: &SessionIndex, terms: &[String], mode: SearchMode, json: bool) -> Result<()> {
    let results = index.deep_search(terms, mode);

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No matches.");
        return Ok(());
    }

    for result in &results {
        let breakdown = result
            .per_term
            .iter()
            .map(|(term, count)| format!("{term}: {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "{}  {} matches  ({breakdown})",
            result.id.yellow(),
            result.total.to_string().bold()
        );
    }
    Ok(())
}

fn topics(index: &SessionIndex, ids: &[String], limit: usize, json: bool) -> Result<()> {
    let subset = (!ids.is_empty()).then_some(ids);
    let topics = index.global_topics(subset, limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&topics)?);
        return Ok(());
    }

    for topic in &topics {
        println!("{:>6}  {}", topic.count, topic.word);
    }
    Ok(())
}

async fn export(
    index: &mut SessionIndex,
    config: &ChatlensConfig,
    ids: Vec<String>,
    format: ExportFormat,
    output: Option<PathBuf>,
    original: bool,
) -> Result<()> {
    index.scan().await;

    let ids = if ids.is_empty() {
        index.snapshot().into_iter().map(|s| s.id).collect()
    } else {
        ids
    };

    if original {
        let [id] = ids.as_slice() else {
            bail!("--original exports exactly one session");
        };
        let Some(source) = index.path_of(id).map(Path::to_path_buf) else {
            bail!("No backing file known for session {id}");
        };
        let Some(dest) = output else {
            bail!("--original requires --output");
        };
        confirm_overwrite(config, &dest)?;
        let bytes = copy_original(&source, &dest)?;
        println!("{} {} bytes to {}", "Copied".green().bold(), bytes, dest.display());
        return Ok(());
    }

    let sessions = index.sessions_for_export(&ids);
    if sessions.is_empty() {
        bail!("Nothing to export");
    }

    let payload = render_export(&sessions, format);
    match output {
        Some(dest) => {
            confirm_overwrite(config, &dest)?;
            std::fs::write(&dest, payload)
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            println!(
                "{} {} sessions to {}",
                "Exported".green().bold(),
                sessions.len(),
                dest.display()
            );
        }
        None => print!("{payload}"),
    }
    Ok(())
}

fn import(index: &mut SessionIndex, file: &Path, json: bool) -> Result<()> {
    let report = index.import_file(file);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} {} imported, {} skipped as duplicates",
        "Import:".bold(),
        report.imported.to_string().green(),
        report.skipped
    );
    for error in &report.errors {
        println!("  {} {}", "error:".red(), error);
    }
    Ok(())
}

async fn stats(index: &mut SessionIndex, json: bool) -> Result<()> {
    index.scan().await;
    let scan_stats = index.stats();
    let containers = index.container_stats();

    if json {
        let combined = serde_json::json!({
            "scan": scan_stats,
            "containers": containers,
        });
        println!("{}", serde_json::to_string_pretty(&combined)?);
        return Ok(());
    }

    println!(
        "{} sessions, {} containers, {} cache hits",
        scan_stats.sessions, scan_stats.containers, scan_stats.cache_hits
    );
    for c in &containers {
        println!(
            "{:>5}  {}  ({} KiB)",
            c.sessions,
            c.label.cyan(),
            c.total_bytes / 1024
        );
    }
    Ok(())
}

fn confirm_overwrite(config: &ChatlensConfig, dest: &Path) -> Result<()> {
    if dest.exists() && config.confirm_destructive() {
        let proceed = Confirm::new()
            .with_prompt(format!("{} exists, overwrite?", dest.display()))
            .default(false)
            .interact()?;
        if !proceed {
            bail!("Aborted");
        }
    }
    Ok(())
}

fn build_filter(
    search: Option<String>,
    container: Option<String>,
    after: Option<String>,
    before: Option<String>,
) -> Result<SessionFilter> {
    Ok(SessionFilter {
        search,
        container,
        after: after.as_deref().map(parse_day).transpose()?,
        before: before.as_deref().map(parse_day).transpose()?,
    })
}

fn parse_day(day: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .with_context(|| format!("Invalid date {day}, expected YYYY-MM-DD"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .context("Invalid time construction")?;
    Ok(Utc.from_utc_datetime(&midnight))
}

fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect::<String>() + "..."
    }
}
