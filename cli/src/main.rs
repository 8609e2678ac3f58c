//! CCCBuilder CLI - builds transfer plans and runs articulation searches.
//!
//! ```text
//! cccb plan   <cccId> <yr> <fyId:majorId>...
//! cccb search <cccId> <yr> <fyId:majorId> <courseId>
//! ```
//!
//! `plan` opens a session, builds the plan and prints it with per-requirement
//! completion. `search` does the same, then searches every sending college
//! for one FY course, printing progress as records stream in. Ctrl-C aborts
//! a running search.

use anyhow::{Context, Result, bail};
use std::{
    env,
    fs::{self, File, OpenOptions},
    io,
    path::PathBuf,
    sync::Mutex,
};
use tokio::signal;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cccb_assist::{Endpoints, HttpDataSource, SearchEvent, SearchOutcome, SearchRunner, http_client};
use cccb_config::CccbConfig;
use cccb_core::{CollegeHits, group_search_hits, remove_duplicates, sort_courses};
use cccb_engine::{Adoption, SearchPhase, Selection, Session};
use cccb_types::{Course, CourseKey, FoundCourse, GroupRule, PlanCourse, RequirementInputs, SearchRecord};

const USAGE: &str = "usage:
  cccb plan   <cccId> <yr> <fyId:majorId>...
  cccb search <cccId> <yr> <fyId:majorId> <courseId>";

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_log_file() -> (Option<(PathBuf, File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!("Failed to create log dir {}: {e}", parent.display()));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!("Failed to open log file {}: {e}", candidate.display()));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // ~/.cccb/logs/cccb.log
    if let Some(config_path) = CccbConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("cccb.log"));
    }

    candidates
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Plan {
        ccc_id: String,
        yr: String,
        selections: Vec<Selection>,
    },
    Search {
        ccc_id: String,
        yr: String,
        selection: Selection,
        course_id: String,
    },
}

fn parse_selection(raw: &str) -> Result<Selection> {
    Selection::parse(raw).with_context(|| format!("expected <fyId:majorId>, got {raw:?}"))
}

fn parse_args(args: &[String]) -> Result<Command> {
    match args {
        [cmd, ccc_id, yr, selections @ ..] if cmd == "plan" && !selections.is_empty() => Ok(Command::Plan {
            ccc_id: ccc_id.clone(),
            yr: yr.clone(),
            selections: selections.iter().map(|s| parse_selection(s)).collect::<Result<_>>()?,
        }),
        [cmd, ccc_id, yr, selection, course_id] if cmd == "search" => Ok(Command::Search {
            ccc_id: ccc_id.clone(),
            yr: yr.clone(),
            selection: parse_selection(selection)?,
            course_id: course_id.clone(),
        }),
        _ => bail!("{USAGE}"),
    }
}

/// Plan entries ordered by prefix and course number, series last.
fn sorted_plan(plan: &[PlanCourse]) -> Vec<&PlanCourse> {
    let courses: Vec<Course> = plan.iter().map(|pc| pc.course.clone()).collect();
    sort_courses(&courses)
        .iter()
        .filter_map(|course| plan.iter().find(|pc| pc.key() == course.key()))
        .collect()
}

fn rule_label(rule: GroupRule) -> String {
    match rule {
        GroupRule::AllCourses => "all of".to_string(),
        GroupRule::NCourses(n) => format!("{n} of"),
        GroupRule::NCredits(units) => format!("{units} units from"),
    }
}

fn print_plan(session: &Session) {
    println!("Plan ({} courses):", session.plan().len());
    for course in sorted_plan(session.plan()) {
        let targets: Vec<String> = course
            .articulates_to
            .iter()
            .map(|t| format!("{} [{}]", t.fy_course.label(), t.major))
            .collect();
        if targets.is_empty() {
            println!("  {}", course.course.label());
        } else {
            println!("  {} -> {}", course.course.label(), targets.join(", "));
        }
    }

    println!("Requirements:");
    let statuses = session.statuses();
    // Majors at the same university share courses; list each course once.
    for group in remove_duplicates(session.requirements().to_vec()) {
        for (index, requirement) in group.requirements.iter().enumerate() {
            let completed = statuses
                .iter()
                .any(|s| s.inputs == group.inputs && s.index == index && s.completed);
            let mark = if completed { "x" } else { " " };
            let instructions = statuses
                .iter()
                .find(|s| s.inputs == group.inputs && s.index == index)
                .map(|s| s.instructions.as_str())
                .filter(|text| !text.is_empty())
                .map(|text| format!(" {text}"))
                .unwrap_or_default();
            println!(
                "  [{mark}] {}/{} #{}{instructions}",
                group.inputs.fy_id,
                group.inputs.major_id,
                index + 1
            );
            for course_group in requirement.required_courses.iter().filter(|g| !g.courses.is_empty()) {
                let labels: Vec<String> = sort_courses(&course_group.courses).iter().map(Course::label).collect();
                println!("      {} {}", rule_label(course_group.rule), labels.join(", "));
            }
        }
    }

    let unresolved = session.unresolved_courses();
    if !unresolved.is_empty() {
        println!("Unresolved:");
        for (inputs, course) in unresolved {
            println!("  {} ({}) for {}", course.label(), course.raw_id(), inputs.fy_id);
        }
    }
}

fn hit_lines(hits: &[CollegeHits]) -> Vec<String> {
    let mut lines = Vec::new();
    for hit in hits {
        lines.push(hit.college_name.as_deref().unwrap_or("(unknown college)").to_string());
        for option in &hit.options {
            let labels: Vec<String> = option.iter().map(FoundCourse::label).collect();
            lines.push(format!("  {}", labels.join(" + ")));
        }
    }
    lines
}

/// Print the per-college hits of one streamed record.
fn print_record(record: SearchRecord) {
    for line in hit_lines(&group_search_hits(&[record])) {
        println!("{line}");
    }
}

/// Locate `course_id` among the session's requirement courses.
fn find_fy_course(session: &Session, course_id: &str) -> Option<(RequirementInputs, Course)> {
    let key = CourseKey::course(course_id);
    session.requirements().iter().find_map(|group| {
        group
            .requirements
            .iter()
            .flat_map(|r| &r.required_courses)
            .flat_map(|g| &g.courses)
            .find(|c| c.key() == key)
            .map(|c| (group.inputs.clone(), c.clone()))
    })
}

async fn run_plan(config: &CccbConfig, ccc_id: &str, yr: &str, selections: &[Selection]) -> Result<()> {
    let endpoints = Endpoints::from_config(&config.endpoints)?;
    let source = HttpDataSource::new(http_client().clone(), &endpoints)?;
    let session = Session::open(&source, ccc_id, yr, selections).await?;
    print_plan(&session);
    Ok(())
}

async fn run_search(config: &CccbConfig, ccc_id: &str, yr: &str, selection: Selection, course_id: &str) -> Result<()> {
    let endpoints = Endpoints::from_config(&config.endpoints)?;
    let client = http_client().clone();
    let source = HttpDataSource::new(client.clone(), &endpoints)?;
    let runner = SearchRunner::new(client, &endpoints, config.institutions.clone(), config.search)?;

    let mut session = Session::open(&source, ccc_id, yr, &[selection]).await?;
    let (inputs, fy_course) = find_fy_course(&session, course_id)
        .with_context(|| format!("course {course_id} is not part of the selected requirements"))?;
    let university = config
        .university_name(&inputs.fy_id)
        .unwrap_or_else(|| inputs.fy_id.clone());
    println!("Searching for {} ({university})", fy_course.label());

    let mut handle = session.start_search(&runner, &fy_course, &inputs)?;
    let abort = handle.abort_handle();
    let ctrl_c = tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling search");
            abort.abort();
        }
    });

    let mut last_progress = 0;
    while let Some(event) = handle.events.recv().await {
        match event {
            SearchEvent::CacheHit { records } => println!("Cached results: {records} records"),
            SearchEvent::ChunkStarted { index, total, links } => {
                println!("Chunk {}/{total} ({links} colleges)", index + 1);
            }
            SearchEvent::Record(record) => print_record(record),
            SearchEvent::Progress { completed, total } => {
                tracing::debug!(completed, total, "Search progress");
                if completed != last_progress {
                    eprint!("\rProgress: {completed}/{total}");
                    last_progress = completed;
                }
            }
        }
    }
    if last_progress > 0 {
        eprintln!();
    }
    let outcome = handle.join().await;
    ctrl_c.abort();

    if let SearchOutcome::Failed(e) = &outcome {
        eprintln!("Search failed: {e}");
    }
    if let SearchOutcome::Completed(report) = &outcome
        && let Some(reason) = &report.interrupted
    {
        eprintln!("Search stopped early: {reason}");
    }

    match session.finish_search(&fy_course, &outcome) {
        SearchPhase::Found => {
            let hits = session.search_hits(&fy_course).map(<[_]>::to_vec).unwrap_or_default();
            println!("Found at {} colleges", hits.len());
            let colleges = config.colleges();
            'link: for hit in &hits {
                for option in &hit.options {
                    let adoption = session
                        .link_search_hit(&source, &colleges, &fy_course, hit, option)
                        .await;
                    if let Adoption::Linked { added } = adoption {
                        println!("Linked into plan ({added} added)");
                        break 'link;
                    }
                }
            }
            print_plan(&session);
        }
        SearchPhase::Exhausted => println!("No articulation found at any college"),
        SearchPhase::Idle => println!("Search cancelled"),
        SearchPhase::Searching => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = parse_args(&args)?;
    let config = CccbConfig::load()?;

    match command {
        Command::Plan {
            ccc_id,
            yr,
            selections,
        } => run_plan(&config, &ccc_id, &yr, &selections).await,
        Command::Search {
            ccc_id,
            yr,
            selection,
            course_id,
        } => run_search(&config, &ccc_id, &yr, selection, &course_id).await,
    }
}
