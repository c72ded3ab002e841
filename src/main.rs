use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use campus_portal::analysis::Analyzer;
use campus_portal::config::Settings;
use campus_portal::models::{AssignmentDraft, StatusFilter, SubmissionDraft, SubmissionFile};
use campus_portal::recognition::{self, OccupancyRecognizer};
use campus_portal::submissions::SubmissionTracker;
use campus_portal::{import, random, report};

#[derive(Parser)]
#[command(name = "campus-portal")]
#[command(about = "Assignment submissions and hostel occupancy for the student campus portal", long_about = None)]
struct Cli {
    /// Seed for every random draw, for reproducible runs
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// JSON settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create assignments, submit sample versions and analyze them
    Assignments {
        /// CSV with title,faculty,description columns
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = StatusFilter::All)]
        status: StatusFilter,
        #[arg(long)]
        latency_ms: Option<u64>,
    },
    /// Run the recognition loop against a simulated camera
    Hostel {
        #[arg(long, default_value_t = 10)]
        ticks: u64,
        #[arg(long, default_value_t = 0.8)]
        detect_rate: f64,
        #[arg(long)]
        poll_ms: Option<u64>,
        /// Alert ids to mark as read
        #[arg(long = "read")]
        read: Vec<u64>,
    },
    /// Run both simulations and write a report
    Report {
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = StatusFilter::All)]
        status: StatusFilter,
        #[arg(long, default_value_t = 10)]
        ticks: u64,
        #[arg(long, default_value_t = 0.8)]
        detect_rate: f64,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        /// Write a JSON snapshot instead of markdown
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Assignments {
            csv,
            status,
            latency_ms,
        } => {
            if let Some(latency_ms) = latency_ms {
                settings.analysis_latency_ms = latency_ms;
            }
            settings.validate()?;
            let tracker = run_assignments(&settings, cli.seed, csv.as_deref()).await?;
            let tracker = tracker.read().await;
            print!("{}", report::render_submissions(&tracker.grouped(status)));
        }
        Commands::Hostel {
            ticks,
            detect_rate,
            poll_ms,
            read,
        } => {
            if let Some(poll_ms) = poll_ms {
                settings.poll_interval_ms = poll_ms;
            }
            settings.validate()?;
            let recognizer = run_hostel(&settings, cli.seed, ticks, detect_rate).await?;
            let mut recognizer = recognizer.write().await;
            for alert_id in read {
                if !recognizer.mark_alert_as_read(alert_id) {
                    println!("No alert with id {alert_id}.");
                }
            }
            println!("Hostel occupancy:");
            print!("{}", report::render_hostels(&recognizer));
            println!("Security updates:");
            print!("{}", report::render_alerts(recognizer.alerts()));
        }
        Commands::Report {
            csv,
            status,
            ticks,
            detect_rate,
            out,
            json,
        } => {
            let tracker = run_assignments(&settings, cli.seed, csv.as_deref()).await?;
            let recognizer = run_hostel(&settings, cli.seed, ticks, detect_rate).await?;
            let (tracker, recognizer) = (tracker.read().await, recognizer.read().await);
            let snapshot = report::PortalSnapshot::capture(&tracker, &recognizer, status);
            let body = if json {
                report::build_json(&snapshot)?
            } else {
                report::build_report(&snapshot, &recognizer)
            };
            std::fs::write(&out, body)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn run_assignments(
    settings: &Settings,
    seed: Option<u64>,
    csv: Option<&std::path::Path>,
) -> anyhow::Result<Arc<RwLock<SubmissionTracker>>> {
    let tracker = Arc::new(RwLock::new(SubmissionTracker::new()));

    {
        let mut guard = tracker.write().await;
        match csv {
            Some(path) => {
                import::import_assignments_from_path(&mut guard, path)?;
            }
            None => {
                guard.add_assignment(&mut AssignmentDraft {
                    title: "HW1".to_string(),
                    faculty: "Dr.X".to_string(),
                    description: "Essay on campus sustainability".to_string(),
                });
            }
        }

        let assignment_ids: Vec<u64> = guard.assignments().iter().map(|a| a.id).collect();
        for assignment_id in assignment_ids {
            let mut alice = student_draft("Alice");
            guard.submit_assignment(assignment_id, &mut alice);
            guard.submit_assignment(assignment_id, &mut student_draft("Bob"));
            alice.file = Some(sample_file("Alice", 2));
            guard.submit_assignment(assignment_id, &mut alice);
        }
    }

    let analyzer = Analyzer::new(
        Arc::clone(&tracker),
        Box::new(random::RandomScorer::new(random::rng_from(seed))),
        settings.analysis_latency(),
    );
    let mut results = analyzer.subscribe();

    let pending = tracker.read().await.pending_ids();
    info!("analyzing {} pending submissions", pending.len());
    for submission_id in pending {
        analyzer.analyze(submission_id);
    }
    while analyzer.is_busy() {
        results
            .changed()
            .await
            .context("analysis results channel closed")?;
    }

    Ok(tracker)
}

async fn run_hostel(
    settings: &Settings,
    seed: Option<u64>,
    ticks: u64,
    detect_rate: f64,
) -> anyhow::Result<Arc<RwLock<OccupancyRecognizer>>> {
    let recognizer = Arc::new(RwLock::new(
        OccupancyRecognizer::new(recognition::default_hostels(), recognition::default_alerts())
            .with_limits(settings.max_occupancy, settings.crowded_threshold),
    ));

    let seed = seed.map(|seed| seed.wrapping_add(1));
    let detector = random::SimulatedDetector::new(random::rng_from(seed), detect_rate);
    let identities = random::RandomIdentities::new(
        random::rng_from(seed.map(|seed| seed.wrapping_add(1))),
        settings.id_pool,
        settings.name_pool,
    );

    info!(
        "polling detector every {} ms for {} ticks",
        settings.poll_interval_ms, ticks
    );
    let handle = recognition::spawn_recognition_loop(
        Arc::clone(&recognizer),
        Box::new(detector),
        Box::new(identities),
        settings.poll_interval(),
        Some(ticks),
    );
    let completed = handle.await.context("recognition loop panicked")?;
    info!("recognition finished after {} ticks", completed);

    Ok(recognizer)
}

fn student_draft(name: &str) -> SubmissionDraft {
    SubmissionDraft {
        student_name: name.to_string(),
        file: Some(sample_file(name, 1)),
    }
}

fn sample_file(name: &str, version: usize) -> SubmissionFile {
    SubmissionFile {
        name: format!("{}-v{}.pdf", name.to_lowercase(), version),
        contents: format!("{name} draft {version}").into_bytes(),
    }
}
