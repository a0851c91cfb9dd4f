use std::{process, sync::Arc, time::Duration};

use futures::future::try_join_all;
use recollect::{
    application::{
        drafts::{CardDraft, card_draft_table},
        error::AppError,
        loaders::RouteLoader,
        motion::{FixedMotionSignal, motion_preferences},
        queries::Queries,
        render::markdown,
    },
    cache::{CacheConfig, QueryClient},
    config,
    dispatch::Action,
    infra::{error::InfraError, memory::MemoryStudyRepository, telemetry},
    keys::catalog,
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

/// Operations reported after a prefetch, in call order of a typical route.
const REPOSITORY_OPERATIONS: &[&str] = &[
    "list_decks",
    "find_deck",
    "list_cards",
    "count_cards",
    "find_algorithm",
    "list_algorithm_decks",
    "find_template",
    "list_template_decks",
    "list_lessons",
    "lesson_data",
    "today_review_totals",
    "find_card",
    "list_reviews",
    "list_settings",
];

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?report.messages, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?report.messages, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        InfraError::configuration(format!("failed to load configuration: {err}"))
    })?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Taxonomy(config::TaxonomyArgs::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Taxonomy(args) => run_taxonomy(args),
        config::Command::Key(args) => run_key(args),
        config::Command::Prefetch(args) => run_prefetch(settings, args).await,
        config::Command::Draft(args) => run_draft(settings, args),
        config::Command::Motion(args) => run_motion(settings, args),
    }
}

fn run_taxonomy(args: config::TaxonomyArgs) -> Result<(), AppError> {
    for (info, key) in catalog::samples() {
        let rendered = if args.json {
            serde_json::to_string(&key).map_err(|err| AppError::unexpected(err.to_string()))?
        } else {
            key.to_string()
        };
        let call = if info.sample.is_empty() {
            info.name.to_string()
        } else {
            format!("{} {}", info.name, info.sample.join(" "))
        };
        println!("{call:<44} {rendered}");
    }
    Ok(())
}

fn run_key(args: config::KeyArgs) -> Result<(), AppError> {
    let key = catalog::build(&args.builder, &args.args)
        .map_err(|err| AppError::validation(err.to_string()))?;
    if args.display {
        println!("{key}");
    } else {
        let json =
            serde_json::to_string(&key).map_err(|err| AppError::unexpected(err.to_string()))?;
        println!("{json}");
    }
    Ok(())
}

async fn run_prefetch(
    settings: config::Settings,
    args: config::PrefetchArgs,
) -> Result<(), AppError> {
    let repo = Arc::new(
        MemoryStudyRepository::seeded().with_latency(Duration::from_millis(args.latency_ms)),
    );
    let client = QueryClient::new(&CacheConfig::from(&settings.cache));
    let loader = RouteLoader::new(client.clone(), Queries::new(repo.clone()));

    info!(
        target = "recollect::prefetch",
        route = %args.route,
        loads = args.loads,
        "Starting prefetch"
    );

    let loads = (0..args.loads).map(|_| loader.load(&args.route));
    let loaded = try_join_all(loads).await?;

    if let Some(first) = loaded.first() {
        for key in &first.keys {
            let state = client.entry_state(key);
            let status = match state {
                Some(state) if state.failed => "failed",
                Some(state) if state.stale => "stale",
                Some(_) => "fresh",
                None => "missing",
            };
            println!("{status:<8} {key}");
        }
    }

    for op in REPOSITORY_OPERATIONS {
        let calls = repo.call_count(op);
        if calls > 0 {
            println!("{op:<22} {calls} call(s)");
        }
    }
    Ok(())
}

fn run_draft(settings: config::Settings, args: config::DraftArgs) -> Result<(), AppError> {
    let table = card_draft_table(settings.dispatch.unknown_action);
    let mut draft = CardDraft::default();

    for raw in &args.actions {
        let action = match raw.split_once('=') {
            Some((name, payload)) => Action::with_payload(name.to_string(), payload.to_string()),
            None => Action::new(raw.to_string()),
        };
        let outcome = table.dispatch(&mut draft, action)?;
        info!(action = %raw, outcome = ?outcome, "dispatched draft action");
    }

    let renderer = markdown();
    println!("front: {}", renderer.to_text(&draft.front));
    println!("back:  {}", renderer.to_text(&draft.back));
    println!("tags:  {}", draft.tags.join(", "));
    println!("submittable: {}", draft.is_submittable(renderer));
    Ok(())
}

fn run_motion(settings: config::Settings, args: config::MotionArgs) -> Result<(), AppError> {
    let system = Arc::new(FixedMotionSignal(settings.motion.system_reduced_motion));
    let (writer, reader) =
        motion_preferences(settings.motion.reduce_motion, system, QueryClient::default());

    if let Some(setting) = args.set {
        writer.set(setting);
    }

    println!("setting: {}", reader.get());
    println!("reduce motion: {}", reader.reduce_motion());
    Ok(())
}
