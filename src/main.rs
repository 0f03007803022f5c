use std::{process, sync::Arc};

use published_cache::{
    application::{
        error::{AppError, ErrorReport},
        service::PublishedCacheService,
    },
    cache::ConverterRegistry,
    config::{self, Command, LookupArgs},
    domain::routing::RoutingResult,
    infra::{memory::MemoryContentTree, telemetry},
};
use serde::Serialize;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

fn main() {
    if let Err(error) = run() {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let report = ErrorReport::from_error("published-cache", error);
    if dispatcher::has_been_set() {
        error!(error = %report.render(), "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %report.render(), "application error");
    });
}

#[derive(Debug, Serialize)]
struct RouteOutput<'a> {
    route: &'a str,
    #[serde(flatten)]
    result: RoutingResult,
}

#[derive(Debug, Serialize)]
struct UrlOutput {
    id: i32,
    route: Option<String>,
}

#[derive(Debug, Serialize)]
struct AliasOutput<'a> {
    alias: &'a str,
    #[serde(flatten)]
    result: RoutingResult,
}

fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    let lookup = cli_args.command.lookup();
    let tree = Arc::new(MemoryContentTree::from_path(&lookup.tree)?);
    let service = PublishedCacheService::new(
        &settings,
        tree.clone(),
        tree,
        ConverterRegistry::new(),
    );
    let snapshot = service.create_snapshot(lookup.preview);
    let culture = culture_of(lookup);

    let output = match &cli_args.command {
        Command::Route(args) => {
            let result = snapshot.resolve_route(&args.route, None, culture)?;
            to_json(&RouteOutput {
                route: &args.route,
                result,
            })?
        }
        Command::Url(args) => {
            let route = snapshot.build_route(args.id, None, culture)?;
            to_json(&UrlOutput { id: args.id, route })?
        }
        Command::Alias(args) => {
            let result = snapshot.resolve_alias(args.root_id, culture, &args.alias)?;
            to_json(&AliasOutput {
                alias: &args.alias,
                result,
            })?
        }
    };

    info!(preview = lookup.preview, "Lookup finished");
    println!("{output}");
    Ok(())
}

fn culture_of(lookup: &LookupArgs) -> Option<&str> {
    lookup
        .culture
        .as_deref()
        .map(str::trim)
        .filter(|culture| !culture.is_empty())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value)
        .map_err(|err| AppError::validation(format!("failed to encode output: {err}")))
}
