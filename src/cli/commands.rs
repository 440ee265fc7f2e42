//! CLI command implementations
//!
//! Both commands load the same session: config, fixture, criteria and
//! comparator. `search` runs the federated search on a tokio runtime;
//! `explain` only plans and renders.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use crate::catalog::FieldCatalog;
use crate::compiler::{MySqlRenderer, PredicateCompiler, Renderer};
use crate::config::SearchConfig;
use crate::federation::{FederationRouter, InMemoryProvider, ProviderRegistry, SearchContext};
use crate::model::{ContactRecord, Principal, SearchCriteria};
use crate::ordering::{ComparatorFactory, ContactComparator, SortDirection};

use super::args::{Command, QueryArgs};
use super::errors::{CliError, CliResult};
use super::io::{record_json, write_stdout, Fixture, ProviderFixture};

/// Main entry point for CLI
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Search { query } => search(&query),
        Command::Explain { query } => explain(&query),
    }
}

/// Prints every matching contact as one JSON line
pub fn search(args: &QueryArgs) -> CliResult<()> {
    let catalog = FieldCatalog::standard();
    for record in run_search(args)? {
        write_stdout(&record_json(&record, catalog))?;
    }
    Ok(())
}

/// Prints the dispatch plan with the rendered SQL of each dispatch
pub fn explain(args: &QueryArgs) -> CliResult<()> {
    write_stdout(&explain_report(args)?)
}

/// Runs the federated search and drains the results
pub fn run_search(args: &QueryArgs) -> CliResult<Vec<ContactRecord>> {
    let session = Session::prepare(args)?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::search_failed(format!("Failed to create tokio runtime: {}", e)))?;

    let mut results = rt.block_on(session.router.search(
        &session.criteria,
        &session.context,
        &session.comparator,
    ))?;
    let records = results.collect_all()?;
    results.close();

    debug!(metrics = %session.router.metrics().to_json(), "SEARCH_METRICS");
    Ok(records)
}

/// Plans the search and renders each dispatch without running it
pub fn explain_report(args: &QueryArgs) -> CliResult<Value> {
    let session = Session::prepare(args)?;
    let compiler = PredicateCompiler::with_options(session.config.compiler.clone());
    let renderer = MySqlRenderer::default();

    let dispatches = session
        .router
        .plan(&session.criteria)
        .into_iter()
        .map(|dispatch| -> CliResult<Value> {
            let predicate = compiler.compile(
                &dispatch.criteria,
                session.context.permissions.as_ref(),
                &session.context.principal,
            )?;
            let rendered = predicate.render_with(&renderer);
            Ok(json!({
                "provider": dispatch.provider.id().as_str(),
                "folders": dispatch.criteria.folder_scope(),
                "matches_nothing": predicate.matches_nothing(),
                "where": rendered.sql,
                "params": rendered.params,
            }))
        })
        .collect::<CliResult<Vec<_>>>()?;

    Ok(json!({
        "order_by": renderer.render_order(&session.comparator.order_spec()),
        "limit": session.criteria.limit(),
        "dispatches": dispatches,
    }))
}

/// Everything one command needs
struct Session {
    config: SearchConfig,
    criteria: SearchCriteria,
    comparator: ContactComparator,
    context: SearchContext,
    router: FederationRouter,
}

impl Session {
    fn prepare(args: &QueryArgs) -> CliResult<Self> {
        let config = load_config(args.config.as_deref())?;
        let fixture = Fixture::load(&args.fixture)?;
        let criteria = build_criteria(args)?;
        let comparator = build_comparator(args)?;

        let mut principal = Principal::new(args.context, args.user);
        if let Some(admin) = fixture.context_admin {
            principal = principal.with_context_admin(admin);
        }
        let context = SearchContext::new(principal, Arc::new(fixture.permissions.clone()));
        let router = build_router(&fixture, &config)?;

        Ok(Self {
            config,
            criteria,
            comparator,
            context,
            router,
        })
    }
}

fn load_config(path: Option<&Path>) -> CliResult<SearchConfig> {
    match path {
        Some(path) => Ok(SearchConfig::load(path)?),
        None => Ok(SearchConfig::default()),
    }
}

fn build_criteria(args: &QueryArgs) -> CliResult<SearchCriteria> {
    let catalog = FieldCatalog::standard();
    let mut builder = SearchCriteria::builder()
        .folders(args.folders.iter().copied())
        .or_mode(args.or_mode)
        .auto_complete(args.auto_complete);

    if let Some(pattern) = &args.pattern {
        builder = builder.pattern(pattern.clone());
    }
    if let Some(bucket) = &args.first_letter {
        builder = builder.first_letter(bucket.clone());
    }
    for (name, value) in &args.filters {
        let mapping = catalog.resolve_name(name)?;
        builder = builder.filter(mapping.id, value.clone());
    }
    if let Some(id) = args.ignore {
        builder = builder.ignore_record(id);
    }
    if args.all {
        builder = builder.match_all();
    }
    if let Some(limit) = args.limit {
        builder = builder.limit(limit);
    }

    Ok(builder.build()?)
}

fn build_comparator(args: &QueryArgs) -> CliResult<ContactComparator> {
    let catalog = FieldCatalog::standard();
    let field = catalog.resolve_name(&args.sort)?.id;
    let direction = if args.desc {
        SortDirection::Desc
    } else {
        SortDirection::Asc
    };
    Ok(ComparatorFactory::new(catalog).build(field, direction, args.locale.as_deref())?)
}

fn build_router(fixture: &Fixture, config: &SearchConfig) -> CliResult<FederationRouter> {
    let provider = |source: &ProviderFixture| {
        Arc::new(
            InMemoryProvider::new(source.id.clone())
                .with_compiler(PredicateCompiler::with_options(config.compiler.clone()))
                .with_records(source.contacts.iter().cloned()),
        )
    };

    let mut registry = ProviderRegistry::new(provider(&fixture.default_provider));
    for source in &fixture.specialized {
        registry
            .register(provider(source), source.folders.iter().copied())
            .map_err(|e| CliError::fixture_error(e.to_string()))?;
    }

    Ok(FederationRouter::new(registry).with_config(config.router.clone()))
}
