use std::{sync::Arc, time::Duration};

use clap::Parser;
use tracing_subscriber::EnvFilter;
use wikisearch::{
    backend::TantivyBackend,
    cli::{Cli, Command, PartitionAction, TokenAction},
    data_dir::DataDir,
    error::{self, Error},
    facade::{FacadeConfig, SearchFacade, SearchRequest, SearchResults},
    guard::TokenGuard,
    partition::LanguageFilter,
    rebuild::{RebuildStatus, rebuild_index},
    registry::Registry,
};

fn init_tracing(verbose: u8) {
    let filter = if let Ok(env) = std::env::var("WIKISEARCH_LOG") {
        EnvFilter::new(env)
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let registry = Registry::open(&data_dir.registry_db())?;

    match cli.command {
        Command::Partition { action } => match action {
            PartitionAction::Add { path, name } => {
                partition_add(&registry, &path, &name)?;
            }
            PartitionAction::Remove { name } => {
                partition_remove(&registry, &data_dir, &name)?;
            }
            PartitionAction::List { json } => {
                partition_list(&registry, json)?;
            }
        },
        Command::Token { action } => match action {
            TokenAction::Add { token, label } => {
                registry.add_admin_token(&token, &label)?;
                println!("Added admin token.");
            }
            TokenAction::Remove { token } => {
                if !registry.remove_admin_token(&token)? {
                    return Err(Error::NotFound {
                        kind: "admin token",
                        name: token,
                    });
                }
                println!("Removed admin token.");
            }
            TokenAction::List => {
                for (_token, label) in registry.list_admin_tokens()? {
                    println!("{label}");
                }
            }
        },
        Command::Search(args) => {
            cmd_search(&registry, &data_dir, &args)?;
        }
        Command::Rebuild(args) => {
            cmd_rebuild(&registry, &data_dir, &args)?;
        }
        Command::Status(args) => {
            cmd_status(&registry, &data_dir, args.json)?;
        }
        Command::Completions(_) => unreachable!("handled above"),
    }

    Ok(())
}

fn partition_add(
    registry: &Registry,
    path: &std::path::Path,
    name: &str,
) -> error::Result<()> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "directory does not exist: {}",
            path.display()
        )));
    }
    if !path.is_dir() {
        return Err(Error::Config(format!(
            "path is not a directory: {}",
            path.display()
        )));
    }

    let abs_path = path.canonicalize().map_err(|e| {
        Error::Config(format!("cannot resolve path {}: {e}", path.display()))
    })?;

    if registry.get_partition(name)?.is_some() {
        return Err(Error::Config(format!(
            "partition '{name}' already exists"
        )));
    }

    registry.set_partition(name, &abs_path.to_string_lossy())?;

    println!("Added partition '{name}' -> {}", abs_path.display());
    Ok(())
}

fn partition_remove(
    registry: &Registry,
    data_dir: &DataDir,
    name: &str,
) -> error::Result<()> {
    if registry.get_partition(name)?.is_none() {
        return Err(Error::NotFound {
            kind: "partition",
            name: name.to_string(),
        });
    }

    registry.remove_partition(name)?;

    // Drop the on-disk index for this partition.
    let index_dir = data_dir.root().join("index").join(name);
    if index_dir.exists() {
        std::fs::remove_dir_all(&index_dir)?;
    }

    println!("Removed partition '{name}'");
    Ok(())
}

fn partition_list(registry: &Registry, json: bool) -> error::Result<()> {
    let partitions = registry.list_partitions()?;

    if json {
        let entries: Vec<_> = partitions
            .iter()
            .map(|(name, path)| {
                serde_json::json!({"name": name, "source": path})
            })
            .collect();
        println!("{}", serde_json::to_string(&entries)?);
    } else if partitions.is_empty() {
        println!("No partitions registered.");
    } else {
        for (name, path) in &partitions {
            println!("{name}\t{path}");
        }
    }
    Ok(())
}

fn facade_config(registry: &Registry) -> error::Result<FacadeConfig> {
    let defaults = FacadeConfig::default();

    let max_results = registry
        .get_setting_or("max_results", &defaults.max_results.to_string())?
        .parse()
        .map_err(|_| Error::Config("max_results must be an integer".into()))?;
    let timeout_ms: u64 = registry
        .get_setting_or(
            "timeout_ms",
            &defaults.timeout.as_millis().to_string(),
        )?
        .parse()
        .map_err(|_| Error::Config("timeout_ms must be an integer".into()))?;

    Ok(FacadeConfig {
        max_results,
        timeout: Duration::from_millis(timeout_ms),
    })
}

fn cmd_search(
    registry: &Registry,
    data_dir: &DataDir,
    args: &wikisearch::cli::SearchArgs,
) -> error::Result<()> {
    let backend = Arc::new(TantivyBackend::open(registry, data_dir)?);
    let mut config = facade_config(registry)?;
    if let Some(ms) = args.timeout_ms {
        config.timeout = Duration::from_millis(ms);
    }
    let facade = SearchFacade::new(backend, config);

    let request = SearchRequest {
        query: args.query.clone(),
        scope: args.partitions.clone(),
        languages: LanguageFilter::from_codes(args.languages.iter().cloned()),
        limit: Some(args.count),
    };

    let results = facade.search(&request)?;

    if results.is_degraded() {
        eprintln!(
            "warning: results are incomplete, partitions unavailable: {}",
            results.degraded.join(", ")
        );
    }

    if args.json {
        println!("{}", serde_json::to_string(&results)?);
    } else {
        format_human(&results);
    }
    Ok(())
}

/// Format results for human-readable terminal output.
fn format_human(results: &SearchResults) {
    if results.hits.is_empty() {
        println!("No results found.");
        return;
    }

    for (i, hit) in results.hits.iter().enumerate() {
        println!(
            "{:>3}. [{:.3}] {}:{} {} ({})",
            i + 1,
            hit.score,
            hit.partition,
            hit.path,
            hit.page_ref,
            hit.language
        );
        if !hit.title.is_empty() {
            println!("     {}", hit.title);
        }
        if !hit.excerpt.is_empty() {
            println!("     {}", hit.excerpt);
        }
    }
    println!("\n{} result(s)", results.total);
}

fn cmd_rebuild(
    registry: &Registry,
    data_dir: &DataDir,
    args: &wikisearch::cli::RebuildArgs,
) -> error::Result<()> {
    let guard = TokenGuard::from_registry(registry)?;
    let backend = TantivyBackend::open(registry, data_dir)?;

    let status = rebuild_index(&guard, &args.token, &backend)?;
    match status {
        RebuildStatus::Scheduled(count) => {
            if args.json {
                println!("{}", serde_json::json!({ "scheduled": count }));
            } else {
                println!("Scheduled {count} page(s) for reindexing.");
            }
            Ok(())
        }
        RebuildStatus::Denied => {
            if args.json {
                println!("{}", serde_json::json!({ "error": "denied" }));
            } else {
                eprintln!("access denied: rebuild requires an admin token");
            }
            std::process::exit(2);
        }
    }
}

fn cmd_status(
    registry: &Registry,
    data_dir: &DataDir,
    json: bool,
) -> error::Result<()> {
    let partitions = registry.list_partitions()?;
    let backend = TantivyBackend::open(registry, data_dir)?;
    let config = facade_config(registry)?;

    let mut counts = Vec::with_capacity(partitions.len());
    for (name, source) in &partitions {
        counts.push((name.clone(), source.clone(), backend.doc_count(name)?));
    }

    if json {
        let entries: Vec<_> = counts
            .iter()
            .map(|(name, source, pages)| {
                serde_json::json!({
                    "name": name,
                    "source": source,
                    "pages": pages,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::json!({
                "data_dir": data_dir.root().display().to_string(),
                "max_results": config.max_results,
                "timeout_ms": config.timeout.as_millis() as u64,
                "partitions": entries,
            })
        );
    } else {
        println!("Data directory: {}", data_dir.root().display());
        println!("Max results: {}", config.max_results);
        println!("Partition timeout: {}ms", config.timeout.as_millis());
        println!("Partitions: {}", counts.len());
        for (name, source, pages) in &counts {
            println!("  {name}: {source} ({pages} pages)");
        }
    }
    Ok(())
}
