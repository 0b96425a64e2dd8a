use semrank::cli::{Cli, Commands, ConfigAction};
use semrank::config::Config;
use semrank::embedding::WordVectors;
use semrank::error::{Result, SemrankError};
use semrank::eval::{compare, load_judgments, Comparison, MethodComparison, MetricSet, QueryResult};
use semrank::index::{IndexBuilder, IndexStore, PostingSet, SemanticExpander};
use semrank::ranking::Ranker;
use semrank::tokenize::{split_sentences, BpeTokenizer, Tokenizer};

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Prepare { input, output } => {
            cmd_prepare(&input, &output)?;
        }
        Commands::Build {
            fresh,
            literal_only,
            profile,
        } => {
            cmd_build(cli.config, fresh, literal_only, profile)?;
        }
        Commands::Query {
            query,
            semantic,
            limit,
            json,
        } => {
            cmd_query(cli.config, &query, semantic, limit, json)?;
        }
        Commands::Eval {
            cutoff,
            json,
            profile,
        } => {
            cmd_eval(cli.config, cutoff, json, profile)?;
        }
        Commands::Stats => {
            cmd_stats(cli.config)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "semrank=debug" } else { "semrank=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn cmd_prepare(input: &std::path::Path, output: &std::path::Path) -> Result<()> {
    let tokenizer = BpeTokenizer::new()?;

    std::fs::create_dir_all(output).map_err(|e| SemrankError::Io {
        source: e,
        context: format!("Failed to create output directory: {:?}", output),
    })?;

    let entries = std::fs::read_dir(input).map_err(|e| SemrankError::Io {
        source: e,
        context: format!("Failed to read input directory: {:?}", input),
    })?;

    let mut processed = 0usize;
    let mut skipped = 0usize;
    for entry in entries {
        let entry = entry.map_err(|e| SemrankError::Io {
            source: e,
            context: format!("Failed to read input directory entry: {:?}", input),
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Skipping unreadable document {:?}: {}", path, e);
                skipped += 1;
                continue;
            }
        };

        let lines: Vec<String> = split_sentences(&text)
            .iter()
            .map(|sentence| {
                tokenizer
                    .encode(sentence)
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();

        let target = output.join(entry.file_name());
        std::fs::write(&target, lines.join("\n")).map_err(|e| SemrankError::Io {
            source: e,
            context: format!("Failed to write tokenized document: {:?}", target),
        })?;
        processed += 1;
    }

    println!("✓ Tokenized {} documents ({} skipped)", processed, skipped);
    Ok(())
}

fn cmd_build(
    config_path: Option<std::path::PathBuf>,
    fresh: bool,
    literal_only: bool,
    profile: Option<String>,
) -> Result<()> {
    let config = load_config(config_path, profile)?;

    let db_path = expand_path(&config.storage.db_path)?;
    let store = IndexStore::new(&db_path)?;

    if fresh {
        tracing::info!("Clearing existing index contents");
        store.clear()?;
    }

    let vectors_path = expand_path(&config.model.vectors_path)?;
    let model = WordVectors::load(&vectors_path)?;

    let builder = IndexBuilder::new(&store, config.corpus.clone());
    let report = builder.build(&model)?;
    println!(
        "✓ Literal pass: {} terms, {} documents ({} skipped), {} postings",
        report.vocabulary, report.documents, report.skipped, report.postings
    );

    if literal_only {
        return Ok(());
    }

    let expander = SemanticExpander::new(&store, config.expansion.clone());
    let report = expander.expand(&model)?;
    println!(
        "✓ Expansion pass: {} terms produced {} semantic postings",
        report.terms_expanded, report.postings
    );

    Ok(())
}

fn cmd_query(
    config_path: Option<std::path::PathBuf>,
    query: &str,
    semantic: bool,
    limit: usize,
    json: bool,
) -> Result<()> {
    let mut config = load_config(config_path, None)?;
    config.ranking.top_k = limit;

    let db_path = expand_path(&config.storage.db_path)?;
    let store = IndexStore::new(&db_path)?;

    let tokenizer = BpeTokenizer::new()?;
    let terms = tokenizer.encode(query);

    let set = if semantic {
        PostingSet::Semantic
    } else {
        PostingSet::Literal
    };

    let ranker = Ranker::new(&store, config.ranking.clone())?;
    let ranked = ranker.ranked_with_scores(&terms, set)?;

    if json {
        let rows: Vec<serde_json::Value> = ranked
            .iter()
            .map(|(document, score)| serde_json::json!({"document": document, "score": score}))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).map_err(|e| SemrankError::Json {
                source: e,
                context: "Failed to serialize query results".to_string(),
            })?
        );
        return Ok(());
    }

    if ranked.is_empty() {
        println!("No matching documents");
        return Ok(());
    }

    for (position, (document, score)) in ranked.iter().enumerate() {
        println!("{:>4}. {:<30} {:.4}", position + 1, document, score);
    }

    Ok(())
}

fn cmd_eval(
    config_path: Option<std::path::PathBuf>,
    cutoff: Option<usize>,
    json: bool,
    profile: Option<String>,
) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let cutoff = cutoff.unwrap_or(config.evaluation.cutoff);

    let db_path = expand_path(&config.storage.db_path)?;
    let store = IndexStore::new(&db_path)?;

    let judgments_path = expand_path(&config.evaluation.judgments_file)?;
    let records = load_judgments(&judgments_path)?;
    tracing::info!("Evaluating {} queries", records.len());

    let tokenizer = BpeTokenizer::new()?;
    let ranker = Ranker::new(&store, config.ranking.clone())?;

    let mut queries = Vec::with_capacity(records.len());
    for record in &records {
        let terms = tokenizer.encode(&record.query);
        let literal = ranker.ranked(&terms, PostingSet::Literal)?;
        let semantic = ranker.ranked(&terms, PostingSet::Semantic)?;
        queries.push(QueryResult::new(
            record.query.clone(),
            literal,
            semantic,
            record.judgment_map(),
        ));
    }

    let comparison = compare(&queries, cutoff);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&comparison).map_err(|e| SemrankError::Json {
                source: e,
                context: "Failed to serialize evaluation report".to_string(),
            })?
        );
        return Ok(());
    }

    print_comparison(&comparison);
    Ok(())
}

fn print_comparison(comparison: &Comparison) {
    println!(
        "(top-{}) {} queries",
        comparison.cutoff, comparison.overall.queries
    );
    print_table(&comparison.overall);

    match &comparison.disagreement {
        Some(subset) => {
            println!();
            println!("Disagreement subset: {} queries", subset.queries);
            print_table(subset);
        }
        None => {
            println!();
            println!("No queries with differing judgment sums");
        }
    }
}

fn print_table(aggregate: &MethodComparison) {
    println!(
        "{:<10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Method", "Precision", "Recall", "F1", "MAP", "nDCG", "Score", "Score2"
    );
    print_row("literal", &aggregate.literal);
    print_row("semantic", &aggregate.semantic);
    print_row("delta", &aggregate.delta);
}

fn print_row(name: &str, metrics: &MetricSet) {
    println!(
        "{:<10} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
        name,
        metrics.precision,
        metrics.recall,
        metrics.f1,
        metrics.map,
        metrics.ndcg,
        metrics.judgment_sum,
        metrics.high_grade_count
    );
}

fn cmd_stats(config_path: Option<std::path::PathBuf>) -> Result<()> {
    let config = load_config(config_path, None)?;
    let db_path = expand_path(&config.storage.db_path)?;
    let store = IndexStore::new(&db_path)?;

    let stats = store.stats()?;
    println!("Index: {}", db_path.display());
    println!("  Vocabulary terms:  {}", stats.vocabulary);
    println!("  Documents:         {}", stats.documents);
    println!("  Literal postings:  {}", stats.literal_postings);
    println!("  Semantic postings: {}", stats.semantic_postings);
    println!("  Avg doc length:    {:.2}", store.avg_doc_length()?);

    Ok(())
}

fn cmd_config(config_path: Option<std::path::PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path, None)?;
            let json = serde_json::to_string_pretty(&config).map_err(|e| SemrankError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = file.unwrap_or_else(|| Config::default_path().unwrap());
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = Config::default_path()?;

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| SemrankError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            let config = Config::default();
            config.save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<std::path::PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = config_path.unwrap_or_else(|| Config::default_path().unwrap());

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'semrank config init' to create one."
        );
        let mut config = Config::default();
        if let Some(profile) = profile {
            config.apply_profile(&profile)?;
        }
        return Ok(config);
    }

    if let Some(profile) = profile {
        Config::load_with_profile(&path, &profile)
    } else {
        Config::load(&path)
    }
}

fn expand_path(path: &std::path::Path) -> Result<std::path::PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| SemrankError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| SemrankError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}
