//! Source, domain and scenario commands

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::Args;
use console::style;
use ragchat_core::models::{
    CreateDomainRequest, CreateScenarioRequest, CreateSourceRequest, Scenario, SourceType,
    UpdateParams,
};
use ragchat_session::SessionStore;
use std::path::Path;

#[derive(Args, Debug)]
pub struct SourceArgs {
    pub title: String,
    /// web, file, archive or credentials
    #[arg(short, long, default_value = "web")]
    pub kind: SourceType,
    /// URL for web sources, a file path otherwise
    pub content: String,
    /// Credentials sent along with a `credentials` source
    #[arg(long)]
    pub credentials: Option<String>,
    /// Re-ingest every N seconds
    #[arg(long)]
    pub every: Option<i64>,
}

#[derive(Args, Debug)]
pub struct ScenarioArgs {
    #[arg(short, long)]
    pub domain: i64,
    #[arg(short, long)]
    pub model: String,
    #[arg(long)]
    pub system_prompt: Option<String>,
    #[arg(long)]
    pub temperature: Option<f64>,
    #[arg(long)]
    pub top_k: Option<i32>,
    #[arg(long)]
    pub top_p: Option<f64>,
    /// Expand the query into N variants with this model
    #[arg(long, value_name = "MODEL")]
    pub multi_query: Option<String>,
    #[arg(long)]
    pub n_queries: Option<i32>,
    /// Rerank retrieved chunks with this model
    #[arg(long, value_name = "MODEL")]
    pub rerank: Option<String>,
    /// Chunks fetched by vector search
    #[arg(long)]
    pub top_n: Option<i32>,
    #[arg(long)]
    pub threshold: Option<f64>,
    /// Select the new scenario and save it as the default for `chat`
    #[arg(long)]
    pub select: bool,
}

/// Source request with content and credentials base64-encoded as the gateway expects
pub fn source_request(
    title: String,
    kind: SourceType,
    content: &[u8],
    credentials: Option<&str>,
    every: Option<i64>,
) -> CreateSourceRequest {
    CreateSourceRequest {
        title,
        typ: kind,
        content: STANDARD.encode(content),
        credentials: credentials.map(|c| STANDARD.encode(c.as_bytes())),
        update_params: every.map(|secs| UpdateParams {
            cron: None,
            every_period: Some(secs),
        }),
    }
}

pub fn scenario_request(args: &ScenarioArgs) -> CreateScenarioRequest {
    let mut req = CreateScenarioRequest::for_domain(args.domain);

    let model = &mut req.model;
    model.model_name = args.model.clone();
    if let Some(prompt) = &args.system_prompt {
        model.system_prompt = prompt.clone();
    }
    if let Some(t) = args.temperature {
        model.temperature = t;
    }
    if let Some(k) = args.top_k {
        model.top_k = k;
    }
    if let Some(p) = args.top_p {
        model.top_p = p;
    }

    if let Some(name) = &args.multi_query {
        req.multi_query.use_multiquery = true;
        req.multi_query.query_model_name = name.clone();
    }
    if let Some(n) = args.n_queries {
        req.multi_query.n_queries = n;
    }
    if let Some(name) = &args.rerank {
        req.reranker.use_rerank = true;
        req.reranker.reranker_model = name.clone();
    }
    if let Some(n) = args.top_n {
        req.vector_search.top_n = n;
    }
    if let Some(t) = args.threshold {
        req.vector_search.threshold = t;
    }
    req
}

pub async fn sources_list(store: &SessionStore) -> Result<()> {
    let sources = store.get_sources().await?;
    if sources.is_empty() {
        println!("No sources.");
        return Ok(());
    }

    println!("{}", style("Sources").bold().cyan());
    println!();
    for source in sources {
        let kind = source
            .source_type()
            .map(|t| format!("{:?}", t))
            .unwrap_or_else(|| format!("type {}", source.typ));
        println!("  {} ({})", style(&source.title).bold(), source.id);
        println!("    Kind: {}  Status: {}", kind, source.status);
    }
    Ok(())
}

pub async fn sources_create(store: &SessionStore, args: SourceArgs) -> Result<()> {
    let content = match args.kind {
        SourceType::Web | SourceType::WithCredentials => args.content.clone().into_bytes(),
        SourceType::SingleFile | SourceType::ArchivedFiles => tokio::fs::read(Path::new(&args.content)).await?,
    };
    let req = source_request(
        args.title,
        args.kind,
        &content,
        args.credentials.as_deref(),
        args.every,
    );

    let source = store.create_source(&req).await?;
    println!(
        "{} Created source {} ({})",
        style("✓").green().bold(),
        style(&source.title).bold(),
        source.id
    );
    Ok(())
}

pub async fn domains_list(store: &SessionStore, all: bool) -> Result<()> {
    let mut has_more = store.get_domains(true).await?;
    while all && has_more {
        has_more = store.get_domains(false).await?;
    }

    let state = store.snapshot().await;
    if state.domains.is_empty() {
        println!("No domains.");
        return Ok(());
    }

    println!("{}", style("Domains").bold().cyan());
    println!();
    for domain in &state.domains {
        println!("  {} ({})", style(&domain.title).bold(), domain.id);
        println!(
            "    Sources: {}  Scenarios: {}",
            domain.source_ids.len(),
            domain.scenario_ids.len()
        );
    }
    if has_more {
        println!();
        println!("More domains available, use {}", style("--all").cyan());
    }
    Ok(())
}

pub async fn domains_show(store: &SessionStore, id: i64) -> Result<()> {
    let domain = store.get_domain(id).await?;
    println!("{} ({})", style(&domain.title).bold().cyan(), domain.id);
    println!("  Sources: {}", join_ids(&domain.source_ids));
    println!("  Scenarios: {}", join_ids(&domain.scenario_ids));
    println!("  Updated: {}", domain.updated_at.display());
    Ok(())
}

pub async fn domains_create(store: &SessionStore, title: String, source_ids: Vec<i64>) -> Result<()> {
    let domain = store
        .create_domain(&CreateDomainRequest { title, source_ids })
        .await?;
    println!(
        "{} Created domain {} ({})",
        style("✓").green().bold(),
        style(&domain.title).bold(),
        domain.id
    );
    println!("  Sources: {}", join_ids(&domain.source_ids));
    Ok(())
}

pub async fn scenarios_list(store: &SessionStore, offset: u32, limit: u32) -> Result<()> {
    let scenarios = store.get_scenarios(offset, limit).await?;
    if scenarios.is_empty() {
        println!("No scenarios.");
        return Ok(());
    }

    println!("{}", style("Scenarios").bold().cyan());
    println!();
    for scenario in scenarios {
        println!(
            "  {} domain {}  model {}",
            style(scenario.id).bold(),
            scenario.domain_id,
            scenario.model.model_name
        );
    }
    Ok(())
}

pub async fn scenarios_show(store: &SessionStore, id: i64) -> Result<()> {
    let scenario = store.get_scenario(id).await?;
    print_scenario(&scenario);
    Ok(())
}

pub async fn scenarios_create(store: &SessionStore, args: ScenarioArgs) -> Result<()> {
    let req = scenario_request(&args);
    let scenario = if args.select {
        store.create_and_select_scenario(&req).await?
    } else {
        store.create_scenario(&req).await?
    };

    println!(
        "{} Created scenario {} for domain {}",
        style("✓").green().bold(),
        scenario.id,
        req.domain_id
    );
    Ok(())
}

fn print_scenario(scenario: &Scenario) {
    println!("{} {}", style("Scenario").bold().cyan(), scenario.id);
    println!("  Domain: {}", scenario.domain_id);
    println!();

    let model = &scenario.model;
    println!("{}", style("Model:").bold());
    println!("  Name: {}", model.model_name);
    println!(
        "  Temperature: {}  Top-k: {}  Top-p: {}",
        model.temperature, model.top_k, model.top_p
    );
    if !model.system_prompt.is_empty() {
        println!("  System prompt: {}", model.system_prompt);
    }

    let mq = &scenario.multi_query;
    println!("{}", style("Multi-query:").bold());
    println!(
        "  Enabled: {}  Queries: {}  Model: {}",
        mq.use_multiquery, mq.n_queries, mq.query_model_name
    );

    let rr = &scenario.reranker;
    println!("{}", style("Reranker:").bold());
    println!(
        "  Enabled: {}  Model: {}  Max length: {}  Top-k: {}",
        rr.use_rerank, rr.reranker_model, rr.reranker_max_length, rr.top_k
    );

    let vs = &scenario.vector_search;
    println!("{}", style("Vector search:").bold());
    println!(
        "  Top-n: {}  Threshold: {}  By query: {}",
        vs.top_n, vs.threshold, vs.search_by_query
    );
}

fn join_ids(ids: &[i64]) -> String {
    if ids.is_empty() {
        return "-".to_string();
    }
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_args(domain: i64, model: &str) -> ScenarioArgs {
        ScenarioArgs {
            domain,
            model: model.to_string(),
            system_prompt: None,
            temperature: None,
            top_k: None,
            top_p: None,
            multi_query: None,
            n_queries: None,
            rerank: None,
            top_n: None,
            threshold: None,
            select: false,
        }
    }

    #[test]
    fn test_join_ids() {
        assert_eq!(join_ids(&[]), "-");
        assert_eq!(join_ids(&[5, 9]), "5, 9");
    }

    #[test]
    fn test_source_request_encodes_content() {
        let req = source_request(
            "docs".to_string(),
            SourceType::WithCredentials,
            b"https://wiki.example",
            Some("user:pass"),
            Some(3600),
        );
        assert_eq!(req.content, "aHR0cHM6Ly93aWtpLmV4YW1wbGU=");
        assert_eq!(req.credentials.as_deref(), Some("dXNlcjpwYXNz"));
        assert_eq!(
            req.update_params,
            Some(UpdateParams {
                cron: None,
                every_period: Some(3600),
            })
        );

        let plain = source_request("f".to_string(), SourceType::SingleFile, b"", None, None);
        assert!(plain.credentials.is_none());
        assert!(plain.update_params.is_none());
    }

    #[test]
    fn test_scenario_request_applies_flags_over_defaults() {
        let req = scenario_request(&scenario_args(3, "llama3"));
        assert_eq!(req.domain_id, 3);
        assert_eq!(req.model.model_name, "llama3");
        assert_eq!(req.model.top_k, 5);
        assert!(!req.multi_query.use_multiquery);
        assert!(!req.reranker.use_rerank);

        let mut args = scenario_args(3, "llama3");
        args.multi_query = Some("qwen".to_string());
        args.rerank = Some("bge-reranker".to_string());
        args.top_n = Some(20);
        args.temperature = Some(0.1);
        let req = scenario_request(&args);
        assert!(req.multi_query.use_multiquery);
        assert_eq!(req.multi_query.query_model_name, "qwen");
        assert_eq!(req.multi_query.n_queries, 3);
        assert!(req.reranker.use_rerank);
        assert_eq!(req.reranker.reranker_model, "bge-reranker");
        assert_eq!(req.vector_search.top_n, 20);
        assert!((req.model.temperature - 0.1).abs() < f64::EPSILON);
    }
}
