use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::roles::{ConfigError, RoleFeatureDriver, RoleOptions};
use crate::storage::{AttrValue, Attrs, Graph};
use crate::types::{NodeId, RoleError};

/// Error type for the extraction command.
#[derive(Error, Debug)]
pub enum CliError {
    /// Generic error message.
    #[error("{0}")]
    Message(String),
    /// IO error from file operations.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// CSV parsing or writing error.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// Feature extraction error.
    #[error(transparent)]
    Role(#[from] RoleError),
    /// Options file error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<&str> for CliError {
    fn from(value: &str) -> Self {
        CliError::Message(value.to_string())
    }
}

impl From<String> for CliError {
    fn from(value: String) -> Self {
        CliError::Message(value)
    }
}

/// Where and how to read an edge list.
#[derive(Debug, Clone)]
pub struct EdgeListConfig {
    /// CSV file with one link per row.
    pub path: PathBuf,
    /// Column holding source node ids.
    pub src_column: String,
    /// Column holding destination node ids.
    pub dst_column: String,
    /// Column holding link weights. Rows without a value weigh 1.
    pub weight_column: String,
}

/// Counts from loading an edge list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadSummary {
    /// Nodes in the loaded graph.
    pub nodes: usize,
    /// Links in the loaded graph.
    pub links: usize,
    /// Whether the weight column was found.
    pub weighted: bool,
}

/// Reads `cfg` into a new graph, storing weights under `weight_attr`.
pub fn load_edge_list(
    cfg: &EdgeListConfig,
    weight_attr: &str,
) -> Result<(Graph, LoadSummary), CliError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(&cfg.path)?;
    let headers = reader.headers()?.clone();
    let src_index = find_column(&headers, &cfg.src_column)?;
    let dst_index = find_column(&headers, &cfg.dst_column)?;
    let weight_index = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(&cfg.weight_column));
    if weight_index.is_none() {
        warn!(
            column = %cfg.weight_column,
            path = %cfg.path.display(),
            "cli.load.unweighted"
        );
    }

    let mut graph = Graph::new();
    for result in reader.records() {
        let record = result?;
        let src = parse_id(get_required(&record, src_index, &cfg.src_column)?)?;
        let dst = parse_id(get_required(&record, dst_index, &cfg.dst_column)?)?;
        let weight = match weight_index.and_then(|idx| record.get(idx)).map(str::trim) {
            None | Some("") => 1.0,
            Some(raw) => raw.parse::<f64>().map_err(|_| {
                CliError::Message(format!(
                    "invalid weight '{}' in column '{}'",
                    raw, cfg.weight_column
                ))
            })?,
        };
        let mut attrs = Attrs::new();
        attrs.insert(weight_attr.to_string(), AttrValue::Num(weight));
        graph.add_link(src, dst, Some(&attrs));
    }

    let summary = LoadSummary {
        nodes: graph.node_count(),
        links: graph.link_count(),
        weighted: weight_index.is_some(),
    };
    info!(
        nodes = summary.nodes,
        links = summary.links,
        "cli.load.completed"
    );
    Ok((graph, summary))
}

fn find_column(headers: &StringRecord, name: &str) -> Result<usize, CliError> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| CliError::Message(format!("column '{}' not found", name)))
}

fn get_required<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, CliError> {
    record
        .get(idx)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CliError::Message(format!("missing value for column '{}'", name)))
}

fn parse_id(raw: &str) -> Result<NodeId, CliError> {
    raw.parse::<u64>()
        .map(NodeId)
        .map_err(|_| CliError::Message(format!("node id '{}' is not a non-negative integer", raw)))
}

/// One round of the extraction loop.
#[derive(Debug, Clone, Serialize)]
pub struct RoundSummary {
    /// Round number, 0 for the structural round.
    pub round: usize,
    /// Features the round produced.
    pub generated: usize,
    /// Of those, how many survived pruning.
    pub kept: usize,
}

/// Result of [`extract_features`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct Extraction {
    /// Per-round counts.
    pub rounds: Vec<RoundSummary>,
    /// Surviving features by their unbinned names, in the order produced.
    pub features: Vec<String>,
}

/// Runs round 0 and then recursive rounds until a round keeps nothing new
/// or the round limit is reached.
///
/// After each round every new feature is binned and the bins of all
/// features kept so far are pruned together; representatives from the
/// newest round feed the next one.
pub fn extract_features(
    graph: &mut Graph,
    driver: &mut RoleFeatureDriver,
) -> Result<Extraction, RoleError> {
    let max_dist = driver.options().max_dist;
    let max_rounds = driver.options().max_rounds;

    let mut extraction = Extraction::default();
    let mut raw_names: BTreeMap<String, String> = BTreeMap::new();
    let mut candidates: Vec<String> = Vec::new();
    let mut generated = driver.first_round(graph, None)?;
    let mut round = 0;
    loop {
        let mut binned = Vec::with_capacity(generated.len());
        for feature in &generated {
            let name = driver.bin(graph, feature)?;
            raw_names.insert(name.clone(), feature.clone());
            binned.push(name);
        }
        candidates.extend(binned.iter().cloned());

        let reps = driver.calculate_reps(graph, max_dist, &candidates)?;
        candidates.retain(|name| reps.contains(name));
        let fresh: Vec<String> = binned.into_iter().filter(|b| reps.contains(b)).collect();
        extraction.rounds.push(RoundSummary {
            round,
            generated: generated.len(),
            kept: fresh.len(),
        });
        if fresh.is_empty() || round >= max_rounds {
            break;
        }
        round += 1;
        generated = driver.next_round(graph, None, &fresh)?;
    }

    extraction.features = candidates
        .iter()
        .filter_map(|name| raw_names.get(name).cloned())
        .collect();
    Ok(extraction)
}

/// Writes `node,<feature...>` rows for every node. Returns the row count.
pub fn write_features(graph: &Graph, features: &[String], path: &Path) -> Result<u64, CliError> {
    let mut writer = WriterBuilder::new().from_path(path)?;
    let mut header = Vec::with_capacity(1 + features.len());
    header.push("node".to_string());
    header.extend(features.iter().cloned());
    writer.write_record(&header)?;

    let mut rows = 0u64;
    for node in graph.nodes() {
        let mut row = Vec::with_capacity(header.len());
        row.push(node.id().to_string());
        for feature in features {
            row.push(node.number(feature)?.to_string());
        }
        writer.write_record(&row)?;
        rows += 1;
    }
    writer.flush()?;
    Ok(rows)
}

/// Everything `rolegraph extract` needs.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Input edge list.
    pub edges: EdgeListConfig,
    /// Extraction options.
    pub options: RoleOptions,
    /// Feature CSV destination, if any.
    pub out: Option<PathBuf>,
}

/// Summary printed by `rolegraph extract`.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractSummary {
    /// Loaded graph counts.
    pub graph: LoadSummary,
    /// Per-round counts.
    pub rounds: Vec<RoundSummary>,
    /// Surviving feature names.
    pub features: Vec<String>,
    /// Where the feature table was written.
    pub out: Option<PathBuf>,
    /// Wall time in milliseconds.
    pub duration_ms: f64,
}

/// Loads, extracts and optionally writes the feature table.
pub fn run_extract(cfg: &ExtractConfig) -> Result<ExtractSummary, CliError> {
    let started = Instant::now();
    let mut driver = RoleFeatureDriver::new(cfg.options.clone())?;
    let (mut graph, loaded) = load_edge_list(&cfg.edges, &cfg.options.weight_attr)?;
    let extraction = extract_features(&mut graph, &mut driver)?;
    if let Some(path) = &cfg.out {
        write_features(&graph, &extraction.features, path)?;
    }
    Ok(ExtractSummary {
        graph: loaded,
        rounds: extraction.rounds,
        features: extraction.features,
        out: cfg.out.clone(),
        duration_ms: started.elapsed().as_secs_f64() * 1000.0,
    })
}
