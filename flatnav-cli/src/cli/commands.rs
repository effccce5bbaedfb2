//! Argument parsing and command execution for the flatnav CLI.

use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;

use clap::{Args, Parser, Subcommand, ValueEnum};
use flatnav_core::{
    AnyIndex, DataType, DataTypeError, DistanceError, ErrorKind, FlatCodec, Index, IndexError, IndexParams,
    Label, LowPrecisionConfig, Metric, PersistenceError, PersistentCodec, ProductQuantizerConfig,
    QuantizationMode, QuantizerError, ScaleGranularity, SearchHit,
};
use flatnav_providers_dense::{DataFormat, DenseMatrix, DenseMatrixError, read_ground_truth};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

use super::recall::recall_at_k;

const DEFAULT_MAX_EDGES: usize = 16;
const DEFAULT_EF_CONSTRUCTION: usize = 100;
const DEFAULT_EF_SEARCH: usize = 100;
const DEFAULT_TOP_K: usize = 10;
const DEFAULT_PQ_SUBSPACES: usize = 8;
const DEFAULT_BITS: u8 = 8;

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(
    name = "flatnav",
    about = "Build and query single-layer proximity graph indexes."
)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Build an index from a dataset and save it.
    Build(BuildCommand),
    /// Answer a query file against a saved index.
    Query(QueryCommand),
}

/// Dataset location shared by both commands.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// On-disk format; inferred from the extension when omitted.
    #[arg(long, value_enum)]
    pub format: Option<InputFormat>,

    /// Parquet column holding `FixedSizeList<Float32, D>` rows.
    #[arg(long, default_value = "features")]
    pub column: String,

    /// Element type of the stored vectors.
    #[arg(long, default_value = "float32", value_parser = parse_data_type)]
    pub dtype: DataType,
}

/// Options accepted by the `build` command.
#[derive(Debug, Args, Clone)]
pub struct BuildCommand {
    /// Dataset to index.
    #[arg(long)]
    pub data: PathBuf,

    /// Where to write the index.
    #[arg(long)]
    pub output: PathBuf,

    /// Dataset format options.
    #[command(flatten)]
    pub input: InputArgs,

    /// Ranking metric.
    #[arg(long, value_enum, default_value_t = MetricArg::L2)]
    pub metric: MetricArg,

    /// How stored vectors are compressed.
    #[arg(long, value_enum, default_value_t = QuantizationArg::None)]
    pub quantization: QuantizationArg,

    /// Maximum out-degree of every node.
    #[arg(long = "max-edges", default_value_t = DEFAULT_MAX_EDGES)]
    pub max_edges: usize,

    /// Beam width used while inserting.
    #[arg(long = "ef-construction", default_value_t = DEFAULT_EF_CONSTRUCTION)]
    pub ef_construction: usize,

    /// Worker threads for batch insertion.
    #[arg(long, default_value_t = default_threads())]
    pub threads: usize,

    /// Product-quantizer subspaces; defaults to the smaller of 8 and the
    /// dataset dimension.
    #[arg(long = "pq-subspaces")]
    pub pq_subspaces: Option<usize>,

    /// Bits per product-quantizer code.
    #[arg(long = "pq-bits", default_value_t = DEFAULT_BITS)]
    pub pq_bits: u8,

    /// Bits per low-precision component.
    #[arg(long = "lpq-bits", default_value_t = DEFAULT_BITS)]
    pub lpq_bits: u8,

    /// Whether low-precision scales are shared or per dimension.
    #[arg(long = "lpq-granularity", value_enum, default_value_t = Granularity::Global)]
    pub lpq_granularity: Granularity,

    /// Seed for product-quantizer training.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Options accepted by the `query` command.
#[derive(Debug, Args, Clone)]
pub struct QueryCommand {
    /// Saved index to search.
    #[arg(long)]
    pub index: PathBuf,

    /// Query vectors.
    #[arg(long)]
    pub queries: PathBuf,

    /// Query format options.
    #[command(flatten)]
    pub input: InputArgs,

    /// Results per query.
    #[arg(long = "top-k", default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Beam width used while searching.
    #[arg(long = "ef-search", default_value_t = DEFAULT_EF_SEARCH)]
    pub ef_search: usize,

    /// Worker threads for batch search.
    #[arg(long, default_value_t = default_threads())]
    pub threads: usize,

    /// `.ivecs` file of true neighbour labels per query.
    #[arg(long = "ground-truth")]
    pub ground_truth: Option<PathBuf>,
}

/// Metrics selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricArg {
    /// Squared Euclidean distance.
    L2,
    /// One minus the dot product.
    Ip,
}

impl From<MetricArg> for Metric {
    fn from(value: MetricArg) -> Self {
        match value {
            MetricArg::L2 => Self::Euclidean,
            MetricArg::Ip => Self::InnerProduct,
        }
    }
}

/// Quantization modes selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QuantizationArg {
    /// Store raw `f32` vectors.
    None,
    /// Product quantization.
    Pq,
    /// Low-precision scalar quantization.
    Lpq,
}

impl From<QuantizationArg> for QuantizationMode {
    fn from(value: QuantizationArg) -> Self {
        match value {
            QuantizationArg::None => Self::None,
            QuantizationArg::Pq => Self::Product,
            QuantizationArg::Lpq => Self::LowPrecision,
        }
    }
}

/// Low-precision scale granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Granularity {
    /// One scale for every component.
    Global,
    /// One scale per dimension.
    PerDimension,
}

impl From<Granularity> for ScaleGranularity {
    fn from(value: Granularity) -> Self {
        match value {
            Granularity::Global => Self::Global,
            Granularity::PerDimension => Self::PerDimension,
        }
    }
}

/// Dataset formats selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// Parquet with a fixed-size list column.
    Parquet,
    /// `.fvecs` records.
    Fvecs,
    /// NumPy `.npy` array.
    Npy,
}

impl From<InputFormat> for DataFormat {
    fn from(value: InputFormat) -> Self {
        match value {
            InputFormat::Parquet => Self::Parquet,
            InputFormat::Fvecs => Self::Fvecs,
            InputFormat::Npy => Self::Npy,
        }
    }
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Dataset ingestion failed.
    #[error(transparent)]
    Dataset(#[from] DenseMatrixError),
    /// The requested element type cannot be indexed.
    #[error(transparent)]
    DataType(#[from] DataTypeError),
    /// Quantizer configuration or training failed.
    #[error(transparent)]
    Quantizer(#[from] QuantizerError),
    /// Codec construction failed.
    #[error(transparent)]
    Distance(#[from] DistanceError),
    /// Index construction or search failed.
    #[error(transparent)]
    Index(#[from] IndexError),
    /// Saving or loading the index failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    /// Query vectors do not match the index.
    #[error("queries have dimension {queries} but the index expects {index}")]
    QueryDimension {
        /// Dimension recorded in the index.
        index: usize,
        /// Dimension of the query file.
        queries: usize,
    },
    /// The ground-truth file covers fewer queries than were asked.
    #[error("ground truth `{path}` has {rows} rows for {queries} queries")]
    GroundTruthRows {
        /// Ground-truth file.
        path: PathBuf,
        /// Rows in the file.
        rows: usize,
        /// Queries answered.
        queries: usize,
    },
}

impl CliError {
    /// Stable code of the underlying core error, if there is one.
    #[must_use]
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::DataType(err) => Some(err.code().as_str()),
            Self::Quantizer(err) => Some(err.code().as_str()),
            Self::Distance(err) => Some(err.code().as_str()),
            Self::Index(err) => Some(err.code().as_str()),
            Self::Persistence(err) => Some(err.code().as_str()),
            Self::Dataset(_) | Self::QueryDimension { .. } | Self::GroundTruthRows { .. } => None,
        }
    }

    /// Place of the failure in the core error taxonomy. Dataset problems other
    /// than I/O count as invalid input.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Dataset(DenseMatrixError::Io(_)) => ErrorKind::Io,
            Self::Dataset(_) | Self::QueryDimension { .. } | Self::GroundTruthRows { .. } => {
                ErrorKind::InvalidArgument
            }
            Self::DataType(err) => err.kind(),
            Self::Quantizer(err) => err.kind(),
            Self::Distance(err) => err.kind(),
            Self::Index(err) => err.kind(),
            Self::Persistence(err) => err.kind(),
        }
    }

    /// Process exit status for this failure: 2 for rejected input or
    /// configuration, 3 for a corrupt index file, 1 otherwise.
    #[must_use]
    pub fn exit_status(&self) -> u8 {
        match self.kind() {
            ErrorKind::InvalidArgument | ErrorKind::UnsupportedConfiguration => 2,
            ErrorKind::CorruptData => 3,
            _ => 1,
        }
    }
}

/// Outcome of a CLI command.
#[derive(Debug, Clone)]
pub enum ExecutionSummary {
    /// A saved index.
    Build {
        /// Where the index was written.
        output: PathBuf,
        /// Quantization of the stored codes.
        mode: QuantizationMode,
        /// Number of indexed vectors.
        nodes: usize,
        /// Vector dimensionality.
        dimension: usize,
    },
    /// Answers to a query file.
    Query {
        /// Per-query hits, in query order.
        results: Vec<Vec<SearchHit>>,
        /// Requested results per query.
        top_k: usize,
        /// Recall@k when ground truth was supplied.
        recall: Option<f64>,
    },
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when loading, building, or searching fails.
#[instrument(name = "cli.run", err, skip(cli), fields(command = field::Empty))]
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    let span = Span::current();
    match cli.command {
        Command::Build(build) => {
            span.record("command", field::display("build"));
            run_build(build)
        }
        Command::Query(query) => {
            span.record("command", field::display("query"));
            run_query(query)
        }
    }
}

#[instrument(
    name = "cli.build",
    err,
    skip(command),
    fields(
        data = %command.data.display(),
        metric = ?command.metric,
        quantization = ?command.quantization,
    ),
)]
pub(super) fn run_build(command: BuildCommand) -> Result<ExecutionSummary, CliError> {
    let matrix = load_matrix(&command.data, &command.input)?;
    let metric = Metric::from(command.metric);
    let dimension = matrix.dimension();
    let params = IndexParams::new(command.max_edges, matrix.rows())?;

    let nodes = match command.quantization {
        QuantizationArg::None => {
            let codec = FlatCodec::new(metric, dimension)?;
            build_and_save(codec, params, &matrix, &command)?
        }
        QuantizationArg::Pq => {
            let subspaces = command
                .pq_subspaces
                .unwrap_or_else(|| DEFAULT_PQ_SUBSPACES.min(dimension));
            let mut config =
                ProductQuantizerConfig::new(dimension, subspaces, command.pq_bits, metric)?;
            if let Some(seed) = command.seed {
                config = config.with_seed(seed);
            }
            let codec = config.train(matrix.data(), matrix.rows())?;
            build_and_save(codec, params, &matrix, &command)?
        }
        QuantizationArg::Lpq => {
            let codec = LowPrecisionConfig::new(dimension, command.lpq_bits, metric)?
                .with_granularity(command.lpq_granularity.into())
                .train(matrix.data(), matrix.rows())?;
            build_and_save(codec, params, &matrix, &command)?
        }
    };

    info!(
        output = %command.output.display(),
        nodes,
        "index built"
    );
    Ok(ExecutionSummary::Build {
        output: command.output,
        mode: command.quantization.into(),
        nodes,
        dimension,
    })
}

fn build_and_save<C: PersistentCodec>(
    codec: C,
    params: IndexParams,
    matrix: &DenseMatrix,
    command: &BuildCommand,
) -> Result<usize, CliError> {
    let index = Index::new(codec, params);
    let labels: Vec<Label> = (0..).take(matrix.rows()).collect();
    index.insert_batch(
        matrix.data(),
        &labels,
        command.ef_construction,
        command.threads,
    )?;
    index.save(&command.output)?;
    Ok(index.len())
}

#[instrument(
    name = "cli.query",
    err,
    skip(command),
    fields(index = %command.index.display(), top_k = command.top_k),
)]
pub(super) fn run_query(command: QueryCommand) -> Result<ExecutionSummary, CliError> {
    let index = AnyIndex::load(&command.index)?;
    let queries = load_matrix(&command.queries, &command.input)?;
    if queries.dimension() != index.dimension() {
        return Err(CliError::QueryDimension {
            index: index.dimension(),
            queries: queries.dimension(),
        });
    }
    let results = index.search_batch(
        queries.data(),
        command.top_k,
        command.ef_search,
        command.threads,
    )?;

    let recall = command
        .ground_truth
        .as_deref()
        .map(|path| {
            let truth = read_ground_truth(path)?;
            if truth.len() < results.len() {
                return Err(CliError::GroundTruthRows {
                    path: path.to_path_buf(),
                    rows: truth.len(),
                    queries: results.len(),
                });
            }
            Ok(recall_at_k(&results, &truth, command.top_k))
        })
        .transpose()?;

    info!(
        queries = results.len(),
        recall = recall.map(field::display),
        "queries answered"
    );
    Ok(ExecutionSummary::Query {
        results,
        top_k: command.top_k,
        recall,
    })
}

fn load_matrix(path: &Path, input: &InputArgs) -> Result<DenseMatrix, CliError> {
    input.dtype.ensure_indexable()?;
    let format = match input.format {
        Some(format) => format.into(),
        None => DataFormat::from_path(path)?,
    };
    Ok(DenseMatrix::load(path, format, Some(&input.column))?)
}

fn parse_data_type(raw: &str) -> Result<DataType, DataTypeError> {
    raw.parse()
}

fn default_threads() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Renders `summary` to `writer` as tab-separated text.
///
/// Query results print one line per query: the query index followed by
/// `label:distance` pairs.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use flatnav_cli::cli::{ExecutionSummary, render_summary};
/// # use flatnav_core::SearchHit;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let summary = ExecutionSummary::Query {
///     results: vec![vec![SearchHit { label: 3, distance: 0.25 }]],
///     top_k: 1,
///     recall: Some(1.0),
/// };
/// let mut buffer = Vec::new();
/// render_summary(&summary, &mut buffer)?;
/// assert_eq!(String::from_utf8(buffer)?, "0\t3:0.25\nrecall@1: 1.0000\n");
/// # Ok(())
/// # }
/// ```
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    match summary {
        ExecutionSummary::Build {
            output,
            mode,
            nodes,
            dimension,
        } => {
            writeln!(writer, "index: {}", output.display())?;
            writeln!(writer, "quantization: {mode}")?;
            writeln!(writer, "nodes: {nodes}")?;
            writeln!(writer, "dimension: {dimension}")?;
        }
        ExecutionSummary::Query {
            results,
            top_k,
            recall,
        } => {
            for (query, hits) in results.iter().enumerate() {
                write!(writer, "{query}")?;
                for hit in hits {
                    write!(writer, "\t{}:{}", hit.label, hit.distance)?;
                }
                writeln!(writer)?;
            }
            if let Some(recall) = recall {
                writeln!(writer, "recall@{top_k}: {recall:.4}")?;
            }
        }
    }
    Ok(())
}
