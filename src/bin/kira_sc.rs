use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kira_structure_curator::app;
use kira_structure_curator::config::{ConfigLoader, Settings};
use kira_structure_curator::domain::{classify_input, parse_cluster_lines, read_id_list};
use kira_structure_curator::error::KiraError;
use kira_structure_curator::filter::{
    Bound, FilterCriteria, SecondaryStructureCriteria, SizeCriteria, StoichiometryCriteria,
};
use kira_structure_curator::output::{OutputMode, ReportOutput, write_id_list};
use kira_structure_curator::pipeline::{Pipeline, SizeSource};
use kira_structure_curator::rcsb::RcsbHttpClient;
use kira_structure_curator::store::Store;
use kira_structure_curator::toolkit::NativeToolkit;

#[derive(Parser)]
#[command(name = "kira-sc")]
#[command(about = "Curate PDB structure lists by size, stoichiometry and secondary structure")]
#[command(version, author)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "JSON settings file (defaults to ./kira-sc.json when present)"
    )]
    config: Option<String>,

    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[arg(long, global = true, help = "Worker threads for batch commands")]
    jobs: Option<usize>,

    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Keep entries whose atom, residue and chain counts fall in range")]
    Size(SizeArgs),
    #[command(about = "Keep entries whose chain stoichiometry matches")]
    Stoichiometry(StoichiometryArgs),
    #[command(
        name = "secondary-structure",
        about = "Keep entries whose helix/strand/coil fractions fall in range"
    )]
    SecondaryStructure(SecondaryStructureArgs),
    #[command(about = "Download an id or id list, or summarize local structure files")]
    Fetch(FetchArgs),
    #[command(
        name = "cluster-ids",
        about = "Extract unique entry ids from an RCSB sequence-cluster file"
    )]
    ClusterIds(ClusterIdsArgs),
}

#[derive(Args)]
struct ListArgs {
    #[arg(help = "File with one PDB id per line")]
    input: PathBuf,
    #[arg(help = "Where accepted ids are written")]
    output: Utf8PathBuf,
}

#[derive(Args)]
struct SizeArgs {
    #[command(flatten)]
    list: ListArgs,
    #[arg(long, default_value_t = 1)]
    min_atoms: u64,
    #[arg(long)]
    max_atoms: Option<u64>,
    #[arg(long, default_value_t = 1)]
    min_residues: u64,
    #[arg(long)]
    max_residues: Option<u64>,
    #[arg(long, default_value_t = 1)]
    min_chains: u64,
    #[arg(long)]
    max_chains: Option<u64>,
    #[arg(long, value_enum, default_value_t = SizeSource::Structure)]
    size_source: SizeSource,
}

#[derive(Args)]
struct StoichiometryArgs {
    #[command(flatten)]
    list: ListArgs,
    #[arg(long, default_value_t = 1)]
    min_chain_repeats: u32,
    #[arg(long)]
    max_chain_repeats: Option<u32>,
    #[arg(long, default_value_t = 1)]
    min_unique_chains: usize,
    #[arg(long)]
    max_unique_chains: Option<usize>,
    #[arg(long, help = "Require every cluster count to divide the largest one")]
    stoichiometry_factorable: bool,
}

#[derive(Args)]
struct SecondaryStructureArgs {
    #[command(flatten)]
    list: ListArgs,
    #[arg(long, default_value_t = 0.0)]
    min_helix: f64,
    #[arg(long, default_value_t = 1.0)]
    max_helix: f64,
    #[arg(long, default_value_t = 0.0)]
    min_strand: f64,
    #[arg(long, default_value_t = 1.0)]
    max_strand: f64,
    #[arg(long, default_value_t = 0.0)]
    min_coil: f64,
    #[arg(long, default_value_t = 1.0)]
    max_coil: f64,
}

#[derive(Args)]
struct FetchArgs {
    #[arg(help = "PDB id, id-list file, structure file or directory of structures")]
    input: String,
}

#[derive(Args)]
struct ClusterIdsArgs {
    input: PathBuf,
    output: Utf8PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error {
        KiraError::InvalidPdbId(_)
        | KiraError::InvalidInput(_)
        | KiraError::ConfigRead(_)
        | KiraError::ConfigParse(_) => 2,
        KiraError::RcsbHttp(_)
        | KiraError::RcsbStatus { .. }
        | KiraError::RcsbOutage { .. }
        | KiraError::RcsbMalformed(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Plain
    };

    let mut settings = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        settings.data_dir = Some(data_dir);
    }
    if let Some(jobs) = cli.jobs {
        settings.jobs = jobs;
    }

    match cli.command {
        Commands::Size(args) => {
            let criteria = FilterCriteria {
                size: Some(SizeCriteria {
                    atoms: Bound::new(args.min_atoms, args.max_atoms),
                    residues: Bound::new(args.min_residues, args.max_residues),
                    chains: Bound::new(args.min_chains, args.max_chains),
                }),
                ..FilterCriteria::default()
            };
            run_filter(args.list, criteria, args.size_source, settings, output_mode)
        }
        Commands::Stoichiometry(args) => {
            let criteria = FilterCriteria {
                stoichiometry: Some(StoichiometryCriteria {
                    chain_repeats: Bound::new(args.min_chain_repeats, args.max_chain_repeats),
                    unique_chains: Bound::new(args.min_unique_chains, args.max_unique_chains),
                    factorable: args.stoichiometry_factorable,
                }),
                ..FilterCriteria::default()
            };
            run_filter(args.list, criteria, SizeSource::default(), settings, output_mode)
        }
        Commands::SecondaryStructure(args) => {
            let criteria = FilterCriteria {
                secondary_structure: Some(SecondaryStructureCriteria {
                    helix: Bound::new(args.min_helix, Some(args.max_helix)),
                    strand: Bound::new(args.min_strand, Some(args.max_strand)),
                    coil: Bound::new(args.min_coil, Some(args.max_coil)),
                }),
                ..FilterCriteria::default()
            };
            run_filter(args.list, criteria, SizeSource::default(), settings, output_mode)
        }
        Commands::Fetch(args) => run_fetch(args, settings, output_mode),
        Commands::ClusterIds(args) => run_cluster_ids(args),
    }
}

fn run_filter(
    list: ListArgs,
    criteria: FilterCriteria,
    size_source: SizeSource,
    settings: Settings,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let ids = read_id_list(&list.input)?;
    let store = Store::new(settings.data_dir.as_deref())?;
    let client = RcsbHttpClient::new(settings.endpoints.clone(), settings.request_timeout())?;
    let pipeline = Pipeline::new(client, NativeToolkit::new(), store, settings, criteria)
        .with_size_source(size_source);

    let report = pipeline.run_batch(&ids)?;
    write_id_list(&list.output, &report.accepted)?;
    ReportOutput::print_batch(&report, output_mode).into_diagnostic()?;
    Ok(())
}

fn run_fetch(args: FetchArgs, settings: Settings, output_mode: OutputMode) -> miette::Result<()> {
    let input = classify_input(&args.input)?;
    let store = Store::new(settings.data_dir.as_deref())?;
    let client = RcsbHttpClient::new(settings.endpoints.clone(), settings.request_timeout())?;
    let toolkit = NativeToolkit::new();

    let report = app::fetch(&input, &client, &toolkit, &store, &settings)?;
    ReportOutput::print_fetch(&report, output_mode).into_diagnostic()?;
    Ok(())
}

fn run_cluster_ids(args: ClusterIdsArgs) -> miette::Result<()> {
    let content = fs::read_to_string(&args.input).into_diagnostic()?;
    let ids = parse_cluster_lines(&content);
    write_id_list(&args.output, &ids)?;
    info!(count = ids.len(), "wrote cluster entry ids to {}", args.output);
    Ok(())
}
