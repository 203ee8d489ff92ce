use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ggstats::csv_reader;
use ggstats::data::DataTable;
use ggstats::graph::render_chart;
use ggstats::ir::ChartSpec;
use ggstats::labels::SliceLabel;
use ggstats::options::{Centrality, DotOptions, PieOptions};
use ggstats::palette::PaletteRef;
use ggstats::stats::bayes::{FixedMargin, SamplingPlan};
use ggstats::stats::location::TestType;
use ggstats::theme::ThemePreset;
use ggstats::{ggdotplotstats, ggpiestats, OutputFormat, RenderOptions};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "ggstats")]
#[command(about = "Statistical pie and dot charts from CSV data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    chart: Chart,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand, Debug)]
enum Chart {
    /// Pie chart of a categorical column with a chi-square test
    Pie(PieArgs),
    /// Ranked dot chart of per-label means with a one-sample test
    Dot(DotArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// JSON file with chart options; flags given here override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    title: Option<String>,

    #[arg(long, global = true)]
    caption: Option<String>,

    #[arg(long, global = true, value_enum, default_value_t = Format::Png)]
    format: Format,

    #[arg(long, global = true, default_value_t = 800)]
    width: u32,

    #[arg(long, global = true, default_value_t = 600)]
    height: u32,

    /// Log test details to stderr
    #[arg(long, global = true)]
    messages: bool,

    /// Seed for bootstrap and Monte Carlo resampling
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[arg(long, global = true, value_enum)]
    theme: Option<ThemePreset>,

    /// Drop the ggstatsplot theme layer on top of the preset
    #[arg(long, global = true)]
    plain_theme: bool,

    /// Decimal places for statistics
    #[arg(long, global = true)]
    k: Option<usize>,

    #[arg(long, global = true)]
    conf_level: Option<f64>,

    #[arg(long, global = true)]
    nboot: Option<usize>,

    /// Leave the statistical results out of the subtitle
    #[arg(long, global = true)]
    no_subtitle: bool,

    /// Leave the Bayes factor out of the caption
    #[arg(long, global = true)]
    no_bf_message: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Png,
    Svg,
    Json,
}

#[derive(Args, Debug)]
struct PieArgs {
    #[arg(long)]
    main: Option<String>,

    #[arg(long)]
    condition: Option<String>,

    /// Column of non-negative integer frequencies
    #[arg(long)]
    counts: Option<String>,

    /// Expected proportions for the goodness-of-fit test, e.g. 0.5,0.25,0.25
    #[arg(long, value_delimiter = ',')]
    ratio: Option<Vec<f64>>,

    /// Treat main and condition as paired measurements (McNemar)
    #[arg(long)]
    paired: bool,

    #[arg(long)]
    stat_title: Option<String>,

    #[arg(long, value_enum)]
    slice_label: Option<SliceLabel>,

    #[arg(long)]
    perc_k: Option<usize>,

    #[arg(long)]
    legend_title: Option<String>,

    #[arg(long)]
    facet_wrap_name: Option<String>,

    /// Skip the per-group proportion tests
    #[arg(long)]
    no_facet_proptest: bool,

    #[arg(long)]
    no_sample_size_label: bool,

    #[arg(long, value_enum)]
    sampling_plan: Option<SamplingPlan>,

    #[arg(long, value_enum)]
    fixed_margin: Option<FixedMargin>,

    #[arg(long)]
    prior_concentration: Option<f64>,

    /// Compute p-values by Monte Carlo simulation
    #[arg(long)]
    simulate_p_value: bool,

    #[arg(long)]
    b: Option<usize>,

    /// Brewer palette name or 1-based index
    #[arg(long)]
    palette: Option<PaletteRef>,

    #[arg(long, allow_hyphen_values = true)]
    direction: Option<i8>,
}

#[derive(Args, Debug)]
struct DotArgs {
    #[arg(long)]
    x: Option<String>,

    #[arg(long)]
    y: Option<String>,

    #[arg(long = "type", value_enum)]
    test_type: Option<TestType>,

    #[arg(long, allow_hyphen_values = true)]
    test_value: Option<f64>,

    /// Draw a line at the test value
    #[arg(long)]
    test_value_line: bool,

    #[arg(long)]
    bf_prior: Option<f64>,

    #[arg(long)]
    xlab: Option<String>,

    #[arg(long)]
    ylab: Option<String>,

    #[arg(long, value_enum)]
    centrality: Option<Centrality>,

    #[arg(long)]
    no_centrality_line: bool,

    #[arg(long)]
    point_color: Option<String>,

    #[arg(long)]
    point_size: Option<f64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.common.messages);

    // Read CSV from stdin
    let csv_data = csv_reader::read_csv_from_stdin().context("Failed to read CSV from stdin")?;
    let table = DataTable::from_csv(csv_data);

    let spec = match &cli.chart {
        Chart::Pie(args) => {
            let opts = pie_options(args, &cli.common)?;
            ggpiestats(&table, &opts).context("Failed to build pie chart")?
        }
        Chart::Dot(args) => {
            let opts = dot_options(args, &cli.common)?;
            ggdotplotstats(&table, &opts).context("Failed to build dot chart")?
        }
    };

    let bytes = output_bytes(&spec, &cli.common)?;

    // Write to stdout
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(&bytes)
        .context("Failed to write output to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}

fn init_logging(messages: bool) {
    let level = if messages { Level::INFO } else { Level::WARN };
    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn output_bytes(spec: &ChartSpec, common: &CommonArgs) -> Result<Vec<u8>> {
    let format = match common.format {
        Format::Json => {
            let json = serde_json::to_string_pretty(spec).context("Failed to serialize chart")?;
            return Ok(json.into_bytes());
        }
        Format::Png => OutputFormat::Png,
        Format::Svg => OutputFormat::Svg,
    };
    let options = RenderOptions {
        width: common.width,
        height: common.height,
        format,
    };
    render_chart(spec, &options).context("Failed to render chart")
}

/// Read the options file (if any) and fill in the required column flags
fn load_options<T: DeserializeOwned>(
    config: Option<&Path>,
    columns: &[(&str, Option<&String>)],
) -> Result<T> {
    let mut object = match config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            match serde_json::from_str::<Value>(&text)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
            {
                Value::Object(map) => map,
                _ => anyhow::bail!("Config file {} must hold a JSON object", path.display()),
            }
        }
        None => Map::new(),
    };

    for (key, value) in columns {
        if let Some(value) = value {
            object.insert(key.to_string(), Value::String(value.to_string()));
        }
        if !object.contains_key(*key) {
            anyhow::bail!("Missing required option --{}", key);
        }
    }

    serde_json::from_value(Value::Object(object)).context("Invalid chart options")
}

fn pie_options(args: &PieArgs, common: &CommonArgs) -> Result<PieOptions> {
    let mut opts: PieOptions =
        load_options(common.config.as_deref(), &[("main", args.main.as_ref())])?;

    if args.condition.is_some() {
        opts.condition = args.condition.clone();
    }
    if args.counts.is_some() {
        opts.counts = args.counts.clone();
    }
    if args.ratio.is_some() {
        opts.ratio = args.ratio.clone();
    }
    if args.stat_title.is_some() {
        opts.stat_title = args.stat_title.clone();
    }
    if args.legend_title.is_some() {
        opts.legend_title = args.legend_title.clone();
    }
    if args.facet_wrap_name.is_some() {
        opts.facet_wrap_name = args.facet_wrap_name.clone();
    }
    if let Some(palette) = &args.palette {
        opts.palette = palette.clone();
    }
    opts.slice_label = args.slice_label.unwrap_or(opts.slice_label);
    opts.perc_k = args.perc_k.unwrap_or(opts.perc_k);
    opts.sampling_plan = args.sampling_plan.unwrap_or(opts.sampling_plan);
    opts.fixed_margin = args.fixed_margin.unwrap_or(opts.fixed_margin);
    opts.prior_concentration = args.prior_concentration.unwrap_or(opts.prior_concentration);
    opts.b = args.b.unwrap_or(opts.b);
    opts.direction = args.direction.unwrap_or(opts.direction);
    opts.paired |= args.paired;
    opts.simulate_p_value |= args.simulate_p_value;
    if args.no_facet_proptest {
        opts.facet_proptest = false;
    }
    if args.no_sample_size_label {
        opts.sample_size_label = false;
    }

    if common.title.is_some() {
        opts.title = common.title.clone();
    }
    if common.caption.is_some() {
        opts.caption = common.caption.clone();
    }
    opts.theme = common.theme.unwrap_or(opts.theme);
    opts.k = common.k.unwrap_or(opts.k);
    opts.conf_level = common.conf_level.unwrap_or(opts.conf_level);
    opts.nboot = common.nboot.unwrap_or(opts.nboot);
    opts.seed = common.seed.or(opts.seed);
    opts.messages |= common.messages;
    if common.plain_theme {
        opts.ggstatsplot_layer = false;
    }
    if common.no_subtitle {
        opts.results_subtitle = false;
    }
    if common.no_bf_message {
        opts.bf_message = false;
    }

    Ok(opts)
}

fn dot_options(args: &DotArgs, common: &CommonArgs) -> Result<DotOptions> {
    let mut opts: DotOptions = load_options(
        common.config.as_deref(),
        &[("x", args.x.as_ref()), ("y", args.y.as_ref())],
    )?;

    if args.xlab.is_some() {
        opts.xlab = args.xlab.clone();
    }
    if args.ylab.is_some() {
        opts.ylab = args.ylab.clone();
    }
    if let Some(color) = &args.point_color {
        opts.point_color = color.clone();
    }
    opts.test_type = args.test_type.unwrap_or(opts.test_type);
    opts.test_value = args.test_value.unwrap_or(opts.test_value);
    opts.bf_prior = args.bf_prior.unwrap_or(opts.bf_prior);
    opts.centrality_para = args.centrality.unwrap_or(opts.centrality_para);
    opts.point_size = args.point_size.unwrap_or(opts.point_size);
    opts.test_value_line |= args.test_value_line;
    if args.no_centrality_line {
        opts.centrality_line = false;
    }

    if common.title.is_some() {
        opts.title = common.title.clone();
    }
    if common.caption.is_some() {
        opts.caption = common.caption.clone();
    }
    opts.theme = common.theme.unwrap_or(opts.theme);
    opts.k = common.k.unwrap_or(opts.k);
    opts.conf_level = common.conf_level.unwrap_or(opts.conf_level);
    opts.nboot = common.nboot.unwrap_or(opts.nboot);
    opts.seed = common.seed.or(opts.seed);
    opts.messages |= common.messages;
    if common.plain_theme {
        opts.ggstatsplot_layer = false;
    }
    if common.no_subtitle {
        opts.results_subtitle = false;
    }
    if common.no_bf_message {
        opts.bf_message = false;
    }

    Ok(opts)
}
