use anyhow::{Context, Result};
use colored::Colorize;
use log::{info, warn};
use scorebayes::common::setup::parse_configuration_options;
use scorebayes::config::{build_network, AnalysisConfig};
use scorebayes::data::{derive_columns, load_csv};
use scorebayes::network::{InferenceController, JoinTree, Marginal};
use scorebayes::render::{write_diagram, RenderOptions};
use scorebayes::report::{apply_evidence, MarginalReport, QueryReport};
use scorebayes::{print_blue, print_divider, print_green, print_yellow};

fn print_probs(tree: &JoinTree) -> Result<()> {
    for node in tree.get_bbn_nodes() {
        let header = format!("Node: {}", node);
        if tree.evidence().contains_key(&node.id()) {
            println!("{}", header.yellow().bold());
        } else {
            println!("{}", header);
        }
        println!("Values:");
        println!("{}", tree.get_bbn_potential(node.id())?);
        print_divider!();
    }
    Ok(())
}

fn print_conditional(target: &str, given: &str, rows: &[(String, Marginal)]) {
    print_blue!("P({} | {})", target, given);
    for (value, marginal) in rows {
        let entries: Vec<String> = marginal
            .entries
            .iter()
            .map(|(v, p)| format!("{}={:.5}", v, p))
            .collect();
        println!("  {}={}: {}", given, value, entries.join(", "));
    }
    print_divider!();
}

fn main() -> Result<()> {
    let options = parse_configuration_options().context("reading command line")?;

    let config = match &options.config_file {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("loading configuration {}", path))?,
        None => AnalysisConfig::default(),
    };

    let table = load_csv(&options.data_file, &config.schema(options.delimiter))
        .with_context(|| format!("loading {}", options.data_file))?;
    let table = derive_columns(table, &config.discretizers).context("deriving score categories")?;
    info!("Using {} rows from {}", table.len(), options.data_file);

    let bbn = build_network(&table, &config, options.missing_parent)
        .context("estimating conditional probability tables")?;
    let mut tree = InferenceController::apply(&bbn).context("compiling join tree")?;

    print_probs(&tree)?;
    let prior = tree.get_posteriors()?;

    let evidence = apply_evidence(&mut tree, &options.evidence_args())
        .context("applying evidence")?;
    if evidence.is_empty() {
        warn!("No evidence given, posteriors equal the priors");
    }
    print_green!("Probability recalculated given evidence: ");
    print_probs(&tree)?;

    let query = match &options.query {
        Some(q) => {
            let rows = tree
                .conditional(&q.target, &q.given)
                .with_context(|| format!("querying {} given {}", q.target, q.given))?;
            print_conditional(&q.target, &q.given, &rows);
            Some(QueryReport::new(&q.target, &q.given, rows))
        }
        None => None,
    };

    if let Some(path) = &options.marginal_output_file {
        MarginalReport::build(&options.data_file, table.len(), prior, &tree, query)?
            .write(path)
            .with_context(|| format!("writing {}", path))?;
        print_yellow!("Marginals written to {}", path);
    }

    if let Some(path) = &options.diagram_output {
        write_diagram(&bbn, path, &RenderOptions::default())
            .with_context(|| format!("writing diagram {}", path))?;
        print_yellow!("Diagram written to {}", path);
    }

    Ok(())
}
