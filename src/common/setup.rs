use crate::errors::{ConfigError, NetworkError};
use crate::estimate::frequency::MissingParentPolicy;
use crate::network::dag::Bbn;
use crate::network::evidence::{Evidence, EvidenceBuilder, EvidenceType};
use clap::{builder::EnumValueParser, Arg, ArgAction, ArgMatches, Command};
use env_logger::{Builder, Env};
use std::io::Write;

/// One `--evidence NODE=VALUE[:LIKELIHOOD]` argument
#[derive(Clone, Debug, PartialEq)]
pub struct EvidenceArg {
    pub node: String,
    pub value: String,
    pub likelihood: f64,
}

impl EvidenceArg {
    /// `Gender=female`, applied unless `--no_default_evidence` is given
    pub fn default_observation() -> Self {
        EvidenceArg {
            node: "Gender".to_string(),
            value: "female".to_string(),
            likelihood: 1.0,
        }
    }

    /// Likelihood 1.0 is hard evidence. Anything lower is virtual evidence
    /// with the remainder shared evenly by the node's other values.
    pub fn to_evidence(&self, bbn: &Bbn) -> Result<Evidence, NetworkError> {
        let node = bbn.node_by_name(&self.node)?;
        if self.likelihood >= 1.0 {
            return EvidenceBuilder::new()
                .with_node(node)
                .with_evidence(&self.value, 1.0)
                .build();
        }

        let others = node.variable.cardinality().saturating_sub(1);
        let rest = if others == 0 {
            0.0
        } else {
            (1.0 - self.likelihood) / others as f64
        };
        let mut builder = EvidenceBuilder::new()
            .with_node(node)
            .with_type(EvidenceType::Virtual);
        for value in &node.variable.values {
            let likelihood = if *value == self.value { self.likelihood } else { rest };
            builder = builder.with_evidence(value, likelihood);
        }
        if node.variable.value_index(&self.value).is_none() {
            builder = builder.with_evidence(&self.value, self.likelihood);
        }
        builder.build()
    }
}

/// A `--query TARGET|GIVEN` comparison
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryArg {
    pub target: String,
    pub given: String,
}

/// These options define the inputs from the user.
#[derive(Clone, Debug)]
pub struct CommandLineOptions {
    pub data_file: String,
    pub config_file: Option<String>,
    pub evidence: Vec<EvidenceArg>,
    pub default_evidence: bool,
    pub missing_parent: MissingParentPolicy,
    pub query: Option<QueryArg>,
    pub marginal_output_file: Option<String>,
    pub diagram_output: Option<String>,
    pub delimiter: u8,
}

impl CommandLineOptions {
    /// The default observation, if enabled, followed by every `--evidence`
    pub fn evidence_args(&self) -> Vec<EvidenceArg> {
        let mut args = Vec::with_capacity(self.evidence.len() + 1);
        if self.default_evidence {
            args.push(EvidenceArg::default_observation());
        }
        args.extend(self.evidence.iter().cloned());
        args
    }
}

pub fn parse_evidence_arg(text: &str) -> Result<EvidenceArg, ConfigError> {
    let (node, rest) = text.split_once('=').ok_or_else(|| {
        ConfigError::Invalid(format!("evidence '{}' is not NODE=VALUE[:LIKELIHOOD]", text))
    })?;
    // Only a numeric suffix in (0, 1] is a likelihood; labels may contain ':'
    let (value, likelihood) = match rest.rsplit_once(':') {
        Some((value, l)) => match l.trim().parse::<f64>() {
            Ok(likelihood) if likelihood > 0.0 && likelihood <= 1.0 => (value, likelihood),
            _ => (rest, 1.0),
        },
        None => (rest, 1.0),
    };
    if node.trim().is_empty() || value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!(
            "evidence '{}' needs a node and a value",
            text
        )));
    }
    Ok(EvidenceArg {
        node: node.trim().to_string(),
        value: value.trim().to_string(),
        likelihood,
    })
}

pub fn parse_query_arg(text: &str) -> Result<QueryArg, ConfigError> {
    match text.split_once('|') {
        Some((target, given)) if !target.trim().is_empty() && !given.trim().is_empty() => {
            Ok(QueryArg {
                target: target.trim().to_string(),
                given: given.trim().to_string(),
            })
        }
        _ => Err(ConfigError::Invalid(format!(
            "query '{}' is not TARGET|GIVEN",
            text
        ))),
    }
}

fn parse_delimiter(text: &str) -> Result<u8, ConfigError> {
    let text = if text == "\\t" { "\t" } else { text };
    match text.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(ConfigError::Invalid(format!(
            "delimiter '{}' must be a single ASCII character",
            text
        ))),
    }
}

/// Logs go to stderr as `LEVEL [file:line] message`, filtered by `RUST_LOG`
pub fn init_logging() {
    let _ = Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let file = record.file().unwrap_or("unknown");
            let line = record.line().unwrap_or(0);
            writeln!(
                buf,
                "{} [{}:{}] {}",
                record.level(),
                file,
                line,
                record.args()
            )
        })
        .try_init();
}

pub fn command() -> Command {
    Command::new("SCOREBAYES")
        .version("0.1")
        .about("Bayesian network analysis of student exam scores.")
        .arg(
            Arg::new("data_file")
                .long("data_file")
                .value_name("FILE")
                .help("Delimited input file with gender and score columns")
                .default_value("StudentsPerformance.csv"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON analysis configuration (optional, defaults to the student network)"),
        )
        .arg(
            Arg::new("evidence")
                .long("evidence")
                .value_name("NODE=VALUE[:LIKELIHOOD]")
                .help("Evidence to apply, may be repeated")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("no_default_evidence")
                .long("no_default_evidence")
                .help("Skips the built-in Gender=female observation")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("missing_parent")
                .long("missing_parent")
                .value_parser(EnumValueParser::<MissingParentPolicy>::new())
                .help("What to do with parent categories that never occur: 'fail' or 'uniform'")
                .default_value("fail"),
        )
        .arg(
            Arg::new("query")
                .long("query")
                .value_name("TARGET|GIVEN")
                .help("Compares TARGET across every value of GIVEN (optional)"),
        )
        .arg(
            Arg::new("marginal_output_file")
                .long("marginal_output_file")
                .value_name("FILE")
                .help("Sets the file name for marginal output (optional)"),
        )
        .arg(
            Arg::new("diagram_output")
                .long("diagram_output")
                .value_name("FILE")
                .help("Writes the network diagram, .svg or .dot (optional)"),
        )
        .arg(
            Arg::new("delimiter")
                .long("delimiter")
                .value_name("CHAR")
                .help("Field delimiter of the input file")
                .default_value(","),
        )
}

pub fn options_from_matches(matches: &ArgMatches) -> Result<CommandLineOptions, ConfigError> {
    let data_file = matches
        .get_one::<String>("data_file")
        .cloned()
        .unwrap_or_else(|| "StudentsPerformance.csv".to_string());
    let config_file = matches.get_one::<String>("config").cloned();
    let evidence = matches
        .get_many::<String>("evidence")
        .into_iter()
        .flatten()
        .map(|e| parse_evidence_arg(e))
        .collect::<Result<Vec<_>, _>>()?;
    let default_evidence = !matches.get_flag("no_default_evidence");
    let missing_parent = matches
        .get_one::<MissingParentPolicy>("missing_parent")
        .copied()
        .unwrap_or_default();
    let query = matches
        .get_one::<String>("query")
        .map(|q| parse_query_arg(q))
        .transpose()?;
    let marginal_output_file = matches.get_one::<String>("marginal_output_file").cloned();
    let diagram_output = matches.get_one::<String>("diagram_output").cloned();
    let delimiter = match matches.get_one::<String>("delimiter") {
        Some(d) => parse_delimiter(d)?,
        None => b',',
    };

    Ok(CommandLineOptions {
        data_file,
        config_file,
        evidence,
        default_evidence,
        missing_parent,
        query,
        marginal_output_file,
        diagram_output,
        delimiter,
    })
}

pub fn parse_configuration_options() -> Result<CommandLineOptions, ConfigError> {
    init_logging();
    options_from_matches(&command().get_matches())
}
