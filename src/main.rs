use clap::Parser;
use expression_condition::{Condition, ConditionConfig, ExpressionCondition, Facts, ParseOptions};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Evaluate a condition expression against a set of facts.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Condition expression, e.g. "age > 18" (omit when --config is given)
    #[arg(required_unless_present = "config")]
    expression: Option<String>,
    /// Facts as a JSON object
    #[arg(long, default_value = "{}")]
    facts: String,
    /// Read facts from a JSON file instead of --facts
    #[arg(long, conflicts_with = "facts")]
    facts_file: Option<PathBuf>,
    /// Parse the expression as a template with #{ } delimiters
    #[arg(long)]
    template: bool,
    /// Custom template prefix (implies --template)
    #[arg(long, requires = "suffix")]
    prefix: Option<String>,
    /// Custom template suffix (implies --template)
    #[arg(long, requires = "prefix")]
    suffix: Option<String>,
    /// Load the condition from a JSON config file
    #[arg(long, conflicts_with_all = ["expression", "template", "prefix"])]
    config: Option<PathBuf>,
    /// Report evaluation errors instead of printing false
    #[arg(long)]
    strict: bool,
    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> ExitCode {
    // Parse CLI arguments.
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let condition = match build_condition(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid condition: {e}");
            return ExitCode::FAILURE;
        }
    };

    let facts = match load_facts(&args) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Invalid facts: {e}");
            return ExitCode::FAILURE;
        }
    };

    if args.strict {
        match condition.try_evaluate(&facts) {
            Ok(result) => println!("{result}"),
            Err(e) => {
                eprintln!("Evaluation failed: {e}");
                return ExitCode::from(2);
            }
        }
    } else {
        println!("{}", condition.evaluate(&facts));
    }
    ExitCode::SUCCESS
}

fn build_condition(args: &Args) -> Result<ExpressionCondition, Box<dyn Error>> {
    if let Some(path) = &args.config {
        return Ok(ConditionConfig::from_path(path)?.build()?);
    }
    let expression = args.expression.clone().unwrap_or_default();
    let options = match (&args.prefix, &args.suffix) {
        (Some(prefix), Some(suffix)) => ParseOptions::Template {
            prefix: prefix.clone(),
            suffix: suffix.clone(),
        },
        _ if args.template => ParseOptions::template(),
        _ => ParseOptions::Standard,
    };
    Ok(ExpressionCondition::with_options(expression, options)?)
}

fn load_facts(args: &Args) -> Result<Facts, Box<dyn Error>> {
    let raw = match &args.facts_file {
        Some(path) => std::fs::read_to_string(path)?,
        None => args.facts.clone(),
    };
    Ok(serde_json::from_str(&raw)?)
}
