//! yaml-include CLI - Main entry point

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yaml_include::{IncludeConfig, LoaderKind, Resolver, Value};

#[derive(Parser, Debug)]
#[command(name = "yaml-include")]
#[command(version)]
#[command(about = "Resolve !include directives in a YAML document", long_about = None)]
struct Cli {
    /// Input document (stdin when omitted or '-')
    input: Option<PathBuf>,

    /// Directory relative includes are resolved against (defaults to the input's directory)
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Keep directives unresolved and write them back as tags
    #[arg(long)]
    lazy: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Yaml)]
    format: OutputFormat,

    /// Tag to resolve, without the leading '!'
    #[arg(long)]
    tag: Option<String>,

    /// Longest allowed chain of nested includes
    #[arg(long)]
    max_depth: Option<usize>,

    /// How included files are parsed
    #[arg(long, value_enum)]
    loader: Option<LoaderArg>,

    /// TOML configuration file; command-line flags take precedence
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Write output to FILE instead of stdout
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LoaderArg {
    /// Parse every included file as YAML
    Yaml,
    /// Choose by extension: json, toml, txt, otherwise YAML
    Extension,
}

impl From<LoaderArg> for LoaderKind {
    fn from(arg: LoaderArg) -> Self {
        match arg {
            LoaderArg::Yaml => LoaderKind::Yaml,
            LoaderArg::Extension => LoaderKind::Extension,
        }
    }
}

impl Cli {
    /// Input file, or `None` for stdin.
    fn input_path(&self) -> Option<&Path> {
        self.input
            .as_deref()
            .filter(|path| path.as_os_str() != "-")
    }
}

/// Merge the configuration file (if any) with command-line overrides.
fn build_config(cli: &Cli) -> Result<IncludeConfig> {
    let mut config = match &cli.config {
        Some(path) => IncludeConfig::from_path(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => IncludeConfig::default(),
    };

    if let Some(tag) = &cli.tag {
        config.tag = tag.clone();
    }
    if let Some(max_depth) = cli.max_depth {
        config.max_depth = max_depth;
    }
    if let Some(loader) = cli.loader {
        config.loader = loader.into();
    }
    if cli.lazy {
        config.autoload = false;
    }

    if let Some(base_dir) = &cli.base_dir {
        config.base_dir = Some(base_dir.clone());
    } else if config.base_dir.is_none() {
        config.base_dir = cli.input_path().map(|input| {
            input
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        });
    }

    Ok(config)
}

fn render(resolver: &Resolver, value: &Value, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => Ok(resolver.dump(value)),
        OutputFormat::Json => {
            let mut json =
                serde_json::to_string_pretty(value).context("Failed to serialize document")?;
            json.push('\n');
            Ok(json)
        }
    }
}

/// Parse the input and return the rendered output.
fn run(cli: &Cli) -> Result<String> {
    let config = build_config(cli)?;
    debug!(?config, "resolver configuration");
    let resolver = config.build();

    let value = match cli.input_path() {
        Some(path) => resolver
            .parse_path(path)
            .with_context(|| format!("Failed to resolve {}", path.display()))?,
        None => resolver
            .parse_reader(&mut io::stdin().lock())
            .context("Failed to resolve standard input")?,
    };

    render(&resolver, &value, cli.format)
}

fn main() -> Result<()> {
    // Initialize logging; stdout carries the document
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yaml_include=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let output = run(&cli)?;

    match &cli.output {
        Some(path) => {
            fs::write(path, output)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "wrote resolved document");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("yaml-include").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_base_dir_defaults_to_input_directory() {
        let config = build_config(&cli(&["conf/main.yml"])).unwrap();
        assert_eq!(config.base_dir, Some(PathBuf::from("conf")));

        let config = build_config(&cli(&["main.yml"])).unwrap();
        assert_eq!(config.base_dir, Some(PathBuf::from(".")));

        let config = build_config(&cli(&["-"])).unwrap();
        assert_eq!(config.base_dir, None);

        let config = build_config(&cli(&["--base-dir", "/srv", "conf/main.yml"])).unwrap();
        assert_eq!(config.base_dir, Some(PathBuf::from("/srv")));
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = build_config(&cli(&[
            "--lazy",
            "--tag",
            "inc",
            "--max-depth",
            "3",
            "--loader",
            "extension",
        ]))
        .unwrap();
        assert!(!config.autoload);
        assert_eq!(config.tag, "inc");
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.loader, LoaderKind::Extension);
    }

    #[test]
    fn test_flags_override_config_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("include.toml");
        fs::write(&path, "tag = \"inc\"\nmax_depth = 8\nbase_dir = \"data\"\n").unwrap();

        let config = build_config(&cli(&[
            "--config",
            path.to_str().unwrap(),
            "--max-depth",
            "2",
            "doc.yml",
        ]))
        .unwrap();
        assert_eq!(config.tag, "inc");
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.base_dir, Some(temp.path().join("data")));
    }

    #[test]
    fn test_rejects_unknown_format() {
        let result = Cli::try_parse_from(["yaml-include", "--format", "xml"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_run_resolves_relative_to_input() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("main.yml"), "db: !include db.yml\n").unwrap();
        fs::write(temp.path().join("db.yml"), "host: localhost\nport: 5432\n").unwrap();
        let input = temp.path().join("main.yml");
        let input = input.to_str().unwrap();

        let yaml = run(&cli(&[input])).unwrap();
        assert_eq!(yaml, "db:\n  host: localhost\n  port: 5432\n");

        let json = run(&cli(&["--format", "json", input])).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["db"]["port"], 5432);

        let lazy = run(&cli(&["--lazy", input])).unwrap();
        assert_eq!(lazy, "db: !include db.yml\n");
    }

    #[test]
    fn test_run_reports_missing_include() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("main.yml"), "x: !include nope.yml\n").unwrap();
        let input = temp.path().join("main.yml");

        let err = run(&cli(&[input.to_str().unwrap()])).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("Failed to resolve"));
        assert!(message.contains("nope.yml"));
    }
}
