//! Command-line interface for the thinkmap utility
//!
//! Validates diagram specs, prints blank templates and runs multi-model
//! generation against a backend endpoint.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::debug;

use crate::colorizer::{colorize_output, status_line, Status};
use thinkmap::core::parse_model_list;
use thinkmap::editor::blank_template;
use thinkmap::llm::{
    GenerationObserver, GenerationReport, GenerationRequest, HttpTransport, LlmEngineManager,
    ProgressState,
};
use thinkmap::validation::{Inconsistency, PropertyValidation};
use thinkmap::{parse_spec, validate_properties, DiagramType, KernelConfig, Language};

/// Thinkmap - thinking-map diagram specs from the command line
#[derive(Parser)]
#[command(name = "thinkmap")]
#[command(about = "Validate, template and generate thinking-map diagram specs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (implies debug logging unless --log-level is given)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Set log level (trace|debug|info|warn|error)
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Set log format (compact|pretty|json)
    #[arg(long, value_enum, global = true)]
    pub log_format: Option<LogFormat>,

    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// When to use colors in output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto, global = true)]
    pub color: ColorChoice,
}

impl Cli {
    /// Explicit level, else `debug` when verbose, else environment/default
    pub fn effective_log_level(&self) -> Option<&'static str> {
        match (self.log_level, self.verbose) {
            (Some(level), _) => Some(level.as_str()),
            (None, true) => Some(LogLevel::Debug.as_str()),
            (None, false) => None,
        }
    }
}

/// Log level options
#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format options
#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

/// UI language of templates and messages
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LanguageChoice {
    En,
    Zh,
}

impl From<LanguageChoice> for Language {
    fn from(value: LanguageChoice) -> Self {
        match value {
            LanguageChoice::En => Language::En,
            LanguageChoice::Zh => Language::Zh,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a spec against the schema of its diagram type
    Validate {
        /// Diagram type (bubble_map, mindmap, ...)
        #[arg(short = 't', long = "type")]
        diagram_type: String,

        /// Input file containing the spec JSON (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Print the blank template of a diagram type
    Template {
        /// Diagram type (bubble_map, mindmap, ...)
        diagram_type: String,

        /// Template language (defaults to the configured language)
        #[arg(short, long, value_enum)]
        language: Option<LanguageChoice>,

        /// Output file (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show supported diagram types
    Types {
        /// Show in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Generate a diagram with several models and compare the results
    Generate {
        /// What the diagram should be about
        #[arg(short, long)]
        prompt: String,

        /// Diagram type to ask for
        #[arg(short = 't', long = "type")]
        diagram_type: String,

        /// Comma-separated models (defaults to the configured list)
        #[arg(short, long)]
        models: Option<String>,

        /// Generation endpoint, absolute or a path joined onto --base-url
        #[arg(long)]
        endpoint: Option<String>,

        /// Base URL for a path-only endpoint
        #[arg(long)]
        base_url: Option<String>,

        /// Request language (defaults to the configured language)
        #[arg(short, long, value_enum)]
        language: Option<LanguageChoice>,

        /// Write the full JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// When to colorize output
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Use colors if output is a terminal and NO_COLOR is not set
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Prints per-model progress to stderr in verbose mode
struct ProgressPrinter {
    verbose: bool,
}

impl GenerationObserver for ProgressPrinter {
    fn on_progress(&self, state: ProgressState, model: &str) {
        if self.verbose {
            eprintln!("[{}] {:?}", model, state);
        }
    }
}

/// Main CLI application
pub struct ThinkmapApp {
    config: KernelConfig,
}

impl ThinkmapApp {
    /// Create a new application instance with default settings
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    pub fn with_config(config: KernelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Load `--config` (if any) and apply `THINKMAP_*` overrides
    pub fn load_config(&mut self, path: Option<&PathBuf>) -> Result<()> {
        let config = match path {
            Some(path) => KernelConfig::from_path(path)?,
            None => self.config.clone(),
        };
        self.config = config.with_env_overrides()?;
        debug!(config = ?self.config, "Configuration loaded");
        Ok(())
    }

    /// Run the application with the given CLI arguments
    pub fn run(&mut self, cli: Cli) -> Result<()> {
        self.load_config(cli.config.as_ref())?;

        if cli.verbose {
            eprintln!("Thinkmap v{}", env!("CARGO_PKG_VERSION"));
        }

        match cli.command {
            Commands::Validate {
                diagram_type,
                input,
            } => {
                let colorize = self.should_colorize(&None, cli.color);
                self.validate_command(&diagram_type, input, colorize, cli.verbose)
            }
            Commands::Template {
                diagram_type,
                language,
                output,
            } => self.template_command(&diagram_type, language, output, cli.verbose),
            Commands::Types { json } => {
                let listing = self.types_listing(json)?;
                self.write_output(None, &listing)
            }
            Commands::Generate {
                prompt,
                diagram_type,
                models,
                endpoint,
                base_url,
                language,
                output,
            } => {
                let colorize = self.should_colorize(&None, cli.color);
                let options = GenerateOptions {
                    prompt,
                    diagram_type,
                    models,
                    endpoint,
                    base_url,
                    language,
                    output,
                };
                self.generate_command(options, colorize, cli.verbose)
            }
        }
    }

    /// Determine if we should colorize the output based on color choice and output destination
    fn should_colorize(&self, output: &Option<PathBuf>, color: ColorChoice) -> bool {
        match color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                if std::env::var("NO_COLOR").is_ok() {
                    return false;
                }
                match output {
                    None => crossterm::tty::IsTty::is_tty(&std::io::stdout()),
                    Some(ref p) if p.to_str() == Some("-") => {
                        crossterm::tty::IsTty::is_tty(&std::io::stdout())
                    }
                    Some(_) => false,
                }
            }
        }
    }

    fn print_status(&self, text: &str, colorize: bool) {
        if colorize {
            println!("{}", colorize_output(text));
        } else {
            println!("{}", text);
        }
    }

    /// Handle the validate command
    fn validate_command(
        &self,
        diagram_type: &str,
        input: Option<PathBuf>,
        colorize: bool,
        verbose: bool,
    ) -> Result<()> {
        let content = self.read_input(input)?;
        if verbose {
            eprintln!("Read {} bytes of input", content.len());
        }

        let spec: serde_json::Value =
            serde_json::from_str(&content).context("Input is not valid JSON")?;
        let validation = validate_properties(diagram_type, &spec);
        let structural = if validation.is_valid {
            parse_spec(diagram_type, spec).err()
        } else {
            None
        };

        let text = format_validation(diagram_type, &validation, structural.as_ref());
        self.print_status(&text, colorize);

        match (validation.is_valid, structural) {
            (true, None) => Ok(()),
            (_, Some(e)) => Err(e.into()),
            (false, None) => Err(anyhow!("Invalid {} spec", diagram_type)),
        }
    }

    /// Handle the template command
    fn template_command(
        &self,
        diagram_type: &str,
        language: Option<LanguageChoice>,
        output: Option<PathBuf>,
        verbose: bool,
    ) -> Result<()> {
        let diagram_type: DiagramType = diagram_type.parse()?;
        let language = language.map(Language::from).unwrap_or(self.config.language);
        if verbose {
            eprintln!("Blank {} template ({})", diagram_type, language);
        }
        let spec = blank_template(diagram_type, language);
        let json = serde_json::to_string_pretty(&spec)?;
        self.write_output(output, &json)
    }

    /// Supported types, human-readable or JSON
    pub fn types_listing(&self, json: bool) -> Result<String> {
        if json {
            let types: Vec<serde_json::Value> = DiagramType::ALL
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "name": t.as_str(),
                        "display_name": t.display_name(),
                        "required_fields": t.required_fields(),
                    })
                })
                .collect();
            let listing = serde_json::json!({
                "supported_types": types,
                "total": DiagramType::ALL.len(),
            });
            return Ok(serde_json::to_string_pretty(&listing)?);
        }

        let mut out = String::from("Supported diagram types:\n");
        for t in DiagramType::ALL {
            out.push_str(&format!(
                "  {:<18} - {} ({})\n",
                t.as_str(),
                t.display_name(),
                t.required_fields().join(", ")
            ));
        }
        out.push_str(&format!(
            "\nTotal: {} diagram types supported",
            DiagramType::ALL.len()
        ));
        Ok(out)
    }

    /// Handle the generate command
    fn generate_command(&self, options: GenerateOptions, colorize: bool, verbose: bool) -> Result<()> {
        let diagram_type: DiagramType = options.diagram_type.parse()?;
        let language = options
            .language
            .map(Language::from)
            .unwrap_or(self.config.language);

        let mut engine_config = self.config.engine.clone();
        if let Some(endpoint) = options.endpoint {
            engine_config.endpoint = endpoint;
        }
        let models = match options.models.as_deref().map(parse_model_list) {
            Some(models) if !models.is_empty() => models,
            _ => engine_config.models.clone(),
        };

        let transport = HttpTransport::new(&engine_config, options.base_url.as_deref())?;
        if verbose {
            eprintln!("POST {} for {}", transport.endpoint(), models.join(", "));
        }

        let request = GenerationRequest::new(options.prompt)
            .with_diagram_type(diagram_type)
            .with_language(language.as_str());
        let engine = LlmEngineManager::new(transport, &self.config.cache);
        let observer = ProgressPrinter { verbose };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;
        let report = runtime.block_on(engine.generate(&models, &request, &observer));

        self.print_status(&format_report(&report), colorize);

        if let Some(path) = options.output {
            let json = serde_json::to_string_pretty(&report)?;
            self.write_output(Some(path), &json)?;
        }

        if report.succeeded() == 0 {
            return Err(anyhow!("Every model failed"));
        }
        Ok(())
    }

    /// Read input from file or stdin
    pub fn read_input(&self, input: Option<PathBuf>) -> Result<String> {
        match input {
            Some(path) if path.to_string_lossy() != "-" => fs::read_to_string(&path)
                .map_err(|e| anyhow!("Failed to read input file '{}': {}", path.display(), e)),
            _ => {
                let mut content = String::new();
                io::stdin().read_to_string(&mut content)?;
                Ok(content)
            }
        }
    }

    /// Write output to file or stdout
    pub fn write_output(&self, output: Option<PathBuf>, content: &str) -> Result<()> {
        let stdout_content = if content.is_empty() || content.ends_with('\n') {
            content.to_string()
        } else {
            format!("{}\n", content)
        };

        match output {
            Some(path) if path.to_string_lossy() != "-" => {
                fs::write(&path, content).map_err(|e| {
                    anyhow!("Failed to write output file '{}': {}", path.display(), e)
                })?;
            }
            _ => {
                print!("{}", stdout_content);
                io::stdout().flush()?;
            }
        }
        Ok(())
    }
}

impl Default for ThinkmapApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Arguments of the generate command
pub struct GenerateOptions {
    pub prompt: String,
    pub diagram_type: String,
    pub models: Option<String>,
    pub endpoint: Option<String>,
    pub base_url: Option<String>,
    pub language: Option<LanguageChoice>,
    pub output: Option<PathBuf>,
}

/// Status lines for one validation
pub fn format_validation(
    diagram_type: &str,
    validation: &PropertyValidation,
    structural: Option<&thinkmap::EditorError>,
) -> String {
    if validation.is_valid {
        return match structural {
            None => status_line(Status::Ok, &format!("Valid {} spec", diagram_type)),
            Some(e) => status_line(Status::Fail, &e.to_string()),
        };
    }
    let mut lines = vec![status_line(
        Status::Fail,
        &format!("Invalid {} spec", diagram_type),
    )];
    lines.extend(
        validation
            .problems()
            .iter()
            .map(|p| format!("  {}", status_line(Status::Warn, p))),
    );
    lines.join("\n")
}

/// Status lines for a fan-out: one per model, then the comparison
pub fn format_report(report: &GenerationReport) -> String {
    let mut lines = Vec::new();
    for outcome in report.outcomes.values() {
        if outcome.success {
            let diagram_type = outcome
                .result
                .as_ref()
                .and_then(|r| r.diagram_type.as_deref())
                .unwrap_or("?");
            lines.push(status_line(
                Status::Ok,
                &format!("{} {} ({:.1}s)", outcome.model, diagram_type, outcome.elapsed),
            ));
            if let Some(validation) = outcome.validation.as_ref().filter(|v| !v.is_valid) {
                for problem in validation.problems() {
                    lines.push(format!("  {}", status_line(Status::Warn, &problem)));
                }
            }
        } else {
            let error = outcome
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            lines.push(status_line(
                Status::Fail,
                &format!("{}: {}", outcome.model, error),
            ));
        }
    }

    match &report.consistency {
        Some(consistency) if consistency.is_consistent() => {
            lines.push(status_line(Status::Ok, "Results are consistent"));
        }
        Some(consistency) => {
            for inconsistency in &consistency.inconsistencies {
                let text = match inconsistency {
                    Inconsistency::ContentCountVariance {
                        field, min, max, ..
                    } => format!("'{}' count varies from {} to {}", field, min, max),
                    Inconsistency::ValidationFailures { models } => {
                        format!("Failed validation: {}", models.join(", "))
                    }
                };
                lines.push(status_line(Status::Warn, &text));
            }
        }
        None => {}
    }

    lines.push(format!(
        "{} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    ));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_cli_parsing_validate_command() {
        let args = vec!["thinkmap", "validate", "--type", "bubble_map", "-i", "spec.json"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Validate {
                diagram_type,
                input,
            } => {
                assert_eq!(diagram_type, "bubble_map");
                assert_eq!(input.unwrap().to_string_lossy(), "spec.json");
            }
            _ => panic!("Expected Validate command"),
        }
        assert_eq!(cli.color, ColorChoice::Auto);
    }

    #[test]
    fn test_cli_parsing_template_command() {
        let args = vec!["thinkmap", "template", "flow_map", "--language", "zh"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Template {
                diagram_type,
                language,
                output,
            } => {
                assert_eq!(diagram_type, "flow_map");
                assert_eq!(language, Some(LanguageChoice::Zh));
                assert!(output.is_none());
            }
            _ => panic!("Expected Template command"),
        }
    }

    #[test]
    fn test_cli_parsing_generate_command() {
        let args = vec![
            "thinkmap",
            "generate",
            "--prompt",
            "water cycle",
            "--type",
            "flow_map",
            "--models",
            "qwen,kimi",
            "--endpoint",
            "http://localhost:9527/api/generate_graph",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Generate {
                prompt,
                models,
                endpoint,
                base_url,
                ..
            } => {
                assert_eq!(prompt, "water cycle");
                assert_eq!(models.as_deref(), Some("qwen,kimi"));
                assert!(endpoint.unwrap().starts_with("http://"));
                assert!(base_url.is_none());
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = vec!["thinkmap", "types", "--json", "--verbose", "--color", "never"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
        assert_eq!(cli.effective_log_level(), Some("debug"));
    }

    #[test]
    fn test_explicit_log_level_wins() {
        let args = vec!["thinkmap", "--verbose", "--log-level", "warn", "types"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.effective_log_level(), Some("warn"));
    }

    #[test]
    fn test_read_input_from_file() {
        let app = ThinkmapApp::new();
        let input = r#"{"topic":"T","attributes":["A"]}"#;

        let dir = tempdir().unwrap();
        let file_path = dir.path().join("spec.json");
        fs::write(&file_path, input).unwrap();

        let content = app.read_input(Some(file_path)).unwrap();
        assert_eq!(content, input);
    }

    #[test]
    fn test_write_output_to_file() {
        let app = ThinkmapApp::new();
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("template.json");

        app.write_output(Some(file_path.clone()), "{}").unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "{}");
    }

    #[test]
    fn test_template_command_writes_parseable_json() {
        let app = ThinkmapApp::new();
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("bubble.json");

        app.template_command("bubble_map", Some(LanguageChoice::Zh), Some(file_path.clone()), false)
            .unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&file_path).unwrap()).unwrap();
        assert_eq!(value["topic"], "主题");
        assert_eq!(value["attributes"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_template_command_unknown_type() {
        let app = ThinkmapApp::new();
        assert!(app.template_command("venn", None, None, false).is_err());
    }

    #[test]
    fn test_validate_command_reports_missing_field() {
        let app = ThinkmapApp::new();
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("bridge.json");
        fs::write(&file_path, r#"{"analogies":[{"left":"L"}]}"#).unwrap();

        let result = app.validate_command("bridge_map", Some(file_path), false, false);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_command_accepts_good_spec() {
        let app = ThinkmapApp::new();
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("circle.json");
        fs::write(&file_path, r#"{"topic":"Water","context":["Rain","Snow"]}"#).unwrap();

        assert!(app
            .validate_command("circle_map", Some(file_path), false, false)
            .is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("thinkmap.json");
        fs::write(&path, r#"{"history":{"max_history_size":10},"language":"zh"}"#).unwrap();

        let mut app = ThinkmapApp::new();
        app.load_config(Some(&path)).unwrap();
        assert_eq!(app.config().history.max_history_size, 10);
    }

    #[test]
    fn test_types_listing() {
        let app = ThinkmapApp::new();
        let human = app.types_listing(false).unwrap();
        assert!(human.contains("double_bubble_map"));
        assert!(human.contains("Total: 10"));

        let json: serde_json::Value =
            serde_json::from_str(&app.types_listing(true).unwrap()).unwrap();
        assert_eq!(json["total"], 10);
        assert_eq!(json["supported_types"][2]["name"], "double_bubble_map");
    }

    #[test]
    fn test_format_validation_lists_problems() {
        let validation = validate_properties("bridge_map", &json!({ "analogies": [{ "left": "L" }] }));
        let text = format_validation("bridge_map", &validation, None);
        assert!(text.starts_with("✗ Invalid bridge_map spec"));
        assert!(text.contains("analogies[0].right"));
    }
}
