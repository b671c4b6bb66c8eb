//! JSON Structure CLI
//!
//! Command-line interface for validating JSON Structure schemas and
//! instances.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use json_structure::{
    has_errors, lint, Diagnostic, FileStatus, Severity, StructureError, ValidatorOptions,
};

#[derive(Parser)]
#[command(name = "json-structure")]
#[command(about = "Validate JSON Structure schemas and instances")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a schema document
    Schema {
        /// Schema file to validate
        schema: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Validate an instance against a schema
    Instance {
        /// Instance file to validate
        instance: PathBuf,

        /// Schema file to validate against
        #[arg(long, short)]
        schema: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Lint schema files (syntax, references, structural rules)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

#[derive(clap::Args)]
struct PipelineArgs {
    /// Allow $-prefixed identifiers (for meta-schema documents)
    #[arg(long)]
    metaschema: bool,

    /// Permit $import / $importdefs processing
    #[arg(long)]
    allow_import: bool,

    /// Map an import URI to a local file (URI=FILE, repeatable)
    #[arg(long = "importmap", value_name = "URI=FILE")]
    import_map: Vec<String>,

    /// Activate an extension feature or add-in (repeatable)
    #[arg(long = "uses", value_name = "NAME")]
    uses: Vec<String>,
}

impl PipelineArgs {
    fn into_options(self) -> Result<ValidatorOptions, u8> {
        let mut options = ValidatorOptions::new()
            .metaschema(self.metaschema)
            .allow_import(self.allow_import);
        for name in self.uses {
            options = options.activate(name);
        }
        for entry in &self.import_map {
            let Some((uri, file)) = entry.split_once('=') else {
                eprintln!("Error: invalid --importmap \"{}\": expected URI=FILE", entry);
                return Err(2);
            };
            options = options.map_uri(uri, file);
        }
        Ok(options)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Schema {
            schema,
            pipeline,
            json,
        } => pipeline
            .into_options()
            .and_then(|options| run_schema(&schema, &options, json)),

        Commands::Instance {
            instance,
            schema,
            pipeline,
            json,
        } => pipeline
            .into_options()
            .and_then(|options| run_instance(&instance, &schema, &options, json)),

        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_schema(schema: &Path, options: &ValidatorOptions, json: bool) -> Result<(), u8> {
    let diagnostics =
        json_structure::validate_schema_file(schema, options).map_err(|e| fatal(json, &e))?;
    report(json, &diagnostics)
}

fn run_instance(
    instance: &Path,
    schema: &Path,
    options: &ValidatorOptions,
    json: bool,
) -> Result<(), u8> {
    let diagnostics = json_structure::validate_instance_file(instance, schema, options)
        .map_err(|e| fatal(json, &e))?;
    report(json, &diagnostics)
}

fn fatal(json: bool, e: &StructureError) -> u8 {
    if json {
        let output = serde_json::json!({ "valid": false, "error": e.to_string() });
        println!("{}", output);
    } else {
        eprintln!("Error: {}", e);
    }
    e.exit_code() as u8
}

fn report(json: bool, diagnostics: &[Diagnostic]) -> Result<(), u8> {
    let valid = !has_errors(diagnostics);
    if json {
        let output = serde_json::json!({
            "valid": valid,
            "diagnostics": diagnostics,
        });
        println!("{}", output);
    } else if diagnostics.is_empty() {
        println!("Valid");
    } else {
        for diagnostic in diagnostics {
            let (stream_err, label) = match diagnostic.severity {
                Severity::Error => (true, "error"),
                Severity::Warning => (false, "warning"),
            };
            let line = format!("{}: {}", label, diagnostic);
            if stream_err {
                eprintln!("{}", line);
            } else {
                println!("{}", line);
            }
        }
        if valid {
            println!("Valid (with warnings)");
        }
    }

    if valid {
        Ok(())
    } else {
        Err(1)
    }
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(3);
    }

    let result = lint(path, &ValidatorOptions::new(), strict);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&result).unwrap());
    } else {
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let color = match diag.severity {
                    Severity::Error => "\x1b[31m",
                    Severity::Warning => "\x1b[33m",
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}\x1b[0m: {}",
                        color,
                        match diag.severity {
                            Severity::Error => "error",
                            Severity::Warning => "warning",
                        },
                        diag
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
