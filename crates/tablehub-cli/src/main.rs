// crates/tablehub-cli/src/main.rs
// ============================================================================
// Module: Tablehub CLI Entry Point
// Description: Command dispatcher for operating a Tablehub deployment.
// Purpose: Upload, query, export, and administer hosted databases from a shell.
// Dependencies: clap, serde_json, tablehub-config, tablehub-core,
// tablehub-object-store, tablehub-store-sqlite, thiserror.
// ============================================================================

//! ## Overview
//! The `tablehub` binary loads `tablehub.toml`, wires the configured
//! metadata store, object store, embedded engine, cache, and audit sink into
//! a [`TableService`], and runs one operation as the requester named by
//! `--user` (anonymous when omitted). Structured results are printed as JSON
//! on stdout; failures print one line on stderr and exit non-zero. Service
//! errors are shown through their public message so inaccessible databases
//! are indistinguishable from missing ones.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use serde_json::json;
use tablehub_cli::t;
use tablehub_config::TablehubConfig;
use tablehub_core::ChartParams;
use tablehub_core::ChartRequest;
use tablehub_core::DatabaseRequest;
use tablehub_core::InMemoryResultCache;
use tablehub_core::MetadataStore;
use tablehub_core::Requester;
use tablehub_core::ResultCache;
use tablehub_core::ServiceBackends;
use tablehub_core::SystemClock;
use tablehub_core::TableEngine;
use tablehub_core::TableService;
use tablehub_core::TableViewRequest;
use tablehub_core::TablehubError;
use tablehub_core::UploadPipeline;
use tablehub_core::Visibility;
use tablehub_object_store::build_object_store;
use tablehub_store_sqlite::SqliteMetadataStore;
use tablehub_store_sqlite::SqliteTableEngine;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "tablehub", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue)]
    show_version: bool,
    /// Optional config file path (defaults to tablehub.toml or env override).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Requesting user; anonymous when omitted.
    #[arg(long, value_name = "USER", global = true)]
    user: Option<String>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a database file as the next version owned by `--user`.
    Upload(UploadCommand),
    /// Print a capped dump of one table as JSON.
    Table(TableCommand),
    /// Print a two-column chart projection of the latest version as JSON.
    Chart(ChartCommand),
    /// Export every row of one table as CSV.
    Csv(CsvCommand),
    /// Write the raw database file of one version.
    Download(DownloadCommand),
    /// Change the visibility of every version of a database.
    Visibility(VisibilityCommand),
    /// Star utilities.
    Star {
        /// Selected star subcommand.
        #[command(subcommand)]
        command: StarCommand,
    },
    /// Show or change the requester's row cap.
    Prefs(PrefsCommand),
    /// List an owner's databases visible to the requester.
    List(ListCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Owner and database naming one hosted database.
#[derive(Args, Debug, Clone)]
struct DatabaseArgs {
    /// Owner of the database.
    #[arg(value_name = "OWNER")]
    owner: String,
    /// Database name.
    #[arg(value_name = "DATABASE")]
    database: String,
}

/// Arguments for `upload`.
#[derive(Args, Debug)]
struct UploadCommand {
    /// Path of the database file to upload.
    #[arg(value_name = "FILE")]
    file: PathBuf,
    /// Database name (defaults to the file name).
    #[arg(long, value_name = "NAME")]
    name: Option<String>,
    /// Make the database readable by everyone.
    #[arg(long, action = ArgAction::SetTrue)]
    public: bool,
    /// Declared content type.
    #[arg(long = "content-type", value_name = "TYPE")]
    content_type: Option<String>,
}

/// Arguments for `table`.
#[derive(Args, Debug)]
struct TableCommand {
    /// Target database.
    #[command(flatten)]
    target: DatabaseArgs,
    /// Version number; latest when omitted.
    #[arg(long, value_name = "VERSION", default_value = "")]
    version: String,
    /// Table name; the first table when omitted.
    #[arg(long, value_name = "TABLE", default_value = "")]
    table: String,
}

/// Arguments for `chart`.
#[derive(Args, Debug)]
struct ChartCommand {
    /// Target database.
    #[command(flatten)]
    target: DatabaseArgs,
    /// Table name; the first table when omitted.
    #[arg(long, value_name = "TABLE", default_value = "")]
    table: String,
    /// First projected column; omit both columns to dump the table.
    #[arg(long, value_name = "COLUMN", default_value = "")]
    x: String,
    /// Second projected column.
    #[arg(long, value_name = "COLUMN", default_value = "")]
    y: String,
    /// Filter column.
    #[arg(long = "filter-column", value_name = "COLUMN", default_value = "")]
    filter_column: String,
    /// Filter operator (`=`, `!=`, `<`, `<=`, `>`, `>=`, `like`).
    #[arg(long = "filter-op", value_name = "OP", default_value = "")]
    filter_operator: String,
    /// Filter value.
    #[arg(long = "filter-value", value_name = "VALUE", default_value = "")]
    filter_value: String,
}

/// Arguments for `csv`.
#[derive(Args, Debug)]
struct CsvCommand {
    /// Target database.
    #[command(flatten)]
    target: DatabaseArgs,
    /// Version number; latest when omitted.
    #[arg(long, value_name = "VERSION", default_value = "")]
    version: String,
    /// Table name; the first table when omitted.
    #[arg(long, value_name = "TABLE", default_value = "")]
    table: String,
    /// Output file; stdout when omitted.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

/// Arguments for `download`.
#[derive(Args, Debug)]
struct DownloadCommand {
    /// Target database.
    #[command(flatten)]
    target: DatabaseArgs,
    /// Version number; latest when omitted.
    #[arg(long, value_name = "VERSION", default_value = "")]
    version: String,
    /// Output file for the database bytes.
    #[arg(long, value_name = "PATH")]
    output: PathBuf,
}

/// Visibility values accepted on the command line.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum VisibilityArg {
    /// Readable by everyone.
    Public,
    /// Readable by the owner only.
    Private,
}

impl From<VisibilityArg> for Visibility {
    fn from(value: VisibilityArg) -> Self {
        match value {
            VisibilityArg::Public => Self::Public,
            VisibilityArg::Private => Self::Private,
        }
    }
}

/// Arguments for `visibility`.
#[derive(Args, Debug)]
struct VisibilityCommand {
    /// Target database.
    #[command(flatten)]
    target: DatabaseArgs,
    /// New visibility.
    #[arg(value_enum, value_name = "VISIBILITY")]
    visibility: VisibilityArg,
}

/// Star subcommands.
#[derive(Subcommand, Debug)]
enum StarCommand {
    /// Toggle the requester's star.
    Toggle(DatabaseArgs),
    /// Print the star count.
    Count(DatabaseArgs),
    /// List users starring the database.
    List(DatabaseArgs),
}

/// Arguments for `prefs`.
#[derive(Args, Debug)]
struct PrefsCommand {
    /// New row cap; prints the current cap when omitted.
    #[arg(long = "max-rows", value_name = "ROWS")]
    max_rows: Option<u32>,
}

/// Arguments for `list`.
#[derive(Args, Debug)]
struct ListCommand {
    /// Owner whose databases are listed.
    #[arg(value_name = "OWNER")]
    owner: String,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the configuration file.
    Validate,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for catalog-formatted messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a formatted message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }

    /// Wraps a service error using its public message.
    fn service(operation: &str, err: &TablehubError) -> Self {
        Self::new(t!("command.failed", operation = operation, error = err.public_message()))
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(command) = cli.command else {
        return Err(CliError::new(t!("main.no_command")));
    };

    let config = TablehubConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    if let Commands::Config {
        command,
    } = &command
    {
        return command_config(command);
    }

    let requester = Requester::from_raw(cli.user.as_deref().unwrap_or(""))
        .map_err(|err| CliError::new(t!("requester.invalid", error = err)))?;
    let service = build_service(&config)?;
    let context = CommandContext {
        service: &service,
        requester: &requester,
        config: &config,
    };

    match command {
        Commands::Upload(command) => command_upload(&context, &command),
        Commands::Table(command) => command_table(&context, &command),
        Commands::Chart(command) => command_chart(&context, &command),
        Commands::Csv(command) => command_csv(&context, &command),
        Commands::Download(command) => command_download(&context, &command),
        Commands::Visibility(command) => command_visibility(&context, &command),
        Commands::Star {
            command,
        } => command_star(&context, &command),
        Commands::Prefs(command) => command_prefs(&context, &command),
        Commands::List(command) => command_list(&context, &command),
        Commands::Config {
            command,
        } => command_config(&command),
    }
}

// ============================================================================
// SECTION: Wiring
// ============================================================================

/// Shared inputs for a single command invocation.
struct CommandContext<'a> {
    /// Wired table service.
    service: &'a TableService,
    /// Requesting identity.
    requester: &'a Requester,
    /// Loaded configuration.
    config: &'a TablehubConfig,
}

/// Builds the table service from configuration.
fn build_service(config: &TablehubConfig) -> CliResult<TableService> {
    let metadata: Arc<dyn MetadataStore> = Arc::new(
        SqliteMetadataStore::new(&config.metadata.store_config())
            .map_err(|err| CliError::new(t!("backend.metadata_failed", error = err)))?,
    );
    let objects = build_object_store(&config.object_store)
        .map_err(|err| CliError::new(t!("backend.objects_failed", error = err)))?;
    let engine: Arc<dyn TableEngine> = Arc::new(SqliteTableEngine::new());
    let cache: Arc<dyn ResultCache> =
        Arc::new(InMemoryResultCache::with_clock(Arc::new(SystemClock), config.cache.max_entries));
    let audit = config
        .audit
        .build_sink()
        .map_err(|err| CliError::new(t!("backend.audit_failed", error = err)))?;
    let uploads = UploadPipeline::new(
        Arc::clone(&metadata),
        Arc::clone(&objects),
        Arc::clone(&engine),
        Arc::clone(&audit),
        config.upload_settings(),
    );
    Ok(TableService::new(
        ServiceBackends {
            metadata,
            objects,
            engine,
            cache,
            audit,
        },
        uploads,
        config.service_limits(),
    ))
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes `config` subcommands.
fn command_config(command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate => {
            write_stdout_line(&t!("config.validate.ok"))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Executes `upload`.
fn command_upload(context: &CommandContext<'_>, command: &UploadCommand) -> CliResult<ExitCode> {
    let bytes = read_file_with_limit(&command.file, context.config.limits.max_upload_bytes)?;
    let name = match &command.name {
        Some(name) => name.clone(),
        None => command
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    let record = context
        .service
        .upload(context.requester, &name, &bytes, command.public, command.content_type.as_deref())
        .map_err(|err| CliError::service("upload", &err))?;
    write_stdout_line(&t!(
        "upload.ok",
        owner = record.owner,
        name = record.name,
        version = record.version,
        size = record.size_bytes,
        visibility = record.visibility.as_str()
    ))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `table`.
fn command_table(context: &CommandContext<'_>, command: &TableCommand) -> CliResult<ExitCode> {
    let request = TableViewRequest {
        target: database_request(&command.target, &command.version),
        table: &command.table,
    };
    let rows = context
        .service
        .table_view(&request, context.requester)
        .map_err(|err| CliError::service("table", &err))?;
    let bytes = rows
        .to_json_bytes()
        .map_err(|err| CliError::new(t!("output.serialize_failed", error = err)))?;
    write_stdout_bytes_with_newline(&bytes)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `chart`.
fn command_chart(context: &CommandContext<'_>, command: &ChartCommand) -> CliResult<ExitCode> {
    let request = ChartRequest {
        owner: &command.target.owner,
        database: &command.target.database,
        table: &command.table,
        params: ChartParams {
            x: &command.x,
            y: &command.y,
            filter_column: &command.filter_column,
            filter_operator: &command.filter_operator,
            filter_value: &command.filter_value,
        },
    };
    let body = context
        .service
        .chart_data(&request, context.requester)
        .map_err(|err| CliError::service("chart", &err))?;
    write_stdout_bytes_with_newline(&body)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `csv`.
fn command_csv(context: &CommandContext<'_>, command: &CsvCommand) -> CliResult<ExitCode> {
    let request = TableViewRequest {
        target: database_request(&command.target, &command.version),
        table: &command.table,
    };
    let export = context
        .service
        .csv_export(&request, context.requester)
        .map_err(|err| CliError::service("csv", &err))?;
    match &command.output {
        Some(path) => {
            write_file(path, export.body.as_bytes())?;
            write_stdout_line(&t!("csv.ok", table = export.table, path = path.display()))?;
        }
        None => write_stdout_bytes(export.body.as_bytes())?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `download`.
fn command_download(
    context: &CommandContext<'_>,
    command: &DownloadCommand,
) -> CliResult<ExitCode> {
    let request = database_request(&command.target, &command.version);
    let download = context
        .service
        .download(&request, context.requester)
        .map_err(|err| CliError::service("download", &err))?;
    write_file(&command.output, &download.bytes)?;
    write_stdout_line(&t!(
        "download.ok",
        owner = download.record.owner,
        name = download.record.name,
        version = download.record.version,
        path = command.output.display(),
        size = download.bytes.len()
    ))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `visibility`.
fn command_visibility(
    context: &CommandContext<'_>,
    command: &VisibilityCommand,
) -> CliResult<ExitCode> {
    let visibility = Visibility::from(command.visibility);
    context
        .service
        .set_visibility(
            &command.target.owner,
            &command.target.database,
            visibility,
            context.requester,
        )
        .map_err(|err| CliError::service("visibility", &err))?;
    write_stdout_line(&t!(
        "visibility.ok",
        owner = command.target.owner,
        name = command.target.database,
        visibility = visibility.as_str()
    ))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `star` subcommands.
fn command_star(context: &CommandContext<'_>, command: &StarCommand) -> CliResult<ExitCode> {
    match command {
        StarCommand::Toggle(target) => {
            let state = context
                .service
                .toggle_star(&target.owner, &target.database, context.requester)
                .map_err(|err| CliError::service("star", &err))?;
            let line = if state.starred {
                t!(
                    "star.toggled.on",
                    owner = target.owner,
                    name = target.database,
                    count = state.count
                )
            } else {
                t!(
                    "star.toggled.off",
                    owner = target.owner,
                    name = target.database,
                    count = state.count
                )
            };
            write_stdout_line(&line)?;
        }
        StarCommand::Count(target) => {
            let count = context
                .service
                .star_count(&target.owner, &target.database, context.requester)
                .map_err(|err| CliError::service("star", &err))?;
            write_stdout_line(&t!("star.count", count = count))?;
        }
        StarCommand::List(target) => {
            let users = context
                .service
                .stargazers(&target.owner, &target.database, context.requester)
                .map_err(|err| CliError::service("star", &err))?;
            write_json(&json!({ "stargazers": users }))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `prefs`.
fn command_prefs(context: &CommandContext<'_>, command: &PrefsCommand) -> CliResult<ExitCode> {
    if let Some(rows) = command.max_rows {
        context
            .service
            .set_max_rows(context.requester, rows)
            .map_err(|err| CliError::service("prefs", &err))?;
        write_stdout_line(&t!("prefs.updated", rows = rows))?;
        return Ok(ExitCode::SUCCESS);
    }
    let rows = context
        .service
        .row_cap_for(context.requester)
        .map_err(|err| CliError::service("prefs", &err))?;
    write_stdout_line(&t!("prefs.row_cap", rows = rows))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `list`.
fn command_list(context: &CommandContext<'_>, command: &ListCommand) -> CliResult<ExitCode> {
    let databases = context
        .service
        .list_databases(&command.owner, context.requester)
        .map_err(|err| CliError::service("list", &err))?;
    write_json(&json!({ "databases": databases }))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a service request from positional arguments.
fn database_request<'a>(target: &'a DatabaseArgs, version: &'a str) -> DatabaseRequest<'a> {
    DatabaseRequest {
        owner: &target.owner,
        database: &target.database,
        version,
    }
}

/// Reads a file, refusing anything larger than `limit` bytes.
fn read_file_with_limit(path: &Path, limit: usize) -> CliResult<Vec<u8>> {
    let metadata = fs::metadata(path).map_err(|err| {
        CliError::new(t!("input.read_failed", path = path.display(), error = err))
    })?;
    let size = metadata.len();
    if size > u64::try_from(limit).unwrap_or(u64::MAX) {
        return Err(CliError::new(t!(
            "input.too_large",
            path = path.display(),
            size = size,
            limit = limit
        )));
    }
    fs::read(path)
        .map_err(|err| CliError::new(t!("input.read_failed", path = path.display(), error = err)))
}

/// Writes bytes to a file.
fn write_file(path: &Path, bytes: &[u8]) -> CliResult<()> {
    fs::write(path, bytes).map_err(|err| {
        CliError::new(t!("output.write_file_failed", path = path.display(), error = err))
    })
}

/// Writes a JSON value to stdout with a trailing newline.
fn write_json(value: &serde_json::Value) -> CliResult<()> {
    let bytes = serde_json::to_vec(value)
        .map_err(|err| CliError::new(t!("output.serialize_failed", error = err)))?;
    write_stdout_bytes_with_newline(&bytes)
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes raw bytes to stdout with a trailing newline.
fn write_stdout_bytes_with_newline(bytes: &[u8]) -> CliResult<()> {
    let mut buffer = bytes.to_vec();
    buffer.push(b'\n');
    write_stdout_bytes(&buffer)
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
