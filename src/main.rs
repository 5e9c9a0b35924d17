/// vbsolution-ops: operações de banco do VBSolution via API REST do Supabase
///
/// - `apply`: aplica migrações SQL pela função RPC `exec_sql`, uma unidade por vez
/// - `probe-rls`: smoke tests de row-level security com a anon key
/// - `tables` / `describe` / `verify`: inspeção do schema publicado
/// - `seed`: dados de exemplo a partir de JSON/YAML
/// - `check`: saúde dos endpoints REST, Auth e Storage
///
/// Toda a saída legível vai para stdout; logs vão para stderr.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use vbsolution_ops::config::Settings;
use vbsolution_ops::migration::{
    bootstrap_sql, ApplyOptions, ErrorPolicy, MigrationApplier, MigrationReport, MigrationScript,
    SplitMode, StatementStatus,
};
use vbsolution_ops::services::{
    self, load_seed_file, HealthReport, ProbeOptions, ProbeReport, RlsProbe, SchemaInspector, SeedReport,
    Seeder, TableSchema, TableVerification,
};
use vbsolution_ops::utils::logging::*;
use vbsolution_ops::utils::{truncate_with_suffix, AppResult};

#[derive(Parser)]
#[command(name = "vbsolution-ops")]
#[command(version)]
#[command(about = "Database operations for VBSolution through the Supabase REST API", long_about = None)]
struct Cli {
    /// URL do projeto (ou SUPABASE_URL)
    #[arg(long, env = "SUPABASE_URL", global = true)]
    url: Option<String>,

    /// Chave usada em todas as requisições, no lugar das chaves configuradas (ou SUPABASE_KEY)
    #[arg(short = 'k', long, env = "SUPABASE_KEY", global = true, hide_env_values = true)]
    key: Option<String>,

    /// Formato de saída (json, pretty)
    #[arg(short = 'o', long, default_value = "pretty", global = true)]
    output: OutputFormat,

    /// Logs em nível debug
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, PartialEq)]
enum OutputFormat {
    Json,
    Pretty,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "pretty" => Ok(OutputFormat::Pretty),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Aplica scripts SQL (arquivos ou diretórios com *.sql)
    Apply {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// continue-on-error ou fail-fast
        #[arg(long)]
        policy: Option<ErrorPolicy>,

        /// statements, sections ou whole
        #[arg(long = "split")]
        split_mode: Option<SplitMode>,

        /// Linha delimitadora do modo sections
        #[arg(long)]
        delimiter: Option<String>,

        /// Pausa entre requisições
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Timeout por requisição (seções grandes podem precisar de mais)
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Só mostra a divisão, sem enviar nada
        #[arg(long)]
        dry_run: bool,

        /// Reenvia statement por statement uma seção que falhou
        #[arg(long = "fallback-statements")]
        fallback_statements: bool,

        /// Tabelas que devem existir depois da migração (separadas por vírgula)
        #[arg(long, value_delimiter = ',')]
        verify_tables: Vec<String>,
    },

    /// Mostra o SQL da função auxiliar exec_sql
    Bootstrap,

    /// Lista as tabelas expostas pela API
    Tables,

    /// Colunas de uma tabela
    Describe { table: String },

    /// Verifica se as tabelas esperadas existem
    Verify {
        #[arg(long, value_delimiter = ',', required = true)]
        tables: Vec<String>,
    },

    /// Smoke tests de RLS com a anon key
    ProbeRls {
        #[arg(long, value_delimiter = ',', required = true)]
        tables: Vec<String>,

        /// Linha JSON para o teste de inserção anônima
        #[arg(long)]
        insert_sample: Option<String>,

        /// Filtro coluna=valor para a leitura filtrada
        #[arg(long)]
        filter: Option<String>,

        /// Usuário para o teste de leitura autenticada
        #[arg(long, requires = "password")]
        email: Option<String>,

        #[arg(long, env = "VBSOLUTION_TEST_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Insere dados de exemplo a partir de um arquivo JSON/YAML
    Seed {
        file: PathBuf,

        #[arg(long)]
        policy: Option<ErrorPolicy>,

        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Verifica os endpoints REST, Auth e Storage
    Check,
}

/// Estrutura para resposta padronizada
#[derive(serde::Serialize)]
struct CliResponse {
    success: bool,
    data: Option<Value>,
    error: Option<String>,
    /// Saída legível do modo pretty
    #[serde(skip)]
    lines: Vec<String>,
}

impl CliResponse {
    fn new(success: bool, data: Value, lines: Vec<String>) -> Self {
        Self {
            success,
            data: Some(data),
            error: None,
            lines,
        }
    }

    fn error(msg: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg),
            lines: Vec::new(),
        }
    }
}

#[tokio::main]
async fn main() {
    // .env antes do parse, para os `env = ...` do clap
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if dotenv_loaded {
        tracing::debug!("✅ .env loaded");
    } else {
        tracing::debug!(".env not found - using system environment");
    }

    let output_format = cli.output.clone();

    match execute_command(&cli).await {
        Ok(response) => {
            let exit_code = if response.success { 0 } else { 1 };
            output_response(&response, &output_format);
            std::process::exit(exit_code);
        }
        Err(e) => {
            log_error(&format!("{:#}", e));
            output_response(&CliResponse::error(format!("{:#}", e)), &output_format);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn execute_command(cli: &Cli) -> anyhow::Result<CliResponse> {
    match &cli.command {
        Commands::Apply {
            paths,
            policy,
            split_mode,
            delimiter,
            delay_ms,
            timeout_secs,
            dry_run,
            fallback_statements,
            verify_tables,
        } => {
            let mut settings = load_settings(cli)?;
            if let Some(timeout) = timeout_secs {
                settings.http.timeout_secs = *timeout;
            }

            let mut options = ApplyOptions::from_settings(&settings.migration);
            if let Some(policy) = policy {
                options.policy = *policy;
            }
            if let Some(mode) = split_mode {
                options.split_mode = *mode;
            }
            if let Some(delimiter) = delimiter {
                options.section_delimiter = delimiter.clone();
            }
            if let Some(delay) = delay_ms {
                options.delay = Duration::from_millis(*delay);
            }
            options.dry_run = *dry_run;
            if *fallback_statements {
                options.fallback_to_statements = true;
            }

            handle_apply(&settings, options, paths, verify_tables).await
        }

        Commands::Bootstrap => {
            let settings = load_settings(cli)?;
            let sql = bootstrap_sql(&settings.supabase.sql_endpoint());
            let lines = vec![
                "-- Run once in the SQL editor of the project:".to_string(),
                sql.clone(),
            ];
            Ok(CliResponse::new(true, json!({ "sql": sql }), lines))
        }

        Commands::Tables => {
            let settings = load_settings(cli)?;
            let tables = SchemaInspector::new(settings.admin_client()?).list_tables().await?;

            let mut lines = vec![format!("📋 {} table(s)", tables.len())];
            lines.extend(tables.iter().map(|table| format!("  - {}", table)));
            Ok(CliResponse::new(true, json!({ "tables": tables }), lines))
        }

        Commands::Describe { table } => {
            let settings = load_settings(cli)?;
            let schema = SchemaInspector::new(settings.admin_client()?)
                .describe_table(table)
                .await?;

            let lines = describe_lines(&schema);
            Ok(CliResponse::new(true, serde_json::to_value(&schema)?, lines))
        }

        Commands::Verify { tables } => {
            let settings = load_settings(cli)?;
            let verification = SchemaInspector::new(settings.admin_client()?)
                .verify_tables(tables)
                .await?;

            let lines = verification_lines(&verification);
            Ok(CliResponse::new(
                verification.is_complete(),
                serde_json::to_value(&verification)?,
                lines,
            ))
        }

        Commands::ProbeRls {
            tables,
            insert_sample,
            filter,
            email,
            password,
        } => {
            let settings = load_settings(cli)?;
            let options = ProbeOptions {
                sample_row: insert_sample
                    .as_deref()
                    .map(serde_json::from_str::<Value>)
                    .transpose()
                    .context("--insert-sample must be a JSON object")?,
                filter: filter.as_deref().map(parse_filter).transpose()?,
            };

            let mut probe = RlsProbe::new(settings.anon_client()?);
            if let Some(email) = email {
                let password = password
                    .as_deref()
                    .ok_or_else(|| anyhow!("--password is required with --email"))?;
                probe = probe.sign_in(email, password).await?;
            }

            let report = probe.run(tables, &options).await;
            let lines = probe_lines(&report);
            Ok(CliResponse::new(report.is_success(), serde_json::to_value(&report)?, lines))
        }

        Commands::Seed {
            file,
            policy,
            delay_ms,
        } => {
            let settings = load_settings(cli)?;
            let tables = load_seed_file(file)?;

            let seeder = Seeder::new(
                settings.admin_client()?,
                policy.unwrap_or(settings.migration.policy),
                Duration::from_millis(delay_ms.unwrap_or(settings.migration.delay_ms)),
            );
            let report = seeder.seed(&tables).await;

            let lines = seed_lines(&report);
            Ok(CliResponse::new(report.is_success(), serde_json::to_value(&report)?, lines))
        }

        Commands::Check => {
            let settings = load_settings(cli)?;
            let report = services::check(&settings.admin_client()?).await;

            let lines = health_lines(&report);
            Ok(CliResponse::new(report.is_healthy(), serde_json::to_value(&report)?, lines))
        }
    }
}

/// Configuração em camadas (arquivos, ambiente) com as flags globais por cima
fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = Settings::new().context("Failed to load settings")?;
    apply_global_overrides(&mut settings, cli.url.as_deref(), cli.key.as_deref());

    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
    log_config_loaded(&run_mode, &settings.supabase.url);

    Ok(settings)
}

fn apply_global_overrides(settings: &mut Settings, url: Option<&str>, key: Option<&str>) {
    if let Some(url) = url {
        settings.supabase.url = url.to_string();
    }
    if let Some(key) = key {
        settings.supabase.anon_key = key.to_string();
        settings.supabase.service_role_key = None;
    }
}

async fn handle_apply(
    settings: &Settings,
    options: ApplyOptions,
    paths: &[PathBuf],
    verify_tables: &[String],
) -> anyhow::Result<CliResponse> {
    let scripts = paths
        .iter()
        .map(MigrationScript::load_path)
        .collect::<AppResult<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

    let dry_run = options.dry_run;
    let reports = if dry_run {
        scripts.iter().map(|script| options.skipped_report(script)).collect()
    } else {
        let applier = MigrationApplier::new(settings.admin_client()?, settings.supabase.sql_endpoint(), options);
        applier.apply_all(&scripts).await
    };

    let verification = if dry_run || verify_tables.is_empty() {
        None
    } else {
        Some(
            SchemaInspector::new(settings.admin_client()?)
                .verify_tables(verify_tables)
                .await?,
        )
    };

    let mut lines = Vec::new();
    for report in &reports {
        lines.extend(report_lines(report));
    }
    if let Some(verification) = &verification {
        lines.extend(verification_lines(verification));
    }

    let success = reports.iter().all(MigrationReport::is_success)
        && verification.as_ref().map_or(true, TableVerification::is_complete);

    let data = json!({
        "reports": reports.iter().map(report_json).collect::<anyhow::Result<Vec<_>>>()?,
        "verification": verification,
    });

    Ok(CliResponse::new(success, data, lines))
}

fn report_json(report: &MigrationReport) -> anyhow::Result<Value> {
    let mut value = serde_json::to_value(report)?;
    value["summary"] = serde_json::to_value(report.summary())?;
    Ok(value)
}

/// `coluna=valor`
fn parse_filter(raw: &str) -> anyhow::Result<(String, String)> {
    match raw.split_once('=') {
        Some((column, value)) if !column.trim().is_empty() => {
            Ok((column.trim().to_string(), value.to_string()))
        }
        _ => Err(anyhow!("Invalid filter '{}' (expected column=value)", raw)),
    }
}

fn report_lines(report: &MigrationReport) -> Vec<String> {
    let mut lines = vec![format!(
        "📄 {} ({}, {}{})",
        report.script,
        report.split_mode,
        report.policy,
        if report.dry_run { ", dry run" } else { "" }
    )];

    for result in &report.results {
        let location = format!("#{} (line {})", result.index, result.line);
        match &result.status {
            StatementStatus::Succeeded => lines.push(format!(
                "  ✅ {} {}ms {}",
                location,
                result.duration_ms,
                preview(&result.sql)
            )),
            StatementStatus::Failed { status, message, fatal } => lines.push(format!(
                "  ❌ {} [{}]{} {} → {}",
                location,
                status.map_or_else(|| "sql".to_string(), |code| code.to_string()),
                if *fatal { " FATAL" } else { "" },
                preview(&result.sql),
                message
            )),
            StatementStatus::Skipped if report.dry_run => {
                lines.push(format!("  -- {}", location));
                lines.push(result.sql.clone());
            }
            StatementStatus::Skipped => lines.push(format!("  ⏭️  {} {}", location, preview(&result.sql))),
        }

        for retried in &result.fallback {
            let marker = match &retried.status {
                StatementStatus::Succeeded => "✅".to_string(),
                StatementStatus::Failed { message, .. } => format!("❌ {} →", message),
                StatementStatus::Skipped => "⏭️ ".to_string(),
            };
            lines.push(format!(
                "     ↳ {} (line {}) {}",
                marker,
                retried.line,
                preview(&retried.sql)
            ));
        }
    }

    let summary = report.summary();
    lines.push(format!(
        "📊 Total: {} | Succeeded: {} | Failed: {} | Skipped: {}{}",
        summary.total,
        summary.succeeded,
        summary.failed,
        summary.skipped,
        if report.aborted { " | ABORTED" } else { "" }
    ));
    lines
}

fn preview(sql: &str) -> String {
    truncate_with_suffix(&vbsolution_ops::utils::single_line(sql), 80, "...")
}

fn describe_lines(schema: &TableSchema) -> Vec<String> {
    let mut lines = vec![format!("📋 {} ({} columns)", schema.name, schema.columns.len())];
    for column in &schema.columns {
        lines.push(format!(
            "  {}{} {}{}",
            column.name,
            if column.primary_key { " (pk)" } else { "" },
            column.format.as_deref().unwrap_or(&column.data_type),
            if column.required { " NOT NULL" } else { "" }
        ));
    }
    lines
}

fn verification_lines(verification: &TableVerification) -> Vec<String> {
    let mut lines: Vec<String> = verification
        .found
        .iter()
        .map(|table| format!("  ✅ {}", table))
        .collect();
    lines.extend(verification.missing.iter().map(|table| format!("  ❌ {} (missing)", table)));
    lines.push(format!(
        "📊 Tables found: {}/{}",
        verification.found.len(),
        verification.found.len() + verification.missing.len()
    ));
    lines
}

fn probe_lines(report: &ProbeReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .results
        .iter()
        .map(|result| {
            format!(
                "  {} {} [{}] {:?} - {}",
                if result.passed { "🔒" } else { "🔓" },
                result.table,
                result.probe.as_str(),
                result.status,
                result.detail
            )
        })
        .collect();
    lines.push(format!("📊 Passed: {} | Failed: {}", report.passed, report.failed));
    lines
}

fn seed_lines(report: &SeedReport) -> Vec<String> {
    let mut lines = Vec::new();
    for table in &report.tables {
        lines.push(format!("  🌱 {}: {} inserted, {} failed", table.table, table.inserted, table.failed));
        lines.extend(table.errors.iter().map(|error| format!("     {}", error)));
    }
    lines.push(format!(
        "📊 Inserted: {} | Failed: {}{}",
        report.inserted(),
        report.failed(),
        if report.aborted { " | ABORTED" } else { "" }
    ));
    lines
}

fn health_lines(report: &HealthReport) -> Vec<String> {
    report
        .endpoints()
        .iter()
        .map(|endpoint| {
            format!(
                "  {} {} {} - {}",
                if endpoint.is_healthy() { "✅" } else { "❌" },
                endpoint.endpoint,
                endpoint.status.map_or_else(|| "unreachable".to_string(), |code| code.to_string()),
                endpoint.detail
            )
        })
        .collect()
}

fn output_response(response: &CliResponse, format: &OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string(response) {
            Ok(body) => println!("{}", body),
            Err(e) => eprintln!("❌ Failed to serialize response: {}", e),
        },
        OutputFormat::Pretty => {
            for line in &response.lines {
                println!("{}", line);
            }
            if let Some(error) = &response.error {
                eprintln!("❌ Error: {}", error);
            } else if response.success {
                println!("✅ Done");
            } else {
                println!("⚠️  Finished with failures");
            }
        }
    }
}
