use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use report_grader::config::AppConfig;
use report_grader::error::AppError;
use report_grader::export::{render_document, render_spreadsheet};
use report_grader::extract::extract_text;
use report_grader::rubric::{CriterionRow, Evaluation, RubricConfig, RubricEngine, Verdict};
use report_grader::session::EvaluationSession;
use report_grader::telemetry;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
    engine: Arc<RubricEngine>,
}

#[derive(Parser, Debug)]
#[command(
    name = "Progress Report Grader",
    about = "Score research progress reports against a weighted rubric",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Evaluate a single report file from the command line
    Grade(GradeArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct GradeArgs {
    /// Report file to evaluate (PDF or DOCX)
    #[arg(long)]
    report: PathBuf,
    /// Project name recorded in export artifacts
    #[arg(long, default_value = "")]
    project: String,
    /// Rubric definition to use instead of the configured one
    #[arg(long)]
    rubric: Option<PathBuf>,
    /// Evaluation date stamped on the document export (defaults to today)
    #[arg(long, value_parser = parse_date)]
    evaluated_on: Option<NaiveDate>,
    /// Write the evaluation document (DOCX) to this path
    #[arg(long)]
    document: Option<PathBuf>,
    /// Write the results workbook (XLSX) to this path
    #[arg(long)]
    spreadsheet: Option<PathBuf>,
    /// Write the rubric rows as CSV to this path
    #[arg(long)]
    scores_csv: Option<PathBuf>,
}

/// Shared body for evaluate and export endpoints. Scores are evaluator
/// overrides per criterion key; anything omitted scores zero.
#[derive(Debug, Deserialize)]
struct EvaluationRequest {
    #[serde(default)]
    project_name: String,
    #[serde(default)]
    scores: HashMap<String, i32>,
    #[serde(default)]
    commentary: String,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    evaluated_on: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct ScoreReportResponse {
    project_name: String,
    file_name: String,
    /// False when no text could be extracted; the evaluator should proceed
    /// with manual scoring in that case.
    extraction_available: bool,
    rows: Vec<CriterionRow>,
    percentage: f64,
    verdict: Verdict,
    verdict_label: &'static str,
}

#[derive(Debug, Serialize)]
struct EvaluationResponse {
    project_name: String,
    rows: Vec<CriterionRow>,
    percentage: f64,
    verdict: Verdict,
    verdict_label: &'static str,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Grade(args) => run_grade(args),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    // A missing or malformed rubric is startup-fatal, never degraded.
    let rubric = RubricConfig::from_path(&config.rubric_path)?;
    let engine = Arc::new(RubricEngine::new(rubric));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
        engine: engine.clone(),
    };

    let app = app_router(state).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        criteria = engine.config().criteria.len(),
        "report grader ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/reports/score", post(score_report_endpoint))
        .route("/api/v1/reports/evaluate", post(evaluate_endpoint))
        .route(
            "/api/v1/reports/export/document",
            post(export_document_endpoint),
        )
        .route(
            "/api/v1/reports/export/spreadsheet",
            post(export_spreadsheet_endpoint),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

fn run_grade(args: GradeArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let rubric_path = args.rubric.unwrap_or(config.rubric_path);
    let rubric = RubricConfig::from_path(&rubric_path)?;
    let engine = RubricEngine::new(rubric);

    let bytes = std::fs::read(&args.report)?;
    let extension = args
        .report
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_string();
    let text = extract_text(&bytes, &extension);
    if text.trim().is_empty() {
        println!("No text could be extracted; suggestions start at the scale minimum.");
    }

    let session = EvaluationSession::begin(&engine, args.project, text);
    let evaluation = session.evaluate(&engine);
    render_evaluation(&session, &evaluation);

    let evaluated_on = args
        .evaluated_on
        .unwrap_or_else(|| Local::now().date_naive());

    if let Some(path) = args.document {
        let bytes = render_document(
            session.project_name(),
            &evaluation,
            session.commentary(),
            evaluated_on,
        )?;
        std::fs::write(&path, bytes)?;
        println!("Wrote evaluation document to {}", path.display());
    }

    if let Some(path) = args.spreadsheet {
        let bytes =
            render_spreadsheet(session.project_name(), &evaluation, session.commentary())?;
        std::fs::write(&path, bytes)?;
        println!("Wrote results workbook to {}", path.display());
    }

    if let Some(path) = args.scores_csv {
        write_scores_csv(&path, &evaluation)?;
        println!("Wrote rubric rows to {}", path.display());
    }

    Ok(())
}

fn render_evaluation(session: &EvaluationSession, evaluation: &Evaluation) {
    if !session.project_name().is_empty() {
        println!("Project: {}", session.project_name());
    }

    println!("Suggested rubric scores");
    for row in &evaluation.rows {
        println!(
            "- {}: {} (weight {}, contributes {:.2})",
            row.label, row.score, row.weight, row.contribution
        );
    }

    println!("\nCompliance: {:.1}%", evaluation.percentage);
    println!("Verdict: {}", evaluation.verdict.label());
}

fn write_scores_csv(path: &Path, evaluation: &Evaluation) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["criterion", "score", "weight", "contribution"])?;
    for row in &evaluation.rows {
        let record = vec![
            row.label.clone(),
            row.score.to_string(),
            row.weight.to_string(),
            format!("{:.2}", row.contribution),
        ];
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn score_report_endpoint(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ScoreReportResponse>, AppError> {
    let mut project_name = String::new();
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("project_name") => project_name = field.text().await?,
            Some("report") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                upload = Some((file_name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let (file_name, bytes) = upload.ok_or(AppError::MissingReport)?;
    let extension = Path::new(&file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");
    let text = extract_text(&bytes, extension);

    let session = EvaluationSession::begin(&state.engine, project_name, text);
    let evaluation = session.evaluate(&state.engine);

    Ok(Json(ScoreReportResponse {
        project_name: session.project_name().to_string(),
        file_name,
        extraction_available: !session.source_text().trim().is_empty(),
        percentage: evaluation.percentage,
        verdict: evaluation.verdict,
        verdict_label: evaluation.verdict.label(),
        rows: evaluation.rows,
    }))
}

fn resolve_session(engine: &RubricEngine, request: &EvaluationRequest) -> EvaluationSession {
    let mut session =
        EvaluationSession::begin(engine, request.project_name.clone(), String::new());
    for (key, score) in &request.scores {
        session.override_score(engine, key, *score);
    }
    session.set_commentary(request.commentary.clone());
    session
}

async fn evaluate_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<EvaluationRequest>,
) -> Result<Json<EvaluationResponse>, AppError> {
    let session = resolve_session(&state.engine, &payload);
    let evaluation = session.evaluate(&state.engine);

    Ok(Json(EvaluationResponse {
        project_name: session.project_name().to_string(),
        percentage: evaluation.percentage,
        verdict: evaluation.verdict,
        verdict_label: evaluation.verdict.label(),
        rows: evaluation.rows,
    }))
}

async fn export_document_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<EvaluationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let evaluated_on = payload
        .evaluated_on
        .unwrap_or_else(|| Local::now().date_naive());
    let session = resolve_session(&state.engine, &payload);
    let evaluation = session.evaluate(&state.engine);
    let bytes = render_document(
        session.project_name(),
        &evaluation,
        session.commentary(),
        evaluated_on,
    )?;

    Ok(download_response(bytes, "evaluation.docx", DOCX_CONTENT_TYPE))
}

async fn export_spreadsheet_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<EvaluationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = resolve_session(&state.engine, &payload);
    let evaluation = session.evaluate(&state.engine);
    let bytes = render_spreadsheet(session.project_name(), &evaluation, session.commentary())?;

    Ok(download_response(bytes, "evaluation.xlsx", XLSX_CONTENT_TYPE))
}

fn download_response(bytes: Vec<u8>, file_name: &str, content_type: &str) -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
}
