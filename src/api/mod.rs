mod error;

use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::core::{
    AssetClass, AssetProfile, Entry, Goal, GoalProgress, GoalProjection, MonteCarloResult,
    MAX_HORIZON_YEARS, MonthlyNet, Rng, SimulationInputs, SimulationResult, YearMonth, clock_seed,
    horizon_months, monthly_series, project_goal, simulate, simulate_bands, summarize_goal,
};

pub use error::{AppError, InputError};

pub const MAX_YEARS: f64 = MAX_HORIZON_YEARS;
pub const MAX_PATHS: u32 = 5_000;
pub const MAX_PROJECTION_MONTHS: i64 = 1_200;

#[derive(Parser, Debug)]
#[command(
    name = "finaura",
    version,
    about = "Savings-goal projections and investment growth simulation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API.
    Serve {
        #[arg(long, env = "FINAURA_PORT", default_value_t = 8080)]
        port: u16,
    },
    /// Run one growth simulation and print it as JSON.
    Simulate(SimulateArgs),
    /// Project a savings goal and print the plan as JSON.
    Project(ProjectArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliAssetClass {
    Stock,
    Crypto,
    MutualFund,
}

impl From<CliAssetClass> for AssetClass {
    fn from(value: CliAssetClass) -> Self {
        match value {
            CliAssetClass::Stock => AssetClass::Stock,
            CliAssetClass::Crypto => AssetClass::Crypto,
            CliAssetClass::MutualFund => AssetClass::MutualFund,
        }
    }
}

impl From<AssetClass> for CliAssetClass {
    fn from(value: AssetClass) -> Self {
        match value {
            AssetClass::Stock => CliAssetClass::Stock,
            AssetClass::Crypto => CliAssetClass::Crypto,
            AssetClass::MutualFund => CliAssetClass::MutualFund,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[arg(long, default_value_t = 100_000.0, help = "Starting capital")]
    capital: f64,
    #[arg(long, value_enum, default_value_t = CliAssetClass::Stock)]
    asset_class: CliAssetClass,
    #[arg(
        long,
        default_value_t = 5,
        help = "Risk level 1-10; 5 keeps the asset class volatility"
    )]
    risk_level: u8,
    #[arg(long, default_value_t = 5.0, help = "Horizon in years")]
    years: f64,
    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Expected annual return in percent; overrides the asset class"
    )]
    expected_return: Option<f64>,
    #[arg(long, help = "Annual volatility in percent; overrides the asset class")]
    volatility: Option<f64>,
    #[arg(long, help = "Random seed; a fresh one is drawn when omitted")]
    seed: Option<u64>,
    #[arg(
        long,
        default_value_t = 1,
        help = "Monte Carlo paths; more than one adds percentile bands"
    )]
    paths: u32,
    #[arg(long, help = "First month of the path (YYYY-MM); defaults to this month")]
    start_month: Option<YearMonth>,
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[arg(long, default_value = "My Goal")]
    name: String,
    #[arg(long)]
    target_amount: f64,
    #[arg(long, help = "Target month (YYYY-MM)")]
    target_date: YearMonth,
    #[arg(long, help = "Goal start month (YYYY-MM)")]
    created_at: Option<YearMonth>,
    #[arg(long, help = "Evaluate as of this month instead of the current one")]
    as_of: Option<YearMonth>,
    #[arg(
        long = "month",
        value_parser = parse_month_row,
        help = "Monthly totals as YYYY-MM:INCOME[:EXPENSES]; repeatable"
    )]
    months: Vec<MonthlyNet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    capital: Option<f64>,
    asset_class: Option<AssetClass>,
    risk_level: Option<u8>,
    years: Option<f64>,
    expected_return: Option<f64>,
    volatility: Option<f64>,
    seed: Option<u64>,
    paths: Option<u32>,
    start_month: Option<YearMonth>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GoalPayload {
    goal: Goal,
    monthly_data: Option<Vec<MonthlyNet>>,
    income: Vec<Entry>,
    expenses: Vec<Entry>,
    as_of: Option<YearMonth>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LedgerPayload {
    income: Vec<Entry>,
    expenses: Vec<Entry>,
}

#[derive(Debug, Clone)]
struct SimulationRequest {
    asset_class: AssetClass,
    inputs: SimulationInputs,
    seed: Option<u64>,
    paths: u32,
}

#[derive(Debug, Clone)]
struct GoalRequest {
    goal: Goal,
    series: Vec<MonthlyNet>,
    as_of: YearMonth,
    skipped_entries: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    asset_class: AssetClass,
    profile: AssetProfile,
    risk_level: u8,
    years: f64,
    seed: u64,
    #[serde(flatten)]
    result: SimulationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    monte_carlo: Option<MonteCarloResult>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoalPlanResponse {
    as_of: YearMonth,
    skipped_entries: usize,
    projection: GoalProjection,
    progress: GoalProgress,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Command::Serve { port } => run_http_server(port).await?,
        Command::Simulate(args) => {
            let request = build_simulation(args)?;
            print_json(&run_simulation(&request))?;
        }
        Command::Project(args) => {
            let request = build_goal_request(args)?;
            print_json(&build_goal_plan(&request))?;
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_simulation(args: SimulateArgs) -> Result<SimulationRequest, InputError> {
    if !args.capital.is_finite() || args.capital < 0.0 {
        return Err(InputError::Capital);
    }

    if !(1..=10).contains(&args.risk_level) {
        return Err(InputError::RiskLevel);
    }

    if !args.years.is_finite() || !(0.0..=MAX_YEARS).contains(&args.years) {
        return Err(InputError::Years);
    }

    if !(1..=MAX_PATHS).contains(&args.paths) {
        return Err(InputError::Paths);
    }

    let start = args.start_month.unwrap_or_else(YearMonth::current);
    if start.add_months(horizon_months(args.years).into()) > YearMonth::LAST {
        return Err(InputError::PastLastMonth { start });
    }

    let asset_class: AssetClass = args.asset_class.into();
    let mut profile = asset_class.profile();

    if let Some(expected_return) = args.expected_return {
        if !expected_return.is_finite() || expected_return <= -100.0 {
            return Err(InputError::ExpectedReturn);
        }
        profile.expected_return = expected_return / 100.0;
    }

    if let Some(volatility) = args.volatility {
        if !volatility.is_finite() || !(0.0..=500.0).contains(&volatility) {
            return Err(InputError::Volatility);
        }
        profile.volatility = volatility / 100.0;
    }

    Ok(SimulationRequest {
        asset_class,
        inputs: SimulationInputs {
            starting_capital: args.capital,
            profile,
            risk_level: args.risk_level,
            years: args.years,
            start,
        },
        seed: args.seed,
        paths: args.paths,
    })
}

fn run_simulation(request: &SimulationRequest) -> SimulateResponse {
    let seed = request.seed.unwrap_or_else(clock_seed);
    let result = simulate(&request.inputs, &mut Rng::new(seed));
    let monte_carlo =
        (request.paths > 1).then(|| simulate_bands(&request.inputs, request.paths, seed));

    SimulateResponse {
        asset_class: request.asset_class,
        profile: request.inputs.profile,
        risk_level: request.inputs.risk_level,
        years: request.inputs.years,
        seed,
        result,
        monte_carlo,
    }
}

fn build_goal_request(args: ProjectArgs) -> Result<GoalRequest, InputError> {
    let goal = Goal {
        name: args.name,
        target_amount: args.target_amount,
        target_date: Some(args.target_date),
        created_at: args.created_at,
    };
    let request = GoalRequest {
        goal,
        series: args.months,
        as_of: args.as_of.unwrap_or_else(YearMonth::current),
        skipped_entries: 0,
    };
    validate_goal_request(&request)?;
    Ok(request)
}

fn validate_goal_request(request: &GoalRequest) -> Result<(), InputError> {
    let target = request.goal.target_amount;
    if !target.is_finite() || target < 0.0 {
        return Err(InputError::TargetAmount);
    }

    if let Some(row) = request
        .series
        .iter()
        .find(|row| !valid_amount(row.income) || !valid_amount(row.expenses))
    {
        return Err(InputError::MonthAmounts(row.month));
    }

    if let Some(target_month) = request.goal.target_date {
        let window_start = request
            .series
            .iter()
            .map(|row| row.month)
            .min()
            .unwrap_or(request.as_of);
        let span = window_start.months_until(target_month) + 1;
        if span > MAX_PROJECTION_MONTHS {
            return Err(InputError::WindowTooLarge {
                months: span,
                limit: MAX_PROJECTION_MONTHS,
            });
        }
    }

    Ok(())
}

fn build_goal_plan(request: &GoalRequest) -> GoalPlanResponse {
    GoalPlanResponse {
        as_of: request.as_of,
        skipped_entries: request.skipped_entries,
        projection: project_goal(&request.goal, &request.series, request.as_of),
        progress: summarize_goal(&request.goal, &request.series, request.as_of),
    }
}

fn valid_amount(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn parse_month_row(raw: &str) -> Result<MonthlyNet, InputError> {
    let invalid = || InputError::MonthRow(raw.to_string());
    let mut parts = raw.split(':');

    let month = parts
        .next()
        .and_then(|m| m.parse::<YearMonth>().ok())
        .ok_or_else(invalid)?;
    let mut amount = |required: bool| -> Result<f64, InputError> {
        match parts.next() {
            Some(v) => v
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| valid_amount(*v))
                .ok_or_else(invalid),
            None if required => Err(invalid()),
            None => Ok(0.0),
        }
    };
    let income = amount(true)?;
    let expenses = amount(false)?;

    if parts.next().is_some() {
        return Err(invalid());
    }

    Ok(MonthlyNet::new(month, income, expenses))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router();

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "FinAura API listening");
    info!("Local access: http://127.0.0.1:{port}/api/health");

    axum::serve(listener, app).await
}

fn router() -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/goals/projection", post(goal_projection_handler))
        .route("/api/goals/progress", post(goal_progress_handler))
        .route("/api/ledger/monthly", post(ledger_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
}

async fn health_handler() -> Response {
    json_response(
        StatusCode::OK,
        HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match simulation_request_from_payload(payload) {
        Ok(request) => request,
        Err(err) => return reject(err),
    };
    debug!(
        asset_class = ?request.asset_class,
        years = request.inputs.years,
        paths = request.paths,
        "running simulation"
    );
    json_response(StatusCode::OK, run_simulation(&request))
}

async fn goal_projection_handler(Json(payload): Json<GoalPayload>) -> Response {
    match goal_request_from_payload(payload) {
        Ok(request) => json_response(StatusCode::OK, build_goal_plan(&request)),
        Err(err) => reject(err),
    }
}

async fn goal_progress_handler(Json(payload): Json<GoalPayload>) -> Response {
    match goal_request_from_payload(payload) {
        Ok(request) => json_response(
            StatusCode::OK,
            summarize_goal(&request.goal, &request.series, request.as_of),
        ),
        Err(err) => reject(err),
    }
}

async fn ledger_handler(Json(payload): Json<LedgerPayload>) -> Response {
    let ledger = monthly_series(&payload.income, &payload.expenses);
    if ledger.skipped_entries > 0 {
        debug!(skipped = ledger.skipped_entries, "ignored entries without a usable date");
    }
    json_response(StatusCode::OK, ledger)
}

fn reject(err: InputError) -> Response {
    warn!(error = %err, "rejected request");
    error_response(StatusCode::BAD_REQUEST, &err.to_string())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn simulation_request_from_payload(
    payload: SimulatePayload,
) -> Result<SimulationRequest, InputError> {
    let mut args = default_simulate_args();

    if let Some(v) = payload.capital {
        args.capital = v;
    }
    if let Some(v) = payload.asset_class {
        args.asset_class = v.into();
    }
    if let Some(v) = payload.risk_level {
        args.risk_level = v;
    }
    if let Some(v) = payload.years {
        args.years = v;
    }
    if let Some(v) = payload.expected_return {
        args.expected_return = Some(v);
    }
    if let Some(v) = payload.volatility {
        args.volatility = Some(v);
    }
    if let Some(v) = payload.seed {
        args.seed = Some(v);
    }
    if let Some(v) = payload.paths {
        args.paths = v;
    }
    if let Some(v) = payload.start_month {
        args.start_month = Some(v);
    }

    build_simulation(args)
}

fn goal_request_from_payload(payload: GoalPayload) -> Result<GoalRequest, InputError> {
    let (series, skipped_entries) = match payload.monthly_data {
        Some(rows) => (rows, 0),
        None => {
            let ledger = monthly_series(&payload.income, &payload.expenses);
            (ledger.months, ledger.skipped_entries)
        }
    };

    let request = GoalRequest {
        goal: payload.goal,
        series,
        as_of: payload.as_of.unwrap_or_else(YearMonth::current),
        skipped_entries,
    };
    validate_goal_request(&request)?;
    Ok(request)
}

fn default_simulate_args() -> SimulateArgs {
    SimulateArgs {
        capital: 100_000.0,
        asset_class: CliAssetClass::Stock,
        risk_level: 5,
        years: 5.0,
        expected_return: None,
        volatility: None,
        seed: None,
        paths: 1,
        start_month: None,
    }
}
