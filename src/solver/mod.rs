mod constraints;
mod extract;
mod variables;

use crate::data::{CompiledRule, GenerationPayload, ScheduleEntry};
use good_lp::{Expression, ProblemVariables, ResolutionError, Solution, SolverModel, default_solver};
use log::{info, warn};
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

/// Stable client-facing message for every non-viable outcome.
pub const INFEASIBLE_DETAIL: &str = "The provided constraints are too strict. \
The solver could not find a mathematically viable timetable.";

#[derive(Debug)]
pub enum SolveError {
    /// The model admits no assignment, or the budget ran out without one.
    Infeasible(String),
    /// A failure not caused by the input; surfaced verbatim.
    Internal(String),
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::Infeasible(msg) | SolveError::Internal(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for SolveError {}

/// Knobs of one solver run. Single-threaded with a fixed seed so identical
/// inputs reproduce identical schedules.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub time_limit_secs: f64,
    pub random_seed: i32,
    pub threads: i32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            time_limit_secs: 10.0,
            random_seed: 1234,
            threads: 1,
        }
    }
}

/// Runs the full pipeline against a validated payload with default options.
pub fn generate(payload: &GenerationPayload) -> Result<Vec<ScheduleEntry>, SolveError> {
    generate_with(payload, &SolverConfig::default())
}

pub fn generate_with(
    payload: &GenerationPayload,
    config: &SolverConfig,
) -> Result<Vec<ScheduleEntry>, SolveError> {
    let start_time = Instant::now();

    let rules: Vec<CompiledRule> = payload
        .college_settings
        .custom_rules
        .iter()
        .filter_map(|rule| {
            let compiled = rule.compile();
            if compiled.is_none() {
                warn!("Skipping custom rule {}: unrecognized or malformed action.", rule.id);
            }
            compiled
        })
        .collect();

    let mut problem = ProblemVariables::new();
    let pool = variables::build(&mut problem, payload).map_err(SolveError::Infeasible)?;
    if pool.is_empty() {
        info!("Nothing to schedule; returning an empty timetable.");
        return Ok(Vec::new());
    }
    info!(
        "Setting up model with {} start variables for {} workloads, {} rooms, {} days...",
        pool.len(),
        pool.workloads.len(),
        payload.rooms_config.rooms.len(),
        payload.college_settings.days_active.len()
    );

    let model_constraints = constraints::compile(&pool, payload, &rules);
    info!("Compiled {} hard constraints.", model_constraints.len());

    // placeholder objective: a gentle earliest-start preference; the hard
    // contract is feasibility only
    let first_slot = payload
        .college_settings
        .time_slots
        .iter()
        .copied()
        .min()
        .unwrap_or(0);
    let objective: Expression = pool
        .vars
        .iter()
        .map(|(key, var)| (key.start - first_slot) as f64 * Expression::from(*var))
        .sum();

    let mut model = problem
        .minimise(objective)
        .using(default_solver)
        .set_option("threads", config.threads)
        .set_option("random_seed", config.random_seed)
        .set_option("time_limit", config.time_limit_secs)
        .set_option("log_to_console", "false");
    for c in model_constraints {
        model.add_constraint(c);
    }

    info!("Starting solver with a {:.1}s budget...", config.time_limit_secs);
    let solution = match model.solve() {
        Ok(solution) => solution,
        Err(ResolutionError::Infeasible) => {
            info!("Solver proved infeasibility in {:.2?}.", start_time.elapsed());
            return Err(SolveError::Infeasible(INFEASIBLE_DETAIL.to_string()));
        }
        Err(e) => return Err(SolveError::Internal(format!("Solver failure: {e}"))),
    };

    let selected: Vec<variables::StartKey> = pool
        .vars
        .iter()
        .filter(|(_, var)| solution.value(**var) > 0.9)
        .map(|(key, _)| *key)
        .collect();
    let schedule = extract::expand(&selected, &pool, payload);

    // A budget expiry can surface as a "solution" that schedules nothing; a
    // schedule is only returned when every workload is fully realized.
    let mut realized: HashMap<&str, u32> = HashMap::new();
    for entry in &schedule {
        *realized.entry(entry.workload_id.as_str()).or_default() += 1;
    }
    for ctx in &pool.workloads {
        if realized.get(ctx.item.id.as_str()).copied().unwrap_or(0) != ctx.item.hours {
            info!("Budget expired without a complete assignment after {:.2?}.", start_time.elapsed());
            return Err(SolveError::Infeasible(INFEASIBLE_DETAIL.to_string()));
        }
    }

    info!(
        "Feasible timetable with {} hour entries found in {:.2?}.",
        schedule.len(),
        start_time.elapsed()
    );
    Ok(schedule)
}
