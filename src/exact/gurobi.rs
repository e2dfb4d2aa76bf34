//! Exact solver for the WDP using Gurobi.
//!
//! One binary variable `bid_i` per bid, one `max_one_pick_<item>` row per item.

use super::{ExactConfig, ExactResult, IntegerProgram};
use crate::error::{Result, WdpError};
use crate::instance::AuctionInstance;
use crate::solution::Solution;
use grb::prelude::*;

fn backend(context: &str) -> impl Fn(grb::Error) -> WdpError + '_ {
    move |e| WdpError::Solver(format!("{}: {}", context, e))
}

/// Gurobi-based exact solver for the WDP
pub struct GurobiSolver {
    pub config: ExactConfig,
}

impl GurobiSolver {
    pub fn new(config: ExactConfig) -> Self {
        GurobiSolver { config }
    }

    /// Solve to optimality, or until the time limit
    pub fn solve(&self, instance: &AuctionInstance) -> Result<ExactResult> {
        let start = std::time::Instant::now();
        let program = IntegerProgram::from_instance(instance);

        let env = Env::new("").map_err(backend("Failed to create Gurobi environment"))?;
        let mut model =
            Model::with_env(&program.name, env).map_err(backend("Failed to create model"))?;

        model
            .set_param(param::TimeLimit, self.config.time_limit)
            .map_err(backend("Failed to set time limit"))?;
        model
            .set_param(param::MIPGap, self.config.mip_gap)
            .map_err(backend("Failed to set MIP gap"))?;
        model
            .set_param(param::Threads, self.config.threads)
            .map_err(backend("Failed to set threads"))?;
        if !self.config.verbose {
            model
                .set_param(param::OutputFlag, 0)
                .map_err(backend("Failed to set output flag"))?;
        }

        let mut x: Vec<Var> = Vec::with_capacity(program.num_vars());
        for (i, &price) in program.objective.iter().enumerate() {
            let var = add_binvar!(model, name: &IntegerProgram::var_name(i), obj: price)
                .map_err(backend("Failed to add variable"))?;
            x.push(var);
        }
        model
            .set_attr(attr::ModelSense, ModelSense::Maximize)
            .map_err(backend("Failed to set objective sense"))?;
        model.update().map_err(backend("Failed to update model"))?;

        for row in &program.rows {
            let expr: Expr = row.bids.iter().map(|&i| x[i]).grb_sum();
            model
                .add_constr(&row.name, c!(expr <= 1.0))
                .map_err(backend("Failed to add packing constraint"))?;
        }

        // Warm start
        if let Some(ref packing) = self.config.warm_start {
            for var in &x {
                model
                    .set_obj_attr(attr::Start, var, 0.0)
                    .map_err(backend("Failed to initialize warm start"))?;
            }
            for &id in packing.iter().filter(|&&id| id < x.len()) {
                model
                    .set_obj_attr(attr::Start, &x[id], 1.0)
                    .map_err(backend("Failed to set warm start bid"))?;
            }
        }

        model
            .update()
            .map_err(backend("Failed to update model before optimization"))?;
        model.optimize().map_err(backend("Optimization failed"))?;

        let status = model.status().map_err(backend("Failed to get status"))?;
        let status_str = match status {
            Status::Optimal => "Optimal",
            Status::TimeLimit => "TimeLimit",
            Status::Infeasible => "Infeasible",
            Status::InfOrUnbd => "InfeasibleOrUnbounded",
            Status::Unbounded => "Unbounded",
            Status::NodeLimit => "NodeLimit",
            Status::SolutionLimit => "SolutionLimit",
            _ => "Unknown",
        };

        let has_incumbent = model.get_attr(attr::SolCount).unwrap_or(0) > 0;
        let mut winners = Vec::new();
        let (objective, bound, gap, nodes) = if has_incumbent {
            for (i, var) in x.iter().enumerate() {
                if model.get_obj_attr(attr::X, var).unwrap_or(0.0) > 0.5 {
                    winners.push(i);
                }
            }
            (
                model.get_attr(attr::ObjVal).unwrap_or(0.0),
                model.get_attr(attr::ObjBound).unwrap_or(f64::INFINITY),
                model.get_attr(attr::MIPGap).unwrap_or(1.0),
                model.get_attr(attr::NodeCount).unwrap_or(0.0) as i64,
            )
        } else {
            (0.0, f64::INFINITY, 1.0, 0)
        };

        log::debug!("Winning bids:");
        for &id in &winners {
            let bid = &instance.bids[id];
            log::debug!("[{:5}]{:18} => {}", id, instance.bundle_label(bid), bid.price);
        }

        let mut solution = Solution::from_bids(instance, winners, "Exact");
        solution.computation_time = start.elapsed().as_secs_f64();

        Ok(ExactResult {
            solution,
            objective,
            bound,
            gap,
            optimal: status == Status::Optimal,
            status: status_str.to_string(),
            nodes_explored: nodes,
        })
    }
}
