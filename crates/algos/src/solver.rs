use crate::gradient::{Gradient, ReducedCosts, ReducedGradient};
use crate::pricing::make_pricing;
use crate::ratiotest::ratiotest;
use asqp_core::events::IterationObserver;
use asqp_core::math::{RealNumber, Timer};
use asqp_core::runtime::Runtime;
use asqp_core::solution::Status;
use asqp_core::start::{BasisStatus, CrashSolution};
use asqp_core::stats::IterationRecord;
use asqp_core::vector::Vector;
use asqp_linsys::{
    Activation, ActiveSetController, Basis, CholeskyUpdater, ControllerError, FactorError,
};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SolveError {
    #[error(transparent)]
    Controller(#[from] ControllerError),
}

/// Null-space active-set solver for a convex QP instance.
///
/// Runs the iteration loop on a prepared [`Runtime`] from the given
/// starting point. Major iterations price the active multipliers and
/// release one constraint; minor iterations take a Newton step in the
/// current null space. Each blocking constraint enters the active set
/// through a rank-one basis and factor update.
pub struct NullspaceSolver<'a, T: RealNumber> {
    runtime: &'a mut Runtime<T>,
}

impl<'a, T> NullspaceSolver<'a, T>
where
    T: RealNumber + 'static,
{
    pub fn new(runtime: &'a mut Runtime<T>) -> Self {
        Self { runtime }
    }

    pub fn solve(
        &mut self,
        crash: &CrashSolution<T>,
        mut observer: Option<&mut dyn IterationObserver<T>>,
    ) -> Result<Status, SolveError> {
        let rt = &mut *self.runtime;
        let num_var = rt.instance.num_var;
        let num_con = rt.instance.num_con;
        info!(
            num_var,
            num_con,
            pricing = ?rt.settings.pricing,
            ratiotest = ?rt.settings.ratiotest,
            "starting active-set solve"
        );

        rt.timer = Timer::start();
        rt.primal.repopulate(&crash.primal);
        rt.rowactivity.repopulate(&crash.rowact);

        let mut basis = match Basis::new(&rt.instance, crash) {
            Ok(basis) => basis,
            Err(e) => {
                rt.status = Status::Error;
                return Err(ControllerError::from(e).into());
            }
        };

        // The seed factorization needs ZᵀQZ positive definite on the
        // starting null space. When it is not, walk each flat direction
        // to a blocking constraint and activate it, shrinking the null
        // space until the factorization goes through or the walk itself
        // settles the solve.
        let factor = loop {
            match CholeskyUpdater::new(&rt.instance, &basis) {
                Ok(factor) => break factor,
                Err(FactorError::NotPositiveDefinite { column, pivot }) => {
                    match flat_seed_step(rt, &mut basis, column, pivot) {
                        Ok(None) => {}
                        Ok(Some(terminal)) => {
                            rt.status = terminal;
                            let record = snapshot(rt, &basis, T::zero());
                            if let Some(obs) = observer.as_deref_mut() {
                                obs.end_of_iteration(&record);
                            }
                            rt.statistics.push(record);
                            rt.statistics.solve_time = rt.timer.elapsed();
                            let gradient = Gradient::new(&rt.instance, &rt.primal);
                            assign_duals(rt, &basis, gradient.vector());
                            info!(
                                status = ?rt.status,
                                iterations = rt.statistics.num_iterations,
                                objective = rt
                                    .instance
                                    .objective(&rt.primal)
                                    .to_f64()
                                    .unwrap_or(f64::NAN),
                                "solve finished"
                            );
                            return Ok(rt.status);
                        }
                        Err(e) => {
                            rt.status = Status::Error;
                            return Err(e);
                        }
                    }
                }
                Err(e) => {
                    rt.status = Status::Error;
                    return Err(ControllerError::from(e).into());
                }
            }
        };
        let mut controller = ActiveSetController::from_parts(basis, factor);
        let mut gradient = Gradient::new(&rt.instance, &rt.primal);
        let mut redgrad = ReducedGradient::new(controller.basis(), &gradient);
        let mut redcosts = ReducedCosts::new(num_var);
        let mut pricing = make_pricing::<T>(rt.settings.pricing, rt.instance.num_total());

        let mut p = Vector::new(num_var);
        let mut rowmove = Vector::new(num_con);
        let mut qp_buffer = Vector::new(num_var);
        let mut gyp = Vector::new(num_var);

        let mut atfsep = controller.basis().num_active() == num_var;
        let status = loop {
            if rt.statistics.num_iterations >= rt.settings.iteration_limit {
                break Status::IterationLimit;
            }
            if let Some(limit) = rt.settings.time_limit {
                if rt.timer.elapsed() >= limit {
                    break Status::TimeLimit;
                }
            }
            if rt.statistics.num_iterations % rt.settings.reporting_frequency == 0 {
                let record = snapshot(rt, controller.basis(), controller.factor().density());
                debug!(
                    iteration = record.iteration,
                    objective = record.objective.to_f64().unwrap_or(f64::NAN),
                    nullspace = record.nullspace_dimension,
                    "iteration"
                );
                if let Some(obs) = observer.as_deref_mut() {
                    obs.end_of_iteration(&record);
                }
                rt.statistics.push(record);
            }
            rt.statistics.num_iterations += 1;

            let mut zero_curvature = false;
            let mut maxstep = T::one();
            if atfsep {
                let lambda = redcosts.values(controller.basis(), &gradient);
                let Some(minidx) =
                    pricing.price(controller.basis(), lambda, rt.settings.lambda_zero_threshold)
                else {
                    break Status::Optimal;
                };

                let slot = match controller.basis().index_in_factor(minidx) {
                    Some(slot) => slot,
                    None => unreachable!("priced index {minidx} is not active"),
                };
                let yp = controller.basis().btran(slot);
                rt.instance.q_vec(&yp, &mut gyp);
                let gdotyp = gradient.vector().dot(&yp);

                let mut l = Vec::new();
                if controller.basis().num_active() < num_var {
                    l = controller.basis().ztprod(&gyp);
                    controller.factor().solve_l(&mut l);
                    let mut v = l.clone();
                    controller.factor().solve_lt(&mut v);
                    let p_tmp = controller.basis().zprod(&v);
                    if gdotyp < T::zero() {
                        p.repopulate(&p_tmp).saxpy2(-T::one(), T::one(), &yp);
                    } else {
                        p.repopulate(&p_tmp).saxpy2(-T::one(), -T::one(), &yp);
                    }
                } else {
                    p.repopulate(&yp).scale(-gdotyp);
                }

                if let Err(e) = controller.deactivate(minidx) {
                    rt.status = Status::Error;
                    return Err(e.into());
                }
                rt.instance.mat_vec(&p, &mut rowmove);
                tidyup(&mut p, &mut rowmove, controller.basis(), num_con);

                rt.instance.q_vec(&p, &mut qp_buffer);
                let denominator = p.dot(&qp_buffer);
                if denominator.abs() > rt.settings.curvature_zero_threshold {
                    let numerator = -p.dot(gradient.vector());
                    maxstep = if numerator < T::zero() {
                        T::zero()
                    } else {
                        numerator / denominator
                    };
                } else {
                    zero_curvature = true;
                    maxstep = T::infinity();
                }
                if !zero_curvature {
                    if let Err(e) = controller.expand_factor(&yp, &gyp, &l) {
                        rt.status = Status::Error;
                        return Err(e.into());
                    }
                }
                redgrad.expand(gdotyp);
            } else {
                let mut v: Vec<T> = redgrad.values().iter().map(|&r| -r).collect();
                controller.factor().solve(&mut v);
                let direction = controller.basis().zprod(&v);
                p.repopulate(&direction);
                rt.instance.mat_vec(&p, &mut rowmove);
                tidyup(&mut p, &mut rowmove, controller.basis(), num_con);
                rt.instance.q_vec(&p, &mut qp_buffer);
            }

            if p.norm2() < rt.settings.pnorm_zero_threshold || maxstep == T::zero() {
                atfsep = true;
                continue;
            }

            let step = ratiotest(
                rt.settings.ratiotest,
                &rt.instance,
                controller.basis(),
                &rt.primal,
                &p,
                &rt.rowactivity,
                &rowmove,
                maxstep,
                rt.settings.feasibility_tolerance,
            );

            if let Some(limiting) = step.limiting {
                let ztqp = controller.basis().ztprod(&qp_buffer);
                redgrad.update(step.alpha, &ztqp);

                let activation = match controller.prepare_activation(
                    &rt.instance,
                    limiting,
                    rt.settings.d_zero_threshold,
                ) {
                    Ok(activation) => activation,
                    Err(e) => {
                        rt.status = Status::Error;
                        return Err(e.into());
                    }
                };
                redgrad.reduce(&activation.d, activation.pivot, activation.was_inactive);
                let dropped = controller.basis().inactive()[activation.pivot];
                let new_status = if step.at_lower {
                    BasisStatus::ActiveAtLower
                } else {
                    BasisStatus::ActiveAtUpper
                };
                if let Err(e) = controller.activate(
                    &rt.instance,
                    limiting,
                    new_status,
                    &activation,
                    zero_curvature,
                ) {
                    rt.status = Status::Error;
                    return Err(e.into());
                }
                pricing.update_weights(limiting, dropped, activation.d[activation.pivot]);
                atfsep = controller.basis().num_active() == num_var;
            } else if maxstep.is_infinite() {
                break Status::Unbounded;
            } else {
                redgrad.update(step.alpha, &controller.basis().ztprod(&qp_buffer));
                atfsep = true;
            }

            gradient.update(&qp_buffer, step.alpha);
            redcosts.invalidate();
            rt.primal.saxpy(step.alpha, &p);
            rt.rowactivity.saxpy(step.alpha, &rowmove);
        };

        rt.status = status;
        let record = snapshot(rt, controller.basis(), controller.factor().density());
        if let Some(obs) = observer.as_deref_mut() {
            obs.end_of_iteration(&record);
        }
        rt.statistics.push(record);
        rt.statistics.solve_time = rt.timer.elapsed();

        assign_duals(rt, controller.basis(), gradient.vector());

        if controller.basis().num_active() == num_var {
            match controller.recomputex(&rt.instance) {
                Ok(x) => {
                    rt.primal.repopulate(&x);
                    let mut ax = Vector::new(num_con);
                    rt.instance.mat_vec(&rt.primal, &mut ax);
                    rt.rowactivity.repopulate(&ax);
                }
                Err(e) => {
                    rt.status = Status::Error;
                    return Err(e.into());
                }
            }
        }

        info!(
            status = ?rt.status,
            iterations = rt.statistics.num_iterations,
            objective = rt.instance.objective(&rt.primal).to_f64().unwrap_or(f64::NAN),
            "solve finished"
        );
        Ok(rt.status)
    }
}

/// One repair step for a seed null space on which the reduced Hessian
/// is singular: walk the flat direction behind the failed pivot until a
/// constraint blocks, then activate it. Returns `None` when an
/// activation happened and the factorization should be retried, or the
/// terminal status when the walk settles the solve on its own.
fn flat_seed_step<T: RealNumber>(
    rt: &mut Runtime<T>,
    basis: &mut Basis<T>,
    column: usize,
    pivot: f64,
) -> Result<Option<Status>, SolveError> {
    let u = match CholeskyUpdater::flat_direction(&rt.instance, basis, column) {
        Ok(u) => u,
        Err(e) => return Err(ControllerError::from(e).into()),
    };
    let gradient = Gradient::new(&rt.instance, &rt.primal);
    let mut p = basis.zprod(&u);
    let gp = gradient.vector().dot(&p);
    if gp > T::zero() {
        p.scale(-T::one());
    }
    let mut rowmove = Vector::new(rt.instance.num_con);
    rt.instance.mat_vec(&p, &mut rowmove);
    tidyup(&mut p, &mut rowmove, basis, rt.instance.num_con);
    let descending = gp.abs() > rt.settings.lambda_zero_threshold;
    debug!(
        column,
        descending,
        "walking a flat direction of the seed null space"
    );

    for _orientation in 0..2 {
        let step = ratiotest(
            rt.settings.ratiotest,
            &rt.instance,
            basis,
            &rt.primal,
            &p,
            &rt.rowactivity,
            &rowmove,
            T::infinity(),
            rt.settings.feasibility_tolerance,
        );
        if let Some(limiting) = step.limiting {
            let activation =
                Activation::prepare(basis, &rt.instance, limiting, rt.settings.d_zero_threshold)?;
            let drop_index = basis.inactive()[activation.pivot];
            let new_status = if step.at_lower {
                BasisStatus::ActiveAtLower
            } else {
                BasisStatus::ActiveAtUpper
            };
            rt.primal.saxpy(step.alpha, &p);
            rt.rowactivity.saxpy(step.alpha, &rowmove);
            if let Err(e) = basis.activate(&rt.instance, limiting, new_status, drop_index) {
                return Err(ControllerError::from(e).into());
            }
            return Ok(None);
        }
        if descending {
            return Ok(Some(Status::Unbounded));
        }
        // level direction with nothing ahead; look behind before
        // giving up on it
        p.scale(-T::one());
        rowmove.scale(-T::one());
    }

    // the direction meets no constraint in either orientation and
    // carries no curvature or slope, so it decouples from the rest of
    // the problem; the iterate is optimal if no descent remains in the
    // null space
    let rg = basis.ztprod(gradient.vector());
    let worst = rg.iter().fold(T::zero(), |acc, &v| acc.max(v.abs()));
    if worst <= rt.settings.lambda_zero_threshold {
        Ok(Some(Status::Optimal))
    } else {
        Err(ControllerError::from(FactorError::NotPositiveDefinite { column, pivot }).into())
    }
}

/// Zero out the components of the step that belong to active indices.
/// Their moves are zero in exact arithmetic; squashing the roundoff
/// keeps the ratio test away from phantom blockers.
fn tidyup<T: RealNumber>(
    p: &mut Vector<T>,
    rowmove: &mut Vector<T>,
    basis: &Basis<T>,
    num_con: usize,
) {
    for &index in basis.active() {
        if index < num_con {
            rowmove.set(index, T::zero());
        } else {
            p.set(index - num_con, T::zero());
        }
    }
}

fn assign_duals<T: RealNumber>(rt: &mut Runtime<T>, basis: &Basis<T>, g: &Vector<T>) {
    let num_con = rt.instance.num_con;
    let lambda = basis.btran_full(g);
    for &index in basis.active() {
        let slot = match basis.index_in_factor(index) {
            Some(slot) => slot,
            None => unreachable!("active index {index} has no factor slot"),
        };
        if index >= num_con {
            rt.dualvar.set(index - num_con, lambda[slot]);
        } else {
            rt.dualcon.set(index, lambda[slot]);
        }
    }
}

fn snapshot<T: RealNumber>(
    rt: &Runtime<T>,
    basis: &Basis<T>,
    factor_density: T,
) -> IterationRecord<T> {
    let (sum, num) = rt.instance.sum_num_primal_infeasibilities(
        &rt.primal,
        &rt.rowactivity,
        rt.settings.feasibility_tolerance,
    );
    IterationRecord {
        iteration: rt.statistics.num_iterations,
        nullspace_dimension: basis.num_inactive(),
        objective: rt.instance.objective(&rt.primal),
        elapsed: rt.timer.elapsed(),
        sum_primal_infeasibilities: sum,
        num_primal_infeasibilities: num,
        factor_density,
    }
}
