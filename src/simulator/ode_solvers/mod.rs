use ::ode_solvers::{Dopri5, System, Vector5};

use crate::{
    error::{SeirdError, SeirdResult},
    routines::settings::SolverSettings,
    simulator::derivatives,
    structs::parameters::Parameters,
};

pub(crate) type State = Vector5<f64>;
type Time = f64;

#[derive(Debug, Clone)]
struct Model {
    parameters: Parameters,
}

impl System<Time, State> for Model {
    fn system(&self, _t: Time, y: &State, dy: &mut State) {
        let dydt = derivatives(&self.parameters, &[y[0], y[1], y[2], y[3], y[4]]);
        for (slot, value) in dy.iter_mut().zip(dydt) {
            *slot = value;
        }
    }
}

/// Integrate the SEIRD system over `grid`, returning the state at every grid point.
///
/// The first state is `x0` itself; the solver is restarted between consecutive
/// grid points so that every returned state lands exactly on its time.
pub(crate) fn integrate(
    parameters: &Parameters,
    x0: State,
    grid: &[f64],
    settings: &SolverSettings,
) -> SeirdResult<Vec<State>> {
    let mut states = Vec::with_capacity(grid.len());
    let mut x = x0;
    states.push(x);
    for window in grid.windows(2) {
        x = simulate_ode_event(parameters, x, window[0], window[1], settings)?;
        states.push(x);
    }
    Ok(states)
}

#[inline(always)]
fn simulate_ode_event(
    parameters: &Parameters,
    x: State,
    ti: f64,
    tf: f64,
    settings: &SolverSettings,
) -> SeirdResult<State> {
    if ti >= tf {
        return Err(SeirdError::integration(
            ti,
            format!("end time {} is not after start time", tf),
        ));
    }
    let model = Model {
        parameters: *parameters,
    };
    let mut stepper = Dopri5::new(model, ti, tf, tf - ti, x, settings.rtol, settings.atol);
    stepper
        .integrate()
        .map_err(|e| SeirdError::integration(ti, e.to_string()))?;

    let reached = stepper.x_out().last().copied().unwrap_or(ti);
    if (reached - tf).abs() > 1e-9 * tf.abs().max(1.0) {
        return Err(SeirdError::integration(
            reached,
            format!("solver output stopped before t = {}", tf),
        ));
    }
    let y = match stepper.y_out().last() {
        Some(y) => *y,
        None => return Err(SeirdError::integration(ti, "solver produced no output")),
    };
    if y.iter().any(|v| !v.is_finite()) {
        return Err(SeirdError::integration(tf, "non-finite state"));
    }
    Ok(y)
}
