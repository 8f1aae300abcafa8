//! Energy-aware coverage optimization.
//!
//! Each cycle the surviving sensors are handed to an integer program that picks
//! which of them sense and report:
//!
//! - `x_j ∈ {0,1}` per candidate sensor (selected), `y_i ∈ {0,1}` per point
//!   (counted as covered)
//! - minimize `-ALPHA·Σy_i + BETA·Σ x_j/(energy_j + ε)`
//! - `y_i ≤ Σ_j A[i][j]·x_j` for every point, where `A[i][j] = 1` iff candidate
//!   `j` covers point `i`
//! - `Σy_i ≥ required`
//!
//! `ALPHA` dwarfs the energy term, so coverage is maximized first and the
//! reciprocal-energy cost only breaks ties in favor of sensors with more
//! charge left.
//!
//! The solver sits behind [`BinarySolver`]: the optimizer builds a
//! solver-neutral [`BinaryProgram`] and reads back a 0/1 assignment.
//! [`GoodLpSolver`] is the default backend.

use good_lp::solvers::microlp::microlp;
use good_lp::{Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable, constraint, variable};

use super::geometry::covers;
use super::types::{Point, Sensor, SensorIndex};

/// Weight of one covered point in the objective.
pub const ALPHA: f64 = 1000.0;
/// Weight of the reciprocal-energy selection cost.
pub const BETA: f64 = 1.0;
/// Keeps the reciprocal finite for nearly empty batteries.
pub const ENERGY_EPSILON: f64 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    LessOrEqual,
    GreaterOrEqual,
}

/// `Σ coefficient·variable  <relation>  rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub terms: Vec<(usize, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn is_satisfied_by(&self, assignment: &[bool]) -> bool {
        let lhs: f64 = self.terms.iter().filter(|(i, _)| assignment[*i]).map(|(_, c)| c).sum();
        match self.relation {
            Relation::LessOrEqual => lhs <= self.rhs + 1e-9,
            Relation::GreaterOrEqual => lhs >= self.rhs - 1e-9,
        }
    }
}

/// Minimization problem over binary variables `0..variable_count`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BinaryProgram {
    pub variable_count: usize,
    /// Objective coefficient per variable (minimized).
    pub objective: Vec<f64>,
    pub constraints: Vec<LinearConstraint>,
}

impl BinaryProgram {
    pub fn objective_value(&self, assignment: &[bool]) -> f64 {
        self.objective.iter().zip(assignment).filter(|(_, on)| **on).map(|(c, _)| c).sum()
    }

    pub fn is_feasible(&self, assignment: &[bool]) -> bool {
        assignment.len() == self.variable_count && self.constraints.iter().all(|c| c.is_satisfied_by(assignment))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Solved { assignment: Vec<bool>, objective: f64 },
    /// Infeasible, or the solver could not produce an assignment.
    NoSolution,
}

/// Integer-programming backend.
pub trait BinarySolver {
    fn solve(&self, program: &BinaryProgram) -> SolveOutcome;
}

/// Backend built on `good_lp` with its pure-Rust `microlp` branch-and-bound solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpSolver;

impl BinarySolver for GoodLpSolver {
    fn solve(&self, program: &BinaryProgram) -> SolveOutcome {
        let mut vars = ProblemVariables::new();
        let decision: Vec<Variable> = (0..program.variable_count).map(|_| vars.add(variable().binary())).collect();

        let objective: Expression = program.objective.iter().zip(&decision).map(|(&c, &v)| c * v).sum();
        let mut model = vars.minimise(objective).using(microlp);

        for c in &program.constraints {
            let lhs: Expression = c.terms.iter().map(|&(i, coefficient)| coefficient * decision[i]).sum();
            let rhs = c.rhs;
            model = match c.relation {
                Relation::LessOrEqual => model.with(constraint!(lhs <= rhs)),
                Relation::GreaterOrEqual => model.with(constraint!(lhs >= rhs)),
            };
        }

        match model.solve() {
            Ok(solution) => {
                let assignment: Vec<bool> = decision.iter().map(|&v| solution.value(v) > 0.5).collect();
                if !program.is_feasible(&assignment) {
                    log::warn!("Coverage solver returned an assignment that violates the constraints");
                    return SolveOutcome::NoSolution;
                }
                let objective = program.objective_value(&assignment);
                SolveOutcome::Solved { assignment, objective }
            }
            Err(ResolutionError::Infeasible) => SolveOutcome::NoSolution,
            Err(e) => {
                log::warn!("Coverage solver failed: {}", e);
                SolveOutcome::NoSolution
            }
        }
    }
}

/// Coverage program for one cycle plus the mapping back to sensors.
#[derive(Debug, Clone)]
pub struct CoverageModel {
    pub program: BinaryProgram,
    /// Sensor index for each `x_j` (variables `0..candidates.len()`).
    pub candidates: Vec<SensorIndex>,
    pub point_count: usize,
    pub required: usize,
}

impl CoverageModel {
    /// Variable index of `x_j`.
    pub fn sensor_variable(&self, j: usize) -> usize {
        j
    }

    /// Variable index of `y_i`.
    pub fn point_variable(&self, i: usize) -> usize {
        self.candidates.len() + i
    }
}

/// Build the coverage program, or `None` when no sensor is a candidate.
pub fn build_coverage_model(points: &[Point], sensors: &[Sensor], coverage_radius: f64, required: usize) -> Option<CoverageModel> {
    let candidates: Vec<SensorIndex> = sensors.iter().enumerate().filter(|(_, s)| s.is_candidate()).map(|(i, _)| i).collect();
    if candidates.is_empty() {
        return None;
    }

    let m = candidates.len();
    let n = points.len();

    let mut objective = Vec::with_capacity(m + n);
    objective.extend(candidates.iter().map(|&idx| BETA / (sensors[idx].energy + ENERGY_EPSILON)));
    objective.extend(std::iter::repeat_n(-ALPHA, n));

    let mut constraints = Vec::with_capacity(n + 1);
    for (i, point) in points.iter().enumerate() {
        // y_i - Σ_j A[i][j]·x_j <= 0
        let mut terms = vec![(m + i, 1.0)];
        terms.extend(
            candidates
                .iter()
                .enumerate()
                .filter(|(_, idx)| covers(&sensors[**idx], point, coverage_radius))
                .map(|(j, _)| (j, -1.0)),
        );
        constraints.push(LinearConstraint {
            terms,
            relation: Relation::LessOrEqual,
            rhs: 0.0,
        });
    }
    constraints.push(LinearConstraint {
        terms: (m..m + n).map(|v| (v, 1.0)).collect(),
        relation: Relation::GreaterOrEqual,
        rhs: required as f64,
    });

    Some(CoverageModel {
        program: BinaryProgram {
            variable_count: m + n,
            objective,
            constraints,
        },
        candidates,
        point_count: n,
        required,
    })
}

/// Pick this cycle's sensors.
///
/// Returns an empty selection when there are no candidates (the solver is not
/// called), when the solver finds no solution, or when the assignment covers
/// fewer than `required` points.
pub fn select_sensors(points: &[Point], sensors: &[Sensor], coverage_radius: f64, required: usize, solver: &dyn BinarySolver) -> Vec<SensorIndex> {
    let Some(model) = build_coverage_model(points, sensors, coverage_radius, required) else {
        return Vec::new();
    };

    let assignment = match solver.solve(&model.program) {
        SolveOutcome::Solved { assignment, .. } if assignment.len() == model.program.variable_count => assignment,
        SolveOutcome::Solved { assignment, .. } => {
            log::warn!(
                "Coverage solver returned {} values for {} variables",
                assignment.len(),
                model.program.variable_count
            );
            return Vec::new();
        }
        SolveOutcome::NoSolution => return Vec::new(),
    };

    let covered = (0..model.point_count).filter(|&i| assignment[model.point_variable(i)]).count();
    if covered < model.required {
        return Vec::new();
    }

    model
        .candidates
        .iter()
        .enumerate()
        .filter(|(j, _)| assignment[model.sensor_variable(*j)])
        .map(|(_, &idx)| idx)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Enumerates every assignment; only for small programs.
    pub(crate) struct ExhaustiveSolver;

    impl BinarySolver for ExhaustiveSolver {
        fn solve(&self, program: &BinaryProgram) -> SolveOutcome {
            assert!(program.variable_count <= 20, "program too large for exhaustive search");
            let mut best: Option<(Vec<bool>, f64)> = None;
            for mask in 0u32..(1 << program.variable_count) {
                let assignment: Vec<bool> = (0..program.variable_count).map(|b| mask & (1 << b) != 0).collect();
                if !program.is_feasible(&assignment) {
                    continue;
                }
                let value = program.objective_value(&assignment);
                if best.as_ref().is_none_or(|(_, v)| value < *v - 1e-9) {
                    best = Some((assignment, value));
                }
            }
            match best {
                Some((assignment, objective)) => SolveOutcome::Solved { assignment, objective },
                None => SolveOutcome::NoSolution,
            }
        }
    }

    struct UnreachableSolver;

    impl BinarySolver for UnreachableSolver {
        fn solve(&self, _program: &BinaryProgram) -> SolveOutcome {
            panic!("solver must not be called");
        }
    }

    struct FixedSolver(Vec<bool>);

    impl BinarySolver for FixedSolver {
        fn solve(&self, program: &BinaryProgram) -> SolveOutcome {
            SolveOutcome::Solved {
                assignment: self.0.clone(),
                objective: program.objective_value(&self.0),
            }
        }
    }

    fn p(x: f64, y: f64) -> Point {
        Point { x, y }
    }

    /// Two overlapping sensors at x=0 and x=10 (radius 6) and a sink far away.
    fn pair(energy_a: f64, energy_b: f64) -> Vec<Sensor> {
        vec![
            Sensor::field(0, p(0.0, 0.0), energy_a),
            Sensor::field(1, p(10.0, 0.0), energy_b),
            Sensor::sink(p(500.0, 500.0)),
        ]
    }

    #[test]
    fn model_layout_matches_formulation() {
        let sensors = pair(10.0, 20.0);
        let points = vec![p(0.0, 1.0), p(5.0, 0.0), p(10.0, 1.0)];
        let model = build_coverage_model(&points, &sensors, 6.0, 2).unwrap();

        assert_eq!(model.candidates, vec![0, 1]);
        assert_eq!(model.program.variable_count, 5);
        assert!((model.program.objective[0] - 1.0 / (10.0 + ENERGY_EPSILON)).abs() < 1e-12);
        assert!((model.program.objective[1] - 1.0 / (20.0 + ENERGY_EPSILON)).abs() < 1e-12);
        assert_eq!(&model.program.objective[2..], &[-ALPHA, -ALPHA, -ALPHA]);

        // Middle point (5,0) is covered by both sensors.
        assert_eq!(model.program.constraints[1].terms, vec![(3, 1.0), (0, -1.0), (1, -1.0)]);
        let quota = model.program.constraints.last().unwrap();
        assert_eq!(quota.relation, Relation::GreaterOrEqual);
        assert_eq!(quota.rhs, 2.0);
        assert_eq!(quota.terms.len(), 3);
    }

    #[test]
    fn sink_failed_and_drained_sensors_are_not_candidates() {
        let mut sensors = pair(10.0, 10.0);
        sensors.insert(0, Sensor::field(7, p(1.0, 1.0), 0.0));
        sensors[2].fail();
        let model = build_coverage_model(&[p(0.0, 0.0)], &sensors, 5.0, 1).unwrap();
        assert_eq!(model.candidates, vec![1]);
    }

    #[test]
    fn no_candidates_skips_the_solver() {
        let mut sensors = pair(10.0, 10.0);
        sensors[0].fail();
        sensors[1].energy = 0.0;
        let selected = select_sensors(&[p(0.0, 0.0)], &sensors, 5.0, 1, &UnreachableSolver);
        assert!(selected.is_empty());
    }

    #[test]
    fn prefers_the_sensor_with_more_energy() {
        let points = vec![p(5.0, 0.0)];
        let selected = select_sensors(&points, &pair(10.0, 50.0), 6.0, 1, &ExhaustiveSolver);
        assert_eq!(selected, vec![1]);
        let selected = select_sensors(&points, &pair(50.0, 10.0), 6.0, 1, &ExhaustiveSolver);
        assert_eq!(selected, vec![0]);
    }

    #[test]
    fn coverage_outweighs_energy_cost() {
        // Each sensor alone covers one point; both are needed for full coverage.
        let points = vec![p(0.0, 0.0), p(10.0, 0.0)];
        let selected = select_sensors(&points, &pair(0.01, 0.01), 3.0, 0, &ExhaustiveSolver);
        assert_eq!(selected, vec![0, 1]);
    }

    #[test]
    fn nothing_covered_with_positive_quota_selects_nothing() {
        let points = vec![p(200.0, 200.0), p(300.0, 300.0)];
        let selected = select_sensors(&points, &pair(10.0, 10.0), 5.0, 1, &ExhaustiveSolver);
        assert!(selected.is_empty());
        let selected = select_sensors(&points, &pair(10.0, 10.0), 5.0, 1, &GoodLpSolver);
        assert!(selected.is_empty());
    }

    #[test]
    fn assignment_below_quota_is_discarded() {
        let points = vec![p(0.0, 0.0), p(10.0, 0.0)];
        // Selects sensor 0 but claims no covered point.
        let solver = FixedSolver(vec![true, false, false, false]);
        assert!(select_sensors(&points, &pair(10.0, 10.0), 3.0, 1, &solver).is_empty());
        // Malformed assignment length.
        let solver = FixedSolver(vec![true]);
        assert!(select_sensors(&points, &pair(10.0, 10.0), 3.0, 0, &solver).is_empty());
    }

    #[test]
    fn good_lp_backend_matches_exhaustive_search() {
        let sensors = vec![
            Sensor::field(0, p(0.0, 0.0), 5.0),
            Sensor::field(1, p(8.0, 0.0), 40.0),
            Sensor::field(2, p(16.0, 0.0), 20.0),
            Sensor::field(3, p(8.0, 8.0), 80.0),
            Sensor::sink(p(8.0, 4.0)),
        ];
        let points = vec![p(1.0, 0.0), p(4.0, 1.0), p(12.0, 0.0), p(16.0, 2.0), p(8.0, 9.0), p(30.0, 30.0)];
        let model = build_coverage_model(&points, &sensors, 5.0, 4).unwrap();

        let SolveOutcome::Solved { objective: exhaustive, .. } = ExhaustiveSolver.solve(&model.program) else {
            panic!("exhaustive search found no solution");
        };
        let SolveOutcome::Solved { assignment, objective } = GoodLpSolver.solve(&model.program) else {
            panic!("good_lp found no solution");
        };
        assert!(model.program.is_feasible(&assignment));
        assert!((objective - exhaustive).abs() < 1e-6, "good_lp {} vs exhaustive {}", objective, exhaustive);

        let mut selected = select_sensors(&points, &sensors, 5.0, 4, &GoodLpSolver);
        selected.sort();
        // Sensor 1 only covers points that 0 and 2 already cover.
        assert_eq!(selected, vec![0, 2, 3]);
    }

    #[test]
    fn infeasible_program_reports_no_solution() {
        let program = BinaryProgram {
            variable_count: 1,
            objective: vec![1.0],
            constraints: vec![LinearConstraint {
                terms: vec![(0, 1.0)],
                relation: Relation::GreaterOrEqual,
                rhs: 2.0,
            }],
        };
        assert_eq!(GoodLpSolver.solve(&program), SolveOutcome::NoSolution);
        assert_eq!(ExhaustiveSolver.solve(&program), SolveOutcome::NoSolution);
    }
}
