use nalgebra::{dmatrix, DMatrix, DVector};
use std::error::Error;
use std::time::Instant;

extern crate lq_control;
use lq_control::control::{
    lqg_gradient, lqr, solve_riccati, LinearModel, LqProblem, QuadraticValue, RiccatiOptions,
};

/// [x, x_dot, theta, thetha_dot]
struct InvertedPendulumModel {
    da: DMatrix<f64>,
    db: DMatrix<f64>,
    r: DMatrix<f64>,
    q: DMatrix<f64>,
}

impl InvertedPendulumModel {
    fn new(l_bar: f64, mass_cart: f64, mass_ball: f64, g: f64) -> InvertedPendulumModel {
        let q = DMatrix::from_diagonal(&DVector::from_vec(vec![10.00, 1.0, 10.0, 1.0]));
        let r = dmatrix![0.01];

        #[rustfmt::skip]
        let da = dmatrix![
            0.0, 1.0, 0.0, 0.0;
            0.0, 0.0, mass_ball * g / mass_cart, 0.0;
            0.0, 0.0, 0.0, 1.0;
            0.0, 0.0, g * (mass_cart + mass_ball) / (l_bar * mass_cart), 0.0
        ];

        let db = dmatrix![0.0; 1.0 / mass_cart; 0.0; 1.0 / (l_bar * mass_cart)];

        InvertedPendulumModel { da, db, r, q }
    }

    fn step(&self, x: &DVector<f64>, u: &DVector<f64>, dt: f64) -> DVector<f64> {
        self.a(dt) * x + self.b(dt) * u
    }
}

impl LinearModel<f64> for InvertedPendulumModel {
    fn a(&self, dt: f64) -> DMatrix<f64> {
        DMatrix::identity(4, 4) + &self.da * dt
    }
    fn b(&self, dt: f64) -> DMatrix<f64> {
        &self.db * dt
    }
    fn q(&self) -> &DMatrix<f64> {
        &self.q
    }
    fn r(&self) -> &DMatrix<f64> {
        &self.r
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let sim_time = 5.0;
    let dt = 0.01;
    let gamma = 0.99;
    let options = RiccatiOptions {
        max_iterations: 5000,
        tolerance: Some(1e-9),
    };

    let l_bar = 2.0; // length of bar
    let mass_cart = 1.0; // [kg]
    let mass_ball = 0.3; // [kg]
    let g = 9.8; // [m/s^2]

    let linear_model = InvertedPendulumModel::new(l_bar, mass_cart, mass_ball, g);
    let x0 = DVector::from_vec(vec![0.0, 0.0, -0.2, 0.0]);

    // value of the optimal policy and of a detuned one
    let problem = LqProblem::from_model(&linear_model, dt, gamma)?;
    let solution = solve_riccati(&problem, &options)?;
    println!(
        "riccati: {} iterations, residual {:.3e}, converged {:?}",
        solution.iterations, solution.residual, solution.converged
    );
    println!("K = {}", solution.gain);

    let sigma = dmatrix![0.05];
    let optimal = QuadraticValue::new(&problem, &solution.gain)?;
    println!("V*(x0) = {:.4}", optimal.lqg_state_value(&x0, &sigma)?);

    let detuned = &solution.gain * 0.8;
    let value = QuadraticValue::new(&problem, &detuned)?;
    println!("V(x0) with 0.8 K* = {:.4}", value.lqg_state_value(&x0, &sigma)?);

    let start = Instant::now();
    let grad = lqg_gradient(&x0, &problem, &detuned, &sigma)?;
    println!("Time elapsed in lqg_gradient() is: {:?}", start.elapsed());
    println!("dJ/dK at 0.8 K* = {}", grad.transpose());

    // closed loop
    let mut time = 0.0;
    let mut x = x0;
    while time < sim_time {
        time += dt;
        let u = lqr(&x, dt, &linear_model, gamma, &options)?;
        x = linear_model.step(&x, &u, dt);
    }
    println!(
        "t = {:.2}: x = {:.4} [m], theta = {:.4} [deg]",
        time,
        x[0],
        x[2].to_degrees()
    );
    Ok(())
}
