//! Interpolating cubic spline with not-a-knot end conditions.
//!
//! Equivalent to `scipy.interpolate.splrep(x, y, k=3, s=0)` followed by
//! `splev`: the curve passes through every data point, and the third
//! derivative is continuous across the second and the second-to-last knot.
//!
//! The spline is stored as second derivatives `m[i]` at the knots.  With
//! `h[i] = x[i+1] - x[i]`, interior rows solve
//!
//! ```text
//! h[i-1]·m[i-1] + 2(h[i-1]+h[i])·m[i] + h[i]·m[i+1] = 6·(d[i] - d[i-1])
//! ```
//!
//! where `d[i]` is the slope of segment `i`.  Not-a-knot adds
//! `h[1]·m[0] - (h[0]+h[1])·m[1] + h[0]·m[2] = 0` and its mirror at the end.
//! Fewer than four points fall back to lower degree (linear for two points,
//! the interpolating parabola for three).

/// A fitted cubic spline.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    m: Vec<f64>,
}

impl CubicSpline {
    /// Fit through `(x[i], y[i])`.  `x` must be strictly increasing.
    ///
    /// Returns `None` for fewer than two points.
    pub fn fit(x: &[f64], y: &[f64]) -> Option<Self> {
        assert_eq!(x.len(), y.len(), "spline x/y length mismatch");
        let n = x.len();
        if n < 2 {
            return None;
        }
        debug_assert!(x.windows(2).all(|w| w[1] > w[0]), "spline knots must increase");

        let m = match n {
            2 => vec![0.0; 2],
            3 => {
                // Single parabola: constant second derivative.
                let d0 = (y[1] - y[0]) / (x[1] - x[0]);
                let d1 = (y[2] - y[1]) / (x[2] - x[1]);
                let c = 2.0 * (d1 - d0) / (x[2] - x[0]);
                vec![c; 3]
            }
            _ => not_a_knot_second_derivatives(x, y),
        };

        Some(Self { x: x.to_vec(), y: y.to_vec(), m })
    }

    /// Evaluate at `t`.  Outside the knot range the end segments extrapolate.
    pub fn eval(&self, t: f64) -> f64 {
        let n = self.x.len();
        let seg = match self.x.partition_point(|&xi| xi <= t) {
            0 => 0,
            k if k >= n => n - 2,
            k => k - 1,
        };
        let (x0, x1) = (self.x[seg], self.x[seg + 1]);
        let (y0, y1) = (self.y[seg], self.y[seg + 1]);
        let (m0, m1) = (self.m[seg], self.m[seg + 1]);
        let h = x1 - x0;
        let a = (x1 - t) / h;
        let b = (t - x0) / h;
        a * y0 + b * y1 + ((a * a * a - a) * m0 + (b * b * b - b) * m1) * h * h / 6.0
    }

    /// Evaluate at every `t` in `ts`.
    pub fn eval_many(&self, ts: &[f64]) -> Vec<f64> {
        ts.iter().map(|&t| self.eval(t)).collect()
    }
}

/// Solve the not-a-knot system for knot second derivatives.
///
/// The system is tridiagonal except for the two end rows, which reach one
/// column further.
fn not_a_knot_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let d: Vec<f64> = (0..n - 1).map(|i| (y[i + 1] - y[i]) / h[i]).collect();

    // Waveforms have tens of samples, so a dense solve is fine.
    let mut a = vec![vec![0.0_f64; n]; n];
    let mut rhs = vec![0.0_f64; n];

    a[0][0] = h[1];
    a[0][1] = -(h[0] + h[1]);
    a[0][2] = h[0];

    for i in 1..n - 1 {
        a[i][i - 1] = h[i - 1];
        a[i][i] = 2.0 * (h[i - 1] + h[i]);
        a[i][i + 1] = h[i];
        rhs[i] = 6.0 * (d[i] - d[i - 1]);
    }

    a[n - 1][n - 3] = h[n - 2];
    a[n - 1][n - 2] = -(h[n - 3] + h[n - 2]);
    a[n - 1][n - 1] = h[n - 3];

    solve_dense(a, rhs)
}

/// Gaussian elimination with partial pivoting.
fn solve_dense(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        a.swap(col, pivot);
        b.swap(col, pivot);

        let p = a[col][col];
        if p == 0.0 {
            continue;
        }
        for row in col + 1..n {
            let f = a[row][col] / p;
            if f == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= f * a[col][k];
            }
            b[row] -= f * b[col];
        }
    }

    let mut out = vec![0.0; n];
    for row in (0..n).rev() {
        let s: f64 = (row + 1..n).map(|k| a[row][k] * out[k]).sum();
        out[row] = if a[row][row] != 0.0 { (b[row] - s) / a[row][row] } else { 0.0 };
    }
    out
}
