//! Sum statistics: the probability that a set of `r` HSPs reaches a
//! combined normalized score, used to give linked HSPs one shared e-value.

use std::f64::consts::{LN_2, PI};

/// Weight applied to an e-value when `num_segments` HSPs were considered
/// together: `(1 - rate) * rate^(n - 1)`.
pub fn gap_decay_divisor(decay_rate: f64, num_segments: usize) -> f64 {
    if num_segments == 0 {
        return 1.0;
    }
    (1.0 - decay_rate) * decay_rate.powi(num_segments as i32 - 1)
}

/// Lanczos approximation of `ln Γ(x)`.
pub fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEF: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        return PI.ln() - (PI * x).sin().abs().ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let t = x + G + 0.5;
    let a = COEF
        .iter()
        .enumerate()
        .skip(1)
        .fold(COEF[0], |acc, (i, c)| acc + c / (x + i as f64));
    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

/// `ln(n!)`, exact for small `n`.
pub fn ln_factorial(n: u32) -> f64 {
    if n <= 20 {
        (2..=n).map(f64::from).product::<f64>().ln()
    } else {
        ln_gamma(f64::from(n) + 1.0)
    }
}

/// E = -ln(1 - P)
pub fn p_to_e(p: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) {
        return i32::MIN as f64;
    }
    if p == 1.0 {
        return i32::MAX as f64;
    }
    -(-p).ln_1p()
}

/// P = 1 - exp(-E)
pub fn e_to_p(e: f64) -> f64 {
    if e < 0.0 {
        return 0.0;
    }
    -(-e).exp_m1()
}

/// Precomputed P-values for two, three and four segments, indexed by
/// `2s + 4r`.
const TAB2: &[f64] = &[
    0.01669, 0.0249, 0.03683, 0.05390, 0.07794, 0.1111, 0.1559, 0.2146, 0.2890, 0.3794, 0.4836,
    0.5965, 0.7092, 0.8114, 0.8931, 0.9490, 0.9806, 0.9944, 0.9989,
];

const TAB3: &[f64] = &[
    0.0001682, 0.0002542, 0.0003829, 0.0005745, 0.0008587, 0.001278, 0.001893, 0.002789,
    0.004088, 0.005958, 0.008627, 0.01240, 0.01770, 0.02505, 0.03514, 0.04880, 0.06704, 0.09103,
    0.1220, 0.1612, 0.2097, 0.2682, 0.3368, 0.4145, 0.4994, 0.5881, 0.6765, 0.7596, 0.8326,
    0.8922, 0.9367, 0.9667, 0.9846, 0.9939, 0.9980,
];

const TAB4: &[f64] = &[
    2.658e-07, 4.064e-07, 6.203e-07, 9.450e-07, 1.437e-06, 2.181e-06, 3.302e-06, 4.990e-06,
    7.524e-06, 1.132e-05, 1.698e-05, 2.541e-05, 3.791e-05, 5.641e-05, 8.368e-05, 0.0001237,
    0.0001823, 0.0002677, 0.0003915, 0.0005704, 0.0008275, 0.001195, 0.001718, 0.002457, 0.003494,
    0.004942, 0.006948, 0.009702, 0.01346, 0.01853, 0.02532, 0.03431, 0.04607, 0.06128, 0.08068,
    0.1051, 0.1352, 0.1719, 0.2157, 0.2669, 0.3254, 0.3906, 0.4612, 0.5355, 0.6110, 0.6849, 0.7544,
    0.8168, 0.8699, 0.9127, 0.9451, 0.9679, 0.9827, 0.9915, 0.9963,
];

/// Romberg integration of `f` over `[p, q]`.
fn romberg_integrate<F>(f: &mut F, p: f64, q: f64, eps: f64, epsit: i32, itmin: i32) -> f64
where
    F: FnMut(f64) -> f64,
{
    const MAX_DIAGS: usize = 20;

    let itmin = itmin.clamp(1, MAX_DIAGS as i32 - 1);
    let epsit = epsit.clamp(1, 3);
    let epsck = itmin - epsit;

    let mut romb = [0.0_f64; MAX_DIAGS];
    let mut npts: i32 = 1;
    let mut h = q - p;

    let x0 = f(p);
    if !x0.is_finite() {
        return x0;
    }
    let y0 = f(q);
    if !y0.is_finite() {
        return y0;
    }
    romb[0] = 0.5 * h * (x0 + y0);

    let mut converged_iters = 0;
    for i in 1..MAX_DIAGS {
        let mut sum = 0.0;
        let mut x = p + 0.5 * h;
        for _ in 0..npts {
            let y = f(x);
            if !y.is_finite() {
                return y;
            }
            sum += y;
            x += h;
        }
        romb[i] = 0.5 * (romb[i - 1] + h * sum);

        let mut n = 4.0;
        for j in (0..i).rev() {
            romb[j] = (n * romb[j + 1] - romb[j]) / (n - 1.0);
            n *= 4.0;
        }

        if i as i32 > epsck {
            if (romb[1] - romb[0]).abs() > eps * romb[0].abs() {
                converged_iters = 0;
            } else {
                converged_iters += 1;
                if i as i32 >= itmin && converged_iters >= epsit {
                    return romb[0];
                }
            }
        }
        npts *= 2;
        h *= 0.5;
    }
    f64::INFINITY
}

/// Sum P-value by numerical integration; used for more than four segments.
fn sum_p_integrate(r: u32, s: f64) -> f64 {
    const SUMP_EPSILON: f64 = 0.002;

    if r == 1 {
        if s > 8.0 {
            return (-s).exp();
        }
        return -(-(-s).exp()).exp_m1();
    }
    if r == 0 {
        return 0.0;
    }
    let rf = f64::from(r);
    let floor = match r {
        0..=7 => Some(-2.3),
        8..=14 => Some(-2.5),
        15..=26 => Some(-3.0),
        27..=50 => Some(-3.4),
        51..=100 => Some(-4.0),
        _ => None,
    };
    if floor.is_some_and(|f| s <= f * rf) {
        return 1.0;
    }

    let stddev4 = 4.0 * rf.sqrt();
    let r1 = r - 1;
    if r > 100 && s <= -rf * f64::from(r1) - stddev4 {
        return 1.0;
    }
    let logr = rf.ln();
    let mean = rf * (1.0 - logr) - 0.5;
    if s <= mean - stddev4 {
        return 1.0;
    }

    let (t, mut itmin) = if s >= mean {
        (s + 1.5 * stddev4, 1)
    } else {
        (mean + 1.5 * stddev4, 2)
    };

    let adj1 = f64::from(r - 2) * logr - ln_gamma(f64::from(r1)) - ln_gamma(rf);
    let r_minus_2 = f64::from(r - 2);

    let mut inner = |s_var: f64| -> f64 {
        let adj2 = adj1 - s_var;
        let sdvir = s_var / rf;
        let mx = if s_var > 0.0 { sdvir + 3.0 } else { 3.0 };
        let mut outer = |x: f64| -> f64 {
            let y = (x - sdvir).exp();
            if !y.is_finite() {
                return 0.0;
            }
            if r == 2 {
                return (adj2 - y).exp();
            }
            if x == 0.0 {
                return 0.0;
            }
            (r_minus_2 * x.ln() + adj2 - y).exp()
        };
        romberg_integrate(&mut outer, 0.0, mx, SUMP_EPSILON, 0, 1)
    };

    loop {
        let d = romberg_integrate(&mut inner, s, t, SUMP_EPSILON, 0, itmin);
        if !d.is_finite() {
            return d;
        }
        if !(s < mean && d < 0.4 && itmin < 4) {
            return d.min(1.0);
        }
        itmin += 1;
    }
}

/// Probability that `r` segments reach a summed normalized score of `s`.
pub fn sum_p(r: u32, s: f64) -> f64 {
    if r == 1 {
        return -(-(-s).exp()).exp_m1();
    }
    if r == 0 {
        return 0.0;
    }
    if r > 4 {
        return sum_p_integrate(r, s);
    }

    let rf = f64::from(r);
    let r1 = f64::from(r - 1);
    if s >= rf * rf + r1 {
        let a = ln_gamma(rf + 1.0);
        return rf * (r1 * s.ln() - s - a - a).exp();
    }
    if s > -2.0 * rf {
        let table = match r {
            2 => TAB2,
            3 => TAB3,
            _ => TAB4,
        };
        let a = s + s + 4.0 * rf;
        let whole = a.floor();
        let frac = a - whole;
        let idx = table.len() as i64 - 1 - whole as i64;
        if idx > 0 && (idx as usize) < table.len() {
            let idx = idx as usize;
            return frac * table[idx - 1] + (1.0 - frac) * table[idx];
        }
    }
    1.0
}

/// E-value of `num_hsps` HSPs linked with arbitrarily large gaps, given
/// their summed normalized score `xsum`.
pub fn large_gap_sum_e(
    num_hsps: u32,
    xsum: f64,
    query_length: f64,
    subject_length: f64,
    searchsp_eff: f64,
    weight_divisor: f64,
) -> f64 {
    let sum_e = if num_hsps <= 1 {
        searchsp_eff * (-xsum).exp()
    } else {
        let pair_space = query_length.max(1.0) * subject_length.max(1.0);
        let adjusted = xsum - f64::from(num_hsps) * pair_space.ln() + ln_factorial(num_hsps);
        p_to_e(sum_p(num_hsps, adjusted)) * (searchsp_eff / pair_space)
    };
    if weight_divisor == 0.0 {
        return i32::MAX as f64;
    }
    (sum_e / weight_divisor).min(i32::MAX as f64)
}

/// Raw score in nats: `lambda * S - ln K`.
pub fn normalize_score(raw_score: i32, lambda: f64, log_k: f64) -> f64 {
    lambda * f64::from(raw_score) - log_k
}

/// Nats to bits.
pub fn nats_to_bits(nats: f64) -> f64 {
    nats / LN_2
}
