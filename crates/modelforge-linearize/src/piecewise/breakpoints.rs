//! Breakpoint placement.

use modelforge_core::{ModelForgeError, Result, ScalarFn};
use rand::seq::index::sample_weighted;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// `segments + 1` evenly spaced points with exact endpoints.
pub fn uniform(x_min: f64, x_max: f64, segments: usize) -> Vec<f64> {
    let width = (x_max - x_min) / segments as f64;
    let mut points: Vec<f64> = (0..segments).map(|i| x_min + width * i as f64).collect();
    points.push(x_max);
    points
}

/// Breakpoints concentrated where `func` bends.
///
/// `func` is sampled at `samples` evenly spaced points and the magnitude
/// of the discrete second difference becomes a placement weight. With a
/// seed, interior breakpoints are drawn by weighted sampling without
/// replacement; without one, they sit at evenly spaced quantiles of the
/// cumulative weight. Endpoints are always included and the result is
/// sorted and de-duplicated, so it may hold fewer than `segments + 1`
/// points. A function without curvature gets uniform breakpoints.
pub fn adaptive(
    func: &ScalarFn,
    entity: &str,
    x_min: f64,
    x_max: f64,
    segments: usize,
    samples: usize,
    seed: Option<u64>,
) -> Result<Vec<f64>> {
    if segments <= 1 {
        return Ok(uniform(x_min, x_max, segments.max(1)));
    }
    let samples = samples.max(segments + 1);
    let xs = uniform(x_min, x_max, samples - 1);
    let ys = xs
        .iter()
        .map(|&x| func.eval(x))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ModelForgeError::evaluation(entity, e))?;

    let curvature = curvature(&ys);
    let peak = curvature.iter().copied().fold(0.0, f64::max);
    let scale = ys.iter().fold(1.0, |m: f64, y| m.max(y.abs()));
    if peak <= 1e-9 * scale {
        return Ok(uniform(x_min, x_max, segments));
    }
    // Flat stretches keep a small chance of receiving a breakpoint.
    let floor = peak * 1e-3;
    let weights: Vec<f64> = curvature.iter().map(|c| c + floor).collect();
    let wanted = segments - 1;

    let picked: Vec<usize> = match seed {
        Some(seed) => {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            sample_weighted(&mut rng, weights.len(), |i| weights[i], wanted)
                .map_err(|e| {
                    ModelForgeError::Config(format!(
                        "adaptive breakpoint sampling for '{}' failed: {}",
                        entity, e
                    ))
                })?
                .into_vec()
        }
        None => quantiles(&weights, wanted),
    };

    // Weight `i` belongs to interior sample `i + 1`.
    let mut points: Vec<f64> = picked.into_iter().map(|i| xs[i + 1]).collect();
    points.push(x_min);
    points.push(x_max);
    points.sort_by(f64::total_cmp);
    points.dedup();
    Ok(points)
}

/// `|y[j-1] - 2 y[j] + y[j+1]|` for every interior sample `j`.
fn curvature(ys: &[f64]) -> Vec<f64> {
    ys.windows(3)
        .map(|w| (w[0] - 2.0 * w[1] + w[2]).abs())
        .collect()
}

/// Indices where the cumulative weight crosses `k / (count + 1)` of the
/// total, for `k = 1..=count`.
fn quantiles(weights: &[f64], count: usize) -> Vec<usize> {
    let total: f64 = weights.iter().sum();
    let mut out = Vec::with_capacity(count);
    let mut cumulative = 0.0;
    let mut k = 1;
    for (i, w) in weights.iter().enumerate() {
        cumulative += w;
        while k <= count && cumulative >= total * k as f64 / (count + 1) as f64 {
            out.push(i);
            k += 1;
        }
    }
    // Rounding can leave the last quantile just above the running sum.
    while out.len() < count {
        out.push(weights.len() - 1);
    }
    out
}
