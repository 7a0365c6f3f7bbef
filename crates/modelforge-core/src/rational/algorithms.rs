//! Best-approximation searches over `[0, 1]`.
//!
//! Each search narrows a bracket `lo < x < hi` of neighbouring fractions
//! until the next mediant would exceed the denominator bound, then picks
//! the closer end. They differ only in how many mediant steps they take in
//! one direction at a time, so they agree on every input.

type Frac = (i64, i64);

#[derive(Clone, Copy)]
enum Toward {
    Lo,
    Hi,
}

fn value((p, q): Frac) -> f64 {
    p as f64 / q as f64
}

fn closer(x: f64, lo: Frac, hi: Frac) -> Frac {
    let dl = (x - value(lo)).abs();
    let dh = (value(hi) - x).abs();
    if dl < dh || (dl == dh && lo.1 <= hi.1) {
        lo
    } else {
        hi
    }
}

/// `hi` after `k` steps toward `lo`, or `lo` after `k` steps toward `hi`.
fn stepped(dir: Toward, lo: Frac, hi: Frac, k: i64) -> Frac {
    match dir {
        Toward::Lo => (k * lo.0 + hi.0, k * lo.1 + hi.1),
        Toward::Hi => (lo.0 + k * hi.0, lo.1 + k * hi.1),
    }
}

/// True while `k` steps keep the moving end strictly on its side of `x`.
fn keeps_side(dir: Toward, x: f64, lo: Frac, hi: Frac, k: i64) -> bool {
    let moved = value(stepped(dir, lo, hi, k));
    match dir {
        Toward::Lo => moved > x,
        Toward::Hi => moved < x,
    }
}

/// Shared descent. `run` returns how many steps to take, in `1..=kmax`,
/// and must return the largest count for which [`keeps_side`] holds.
fn descend<F>(x: f64, n: i64, run: F) -> Frac
where
    F: Fn(Toward, f64, Frac, Frac, i64) -> i64,
{
    let mut lo: Frac = (0, 1);
    let mut hi: Frac = (1, 1);
    loop {
        // A denominator sum past i64::MAX is past any bound too.
        let Some(q) = lo.1.checked_add(hi.1).filter(|&q| q <= n) else {
            break;
        };
        let mediant = (lo.0 + hi.0, q);
        let m = value(mediant);
        if m == x {
            return mediant;
        }
        if x < m {
            let kmax = (n - hi.1) / lo.1;
            let k = run(Toward::Lo, x, lo, hi, kmax);
            hi = stepped(Toward::Lo, lo, hi, k);
        } else {
            let kmax = (n - lo.1) / hi.1;
            let k = run(Toward::Hi, x, lo, hi, kmax);
            lo = stepped(Toward::Hi, lo, hi, k);
        }
    }
    closer(x, lo, hi)
}

/// Farey mediant search: one step at a time.
///
/// Takes as many iterations as the sum of the partial quotients of `x`,
/// which is up to `n` for values close to a fraction with a small
/// denominator (e.g. `1e-9` with `n = 1e9`). Prefer the other searches for
/// large bounds.
pub(super) fn farey(x: f64, n: i64) -> Frac {
    descend(x, n, |_, _, _, _, _| 1)
}

/// Stern–Brocot search with each run length found by binary search.
pub(super) fn stern_brocot(x: f64, n: i64) -> Frac {
    descend(x, n, |dir, x, lo, hi, kmax| {
        let (mut good, mut bad) = (1, kmax + 1);
        while bad - good > 1 {
            let mid = good + (bad - good) / 2;
            if keeps_side(dir, x, lo, hi, mid) {
                good = mid;
            } else {
                bad = mid;
            }
        }
        good
    })
}

/// Continued-fraction search: each run length is the partial quotient,
/// computed in closed form and then corrected against exact comparisons.
pub(super) fn continued_fraction(x: f64, n: i64) -> Frac {
    descend(x, n, |dir, x, lo, hi, kmax| {
        let (a, b) = lo;
        let (c, d) = hi;
        let estimate = match dir {
            Toward::Lo => (c as f64 - x * d as f64) / (x * b as f64 - a as f64),
            Toward::Hi => (x * b as f64 - a as f64) / (c as f64 - x * d as f64),
        };
        let mut k = (estimate.floor() as i64).clamp(1, kmax);
        while k > 1 && !keeps_side(dir, x, lo, hi, k) {
            k -= 1;
        }
        while k < kmax && keeps_side(dir, x, lo, hi, k + 1) {
            k += 1;
        }
        k
    })
}
