//! Key distributions for synthetic access streams.
//!
//! Each worker owns one generator; draws are infinite and never restart.
//! Generators are seeded either from the wall clock (the default for real
//! runs) or from an explicit seed, which makes test fixtures reproducible.
//!
//! ## Shapes
//!
//! ```text
//!   Uniform   P(k) = 1/N                 k in [0, N)
//!   Zipf      P(k) ∝ (v + k)^(-s)        k in [0, N),  s > 1, v >= 1
//! ```
//!
//! `N` is the draw domain, `round(cache_size * factor)`. Factors above 1 push
//! draws beyond the precached population and model cold misses.
//!
//! ## Example Usage
//!
//! ```
//! use cachesweep::distribution::{DistributionKind, KeyDistribution};
//!
//! let mut zipf = DistributionKind::zipf(1.2, 1.0).build(1_000, 7);
//! let draw = zipf.next_u64();
//! assert!(draw < 1_000);
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::warn;

/// Default Zipf concentration exponent.
pub const DEFAULT_ZIPF_S: f64 = 1.01;
/// Default Zipf offset.
pub const DEFAULT_ZIPF_V: f64 = 1.0;

/// A stream of `u64` draws.
pub trait KeyDistribution {
    fn next_u64(&mut self) -> u64;
}

/// Seed derived from the current time.
pub fn wall_clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5EED)
}

/// Derives an independent per-worker seed from a run seed (SplitMix64 finalizer).
pub fn worker_seed(base: u64, worker: usize) -> u64 {
    let mut z = base.wrapping_add((worker as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Which shape a trial draws from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum DistributionKind {
    Uniform,
    Zipf { s: f64, v: f64 },
}

impl DistributionKind {
    /// Zipf shape with `s` and `v` as given; validation happens in [`Zipf::new`].
    pub fn zipf(s: f64, v: f64) -> Self {
        DistributionKind::Zipf { s, v }
    }

    /// Short label used in benchmark identifiers.
    pub fn label(&self) -> &'static str {
        match self {
            DistributionKind::Uniform => "Uniform",
            DistributionKind::Zipf { .. } => "Zipf",
        }
    }

    /// Builds a generator over `[0, domain)`.
    pub fn build(self, domain: u64, seed: u64) -> DistributionMaker {
        match self {
            DistributionKind::Uniform => DistributionMaker::Uniform(Uniform::new(domain, seed)),
            DistributionKind::Zipf { s, v } => {
                DistributionMaker::Zipf(Zipf::new(s, v, domain, seed))
            },
        }
    }
}

impl Default for DistributionKind {
    fn default() -> Self {
        DistributionKind::zipf(DEFAULT_ZIPF_S, DEFAULT_ZIPF_V)
    }
}

/// A generator bound to one worker.
#[derive(Debug, Clone)]
pub enum DistributionMaker {
    Uniform(Uniform),
    Zipf(Zipf),
}

impl KeyDistribution for DistributionMaker {
    #[inline]
    fn next_u64(&mut self) -> u64 {
        match self {
            DistributionMaker::Uniform(u) => u.next_u64(),
            DistributionMaker::Zipf(z) => z.next_u64(),
        }
    }
}

// ============================================================================
// Uniform
// ============================================================================

/// Uniform draws in `[0, domain)`.
#[derive(Debug, Clone)]
pub struct Uniform {
    domain: u64,
    rng: SmallRng,
}

impl Uniform {
    /// A zero domain is treated as 1.
    pub fn new(domain: u64, seed: u64) -> Self {
        Self {
            domain: domain.max(1),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn domain(&self) -> u64 {
        self.domain
    }
}

impl KeyDistribution for Uniform {
    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.rng.random_range(0..self.domain)
    }
}

// ============================================================================
// Zipf
// ============================================================================

/// Zipf draws in `[0, domain)` by rejection-inversion sampling.
///
/// Follows W. Hörmann, G. Derflinger, "Rejection-inversion to generate
/// variates from monotone discrete distributions" (1996). Precomputes the
/// hat-function bounds so each draw costs a few `exp`/`ln` calls and rarely
/// rejects.
#[derive(Debug, Clone)]
pub struct Zipf {
    imax: f64,
    v: f64,
    q: f64,
    s: f64,
    one_minus_q: f64,
    one_minus_q_inv: f64,
    hxm: f64,
    hx0_minus_hxm: f64,
    rng: SmallRng,
}

impl Zipf {
    /// `s <= 1` and `v < 1` (or non-finite values) are replaced by the defaults
    /// with a warning; the sampler diverges outside that range.
    pub fn new(s: f64, v: f64, domain: u64, seed: u64) -> Self {
        let q = if s.is_finite() && s > 1.0 {
            s
        } else {
            warn!(s, fallback = DEFAULT_ZIPF_S, "zipf s must be > 1");
            DEFAULT_ZIPF_S
        };
        let v = if v.is_finite() && v >= 1.0 {
            v
        } else {
            warn!(v, fallback = DEFAULT_ZIPF_V, "zipf v must be >= 1");
            DEFAULT_ZIPF_V
        };
        let imax = (domain.max(1) - 1) as f64;

        let mut zipf = Self {
            imax,
            v,
            q,
            s: 0.0,
            one_minus_q: 1.0 - q,
            one_minus_q_inv: 1.0 / (1.0 - q),
            hxm: 0.0,
            hx0_minus_hxm: 0.0,
            rng: SmallRng::seed_from_u64(seed),
        };
        zipf.hxm = zipf.h(imax + 0.5);
        zipf.hx0_minus_hxm = zipf.h(0.5) - (v.ln() * -q).exp() - zipf.hxm;
        zipf.s = 1.0 - zipf.hinv(zipf.h(1.5) - (-q * (v + 1.0).ln()).exp());
        zipf
    }

    /// Effective concentration exponent after validation.
    pub fn exponent(&self) -> f64 {
        self.q
    }

    /// Effective offset after validation.
    pub fn offset(&self) -> f64 {
        self.v
    }

    /// Draw domain size.
    pub fn domain(&self) -> u64 {
        self.imax as u64 + 1
    }

    #[inline]
    fn h(&self, x: f64) -> f64 {
        (self.one_minus_q * (self.v + x).ln()).exp() * self.one_minus_q_inv
    }

    #[inline]
    fn hinv(&self, x: f64) -> f64 {
        (self.one_minus_q_inv * (self.one_minus_q * x).ln()).exp() - self.v
    }
}

impl KeyDistribution for Zipf {
    fn next_u64(&mut self) -> u64 {
        let k = loop {
            let r: f64 = self.rng.random();
            let ur = self.hxm + r * self.hx0_minus_hxm;
            let x = self.hinv(ur);
            let k = (x + 0.5).floor();
            if k - x <= self.s {
                break k;
            }
            if ur >= self.h(k + 0.5) - (-(k + self.v).ln() * self.q).exp() {
                break k;
            }
        };
        (k.max(0.0) as u64).min(self.imax as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_stays_in_domain() {
        let mut u = Uniform::new(1_000, 1);
        for _ in 0..50_000 {
            assert!(u.next_u64() < 1_000);
        }
    }

    #[test]
    fn uniform_zero_domain_is_one() {
        let mut u = Uniform::new(0, 1);
        assert_eq!(u.domain(), 1);
        assert_eq!(u.next_u64(), 0);
    }

    #[test]
    fn zipf_stays_in_domain() {
        let mut z = Zipf::new(1.01, 1.0, 200, 3);
        for _ in 0..50_000 {
            assert!(z.next_u64() < 200);
        }
    }

    #[test]
    fn zipf_single_value_domain() {
        let mut z = Zipf::new(2.0, 1.0, 1, 3);
        for _ in 0..100 {
            assert_eq!(z.next_u64(), 0);
        }
    }

    #[test]
    fn zipf_low_keys_dominate() {
        let mut z = Zipf::new(1.01, 1.0, 1_000, 11);
        let mut counts = [0u64; 1_000];
        for _ in 0..200_000 {
            counts[z.next_u64() as usize] += 1;
        }
        for k in 0..5 {
            assert!(
                counts[k] >= counts[k + 1],
                "count[{k}]={} < count[{}]={}",
                counts[k],
                k + 1,
                counts[k + 1]
            );
        }
        let low: u64 = counts[..100].iter().sum();
        let high: u64 = counts[900..].iter().sum();
        assert!(low > high);
    }

    #[test]
    fn zipf_rejects_degenerate_shape() {
        let z = Zipf::new(1.0, 0.5, 100, 1);
        assert_eq!(z.exponent(), DEFAULT_ZIPF_S);
        assert_eq!(z.offset(), DEFAULT_ZIPF_V);

        let z = Zipf::new(f64::NAN, 3.0, 100, 1);
        assert_eq!(z.exponent(), DEFAULT_ZIPF_S);
        assert_eq!(z.offset(), 3.0);
    }

    #[test]
    fn explicit_seed_is_reproducible() {
        let mut a = DistributionKind::default().build(10_000, 99);
        let mut b = DistributionKind::default().build(10_000, 99);
        let xs: Vec<u64> = (0..256).map(|_| a.next_u64()).collect();
        let ys: Vec<u64> = (0..256).map(|_| b.next_u64()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn worker_seeds_differ() {
        assert_ne!(worker_seed(1, 0), worker_seed(1, 1));
        assert_ne!(worker_seed(1, 0), worker_seed(2, 0));
    }
}
