use std::f64::consts::PI;

use super::types::{
    BandPoint, MonteCarloResult, SimulationInputs, SimulationPoint, SimulationResult,
    non_negative,
};

const STEPS_PER_YEAR: f64 = 12.0;
const BASE_RISK_LEVEL: f64 = 5.0;
const ZERO_SEED_STATE: u64 = 0xA5A5_A5A5_A5A5_A5A5;
const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Longest horizon a single walk covers; longer requests are cut here.
pub const MAX_HORIZON_YEARS: f64 = 100.0;

/// Supplies standard-normal draws to the simulator.
pub trait NormalSource {
    fn standard_normal(&mut self) -> f64;
}

impl<F: FnMut() -> f64> NormalSource for F {
    fn standard_normal(&mut self) -> f64 {
        self()
    }
}

/// Walks a portfolio value month by month under discretized geometric
/// Brownian motion.
pub fn simulate<N: NormalSource + ?Sized>(
    inputs: &SimulationInputs,
    normals: &mut N,
) -> SimulationResult {
    let capital = non_negative(inputs.starting_capital);
    let mut path = vec![SimulationPoint {
        date: inputs.start,
        value: capital.round(),
    }];

    let months = horizon_months(inputs.years);
    if months == 0 {
        return summarize_path(path, capital, capital, None);
    }

    let dt = 1.0 / STEPS_PER_YEAR;
    let mu = inputs.profile.expected_return;
    let sigma = inputs.profile.volatility * risk_multiplier(inputs.risk_level);
    let drift = (mu - 0.5 * sigma * sigma) * dt;
    let shock_scale = sigma * dt.sqrt();

    let mut value = capital;
    path.reserve(months as usize);
    for m in 1..=months {
        let z = normals.standard_normal();
        value *= (drift + shock_scale * z).exp();
        path.push(SimulationPoint {
            date: inputs.start.add_months(m as i64),
            value: value.round().max(0.0),
        });
    }

    summarize_path(
        path,
        capital,
        value,
        Some(inputs.years.min(MAX_HORIZON_YEARS)),
    )
}

/// Number of monthly steps for a horizon of `years`: zero for a non-finite or
/// non-positive horizon, otherwise at least one and at most
/// [`MAX_HORIZON_YEARS`] worth.
pub fn horizon_months(years: f64) -> u32 {
    if !years.is_finite() || years <= 0.0 {
        return 0;
    }
    let capped = years.min(MAX_HORIZON_YEARS);
    ((capped * STEPS_PER_YEAR).round() as u32).max(1)
}

/// Repeats [`simulate`] over `paths` independently seeded walks and reports
/// the 10th/50th/90th percentile of the displayed value at every month.
pub fn simulate_bands(inputs: &SimulationInputs, paths: u32, seed: u64) -> MonteCarloResult {
    if paths == 0 {
        return MonteCarloResult {
            paths,
            bands: Vec::new(),
            median_final_value: 0.0,
            p10_final_value: 0.0,
            p90_final_value: 0.0,
        };
    }

    let runs: Vec<SimulationResult> = (0..paths)
        .map(|path_id| {
            let mut rng = Rng::new(derive_seed(seed, path_id));
            simulate(inputs, &mut rng)
        })
        .collect();

    let steps = runs[0].path.len();
    let mut column = Vec::with_capacity(runs.len());
    let bands = (0..steps)
        .map(|step| {
            column.clear();
            column.extend(runs.iter().map(|run| run.path[step].value));
            BandPoint {
                date: runs[0].path[step].date,
                p10: percentile(&mut column, 10.0),
                p50: percentile(&mut column, 50.0),
                p90: percentile(&mut column, 90.0),
            }
        })
        .collect();

    let mut finals: Vec<f64> = runs.iter().map(|run| run.final_value).collect();
    MonteCarloResult {
        paths,
        bands,
        median_final_value: percentile(&mut finals, 50.0),
        p10_final_value: percentile(&mut finals, 10.0),
        p90_final_value: percentile(&mut finals, 90.0),
    }
}

fn risk_multiplier(risk_level: u8) -> f64 {
    risk_level.clamp(1, 10) as f64 / BASE_RISK_LEVEL
}

fn summarize_path(
    path: Vec<SimulationPoint>,
    capital: f64,
    final_value: f64,
    years: Option<f64>,
) -> SimulationResult {
    let base = capital.max(1.0);
    let ratio = final_value / base;
    let cagr = match years {
        Some(years) => ratio.powf(1.0 / years) - 1.0,
        None => 0.0,
    };

    SimulationResult {
        path,
        final_value,
        cagr: finite_or(cagr, 0.0),
        growth_percent: finite_or((ratio - 1.0) * 100.0, 0.0),
        gain: final_value - capital,
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

/// Linearly interpolated percentile; sorts `values` in place.
fn percentile(values: &mut [f64], p: f64) -> f64 {
    values.sort_unstable_by(f64::total_cmp);
    match values {
        [] => 0.0,
        [only] => *only,
        _ => {
            let last = values.len() - 1;
            let rank = (p / 100.0).clamp(0.0, 1.0) * last as f64;
            let lower = rank.floor() as usize;
            let upper = (lower + 1).min(last);
            let weight = rank - lower as f64;
            values[lower] + (values[upper] - values[lower]) * weight
        }
    }
}

fn derive_seed(base_seed: u64, path_id: u32) -> u64 {
    let mixed = base_seed ^ (((path_id as u64) << 32) | path_id as u64);
    splitmix64(mixed)
}

/// A fresh seed from the wall clock, for runs that need not be reproducible.
pub fn clock_seed() -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    splitmix64(nanos)
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seeded xorshift64* generator. Normals come in Box-Muller pairs; the
/// second of each pair is handed out on the next draw.
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
    spare: Option<f64>,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { ZERO_SEED_STATE } else { seed },
            spare: None,
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform draw strictly inside (0, 1).
    fn open_unit(&mut self) -> f64 {
        let mantissa = (self.next_u64() >> 11) as f64;
        (mantissa + 0.5) / (1_u64 << 53) as f64
    }
}

impl NormalSource for Rng {
    fn standard_normal(&mut self) -> f64 {
        if let Some(z) = self.spare.take() {
            return z;
        }

        let radius = (-2.0 * self.open_unit().ln()).sqrt();
        let (sin, cos) = (2.0 * PI * self.open_unit()).sin_cos();
        self.spare = Some(radius * sin);
        radius * cos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calendar::YearMonth;
    use crate::core::types::{AssetClass, AssetProfile};
    use proptest::prelude::{any, prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn start() -> YearMonth {
        "2025-01".parse().expect("valid month")
    }

    fn drift_only(capital: f64, mu: f64, years: f64) -> SimulationInputs {
        SimulationInputs {
            starting_capital: capital,
            profile: AssetProfile {
                expected_return: mu,
                volatility: 0.0,
            },
            risk_level: 5,
            years,
            start: start(),
        }
    }

    fn zeros() -> impl FnMut() -> f64 {
        || 0.0
    }

    #[test]
    fn oracle_drift_only_one_year_matches_closed_form() {
        let result = simulate(&drift_only(100_000.0, 0.10, 1.0), &mut zeros());

        assert_eq!(result.path.len(), 13);
        assert_eq!(result.path[0].value, 100_000.0);
        assert_eq!(result.path[12].value, 110_517.0);
        assert_eq!(result.path[12].date.to_string(), "2026-01");
        assert_approx(result.final_value, 100_000.0 * 0.10f64.exp());
        assert_approx(result.cagr, 0.10f64.exp() - 1.0);
        assert_approx(result.growth_percent, (0.10f64.exp() - 1.0) * 100.0);
        assert_approx(result.gain, 100_000.0 * (0.10f64.exp() - 1.0));
    }

    #[test]
    fn drift_only_path_matches_exponential_at_every_month() {
        let result = simulate(&drift_only(25_000.0, 0.07, 3.0), &mut zeros());
        assert_eq!(result.path.len(), 37);
        for (m, point) in result.path.iter().enumerate() {
            let expected = (25_000.0 * (0.07 * m as f64 / 12.0).exp()).round();
            assert_eq!(point.value, expected, "month {m}");
        }
    }

    #[test]
    fn risk_level_scales_volatility_around_level_five() {
        let mut inputs = drift_only(1_000.0, 0.0, 1.0 / 12.0);
        inputs.profile.volatility = 0.2;

        // One step with z = 1: log-return = -sigma^2/24 + sigma/sqrt(12).
        let step = |risk_level: u8| {
            let mut inputs = inputs;
            inputs.risk_level = risk_level;
            simulate(&inputs, &mut || 1.0).final_value
        };
        let sigma_for = |level: f64| 0.2 * level / 5.0;
        let expected = |sigma: f64| 1_000.0 * (-0.5 * sigma * sigma / 12.0 + sigma / 12f64.sqrt()).exp();

        assert_approx(step(5), expected(sigma_for(5.0)));
        assert_approx(step(10), expected(sigma_for(10.0)));
        assert_approx(step(1), expected(sigma_for(1.0)));
        // Out-of-range levels clamp into 1..=10.
        assert_approx(step(0), step(1));
        assert_approx(step(200), step(10));
    }

    #[test]
    fn zero_years_yields_single_point_path() {
        let inputs = SimulationInputs::new(5_000.4, AssetClass::Crypto, 7, 0.0, start());
        let mut draws = 0;
        let result = simulate(&inputs, &mut || {
            draws += 1;
            0.0
        });
        assert_eq!(draws, 0);
        assert_eq!(result.path.len(), 1);
        assert_eq!(result.path[0].value, 5_000.0);
        assert_approx(result.final_value, 5_000.4);
        assert_approx(result.cagr, 0.0);
        assert_approx(result.growth_percent, 0.0);
    }

    #[test]
    fn huge_horizons_are_capped_at_one_hundred_years() {
        let capped = simulate(&drift_only(1_000.0, 0.05, 1e9), &mut zeros());
        assert_eq!(capped.path.len(), 1_201);
        assert_eq!(capped.path[1_200].date.to_string(), "2125-01");
        assert!(capped.cagr.is_finite());

        let exact = simulate(&drift_only(1_000.0, 0.05, 100.0), &mut zeros());
        assert_eq!(capped, exact);

        let endless = simulate(&drift_only(1_000.0, 0.05, f64::INFINITY), &mut zeros());
        assert_eq!(endless.path.len(), 1);
    }

    #[test]
    fn horizon_months_rounds_and_bounds() {
        assert_eq!(horizon_months(0.0), 0);
        assert_eq!(horizon_months(-3.0), 0);
        assert_eq!(horizon_months(f64::NAN), 0);
        assert_eq!(horizon_months(f64::INFINITY), 0);
        assert_eq!(horizon_months(0.01), 1);
        assert_eq!(horizon_months(2.5), 30);
        assert_eq!(horizon_months(1e12), 1_200);
    }

    #[test]
    fn short_horizon_still_takes_one_step() {
        let result = simulate(&drift_only(100.0, 0.12, 0.01), &mut zeros());
        assert_eq!(result.path.len(), 2);
    }

    #[test]
    fn zero_capital_statistics_stay_finite() {
        for class in [AssetClass::Stock, AssetClass::Crypto, AssetClass::MutualFund] {
            let inputs = SimulationInputs::new(0.0, class, 10, 5.0, start());
            let result = simulate(&inputs, &mut Rng::new(9));
            assert!(result.cagr.is_finite());
            assert!(result.growth_percent.is_finite());
            assert!(result.path.iter().all(|p| p.value == 0.0));
        }
    }

    #[test]
    fn negative_capital_is_treated_as_zero() {
        let result = simulate(&drift_only(-500.0, 0.1, 1.0), &mut zeros());
        assert_eq!(result.path[0].value, 0.0);
        assert_approx(result.final_value, 0.0);
    }

    #[test]
    fn built_in_profiles_match_asset_classes() {
        assert_eq!(AssetClass::default(), AssetClass::Stock);
        let stock = AssetClass::Stock.profile();
        let crypto = AssetClass::Crypto.profile();
        let fund = AssetClass::MutualFund.profile();
        assert!(crypto.volatility > stock.volatility && stock.volatility > fund.volatility);
        assert!(crypto.expected_return > stock.expected_return);
        assert_approx(fund.expected_return, 0.08);
    }

    #[test]
    fn seeded_rng_reruns_are_identical() {
        let inputs = SimulationInputs::new(10_000.0, AssetClass::Crypto, 8, 4.0, start());
        let a = simulate(&inputs, &mut Rng::new(123));
        let b = simulate(&inputs, &mut Rng::new(123));
        assert_eq!(a, b);
        let c = simulate(&inputs, &mut Rng::new(124));
        assert_ne!(a.path, c.path);
    }

    #[test]
    fn rng_normals_have_plausible_moments() {
        let mut rng = Rng::new(42);
        let n = 20_000;
        let draws: Vec<f64> = (0..n).map(|_| rng.standard_normal()).collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|z| (z - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((var - 1.0).abs() < 0.05, "variance {var}");
    }

    #[test]
    fn bands_are_ordered_and_reproducible() {
        let inputs = SimulationInputs::new(50_000.0, AssetClass::Stock, 6, 2.0, start());
        let a = simulate_bands(&inputs, 200, 7);
        let b = simulate_bands(&inputs, 200, 7);
        assert_eq!(a, b);
        assert_eq!(a.bands.len(), 25);
        assert_eq!(a.bands[0].p10, 50_000.0);
        assert_eq!(a.bands[0].p90, 50_000.0);
        for band in &a.bands {
            assert!(band.p10 <= band.p50 && band.p50 <= band.p90);
        }
        assert!(a.bands[24].p90 > a.bands[24].p10);
        assert!(a.p10_final_value <= a.median_final_value);
        assert!(a.median_final_value <= a.p90_final_value);
    }

    #[test]
    fn zero_paths_yield_no_bands() {
        let inputs = SimulationInputs::new(50_000.0, AssetClass::Stock, 6, 2.0, start());
        let result = simulate_bands(&inputs, 0, 7);
        assert!(result.bands.is_empty());
    }

    #[test]
    fn percentile_interpolates_between_points() {
        let mut values = vec![4.0, 1.0, 3.0, 2.0];
        assert_approx(percentile(&mut values, 25.0), 1.75);
        assert_approx(percentile(&mut values, 50.0), 2.5);
    }

    #[test]
    fn clock_seeds_drive_valid_walks() {
        let inputs = SimulationInputs::new(1_000.0, AssetClass::MutualFund, 3, 1.0, start());
        let result = simulate(&inputs, &mut Rng::new(clock_seed()));
        assert_eq!(result.path.len(), 13);
        assert!(result.final_value.is_finite());
    }

    #[test]
    fn derive_seed_changes_per_path() {
        assert_ne!(derive_seed(42, 0), derive_seed(42, 1));
        assert_ne!(derive_seed(42, 0), derive_seed(43, 0));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_first_point_is_rounded_capital_and_values_non_negative(
            capital in 0.0f64..10_000_000.0,
            class_id in 0u8..3,
            risk_level in 1u8..=10,
            years in 0.1f64..30.0,
            seed in any::<u64>(),
        ) {
            let class = match class_id {
                0 => AssetClass::Stock,
                1 => AssetClass::Crypto,
                _ => AssetClass::MutualFund,
            };
            let inputs = SimulationInputs::new(capital, class, risk_level, years, start());
            let result = simulate(&inputs, &mut Rng::new(seed));

            prop_assert_eq!(result.path[0].value, capital.round());
            prop_assert_eq!(result.path.len(), ((years * 12.0).round() as usize).max(1) + 1);
            prop_assert!(result.path.iter().all(|p| p.value >= 0.0));
            prop_assert!(result.final_value.is_finite());
            prop_assert!(result.cagr.is_finite());
            prop_assert!(result.growth_percent.is_finite());
            for pair in result.path.windows(2) {
                prop_assert_eq!(pair[0].date.add_months(1), pair[1].date);
            }
        }

        #[test]
        fn prop_drift_only_is_monotone_in_expected_return(
            capital in 1.0f64..1_000_000.0,
            mu in -0.5f64..0.5,
            bump in 0.001f64..0.3,
            years in 0.5f64..20.0,
        ) {
            let low = simulate(&drift_only(capital, mu, years), &mut zeros());
            let high = simulate(&drift_only(capital, mu + bump, years), &mut zeros());
            prop_assert!(high.final_value > low.final_value);
            prop_assert!(high.cagr > low.cagr);
        }
    }
}
