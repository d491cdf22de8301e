//! Standard binnings for the dijet invariant-mass and angular analyses.

use dj_core::{Error, Result};

use crate::histogram::Histogram;

/// 13 TeV resonance binning (mass resolution driven), in GeV.
const MASS_13TEV: &[f64] = &[
    946.0, 976.0, 1006.0, 1037.0, 1068.0, 1100.0, 1133.0, 1166.0, 1200.0, 1234.0, 1269.0, 1305.0,
    1341.0, 1378.0, 1416.0, 1454.0, 1493.0, 1533.0, 1573.0, 1614.0, 1656.0, 1698.0, 1741.0,
    1785.0, 1830.0, 1875.0, 1921.0, 1968.0, 2016.0, 2065.0, 2114.0, 2164.0, 2215.0, 2267.0,
    2320.0, 2374.0, 2429.0, 2485.0, 2542.0, 2600.0, 2659.0, 2719.0, 2780.0, 2842.0, 2905.0,
    2969.0, 3034.0, 3100.0, 3167.0, 3235.0, 3305.0, 3376.0, 3448.0, 3521.0, 3596.0, 3672.0,
    3749.0, 3827.0, 3907.0, 3988.0, 4070.0, 4154.0, 4239.0, 4326.0, 4414.0, 4504.0, 4595.0,
    4688.0, 4782.0, 4878.0, 4975.0, 5074.0, 5175.0, 5277.0, 5381.0, 5487.0, 5595.0, 5705.0,
    5817.0, 5931.0, 6047.0, 6165.0, 6285.0, 6407.0, 6531.0, 6658.0, 6787.0, 6918.0, 7052.0,
    7188.0, 7326.0, 7467.0, 7610.0, 7756.0, 7904.0, 8055.0, 8208.0, 8364.0, 8523.0, 8685.0,
    8850.0, 9019.0, 9191.0, 9366.0, 9544.0, 9726.0, 9911.0, 10100.0, 10292.0, 10488.0, 10688.0,
    10892.0, 11100.0, 11312.0, 11528.0, 11748.0, 11972.0, 12200.0, 12432.0, 12669.0, 12910.0,
    13156.0,
];

const MASS_COARSE_13TEV: &[f64] = &[
    0.0, 30.0, 70.0, 110.0, 160.0, 210.0, 260.0, 310.0, 370.0, 440.0, 510.0, 590.0, 670.0, 760.0,
    850.0, 950.0, 1060.0, 1180.0, 1310.0, 1450.0, 1600.0, 1760.0, 1940.0, 2120.0, 2330.0, 2550.0,
    2780.0, 3040.0, 3310.0, 3610.0, 3930.0, 4270.0, 4640.0, 5040.0, 5470.0, 5940.0, 6440.0,
    7000.0, 7540.0, 8140.0, 8850.0, 9440.0, 10000.0,
];

/// Used for masses involving the second and third jets; starts above 1 TeV.
const MASS_UNPRESCALED_13TEV: &[f64] = &[
    1180.0, 1310.0, 1450.0, 1600.0, 1760.0, 1940.0, 2120.0, 2330.0, 2550.0, 2780.0, 3040.0,
    3310.0, 3610.0, 3930.0, 4270.0, 4640.0, 5040.0, 5470.0, 5940.0, 6440.0, 7000.0, 7540.0,
    8140.0, 8850.0, 9440.0, 10000.0,
];

const MASS_8TEV: &[f64] = &[
    0.0, 20.0, 40.0, 60.0, 80.0, 100.0, 120.0, 140.0, 160.0, 180.0, 200.0, 216.0, 234.0, 253.0,
    272.0, 294.0, 316.0, 339.0, 364.0, 390.0, 417.0, 445.0, 474.0, 504.0, 535.0, 566.0, 599.0,
    633.0, 668.0, 705.0, 743.0, 782.0, 822.0, 864.0, 907.0, 952.0, 999.0, 1048.0, 1098.0, 1150.0,
    1203.0, 1259.0, 1316.0, 1376.0, 1437.0, 1501.0, 1567.0, 1635.0, 1706.0, 1779.0, 1854.0,
    1932.0, 2012.0, 2095.0, 2181.0, 2269.0, 2360.0, 2454.0, 2551.0, 2650.0, 2753.0, 2860.0,
    2970.0, 3084.0, 3202.0, 3324.0, 3450.0, 3581.0, 3716.0, 3855.0, 3999.0, 4149.0, 4303.0,
    4463.0, 4629.0, 4800.0, 4977.0, 5160.0, 5350.0, 5546.0, 5748.0, 5958.0, 6174.0, 6397.0,
    6628.0, 6866.0, 7112.0, 7366.0, 7628.0, 7898.0, 8177.0,
];

const CHI_BINS: &[f64] = &[
    1.0, 1.34986, 1.82212, 2.4596, 3.32012, 4.48169, 6.04965, 8.16617, 11.0232, 14.8797, 20.0855,
    30.0,
];

/// Mass windows of the chi analysis, in GeV.
const CHI_MASS_13TEV: &[f64] = &[
    1800.0, 2000.0, 2250.0, 2500.0, 2800.0, 3100.0, 3400.0, 3700.0, 4000.0, 4300.0, 4600.0,
    4900.0, 5400.0, 6500.0, 8000.0, 10000.0, 13000.0,
];

const CHI_MASS_8TEV: &[f64] = &[600.0, 800.0, 1200.0, 1600.0, 2000.0, 2600.0, 3200.0, 8000.0];

/// Early 13 TeV data (`10pb`, `Week1`).
const CHI_MASS_EARLY: &[f64] = &[400.0, 600.0, 900.0, 1200.0, 1600.0, 2000.0, 2600.0, 13000.0];

const CHI_MASS_DEFAULT: &[f64] = &[
    400.0, 600.0, 900.0, 1200.0, 1600.0, 1800.0, 2000.0, 2250.0, 2500.0, 2800.0, 3100.0, 3400.0,
    3700.0, 4000.0, 4300.0, 4600.0, 4900.0, 5400.0, 6500.0, 8000.0, 10000.0, 13000.0,
];

/// Names accepted by [`mass_bins`].
pub const MASS_PRESETS: &[&str] = &["13TeV", "Coarse13TeV", "UnprescaledMass13TeV", "8TeV"];

/// Bin edges of a named invariant-mass binning.
pub fn mass_bins(preset: &str) -> Result<Vec<f64>> {
    let edges = match preset {
        "13TeV" => MASS_13TEV,
        "Coarse13TeV" => MASS_COARSE_13TEV,
        "UnprescaledMass13TeV" => MASS_UNPRESCALED_13TEV,
        "8TeV" => MASS_8TEV,
        other => {
            return Err(Error::Validation(format!(
                "unknown mass binning '{other}' (known: {})",
                MASS_PRESETS.join(", ")
            )));
        }
    };
    Ok(edges.to_vec())
}

/// Empty histogram with a named invariant-mass binning.
pub fn mass_histogram(name: impl Into<String>, preset: &str) -> Result<Histogram> {
    Histogram::new(name, mass_bins(preset)?)
}

/// Bin edges for the angular variable chi = exp(|y1 - y2|).
pub fn chi_bins() -> Vec<f64> {
    CHI_BINS.to_vec()
}

/// Mass window edges used to split the chi distributions.
///
/// `opt` is matched by substring. `10pb` and `Week1` take precedence over
/// `13TeV` and `8TeV`; any other option gets the combined default windows.
pub fn chi_mass_bins(opt: &str) -> Vec<f64> {
    let edges = if opt.contains("10pb") || opt.contains("Week1") {
        CHI_MASS_EARLY
    } else if opt.contains("13TeV") {
        CHI_MASS_13TEV
    } else if opt.contains("8TeV") {
        CHI_MASS_8TEV
    } else {
        CHI_MASS_DEFAULT
    };
    edges.to_vec()
}

/// Index of the chi mass window holding `mjj`: `i` with
/// `edges[i] < mjj <= edges[i + 1]`.
///
/// `None` at or below the first edge, above the last one, or for NaN.
pub fn chi_mass_window(mjj: f64, opt: &str) -> Option<usize> {
    let edges = chi_mass_bins(opt);
    let below = edges.partition_point(|&e| e < mjj);
    if below == 0 || below == edges.len() {
        return None;
    }
    Some(below - 1)
}

/// `n` edges spaced evenly in log10 between `10^min_exp` and `10^max_exp`.
pub fn log_space(min_exp: f64, max_exp: f64, n: usize) -> Result<Vec<f64>> {
    if n < 2 || !(max_exp > min_exp) {
        return Err(Error::Validation(format!(
            "log_space needs n >= 2 and max > min (got n={n}, min={min_exp}, max={max_exp})"
        )));
    }
    let spacing = (max_exp - min_exp) / (n - 1) as f64;
    let mut edges: Vec<f64> = (0..n - 1).map(|i| 10f64.powf(spacing * i as f64 + min_exp)).collect();
    edges.push(10f64.powf(max_exp));
    Ok(edges)
}
