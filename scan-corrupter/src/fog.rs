use std::str::FromStr;

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Beta, Distribution};

use integral_tables::IntegralTable;
use scan_core::params::ParameterSet;
use scan_core::scan::{Scan, ScanPoint, FOG_LABEL};

use crate::error::CorruptionError;

/// Fixed radius (m) scaling the Beta-distributed additive range noise of
/// variant v4.
const NOISE_RADIUS_M: f64 = 10.0;

/// Range-noise model applied to points replaced by a fog return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseVariant {
    /// Uniform noisy range around the true range.
    V1,
    /// Multiplicative noise in the power domain, symmetric exponent.
    V2,
    /// Multiplicative noise in the power domain, biased toward inflation.
    V3,
    /// Beta-distributed additive offset on the fog distance.
    V4,
}

impl FromStr for NoiseVariant {
    type Err = CorruptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v1" => Ok(NoiseVariant::V1),
            "v2" => Ok(NoiseVariant::V2),
            "v3" => Ok(NoiseVariant::V3),
            "v4" => Ok(NoiseVariant::V4),
            other => Err(CorruptionError::UnknownNoiseVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FogOptions {
    /// Apply Beer-Lambert attenuation of the real returns.
    pub hard: bool,
    /// Compute per-point fog responses and replace dominated returns.
    pub soft: bool,
    /// Noise level; 0 disables range noise on replaced points.
    pub noise: u32,
    pub noise_variant: NoiseVariant,
    /// Renormalize replaced-point intensities so the strongest one is 255.
    pub gain: bool,
}

impl Default for FogOptions {
    fn default() -> Self {
        FogOptions {
            hard: true,
            soft: true,
            noise: 10,
            noise_variant: NoiseVariant::V1,
            gain: false,
        }
    }
}

/// Extremes of the accepted fog responses across one scan.
/// `min_response` stays infinite when nothing was replaced.
#[derive(Debug, Clone, Copy)]
pub struct FogSummary {
    pub min_response: f64,
    pub max_response: f64,
}

impl Default for FogSummary {
    fn default() -> Self {
        FogSummary {
            min_response: f64::INFINITY,
            max_response: 0.0,
        }
    }
}

#[derive(Debug)]
pub struct FogOutput {
    pub scan: Scan,
    /// Replaced points only; `None` when no fog return dominated.
    pub fog_points: Option<Vec<ScanPoint>>,
    pub labels: Vec<u32>,
    pub num_replaced: usize,
    pub summary: FogSummary,
}

/// Hard-target step: signal traveling through fog to a solid target and back
/// loses intensity by Beer-Lambert, exp(-2 * alpha * range).
pub fn attenuate_hard(params: &ParameterSet, scan: &mut Scan) {
    for point in &mut scan.points {
        let r = point.range() as f64;
        point.intensity = (point.intensity as f64 * (-2.0 * params.alpha * r).exp()) as f32;
    }
}

fn noise_factor(
    variant: NoiseVariant,
    noise: f64,
    range: f64,
    fog_distance: f64,
    rng: &mut StdRng,
) -> f64 {
    match variant {
        NoiseVariant::V1 => {
            let noisy_range = rng.gen_range(range - noise..=range + noise);
            range / noisy_range
        }
        NoiseVariant::V2 => {
            // noise=10 => factor ranges from 1/2 to 2
            let power = rng.gen_range(-1.0..=1.0);
            f64::max(1.0, noise / 5.0).powf(power)
        }
        NoiseVariant::V3 => {
            // noise=10 => factor ranges from 1/2 to 4
            let power = rng.gen_range(-0.5..=1.0);
            f64::max(1.0, noise * 4.0 / 10.0).powf(power)
        }
        NoiseVariant::V4 => {
            let beta = Beta::new(2.0, 20.0).expect("valid shape parameters");
            let additive = NOISE_RADIUS_M * beta.sample(rng);
            (fog_distance + additive) / fog_distance
        }
    }
}

/// Soft-target step: per point, estimates the return contributed by the fog
/// volume along the beam and, where it exceeds the (attenuated) real return,
/// pulls the point to the fog-induced apparent range and relabels it.
///
/// `original_intensity` is the per-point intensity before hard-target
/// attenuation; the fog response scales with what the pulse actually carried.
pub fn apply_soft(
    params: &ParameterSet,
    table: &IntegralTable,
    scan: &mut Scan,
    original_intensity: &[f32],
    labels: &mut [u32],
    options: &FogOptions,
    rng: &mut StdRng,
) -> Result<(Option<Vec<ScanPoint>>, usize, FogSummary), CorruptionError> {
    let mut summary = FogSummary::default();
    let mut replaced = vec![false; scan.len()];
    let mut num_replaced = 0usize;
    let beta_ratio = params.beta / params.beta_0;

    for (i, point) in scan.points.iter_mut().enumerate() {
        let range = point.range();
        let (fog_distance, integrated_response) = table.lookup(range)?;
        let range = range as f64;
        let fog_distance = fog_distance as f64;

        let fog_response =
            integrated_response as f64 * original_intensity[i] as f64 * range * range * beta_ratio;

        if fog_response <= point.intensity as f64 {
            continue;
        }

        replaced[i] = true;
        num_replaced += 1;

        // pull the point to the apparent range of the fog return;
        // extra channels stay as they are
        let mut factor = fog_distance / range;
        if options.noise > 0 {
            factor *= noise_factor(
                options.noise_variant,
                options.noise as f64,
                range,
                fog_distance,
                rng,
            );
        }
        point.x *= factor as f32;
        point.y *= factor as f32;
        point.z *= factor as f32;
        point.intensity = fog_response as f32;
        labels[i] = FOG_LABEL;

        summary.min_response = summary.min_response.min(fog_response);
        summary.max_response = summary.max_response.max(fog_response);
    }

    if options.gain && num_replaced > 0 {
        let max_intensity = scan
            .points
            .iter()
            .zip(&replaced)
            .filter(|(_, r)| **r)
            .map(|(p, _)| p.intensity)
            .fold(0.0f32, f32::max);
        let gain = 255.0 / max_intensity.ceil();
        for (point, r) in scan.points.iter_mut().zip(&replaced) {
            if *r {
                point.intensity *= gain;
            }
        }
    }

    let fog_points = if num_replaced > 0 {
        Some(
            scan.points
                .iter()
                .zip(&replaced)
                .filter(|(_, r)| **r)
                .map(|(p, _)| p.clone())
                .collect(),
        )
    } else {
        None
    };

    Ok((fog_points, num_replaced, summary))
}

/// Runs the hard- and/or soft-target steps on a copy of the input; the
/// caller's scan and labels are left untouched.
pub fn simulate_fog(
    params: &ParameterSet,
    table: &IntegralTable,
    scan: &Scan,
    labels: &[u32],
    options: &FogOptions,
    rng: &mut StdRng,
) -> Result<FogOutput, CorruptionError> {
    if scan.len() != labels.len() {
        return Err(CorruptionError::LengthMismatch {
            scan: scan.len(),
            labels: labels.len(),
        });
    }

    let mut out_scan = scan.clone();
    let mut out_labels = labels.to_vec();
    let original_intensity: Vec<f32> = scan.points.iter().map(|p| p.intensity).collect();

    if options.hard {
        attenuate_hard(params, &mut out_scan);
    }

    let (fog_points, num_replaced, summary) = if options.soft {
        apply_soft(
            params,
            table,
            &mut out_scan,
            &original_intensity,
            &mut out_labels,
            options,
            rng,
        )?
    } else {
        (None, 0, FogSummary::default())
    };

    Ok(FogOutput {
        scan: out_scan,
        fog_points,
        labels: out_labels,
        num_replaced,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use integral_tables::ENTRY_COUNT;
    use rand::SeedableRng;
    use scan_core::scan::ScanPoint;

    fn constant_table(fog_distance: f32, integrated_response: f32) -> IntegralTable {
        IntegralTable {
            alpha: 0.06,
            tau_h_ns: 20,
            entries: vec![(fog_distance, integrated_response); ENTRY_COUNT],
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn hard_attenuation_monotonic_in_range() {
        let params = ParameterSet::default();
        let mut scan = Scan::new(
            vec![
                ScanPoint::new(10.0, 0.0, 0.0, 100.0),
                ScanPoint::new(50.0, 0.0, 0.0, 100.0),
            ],
            4,
        );
        attenuate_hard(&params, &mut scan);
        assert!(scan.points[0].intensity > scan.points[1].intensity);
        assert!(scan.points[0].intensity < 100.0);
    }

    #[test]
    fn zero_current_intensity_is_always_replaced() {
        let params = ParameterSet::default();
        let table = constant_table(5.0, 1.0);
        let mut scan = Scan::new(vec![ScanPoint::new(10.0, 0.0, 0.0, 0.0)], 4);
        let mut labels = vec![3u32];
        let options = FogOptions {
            noise: 0,
            ..Default::default()
        };

        let (fog_points, num, summary) = apply_soft(
            &params,
            &table,
            &mut scan,
            &[100.0],
            &mut labels,
            &options,
            &mut rng(),
        )
        .unwrap();

        assert_eq!(num, 1);
        assert_eq!(labels, vec![FOG_LABEL]);
        assert_eq!(fog_points.unwrap().len(), 1);
        assert!(summary.min_response > 0.0);
        assert_eq!(summary.min_response, summary.max_response);
        // point pulled to the fog distance: 10 m -> 5 m
        assert!((scan.points[0].x - 5.0).abs() < 1e-4);
    }

    #[test]
    fn dominant_real_return_is_never_replaced() {
        let params = ParameterSet::default();
        let table = constant_table(5.0, 1e-30);
        let original = ScanPoint::new(10.0, 2.0, -1.0, f32::MAX);
        let mut scan = Scan::new(vec![original.clone()], 4);
        let mut labels = vec![3u32];
        let options = FogOptions {
            noise: 0,
            ..Default::default()
        };

        let (fog_points, num, _) = apply_soft(
            &params,
            &table,
            &mut scan,
            &[1.0],
            &mut labels,
            &options,
            &mut rng(),
        )
        .unwrap();

        assert_eq!(num, 0);
        assert!(fog_points.is_none());
        assert_eq!(labels, vec![3]);
        assert_eq!(scan.points[0], original);
    }

    #[test]
    fn gain_renormalizes_strongest_replacement_to_255() {
        let params = ParameterSet::default();
        let table = constant_table(5.0, 1.0);
        let mut scan = Scan::new(
            vec![
                ScanPoint::new(10.0, 0.0, 0.0, 0.0),
                ScanPoint::new(20.0, 0.0, 0.0, 0.0),
            ],
            4,
        );
        let mut labels = vec![0u32; 2];
        let options = FogOptions {
            noise: 0,
            gain: true,
            ..Default::default()
        };

        apply_soft(
            &params,
            &table,
            &mut scan,
            &[1.0, 1.0],
            &mut labels,
            &options,
            &mut rng(),
        )
        .unwrap();

        let max = scan
            .points
            .iter()
            .map(|p| p.intensity)
            .fold(0.0f32, f32::max);
        assert!((max - 255.0).abs() < 1.0);
    }

    #[test]
    fn extra_channels_survive_replacement() {
        let params = ParameterSet::default();
        let table = constant_table(5.0, 1.0);
        let mut point = ScanPoint::new(10.0, 0.0, 0.0, 1.0);
        point.extra = vec![0.75];
        let scan = Scan::new(vec![point], 5);
        let labels = vec![9u32];

        let options = FogOptions {
            noise: 0,
            ..Default::default()
        };
        let out = simulate_fog(&params, &table, &scan, &labels, &options, &mut rng()).unwrap();

        assert_eq!(out.num_replaced, 1);
        assert_eq!(out.scan.points[0].extra, vec![0.75]);
        // caller's data untouched
        assert_eq!(labels, vec![9]);
        assert_eq!(scan.points[0].intensity, 1.0);
    }

    #[test]
    fn noise_variants_scale_geometry_only() {
        let params = ParameterSet::default();
        let table = constant_table(5.0, 1.0);

        for variant in [
            NoiseVariant::V1,
            NoiseVariant::V2,
            NoiseVariant::V3,
            NoiseVariant::V4,
        ] {
            let scan = Scan::new(vec![ScanPoint::new(10.0, 0.0, 0.0, 1.0)], 4);
            let labels = vec![0u32];
            let options = FogOptions {
                noise: 10,
                noise_variant: variant,
                ..Default::default()
            };
            let out = simulate_fog(&params, &table, &scan, &labels, &options, &mut rng()).unwrap();
            assert_eq!(out.num_replaced, 1);

            let noiseless = simulate_fog(
                &params,
                &table,
                &scan,
                &labels,
                &FogOptions {
                    noise: 0,
                    ..options
                },
                &mut rng(),
            )
            .unwrap();
            // intensity is identical with and without range noise
            assert_eq!(
                out.scan.points[0].intensity,
                noiseless.scan.points[0].intensity
            );
        }
    }

    #[test]
    fn unknown_noise_variant_rejected() {
        assert!(matches!(
            "v5".parse::<NoiseVariant>(),
            Err(CorruptionError::UnknownNoiseVariant(_))
        ));
        assert_eq!("v4".parse::<NoiseVariant>().unwrap(), NoiseVariant::V4);
    }

    #[test]
    fn length_mismatch_rejected() {
        let params = ParameterSet::default();
        let table = constant_table(5.0, 1.0);
        let scan = Scan::new(vec![ScanPoint::new(1.0, 0.0, 0.0, 1.0)], 4);
        let result = simulate_fog(
            &params,
            &table,
            &scan,
            &[1, 2],
            &FogOptions::default(),
            &mut rng(),
        );
        assert!(matches!(
            result,
            Err(CorruptionError::LengthMismatch { .. })
        ));
    }
}
