//! Channel alignment over all ordered channel pairs of an image.
//!
//! Images are independent of each other and the engine keeps no state
//! between calls. Within one image the pairs can optionally be computed on
//! the rayon pool; the resulting rows keep `(channel_1, channel_2)` order
//! either way.

use crate::error::RegistrationError;
use crate::model::{ChannelPairMetrics, ChannelSpot, ImageAlignment, ImageCalibration, PairFailure};
use crate::pair::compute_pair_metrics;
use crate::settings::AlignmentConfig;
use log::{info, warn};
use microscope_optics::OpticalSystem;
use rayon::prelude::*;
use std::collections::HashSet;

/// Everything the engine needs to align one image.
#[derive(Debug, Clone)]
pub struct AlignmentInput {
    pub image_name: String,
    pub filename: String,
    pub spots: Vec<ChannelSpot>,
    pub calibration: ImageCalibration,
    pub optics: OpticalSystem,
}

/// Computes registration metrics for every channel pair of an image.
#[derive(Debug, Clone, Default)]
pub struct ChannelAlignmentEngine {
    config: AlignmentConfig,
}

impl ChannelAlignmentEngine {
    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlignmentConfig {
        &self.config
    }

    /// Align one image.
    ///
    /// Pairs that fail are collected in [`ImageAlignment::failures`]; the
    /// other pairs are still computed.
    ///
    /// # Errors
    /// Only for problems with the image as a whole: no spots, or the same
    /// channel given twice.
    pub fn align_image(&self, input: &AlignmentInput) -> Result<ImageAlignment, RegistrationError> {
        let spots = sorted_spots(&input.spots)?;

        let pairs: Vec<(&ChannelSpot, &ChannelSpot)> = spots
            .iter()
            .flat_map(|a| spots.iter().map(move |b| (*a, *b)))
            .filter(|(a, b)| self.config.include_self_pairs || a.channel_index != b.channel_index)
            .collect();

        let compute = |(a, b): &(&ChannelSpot, &ChannelSpot)| {
            compute_pair_metrics(a, b, &input.calibration, &input.optics, &self.config).map_err(
                |error| PairFailure {
                    channel_1: a.channel_index,
                    channel_2: b.channel_index,
                    channel_name_1: a.channel_name.clone(),
                    channel_name_2: b.channel_name.clone(),
                    error,
                },
            )
        };

        let outcomes: Vec<Result<ChannelPairMetrics, PairFailure>> = if self.config.parallel {
            pairs.par_iter().map(compute).collect()
        } else {
            pairs.iter().map(compute).collect()
        };

        let mut rows = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(row) => rows.push(row),
                Err(failure) => {
                    warn!(
                        "{}: channel pair {} x {} failed: {}",
                        input.image_name, failure.channel_1, failure.channel_2, failure.error
                    );
                    failures.push(failure);
                }
            }
        }

        info!(
            "{}: {} channels, {} pairs computed, {} failed",
            input.image_name,
            spots.len(),
            rows.len(),
            failures.len()
        );

        Ok(ImageAlignment {
            image_name: input.image_name.clone(),
            filename: input.filename.clone(),
            calibration: input.calibration.clone(),
            optics: input.optics.clone(),
            rows,
            failures,
        })
    }

    /// Align a batch of images one after the other.
    ///
    /// Each entry holds the result for the input at the same position.
    pub fn align(
        &self,
        inputs: &[AlignmentInput],
    ) -> Vec<Result<ImageAlignment, RegistrationError>> {
        inputs.iter().map(|input| self.align_image(input)).collect()
    }
}

/// Spots ordered by channel index, rejecting empty or duplicated channels.
fn sorted_spots(spots: &[ChannelSpot]) -> Result<Vec<&ChannelSpot>, RegistrationError> {
    if spots.is_empty() {
        return Err(RegistrationError::EmptyImage);
    }

    let mut seen = HashSet::new();
    for spot in spots {
        if !seen.insert(spot.channel_index) {
            return Err(RegistrationError::DuplicateChannel(spot.channel_index));
        }
    }

    let mut sorted: Vec<&ChannelSpot> = spots.iter().collect();
    sorted.sort_by_key(|s| s.channel_index);
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use microscope_optics::{ImmersionMedium, SpaceUnit, VoxelSize};
    use nalgebra::Point3;

    fn spot(index: u32, wavelength: f64, position: [f64; 3]) -> ChannelSpot {
        ChannelSpot {
            channel_index: index,
            channel_name: format!("Ch{index}"),
            emission_wavelength_nm: wavelength,
            position: Point3::from(position),
            detection_quality: 10.0,
        }
    }

    fn input(spots: Vec<ChannelSpot>) -> AlignmentInput {
        AlignmentInput {
            image_name: "beads".to_string(),
            filename: "beads.tif".to_string(),
            spots,
            calibration: ImageCalibration::new(
                VoxelSize::new(0.1, 0.1, 0.3).unwrap(),
                SpaceUnit::Micrometer,
                "sec",
            ),
            optics: OpticalSystem::new(1.4, ImmersionMedium::Oil).unwrap(),
        }
    }

    fn three_channels() -> Vec<ChannelSpot> {
        vec![
            spot(3, 647.0, [1.2, 1.1, 2.4]),
            spot(1, 425.0, [1.0, 1.0, 2.0]),
            spot(2, 488.0, [1.05, 0.97, 2.1]),
        ]
    }

    #[test]
    fn test_all_ordered_pairs_in_order() {
        let engine = ChannelAlignmentEngine::default();
        let result = engine.align_image(&input(three_channels())).unwrap();

        let order: Vec<(u32, u32)> = result
            .rows
            .iter()
            .map(|r| (r.channel_1, r.channel_2))
            .collect();
        assert_eq!(
            order,
            vec![(1, 1), (1, 2), (1, 3), (2, 1), (2, 2), (2, 3), (3, 1), (3, 2), (3, 3)]
        );
        assert!(result.failures.is_empty());

        let diagonal = result.pair(2, 2).unwrap();
        assert!(diagonal.is_self_pair());
        assert!(diagonal.distances.is_zero());
        assert_eq!(diagonal.colocalization_ratio_3d, Some(0.0));
    }

    #[test]
    fn test_self_pairs_can_be_excluded() {
        let engine = ChannelAlignmentEngine::new(AlignmentConfig {
            include_self_pairs: false,
            ..AlignmentConfig::default()
        });
        let result = engine.align_image(&input(three_channels())).unwrap();
        assert_eq!(result.rows.len(), 6);
        assert!(result.rows.iter().all(|r| !r.is_self_pair()));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential = ChannelAlignmentEngine::default()
            .align_image(&input(three_channels()))
            .unwrap();
        let parallel = ChannelAlignmentEngine::new(AlignmentConfig {
            parallel: true,
            ..AlignmentConfig::default()
        })
        .align_image(&input(three_channels()))
        .unwrap();

        assert_eq!(sequential.rows, parallel.rows);
    }

    #[test]
    fn test_failing_channel_does_not_stop_other_pairs() {
        let mut spots = three_channels();
        spots[0].emission_wavelength_nm = 0.0;

        let result = ChannelAlignmentEngine::default()
            .align_image(&input(spots))
            .unwrap();

        // Every pair involving channel 3 fails, the 2x2 block of 1 and 2 survives
        assert_eq!(result.rows.len(), 4);
        assert_eq!(result.failures.len(), 5);
        assert!(result
            .failures
            .iter()
            .all(|f| f.channel_1 == 3 || f.channel_2 == 3));
        assert!(result.pair(1, 2).is_some());
    }

    #[test]
    fn test_image_level_errors() {
        let engine = ChannelAlignmentEngine::default();
        assert_eq!(
            engine.align_image(&input(Vec::new())).unwrap_err(),
            RegistrationError::EmptyImage
        );

        let duplicated = vec![spot(1, 425.0, [0.0; 3]), spot(1, 488.0, [0.1; 3])];
        assert_eq!(
            engine.align_image(&input(duplicated)).unwrap_err(),
            RegistrationError::DuplicateChannel(1)
        );
    }

    #[test]
    fn test_batch_keeps_going_after_bad_image() {
        let engine = ChannelAlignmentEngine::default();
        let results = engine.align(&[input(Vec::new()), input(three_channels())]);
        assert!(results[0].is_err());
        assert_eq!(results[1].as_ref().unwrap().rows.len(), 9);
    }
}
