//! Parameter resolution
//!
//! Fills in the speed pair (cutting speed, RPM) and the feed pair (feed per
//! rev or chip load, feed per minute) from whichever member of each pair was
//! supplied. The speed pair resolves first because every feed conversion
//! needs RPM.
//!
//! A machine RPM limit clamps the resolved RPM before the feed pair is
//! resolved, and the cutting speed is recomputed from the clamped value, so
//! every reported number describes the cut the machine will actually run.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{positive, CalcError, Missing, Result};
use crate::formulas::*;
use crate::presets::Drive;
use crate::units::UnitSystem;

/// A value the user either supplied or left blank
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<T>", into = "Option<T>")]
pub enum Input<T: Clone> {
    Known(T),
    Unknown,
}

impl<T: Clone> Default for Input<T> {
    fn default() -> Self {
        Input::Unknown
    }
}

impl<T: Clone> Input<T> {
    pub fn known(self) -> Option<T> {
        match self {
            Input::Known(v) => Some(v),
            Input::Unknown => None,
        }
    }
}

impl<T: Clone> From<Option<T>> for Input<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Input::Known(v),
            None => Input::Unknown,
        }
    }
}

impl<T: Clone> From<Input<T>> for Option<T> {
    fn from(value: Input<T>) -> Self {
        value.known()
    }
}

/// Known subset of a cut
#[derive(Debug, Clone, PartialEq)]
pub struct CutRequest {
    pub diameter: Input<f64>,
    pub cutting_speed: Input<f64>,
    pub rpm: Input<f64>,
    pub feed: FeedRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedRequest {
    /// Single-point or drill feed: IPR ↔ IPM
    PerRev {
        feed_per_rev: Input<f64>,
        feed_per_min: Input<f64>,
    },
    /// Multi-flute feed: IPT ↔ IPM
    PerTooth {
        chip_load: Input<f64>,
        flutes: Input<u32>,
        feed_per_min: Input<f64>,
    },
}

/// RPM ceiling of the drive running the cut
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpindleLimit {
    pub drive: Drive,
    pub max_rpm: f64,
}

/// Record of an RPM clamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Clamp {
    pub drive: Drive,
    pub requested_rpm: f64,
    pub max_rpm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResolvedFeed {
    PerRev {
        feed_per_rev: f64,
        feed_per_min: f64,
    },
    PerTooth {
        chip_load: f64,
        flutes: u32,
        feed_per_min: f64,
    },
}

impl ResolvedFeed {
    pub fn feed_per_min(&self) -> f64 {
        match *self {
            ResolvedFeed::PerRev { feed_per_min, .. } => feed_per_min,
            ResolvedFeed::PerTooth { feed_per_min, .. } => feed_per_min,
        }
    }

    /// Same feed mode re-derived from a new table feed at `rpm`
    pub fn with_feed_per_min(&self, feed_per_min: f64, rpm: f64) -> Result<Self> {
        Ok(match *self {
            ResolvedFeed::PerRev { .. } => ResolvedFeed::PerRev {
                feed_per_rev: feed_per_rev_from_feed_per_min(feed_per_min, rpm)?,
                feed_per_min,
            },
            ResolvedFeed::PerTooth { flutes, .. } => ResolvedFeed::PerTooth {
                chip_load: chip_load_from_feed_per_min(feed_per_min, flutes, rpm)?,
                flutes,
                feed_per_min,
            },
        })
    }
}

/// Fully resolved cut
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedCut {
    pub diameter: f64,
    pub rpm: f64,
    pub cutting_speed: f64,
    pub feed: ResolvedFeed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub cut: ResolvedCut,
    pub clamp: Option<Clamp>,
}

/// Resolve every missing parameter of `request`.
pub fn resolve(
    units: UnitSystem,
    request: &CutRequest,
    limit: Option<SpindleLimit>,
) -> Result<Resolution> {
    let diameter = match request.diameter {
        Input::Known(d) => positive("diameter", d)?,
        Input::Unknown => return Err(CalcError::MissingInput(Missing::Diameter)),
    };

    check_supplied(request)?;

    let (rpm, cutting_speed) = match (request.cutting_speed, request.rpm) {
        // Both supplied: the user's values win
        (Input::Known(v), Input::Known(n)) => (n, v),
        (Input::Known(v), Input::Unknown) => (rpm_from_cutting_speed(units, diameter, v)?, v),
        (Input::Unknown, Input::Known(n)) => (n, cutting_speed_from_rpm(units, diameter, n)?),
        (Input::Unknown, Input::Unknown) => {
            return Err(CalcError::MissingInput(Missing::SpeedPair))
        }
    };

    let (rpm, cutting_speed, clamp) = match limit {
        Some(limit) if limit.max_rpm > 0.0 && rpm > limit.max_rpm => {
            debug!(requested = rpm, max = limit.max_rpm, drive = %limit.drive, "clamping rpm");
            let clamp = Clamp {
                drive: limit.drive,
                requested_rpm: rpm,
                max_rpm: limit.max_rpm,
            };
            let clamped_speed = cutting_speed_from_rpm(units, diameter, limit.max_rpm)?;
            (limit.max_rpm, clamped_speed, Some(clamp))
        }
        _ => (rpm, cutting_speed, None),
    };

    let feed = resolve_feed(&request.feed, rpm)?;
    debug!(diameter, rpm, cutting_speed, feed_per_min = feed.feed_per_min(), "resolved cut");

    Ok(Resolution {
        cut: ResolvedCut {
            diameter,
            rpm,
            cutting_speed,
            feed,
        },
        clamp,
    })
}

/// Every supplied value must be > 0, and a chip-load feed needs a flute count.
fn check_supplied(request: &CutRequest) -> Result<()> {
    let mut supplied = vec![
        ("cutting speed", request.cutting_speed),
        ("rpm", request.rpm),
    ];

    match &request.feed {
        FeedRequest::PerRev {
            feed_per_rev,
            feed_per_min,
        } => {
            supplied.push(("feed per rev", *feed_per_rev));
            supplied.push(("feed per minute", *feed_per_min));
        }
        FeedRequest::PerTooth {
            chip_load,
            flutes,
            feed_per_min,
        } => {
            match flutes {
                Input::Known(0) => {
                    return Err(CalcError::InvalidArgument {
                        field: "flutes",
                        value: 0.0,
                    })
                }
                Input::Known(_) => {}
                Input::Unknown => return Err(CalcError::MissingInput(Missing::Flutes)),
            }
            supplied.push(("chip load", *chip_load));
            supplied.push(("feed per minute", *feed_per_min));
        }
    }

    for (field, value) in supplied {
        if let Input::Known(v) = value {
            positive(field, v)?;
        }
    }
    Ok(())
}

fn resolve_feed(feed: &FeedRequest, rpm: f64) -> Result<ResolvedFeed> {
    match *feed {
        FeedRequest::PerRev {
            feed_per_rev,
            feed_per_min,
        } => {
            let (feed_per_rev, feed_per_min) = match (feed_per_rev, feed_per_min) {
                (Input::Known(f), Input::Known(fm)) => (f, fm),
                (Input::Known(f), Input::Unknown) => (f, feed_per_min_from_feed_per_rev(f, rpm)?),
                (Input::Unknown, Input::Known(fm)) => (feed_per_rev_from_feed_per_min(fm, rpm)?, fm),
                (Input::Unknown, Input::Unknown) => {
                    return Err(CalcError::MissingInput(Missing::FeedPair))
                }
            };
            Ok(ResolvedFeed::PerRev {
                feed_per_rev,
                feed_per_min,
            })
        }
        FeedRequest::PerTooth {
            chip_load,
            flutes,
            feed_per_min,
        } => {
            let flutes = flutes
                .known()
                .ok_or(CalcError::MissingInput(Missing::Flutes))?;
            let (chip_load, feed_per_min) = match (chip_load, feed_per_min) {
                (Input::Known(c), Input::Known(fm)) => (c, fm),
                (Input::Known(c), Input::Unknown) => {
                    (c, feed_per_min_from_chip_load(c, flutes, rpm)?)
                }
                (Input::Unknown, Input::Known(fm)) => {
                    (chip_load_from_feed_per_min(fm, flutes, rpm)?, fm)
                }
                (Input::Unknown, Input::Unknown) => {
                    return Err(CalcError::MissingInput(Missing::FeedPair))
                }
            };
            Ok(ResolvedFeed::PerTooth {
                chip_load,
                flutes,
                feed_per_min,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Input::{Known, Unknown};

    const IMPERIAL: UnitSystem = UnitSystem::Imperial;

    fn per_rev(feed_per_rev: Input<f64>, feed_per_min: Input<f64>) -> FeedRequest {
        FeedRequest::PerRev {
            feed_per_rev,
            feed_per_min,
        }
    }

    fn turning(
        diameter: Input<f64>,
        cutting_speed: Input<f64>,
        rpm: Input<f64>,
        feed: FeedRequest,
    ) -> CutRequest {
        CutRequest {
            diameter,
            cutting_speed,
            rpm,
            feed,
        }
    }

    #[test]
    fn test_sfm_and_ipr_resolve_everything() {
        let req = turning(Known(1.0), Known(300.0), Unknown, per_rev(Known(0.010), Unknown));
        let res = resolve(IMPERIAL, &req, None).unwrap();

        assert!((res.cut.rpm - 1145.916).abs() < 0.001);
        assert_eq!(res.cut.cutting_speed, 300.0);
        match res.cut.feed {
            ResolvedFeed::PerRev { feed_per_rev, feed_per_min } => {
                assert_eq!(feed_per_rev, 0.010);
                assert!((feed_per_min - 11.459).abs() < 0.001);
            }
            other => panic!("unexpected feed {:?}", other),
        }
        assert!(res.clamp.is_none());
    }

    #[test]
    fn test_rpm_and_ipm_resolve_everything() {
        let req = turning(Known(0.5), Unknown, Known(1146.0), per_rev(Unknown, Known(11.46)));
        let res = resolve(IMPERIAL, &req, None).unwrap();

        let expected_sfm = std::f64::consts::PI * 0.5 * 1146.0 / 12.0;
        assert!((res.cut.cutting_speed - expected_sfm).abs() < 1e-9);
        match res.cut.feed {
            ResolvedFeed::PerRev { feed_per_rev, .. } => assert!((feed_per_rev - 0.01).abs() < 1e-12),
            other => panic!("unexpected feed {:?}", other),
        }
    }

    #[test]
    fn test_both_members_trusted_as_is() {
        // Deliberately inconsistent pairs come back untouched
        let req = turning(Known(1.0), Known(500.0), Known(100.0), per_rev(Known(0.02), Known(1.0)));
        let res = resolve(IMPERIAL, &req, None).unwrap();

        assert_eq!(res.cut.rpm, 100.0);
        assert_eq!(res.cut.cutting_speed, 500.0);
        assert_eq!(
            res.cut.feed,
            ResolvedFeed::PerRev { feed_per_rev: 0.02, feed_per_min: 1.0 }
        );
    }

    #[test]
    fn test_missing_speed_pair() {
        let req = turning(Known(1.0), Unknown, Unknown, per_rev(Known(0.01), Unknown));
        assert_eq!(
            resolve(IMPERIAL, &req, None),
            Err(CalcError::MissingInput(Missing::SpeedPair))
        );
    }

    #[test]
    fn test_missing_feed_pair() {
        let req = turning(Known(1.0), Known(300.0), Unknown, per_rev(Unknown, Unknown));
        assert_eq!(
            resolve(IMPERIAL, &req, None),
            Err(CalcError::MissingInput(Missing::FeedPair))
        );

        let req = CutRequest {
            feed: FeedRequest::PerTooth { chip_load: Unknown, flutes: Known(4), feed_per_min: Unknown },
            ..req
        };
        assert_eq!(
            resolve(IMPERIAL, &req, None),
            Err(CalcError::MissingInput(Missing::FeedPair))
        );
    }

    #[test]
    fn test_missing_diameter() {
        let req = turning(Unknown, Known(300.0), Unknown, per_rev(Known(0.01), Unknown));
        assert_eq!(
            resolve(IMPERIAL, &req, None),
            Err(CalcError::MissingInput(Missing::Diameter))
        );
    }

    #[test]
    fn test_non_positive_inputs_rejected() {
        let bad_diameter = turning(Known(0.0), Known(300.0), Unknown, per_rev(Known(0.01), Unknown));
        assert!(matches!(
            resolve(IMPERIAL, &bad_diameter, None),
            Err(CalcError::InvalidArgument { field: "diameter", .. })
        ));

        let bad_rpm = turning(Known(1.0), Known(300.0), Known(-10.0), per_rev(Known(0.01), Unknown));
        assert!(matches!(
            resolve(IMPERIAL, &bad_rpm, None),
            Err(CalcError::InvalidArgument { field: "rpm", .. })
        ));

        // Trusted pairs are still validated
        let bad_feed = turning(Known(1.0), Known(300.0), Unknown, per_rev(Known(0.01), Known(0.0)));
        assert!(matches!(
            resolve(IMPERIAL, &bad_feed, None),
            Err(CalcError::InvalidArgument { field: "feed per minute", .. })
        ));
    }

    #[test]
    fn test_flutes_required_for_chip_load() {
        let mut req = turning(
            Known(0.5),
            Unknown,
            Known(8000.0),
            FeedRequest::PerTooth { chip_load: Known(0.002), flutes: Unknown, feed_per_min: Unknown },
        );
        assert_eq!(
            resolve(IMPERIAL, &req, None),
            Err(CalcError::MissingInput(Missing::Flutes))
        );

        req.feed = FeedRequest::PerTooth { chip_load: Known(0.002), flutes: Known(0), feed_per_min: Unknown };
        assert!(matches!(
            resolve(IMPERIAL, &req, None),
            Err(CalcError::InvalidArgument { field: "flutes", .. })
        ));
    }

    #[test]
    fn test_chip_load_resolution() {
        let req = turning(
            Known(0.5),
            Unknown,
            Known(8000.0),
            FeedRequest::PerTooth { chip_load: Known(0.002), flutes: Known(4), feed_per_min: Unknown },
        );
        let res = resolve(IMPERIAL, &req, None).unwrap();
        assert!((res.cut.feed.feed_per_min() - 64.0).abs() < 1e-9);
    }

    #[test]
    fn test_clamp_recomputes_speed_and_feed() {
        // 0.25" drill at 1000 SFM wants ~15279 RPM
        let req = turning(Known(0.25), Known(1000.0), Unknown, per_rev(Known(0.004), Unknown));
        let limit = SpindleLimit { drive: Drive::Spindle, max_rpm: 6000.0 };
        let res = resolve(IMPERIAL, &req, Some(limit)).unwrap();

        let clamp = res.clamp.expect("rpm should be clamped");
        assert_eq!(clamp.max_rpm, 6000.0);
        assert!(clamp.requested_rpm > 15000.0);

        assert_eq!(res.cut.rpm, 6000.0);
        let expected_sfm = std::f64::consts::PI * 0.25 * 6000.0 / 12.0;
        assert!((res.cut.cutting_speed - expected_sfm).abs() < 1e-9);
        assert!((res.cut.feed.feed_per_min() - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_limit_means_unlimited() {
        let req = turning(Known(0.25), Known(1000.0), Unknown, per_rev(Known(0.004), Unknown));
        let limit = SpindleLimit { drive: Drive::LiveTool, max_rpm: 0.0 };
        let res = resolve(IMPERIAL, &req, Some(limit)).unwrap();
        assert!(res.clamp.is_none());
        assert!(res.cut.rpm > 15000.0);
    }

    #[test]
    fn test_with_feed_per_min_keeps_mode() {
        let feed = ResolvedFeed::PerTooth { chip_load: 0.004, flutes: 4, feed_per_min: 64.0 };
        let limited = feed.with_feed_per_min(32.0, 4000.0).unwrap();
        assert_eq!(
            limited,
            ResolvedFeed::PerTooth { chip_load: 0.002, flutes: 4, feed_per_min: 32.0 }
        );
    }

    #[test]
    fn test_input_from_option() {
        assert_eq!(Input::from(Some(2.5)), Known(2.5));
        assert_eq!(Input::<f64>::from(None), Unknown);
        let parsed: Input<f64> = serde_json::from_str("null").unwrap();
        assert_eq!(parsed, Unknown);
    }
}
