use crate::domain::model::ZoneAdjustment;
use crate::domain::ports::ZoneLookup;

/// Latitude band of one agro-ecological zone with its risk multiplier.
struct ZoneBand {
    max_latitude: f64,
    zone: &'static str,
    name: &'static str,
    multiplier: f64,
}

/// Static agro-ecological zone table for the Zimbabwe service area. Bands
/// run south to north: the lowveld carries the highest drought loading.
pub struct StaticZoneLookup {
    bands: Vec<ZoneBand>,
}

/// Service area bounding box; locations outside fall back to the standard
/// multiplier.
const LAT_RANGE: (f64, f64) = (-23.0, -15.0);
const LON_RANGE: (f64, f64) = (25.0, 34.0);

impl StaticZoneLookup {
    pub fn new() -> Self {
        Self {
            bands: vec![
                ZoneBand {
                    max_latitude: -21.0,
                    zone: "aez_5_lowveld",
                    name: "Natural Region V (lowveld)",
                    multiplier: 1.30,
                },
                ZoneBand {
                    max_latitude: -19.5,
                    zone: "aez_4_semi_extensive",
                    name: "Natural Region IV (semi-extensive)",
                    multiplier: 1.15,
                },
                ZoneBand {
                    max_latitude: -15.0,
                    zone: "aez_3_semi_intensive",
                    name: "Natural Region III (semi-intensive)",
                    multiplier: 1.0,
                },
            ],
        }
    }
}

impl Default for StaticZoneLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoneLookup for StaticZoneLookup {
    fn zone_for(&self, latitude: f64, longitude: f64) -> ZoneAdjustment {
        let in_area = (LAT_RANGE.0..=LAT_RANGE.1).contains(&latitude)
            && (LON_RANGE.0..=LON_RANGE.1).contains(&longitude);
        if !in_area {
            return ZoneAdjustment::standard();
        }
        for band in &self.bands {
            if latitude <= band.max_latitude {
                return ZoneAdjustment {
                    zone: band.zone.to_string(),
                    name: band.name.to_string(),
                    multiplier: band.multiplier,
                };
            }
        }
        ZoneAdjustment::standard()
    }
}
