use std::collections::HashMap;

use crate::domain::model::{Crop, Phase};
use crate::utils::error::{QuoteError, Result};

/// Tolerance on the phase-weight sum check.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Immutable catalog of crop season lengths and phase definitions.
/// Constructed once at process start and handed by reference into each
/// computation; lookup is case-insensitive and alias-aware.
pub struct CropRegistry {
    crops: HashMap<String, Crop>,
    aliases: HashMap<&'static str, &'static str>,
}

impl CropRegistry {
    /// Build the registry with the built-in crop catalog. Fails fast when a
    /// crop's phases do not partition the season or its weights do not sum
    /// to 1.0.
    pub fn new() -> Result<Self> {
        Self::from_crops(builtin_crops())
    }

    pub fn from_crops(crops: Vec<Crop>) -> Result<Self> {
        let mut map = HashMap::new();
        for crop in crops {
            validate_crop(&crop)?;
            map.insert(crop.name.clone(), crop);
        }
        Ok(Self {
            crops: map,
            aliases: builtin_aliases(),
        })
    }

    pub fn get(&self, name: &str) -> Result<&Crop> {
        let normalized = name.trim().to_lowercase();
        let resolved = self
            .aliases
            .get(normalized.as_str())
            .copied()
            .unwrap_or(normalized.as_str());
        self.crops.get(resolved).ok_or_else(|| {
            let mut available: Vec<&str> = self.crops.keys().map(String::as_str).collect();
            available.sort_unstable();
            QuoteError::UnknownCrop {
                name: name.to_string(),
                available: available.join(", "),
            }
        })
    }

    pub fn crop_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.crops.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn validate_crop(crop: &Crop) -> Result<()> {
    let config_err = |message: String| QuoteError::Config {
        field: format!("crop.{}", crop.name),
        message,
    };

    if crop.phases.is_empty() {
        return Err(config_err("crop has no phases".to_string()));
    }

    let weight_sum: f64 = crop.phases.iter().map(|p| p.weight).sum();
    if (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(config_err(format!(
            "phase weights sum to {weight_sum}, expected 1.0"
        )));
    }

    let mut expected_start = 0;
    for phase in &crop.phases {
        if phase.start_day != expected_start {
            return Err(config_err(format!(
                "phase '{}' starts at day {}, expected {} (phases must be contiguous)",
                phase.name, phase.start_day, expected_start
            )));
        }
        if phase.end_day <= phase.start_day {
            return Err(config_err(format!(
                "phase '{}' has end_day {} <= start_day {}",
                phase.name, phase.end_day, phase.start_day
            )));
        }
        if phase.weight < 0.0 {
            return Err(config_err(format!(
                "phase '{}' has negative weight",
                phase.name
            )));
        }
        if phase.exit_mm > phase.trigger_mm {
            return Err(config_err(format!(
                "phase '{}' has exit_mm {} above trigger_mm {}",
                phase.name, phase.exit_mm, phase.trigger_mm
            )));
        }
        expected_start = phase.end_day;
    }
    if expected_start != crop.season_days {
        return Err(config_err(format!(
            "phases end at day {expected_start}, season is {} days",
            crop.season_days
        )));
    }

    Ok(())
}

fn phase(name: &str, start_day: u32, end_day: u32, weight: f64, trigger_mm: f64, exit_mm: f64) -> Phase {
    Phase {
        name: name.to_string(),
        start_day,
        end_day,
        weight,
        trigger_mm,
        exit_mm,
    }
}

fn crop(name: &str, season_days: u32, germination_mm: f64, phases: Vec<Phase>) -> Crop {
    Crop {
        name: name.to_string(),
        season_days,
        germination_mm,
        phases,
    }
}

/// Built-in phenology catalog for the 9 supported crops. Phase windows are
/// half-open `[start_day, end_day)` partitions of the season; triggers and
/// exits are cumulative-rainfall thresholds in mm per phase.
fn builtin_crops() -> Vec<Crop> {
    vec![
        crop(
            "maize",
            120,
            20.0,
            vec![
                phase("Emergence", 0, 15, 0.15, 25.0, 5.0),
                phase("Vegetative", 15, 50, 0.25, 60.0, 15.0),
                phase("Flowering", 50, 85, 0.40, 80.0, 20.0),
                phase("Grain Fill", 85, 120, 0.20, 70.0, 10.0),
            ],
        ),
        crop(
            "sorghum",
            105,
            15.0,
            vec![
                phase("Emergence", 0, 13, 0.15, 20.0, 3.0),
                phase("Vegetative", 13, 39, 0.25, 50.0, 10.0),
                phase("Flowering", 39, 74, 0.40, 70.0, 15.0),
                phase("Grain Fill", 74, 105, 0.20, 60.0, 8.0),
            ],
        ),
        crop(
            "soyabeans",
            115,
            20.0,
            vec![
                phase("Emergence", 0, 15, 0.15, 20.0, 3.0),
                phase("Vegetative", 15, 43, 0.25, 55.0, 12.0),
                phase("Flowering", 43, 78, 0.40, 75.0, 18.0),
                phase("Pod Fill", 78, 115, 0.20, 65.0, 8.0),
            ],
        ),
        crop(
            "cotton",
            130,
            20.0,
            vec![
                phase("Emergence", 0, 16, 0.15, 22.0, 4.0),
                phase("Vegetative", 16, 56, 0.25, 55.0, 12.0),
                phase("Flowering", 56, 91, 0.40, 85.0, 20.0),
                phase("Boll Fill", 91, 130, 0.20, 75.0, 10.0),
            ],
        ),
        crop(
            "groundnuts",
            100,
            18.0,
            vec![
                phase("Emergence", 0, 13, 0.15, 18.0, 3.0),
                phase("Vegetative", 13, 39, 0.25, 45.0, 10.0),
                phase("Flowering", 39, 71, 0.40, 70.0, 15.0),
                phase("Pod Fill", 71, 100, 0.20, 55.0, 8.0),
            ],
        ),
        crop(
            "wheat",
            95,
            15.0,
            vec![
                phase("Emergence", 0, 13, 0.15, 15.0, 2.0),
                phase("Vegetative", 13, 43, 0.25, 40.0, 8.0),
                phase("Flowering", 43, 71, 0.40, 65.0, 12.0),
                phase("Grain Fill", 71, 95, 0.20, 50.0, 5.0),
            ],
        ),
        crop(
            "barley",
            95,
            15.0,
            vec![
                phase("Emergence", 0, 13, 0.15, 15.0, 2.0),
                phase("Vegetative", 13, 43, 0.25, 40.0, 8.0),
                phase("Flowering", 43, 71, 0.40, 65.0, 12.0),
                phase("Grain Fill", 71, 95, 0.20, 50.0, 5.0),
            ],
        ),
        crop(
            "millet",
            95,
            12.0,
            vec![
                phase("Emergence", 0, 11, 0.15, 12.0, 2.0),
                phase("Vegetative", 11, 39, 0.25, 35.0, 8.0),
                phase("Flowering", 39, 66, 0.40, 60.0, 12.0),
                phase("Grain Fill", 66, 95, 0.20, 45.0, 5.0),
            ],
        ),
        crop(
            "tobacco",
            120,
            20.0,
            vec![
                phase("Emergence", 0, 15, 0.15, 22.0, 4.0),
                phase("Vegetative", 15, 51, 0.25, 55.0, 12.0),
                phase("Flowering", 51, 81, 0.40, 75.0, 18.0),
                phase("Maturation", 81, 120, 0.20, 65.0, 8.0),
            ],
        ),
    ]
}

fn builtin_aliases() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("corn", "maize"),
        ("soya", "soyabeans"),
        ("soy", "soyabeans"),
        ("soybeans", "soyabeans"),
        ("peanuts", "groundnuts"),
        ("groundnut", "groundnuts"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_holds_all_nine_crops() {
        let registry = CropRegistry::new().unwrap();
        let expected = [
            "barley",
            "cotton",
            "groundnuts",
            "maize",
            "millet",
            "sorghum",
            "soyabeans",
            "tobacco",
            "wheat",
        ];
        assert_eq!(registry.crop_names(), expected);
    }

    #[test]
    fn lookup_is_case_insensitive_and_trims() {
        let registry = CropRegistry::new().unwrap();
        assert_eq!(registry.get("  MAIZE ").unwrap().name, "maize");
        assert_eq!(registry.get("Sorghum").unwrap().name, "sorghum");
    }

    #[test]
    fn aliases_resolve() {
        let registry = CropRegistry::new().unwrap();
        assert_eq!(registry.get("corn").unwrap().name, "maize");
        assert_eq!(registry.get("soy").unwrap().name, "soyabeans");
        assert_eq!(registry.get("peanuts").unwrap().name, "groundnuts");
    }

    #[test]
    fn unknown_crop_lists_available() {
        let registry = CropRegistry::new().unwrap();
        match registry.get("quinoa") {
            Err(QuoteError::UnknownCrop { name, available }) => {
                assert_eq!(name, "quinoa");
                assert!(available.contains("maize"));
            }
            other => panic!("expected UnknownCrop, got {other:?}"),
        }
    }

    #[test]
    fn every_builtin_crop_partitions_its_season() {
        for crop in builtin_crops() {
            let weight_sum: f64 = crop.phases.iter().map(|p| p.weight).sum();
            assert!(
                (weight_sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE,
                "{}: weights sum to {weight_sum}",
                crop.name
            );
            assert_eq!(crop.phases[0].start_day, 0, "{}", crop.name);
            assert_eq!(
                crop.phases.last().unwrap().end_day,
                crop.season_days,
                "{}",
                crop.name
            );
        }
    }

    #[test]
    fn construction_rejects_bad_weight_sum() {
        let bad = crop(
            "maize",
            30,
            20.0,
            vec![
                phase("Emergence", 0, 15, 0.5, 25.0, 5.0),
                phase("Vegetative", 15, 30, 0.4, 60.0, 15.0),
            ],
        );
        assert!(CropRegistry::from_crops(vec![bad]).is_err());
    }

    #[test]
    fn construction_rejects_gapped_phases() {
        let bad = crop(
            "maize",
            30,
            20.0,
            vec![
                phase("Emergence", 0, 14, 0.5, 25.0, 5.0),
                phase("Vegetative", 15, 30, 0.5, 60.0, 15.0),
            ],
        );
        assert!(CropRegistry::from_crops(vec![bad]).is_err());
    }

    #[test]
    fn construction_rejects_exit_above_trigger() {
        let bad = crop(
            "maize",
            30,
            20.0,
            vec![
                phase("Emergence", 0, 15, 0.5, 5.0, 25.0),
                phase("Vegetative", 15, 30, 0.5, 60.0, 15.0),
            ],
        );
        assert!(CropRegistry::from_crops(vec![bad]).is_err());
    }
}
