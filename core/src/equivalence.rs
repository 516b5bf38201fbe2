use crate::models::Equivalences;

/// kg CO2e emitted per km by an average passenger vehicle.
pub const VEHICLE_KG_PER_KM: f64 = 0.65;
/// kg CO2e a mature tree absorbs in a day.
pub const TREE_KG_PER_DAY: f64 = 0.0685;

#[must_use]
pub fn to_vehicle_distance(kg_co2: f64) -> f64 {
    kg_co2 / VEHICLE_KG_PER_KM
}

/// Trees needed to absorb `kg_co2` in a day, rounded up. Zero for non-positive input.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn to_tree_count(kg_co2: f64) -> u64 {
    if kg_co2 <= 0.0 || !kg_co2.is_finite() {
        return 0;
    }
    (kg_co2 / TREE_KG_PER_DAY).ceil() as u64
}

#[must_use]
pub fn equivalences(kg_co2: f64) -> Equivalences {
    Equivalences {
        kg_co2,
        vehicle_km: to_vehicle_distance(kg_co2),
        trees: to_tree_count(kg_co2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_kg() {
        let eq = equivalences(4.0);
        assert!((eq.vehicle_km - 6.153_846).abs() < 1e-6);
        // 4.0 / 0.0685 = 58.39...
        assert_eq!(eq.trees, 59);
    }

    #[test]
    fn test_exact_multiple_is_not_rounded_up() {
        assert_eq!(to_tree_count(0.0685 * 2.0), 2);
    }

    #[test]
    fn test_non_positive() {
        assert_eq!(to_tree_count(0.0), 0);
        assert_eq!(to_tree_count(-3.0), 0);
        assert!((to_vehicle_distance(-0.65) + 1.0).abs() < 1e-12);
    }
}
