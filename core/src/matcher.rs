//! Nutrient-distance search for lower-emission substitutes.
//!
//! Candidates are the nutrient profiles of one food group, ranked by squared
//! Euclidean distance to the original over the ten tracked nutrients. The
//! ranking is a pure function of its inputs, so "try another" is just a
//! larger `attempt` index.

use crate::emission;
use crate::error::{EngineError, EngineResult};
use crate::models::{Alternative, NutrientProfile, Nutrients, RankedCandidate};
use crate::reference::ReferenceData;

/// Squared Euclidean distance; missing nutrients count as 0.0 on either side.
#[must_use]
pub fn nutrient_distance(a: &Nutrients, b: &Nutrients) -> f64 {
    a.to_vector()
        .iter()
        .zip(b.to_vector().iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum()
}

/// Profiles in `category` sorted by distance to `original`. Ties keep dataset order.
fn rank<'a>(
    data: &'a ReferenceData,
    category: &str,
    original: &NutrientProfile,
) -> Vec<(&'a NutrientProfile, f64)> {
    let mut ranked: Vec<(&NutrientProfile, f64)> = data
        .profiles()
        .iter()
        .filter(|p| p.food_group == category)
        .map(|p| (p, nutrient_distance(&original.nutrients, &p.nutrients)))
        .collect();
    // sort_by is stable
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked
}

fn original_profile<'a>(
    data: &'a ReferenceData,
    description: &str,
) -> EngineResult<&'a NutrientProfile> {
    data.profile(description)
        .ok_or_else(|| EngineError::ProfileNotFound(description.trim().to_string()))
}

/// The `attempt`-th closest profile in `category`, accepted only when its
/// emission factor is strictly below the original's.
pub fn closest_alternative(
    data: &ReferenceData,
    category: &str,
    description: &str,
    attempt: usize,
) -> EngineResult<Alternative> {
    let original = original_profile(data, description)?;
    let ranked = rank(data, category, original);

    let Some(&(candidate, distance)) = ranked.get(attempt) else {
        return Err(EngineError::ExhaustedCandidates {
            category: category.to_string(),
            attempt,
            available: ranked.len(),
        });
    };

    let original_factor = emission::emission_factor(data, &original.description)?;
    let not_improving = || EngineError::NoImprovingAlternative {
        original: original.description.clone(),
        candidate: candidate.description.clone(),
    };

    let candidate_factor = emission::emission_factor(data, &candidate.description)
        .map_err(|_| not_improving())?;
    if candidate_factor >= original_factor {
        tracing::debug!(
            candidate = %candidate.description,
            candidate_factor,
            original_factor,
            "candidate does not lower emissions"
        );
        return Err(not_improving());
    }

    Ok(Alternative {
        description: candidate.description.clone(),
        food_group: candidate.food_group.clone(),
        rank: attempt,
        distance,
        emission_factor: candidate_factor,
        original_emission_factor: original_factor,
    })
}

/// Full ranking for display, flagging which candidates would be accepted.
pub fn ranked_candidates(
    data: &ReferenceData,
    category: &str,
    description: &str,
) -> EngineResult<Vec<RankedCandidate>> {
    let original = original_profile(data, description)?;
    let original_factor = emission::emission_factor(data, &original.description).ok();

    Ok(rank(data, category, original)
        .into_iter()
        .map(|(p, distance)| {
            let emission_factor = emission::emission_factor(data, &p.description).ok();
            let improves = matches!(
                (emission_factor, original_factor),
                (Some(c), Some(o)) if c < o
            );
            RankedCandidate {
                description: p.description.clone(),
                food_group: p.food_group.clone(),
                distance,
                emission_factor,
                improves,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IngredientRecord, default_unit_rows};
    use crate::reference::CategoryAliasMap;
    use crate::reference::fixtures::{fat_and_protein, ingredient, profile, sample_data};

    const PORK: &str = "Pork, back ribs, lean and fat, raw";

    #[test]
    fn test_distance() {
        let a = fat_and_protein(10.0, 100.0, 1.0);
        let b = fat_and_protein(13.0, 96.0, 1.0);
        assert!((nutrient_distance(&a, &b) - 25.0).abs() < 1e-12);
        assert!(nutrient_distance(&a, &a).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_nutrients_count_as_zero() {
        let a = Nutrients {
            iron: Some(3.0),
            ..Nutrients::default()
        };
        let b = Nutrients {
            calcium: Some(4.0),
            ..Nutrients::default()
        };
        let d = nutrient_distance(&a, &b);
        assert!(!d.is_nan());
        assert!((d - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_closest_nut_for_pork() {
        let data = sample_data();
        // Pork: lipid 23, calcium 25, iron 0.9. Sunflower (51.5, 78, 5.3) is
        // closer than almonds (49.9, 269, 3.7) and walnuts (65.2, 98, 2.9).
        let alt = closest_alternative(&data, "Nuts and Seeds", PORK, 0).unwrap();
        assert_eq!(alt.description, "Seeds, sunflower seed kernels");
        assert_eq!(alt.rank, 0);
        assert!(alt.emission_factor < alt.original_emission_factor);
    }

    #[test]
    fn test_candidate_without_factor_is_rejected() {
        let data = sample_data();
        // Walnuts rank second and have no emission factor
        let err = closest_alternative(&data, "Nuts and Seeds", PORK, 1).unwrap_err();
        assert!(matches!(err, EngineError::NoImprovingAlternative { .. }));
        let alt = closest_alternative(&data, "Nuts and Seeds", PORK, 2).unwrap();
        assert_eq!(alt.description, "Nuts, almonds, dried");
    }

    #[test]
    fn test_exhausted_candidates() {
        let data = sample_data();
        let err = closest_alternative(&data, "Nuts and Seeds", PORK, 3).unwrap_err();
        assert_eq!(
            err,
            EngineError::ExhaustedCandidates {
                category: "Nuts and Seeds".to_string(),
                attempt: 3,
                available: 3,
            }
        );
        let err = closest_alternative(&data, "Spices and Herbs", PORK, 0).unwrap_err();
        assert!(matches!(err, EngineError::ExhaustedCandidates { available: 0, .. }));
    }

    #[test]
    fn test_profile_not_found() {
        let data = sample_data();
        assert_eq!(
            closest_alternative(&data, "Nuts and Seeds", "Unknown Food", 0).unwrap_err(),
            EngineError::ProfileNotFound("Unknown Food".to_string())
        );
    }

    #[test]
    fn test_never_returns_higher_emission() {
        let data = sample_data();
        // Cheddar (21.2) vs dairy: egg is lower, cheddar itself is not
        for attempt in 0..3 {
            match closest_alternative(&data, "Dairy and Egg Products", "Cheese, cheddar", attempt) {
                Ok(alt) => assert!(alt.emission_factor < alt.original_emission_factor),
                Err(err) => assert!(err.is_not_found()),
            }
        }
        // Rank 0 is cheddar itself at distance 0
        let err =
            closest_alternative(&data, "Dairy and Egg Products", "Cheese, cheddar", 0).unwrap_err();
        assert!(matches!(err, EngineError::NoImprovingAlternative { .. }));
    }

    #[test]
    fn test_distance_non_decreasing_with_attempt() {
        let data = sample_data();
        let ranked = ranked_candidates(&data, "Nuts and Seeds", PORK).unwrap();
        assert_eq!(ranked.len(), 3);
        for pair in ranked.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }

        let mut last = f64::NEG_INFINITY;
        let mut attempt = 0;
        loop {
            match closest_alternative(&data, "Nuts and Seeds", PORK, attempt) {
                Ok(alt) => {
                    assert!(alt.distance >= last);
                    last = alt.distance;
                }
                Err(EngineError::ExhaustedCandidates { .. }) => break,
                Err(EngineError::NoImprovingAlternative { .. }) => {
                    last = last.max(ranked[attempt].distance);
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
            attempt += 1;
        }
        assert_eq!(attempt, ranked.len());
    }

    #[test]
    fn test_ranked_candidates_flags_improvements() {
        let data = sample_data();
        let ranked = ranked_candidates(&data, "Nuts and Seeds", PORK).unwrap();
        assert!(ranked[0].improves);
        assert!(!ranked[1].improves);
        assert!(ranked[1].emission_factor.is_none());
        assert!(ranked[2].improves);
    }

    #[test]
    fn test_ties_keep_dataset_order() {
        let same = fat_and_protein(5.0, 5.0, 5.0);
        let ingredients: Vec<IngredientRecord> = vec![
            ingredient("Original", "Beef Products", Some(30.0)),
            ingredient("First twin", "Legumes and Legume Products", Some(1.0)),
            ingredient("Second twin", "Legumes and Legume Products", Some(1.0)),
        ];
        let data = ReferenceData::new(
            ingredients,
            vec![
                profile("Original", "Beef Products", same),
                profile("Second twin", "Legumes and Legume Products", same),
                profile("First twin", "Legumes and Legume Products", same),
            ],
            default_unit_rows(),
            vec![],
            CategoryAliasMap::default(),
        );
        let a0 = closest_alternative(&data, "Legumes and Legume Products", "Original", 0).unwrap();
        let a1 = closest_alternative(&data, "Legumes and Legume Products", "Original", 1).unwrap();
        assert_eq!(a0.description, "Second twin");
        assert_eq!(a1.description, "First twin");
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let data = sample_data();
        let a = closest_alternative(&data, "Nuts and Seeds", PORK, 2).unwrap();
        let b = closest_alternative(&data, "Nuts and Seeds", PORK, 2).unwrap();
        assert_eq!(a, b);
    }
}
