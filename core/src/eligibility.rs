use crate::emission;
use crate::reference::ReferenceData;

/// Food groups whose aggregate footprint is lower than the ingredient's own
/// emission factor, in alias-map order.
///
/// Returns an empty list when the ingredient or its factor is unknown.
#[must_use]
pub fn eligible_categories(data: &ReferenceData, description: &str) -> Vec<String> {
    let factor = match emission::emission_factor(data, description) {
        Ok(f) => f,
        Err(err) => {
            tracing::debug!(%description, error = %err, "no eligible categories");
            return Vec::new();
        }
    };

    let aliases = data.aliases();
    let lower: Vec<&str> = data
        .footprints()
        .iter()
        .filter(|row| row.emission_per_kg < factor)
        .map(|row| row.label.as_str())
        .filter(|label| aliases.has_label(label))
        .collect();

    let groups: Vec<String> = aliases
        .iter()
        .filter(|(_, label)| lower.contains(label))
        .map(|(group, _)| group.to_string())
        .collect();

    tracing::debug!(%description, factor, eligible = groups.len(), "resolved eligible categories");
    groups
}
