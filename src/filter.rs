use crate::feature::Feature;
use crate::geo::Coordinate;

/// Features within `radius_m` of `center`, boundary inclusive, in input order.
/// No center or no features yields an empty set; both mean "not ready yet".
pub fn filter_by_radius<'a>(
    features: Option<&'a [Feature]>,
    center: Option<Coordinate>,
    radius_m: f64,
) -> Vec<&'a Feature> {
    within_radius(features, center, radius_m)
        .into_iter()
        .map(|(feature, _)| feature)
        .collect()
}

/// Same selection as [`filter_by_radius`], keeping the distance of each hit.
pub fn within_radius<'a>(
    features: Option<&'a [Feature]>,
    center: Option<Coordinate>,
    radius_m: f64,
) -> Vec<(&'a Feature, f64)> {
    let (features, center) = match (features, center) {
        (Some(features), Some(center)) => (features, center),
        _ => return Vec::new(),
    };
    features
        .iter()
        .filter_map(|feature| {
            // Features without a usable position are skipped.
            let at = feature.coordinate()?;
            let distance = center.distance_to(&at);
            (distance <= radius_m).then_some((feature, distance))
        })
        .collect()
}
