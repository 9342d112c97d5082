use std::io::Write;

use anyhow::Result;
use csv::Writer;
use fnv::FnvHashMap;
use ordered_float::OrderedFloat;

use crate::feature::Feature;
use crate::geo::Coordinate;
use crate::markers::{ParkingSign, SignKind};

/// One marker per row, in the order the features came in.
pub fn write_markers<W: Write>(
    out: W,
    center: Coordinate,
    features: &[Feature],
) -> Result<usize> {
    let mut wtr = Writer::from_writer(out);
    wtr.write_record([
        "kind",
        "category",
        "description",
        "borough",
        "status",
        "lat",
        "lon",
        "distance_m",
        "post_id",
    ])?;
    let mut written = 0;
    for feature in features {
        let at = match feature.coordinate() {
            Some(at) => at,
            None => continue,
        };
        let sign = ParkingSign::new(feature);
        wtr.write_record(&[
            sign.kind().to_string(),
            sign.category().to_string(),
            sign.description(),
            sign.borough().to_string(),
            sign.status().unwrap_or_default().to_string(),
            format!("{:.6}", at.lat),
            format!("{:.6}", at.lon),
            format!("{:.1}", center.distance_to(&at)),
            sign.post_id().unwrap_or_default(),
        ])?;
        written += 1;
    }
    wtr.flush()?;
    Ok(written)
}

#[derive(Debug, Default)]
pub struct Summary {
    pub total: usize,
    pub by_kind: FnvHashMap<SignKind, usize>,
    pub by_borough: FnvHashMap<String, usize>,
    pub nearest_m: Option<f64>,
}

impl Summary {
    pub fn from_features(center: Coordinate, features: &[Feature]) -> Self {
        let mut summary = Summary::default();
        let mut nearest: Option<OrderedFloat<f64>> = None;
        // Same rows as `write_markers`: no position, no marker.
        for (feature, at) in features
            .iter()
            .filter_map(|f| f.coordinate().map(|at| (f, at)))
        {
            let sign = ParkingSign::new(feature);
            summary.total += 1;
            *summary.by_kind.entry(sign.kind()).or_insert(0) += 1;
            *summary
                .by_borough
                .entry(sign.borough().to_string())
                .or_insert(0) += 1;
            let d = OrderedFloat(center.distance_to(&at));
            nearest = Some(nearest.map_or(d, |n| n.min(d)));
        }
        summary.nearest_m = nearest.map(|d| d.into_inner());
        summary
    }

    pub fn print(&self, radius_m: f64) {
        println!("{} signs within {}m", self.total, radius_m);
        let mut kinds: Vec<_> = self.by_kind.iter().collect();
        kinds.sort();
        for (kind, count) in kinds {
            println!("  {:<12} {}", kind, count);
        }
        let mut boroughs: Vec<_> = self.by_borough.iter().collect();
        boroughs.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (borough, count) in boroughs {
            println!("  {:<40} {}", borough, count);
        }
        if let Some(d) = self.nearest_m {
            println!("Nearest sign (m): {:.1}", d);
        }
    }
}
