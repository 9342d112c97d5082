use std::fmt;

use serde_json::Value;

use crate::feature::Feature;

const CATEGORY: &str = "DESCRIPTION_CAT";
const DESCRIPTION: &str = "DESCRIPTION_RPA";
const BOROUGH: &str = "NOM_ARROND";
const STATUS: &str = "DESCRIPTION_REP";
const POST_ID: &str = "POTEAU_ID_POT";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignKind {
    Standard,
    Paid,
    Motorcycle,
}

impl SignKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignKind::Standard => "standard",
            SignKind::Paid => "paid",
            SignKind::Motorcycle => "motorcycle",
        }
    }
}

impl fmt::Display for SignKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Read-only view over the attributes the backend puts on a parking sign.
pub struct ParkingSign<'a> {
    feature: &'a Feature,
}

impl<'a> ParkingSign<'a> {
    pub fn new(feature: &'a Feature) -> Self {
        Self { feature }
    }

    pub fn category(&self) -> &'a str {
        self.feature.property_str(CATEGORY).unwrap_or("Parking")
    }

    fn raw_description(&self) -> &'a str {
        self.feature.property_str(DESCRIPTION).unwrap_or("")
    }

    /// `\P` is the sign's "parking" glyph in the source data.
    pub fn description(&self) -> String {
        let raw = self.raw_description();
        if raw.is_empty() {
            return String::from("No description");
        }
        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;
        while let Some(idx) = rest.find("\\P") {
            out.push_str(&rest[..idx]);
            out.push_str("P ");
            rest = rest[idx + 2..].trim_start();
        }
        out.push_str(rest);
        out
    }

    pub fn borough(&self) -> &'a str {
        self.feature.property_str(BOROUGH).unwrap_or("Unknown")
    }

    pub fn status(&self) -> Option<&'a str> {
        self.feature
            .property_str(STATUS)
            .filter(|status| !status.is_empty())
    }

    /// Post ids come as numbers or strings depending on the export.
    pub fn post_id(&self) -> Option<String> {
        match self.feature.properties.get(POST_ID)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn kind(&self) -> SignKind {
        let description = self.raw_description();
        if description.contains("RESERVE MOTOS") {
            SignKind::Motorcycle
        } else if self
            .feature
            .property_str(CATEGORY)
            .map(|c| c.starts_with("STAT-$"))
            .unwrap_or(false)
            || description == "PARCOMETRE"
        {
            SignKind::Paid
        } else {
            SignKind::Standard
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use serde_json::json;

    fn feature(props: Value) -> Feature {
        let properties = match props {
            Value::Object(map) => map,
            _ => panic!("properties must be an object"),
        };
        Feature::point(Coordinate::new(45.5, -73.5), properties)
    }

    #[test]
    fn classifies_signs() {
        let moto = feature(json!({ "DESCRIPTION_RPA": "\\P RESERVE MOTOS" }));
        assert_eq!(ParkingSign::new(&moto).kind(), SignKind::Motorcycle);

        let meter = feature(json!({ "DESCRIPTION_RPA": "PARCOMETRE" }));
        assert_eq!(ParkingSign::new(&meter).kind(), SignKind::Paid);

        let paid = feature(json!({ "DESCRIPTION_CAT": "STAT-$-MAX", "DESCRIPTION_RPA": "P 2H" }));
        assert_eq!(ParkingSign::new(&paid).kind(), SignKind::Paid);

        let plain = feature(json!({ "DESCRIPTION_CAT": "STATIONNEMENT" }));
        assert_eq!(ParkingSign::new(&plain).kind(), SignKind::Standard);
    }

    #[test]
    fn motorcycle_beats_paid() {
        let both = feature(json!({ "DESCRIPTION_CAT": "STAT-$", "DESCRIPTION_RPA": "\\P RESERVE MOTOS" }));
        assert_eq!(ParkingSign::new(&both).kind(), SignKind::Motorcycle);
    }

    #[test]
    fn fallbacks() {
        let bare = feature(json!({}));
        let sign = ParkingSign::new(&bare);
        assert_eq!(sign.category(), "Parking");
        assert_eq!(sign.description(), "No description");
        assert_eq!(sign.borough(), "Unknown");
        assert_eq!(sign.status(), None);
        assert_eq!(sign.post_id(), None);
    }

    #[test]
    fn cleans_description_and_reads_ids() {
        let f = feature(json!({
            "DESCRIPTION_RPA": "\\P  08h-09h LUN. AU VEN.",
            "DESCRIPTION_REP": "Réel",
            "POTEAU_ID_POT": 1234
        }));
        let sign = ParkingSign::new(&f);
        assert_eq!(sign.description(), "P 08h-09h LUN. AU VEN.");
        assert_eq!(sign.status(), Some("Réel"));
        assert_eq!(sign.post_id().as_deref(), Some("1234"));
    }
}
