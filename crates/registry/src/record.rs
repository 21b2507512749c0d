use serde::Serialize;
use std::net::IpAddr;

/// A named geographic entity: continent, country, subdivision or city.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Place {
    /// Continent code or ISO code, when the database has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geoname_id: Option<u32>,
    /// English name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
impl Place {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Geolocation of a single IP address.
///
/// Owned, so a caller never keeps the database it came from alive any
/// longer than the lookup itself.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GeoRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continent: Option<Place>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<Place>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_european_union: Option<bool>,
    /// Most significant first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subdivisions: Vec<Place>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<Place>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}
impl GeoRecord {
    pub fn country_name(&self) -> Option<&str> {
        self.country.as_ref().and_then(|p| p.name.as_deref())
    }

    /// One line of comma-separated text:
    /// `ip,country,subdivision,city,continent`, with empty fields where the
    /// database has no answer.
    ///
    /// # Examples
    ///
    /// ```
    /// use ipgeo_registry::{GeoRecord, Place};
    ///
    /// let record = GeoRecord {
    ///     country: Some(Place::named("United States").with_code("US")),
    ///     subdivisions: vec![Place::named("California")],
    ///     city: Some(Place::named("Mountain View")),
    ///     continent: Some(Place::named("North America").with_code("NA")),
    ///     ..GeoRecord::default()
    /// };
    /// assert_eq!(
    ///     record.summary_line("8.8.8.8".parse().unwrap()),
    ///     "8.8.8.8,United States,California,Mountain View,North America",
    /// );
    /// ```
    pub fn summary_line(&self, ip: IpAddr) -> String {
        let name = |place: Option<&Place>| place.and_then(|p| p.name.as_deref()).unwrap_or_default().to_string();
        [
            ip.to_string(),
            name(self.country.as_ref()),
            name(self.subdivisions.first()),
            name(self.city.as_ref()),
            name(self.continent.as_ref()),
        ]
        .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line_missing_fields() {
        let record = GeoRecord {
            country: Some(Place::named("Australia").with_code("AU")),
            ..GeoRecord::default()
        };
        assert_eq!(record.summary_line("1.1.1.1".parse().unwrap()), "1.1.1.1,Australia,,,");
        assert_eq!(record.country_name(), Some("Australia"));
    }

    #[test]
    fn test_serialize_skips_empty_fields() {
        let record = GeoRecord {
            country: Some(Place::named("Australia").with_code("AU")),
            ..GeoRecord::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"country":{"code":"AU","name":"Australia"}}"#);
    }
}
