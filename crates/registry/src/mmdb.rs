//! MaxMind DB (`.mmdb`) reader, as published by db-ip and MaxMind.

use crate::error::{ErrorKind, Result};
use crate::reader::{DatabaseMetadata, GeoReader, Opener};
use crate::record::{GeoRecord, Location, Place};
use exn::ResultExt;
use maxminddb::{MaxMindDBError, Reader, geoip2};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::instrument;

const LANGUAGE: &str = "en";

/// Opens MaxMind DB files fully into memory.
#[derive(Clone, Copy, Debug, Default)]
pub struct MmdbOpener;

impl Opener for MmdbOpener {
    #[instrument(skip(self), fields(path = %path.display()))]
    fn open(&self, path: &Path) -> Result<Box<dyn GeoReader>> {
        let reader = Reader::open_readfile(path).or_raise(|| ErrorKind::Open(path.to_path_buf()))?;
        tracing::debug!(
            database_type = %reader.metadata.database_type,
            nodes = reader.metadata.node_count,
            "Opened MaxMind database",
        );
        Ok(Box::new(MmdbReader { reader }))
    }
}

pub struct MmdbReader {
    reader: Reader<Vec<u8>>,
}

impl GeoReader for MmdbReader {
    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoRecord>> {
        match self.reader.lookup::<geoip2::City>(ip) {
            Ok(city) => Ok(Some(convert(&city))),
            Err(MaxMindDBError::AddressNotFoundError(_)) => Ok(None),
            Err(err) => Err(err).or_raise(|| ErrorKind::Lookup(ip.to_string())),
        }
    }

    fn metadata(&self) -> DatabaseMetadata {
        let metadata = &self.reader.metadata;
        let built_at = i64::try_from(metadata.build_epoch)
            .ok()
            .and_then(|epoch| OffsetDateTime::from_unix_timestamp(epoch).ok())
            .and_then(|at| at.format(&Rfc3339).ok());
        DatabaseMetadata {
            database_type: metadata.database_type.clone(),
            description: metadata.description.get(LANGUAGE).cloned(),
            build_epoch: metadata.build_epoch,
            built_at,
            ip_version: metadata.ip_version,
            node_count: metadata.node_count,
            languages: metadata.languages.clone(),
        }
    }
}

fn name(names: &Option<BTreeMap<&str, &str>>) -> Option<String> {
    names.as_ref().and_then(|names| names.get(LANGUAGE)).map(|name| name.to_string())
}

fn convert(city: &geoip2::City<'_>) -> GeoRecord {
    GeoRecord {
        continent: city.continent.as_ref().map(|c| Place {
            code: c.code.map(str::to_string),
            geoname_id: c.geoname_id,
            name: name(&c.names),
        }),
        country: city.country.as_ref().map(|c| Place {
            code: c.iso_code.map(str::to_string),
            geoname_id: c.geoname_id,
            name: name(&c.names),
        }),
        in_european_union: city.country.as_ref().and_then(|c| c.is_in_european_union),
        subdivisions: city
            .subdivisions
            .iter()
            .flatten()
            .map(|s| Place {
                code: s.iso_code.map(str::to_string),
                geoname_id: s.geoname_id,
                name: name(&s.names),
            })
            .collect(),
        city: city.city.as_ref().map(|c| Place {
            code: None,
            geoname_id: c.geoname_id,
            name: name(&c.names),
        }),
        location: city.location.as_ref().map(|l| Location {
            latitude: l.latitude,
            longitude: l.longitude,
            time_zone: l.time_zone.map(str::to_string),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// The subset of MaxMind DB data types the fixture needs.
    enum Value {
        Str(&'static str),
        U16(u16),
        U32(u32),
        U64(u64),
        F64(f64),
        Bool(bool),
        Map(Vec<(&'static str, Value)>),
        Array(Vec<Value>),
    }

    fn control(out: &mut Vec<u8>, kind: u8, size: usize) {
        let size = u8::try_from(size).ok().filter(|size| *size < 29).unwrap();
        if kind <= 7 {
            out.push(kind << 5 | size);
        } else {
            out.push(size);
            out.push(kind - 7);
        }
    }

    fn encode(value: &Value, out: &mut Vec<u8>) {
        match value {
            Value::Str(s) => {
                control(out, 2, s.len());
                out.extend_from_slice(s.as_bytes());
            },
            Value::F64(n) => {
                control(out, 3, 8);
                out.extend_from_slice(&n.to_be_bytes());
            },
            Value::U16(n) => {
                control(out, 5, 2);
                out.extend_from_slice(&n.to_be_bytes());
            },
            Value::U32(n) => {
                control(out, 6, 4);
                out.extend_from_slice(&n.to_be_bytes());
            },
            Value::Map(entries) => {
                control(out, 7, entries.len());
                for (key, value) in entries {
                    encode(&Value::Str(key), out);
                    encode(value, out);
                }
            },
            Value::U64(n) => {
                control(out, 9, 8);
                out.extend_from_slice(&n.to_be_bytes());
            },
            Value::Array(items) => {
                control(out, 11, items.len());
                for item in items {
                    encode(item, out);
                }
            },
            Value::Bool(b) => control(out, 14, usize::from(*b)),
        }
    }

    fn english(name: &'static str) -> Value {
        Value::Map(vec![("en", Value::Str(name))])
    }

    /// An IPv4 database with one node: `0.0.0.0/1` resolves to a Mountain
    /// View record, `128.0.0.0/1` to nothing.
    fn fixture() -> Vec<u8> {
        use Value::*;
        let record = Map(vec![
            ("city", Map(vec![("geoname_id", U32(5_375_480)), ("names", english("Mountain View"))])),
            (
                "continent",
                Map(vec![
                    ("code", Str("NA")),
                    ("geoname_id", U32(6_255_149)),
                    ("names", english("North America")),
                ]),
            ),
            (
                "country",
                Map(vec![
                    ("geoname_id", U32(6_252_001)),
                    ("is_in_european_union", Bool(false)),
                    ("iso_code", Str("US")),
                    ("names", english("United States")),
                ]),
            ),
            (
                "location",
                Map(vec![
                    ("latitude", F64(37.386)),
                    ("longitude", F64(-122.0838)),
                    ("time_zone", Str("America/Los_Angeles")),
                ]),
            ),
            (
                "subdivisions",
                Array(vec![Map(vec![
                    ("geoname_id", U32(5_332_921)),
                    ("iso_code", Str("CA")),
                    ("names", english("California")),
                ])]),
            ),
        ]);
        let metadata = Map(vec![
            ("binary_format_major_version", U16(2)),
            ("binary_format_minor_version", U16(0)),
            ("build_epoch", U64(1_656_633_600)),
            ("database_type", Str("DBIP-City-Lite")),
            ("description", english("IP to City Lite")),
            ("ip_version", U16(4)),
            ("languages", Array(vec![Str("en")])),
            ("node_count", U32(1)),
            ("record_size", U16(24)),
        ]);

        // Left record points at data offset 0 (node count + 16), right is "not found".
        let mut db = vec![0, 0, 17, 0, 0, 1];
        db.extend_from_slice(&[0; 16]);
        encode(&record, &mut db);
        db.extend_from_slice(b"\xab\xcd\xefMaxMind.com");
        encode(&metadata, &mut db);
        db
    }

    fn open_fixture() -> (tempfile::TempDir, Box<dyn GeoReader>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dbip-city-lite-2022-07.mmdb");
        std::fs::write(&path, fixture()).unwrap();
        let reader = MmdbOpener.open(&path).unwrap();
        (dir, reader)
    }

    #[test]
    fn test_lookup_converts_city_record() {
        let (_dir, reader) = open_fixture();
        let record = reader.lookup("8.8.8.8".parse().unwrap()).unwrap().unwrap();
        let expected = GeoRecord {
            continent: Some(Place {
                code: Some("NA".into()),
                geoname_id: Some(6_255_149),
                name: Some("North America".into()),
            }),
            country: Some(Place {
                code: Some("US".into()),
                geoname_id: Some(6_252_001),
                name: Some("United States".into()),
            }),
            in_european_union: Some(false),
            subdivisions: vec![Place {
                code: Some("CA".into()),
                geoname_id: Some(5_332_921),
                name: Some("California".into()),
            }],
            city: Some(Place {
                code: None,
                geoname_id: Some(5_375_480),
                name: Some("Mountain View".into()),
            }),
            location: Some(Location {
                latitude: Some(37.386),
                longitude: Some(-122.0838),
                time_zone: Some("America/Los_Angeles".into()),
            }),
        };
        assert_eq!(record, expected);
    }

    #[rstest]
    #[case::covered("8.8.8.8", Some("8.8.8.8,United States,California,Mountain View,North America"))]
    #[case::same_half("1.1.1.1", Some("1.1.1.1,United States,California,Mountain View,North America"))]
    #[case::not_covered("203.0.113.9", None)]
    fn test_lookup_coverage(#[case] ip: &str, #[case] expected: Option<&str>) {
        let (_dir, reader) = open_fixture();
        let ip: IpAddr = ip.parse().unwrap();
        let line = reader.lookup(ip).unwrap().map(|record| record.summary_line(ip));
        assert_eq!(line.as_deref(), expected);
    }

    #[test]
    fn test_metadata() {
        let (_dir, reader) = open_fixture();
        assert_eq!(
            reader.metadata(),
            DatabaseMetadata {
                database_type: "DBIP-City-Lite".into(),
                description: Some("IP to City Lite".into()),
                build_epoch: 1_656_633_600,
                built_at: Some("2022-07-01T00:00:00Z".into()),
                ip_version: 4,
                node_count: 1,
                languages: vec!["en".into()],
            }
        );
    }

    #[rstest]
    #[case::html(b"<html>404 Not Found</html>")]
    #[case::empty(b"")]
    fn test_open_rejects_garbage(#[case] contents: &[u8]) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dbip-city-lite-2022-07.mmdb");
        std::fs::write(&path, contents).unwrap();
        let err = MmdbOpener.open(&path).err().unwrap();
        assert_eq!(*err, ErrorKind::Open(path));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dbip-city-lite-2022-07.mmdb");
        assert!(MmdbOpener.open(&path).is_err());
    }
}
