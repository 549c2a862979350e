//! Site registry: named sample points read from a header-less `id,lat,lon` CSV.

use crate::{Result, SeriesError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// A named sample location in geographic degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Unique identifier.
    pub id: String,
    /// Latitude, -90..=90.
    pub lat: f64,
    /// Longitude, -180..=180.
    pub lon: f64,
}

impl Site {
    /// Create a validated site.
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Result<Self> {
        let site = Self {
            id: id.into(),
            lat,
            lon,
        };
        site.validate()?;
        Ok(site)
    }

    /// `(lat, lon)` pair.
    pub fn coordinate(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: String| SeriesError::InvalidSite {
            id: self.id.clone(),
            reason,
        };
        if self.id.is_empty() {
            return Err(invalid("empty id".to_string()));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(invalid(format!("latitude {} outside -90..90", self.lat)));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(invalid(format!("longitude {} outside -180..180", self.lon)));
        }
        Ok(())
    }
}

/// Load sites from a registry file, preserving file order.
pub fn load_sites<P: AsRef<Path>>(path: P) -> Result<Vec<Site>> {
    let path = path.as_ref();
    let sites = read_sites(File::open(path)?)?;
    debug!(path = %path.display(), count = sites.len(), "loaded site registry");
    Ok(sites)
}

/// Parse sites from any reader.
pub fn read_sites<R: Read>(reader: R) -> Result<Vec<Site>> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut seen = HashSet::new();
    let mut sites = Vec::new();
    for row in csv.deserialize::<Site>() {
        let site = row?;
        site.validate()?;
        if !seen.insert(site.id.clone()) {
            return Err(SeriesError::DuplicateSite(site.id));
        }
        sites.push(site);
    }
    Ok(sites)
}
