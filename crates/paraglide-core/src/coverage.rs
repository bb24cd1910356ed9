// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Areas served by the US National Weather Service station API.
//! Sites outside every box need another weather provider.

use crate::geo::{Bounds, LatLon};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageRegion {
    pub id: &'static str,
    pub name: &'static str,
    pub bounds: Bounds,
}

impl CoverageRegion {
    pub fn contains(&self, point: LatLon) -> bool {
        self.bounds.contains(point.lat, point.lon)
    }
}

const fn region(
    id: &'static str,
    name: &'static str,
    west: f64,
    south: f64,
    east: f64,
    north: f64,
) -> CoverageRegion {
    CoverageRegion {
        id,
        name,
        bounds: Bounds {
            north,
            south,
            east,
            west,
        },
    }
}

// [west, south, east, north], WGS84
pub const NWS_REGIONS: &[CoverageRegion] = &[
    region(
        "CONUS",
        "Continental United States",
        -125.0,
        24.5,
        -66.9,
        49.6,
    ),
    // Aleutians run past the antimeridian, so west > east
    region("Alaska", "Alaska", 172.4, 51.214183, -129.9, 71.365162),
    region(
        "Hawaii",
        "Hawaii",
        -178.334698,
        18.910361,
        -154.806773,
        28.402123,
    ),
    region(
        "Puerto_Rico",
        "Puerto Rico",
        -67.945404,
        17.88328,
        -65.220703,
        18.515683,
    ),
    region(
        "US_Virgin_Islands",
        "US Virgin Islands",
        -65.085452,
        17.673976,
        -64.564907,
        18.412655,
    ),
    // Envelope of the two boxes above, also covers the water between them
    region(
        "Caribbean",
        "Puerto Rico & US Virgin Islands",
        -67.945404,
        17.673976,
        -64.564907,
        18.515683,
    ),
    region("Guam", "Guam", 144.618068, 13.234189, 144.956712, 13.654383),
    region(
        "Northern_Mariana_Islands",
        "Northern Mariana Islands",
        144.886331,
        14.110472,
        146.064818,
        20.553802,
    ),
    region(
        "American_Samoa",
        "American Samoa",
        -171.089874,
        -14.548699,
        -168.1433,
        -11.046934,
    ),
];

pub fn regions_covering(point: LatLon) -> Vec<&'static CoverageRegion> {
    NWS_REGIONS.iter().filter(|r| r.contains(point)).collect()
}

pub fn is_covered(point: LatLon) -> bool {
    NWS_REGIONS.iter().any(|r| r.contains(point))
}
