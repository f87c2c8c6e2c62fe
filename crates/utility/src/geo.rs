pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Lowest zoom level a fitted viewport will use.
pub const MIN_ZOOM: u8 = 3;

/// Highest zoom level a fitted viewport will use.
pub const MAX_ZOOM: u8 = 18;

fn to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

pub fn is_valid_latitude(latitude: f64) -> bool {
    latitude.is_finite() && (-90.0..=90.0).contains(&latitude)
}

pub fn is_valid_longitude(longitude: f64) -> bool {
    longitude.is_finite() && (-180.0..=180.0).contains(&longitude)
}

pub fn haversine_distance(
    latitude_1: f64,
    longitude_1: f64,
    latitude_2: f64,
    longitude_2: f64,
) -> f64 {
    let lat1_rad = to_radians(latitude_1);
    let lat2_rad = to_radians(latitude_2);

    let dlat = lat2_rad - lat1_rad;
    let dlon = to_radians(longitude_2) - to_radians(longitude_1);

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// An axis aligned latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Smallest rectangle containing all given `(latitude, longitude)` points.
    /// Returns `None` if there are no points.
    pub fn of<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        points.into_iter().fold(None, |bounds, (lat, lon)| {
            Some(match bounds {
                None => Bounds {
                    south: lat,
                    west: lon,
                    north: lat,
                    east: lon,
                },
                Some(b) => Bounds {
                    south: b.south.min(lat),
                    west: b.west.min(lon),
                    north: b.north.max(lat),
                    east: b.east.max(lon),
                },
            })
        })
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// Grows the rectangle on every side by `fraction` of its span.
    pub fn padded(self, fraction: f64) -> Self {
        let lat_pad = (self.north - self.south) * fraction;
        let lon_pad = (self.east - self.west) * fraction;
        Bounds {
            south: (self.south - lat_pad).max(-90.0),
            west: (self.west - lon_pad).max(-180.0),
            north: (self.north + lat_pad).min(90.0),
            east: (self.east + lon_pad).min(180.0),
        }
    }

    /// Web-mercator style zoom level at which the whole rectangle fits a
    /// single 256px tile. A degenerate rectangle (one point) gets `MAX_ZOOM`.
    pub fn fitting_zoom(&self) -> u8 {
        let span = (self.north - self.south).max(self.east - self.west);
        if span <= f64::EPSILON {
            return MAX_ZOOM;
        }
        let zoom = (360.0 / span).log2().floor();
        zoom.clamp(MIN_ZOOM as f64, MAX_ZOOM as f64) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_all_points() {
        let bounds =
            Bounds::of([(-0.2295, -78.5249), (-0.18, -78.49), (-0.31, -78.55)])
                .unwrap();
        assert_eq!(bounds.south, -0.31);
        assert_eq!(bounds.north, -0.18);
        assert_eq!(bounds.west, -78.55);
        assert_eq!(bounds.east, -78.49);
    }

    #[test]
    fn bounds_of_nothing_is_none() {
        assert!(Bounds::of(Vec::<(f64, f64)>::new()).is_none());
    }

    #[test]
    fn single_point_zooms_all_the_way_in() {
        let bounds = Bounds::of([(-0.2295, -78.5249)]).unwrap();
        assert_eq!(bounds.fitting_zoom(), MAX_ZOOM);
        assert_eq!(bounds.center(), (-0.2295, -78.5249));
    }

    #[test]
    fn wider_bounds_zoom_out() {
        let city = Bounds::of([(-0.30, -78.60), (-0.10, -78.40)]).unwrap();
        let country = Bounds::of([(-4.0, -81.0), (1.5, -75.0)]).unwrap();
        assert!(city.fitting_zoom() > country.fitting_zoom());
    }

    #[test]
    fn coordinate_ranges() {
        assert!(is_valid_latitude(-0.2295));
        assert!(!is_valid_latitude(91.0));
        assert!(!is_valid_latitude(f64::NAN));
        assert!(is_valid_longitude(-78.5249));
        assert!(!is_valid_longitude(-180.5));
    }

    #[test]
    fn haversine_of_ten_thousandth_degree_is_about_eleven_meters() {
        let km = haversine_distance(-0.2295, -78.5249, -0.2296, -78.5249);
        assert!((km - 0.0111).abs() < 0.0005, "got {km}");
    }
}
