use geo::{Coord, Distance, Euclidean, Point};

use crate::problem::{distance_method::DistanceMethod, location::Location};

/// Mean earth radius used by `geo`'s haversine, in meters.
const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    pub nearest: Coord,
    pub distance: f64,
    /// Position of `nearest` along the segment, `0.0` at the start and `1.0` at the end.
    pub t: f64,
}

/// Projects `point` on the segment `start`-`end`, clamped to its endpoints.
pub fn project_on_segment(point: Coord, start: Coord, end: Coord) -> SegmentProjection {
    let direction = end - start;
    let length_squared = direction.x * direction.x + direction.y * direction.y;

    let t = if length_squared == 0.0 {
        0.0
    } else {
        let offset = point - start;
        ((offset.x * direction.x + offset.y * direction.y) / length_squared).clamp(0.0, 1.0)
    };

    let nearest = start + direction * t;

    SegmentProjection {
        nearest,
        distance: Euclidean.distance(&Point::from(point), &Point::from(nearest)),
        t,
    }
}

pub fn point_to_segment_distance(point: Coord, start: Coord, end: Coord) -> f64 {
    project_on_segment(point, start, end).distance
}

/// Maps locations to a plane in meters.
///
/// Cartesian problems are already in meters. Lat/lon problems use an equirectangular
/// projection around `origin`, accurate enough at the scale of a delivery route.
#[derive(Debug, Clone, Copy)]
pub struct LocalPlane {
    method: DistanceMethod,
    origin: Location,
    cos_latitude: f64,
}

impl LocalPlane {
    pub fn new(method: DistanceMethod, origin: Location) -> Self {
        LocalPlane {
            method,
            origin,
            cos_latitude: origin.lat().to_radians().cos(),
        }
    }

    pub fn project(&self, location: &Location) -> Coord {
        match self.method {
            DistanceMethod::Euclidean => Coord {
                x: location.x(),
                y: location.y(),
            },
            DistanceMethod::Haversine => Coord {
                x: (location.lon() - self.origin.lon()).to_radians()
                    * self.cos_latitude
                    * EARTH_RADIUS_METERS,
                y: (location.lat() - self.origin.lat()).to_radians() * EARTH_RADIUS_METERS,
            },
        }
    }

    pub fn unproject(&self, coord: Coord) -> Location {
        match self.method {
            DistanceMethod::Euclidean => Location::from_cartesian(coord.x, coord.y),
            DistanceMethod::Haversine => {
                let lat = self.origin.lat() + (coord.y / EARTH_RADIUS_METERS).to_degrees();
                let lon = self.origin.lon()
                    + (coord.x / (EARTH_RADIUS_METERS * self.cos_latitude)).to_degrees();
                Location::from_lat_lon(lat, lon)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(x: f64, y: f64) -> Coord {
        Coord { x, y }
    }

    #[test]
    fn test_projection_inside_segment() {
        let projection = project_on_segment(coord(3.0, 5.0), coord(0.0, 0.0), coord(0.0, 10.0));

        assert_eq!(projection.distance, 3.0);
        assert_eq!(projection.nearest, coord(0.0, 5.0));
        assert_eq!(projection.t, 0.5);
    }

    #[test]
    fn test_projection_clamped_to_endpoint() {
        let projection = project_on_segment(coord(3.0, 15.0), coord(0.0, 0.0), coord(0.0, 10.0));

        assert!((projection.distance - 34.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(projection.nearest, coord(0.0, 10.0));
        assert_eq!(projection.t, 1.0);

        let before = point_to_segment_distance(coord(0.0, -4.0), coord(0.0, 0.0), coord(0.0, 10.0));
        assert_eq!(before, 4.0);
    }

    #[test]
    fn test_degenerate_segment() {
        let distance = point_to_segment_distance(coord(3.0, 4.0), coord(0.0, 0.0), coord(0.0, 0.0));
        assert_eq!(distance, 5.0);
    }

    #[test]
    fn test_local_plane_matches_haversine() {
        let origin = Location::from_lat_lon(44.4268, 26.1025);
        let other = Location::from_lat_lon(44.4300, 26.1100);
        let plane = LocalPlane::new(DistanceMethod::Haversine, origin);

        let projected = plane.project(&other);
        let planar = (projected.x * projected.x + projected.y * projected.y).sqrt();

        assert!((planar - origin.haversine_distance(&other)).abs() < 1.0);

        let back = plane.unproject(projected);
        assert!((back.lat() - other.lat()).abs() < 1e-9);
        assert!((back.lon() - other.lon()).abs() < 1e-9);
    }
}
