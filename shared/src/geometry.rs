use serde::{Deserialize, Serialize};

///Represents a vector in 2D space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Vector2 {
    ///Value along the x-axis.
    /// Positive direction is to the right.
    pub x: f32,
    ///Value along the y-axis.
    /// Positive direction is down, towards the defending side of the map.
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Vector2 { x, y }
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    ///Returns the normalized vector.
    pub fn normalize(&self) -> Vector2 {
        let mag = self.magnitude();
        if mag == 0.0 {
            Vector2 { x: 0.0, y: 0.0 }
        } else {
            Vector2 {
                x: self.x / mag,
                y: self.y / mag,
            }
        }
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Vector2 {
        Vector2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    ///Returns `self - other`.
    pub fn sub(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    pub fn dot(&self, other: &Vector2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn distance(&self, other: &Vector2) -> f32 {
        self.sub(other).magnitude()
    }

    ///Steps towards `target` by at most `max_step`, never overshooting.
    pub fn move_towards(&self, target: &Vector2, max_step: f32) -> Vector2 {
        let delta = target.sub(self);
        let dist = delta.magnitude();
        if dist <= max_step || dist == 0.0 {
            *target
        } else {
            self.add(&delta.scale(max_step / dist))
        }
    }

    ///Clamps both components into `[0, width] x [0, height]`.
    pub fn clamp_to(&self, width: f32, height: f32) -> Vector2 {
        Vector2 {
            x: self.x.clamp(0.0, width),
            y: self.y.clamp(0.0, height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_normalize_zero_vector() {
        assert_eq!(Vector2::ZERO.normalize(), Vector2::ZERO);
    }

    #[test]
    fn test_move_towards_stops_at_target() {
        let start = Vector2::new(0.0, 0.0);
        let target = Vector2::new(3.0, 4.0);

        let partial = start.move_towards(&target, 2.5);
        assert_approx_eq!(partial.x, 1.5, 0.001);
        assert_approx_eq!(partial.y, 2.0, 0.001);

        let arrived = start.move_towards(&target, 10.0);
        assert_eq!(arrived, target);
    }

    #[test]
    fn test_distance_and_dot() {
        let a = Vector2::new(1.0, 0.0);
        let b = Vector2::new(0.0, 1.0);
        assert_approx_eq!(a.distance(&b), 2.0_f32.sqrt(), 0.0001);
        assert_eq!(a.dot(&b), 0.0);
        assert_eq!(a.dot(&a), 1.0);
    }
}
