// animation/lighting.rs - Static scene lighting and the floor line grid

use super::{Color, Vec3};

/// Hemisphere (sky/ground) fill plus one directional key light.
/// Set once at mount; nothing here changes per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    pub sky_color: Color,
    pub ground_color: Color,
    pub hemisphere_intensity: f32,
    pub directional_color: Color,
    pub directional_intensity: f32,
    /// Position of the directional light; it shines toward the origin
    pub directional_position: Vec3,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            sky_color: Color::from_hex(0xffffff),
            ground_color: Color::from_hex(0x444444),
            hemisphere_intensity: 0.7,
            directional_color: Color::from_hex(0xffffff),
            directional_intensity: 0.6,
            directional_position: Vec3::new(5.0, 10.0, 7.0),
        }
    }
}

impl Lighting {
    /// Unit vector from the origin toward the light
    pub fn direction_to_light(&self) -> Vec3 {
        self.directional_position.normalize()
    }
}

/// Line grid under the maze
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloorGrid {
    pub divisions: usize,
    pub size: f32,
    pub height: f32,
    pub center_color: Color,
    pub line_color: Color,
}

impl FloorGrid {
    pub const HEIGHT: f32 = -0.5;

    /// `cols` divisions spanning `cols * cell_size` world units
    pub fn new(cols: usize, cell_size: f32) -> Self {
        Self {
            divisions: cols.max(1),
            size: cols as f32 * cell_size,
            height: Self::HEIGHT,
            center_color: Color::from_hex(0x222222),
            line_color: Color::from_hex(0x2b2b2b),
        }
    }

    /// Line segments as (start, end, colour) pairs: `divisions + 1` lines along
    /// each axis, the two centre lines in the centre colour.
    pub fn lines(&self) -> Vec<(Vec3, Vec3, Color)> {
        let half = self.size / 2.0;
        let step = self.size / self.divisions as f32;
        let centre = self.divisions / 2;
        let even = self.divisions % 2 == 0;

        let mut lines = Vec::with_capacity((self.divisions + 1) * 2);
        for i in 0..=self.divisions {
            let offset = -half + i as f32 * step;
            let color = if even && i == centre {
                self.center_color
            } else {
                self.line_color
            };
            lines.push((
                Vec3::new(-half, self.height, offset),
                Vec3::new(half, self.height, offset),
                color,
            ));
            lines.push((
                Vec3::new(offset, self.height, -half),
                Vec3::new(offset, self.height, half),
                color,
            ));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lighting() {
        let light = Lighting::default();
        assert_eq!(light.hemisphere_intensity, 0.7);
        assert_eq!(light.directional_intensity, 0.6);
        assert!((light.ground_color.r - 0x44 as f32 / 255.0).abs() < 1e-6);

        let dir = light.direction_to_light();
        assert!((dir.length() - 1.0).abs() < 1e-6);
        assert!(dir.y > dir.x && dir.y > dir.z);
    }

    #[test]
    fn test_floor_grid_lines() {
        let floor = FloorGrid::new(51, 1.0);
        assert_eq!(floor.size, 51.0);
        assert_eq!(floor.height, -0.5);

        let lines = floor.lines();
        assert_eq!(lines.len(), 52 * 2);
        for (a, b, _) in &lines {
            assert_eq!(a.y, -0.5);
            assert!(((*b - *a).length() - 51.0).abs() < 1e-4);
        }
        // Odd division count: no line through the centre
        assert!(lines.iter().all(|(_, _, c)| *c == floor.line_color));

        let even = FloorGrid::new(4, 1.0);
        let centred = even.lines().iter().filter(|(_, _, c)| *c == even.center_color).count();
        assert_eq!(centred, 2);
    }
}
