// animation/camera_animator.rs - Perspective camera and slow orbit around the maze

use glam::Mat4;

use super::Vec3;

/// Perspective camera aimed at a target point
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view, degrees
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub const INITIAL_POSITION: Vec3 = Vec3::new(0.0, 40.0, 50.0);

    pub fn new(aspect: f32) -> Self {
        Self {
            position: Self::INITIAL_POSITION,
            target: Vec3::zero(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov_y: 50.0,
            aspect,
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Update the projection for a new output aspect ratio.
    /// Non-finite or non-positive ratios are ignored.
    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        } else {
            log::warn!("Ignoring invalid camera aspect {aspect}");
        }
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position.to_glam(), self.target.to_glam(), self.up.to_glam())
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

/// Slow elliptical orbit; the camera eases toward the moving orbit point
/// instead of jumping onto it.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraOrbit {
    t: f32,
    speed: f32,
    radius_x: f32,
    radius_z: f32,
    smoothing: f32,
}

impl Default for CameraOrbit {
    fn default() -> Self {
        Self {
            t: 0.0,
            speed: 0.002,
            radius_x: 20.0,
            radius_z: 28.0,
            smoothing: 0.02,
        }
    }
}

impl CameraOrbit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orbit parameter after the ticks advanced so far
    pub fn phase(&self) -> f32 {
        self.t
    }

    /// Point on the orbit ellipse for parameter `t` (height left to the camera)
    pub fn orbit_point(&self, t: f32) -> (f32, f32) {
        let (sin, cos) = t.sin_cos();
        (sin * self.radius_x, cos * self.radius_z)
    }

    /// One tick: advance the parameter, ease x/z toward the new orbit point,
    /// re-aim at the origin.
    pub fn advance(&mut self, camera: &mut Camera) {
        self.t += self.speed;
        let (goal_x, goal_z) = self.orbit_point(self.t);
        let goal = Vec3::new(goal_x, camera.position.y, goal_z);
        camera.position = camera.position.lerp(goal, self.smoothing);
        camera.look_at(Vec3::zero());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_camera() {
        let cam = Camera::new(16.0 / 9.0);
        assert_eq!(cam.position, Vec3::new(0.0, 40.0, 50.0));
        assert_eq!(cam.target, Vec3::zero());
        let vp = cam.view_projection();
        assert!(!vp.col(0).x.is_nan());

        // Origin projects to the centre of clip space
        let clip = vp * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((clip.x / clip.w).abs() < 1e-5);
        assert!((clip.y / clip.w).abs() < 1e-5);
    }

    #[test]
    fn test_set_aspect_only_touches_projection() {
        let mut cam = Camera::new(1.0);
        let view = cam.view_matrix();
        let proj = cam.projection_matrix();

        cam.set_aspect(2.0);
        assert_eq!(cam.view_matrix(), view);
        assert_ne!(cam.projection_matrix(), proj);

        cam.set_aspect(f32::NAN);
        cam.set_aspect(0.0);
        assert_eq!(cam.aspect, 2.0);
    }

    #[test]
    fn test_orbit_eases_toward_goal() {
        let mut cam = Camera::new(1.0);
        let mut orbit = CameraOrbit::new();
        orbit.advance(&mut cam);

        let (goal_x, goal_z) = orbit.orbit_point(0.002);
        // 2% of the remaining distance per tick
        assert!((cam.position.x - goal_x * 0.02).abs() < 1e-6);
        assert!((cam.position.z - (50.0 + (goal_z - 50.0) * 0.02)).abs() < 1e-4);
        assert_eq!(cam.position.y, 40.0);
        assert_eq!(cam.target, Vec3::zero());
    }

    #[test]
    fn test_orbit_settles_near_ellipse() {
        let mut cam = Camera::new(1.0);
        let mut orbit = CameraOrbit::new();
        for _ in 0..2000 {
            orbit.advance(&mut cam);
        }
        let (x, z) = orbit.orbit_point(orbit.phase());
        // Lag behind a slowly moving goal stays small
        assert!((cam.position.x - x).abs() < 2.5);
        assert!((cam.position.z - z).abs() < 3.5);
    }
}
