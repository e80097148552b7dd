use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::input::KeyboardState;

pub const DEFAULT_FOV: f32 = 60.0;
pub const MIN_FOV: f32 = 15.0;
pub const MAX_FOV: f32 = 90.0;
/// Degrees per second while a FOV key is held
pub const FOV_RATE: f32 = 200.0;

const WORLD_UP: Vec3 = Vec3::Y;

/// Free camera state: position plus yaw/pitch in degrees.
///
/// Derived basis vectors are cached and refreshed whenever yaw or pitch
/// change, so `view_matrix` stays cheap to call every frame.
pub struct Camera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    view_dir: Vec3,
    right: Vec3,
    up: Vec3,
}

impl Camera {
    pub fn new(position: Vec3, yaw: f32, pitch: f32, fov: f32) -> Self {
        let mut camera = Self {
            position,
            yaw,
            pitch,
            fov,
            view_dir: Vec3::ZERO,
            right: Vec3::ZERO,
            up: Vec3::ZERO,
        };
        camera.update_vectors();
        camera
    }

    pub fn from_pose(pose: &CameraPose) -> Self {
        Self::new(Vec3::from_array(pose.position), pose.yaw, pose.pitch, pose.fov)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.view_dir, self.up)
    }

    pub fn view_dir(&self) -> Vec3 {
        self.view_dir
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    /// Applies a yaw/pitch delta in degrees, clamping pitch so the camera
    /// never flips over the poles.
    pub fn rotate(&mut self, dyaw: f32, dpitch: f32) {
        self.yaw += dyaw;
        self.pitch = (self.pitch + dpitch).clamp(-89.0, 89.0);
        self.update_vectors();
    }

    pub fn adjust_fov(&mut self, delta: f32) {
        self.fov = (self.fov + delta).clamp(MIN_FOV, MAX_FOV);
    }

    /// Current pose in a form that round-trips through `--pose` for
    /// reproducible runs.
    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.position.to_array(),
            yaw: self.yaw,
            pitch: self.pitch,
            fov: self.fov,
        }
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.view_dir = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
        self.right = self.view_dir.cross(WORLD_UP).normalize();
        self.up = self.right.cross(self.view_dir).normalize();
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO, -90.0, 0.0, DEFAULT_FOV)
    }
}

/// Serializable camera parameters, printed on the pose dump key and accepted
/// back through `--pose`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
}

impl CameraPose {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("pose serialization cannot fail")
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Camera control capability: one implementation per movement scheme,
/// injected into the application loop.
pub trait CameraController {
    fn process_keyboard(&self, camera: &mut Camera, keys: &KeyboardState, dt: f32);
    fn process_mouse(&self, camera: &mut Camera, dx: f32, dy: f32);
}

/// WASD flight controls with mouse look
pub struct FlyController {
    pub velocity: f32,
    pub mouse_sensitivity: f32,
}

impl Default for FlyController {
    fn default() -> Self {
        Self {
            velocity: 2.0,
            mouse_sensitivity: 0.1,
        }
    }
}

impl CameraController for FlyController {
    fn process_keyboard(&self, camera: &mut Camera, keys: &KeyboardState, dt: f32) {
        use winit::keyboard::KeyCode;

        let d = self.velocity * dt;
        let forward = camera.view_dir();
        let right = camera.right();

        if keys.is_down(KeyCode::KeyW) {
            camera.position += forward * d;
        } else if keys.is_down(KeyCode::KeyS) {
            camera.position -= forward * d;
        }
        if keys.is_down(KeyCode::KeyD) {
            camera.position += right * d;
        } else if keys.is_down(KeyCode::KeyA) {
            camera.position -= right * d;
        }
    }

    fn process_mouse(&self, camera: &mut Camera, dx: f32, dy: f32) {
        camera.rotate(dx * self.mouse_sensitivity, dy * self.mouse_sensitivity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::KeyCode;

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = Camera::default();
        let dir = camera.view_dir();
        assert!(dir.z < -0.99);
        assert!(dir.x.abs() < 1e-6);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = Camera::default();
        camera.rotate(0.0, 500.0);
        assert_eq!(camera.pitch, 89.0);
        camera.rotate(0.0, -500.0);
        assert_eq!(camera.pitch, -89.0);
    }

    #[test]
    fn fov_is_clamped_to_range() {
        let mut camera = Camera::default();
        camera.adjust_fov(1000.0);
        assert_eq!(camera.fov, MAX_FOV);
        camera.adjust_fov(-1000.0);
        assert_eq!(camera.fov, MIN_FOV);
    }

    #[test]
    fn pose_round_trips_through_json() {
        let camera = Camera::new(Vec3::new(-3.0, 1.45, -2.77), -670.0, -20.0, 31.0);
        let json = camera.pose().to_json();
        let restored = Camera::from_pose(&CameraPose::from_json(&json).unwrap());
        assert_eq!(camera.pose(), restored.pose());
    }

    #[test]
    fn view_matrix_places_camera_at_origin_of_view_space() {
        let camera = Camera::new(Vec3::new(1.0, 2.0, 3.0), -90.0, 0.0, DEFAULT_FOV);
        let view = camera.view_matrix();
        let eye = view.transform_point3(camera.position);
        assert!(eye.length() < 1e-5);
    }

    #[test]
    fn fly_controller_moves_along_view_direction() {
        let mut camera = Camera::default();
        let controller = FlyController::default();
        let mut keys = KeyboardState::default();
        keys.set_down(KeyCode::KeyW, true);

        controller.process_keyboard(&mut camera, &keys, 0.5);
        // velocity 2.0 for half a second along -Z
        assert!((camera.position.z + 1.0).abs() < 1e-5);
    }

    #[test]
    fn fly_controller_strafe_is_perpendicular() {
        let mut camera = Camera::default();
        let controller = FlyController::default();
        let mut keys = KeyboardState::default();
        keys.set_down(KeyCode::KeyD, true);

        controller.process_keyboard(&mut camera, &keys, 1.0);
        assert!(camera.position.dot(camera.view_dir()).abs() < 1e-5);
    }

    #[test]
    fn mouse_look_applies_sensitivity() {
        let mut camera = Camera::default();
        let controller = FlyController::default();
        controller.process_mouse(&mut camera, 10.0, 0.0);
        assert!((camera.yaw + 89.0).abs() < 1e-5);
    }
}
