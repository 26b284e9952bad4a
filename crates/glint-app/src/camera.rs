//! Virtual camera driven by held keys.
//!
//! Position and the eye basis are fed to every stage as `iPos` / `iEye`.

use std::collections::HashSet;

use glam::{Mat3, Vec3};
use winit::keyboard::KeyCode;

use crate::settings::CameraPose;

/// Keys currently held down.
#[derive(Debug, Default)]
pub struct HeldKeys(HashSet<KeyCode>);

impl HeldKeys {
    pub fn set(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.0.insert(key);
        } else {
            self.0.remove(&key);
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_held(&self, key: KeyCode) -> bool {
        self.0.contains(&key)
    }

    /// -1, 0 or 1 depending on which of the two keys is held.
    fn axis(&self, negative: KeyCode, positive: KeyCode) -> f32 {
        f32::from(u8::from(self.is_held(positive))) - f32::from(u8::from(self.is_held(negative)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub pitch: f32,
    pub yaw: f32,
    pub move_speed: f32,
    pub turn_speed: f32,
    home: CameraPose,
}

impl Camera {
    pub fn new(pose: CameraPose, move_speed: f32, turn_speed: f32) -> Self {
        Self {
            position: Vec3::from_array(pose.position),
            pitch: pose.pitch,
            yaw: pose.yaw,
            move_speed,
            turn_speed,
            home: pose,
        }
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.position.to_array(),
            pitch: self.pitch,
            yaw: self.yaw,
        }
    }

    /// Return to the pose the camera was created with.
    pub fn reset(&mut self) {
        let home = self.home;
        *self = Self::new(home, self.move_speed, self.turn_speed);
    }

    /// Eye basis: yaw about Y applied after pitch about X.
    pub fn eye(&self) -> Mat3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sx, cx) = self.pitch.sin_cos();
        let rot_y = Mat3::from_cols(
            Vec3::new(cy, 0.0, -sy),
            Vec3::Y,
            Vec3::new(sy, 0.0, cy),
        );
        let rot_x = Mat3::from_cols(
            Vec3::X,
            Vec3::new(0.0, cx, sx),
            Vec3::new(0.0, -sx, cx),
        );
        rot_y * rot_x
    }

    /// Advance one tick. Returns true if the pose changed.
    pub fn update(&mut self, keys: &HeldKeys) -> bool {
        let yaw = keys.axis(KeyCode::ArrowLeft, KeyCode::ArrowRight);
        let pitch = keys.axis(KeyCode::ArrowUp, KeyCode::ArrowDown);
        let movement = Vec3::new(
            keys.axis(KeyCode::KeyA, KeyCode::KeyD),
            keys.axis(KeyCode::ShiftLeft, KeyCode::Space),
            keys.axis(KeyCode::KeyS, KeyCode::KeyW),
        );

        self.yaw += yaw * self.turn_speed;
        self.pitch += pitch * self.turn_speed;
        if movement != Vec3::ZERO {
            self.position += self.eye() * movement * self.move_speed;
        }

        let moved = yaw != 0.0 || pitch != 0.0 || movement != Vec3::ZERO;
        if moved {
            log::debug!(
                "camera pos={:?} pitch={:.3} yaw={:.3}",
                self.position,
                self.pitch,
                self.yaw
            );
        }
        moved
    }

    /// Column-major eye matrix in the layout `FrameGlobals` expects.
    pub fn eye_columns(&self) -> [[f32; 3]; 3] {
        self.eye().to_cols_array_2d()
    }
}
