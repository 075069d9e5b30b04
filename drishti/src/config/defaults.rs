//! Default value functions for serde deserialization.

pub fn focal_length() -> f32 {
    525.0
}

pub fn principal_x() -> f32 {
    319.5
}

pub fn principal_y() -> f32 {
    239.5
}

pub fn image_width() -> usize {
    640
}

pub fn image_height() -> usize {
    480
}

pub fn camera_position() -> [f32; 3] {
    [-0.8, 0.0, 1.0]
}

pub fn camera_target() -> [f32; 3] {
    [0.0, 0.0, 0.0]
}

pub fn bound_min() -> f32 {
    -0.5
}

pub fn bound_max() -> f32 {
    0.5
}

pub fn inflation_margin() -> f32 {
    0.01
}

pub fn model_color() -> [u8; 3] {
    [128, 128, 128]
}

pub fn scene_id() -> String {
    "scene".to_string()
}
