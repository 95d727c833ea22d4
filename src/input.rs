//! Keyboard to controller mapping

use eframe::egui::Key;
use famicom_core::Button;

/// Keys driving controller 1, in shift-register order
pub const KEY_MAP: [(Key, Button); 8] = [
    (Key::J, Button::A),
    (Key::K, Button::B),
    (Key::U, Button::Select),
    (Key::I, Button::Start),
    (Key::W, Button::Up),
    (Key::S, Button::Down),
    (Key::A, Button::Left),
    (Key::D, Button::Right),
];

/// Short label shown in the controller status row
pub fn button_label(button: Button) -> &'static str {
    match button {
        Button::A => "A",
        Button::B => "B",
        Button::Select => "Sel",
        Button::Start => "Start",
        Button::Up => "Up",
        Button::Down => "Down",
        Button::Left => "Left",
        Button::Right => "Right",
    }
}

/// Sample every mapped key with `is_down`
pub fn button_states(is_down: impl Fn(Key) -> bool) -> [bool; 8] {
    KEY_MAP.map(|(key, _)| is_down(key))
}
