//! Controller input handling
//!
//! Both standard pads share one strobe line at $4016. While the strobe bit is high the
//! shift registers keep reloading, so every read returns the A button. Once it drops,
//! each read of $4016 (pad 1) or $4017 (pad 2) shifts out the next button in
//! [`Button`] order, wrapping after eight reads.

/// Buttons in shift-register order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    A = 0,
    B = 1,
    Select = 2,
    Start = 3,
    Up = 4,
    Down = 5,
    Left = 6,
    Right = 7,
}

impl Button {
    pub const ALL: [Button; 8] = [
        Button::A,
        Button::B,
        Button::Select,
        Button::Start,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
    ];

    /// Button for a shift-register line index
    pub fn from_line(line: usize) -> Option<Button> {
        Self::ALL.get(line).copied()
    }

    pub fn line(self) -> usize {
        self as usize
    }
}

/// Controller port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    One = 0,
    Two = 1,
}

impl Port {
    fn index(self) -> usize {
        self as usize
    }
}

/// Buttons per controller
pub const BUTTON_COUNT: usize = 8;

/// Shift-register state of both controller ports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Controllers {
    states: [bool; 2 * BUTTON_COUNT],
    indexes: [usize; 2],
    /// 0 while strobing, 7 once the strobe drops
    mask: usize,
}

impl Controllers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one button's pressed state
    pub fn set_button(&mut self, port: Port, button: Button, pressed: bool) {
        self.states[port.index() * BUTTON_COUNT + button.line()] = pressed;
    }

    pub fn is_pressed(&self, port: Port, button: Button) -> bool {
        self.states[port.index() * BUTTON_COUNT + button.line()]
    }

    /// Write to the strobe register ($4016)
    pub fn write_strobe(&mut self, value: u8) {
        if value & 0x01 != 0 {
            self.mask = 0;
            self.indexes = [0; 2];
        } else {
            self.mask = BUTTON_COUNT - 1;
        }
    }

    /// Read the next bit from a port ($4016 / $4017)
    pub fn read(&mut self, port: Port) -> u8 {
        let index = &mut self.indexes[port.index()];
        let line = *index & self.mask;
        *index = index.wrapping_add(1);
        u8::from(self.states[port.index() * BUTTON_COUNT + line])
    }

    /// Release the latch; button states are kept
    pub fn reset(&mut self) {
        self.indexes = [0; 2];
        self.mask = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_buttons_in_order_then_wraps() {
        let mut controllers = Controllers::new();
        controllers.set_button(Port::One, Button::A, true);
        controllers.set_button(Port::One, Button::Start, true);
        controllers.set_button(Port::One, Button::Right, true);

        controllers.write_strobe(1);
        controllers.write_strobe(0);
        let bits: Vec<u8> = (0..8).map(|_| controllers.read(Port::One)).collect();
        assert_eq!(bits, vec![1, 0, 0, 1, 0, 0, 0, 1]);

        // Ninth read starts over at A
        assert_eq!(controllers.read(Port::One), 1);
        assert_eq!(controllers.read(Port::One), 0);
    }

    #[test]
    fn test_strobe_high_repeats_first_button() {
        let mut controllers = Controllers::new();
        controllers.set_button(Port::Two, Button::A, true);
        controllers.set_button(Port::Two, Button::B, true);

        controllers.write_strobe(1);
        for _ in 0..4 {
            assert_eq!(controllers.read(Port::Two), 1);
        }
        controllers.set_button(Port::Two, Button::A, false);
        assert_eq!(controllers.read(Port::Two), 0);
    }

    #[test]
    fn test_ports_are_independent() {
        let mut controllers = Controllers::new();
        controllers.set_button(Port::Two, Button::Select, true);
        assert!(controllers.is_pressed(Port::Two, Button::Select));
        assert!(!controllers.is_pressed(Port::One, Button::Select));
        controllers.write_strobe(1);
        controllers.write_strobe(0);

        let one: Vec<u8> = (0..8).map(|_| controllers.read(Port::One)).collect();
        let two: Vec<u8> = (0..8).map(|_| controllers.read(Port::Two)).collect();
        assert_eq!(one, vec![0; 8]);
        assert_eq!(two, vec![0, 0, 1, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_from_line() {
        assert_eq!(Button::from_line(4), Some(Button::Up));
        assert_eq!(Button::from_line(8), None);
    }
}
