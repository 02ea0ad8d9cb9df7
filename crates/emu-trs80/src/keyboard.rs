//! The Model III keyboard matrix.
//!
//! Eight rows of eight keys, memory-mapped at 0x3800-0x38FF. Reading an
//! address in that range ORs together the rows whose bit is set in the low
//! byte of the address.
//!
//! The Model III keyboard has keys in different places than a host
//! keyboard, so each mapped key carries a shift force: typing `a` presses
//! the A key with shift held up, typing `!` presses the 1 key with shift
//! held down. The force is applied when the shift row (row 7) is read.
//!
//! Key events are queued and released to the matrix at most once every
//! `KEY_DELAY_CYCLES`, mimicking the debounce a real keyboard scan gets
//! for free from mechanical key travel.

use std::collections::VecDeque;

/// First address of the keyboard range.
pub const KEYBOARD_BEGIN: u16 = 0x3800;
/// One past the last address of the keyboard range.
pub const KEYBOARD_END: u16 = KEYBOARD_BEGIN + 256;

/// Minimum cycles between dequeued key activities.
pub const KEY_DELAY_CYCLES: u64 = 40_000;

/// Most activities we are willing to buffer.
const KEY_QUEUE_MAX: usize = 16;

/// Per-key override of the host's shift state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShiftForce {
    #[default]
    Neutral,
    Down,
    Up,
}

/// Location and shift force of one mapped key.
#[derive(Debug, Clone, Copy)]
struct KeyInfo {
    byte_index: usize,
    bit_number: u8,
    shift_force: ShiftForce,
}

/// One queued press or release.
#[derive(Debug, Clone, Copy)]
struct KeyActivity {
    info: KeyInfo,
    pressed: bool,
}

/// Keyboard state: the 8x8 matrix plus the debounced activity queue.
pub struct Keyboard {
    /// One byte per row, a bitfield of keys currently down.
    keys: [u8; 8],
    shift_force: ShiftForce,
    queue: VecDeque<KeyActivity>,
    /// Don't process the next queued activity before this clock.
    process_min_clock: u64,
}

impl Keyboard {
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: [0; 8],
            shift_force: ShiftForce::Neutral,
            queue: VecDeque::new(),
            process_min_clock: 0,
        }
    }

    /// Release all keys and drop the shift force.
    pub fn clear(&mut self) {
        self.keys = [0; 8];
        self.shift_force = ShiftForce::Neutral;
    }

    /// Queue a key press or release by its UI name.
    ///
    /// Returns false for names not on the Model III keyboard.
    pub fn key_event(&mut self, key: &str, pressed: bool) -> bool {
        let Some(info) = key_info(key) else {
            return false;
        };
        if self.queue.len() < KEY_QUEUE_MAX {
            self.queue.push_back(KeyActivity { info, pressed });
        }
        true
    }

    /// Read the keyboard range at `addr`, dequeuing at most one pending
    /// activity if the debounce window has passed.
    #[must_use]
    pub fn read(&mut self, addr: u16, clock: u64) -> u8 {
        let addr = addr - KEYBOARD_BEGIN;

        if clock > self.process_min_clock && self.process_queue() {
            self.process_min_clock = clock + KEY_DELAY_CYCLES;
        }

        let mut b = 0;
        for (i, &row) in self.keys.iter().enumerate() {
            if addr & (1 << i) != 0 {
                let mut keys = row;
                if i == 7 {
                    // The shift row: bits 0 and 1 are left and right shift.
                    match self.shift_force {
                        ShiftForce::Neutral => {}
                        ShiftForce::Up => keys &= !0x03,
                        ShiftForce::Down => keys |= 0x01,
                    }
                }
                b |= keys;
            }
        }

        b
    }

    /// Apply the next queued activity. Returns whether one was applied.
    fn process_queue(&mut self) -> bool {
        let Some(activity) = self.queue.pop_front() else {
            return false;
        };

        self.shift_force = activity.info.shift_force;
        let bit = 1u8 << activity.info.bit_number;
        if activity.pressed {
            self.keys[activity.info.byte_index] |= bit;
        } else {
            self.keys[activity.info.byte_index] &= !bit;
        }

        true
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a UI key name to its matrix location and shift force.
#[allow(clippy::too_many_lines)]
fn key_info(key: &str) -> Option<KeyInfo> {
    use ShiftForce::{Down, Neutral, Up};

    let info = |byte_index, bit_number, shift_force| KeyInfo {
        byte_index,
        bit_number,
        shift_force,
    };

    // Letters A-Z live in rows 0-3. Upper case forces shift down, lower
    // case forces it up.
    if key.len() == 1 {
        let c = key.as_bytes()[0];
        if c.is_ascii_alphabetic() {
            let ordinal = usize::from(c.to_ascii_uppercase() - b'A') + 1;
            let force = if c.is_ascii_uppercase() { Down } else { Up };
            return Some(info(ordinal / 8, (ordinal % 8) as u8, force));
        }
    }

    let mapped = match key {
        "@" => info(0, 0, Up),

        "0" => info(4, 0, Up),
        "1" => info(4, 1, Up),
        "2" => info(4, 2, Up),
        "3" => info(4, 3, Up),
        "4" => info(4, 4, Up),
        "5" => info(4, 5, Up),
        "6" => info(4, 6, Up),
        "7" => info(4, 7, Up),
        "8" => info(5, 0, Up),
        "9" => info(5, 1, Up),

        // Shift-0 is the backtick position.
        "`" => info(4, 0, Down),
        "!" => info(4, 1, Down),
        "\"" => info(4, 2, Down),
        "#" => info(4, 3, Down),
        "$" => info(4, 4, Down),
        "%" => info(4, 5, Down),
        "&" => info(4, 6, Down),
        "'" => info(4, 7, Down),
        "(" => info(5, 0, Down),
        ")" => info(5, 1, Down),

        ":" => info(5, 2, Up),
        ";" => info(5, 3, Up),
        "," => info(5, 4, Up),
        "-" => info(5, 5, Up),
        "." => info(5, 6, Up),
        "/" => info(5, 7, Up),

        "*" => info(5, 2, Down),
        "+" => info(5, 3, Down),
        "<" => info(5, 4, Down),
        "=" => info(5, 5, Down),
        ">" => info(5, 6, Down),
        "?" => info(5, 7, Down),

        "Enter" => info(6, 0, Neutral),
        "Clear" => info(6, 1, Neutral),
        "Break" => info(6, 2, Neutral),
        "Up" => info(6, 3, Neutral),
        "Down" => info(6, 4, Neutral),
        "Left" => info(6, 5, Neutral),
        "Right" => info(6, 6, Neutral),
        " " => info(6, 7, Neutral),
        "Shift" => info(7, 0, Neutral),

        _ => return None,
    };

    Some(mapped)
}
