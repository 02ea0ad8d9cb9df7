//! Cassette controller: a WAV file played as a tape.
//!
//! The tape is sampled on every instruction while the motor runs. Each
//! 16-bit sample classifies as positive, negative, or neutral; an edge
//! into positive or negative raises the corresponding IRQ and sets the
//! flip-flop that the 1500-baud ROM routines read back through the
//! cassette port. Writing is not supported; the 500-baud write path only
//! re-polls the tape and clears the flip-flop.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::bus::TrsBus;
use crate::events::{EventAction, EVENT_KICK_OFF_CASSETTE};
use crate::machine::CPU_HZ;
use crate::update::VmUpdate;

/// Threshold for classifying 16-bit signed samples.
pub const CASSETTE_THRESHOLD: i16 = 5000;

/// State of the cassette hardware. Writing is not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CassetteState {
    #[default]
    Close,
    Read,
    Fail,
}

/// Value of the wave right now: negative, neutral (around zero), or
/// positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CassetteValue {
    #[default]
    Neutral,
    Positive,
    Negative,
}

/// Why a tape failed to open.
pub enum WavError {
    /// The file could not be read.
    Io(String),
    /// The file is a WAV we do not handle (non-PCM, stereo, or not
    /// 16-bit).
    UnsupportedFormat(String),
}

/// An open WAV file being read as a tape.
pub struct WavTape {
    reader: hound::WavReader<BufReader<File>>,
    /// Samples per second of the underlying file. Any rate is accepted.
    pub sample_rate: u32,
    eof: bool,
}

impl WavTape {
    /// Open and validate a tape. Only PCM mono 16-bit files play.
    pub fn open(path: &Path) -> Result<Self, WavError> {
        let reader = hound::WavReader::open(path)
            .map_err(|e| match e {
                hound::Error::IoError(io) => WavError::Io(format!("{}: {io}", path.display())),
                other => WavError::UnsupportedFormat(format!("{}: {other}", path.display())),
            })?;

        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int
            || spec.channels != 1
            || spec.bits_per_sample != 16
        {
            return Err(WavError::UnsupportedFormat(format!(
                "{}: want PCM mono 16-bit, got {} channel(s) at {} bits",
                path.display(),
                spec.channels,
                spec.bits_per_sample
            )));
        }

        Ok(Self {
            sample_rate: spec.sample_rate,
            reader,
            eof: false,
        })
    }

    /// Read the next sample. Past the end of the file the tape reads as
    /// silence, which is what the real machine heard when the tape ran
    /// out.
    pub fn read_sample(&mut self) -> i16 {
        if self.eof {
            return 0;
        }
        match self.reader.samples::<i16>().next() {
            Some(Ok(sample)) => sample,
            _ => {
                self.eof = true;
                0
            }
        }
    }
}

/// Internal state of the cassette controller.
#[derive(Default)]
pub struct Cassette {
    /// WAV file to read when the motor turns on.
    pub filename: Option<PathBuf>,
    pub motor_on: bool,
    /// The open tape, present in the Read state.
    tape: Option<WavTape>,
    state: CassetteState,

    // Register state.
    value: CassetteValue,
    last_non_zero: CassetteValue,
    flip_flop: bool,

    /// Clock at which the motor turned on, anchoring sample catch-up.
    motor_on_clock: u64,
    samples_read: u64,
}

impl Cassette {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> CassetteState {
        self.state
    }

    /// Classify one sample against the fixed threshold.
    #[must_use]
    pub fn classify(sample: i16) -> CassetteValue {
        if sample > CASSETTE_THRESHOLD {
            CassetteValue::Positive
        } else if sample < -CASSETTE_THRESHOLD {
            CassetteValue::Negative
        } else {
            CassetteValue::Neutral
        }
    }
}

impl TrsBus {
    /// Reset the controller to a known state.
    pub fn reset_cassette(&mut self) {
        self.set_cassette_state(CassetteState::Close);
    }

    /// Read the cassette byte from the I/O port.
    ///
    /// Bit 7 is the flip-flop, bit 0 says the last non-neutral value was
    /// positive. Reading acknowledges any cassette interrupt.
    pub fn cassette_byte(&mut self) -> u8 {
        if self.cassette.motor_on {
            self.set_cassette_state(CassetteState::Read);
        }

        self.interrupts.cassette_clear_interrupt();

        let mut b = 0;
        if self.cassette.flip_flop {
            b |= 0x80;
        }
        if self.cassette.last_non_zero == CassetteValue::Positive {
            b |= 0x01;
        }
        b
    }

    /// Write to the cassette port. Tapes are read-only; the 500-baud read
    /// loop writes here to trigger the next analysis of the tape.
    pub fn write_cassette_byte(&mut self, _value: u8) {
        if self.cassette.motor_on && self.cassette.state == CassetteState::Read {
            self.update_cassette();
            self.cassette.flip_flop = false;
        }
    }

    /// Kick off the reading process for 1500-baud reads.
    pub fn kick_off_cassette(&mut self) {
        if self.cassette.motor_on
            && self.cassette.state == CassetteState::Close
            && self.interrupts.cassette_interrupts_enabled()
        {
            self.interrupts.cassette_rise_interrupt();
            self.interrupts.cassette_fall_interrupt();
            self.update_cassette();
        }
    }

    /// Turn the motor on or off.
    pub fn set_cassette_motor(&mut self, motor_on: bool) {
        if motor_on == self.cassette.motor_on {
            return;
        }

        if motor_on {
            self.cassette.flip_flop = false;
            self.cassette.last_non_zero = CassetteValue::Neutral;
            // Wait one second, then kick off reading.
            let clock = self.clock;
            self.events
                .add(EVENT_KICK_OFF_CASSETTE, EventAction::KickOffCassette, clock + CPU_HZ);
        } else {
            self.set_cassette_state(CassetteState::Close);
        }
        self.cassette.motor_on = motor_on;
        self.send_update(VmUpdate::motor(-1, motor_on));
    }

    /// Catch the tape up to the current clock, raising rise/fall
    /// interrupts for each edge seen.
    pub fn update_cassette(&mut self) {
        if !self.cassette.motor_on || self.set_cassette_state(CassetteState::Read) < 0 {
            return;
        }

        let Some(tape) = self.cassette.tape.as_mut() else {
            return;
        };

        // How many samples we should have read by now.
        let samples_to_read = (self.clock - self.cassette.motor_on_clock)
            * u64::from(tape.sample_rate)
            / CPU_HZ;

        while samples_to_read > self.cassette.samples_read {
            let sample = tape.read_sample();
            self.cassette.samples_read += 1;

            let value = Cassette::classify(sample);
            if value != self.cassette.value {
                match value {
                    CassetteValue::Positive => {
                        self.cassette.flip_flop = true;
                        self.interrupts.cassette_rise_interrupt();
                    }
                    CassetteValue::Negative => {
                        self.cassette.flip_flop = true;
                        self.interrupts.cassette_fall_interrupt();
                    }
                    CassetteValue::Neutral => {}
                }

                self.cassette.value = value;
                if value != CassetteValue::Neutral {
                    self.cassette.last_non_zero = value;
                }
            }
        }
    }

    /// Change the controller state, opening the tape on entry to Read.
    ///
    /// Returns 0 if the state changed, 1 if it was already there, and -1
    /// if the controller is stuck in Fail.
    fn set_cassette_state(&mut self, new_state: CassetteState) -> i32 {
        let old_state = self.cassette.state;

        if old_state == new_state {
            return 1;
        }

        // Once in error, everything fails until the file is closed.
        if old_state == CassetteState::Fail && new_state != CassetteState::Close {
            return -1;
        }

        if new_state == CassetteState::Read && !self.open_cassette_file() {
            return -1;
        }
        if new_state == CassetteState::Close {
            self.cassette.tape = None;
        }

        self.cassette.state = new_state;
        0
    }

    /// Open the mounted WAV file and anchor the sample clock.
    ///
    /// I/O failures put the controller in Fail; a WAV we cannot play is
    /// fatal, so programs don't silently read a dead tape.
    fn open_cassette_file(&mut self) -> bool {
        let Some(filename) = self.cassette.filename.clone() else {
            self.cassette.state = CassetteState::Fail;
            self.send_update(VmUpdate::message("no cassette mounted"));
            return false;
        };

        match WavTape::open(&filename) {
            Ok(tape) => {
                self.cassette.tape = Some(tape);
                self.cassette.motor_on_clock = self.clock;
                self.cassette.samples_read = 0;
                true
            }
            Err(WavError::Io(message)) => {
                self.cassette.state = CassetteState::Fail;
                self.send_update(VmUpdate::message(&format!("cassette: {message}")));
                false
            }
            Err(WavError::UnsupportedFormat(message)) => {
                self.set_fatal(format!("cassette: {message}"));
                self.cassette.state = CassetteState::Fail;
                false
            }
        }
    }
}
