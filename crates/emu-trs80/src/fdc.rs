//! WD1791/93 floppy disk controller.
//!
//! Four drive slots holding JV1 or JV3 images. Commands arrive through
//! port F0 and progress through scheduled events: Type I seeks finish with
//! a `DiskDone` after ~2000 cycles, Type II reads raise DRQ 64 cycles in
//! and arm a half-second lost-data watchdog, and a completed transfer
//! raises the disk IntRq NMI. Disks are always write-protected; the write
//! command family is refused loudly rather than half-emulated.

use format_jv::{
    DiskImage, Jv1Disk, JV1_SECTORS_PER_TRACK, JV1_TRACKS, JV3_DAM, JV3_DAM_DD_F8,
    JV3_DAM_DD_FB, JV3_DAM_SD_F9, JV3_DAM_SD_F8, JV3_DAM_SD_FA, JV3_DAM_SD_FB, JV3_ERROR,
    JV3_MAX_SIDES, MAX_TRACKS,
};

use crate::bus::TrsBus;
use crate::events::{EventAction, EVENT_DISK, EVENT_DISK_DONE, EVENT_DISK_FIRST_DRQ,
    EVENT_DISK_LOST_DATA};
use crate::machine::CPU_HZ;
use crate::update::VmUpdate;

// Type I status bits.
pub const DISK_BUSY: u8 = 1 << 0;
/// Over the index hole.
pub const DISK_INDEX: u8 = 1 << 1;
/// On track 0.
pub const DISK_TRK_ZERO: u8 = 1 << 2;
pub const DISK_CRC_ERR: u8 = 1 << 3;
pub const DISK_SEEK_ERR: u8 = 1 << 4;
/// Head engaged.
pub const DISK_HEAD_ENGD: u8 = 1 << 5;
/// Write-protected.
pub const DISK_WRITE_PRT: u8 = 1 << 6;
/// Disk not ready (motor not running).
pub const DISK_NOT_RDY: u8 = 1 << 7;

// Type II/III status bits.
pub const DISK_DRQ: u8 = 0x02;
pub const DISK_LOST_DATA: u8 = 0x04;
pub const DISK_NOT_FOUND: u8 = 0x10;
pub const DISK_REC_TYPE: u8 = 0x60;
pub const DISK_1791_FB: u8 = 0x00;
pub const DISK_1791_F8: u8 = 0x20;

// Select register bits.
const SELECT_DRIVE_0: u8 = 1 << 0;
const SELECT_DRIVE_1: u8 = 1 << 1;
const SELECT_DRIVE_2: u8 = 1 << 2;
const SELECT_DRIVE_3: u8 = 1 << 3;
/// 0 = front, 1 = back.
const SELECT_SIDE: u8 = 1 << 4;
const SELECT_WAIT: u8 = 1 << 6;
/// Double density.
const SELECT_MFM: u8 = 1 << 7;
const SELECT_DRIVE_MASK: u8 = SELECT_DRIVE_0 | SELECT_DRIVE_1 | SELECT_DRIVE_2 | SELECT_DRIVE_3;

// Commands, selected by the top nybble of the byte written to port F0.
const DISK_COMMAND_MASK: u8 = 0xF0;

// Type I: cccchvrr (h = head load, v = verify, rr = step rate).
const DISK_RESTORE: u8 = 0x00;
const DISK_SEEK: u8 = 0x10;
const DISK_STEP: u8 = 0x20;
const DISK_STEP_U: u8 = 0x30;
const DISK_STEP_IN: u8 = 0x40;
const DISK_STEP_IN_U: u8 = 0x50;
const DISK_STEP_OUT: u8 = 0x60;
const DISK_STEP_OUT_U: u8 = 0x70;
const DISK_V_MASK: u8 = 0x04;

// Type II: ccccbecd (b = side expected, c = side compare, e = head delay,
// d = data address mark for writes).
const DISK_READ: u8 = 0x80;
const DISK_READ_M: u8 = 0x90;
const DISK_WRITE: u8 = 0xA0;
const DISK_WRITE_M: u8 = 0xB0;
const DISK_B_MASK: u8 = 0x08;
const DISK_C_MASK: u8 = 0x02;

// Type III.
const DISK_READ_ADR: u8 = 0xC0;
const DISK_READ_TRK: u8 = 0xE0;
const DISK_WRITE_TRK: u8 = 0xF0;

// Type IV: cccciiii (iiii = conditions to interrupt on).
const DISK_FORCE_INT: u8 = 0xD0;

/// How long the motor stays on after a drive select, in seconds.
const MOTOR_TIME_AFTER_SELECT: u64 = 2;

/// Width of the index hole as a fraction of the circumference.
const DISK_HOLE_WIDTH: f32 = 0.01;

/// Disks rotate at 300 rpm.
const DISK_RPM: u64 = 300;
pub const CLOCKS_PER_REVOLUTION: u64 = CPU_HZ * 60 / DISK_RPM;

/// Whether to respect the "true DAM" wiring for the FA mark.
const DISK_TRUE_DAM: bool = false;

/// How many drive slots the controller has.
pub const DRIVE_COUNT: usize = 4;

/// One drive slot: the inserted image plus head state.
#[derive(Default)]
pub struct Drive {
    /// The inserted image, if any.
    pub disk: Option<DiskImage>,
    /// Which physical track the head is on.
    pub physical_track: u8,
    /// Where in the image the current transfer is reading.
    pub data_offset: usize,
}

/// Controller state. We emulate the WD1791/93 only, not the Model I's
/// WD1771.
pub struct Fdc {
    // Registers.
    pub status: u8,
    pub track: u8,
    pub sector: u8,
    pub data: u8,

    // Various state.
    pub current_command: u8,
    /// Bytes left to transfer for the current command.
    pub byte_count: usize,
    /// Selected side: 0 = front, 1 = back.
    pub side: u8,
    pub double_density: bool,
    pub current_drive: usize,
    pub motor_on: bool,
    /// Clock at which the motor times out.
    pub motor_timeout: u64,
    /// Direction of the last head step, for the bare STEP command.
    last_step_direction: i8,
    /// Descriptor index found by the last read-address, or -1.
    pub last_read_adr: i32,

    pub drives: [Drive; DRIVE_COUNT],
}

impl Fdc {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: DISK_NOT_RDY | DISK_TRK_ZERO,
            track: 0,
            sector: 0,
            data: 0,
            current_command: DISK_RESTORE,
            byte_count: 0,
            side: 0,
            double_density: false,
            current_drive: 0,
            motor_on: false,
            motor_timeout: 0,
            last_step_direction: 1,
            last_read_adr: -1,
            drives: Default::default(),
        }
    }

    /// The currently selected drive.
    #[must_use]
    pub fn drive(&self) -> &Drive {
        &self.drives[self.current_drive]
    }

    pub fn drive_mut(&mut self) -> &mut Drive {
        &mut self.drives[self.current_drive]
    }
}

impl Default for Fdc {
    fn default() -> Self {
        Self::new()
    }
}

fn command_type(command: u8) -> u32 {
    match command & DISK_COMMAND_MASK {
        DISK_RESTORE | DISK_SEEK | DISK_STEP | DISK_STEP_U | DISK_STEP_IN | DISK_STEP_IN_U
        | DISK_STEP_OUT | DISK_STEP_OUT_U => 1,
        DISK_READ | DISK_READ_M | DISK_WRITE | DISK_WRITE_M => 2,
        DISK_READ_ADR | DISK_READ_TRK | DISK_WRITE_TRK => 3,
        _ => 4,
    }
}

fn is_read_write_command(command: u8) -> bool {
    matches!(command_type(command), 2 | 3)
}

impl TrsBus {
    /// Reset controller state. A power-on reset also pulls the heads back
    /// to track 0.
    pub fn disk_init(&mut self, power_on: bool) {
        self.fdc.status = DISK_NOT_RDY | DISK_TRK_ZERO;
        self.fdc.track = 0;
        self.fdc.sector = 0;
        self.fdc.data = 0;

        self.fdc.current_command = DISK_RESTORE;
        self.fdc.byte_count = 0;
        self.fdc.side = 0;
        self.fdc.double_density = false;
        self.fdc.current_drive = 0;
        self.fdc.motor_on = false;
        self.fdc.motor_timeout = 0;
        self.fdc.last_read_adr = -1;

        if power_on {
            for drive in &mut self.fdc.drives {
                drive.physical_track = 0;
            }
        }

        self.events.cancel(EVENT_DISK);
    }

    /// Insert a disk image into a drive slot.
    pub fn load_disk(&mut self, drive: usize, data: Vec<u8>) -> Result<(), String> {
        if drive >= DRIVE_COUNT {
            return Err(format!("no drive {drive}"));
        }
        self.fdc.drives[drive].disk = if data.is_empty() {
            None
        } else {
            Some(DiskImage::recognize(data)?)
        };
        self.fdc.drives[drive].data_offset = 0;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Scheduled event handlers
    // -----------------------------------------------------------------------

    /// Delayed command completion: clear Busy, set any extra bits, raise
    /// the completion interrupt.
    pub(crate) fn disk_done(&mut self, bits: u8) {
        self.fdc.status &= !DISK_BUSY;
        self.fdc.status |= bits;
        self.interrupts.disk_intrq_interrupt(true);
    }

    /// Abort the command with LostData if it is still in progress.
    pub(crate) fn disk_lost_data(&mut self, command: u8) {
        if self.fdc.current_command == command {
            self.fdc.status &= !DISK_BUSY;
            self.fdc.status |= DISK_LOST_DATA;
            self.fdc.byte_count = 0;
            self.interrupts.disk_intrq_interrupt(true);
        }
    }

    /// Delayed command start: raise DRQ plus any extra bits and arm the
    /// lost-data watchdog.
    pub(crate) fn disk_first_drq(&mut self, bits: u8) {
        self.fdc.status |= DISK_DRQ | bits;
        let command = self.fdc.current_command;
        let clock = self.clock;
        self.events.add(
            EVENT_DISK_LOST_DATA,
            EventAction::DiskLostData { command },
            clock + CPU_HZ / 2,
        );
    }

    /// See whether the motor timeout has passed and stop the motor if so.
    /// Returns whether the motor is stopped.
    pub(crate) fn check_disk_motor_off(&mut self) -> bool {
        let stopped = self.clock > self.fdc.motor_timeout;
        if stopped {
            self.set_disk_motor(false);
            self.fdc.status |= DISK_NOT_RDY;

            if is_read_write_command(self.fdc.current_command) && self.fdc.status & DISK_DRQ != 0 {
                // Also end the command and set Lost Data.
                self.fdc.status = (self.fdc.status | DISK_LOST_DATA) & !(DISK_BUSY | DISK_DRQ);
                self.fdc.byte_count = 0;
            }
        }

        stopped
    }

    fn set_disk_motor(&mut self, value: bool) {
        if self.fdc.motor_on != value {
            self.fdc.motor_on = value;
            let drive = self.fdc.current_drive as i32;
            self.send_update(VmUpdate::motor(drive, value));
        }
    }

    /// How far we've rotated from the leading edge of the index hole, in
    /// [0, 1). For the first `DISK_HOLE_WIDTH` we're over the hole.
    #[allow(clippy::cast_precision_loss)]
    fn disk_angle(&self) -> f32 {
        (self.clock % CLOCKS_PER_REVOLUTION) as f32 / CLOCKS_PER_REVOLUTION as f32
    }

    // -----------------------------------------------------------------------
    // Register access
    // -----------------------------------------------------------------------

    /// Refresh the Type I status view (index, track zero, write protect,
    /// head engaged). Read/write commands own the status themselves.
    fn update_disk_status(&mut self) {
        if is_read_write_command(self.fdc.current_command) {
            return;
        }

        if self.fdc.drive().disk.is_none() {
            self.fdc.status |= DISK_INDEX;
        } else {
            if self.disk_angle() < DISK_HOLE_WIDTH {
                self.fdc.status |= DISK_INDEX;
            } else {
                self.fdc.status &= !DISK_INDEX;
            }

            // Disks are always write-protected.
            self.fdc.status |= DISK_WRITE_PRT;
        }

        if self.fdc.drive().physical_track == 0 {
            self.fdc.status |= DISK_TRK_ZERO;
        } else {
            self.fdc.status &= !DISK_TRK_ZERO;
        }

        // RDY and HLT are wired together on the Model III.
        if self.fdc.status & DISK_NOT_RDY != 0 {
            self.fdc.status &= !DISK_HEAD_ENGD;
        } else {
            self.fdc.status |= DISK_HEAD_ENGD;
        }
    }

    pub(crate) fn read_disk_status(&mut self) -> u8 {
        self.update_disk_status();

        // Turn off the motor if it's been running too long.
        if self.fdc.status & DISK_NOT_RDY == 0 && self.clock > self.fdc.motor_timeout {
            self.set_disk_motor(false);
            self.fdc.status |= DISK_NOT_RDY;
        }

        self.interrupts.disk_intrq_interrupt(false);

        self.fdc.status
    }

    pub(crate) fn read_disk_track(&self) -> u8 {
        self.fdc.track
    }

    pub(crate) fn read_disk_sector(&self) -> u8 {
        self.fdc.sector
    }

    /// Read the data register. During a read command this consumes one
    /// byte of the sector; exhausting the count clears DRQ, cancels the
    /// watchdog, and schedules completion.
    pub(crate) fn read_disk_data(&mut self) -> u8 {
        if self.fdc.current_command & DISK_COMMAND_MASK == DISK_READ
            && self.fdc.byte_count > 0
            && self.fdc.status & DISK_DRQ != 0
        {
            let drive = &mut self.fdc.drives[self.fdc.current_drive];
            let c = match &drive.disk {
                Some(image) if drive.data_offset < image.data().len() => {
                    let c = image.data()[drive.data_offset];
                    drive.data_offset += 1;
                    c
                }
                Some(image) => {
                    // Reading past the end of the image.
                    if matches!(image, DiskImage::Jv3(_)) {
                        self.fdc.status &= !DISK_REC_TYPE;
                        self.fdc.status |= DISK_1791_FB;
                    }
                    0xE5
                }
                None => 0xE5,
            };
            self.fdc.data = c;
            self.fdc.byte_count -= 1;
            if self.fdc.byte_count == 0 {
                self.fdc.status &= !DISK_DRQ;
                self.events.cancel(EVENT_DISK_LOST_DATA);
                let clock = self.clock;
                self.events
                    .add(EVENT_DISK_DONE, EventAction::DiskDone { bits: 0 }, clock + 64);
            }
        }

        self.fdc.data
    }

    /// Start a new command.
    pub(crate) fn write_disk_command(&mut self, command: u8) {
        self.events.cancel(EVENT_DISK_LOST_DATA);
        self.interrupts.disk_intrq_interrupt(false);
        self.fdc.byte_count = 0;
        self.fdc.current_command = command;

        let clock = self.clock;
        match command & DISK_COMMAND_MASK {
            DISK_RESTORE => {
                self.fdc.last_read_adr = -1;
                self.fdc.drive_mut().physical_track = 0;
                self.fdc.track = 0;
                self.fdc.status = DISK_TRK_ZERO | DISK_BUSY;
                if command & DISK_V_MASK != 0 {
                    self.disk_verify();
                }
                self.events
                    .add(EVENT_DISK_DONE, EventAction::DiskDone { bits: 0 }, clock + 2000);
            }
            DISK_SEEK => {
                self.fdc.last_read_adr = -1;
                let delta = self.fdc.data.wrapping_sub(self.fdc.track);
                let drive = self.fdc.drive_mut();
                drive.physical_track = drive.physical_track.wrapping_add(delta);
                self.fdc.track = self.fdc.data;
                if self.fdc.drive().physical_track == 0 {
                    self.fdc.status = DISK_TRK_ZERO | DISK_BUSY;
                } else {
                    self.fdc.status = DISK_BUSY;
                }
                if command & DISK_V_MASK != 0 {
                    self.disk_verify();
                }
                self.events
                    .add(EVENT_DISK_DONE, EventAction::DiskDone { bits: 0 }, clock + 2000);
            }
            DISK_STEP | DISK_STEP_U | DISK_STEP_IN | DISK_STEP_IN_U | DISK_STEP_OUT
            | DISK_STEP_OUT_U => {
                self.disk_step(command);
            }
            DISK_READ => {
                self.fdc.last_read_adr = -1;
                self.fdc.status = 0;
                let mut goal_side = -1i32;
                if command & DISK_C_MASK != 0 {
                    goal_side = i32::from(command & DISK_B_MASK != 0);
                }
                let sector_index = self.search_sector(i32::from(self.fdc.sector), goal_side);
                if sector_index < 0 {
                    self.fdc.status |= DISK_BUSY;
                    self.events
                        .add(EVENT_DISK_DONE, EventAction::DiskDone { bits: 0 }, clock + 512);
                } else {
                    let index = sector_index as usize;
                    let double_density = self.fdc.double_density;
                    let drive = &mut self.fdc.drives[self.fdc.current_drive];
                    let mut new_status = 0;
                    match &drive.disk {
                        Some(DiskImage::Jv1(_)) => {
                            // Track 17 is the directory, marked with the
                            // deleted data address mark.
                            if drive.physical_track == 17 {
                                new_status = DISK_1791_F8;
                            }
                            self.fdc.byte_count = format_jv::JV1_BYTES_PER_SECTOR;
                            drive.data_offset = Jv1Disk::data_offset(index);
                        }
                        Some(DiskImage::Jv3(jv3)) => {
                            let flags = jv3.id(index).flags;
                            new_status = if double_density {
                                match flags & JV3_DAM {
                                    JV3_DAM_DD_FB => DISK_1791_FB,
                                    JV3_DAM_DD_F8 => DISK_1791_F8,
                                    _ => DISK_1791_FB,
                                }
                            } else {
                                match flags & JV3_DAM {
                                    JV3_DAM_SD_FB => DISK_1791_FB,
                                    JV3_DAM_SD_FA => {
                                        if DISK_TRUE_DAM {
                                            DISK_1791_FB
                                        } else {
                                            DISK_1791_F8
                                        }
                                    }
                                    JV3_DAM_SD_F9 | JV3_DAM_SD_F8 => DISK_1791_F8,
                                    _ => DISK_1791_FB,
                                }
                            };
                            if flags & JV3_ERROR != 0 {
                                new_status |= DISK_CRC_ERR;
                            }
                            self.fdc.byte_count = jv3.id(index).size();
                            drive.data_offset = jv3.data_offset(index);
                        }
                        None => {}
                    }
                    self.fdc.status |= DISK_BUSY;
                    self.events.add(
                        EVENT_DISK_FIRST_DRQ,
                        EventAction::DiskFirstDrq { bits: new_status },
                        clock + 64,
                    );
                }
            }
            DISK_FORCE_INT => {
                // Stop whatever is going on and forget it.
                self.events.cancel(EVENT_DISK);
                self.fdc.status = 0;
                self.update_disk_status();
                if command & 0x07 != 0 {
                    self.set_fatal(format!(
                        "conditional force-interrupt {command:02X} not implemented"
                    ));
                } else if command & 0x08 != 0 {
                    // Immediate interrupt.
                    self.interrupts.disk_intrq_interrupt(true);
                } else {
                    self.interrupts.disk_intrq_interrupt(false);
                }
            }
            DISK_READ_M | DISK_WRITE | DISK_WRITE_M | DISK_READ_ADR | DISK_READ_TRK
            | DISK_WRITE_TRK => {
                self.set_fatal(format!("disk command {command:02X} not implemented"));
            }
            _ => unreachable!(),
        }
    }

    /// Type I step variants: move the head one track and finish like a
    /// seek. The U bit copies the new position into the track register.
    fn disk_step(&mut self, command: u8) {
        self.fdc.last_read_adr = -1;

        let direction = match command & DISK_COMMAND_MASK {
            DISK_STEP_IN | DISK_STEP_IN_U => 1,
            DISK_STEP_OUT | DISK_STEP_OUT_U => -1,
            _ => self.fdc.last_step_direction,
        };
        self.fdc.last_step_direction = direction;

        let drive = self.fdc.drive_mut();
        if direction > 0 {
            drive.physical_track = drive.physical_track.saturating_add(1);
        } else {
            drive.physical_track = drive.physical_track.saturating_sub(1);
        }

        if matches!(
            command & DISK_COMMAND_MASK,
            DISK_STEP_U | DISK_STEP_IN_U | DISK_STEP_OUT_U
        ) {
            self.fdc.track = self.fdc.drive().physical_track;
        }

        if self.fdc.drive().physical_track == 0 {
            self.fdc.status = DISK_TRK_ZERO | DISK_BUSY;
        } else {
            self.fdc.status = DISK_BUSY;
        }

        if command & DISK_V_MASK != 0 {
            self.disk_verify();
        }
        let clock = self.clock;
        self.events
            .add(EVENT_DISK_DONE, EventAction::DiskDone { bits: 0 }, clock + 2000);
    }

    pub(crate) fn write_disk_track(&mut self, value: u8) {
        self.fdc.track = value;
    }

    pub(crate) fn write_disk_sector(&mut self, value: u8) {
        self.fdc.sector = value;
    }

    /// Write the data register. Write commands are refused before any
    /// image byte could change; disks stay read-only.
    pub(crate) fn write_disk_data(&mut self, value: u8) {
        match self.fdc.current_command & DISK_COMMAND_MASK {
            DISK_WRITE | DISK_WRITE_TRK => {
                self.set_fatal("write to a write-protected disk".to_string());
            }
            _ => {}
        }

        self.fdc.data = value;
    }

    /// Drive select: side, density, drive number, motor.
    pub(crate) fn write_disk_select(&mut self, value: u8) {
        self.fdc.status &= !DISK_NOT_RDY;
        self.fdc.side = u8::from(value & SELECT_SIDE != 0);
        self.fdc.double_density = value & SELECT_MFM != 0;

        if value & SELECT_WAIT != 0 {
            // The program wants to block until the pending command ends;
            // jump the clock to the next disk event and run it.
            let event_clock = self
                .events
                .first_event(EVENT_DISK & !EVENT_DISK_LOST_DATA)
                .map(|event| event.clock);
            if let Some(event_clock) = event_clock {
                self.clock = event_clock;
                self.dispatch_events();
            }
        }

        match value & SELECT_DRIVE_MASK {
            0 => self.fdc.status |= DISK_NOT_RDY,
            SELECT_DRIVE_0 => self.fdc.current_drive = 0,
            SELECT_DRIVE_1 => self.fdc.current_drive = 1,
            SELECT_DRIVE_2 => self.fdc.current_drive = 2,
            SELECT_DRIVE_3 => self.fdc.current_drive = 3,
            other => {
                self.set_fatal(format!("drive select {other:02X} not handled"));
                return;
            }
        }

        // If a drive was selected, spin up its motor.
        if self.fdc.status & DISK_NOT_RDY == 0 {
            self.set_disk_motor(true);
            self.fdc.motor_timeout = self.clock + MOTOR_TIME_AFTER_SELECT * CPU_HZ;
            self.interrupts.disk_motor_off_interrupt(false);
        }
    }

    // -----------------------------------------------------------------------
    // Sector lookup
    // -----------------------------------------------------------------------

    /// Search for a sector on the current physical track. Returns its
    /// index within the image's sector array, or -1 (setting NotFound).
    ///
    /// `sector` of -1 matches the first sector found; `side` of 0 or 1
    /// compares against the sector ID, -1 skips the compare.
    pub(crate) fn search_sector(&mut self, sector: i32, side: i32) -> i32 {
        match self.search_sector_inner(sector, side) {
            Some(index) => index,
            None => {
                self.fdc.status |= DISK_NOT_FOUND;
                -1
            }
        }
    }

    fn search_sector_inner(&self, sector: i32, side: i32) -> Option<i32> {
        let fdc_side = i32::from(self.fdc.side);
        let fdc_track = self.fdc.track;
        let double_density = self.fdc.double_density;
        let drive = self.fdc.drive();
        let physical_track = drive.physical_track;

        match &drive.disk {
            None => None,
            Some(DiskImage::Jv1(_)) => {
                if usize::from(physical_track) >= JV1_TRACKS
                    || self.fdc.side == 1
                    || side == 1
                    || sector >= JV1_SECTORS_PER_TRACK as i32
                    || physical_track != fdc_track
                {
                    return None;
                }

                let sector = sector.max(0);
                Some(Jv1Disk::sector_index(physical_track, sector as u8) as i32)
            }
            Some(DiskImage::Jv3(jv3)) => {
                if usize::from(physical_track) >= MAX_TRACKS
                    || usize::from(self.fdc.side) >= JV3_MAX_SIDES
                    || (side != -1 && side != fdc_side)
                    || physical_track != fdc_track
                {
                    return None;
                }

                jv3.find_sector(physical_track, self.fdc.side, sector, double_density)
                    .map(|index| index as i32)
            }
        }
    }

    /// Verify that the head is on the expected track, for Type I commands
    /// with the V bit.
    fn disk_verify(&mut self) {
        let is_jv1 = matches!(self.fdc.drive().disk, Some(DiskImage::Jv1(_)));
        let is_jv3 = matches!(self.fdc.drive().disk, Some(DiskImage::Jv3(_)));

        if is_jv1 {
            if self.fdc.double_density {
                self.fdc.status |= DISK_NOT_FOUND;
            } else if self.fdc.track != self.fdc.drive().physical_track {
                self.fdc.status |= DISK_SEEK_ERR;
            }
        } else if is_jv3 {
            // Seek error and not-found report the same way here.
            self.search_sector(-1, -1);
        } else {
            self.fdc.status |= DISK_NOT_FOUND;
        }
    }
}
