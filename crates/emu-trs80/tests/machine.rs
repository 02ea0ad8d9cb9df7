//! Machine-level tests: programs running against the full bus, the disk
//! controller's command flow, cassette edges, and the VM loop.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use emu_core::{Bus, IoBus};
use emu_trs80::interrupts::{CASSETTE_IRQS, DISK_INTRQ_NMI, RESET_NMI, TIMER_IRQ};
use emu_trs80::{Machine, VmCommand, VmUpdate, CPU_HZ, TIMER_CYCLES};

/// A machine with no ROM: everything below 0x4000 unmapped, program
/// poked into RAM.
fn ram_machine(program: &[u8], at: u16) -> Machine {
    let mut machine = Machine::new(&[], None);
    machine.set_pacing(false);
    for (i, &b) in program.iter().enumerate() {
        machine.bus.write(at + i as u16, b);
    }
    machine.cpu.regs.pc = at;
    machine.cpu.regs.sp = 0x9000;
    machine
}

fn command(cmd: &str, addr: i32, data: &str) -> VmCommand {
    VmCommand {
        cmd: cmd.to_string(),
        addr,
        data: data.to_string(),
    }
}

#[test]
fn program_advances_clock_by_cycle_counts() {
    // LD A,5 ; LD B,3 ; ADD A,B
    let mut machine = ram_machine(&[0x3E, 0x05, 0x06, 0x03, 0x80], 0x4000);

    machine.step().unwrap();
    machine.step().unwrap();
    machine.step().unwrap();

    assert_eq!(machine.cpu.regs.a, 8);
    assert_eq!(machine.cpu.regs.f & 0xD5, 0, "S, Z, H, P/V, C all clear");
    assert_eq!(machine.bus.clock, 7 + 7 + 4);
}

#[test]
fn screen_write_pokes_the_ui() {
    let (tx, rx) = mpsc::channel();
    let mut machine = Machine::new(&[], Some(tx));
    machine.set_pacing(false);
    // LD HL,0x3C00 ; LD (HL),'H'
    for (i, &b) in [0x21, 0x00, 0x3C, 0x36, 0x48].iter().enumerate() {
        machine.bus.write(0x4000 + i as u16, b);
    }
    machine.cpu.regs.pc = 0x4000;

    machine.step().unwrap();
    machine.step().unwrap();

    assert_eq!(machine.bus.read(0x3C00), 0x48);
    assert_eq!(rx.try_recv().unwrap(), VmUpdate::poke(0x3C00, 0x48));
    assert!(rx.try_recv().is_err(), "exactly one poke");
}

#[test]
fn keyboard_press_and_release_via_memory_map() {
    let mut machine = Machine::new(&[], None);
    machine.set_pacing(false);
    machine.bus.clock = 1; // Open the debounce window.

    assert!(machine.bus.keyboard.key_event("A", true));
    assert_eq!(machine.bus.read(0x3801), 0x02);

    machine.bus.keyboard.key_event("A", false);
    machine.bus.clock += 50_000;
    assert_eq!(machine.bus.read(0x3801), 0x00);
}

/// A JV1 image where sector k is filled with k mod 256.
fn patterned_jv1() -> Vec<u8> {
    let mut data = vec![0u8; format_jv::JV1_SIZE];
    for (i, byte) in data.iter_mut().enumerate() {
        *byte = (i / 256) as u8;
    }
    data
}

#[test]
fn jv1_sector_read_full_command_flow() {
    let mut machine = Machine::new(&[], None);
    machine.set_pacing(false);
    machine.load_disk(0, patterned_jv1()).unwrap();
    let bus = &mut machine.bus;

    // Unmask the disk IntRq NMI so completion is observable.
    bus.write_io(0xE4, DISK_INTRQ_NMI);

    // Select drive 0, track 0, sector 0, then issue the read.
    bus.write_io(0xF4, 0x01);
    bus.write_io(0xF1, 0x00);
    bus.write_io(0xF2, 0x00);
    bus.write_io(0xF0, 0x80);

    assert_ne!(bus.fdc.status & 0x01, 0, "busy after the command");
    assert_eq!(bus.fdc.status & 0x02, 0, "no DRQ until the event fires");

    // DRQ comes 64 cycles later.
    bus.clock += 64;
    bus.dispatch_events();
    assert_ne!(bus.fdc.status & 0x02, 0, "DRQ raised");

    // Read the whole sector through the data port.
    for i in 0..256 {
        let byte = bus.read_io(0xF3);
        assert_eq!(byte, 0x00, "sector 0 byte {i}");
    }
    assert_eq!(bus.fdc.status & 0x02, 0, "DRQ cleared after 256 bytes");

    // Completion 64 cycles later clears Busy and raises the NMI.
    bus.clock += 64;
    bus.dispatch_events();
    assert_eq!(bus.fdc.status & 0x01, 0, "busy cleared");
    assert_ne!(bus.interrupts.nmi_latch & DISK_INTRQ_NMI, 0);
    assert!(bus.interrupts.nmi_pending());

    // A different sector reads its own pattern.
    bus.write_io(0xF2, 0x03);
    bus.write_io(0xF0, 0x80);
    bus.clock += 64;
    bus.dispatch_events();
    assert_eq!(bus.read_io(0xF3), 0x03);
}

#[test]
fn jv1_missing_sector_sets_not_found() {
    let mut machine = Machine::new(&[], None);
    machine.set_pacing(false);
    machine.load_disk(0, patterned_jv1()).unwrap();
    let bus = &mut machine.bus;

    bus.write_io(0xF4, 0x01);
    bus.write_io(0xF1, 0x00);
    bus.write_io(0xF2, 0x0B); // JV1 tracks have 10 sectors.
    bus.write_io(0xF0, 0x80);

    assert_ne!(bus.fdc.status & 0x10, 0, "NotFound");

    // The no-op completion fires 512 cycles later.
    bus.clock += 512;
    bus.dispatch_events();
    assert_eq!(bus.fdc.status & 0x01, 0, "busy cleared");
}

#[test]
fn drive_select_starts_motor_with_timeout() {
    let mut machine = Machine::new(&[], None);
    machine.load_disk(0, patterned_jv1()).unwrap();
    let bus = &mut machine.bus;

    bus.write_io(0xF4, 0x01);
    assert!(bus.fdc.motor_on);
    assert_eq!(bus.fdc.motor_timeout, bus.clock + 2 * CPU_HZ);

    // Status reads fine while the motor runs.
    let status = bus.read_io(0xF0);
    assert_eq!(status & 0x80, 0, "ready");

    // Once the timeout passes, a status read stops the motor.
    bus.clock = bus.fdc.motor_timeout + 1;
    let status = bus.read_io(0xF0);
    assert_ne!(status & 0x80, 0, "not ready after timeout");
    assert!(!bus.fdc.motor_on);
}

#[test]
fn write_command_is_fatal_but_touches_nothing() {
    let mut machine = Machine::new(&[], None);
    machine.set_pacing(false);
    let image = patterned_jv1();
    machine.load_disk(0, image.clone()).unwrap();
    let bus = &mut machine.bus;

    bus.write_io(0xF4, 0x01);
    bus.write_io(0xF0, 0xA0); // Write sector.
    assert!(bus.take_fatal().is_some());

    if let Some(format_jv::DiskImage::Jv1(disk)) = &bus.fdc.drives[0].disk {
        assert_eq!(disk.data, image, "image unchanged");
    } else {
        panic!("drive 0 should hold a JV1 image");
    }
}

#[test]
fn cassette_edges_raise_interrupts() {
    // Two samples, +10000 then -10000, at 1 Hz: one edge per virtual
    // second.
    let path = std::env::temp_dir().join(format!("trs80-tape-{}.wav", std::process::id()));
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 1,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    writer.write_sample(10_000i16).unwrap();
    writer.write_sample(-10_000i16).unwrap();
    writer.finalize().unwrap();

    let mut machine = Machine::new(&[], None);
    machine.set_pacing(false);
    machine.set_cassette_file(path.clone());
    let bus = &mut machine.bus;

    bus.write_io(0xE0, CASSETTE_IRQS);
    bus.set_cassette_motor(true);
    bus.update_cassette(); // Opens the tape, anchoring the sample clock.

    // After one virtual second the positive sample has been read.
    bus.clock = CPU_HZ;
    bus.update_cassette();
    assert_ne!(bus.interrupts.irq_latch & 0x01, 0, "rise latched");
    assert!(bus.interrupts.irq_pending());

    // After two, the negative one.
    bus.clock = 2 * CPU_HZ;
    bus.update_cassette();
    assert_ne!(bus.interrupts.irq_latch & 0x02, 0, "fall latched");

    // Flip-flop set, last non-neutral was negative.
    assert_eq!(bus.read_io(0xFF) & 0x81, 0x80);
    assert_eq!(bus.interrupts.irq_latch & CASSETTE_IRQS, 0, "read acknowledged");

    // Past the end the tape reads as silence and raises nothing more.
    bus.clock = 10 * CPU_HZ;
    bus.update_cassette();
    assert_eq!(bus.interrupts.irq_latch & CASSETTE_IRQS, 0);

    let _ = std::fs::remove_file(path);
}

#[test]
fn timer_fires_at_thirty_hertz() {
    let mut machine = ram_machine(&[0x00; 64], 0x4000); // NOPs

    let mut fired = 0;
    while machine.bus.clock < 3 * TIMER_CYCLES + 100 {
        machine.cpu.regs.pc = 0x4000; // Stay inside the NOP block.
        machine.step().unwrap();
        if machine.bus.interrupts.irq_latch & TIMER_IRQ != 0 {
            fired += 1;
            machine.bus.interrupts.timer_interrupt(false);
        }
    }

    assert_eq!(fired, 3);
}

#[test]
fn halt_waits_for_timer_interrupt() {
    // LD A,TIMER ; OUT (E0),A ; EI ; HALT
    let mut machine = ram_machine(&[0x3E, 0x04, 0xD3, 0xE0, 0xFB, 0x76], 0x4000);

    let mut steps = 0;
    while machine.cpu.regs.pc != 0x0038 {
        machine.step().unwrap();
        steps += 1;
        assert!(steps < 100_000, "IRQ should arrive within a timer period");
    }

    // The return address pushed is past the HALT.
    assert_eq!(machine.bus.read(0x8FFE), 0x06);
    assert_eq!(machine.bus.read(0x8FFF), 0x40);
    assert!(!machine.cpu.regs.iff1, "IRQ entry disables interrupts");
}

#[test]
fn soft_reset_presses_the_reset_button() {
    let rom = vec![0x00u8; 0x100]; // NOPs, including the NMI vector.
    let mut machine = Machine::new(&rom, None);
    machine.set_pacing(false);
    machine.cpu.regs.sp = 0x9000;

    machine.reset(false);
    assert_ne!(machine.bus.interrupts.nmi_latch & RESET_NMI, 0);

    machine.step().unwrap();
    assert_eq!(machine.cpu.regs.pc, 0x0066, "NMI vector taken");
    // The button auto-releases after the NMI.
    assert_eq!(machine.bus.interrupts.nmi_latch & RESET_NMI, 0);

    machine.step().unwrap();
    assert_eq!(machine.cpu.regs.pc, 0x0067, "no NMI re-entry on the same edge");
}

#[test]
fn unknown_opcode_is_fatal() {
    let mut machine = ram_machine(&[0xED, 0x00], 0x4000);
    let err = machine.step().unwrap_err();
    assert!(err.contains("unknown opcode"));
}

#[test]
fn breakpoint_stops_and_boot_resumes() {
    let rom = vec![0x00u8; 0x100]; // NOPs
    let (update_tx, update_rx) = mpsc::channel();
    let (command_tx, command_rx) = mpsc::channel();

    let mut machine = Machine::new(&rom, Some(update_tx));
    machine.set_pacing(false);
    let vm = thread::spawn(move || machine.run(&command_rx));

    command_tx.send(command("add_breakpoint", 0x0005, "")).unwrap();
    command_tx.send(command("boot", 0, "")).unwrap();

    // Wait for the breakpoint to fire.
    let mut hit = None;
    for _ in 0..1000 {
        match update_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(update) if update.cmd == "breakpoint" => {
                hit = update.addr;
                break;
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    assert_eq!(hit, Some(5));

    // Resume, then shut down. The VM must not re-fire the same
    // breakpoint without executing.
    command_tx.send(command("boot", 0, "")).unwrap();
    command_tx.send(command("shutdown", 0, "")).unwrap();

    let mut saw_shutdown = false;
    while let Ok(update) = update_rx.recv_timeout(Duration::from_secs(5)) {
        assert_ne!(update.cmd, "breakpoint", "no spurious re-fire");
        if update.cmd == "shutdown" {
            saw_shutdown = true;
            break;
        }
    }
    assert!(saw_shutdown);

    vm.join().unwrap();
}

#[test]
fn tron_toggles_trace_with_messages() {
    let (update_tx, update_rx) = mpsc::channel();
    let (command_tx, command_rx) = mpsc::channel();

    let mut machine = Machine::new(&[], Some(update_tx));
    machine.set_pacing(false);
    let vm = thread::spawn(move || machine.run(&command_rx));

    command_tx.send(command("tron", 0, "")).unwrap();
    let update = update_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(update.msg.as_deref(), Some("Trace is on"));

    command_tx.send(command("tron", 0, "")).unwrap();
    let update = update_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(update.msg.as_deref(), Some("Trace is off"));

    command_tx.send(command("shutdown", 0, "")).unwrap();
    vm.join().unwrap();
}

#[test]
fn jv1_track_out_of_range_sets_not_found() {
    let mut machine = Machine::new(&[], None);
    machine.set_pacing(false);
    machine.load_disk(0, patterned_jv1()).unwrap();
    let bus = &mut machine.bus;

    bus.write_io(0xF4, 0x01);
    // Seek to track 40: the head moves, but JV1 disks only have 35 tracks.
    bus.write_io(0xF3, 40);
    bus.write_io(0xF0, 0x10);
    bus.clock += 2000;
    bus.dispatch_events();

    bus.write_io(0xF2, 0x00);
    bus.write_io(0xF0, 0x80);
    assert_ne!(bus.fdc.status & 0x10, 0, "NotFound past track 34");
}

/// A single-block JV3 image with three 256-byte sectors on track 0 and a
/// recognizable byte in each.
fn small_jv3() -> Vec<u8> {
    let mut data = vec![0u8; format_jv::JV3_SIZE_ONE_BLOCK];
    for chunk in data[..3 * format_jv::JV3_SECTORS_PER_BLOCK].chunks_mut(3) {
        chunk.copy_from_slice(&[0xFF, 0xFF, 0xFF]);
    }
    // Track 0, sectors 0-2, single density, used size code 0 = 256 bytes.
    for sector in 0..3u8 {
        data[3 * usize::from(sector)] = 0;
        data[3 * usize::from(sector) + 1] = sector;
        data[3 * usize::from(sector) + 2] = 0;
        let offset = format_jv::JV3_SECTOR_START + usize::from(sector) * 256;
        data[offset] = 0xC0 + sector;
    }
    data
}

#[test]
fn jv3_sector_read_matches_density() {
    let mut machine = Machine::new(&[], None);
    machine.set_pacing(false);
    machine.load_disk(0, small_jv3()).unwrap();
    let bus = &mut machine.bus;

    // Single density select (MFM bit clear).
    bus.write_io(0xF4, 0x01);
    bus.write_io(0xF1, 0x00);
    bus.write_io(0xF2, 0x01);
    bus.write_io(0xF0, 0x80);
    bus.clock += 64;
    bus.dispatch_events();
    assert_eq!(bus.read_io(0xF3), 0xC1, "first byte of sector 1");

    // Double density select finds nothing on this disk.
    bus.write_io(0xF4, 0x81);
    bus.write_io(0xF0, 0x80);
    assert_ne!(bus.fdc.status & 0x10, 0, "NotFound in the wrong density");
}
