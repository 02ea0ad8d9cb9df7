//! JV1 and JV3 floppy disk image formats.
//!
//! Both formats are Jeff Vavasour's TRS-80 disk images. JV1 is the bare
//! sector data of a 35-track single-sided single-density disk. JV3 adds a
//! table of sector descriptors so that mixed densities, sizes, and sides
//! can be represented.
//!
//! # JV3 layout
//!
//! One or two blocks. Each block is 2901 descriptors of
//! `{track, sector, flags}` (3 bytes each); the sector data a block
//! describes starts `34 * 256` bytes past the block start. A track byte of
//! 0xFF marks a free descriptor. The flags encode density, data address
//! mark, side, CRC error, and a 2-bit size code whose meaning differs for
//! used and free sectors.
//!
//! Loading precomputes the byte offset of every sector, the free-list head
//! per size code, and a permutation of descriptor indices sorted by
//! (track, side, original index) with a per-(track, side) start table for
//! fast sector search.

/// Exact byte size of a JV1 image: 35 tracks of 10 sectors of 256 bytes.
pub const JV1_SIZE: usize = 89_600;

/// Bytes per JV1 sector.
pub const JV1_BYTES_PER_SECTOR: usize = 256;

/// Sectors per JV1 track.
pub const JV1_SECTORS_PER_TRACK: usize = 10;

/// Number of JV1 tracks.
pub const JV1_TRACKS: usize = 35;

/// Start of sector data within a JV3 block (end of the descriptor table).
pub const JV3_SECTOR_START: usize = 34 * 256;

/// Descriptors per JV3 block.
pub const JV3_SECTORS_PER_BLOCK: usize = JV3_SECTOR_START / 3;

/// Maximum descriptors in a JV3 image (two blocks).
pub const JV3_SECTORS_MAX: usize = 2 * JV3_SECTORS_PER_BLOCK;

/// Sides supported by the JV3 format.
pub const JV3_MAX_SIDES: usize = 2;

/// Byte size of a single-block JV3 image.
pub const JV3_SIZE_ONE_BLOCK: usize = 193_024;

/// Byte size of a two-block JV3 image.
pub const JV3_SIZE_TWO_BLOCKS: usize = 377_344;

/// Highest track number representable.
pub const MAX_TRACKS: usize = 255;

// JV3 descriptor flag bits.
/// 1 = double density, 0 = single density.
pub const JV3_DENSITY: u8 = 0x80;
/// Data address mark code; values below.
pub const JV3_DAM: u8 = 0x60;
pub const JV3_DAM_SD_FB: u8 = 0x00;
pub const JV3_DAM_SD_FA: u8 = 0x20;
pub const JV3_DAM_SD_F9: u8 = 0x40;
pub const JV3_DAM_SD_F8: u8 = 0x60;
pub const JV3_DAM_DD_FB: u8 = 0x00;
pub const JV3_DAM_DD_F8: u8 = 0x20;
/// 0 = side 0, 1 = side 1.
pub const JV3_SIDE: u8 = 0x10;
/// 0 = ok, 1 = CRC error.
pub const JV3_ERROR: u8 = 0x08;
/// 0 = normal, 1 = short (VTOS 3.0).
pub const JV3_NON_IBM: u8 = 0x04;
/// Two-bit size code; see `SectorId::size_code`.
pub const JV3_SIZE_MASK: u8 = 0x03;
/// Track/sector value marking a free descriptor.
pub const JV3_FREE: u8 = 0xFF;

/// One JV3 sector descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorId {
    pub track: u8,
    pub sector: u8,
    pub flags: u8,
}

impl SectorId {
    /// A free descriptor (all bytes 0xFF).
    #[must_use]
    pub const fn free() -> Self {
        Self {
            track: JV3_FREE,
            sector: JV3_FREE,
            flags: JV3_FREE,
        }
    }

    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.track == JV3_FREE
    }

    /// Which side this sector is on (0 or 1).
    #[must_use]
    pub const fn side(&self) -> u8 {
        if self.flags & JV3_SIDE != 0 {
            1
        } else {
            0
        }
    }

    #[must_use]
    pub const fn double_density(&self) -> bool {
        self.flags & JV3_DENSITY != 0
    }

    /// Size code 0-3 for 128, 256, 512, 1024 bytes.
    ///
    /// The raw flag bits mean different sizes in used and free sectors:
    /// used 0=256, 1=128, 2=1024, 3=512; free 0=512, 1=1024, 2=128, 3=256.
    /// XORing with 1 (used) or 2 (free) normalizes both to the power code.
    #[must_use]
    pub const fn size_code(&self) -> u8 {
        let code = self.flags & JV3_SIZE_MASK;
        let flip_mask = if self.is_free() { 2 } else { 1 };
        code ^ flip_mask
    }

    /// Size of this sector in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        128 << self.size_code()
    }
}

/// A recognized disk image.
pub enum DiskImage {
    Jv1(Jv1Disk),
    Jv3(Jv3Disk),
}

impl DiskImage {
    /// Recognize an image by its file size and parse it.
    ///
    /// # Errors
    ///
    /// Returns an error for sizes that are neither JV1 nor JV3.
    pub fn recognize(data: Vec<u8>) -> Result<Self, String> {
        match data.len() {
            JV1_SIZE => Ok(Self::Jv1(Jv1Disk { data })),
            JV3_SIZE_ONE_BLOCK | JV3_SIZE_TWO_BLOCKS => Ok(Self::Jv3(Jv3Disk::load(data))),
            other => Err(format!("don't know format of {other}-byte disk")),
        }
    }

    /// The raw image bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        match self {
            Self::Jv1(disk) => &disk.data,
            Self::Jv3(disk) => &disk.data,
        }
    }
}

/// A JV1 image: sectors laid out track-major, sector-minor.
pub struct Jv1Disk {
    pub data: Vec<u8>,
}

impl Jv1Disk {
    /// Linear sector index for (track, sector).
    #[must_use]
    pub fn sector_index(track: u8, sector: u8) -> usize {
        JV1_SECTORS_PER_TRACK * usize::from(track) + usize::from(sector)
    }

    /// Byte offset of a sector by its linear index.
    #[must_use]
    pub fn data_offset(index: usize) -> usize {
        index * JV1_BYTES_PER_SECTOR
    }
}

/// A JV3 image with its precomputed lookup structures.
pub struct Jv3Disk {
    pub data: Vec<u8>,

    /// Descriptor table, with one extra free sentinel so scans terminate.
    id: Vec<SectorId>,
    /// Byte offset of each descriptor's sector data in the image.
    offset: Vec<usize>,
    /// Permutation of descriptor indices sorted by (track, side, index).
    sorted_id: Vec<usize>,
    /// First sorted position for each (track, side), or -1 when empty.
    track_start: Vec<[i32; JV3_MAX_SIDES]>,
    /// First free descriptor per size code, or `JV3_SECTORS_MAX` when none.
    free_id: [usize; 4],
    /// Highest used descriptor index, or -1.
    last_used_id: i32,
    /// How many descriptor blocks the image holds (1 or 2).
    block_count: usize,
}

impl Jv3Disk {
    fn load(data: Vec<u8>) -> Self {
        let mut disk = Self {
            data,
            id: vec![SectorId::free(); JV3_SECTORS_MAX + 1],
            offset: vec![0; JV3_SECTORS_MAX + 1],
            sorted_id: vec![0; JV3_SECTORS_MAX + 1],
            track_start: vec![[-1; JV3_MAX_SIDES]; MAX_TRACKS],
            free_id: [JV3_SECTORS_MAX; 4],
            last_used_id: -1,
            block_count: 0,
        };

        // First block starts at file offset 0; a second may follow the
        // first block's sector data.
        let next = disk.load_block(0, 0);
        disk.load_block(JV3_SECTORS_PER_BLOCK, next);

        for index in 0..JV3_SECTORS_MAX {
            if disk.id[index].is_free() {
                let size_code = disk.id[index].size_code() as usize;
                if disk.free_id[size_code] == JV3_SECTORS_MAX {
                    disk.free_id[size_code] = index;
                }
            } else {
                disk.last_used_id = index as i32;
            }
        }

        disk.sort_ids();
        disk
    }

    /// Read one descriptor block and compute its sectors' offsets.
    /// Returns the file offset just past this block's sector data.
    fn load_block(&mut self, id_start: usize, block_start: usize) -> usize {
        if block_start + 3 * JV3_SECTORS_PER_BLOCK <= self.data.len() {
            self.block_count += 1;
            let mut start = block_start;
            for i in 0..JV3_SECTORS_PER_BLOCK {
                self.id[id_start + i] = SectorId {
                    track: self.data[start],
                    sector: self.data[start + 1],
                    flags: self.data[start + 2],
                };
                start += 3;
            }
        }

        let mut offset = block_start + JV3_SECTOR_START;
        for i in 0..JV3_SECTORS_PER_BLOCK {
            self.offset[id_start + i] = offset;
            offset += self.id[id_start + i].size();
        }

        offset
    }

    /// Build `sorted_id` and `track_start` from the descriptor table.
    ///
    /// Sort order is track, then side, then original index (which is the
    /// physical sector order on the track). Free descriptors have track
    /// 0xFF and therefore sort last.
    fn sort_ids(&mut self) {
        for (i, slot) in self.sorted_id.iter_mut().enumerate() {
            *slot = i;
        }
        let ids = &self.id;
        self.sorted_id.sort_by(|&si, &sj| {
            let idi = &ids[si];
            let idj = &ids[sj];
            idi.track
                .cmp(&idj.track)
                .then(idi.side().cmp(&idj.side()))
                .then(si.cmp(&sj))
        });

        for start in &mut self.track_start {
            *start = [-1; JV3_MAX_SIDES];
        }
        let mut track = -1i32;
        let mut side = -1i32;
        for i in 0..JV3_SECTORS_MAX {
            let id = &self.id[self.sorted_id[i]];
            if i32::from(id.track) != track || i32::from(id.side()) != side {
                track = i32::from(id.track);
                if id.is_free() {
                    // End of used sectors.
                    break;
                }
                side = i32::from(id.side());
                self.track_start[track as usize][side as usize] = i as i32;
            }
        }
    }

    /// The descriptor at an index (the sentinel included).
    #[must_use]
    pub fn id(&self, index: usize) -> &SectorId {
        &self.id[index]
    }

    /// Byte offset of a descriptor's sector data.
    #[must_use]
    pub fn data_offset(&self, index: usize) -> usize {
        self.offset[index]
    }

    /// Descriptor index at a sorted position.
    #[must_use]
    pub fn sorted_id(&self, position: usize) -> usize {
        self.sorted_id[position]
    }

    /// First sorted position of (track, side), or -1 when the track has no
    /// sectors on that side.
    #[must_use]
    pub fn track_start(&self, track: u8, side: u8) -> i32 {
        self.track_start[usize::from(track)][usize::from(side)]
    }

    /// Highest used descriptor index, or -1 for a blank disk.
    #[must_use]
    pub fn last_used_id(&self) -> i32 {
        self.last_used_id
    }

    /// First free descriptor of a size code, or `JV3_SECTORS_MAX`.
    #[must_use]
    pub fn free_id(&self, size_code: u8) -> usize {
        self.free_id[usize::from(size_code)]
    }

    /// Number of descriptor blocks (1 or 2).
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Search the sorted index for a sector on (track, side).
    ///
    /// `sector` of -1 matches the first sector found. Density must match.
    /// Returns the descriptor index.
    #[must_use]
    pub fn find_sector(
        &self,
        track: u8,
        side: u8,
        sector: i32,
        double_density: bool,
    ) -> Option<usize> {
        let start = self.track_start(track, side);
        if start < 0 {
            return None;
        }

        let mut i = start as usize;
        loop {
            let id_index = self.sorted_id(i);
            let id = self.id(id_index);
            if id.track != track || id.side() != side {
                return None;
            }
            if (sector == -1 || i32::from(id.sector) == sector)
                && id.double_density() == double_density
            {
                return Some(id_index);
            }
            i += 1;
        }
    }
}
