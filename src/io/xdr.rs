//! XDR (RFC 4506) big-endian binary files
//!
//! All primitives are big-endian and 4-byte aligned. On top of the
//! standard primitives, this module implements the Gromacs dialect:
//! length-prefixed strings without their NUL terminator, and the lossy
//! compressed coordinate codec used by the XTC format.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::errors::{Error, Result};
use crate::io::trajectory::Mode;
use crate::warnings::warning;

/// A seekable big-endian binary file with XDR helpers
pub struct XdrFile {
    file: File,
    path: PathBuf,
    // scratch allocations for the compression codec
    compressed: Vec<u8>,
    intbuf: Vec<i32>,
}

impl XdrFile {
    /// Open the file at `path` in the given mode
    pub fn open(path: &Path, mode: Mode) -> Result<XdrFile> {
        let file = match mode {
            Mode::Read => File::open(path)?,
            Mode::Write => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?,
            Mode::Append => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(path)?,
        };
        Ok(XdrFile {
            file,
            path: path.to_path_buf(),
            compressed: Vec::new(),
            intbuf: Vec::new(),
        })
    }

    /// The path of this file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current byte offset
    pub fn tell(&mut self) -> Result<u64> {
        Ok(self.file.stream_position()?)
    }

    /// Move the cursor to the given byte offset
    pub fn seek(&mut self, position: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    /// Move the cursor to the end of the file, returning the offset
    pub fn seek_end(&mut self) -> Result<u64> {
        Ok(self.file.seek(SeekFrom::End(0))?)
    }

    /// Skip `count` bytes forward
    pub fn skip(&mut self, count: u64) -> Result<()> {
        self.file.seek(SeekFrom::Current(count as i64))?;
        Ok(())
    }

    /// The total length of the file in bytes
    pub fn len(&mut self) -> Result<u64> {
        let position = self.file.stream_position()?;
        let length = self.file.seek(SeekFrom::End(0))?;
        self.file.seek(SeekFrom::Start(position))?;
        Ok(length)
    }

    /// Read an XDR signed integer
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.file.read_i32::<BigEndian>()?)
    }

    /// Write an XDR signed integer
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        Ok(self.file.write_i32::<BigEndian>(value)?)
    }

    /// Read an XDR unsigned integer
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.file.read_u32::<BigEndian>()?)
    }

    /// Write an XDR unsigned integer
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        Ok(self.file.write_u32::<BigEndian>(value)?)
    }

    /// Read an XDR unsigned hyper integer
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(self.file.read_u64::<BigEndian>()?)
    }

    /// Write an XDR unsigned hyper integer
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        Ok(self.file.write_u64::<BigEndian>(value)?)
    }

    /// Read an XDR float
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(self.file.read_f32::<BigEndian>()?)
    }

    /// Write an XDR float
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        Ok(self.file.write_f32::<BigEndian>(value)?)
    }

    /// Read an XDR double
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(self.file.read_f64::<BigEndian>()?)
    }

    /// Write an XDR double
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        Ok(self.file.write_f64::<BigEndian>(value)?)
    }

    /// Read XDR floats into `data`, batching the byte swaps
    pub fn read_f32_array(&mut self, data: &mut [f32]) -> Result<()> {
        Ok(self.file.read_f32_into::<BigEndian>(data)?)
    }

    /// Write XDR floats
    pub fn write_f32_array(&mut self, data: &[f32]) -> Result<()> {
        for &value in data {
            self.file.write_f32::<BigEndian>(value)?;
        }
        Ok(())
    }

    /// Read XDR doubles into `data`, batching the byte swaps
    pub fn read_f64_array(&mut self, data: &mut [f64]) -> Result<()> {
        Ok(self.file.read_f64_into::<BigEndian>(data)?)
    }

    /// Write XDR doubles
    pub fn write_f64_array(&mut self, data: &[f64]) -> Result<()> {
        for &value in data {
            self.file.write_f64::<BigEndian>(value)?;
        }
        Ok(())
    }

    /// Read XDR variable-length opaque data: a length prefix then the
    /// bytes, padded to a multiple of four
    pub fn read_opaque(&mut self) -> Result<Vec<u8>> {
        let count = self.read_u32()? as usize;
        let filler = (4 - count % 4) % 4;
        let mut data = vec![0; count + filler];
        self.file.read_exact(&mut data)?;
        data.truncate(count);
        Ok(data)
    }

    /// Write XDR variable-length opaque data
    pub fn write_opaque(&mut self, data: &[u8]) -> Result<()> {
        self.write_u32(data.len() as u32)?;
        self.file.write_all(data)?;
        let filler = (4 - data.len() % 4) % 4;
        self.file.write_all(&[0; 3][..filler])?;
        Ok(())
    }

    /// Read a non-compliant Gromacs string: the length including the
    /// NUL terminator, then the bytes without the terminator as opaque
    pub fn read_gmx_string(&mut self) -> Result<String> {
        let length = self.read_u32()? as usize;
        let data = self.read_opaque()?;
        if length != data.len() + 1 {
            return Err(Error::format(format!(
                "inconsistent string length in file at '{}': expected {} characters, got {}",
                self.path.display(),
                length,
                data.len() + 1
            )));
        }
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// Write a non-compliant Gromacs string
    pub fn write_gmx_string(&mut self, value: &str) -> Result<()> {
        self.write_u32(value.len() as u32 + 1)?;
        self.write_opaque(value.as_bytes())
    }

    /// Read Gromacs compressed coordinates into `data`, returning the
    /// precision they were stored at
    pub fn read_gmx_compressed_floats(&mut self, data: &mut [f32]) -> Result<f32> {
        let precision = self.read_f32()?;
        let minint = [self.read_i32()?, self.read_i32()?, self.read_i32()?];
        let maxint = [self.read_i32()?, self.read_i32()?, self.read_i32()?];
        let smallidx = self.read_i32()?;
        if smallidx < 0 || smallidx as usize >= MAGICINTS.len() {
            return Err(Error::format(format!(
                "invalid compression index {} in XTC stream",
                smallidx
            )));
        }
        let mut smallidx = smallidx as usize;

        let (sizeint, bitsizeint, bitsize) = calc_sizeint(&minint, &maxint)?;

        let tmpidx = smallidx.saturating_sub(1).max(FIRSTIDX);
        let mut smaller = MAGICINTS[tmpidx] / 2;
        let mut smallnum = MAGICINTS[smallidx] / 2;
        let mut sizesmall = [MAGICINTS[smallidx] as u32; 3];

        self.compressed = self.read_opaque()?;

        if data.len() % 3 != 0 {
            return Err(Error::format(
                "invalid buffer size for XTC decompression, expected a multiple of 3",
            ));
        }
        let natoms = data.len() / 3;

        let mut state = BitState::default();
        let mut run: i32 = 0;
        let mut prevcoord = [0i32; 3];
        let inv_precision = 1.0 / precision;
        let mut write_idx = 0;
        let mut read_idx = 0;
        while read_idx < natoms {
            let mut this = [0i32; 3];
            if bitsize == 0 {
                this[0] = decodebits(&self.compressed, &mut state, bitsizeint[0]) as i32;
                this[1] = decodebits(&self.compressed, &mut state, bitsizeint[1]) as i32;
                this[2] = decodebits(&self.compressed, &mut state, bitsizeint[2]) as i32;
            } else {
                decodeints(&self.compressed, &mut state, bitsize, &sizeint, &mut this);
            }
            read_idx += 1;

            this[0] = this[0].wrapping_add(minint[0]);
            this[1] = this[1].wrapping_add(minint[1]);
            this[2] = this[2].wrapping_add(minint[2]);
            prevcoord = this;

            let flag = decodebits(&self.compressed, &mut state, 1);
            let mut is_smaller = 0i32;
            if flag == 1 {
                let field = decodebits(&self.compressed, &mut state, 5) as i32;
                is_smaller = field % 3;
                run = field - is_smaller;
                is_smaller -= 1;
            }
            if run > 0 && write_idx * 3 + run as usize > data.len() {
                return Err(Error::format(
                    "buffer overrun during decompression of XTC coordinates",
                ));
            }
            if run > 0 {
                let mut k = 0;
                while k < run {
                    decodeints(
                        &self.compressed,
                        &mut state,
                        smallidx as u32,
                        &sizesmall,
                        &mut this,
                    );
                    read_idx += 1;
                    this[0] += prevcoord[0] - smallnum;
                    this[1] += prevcoord[1] - smallnum;
                    this[2] += prevcoord[2] - smallnum;
                    let slots = if k == 0 { 2 } else { 1 };
                    if write_idx + slots > natoms {
                        return Err(Error::format(
                            "buffer overrun during decompression of XTC coordinates",
                        ));
                    }
                    if k == 0 {
                        // the first pair of a run is stored swapped, for
                        // better compression of water molecules
                        std::mem::swap(&mut this, &mut prevcoord);
                        data[write_idx * 3] = prevcoord[0] as f32 * inv_precision;
                        data[write_idx * 3 + 1] = prevcoord[1] as f32 * inv_precision;
                        data[write_idx * 3 + 2] = prevcoord[2] as f32 * inv_precision;
                        write_idx += 1;
                    } else {
                        prevcoord = this;
                    }
                    data[write_idx * 3] = this[0] as f32 * inv_precision;
                    data[write_idx * 3 + 1] = this[1] as f32 * inv_precision;
                    data[write_idx * 3 + 2] = this[2] as f32 * inv_precision;
                    write_idx += 1;
                    k += 3;
                }
            } else {
                if write_idx >= natoms {
                    return Err(Error::format(
                        "buffer overrun during decompression of XTC coordinates",
                    ));
                }
                data[write_idx * 3] = this[0] as f32 * inv_precision;
                data[write_idx * 3 + 1] = this[1] as f32 * inv_precision;
                data[write_idx * 3 + 2] = this[2] as f32 * inv_precision;
                write_idx += 1;
            }

            if is_smaller < 0 {
                if smallidx == 0 {
                    return Err(Error::format(
                        "invalid size found during decompression of XTC coordinates",
                    ));
                }
                smallidx -= 1;
                smallnum = smaller;
                if smallidx > FIRSTIDX {
                    smaller = MAGICINTS[smallidx - 1] / 2;
                } else {
                    smaller = 0;
                }
            } else if is_smaller > 0 {
                smallidx += 1;
                if smallidx >= MAGICINTS.len() {
                    return Err(Error::format(
                        "invalid size found during decompression of XTC coordinates",
                    ));
                }
                smaller = smallnum;
                smallnum = MAGICINTS[smallidx] / 2;
            }
            sizesmall = [MAGICINTS[smallidx] as u32; 3];
            if sizesmall[0] == 0 {
                return Err(Error::format(
                    "invalid size found during decompression of XTC coordinates",
                ));
            }
        }

        if state.count > self.compressed.len() {
            return Err(Error::format(
                "compressed data ended prematurely in XTC stream",
            ));
        }

        Ok(precision)
    }

    /// Write Gromacs compressed coordinates with the given precision
    pub fn write_gmx_compressed_floats(&mut self, data: &[f32], precision: f32) -> Result<()> {
        let mut precision = precision;
        if precision <= 0.0 {
            warning(
                "XTC compression",
                format!("invalid precision {} <= 0, using 1000 as fallback", precision),
            );
            precision = 1000.0;
        }
        self.write_f32(precision)?;

        if data.len() % 3 != 0 {
            return Err(Error::format(
                "invalid buffer size for XTC compression, expected a multiple of 3",
            ));
        }
        let natoms = data.len() / 3;

        // extra slots at the end keep the run lookahead in bounds
        self.intbuf.clear();
        self.intbuf.resize(data.len() + 3, 0);
        // up to 32 bits per value plus the run flags
        self.compressed.clear();
        self.compressed.resize(data.len() * 5 + 32, 0);

        let mut minint = [i32::MAX; 3];
        let mut maxint = [i32::MIN; 3];
        let mut mindiff = i32::MAX;
        let mut oldlint = [0i32; 3];
        for atom in 0..natoms {
            let mut lint = [0i32; 3];
            for k in 0..3 {
                // find the nearest integer
                let coord = data[atom * 3 + k];
                let lf = if coord >= 0.0 {
                    coord * precision + 0.5
                } else {
                    coord * precision - 0.5
                };
                if lf.abs() > i32::MAX as f32 - 2.0 {
                    // scaling would cause an overflow when converting to int
                    return Err(Error::format(
                        "internal overflow compressing XTC coordinates",
                    ));
                }
                lint[k] = lf as i32;
                minint[k] = minint[k].min(lint[k]);
                maxint[k] = maxint[k].max(lint[k]);
                self.intbuf[atom * 3 + k] = lint[k];
            }
            let diff = (oldlint[0] - lint[0]).abs()
                + (oldlint[1] - lint[1]).abs()
                + (oldlint[2] - lint[2]).abs();
            if diff < mindiff && atom > 0 {
                mindiff = diff;
            }
            oldlint = lint;
        }
        for value in minint {
            self.write_i32(value)?;
        }
        for value in maxint {
            self.write_i32(value)?;
        }

        for k in 0..3 {
            if maxint[k] as i64 - minint[k] as i64 >= i32::MAX as i64 - 2 {
                // turning the value unsigned by subtracting minint would overflow
                return Err(Error::format(
                    "internal overflow compressing XTC coordinates",
                ));
            }
        }

        let mut smallidx = FIRSTIDX;
        while smallidx < MAGICINTS.len() - 1 && MAGICINTS[smallidx] < mindiff {
            smallidx += 1;
        }
        self.write_i32(smallidx as i32)?;

        let (sizeint, bitsizeint, bitsize) = calc_sizeint(&minint, &maxint)?;

        let maxidx = (smallidx + 8).min(MAGICINTS.len() - 1);
        let minidx = maxidx - 8;
        let tmpidx = smallidx.saturating_sub(1).max(FIRSTIDX);
        let mut smaller = MAGICINTS[tmpidx] / 2;
        let mut smallnum = MAGICINTS[smallidx] / 2;
        let mut sizesmall = [MAGICINTS[smallidx] as u32; 3];
        let larger = MAGICINTS[maxidx] / 2;

        let mut prevrun: i32 = -1;
        let mut tmpcoord = [0u32; 8 * 3];
        let mut prevcoord = [0i32; 3];
        let mut state = BitState::default();

        let mut i = 0;
        while i < natoms {
            let mut is_small = false;
            let this = [
                self.intbuf[i * 3],
                self.intbuf[i * 3 + 1],
                self.intbuf[i * 3 + 2],
            ];
            let mut is_smaller: i32 = if smallidx < maxidx
                && i >= 1
                && (this[0] - prevcoord[0]).abs() < larger
                && (this[1] - prevcoord[1]).abs() < larger
                && (this[2] - prevcoord[2]).abs() < larger
            {
                1
            } else if smallidx > minidx {
                -1
            } else {
                0
            };
            if i + 1 < natoms {
                let next = (i + 1) * 3;
                if (self.intbuf[i * 3] - self.intbuf[next]).abs() < smallnum
                    && (self.intbuf[i * 3 + 1] - self.intbuf[next + 1]).abs() < smallnum
                    && (self.intbuf[i * 3 + 2] - self.intbuf[next + 2]).abs() < smallnum
                {
                    // store the first pair of a run swapped, for better
                    // compression of water molecules
                    self.intbuf.swap(i * 3, next);
                    self.intbuf.swap(i * 3 + 1, next + 1);
                    self.intbuf.swap(i * 3 + 2, next + 2);
                    is_small = true;
                }
            }

            // overflow was checked before
            tmpcoord[0] = (self.intbuf[i * 3].wrapping_sub(minint[0])) as u32;
            tmpcoord[1] = (self.intbuf[i * 3 + 1].wrapping_sub(minint[1])) as u32;
            tmpcoord[2] = (self.intbuf[i * 3 + 2].wrapping_sub(minint[2])) as u32;
            if bitsize == 0 {
                encodebits(&mut self.compressed, &mut state, bitsizeint[0], tmpcoord[0]);
                encodebits(&mut self.compressed, &mut state, bitsizeint[1], tmpcoord[1]);
                encodebits(&mut self.compressed, &mut state, bitsizeint[2], tmpcoord[2]);
            } else {
                let nums = [tmpcoord[0], tmpcoord[1], tmpcoord[2]];
                encodeints(&mut self.compressed, &mut state, bitsize, &sizeint, &nums)?;
            }
            prevcoord = [
                self.intbuf[i * 3],
                self.intbuf[i * 3 + 1],
                self.intbuf[i * 3 + 2],
            ];

            if !is_small && is_smaller == -1 {
                is_smaller = 0;
            }
            let mut run: i32 = 0;
            while is_small && run < 8 * 3 {
                let next = (i + 1) * 3;
                let mut tmpsum: i64 = 0;
                for k in 0..3 {
                    let delta = (self.intbuf[next + k] - prevcoord[k]) as i64;
                    tmpsum += delta * delta;
                }
                if is_smaller == -1 && tmpsum >= (smaller as i64) * (smaller as i64) {
                    is_smaller = 0;
                }

                // stays in range as long as is_small held
                tmpcoord[run as usize] =
                    (self.intbuf[next] - prevcoord[0] + smallnum) as u32;
                tmpcoord[run as usize + 1] =
                    (self.intbuf[next + 1] - prevcoord[1] + smallnum) as u32;
                tmpcoord[run as usize + 2] =
                    (self.intbuf[next + 2] - prevcoord[2] + smallnum) as u32;
                run += 3;

                prevcoord = [
                    self.intbuf[next],
                    self.intbuf[next + 1],
                    self.intbuf[next + 2],
                ];

                i += 1;
                let next = (i + 1) * 3;
                is_small = i + 1 < natoms
                    && (self.intbuf[next] - prevcoord[0]).abs() < smallnum
                    && (self.intbuf[next + 1] - prevcoord[1]).abs() < smallnum
                    && (self.intbuf[next + 2] - prevcoord[2]).abs() < smallnum;
            }

            if run != prevrun || is_smaller != 0 {
                prevrun = run;
                // flag the change in run length
                encodebits(&mut self.compressed, &mut state, 1, 1);
                encodebits(
                    &mut self.compressed,
                    &mut state,
                    5,
                    (run + is_smaller + 1) as u32,
                );
            } else {
                // flag that the run length did not change
                encodebits(&mut self.compressed, &mut state, 1, 0);
            }
            let mut k = 0;
            while k < run {
                let nums = [
                    tmpcoord[k as usize],
                    tmpcoord[k as usize + 1],
                    tmpcoord[k as usize + 2],
                ];
                encodeints(
                    &mut self.compressed,
                    &mut state,
                    smallidx as u32,
                    &sizesmall,
                    &nums,
                )?;
                k += 3;
            }
            if is_smaller != 0 {
                if is_smaller < 0 {
                    smallidx -= 1;
                    smallnum = smaller;
                    smaller = MAGICINTS[smallidx - 1] / 2;
                } else {
                    smallidx += 1;
                    smaller = smallnum;
                    smallnum = MAGICINTS[smallidx] / 2;
                }
                sizesmall = [MAGICINTS[smallidx] as u32; 3];
            }

            i += 1;
        }

        if state.lastbits != 0 {
            state.count += 1;
        }
        if state.count >= self.compressed.len() {
            return Err(Error::format(
                "internal overflow compressing XTC coordinates",
            ));
        }
        let count = state.count;
        let payload = std::mem::take(&mut self.compressed);
        self.write_opaque(&payload[..count])?;
        self.compressed = payload;
        Ok(())
    }
}

// Magic integer table for the compressed coordinates: a mix of powers
// of 2 and powers of the cube root of 2, indexed by the number of bits
// needed to store values below each entry.
#[rustfmt::skip]
const MAGICINTS: [i32; 73] = [
    0,        0,        0,       0,       0,       0,       0,       0,       0,       8,
    10,       12,       16,      20,      25,      32,      40,      50,      64,      80,
    101,      128,      161,     203,     256,     322,     406,     512,     645,     812,
    1024,     1290,     1625,    2048,    2580,    3250,    4096,    5060,    6501,    8192,
    10321,    13003,    16384,   20642,   26007,   32768,   41285,   52015,   65536,   82570,
    104031,   131072,   165140,  208063,  262144,  330280,  416127,  524287,  660561,  832255,
    1048576,  1321122,  1664510, 2097152, 2642245, 3329021, 4194304, 5284491, 6658042, 8388607,
    10568983, 13316085, 16777216,
];

// note that MAGICINTS[FIRSTIDX - 1] == 0
const FIRSTIDX: usize = 9;

#[derive(Debug, Default, Clone, Copy)]
struct BitState {
    count: usize,
    lastbits: u32,
    lastbyte: u32,
}

// smallest number of bits needed to represent values up to `size`
fn sizeofint(size: u32) -> u32 {
    let mut num: u64 = 1;
    let mut num_of_bits = 0;
    while size as u64 >= num && num_of_bits < 32 {
        num_of_bits += 1;
        num <<= 1;
    }
    num_of_bits
}

// number of bits needed by encodeints/decodeints to pack three values
// with the given sizes into one multibyte integer
fn sizeofints(sizes: &[u32; 3]) -> u32 {
    let mut num_of_bytes = 1usize;
    let mut bytes = [0u32; 32];
    bytes[0] = 1;
    let mut num_of_bits = 0;
    for &size in sizes {
        let mut tmp = 0u32;
        let mut bytecnt = 0;
        while bytecnt < num_of_bytes {
            tmp = bytes[bytecnt] * size + tmp;
            bytes[bytecnt] = tmp & 0xff;
            tmp >>= 8;
            bytecnt += 1;
        }
        while tmp != 0 {
            bytes[bytecnt] = tmp & 0xff;
            bytecnt += 1;
            tmp >>= 8;
        }
        num_of_bytes = bytecnt;
    }
    let mut num = 1;
    num_of_bytes -= 1;
    while bytes[num_of_bytes] >= num {
        num_of_bits += 1;
        num *= 2;
    }
    num_of_bits + num_of_bytes as u32 * 8
}

fn calc_sizeint(minint: &[i32; 3], maxint: &[i32; 3]) -> Result<([u32; 3], [u32; 3], u32)> {
    let mut sizeint = [0u32; 3];
    for k in 0..3 {
        let size = maxint[k] as i64 - minint[k] as i64 + 1;
        if size <= 0 || size > u32::MAX as i64 {
            return Err(Error::format(
                "invalid coordinate range in XTC compressed data",
            ));
        }
        sizeint[k] = size as u32;
    }

    let mut bitsizeint = [0u32; 3];
    if (sizeint[0] | sizeint[1] | sizeint[2]) > 0xffffff {
        // one of the sizes is too big to be multiplied, flag the use of
        // large sizes with a zero joint bitsize
        bitsizeint[0] = sizeofint(sizeint[0]);
        bitsizeint[1] = sizeofint(sizeint[1]);
        bitsizeint[2] = sizeofint(sizeint[2]);
        Ok((sizeint, bitsizeint, 0))
    } else {
        Ok((sizeint, bitsizeint, sizeofints(&sizeint)))
    }
}

// append `num` to the bitstream using the given number of bits
fn encodebits(buf: &mut [u8], state: &mut BitState, num_of_bits: u32, num: u32) {
    let mut num_of_bits = num_of_bits;
    let mut cnt = state.count;
    let mut lastbits = state.lastbits;
    let mut lastbyte = state.lastbyte;
    while num_of_bits >= 8 {
        lastbyte = (lastbyte << 8) | (num >> (num_of_bits - 8));
        buf[cnt] = (lastbyte >> lastbits) as u8;
        cnt += 1;
        num_of_bits -= 8;
    }
    if num_of_bits > 0 {
        lastbyte = (lastbyte << num_of_bits) | num;
        lastbits += num_of_bits;
        if lastbits >= 8 {
            lastbits -= 8;
            buf[cnt] = (lastbyte >> lastbits) as u8;
            cnt += 1;
        }
    }
    state.count = cnt;
    state.lastbits = lastbits;
    state.lastbyte = lastbyte;
    if lastbits > 0 {
        buf[cnt] = (lastbyte << (8 - lastbits)) as u8;
    }
}

// extract a value stored with the given number of bits from the
// bitstream. Reads past the end of the buffer produce zero bits; the
// callers validate the stream afterwards.
fn decodebits(buf: &[u8], state: &mut BitState, num_of_bits: u32) -> u32 {
    let mask = ((1u64 << num_of_bits) - 1) as u32;
    let mut num_of_bits = num_of_bits;
    let mut cnt = state.count;
    let mut lastbits = state.lastbits;
    let mut lastbyte = state.lastbyte;

    let mut num = 0u32;
    while num_of_bits >= 8 {
        lastbyte = (lastbyte << 8) | buf.get(cnt).copied().unwrap_or(0) as u32;
        cnt += 1;
        num |= (lastbyte >> lastbits) << (num_of_bits - 8);
        num_of_bits -= 8;
    }
    if num_of_bits > 0 {
        if lastbits < num_of_bits {
            lastbits += 8;
            lastbyte = (lastbyte << 8) | buf.get(cnt).copied().unwrap_or(0) as u32;
            cnt += 1;
        }
        lastbits -= num_of_bits;
        num |= (lastbyte >> lastbits) & mask;
    }
    num &= mask;
    state.count = cnt;
    state.lastbits = lastbits;
    state.lastbyte = lastbyte;
    num
}

// pack three small integers into `num_of_bits` bits of the bitstream,
// using a multiprecision multiplication by the given sizes
fn encodeints(
    buf: &mut [u8],
    state: &mut BitState,
    num_of_bits: u32,
    sizes: &[u32; 3],
    nums: &[u32; 3],
) -> Result<()> {
    let mut bytes = [0u32; 32];
    let mut num_of_bytes = 0usize;
    let mut tmp = nums[0];
    loop {
        bytes[num_of_bytes] = tmp & 0xff;
        num_of_bytes += 1;
        tmp >>= 8;
        if tmp == 0 {
            break;
        }
    }

    for i in 1..3 {
        if nums[i] >= sizes[i] {
            return Err(Error::format(format!(
                "major breakdown in encodeints: num {} does not match size {}",
                nums[i], sizes[i]
            )));
        }
        // one step multiply
        let mut tmp = nums[i];
        let mut bytecnt = 0;
        while bytecnt < num_of_bytes {
            tmp = bytes[bytecnt] * sizes[i] + tmp;
            bytes[bytecnt] = tmp & 0xff;
            tmp >>= 8;
            bytecnt += 1;
        }
        while tmp != 0 {
            bytes[bytecnt] = tmp & 0xff;
            bytecnt += 1;
            tmp >>= 8;
        }
        num_of_bytes = bytecnt;
    }

    if num_of_bits >= num_of_bytes as u32 * 8 {
        for &byte in &bytes[..num_of_bytes] {
            encodebits(buf, state, 8, byte);
        }
        encodebits(buf, state, num_of_bits - num_of_bytes as u32 * 8, 0);
    } else {
        for &byte in &bytes[..num_of_bytes - 1] {
            encodebits(buf, state, 8, byte);
        }
        encodebits(
            buf,
            state,
            num_of_bits - (num_of_bytes as u32 - 1) * 8,
            bytes[num_of_bytes - 1],
        );
    }
    Ok(())
}

// unpack three small integers from the bitstream, the inverse of
// encodeints
fn decodeints(
    buf: &[u8],
    state: &mut BitState,
    num_of_bits: u32,
    sizes: &[u32; 3],
    nums: &mut [i32; 3],
) {
    let mut bytes = [0u32; 32];
    let mut num_of_bytes = 0usize;
    let mut bits_left = num_of_bits;
    while bits_left > 8 {
        bytes[num_of_bytes] = decodebits(buf, state, 8);
        num_of_bytes += 1;
        bits_left -= 8;
    }
    if bits_left > 0 {
        bytes[num_of_bytes] = decodebits(buf, state, bits_left);
        num_of_bytes += 1;
    }

    for i in (1..3).rev() {
        let mut num = 0u32;
        for j in (0..num_of_bytes).rev() {
            num = (num << 8) | bytes[j];
            let p = num / sizes[i];
            bytes[j] = p;
            num -= p * sizes[i];
        }
        nums[i] = num as i32;
    }
    nums[0] = (bytes[0] | (bytes[1] << 8) | (bytes[2] << 16) | (bytes[3] << 24)) as i32;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("molio-xdr-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_bit_roundtrip() {
        let mut buf = vec![0u8; 64];
        let mut state = BitState::default();
        encodebits(&mut buf, &mut state, 5, 27);
        encodebits(&mut buf, &mut state, 1, 1);
        encodebits(&mut buf, &mut state, 13, 4095);
        encodebits(&mut buf, &mut state, 32, 0xdeadbeef);

        let mut state = BitState::default();
        assert_eq!(decodebits(&buf, &mut state, 5), 27);
        assert_eq!(decodebits(&buf, &mut state, 1), 1);
        assert_eq!(decodebits(&buf, &mut state, 13), 4095);
        assert_eq!(decodebits(&buf, &mut state, 32), 0xdeadbeef);
    }

    #[test]
    fn test_ints_roundtrip() {
        let sizes = [500u32, 600, 700];
        let bitsize = sizeofints(&sizes);
        let mut buf = vec![0u8; 64];
        let mut state = BitState::default();
        encodeints(&mut buf, &mut state, bitsize, &sizes, &[499, 0, 350]).unwrap();
        encodeints(&mut buf, &mut state, bitsize, &sizes, &[1, 599, 699]).unwrap();

        let mut state = BitState::default();
        let mut nums = [0i32; 3];
        decodeints(&buf, &mut state, bitsize, &sizes, &mut nums);
        assert_eq!(nums, [499, 0, 350]);
        decodeints(&buf, &mut state, bitsize, &sizes, &mut nums);
        assert_eq!(nums, [1, 599, 699]);
    }

    #[test]
    fn test_encodeints_rejects_overflow() {
        let sizes = [10u32, 10, 10];
        let mut buf = vec![0u8; 64];
        let mut state = BitState::default();
        assert!(encodeints(&mut buf, &mut state, 10, &sizes, &[1, 12, 1]).is_err());
    }

    #[test]
    fn test_sizeofint() {
        assert_eq!(sizeofint(0), 0);
        assert_eq!(sizeofint(1), 1);
        assert_eq!(sizeofint(255), 8);
        assert_eq!(sizeofint(0xffffff), 24);
    }

    #[test]
    fn test_opaque_and_strings() {
        let path = temp_path("opaque.bin");
        {
            let mut file = XdrFile::open(&path, Mode::Write).unwrap();
            file.write_opaque(b"hello").unwrap();
            file.write_gmx_string("GMX_trn_file").unwrap();
            file.write_i32(-42).unwrap();
        }
        {
            let mut file = XdrFile::open(&path, Mode::Read).unwrap();
            assert_eq!(file.read_opaque().unwrap(), b"hello");
            assert_eq!(file.read_gmx_string().unwrap(), "GMX_trn_file");
            assert_eq!(file.read_i32().unwrap(), -42);
            // opaque data is padded to 4 bytes: 4 + 5 + 3 pad, then
            // 4 + 4 + 12 string bytes, then the i32
            assert_eq!(file.tell().unwrap(), 12 + 20 + 4);
        }
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_compressed_floats_small_values() {
        let path = temp_path("compressed.xtc-part");
        let input: Vec<f32> = vec![0.0, 0.0, 0.0, 0.1234, 0.2345, 0.3456];
        {
            let mut file = XdrFile::open(&path, Mode::Write).unwrap();
            file.write_gmx_compressed_floats(&input, 1000.0).unwrap();
        }

        let mut file = XdrFile::open(&path, Mode::Read).unwrap();
        let mut output = vec![0.0f32; 6];
        let precision = file.read_gmx_compressed_floats(&mut output).unwrap();
        assert_eq!(precision, 1000.0);

        // the codec stores round(x * precision) / precision
        let expected: Vec<f32> = input
            .iter()
            .map(|&x| {
                let lf = if x >= 0.0 { x * 1000.0 + 0.5 } else { x * 1000.0 - 0.5 };
                (lf as i32) as f32 / 1000.0
            })
            .collect();
        for (value, expected) in output.iter().zip(&expected) {
            assert!((value - expected).abs() < 1e-6);
        }
        assert_eq!(output[0], 0.0);
        assert!((output[3] - 0.123).abs() < 1e-6);
        assert!((output[5] - 0.346).abs() < 1e-6);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_compressed_floats_water_like() {
        let path = temp_path("water.xtc-part");
        // a few water-like molecules: close triplets of atoms
        let mut input = Vec::new();
        for m in 0..20 {
            let base = m as f32 * 0.31;
            input.extend_from_slice(&[base, base + 0.05, base + 0.1]);
            input.extend_from_slice(&[base + 0.096, base + 0.05, base + 0.1]);
            input.extend_from_slice(&[base - 0.024, base + 0.143, base + 0.1]);
        }
        {
            let mut file = XdrFile::open(&path, Mode::Write).unwrap();
            file.write_gmx_compressed_floats(&input, 1000.0).unwrap();
        }

        let mut file = XdrFile::open(&path, Mode::Read).unwrap();
        let mut output = vec![0.0f32; input.len()];
        file.read_gmx_compressed_floats(&mut output).unwrap();
        for (value, expected) in output.iter().zip(&input) {
            assert!((value - expected).abs() < 1.0 / 1000.0 + 1e-6);
        }

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_compressed_floats_large_spread() {
        let path = temp_path("spread.xtc-part");
        // coordinates spread over a large box, forcing per-axis encoding
        let mut input = Vec::new();
        for i in 0..50 {
            let x = i as f32 * 123.456;
            input.extend_from_slice(&[x, -x * 0.5, x * 0.25]);
        }
        {
            let mut file = XdrFile::open(&path, Mode::Write).unwrap();
            file.write_gmx_compressed_floats(&input, 100.0).unwrap();
        }

        let mut file = XdrFile::open(&path, Mode::Read).unwrap();
        let mut output = vec![0.0f32; input.len()];
        let precision = file.read_gmx_compressed_floats(&mut output).unwrap();
        assert_eq!(precision, 100.0);
        for (value, expected) in output.iter().zip(&input) {
            assert!((value - expected).abs() < 1.0 / 100.0 + 1e-4);
        }

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_invalid_precision_falls_back() {
        let path = temp_path("precision.xtc-part");
        let input = vec![0.0f32, 0.0, 0.0, 0.5, 0.5, 0.5];
        {
            let mut file = XdrFile::open(&path, Mode::Write).unwrap();
            file.write_gmx_compressed_floats(&input, -3.0).unwrap();
        }

        let mut file = XdrFile::open(&path, Mode::Read).unwrap();
        let mut output = vec![0.0f32; 6];
        let precision = file.read_gmx_compressed_floats(&mut output).unwrap();
        assert_eq!(precision, 1000.0);

        std::fs::remove_file(&path).unwrap();
    }
}
