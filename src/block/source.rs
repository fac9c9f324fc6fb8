//! Flat block-file source
//!
//! Scans `blk*.dat` files in name order. Each entry is framed as 4 protocol
//! magic bytes, a little-endian u32 length, then the serialized block. A
//! zeroed magic marks the preallocated tail of a file.

use anyhow::{bail, ensure, Context};
use byteorder::{LittleEndian, ReadBytesExt};
use glob::glob;
use log::debug;
use std::{
    fs::File,
    io::{BufReader, ErrorKind, Read},
    path::{Path, PathBuf},
};

/// Largest frame length accepted before declaring the file corrupt
const MAX_FRAME_LEN: usize = 0x0800_0000;

/// One framed block as read from disk, chain not yet determined
#[derive(Debug, Clone)]
pub struct SourcedBlock {
    pub magic: [u8; 4],
    pub bytes: Vec<u8>,
}

pub struct FilesystemSource {
    paths: std::vec::IntoIter<PathBuf>,
    current: Option<BufReader<File>>,
}

impl FilesystemSource {
    pub fn new(blocks_dir: &Path) -> anyhow::Result<Self> {
        let pattern = format!("{}/blk*.dat", blocks_dir.display());
        let mut paths: Vec<PathBuf> = glob(&pattern)?.filter_map(|path| path.ok()).collect();
        paths.sort();
        if paths.is_empty() {
            bail!("no blk*.dat files under {}", blocks_dir.display());
        }
        debug!("Scanning {} block file(s)", paths.len());
        Ok(Self {
            paths: paths.into_iter(),
            current: None,
        })
    }

    fn next_block(&mut self) -> anyhow::Result<Option<SourcedBlock>> {
        loop {
            if let Some(reader) = self.current.as_mut() {
                if let Some(block) = read_frame(reader)? {
                    return Ok(Some(block));
                }
                self.current = None;
                continue;
            }
            match self.paths.next() {
                Some(path) => {
                    debug!("Reading {}", path.display());
                    let file = File::open(&path)
                        .with_context(|| format!("opening {}", path.display()))?;
                    self.current = Some(BufReader::new(file));
                }
                None => return Ok(None),
            }
        }
    }
}

impl Iterator for FilesystemSource {
    type Item = anyhow::Result<SourcedBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_block().transpose()
    }
}

fn read_frame(reader: &mut impl Read) -> anyhow::Result<Option<SourcedBlock>> {
    let mut magic = [0; 4];
    match reader.read_exact(&mut magic) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    if magic == [0; 4] {
        return Ok(None);
    }
    let len = reader.read_u32::<LittleEndian>().context("block frame length")? as usize;
    ensure!(len <= MAX_FRAME_LEN, "implausible block frame length {len}");
    let mut bytes = vec![0; len];
    reader
        .read_exact(&mut bytes)
        .context("truncated block frame")?;
    Ok(Some(SourcedBlock { magic, bytes }))
}
