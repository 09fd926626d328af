use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::model::Event;

const MAGIC: [u8; 4] = *b"RLDG";
const FORMAT_VERSION: u32 = 1;
/// Magic + little-endian format version.
pub const HEADER_LEN: u64 = 8;

fn write_header(writer: &mut impl Write) -> io::Result<()> {
    writer.write_all(&MAGIC)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())
}

/// Encode a single event to [len][bincode][crc32] format.
fn encode_event(writer: &mut impl Write, event: &Event) -> io::Result<()> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = payload.len() as u32;
    let crc = crc32fast::hash(&payload);
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc.to_le_bytes())?;
    Ok(())
}

/// Result of reading the log back.
#[derive(Debug, Default)]
pub struct Replay {
    pub events: Vec<Event>,
    /// Byte length of the valid prefix (header + whole, CRC-valid records).
    pub valid_len: u64,
    /// Bytes after `valid_len` that were dropped (torn or corrupt tail).
    pub discarded_bytes: u64,
}

/// Injected I/O failures for exercising the rollback path.
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The next batch reaches the file but its fsync reports failure.
    SyncFails,
    /// As `SyncFails`, and cutting the batch back off fails too.
    SyncAndRollbackFail,
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Append-only write-ahead log. The only durable state of the engine.
///
/// Layout: `[magic "RLDG"][u32 version]` then per record
/// `[u32: len][bincode: Event][u32: crc32]`. A record that is cut short or
/// fails its CRC ends the replay; see [`Wal::truncate_tail`].
///
/// Appends are staged in memory and land as one batch in `flush_sync`. A batch
/// that fails is cut back off the file, so the log only ever holds batches whose
/// fsync succeeded. If the cut itself fails the log is poisoned: every later
/// batch is refused until a compaction rewrites the file.
pub struct Wal {
    file: File,
    path: PathBuf,
    pending: Vec<u8>,
    pending_events: u64,
    /// File length after the last durable batch.
    committed_len: u64,
    poisoned: bool,
    appends_since_compact: u64,
    #[cfg(test)]
    fault: Option<Fault>,
}

impl Wal {
    /// Open (or create) the log at `path`, writing the header into an empty file.
    pub fn open(path: &Path) -> io::Result<Self> {
        let mut file = open_append(path)?;
        if file.metadata()?.len() == 0 {
            write_header(&mut file)?;
            file.sync_all()?;
        }
        let committed_len = file.metadata()?.len();
        Ok(Self {
            file,
            path: path.to_path_buf(),
            pending: Vec::new(),
            pending_events: 0,
            committed_len,
            poisoned: false,
            appends_since_compact: 0,
            #[cfg(test)]
            fault: None,
        })
    }

    /// Cut the file back to `valid_len` so new appends follow the last good record.
    /// A torn header (`valid_len < HEADER_LEN`) resets the file to a fresh header.
    pub fn truncate_tail(&mut self, valid_len: u64) -> io::Result<()> {
        if valid_len < HEADER_LEN {
            self.file.set_len(0)?;
            write_header(&mut self.file)?;
            self.committed_len = HEADER_LEN;
        } else {
            self.file.set_len(valid_len)?;
            self.committed_len = valid_len;
        }
        self.file.sync_all()
    }

    /// Count events already in the log (from replay) toward the compaction threshold.
    pub fn seed_appends_since_compact(&mut self, events: u64) {
        self.appends_since_compact = events;
    }

    #[cfg(test)]
    pub fn inject_fault(&mut self, fault: Fault) {
        self.fault = Some(fault);
    }

    /// Append a single event and fsync. Tests only; the engine batches through
    /// `append_buffered` + `flush_sync`.
    #[cfg(test)]
    pub fn append(&mut self, event: &Event) -> io::Result<()> {
        self.append_buffered(event)?;
        self.flush_sync()
    }

    /// Stage a single event for the next `flush_sync`.
    pub fn append_buffered(&mut self, event: &Event) -> io::Result<()> {
        encode_event(&mut self.pending, event)?;
        self.pending_events += 1;
        Ok(())
    }

    /// Drop every staged event without writing it.
    pub fn discard_pending(&mut self) {
        self.pending.clear();
        self.pending_events = 0;
    }

    /// Write the staged batch and fsync. On failure the batch is removed from
    /// the file again, so none of it survives a restart.
    pub fn flush_sync(&mut self) -> io::Result<()> {
        if self.poisoned {
            self.discard_pending();
            return Err(io::Error::other(
                "WAL is poisoned by a batch that could not be rolled back",
            ));
        }
        let batch_len = self.pending.len() as u64;
        let batch_events = self.pending_events;
        let result = self.write_pending();
        self.discard_pending();
        match result {
            Ok(()) => {
                self.committed_len += batch_len;
                self.appends_since_compact += batch_events;
                Ok(())
            }
            Err(e) => {
                if self.rollback().is_err() {
                    self.poisoned = true;
                }
                Err(e)
            }
        }
    }

    fn write_pending(&mut self) -> io::Result<()> {
        self.file.write_all(&self.pending)?;
        #[cfg(test)]
        if self.fault.is_some() {
            return Err(io::Error::other("injected fsync failure"));
        }
        self.file.sync_data()
    }

    /// Cut the file back to the last durable batch and reopen it.
    fn rollback(&mut self) -> io::Result<()> {
        #[cfg(test)]
        if self.fault.take() == Some(Fault::SyncAndRollbackFail) {
            return Err(io::Error::other("injected rollback failure"));
        }
        self.file.set_len(self.committed_len)?;
        self.file.sync_all()?;
        self.file = open_append(&self.path)?;
        let len = self.file.metadata()?.len();
        if len != self.committed_len {
            return Err(io::Error::other(format!(
                "WAL length {len} after rollback, expected {}",
                self.committed_len
            )));
        }
        Ok(())
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a snapshot to the temp file next to `path` and fsync it.
    pub fn write_compact_file(path: &Path, events: &[Event]) -> io::Result<()> {
        let tmp_path = path.with_extension("wal.tmp");
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        write_header(&mut writer)?;
        for event in events {
            encode_event(&mut writer, event)?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Rename the temp snapshot over the log and reopen it for appends.
    /// The snapshot replaces whatever a failed rollback left behind, so this
    /// also clears the poisoned state.
    pub fn swap_compact_file(&mut self) -> io::Result<()> {
        let tmp_path = self.path.with_extension("wal.tmp");
        fs::rename(&tmp_path, &self.path)?;
        self.file = open_append(&self.path)?;
        self.committed_len = self.file.metadata()?.len();
        self.discard_pending();
        self.poisoned = false;
        self.appends_since_compact = 0;
        Ok(())
    }

    #[cfg(test)]
    pub fn compact(&mut self, events: &[Event]) -> io::Result<()> {
        Self::write_compact_file(&self.path, events)?;
        self.swap_compact_file()
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }

    /// Read every valid event from disk. A missing file is an empty log.
    /// A foreign or newer-format file is an error rather than being overwritten.
    pub fn replay(path: &Path) -> io::Result<Replay> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Replay::default()),
            Err(e) => return Err(e),
        };
        let file_len = file.metadata()?.len();
        if file_len == 0 {
            return Ok(Replay::default());
        }
        let mut reader = BufReader::new(file);

        let mut header = [0u8; HEADER_LEN as usize];
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Ok(Replay {
                    events: Vec::new(),
                    valid_len: 0,
                    discarded_bytes: file_len,
                });
            }
            Err(e) => return Err(e),
        }
        if header[..4] != MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} is not a roomledger WAL", path.display()),
            ));
        }
        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != FORMAT_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported WAL format version {version}"),
            ));
        }

        let mut events = Vec::new();
        let mut valid_len = HEADER_LEN;

        loop {
            let mut len_buf = [0u8; 4];
            match reader.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
            let len = u32::from_le_bytes(len_buf) as u64;
            // A length running past the end of the file is a torn write.
            if valid_len + 8 + len > file_len {
                break;
            }

            let mut payload = vec![0u8; len as usize];
            match reader.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }

            let mut crc_buf = [0u8; 4];
            match reader.read_exact(&mut crc_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
            if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
                break;
            }

            match bincode::deserialize::<Event>(&payload) {
                Ok(event) => events.push(event),
                Err(_) => break,
            }
            valid_len += 8 + len;
        }

        Ok(Replay {
            events,
            valid_len,
            discarded_bytes: file_len - valid_len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Hotel, RoomSize, RoomTypeCapacity};
    use ulid::Ulid;

    fn tmp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("roomledger_test_wal");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = fs::remove_file(&path);
        path
    }

    fn registered(name: &str) -> Event {
        Event::HotelRegistered {
            hotel: Hotel {
                id: Ulid::new(),
                name: name.into(),
                address: "1 Shore Rd".into(),
                state: "MN".into(),
                zip_code: "55401".into(),
                website: String::new(),
                phone: String::new(),
            },
        }
    }

    fn capacity_set(hotel_id: Ulid, total: u32, available: u32) -> Event {
        Event::CapacitySet {
            hotel_id,
            rows: vec![RoomTypeCapacity {
                hotel_id,
                size: RoomSize::Small,
                total,
                available,
            }],
        }
    }

    #[test]
    fn append_and_replay() {
        let path = tmp_path("append_and_replay.wal");
        let first = registered("Lakeview");
        let events = vec![first.clone(), capacity_set(first.hotel_id(), 5, 5)];

        {
            let mut wal = Wal::open(&path).unwrap();
            for e in &events {
                wal.append(e).unwrap();
            }
        }

        let replay = Wal::replay(&path).unwrap();
        assert_eq!(replay.events, events);
        assert_eq!(replay.discarded_bytes, 0);
        assert_eq!(replay.valid_len, fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn fresh_log_is_just_a_header() {
        let path = tmp_path("fresh.wal");
        drop(Wal::open(&path).unwrap());
        assert_eq!(fs::metadata(&path).unwrap().len(), HEADER_LEN);

        let replay = Wal::replay(&path).unwrap();
        assert!(replay.events.is_empty());
        assert_eq!(replay.valid_len, HEADER_LEN);
    }

    #[test]
    fn replay_nonexistent_file() {
        let path = tmp_path("nonexistent.wal");
        let replay = Wal::replay(&path).unwrap();
        assert!(replay.events.is_empty());
        assert_eq!(replay.valid_len, 0);
    }

    #[test]
    fn torn_tail_is_reported_and_truncated() {
        let path = tmp_path("torn_tail.wal");
        let event = registered("Lakeview");
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&event).unwrap();
        }
        // Half of a second record: a length prefix promising more than exists.
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&200u32.to_le_bytes()).unwrap();
            f.write_all(&[7u8; 6]).unwrap();
        }

        let replay = Wal::replay(&path).unwrap();
        assert_eq!(replay.events, vec![event.clone()]);
        assert_eq!(replay.discarded_bytes, 10);

        // After truncation a new append must be reachable on the next replay.
        let follow_up = capacity_set(event.hotel_id(), 3, 3);
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.truncate_tail(replay.valid_len).unwrap();
            wal.append(&follow_up).unwrap();
        }
        let replay = Wal::replay(&path).unwrap();
        assert_eq!(replay.events, vec![event, follow_up]);
        assert_eq!(replay.discarded_bytes, 0);
    }

    #[test]
    fn torn_header_resets_to_empty_log() {
        let path = tmp_path("torn_header.wal");
        fs::write(&path, b"RLD").unwrap();

        let replay = Wal::replay(&path).unwrap();
        assert!(replay.events.is_empty());
        assert_eq!(replay.valid_len, 0);
        assert_eq!(replay.discarded_bytes, 3);

        let event = registered("Harbor");
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.truncate_tail(replay.valid_len).unwrap();
            wal.append(&event).unwrap();
        }
        assert_eq!(Wal::replay(&path).unwrap().events, vec![event]);
    }

    #[test]
    fn replay_stops_at_corrupt_crc() {
        let path = tmp_path("corrupt_crc.wal");
        let good = registered("Lakeview");
        let bad = registered("Harbor");
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&good).unwrap();
        }
        {
            let payload = bincode::serialize(&bad).unwrap();
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&(payload.len() as u32).to_le_bytes()).unwrap();
            f.write_all(&payload).unwrap();
            f.write_all(&0xDEADBEEFu32.to_le_bytes()).unwrap();
        }

        let replay = Wal::replay(&path).unwrap();
        assert_eq!(replay.events, vec![good]);
        assert!(replay.discarded_bytes > 0);
    }

    #[test]
    fn foreign_file_is_rejected() {
        let path = tmp_path("foreign.wal");
        fs::write(&path, b"PGDMP\0\0\0\0\0\0\0").unwrap();
        let err = Wal::replay(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn newer_format_is_rejected() {
        let path = tmp_path("newer.wal");
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        fs::write(&path, bytes).unwrap();
        let err = Wal::replay(&path).unwrap_err();
        assert!(err.to_string().contains("version 2"));
    }

    #[test]
    fn compact_reduces_wal() {
        let path = tmp_path("compact_reduce.wal");
        let hotel = registered("Lakeview");
        let hid = hotel.hotel_id();

        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&hotel).unwrap();
            for i in 0..20 {
                wal.append(&Event::CapacityReserved {
                    hotel_id: hid,
                    size: RoomSize::Small,
                    quantity: i,
                })
                .unwrap();
            }
        }
        let before = fs::metadata(&path).unwrap().len();

        let snapshot = vec![hotel, capacity_set(hid, 10, 4)];
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.compact(&snapshot).unwrap();
            assert_eq!(wal.appends_since_compact(), 0);
        }

        let after = fs::metadata(&path).unwrap().len();
        assert!(after < before, "compacted WAL should be smaller: {after} < {before}");
        assert_eq!(Wal::replay(&path).unwrap().events, snapshot);
    }

    #[test]
    fn compact_then_append() {
        let path = tmp_path("compact_append.wal");
        let hotel = registered("Lakeview");
        let next = capacity_set(hotel.hotel_id(), 2, 2);

        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&hotel).unwrap();
            wal.compact(std::slice::from_ref(&hotel)).unwrap();
            wal.append(&next).unwrap();
        }

        assert_eq!(Wal::replay(&path).unwrap().events, vec![hotel, next]);
    }

    #[test]
    fn append_buffered_then_flush_sync() {
        let path = tmp_path("buffered_flush.wal");
        let events: Vec<Event> = (0..5).map(|i| registered(&format!("Hotel {i}"))).collect();

        {
            let mut wal = Wal::open(&path).unwrap();
            for e in &events {
                wal.append_buffered(e).unwrap();
            }
            assert_eq!(wal.appends_since_compact(), 0);
            wal.flush_sync().unwrap();
            assert_eq!(wal.appends_since_compact(), 5);
        }

        assert_eq!(Wal::replay(&path).unwrap().events, events);
    }

    #[test]
    fn failed_batch_is_cut_back_off() {
        let path = tmp_path("failed_batch.wal");
        let first = registered("Lakeview");
        let lost = capacity_set(first.hotel_id(), 5, 5);
        let next = capacity_set(first.hotel_id(), 3, 3);

        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&first).unwrap();
            let durable_len = fs::metadata(&path).unwrap().len();

            wal.inject_fault(Fault::SyncFails);
            wal.append_buffered(&lost).unwrap();
            assert!(wal.flush_sync().is_err());
            assert!(!wal.is_poisoned());
            assert_eq!(fs::metadata(&path).unwrap().len(), durable_len);

            wal.append(&next).unwrap();
            assert_eq!(wal.appends_since_compact(), 2);
        }

        let replay = Wal::replay(&path).unwrap();
        assert_eq!(replay.events, vec![first, next]);
        assert_eq!(replay.discarded_bytes, 0);
    }

    #[test]
    fn failed_rollback_poisons_until_compaction() {
        let path = tmp_path("poisoned.wal");
        let first = registered("Lakeview");
        let hid = first.hotel_id();
        let refused = capacity_set(hid, 4, 4);
        let after = capacity_set(hid, 2, 2);

        let mut wal = Wal::open(&path).unwrap();
        wal.append(&first).unwrap();
        wal.inject_fault(Fault::SyncAndRollbackFail);
        wal.append_buffered(&capacity_set(hid, 5, 5)).unwrap();
        assert!(wal.flush_sync().is_err());
        assert!(wal.is_poisoned());

        let len = fs::metadata(&path).unwrap().len();
        assert!(wal.append(&refused).is_err());
        assert_eq!(fs::metadata(&path).unwrap().len(), len);
        assert!(!Wal::replay(&path).unwrap().events.contains(&refused));

        wal.compact(std::slice::from_ref(&first)).unwrap();
        assert!(!wal.is_poisoned());
        wal.append(&after).unwrap();
        drop(wal);
        assert_eq!(Wal::replay(&path).unwrap().events, vec![first, after]);
    }
}
