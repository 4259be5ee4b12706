//! Test utilities for the replayboard crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is only compiled for tests or with the
//! `test-support` feature.

use std::io;
use std::iter;
use std::sync::Arc;

use cap_std::{ambient_authority, fs::Dir};
use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use tempfile::TempDir;

use crate::domain::ghost::{CLASS_GHOST, CLASS_REPLAY};
use crate::domain::{ContentHash, GameVariant, RaceTime, ReplayRecord, ReplayUpload, TrackId};

const HEADER_BASIC: u32 = 0x0309_3000;
const HEADER_XML: u32 = 0x0309_3001;
const HEADER_AUTHOR: u32 = 0x0309_3002;
const BODY_GHOSTS: u32 = 0x0309_3014;
const VALIDATION: u32 = 0x0309_2019;
const VALIDATION_EXTENDED: u32 = 0x0309_2025;
const END_OF_NODE: u32 = 0xFACA_DE01;
const LOOKBACK_NEW: u32 = 0x4000_0000;
const LOOKBACK_EMPTY: u32 = 0xFFFF_FFFF;
const PADDING_LEN: usize = 128;

const LEGACY_VERSION: &str = "TmForever 2.11.26 (2011-04-21_14_12)";
const MODERN_VERSION: &str =
    "Trackmania date=2024-03-19_14_47 git=126569-6e7ec0ec8d2 GameVersion=3.3.0";

/// Builds synthetic but structurally faithful GBX replay files.
///
/// Legacy files carry the track in their XML header so the filename
/// cross-check succeeds. Modern files carry an author chunk holding the
/// readable name just before the account token, followed by enough zero
/// padding to push the body's copy of the token out of the scan window.
///
/// # Examples
/// ```
/// use replayboard::domain::{parse_ghost, GameVariant};
/// use replayboard::test_support::GhostFileBuilder;
///
/// let upload = GhostFileBuilder::modern().display_name("Speedy").upload("bob");
/// let ghost = parse_ghost(&upload).expect("synthetic replay parses");
/// assert_eq!(ghost.game_variant, GameVariant::Modern);
/// assert_eq!(ghost.login, "Speedy");
/// ```
#[derive(Debug, Clone)]
pub struct GhostFileBuilder {
    variant: GameVariant,
    login: String,
    display_name: String,
    track: String,
    race_time: u32,
    checkpoints: Vec<u32>,
    nonce: u32,
    compress_body: bool,
    standalone_ghost: bool,
    omit_identity_chunk: bool,
    extended_validation: bool,
    omitted_chunks: Vec<u32>,
}

impl GhostFileBuilder {
    /// Legacy (`TmForever`) replay on `A01-Race` by `speedy` in 30 seconds.
    pub fn legacy() -> Self {
        Self {
            variant: GameVariant::Legacy,
            login: "speedy".to_owned(),
            display_name: "speedy".to_owned(),
            track: "A01-Race".to_owned(),
            race_time: 30_000,
            checkpoints: vec![10_000, 20_000],
            nonce: 0,
            compress_body: false,
            standalone_ghost: false,
            omit_identity_chunk: false,
            extended_validation: false,
            omitted_chunks: Vec::new(),
        }
    }

    /// Modern replay with a compressed body.
    pub fn modern() -> Self {
        Self {
            variant: GameVariant::Modern,
            login: "a1b2c3d4-e5f6-account".to_owned(),
            display_name: "Speedy".to_owned(),
            track: "Spring 2024 - 01".to_owned(),
            compress_body: true,
            ..Self::legacy()
        }
    }

    /// Login stored in the ghost (account token for modern replays).
    pub fn login(mut self, login: impl Into<String>) -> Self {
        self.login = login.into();
        if self.variant == GameVariant::Legacy {
            self.display_name.clone_from(&self.login);
        }
        self
    }

    /// Readable name stored in the modern author chunk.
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Track named in the header (and in the legacy filename).
    pub fn track(mut self, track: impl Into<String>) -> Self {
        self.track = track.into();
        self
    }

    /// Finish time in milliseconds.
    pub fn race_time(mut self, millis: u32) -> Self {
        self.race_time = millis;
        self
    }

    /// Checkpoint splits in milliseconds.
    pub fn checkpoints(mut self, times: impl IntoIterator<Item = u32>) -> Self {
        self.checkpoints = times.into_iter().collect();
        self
    }

    /// Distinguish otherwise identical files.
    pub fn nonce(mut self, nonce: u32) -> Self {
        self.nonce = nonce;
        self
    }

    /// Store the body LZO1X-compressed.
    pub fn compress_body(mut self, compress: bool) -> Self {
        self.compress_body = compress;
        self
    }

    /// Emit a standalone ghost file instead of a replay.
    pub fn standalone_ghost(mut self, standalone: bool) -> Self {
        self.standalone_ghost = standalone;
        self
    }

    /// Leave out the modern author chunk.
    pub fn omit_identity_chunk(mut self, omit: bool) -> Self {
        self.omit_identity_chunk = omit;
        self
    }

    /// Write the validation block as the newer `0x03092025` chunk.
    pub fn extended_validation(mut self, extended: bool) -> Self {
        self.extended_validation = extended;
        self
    }

    /// Leave out one ghost chunk.
    pub fn without_chunk(mut self, chunk_id: u32) -> Self {
        self.omitted_chunks.push(chunk_id);
        self
    }

    /// Submission filename following `<login>_<track>.Replay.Gbx`.
    pub fn filename(&self) -> String {
        format!("{}_{}.Replay.Gbx", self.display_name, self.track)
    }

    /// Wrap the built file as an upload by `uploader`.
    pub fn upload(&self, uploader: &str) -> ReplayUpload {
        ReplayUpload::new(self.filename(), self.build(), uploader)
    }

    /// Encode the file.
    pub fn build(&self) -> Vec<u8> {
        let class_id = if self.standalone_ghost {
            CLASS_GHOST
        } else {
            CLASS_REPLAY
        };
        let body = if self.standalone_ghost {
            self.ghost_chunks()
        } else {
            self.replay_body()
        };

        let mut out = b"GBX".to_vec();
        out.extend(6_u16.to_le_bytes());
        out.push(b'B');
        out.push(b'U');
        out.push(if self.compress_body { b'C' } else { b'U' });
        out.push(b'R');
        out.extend(class_id.to_le_bytes());

        let user_data = self.user_data();
        put_len(&mut out, user_data.len());
        out.extend(user_data);

        out.extend(12_u32.to_le_bytes());
        out.extend(0_u32.to_le_bytes());

        if self.compress_body {
            let compressed = lzo_literals(&body);
            put_len(&mut out, body.len());
            put_len(&mut out, compressed.len());
            out.extend(compressed);
        } else {
            out.extend(body);
        }
        out
    }

    fn user_data(&self) -> Vec<u8> {
        let mut chunks = Vec::new();
        if self.variant == GameVariant::Modern && !self.omit_identity_chunk {
            let mut author = vec![0_u8, 0x16];
            author.extend_from_slice(self.display_name.as_bytes());
            author.push(0);
            author.extend_from_slice(self.login.as_bytes());
            author.push(0);
            chunks.push((HEADER_AUTHOR, author));
        }
        let mut xml = Vec::new();
        put_string(&mut xml, &self.header_xml());
        chunks.push((HEADER_XML, xml));
        if self.variant == GameVariant::Modern {
            chunks.push((HEADER_BASIC, vec![0_u8; PADDING_LEN]));
        }

        let mut out = Vec::new();
        put_len(&mut out, chunks.len());
        for (id, data) in &chunks {
            out.extend(id.to_le_bytes());
            put_len(&mut out, data.len());
        }
        for (_, data) in chunks {
            out.extend(data);
        }
        out
    }

    fn header_xml(&self) -> String {
        let exever = match self.variant {
            GameVariant::Legacy => "2.11.26",
            GameVariant::Modern => "3.3.0",
        };
        format!(
            r#"<header type="replay" exever="{exever}"><map uid="uid{nonce}" name="{track}" author="Nadeo"/><times best="{time}" respawns="0" stuntscore="0" validable="1"/></header>"#,
            nonce = self.nonce,
            track = self.track,
            time = self.race_time,
        )
    }

    fn replay_body(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(BODY_GHOSTS.to_le_bytes());
        out.extend(0_u32.to_le_bytes());
        out.extend(1_u32.to_le_bytes());
        out.extend(2_u32.to_le_bytes());
        out.extend(CLASS_GHOST.to_le_bytes());
        out.extend(self.ghost_chunks());
        out.extend(0_u32.to_le_bytes());
        out.extend(END_OF_NODE.to_le_bytes());
        out
    }

    fn ghost_chunks(&self) -> Vec<u8> {
        let version = match self.variant {
            GameVariant::Legacy => LEGACY_VERSION,
            GameVariant::Modern => MODERN_VERSION,
        };
        let mut lookback = LookbackWriter::default();
        let mut stream = ChunkStream {
            out: Vec::new(),
            omitted: &self.omitted_chunks,
        };

        stream.plain(0x0309_2005, |out| out.extend(self.race_time.to_le_bytes()));
        stream.plain(0x0309_2008, |out| out.extend(0_u32.to_le_bytes()));
        stream.plain(0x0309_200A, |out| out.extend(0_u32.to_le_bytes()));
        stream.plain(0x0309_200B, |out| {
            put_len(out, self.checkpoints.len());
            for time in &self.checkpoints {
                out.extend(time.to_le_bytes());
                out.extend(0_u32.to_le_bytes());
            }
        });
        stream.plain(0x0309_200C, |out| out.extend(self.nonce.to_le_bytes()));
        stream.plain(0x0309_200E, |out| lookback.new_string(out, "ghost-uid"));
        stream.plain(0x0309_200F, |out| put_string(out, &self.login));
        stream.plain(0x0309_2010, |out| lookback.back_reference(out, 1));
        stream.plain(0x0309_2012, |out| out.extend([0_u8; 20]));
        stream.skippable(0x0309_2013, |out| out.extend([0_u8; 8]));
        stream.skippable(0x0309_2014, |out| out.extend(0_u32.to_le_bytes()));
        stream.plain(0x0309_2015, |out| lookback.numeric(out, 26));
        stream.plain(0x0309_2018, |out| {
            lookback.empty(out);
            lookback.numeric(out, 10_003);
            lookback.back_reference(out, 1);
        });
        let validation_chunk = if self.extended_validation {
            VALIDATION_EXTENDED
        } else {
            VALIDATION
        };
        stream.skippable(validation_chunk, |out| {
            out.extend(self.race_time.max(1).to_le_bytes());
            out.extend(0_u32.to_le_bytes());
            out.extend(2_u32.to_le_bytes());
            lookback.new_string(out, "Accelerate");
            lookback.new_string(out, "Steer");
            out.extend(2_u32.to_le_bytes());
            out.extend(0_u32.to_le_bytes());
            for time in [0_u32, 500] {
                out.extend(time.to_le_bytes());
                out.extend(1_u32.to_le_bytes());
            }
            put_string(out, version);
            out.extend([0_u8; 12]);
            put_string(out, "");
            if validation_chunk == VALIDATION_EXTENDED {
                out.extend(0_u32.to_le_bytes());
            }
        });
        stream.plain(0x0303_F006, |out| {
            out.extend(1_u32.to_le_bytes());
            put_len(out, 16);
            out.extend([0xAB_u8; 16]);
        });

        let mut out = stream.out;
        out.extend(END_OF_NODE.to_le_bytes());
        out
    }
}

struct ChunkStream<'a> {
    out: Vec<u8>,
    omitted: &'a [u32],
}

impl ChunkStream<'_> {
    fn plain(&mut self, id: u32, write: impl FnOnce(&mut Vec<u8>)) {
        if self.omitted.contains(&id) {
            return;
        }
        self.out.extend(id.to_le_bytes());
        write(&mut self.out);
    }

    fn skippable(&mut self, id: u32, write: impl FnOnce(&mut Vec<u8>)) {
        if self.omitted.contains(&id) {
            return;
        }
        let mut payload = Vec::new();
        write(&mut payload);
        self.out.extend(id.to_le_bytes());
        self.out.extend(b"PIKS");
        put_len(&mut self.out, payload.len());
        self.out.extend(payload);
    }
}

#[derive(Default)]
struct LookbackWriter {
    started: bool,
}

impl LookbackWriter {
    fn start(&mut self, out: &mut Vec<u8>) {
        if !self.started {
            self.started = true;
            out.extend(3_u32.to_le_bytes());
        }
    }

    fn new_string(&mut self, out: &mut Vec<u8>, value: &str) {
        self.start(out);
        out.extend(LOOKBACK_NEW.to_le_bytes());
        put_string(out, value);
    }

    fn back_reference(&mut self, out: &mut Vec<u8>, index: u32) {
        self.start(out);
        out.extend((LOOKBACK_NEW | index).to_le_bytes());
    }

    fn numeric(&mut self, out: &mut Vec<u8>, id: u32) {
        self.start(out);
        out.extend(id.to_le_bytes());
    }

    fn empty(&mut self, out: &mut Vec<u8>) {
        self.start(out);
        out.extend(LOOKBACK_EMPTY.to_le_bytes());
    }
}

fn put_len(out: &mut Vec<u8>, len: usize) {
    let len = u32::try_from(len).expect("synthetic chunk fits in u32");
    out.extend(len.to_le_bytes());
}

fn put_string(out: &mut Vec<u8>, value: &str) {
    put_len(out, value.len());
    out.extend_from_slice(value.as_bytes());
}

/// LZO1X stream made of a single literal run.
fn lzo_literals(data: &[u8]) -> Vec<u8> {
    const FIRST_RUN_MAX: usize = 238;
    const LONG_RUN_BASE: usize = 18;

    let mut out = Vec::with_capacity(data.len() + 8);
    match data.len() {
        0 => {}
        len if len <= FIRST_RUN_MAX => {
            out.push(u8::try_from(len + 17).expect("short run"));
        }
        len => {
            let extra = len - LONG_RUN_BASE;
            let zeros = (extra - 1) / 255;
            out.push(0);
            out.extend(iter::repeat_n(0_u8, zeros));
            out.push(u8::try_from(extra - zeros * 255).expect("run remainder"));
        }
    }
    out.extend_from_slice(data);
    out.extend([0x11, 0x00, 0x00]);
    out
}

/// Instant returned by [`fixture_clock`].
pub fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 24, 10, 30, 0)
        .single()
        .expect("valid fixture timestamp")
}

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixtureClock {
    /// Instant reported by the clock.
    pub utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

/// Clock frozen at [`fixture_timestamp`].
pub fn fixture_clock() -> Arc<dyn Clock> {
    Arc::new(FixtureClock {
        utc_now: fixture_timestamp(),
    })
}

/// Legacy record uploaded by `login` at [`fixture_timestamp`].
///
/// The content hash is derived from the arguments, so distinct arguments give
/// distinct records.
pub fn sample_record(login: &str, track: &str, millis: u32) -> ReplayRecord {
    ReplayRecord {
        content_hash: ContentHash::of(format!("{login}|{track}|{millis}").as_bytes()),
        race_time: RaceTime::from_millis(millis),
        login: login.to_owned(),
        raw_identity_token: None,
        uploader: login.to_owned(),
        track_id: TrackId::new(track),
        checkpoint_times: Vec::new(),
        uploaded_at: fixture_timestamp(),
        game_variant: GameVariant::Legacy,
    }
}

/// Write each built replay under its filename into a fresh temporary
/// directory.
///
/// # Errors
///
/// Returns any I/O error raised while creating or writing the files.
pub fn replay_dir(builders: &[GhostFileBuilder]) -> io::Result<TempDir> {
    let temp = TempDir::new()?;
    let dir = Dir::open_ambient_dir(temp.path(), ambient_authority())?;
    for builder in builders {
        dir.write(builder.filename(), builder.build())?;
    }
    Ok(temp)
}
