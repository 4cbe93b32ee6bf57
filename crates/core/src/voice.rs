//! Voice Pipeline (`spec.md` §2 item 11, §4.10): per-speaker jitter
//! buffers feeding opaque opus frames to playback, proximity attenuation,
//! a loudness estimator, and a push-to-talk recorder. This crate never
//! links an Opus codec (`SPEC_FULL.md` §3) — frames are opaque payloads
//! it frames, buffers, and routes, leaving encode/decode to the host.

use std::collections::VecDeque;

/// An opus-encoded audio frame, opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpusFrame(pub Vec<u8>);

impl From<Vec<u8>> for OpusFrame {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<OpusFrame> for Vec<u8> {
    fn from(frame: OpusFrame) -> Self {
        frame.0
    }
}

/// Smoothing factor for the loudness estimator's exponential moving
/// average; lower is smoother.
const LOUDNESS_SMOOTHING: f32 = 0.3;
/// Default jitter buffer depth, in frames, before the oldest is dropped
/// to make room for a new arrival.
const DEFAULT_JITTER_CAPACITY: usize = 8;

/// Approximates a frame's loudness from its raw byte length; this crate
/// has no decoder, so true amplitude is unavailable to it.
fn estimate_loudness(frame: &OpusFrame) -> f32 {
    (frame.0.len() as f32 / 256.0).clamp(0.0, 1.0)
}

/// Per-speaker playback state: an ordered jitter buffer of encoded
/// frames, a playback head, a loudness estimate, and stream flags
/// (`spec.md` §3 `VoiceStream`).
///
/// The wire `Voice`/`VoiceBroadcast` packets carry no sequence field, so
/// "late" is judged by arrival order, same as the original's
/// `playFrameStreamed`: each stream keeps its own monotonic arrival
/// counter and compares it against the playback head, rather than trusting
/// an externally-supplied sequence number.
pub struct VoiceStream {
    buffer: VecDeque<OpusFrame>,
    capacity: usize,
    playback_head: u64,
    next_arrival_seq: u64,
    loudness: f32,
    pub proximity: bool,
    pub stopped: bool,
}

impl VoiceStream {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::new(),
            capacity: DEFAULT_JITTER_CAPACITY,
            playback_head: 0,
            next_arrival_seq: 0,
            loudness: 0.0,
            proximity: true,
            stopped: false,
        }
    }

    /// Pushes a frame in the order it arrived on the wire. Tags it with the
    /// next arrival index and discards it as late if that index already
    /// falls behind the playback head.
    pub fn push(&mut self, frame: OpusFrame) {
        let seq = self.next_arrival_seq;
        self.next_arrival_seq += 1;
        if seq < self.playback_head {
            return;
        }
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.loudness += (estimate_loudness(&frame) - self.loudness) * LOUDNESS_SMOOTHING;
        self.buffer.push_back(frame);
    }

    /// Pops the next frame for playback, advancing the playback head.
    pub fn pop(&mut self) -> Option<OpusFrame> {
        let frame = self.buffer.pop_front();
        if frame.is_some() {
            self.playback_head += 1;
        }
        frame
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn loudness(&self) -> f32 {
        self.loudness
    }

    /// Attenuates by distance when proximity mode is active: `1.0` at
    /// `distance == 0`, falling linearly to `0.0` at `distance >= 300`.
    pub fn attenuation(&self, distance: f32, editor_active: bool) -> f32 {
        if !self.proximity || editor_active {
            return 1.0;
        }
        (1.0 - distance / 300.0).clamp(0.0, 1.0)
    }
}

impl Default for VoiceStream {
    fn default() -> Self {
        Self::new()
    }
}

/// Host port for the audio device; implemented by whatever embeds this
/// crate (a real capture device, or the harness binary's stub).
pub trait AudioPort {
    fn open_input(&mut self) -> bool;
    fn close_input(&mut self);
    /// Drains any frames captured since the last call, already sliced to
    /// the recorder's fixed frame size.
    fn drain_captured_frames(&mut self) -> Vec<OpusFrame>;
}

/// Push-to-talk recorder: opens the input device on key-down, closes it
/// on key-up, and hands captured frames to the caller for framing into
/// `Voice` packets (`spec.md` §4.10).
pub struct PushToTalkRecorder {
    recording: bool,
    next_seq: u64,
}

impl PushToTalkRecorder {
    pub fn new() -> Self {
        Self {
            recording: false,
            next_seq: 0,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn key_down(&mut self, audio: &mut dyn AudioPort) {
        if self.recording {
            return;
        }
        if audio.open_input() {
            self.recording = true;
        }
    }

    pub fn key_up(&mut self, audio: &mut dyn AudioPort) {
        if !self.recording {
            return;
        }
        audio.close_input();
        self.recording = false;
    }

    /// Drains captured frames while recording, tagging each with the
    /// next outbound sequence number.
    pub fn drain(&mut self, audio: &mut dyn AudioPort) -> Vec<(u64, OpusFrame)> {
        if !self.recording {
            return Vec::new();
        }
        audio
            .drain_captured_frames()
            .into_iter()
            .map(|frame| {
                let seq = self.next_seq;
                self.next_seq = self.next_seq.wrapping_add(1);
                (seq, frame)
            })
            .collect()
    }
}

impl Default for PushToTalkRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns one [`VoiceStream`] per remote speaker plus the local recorder.
/// Failures (e.g. a missing input device) are reported through the error
/// queue by the caller rather than tearing down the whole pipeline
/// (`spec.md` §4.10, §7).
#[derive(Default)]
pub struct VoicePipeline {
    streams: std::collections::HashMap<i32, VoiceStream>,
    recorder: PushToTalkRecorder,
    deafened: bool,
}

impl VoicePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_deafened(&mut self, deafened: bool) {
        self.deafened = deafened;
    }

    pub fn is_deafened(&self) -> bool {
        self.deafened
    }

    /// Ingests an inbound `VoiceBroadcast` in wire-arrival order. Deafened
    /// clients discard all inbound voice before it ever reaches a jitter
    /// buffer.
    pub fn ingest(&mut self, sender: i32, frame: OpusFrame) {
        if self.deafened {
            return;
        }
        self.streams.entry(sender).or_insert_with(VoiceStream::new).push(frame);
    }

    /// Pops the next ready frame per active stream for this tick, paired
    /// with its attenuated volume. Removes the stream once marked stopped
    /// and drained.
    pub fn drain_playback(&mut self, distances: &std::collections::HashMap<i32, f32>, editor_active: bool) -> Vec<(i32, OpusFrame, f32)> {
        let mut out = Vec::new();
        let mut to_remove = Vec::new();
        for (&sender, stream) in self.streams.iter_mut() {
            if let Some(frame) = stream.pop() {
                let distance = distances.get(&sender).copied().unwrap_or(0.0);
                let volume = stream.attenuation(distance, editor_active);
                out.push((sender, frame, volume));
            }
            if stream.stopped && stream.is_empty() {
                to_remove.push(sender);
            }
        }
        for sender in to_remove {
            self.streams.remove(&sender);
        }
        out
    }

    pub fn mark_stopped(&mut self, sender: i32) {
        if let Some(stream) = self.streams.get_mut(&sender) {
            stream.stopped = true;
        }
    }

    pub fn set_proximity(&mut self, sender: i32, proximity: bool) {
        if let Some(stream) = self.streams.get_mut(&sender) {
            stream.proximity = proximity;
        }
    }

    pub fn loudness_of(&self, sender: i32) -> f32 {
        self.streams.get(&sender).map(|s| s.loudness()).unwrap_or(0.0)
    }

    pub fn recorder_mut(&mut self) -> &mut PushToTalkRecorder {
        &mut self.recorder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_pop_in_arrival_order() {
        let mut stream = VoiceStream::new();
        stream.push(OpusFrame(vec![1; 128]));
        stream.push(OpusFrame(vec![2; 128]));
        assert_eq!(stream.pop(), Some(OpusFrame(vec![1; 128])));
        assert_eq!(stream.pop(), Some(OpusFrame(vec![2; 128])));
        assert!(stream.is_empty());
    }

    #[test]
    fn jitter_buffer_drops_oldest_past_capacity() {
        let mut stream = VoiceStream::new();
        for i in 0..(DEFAULT_JITTER_CAPACITY + 2) {
            stream.push(OpusFrame(vec![i as u8; 64]));
        }
        assert_eq!(stream.buffer.len(), DEFAULT_JITTER_CAPACITY);
    }

    #[test]
    fn proximity_attenuates_by_distance_unless_disabled() {
        let stream = VoiceStream::new();
        assert!((stream.attenuation(0.0, false) - 1.0).abs() < 1e-6);
        assert!((stream.attenuation(300.0, false) - 0.0).abs() < 1e-6);
        assert!((stream.attenuation(150.0, false) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn proximity_disabled_in_editor() {
        let stream = VoiceStream::new();
        assert_eq!(stream.attenuation(300.0, true), 1.0);
    }

    #[test]
    fn deafen_suppresses_inbound_voice() {
        let mut pipeline = VoicePipeline::new();
        pipeline.set_deafened(true);
        pipeline.ingest(1, OpusFrame(vec![1, 2, 3]));
        assert_eq!(pipeline.loudness_of(1), 0.0);
    }

    struct StubAudio {
        opened: bool,
        queued: Vec<OpusFrame>,
    }

    impl AudioPort for StubAudio {
        fn open_input(&mut self) -> bool {
            self.opened = true;
            true
        }
        fn close_input(&mut self) {
            self.opened = false;
        }
        fn drain_captured_frames(&mut self) -> Vec<OpusFrame> {
            std::mem::take(&mut self.queued)
        }
    }

    #[test]
    fn recorder_only_drains_while_key_is_held() {
        let mut audio = StubAudio {
            opened: false,
            queued: vec![OpusFrame(vec![9])],
        };
        let mut recorder = PushToTalkRecorder::new();
        assert!(recorder.drain(&mut audio).is_empty());

        recorder.key_down(&mut audio);
        assert!(audio.opened);
        let frames = recorder.drain(&mut audio);
        assert_eq!(frames.len(), 1);

        recorder.key_up(&mut audio);
        assert!(!audio.opened);
        audio.queued.push(OpusFrame(vec![1]));
        assert!(recorder.drain(&mut audio).is_empty());
    }
}
