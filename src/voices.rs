//! Voice manager — allocation, polyphony enforcement, and cleanup.
//!
//! Voices live in a small arena ordered by a monotonic sequence number, so
//! "oldest" is always well-defined. Primary and texture-layer voices use a
//! tagged key, never numeric offsets, so they cannot collide.

use log::debug;

use crate::voice::Voice;

pub const DEFAULT_MAX_POLYPHONY: usize = 16;

/// Identity of a live voice. Layer voices are keyed separately from the
/// primary voice of the same note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceKey {
    Primary(u8),
    Layer(u8, usize),
}

#[derive(Debug)]
struct VoiceSlot {
    key: VoiceKey,
    seq: u64,
    voice: Voice,
}

/// Arena of live voices with oldest-voice eviction at the polyphony ceiling.
#[derive(Debug)]
pub struct VoiceBank {
    slots: Vec<VoiceSlot>,
    next_seq: u64,
    max_polyphony: usize,
}

impl VoiceBank {
    pub fn new(max_polyphony: usize) -> Self {
        VoiceBank {
            slots: Vec::with_capacity(max_polyphony),
            next_seq: 0,
            max_polyphony: max_polyphony.max(1),
        }
    }

    /// Insert a new voice under `key`. Retriggering an already-live key
    /// replaces that voice in place. At the ceiling the single oldest voice
    /// is evicted first — expected steady-state behavior, never an error.
    pub fn insert(&mut self, key: VoiceKey, voice: Voice) {
        let seq = self.next_seq;
        self.next_seq += 1;

        if let Some(slot) = self.slots.iter_mut().find(|s| s.key == key) {
            slot.voice = voice;
            slot.seq = seq;
            return;
        }

        if self.slots.len() >= self.max_polyphony {
            if let Some(oldest) = self
                .slots
                .iter()
                .enumerate()
                .min_by_key(|(_, s)| s.seq)
                .map(|(i, _)| i)
            {
                let evicted = self.slots.remove(oldest);
                debug!("polyphony ceiling: evicted oldest voice {:?}", evicted.key);
            }
        }

        self.slots.push(VoiceSlot { key, seq, voice });
    }

    /// Begin the release phase of `key`. Unknown keys are a silent no-op:
    /// note-off events can race with a voice's own natural expiry.
    pub fn release(&mut self, key: VoiceKey) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.key == key) {
            slot.voice.note_off();
        }
    }

    /// Release every live voice.
    pub fn release_all(&mut self) {
        for slot in &mut self.slots {
            slot.voice.note_off();
        }
    }

    /// Sum one sample from every live voice.
    pub fn next_sample(&mut self) -> f64 {
        self.slots.iter_mut().map(|s| s.voice.next_sample()).sum()
    }

    /// Drop voices whose release tails have fully elapsed.
    pub fn sweep(&mut self) {
        self.slots.retain(|s| !s.voice.is_finished());
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, key: VoiceKey) -> bool {
        self.slots.iter().any(|s| s.key == key)
    }

    pub fn max_polyphony(&self) -> usize {
        self.max_polyphony
    }

    pub fn set_max_polyphony(&mut self, ceiling: usize) {
        self.max_polyphony = ceiling.max(1);
    }
}
