use std::path::PathBuf;

/// messages for the audio thread; the poll loop decides, the audio
/// thread plays
#[derive(Debug, Clone)]
pub struct Message {
    pub kind: MessageType,
    pub alarm_id: u64,
}

impl Message {
    #[must_use]
    pub const fn new(kind: MessageType, alarm_id: u64) -> Self {
        Self { kind, alarm_id }
    }
}

#[derive(Debug, Clone)]
pub enum MessageType {
    /// `sound_path` of `None` means the built-in tone
    AlarmTriggered {
        volume: f32,
        sound_path: Option<PathBuf>,
    },
    // sent when the alarm is stopped, snoozed, disabled or removed
    AlarmStopped,
}
