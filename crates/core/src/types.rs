use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Which side of the conversation sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sender {
    /// The account owner.
    SelfUser,

    /// The conversation partner.
    Contact,
}

impl Sender {
    /// Map the store's `isSend` flag.
    pub fn from_is_send(is_send: i64) -> Self {
        if is_send == 1 {
            Sender::SelfUser
        } else {
            Sender::Contact
        }
    }

    /// Whether this is the account owner.
    pub fn is_self(self) -> bool {
        matches!(self, Sender::SelfUser)
    }
}

/// Payload kind, keyed by the store's integer type tag.
///
/// The mapping is closed: tags outside this set have no kind and are
/// reported as unhandled by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Plain text.
    Text,

    /// Picture.
    Image,

    /// Voice note.
    Voice,

    /// Shared contact card.
    NameCard,

    /// Video clip.
    Video,

    /// Store sticker.
    BigEmoji,

    /// Shared link, chat-history bundle or web file.
    Link,

    /// Voice or video call summary.
    Voip,

    /// System notice (recall, red envelope claimed, transfer reminders).
    System,

    /// Third-party app share.
    AppMsg,

    /// User-saved sticker.
    CustomEmoji,

    /// Recalled message notice.
    Withdraw,

    /// Money transfer.
    Transfer,

    /// Red envelope.
    RedEnvelope,

    /// Reply quoting an earlier message.
    Reply,

    /// "Pat" nudge.
    Pat,

    /// File attachment.
    File,
}

impl MessageKind {
    /// Every known kind, in tag order.
    pub const ALL: [MessageKind; 17] = [
        MessageKind::Text,
        MessageKind::Image,
        MessageKind::Voice,
        MessageKind::NameCard,
        MessageKind::Video,
        MessageKind::BigEmoji,
        MessageKind::Link,
        MessageKind::Voip,
        MessageKind::System,
        MessageKind::CustomEmoji,
        MessageKind::AppMsg,
        MessageKind::Withdraw,
        MessageKind::Transfer,
        MessageKind::RedEnvelope,
        MessageKind::Reply,
        MessageKind::Pat,
        MessageKind::File,
    ];

    /// Look up the kind for a raw type tag.
    pub fn from_tag(tag: i64) -> Option<Self> {
        let kind = match tag {
            1 => MessageKind::Text,
            3 => MessageKind::Image,
            34 => MessageKind::Voice,
            42 => MessageKind::NameCard,
            43 => MessageKind::Video,
            47 => MessageKind::BigEmoji,
            49 => MessageKind::Link,
            50 => MessageKind::Voip,
            10000 => MessageKind::System,
            1048625 => MessageKind::CustomEmoji,
            16777265 => MessageKind::AppMsg,
            268445456 => MessageKind::Withdraw,
            419430449 => MessageKind::Transfer,
            436207665 => MessageKind::RedEnvelope,
            822083633 => MessageKind::Reply,
            922746929 => MessageKind::Pat,
            1090519089 => MessageKind::File,
            _ => return None,
        };
        Some(kind)
    }

    /// The raw type tag stored for this kind.
    pub fn tag(self) -> i64 {
        match self {
            MessageKind::Text => 1,
            MessageKind::Image => 3,
            MessageKind::Voice => 34,
            MessageKind::NameCard => 42,
            MessageKind::Video => 43,
            MessageKind::BigEmoji => 47,
            MessageKind::Link => 49,
            MessageKind::Voip => 50,
            MessageKind::System => 10000,
            MessageKind::CustomEmoji => 1048625,
            MessageKind::AppMsg => 16777265,
            MessageKind::Withdraw => 268445456,
            MessageKind::Transfer => 419430449,
            MessageKind::RedEnvelope => 436207665,
            MessageKind::Reply => 822083633,
            MessageKind::Pat => 922746929,
            MessageKind::File => 1090519089,
        }
    }
}

/// Status code the store uses for a message that failed to send.
pub const STATUS_SEND_FAILED: i64 = 5;

/// One row of the conversation, as fetched from the message store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Store row id.
    pub msg_id: i64,

    /// Local wall-clock send time.
    pub time: NaiveDateTime,

    /// Sending side.
    pub sender: Sender,

    /// Contact label for the partner, `我` for the owner.
    pub display_name: String,

    /// Text or embedded markup.
    pub content: String,

    /// Raw type tag.
    pub type_tag: i64,

    /// Delivery status code.
    pub status: i64,

    /// Side-file reference (image/voice/video identifier or sticker hash).
    pub img_path: String,

    /// Secondary binary payload (call summaries live here).
    pub buffer: Vec<u8>,
}

impl MessageRecord {
    /// Kind for this record's tag, if known.
    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::from_tag(self.type_tag)
    }

    /// Whether the owner sent this record.
    pub fn is_self(&self) -> bool {
        self.sender.is_self()
    }

    /// Whether the store flagged the send as failed.
    pub fn send_failed(&self) -> bool {
        self.status == STATUS_SEND_FAILED
    }

    /// Buffer decoded as UTF-8, replacing invalid sequences.
    pub fn buffer_text(&self) -> String {
        String::from_utf8_lossy(&self.buffer).into_owned()
    }
}
