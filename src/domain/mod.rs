pub mod lesson;
pub mod message;
pub mod recipient;

pub use lesson::{DaySchedule, LessonEntry, WeekSchedule};
pub use message::{Folder, MarkReadOutcome, Message, MessageId, ReadState, SentConfirmation};
pub use recipient::{Recipient, RecipientRole};
