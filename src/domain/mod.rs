mod conversation;
mod conversation_id;
mod delivery_status;
mod image_attachment;
mod message;
mod message_id;
mod message_role;
mod metadata;
mod user_id;
mod youtube_video;

pub use conversation::Conversation;
pub use conversation_id::ConversationId;
pub use delivery_status::DeliveryStatus;
pub use image_attachment::ImageAttachment;
pub use message::Message;
pub use message_id::MessageId;
pub use message_role::MessageRole;
pub use metadata::{Metadata, URLS_KEY, YOUTUBE_KEY};
pub use user_id::UserId;
pub use youtube_video::YoutubeVideo;
