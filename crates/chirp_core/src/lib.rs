pub mod domain;
pub mod error;
pub mod extract;
pub mod fanout;
pub mod memory;
pub mod pagination;
pub mod poll;
pub mod ports;
pub mod services;

pub use domain::{
    Conversation, ConversationDetails, ConversationOverview, Follow, Hashtag, Like, LikeDetails,
    Message, MessageDetails, NewNotification, NewUser, Notification, NotificationDetails,
    NotificationKind, Poll, PollDetails, PollOption, PollOptionTally, PollResponse, Tweet,
    TweetChanges, TweetCounts, TweetDetails, TweetFilter, TweetMedia, TweetOrigin, TweetPreview,
    User, UserChanges, UserCredentials, UserSummary,
};
pub use error::{ServiceError, ServiceResult};
pub use fanout::{PollInput, TweetEdit, TweetInput};
pub use memory::MemoryStore;
pub use pagination::{PageMeta, PageRequest, Paginated};
pub use ports::{CredentialHasher, DatabaseService, PortError, PortResult};
