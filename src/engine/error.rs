use ulid::Ulid;

#[derive(Debug, PartialEq, Eq)]
pub enum EngineError {
    UserNotFound(Ulid),
    /// Unknown item — also returned when an owner tries to book their own
    /// item, so ownership is never confirmed to the caller.
    ItemNotFound(Ulid),
    BookingNotFound(Ulid),
    RequestNotFound(Ulid),
    /// Non-owner attempted an owner-only mutation.
    NotOwner { user_id: Ulid },
    /// Caller is neither the booker nor the item owner.
    NotAuthorized { user_id: Ulid },
    /// The booking already holds the requested status.
    AlreadyDecided(Ulid),
    Validation(String),
    UnknownState(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::UserNotFound(id) => write!(f, "user not found: {id}"),
            EngineError::ItemNotFound(id) => write!(f, "item not found: {id}"),
            EngineError::BookingNotFound(id) => write!(f, "booking not found: {id}"),
            EngineError::RequestNotFound(id) => write!(f, "item request not found: {id}"),
            EngineError::NotOwner { user_id } => {
                write!(f, "user {user_id} is not the item owner")
            }
            EngineError::NotAuthorized { user_id } => {
                write!(f, "user {user_id} is neither the booker nor the item owner")
            }
            EngineError::AlreadyDecided(id) => {
                write!(f, "booking {id} has already been decided")
            }
            EngineError::Validation(msg) => write!(f, "validation failed: {msg}"),
            EngineError::UnknownState(state) => write!(f, "Unknown state: {state}"),
        }
    }
}

impl std::error::Error for EngineError {}
