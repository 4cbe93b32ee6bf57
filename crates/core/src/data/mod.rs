pub mod event;
pub mod player;
pub mod room;
pub mod server_list;
pub mod session_id;
pub mod user;

pub use event::{Event, EventArg};
pub use player::{PlayerIconData, PlayerIconType, PlayerObjectData, PlayerState};
pub use room::{MultiColor, RoomSettings, RoomState, RoomTeam};
pub use server_list::GameServer;
pub use session_id::SessionId;
pub use user::{ExtendedUserData, SpecialUserData, UserPermissions};
