mod team_request;

pub use team_request::{
    next_updated_at, now_millis, truncate_millis, DeleteRequestPayload, Member, TeamRequest,
    TeamRequestPayload,
};
