use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub choice: i32,
}
