use serde::{Deserialize, Serialize};

/// Poll attached to a post at creation time.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePoll {
    pub title: String,
    pub options: Vec<String>,
}

/// Poll results as seen by one viewer.
#[derive(Debug, Clone, Serialize)]
pub struct PollView {
    pub id: String,
    pub title: String,
    /// Total number of votes cast.
    pub voters: i64,
    pub already_voted: bool,
    pub options: Vec<PollOptionView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollOptionView {
    pub id: String,
    pub title: String,
    pub votes: i64,
    pub voted_by_me: bool,
}

/// Input for `POST /posts/{id}/@vote`.
#[derive(Debug, Clone, Deserialize)]
pub struct VoteInput {
    pub option_id: String,
}
