use rocket::{serde::json::Json, Route, State};

use crate::{
    engine::Engine,
    error::Result,
    model::{api::vote::VoteDescription, common::vote::BallotInput, mongodb::Id},
};

pub fn routes() -> Vec<Route> {
    routes![
        cast_vote,
        update_vote,
        get_vote,
        get_subject_votes,
        get_member_votes,
        delete_vote,
        delete_subject_votes,
        send_reminder,
    ]
}

/// First cast of a ballot. Chair-only ballots may finalize their election.
#[post("/votes/<vote_id>/cast", data = "<input>", format = "json")]
async fn cast_vote(
    vote_id: Id,
    input: Json<BallotInput>,
    engine: &State<Engine>,
) -> Result<Json<VoteDescription>> {
    let vote = engine.cast_first(vote_id, input.0).await?;
    Ok(Json(vote.into()))
}

#[put("/subjects/<subject_id>/votes/<vote_id>", data = "<input>", format = "json")]
async fn update_vote(
    subject_id: &str,
    vote_id: Id,
    input: Json<BallotInput>,
    engine: &State<Engine>,
) -> Result<Json<VoteDescription>> {
    let vote = engine.cast_update(vote_id, subject_id, input.0).await?;
    Ok(Json(vote.into()))
}

#[get("/votes/<vote_id>")]
async fn get_vote(vote_id: Id, engine: &State<Engine>) -> Result<Json<VoteDescription>> {
    Ok(Json(engine.vote(vote_id).await?.into()))
}

#[get("/subjects/<subject_id>/votes")]
async fn get_subject_votes(subject_id: &str, engine: &State<Engine>) -> Result<Json<Vec<VoteDescription>>> {
    let votes = engine.votes_for_subject(subject_id).await?;
    Ok(Json(votes.into_iter().map(Into::into).collect()))
}

#[get("/members/<member_id>/votes")]
async fn get_member_votes(member_id: Id, engine: &State<Engine>) -> Result<Json<Vec<VoteDescription>>> {
    let votes = engine.votes_for_voter(member_id).await?;
    Ok(Json(votes.into_iter().map(Into::into).collect()))
}

#[delete("/votes/<vote_id>")]
async fn delete_vote(vote_id: Id, engine: &State<Engine>) -> Result<()> {
    engine.delete_vote(vote_id).await
}

/// Returns how many ballots were deleted.
#[delete("/subjects/<subject_id>/votes")]
async fn delete_subject_votes(subject_id: &str, engine: &State<Engine>) -> Result<Json<u64>> {
    Ok(Json(engine.delete_votes_for_subject(subject_id).await?))
}

#[post("/votes/<vote_id>/reminder")]
async fn send_reminder(vote_id: Id, engine: &State<Engine>) -> Result<Json<VoteDescription>> {
    Ok(Json(engine.send_reminder(vote_id).await?.into()))
}
