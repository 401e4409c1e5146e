use rocket::{serde::json::Json, Route, State};

use crate::{
    engine::{Engine, Opened},
    error::Result,
    model::{
        api::{
            election::{
                DatasetApproval, ElectionDescription, ElectionRequest, OpenedElection, StatusUpdate,
                Tally,
            },
            vote::VoteDescription,
        },
        common::{
            election::{ElectionStatus, ElectionType},
            vote::VoteType,
        },
        mongodb::Id,
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        open_election,
        get_election,
        get_companion,
        get_subject_elections,
        get_current_election,
        update_status,
        delete_election,
        materialize_votes,
        get_election_votes,
        get_tally,
        get_closed_elections,
        start_dataset_reviews,
        get_dataset_approval,
    ]
}

/// Optional filters on a subject's elections.
#[derive(Debug, FromForm)]
struct ElectionQuery {
    status: Option<ElectionStatus>,
    #[field(name = "type")]
    election_type: Option<ElectionType>,
}

#[derive(Debug, FromForm)]
struct CurrentQuery {
    status: ElectionStatus,
    #[field(name = "type")]
    election_type: Option<ElectionType>,
}

#[derive(Debug, FromForm)]
struct ClosedQuery {
    #[field(name = "type")]
    election_type: ElectionType,
}

#[derive(Debug, FromForm)]
struct VoteQuery {
    #[field(name = "type")]
    vote_type: VoteType,
}

fn describe(opened: Opened) -> OpenedElection {
    OpenedElection {
        election: opened.election.into(),
        companion: opened.companion.map(Into::into),
        votes: opened.votes.into_iter().map(Into::into).collect(),
    }
}

#[post("/elections", data = "<request>", format = "json")]
async fn open_election(
    request: Json<ElectionRequest>,
    engine: &State<Engine>,
) -> Result<Json<OpenedElection>> {
    let ElectionRequest {
        election_type,
        subject_id,
        dataset_id,
    } = request.0;
    let opened = engine
        .start_review(election_type, &subject_id, dataset_id.as_deref())
        .await?;
    Ok(Json(describe(opened)))
}

#[get("/elections/<election_id>")]
async fn get_election(election_id: Id, engine: &State<Engine>) -> Result<Json<ElectionDescription>> {
    let election = engine.election(election_id).await?;
    Ok(Json(election.into()))
}

#[get("/elections/<election_id>/companion")]
async fn get_companion(
    election_id: Id,
    engine: &State<Engine>,
) -> Result<Json<Option<ElectionDescription>>> {
    let companion = engine.companion(election_id).await?;
    Ok(Json(companion.map(Into::into)))
}

#[get("/subjects/<subject_id>/elections?<query..>")]
async fn get_subject_elections(
    subject_id: &str,
    query: ElectionQuery,
    engine: &State<Engine>,
) -> Result<Json<Vec<ElectionDescription>>> {
    let elections = engine
        .elections_for_subject(subject_id, query.status, query.election_type)
        .await?;
    Ok(Json(elections.into_iter().map(Into::into).collect()))
}

#[get("/subjects/<subject_id>/elections/current?<query..>")]
async fn get_current_election(
    subject_id: &str,
    query: CurrentQuery,
    engine: &State<Engine>,
) -> Result<Json<ElectionDescription>> {
    let election = engine
        .current_election(subject_id, query.status, query.election_type)
        .await?;
    Ok(Json(election.into()))
}

#[put("/elections/<election_id>/status", data = "<update>", format = "json")]
async fn update_status(
    election_id: Id,
    update: Json<StatusUpdate>,
    engine: &State<Engine>,
) -> Result<Json<ElectionDescription>> {
    let StatusUpdate {
        status,
        final_vote,
        rationale,
    } = update.0;
    let election = engine
        .update_status(election_id, status, final_vote, rationale)
        .await?;
    Ok(Json(election.into()))
}

#[delete("/subjects/<subject_id>/elections/<election_id>")]
async fn delete_election(subject_id: &str, election_id: Id, engine: &State<Engine>) -> Result<()> {
    engine.delete_election(subject_id, election_id).await
}

#[post("/elections/<election_id>/votes")]
async fn materialize_votes(
    election_id: Id,
    engine: &State<Engine>,
) -> Result<Json<Vec<VoteDescription>>> {
    let votes = engine.materialize_votes(election_id).await?;
    Ok(Json(votes.into_iter().map(Into::into).collect()))
}

#[get("/elections/<election_id>/votes?<query..>")]
async fn get_election_votes(
    election_id: Id,
    query: VoteQuery,
    engine: &State<Engine>,
) -> Result<Json<Vec<VoteDescription>>> {
    let votes = engine.votes_of_type(election_id, query.vote_type).await?;
    Ok(Json(votes.into_iter().map(Into::into).collect()))
}

#[get("/elections/<election_id>/tally")]
async fn get_tally(election_id: Id, engine: &State<Engine>) -> Result<Json<Tally>> {
    Ok(Json(engine.tally(election_id).await?))
}

#[get("/closed-elections?<query..>")]
async fn get_closed_elections(
    query: ClosedQuery,
    engine: &State<Engine>,
) -> Result<Json<Vec<ElectionDescription>>> {
    let elections = engine.closed_elections(query.election_type).await?;
    Ok(Json(elections.into_iter().map(Into::into).collect()))
}

#[post("/dars/<dar_id>/dataset-reviews")]
async fn start_dataset_reviews(
    dar_id: &str,
    engine: &State<Engine>,
) -> Result<Json<Vec<OpenedElection>>> {
    let opened = engine.start_dataset_reviews(dar_id).await?;
    Ok(Json(opened.into_iter().map(describe).collect()))
}

#[get("/dars/<dar_id>/dataset-approval")]
async fn get_dataset_approval(dar_id: &str, engine: &State<Engine>) -> Result<Json<DatasetApproval>> {
    Ok(Json(engine.dataset_approval(dar_id).await?))
}
