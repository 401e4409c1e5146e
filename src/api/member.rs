use rocket::{serde::json::Json, Route, State};

use crate::{
    engine::{Engine, Succession},
    error::Result,
    model::{
        api::{
            member::{MemberDescription, MemberSpec, SuccessionDescription},
            pending::PendingCase,
        },
        common::election::ElectionType,
        mongodb::Id,
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        create_member,
        get_member,
        get_voting_members,
        get_chair,
        get_data_owners,
        get_pending,
        promote_chair,
        remove_data_owner,
        remove_member,
    ]
}

#[post("/members", data = "<spec>", format = "json")]
async fn create_member(spec: Json<MemberSpec>, engine: &State<Engine>) -> Result<Json<MemberDescription>> {
    let member = engine.create_member(spec.0.into()).await?;
    Ok(Json(member.into()))
}

#[get("/members/<member_id>")]
async fn get_member(member_id: Id, engine: &State<Engine>) -> Result<Json<MemberDescription>> {
    Ok(Json(engine.member(member_id).await?.into()))
}

#[get("/committee/voters")]
async fn get_voting_members(engine: &State<Engine>) -> Result<Json<Vec<MemberDescription>>> {
    let members = engine.voting_members().await?;
    Ok(Json(members.into_iter().map(Into::into).collect()))
}

#[get("/committee/chair")]
async fn get_chair(engine: &State<Engine>) -> Result<Json<Option<MemberDescription>>> {
    Ok(Json(engine.current_chair().await?.map(Into::into)))
}

#[get("/datasets/<dataset_id>/owners")]
async fn get_data_owners(dataset_id: &str, engine: &State<Engine>) -> Result<Json<Vec<MemberDescription>>> {
    let owners = engine.data_owners(dataset_id).await?;
    Ok(Json(owners.into_iter().map(Into::into).collect()))
}

#[get("/members/<member_id>/pending?<family>")]
async fn get_pending(
    member_id: Id,
    family: ElectionType,
    engine: &State<Engine>,
) -> Result<Json<Vec<PendingCase>>> {
    Ok(Json(engine.pending_cases(member_id, family).await?))
}

#[post("/members/<member_id>/chair")]
async fn promote_chair(member_id: Id, engine: &State<Engine>) -> Result<Json<SuccessionDescription>> {
    let Succession {
        chair,
        previous_chair,
        reopened,
    } = engine.promote_chair(member_id).await?;
    Ok(Json(SuccessionDescription {
        chair: chair.into(),
        previous_chair: previous_chair.map(Into::into),
        reopened: reopened.into_iter().map(Into::into).collect(),
    }))
}

#[delete("/members/<member_id>/data-owner")]
async fn remove_data_owner(member_id: Id, engine: &State<Engine>) -> Result<Json<MemberDescription>> {
    Ok(Json(engine.remove_data_owner(member_id).await?.into()))
}

#[delete("/members/<member_id>/committee")]
async fn remove_member(member_id: Id, engine: &State<Engine>) -> Result<Json<MemberDescription>> {
    Ok(Json(engine.remove_member(member_id).await?.into()))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json,
    };

    use super::*;
    use crate::engine::examples::Committee;
    use crate::model::common::{election::ElectionStatus, member::Role};

    #[backend_test(committee)]
    async fn create_and_fetch(client: Client) {
        let spec = MemberSpec::example("New Member", &[Role::Member]);
        let response = client
            .post(uri!(create_member))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&spec).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let created: MemberDescription = response.into_json().await.unwrap();
        assert_eq!(created.email, spec.email);

        // Emails are unique.
        let response = client
            .post(uri!(create_member))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&spec).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let id: Id = created.id.into();
        let response = client.get(uri!(get_member(member_id = id))).dispatch().await;
        let fetched: MemberDescription = response.into_json().await.unwrap();
        assert_eq!(fetched, created);

        let response = client.get(uri!(get_voting_members)).dispatch().await;
        let voters: Vec<MemberDescription> = response.into_json().await.unwrap();
        assert_eq!(voters.len(), 4);
    }

    #[backend_test(committee)]
    async fn directory(client: Client, committee: Committee) {
        let response = client.get(uri!(get_chair)).dispatch().await;
        let chair: Option<MemberDescription> = response.into_json().await.unwrap();
        assert_eq!(chair.map(|c| Id::from(c.id)), Some(committee.chair.id));

        let response = client
            .get(uri!(get_data_owners(dataset_id = "DS-1")))
            .dispatch()
            .await;
        let owners: Vec<MemberDescription> = response.into_json().await.unwrap();
        assert_eq!(owners, vec![MemberDescription::from(committee.data_owner)]);
    }

    #[backend_test(committee)]
    async fn succession_over_http(client: Client, engine: Engine, committee: Committee) {
        let opened = engine
            .start_review(ElectionType::ConsentReview, "C1", None)
            .await
            .unwrap();
        let successor = committee.members[0].id;
        let response = client
            .post(uri!(promote_chair(member_id = successor)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let succession: SuccessionDescription = response.into_json().await.unwrap();
        assert_eq!(
            succession.previous_chair.map(|c| Id::from(c.id)),
            Some(committee.chair.id)
        );
        assert_eq!(succession.reopened.len(), 1);
        assert_eq!(
            engine.election(opened.election.id).await.unwrap().status,
            ElectionStatus::Canceled
        );

        let response = client
            .post(uri!(promote_chair(member_id = successor)))
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(committee)]
    async fn pending_and_removal(client: Client, engine: Engine, committee: Committee) {
        engine
            .start_review(ElectionType::ConsentReview, "C1", None)
            .await
            .unwrap();
        let member = committee.members[1].id;
        let response = client
            .get(format!("/members/{member}/pending?family=ConsentReview"))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let cases: Vec<PendingCase> = response.into_json().await.unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].logged, "0/3");

        let response = client
            .delete(uri!(remove_member(member_id = member)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let response = client
            .get(format!("/members/{member}/pending?family=ConsentReview"))
            .dispatch()
            .await;
        let cases: Vec<PendingCase> = response.into_json().await.unwrap();
        assert!(cases.is_empty());

        let owner = committee.data_owner.id;
        let response = client
            .delete(uri!(remove_data_owner(member_id = owner)))
            .dispatch()
            .await;
        let removed: MemberDescription = response.into_json().await.unwrap();
        assert!(removed.datasets.is_empty());
    }
}
