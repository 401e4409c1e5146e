use rocket::{serde::json::Json, Route, State};

use crate::{
    engine::Engine,
    error::Result,
    model::api::subject::{ConsentDescription, DarDescription},
};

pub fn routes() -> Vec<Route> {
    routes![create_consent, get_consent, create_dar, get_dar]
}

#[post("/consents", data = "<consent>", format = "json")]
async fn create_consent(
    consent: Json<ConsentDescription>,
    engine: &State<Engine>,
) -> Result<Json<ConsentDescription>> {
    let consent = engine.create_consent(consent.0.into()).await?;
    Ok(Json(consent.into()))
}

#[get("/consents/<consent_id>")]
async fn get_consent(consent_id: &str, engine: &State<Engine>) -> Result<Json<ConsentDescription>> {
    Ok(Json(engine.consent(consent_id).await?.into()))
}

#[post("/dars", data = "<dar>", format = "json")]
async fn create_dar(dar: Json<DarDescription>, engine: &State<Engine>) -> Result<Json<DarDescription>> {
    let dar = engine.create_data_access_request(dar.0.into()).await?;
    Ok(Json(dar.into()))
}

#[get("/dars/<dar_id>")]
async fn get_dar(dar_id: &str, engine: &State<Engine>) -> Result<Json<DarDescription>> {
    Ok(Json(engine.data_access_request(dar_id).await?.into()))
}
