use rocket::Route;

mod election;
mod member;
mod subject;
mod vote;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(election::routes());
    routes.extend(vote::routes());
    routes.extend(member::routes());
    routes.extend(subject::routes());
    routes
}
