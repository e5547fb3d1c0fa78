use axum::Json;
use axum::extract::State;
use ferry_llm::ModelRouter;
use ferry_llm::id::unix_now;
use serde::Serialize;

/// Owner reported for every listed model
const OWNER: &str = "ferry";

#[derive(Debug, Serialize)]
pub struct ModelList {
    object: &'static str,
    data: Vec<ModelEntry>,
}

#[derive(Debug, Serialize)]
struct ModelEntry {
    id: String,
    object: &'static str,
    created: u64,
    owned_by: &'static str,
}

/// Handle `GET /models`: logical model names in routing-table order
pub async fn list_models(State(router): State<ModelRouter>) -> Json<ModelList> {
    let created = unix_now();

    let data = router
        .available_models()
        .into_iter()
        .map(|id| ModelEntry {
            id: id.to_owned(),
            object: "model",
            created,
            owned_by: OWNER,
        })
        .collect();

    Json(ModelList { object: "list", data })
}
